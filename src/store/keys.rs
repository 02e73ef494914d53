//! Key layouts for the sled trees. Module and lesson ids are
//! server-generated UUIDs; user ids come from the upstream JWT subject and
//! are rejected at the auth extractor if they contain `:`. That makes `:` a
//! safe separator, and the free-text topic label always sits last in a key
//! so it may contain anything.

pub fn weak_point_key(user_id: &str, subject_id: &str, topic: &str) -> String {
    format!("{}:{}:{}", user_id, subject_id, topic)
}

pub fn weak_point_prefix(user_id: &str) -> String {
    format!("{}:", user_id)
}

pub fn weak_point_subject_prefix(user_id: &str, subject_id: &str) -> String {
    format!("{}:{}:", user_id, subject_id)
}

pub fn module_key(module_id: &str) -> String {
    module_id.to_string()
}

pub fn lesson_key(lesson_id: &str) -> String {
    lesson_id.to_string()
}

pub fn lesson_module_index_key(module_id: &str, lesson_id: &str) -> String {
    format!("{}:{}", module_id, lesson_id)
}

pub fn lesson_module_prefix(module_id: &str) -> String {
    format!("{}:", module_id)
}

pub fn digest_key(date: &str) -> String {
    date.to_string()
}
