pub const WEAK_POINTS: &str = "weak_points";
pub const WEAK_POINT_DIGESTS: &str = "weak_point_digests";
pub const MODULES: &str = "modules";
pub const LESSONS: &str = "lessons";
pub const LESSON_MODULE_INDEX: &str = "lesson_module_index";
pub const META: &str = "meta";
