use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sled::Transactional;

use crate::courses::sequencer::{
    plan_cross_module_move, plan_same_module_move, LessonPosition, OrderChange,
};
use crate::store::keys;
use crate::store::{Store, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseModule {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// A lesson is owned by exactly one module; `order` is its dense 0-based
/// position among that module's lessons.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub module_id: String,
    pub title: String,
    pub order: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn abort(error: StoreError) -> sled::transaction::ConflictableTransactionError<StoreError> {
    sled::transaction::ConflictableTransactionError::Abort(error)
}

fn unwrap_transaction_error(
    error: sled::transaction::TransactionError<StoreError>,
) -> StoreError {
    match error {
        sled::transaction::TransactionError::Abort(store_error) => store_error,
        sled::transaction::TransactionError::Storage(storage_error) => {
            StoreError::Sled(storage_error)
        }
    }
}

impl Store {
    pub fn create_module(&self, title: &str) -> Result<CourseModule, StoreError> {
        if title.trim().is_empty() {
            return Err(StoreError::Validation(
                "module title must be non-empty".to_string(),
            ));
        }
        let module = CourseModule {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.trim().to_string(),
            created_at: Utc::now(),
        };
        let key = keys::module_key(&module.id);
        self.modules
            .insert(key.as_bytes(), Self::serialize(&module)?)?;
        Ok(module)
    }

    pub fn get_module(&self, module_id: &str) -> Result<Option<CourseModule>, StoreError> {
        let key = keys::module_key(module_id);
        match self.modules.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn get_lesson(&self, lesson_id: &str) -> Result<Option<Lesson>, StoreError> {
        let key = keys::lesson_key(lesson_id);
        match self.lessons.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Append a lesson at the end of its module's sequence, keeping the
    /// order range contiguous.
    pub fn create_lesson(&self, module_id: &str, title: &str) -> Result<Lesson, StoreError> {
        if title.trim().is_empty() {
            return Err(StoreError::Validation(
                "lesson title must be non-empty".to_string(),
            ));
        }
        if self.get_module(module_id)?.is_none() {
            return Err(StoreError::not_found("module", module_id));
        }

        let siblings = self.list_module_lessons(module_id)?;
        let now = Utc::now();
        let lesson = Lesson {
            id: uuid::Uuid::new_v4().to_string(),
            module_id: module_id.to_string(),
            title: title.trim().to_string(),
            order: siblings.len() as u32,
            created_at: now,
            updated_at: now,
        };

        let lesson_key = keys::lesson_key(&lesson.id);
        let index_key = keys::lesson_module_index_key(module_id, &lesson.id);
        let value = Self::serialize(&lesson)?;

        (&self.lessons, &self.lesson_module_index)
            .transaction(|(tx_lessons, tx_index)| {
                tx_lessons.insert(lesson_key.as_bytes(), value.as_slice())?;
                tx_index.insert(index_key.as_bytes(), &[])?;
                Ok(())
            })
            .map_err(unwrap_transaction_error)?;

        Ok(lesson)
    }

    /// All lessons of one module, ascending by order.
    pub fn list_module_lessons(&self, module_id: &str) -> Result<Vec<Lesson>, StoreError> {
        let prefix = keys::lesson_module_prefix(module_id);
        let mut lessons = Vec::new();
        for item in self.lesson_module_index.scan_prefix(prefix.as_bytes()) {
            let (index_key, _) = item?;
            let lesson_id = String::from_utf8_lossy(&index_key[prefix.len()..]).to_string();
            let lesson = self
                .get_lesson(&lesson_id)?
                .ok_or_else(|| StoreError::not_found("lesson", &lesson_id))?;
            lessons.push(lesson);
        }
        lessons.sort_by_key(|l| l.order);
        Ok(lessons)
    }

    /// Move a lesson to `target_order` within `target_module_id`, shifting
    /// siblings to keep both affected modules' order ranges contiguous.
    ///
    /// The shift plan is computed from a snapshot of the sibling sets; all
    /// resulting writes are applied in a single transaction that re-reads
    /// the moved lesson and aborts with `Conflict` if a concurrent move got
    /// there first. `target_order` is not range-checked: an out-of-range
    /// target creates a gap and is only logged.
    pub fn move_lesson(
        &self,
        lesson_id: &str,
        target_module_id: &str,
        target_order: u32,
    ) -> Result<Lesson, StoreError> {
        let lesson = self
            .get_lesson(lesson_id)?
            .ok_or_else(|| StoreError::not_found("lesson", lesson_id))?;
        if self.get_module(target_module_id)?.is_none() {
            return Err(StoreError::not_found("module", target_module_id));
        }

        let source_siblings = self.list_module_lessons(&lesson.module_id)?;
        let cross_module = target_module_id != lesson.module_id;

        let (plan, siblings_after_move) = if cross_module {
            let dest_siblings = self.list_module_lessons(target_module_id)?;
            let count_after = dest_siblings.len() + 1;
            (
                plan_cross_module_move(
                    &positions(&source_siblings),
                    &positions(&dest_siblings),
                    lesson_id,
                    lesson.order,
                    target_order,
                ),
                count_after,
            )
        } else {
            (
                plan_same_module_move(
                    &positions(&source_siblings),
                    lesson_id,
                    lesson.order,
                    target_order,
                ),
                source_siblings.len(),
            )
        };

        if target_order as usize >= siblings_after_move {
            tracing::warn!(
                lesson_id,
                target_module_id,
                target_order,
                siblings_after_move,
                "Lesson move target is outside the contiguous range; a gap will be created"
            );
        }

        let now = Utc::now();
        let snapshot_module_id = lesson.module_id.clone();
        let snapshot_order = lesson.order;
        let source_ids: HashSet<String> =
            source_siblings.iter().map(|l| l.id.clone()).collect();
        let moved_key = keys::lesson_key(lesson_id);
        let old_index_key = keys::lesson_module_index_key(&snapshot_module_id, lesson_id);
        let new_index_key = keys::lesson_module_index_key(target_module_id, lesson_id);

        let moved = (&self.lessons, &self.lesson_module_index)
            .transaction(|(tx_lessons, tx_index)| {
                // Serialize against concurrent moves: the plan is only valid
                // for the snapshot it was computed from.
                let raw = tx_lessons
                    .get(moved_key.as_bytes())?
                    .ok_or_else(|| abort(StoreError::not_found("lesson", lesson_id)))?;
                let current: Lesson =
                    serde_json::from_slice(&raw).map_err(|e| abort(StoreError::Serialization(e)))?;
                if current.module_id != snapshot_module_id || current.order != snapshot_order {
                    return Err(abort(StoreError::conflict("lesson", lesson_id)));
                }

                let mut moved_lesson = None;
                for change in &plan {
                    // Entries planned from the source snapshot (the moved
                    // lesson included) must still live there; the rest are
                    // destination siblings.
                    let expected_module_id = if source_ids.contains(&change.lesson_id) {
                        snapshot_module_id.as_str()
                    } else {
                        target_module_id
                    };
                    apply_order_change(
                        tx_lessons,
                        change,
                        lesson_id,
                        target_module_id,
                        expected_module_id,
                        now,
                        &mut moved_lesson,
                    )?;
                }

                if cross_module {
                    tx_index.remove(old_index_key.as_bytes())?;
                    tx_index.insert(new_index_key.as_bytes(), &[])?;
                }

                moved_lesson.ok_or_else(|| abort(StoreError::not_found("lesson", lesson_id)))
            })
            .map_err(unwrap_transaction_error)?;

        Ok(moved)
    }
}

fn positions(lessons: &[Lesson]) -> Vec<LessonPosition> {
    lessons
        .iter()
        .map(|l| LessonPosition {
            lesson_id: l.id.clone(),
            order: l.order,
        })
        .collect()
}

fn apply_order_change(
    tx_lessons: &sled::transaction::TransactionalTree,
    change: &OrderChange,
    moved_lesson_id: &str,
    target_module_id: &str,
    expected_module_id: &str,
    now: DateTime<Utc>,
    moved_out: &mut Option<Lesson>,
) -> Result<(), sled::transaction::ConflictableTransactionError<StoreError>> {
    let key = keys::lesson_key(&change.lesson_id);
    let raw = tx_lessons
        .get(key.as_bytes())?
        .ok_or_else(|| abort(StoreError::not_found("lesson", &change.lesson_id)))?;
    let mut lesson: Lesson =
        serde_json::from_slice(&raw).map_err(|e| abort(StoreError::Serialization(e)))?;

    // A concurrent move that shifted or re-homed this sibling invalidates
    // the whole plan, even when the moved lesson itself is untouched.
    if lesson.order != change.prior_order || lesson.module_id != expected_module_id {
        return Err(abort(StoreError::conflict("lesson", &change.lesson_id)));
    }

    lesson.order = change.new_order;
    if change.lesson_id == moved_lesson_id {
        lesson.module_id = target_module_id.to_string();
    }
    lesson.updated_at = now;

    let value = serde_json::to_vec(&lesson).map_err(|e| abort(StoreError::Serialization(e)))?;
    tx_lessons.insert(key.as_bytes(), value)?;

    if change.lesson_id == moved_lesson_id {
        *moved_out = Some(lesson);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use crate::courses::sequencer::is_contiguous;

    use super::*;

    fn open_store(name: &str) -> (tempfile::TempDir, Store) {
        let dir = tempdir().unwrap();
        let store = Store::open(dir.path().join(name).to_str().unwrap()).unwrap();
        (dir, store)
    }

    fn orders(store: &Store, module_id: &str) -> Vec<u32> {
        store
            .list_module_lessons(module_id)
            .unwrap()
            .iter()
            .map(|l| l.order)
            .collect()
    }

    #[test]
    fn lessons_append_with_contiguous_orders() {
        let (_dir, store) = open_store("seq-append");
        let module = store.create_module("Aircraft General Knowledge").unwrap();

        for title in ["Engines", "Electrics", "Instruments"] {
            store.create_lesson(&module.id, title).unwrap();
        }

        assert_eq!(orders(&store, &module.id), vec![0, 1, 2]);
    }

    #[test]
    fn same_module_move_from_front_to_back() {
        let (_dir, store) = open_store("seq-move-later");
        let module = store.create_module("Meteorology").unwrap();
        let lessons: Vec<Lesson> = (0..5)
            .map(|i| store.create_lesson(&module.id, &format!("Lesson {i}")).unwrap())
            .collect();

        let moved = store.move_lesson(&lessons[0].id, &module.id, 3).unwrap();
        assert_eq!(moved.order, 3);

        let after = store.list_module_lessons(&module.id).unwrap();
        assert!(is_contiguous(&after.iter().map(|l| l.order).collect::<Vec<_>>()));

        // The former orders 1..=3 shifted down by one; order 4 untouched.
        let titles: Vec<&str> = after.iter().map(|l| l.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Lesson 1", "Lesson 2", "Lesson 3", "Lesson 0", "Lesson 4"]
        );
    }

    #[test]
    fn same_module_move_earlier() {
        let (_dir, store) = open_store("seq-move-earlier");
        let module = store.create_module("Navigation").unwrap();
        let lessons: Vec<Lesson> = (0..4)
            .map(|i| store.create_lesson(&module.id, &format!("Lesson {i}")).unwrap())
            .collect();

        store.move_lesson(&lessons[3].id, &module.id, 1).unwrap();

        let titles: Vec<String> = store
            .list_module_lessons(&module.id)
            .unwrap()
            .iter()
            .map(|l| l.title.clone())
            .collect();
        assert_eq!(titles, vec!["Lesson 0", "Lesson 3", "Lesson 1", "Lesson 2"]);
    }

    #[test]
    fn move_to_same_position_keeps_everything() {
        let (_dir, store) = open_store("seq-noop");
        let module = store.create_module("Human Factors").unwrap();
        let lessons: Vec<Lesson> = (0..3)
            .map(|i| store.create_lesson(&module.id, &format!("Lesson {i}")).unwrap())
            .collect();

        let moved = store.move_lesson(&lessons[1].id, &module.id, 1).unwrap();
        assert_eq!(moved.order, 1);
        assert_eq!(orders(&store, &module.id), vec![0, 1, 2]);
    }

    #[test]
    fn cross_module_move_updates_both_sequences_and_ownership() {
        let (_dir, store) = open_store("seq-cross");
        let source = store.create_module("Flight Rules").unwrap();
        let dest = store.create_module("Air Law").unwrap();
        let src_lessons: Vec<Lesson> = (0..3)
            .map(|i| store.create_lesson(&source.id, &format!("Src {i}")).unwrap())
            .collect();
        for i in 0..2 {
            store.create_lesson(&dest.id, &format!("Dst {i}")).unwrap();
        }

        let moved = store.move_lesson(&src_lessons[1].id, &dest.id, 0).unwrap();
        assert_eq!(moved.module_id, dest.id);
        assert_eq!(moved.order, 0);

        assert_eq!(orders(&store, &source.id), vec![0, 1]);
        assert_eq!(orders(&store, &dest.id), vec![0, 1, 2]);

        let dest_titles: Vec<String> = store
            .list_module_lessons(&dest.id)
            .unwrap()
            .iter()
            .map(|l| l.title.clone())
            .collect();
        assert_eq!(dest_titles, vec!["Src 1", "Dst 0", "Dst 1"]);
    }

    #[test]
    fn moving_only_lesson_empties_the_source_module() {
        let (_dir, store) = open_store("seq-sole");
        let source = store.create_module("Performance").unwrap();
        let dest = store.create_module("Loading").unwrap();
        let solo = store.create_lesson(&source.id, "Weight and Balance").unwrap();
        store.create_lesson(&dest.id, "Charts").unwrap();

        store.move_lesson(&solo.id, &dest.id, 0).unwrap();

        assert!(store.list_module_lessons(&source.id).unwrap().is_empty());
        assert_eq!(orders(&store, &dest.id), vec![0, 1]);
    }

    #[test]
    fn unknown_lesson_and_module_are_not_found() {
        let (_dir, store) = open_store("seq-missing");
        let module = store.create_module("Meteorology").unwrap();
        let lesson = store.create_lesson(&module.id, "Fog").unwrap();

        let err = store.move_lesson("missing", &module.id, 0).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));

        let err = store.move_lesson(&lesson.id, "missing", 0).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn overlapping_concurrent_moves_cannot_break_contiguity() {
        let (_dir, store) = open_store("seq-concurrent");
        let module = store.create_module("Meteorology").unwrap();
        let lessons: Vec<Lesson> = (0..5)
            .map(|i| store.create_lesson(&module.id, &format!("Lesson {i}")).unwrap())
            .collect();

        // Two movers whose shift ranges overlap without displacing each
        // other's lesson. The loser of each round must surface Conflict
        // rather than commit its stale plan.
        for _ in 0..20 {
            std::thread::scope(|scope| {
                let first = scope.spawn(|| store.move_lesson(&lessons[0].id, &module.id, 2));
                let second = scope.spawn(|| store.move_lesson(&lessons[4].id, &module.id, 2));
                for result in [first.join().unwrap(), second.join().unwrap()] {
                    match result {
                        Ok(_) | Err(StoreError::Conflict { .. }) => {}
                        Err(other) => panic!("unexpected error: {other}"),
                    }
                }
            });

            let after: Vec<u32> = store
                .list_module_lessons(&module.id)
                .unwrap()
                .iter()
                .map(|l| l.order)
                .collect();
            assert_eq!(after.len(), 5);
            assert!(is_contiguous(&after), "orders diverged: {after:?}");
        }
    }

    #[test]
    fn stale_plan_is_rejected_with_conflict() {
        let (_dir, store) = open_store("seq-stale");
        let module = store.create_module("Navigation").unwrap();
        let lessons: Vec<Lesson> = (0..5)
            .map(|i| store.create_lesson(&module.id, &format!("Lesson {i}")).unwrap())
            .collect();

        // Shift a sibling out from under a plan computed against the
        // original layout, then apply the stale plan directly.
        let siblings = store.list_module_lessons(&module.id).unwrap();
        let plan = crate::courses::sequencer::plan_same_module_move(
            &super::positions(&siblings),
            &lessons[0].id,
            0,
            2,
        );
        store.move_lesson(&lessons[4].id, &module.id, 1).unwrap();

        let now = Utc::now();
        let result = (&store.lessons, &store.lesson_module_index)
            .transaction(|(tx_lessons, _tx_index)| {
                let mut moved = None;
                for change in &plan {
                    apply_order_change(
                        tx_lessons,
                        change,
                        &lessons[0].id,
                        &module.id,
                        &module.id,
                        now,
                        &mut moved,
                    )?;
                }
                Ok(())
            })
            .map_err(unwrap_transaction_error);

        assert!(matches!(result, Err(StoreError::Conflict { .. })));

        let after: Vec<u32> = store
            .list_module_lessons(&module.id)
            .unwrap()
            .iter()
            .map(|l| l.order)
            .collect();
        assert!(is_contiguous(&after));
    }

    #[test]
    fn rehomed_sibling_invalidates_stale_plan() {
        let (_dir, store) = open_store("seq-rehome");
        let source = store.create_module("Navigation").unwrap();
        let dest = store.create_module("Flight Planning").unwrap();
        let third = store.create_module("Air Law").unwrap();

        let src_lessons: Vec<Lesson> = (0..2)
            .map(|i| store.create_lesson(&source.id, &format!("Src {i}")).unwrap())
            .collect();
        let dest_lessons: Vec<Lesson> = (0..2)
            .map(|i| store.create_lesson(&dest.id, &format!("Dst {i}")).unwrap())
            .collect();
        store.create_lesson(&third.id, "Other").unwrap();

        let plan = crate::courses::sequencer::plan_cross_module_move(
            &super::positions(&store.list_module_lessons(&source.id).unwrap()),
            &super::positions(&store.list_module_lessons(&dest.id).unwrap()),
            &src_lessons[1].id,
            1,
            1,
        );

        // A concurrent admin re-homes the destination sibling into a third
        // module where it happens to keep the same order value.
        store.move_lesson(&dest_lessons[1].id, &third.id, 1).unwrap();

        let now = Utc::now();
        let result = (&store.lessons, &store.lesson_module_index)
            .transaction(|(tx_lessons, _tx_index)| {
                let mut moved = None;
                for change in &plan {
                    let expected_module_id =
                        if src_lessons.iter().any(|l| l.id == change.lesson_id) {
                            source.id.as_str()
                        } else {
                            dest.id.as_str()
                        };
                    apply_order_change(
                        tx_lessons,
                        change,
                        &src_lessons[1].id,
                        &dest.id,
                        expected_module_id,
                        now,
                        &mut moved,
                    )?;
                }
                Ok(())
            })
            .map_err(unwrap_transaction_error);

        assert!(matches!(result, Err(StoreError::Conflict { .. })));
    }

    #[test]
    fn out_of_range_target_is_permitted_and_creates_a_gap() {
        let (_dir, store) = open_store("seq-gap");
        let module = store.create_module("Meteorology").unwrap();
        let lessons: Vec<Lesson> = (0..2)
            .map(|i| store.create_lesson(&module.id, &format!("Lesson {i}")).unwrap())
            .collect();

        let moved = store.move_lesson(&lessons[0].id, &module.id, 5).unwrap();
        assert_eq!(moved.order, 5);

        let after = orders(&store, &module.id);
        assert!(!is_contiguous(&after));
    }
}
