//! Lesson order planning.
//!
//! Lessons inside a module carry a dense 0-based `order`. Moving a lesson
//! is a shift-based reinsertion: close the gap it leaves behind, open a slot
//! at the target position, then place the lesson. These functions compute
//! the resulting order assignments; applying them transactionally is the
//! store's job.
//!
//! `target_order` is intentionally not range-checked here: out-of-range
//! targets produce a gap, matching the permissive contract of the callers.

/// A sibling lesson's current position within its module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonPosition {
    pub lesson_id: String,
    pub order: u32,
}

/// One order reassignment to be written. The moved lesson itself is always
/// the last entry of a plan.
///
/// `prior_order` is the order the lesson held in the snapshot the plan was
/// computed from; appliers must verify it still matches before writing
/// `new_order`, since a plan is only valid against its snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderChange {
    pub lesson_id: String,
    pub prior_order: u32,
    pub new_order: u32,
}

/// Plan a reorder within a single module.
///
/// Moving later decrements every sibling in `(current, target]`; moving
/// earlier increments every sibling in `[target, current)`. A move onto the
/// lesson's own position degenerates to a single redundant self-write.
pub fn plan_same_module_move(
    siblings: &[LessonPosition],
    lesson_id: &str,
    current_order: u32,
    target_order: u32,
) -> Vec<OrderChange> {
    let mut changes = Vec::new();

    for sibling in siblings {
        if sibling.lesson_id == lesson_id {
            continue;
        }
        if target_order > current_order {
            if sibling.order > current_order && sibling.order <= target_order {
                changes.push(OrderChange {
                    lesson_id: sibling.lesson_id.clone(),
                    prior_order: sibling.order,
                    new_order: sibling.order - 1,
                });
            }
        } else if target_order < current_order
            && sibling.order >= target_order
            && sibling.order < current_order
        {
            changes.push(OrderChange {
                lesson_id: sibling.lesson_id.clone(),
                prior_order: sibling.order,
                new_order: sibling.order + 1,
            });
        }
    }

    changes.push(OrderChange {
        lesson_id: lesson_id.to_string(),
        prior_order: current_order,
        new_order: target_order,
    });
    changes
}

/// Plan a move into a different module.
///
/// Source siblings above the vacated position shift down by one;
/// destination siblings at or above the target shift up by one. The moved
/// lesson's own change (last entry) also implies the module re-home.
pub fn plan_cross_module_move(
    source_siblings: &[LessonPosition],
    dest_siblings: &[LessonPosition],
    lesson_id: &str,
    current_order: u32,
    target_order: u32,
) -> Vec<OrderChange> {
    let mut changes = Vec::new();

    for sibling in source_siblings {
        if sibling.lesson_id == lesson_id {
            continue;
        }
        if sibling.order > current_order {
            changes.push(OrderChange {
                lesson_id: sibling.lesson_id.clone(),
                prior_order: sibling.order,
                new_order: sibling.order - 1,
            });
        }
    }

    for sibling in dest_siblings {
        if sibling.order >= target_order {
            changes.push(OrderChange {
                lesson_id: sibling.lesson_id.clone(),
                prior_order: sibling.order,
                new_order: sibling.order + 1,
            });
        }
    }

    changes.push(OrderChange {
        lesson_id: lesson_id.to_string(),
        prior_order: current_order,
        new_order: target_order,
    });
    changes
}

/// Check that a set of order values is exactly `[0, count-1]`.
pub fn is_contiguous(orders: &[u32]) -> bool {
    let mut sorted: Vec<u32> = orders.to_vec();
    sorted.sort_unstable();
    sorted
        .iter()
        .enumerate()
        .all(|(index, order)| *order == index as u32)
}
