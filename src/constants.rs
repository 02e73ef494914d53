/// CASA CPL theory exam pass mark. Weak points at or above this accuracy
/// drop to low priority.
pub const EXAM_PASS_MARK_PERCENT: u32 = 70;

/// Below this accuracy a weak point is flagged high priority.
pub const HIGH_PRIORITY_THRESHOLD_PERCENT: u32 = 50;

/// Maximum number of question outcomes accepted in one exam submission.
pub const MAX_EXAM_BATCH_SIZE: usize = 200;
