//! Weak-point accuracy aggregation.
//!
//! A weak point is one persisted accuracy record per (user, topic, subject)
//! triple. Each completed exam contributes a batch of per-question outcomes;
//! the record keeps a rounded percentage and a running attempt count, and a
//! new batch is merged as a weighted average of the reconstructed historical
//! correct count and the batch's correct count.

use serde::{Deserialize, Serialize};

use crate::constants::{EXAM_PASS_MARK_PERCENT, HIGH_PRIORITY_THRESHOLD_PERCENT};

/// One question's outcome from a completed exam attempt.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOutcome {
    pub topic: String,
    pub correct: bool,
}

/// Per-topic tally of a single exam batch. `total_count >= 1` by
/// construction: a batch only exists for topics that appeared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicBatch {
    pub topic: String,
    pub correct_count: u32,
    pub total_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// The accuracy/attempts pair carried by a stored weak point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccuracyStats {
    /// Rounded integer percentage, 0..=100.
    pub accuracy: u32,
    pub questions_attempted: u32,
}

/// Group exam outcomes by topic, preserving first-seen topic order.
pub fn group_by_topic(results: &[QuestionOutcome]) -> Vec<TopicBatch> {
    let mut batches: Vec<TopicBatch> = Vec::new();
    for outcome in results {
        match batches.iter_mut().find(|b| b.topic == outcome.topic) {
            Some(batch) => {
                batch.total_count += 1;
                if outcome.correct {
                    batch.correct_count += 1;
                }
            }
            None => batches.push(TopicBatch {
                topic: outcome.topic.clone(),
                correct_count: u32::from(outcome.correct),
                total_count: 1,
            }),
        }
    }
    batches
}

/// Merge one batch into the existing stats, or create stats from the batch
/// alone when the record does not exist yet.
///
/// The historical correct count is reconstructed from the stored rounded
/// percentage (`round(accuracy/100 * attempted)`), so repeated merges carry
/// a bounded rounding error. This lossy reconstruction is deliberate: only
/// the rounded percentage is persisted.
pub fn merge_batch(existing: Option<AccuracyStats>, batch: &TopicBatch) -> AccuracyStats {
    match existing {
        None => AccuracyStats {
            accuracy: round_percent(batch.correct_count, batch.total_count),
            questions_attempted: batch.total_count,
        },
        Some(prior) => {
            let old_correct = (f64::from(prior.accuracy) / 100.0
                * f64::from(prior.questions_attempted))
            .round() as u32;
            let combined_total = prior.questions_attempted + batch.total_count;
            AccuracyStats {
                accuracy: round_percent(old_correct + batch.correct_count, combined_total),
                questions_attempted: combined_total,
            }
        }
    }
}

fn round_percent(correct: u32, total: u32) -> u32 {
    (100.0 * f64::from(correct) / f64::from(total)).round() as u32
}

/// Thresholds mirror CASA exam pass-mark semantics: 70% is the pass mark,
/// below 50% the fundamentals are shaky.
pub fn derive_priority(accuracy: u32) -> Priority {
    if accuracy < HIGH_PRIORITY_THRESHOLD_PERCENT {
        Priority::High
    } else if accuracy < EXAM_PASS_MARK_PERCENT {
        Priority::Medium
    } else {
        Priority::Low
    }
}

pub fn recommendation_for(priority: Priority, topic: &str, accuracy: u32) -> String {
    match priority {
        Priority::High => format!(
            "Go back to the fundamentals of {topic}: review the theory material before attempting more questions ({accuracy}% so far)."
        ),
        Priority::Medium => format!(
            "Keep practising {topic} questions to lift your accuracy from {accuracy}% past the {EXAM_PASS_MARK_PERCENT}% exam standard."
        ),
        Priority::Low => format!(
            "{topic} is at exam standard ({accuracy}%); schedule an occasional maintenance review."
        ),
    }
}
