use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::progress::weak_points::{
    derive_priority, group_by_topic, merge_batch, recommendation_for, AccuracyStats, Priority,
    QuestionOutcome,
};
use crate::store::keys;
use crate::store::{Store, StoreError};

/// One persisted accuracy record per (user, subject, topic) triple. Created
/// on the first contribution, updated on every later one, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeakPoint {
    pub user_id: String,
    pub topic: String,
    pub subject_id: String,
    /// Denormalized display name, snapshotted at creation and never
    /// overwritten by later contributions.
    pub subject_name: String,
    pub accuracy: u32,
    pub questions_attempted: u32,
    pub priority: Priority,
    pub recommendation: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PriorityCounts {
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

impl Store {
    pub fn get_weak_point(
        &self,
        user_id: &str,
        subject_id: &str,
        topic: &str,
    ) -> Result<Option<WeakPoint>, StoreError> {
        let key = keys::weak_point_key(user_id, subject_id, topic);
        match self.weak_points.get(key.as_bytes())? {
            Some(raw) => Ok(Some(Self::deserialize(&raw)?)),
            None => Ok(None),
        }
    }

    /// Merge one completed exam attempt into the caller's weak points.
    ///
    /// Outcomes are grouped by topic and each topic group is merged into its
    /// record independently, so a batch touching N distinct topics performs
    /// exactly N writes. Attempts are not deduplicated: submitting the same
    /// attempt twice double-counts, and callers must submit each attempt
    /// once.
    pub fn record_exam_result(
        &self,
        user_id: &str,
        subject_id: &str,
        subject_name: &str,
        results: &[QuestionOutcome],
    ) -> Result<Vec<WeakPoint>, StoreError> {
        if results.is_empty() {
            return Err(StoreError::Validation(
                "exam results must contain at least one question outcome".to_string(),
            ));
        }
        if subject_id.trim().is_empty() || subject_name.trim().is_empty() {
            return Err(StoreError::Validation(
                "subject id and name must be non-empty".to_string(),
            ));
        }
        if results.iter().any(|r| r.topic.trim().is_empty()) {
            return Err(StoreError::Validation(
                "question topic labels must be non-empty".to_string(),
            ));
        }

        let now = Utc::now();
        let mut updated = Vec::new();

        for batch in group_by_topic(results) {
            let existing = self.get_weak_point(user_id, subject_id, &batch.topic)?;
            let stats = merge_batch(
                existing.as_ref().map(|wp| AccuracyStats {
                    accuracy: wp.accuracy,
                    questions_attempted: wp.questions_attempted,
                }),
                &batch,
            );
            let priority = derive_priority(stats.accuracy);

            let record = WeakPoint {
                user_id: user_id.to_string(),
                topic: batch.topic.clone(),
                subject_id: subject_id.to_string(),
                subject_name: existing
                    .as_ref()
                    .map(|wp| wp.subject_name.clone())
                    .unwrap_or_else(|| subject_name.to_string()),
                accuracy: stats.accuracy,
                questions_attempted: stats.questions_attempted,
                priority,
                recommendation: recommendation_for(priority, &batch.topic, stats.accuracy),
                created_at: existing.as_ref().map(|wp| wp.created_at).unwrap_or(now),
                updated_at: now,
            };

            let key = keys::weak_point_key(user_id, subject_id, &batch.topic);
            self.weak_points
                .insert(key.as_bytes(), Self::serialize(&record)?)?;
            updated.push(record);
        }

        tracing::debug!(
            user_id,
            subject_id,
            topics = updated.len(),
            questions = results.len(),
            "Merged exam results into weak points"
        );

        Ok(updated)
    }

    /// All weak points for a user, weakest first (accuracy asc, topic tiebreak).
    pub fn list_weak_points(&self, user_id: &str) -> Result<Vec<WeakPoint>, StoreError> {
        let prefix = keys::weak_point_prefix(user_id);
        self.collect_weak_points(&prefix)
    }

    pub fn list_subject_weak_points(
        &self,
        user_id: &str,
        subject_id: &str,
    ) -> Result<Vec<WeakPoint>, StoreError> {
        let prefix = keys::weak_point_subject_prefix(user_id, subject_id);
        self.collect_weak_points(&prefix)
    }

    fn collect_weak_points(&self, prefix: &str) -> Result<Vec<WeakPoint>, StoreError> {
        let mut points = Vec::new();
        for item in self.weak_points.scan_prefix(prefix.as_bytes()) {
            let (_, raw) = item?;
            points.push(Self::deserialize::<WeakPoint>(&raw)?);
        }
        points.sort_by(|a, b| a.accuracy.cmp(&b.accuracy).then_with(|| a.topic.cmp(&b.topic)));
        Ok(points)
    }

    /// Full-tree priority tally, used by the daily digest worker.
    pub fn count_weak_points_by_priority(&self) -> Result<PriorityCounts, StoreError> {
        let mut counts = PriorityCounts::default();
        for item in self.weak_points.iter() {
            let (_, raw) = item?;
            let wp: WeakPoint = Self::deserialize(&raw)?;
            match wp.priority {
                Priority::High => counts.high += 1,
                Priority::Medium => counts.medium += 1,
                Priority::Low => counts.low += 1,
            }
        }
        Ok(counts)
    }

    pub fn upsert_weak_point_digest(
        &self,
        date: &str,
        digest: &serde_json::Value,
    ) -> Result<(), StoreError> {
        let key = keys::digest_key(date);
        self.weak_point_digests
            .insert(key.as_bytes(), serde_json::to_vec(digest)?)?;
        Ok(())
    }
}
