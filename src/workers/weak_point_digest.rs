//! Daily weak-point digest (1:00 AM): tallies records per priority tier and
//! persists a dated snapshot. Purely observational; tracker state is never
//! modified here.

use crate::store::Store;

pub async fn run(store: &Store) {
    tracing::info!("Weak point digest worker running");

    let today = chrono::Utc::now().format("%Y-%m-%d").to_string();

    let counts = match store.count_weak_points_by_priority() {
        Ok(counts) => counts,
        Err(e) => {
            tracing::error!(error = %e, "Failed to tally weak points for digest");
            return;
        }
    };

    let digest = serde_json::json!({
        "date": today,
        "high": counts.high,
        "medium": counts.medium,
        "low": counts.low,
        "total": counts.high + counts.medium + counts.low,
    });

    if let Err(e) = store.upsert_weak_point_digest(&today, &digest) {
        tracing::warn!(error = %e, "Failed to store weak point digest");
    }

    tracing::info!(
        date = %today,
        high = counts.high,
        medium = counts.medium,
        low = counts.low,
        "Weak point digest complete"
    );
}
