//! Incremental maintenance of derived analytic views: bounded ranked lists,
//! running extrema, and frequency leaders. Every maintainer is stateless
//! between calls; all shared mutable state lives in the key-value store and
//! every read-compare-write sequence runs as an optimistic transaction.

pub mod extremum;
pub mod frequency;
pub mod models;
pub mod ranked_list;
pub mod reconcile;
pub mod service;

mod errors;

pub use errors::AnalyticsError;
pub use extremum::ExtremumTracker;
pub use frequency::FrequencyLeaderTracker;
pub use models::{
    Bound, Dimension, Direction, ExtremumRecord, FrequencyLeader, LeaderRule, RankedEntry,
};
pub use ranked_list::RankedListMaintainer;
pub use reconcile::{ReconciliationBuilder, ReconciliationReport, ReplayEvent};
pub use service::{AnalyticsConfig, AnalyticsService};

use crate::store::{KeySnapshot, KeyValueStore, WriteOp};

/// Runs `compute` against a fresh snapshot of `keys` until the resulting
/// writes commit, up to `max_attempts` times. `compute` returning `None`
/// means the state already satisfies the invariant and nothing is written.
///
/// Returns whether a commit happened.
pub(crate) async fn run_transaction<F>(
    store: &dyn KeyValueStore,
    keys: &[String],
    max_attempts: u32,
    mut compute: F,
) -> Result<bool, AnalyticsError>
where
    F: FnMut(&KeySnapshot) -> Result<Option<Vec<WriteOp>>, AnalyticsError>,
{
    for _ in 0..max_attempts {
        let snapshot = store.snapshot(keys).await?;
        let ops = match compute(&snapshot)? {
            Some(ops) => ops,
            None => return Ok(false),
        };
        if store.commit(&snapshot, ops).await? {
            return Ok(true);
        }
        tracing::debug!(watched = ?keys, "transaction conflict, retrying");
    }
    Err(AnalyticsError::ConflictRetryExceeded {
        key: keys.join(","),
        attempts: max_attempts,
    })
}
