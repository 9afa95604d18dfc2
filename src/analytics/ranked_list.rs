use std::sync::Arc;
use tracing::instrument;

use super::models::{Bound, RankedEntry};
use super::AnalyticsError;
use crate::store::{KeyValueStore, WriteOp};

/// Maintains a size-bounded, order-preserving list of `(entity_id, score)`
/// pairs under streaming score updates. The list is most-extreme-first and
/// never holds two entries for the same entity.
///
/// Holds no state of its own; the stale-removal / insert / trim sequence for
/// one update runs as a single optimistic transaction on the list key.
pub struct RankedListMaintainer {
    store: Arc<dyn KeyValueStore>,
    capacity: usize,
    max_attempts: u32,
}

impl RankedListMaintainer {
    pub fn new(store: Arc<dyn KeyValueStore>, capacity: usize, max_attempts: u32) -> Self {
        Self {
            store,
            capacity,
            max_attempts,
        }
    }

    /// Reflects `entity_id`'s new score in the list at `key`. `old_score` is
    /// the previously recorded score, if any; a claimed old score with no
    /// matching entry is treated as a fresh insertion, not an error.
    ///
    /// Returns whether the list changed.
    #[instrument(skip(self))]
    pub async fn observe(
        &self,
        key: &str,
        bound: Bound,
        entity_id: &str,
        old_score: Option<i64>,
        new_score: i64,
    ) -> Result<bool, AnalyticsError> {
        let watched = [key.to_string()];
        super::run_transaction(self.store.as_ref(), &watched, self.max_attempts, |snapshot| {
            let mut entries = match snapshot.value(key) {
                Some(value) => value
                    .as_list(key)?
                    .iter()
                    .map(|raw| RankedEntry::decode(raw, key))
                    .collect::<Result<Vec<_>, _>>()?,
                None => Vec::new(),
            };

            let mut ops = Vec::new();

            // Drop any existing entry for this entity. The entry normally
            // carries `old_score`, but an entry with a diverged score is
            // stale all the same.
            if let Some(pos) = entries.iter().position(|e| e.entity_id == entity_id) {
                let stale = entries.remove(pos);
                if old_score != Some(stale.score) {
                    tracing::debug!(
                        key,
                        entity_id,
                        stale_score = stale.score,
                        ?old_score,
                        "recorded old score diverged from list entry"
                    );
                }
                ops.push(WriteOp::ListRemoveOne {
                    key: key.to_string(),
                    member: stale.encode(),
                });
            }

            let fresh = RankedEntry::new(entity_id, new_score);

            // First position the new score strictly beats. Equal scores stay
            // ahead of the new entry, keeping ties in arrival order.
            match entries.iter().position(|e| bound.beats(new_score, e.score)) {
                Some(pos) => {
                    ops.push(WriteOp::ListInsertBefore {
                        key: key.to_string(),
                        anchor: entries[pos].encode(),
                        member: fresh.encode(),
                    });
                    if entries.len() + 1 > self.capacity {
                        ops.push(WriteOp::ListTrim {
                            key: key.to_string(),
                            max_len: self.capacity,
                        });
                    }
                }
                None if entries.len() < self.capacity => {
                    ops.push(WriteOp::ListPushBack {
                        key: key.to_string(),
                        member: fresh.encode(),
                    });
                }
                // Full list and no better than the current worst.
                None => return Ok(if ops.is_empty() { None } else { Some(ops) }),
            }

            Ok(Some(ops))
        })
        .await
    }

    /// Current list contents, most extreme first.
    pub async fn read(&self, key: &str) -> Result<Vec<RankedEntry>, AnalyticsError> {
        self.store
            .list_read(key)
            .await?
            .iter()
            .map(|raw| RankedEntry::decode(raw, key))
            .collect()
    }
}
