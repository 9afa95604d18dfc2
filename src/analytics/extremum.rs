use std::sync::Arc;
use tracing::instrument;

use super::models::{Direction, ExtremumRecord};
use super::AnalyticsError;
use crate::store::{KeyValueStore, Value, WriteOp};

/// Maintains the single record (holder + value) that is currently the global
/// minimum or maximum for a dimension. The read-compare-write runs as one
/// conditional transaction so two concurrent observers can never both adopt
/// the record based on the same stale view.
pub struct ExtremumTracker {
    store: Arc<dyn KeyValueStore>,
    max_attempts: u32,
}

impl ExtremumTracker {
    pub fn new(store: Arc<dyn KeyValueStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts,
        }
    }

    /// Considers `(entity_id, value)` for the record at `key`. The first
    /// observation is adopted unconditionally; afterwards only a strictly
    /// better value replaces the incumbent, so ties keep the first holder.
    ///
    /// Returns whether the record changed.
    #[instrument(skip(self))]
    pub async fn observe(
        &self,
        key: &str,
        entity_id: &str,
        value: i64,
        direction: Direction,
    ) -> Result<bool, AnalyticsError> {
        let watched = [key.to_string()];
        super::run_transaction(self.store.as_ref(), &watched, self.max_attempts, |snapshot| {
            let current = match snapshot.value(key) {
                Some(raw) => Some(decode(key, raw.as_scalar(key)?)?),
                None => None,
            };

            let replaces = match &current {
                None => true,
                Some(record) => direction.better(value, record.value),
            };
            if !replaces {
                return Ok(None);
            }

            let record = ExtremumRecord {
                holder: entity_id.to_string(),
                value,
            };
            Ok(Some(vec![WriteOp::Set {
                key: key.to_string(),
                value: Value::scalar(encode(key, &record)?),
            }]))
        })
        .await
    }

    pub async fn read(&self, key: &str) -> Result<Option<ExtremumRecord>, AnalyticsError> {
        match self.store.get(key).await? {
            Some(raw) => Ok(Some(decode(key, raw.as_scalar(key)?)?)),
            None => Ok(None),
        }
    }
}

fn encode(key: &str, record: &ExtremumRecord) -> Result<String, AnalyticsError> {
    serde_json::to_string(record).map_err(|err| AnalyticsError::CorruptRecord {
        key: key.to_string(),
        reason: err.to_string(),
    })
}

fn decode(key: &str, raw: &str) -> Result<ExtremumRecord, AnalyticsError> {
    serde_json::from_str(raw).map_err(|err| AnalyticsError::CorruptRecord {
        key: key.to_string(),
        reason: err.to_string(),
    })
}
