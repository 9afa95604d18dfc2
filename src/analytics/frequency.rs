use std::sync::Arc;
use tracing::instrument;

use super::models::{FrequencyLeader, LeaderRule};
use super::AnalyticsError;
use crate::store::{KeyValueStore, Value, WriteOp};

/// Maintains the category currently holding the highest (most-common) or
/// lowest positive (least-common) observation count. The counter increment
/// is a single atomic store op; each leader record is then re-evaluated in
/// its own conditional transaction against the count this increment produced.
pub struct FrequencyLeaderTracker {
    store: Arc<dyn KeyValueStore>,
    max_attempts: u32,
}

impl FrequencyLeaderTracker {
    pub fn new(store: Arc<dyn KeyValueStore>, max_attempts: u32) -> Self {
        Self {
            store,
            max_attempts,
        }
    }

    /// Increments `category`'s counter at `counter_key`, then updates every
    /// leader record in `leaders` according to its rule. Returns the new
    /// count.
    #[instrument(skip(self, leaders))]
    pub async fn increment(
        &self,
        counter_key: &str,
        category: &str,
        leaders: &[(String, LeaderRule)],
    ) -> Result<i64, AnalyticsError> {
        let new_count = self.store.increment(counter_key, 1).await?;
        for (leader_key, rule) in leaders {
            self.reevaluate(leader_key, *rule, category, new_count).await?;
        }
        Ok(new_count)
    }

    async fn reevaluate(
        &self,
        key: &str,
        rule: LeaderRule,
        category: &str,
        new_count: i64,
    ) -> Result<bool, AnalyticsError> {
        let watched = [key.to_string()];
        super::run_transaction(self.store.as_ref(), &watched, self.max_attempts, |snapshot| {
            let current = match snapshot.value(key) {
                Some(raw) => Some(decode(key, raw.as_scalar(key)?)?),
                None => None,
            };

            let replaces = match (&current, rule) {
                (None, _) => true,
                (Some(leader), LeaderRule::MostCommon) => new_count > leader.count,
                // A count of exactly 1 is a brand-new category: it had no
                // prior positive count to compare against and is always a
                // minimum candidate. An increment of the leading category
                // itself refreshes the stored count in place so the record
                // never lags its own counter.
                (Some(leader), LeaderRule::LeastCommon) => {
                    new_count < leader.count || new_count == 1 || leader.category == category
                }
            };
            if !replaces {
                return Ok(None);
            }

            let leader = FrequencyLeader {
                category: category.to_string(),
                count: new_count,
            };
            Ok(Some(vec![WriteOp::Set {
                key: key.to_string(),
                value: Value::scalar(encode(key, &leader)?),
            }]))
        })
        .await
    }

    pub async fn read(&self, key: &str) -> Result<Option<FrequencyLeader>, AnalyticsError> {
        match self.store.get(key).await? {
            Some(raw) => Ok(Some(decode(key, raw.as_scalar(key)?)?)),
            None => Ok(None),
        }
    }
}

fn encode(key: &str, leader: &FrequencyLeader) -> Result<String, AnalyticsError> {
    serde_json::to_string(leader).map_err(|err| AnalyticsError::CorruptRecord {
        key: key.to_string(),
        reason: err.to_string(),
    })
}

fn decode(key: &str, raw: &str) -> Result<FrequencyLeader, AnalyticsError> {
    serde_json::from_str(raw).map_err(|err| AnalyticsError::CorruptRecord {
        key: key.to_string(),
        reason: err.to_string(),
    })
}
