use std::sync::Arc;
use tracing::instrument;

use super::extremum::ExtremumTracker;
use super::frequency::FrequencyLeaderTracker;
use super::models::{
    Bound, Dimension, Direction, ExtremumRecord, FrequencyLeader, LeaderRule, RankedEntry,
};
use super::ranked_list::RankedListMaintainer;
use super::AnalyticsError;
use crate::keys;
use crate::store::KeyValueStore;

#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// Capacity K of every bounded ranked list.
    pub list_capacity: usize,
    /// Retry budget for one conditional transaction before
    /// `ConflictRetryExceeded` is surfaced.
    pub max_txn_attempts: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            list_capacity: 10,
            max_txn_attempts: 8,
        }
    }
}

/// Facade over the three maintainers, translating `(dimension, stat)` pairs
/// into store keys. Dimensions need no registration; a first observation
/// lazily materializes the structure it touches.
pub struct AnalyticsService {
    store: Arc<dyn KeyValueStore>,
    ranked: RankedListMaintainer,
    extremum: ExtremumTracker,
    frequency: FrequencyLeaderTracker,
}

impl AnalyticsService {
    pub fn new(store: Arc<dyn KeyValueStore>, config: AnalyticsConfig) -> Self {
        Self {
            ranked: RankedListMaintainer::new(
                store.clone(),
                config.list_capacity,
                config.max_txn_attempts,
            ),
            extremum: ExtremumTracker::new(store.clone(), config.max_txn_attempts),
            frequency: FrequencyLeaderTracker::new(store.clone(), config.max_txn_attempts),
            store,
        }
    }

    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        self.store.clone()
    }

    /// Reflects a score change for `entity_id` in the ranked list of
    /// `(dimension, stat, bound)`. Returns whether the list changed.
    #[instrument(skip(self))]
    pub async fn record_score_update(
        &self,
        dimension: &Dimension,
        stat: &str,
        bound: Bound,
        entity_id: &str,
        old_score: Option<i64>,
        new_score: i64,
    ) -> Result<bool, AnalyticsError> {
        let key = keys::ranked_list(dimension, stat, bound);
        self.ranked
            .observe(&key, bound, entity_id, old_score, new_score)
            .await
    }

    /// Considers an observed value for the extremum record of
    /// `(dimension, stat)`. Returns whether the record changed.
    #[instrument(skip(self))]
    pub async fn record_observation(
        &self,
        dimension: &Dimension,
        stat: &str,
        entity_id: &str,
        value: i64,
        direction: Direction,
    ) -> Result<bool, AnalyticsError> {
        let key = keys::extremum(dimension, stat);
        self.extremum.observe(&key, entity_id, value, direction).await
    }

    /// Increments `category`'s counter for `(dimension, stat)` and
    /// re-evaluates each leader record named in `rules`. Returns the new
    /// count.
    #[instrument(skip(self, rules))]
    pub async fn record_category_increment(
        &self,
        dimension: &Dimension,
        stat: &str,
        category: &str,
        rules: &[LeaderRule],
    ) -> Result<i64, AnalyticsError> {
        let counter_key = keys::category_count(dimension, stat, category);
        let leaders: Vec<(String, LeaderRule)> = rules
            .iter()
            .map(|rule| (keys::leader(dimension, stat, *rule), *rule))
            .collect();
        self.frequency
            .increment(&counter_key, category, &leaders)
            .await
    }

    pub async fn query_ranked(
        &self,
        dimension: &Dimension,
        stat: &str,
        bound: Bound,
    ) -> Result<Vec<RankedEntry>, AnalyticsError> {
        self.ranked
            .read(&keys::ranked_list(dimension, stat, bound))
            .await
    }

    pub async fn query_extremum(
        &self,
        dimension: &Dimension,
        stat: &str,
    ) -> Result<Option<ExtremumRecord>, AnalyticsError> {
        self.extremum.read(&keys::extremum(dimension, stat)).await
    }

    pub async fn query_leader(
        &self,
        dimension: &Dimension,
        stat: &str,
        rule: LeaderRule,
    ) -> Result<Option<FrequencyLeader>, AnalyticsError> {
        self.frequency.read(&keys::leader(dimension, stat, rule)).await
    }

    /// Current raw counter for one category of `(dimension, stat)`.
    pub async fn category_count(
        &self,
        dimension: &Dimension,
        stat: &str,
        category: &str,
    ) -> Result<i64, AnalyticsError> {
        let key = keys::category_count(dimension, stat, category);
        match self.store.get(&key).await? {
            Some(value) => Ok(value.as_i64(&key)?),
            None => Ok(0),
        }
    }
}
