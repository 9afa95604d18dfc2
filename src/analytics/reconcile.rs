use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, instrument};

use super::models::{Bound, Dimension, Direction, LeaderRule};
use super::service::AnalyticsService;
use super::AnalyticsError;
use crate::keys;

/// One historical event for replay, in original record order.
#[derive(Debug, Clone)]
pub enum ReplayEvent {
    /// One increment of an entity's score (e.g. one more win), feeding a
    /// ranked list. `counter_key` is the entity's underlying score counter,
    /// reset and re-derived along with the list when present.
    ScoreIncrement {
        dimension: Dimension,
        stat: String,
        bound: Bound,
        entity_id: String,
        counter_key: Option<String>,
    },
    Observation {
        dimension: Dimension,
        stat: String,
        entity_id: String,
        value: i64,
        direction: Direction,
    },
    CategoryIncrement {
        dimension: Dimension,
        stat: String,
        category: String,
        rules: Vec<LeaderRule>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub keys_reset: usize,
    pub events_replayed: usize,
}

/// Full-scan initialization of the derived structures from a complete
/// historical dataset. Every target key is cleared first and the events are
/// then replayed in order through the normal entry points, so the end state
/// matches a one-at-a-time run and re-invoking the rebuild is idempotent.
pub struct ReconciliationBuilder {
    service: Arc<AnalyticsService>,
}

impl ReconciliationBuilder {
    pub fn new(service: Arc<AnalyticsService>) -> Self {
        Self { service }
    }

    #[instrument(skip(self, events))]
    pub async fn rebuild(
        &self,
        events: &[ReplayEvent],
    ) -> Result<ReconciliationReport, AnalyticsError> {
        let targets = self.target_keys(events);
        let store = self.service.store();
        for key in &targets {
            store.delete(key).await?;
        }

        // Running scores per (list key, entity), so each replayed increment
        // carries the same old/new pair the live path would have seen.
        let mut running: HashMap<(String, String), i64> = HashMap::new();

        for event in events {
            match event {
                ReplayEvent::ScoreIncrement {
                    dimension,
                    stat,
                    bound,
                    entity_id,
                    counter_key,
                } => {
                    let list_key = keys::ranked_list(dimension, stat, *bound);
                    let slot = running
                        .entry((list_key, entity_id.clone()))
                        .or_insert(0);
                    let old_score = (*slot > 0).then_some(*slot);
                    *slot += 1;
                    if let Some(counter_key) = counter_key {
                        store.increment(counter_key, 1).await?;
                    }
                    self.service
                        .record_score_update(dimension, stat, *bound, entity_id, old_score, *slot)
                        .await?;
                }
                ReplayEvent::Observation {
                    dimension,
                    stat,
                    entity_id,
                    value,
                    direction,
                } => {
                    self.service
                        .record_observation(dimension, stat, entity_id, *value, *direction)
                        .await?;
                }
                ReplayEvent::CategoryIncrement {
                    dimension,
                    stat,
                    category,
                    rules,
                } => {
                    self.service
                        .record_category_increment(dimension, stat, category, rules)
                        .await?;
                }
            }
        }

        let report = ReconciliationReport {
            keys_reset: targets.len(),
            events_replayed: events.len(),
        };
        info!(
            keys_reset = report.keys_reset,
            events_replayed = report.events_replayed,
            "reconciliation rebuild complete"
        );
        Ok(report)
    }

    /// Every key a replay of `events` can write. Sorted for deterministic
    /// reset order.
    fn target_keys(&self, events: &[ReplayEvent]) -> BTreeSet<String> {
        let mut targets = BTreeSet::new();
        for event in events {
            match event {
                ReplayEvent::ScoreIncrement {
                    dimension,
                    stat,
                    bound,
                    counter_key,
                    ..
                } => {
                    targets.insert(keys::ranked_list(dimension, stat, *bound));
                    if let Some(counter_key) = counter_key {
                        targets.insert(counter_key.clone());
                    }
                }
                ReplayEvent::Observation {
                    dimension, stat, ..
                } => {
                    targets.insert(keys::extremum(dimension, stat));
                }
                ReplayEvent::CategoryIncrement {
                    dimension,
                    stat,
                    category,
                    rules,
                } => {
                    targets.insert(keys::category_count(dimension, stat, category));
                    for rule in rules {
                        targets.insert(keys::leader(dimension, stat, *rule));
                    }
                }
            }
        }
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::models::{ExtremumRecord, FrequencyLeader};
    use crate::analytics::service::AnalyticsConfig;
    use crate::store::{InMemoryKeyValueStore, KeyValueStore, Value};

    fn setup() -> (Arc<AnalyticsService>, ReconciliationBuilder) {
        let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::new());
        let service = Arc::new(AnalyticsService::new(store, AnalyticsConfig::default()));
        let builder = ReconciliationBuilder::new(service.clone());
        (service, builder)
    }

    fn win(entity: &str) -> ReplayEvent {
        ReplayEvent::ScoreIncrement {
            dimension: Dimension::Global,
            stat: keys::STAT_WINS.to_string(),
            bound: Bound::Top,
            entity_id: entity.to_string(),
            counter_key: Some(keys::player_wins(entity)),
        }
    }

    fn turns(game: &str, value: i64) -> ReplayEvent {
        ReplayEvent::Observation {
            dimension: Dimension::Global,
            stat: keys::STAT_SHORTEST_GAME.to_string(),
            entity_id: game.to_string(),
            value,
            direction: Direction::Min,
        }
    }

    fn opening(eco: &str) -> ReplayEvent {
        ReplayEvent::CategoryIncrement {
            dimension: Dimension::Global,
            stat: keys::STAT_OPENING.to_string(),
            category: eco.to_string(),
            rules: vec![LeaderRule::MostCommon],
        }
    }

    fn dataset() -> Vec<ReplayEvent> {
        vec![
            win("alice"),
            win("bob"),
            win("alice"),
            turns("g1", 40),
            turns("g2", 12),
            opening("A04"),
            opening("A04"),
            opening("B21"),
        ]
    }

    async fn derived_state(service: &AnalyticsService) -> (Vec<(String, i64)>, ExtremumRecord, FrequencyLeader)
    {
        let ranked = service
            .query_ranked(&Dimension::Global, keys::STAT_WINS, Bound::Top)
            .await
            .unwrap()
            .into_iter()
            .map(|e| (e.entity_id, e.score))
            .collect();
        let extremum = service
            .query_extremum(&Dimension::Global, keys::STAT_SHORTEST_GAME)
            .await
            .unwrap()
            .unwrap();
        let leader = service
            .query_leader(&Dimension::Global, keys::STAT_OPENING, LeaderRule::MostCommon)
            .await
            .unwrap()
            .unwrap();
        (ranked, extremum, leader)
    }

    #[tokio::test]
    async fn rebuild_matches_incremental_replay() {
        let (service, builder) = setup();
        builder.rebuild(&dataset()).await.unwrap();

        let (ranked, extremum, leader) = derived_state(&service).await;
        assert_eq!(
            ranked,
            vec![("alice".to_string(), 2), ("bob".to_string(), 1)]
        );
        assert_eq!(extremum.holder, "g2");
        assert_eq!(extremum.value, 12);
        assert_eq!(leader.category, "A04");
        assert_eq!(leader.count, 2);
    }

    #[tokio::test]
    async fn rebuild_twice_yields_identical_state() {
        let (service, builder) = setup();
        let events = dataset();

        let first_report = builder.rebuild(&events).await.unwrap();
        let first = derived_state(&service).await;
        let first_wins = service
            .store()
            .get(&keys::player_wins("alice"))
            .await
            .unwrap();

        let second_report = builder.rebuild(&events).await.unwrap();
        let second = derived_state(&service).await;
        let second_wins = service
            .store()
            .get(&keys::player_wins("alice"))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(first_report, second_report);
        assert_eq!(first_wins, second_wins);
        assert_eq!(second_wins, Some(Value::scalar("2")));
    }

    #[tokio::test]
    async fn rebuild_resets_stale_prior_state() {
        let (service, builder) = setup();

        // Stale derived state from an earlier, different run.
        service
            .record_score_update(&Dimension::Global, keys::STAT_WINS, Bound::Top, "zed", None, 99)
            .await
            .unwrap();

        builder.rebuild(&dataset()).await.unwrap();
        let (ranked, _, _) = derived_state(&service).await;
        assert!(ranked.iter().all(|(id, _)| id != "zed"));
    }
}
