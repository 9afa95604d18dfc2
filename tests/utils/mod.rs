#![allow(dead_code)] // Test utilities may not all be used in every test

use std::sync::Arc;

use clubstats::analytics::{AnalyticsConfig, AnalyticsService};
use clubstats::club::{ClubConfig, ClubService, GameOutcome, GameRecord, Player};
use clubstats::store::{InMemoryKeyValueStore, KeyValueStore};

pub struct TestSetup {
    pub store: Arc<dyn KeyValueStore>,
    pub analytics: Arc<AnalyticsService>,
    pub club: Arc<ClubService>,
}

pub struct TestSetupBuilder {
    analytics_config: AnalyticsConfig,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            analytics_config: AnalyticsConfig::default(),
        }
    }

    pub fn with_list_capacity(mut self, capacity: usize) -> Self {
        self.analytics_config.list_capacity = capacity;
        self
    }

    pub fn with_txn_attempts(mut self, attempts: u32) -> Self {
        self.analytics_config.max_txn_attempts = attempts;
        self
    }

    pub fn build(self) -> TestSetup {
        let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::new());
        let analytics = Arc::new(AnalyticsService::new(store.clone(), self.analytics_config));
        let club = Arc::new(ClubService::new(
            store.clone(),
            analytics.clone(),
            ClubConfig::default(),
        ));
        TestSetup {
            store,
            analytics,
            club,
        }
    }
}

pub fn player(pid: &str) -> Player {
    Player {
        user_id: pid.to_string(),
        email: format!("{pid}@example.com"),
    }
}

pub struct GameRecordBuilder {
    record: GameRecord,
}

impl GameRecordBuilder {
    pub fn new(game_id: &str, white: &str, black: &str) -> Self {
        Self {
            record: GameRecord {
                game_id: game_id.to_string(),
                moveset: ["d4", "d5", "c4", "e6"].iter().map(|m| m.to_string()).collect(),
                winner: GameOutcome::White,
                victory_status: "mate".to_string(),
                number_of_turns: 40,
                white_player_id: white.to_string(),
                black_player_id: black.to_string(),
                opening_eco: "D06".to_string(),
            },
        }
    }

    pub fn winner(mut self, winner: GameOutcome) -> Self {
        self.record.winner = winner;
        self
    }

    pub fn turns(mut self, turns: i64) -> Self {
        self.record.number_of_turns = turns;
        self
    }

    pub fn moveset(mut self, moves: &[&str]) -> Self {
        self.record.moveset = moves.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn opening(mut self, eco: &str) -> Self {
        self.record.opening_eco = eco.to_string();
        self
    }

    pub fn build(self) -> GameRecord {
        self.record
    }
}
