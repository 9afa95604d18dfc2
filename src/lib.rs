// Library crate for the club analytics engine
// This file exposes the public API for integration tests

pub mod analytics;
pub mod club;
pub mod keys;
pub mod loader;
pub mod store;

// Re-export commonly used types for easier access in tests
pub use analytics::{
    AnalyticsConfig, AnalyticsService, Bound, Dimension, Direction, ExtremumRecord,
    FrequencyLeader, LeaderRule, RankedEntry, ReconciliationBuilder, ReplayEvent,
};
pub use club::{ClubConfig, ClubError, ClubService, GameOutcome, GameRecord, Player, ScheduledGame};
pub use loader::{CsvLoader, DirectoryReport, LoadError, LoadReport};
pub use store::{InMemoryKeyValueStore, KeyValueStore, StoreError, Value};
