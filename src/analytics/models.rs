use serde::{Deserialize, Serialize};
use strum_macros::Display;

use super::AnalyticsError;

/// Scope over which an aggregate is tracked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dimension {
    Global,
    Player(String),
}

/// Which end of the score ordering a ranked list keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Bound {
    Top,
    Bottom,
}

impl Bound {
    /// True when `candidate` strictly beats `incumbent` for this bound.
    pub fn beats(&self, candidate: i64, incumbent: i64) -> bool {
        match self {
            Bound::Top => candidate > incumbent,
            Bound::Bottom => candidate < incumbent,
        }
    }
}

/// Which extreme an extremum record tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    Min,
    Max,
}

impl Direction {
    /// Strict comparison: equal values never count as better, so the first
    /// observed holder keeps the record on ties.
    pub fn better(&self, candidate: i64, incumbent: i64) -> bool {
        match self {
            Direction::Min => candidate < incumbent,
            Direction::Max => candidate > incumbent,
        }
    }
}

/// Governing rule for a frequency leader record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum LeaderRule {
    MostCommon,
    LeastCommon,
}

/// One entry of a bounded ranked list, persisted as `"{entity_id}:{score}"`
/// inside the list value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub entity_id: String,
    pub score: i64,
}

impl RankedEntry {
    pub fn new(entity_id: impl Into<String>, score: i64) -> Self {
        Self {
            entity_id: entity_id.into(),
            score,
        }
    }

    pub fn encode(&self) -> String {
        format!("{}:{}", self.entity_id, self.score)
    }

    pub fn decode(raw: &str, key: &str) -> Result<Self, AnalyticsError> {
        let (entity_id, score) =
            raw.rsplit_once(':')
                .ok_or_else(|| AnalyticsError::CorruptRecord {
                    key: key.to_string(),
                    reason: format!("ranked entry '{raw}' has no score separator"),
                })?;
        let score = score.parse().map_err(|_| AnalyticsError::CorruptRecord {
            key: key.to_string(),
            reason: format!("ranked entry '{raw}' has a non-numeric score"),
        })?;
        Ok(Self {
            entity_id: entity_id.to_string(),
            score,
        })
    }
}

/// The current record holder for a min/max dimension, stored as one JSON
/// scalar so holder and value always change together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtremumRecord {
    pub holder: String,
    pub value: i64,
}

/// The category currently leading a frequency dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyLeader {
    pub category: String,
    pub count: i64,
}
