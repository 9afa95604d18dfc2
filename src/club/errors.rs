use thiserror::Error;

use crate::analytics::AnalyticsError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ClubError {
    /// An entity was created with an identifier that is already taken.
    #[error("Identifier '{0}' is already taken")]
    NotUnique(String),

    #[error("Invalid moveset: {0}")]
    InvalidMoveset(String),

    #[error("Unknown game outcome '{0}'")]
    UnknownOutcome(String),

    #[error("Analytics error: {0}")]
    Analytics(#[from] AnalyticsError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
