//! Domain layer for the board-game club: decomposes each mutation event
//! (player registered, game scheduled, game record inserted) into point
//! updates on the store and the analytics maintainers.

pub mod expiry;
pub mod friend_groups;
pub mod models;
pub mod moves;
pub mod service;

mod errors;

pub use errors::ClubError;
pub use friend_groups::FriendGroups;
pub use models::{GameOutcome, GameRecord, Player, ScheduledGame};
pub use service::{ClubConfig, ClubService};
