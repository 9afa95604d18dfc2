use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub user_id: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledGame {
    pub game_id: String,
    pub player_1: String,
    pub player_2: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GameOutcome {
    White,
    Black,
    Draw,
}

/// A completed match record. `moveset` is already parsed; the CSV loader
/// handles the raw quasi-JSON form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRecord {
    pub game_id: String,
    pub moveset: Vec<String>,
    pub winner: GameOutcome,
    pub victory_status: String,
    pub number_of_turns: i64,
    pub white_player_id: String,
    pub black_player_id: String,
    pub opening_eco: String,
}
