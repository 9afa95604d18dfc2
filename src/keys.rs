//! Key schema for everything persisted in the store. All keys are built here
//! so the layout stays in one place; do not format keys inline elsewhere.

use crate::analytics::models::{Bound, Dimension, LeaderRule};

// Statistic names used by the analytics layer.
pub const STAT_WINS: &str = "wins";
pub const STAT_LOSSES: &str = "losses";
pub const STAT_OPENING: &str = "opening";
pub const STAT_SEQ: &str = "seq";
pub const STAT_SHORTEST_GAME: &str = "shortest_game";

/// Scope prefix for derived analytics records of a dimension.
fn scope(dimension: &Dimension) -> String {
    match dimension {
        Dimension::Global => "analytics".to_string(),
        Dimension::Player(pid) => format!("player:{pid}"),
    }
}

/// Scope prefix for the raw category counters feeding a dimension.
fn counter_scope(dimension: &Dimension) -> String {
    match dimension {
        Dimension::Global => "global".to_string(),
        Dimension::Player(pid) => format!("player:{pid}"),
    }
}

pub fn ranked_list(dimension: &Dimension, stat: &str, bound: Bound) -> String {
    let side = match bound {
        Bound::Top => "top",
        Bound::Bottom => "bottom",
    };
    format!("{}:{side}_{stat}", scope(dimension))
}

pub fn extremum(dimension: &Dimension, stat: &str) -> String {
    format!("{}:{stat}", scope(dimension))
}

pub fn leader(dimension: &Dimension, stat: &str, rule: LeaderRule) -> String {
    let side = match rule {
        LeaderRule::MostCommon => "most_freq",
        LeaderRule::LeastCommon => "least_freq",
    };
    format!("{}:{side}_{stat}", scope(dimension))
}

pub fn category_count(dimension: &Dimension, stat: &str, category: &str) -> String {
    format!("{}:{stat}s:{category}:count", counter_scope(dimension))
}

// player

pub fn player_email(pid: &str) -> String {
    format!("player:{pid}:email")
}

pub fn player_wins(pid: &str) -> String {
    format!("player:{pid}:number_of_wins")
}

pub fn player_losses(pid: &str) -> String {
    format!("player:{pid}:number_of_losses")
}

pub fn player_draws(pid: &str) -> String {
    format!("player:{pid}:number_of_draws")
}

pub fn player_games_list(pid: &str) -> String {
    format!("player:{pid}:games-list")
}

pub fn player_games_set(pid: &str) -> String {
    format!("player:{pid}:games-set")
}

pub fn player_opponents(pid: &str) -> String {
    format!("player:{pid}:opponents")
}

pub fn player_friend_group(pid: &str) -> String {
    format!("player:{pid}:friend_group")
}

pub fn player_scheduled_games(pid: &str) -> String {
    format!("player:{pid}:scheduled_games")
}

pub fn player_scheduled_game_opponent(pid: &str, gid: &str) -> String {
    format!("player:{pid}:scheduled_games:{gid}:opponent")
}

// game

pub fn game_winner(gid: &str) -> String {
    format!("game:{gid}:winner")
}

pub fn game_victory_status(gid: &str) -> String {
    format!("game:{gid}:victory_status")
}

pub fn game_turns(gid: &str) -> String {
    format!("game:{gid}:number_of_turns")
}

pub fn game_checks(gid: &str) -> String {
    format!("game:{gid}:number_of_checks")
}

pub fn game_white_player(gid: &str) -> String {
    format!("game:{gid}:white_player_id")
}

pub fn game_black_player(gid: &str) -> String {
    format!("game:{gid}:black_player_id")
}

pub fn game_opening_eco(gid: &str) -> String {
    format!("game:{gid}:opening_eco")
}

pub fn game_moves(gid: &str) -> String {
    format!("game:{gid}:moves")
}

pub const GAME_CHECKS_PREFIX: &str = "game:";
pub const GAME_CHECKS_SUFFIX: &str = ":number_of_checks";

// global

pub const GLOBAL_PLAYERS_EMAILS: &str = "global:players:emails";
pub const GLOBAL_PLAYERS_IDS: &str = "global:players:ids";
pub const GLOBAL_GAMES_IDS: &str = "global:games:ids";

pub fn friend_group(fid: &str) -> String {
    format!("global:friend_group:{fid}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_analytics_keys_live_under_analytics_prefix() {
        assert_eq!(
            ranked_list(&Dimension::Global, STAT_WINS, Bound::Top),
            "analytics:top_wins"
        );
        assert_eq!(
            extremum(&Dimension::Global, STAT_SHORTEST_GAME),
            "analytics:shortest_game"
        );
        assert_eq!(
            leader(&Dimension::Global, STAT_OPENING, LeaderRule::MostCommon),
            "analytics:most_freq_opening"
        );
        assert_eq!(
            leader(&Dimension::Global, STAT_SEQ, LeaderRule::LeastCommon),
            "analytics:least_freq_seq"
        );
    }

    #[test]
    fn per_player_keys_embed_the_player_id() {
        let dim = Dimension::Player("akshat".to_string());
        assert_eq!(
            leader(&dim, STAT_OPENING, LeaderRule::MostCommon),
            "player:akshat:most_freq_opening"
        );
        assert_eq!(
            category_count(&dim, STAT_OPENING, "B21"),
            "player:akshat:openings:B21:count"
        );
    }

    #[test]
    fn global_counters_live_under_global_prefix() {
        assert_eq!(
            category_count(&Dimension::Global, STAT_SEQ, "d4,d5,c4"),
            "global:seqs:d4,d5,c4:count"
        );
    }
}
