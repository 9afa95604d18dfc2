use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::instrument;

use super::friend_groups::FriendGroups;
use super::models::{GameOutcome, GameRecord, Player, ScheduledGame};
use super::{moves, ClubError};
use crate::analytics::{
    AnalyticsService, Bound, Dimension, Direction, ExtremumRecord, FrequencyLeader, LeaderRule,
    RankedEntry, ReplayEvent,
};
use crate::keys;
use crate::store::{KeyValueStore, Value};

#[derive(Debug, Clone)]
pub struct ClubConfig {
    /// How long a scheduled game's opponent entry stays readable.
    pub schedule_ttl: Duration,
    /// Bound on each player's scheduled-games index.
    pub scheduled_list_capacity: usize,
}

impl Default for ClubConfig {
    fn default() -> Self {
        Self {
            schedule_ttl: Duration::hours(72),
            scheduled_list_capacity: 200,
        }
    }
}

/// Handles the club's write events and queries. Each event fans out into
/// point store updates plus calls into the analytics maintainers; queries
/// read only maintained state, never the raw event history.
pub struct ClubService {
    store: Arc<dyn KeyValueStore>,
    analytics: Arc<AnalyticsService>,
    friend_groups: FriendGroups,
    config: ClubConfig,
}

impl ClubService {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        analytics: Arc<AnalyticsService>,
        config: ClubConfig,
    ) -> Self {
        Self {
            friend_groups: FriendGroups::new(store.clone()),
            store,
            analytics,
            config,
        }
    }

    pub fn analytics(&self) -> Arc<AnalyticsService> {
        self.analytics.clone()
    }

    /// Registers a new player. The player id must be unused.
    #[instrument(skip(self, player), fields(pid = %player.user_id))]
    pub async fn add_player(&self, player: &Player) -> Result<(), ClubError> {
        self.assert_player_is_new(&player.user_id).await?;

        let pid = &player.user_id;
        self.store
            .mset(vec![
                (keys::player_email(pid), Value::scalar(&player.email)),
                (keys::player_wins(pid), Value::int(0)),
                (keys::player_losses(pid), Value::int(0)),
                (keys::player_draws(pid), Value::int(0)),
            ])
            .await?;
        self.store
            .set_add(keys::GLOBAL_PLAYERS_EMAILS, &player.email)
            .await?;
        Ok(())
    }

    /// Records a newly scheduled game. The game id must be unused. The
    /// opponent entries expire after the configured TTL; the per-player
    /// index is bounded.
    #[instrument(skip(self, schedule), fields(gid = %schedule.game_id))]
    pub async fn add_schedule(&self, schedule: &ScheduledGame) -> Result<(), ClubError> {
        self.assert_game_is_new(&schedule.game_id).await?;

        let expires_at = Utc::now() + self.config.schedule_ttl;
        let gid = &schedule.game_id;
        self.store
            .set_with_expiry(
                &keys::player_scheduled_game_opponent(&schedule.player_1, gid),
                Value::scalar(&schedule.player_2),
                expires_at,
            )
            .await?;
        self.store
            .set_with_expiry(
                &keys::player_scheduled_game_opponent(&schedule.player_2, gid),
                Value::scalar(&schedule.player_1),
                expires_at,
            )
            .await?;

        for pid in [&schedule.player_1, &schedule.player_2] {
            let index = keys::player_scheduled_games(pid);
            self.store.list_push_front(&index, gid).await?;
            self.store
                .list_trim_front(&index, self.config.scheduled_list_capacity)
                .await?;
        }
        Ok(())
    }

    /// Inserts a completed game record and fans it out into every derived
    /// view. The game id must be unused.
    #[instrument(skip(self, record), fields(gid = %record.game_id))]
    pub async fn add_game_record(&self, record: &GameRecord) -> Result<(), ClubError> {
        self.assert_game_is_new(&record.game_id).await?;

        let sequences = moves::three_move_sequences(&record.moveset);

        self.update_player_keys(
            record,
            GameOutcome::White,
            &record.white_player_id,
            GameOutcome::Black,
            &record.black_player_id,
        )
        .await?;
        self.update_player_keys(
            record,
            GameOutcome::Black,
            &record.black_player_id,
            GameOutcome::White,
            &record.white_player_id,
        )
        .await?;

        self.update_game_keys(record).await?;

        for sequence in &sequences {
            self.analytics
                .record_category_increment(
                    &Dimension::Global,
                    keys::STAT_SEQ,
                    sequence,
                    &[LeaderRule::MostCommon, LeaderRule::LeastCommon],
                )
                .await?;
        }
        self.analytics
            .record_category_increment(
                &Dimension::Global,
                keys::STAT_OPENING,
                &record.opening_eco,
                &[LeaderRule::MostCommon],
            )
            .await?;
        self.analytics
            .record_observation(
                &Dimension::Global,
                keys::STAT_SHORTEST_GAME,
                &record.game_id,
                record.number_of_turns,
                Direction::Min,
            )
            .await?;

        self.friend_groups
            .link(&record.white_player_id, &record.black_player_id)
            .await?;
        Ok(())
    }

    async fn update_player_keys(
        &self,
        record: &GameRecord,
        player_color: GameOutcome,
        player_id: &str,
        opponent_color: GameOutcome,
        opponent_id: &str,
    ) -> Result<(), ClubError> {
        if record.winner == player_color {
            let wins = self.store.increment(&keys::player_wins(player_id), 1).await?;
            self.analytics
                .record_score_update(
                    &Dimension::Global,
                    keys::STAT_WINS,
                    Bound::Top,
                    player_id,
                    (wins > 1).then_some(wins - 1),
                    wins,
                )
                .await?;
        } else if record.winner == opponent_color {
            let losses = self
                .store
                .increment(&keys::player_losses(player_id), 1)
                .await?;
            self.analytics
                .record_score_update(
                    &Dimension::Global,
                    keys::STAT_LOSSES,
                    Bound::Top,
                    player_id,
                    (losses > 1).then_some(losses - 1),
                    losses,
                )
                .await?;
        } else {
            self.store.increment(&keys::player_draws(player_id), 1).await?;
        }

        self.store
            .list_push_back(&keys::player_games_list(player_id), &record.game_id)
            .await?;
        self.store
            .set_add(&keys::player_games_set(player_id), &record.game_id)
            .await?;
        self.store
            .set_add(&keys::player_opponents(player_id), opponent_id)
            .await?;

        // Openings count for both colors, single-move openings included.
        self.analytics
            .record_category_increment(
                &Dimension::Player(player_id.to_string()),
                keys::STAT_OPENING,
                &record.opening_eco,
                &[LeaderRule::MostCommon],
            )
            .await?;
        Ok(())
    }

    async fn update_game_keys(&self, record: &GameRecord) -> Result<(), ClubError> {
        let gid = &record.game_id;
        self.store
            .mset(vec![
                (keys::game_winner(gid), Value::scalar(record.winner.to_string())),
                (
                    keys::game_victory_status(gid),
                    Value::scalar(&record.victory_status),
                ),
                (keys::game_turns(gid), Value::int(record.number_of_turns)),
                (
                    keys::game_checks(gid),
                    Value::int(moves::count_checks(&record.moveset)),
                ),
                (
                    keys::game_white_player(gid),
                    Value::scalar(&record.white_player_id),
                ),
                (
                    keys::game_black_player(gid),
                    Value::scalar(&record.black_player_id),
                ),
                (
                    keys::game_opening_eco(gid),
                    Value::scalar(&record.opening_eco),
                ),
            ])
            .await?;
        for m in &record.moveset {
            self.store.list_push_back(&keys::game_moves(gid), m).await?;
        }
        Ok(())
    }

    async fn assert_player_is_new(&self, pid: &str) -> Result<(), ClubError> {
        if !self.store.set_add(keys::GLOBAL_PLAYERS_IDS, pid).await? {
            return Err(ClubError::NotUnique(pid.to_string()));
        }
        Ok(())
    }

    async fn assert_game_is_new(&self, gid: &str) -> Result<(), ClubError> {
        if !self.store.set_add(keys::GLOBAL_GAMES_IDS, gid).await? {
            return Err(ClubError::NotUnique(gid.to_string()));
        }
        Ok(())
    }

    // queries

    pub async fn match_history(&self, pid: &str) -> Result<Vec<String>, ClubError> {
        Ok(self.store.list_read(&keys::player_games_list(pid)).await?)
    }

    pub async fn scheduled_games(&self, pid: &str) -> Result<Vec<String>, ClubError> {
        Ok(self
            .store
            .list_read(&keys::player_scheduled_games(pid))
            .await?)
    }

    pub async fn scheduled_opponent(
        &self,
        pid: &str,
        gid: &str,
    ) -> Result<Option<String>, ClubError> {
        let key = keys::player_scheduled_game_opponent(pid, gid);
        match self.store.get(&key).await? {
            Some(value) => Ok(Some(value.as_scalar(&key)?.to_string())),
            None => Ok(None),
        }
    }

    pub async fn email_registered(&self, email: &str) -> Result<bool, ClubError> {
        Ok(self
            .store
            .set_contains(keys::GLOBAL_PLAYERS_EMAILS, email)
            .await?)
    }

    /// Games both players took part in, sorted.
    pub async fn shared_games(&self, pid1: &str, pid2: &str) -> Result<Vec<String>, ClubError> {
        let first = self.store.set_members(&keys::player_games_set(pid1)).await?;
        let second = self.store.set_members(&keys::player_games_set(pid2)).await?;
        Ok(first.intersection(&second).cloned().collect())
    }

    pub async fn opponents(&self, pid: &str) -> Result<Vec<String>, ClubError> {
        Ok(self
            .store
            .set_members(&keys::player_opponents(pid))
            .await?
            .into_iter()
            .collect())
    }

    pub async fn player_top_opening(
        &self,
        pid: &str,
    ) -> Result<Option<FrequencyLeader>, ClubError> {
        Ok(self
            .analytics
            .query_leader(
                &Dimension::Player(pid.to_string()),
                keys::STAT_OPENING,
                LeaderRule::MostCommon,
            )
            .await?)
    }

    pub async fn top_wins(&self) -> Result<Vec<RankedEntry>, ClubError> {
        Ok(self
            .analytics
            .query_ranked(&Dimension::Global, keys::STAT_WINS, Bound::Top)
            .await?)
    }

    pub async fn top_losses(&self) -> Result<Vec<RankedEntry>, ClubError> {
        Ok(self
            .analytics
            .query_ranked(&Dimension::Global, keys::STAT_LOSSES, Bound::Top)
            .await?)
    }

    pub async fn shortest_game(&self) -> Result<Option<ExtremumRecord>, ClubError> {
        Ok(self
            .analytics
            .query_extremum(&Dimension::Global, keys::STAT_SHORTEST_GAME)
            .await?)
    }

    pub async fn most_frequent_opening(&self) -> Result<Option<FrequencyLeader>, ClubError> {
        Ok(self
            .analytics
            .query_leader(&Dimension::Global, keys::STAT_OPENING, LeaderRule::MostCommon)
            .await?)
    }

    pub async fn most_common_sequence(&self) -> Result<Option<FrequencyLeader>, ClubError> {
        Ok(self
            .analytics
            .query_leader(&Dimension::Global, keys::STAT_SEQ, LeaderRule::MostCommon)
            .await?)
    }

    pub async fn least_common_sequence(&self) -> Result<Option<FrequencyLeader>, ClubError> {
        Ok(self
            .analytics
            .query_leader(&Dimension::Global, keys::STAT_SEQ, LeaderRule::LeastCommon)
            .await?)
    }

    /// Check count for every recorded game, keyed by game id.
    pub async fn game_check_counts(&self) -> Result<BTreeMap<String, i64>, ClubError> {
        let mut counts = BTreeMap::new();
        for key in self.store.scan_prefix(keys::GAME_CHECKS_PREFIX).await? {
            let Some(gid) = key
                .strip_prefix(keys::GAME_CHECKS_PREFIX)
                .and_then(|rest| rest.strip_suffix(keys::GAME_CHECKS_SUFFIX))
            else {
                continue;
            };
            if let Some(value) = self.store.get(&key).await? {
                counts.insert(gid.to_string(), value.as_i64(&key)?);
            }
        }
        Ok(counts)
    }

    /// Translates historical game records into the replay events the
    /// reconciliation builder consumes, in the same per-record order the
    /// live path applies them.
    pub fn replay_events(records: &[GameRecord]) -> Vec<ReplayEvent> {
        let mut events = Vec::new();
        for record in records {
            for (color, pid) in [
                (GameOutcome::White, &record.white_player_id),
                (GameOutcome::Black, &record.black_player_id),
            ] {
                match record.winner {
                    winner if winner == color => events.push(ReplayEvent::ScoreIncrement {
                        dimension: Dimension::Global,
                        stat: keys::STAT_WINS.to_string(),
                        bound: Bound::Top,
                        entity_id: pid.clone(),
                        counter_key: Some(keys::player_wins(pid)),
                    }),
                    GameOutcome::Draw => {}
                    _ => events.push(ReplayEvent::ScoreIncrement {
                        dimension: Dimension::Global,
                        stat: keys::STAT_LOSSES.to_string(),
                        bound: Bound::Top,
                        entity_id: pid.clone(),
                        counter_key: Some(keys::player_losses(pid)),
                    }),
                }
                events.push(ReplayEvent::CategoryIncrement {
                    dimension: Dimension::Player(pid.clone()),
                    stat: keys::STAT_OPENING.to_string(),
                    category: record.opening_eco.clone(),
                    rules: vec![LeaderRule::MostCommon],
                });
            }
            for sequence in moves::three_move_sequences(&record.moveset) {
                events.push(ReplayEvent::CategoryIncrement {
                    dimension: Dimension::Global,
                    stat: keys::STAT_SEQ.to_string(),
                    category: sequence,
                    rules: vec![LeaderRule::MostCommon, LeaderRule::LeastCommon],
                });
            }
            events.push(ReplayEvent::CategoryIncrement {
                dimension: Dimension::Global,
                stat: keys::STAT_OPENING.to_string(),
                category: record.opening_eco.clone(),
                rules: vec![LeaderRule::MostCommon],
            });
            events.push(ReplayEvent::Observation {
                dimension: Dimension::Global,
                stat: keys::STAT_SHORTEST_GAME.to_string(),
                entity_id: record.game_id.clone(),
                value: record.number_of_turns,
                direction: Direction::Min,
            });
        }
        events
    }
}
