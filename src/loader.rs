//! Bulk ingestion of the club's historical CSV datasets. Rows stream through
//! the same write entry points as live events; rows failing domain
//! validation (duplicate ids, malformed movesets) are skipped and counted,
//! anything else aborts the load.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::club::{ClubError, ClubService, GameOutcome, GameRecord, Player, ScheduledGame};
use crate::club::moves;

pub const PLAYERS_CSV: &str = "players.csv";
pub const SCHEDULE_CSV: &str = "schedule.csv";
pub const GAME_RECORDS_CSV: &str = "game_records.csv";

const PROGRESS_EVERY: usize = 500;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("'{0}' is missing or not a CSV file")]
    InvalidPath(PathBuf),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Write error: {0}")]
    Club(#[from] ClubError),
}

/// Outcome of loading one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirectoryReport {
    pub players: LoadReport,
    pub schedule: LoadReport,
    pub game_records: LoadReport,
}

#[derive(Debug, Deserialize)]
struct PlayerRow {
    user_id: String,
    email: String,
}

#[derive(Debug, Deserialize)]
struct ScheduleRow {
    game_id: String,
    player_1: String,
    player_2: String,
}

#[derive(Debug, Deserialize)]
struct GameRecordRow {
    game_id: String,
    moveset: String,
    winner: GameOutcome,
    victory_status: String,
    number_of_turns: i64,
    white_player_id: String,
    black_player_id: String,
    opening_eco: String,
}

pub struct CsvLoader {
    club: Arc<ClubService>,
}

impl CsvLoader {
    pub fn new(club: Arc<ClubService>) -> Self {
        Self { club }
    }

    /// Loads `players.csv`, `schedule.csv`, and `game_records.csv` from
    /// `dir`, in that order (players before the records that reference them).
    #[instrument(skip(self))]
    pub async fn load_dir(&self, dir: &Path) -> Result<DirectoryReport, LoadError> {
        let players = self.load_players(&csv_path(dir, PLAYERS_CSV)?).await?;
        let schedule = self.load_schedule(&csv_path(dir, SCHEDULE_CSV)?).await?;
        let game_records = self
            .load_game_records(&csv_path(dir, GAME_RECORDS_CSV)?)
            .await?;
        Ok(DirectoryReport {
            players,
            schedule,
            game_records,
        })
    }

    pub async fn load_players(&self, path: &Path) -> Result<LoadReport, LoadError> {
        let mut report = LoadReport::default();
        let mut reader = csv::Reader::from_path(path)?;
        for (index, row) in reader.deserialize::<PlayerRow>().enumerate() {
            let row = row?;
            let player = Player {
                user_id: row.user_id,
                email: row.email,
            };
            self.apply(PLAYERS_CSV, &mut report, self.club.add_player(&player).await)?;
            log_progress(PLAYERS_CSV, index);
        }
        log_done(PLAYERS_CSV, &report);
        Ok(report)
    }

    pub async fn load_schedule(&self, path: &Path) -> Result<LoadReport, LoadError> {
        let mut report = LoadReport::default();
        let mut reader = csv::Reader::from_path(path)?;
        for (index, row) in reader.deserialize::<ScheduleRow>().enumerate() {
            let row = row?;
            let schedule = ScheduledGame {
                game_id: row.game_id,
                player_1: row.player_1,
                player_2: row.player_2,
            };
            self.apply(
                SCHEDULE_CSV,
                &mut report,
                self.club.add_schedule(&schedule).await,
            )?;
            log_progress(SCHEDULE_CSV, index);
        }
        log_done(SCHEDULE_CSV, &report);
        Ok(report)
    }

    pub async fn load_game_records(&self, path: &Path) -> Result<LoadReport, LoadError> {
        let mut report = LoadReport::default();
        let mut reader = csv::Reader::from_path(path)?;
        for (index, row) in reader.deserialize::<GameRecordRow>().enumerate() {
            let row = row?;
            let result = self.insert_record(row).await;
            self.apply(GAME_RECORDS_CSV, &mut report, result)?;
            log_progress(GAME_RECORDS_CSV, index);
        }
        log_done(GAME_RECORDS_CSV, &report);
        Ok(report)
    }

    async fn insert_record(&self, row: GameRecordRow) -> Result<(), ClubError> {
        let record = GameRecord {
            moveset: moves::parse_moveset(&row.moveset)?,
            game_id: row.game_id,
            winner: row.winner,
            victory_status: row.victory_status,
            number_of_turns: row.number_of_turns,
            white_player_id: row.white_player_id,
            black_player_id: row.black_player_id,
            opening_eco: row.opening_eco,
        };
        self.club.add_game_record(&record).await
    }

    /// Domain validation failures skip the row; infrastructure failures
    /// abort the load.
    fn apply(
        &self,
        label: &str,
        report: &mut LoadReport,
        result: Result<(), ClubError>,
    ) -> Result<(), LoadError> {
        match result {
            Ok(()) => {
                report.loaded += 1;
                Ok(())
            }
            Err(err @ (ClubError::NotUnique(_) | ClubError::InvalidMoveset(_))) => {
                warn!(file = label, error = %err, "skipping row");
                report.skipped += 1;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn csv_path(dir: &Path, name: &str) -> Result<PathBuf, LoadError> {
    let path = dir.join(name);
    let is_csv = path.extension().map_or(false, |ext| ext == "csv");
    if !path.is_file() || !is_csv {
        return Err(LoadError::InvalidPath(path));
    }
    Ok(path)
}

fn log_progress(label: &str, index: usize) {
    if (index + 1) % PROGRESS_EVERY == 0 {
        info!(file = label, processed = index + 1, "load progress");
    }
}

fn log_done(label: &str, report: &LoadReport) {
    info!(
        file = label,
        loaded = report.loaded,
        skipped = report.skipped,
        "file load complete"
    );
}
