use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clubstats::analytics::{AnalyticsConfig, AnalyticsService};
use clubstats::club::expiry::{start_expiry_sweep, ExpiryConfig};
use clubstats::club::{ClubConfig, ClubService};
use clubstats::loader::CsvLoader;
use clubstats::store::{InMemoryKeyValueStore, KeyValueStore};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clubstats=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let csv_dir: PathBuf = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("CSV_DIR").ok())
        .unwrap_or_else(|| "./csv_files".to_string())
        .into();

    info!(dir = %csv_dir.display(), "Starting club analytics bulk load");

    let store: Arc<dyn KeyValueStore> = Arc::new(InMemoryKeyValueStore::new());
    let analytics = Arc::new(AnalyticsService::new(store.clone(), AnalyticsConfig::default()));
    let club = Arc::new(ClubService::new(
        store.clone(),
        analytics.clone(),
        ClubConfig::default(),
    ));

    tokio::spawn(start_expiry_sweep(store.clone(), ExpiryConfig::default()));

    let loader = CsvLoader::new(club.clone());
    let report = match loader.load_dir(&csv_dir).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Bulk load failed");
            std::process::exit(1);
        }
    };

    info!(
        players_loaded = report.players.loaded,
        players_skipped = report.players.skipped,
        schedule_loaded = report.schedule.loaded,
        schedule_skipped = report.schedule.skipped,
        records_loaded = report.game_records.loaded,
        records_skipped = report.game_records.skipped,
        "Bulk load complete"
    );

    if let Err(e) = print_summary(&club).await {
        error!(error = %e, "Failed to read analytics summary");
        std::process::exit(1);
    }
}

async fn print_summary(club: &ClubService) -> Result<(), clubstats::ClubError> {
    if let Some(shortest) = club.shortest_game().await? {
        info!(
            game_id = %shortest.holder,
            turns = shortest.value,
            "Shortest game"
        );
    }
    if let Some(opening) = club.most_frequent_opening().await? {
        info!(eco = %opening.category, count = opening.count, "Most frequent opening");
    }
    for entry in club.top_wins().await? {
        info!(player = %entry.entity_id, wins = entry.score, "Top wins");
    }
    for entry in club.top_losses().await? {
        info!(player = %entry.entity_id, losses = entry.score, "Top losses");
    }
    if let Some(seq) = club.most_common_sequence().await? {
        info!(sequence = %seq.category, count = seq.count, "Most common 3-move sequence");
    }
    if let Some(seq) = club.least_common_sequence().await? {
        info!(sequence = %seq.category, count = seq.count, "Least common 3-move sequence");
    }
    let checks = club.game_check_counts().await?;
    info!(games = checks.len(), "Check counts available");
    Ok(())
}
