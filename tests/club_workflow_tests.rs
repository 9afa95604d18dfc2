mod utils;

use std::io::Write;

use clubstats::analytics::{Bound, Dimension, ReconciliationBuilder};
use clubstats::store::KeyValueStore;
use clubstats::club::{ClubService, GameOutcome};
use clubstats::keys;
use clubstats::loader::CsvLoader;

use utils::{player, GameRecordBuilder, TestSetupBuilder};

#[tokio::test]
async fn full_event_stream_supports_all_queries() {
    let setup = TestSetupBuilder::new().build();

    for pid in ["carl", "dora", "sam"] {
        setup.club.add_player(&player(pid)).await.unwrap();
    }

    let games = [
        GameRecordBuilder::new("g1", "carl", "dora").turns(40).build(),
        GameRecordBuilder::new("g2", "carl", "sam")
            .turns(25)
            .opening("B21")
            .build(),
        GameRecordBuilder::new("g3", "dora", "carl")
            .winner(GameOutcome::Black)
            .turns(31)
            .build(),
    ];
    for game in &games {
        setup.club.add_game_record(game).await.unwrap();
    }

    assert!(setup.club.email_registered("carl@example.com").await.unwrap());
    assert_eq!(
        setup.club.match_history("carl").await.unwrap(),
        vec!["g1", "g2", "g3"]
    );
    assert_eq!(
        setup.club.shared_games("carl", "dora").await.unwrap(),
        vec!["g1", "g3"]
    );

    let top_wins = setup.club.top_wins().await.unwrap();
    assert_eq!(top_wins[0].entity_id, "carl");
    assert_eq!(top_wins[0].score, 3);

    let shortest = setup.club.shortest_game().await.unwrap().unwrap();
    assert_eq!(shortest.holder, "g2");
    assert_eq!(shortest.value, 25);

    let opening = setup.club.most_frequent_opening().await.unwrap().unwrap();
    assert_eq!(opening.category, "D06");
    assert_eq!(opening.count, 2); // counted once per record

    let carl_opening = setup.club.player_top_opening("carl").await.unwrap().unwrap();
    assert_eq!(carl_opening.category, "D06");
    assert_eq!(carl_opening.count, 2);
}

#[tokio::test]
async fn reconciliation_rebuild_matches_live_ingestion() {
    let live = TestSetupBuilder::new().build();
    let rebuilt = TestSetupBuilder::new().build();

    let games = [
        GameRecordBuilder::new("g1", "a", "b").turns(40).build(),
        GameRecordBuilder::new("g2", "a", "c")
            .turns(12)
            .opening("B21")
            .build(),
        GameRecordBuilder::new("g3", "b", "a")
            .winner(GameOutcome::Black)
            .turns(55)
            .build(),
    ];

    for game in &games {
        live.club.add_game_record(game).await.unwrap();
    }

    let events = ClubService::replay_events(&games);
    let builder = ReconciliationBuilder::new(rebuilt.analytics.clone());
    builder.rebuild(&events).await.unwrap();
    // Rebuild is idempotent: a second run must not change anything.
    builder.rebuild(&events).await.unwrap();

    for (dim, stat) in [
        (Dimension::Global, keys::STAT_WINS),
        (Dimension::Global, keys::STAT_LOSSES),
    ] {
        let from_live = live
            .analytics
            .query_ranked(&dim, stat, Bound::Top)
            .await
            .unwrap();
        let from_rebuild = rebuilt
            .analytics
            .query_ranked(&dim, stat, Bound::Top)
            .await
            .unwrap();
        assert_eq!(from_live, from_rebuild);
    }

    assert_eq!(
        live.analytics
            .query_extremum(&Dimension::Global, keys::STAT_SHORTEST_GAME)
            .await
            .unwrap(),
        rebuilt
            .analytics
            .query_extremum(&Dimension::Global, keys::STAT_SHORTEST_GAME)
            .await
            .unwrap()
    );
    assert_eq!(
        live.club.most_frequent_opening().await.unwrap(),
        rebuilt.club.most_frequent_opening().await.unwrap()
    );
    assert_eq!(
        live.club.most_common_sequence().await.unwrap(),
        rebuilt.club.most_common_sequence().await.unwrap()
    );
    assert_eq!(
        live.club.least_common_sequence().await.unwrap(),
        rebuilt.club.least_common_sequence().await.unwrap()
    );
}

#[tokio::test]
async fn csv_load_skips_duplicates_on_rerun() {
    let setup = TestSetupBuilder::new().build();
    let dir = tempfile::tempdir().unwrap();

    let mut players = std::fs::File::create(dir.path().join("players.csv")).unwrap();
    writeln!(players, "user_id,email").unwrap();
    writeln!(players, "carl,carl@example.com").unwrap();
    writeln!(players, "dora,dora@example.com").unwrap();
    drop(players);

    let mut schedule = std::fs::File::create(dir.path().join("schedule.csv")).unwrap();
    writeln!(schedule, "game_id,player_1,player_2").unwrap();
    writeln!(schedule, "s1,carl,dora").unwrap();
    drop(schedule);

    let mut records = std::fs::File::create(dir.path().join("game_records.csv")).unwrap();
    writeln!(
        records,
        "game_id,moveset,winner,victory_status,number_of_turns,white_player_id,black_player_id,opening_eco"
    )
    .unwrap();
    writeln!(
        records,
        "g1,\"['d4', 'd5', 'c4']\",white,mate,30,carl,dora,D06"
    )
    .unwrap();
    writeln!(records, "g2,not-a-list,white,mate,30,carl,dora,D06").unwrap();
    drop(records);

    let loader = CsvLoader::new(setup.club.clone());

    let first = loader.load_dir(dir.path()).await.unwrap();
    assert_eq!(first.players.loaded, 2);
    assert_eq!(first.schedule.loaded, 1);
    assert_eq!(first.game_records.loaded, 1);
    assert_eq!(first.game_records.skipped, 1); // malformed moveset

    let wins_before = setup.club.top_wins().await.unwrap();

    // Re-running the same files must not double-count anything.
    let second = loader.load_dir(dir.path()).await.unwrap();
    assert_eq!(second.players.loaded, 0);
    assert_eq!(second.players.skipped, 2);
    assert_eq!(second.schedule.skipped, 1);
    assert_eq!(second.game_records.loaded, 0);
    assert_eq!(second.game_records.skipped, 2);

    assert_eq!(setup.club.top_wins().await.unwrap(), wins_before);
}

#[tokio::test]
async fn scheduled_games_expire_from_queries() {
    let setup = TestSetupBuilder::new().build();

    setup
        .club
        .add_schedule(&clubstats::ScheduledGame {
            game_id: "future".to_string(),
            player_1: "carl".to_string(),
            player_2: "dora".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(
        setup.club.scheduled_opponent("carl", "future").await.unwrap(),
        Some("dora".to_string())
    );

    // Nothing is due yet, so a sweep drops nothing.
    assert_eq!(setup.store.sweep_expired().await.unwrap(), 0);
}
