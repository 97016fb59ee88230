//! Integration tests for the sesh loading, aggregation and statistics pipeline
//!
//! Export files are generated into temporary directories so each test
//! controls exactly which plays the loader sees.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use serde_json::{json, Value};
use sesh_core::aggregate::{AggregateSnapshot, Aggregator};
use sesh_core::analytics::{distribution, on_this_day, streaks};
use sesh_core::config::FilterConfig;
use sesh_core::ingest::{EventFilter, HistoryLoader, LoadStats};
use sesh_core::intern::EntityInterner;
use sesh_core::{Config, Dimension, PlayEvent, ReportContext, ReportOutcome, Scope};
use std::collections::BTreeMap;
use std::path::Path;
use tempfile::TempDir;

// ============================================
// Fixtures
// ============================================

struct Play {
    ts: DateTime<Utc>,
    track: &'static str,
    artist: &'static str,
    album: &'static str,
    ms: u64,
}

fn play(ts: DateTime<Utc>, track: &'static str, artist: &'static str, ms: u64) -> Play {
    Play {
        ts,
        track,
        artist,
        album: "Album",
        ms,
    }
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn record(play: &Play) -> Value {
    json!({
        "ts": play.ts.to_rfc3339(),
        "ms_played": play.ms,
        "master_metadata_track_name": play.track,
        "master_metadata_album_artist_name": play.artist,
        "master_metadata_album_album_name": play.album,
        "platform": "android",
        "offline": false,
        "skipped": false,
        "spotify_track_uri": format!("spotify:track:{}", play.track.to_lowercase())
    })
}

/// Write `plays` into one export file per chunk of `per_file`.
fn export_dir(plays: &[Play], per_file: usize) -> TempDir {
    let dir = TempDir::new().expect("failed to create temp dir");
    for (index, chunk) in plays.chunks(per_file.max(1)).enumerate() {
        let records: Vec<Value> = chunk.iter().map(record).collect();
        std::fs::write(
            dir.path()
                .join(format!("Streaming_History_Audio_{index:02}.json")),
            serde_json::to_string(&records).unwrap(),
        )
        .expect("failed to write export file");
    }
    dir
}

fn load(dir: &Path, filter: EventFilter) -> (AggregateSnapshot, LoadStats) {
    let mut stream = HistoryLoader::new(dir, filter)
        .events()
        .expect("input directory should be readable");
    let mut aggregator = Aggregator::new();
    for event in &mut stream {
        aggregator.accumulate(&event);
    }
    (aggregator.finalize(), stream.into_stats())
}

fn filter(min_ms_played: u64, min_year: Option<i32>) -> EventFilter {
    EventFilter {
        min_ms_played,
        min_year,
        now: Utc::now(),
    }
}

/// Totals keyed by label instead of id, so snapshots built in different
/// orders can be compared.
fn totals_by_label(snapshot: &AggregateSnapshot) -> BTreeMap<(String, String, String), (u64, u64)> {
    let mut out = BTreeMap::new();
    for dimension in Dimension::ALL {
        for scope in snapshot.buckets().scopes(dimension).collect::<Vec<_>>() {
            for (id, totals) in snapshot.buckets().entries(dimension, scope) {
                out.insert(
                    (
                        dimension.to_string(),
                        scope.key(),
                        snapshot.label(dimension, id).to_string(),
                    ),
                    (totals.ms_played, totals.play_count),
                );
            }
        }
    }
    out
}

// ============================================
// Aggregation Invariants
// ============================================

#[test]
fn test_all_scope_counts_match_retained_events() {
    let plays = vec![
        play(at(2023, 1, 1, 8, 0), "One", "Alpha", 60_000),
        play(at(2023, 1, 1, 9, 0), "Two", "Alpha", 90_000),
        play(at(2023, 1, 2, 9, 0), "One", "Alpha", 45_000),
        play(at(2023, 2, 1, 9, 0), "Three", "Beta", 120_000),
        play(at(2024, 2, 1, 9, 0), "Four", "Gamma", 10_000),
        // Filtered by duration
        play(at(2024, 2, 2, 9, 0), "Four", "Gamma", 5_000),
    ];
    let dir = export_dir(&plays, 2);
    let (snapshot, stats) = load(dir.path(), filter(8_000, None));

    assert_eq!(stats.files_read, 3);
    assert_eq!(stats.records_yielded, 5);
    assert_eq!(stats.filtered_by_duration, 1);
    for dimension in Dimension::ALL {
        let total = snapshot.buckets().total(dimension, Scope::All);
        assert_eq!(total.play_count, stats.records_yielded, "{dimension}");
        assert_eq!(total.ms_played, 325_000, "{dimension}");
    }

    let yearly: u64 = snapshot
        .years()
        .into_iter()
        .map(|year| snapshot.buckets().total(Dimension::Artist, Scope::Year(year)).play_count)
        .sum();
    assert_eq!(yearly, stats.records_yielded);
}

#[test]
fn test_duplicate_records_across_files_count_once() {
    let plays = vec![
        play(at(2023, 5, 1, 8, 0), "One", "Alpha", 60_000),
        play(at(2023, 5, 1, 8, 0), "One", "Alpha", 60_000),
    ];
    let dir = export_dir(&plays, 1);
    let (snapshot, stats) = load(dir.path(), filter(0, None));

    assert_eq!(stats.duplicates, 1);
    assert_eq!(snapshot.buckets().total(Dimension::Track, Scope::All).play_count, 1);
}

#[derive(Debug, Clone)]
struct GeneratedPlay {
    track: u8,
    artist: u8,
    day: u32,
    ms: u64,
}

fn generated_event(play: &GeneratedPlay) -> PlayEvent {
    PlayEvent {
        timestamp: Utc.with_ymd_and_hms(2022, 12, 1, 12, 0, 0).unwrap() + Duration::days(play.day as i64),
        track_label: Some(format!("Track {}", play.track)),
        artist_label: Some(format!("Artist {}", play.artist)),
        album_label: Some(format!("Album {}", play.artist)),
        ms_played: play.ms,
        platform: None,
        offline: false,
        skipped: false,
        track_uri: None,
    }
}

fn generated_plays() -> impl Strategy<Value = Vec<GeneratedPlay>> {
    prop::collection::vec(
        (0u8..5, 0u8..3, 0u32..60, 1u64..400_000).prop_map(|(track, artist, day, ms)| {
            GeneratedPlay {
                track,
                artist,
                day,
                ms,
            }
        }),
        1..80,
    )
}

proptest! {
    #[test]
    fn test_aggregation_is_order_independent(
        (plays, shuffled) in generated_plays()
            .prop_flat_map(|plays| (Just(plays.clone()), Just(plays).prop_shuffle()))
    ) {
        let mut forward = Aggregator::new();
        for play in &plays {
            forward.accumulate(&generated_event(play));
        }
        let mut reordered = Aggregator::new();
        for play in &shuffled {
            reordered.accumulate(&generated_event(play));
        }

        let forward = forward.finalize();
        let reordered = reordered.finalize();
        prop_assert_eq!(totals_by_label(&forward), totals_by_label(&reordered));
        prop_assert_eq!(forward.days(), reordered.days());
    }
}

// ============================================
// Interning
// ============================================

#[test]
fn test_interning_is_idempotent_and_collapses_unknowns() {
    let mut interner = EntityInterner::new();
    let first = interner.intern(Dimension::Artist, Some("Alpha"));
    assert_eq!(interner.intern(Dimension::Artist, Some("Alpha")), first);
    assert_eq!(interner.intern(Dimension::Artist, Some("  Alpha ")), first);

    let unknown = interner.intern(Dimension::Artist, None);
    assert_eq!(interner.intern(Dimension::Artist, Some("")), unknown);
    assert_eq!(interner.intern(Dimension::Artist, Some("   ")), unknown);
    assert_ne!(unknown, first);
    assert_eq!(interner.label(Dimension::Artist, unknown), Some("Unknown Artist"));
    assert_eq!(interner.len(Dimension::Artist), 2);
}

// ============================================
// Distribution
// ============================================

#[test]
fn test_gini_bounds() {
    assert!(distribution::gini(&[7, 7, 7, 7]).abs() < 1e-9);
    let single_holder = distribution::gini(&[0, 0, 0, 0, 50]);
    assert!((single_holder - (1.0 - 1.0 / 5.0)).abs() < 1e-9);
}

// ============================================
// Filters
// ============================================

#[test]
fn test_min_year_drops_earlier_plays() {
    let plays: Vec<Play> = (2019..=2024)
        .map(|year| play(at(year, 6, 1, 12, 0), "Yearly", "Alpha", 100_000))
        .collect();
    let dir = export_dir(&plays, 10);

    let mut config = Config::default();
    config.filters = FilterConfig {
        min_ms_played: 0,
        min_year: Some(2022),
    };
    let mut context = ReportContext::new(config).with_as_of(date(2024, 12, 31));
    let report = context
        .generate(dir.path(), |_, _, _| {})
        .unwrap()
        .into_report()
        .unwrap();

    assert_eq!(report.load_stats.filtered_by_year, 3);
    assert!(report.daily.keys().all(|day| day.as_str() >= "2022-01-01"));
    assert!(report.tables.contains_key("artist-table-2022"));
    assert!(!report.tables.contains_key("artist-table-2021"));
    assert_eq!(report.stats.tracks.total_plays, 3);
}

#[test]
fn test_out_of_range_min_year_disables_filter() {
    let config = FilterConfig {
        min_ms_played: 0,
        min_year: Some(1800),
    };
    assert_eq!(EventFilter::from_config(&config).min_year, None);
}

#[test]
fn test_min_duration_threshold() {
    let plays = vec![
        play(at(2024, 1, 1, 8, 0), "Silent", "Alpha", 0),
        play(at(2024, 1, 1, 9, 0), "Blink", "Alpha", 1),
    ];
    let dir = export_dir(&plays, 10);
    let (snapshot, stats) = load(dir.path(), filter(0, None));

    assert_eq!(stats.records_yielded, 1);
    assert_eq!(stats.filtered_by_duration, 1);
    let tracks = snapshot.table(Dimension::Track, Scope::All);
    assert_eq!(tracks.len(), 1);
    assert_eq!(snapshot.label(Dimension::Track, tracks[0].id), "Blink - Alpha");
    assert_eq!(tracks[0].ms_played, 1);
}

// ============================================
// On This Day
// ============================================

#[test]
fn test_on_this_day_lists_repeats_only() {
    let mut plays = Vec::new();
    for (minute, track, count) in [(0, "Anthem", 5), (20, "Chorus", 3), (40, "Once", 2)] {
        for i in 0..count {
            plays.push(play(at(2024, 3, 15, 10, minute + i), track, "Alpha", 180_000));
        }
    }
    for i in 0..4 {
        plays.push(play(at(2023, 3, 15, 20, i), "Old Flame", "Beta", 180_000));
    }
    plays.push(play(at(2024, 3, 16, 10, 0), "Anthem", "Alpha", 180_000));
    let dir = export_dir(&plays, 50);
    let (snapshot, _) = load(dir.path(), filter(0, None));

    let entries = on_this_day::on_this_day(&snapshot, 3, 15);
    let summary: Vec<(&str, u64, NaiveDate)> = entries
        .iter()
        .map(|entry| (entry.label.as_str(), entry.play_count, entry.date))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Anthem - Alpha", 5, date(2024, 3, 15)),
            ("Old Flame - Beta", 4, date(2023, 3, 15)),
            ("Chorus - Alpha", 3, date(2024, 3, 15)),
        ]
    );
    assert!(on_this_day::on_this_day(&snapshot, 3, 16).is_empty());
}

// ============================================
// Ranges and Gaps
// ============================================

#[test]
fn test_custom_range_matches_direct_aggregation() {
    let plays = vec![
        play(at(2023, 5, 31, 23, 0), "Before", "Alpha", 100_000),
        play(at(2023, 6, 1, 0, 30), "Start", "Alpha", 100_000),
        play(at(2023, 6, 10, 12, 0), "Middle", "Beta", 200_000),
        play(at(2023, 6, 10, 13, 0), "Middle", "Beta", 150_000),
        play(at(2023, 6, 30, 23, 30), "End", "Gamma", 50_000),
        play(at(2023, 7, 1, 0, 0), "After", "Gamma", 100_000),
    ];
    let all = export_dir(&plays, 10);
    let (snapshot, _) = load(all.path(), filter(0, None));

    let june: Vec<Play> = plays
        .into_iter()
        .filter(|p| p.ts.date_naive() >= date(2023, 6, 1) && p.ts.date_naive() <= date(2023, 6, 30))
        .collect();
    let june_dir = export_dir(&june, 10);
    let (direct, _) = load(june_dir.path(), filter(0, None));

    for dimension in Dimension::ALL {
        let ranged: Vec<(String, u64, u64)> = snapshot
            .range_table(dimension, date(2023, 6, 1), date(2023, 6, 30))
            .into_iter()
            .map(|row| (snapshot.label(dimension, row.id).to_string(), row.ms_played, row.play_count))
            .collect();
        let expected: Vec<(String, u64, u64)> = direct
            .table(dimension, Scope::All)
            .into_iter()
            .map(|row| (direct.label(dimension, row.id).to_string(), row.ms_played, row.play_count))
            .collect();
        assert_eq!(ranged, expected, "{dimension}");
    }
}

#[test]
fn test_single_long_gap_is_the_hiatus() {
    let start = date(2022, 1, 1);
    let resume = start + Duration::days(401);
    let plays = vec![
        play(at(2021, 12, 31, 9, 0), "Before", "Alpha", 100_000),
        play(at(2022, 1, 1, 9, 0), "Last", "Alpha", 100_000),
        play(
            Utc.from_utc_datetime(&resume.and_hms_opt(9, 0, 0).unwrap()),
            "Return",
            "Alpha",
            100_000,
        ),
    ];
    let dir = export_dir(&plays, 10);
    let (snapshot, _) = load(dir.path(), filter(0, None));

    let hiatus = streaks::hiatus(&snapshot.days());
    assert_eq!(hiatus.longest_days, 400);
    assert_eq!(hiatus.start, Some(date(2022, 1, 2)));
    assert_eq!(hiatus.end, Some(resume - Duration::days(1)));
}

// ============================================
// End to End
// ============================================

#[test]
fn test_report_end_to_end() {
    let mut plays = Vec::new();
    for day in 1..=20u32 {
        plays.push(play(at(2024, 2, day, 8, 0), "Morning", "Alpha", 200_000));
        plays.push(play(at(2024, 2, day, 8, 5), "Commute", "Beta", 150_000));
        if day % 3 == 0 {
            plays.push(play(at(2024, 2, day, 22, 0), "Night", "Gamma", 240_000));
        }
    }
    let dir = export_dir(&plays, 15);

    let mut config = Config::default();
    config.report.max_playlist_tracks = 5;
    let mut context = ReportContext::new(config).with_as_of(date(2024, 2, 20));
    let outcome = context.generate(dir.path(), |_, _, _| {}).unwrap();
    let ReportOutcome::Ready(report) = outcome else {
        panic!("expected a report");
    };

    assert_eq!(report.names.artist, vec!["Alpha", "Beta", "Gamma"]);
    assert_eq!(report.stats.streaks.current_streak_days, 20);
    assert_eq!(report.stats.overview.days_played, 20);
    assert_eq!(report.personality.scores.len(), 12);
    assert!(report
        .playlists
        .playlists
        .iter()
        .all(|playlist| playlist.items.len() <= 5));
    assert_eq!(report.daily.len(), 20);
    assert!(!report.metrics.is_empty());

    let json: Value = serde_json::from_str(&report.to_json(true).unwrap()).unwrap();
    assert_eq!(json["tables"]["artist-table-all"][0][0], json!(0));
    assert_eq!(json["presentation"]["compress_table_data"], json!(true));
}

#[test]
fn test_empty_input_directory_is_not_an_error() {
    let dir = TempDir::new().unwrap();
    let mut context = ReportContext::new(Config::default());
    let outcome = context.generate(dir.path(), |_, _, _| {}).unwrap();
    assert!(outcome.is_empty());
    assert_eq!(outcome.load_stats().files_read, 0);
}
