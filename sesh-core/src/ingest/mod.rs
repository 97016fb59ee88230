//! Ingestion of streaming-history export files
//!
//! The loader turns a directory of `*.json` export files into a lazy stream
//! of validated [`PlayEvent`]s.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────────┐     ┌─────────────────┐
//! │  Export Files   │ ──► │  PlayEventStream │ ──► │   Aggregator    │
//! │ (dir/*.json)    │     │  schema, repair, │     │                 │
//! └─────────────────┘     │  filter, dedupe  │     └─────────────────┘
//!                         └──────────────────┘
//! ```
//!
//! Files are read one at a time in sorted order. A file that is not a JSON
//! array, or where too few elements validate, is skipped with a warning.
//! Bad records are skipped individually. Nothing short of a missing input
//! directory stops a run.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sesh_core::ingest::{EventFilter, HistoryLoader};
//!
//! let loader = HistoryLoader::new(dir, EventFilter::default())
//!     .with_progress(|current, total, path| {
//!         println!("Reading {}/{}: {}", current + 1, total, path.display());
//!     });
//! let mut stream = loader.events()?;
//! for event in &mut stream {
//!     aggregator.accumulate(&event);
//! }
//! println!("{} plays", stream.stats().records_yielded);
//! ```

mod record;

pub use record::RawRecord;

use crate::config::FilterConfig;
use crate::error::{Error, Result};
use crate::types::PlayEvent;
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Longest single play we believe; anything above is capped.
pub const MAX_MS_PLAYED: u64 = 24 * 60 * 60 * 1000;

/// A file is only used when at least this share of its elements validate.
pub const MIN_VALID_RECORD_RATIO: f64 = 0.7;

/// Filters applied to every event before it leaves the loader.
#[derive(Debug, Clone)]
pub struct EventFilter {
    /// Plays must last strictly longer than this
    pub min_ms_played: u64,
    /// Earliest calendar year kept, if any
    pub min_year: Option<i32>,
    /// Reference instant; later timestamps are clamped to it
    pub now: DateTime<Utc>,
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::from_config(&FilterConfig::default())
    }
}

impl EventFilter {
    pub fn from_config(config: &FilterConfig) -> Self {
        Self {
            min_ms_played: config.effective_min_ms_played(),
            min_year: config.effective_min_year(),
            now: Utc::now(),
        }
    }
}

/// Counters describing what the loader kept and dropped.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct LoadStats {
    pub files_read: usize,
    pub files_skipped: usize,
    pub records_yielded: u64,
    pub invalid_records: u64,
    pub filtered_by_duration: u64,
    pub filtered_by_year: u64,
    /// Records with no track, artist or album at all (podcasts, audiobooks)
    pub unlabeled: u64,
    pub duplicates: u64,
    /// Durations capped at [`MAX_MS_PLAYED`]
    pub capped_durations: u64,
    /// Timestamps after `now` clamped back to it
    pub clamped_timestamps: u64,
    /// Loading stopped early through the cancel flag
    pub cancelled: bool,
}

impl LoadStats {
    /// Log one summary line, plus warnings for any repairs.
    pub fn log_summary(&self) {
        if self.capped_durations > 0 {
            tracing::warn!(
                count = self.capped_durations,
                "Capped implausibly long play durations to 24h"
            );
        }
        if self.clamped_timestamps > 0 {
            tracing::warn!(
                count = self.clamped_timestamps,
                "Clamped future timestamps to the current time"
            );
        }
        tracing::info!(
            files_read = self.files_read,
            files_skipped = self.files_skipped,
            plays = self.records_yielded,
            invalid = self.invalid_records,
            too_short = self.filtered_by_duration,
            too_old = self.filtered_by_year,
            unlabeled = self.unlabeled,
            duplicates = self.duplicates,
            cancelled = self.cancelled,
            "Finished loading export files"
        );
    }
}

type ProgressFn<'a> = Box<dyn FnMut(usize, usize, &Path) + 'a>;

/// Entry point of the loader.
pub struct HistoryLoader<'a> {
    dir: PathBuf,
    filter: EventFilter,
    on_progress: Option<ProgressFn<'a>>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> HistoryLoader<'a> {
    pub fn new(dir: impl Into<PathBuf>, filter: EventFilter) -> Self {
        Self {
            dir: dir.into(),
            filter,
            on_progress: None,
            cancel: None,
        }
    }

    /// Register a callback invoked with `(current_file_index, total_files, path)`
    /// before each file is read.
    pub fn with_progress<F>(mut self, on_progress: F) -> Self
    where
        F: FnMut(usize, usize, &Path) + 'a,
    {
        self.on_progress = Some(Box::new(on_progress));
        self
    }

    /// Stop at the next file boundary once `flag` is set.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// All `*.json` files directly inside the input directory, sorted.
    pub fn discover_files(&self) -> Result<Vec<PathBuf>> {
        discover_files(&self.dir)
    }

    /// Start streaming events. Fails only if the directory is unusable.
    pub fn events(self) -> Result<PlayEventStream<'a>> {
        let files = self.discover_files()?;
        tracing::info!(
            dir = %self.dir.display(),
            count = files.len(),
            "Discovered export files"
        );

        Ok(PlayEventStream {
            total_files: files.len(),
            files: files.into_iter().enumerate(),
            current: Vec::new().into_iter(),
            filter: self.filter,
            seen: HashSet::new(),
            stats: LoadStats::default(),
            on_progress: self.on_progress,
            cancel: self.cancel,
            finished: false,
        })
    }
}

/// List the export files of `dir`.
pub fn discover_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::InputDirectory {
            path: dir.to_path_buf(),
            message: "not a directory".to_string(),
        });
    }

    let dir_str = dir.to_str().ok_or_else(|| Error::InputDirectory {
        path: dir.to_path_buf(),
        message: "path is not valid UTF-8".to_string(),
    })?;
    let pattern = format!("{}/*.json", glob::Pattern::escape(dir_str));

    let entries = glob::glob(&pattern).map_err(|e| Error::InputDirectory {
        path: dir.to_path_buf(),
        message: e.to_string(),
    })?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "Unreadable directory entry, skipping");
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Read one export file into validated (but unfiltered) events.
///
/// Invalid elements are counted into `invalid` and logged; the whole file is
/// rejected when fewer than [`MIN_VALID_RECORD_RATIO`] of them validate.
pub fn read_export_file(path: &Path, invalid: &mut u64) -> Result<Vec<PlayEvent>> {
    let content = std::fs::read_to_string(path)?;
    let elements: Vec<serde_json::Value> = serde_json::from_str(&content)
        .map_err(|e| Error::malformed(path, format!("not a JSON array: {}", e)))?;

    let total = elements.len();
    let mut events = Vec::with_capacity(total);
    let mut rejected = 0u64;

    for (index, element) in elements.into_iter().enumerate() {
        match RawRecord::from_value(element).and_then(RawRecord::into_event) {
            Ok(event) => events.push(event),
            Err(e) => {
                rejected += 1;
                tracing::debug!(
                    path = %path.display(),
                    index,
                    error = %e,
                    "Skipping invalid record"
                );
            }
        }
    }

    *invalid += rejected;

    if total > 0 && (events.len() as f64) < (total as f64) * MIN_VALID_RECORD_RATIO {
        return Err(Error::malformed(
            path,
            format!("only {} of {} records are valid", events.len(), total),
        ));
    }

    if rejected > 0 {
        tracing::warn!(
            path = %path.display(),
            rejected,
            total,
            "Skipped invalid records"
        );
    }

    Ok(events)
}

/// Lazy iterator over the plays of every export file.
///
/// Finite and not restartable. Holds one file's events at a time plus a
/// 32-byte digest per yielded play for de-duplication.
pub struct PlayEventStream<'a> {
    files: std::iter::Enumerate<std::vec::IntoIter<PathBuf>>,
    total_files: usize,
    current: std::vec::IntoIter<PlayEvent>,
    filter: EventFilter,
    seen: HashSet<[u8; 32]>,
    stats: LoadStats,
    on_progress: Option<ProgressFn<'a>>,
    cancel: Option<Arc<AtomicBool>>,
    finished: bool,
}

impl PlayEventStream<'_> {
    /// Counters so far; final once the iterator returned `None`.
    pub fn stats(&self) -> &LoadStats {
        &self.stats
    }

    pub fn into_stats(self) -> LoadStats {
        self.stats
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Move to the next readable file. Returns false when none are left.
    fn advance_file(&mut self) -> bool {
        loop {
            if self.is_cancelled() {
                tracing::info!("Loading cancelled");
                self.stats.cancelled = true;
                return false;
            }

            let Some((index, path)) = self.files.next() else {
                return false;
            };

            if let Some(on_progress) = self.on_progress.as_mut() {
                on_progress(index, self.total_files, &path);
            }

            match read_export_file(&path, &mut self.stats.invalid_records) {
                Ok(events) => {
                    tracing::debug!(
                        path = %path.display(),
                        records = events.len(),
                        "Read export file"
                    );
                    self.stats.files_read += 1;
                    self.current = events.into_iter();
                    return true;
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping export file");
                    self.stats.files_skipped += 1;
                }
            }
        }
    }

    /// Repair, filter and de-duplicate one event.
    fn admit(&mut self, mut event: PlayEvent) -> Option<PlayEvent> {
        if event.track_label.is_none()
            && event.artist_label.is_none()
            && event.album_label.is_none()
        {
            self.stats.unlabeled += 1;
            return None;
        }

        if event.ms_played > MAX_MS_PLAYED {
            event.ms_played = MAX_MS_PLAYED;
            self.stats.capped_durations += 1;
        }
        if event.timestamp > self.filter.now {
            event.timestamp = self.filter.now;
            self.stats.clamped_timestamps += 1;
        }

        if let Some(min_year) = self.filter.min_year {
            if event.timestamp.year() < min_year {
                self.stats.filtered_by_year += 1;
                return None;
            }
        }

        if event.ms_played <= self.filter.min_ms_played || event.ms_played == 0 {
            self.stats.filtered_by_duration += 1;
            return None;
        }

        if !self.seen.insert(dedupe_key(&event)) {
            self.stats.duplicates += 1;
            return None;
        }

        self.stats.records_yielded += 1;
        Some(event)
    }
}

impl Iterator for PlayEventStream<'_> {
    type Item = PlayEvent;

    fn next(&mut self) -> Option<PlayEvent> {
        if self.finished {
            return None;
        }
        loop {
            match self.current.next() {
                Some(event) => {
                    if let Some(event) = self.admit(event) {
                        return Some(event);
                    }
                }
                None => {
                    if !self.advance_file() {
                        self.finished = true;
                        self.seen = HashSet::new();
                        return None;
                    }
                }
            }
        }
    }
}

/// Digest of `ts|track|artist|ms_played`.
fn dedupe_key(event: &PlayEvent) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(event.timestamp.timestamp_millis().to_le_bytes());
    hasher.update(b"|");
    hasher.update(event.track_label.as_deref().unwrap_or("").as_bytes());
    hasher.update(b"|");
    hasher.update(event.artist_label.as_deref().unwrap_or("").as_bytes());
    hasher.update(b"|");
    hasher.update(event.ms_played.to_le_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::fs;

    fn write(dir: &Path, name: &str, value: serde_json::Value) {
        fs::write(dir.join(name), value.to_string()).unwrap();
    }

    fn play(ts: &str, track: &str, ms: u64) -> serde_json::Value {
        json!({
            "ts": ts,
            "ms_played": ms,
            "master_metadata_track_name": track,
            "master_metadata_album_artist_name": "Artist",
            "master_metadata_album_album_name": "Album"
        })
    }

    fn filter(min_ms_played: u64, min_year: Option<i32>) -> EventFilter {
        EventFilter {
            min_ms_played,
            min_year,
            now: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn load(dir: &Path, filter: EventFilter) -> (Vec<PlayEvent>, LoadStats) {
        let mut stream = HistoryLoader::new(dir, filter).events().unwrap();
        let events: Vec<_> = stream.by_ref().collect();
        (events, stream.into_stats())
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let result = HistoryLoader::new("/definitely/not/here", EventFilter::default()).events();
        assert!(matches!(result, Err(Error::InputDirectory { .. })));
    }

    #[test]
    fn test_discover_files_sorted_and_json_only() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.json", "a.json", "notes.txt"] {
            fs::write(dir.path().join(name), "[]").unwrap();
        }
        fs::create_dir(dir.path().join("nested.json")).unwrap();

        let files = discover_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
    }

    #[test]
    fn test_malformed_files_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.json"), "{ not json").unwrap();
        write(dir.path(), "b.json", json!({"ts": "2023-01-01T00:00:00Z"}));
        write(
            dir.path(),
            "c.json",
            json!([play("2023-01-01T00:00:00Z", "Song", 60_000)]),
        );

        let (events, stats) = load(dir.path(), filter(0, None));
        assert_eq!(events.len(), 1);
        assert_eq!(stats.files_read, 1);
        assert_eq!(stats.files_skipped, 2);
    }

    #[test]
    fn test_file_below_valid_ratio_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "a.json",
            json!([
                play("2023-01-01T00:00:00Z", "One", 60_000),
                {"ts": "bad", "ms_played": 1},
                {"ms_played": 1},
                7
            ]),
        );

        let (events, stats) = load(dir.path(), filter(0, None));
        assert!(events.is_empty());
        assert_eq!(stats.files_skipped, 1);
        assert_eq!(stats.invalid_records, 3);
    }

    #[test]
    fn test_single_bad_record_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut records: Vec<_> = (0..9)
            .map(|i| play(&format!("2023-01-0{}T00:00:00Z", i + 1), "Song", 60_000))
            .collect();
        records.push(json!({"ts": "2023-01-01T00:00:00Z", "ms_played": -1}));
        write(dir.path(), "a.json", json!(records));

        let (events, stats) = load(dir.path(), filter(0, None));
        assert_eq!(events.len(), 9);
        assert_eq!(stats.invalid_records, 1);
        assert_eq!(stats.files_read, 1);
    }

    #[test]
    fn test_duration_filter_is_strict() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "a.json",
            json!([
                play("2023-01-01T00:00:00Z", "Zero", 0),
                play("2023-01-01T00:01:00Z", "One", 1),
                play("2023-01-01T00:02:00Z", "Exact", 20_000),
                play("2023-01-01T00:03:00Z", "Long", 20_001),
            ]),
        );

        let (events, _) = load(dir.path(), filter(0, None));
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.ms_played > 0));

        let (events, stats) = load(dir.path(), filter(20_000, None));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].track_label.as_deref(), Some("Long"));
        assert_eq!(stats.filtered_by_duration, 3);
    }

    #[test]
    fn test_year_filter() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "a.json",
            json!([
                play("2021-12-31T23:59:59Z", "Old", 60_000),
                play("2022-01-01T00:00:00Z", "New", 60_000),
            ]),
        );

        let (events, stats) = load(dir.path(), filter(0, Some(2022)));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].track_label.as_deref(), Some("New"));
        assert_eq!(stats.filtered_by_year, 1);
    }

    #[test]
    fn test_repairs_and_unlabeled() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "a.json",
            json!([
                play("2023-01-01T00:00:00Z", "Marathon", MAX_MS_PLAYED + 5),
                play("2030-01-01T00:00:00Z", "Future", 60_000),
                {"ts": "2023-01-02T00:00:00Z", "ms_played": 60_000, "episode_name": "Pod"},
            ]),
        );

        let (events, stats) = load(dir.path(), filter(0, None));
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].ms_played, MAX_MS_PLAYED);
        assert_eq!(
            events[1].timestamp,
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(stats.capped_durations, 1);
        assert_eq!(stats.clamped_timestamps, 1);
        assert_eq!(stats.unlabeled, 1);
    }

    #[test]
    fn test_out_of_range_durations_are_capped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "a.json",
            json!([
                play("2023-01-01T00:00:00Z", "Intro", 60_000),
                play("2023-01-01T01:00:00Z", "Loop", 90_000_000),
                {
                    "ts": "2023-01-01T02:00:00Z",
                    "ms_played": 1e300,
                    "master_metadata_track_name": "Forever",
                    "master_metadata_album_artist_name": "Artist"
                },
                {
                    "endTime": "2023-02-01 10:00",
                    "msPlayed": 1e16,
                    "trackName": "Legacy",
                    "artistName": "Artist"
                },
                play("2023-01-01T03:00:00Z", "Outro", 120_000),
                {"ts": "2023-01-01T04:00:00Z", "ms_played": "abc", "master_metadata_track_name": "Bad"},
                play("2023-01-01T05:00:00Z", "Encore", 30_000),
                play("2023-01-01T06:00:00Z", "Reprise", 45_000),
            ]),
        );

        let (events, stats) = load(dir.path(), filter(0, None));
        assert_eq!(stats.files_read, 1);
        assert_eq!(stats.files_skipped, 0);
        assert_eq!(stats.records_yielded, 7);
        assert_eq!(stats.invalid_records, 1);
        assert_eq!(stats.capped_durations, 3);

        let capped: Vec<_> = events
            .iter()
            .filter(|e| e.ms_played == MAX_MS_PLAYED)
            .filter_map(|e| e.track_label.as_deref())
            .collect();
        assert_eq!(capped, vec!["Loop", "Forever", "Legacy"]);

        let legacy = events
            .iter()
            .find(|e| e.track_label.as_deref() == Some("Legacy"))
            .unwrap();
        assert_eq!(
            legacy.timestamp,
            Utc.with_ymd_and_hms(2023, 1, 31, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_duplicates_across_files() {
        let dir = tempfile::tempdir().unwrap();
        let shared = play("2023-01-01T00:00:00Z", "Song", 60_000);
        write(dir.path(), "a.json", json!([shared.clone()]));
        write(
            dir.path(),
            "b.json",
            json!([shared, play("2023-01-01T00:00:00Z", "Song", 61_000)]),
        );

        let (events, stats) = load(dir.path(), filter(0, None));
        assert_eq!(events.len(), 2);
        assert_eq!(stats.duplicates, 1);
        assert_eq!(stats.records_yielded, 2);
    }

    #[test]
    fn test_progress_and_cancel() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.json", "b.json", "c.json"] {
            write(
                dir.path(),
                name,
                json!([play("2023-01-01T00:00:00Z", name, 60_000)]),
            );
        }

        let flag = Arc::new(AtomicBool::new(false));
        let mut seen = Vec::new();
        {
            let cancel = Arc::clone(&flag);
            let mut stream = HistoryLoader::new(dir.path(), filter(0, None))
                .with_progress(|current, total, _| {
                    seen.push((current, total));
                    if current == 1 {
                        cancel.store(true, Ordering::Relaxed);
                    }
                })
                .with_cancel(Arc::clone(&flag))
                .events()
                .unwrap();

            let count = stream.by_ref().count();
            assert_eq!(count, 2);
            assert!(stream.stats().cancelled);
        }
        assert_eq!(seen, vec![(0, 3), (1, 3)]);
    }
}
