//! Run-scoped report context
//!
//! A [`ReportContext`] lives for exactly one run. It owns the configuration,
//! the run id, the finalized snapshot (and with it the interner) and the
//! memoized On This Day lookups. Nothing is cached across runs.
//!
//! ```rust,ignore
//! use sesh_core::{Config, ReportContext, ReportOutcome};
//!
//! let mut context = ReportContext::new(Config::load()?);
//! match context.generate(&dir, |_, _, _| {})? {
//!     ReportOutcome::Ready(report) => report.write_json(&out, false)?,
//!     ReportOutcome::Empty { .. } => println!("Nothing to report"),
//!     ReportOutcome::Cancelled { .. } => {}
//! }
//! let today = context.on_this_day(3, 15);
//! ```

use crate::aggregate::{AggregateSnapshot, Aggregator};
use crate::analytics::{
    flatten, on_this_day, on_this_day_index, CalculatorSettings, OnThisDayEntry,
    StatisticsCalculator,
};
use crate::config::Config;
use crate::error::Result;
use crate::ingest::{EventFilter, HistoryLoader};
use crate::report::{build_daily, build_tables, EntityNames, Presentation, Report, ReportOutcome};
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use uuid::Uuid;

/// State of one report run.
pub struct ReportContext {
    config: Config,
    run_id: Uuid,
    as_of: NaiveDate,
    cancel: Option<Arc<AtomicBool>>,
    snapshot: Option<AggregateSnapshot>,
    on_this_day: HashMap<(u32, u32), Vec<OnThisDayEntry>>,
}

impl ReportContext {
    /// New context with a fresh run id; statistics are relative to today (UTC).
    pub fn new(config: Config) -> Self {
        Self {
            config,
            run_id: Uuid::new_v4(),
            as_of: Utc::now().date_naive(),
            cancel: None,
            snapshot: None,
            on_this_day: HashMap::new(),
        }
    }

    /// Compute statistics relative to `as_of` instead of today.
    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = as_of;
        self
    }

    /// Stop loading at the next file boundary once `flag` is set.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// The finalized snapshot of the last successful run.
    pub fn snapshot(&self) -> Option<&AggregateSnapshot> {
        self.snapshot.as_ref()
    }

    /// Load every export file in `dir`, aggregate and compute the report.
    ///
    /// `on_progress` is called with `(file_index, total_files, path)` before
    /// each file. Only an unusable input directory is an error; no
    /// qualifying plays gives [`ReportOutcome::Empty`].
    pub fn generate<F>(&mut self, dir: &Path, on_progress: F) -> Result<ReportOutcome>
    where
        F: FnMut(usize, usize, &Path),
    {
        let span = crate::logging::run_span(self.run_id, dir);
        let _enter = span.enter();

        self.snapshot = None;
        self.on_this_day.clear();

        let filter = EventFilter::from_config(&self.config.filters);
        tracing::info!(
            min_ms_played = filter.min_ms_played,
            min_year = ?filter.min_year,
            "Starting report run"
        );

        let mut loader = HistoryLoader::new(dir, filter).with_progress(on_progress);
        if let Some(flag) = &self.cancel {
            loader = loader.with_cancel(Arc::clone(flag));
        }

        let mut stream = loader.events()?;
        let mut aggregator = Aggregator::new();
        for event in &mut stream {
            aggregator.accumulate(&event);
        }
        let load_stats = stream.into_stats();
        load_stats.log_summary();

        if load_stats.cancelled {
            tracing::info!("Run cancelled, discarding partial aggregates");
            return Ok(ReportOutcome::Cancelled { load_stats });
        }
        if aggregator.event_count() == 0 {
            tracing::warn!("No qualifying plays found");
            return Ok(ReportOutcome::Empty { load_stats });
        }

        let snapshot = aggregator.finalize();
        let settings = CalculatorSettings::from_config(&self.config, self.as_of);
        let calculator = StatisticsCalculator::new(&snapshot, &settings);
        let stats = calculator.compute();
        let personality = calculator.personality(&stats);
        let playlists = calculator.playlists();
        let metrics = flatten(&stats, &personality);

        let report = Report {
            run_id: self.run_id,
            generated_at: Utc::now(),
            as_of: self.as_of,
            names: EntityNames::from_snapshot(&snapshot),
            uris: snapshot.interner().uris().to_vec(),
            tables: build_tables(&snapshot),
            daily: build_daily(&snapshot),
            stats,
            personality,
            playlists,
            on_this_day: on_this_day_index(&snapshot),
            metrics,
            presentation: Presentation::from(&self.config.report),
            load_stats,
        };

        tracing::info!(
            tables = report.tables.len(),
            days = report.daily.len(),
            playlists = report.playlists.playlists.len(),
            "Report ready"
        );

        self.snapshot = Some(snapshot);
        Ok(ReportOutcome::Ready(Box::new(report)))
    }

    /// Repeats on `month`/`day` across the years, computed once per date.
    ///
    /// Empty before a successful [`generate`](Self::generate).
    pub fn on_this_day(&mut self, month: u32, day: u32) -> &[OnThisDayEntry] {
        let Some(snapshot) = self.snapshot.as_ref() else {
            return &[];
        };
        self.on_this_day
            .entry((month, day))
            .or_insert_with(|| {
                tracing::debug!(month, day, "Computing On This Day");
                on_this_day::on_this_day(snapshot, month, day)
            })
            .as_slice()
    }

    /// Number of memoized On This Day dates.
    pub fn cached_on_this_day(&self) -> usize {
        self.on_this_day.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    fn record(ts: &str, track: &str, ms: u64) -> serde_json::Value {
        json!({
            "ts": ts,
            "ms_played": ms,
            "master_metadata_track_name": track,
            "master_metadata_album_artist_name": "Band",
            "master_metadata_album_album_name": "Album",
            "platform": "android",
            "offline": false,
            "skipped": false,
            "spotify_track_uri": format!("spotify:track:{}", track.to_lowercase())
        })
    }

    fn export_dir(records: Vec<serde_json::Value>) -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("Streaming_History_Audio_2024.json"),
            serde_json::to_string(&records).unwrap(),
        )
        .unwrap();
        dir
    }

    fn context() -> ReportContext {
        ReportContext::new(Config::default())
            .with_as_of(NaiveDate::from_ymd_opt(2024, 3, 20).unwrap())
    }

    #[test]
    fn test_generate_report_and_memoize_on_this_day() {
        crate::logging::init_test();
        let dir = export_dir(vec![
            record("2024-03-15T10:00:00Z", "Anthem", 200_000),
            record("2024-03-15T10:05:00Z", "Anthem", 200_000),
            record("2024-03-15T10:10:00Z", "Anthem", 200_000),
            record("2024-03-16T08:00:00Z", "Other", 100_000),
        ]);

        let mut context = context();
        let mut progress = Vec::new();
        let outcome = context
            .generate(dir.path(), |index, total, _| progress.push((index, total)))
            .unwrap();
        assert_eq!(progress, vec![(0, 1)]);

        let report = outcome.into_report().unwrap();
        assert_eq!(report.run_id, context.run_id());
        assert_eq!(report.names.track, vec!["Anthem - Band", "Other - Band"]);
        assert_eq!(report.uris[0].as_deref(), Some("spotify:track:anthem"));
        assert_eq!(report.load_stats.records_yielded, 4);
        assert_eq!(report.on_this_day["03-15"].len(), 1);
        assert_eq!(report.presentation.items_per_page, 10);
        assert!(report.to_json(false).unwrap().contains("\"artist-table-all\""));

        assert_eq!(context.on_this_day(3, 15).len(), 1);
        assert!(context.on_this_day(3, 16).is_empty());
        assert_eq!(context.on_this_day(3, 15)[0].play_count, 3);
        assert_eq!(context.cached_on_this_day(), 2);
    }

    #[test]
    fn test_empty_outcome_when_nothing_qualifies() {
        let dir = export_dir(vec![record("2024-03-15T10:00:00Z", "Blip", 1_000)]);
        let mut context = context();
        let outcome = context.generate(dir.path(), |_, _, _| {}).unwrap();
        assert!(outcome.is_empty());
        assert_eq!(outcome.load_stats().filtered_by_duration, 1);
        assert!(matches!(outcome.into_report(), Err(Error::EmptyDataset)));
        assert!(context.on_this_day(3, 15).is_empty());
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut context = context();
        let result = context.generate(&dir.path().join("missing"), |_, _, _| {});
        assert!(matches!(result, Err(Error::InputDirectory { .. })));
    }

    #[test]
    fn test_cancelled_run_discards_buckets() {
        let dir = export_dir(vec![record("2024-03-15T10:00:00Z", "Anthem", 200_000)]);
        let flag = Arc::new(AtomicBool::new(false));
        flag.store(true, Ordering::Relaxed);
        let mut context = context().with_cancel(flag);
        let outcome = context.generate(dir.path(), |_, _, _| {}).unwrap();
        assert!(matches!(outcome, ReportOutcome::Cancelled { .. }));
        assert!(outcome.load_stats().cancelled);
        assert!(context.snapshot().is_none());
    }

    #[test]
    fn test_each_context_has_its_own_run_id() {
        assert_ne!(context().run_id(), context().run_id());
    }
}
