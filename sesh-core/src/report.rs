//! Report data model
//!
//! [`Report`] is everything an assembler needs to render the interactive
//! summary: interned names, ranked tables per dimension and scope, daily
//! tables, derived statistics, personality, smart playlists and the On This
//! Day index. Rendering, compression and paging are the assembler's job;
//! the presentation options are passed through untouched.
//!
//! ## Table layout
//!
//! Tables are keyed `"<dimension>-table-<scope>"` (e.g. `artist-table-all`,
//! `track-table-2023`) and hold compact rows `[entityId, totalMsPlayed,
//! playCount]`, ranked by play time. [`TableShape`] reads either this layout
//! or the older object-per-row layout.

use crate::aggregate::{AggregateSnapshot, DayTables, TableRow};
use crate::analytics::{
    DerivedStatistic, DerivedStatistics, OnThisDayEntry, PersonalityProfile, SmartPlaylists,
};
use crate::config::ReportConfig;
use crate::error::{Error, Result};
use crate::ingest::LoadStats;
use crate::types::{Dimension, Scope};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

/// Key of a ranked table, e.g. `artist-table-all` or `album-table-2021`.
pub fn table_key(dimension: Dimension, scope: Scope) -> String {
    format!("{}-table-{}", dimension, scope.key())
}

/// Interned labels per dimension; the index of a label is its entity id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityNames {
    pub artist: Vec<String>,
    pub track: Vec<String>,
    pub album: Vec<String>,
}

impl EntityNames {
    pub fn from_snapshot(snapshot: &AggregateSnapshot) -> Self {
        let interner = snapshot.interner();
        Self {
            artist: interner.names(Dimension::Artist).to_vec(),
            track: interner.names(Dimension::Track).to_vec(),
            album: interner.names(Dimension::Album).to_vec(),
        }
    }

    pub fn get(&self, dimension: Dimension) -> &[String] {
        match dimension {
            Dimension::Artist => &self.artist,
            Dimension::Track => &self.track,
            Dimension::Album => &self.album,
        }
    }
}

/// Options the engine carries through to the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presentation {
    pub items_per_page: usize,
    pub compress_table_data: bool,
}

impl From<&ReportConfig> for Presentation {
    fn from(config: &ReportConfig) -> Self {
        Self {
            items_per_page: config.items_per_page,
            compress_table_data: config.compress_table_data,
        }
    }
}

/// A table row with its label spelled out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRow {
    pub name: String,
    pub ms_played: u64,
    pub play_count: u64,
}

/// Either table layout, as found in a serialized report.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TableShape {
    /// `[[entityId, totalMsPlayed, playCount], ...]`
    Compact(Vec<TableRow>),
    /// `[{"name": .., "ms_played": .., "play_count": ..}, ...]`
    Legacy(Vec<NamedRow>),
}

impl TableShape {
    /// Rows with labels resolved against `names`; unknown ids fall back to
    /// the dimension's sentinel.
    pub fn into_named(self, dimension: Dimension, names: &EntityNames) -> Vec<NamedRow> {
        match self {
            TableShape::Legacy(rows) => rows,
            TableShape::Compact(rows) => {
                let labels = names.get(dimension);
                rows.into_iter()
                    .map(|row| NamedRow {
                        name: labels
                            .get(row.id.index())
                            .cloned()
                            .unwrap_or_else(|| dimension.unknown_label().to_string()),
                        ms_played: row.ms_played,
                        play_count: row.play_count,
                    })
                    .collect()
            }
        }
    }
}

/// Ranked tables for the `all` scope and every year.
pub fn build_tables(snapshot: &AggregateSnapshot) -> BTreeMap<String, Vec<TableRow>> {
    let mut tables = BTreeMap::new();
    let scopes = std::iter::once(Scope::All).chain(snapshot.years().into_iter().map(Scope::Year));
    for scope in scopes {
        for dimension in Dimension::ALL {
            tables.insert(table_key(dimension, scope), snapshot.table(dimension, scope));
        }
    }
    tables
}

/// Per-day tables keyed by ISO date.
pub fn build_daily(snapshot: &AggregateSnapshot) -> BTreeMap<String, DayTables> {
    snapshot
        .days()
        .into_iter()
        .map(|date| (Scope::Day(date).key(), snapshot.day(date)))
        .collect()
}

/// Full output of a run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// Reference date of the statistics
    pub as_of: NaiveDate,
    pub names: EntityNames,
    /// First known URI per track, aligned with `names.track`
    pub uris: Vec<Option<String>>,
    pub tables: BTreeMap<String, Vec<TableRow>>,
    pub daily: BTreeMap<String, DayTables>,
    pub stats: DerivedStatistics,
    pub personality: PersonalityProfile,
    pub playlists: SmartPlaylists,
    /// Repeats per `"MM-DD"`, for every month-day that has any
    pub on_this_day: BTreeMap<String, Vec<OnThisDayEntry>>,
    pub metrics: Vec<DerivedStatistic>,
    pub presentation: Presentation,
    pub load_stats: LoadStats,
}

impl Report {
    /// Ranked table for one dimension and scope, if present.
    pub fn table(&self, dimension: Dimension, scope: Scope) -> Option<&[TableRow]> {
        self.tables
            .get(&table_key(dimension, scope))
            .map(Vec::as_slice)
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    /// Write the report as JSON, creating parent directories as needed.
    pub fn write_json(&self, path: &Path, pretty: bool) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_json(pretty)?)?;
        tracing::info!(path = %path.display(), "Wrote report");
        Ok(())
    }
}

/// Result of a run: a report, or nothing to report.
#[derive(Debug, Clone)]
pub enum ReportOutcome {
    Ready(Box<Report>),
    /// No play survived filtering
    Empty { load_stats: LoadStats },
    /// The cancel flag was raised; partial buckets were discarded
    Cancelled { load_stats: LoadStats },
}

impl ReportOutcome {
    pub fn load_stats(&self) -> &LoadStats {
        match self {
            ReportOutcome::Ready(report) => &report.load_stats,
            ReportOutcome::Empty { load_stats } | ReportOutcome::Cancelled { load_stats } => {
                load_stats
            }
        }
    }

    pub fn report(&self) -> Option<&Report> {
        match self {
            ReportOutcome::Ready(report) => Some(report.as_ref()),
            ReportOutcome::Empty { .. } | ReportOutcome::Cancelled { .. } => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ReportOutcome::Empty { .. })
    }

    /// The report, or [`Error::EmptyDataset`] when the run produced none.
    pub fn into_report(self) -> Result<Report> {
        match self {
            ReportOutcome::Ready(report) => Ok(*report),
            ReportOutcome::Empty { .. } | ReportOutcome::Cancelled { .. } => {
                Err(Error::EmptyDataset)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use crate::types::{EntityId, PlayEvent};
    use chrono::TimeZone;

    fn snapshot() -> AggregateSnapshot {
        let mut aggregator = Aggregator::new();
        for (y, artist, ms) in [(2022, "Alpha", 90_000), (2023, "Beta", 30_000), (2023, "Alpha", 10_000)] {
            aggregator.accumulate(&PlayEvent {
                timestamp: Utc.with_ymd_and_hms(y, 5, 1, 12, 0, 0).unwrap(),
                track_label: Some("Song".to_string()),
                artist_label: Some(artist.to_string()),
                album_label: None,
                ms_played: ms,
                platform: None,
                offline: false,
                skipped: false,
                track_uri: None,
            });
        }
        aggregator.finalize()
    }

    #[test]
    fn test_table_keys_and_ranking() {
        let tables = build_tables(&snapshot());
        let keys: Vec<&str> = tables.keys().map(String::as_str).collect();
        assert!(keys.contains(&"artist-table-all"));
        assert!(keys.contains(&"track-table-2022"));
        assert!(keys.contains(&"album-table-2023"));
        assert_eq!(keys.len(), 9);

        let artists = &tables["artist-table-all"];
        assert_eq!(artists[0].ms_played, 100_000);
        assert_eq!(artists[0].play_count, 2);
        let y2023 = &tables["artist-table-2023"];
        assert_eq!(y2023[0].ms_played, 30_000);
    }

    #[test]
    fn test_compact_rows_serialize_as_triples() {
        let tables = build_tables(&snapshot());
        let json = serde_json::to_value(&tables["artist-table-all"]).unwrap();
        assert_eq!(json, serde_json::json!([[0, 100_000, 2], [1, 30_000, 1]]));
    }

    #[test]
    fn test_daily_keys() {
        let daily = build_daily(&snapshot());
        assert_eq!(
            daily.keys().collect::<Vec<_>>(),
            vec!["2022-05-01", "2023-05-01"]
        );
        assert_eq!(daily["2023-05-01"].artist.len(), 2);
    }

    #[test]
    fn test_table_shape_reads_both_layouts() {
        let names = EntityNames {
            artist: vec!["Alpha".to_string(), "Beta".to_string()],
            ..Default::default()
        };

        let compact: TableShape = serde_json::from_str("[[1, 500, 2], [7, 10, 1]]").unwrap();
        assert_eq!(
            compact,
            TableShape::Compact(vec![
                TableRow { id: EntityId(1), ms_played: 500, play_count: 2 },
                TableRow { id: EntityId(7), ms_played: 10, play_count: 1 },
            ])
        );
        let rows = compact.into_named(Dimension::Artist, &names);
        assert_eq!(rows[0].name, "Beta");
        assert_eq!(rows[1].name, "Unknown Artist");

        let legacy: TableShape =
            serde_json::from_str(r#"[{"name": "Gamma", "ms_played": 42, "play_count": 3}]"#)
                .unwrap();
        let rows = legacy.into_named(Dimension::Artist, &names);
        assert_eq!(
            rows,
            vec![NamedRow { name: "Gamma".to_string(), ms_played: 42, play_count: 3 }]
        );
    }
}
