//! Compact per-run summaries kept alongside the buckets.
//!
//! These replace a second pass over the raw events: everything the
//! statistics need beyond per-bucket totals is folded in here as events
//! stream by.

use crate::types::{EntityId, EventEntities, PlayEvent, Totals};
use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// A play pinned to its entities, used for first/last play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayMarker {
    pub timestamp: DateTime<Utc>,
    pub entities: EventEntities,
}

/// Run-wide activity counters.
#[derive(Debug, Clone)]
pub struct ActivitySummary {
    /// Play start times in unix seconds; sorted once finalized
    play_starts: Vec<i64>,
    /// Plays per hour of day (UTC)
    pub hours: [u64; 24],
    /// Plays per weekday, Monday first
    pub weekdays: [u64; 7],
    /// Totals per calendar day
    pub daily: BTreeMap<NaiveDate, Totals>,
    pub totals: Totals,
    pub skipped: u64,
    pub offline: u64,
    /// Plays per platform family ("android", "ios", ...)
    pub platforms: BTreeMap<String, u64>,
    pub first_play: Option<PlayMarker>,
    pub last_play: Option<PlayMarker>,
    /// Distinct tracks per artist
    pub artist_tracks: HashMap<EntityId, HashSet<EntityId>>,
    /// Distinct albums per artist
    pub artist_albums: HashMap<EntityId, HashSet<EntityId>>,
}

impl Default for ActivitySummary {
    fn default() -> Self {
        Self {
            play_starts: Vec::new(),
            hours: [0; 24],
            weekdays: [0; 7],
            daily: BTreeMap::new(),
            totals: Totals::default(),
            skipped: 0,
            offline: 0,
            platforms: BTreeMap::new(),
            first_play: None,
            last_play: None,
            artist_tracks: HashMap::new(),
            artist_albums: HashMap::new(),
        }
    }
}

impl ActivitySummary {
    pub(crate) fn record(&mut self, event: &PlayEvent, entities: EventEntities) {
        let ts = event.timestamp;
        self.play_starts.push(ts.timestamp());
        self.hours[ts.hour() as usize] += 1;
        self.weekdays[ts.weekday().num_days_from_monday() as usize] += 1;
        self.daily
            .entry(ts.date_naive())
            .or_default()
            .add_play(event.ms_played);
        self.totals.add_play(event.ms_played);

        if event.skipped {
            self.skipped += 1;
        }
        if event.offline {
            self.offline += 1;
        }
        *self
            .platforms
            .entry(platform_family(event.platform.as_deref()).to_string())
            .or_default() += 1;

        let marker = PlayMarker {
            timestamp: ts,
            entities,
        };
        if self.first_play.map_or(true, |first| ts < first.timestamp) {
            self.first_play = Some(marker);
        }
        if self.last_play.map_or(true, |last| ts > last.timestamp) {
            self.last_play = Some(marker);
        }

        self.artist_tracks
            .entry(entities.artist)
            .or_default()
            .insert(entities.track);
        self.artist_albums
            .entry(entities.artist)
            .or_default()
            .insert(entities.album);
    }

    pub(crate) fn finalize(&mut self) {
        self.play_starts.sort_unstable();
    }

    /// Play start times (unix seconds), ascending.
    pub fn play_starts(&self) -> &[i64] {
        &self.play_starts
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        self.daily.keys().next().copied()
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        self.daily.keys().next_back().copied()
    }
}

/// Collapse a raw platform tag into a small family name.
pub fn platform_family(raw: Option<&str>) -> &'static str {
    let Some(raw) = raw else {
        return "unknown";
    };
    let lower = raw.to_ascii_lowercase();
    if lower.contains("android") {
        "android"
    } else if lower.starts_with("ios") || lower.contains("iphone") || lower.contains("ipad") {
        "ios"
    } else if lower.contains("windows") {
        "windows"
    } else if lower.contains("os x") || lower.contains("osx") || lower.contains("macos") {
        "macos"
    } else if lower.contains("linux") {
        "linux"
    } else if lower.contains("web") || lower.contains("browser") {
        "web"
    } else if lower.trim().is_empty() {
        "unknown"
    } else {
        "other"
    }
}

/// The longest single play of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlaySample {
    pub timestamp: DateTime<Utc>,
    pub ms_played: u64,
}

/// Everything the smart playlists need to know about one track.
#[derive(Debug, Clone)]
pub struct TrackProfile {
    pub artist: EntityId,
    /// Album of the best sample
    pub album: EntityId,
    pub totals: Totals,
    pub skips: u64,
    pub first_played: DateTime<Utc>,
    pub last_played: DateTime<Utc>,
    pub best_sample: PlaySample,
    /// Distinct days with a play inside commute hours (07-09h, 16-18h)
    pub commute_days: BTreeSet<NaiveDate>,
    /// Plays per (year, quarter 1-4)
    pub quarters: BTreeMap<(i32, u32), u64>,
    /// Totals per calendar month across all years, January first
    pub months: [Totals; 12],
}

impl TrackProfile {
    pub(crate) fn new(event: &PlayEvent, entities: EventEntities) -> Self {
        Self {
            artist: entities.artist,
            album: entities.album,
            totals: Totals::default(),
            skips: 0,
            first_played: event.timestamp,
            last_played: event.timestamp,
            best_sample: PlaySample {
                timestamp: event.timestamp,
                ms_played: event.ms_played,
            },
            commute_days: BTreeSet::new(),
            quarters: BTreeMap::new(),
            months: [Totals::default(); 12],
        }
    }

    pub(crate) fn record(&mut self, event: &PlayEvent, entities: EventEntities) {
        let ts = event.timestamp;
        self.totals.add_play(event.ms_played);
        if event.skipped {
            self.skips += 1;
        }
        self.first_played = self.first_played.min(ts);
        self.last_played = self.last_played.max(ts);

        if event.ms_played > self.best_sample.ms_played {
            self.best_sample = PlaySample {
                timestamp: ts,
                ms_played: event.ms_played,
            };
            self.album = entities.album;
        }

        if is_commute_hour(ts.hour()) {
            self.commute_days.insert(ts.date_naive());
        }
        *self
            .quarters
            .entry((ts.year(), (ts.month() - 1) / 3 + 1))
            .or_default() += 1;
        self.months[ts.month0() as usize].add_play(event.ms_played);
    }

    /// Average milliseconds per play.
    pub fn avg_ms(&self) -> f64 {
        if self.totals.play_count == 0 {
            0.0
        } else {
            self.totals.ms_played as f64 / self.totals.play_count as f64
        }
    }

    pub fn skip_rate(&self) -> f64 {
        if self.totals.play_count == 0 {
            0.0
        } else {
            self.skips as f64 / self.totals.play_count as f64
        }
    }
}

fn is_commute_hour(hour: u32) -> bool {
    (7..=9).contains(&hour) || (16..=18).contains(&hour)
}

/// Per-artist lifetime facts.
#[derive(Debug, Clone, Copy)]
pub struct ArtistProfile {
    pub first_seen: DateTime<Utc>,
    pub totals: Totals,
}
