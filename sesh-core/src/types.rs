//! Core domain types for sesh
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Play** | One recorded instance of a track being played ([`PlayEvent`]) |
//! | **Dimension** | The axis plays are grouped along: artist, track or album |
//! | **Entity** | A distinct artist, track or album, identified by its normalized label |
//! | **Scope** | The time window of a bucket: everything, one year, or one day |
//! | **Bucket** | Accumulated `(ms_played, play_count)` for one dimension, scope and entity |

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================
// Play events
// ============================================

/// A single validated play, as yielded by the loader.
///
/// Play events are ephemeral: the aggregator folds each one into its buckets
/// and drops it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayEvent {
    /// When the track started playing
    pub timestamp: DateTime<Utc>,
    pub track_label: Option<String>,
    pub artist_label: Option<String>,
    pub album_label: Option<String>,
    /// Milliseconds actually played (always > 0 once filtered)
    pub ms_played: u64,
    /// Raw platform tag, e.g. "android" or "windows 10 (10.0.19041; x64)"
    pub platform: Option<String>,
    /// Played from the offline cache
    pub offline: bool,
    pub skipped: bool,
    /// External identifier, carried through for cross-linking only
    pub track_uri: Option<String>,
}

impl PlayEvent {
    /// Calendar day of the play (UTC).
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    pub fn year(&self) -> i32 {
        self.timestamp.year()
    }
}

// ============================================
// Dimensions and entities
// ============================================

/// The axis along which plays are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Artist,
    Track,
    Album,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Artist, Dimension::Track, Dimension::Album];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Artist => "artist",
            Dimension::Track => "track",
            Dimension::Album => "album",
        }
    }

    /// Label used for entries with no usable name.
    pub fn unknown_label(&self) -> &'static str {
        match self {
            Dimension::Artist => "Unknown Artist",
            Dimension::Track => "Unknown Track",
            Dimension::Album => "Unknown Album",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            Dimension::Artist => 0,
            Dimension::Track => 1,
            Dimension::Album => 2,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "artist" => Ok(Dimension::Artist),
            "track" => Ok(Dimension::Track),
            "album" => Ok(Dimension::Album),
            _ => Err(format!("unknown dimension: {}", s)),
        }
    }
}

/// Small integer id for an interned label, unique within one dimension and one run.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl EntityId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The three entity ids a single play contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventEntities {
    pub artist: EntityId,
    pub track: EntityId,
    pub album: EntityId,
}

impl EventEntities {
    pub fn get(&self, dimension: Dimension) -> EntityId {
        match dimension {
            Dimension::Artist => self.artist,
            Dimension::Track => self.track,
            Dimension::Album => self.album,
        }
    }
}

// ============================================
// Buckets
// ============================================

/// Time window of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    All,
    Year(i32),
    Day(NaiveDate),
}

impl Scope {
    /// Key fragment used in table ids ("all", "2023", "2023-06-01").
    pub fn key(&self) -> String {
        match self {
            Scope::All => "all".to_string(),
            Scope::Year(year) => year.to_string(),
            Scope::Day(date) => date.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Accumulated play time and count for one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub ms_played: u64,
    pub play_count: u64,
}

impl Totals {
    pub fn add_play(&mut self, ms_played: u64) {
        self.ms_played += ms_played;
        self.play_count += 1;
    }

    pub fn merge(&mut self, other: Totals) {
        self.ms_played += other.ms_played;
        self.play_count += other.play_count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_roundtrip_str() {
        for dimension in Dimension::ALL {
            assert_eq!(dimension.as_str().parse::<Dimension>(), Ok(dimension));
        }
        assert!("genre".parse::<Dimension>().is_err());
    }

    #[test]
    fn test_scope_keys() {
        assert_eq!(Scope::All.key(), "all");
        assert_eq!(Scope::Year(2023).key(), "2023");
        let day = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        assert_eq!(Scope::Day(day).key(), "2023-06-01");
    }

    #[test]
    fn test_totals_accumulate() {
        let mut totals = Totals::default();
        totals.add_play(1_000);
        totals.add_play(500);
        totals.merge(Totals {
            ms_played: 250,
            play_count: 1,
        });
        assert_eq!(totals.ms_played, 1_750);
        assert_eq!(totals.play_count, 3);
    }
}
