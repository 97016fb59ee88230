//! Overview, library and track totals.

use crate::aggregate::{AggregateSnapshot, PlayMarker};
use crate::format;
use crate::types::{Dimension, EntityId, Scope};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// First/last play, described for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayDescription {
    pub date: NaiveDate,
    pub artist: String,
    pub track: String,
    /// "Mar 15, 2024 (Artist - Track)"
    pub description: String,
}

/// How long and how often the history spans.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverviewStats {
    /// Days from the first play to the reference date
    pub days_since_first: u64,
    pub days_played: u64,
    pub pct_days_played: f64,
    pub first_play: Option<PlayDescription>,
    pub last_play: Option<PlayDescription>,
}

/// Size and shape of the library.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LibraryStats {
    pub artists_count: u64,
    pub albums_count: u64,
    pub tracks_count: u64,
    /// Artists with exactly one distinct track
    pub one_hit_artists: u64,
    pub one_hit_pct: f64,
    pub albums_per_artist: f64,
}

/// The track skipped most often.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MostSkipped {
    pub track: EntityId,
    pub label: String,
    pub skips: u64,
}

/// Listening time and track-level figures.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrackStats {
    pub total_ms: u64,
    pub total_plays: u64,
    pub avg_play_ms: f64,
    pub unique_tracks: u64,
    /// unique tracks / plays × 100
    pub unique_ratio_pct: f64,
    pub most_skipped: Option<MostSkipped>,
    /// Plays per platform family
    pub platforms: BTreeMap<String, u64>,
}

impl TrackStats {
    pub fn total_time_display(&self) -> String {
        format::format_duration_hms(self.total_ms)
    }

    pub fn avg_play_display(&self) -> String {
        format::format_duration_hms(self.avg_play_ms as u64)
    }
}

fn describe(snapshot: &AggregateSnapshot, marker: &PlayMarker) -> PlayDescription {
    let date = marker.timestamp.date_naive();
    let artist = snapshot.label(Dimension::Artist, marker.entities.artist);
    let track = snapshot
        .title(Dimension::Track, marker.entities.track, marker.entities.artist)
        .to_string();
    PlayDescription {
        date,
        artist: artist.to_string(),
        description: format!("{} ({} - {})", format::format_date(date), artist, track),
        track,
    }
}

pub(crate) fn overview(snapshot: &AggregateSnapshot, as_of: NaiveDate) -> OverviewStats {
    let activity = snapshot.activity();
    let Some(first_day) = activity.first_day() else {
        return OverviewStats::default();
    };

    let days_since_first = (as_of - first_day).num_days().max(0) as u64;
    let days_played = activity.daily.len() as u64;
    let pct_days_played = if days_since_first > 0 {
        days_played as f64 / days_since_first as f64 * 100.0
    } else {
        0.0
    };

    OverviewStats {
        days_since_first,
        days_played,
        pct_days_played,
        first_play: activity.first_play.as_ref().map(|m| describe(snapshot, m)),
        last_play: activity.last_play.as_ref().map(|m| describe(snapshot, m)),
    }
}

pub(crate) fn library(snapshot: &AggregateSnapshot) -> LibraryStats {
    let buckets = snapshot.buckets();
    let count = |dimension| buckets.entries(dimension, Scope::All).count() as u64;
    let artists_count = count(Dimension::Artist);
    let albums_count = count(Dimension::Album);
    let tracks_count = count(Dimension::Track);

    let one_hit_artists = snapshot
        .activity()
        .artist_tracks
        .iter()
        .filter(|(artist, tracks)| {
            tracks.len() == 1 && buckets.get(Dimension::Artist, Scope::All, **artist).is_some()
        })
        .count() as u64;

    let per_artist = |value: u64| {
        if artists_count == 0 {
            0.0
        } else {
            value as f64 / artists_count as f64
        }
    };

    LibraryStats {
        artists_count,
        albums_count,
        tracks_count,
        one_hit_artists,
        one_hit_pct: per_artist(one_hit_artists) * 100.0,
        albums_per_artist: per_artist(albums_count),
    }
}

pub(crate) fn tracks(snapshot: &AggregateSnapshot) -> TrackStats {
    let totals = snapshot.buckets().total(Dimension::Track, Scope::All);
    let unique_tracks = snapshot
        .buckets()
        .entries(Dimension::Track, Scope::All)
        .count() as u64;

    let (avg_play_ms, unique_ratio_pct) = if totals.play_count > 0 {
        (
            totals.ms_played as f64 / totals.play_count as f64,
            unique_tracks as f64 / totals.play_count as f64 * 100.0,
        )
    } else {
        (0.0, 0.0)
    };

    let most_skipped = snapshot
        .track_profiles()
        .iter()
        .filter(|(_, profile)| profile.skips > 0)
        .max_by(|(a_id, a), (b_id, b)| a.skips.cmp(&b.skips).then(b_id.cmp(a_id)))
        .map(|(id, profile)| MostSkipped {
            track: *id,
            label: snapshot.label(Dimension::Track, *id).to_string(),
            skips: profile.skips,
        });

    TrackStats {
        total_ms: totals.ms_played,
        total_plays: totals.play_count,
        avg_play_ms,
        unique_tracks,
        unique_ratio_pct,
        most_skipped,
        platforms: snapshot.activity().platforms.clone(),
    }
}
