//! Flat named metrics for discovery and export.
//!
//! The structured [`DerivedStatistics`] is what the report renders; this
//! module flattens the headline scalars into `(group, name, value)` rows and
//! keeps a registry documenting each of them.

use super::calculator::DerivedStatistics;
use super::personality::PersonalityProfile;
use serde::Serialize;
use serde_json::json;

/// Type of metric value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricValueType {
    Integer,
    Float,
    Text,
}

impl MetricValueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricValueType::Integer => "integer",
            MetricValueType::Float => "float",
            MetricValueType::Text => "text",
        }
    }
}

/// Descriptor for one flattened metric.
#[derive(Debug, Clone)]
pub struct MetricDescriptor {
    pub group: &'static str,
    pub name: &'static str,
    pub value_type: MetricValueType,
    pub summary: &'static str,
}

const fn metric(
    group: &'static str,
    name: &'static str,
    value_type: MetricValueType,
    summary: &'static str,
) -> MetricDescriptor {
    MetricDescriptor {
        group,
        name,
        value_type,
        summary,
    }
}

use MetricValueType::{Float, Integer, Text};

const METRICS: &[MetricDescriptor] = &[
    metric("overview", "days_since_first", Integer, "Days from the first play to the reference date."),
    metric("overview", "days_played", Integer, "Days with at least one play."),
    metric("overview", "pct_days_played", Float, "Share of days since the first play with a play."),
    metric("library", "artists_count", Integer, "Distinct artists."),
    metric("library", "albums_count", Integer, "Distinct albums."),
    metric("library", "tracks_count", Integer, "Distinct tracks."),
    metric("library", "one_hit_artists", Integer, "Artists with exactly one distinct track."),
    metric("library", "albums_per_artist", Float, "Distinct albums divided by distinct artists."),
    metric("listening", "total_ms", Integer, "Total milliseconds played."),
    metric("listening", "total_plays", Integer, "Counted plays."),
    metric("listening", "avg_play_ms", Float, "Mean milliseconds per play."),
    metric("listening", "unique_ratio_pct", Float, "Distinct tracks per 100 plays."),
    metric("sessions", "session_count", Integer, "Listening sessions (30 min idle gap)."),
    metric("sessions", "avg_session_secs", Integer, "Mean session length in seconds."),
    metric("sessions", "longest_session_secs", Integer, "Longest session length in seconds."),
    metric("streaks", "current_streak_days", Integer, "Active days in a row ending on the reference date."),
    metric("streaks", "longest_streak_days", Integer, "Longest run of active days."),
    metric("streaks", "longest_hiatus_days", Integer, "Longest run of silent days inside the history."),
    metric("patterns", "peak_hour", Text, "Hour of day with the most plays."),
    metric("patterns", "busiest_weekday", Text, "Weekday with the most plays."),
    metric("ratios", "weekend_ratio_pct", Float, "Weekend plays per 100 weekday plays."),
    metric("ratios", "skip_rate_pct", Float, "Skipped plays per 100 plays."),
    metric("ratios", "offline_ratio_pct", Float, "Offline plays per 100 plays."),
    metric("distribution", "artist_gini", Float, "Gini coefficient of per-artist play counts."),
    metric("distribution", "eddington", Integer, "Largest N with N days of at least N plays."),
    metric("distribution", "eddington_next_need", Integer, "Days still needed for the next Eddington number."),
    metric("distribution", "artist_cutover", Integer, "h-index of per-artist play counts."),
    metric("personality", "primary_archetype", Text, "Highest-scoring listener archetype."),
];

/// Every metric [`flatten`] can emit.
pub fn metric_descriptors() -> &'static [MetricDescriptor] {
    METRICS
}

/// A single named metric value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedStatistic {
    pub group: String,
    pub name: String,
    /// Value (JSON for flexibility: number or string)
    pub value: serde_json::Value,
}

impl DerivedStatistic {
    pub fn new(group: &str, name: &str, value: serde_json::Value) -> Self {
        Self {
            group: group.to_string(),
            name: name.to_string(),
            value,
        }
    }
}

/// Flatten the headline statistics into named metrics.
pub fn flatten(stats: &DerivedStatistics, personality: &PersonalityProfile) -> Vec<DerivedStatistic> {
    let m = DerivedStatistic::new;
    vec![
        m("overview", "days_since_first", json!(stats.overview.days_since_first)),
        m("overview", "days_played", json!(stats.overview.days_played)),
        m("overview", "pct_days_played", json!(stats.overview.pct_days_played)),
        m("library", "artists_count", json!(stats.library.artists_count)),
        m("library", "albums_count", json!(stats.library.albums_count)),
        m("library", "tracks_count", json!(stats.library.tracks_count)),
        m("library", "one_hit_artists", json!(stats.library.one_hit_artists)),
        m("library", "albums_per_artist", json!(stats.library.albums_per_artist)),
        m("listening", "total_ms", json!(stats.tracks.total_ms)),
        m("listening", "total_plays", json!(stats.tracks.total_plays)),
        m("listening", "avg_play_ms", json!(stats.tracks.avg_play_ms)),
        m("listening", "unique_ratio_pct", json!(stats.tracks.unique_ratio_pct)),
        m("sessions", "session_count", json!(stats.sessions.count)),
        m("sessions", "avg_session_secs", json!(stats.sessions.avg_length_secs)),
        m("sessions", "longest_session_secs", json!(stats.sessions.longest_length_secs)),
        m("streaks", "current_streak_days", json!(stats.streaks.current_streak_days)),
        m("streaks", "longest_streak_days", json!(stats.streaks.longest_streak_days)),
        m("streaks", "longest_hiatus_days", json!(stats.hiatus.longest_days)),
        m("patterns", "peak_hour", json!(stats.patterns.peak_hour_display())),
        m("patterns", "busiest_weekday", json!(stats.patterns.busiest_weekday_name())),
        m("ratios", "weekend_ratio_pct", json!(stats.ratios.weekend_ratio_pct)),
        m("ratios", "skip_rate_pct", json!(stats.ratios.skip_rate_pct)),
        m("ratios", "offline_ratio_pct", json!(stats.ratios.offline_ratio_pct)),
        m("distribution", "artist_gini", json!(stats.distribution.gini)),
        m("distribution", "eddington", json!(stats.distribution.eddington)),
        m("distribution", "eddington_next_need", json!(stats.distribution.eddington_next_need)),
        m("distribution", "artist_cutover", json!(stats.distribution.artist_cutover)),
        m("personality", "primary_archetype", json!(personality.name)),
    ]
}
