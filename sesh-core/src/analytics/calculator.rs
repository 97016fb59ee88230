//! Statistics calculator
//!
//! Turns a finalized [`AggregateSnapshot`] into [`DerivedStatistics`],
//! the personality profile and the smart playlists.
//!
//! Every computation is a pure function of the snapshot and the
//! [`CalculatorSettings`]; "today" is the explicit `as_of` date, so the same
//! inputs always give the same output. Empty or degenerate input produces
//! neutral values (zeros, `None`, empty lists), never an error.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sesh_core::analytics::{CalculatorSettings, StatisticsCalculator};
//!
//! let settings = CalculatorSettings::from_config(&config, as_of);
//! let calculator = StatisticsCalculator::new(&snapshot, &settings);
//! let stats = calculator.compute();
//! println!("Top archetype: {}", calculator.personality(&stats).name);
//! ```

use super::distribution::{self, ContinuityStats, DistributionStats};
use super::on_this_day::{self, OnThisDayEntry};
use super::patterns::{self, Milestones, Ratios, TimePatterns};
use super::personality::{ListeningProfile, PersonalityProfile};
use super::playlists::{self, SmartPlaylists};
use super::streaks::{self, HiatusStats, SessionStats, StreakStats};
use super::summary::{self, LibraryStats, OverviewStats, TrackStats};
use crate::aggregate::AggregateSnapshot;
use crate::config::Config;
use chrono::NaiveDate;
use serde::Serialize;

/// Inputs to the calculator besides the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculatorSettings {
    /// Reference "today" for streaks and days-since-first
    pub as_of: NaiveDate,
    /// Threshold used by "played every year"
    pub min_ms_played: u64,
    pub max_playlist_tracks: usize,
}

impl CalculatorSettings {
    pub fn from_config(config: &Config, as_of: NaiveDate) -> Self {
        Self {
            as_of,
            min_ms_played: config.filters.effective_min_ms_played(),
            max_playlist_tracks: config.report.max_playlist_tracks,
        }
    }
}

/// Every derived statistic of a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivedStatistics {
    pub as_of: Option<NaiveDate>,
    pub overview: OverviewStats,
    pub library: LibraryStats,
    pub tracks: TrackStats,
    pub sessions: SessionStats,
    pub streaks: StreakStats,
    pub hiatus: HiatusStats,
    pub patterns: TimePatterns,
    pub ratios: Ratios,
    pub milestones: Milestones,
    pub distribution: DistributionStats,
    pub continuity: ContinuityStats,
}

impl From<&DerivedStatistics> for ListeningProfile {
    fn from(stats: &DerivedStatistics) -> Self {
        Self {
            unique_ratio_pct: stats.tracks.unique_ratio_pct,
            gini: stats.distribution.gini,
            skip_rate_pct: stats.ratios.skip_rate_pct,
            weekend_ratio_pct: stats.ratios.weekend_ratio_pct,
            artists_count: stats.library.artists_count as f64,
            one_hit_pct: stats.library.one_hit_pct,
            avg_play_ms: stats.tracks.avg_play_ms,
            total_plays: stats.tracks.total_plays as f64,
            days_played: stats.overview.days_played as f64,
            days_since_first: stats.overview.days_since_first.max(1) as f64,
            longest_streak: stats.streaks.longest_streak_days as f64,
            tracks_count: stats.library.tracks_count as f64,
            albums_count: stats.library.albums_count as f64,
        }
    }
}

/// Computes derived statistics from one snapshot.
pub struct StatisticsCalculator<'a> {
    snapshot: &'a AggregateSnapshot,
    settings: &'a CalculatorSettings,
}

impl<'a> StatisticsCalculator<'a> {
    pub fn new(snapshot: &'a AggregateSnapshot, settings: &'a CalculatorSettings) -> Self {
        Self { snapshot, settings }
    }

    /// Compute every statistic in one go.
    pub fn compute(&self) -> DerivedStatistics {
        let snapshot = self.snapshot;
        let activity = snapshot.activity();
        let days = snapshot.days();

        let stats = DerivedStatistics {
            as_of: Some(self.settings.as_of),
            overview: summary::overview(snapshot, self.settings.as_of),
            library: summary::library(snapshot),
            tracks: summary::tracks(snapshot),
            sessions: streaks::sessions(activity.play_starts()),
            streaks: streaks::streaks(&days, self.settings.as_of),
            hiatus: streaks::hiatus(&days),
            patterns: patterns::time_patterns(activity),
            ratios: patterns::ratios(activity),
            milestones: patterns::milestones(activity),
            distribution: distribution::compute(snapshot),
            continuity: distribution::continuity(snapshot, self.settings.min_ms_played),
        };

        tracing::info!(
            plays = stats.tracks.total_plays,
            days_played = stats.overview.days_played,
            sessions = stats.sessions.count,
            longest_streak = stats.streaks.longest_streak_days,
            "Computed derived statistics"
        );

        stats
    }

    /// Score the listener archetypes from already computed statistics.
    pub fn personality(&self, stats: &DerivedStatistics) -> PersonalityProfile {
        let profile = ListeningProfile::from(stats).classify();
        tracing::debug!(primary = profile.name, "Classified listening personality");
        profile
    }

    pub fn playlists(&self) -> SmartPlaylists {
        playlists::smart_playlists(self.snapshot, self.settings.max_playlist_tracks)
    }

    /// Repeats on one calendar day across the years.
    pub fn on_this_day(&self, month: u32, day: u32) -> Vec<OnThisDayEntry> {
        on_this_day::on_this_day(self.snapshot, month, day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use crate::types::PlayEvent;
    use chrono::{TimeZone, Utc};

    fn settings(as_of: NaiveDate) -> CalculatorSettings {
        CalculatorSettings {
            as_of,
            min_ms_played: 0,
            max_playlist_tracks: 50,
        }
    }

    fn event(day: u32, hour: u32, artist: &str, track: &str) -> PlayEvent {
        PlayEvent {
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, hour, 0, 0).unwrap(),
            track_label: Some(track.to_string()),
            artist_label: Some(artist.to_string()),
            album_label: Some("LP".to_string()),
            ms_played: 180_000,
            platform: Some("ios".to_string()),
            offline: day % 2 == 0,
            skipped: false,
            track_uri: None,
        }
    }

    #[test]
    fn test_compute_end_to_end() {
        let mut aggregator = Aggregator::new();
        for day in 1..=5 {
            aggregator.accumulate(&event(day, 9, "Alpha", "Morning"));
            aggregator.accumulate(&event(day, 21, "Beta", "Night"));
        }
        let snapshot = aggregator.finalize();
        let as_of = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let settings = settings(as_of);
        let calculator = StatisticsCalculator::new(&snapshot, &settings);
        let stats = calculator.compute();

        assert_eq!(stats.tracks.total_plays, 10);
        assert_eq!(stats.streaks.current_streak_days, 5);
        assert_eq!(stats.streaks.longest_streak_days, 5);
        assert_eq!(stats.sessions.count, 10);
        assert_eq!(stats.library.artists_count, 2);
        assert!(stats.distribution.gini.abs() < 1e-9);
        assert_eq!(stats.distribution.eddington, 2);
        assert_eq!(stats.ratios.offline_plays, 4);
        assert_eq!(stats.continuity.every_year_artists, vec!["Alpha", "Beta"]);

        let personality = calculator.personality(&stats);
        assert_eq!(personality.scores.len(), 12);
        assert!(calculator.playlists().generated_for.is_some());
    }

    #[test]
    fn test_empty_snapshot_is_neutral() {
        let snapshot = Aggregator::new().finalize();
        let settings = settings(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let calculator = StatisticsCalculator::new(&snapshot, &settings);
        let stats = calculator.compute();

        assert_eq!(stats.tracks.total_plays, 0);
        assert_eq!(stats.sessions, SessionStats::default());
        assert_eq!(stats.milestones, Milestones::default());
        assert!(stats.continuity.breakouts.is_empty());
        assert!(calculator.playlists().playlists.is_empty());
        assert!(calculator.on_this_day(1, 1).is_empty());
    }

    #[test]
    fn test_listening_profile_from_stats() {
        let mut stats = DerivedStatistics::default();
        stats.library.artists_count = 40;
        stats.tracks.avg_play_ms = 240_000.0;
        let profile = ListeningProfile::from(&stats);
        assert_eq!(profile.artists_count, 40.0);
        assert_eq!(profile.days_since_first, 1.0);
        assert_eq!(profile.avg_play_ms, 240_000.0);
    }
}
