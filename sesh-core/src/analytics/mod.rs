//! Analytics module for sesh
//!
//! Derives statistics from a finalized aggregate snapshot:
//! - Overview, library and track totals
//! - Listening sessions, streaks and hiatuses
//! - Time patterns, ratios and popular periods
//! - Distribution metrics (Gini, Eddington, artist continuity)
//! - Personality classification
//! - "On This Day" repeats
//! - Smart playlists
//!
//! See [`calculator`] for the entry point.

pub mod calculator;
pub mod distribution;
pub mod metrics;
pub mod on_this_day;
pub mod patterns;
pub mod personality;
pub mod playlists;
pub mod streaks;
pub mod summary;

pub use calculator::{CalculatorSettings, DerivedStatistics, StatisticsCalculator};
pub use distribution::{Breakout, ContinuityStats, DistributionStats, BREAKOUT_PERCENTILE};
pub use metrics::{flatten, metric_descriptors, DerivedStatistic, MetricDescriptor, MetricValueType};
pub use on_this_day::{on_this_day_index, OnThisDayEntry, ON_THIS_DAY_MIN_REPEATS};
pub use patterns::{Milestones, PopularPeriod, Ratios, TimePatterns};
pub use personality::{Archetype, ArchetypeScore, ListeningProfile, PersonalityProfile};
pub use playlists::{
    seasonal_echoes, smart_playlists, EvaluateAt, Playlist, PlaylistDefinition, PlaylistItem,
    PlaylistRule, SeasonalIndex, SeasonalPick, SmartPlaylists,
};
pub use streaks::{HiatusStats, SessionStats, StreakStats, SESSION_IDLE_GAP};
pub use summary::{LibraryStats, MostSkipped, OverviewStats, PlayDescription, TrackStats};
