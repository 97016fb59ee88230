//! Smart playlists
//!
//! Every playlist is a [`PlaylistDefinition`]: a name, a description, the
//! [`PlaylistRule`] that picks tracks from the per-track profiles, and an
//! [`EvaluateAt`] marker saying when the rule is meant to run.
//!
//! ```text
//! TrackProfile (per track) ──► PlaylistRule::select ──► ranked ids
//!                                                          │
//!                          dedupe (uri or id) ◄────────────┘
//!                                  │
//!                       clip to max_tracks ──► Playlist
//! ```
//!
//! All rules are frozen at generation time except Seasonal Echoes, which is
//! evaluated at view time: a consumer re-ranks it for the viewer's current
//! month from the published [`SeasonalIndex`] with [`seasonal_echoes`].
//! The generation-time items (for the month of the latest play) remain as
//! a fallback.

use crate::aggregate::{AggregateSnapshot, TrackProfile};
use crate::format;
use crate::types::{Dimension, EntityId, Totals};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};

/// A year gets a Rediscover playlist when this many tracks were first heard in it.
pub const REDISCOVER_MIN_TRACKS: usize = 10;
/// At most this many Rediscover playlists, oldest years first.
pub const REDISCOVER_MAX_YEARS: usize = 8;

const DEEP_CUTS_TOP_ARTISTS: usize = 10;
const DEEP_CUTS_PER_ARTIST: usize = 3;
const DEEP_CUTS_MAX_PLAYS: u64 = 3;
const NEW_ARTIST_WINDOW_DAYS: i64 = 90;
const FORGOTTEN_AFTER_DAYS: i64 = 120;
const FRESH_WINDOW_DAYS: i64 = 60;
const CITY_SKYLINE_PER_ARTIST: usize = 3;
const LATE_BLOOMERS_PER_ARTIST: usize = 3;
const FRESH_REPEAT_PER_ARTIST: usize = 5;
const VARIETY_TOP_ARTISTS: usize = 100;

/// When a playlist's rule is meant to be evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluateAt {
    /// Frozen when the report is generated
    Generation,
    /// Re-evaluated when the report is viewed
    ViewTime,
}

/// Selection rule of a smart playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlaylistRule {
    SundayEvening,
    HighFocus,
    Rediscover { year: i32 },
    DeepCuts,
    NewArtistSampler,
    SkippedRedemption,
    MorningBoost,
    NightOwl,
    WeekendBangers,
    WeekdayFlow,
    ForgottenFavorites,
    CitySkyline,
    LateBloomers,
    OneHitGems,
    ZeroSkipKeepers,
    QuickHits,
    /// Generation-time month (1-12)
    SeasonalEchoes { month: u32 },
    FreshRepeatOffenders,
    ArtistVarietySampler,
}

impl PlaylistRule {
    pub fn name(&self) -> String {
        match self {
            PlaylistRule::SundayEvening => "Sunday Evening Wind‑down".to_string(),
            PlaylistRule::HighFocus => "High‑Focus Mix".to_string(),
            PlaylistRule::Rediscover { year } => format!("Rediscover {}", year),
            PlaylistRule::DeepCuts => "Deep Cuts from Top Artists".to_string(),
            PlaylistRule::NewArtistSampler => "New Artist Sampler".to_string(),
            PlaylistRule::SkippedRedemption => "Most Skipped – Redemption".to_string(),
            PlaylistRule::MorningBoost => "Morning Boost".to_string(),
            PlaylistRule::NightOwl => "Night Owl Mix".to_string(),
            PlaylistRule::WeekendBangers => "Weekend Bangers".to_string(),
            PlaylistRule::WeekdayFlow => "Weekday Flow".to_string(),
            PlaylistRule::ForgottenFavorites => "Forgotten Favorites".to_string(),
            PlaylistRule::CitySkyline => "City Skyline Shuffle".to_string(),
            PlaylistRule::LateBloomers => "Late‑Bloomers".to_string(),
            PlaylistRule::OneHitGems => "One‑Hit Wonder Gems".to_string(),
            PlaylistRule::ZeroSkipKeepers => "Zero‑Skip Keepers".to_string(),
            PlaylistRule::QuickHits => "Quick Hits".to_string(),
            PlaylistRule::SeasonalEchoes { .. } => "Seasonal Echoes".to_string(),
            PlaylistRule::FreshRepeatOffenders => "Fresh Repeat Offenders".to_string(),
            PlaylistRule::ArtistVarietySampler => "Artist Variety Sampler".to_string(),
        }
    }

    pub fn description(&self) -> String {
        match self {
            PlaylistRule::SundayEvening => {
                "Laid‑back tracks you tended to play on Sunday evenings.".to_string()
            }
            PlaylistRule::HighFocus => {
                "Low skip‑rate, longer‑engagement tracks for concentration.".to_string()
            }
            PlaylistRule::Rediscover { year } => {
                format!("Bring back favorites first discovered in {}.", year)
            }
            PlaylistRule::DeepCuts => "Lesser‑played tracks from your most‑played artists.".to_string(),
            PlaylistRule::NewArtistSampler => {
                "One standout track from artists you discovered recently.".to_string()
            }
            PlaylistRule::SkippedRedemption => {
                "Tracks you sometimes skipped but still gave a chance.".to_string()
            }
            PlaylistRule::MorningBoost => "Your most morning‑friendly plays (6–10am).".to_string(),
            PlaylistRule::NightOwl => "Late‑night listens between midnight and 4am.".to_string(),
            PlaylistRule::WeekendBangers => {
                "Songs you gravitate to on Saturdays and Sundays.".to_string()
            }
            PlaylistRule::WeekdayFlow => "Reliable weekday companions for work or study.".to_string(),
            PlaylistRule::ForgottenFavorites => {
                "Bring back tracks you loved but haven’t played lately.".to_string()
            }
            PlaylistRule::CitySkyline => {
                "Commute‑hour staples across different days – mid‑length, easy flow.".to_string()
            }
            PlaylistRule::LateBloomers => {
                "Slow‑burn risers across quarters – getting better with time.".to_string()
            }
            PlaylistRule::OneHitGems => {
                "Great songs from artists you only played once in your history.".to_string()
            }
            PlaylistRule::ZeroSkipKeepers => {
                "Often played and never skipped – certified keepers.".to_string()
            }
            PlaylistRule::QuickHits => "Short and snappy – quick listens you return to.".to_string(),
            PlaylistRule::SeasonalEchoes { .. } => {
                "Tracks you gravitate to this month across the years.".to_string()
            }
            PlaylistRule::FreshRepeatOffenders => {
                "New discoveries you already replay a lot.".to_string()
            }
            PlaylistRule::ArtistVarietySampler => {
                "One strong pick from many of your favorite artists.".to_string()
            }
        }
    }

    pub fn evaluate_at(&self) -> EvaluateAt {
        match self {
            PlaylistRule::SeasonalEchoes { .. } => EvaluateAt::ViewTime,
            _ => EvaluateAt::Generation,
        }
    }
}

/// A named playlist recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistDefinition {
    pub name: String,
    pub description: String,
    pub evaluate_at: EvaluateAt,
    pub rule: PlaylistRule,
}

impl From<PlaylistRule> for PlaylistDefinition {
    fn from(rule: PlaylistRule) -> Self {
        Self {
            name: rule.name(),
            description: rule.description(),
            evaluate_at: rule.evaluate_at(),
            rule,
        }
    }
}

/// Every playlist definition for a run, in generation order.
pub fn definitions(rediscover_years: &[i32], month: u32) -> Vec<PlaylistDefinition> {
    let mut rules = vec![PlaylistRule::SundayEvening, PlaylistRule::HighFocus];
    rules.extend(
        rediscover_years
            .iter()
            .map(|year| PlaylistRule::Rediscover { year: *year }),
    );
    rules.extend([
        PlaylistRule::DeepCuts,
        PlaylistRule::NewArtistSampler,
        PlaylistRule::SkippedRedemption,
        PlaylistRule::MorningBoost,
        PlaylistRule::NightOwl,
        PlaylistRule::WeekendBangers,
        PlaylistRule::WeekdayFlow,
        PlaylistRule::ForgottenFavorites,
        PlaylistRule::CitySkyline,
        PlaylistRule::LateBloomers,
        PlaylistRule::OneHitGems,
        PlaylistRule::ZeroSkipKeepers,
        PlaylistRule::QuickHits,
        PlaylistRule::SeasonalEchoes { month },
        PlaylistRule::FreshRepeatOffenders,
        PlaylistRule::ArtistVarietySampler,
    ]);
    rules.into_iter().map(PlaylistDefinition::from).collect()
}

/// One track in a playlist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaylistItem {
    pub track: EntityId,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub uri: Option<String>,
    /// Longest single play of the track
    pub ms_played_sample: u64,
    pub why: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Playlist {
    #[serde(flatten)]
    pub definition: PlaylistDefinition,
    pub items: Vec<PlaylistItem>,
}

/// All generated playlists plus the data to re-run Seasonal Echoes later.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SmartPlaylists {
    /// Date of the latest play, the reference "now" of every rule
    pub generated_for: Option<NaiveDate>,
    /// Non-empty playlists, sorted case-insensitively by name
    pub playlists: Vec<Playlist>,
    pub seasonal_index: SeasonalIndex,
}

impl SmartPlaylists {
    pub fn get(&self, name: &str) -> Option<&Playlist> {
        self.playlists.iter().find(|p| p.definition.name == name)
    }
}

// ============================================
// Seasonal index
// ============================================

/// Per-track totals by calendar month (1-12) across all years.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeasonalIndex {
    tracks: BTreeMap<EntityId, BTreeMap<u32, Totals>>,
}

impl SeasonalIndex {
    pub fn from_profiles<'a>(
        profiles: impl IntoIterator<Item = (&'a EntityId, &'a TrackProfile)>,
    ) -> Self {
        let tracks = profiles
            .into_iter()
            .map(|(track, profile)| {
                let months = profile
                    .months
                    .iter()
                    .enumerate()
                    .filter(|(_, totals)| totals.play_count > 0)
                    .map(|(month0, totals)| (month0 as u32 + 1, *totals))
                    .collect();
                (*track, months)
            })
            .collect();
        Self { tracks }
    }

    /// Totals of one track in one calendar month.
    pub fn month(&self, track: EntityId, month: u32) -> Totals {
        self.tracks
            .get(&track)
            .and_then(|months| months.get(&month))
            .copied()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// A Seasonal Echoes pick with its score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeasonalPick {
    pub track: EntityId,
    pub score: u64,
}

/// Rank tracks for a calendar month.
///
/// A track qualifies with at least two plays or two minutes in that month
/// (any year). Score = month ms + 30 s per repeat play.
pub fn seasonal_echoes(index: &SeasonalIndex, month: u32, cap: usize) -> Vec<SeasonalPick> {
    let mut picks: Vec<SeasonalPick> = index
        .tracks
        .iter()
        .filter_map(|(track, months)| {
            let totals = months.get(&month)?;
            if totals.play_count < 2 && totals.ms_played < 120_000 {
                return None;
            }
            Some(SeasonalPick {
                track: *track,
                score: totals.ms_played + 30_000 * totals.play_count.saturating_sub(1),
            })
        })
        .collect();
    picks.sort_by(|a, b| b.score.cmp(&a.score).then(a.track.cmp(&b.track)));
    picks.truncate(cap);
    picks
}

// ============================================
// Generation
// ============================================

/// Slope of the last six (year, quarter) play counts times their sum, or
/// `None` unless the track is steadily rising.
fn late_bloom_score(quarters: &BTreeMap<(i32, u32), u64>) -> Option<f64> {
    let counts: Vec<f64> = quarters.values().map(|c| *c as f64).collect();
    if counts.len() < 3 || counts.iter().sum::<f64>() < 3.0 {
        return None;
    }

    let tail = &counts[counts.len().saturating_sub(6)..];
    let n = tail.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = tail.iter().sum::<f64>() / n;
    let (mut num, mut den) = (0.0, 0.0);
    for (x, y) in tail.iter().enumerate() {
        let dx = x as f64 - mean_x;
        num += dx * (y - mean_y);
        den += dx * dx;
    }
    let slope = num / if den == 0.0 { 1.0 } else { den };

    let last = tail[tail.len() - 1];
    let prev = tail[tail.len() - 2];
    if slope <= 0.0 || last < prev {
        return None;
    }
    Some(slope * tail.iter().sum::<f64>())
}

/// Read-only view over the track profiles shared by every rule.
struct TrackIndex<'a> {
    snapshot: &'a AggregateSnapshot,
    seasonal: &'a SeasonalIndex,
    now: DateTime<Utc>,
    max_tracks: usize,
    /// Ordered by id
    tracks: Vec<(EntityId, &'a TrackProfile)>,
    by_artist: HashMap<EntityId, Vec<(EntityId, &'a TrackProfile)>>,
    /// Every artist, by lifetime ms descending
    artists_by_ms: Vec<EntityId>,
}

impl<'a> TrackIndex<'a> {
    fn new(
        snapshot: &'a AggregateSnapshot,
        seasonal: &'a SeasonalIndex,
        now: DateTime<Utc>,
        max_tracks: usize,
    ) -> Self {
        let mut tracks: Vec<(EntityId, &TrackProfile)> = snapshot
            .track_profiles()
            .iter()
            .map(|(id, profile)| (*id, profile))
            .collect();
        tracks.sort_by_key(|(id, _)| *id);

        let mut by_artist: HashMap<EntityId, Vec<(EntityId, &TrackProfile)>> = HashMap::new();
        for (id, profile) in &tracks {
            by_artist.entry(profile.artist).or_default().push((*id, *profile));
        }

        let mut artists: Vec<(EntityId, u64)> = snapshot
            .artist_profiles()
            .iter()
            .map(|(id, profile)| (*id, profile.totals.ms_played))
            .collect();
        artists.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        Self {
            snapshot,
            seasonal,
            now,
            max_tracks,
            tracks,
            by_artist,
            artists_by_ms: artists.into_iter().map(|(id, _)| id).collect(),
        }
    }

    /// Years (ascending) with enough first-heard tracks for a Rediscover playlist.
    fn rediscover_years(&self) -> Vec<i32> {
        let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
        for (_, profile) in &self.tracks {
            *counts.entry(profile.first_played.year()).or_default() += 1;
        }
        counts
            .into_iter()
            .filter(|(_, count)| *count >= REDISCOVER_MIN_TRACKS)
            .map(|(year, _)| year)
            .take(REDISCOVER_MAX_YEARS)
            .collect()
    }

    /// Tracks with a score, best first (ties by id).
    fn rank_by<F>(&self, score: F) -> Vec<EntityId>
    where
        F: Fn(&TrackProfile) -> Option<f64>,
    {
        let mut scored: Vec<(EntityId, f64)> = self
            .tracks
            .iter()
            .filter_map(|&(id, profile)| score(profile).map(|s| (id, s)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.into_iter().map(|(id, _)| id).collect()
    }

    fn profile(&self, track: EntityId) -> Option<&'a TrackProfile> {
        self.snapshot.track_profiles().get(&track)
    }

    fn cap_per_artist(&self, ranked: Vec<EntityId>, cap: usize) -> Vec<EntityId> {
        let mut added: HashMap<EntityId, usize> = HashMap::new();
        let mut kept = Vec::new();
        for track in ranked {
            let Some(profile) = self.profile(track) else {
                continue;
            };
            let count = added.entry(profile.artist).or_default();
            if *count >= cap {
                continue;
            }
            *count += 1;
            kept.push(track);
            if kept.len() >= self.max_tracks {
                break;
            }
        }
        kept
    }

    /// Round-robin over the top artists' lesser-played tracks.
    fn deep_cuts(&self) -> Vec<EntityId> {
        let mut queues: Vec<VecDeque<EntityId>> = self
            .artists_by_ms
            .iter()
            .take(DEEP_CUTS_TOP_ARTISTS)
            .map(|artist| {
                let mut ranked = self.by_artist.get(artist).cloned().unwrap_or_default();
                ranked.sort_by(|a, b| {
                    b.1.totals
                        .play_count
                        .cmp(&a.1.totals.play_count)
                        .then(a.0.cmp(&b.0))
                });
                ranked
                    .into_iter()
                    .skip(2)
                    .filter(|(_, profile)| profile.totals.play_count <= DEEP_CUTS_MAX_PLAYS)
                    .map(|(id, _)| id)
                    .collect()
            })
            .collect();

        let mut added = vec![0usize; queues.len()];
        let mut picks = Vec::new();
        while picks.len() < self.max_tracks {
            let mut progressed = false;
            for (slot, queue) in queues.iter_mut().enumerate() {
                if added[slot] >= DEEP_CUTS_PER_ARTIST {
                    continue;
                }
                let Some(track) = queue.pop_front() else {
                    continue;
                };
                picks.push(track);
                added[slot] += 1;
                progressed = true;
                if picks.len() >= self.max_tracks {
                    break;
                }
            }
            if !progressed {
                break;
            }
        }
        picks
    }

    /// Each recently discovered artist's longest single play.
    fn new_artists(&self) -> Vec<EntityId> {
        let cutoff = self.now - Duration::days(NEW_ARTIST_WINDOW_DAYS);
        let mut artists: Vec<(EntityId, DateTime<Utc>)> = self
            .snapshot
            .artist_profiles()
            .iter()
            .filter(|(_, profile)| profile.first_seen >= cutoff)
            .map(|(id, profile)| (*id, profile.first_seen))
            .collect();
        artists.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));

        artists
            .into_iter()
            .filter_map(|(artist, _)| {
                self.by_artist.get(&artist)?.iter().fold(
                    None,
                    |best: Option<(EntityId, u64)>, (id, profile)| match best {
                        Some((_, ms)) if ms >= profile.best_sample.ms_played => best,
                        _ => Some((*id, profile.best_sample.ms_played)),
                    },
                )
            })
            .map(|(id, _)| id)
            .collect()
    }

    /// Each top artist's most-played track by total time.
    fn artist_variety(&self) -> Vec<EntityId> {
        let mut picks: Vec<(EntityId, u64)> = Vec::new();
        for artist in self.artists_by_ms.iter().take(VARIETY_TOP_ARTISTS) {
            let best = self.by_artist.get(artist).and_then(|tracks| {
                tracks.iter().fold(None, |best: Option<(EntityId, u64)>, (id, profile)| {
                    match best {
                        Some((_, ms)) if ms >= profile.totals.ms_played => best,
                        _ => Some((*id, profile.totals.ms_played)),
                    }
                })
            });
            if let Some(pick) = best {
                picks.push(pick);
            }
            if picks.len() >= self.max_tracks * 2 {
                break;
            }
        }
        picks.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        picks.into_iter().map(|(id, _)| id).collect()
    }

    fn select(&self, rule: PlaylistRule) -> Vec<EntityId> {
        let sample_at = |p: &TrackProfile| p.best_sample.timestamp;
        match rule {
            PlaylistRule::SundayEvening => self.rank_by(|p| {
                let ts = sample_at(p);
                (ts.weekday() == Weekday::Sun && (18..=23).contains(&ts.hour())).then(|| p.avg_ms())
            }),
            PlaylistRule::HighFocus => self.rank_by(|p| {
                (p.avg_ms() >= 180_000.0 && p.skip_rate() <= 0.15).then(|| p.avg_ms())
            }),
            PlaylistRule::Rediscover { year } => self.rank_by(|p| {
                (p.first_played.year() == year).then_some(p.totals.play_count as f64)
            }),
            PlaylistRule::DeepCuts => self.deep_cuts(),
            PlaylistRule::NewArtistSampler => self.new_artists(),
            PlaylistRule::SkippedRedemption => self.rank_by(|p| {
                (p.skips >= 1 && p.totals.ms_played >= 120_000)
                    .then(|| p.totals.ms_played as f64 / (1 + p.skips) as f64)
            }),
            PlaylistRule::MorningBoost => {
                self.rank_by(|p| (6..=9).contains(&sample_at(p).hour()).then(|| p.avg_ms()))
            }
            PlaylistRule::NightOwl => {
                self.rank_by(|p| (0..=3).contains(&sample_at(p).hour()).then(|| p.avg_ms()))
            }
            PlaylistRule::WeekendBangers => self.rank_by(|p| {
                matches!(sample_at(p).weekday(), Weekday::Sat | Weekday::Sun).then(|| {
                    p.totals.play_count as f64 + p.totals.ms_played as f64 / 180_000.0
                })
            }),
            PlaylistRule::WeekdayFlow => self.rank_by(|p| {
                (sample_at(p).weekday().num_days_from_monday() < 5).then(|| p.avg_ms())
            }),
            PlaylistRule::ForgottenFavorites => {
                let cutoff = self.now - Duration::days(FORGOTTEN_AFTER_DAYS);
                self.rank_by(|p| {
                    (p.last_played < cutoff && p.totals.ms_played >= 180_000)
                        .then_some(p.totals.ms_played as f64)
                })
            }
            PlaylistRule::CitySkyline => {
                let ranked = self.rank_by(|p| {
                    let days = p.commute_days.len();
                    let avg = p.avg_ms();
                    (days >= 2 && (90_000.0..=240_000.0).contains(&avg))
                        .then(|| days as f64 * 10.0 - (avg - 150_000.0).abs() / 60_000.0)
                });
                self.cap_per_artist(ranked, CITY_SKYLINE_PER_ARTIST)
            }
            PlaylistRule::LateBloomers => {
                let ranked = self.rank_by(|p| late_bloom_score(&p.quarters));
                self.cap_per_artist(ranked, LATE_BLOOMERS_PER_ARTIST)
            }
            PlaylistRule::OneHitGems => self.rank_by(|p| {
                let solo = self
                    .by_artist
                    .get(&p.artist)
                    .is_some_and(|tracks| tracks.len() == 1);
                solo.then_some(p.totals.ms_played as f64)
            }),
            PlaylistRule::ZeroSkipKeepers => self.rank_by(|p| {
                (p.skips == 0 && p.totals.play_count >= 3).then_some(p.totals.ms_played as f64)
            }),
            // Shortest average first
            PlaylistRule::QuickHits => self.rank_by(|p| {
                (p.totals.play_count >= 2 && p.avg_ms() <= 120_000.0).then(|| -p.avg_ms())
            }),
            PlaylistRule::SeasonalEchoes { month } => {
                seasonal_echoes(self.seasonal, month, self.max_tracks)
                    .into_iter()
                    .map(|pick| pick.track)
                    .collect()
            }
            PlaylistRule::FreshRepeatOffenders => {
                let cutoff = self.now - Duration::days(FRESH_WINDOW_DAYS);
                let ranked = self.rank_by(|p| {
                    (p.first_played >= cutoff && p.totals.play_count >= 3)
                        .then_some(p.totals.play_count as f64)
                });
                self.cap_per_artist(ranked, FRESH_REPEAT_PER_ARTIST)
            }
            PlaylistRule::ArtistVarietySampler => self.artist_variety(),
        }
    }

    fn why(&self, rule: PlaylistRule, profile: &TrackProfile) -> String {
        let artist = || self.snapshot.label(Dimension::Artist, profile.artist);
        match rule {
            PlaylistRule::SundayEvening => {
                "Played on Sunday evening; high average engagement".to_string()
            }
            PlaylistRule::HighFocus => "Low skip‑rate and long average playtime".to_string(),
            PlaylistRule::Rediscover { year } => format!("First discovered in {}", year),
            PlaylistRule::DeepCuts => format!("Deep cut from a favorite artist: {}", artist()),
            PlaylistRule::NewArtistSampler => "New artist you discovered recently".to_string(),
            PlaylistRule::SkippedRedemption => {
                "Give it another chance – mixed history (skipped sometimes)".to_string()
            }
            PlaylistRule::MorningBoost => "Frequently played in the morning".to_string(),
            PlaylistRule::NightOwl => "Your late-night vibe".to_string(),
            PlaylistRule::WeekendBangers => "A weekend favorite".to_string(),
            PlaylistRule::WeekdayFlow => "Your weekday go-to".to_string(),
            PlaylistRule::ForgottenFavorites => "Loved before, not heard in a while".to_string(),
            PlaylistRule::CitySkyline => "A commute-time staple across days".to_string(),
            PlaylistRule::LateBloomers => "A slow‑burn favorite rising over time".to_string(),
            PlaylistRule::OneHitGems => format!("Only track from {} you listened to", artist()),
            PlaylistRule::ZeroSkipKeepers => "Never skipped; always a keeper".to_string(),
            PlaylistRule::QuickHits => "Quick hit – bite‑sized plays".to_string(),
            PlaylistRule::SeasonalEchoes { month } => {
                format!("A {} favorite across years", format::month_name(month))
            }
            PlaylistRule::FreshRepeatOffenders => "New but already repeat‑worthy".to_string(),
            PlaylistRule::ArtistVarietySampler => {
                format!("Representative pick from {}", artist())
            }
        }
    }

    /// Turn ranked picks into items: dedupe by URI (or id when there is
    /// none) keeping the longest sample, then clip.
    fn items(&self, rule: PlaylistRule, picks: Vec<EntityId>) -> Vec<PlaylistItem> {
        let uris = self.snapshot.interner().uris();
        let mut items: Vec<PlaylistItem> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for track in picks {
            let Some(profile) = self.profile(track) else {
                continue;
            };
            let uri = uris.get(track.index()).cloned().flatten();
            let key = uri.clone().unwrap_or_else(|| track.to_string());
            let item = PlaylistItem {
                track,
                title: self
                    .snapshot
                    .title(Dimension::Track, track, profile.artist)
                    .to_string(),
                artist: self
                    .snapshot
                    .label(Dimension::Artist, profile.artist)
                    .to_string(),
                album: self
                    .snapshot
                    .title(Dimension::Album, profile.album, profile.artist)
                    .to_string(),
                uri,
                ms_played_sample: profile.best_sample.ms_played,
                why: self.why(rule, profile),
            };

            match positions.get(&key) {
                Some(&at) => {
                    if item.ms_played_sample > items[at].ms_played_sample {
                        items[at] = item;
                    }
                }
                None => {
                    positions.insert(key, items.len());
                    items.push(item);
                }
            }
        }

        items.truncate(self.max_tracks);
        items
    }
}

/// Generate every smart playlist from the finalized snapshot.
pub fn smart_playlists(snapshot: &AggregateSnapshot, max_tracks: usize) -> SmartPlaylists {
    let seasonal_index = SeasonalIndex::from_profiles(snapshot.track_profiles());
    let Some(now) = snapshot
        .track_profiles()
        .values()
        .map(|profile| profile.last_played)
        .max()
    else {
        return SmartPlaylists {
            seasonal_index,
            ..Default::default()
        };
    };

    let index = TrackIndex::new(snapshot, &seasonal_index, now, max_tracks);
    let mut playlists: Vec<Playlist> = definitions(&index.rediscover_years(), now.month())
        .into_iter()
        .filter_map(|definition| {
            let items = index.items(definition.rule, index.select(definition.rule));
            if items.is_empty() {
                return None;
            }
            Some(Playlist { definition, items })
        })
        .collect();
    playlists.sort_by_cached_key(|p| p.definition.name.to_lowercase());

    tracing::debug!(
        playlists = playlists.len(),
        reference = %now,
        "Smart playlists generated"
    );

    SmartPlaylists {
        generated_for: Some(now.date_naive()),
        playlists,
        seasonal_index,
    }
}
