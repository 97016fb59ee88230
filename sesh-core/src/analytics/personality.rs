//! Listening personality scoring
//!
//! Scores twelve listener archetypes from the derived statistics. Each score
//! is a fixed weighted sum of 0-3 threshold scores plus bonus terms, so the
//! result is deterministic for a given set of statistics.

use serde::Serialize;

/// Listener archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    /// Wide, even spread over many artists
    Explorer,
    /// Sticks with a few artists, many of their albums
    Loyalist,
    /// Many artists with a single track each
    Eclectic,
    /// Narrow, concentrated library
    Focused,
    /// Listening spikes on weekends
    WeekendWarrior,
    /// Plays something almost every day
    DailyListener,
    /// High skip rate, short plays
    Skipper,
    /// Rarely skips, long plays
    Completionist,
    /// Long streaks, many plays per day
    BingeListener,
    /// Many artists relative to tracks
    VarietySeeker,
    /// Balanced week, moderate frequency, skips around
    MoodListener,
    /// Digs through artists' catalogs
    DeepDiver,
}

impl Archetype {
    /// All archetypes, in scoring order (ties go to the earlier one).
    pub const ALL: [Archetype; 12] = [
        Archetype::Explorer,
        Archetype::Loyalist,
        Archetype::Eclectic,
        Archetype::Focused,
        Archetype::WeekendWarrior,
        Archetype::DailyListener,
        Archetype::Skipper,
        Archetype::Completionist,
        Archetype::BingeListener,
        Archetype::VarietySeeker,
        Archetype::MoodListener,
        Archetype::DeepDiver,
    ];

    /// Get the display name for this archetype.
    pub fn name(&self) -> &'static str {
        match self {
            Archetype::Explorer => "Explorer",
            Archetype::Loyalist => "Loyalist",
            Archetype::Eclectic => "Eclectic",
            Archetype::Focused => "Focused",
            Archetype::WeekendWarrior => "Weekend Warrior",
            Archetype::DailyListener => "Daily Listener",
            Archetype::Skipper => "Skipper",
            Archetype::Completionist => "Completionist",
            Archetype::BingeListener => "Binge Listener",
            Archetype::VarietySeeker => "Variety Seeker",
            Archetype::MoodListener => "Mood Listener",
            Archetype::DeepDiver => "Deep Diver",
        }
    }

    /// Get the long description for this archetype.
    pub fn description(&self) -> &'static str {
        match self {
            Archetype::Explorer => "You're always seeking new music and artists. Your diverse taste spans many genres and you rarely get stuck in a musical rut.",
            Archetype::Loyalist => "You have deep connections with your favorite artists. When you find music you love, you stick with it and really get to know an artist's work.",
            Archetype::Eclectic => "Your playlist is a musical mosaic. You appreciate many different styles and aren't bound by genre conventions.",
            Archetype::Focused => "You know what you like and stick to it. Your listening is concentrated on specific genres or artists that resonate with you.",
            Archetype::WeekendWarrior => "Your music consumption spikes on weekends. Music is your companion for weekend activities and relaxation.",
            Archetype::DailyListener => "Music is integrated into your daily routine. You have consistent listening habits throughout the week.",
            Archetype::Skipper => "You're quick to move on if a song doesn't grab you immediately. You're always searching for the perfect track for the moment.",
            Archetype::Completionist => "You appreciate music from start to finish. When you start a song or album, you tend to listen all the way through.",
            Archetype::BingeListener => "You dive deep into music sessions, often listening for extended periods. When you find something you love, you immerse yourself completely.",
            Archetype::VarietySeeker => "You thrive on musical diversity. You're constantly exploring different artists and styles, rarely settling into predictable patterns.",
            Archetype::MoodListener => "Your music choices are guided by your emotions. You select tracks that match or enhance your current mood, creating a personalized soundtrack for your life.",
            Archetype::DeepDiver => "You explore artists' catalogs thoroughly. Rather than sampling broadly, you prefer to discover everything about the artists you connect with.",
        }
    }

    /// Get an emoji for this archetype.
    pub fn emoji(&self) -> &'static str {
        match self {
            Archetype::Explorer => "🧭",
            Archetype::Loyalist => "💛",
            Archetype::Eclectic => "🎨",
            Archetype::Focused => "🎯",
            Archetype::WeekendWarrior => "🎉",
            Archetype::DailyListener => "📅",
            Archetype::Skipper => "⏭️",
            Archetype::Completionist => "✅",
            Archetype::BingeListener => "🍿",
            Archetype::VarietySeeker => "🌈",
            Archetype::MoodListener => "🌦️",
            Archetype::DeepDiver => "🤿",
        }
    }
}

const UNIQUE_RATIO: [f64; 3] = [30.0, 50.0, 70.0];
const GINI: [f64; 3] = [0.3, 0.5, 0.7];
const SKIP_RATE: [f64; 3] = [15.0, 30.0, 45.0];
const WEEKEND_RATIO: [f64; 3] = [30.0, 50.0, 70.0];
const ARTISTS_COUNT: [f64; 3] = [50.0, 100.0, 200.0];
const ONE_HITS: [f64; 3] = [20.0, 40.0, 60.0];
const LISTENING_FREQUENCY: [f64; 3] = [0.3, 0.6, 0.9];
const AVG_PLAY_MINUTES: [f64; 3] = [2.0, 3.0, 4.0];
const STREAK: [f64; 3] = [5.0, 14.0, 30.0];
const TOTAL_PLAYS: [f64; 3] = [500.0, 1000.0, 2000.0];

/// 0-3 depending on how many thresholds `value` reaches.
fn level(value: f64, thresholds: [f64; 3]) -> f64 {
    if value >= thresholds[2] {
        3.0
    } else if value >= thresholds[1] {
        2.0
    } else if value >= thresholds[0] {
        1.0
    } else {
        0.0
    }
}

/// 0-3 depending on how far below the thresholds `value` stays.
fn level_low(value: f64, thresholds: [f64; 3]) -> f64 {
    if value <= thresholds[0] {
        3.0
    } else if value <= thresholds[1] {
        2.0
    } else if value <= thresholds[2] {
        1.0
    } else {
        0.0
    }
}

fn bonus(condition: bool, weight: f64) -> f64 {
    if condition {
        weight
    } else {
        0.0
    }
}

/// Normalized statistics the archetype scores are computed from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListeningProfile {
    pub unique_ratio_pct: f64,
    pub gini: f64,
    pub skip_rate_pct: f64,
    pub weekend_ratio_pct: f64,
    pub artists_count: f64,
    pub one_hit_pct: f64,
    pub avg_play_ms: f64,
    pub total_plays: f64,
    pub days_played: f64,
    pub days_since_first: f64,
    pub longest_streak: f64,
    pub tracks_count: f64,
    pub albums_count: f64,
}

impl ListeningProfile {
    fn listening_frequency(&self) -> f64 {
        self.days_played / self.days_since_first.max(1.0)
    }

    fn artist_to_track_ratio(&self) -> f64 {
        self.artists_count / self.tracks_count.max(1.0)
    }

    fn album_to_artist_ratio(&self) -> f64 {
        self.albums_count / self.artists_count.max(1.0)
    }

    fn avg_play_minutes(&self) -> f64 {
        self.avg_play_ms / 60_000.0
    }

    fn plays_per_active_day(&self) -> f64 {
        self.total_plays / self.days_played.max(1.0)
    }

    /// Raw score for one archetype.
    pub fn score(&self, archetype: Archetype) -> f64 {
        let unique = self.unique_ratio_pct;
        let gini = self.gini;
        let skip = self.skip_rate_pct;
        let weekend = self.weekend_ratio_pct;
        let artists = self.artists_count;
        let one_hits = self.one_hit_pct;
        let frequency = self.listening_frequency();
        let minutes = self.avg_play_minutes();
        let streak = self.longest_streak;

        match archetype {
            Archetype::Explorer => {
                level(unique, UNIQUE_RATIO) * 1.7
                    + level_low(gini, GINI) * 1.7
                    + level(artists, ARTISTS_COUNT) * 1.5
                    + level(one_hits, ONE_HITS) * 1.2
                    + bonus(self.artist_to_track_ratio() < 0.3, 1.0)
                    + bonus(unique > 60.0, 1.5)
            }
            Archetype::Loyalist => {
                level_low(unique, UNIQUE_RATIO) * 1.2
                    + level(gini, GINI) * 1.5
                    + level_low(artists, ARTISTS_COUNT) * 1.0
                    + bonus(self.album_to_artist_ratio() > 1.5, 1.0)
            }
            Archetype::Eclectic => {
                level(one_hits, ONE_HITS) * 1.5
                    + level(artists, ARTISTS_COUNT) * 1.2
                    + level(unique, UNIQUE_RATIO) * 1.0
                    + bonus(self.artist_to_track_ratio() > 0.7, 1.0)
            }
            Archetype::Focused => {
                level_low(one_hits, ONE_HITS) * 1.5
                    + level(gini, GINI) * 1.2
                    + level_low(unique, UNIQUE_RATIO) * 1.0
                    + bonus(self.tracks_count < 200.0, 1.0)
            }
            Archetype::WeekendWarrior => {
                level(weekend, WEEKEND_RATIO) * 2.5
                    + level_low(frequency, LISTENING_FREQUENCY) * 1.5
                    + bonus(streak < 5.0, 1.5)
                    + bonus(weekend > 65.0, 2.0)
                    + bonus(self.days_played < self.days_since_first * 0.4, 1.5)
            }
            Archetype::DailyListener => {
                level(frequency, LISTENING_FREQUENCY) * 1.5
                    + level_low(weekend, WEEKEND_RATIO) * 0.8
                    + level(streak, STREAK) * 0.7
                    + bonus(self.plays_per_active_day() > 8.0, 1.0)
            }
            Archetype::Skipper => {
                level(skip, SKIP_RATE) * 2.0
                    + level_low(minutes, AVG_PLAY_MINUTES) * 1.5
                    + level(unique, UNIQUE_RATIO) * 0.8
                    + bonus(self.total_plays > 1000.0, 1.0)
            }
            Archetype::Completionist => {
                level_low(skip, SKIP_RATE) * 2.0
                    + level(minutes, AVG_PLAY_MINUTES) * 2.5
                    + bonus(self.album_to_artist_ratio() > 1.2, 1.5)
                    + bonus(gini < 0.4, 1.5)
                    + bonus(skip < 10.0, 2.0)
                    + bonus(minutes > 4.5, 1.5)
            }
            Archetype::BingeListener => {
                bonus(streak > 10.0, 2.0)
                    + level(self.total_plays, TOTAL_PLAYS) * 1.5
                    + bonus(gini > 0.6, 1.4)
                    + bonus(self.plays_per_active_day() > 10.0, 1.2)
            }
            Archetype::VarietySeeker => {
                level(artists, ARTISTS_COUNT) * 1.5
                    + level(one_hits, ONE_HITS) * 1.5
                    + bonus(self.artist_to_track_ratio() > 0.5, 1.7)
                    + bonus(gini < 0.4, 1.5)
            }
            Archetype::MoodListener => {
                level(skip, SKIP_RATE) * 1.6
                    + bonus(weekend > 40.0 && weekend < 60.0, 2.0)
                    + level(unique, UNIQUE_RATIO) * 1.3
                    + bonus(frequency > 0.3 && frequency < 0.7, 2.0)
            }
            Archetype::DeepDiver => {
                level(minutes, AVG_PLAY_MINUTES) * 1.8
                    + bonus(self.album_to_artist_ratio() > 2.0, 2.5)
                    + level_low(skip, SKIP_RATE) * 1.4
                    + bonus(artists < 50.0 && self.tracks_count > 200.0, 2.0)
                    + bonus(gini > 0.5 && gini < 0.7, 1.5)
            }
        }
    }

    /// Score every archetype and pick the primary one.
    pub fn classify(&self) -> PersonalityProfile {
        let raw: Vec<(Archetype, f64)> = Archetype::ALL
            .iter()
            .map(|archetype| (*archetype, self.score(*archetype)))
            .collect();

        let total: f64 = raw.iter().map(|(_, score)| score).sum();
        let max = raw.iter().map(|(_, score)| *score).fold(0.0_f64, f64::max);

        let mut primary = raw[0];
        for entry in &raw[1..] {
            if entry.1 > primary.1 {
                primary = *entry;
            }
        }

        let even_share = 100.0 / raw.len() as f64;
        let scores = raw
            .into_iter()
            .map(|(archetype, score)| ArchetypeScore {
                archetype,
                name: archetype.name(),
                emoji: archetype.emoji(),
                score,
                share_pct: if total > 0.0 {
                    score / total * 100.0
                } else {
                    even_share
                },
                relative_pct: if max > 0.0 { score / max * 100.0 } else { 0.0 },
            })
            .collect();

        PersonalityProfile {
            primary: primary.0,
            name: primary.0.name(),
            description: primary.0.description(),
            scores,
        }
    }
}

/// One archetype's score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArchetypeScore {
    pub archetype: Archetype,
    pub name: &'static str,
    pub emoji: &'static str,
    pub score: f64,
    /// Share of the summed scores (all shares add up to 100)
    pub share_pct: f64,
    /// Bar length relative to the highest score (max = 100)
    pub relative_pct: f64,
}

/// Result of personality scoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonalityProfile {
    pub primary: Archetype,
    pub name: &'static str,
    pub description: &'static str,
    /// Every archetype, in [`Archetype::ALL`] order
    pub scores: Vec<ArchetypeScore>,
}

impl PersonalityProfile {
    pub fn score_of(&self, archetype: Archetype) -> Option<&ArchetypeScore> {
        self.scores.iter().find(|s| s.archetype == archetype)
    }
}
