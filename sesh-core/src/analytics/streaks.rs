//! Sessions, streaks and hiatuses.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

/// Plays further apart than this start a new listening session.
pub const SESSION_IDLE_GAP: std::time::Duration = std::time::Duration::from_secs(30 * 60);

/// Listening sessions: maximal runs of plays with small gaps between starts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    pub count: u64,
    /// Mean of (last start − first start) over all sessions
    pub avg_length_secs: u64,
    pub longest_length_secs: u64,
    /// Day the longest session started
    pub longest_start: Option<NaiveDate>,
}

/// Split sorted play start times (unix seconds) into sessions.
pub fn sessions(play_starts: &[i64]) -> SessionStats {
    let Some((&first, rest)) = play_starts.split_first() else {
        return SessionStats::default();
    };

    let gap = SESSION_IDLE_GAP.as_secs() as i64;
    let mut spans: Vec<(i64, i64)> = Vec::new();
    let mut start = first;
    let mut prev = first;
    for &t in rest {
        if t - prev > gap {
            spans.push((start, prev));
            start = t;
        }
        prev = t;
    }
    spans.push((start, prev));

    let total: i64 = spans.iter().map(|(s, e)| e - s).sum();
    let mut longest = spans[0];
    for span in &spans[1..] {
        if span.1 - span.0 > longest.1 - longest.0 {
            longest = *span;
        }
    }

    SessionStats {
        count: spans.len() as u64,
        avg_length_secs: (total / spans.len() as i64) as u64,
        longest_length_secs: (longest.1 - longest.0) as u64,
        longest_start: DateTime::<Utc>::from_timestamp(longest.0, 0).map(|dt| dt.date_naive()),
    }
}

/// Consecutive-day activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreakStats {
    /// Consecutive active days ending on the reference date
    pub current_streak_days: u64,
    pub longest_streak_days: u64,
    pub longest_streak_start: Option<NaiveDate>,
    pub longest_streak_end: Option<NaiveDate>,
    /// Days with at least one play
    pub active_days: u64,
}

/// Longest run of consecutive days without a play, strictly between the
/// first and last active day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HiatusStats {
    pub longest_days: u64,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

/// Streaks over sorted, distinct active days.
pub fn streaks(days: &[NaiveDate], as_of: NaiveDate) -> StreakStats {
    let Some(&first) = days.first() else {
        return StreakStats::default();
    };

    let mut longest = (1u64, first, first);
    let mut run = 1u64;
    let mut run_start = first;
    for pair in days.windows(2) {
        if pair[1] - pair[0] == Duration::days(1) {
            run += 1;
        } else {
            run = 1;
            run_start = pair[1];
        }
        if run > longest.0 {
            longest = (run, run_start, pair[1]);
        }
    }

    // Walk back from the reference date
    let mut current = 0u64;
    let mut expected = as_of;
    for day in days.iter().rev() {
        if *day > as_of {
            continue;
        }
        if *day == expected {
            current += 1;
            expected -= Duration::days(1);
        } else {
            break;
        }
    }

    StreakStats {
        current_streak_days: current,
        longest_streak_days: longest.0,
        longest_streak_start: Some(longest.1),
        longest_streak_end: Some(longest.2),
        active_days: days.len() as u64,
    }
}

/// Longest gap between sorted, distinct active days.
pub fn hiatus(days: &[NaiveDate]) -> HiatusStats {
    let mut best = HiatusStats::default();
    for pair in days.windows(2) {
        let gap = (pair[1] - pair[0]).num_days() - 1;
        if gap > 0 && gap as u64 > best.longest_days {
            best = HiatusStats {
                longest_days: gap as u64,
                start: Some(pair[0] + Duration::days(1)),
                end: Some(pair[1] - Duration::days(1)),
            };
        }
    }
    best
}
