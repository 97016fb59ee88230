//! Time-based listening patterns, ratios and popular periods.

use crate::aggregate::ActivitySummary;
use crate::format;
use chrono::Datelike;
use serde::Serialize;
use std::collections::BTreeMap;

/// Hour-of-day and weekday distributions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimePatterns {
    /// Plays by hour of day (0-23, UTC)
    pub hourly_distribution: [u64; 24],
    /// Plays by weekday, Monday first
    pub weekday_distribution: [u64; 7],
    pub peak_hour: Option<u32>,
    pub peak_hour_plays: u64,
    /// Monday-first index of the most active weekday
    pub busiest_weekday: Option<usize>,
    pub busiest_weekday_plays: u64,
}

impl TimePatterns {
    pub fn peak_hour_display(&self) -> String {
        self.peak_hour
            .map(format::format_hour)
            .unwrap_or_else(|| "N/A".to_string())
    }

    pub fn busiest_weekday_name(&self) -> &'static str {
        self.busiest_weekday
            .map(format::weekday_name)
            .unwrap_or("N/A")
    }
}

/// Index and value of the first maximum, ignoring all-zero input.
fn first_max(values: &[u64]) -> Option<(usize, u64)> {
    let mut best: Option<(usize, u64)> = None;
    for (index, value) in values.iter().enumerate() {
        if *value > 0 && best.map_or(true, |(_, v)| *value > v) {
            best = Some((index, *value));
        }
    }
    best
}

pub(crate) fn time_patterns(activity: &ActivitySummary) -> TimePatterns {
    let peak = first_max(&activity.hours);
    let busiest = first_max(&activity.weekdays);
    TimePatterns {
        hourly_distribution: activity.hours,
        weekday_distribution: activity.weekdays,
        peak_hour: peak.map(|(hour, _)| hour as u32),
        peak_hour_plays: peak.map(|(_, plays)| plays).unwrap_or(0),
        busiest_weekday: busiest.map(|(day, _)| day),
        busiest_weekday_plays: busiest.map(|(_, plays)| plays).unwrap_or(0),
    }
}

/// Share-style ratios over counted plays.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ratios {
    pub weekend_plays: u64,
    pub weekday_plays: u64,
    /// weekend / weekday × 100
    pub weekend_ratio_pct: f64,
    pub skipped_plays: u64,
    /// skipped / total × 100
    pub skip_rate_pct: f64,
    pub offline_plays: u64,
    pub online_plays: u64,
    /// offline / total × 100
    pub offline_ratio_pct: f64,
}

impl Ratios {
    /// "offline:online", e.g. "120:3400"
    pub fn offline_online_display(&self) -> String {
        format!("{}:{}", self.offline_plays, self.online_plays)
    }
}

pub(crate) fn ratios(activity: &ActivitySummary) -> Ratios {
    let weekend_plays = activity.weekdays[5] + activity.weekdays[6];
    let weekday_plays: u64 = activity.weekdays[..5].iter().sum();
    let total = activity.totals.play_count;

    let pct = |part: u64, whole: u64| {
        if whole == 0 {
            0.0
        } else {
            part as f64 / whole as f64 * 100.0
        }
    };

    Ratios {
        weekend_plays,
        weekday_plays,
        weekend_ratio_pct: pct(weekend_plays, weekday_plays),
        skipped_plays: activity.skipped,
        skip_rate_pct: pct(activity.skipped, total),
        offline_plays: activity.offline,
        online_plays: total.saturating_sub(activity.offline),
        offline_ratio_pct: pct(activity.offline, total),
    }
}

/// The busiest period of some granularity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopularPeriod {
    /// Machine key ("2023", "2023-06", "2023-W24", "2023-06-15")
    pub key: String,
    /// Human label ("June 2023", "Jun 12 - Jun 18, 2023", ...)
    pub label: String,
    pub plays: u64,
}

/// Most popular year, month, ISO week and day by plays.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Milestones {
    pub year: Option<PopularPeriod>,
    pub month: Option<PopularPeriod>,
    pub week: Option<PopularPeriod>,
    pub day: Option<PopularPeriod>,
    /// Plays per active day
    pub avg_plays_per_active_day: f64,
}

/// First key with the highest count, in key order.
fn busiest<K: Ord + Copy>(counts: &BTreeMap<K, u64>) -> Option<(K, u64)> {
    let mut best: Option<(K, u64)> = None;
    for (key, plays) in counts {
        if best.map_or(true, |(_, p)| *plays > p) {
            best = Some((*key, *plays));
        }
    }
    best
}

pub(crate) fn milestones(activity: &ActivitySummary) -> Milestones {
    let mut years: BTreeMap<i32, u64> = BTreeMap::new();
    let mut months: BTreeMap<(i32, u32), u64> = BTreeMap::new();
    let mut weeks: BTreeMap<(i32, u32), u64> = BTreeMap::new();
    let mut days: BTreeMap<chrono::NaiveDate, u64> = BTreeMap::new();

    for (date, totals) in &activity.daily {
        let plays = totals.play_count;
        *years.entry(date.year()).or_default() += plays;
        *months.entry((date.year(), date.month())).or_default() += plays;
        *weeks.entry(format::iso_week_of(*date)).or_default() += plays;
        days.insert(*date, plays);
    }

    let avg_plays_per_active_day = if activity.daily.is_empty() {
        0.0
    } else {
        activity.totals.play_count as f64 / activity.daily.len() as f64
    };

    Milestones {
        year: busiest(&years).map(|(year, plays)| PopularPeriod {
            key: year.to_string(),
            label: year.to_string(),
            plays,
        }),
        month: busiest(&months).map(|((year, month), plays)| PopularPeriod {
            key: format!("{}-{:02}", year, month),
            label: format::format_month(year, month),
            plays,
        }),
        week: busiest(&weeks).map(|((year, week), plays)| PopularPeriod {
            key: format!("{}-W{:02}", year, week),
            label: format::format_iso_week(year, week),
            plays,
        }),
        day: busiest(&days).map(|(date, plays)| PopularPeriod {
            key: date.format("%Y-%m-%d").to_string(),
            label: format::format_date(date),
            plays,
        }),
        avg_plays_per_active_day,
    }
}
