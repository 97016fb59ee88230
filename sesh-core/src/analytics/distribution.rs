//! Distribution metrics: concentration, Eddington number, continuity.

use crate::aggregate::AggregateSnapshot;
use crate::types::{Dimension, EntityId, Scope};
use serde::Serialize;
use std::collections::HashSet;

/// An artist counts as breaking out in a year when its rank falls in this
/// top share of that year's artists.
pub const BREAKOUT_PERCENTILE: f64 = 0.10;

/// Concentration and milestone-style counts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DistributionStats {
    /// Gini coefficient of per-artist play counts (0 = perfectly even)
    pub gini: f64,
    /// Largest N with at least N days of at least N plays
    pub eddington: u64,
    /// Additional days with `eddington + 1` plays needed to reach the next number
    pub eddington_next_need: u64,
    /// h-index of artist play counts
    pub artist_cutover: u64,
}

/// Gini coefficient of a set of non-negative values.
///
/// `G = 2·Σ(i·v_i) / (n·Σv) − (n+1)/n` over the values sorted ascending
/// with 1-based `i`. Returns 0 for empty or all-zero input.
pub fn gini(values: &[u64]) -> f64 {
    let n = values.len();
    let sum: u64 = values.iter().sum();
    if n == 0 || sum == 0 {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();

    let weighted: f64 = sorted
        .iter()
        .enumerate()
        .map(|(i, v)| (i as f64 + 1.0) * *v as f64)
        .sum();
    let n = n as f64;
    let g = 2.0 * weighted / (n * sum as f64) - (n + 1.0) / n;
    g.max(0.0)
}

/// Largest N such that at least N of the values are >= N.
pub fn h_index(values: &[u64]) -> u64 {
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(|a, b| b.cmp(a));
    sorted
        .iter()
        .enumerate()
        .take_while(|(i, v)| **v >= *i as u64 + 1)
        .count() as u64
}

/// Eddington number of daily play counts, plus the days still needed for
/// the next one. No active days means nothing to climb towards: `(0, 0)`.
pub fn eddington(daily_plays: &[u64]) -> (u64, u64) {
    if daily_plays.is_empty() {
        return (0, 0);
    }
    let edd = h_index(daily_plays);
    let target = edd + 1;
    let have = daily_plays.iter().filter(|c| **c >= target).count() as u64;
    (edd, target.saturating_sub(have))
}

pub(crate) fn compute(snapshot: &AggregateSnapshot) -> DistributionStats {
    let artist_plays: Vec<u64> = snapshot
        .buckets()
        .entries(Dimension::Artist, Scope::All)
        .map(|(_, totals)| totals.play_count)
        .collect();
    let daily_plays: Vec<u64> = snapshot
        .activity()
        .daily
        .values()
        .map(|totals| totals.play_count)
        .collect();

    let (eddington, eddington_next_need) = eddington(&daily_plays);

    DistributionStats {
        gini: gini(&artist_plays),
        eddington,
        eddington_next_need,
        artist_cutover: h_index(&artist_plays),
    }
}

/// An artist's first year in the top of the yearly ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Breakout {
    pub artist: EntityId,
    pub name: String,
    pub year: i32,
    /// 1-based rank by play time within the year
    pub rank: usize,
    pub artists_that_year: usize,
}

/// Per-artist-per-year continuity.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContinuityStats {
    /// Artists played above the duration threshold in every year of the history
    pub every_year_artists: Vec<String>,
    pub breakouts: Vec<Breakout>,
}

pub(crate) fn continuity(snapshot: &AggregateSnapshot, min_ms_played: u64) -> ContinuityStats {
    let years = snapshot.years();
    if years.is_empty() {
        return ContinuityStats::default();
    }

    let buckets = snapshot.buckets();

    let mut every_year_artists: Vec<String> = buckets
        .entries(Dimension::Artist, Scope::All)
        .filter(|(id, _)| {
            years.iter().all(|year| {
                buckets
                    .get(Dimension::Artist, Scope::Year(*year), *id)
                    .is_some_and(|totals| totals.ms_played > min_ms_played)
            })
        })
        .map(|(id, _)| snapshot.label(Dimension::Artist, id).to_string())
        .collect();
    every_year_artists.sort();

    let mut seen_before: HashSet<EntityId> = HashSet::new();
    let mut broken_out: HashSet<EntityId> = HashSet::new();
    let mut breakouts = Vec::new();

    for year in &years {
        let table = snapshot.table(Dimension::Artist, Scope::Year(*year));
        let cutoff = ((table.len() as f64) * BREAKOUT_PERCENTILE).ceil() as usize;

        for (index, row) in table.iter().enumerate() {
            let rank = index + 1;
            let returning = seen_before.contains(&row.id);
            if returning && rank <= cutoff && broken_out.insert(row.id) {
                breakouts.push(Breakout {
                    artist: row.id,
                    name: snapshot.label(Dimension::Artist, row.id).to_string(),
                    year: *year,
                    rank,
                    artists_that_year: table.len(),
                });
            }
        }
        seen_before.extend(table.iter().map(|row| row.id));
    }

    ContinuityStats {
        every_year_artists,
        breakouts,
    }
}
