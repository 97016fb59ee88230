//! "On This Day": tracks played repeatedly on the same calendar day in
//! earlier years.

use crate::aggregate::AggregateSnapshot;
use crate::types::{Dimension, EntityId, Scope};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A track must be played more than this many times on one day to be listed.
pub const ON_THIS_DAY_MIN_REPEATS: u64 = 2;

/// One track that was on repeat on a given date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnThisDayEntry {
    pub date: NaiveDate,
    pub track: EntityId,
    pub label: String,
    pub play_count: u64,
    pub ms_played: u64,
}

/// Repeats on `month`/`day` across every year in the history.
///
/// Sorted by play count descending, then newest date, then label.
/// An impossible date (e.g. 02-30) yields an empty list.
pub fn on_this_day(snapshot: &AggregateSnapshot, month: u32, day: u32) -> Vec<OnThisDayEntry> {
    let mut entries: Vec<OnThisDayEntry> = snapshot
        .days()
        .into_iter()
        .filter(|date| date.month() == month && date.day() == day)
        .flat_map(|date| repeats_on(snapshot, date))
        .collect();
    sort_entries(&mut entries);
    entries
}

/// Every month-day with at least one repeat, keyed `"MM-DD"`.
pub fn on_this_day_index(snapshot: &AggregateSnapshot) -> BTreeMap<String, Vec<OnThisDayEntry>> {
    let mut index: BTreeMap<String, Vec<OnThisDayEntry>> = BTreeMap::new();
    for date in snapshot.days() {
        let repeats = repeats_on(snapshot, date);
        if repeats.is_empty() {
            continue;
        }
        index
            .entry(date.format("%m-%d").to_string())
            .or_default()
            .extend(repeats);
    }
    for entries in index.values_mut() {
        sort_entries(entries);
    }
    index
}

fn repeats_on(snapshot: &AggregateSnapshot, date: NaiveDate) -> Vec<OnThisDayEntry> {
    snapshot
        .buckets()
        .entries(Dimension::Track, Scope::Day(date))
        .filter(|(_, totals)| totals.play_count > ON_THIS_DAY_MIN_REPEATS)
        .map(|(track, totals)| OnThisDayEntry {
            date,
            track,
            label: snapshot.label(Dimension::Track, track).to_string(),
            play_count: totals.play_count,
            ms_played: totals.ms_played,
        })
        .collect()
}

fn sort_entries(entries: &mut [OnThisDayEntry]) {
    entries.sort_by(|a, b| {
        b.play_count
            .cmp(&a.play_count)
            .then(b.date.cmp(&a.date))
            .then_with(|| a.label.cmp(&b.label))
    });
}
