//! Aggregation of play events into buckets
//!
//! The [`Aggregator`] folds each [`PlayEvent`] into:
//! - one bucket per dimension (artist, track, album) for each of the
//!   scopes `all`, the event's year and the event's day
//! - the run-wide [`ActivitySummary`]
//! - per-track and per-artist profiles
//!
//! Accumulation is commutative, so the resulting buckets do not depend on
//! the order in which events arrive. [`Aggregator::finalize`] hands over an
//! immutable [`AggregateSnapshot`].

mod activity;
mod buckets;

pub use activity::{
    platform_family, ActivitySummary, ArtistProfile, PlayMarker, PlaySample, TrackProfile,
};
pub use buckets::{BucketStore, TableRow};

use crate::intern::EntityInterner;
use crate::types::{Dimension, EntityId, PlayEvent, Scope, Totals};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Mutable accumulation state. Owns the buckets until finalized.
#[derive(Debug, Default)]
pub struct Aggregator {
    interner: EntityInterner,
    buckets: BucketStore,
    activity: ActivitySummary,
    tracks: HashMap<EntityId, TrackProfile>,
    artists: HashMap<EntityId, ArtistProfile>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one event into every bucket it belongs to.
    pub fn accumulate(&mut self, event: &PlayEvent) {
        let entities = self.interner.intern_event(event);
        let scopes = [
            Scope::All,
            Scope::Year(event.year()),
            Scope::Day(event.date()),
        ];

        for dimension in Dimension::ALL {
            let id = entities.get(dimension);
            for scope in scopes {
                self.buckets.add(dimension, scope, id, event.ms_played);
            }
        }

        self.activity.record(event, entities);

        self.tracks
            .entry(entities.track)
            .or_insert_with(|| TrackProfile::new(event, entities))
            .record(event, entities);

        let artist = self
            .artists
            .entry(entities.artist)
            .or_insert_with(|| ArtistProfile {
                first_seen: event.timestamp,
                totals: Totals::default(),
            });
        artist.first_seen = artist.first_seen.min(event.timestamp);
        artist.totals.add_play(event.ms_played);
    }

    pub fn interner(&self) -> &EntityInterner {
        &self.interner
    }

    pub fn buckets(&self) -> &BucketStore {
        &self.buckets
    }

    /// Number of events accumulated so far.
    pub fn event_count(&self) -> u64 {
        self.activity.totals.play_count
    }

    /// Close accumulation.
    ///
    /// Entities whose lifetime play time is zero are removed from every
    /// scope, so no table ever lists a 0 ms row.
    pub fn finalize(mut self) -> AggregateSnapshot {
        let mut pruned = 0usize;
        for dimension in Dimension::ALL {
            let silent: Vec<EntityId> = self
                .buckets
                .entries(dimension, Scope::All)
                .filter(|(_, totals)| totals.ms_played == 0)
                .map(|(id, _)| id)
                .collect();
            for id in silent {
                self.buckets.remove_entity(dimension, id);
                match dimension {
                    Dimension::Track => {
                        self.tracks.remove(&id);
                    }
                    Dimension::Artist => {
                        self.artists.remove(&id);
                    }
                    Dimension::Album => {}
                }
                pruned += 1;
            }
        }
        if pruned > 0 {
            tracing::debug!(pruned, "Removed entities with zero play time");
        }

        self.activity.finalize();

        tracing::info!(
            plays = self.activity.totals.play_count,
            artists = self.interner.len(Dimension::Artist),
            tracks = self.interner.len(Dimension::Track),
            albums = self.interner.len(Dimension::Album),
            "Aggregation finalized"
        );

        AggregateSnapshot {
            interner: self.interner,
            buckets: self.buckets,
            activity: self.activity,
            tracks: self.tracks,
            artists: self.artists,
        }
    }
}

/// Per-dimension rows of a single day or range.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DayTables {
    pub artist: Vec<TableRow>,
    pub track: Vec<TableRow>,
    pub album: Vec<TableRow>,
}

impl DayTables {
    pub fn get(&self, dimension: Dimension) -> &[TableRow] {
        match dimension {
            Dimension::Artist => &self.artist,
            Dimension::Track => &self.track,
            Dimension::Album => &self.album,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.artist.is_empty() && self.track.is_empty() && self.album.is_empty()
    }
}

/// Immutable result of aggregation.
#[derive(Debug)]
pub struct AggregateSnapshot {
    interner: EntityInterner,
    buckets: BucketStore,
    activity: ActivitySummary,
    tracks: HashMap<EntityId, TrackProfile>,
    artists: HashMap<EntityId, ArtistProfile>,
}

impl AggregateSnapshot {
    /// Ranked table for one dimension and scope.
    pub fn table(&self, dimension: Dimension, scope: Scope) -> Vec<TableRow> {
        self.buckets.table(dimension, scope)
    }

    pub fn get(&self, dimension: Dimension, scope: Scope, id: EntityId) -> Option<Totals> {
        self.buckets.get(dimension, scope, id)
    }

    /// All three tables of one calendar day.
    pub fn day(&self, date: NaiveDate) -> DayTables {
        DayTables {
            artist: self.table(Dimension::Artist, Scope::Day(date)),
            track: self.table(Dimension::Track, Scope::Day(date)),
            album: self.table(Dimension::Album, Scope::Day(date)),
        }
    }

    /// Sum of the per-day buckets in `[start, end]` (inclusive).
    pub fn range_table(&self, dimension: Dimension, start: NaiveDate, end: NaiveDate) -> Vec<TableRow> {
        let mut merged: HashMap<EntityId, Totals> = HashMap::new();
        for date in self.activity.daily.range(start..=end).map(|(date, _)| *date) {
            for (id, totals) in self.buckets.entries(dimension, Scope::Day(date)) {
                merged.entry(id).or_default().merge(totals);
            }
        }
        buckets::rank_rows(merged)
    }

    /// Years with at least one play, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.buckets.years()
    }

    /// Days with at least one play, ascending.
    pub fn days(&self) -> Vec<NaiveDate> {
        self.buckets.days()
    }

    pub fn interner(&self) -> &EntityInterner {
        &self.interner
    }

    pub fn buckets(&self) -> &BucketStore {
        &self.buckets
    }

    pub fn activity(&self) -> &ActivitySummary {
        &self.activity
    }

    pub fn track_profiles(&self) -> &HashMap<EntityId, TrackProfile> {
        &self.tracks
    }

    pub fn artist_profiles(&self) -> &HashMap<EntityId, ArtistProfile> {
        &self.artists
    }

    /// Label of an entity, or the dimension's unknown label.
    pub fn label(&self, dimension: Dimension, id: EntityId) -> &str {
        self.interner
            .label(dimension, id)
            .unwrap_or_else(|| dimension.unknown_label())
    }

    /// Track or album label without the `" - <artist>"` suffix added at
    /// interning time.
    pub fn title(&self, dimension: Dimension, id: EntityId, artist: EntityId) -> &str {
        let label = self.label(dimension, id);
        let artist = self.label(Dimension::Artist, artist);
        label
            .strip_suffix(artist)
            .and_then(|rest| rest.strip_suffix(" - "))
            .unwrap_or(label)
    }

    pub fn is_empty(&self) -> bool {
        self.activity.totals.play_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn play(ts: DateTime<Utc>, track: &str, artist: &str, ms: u64) -> PlayEvent {
        PlayEvent {
            timestamp: ts,
            track_label: Some(track.to_string()),
            artist_label: Some(artist.to_string()),
            album_label: Some("Album".to_string()),
            ms_played: ms,
            platform: None,
            offline: false,
            skipped: false,
            track_uri: None,
        }
    }

    #[test]
    fn test_accumulate_fills_every_scope() {
        let mut aggregator = Aggregator::new();
        let ts = Utc.with_ymd_and_hms(2023, 6, 15, 10, 0, 0).unwrap();
        aggregator.accumulate(&play(ts, "Song", "Band", 60_000));
        aggregator.accumulate(&play(ts, "Song", "Band", 30_000));
        let snapshot = aggregator.finalize();

        for dimension in Dimension::ALL {
            for scope in [Scope::All, Scope::Year(2023), Scope::Day(ts.date_naive())] {
                let table = snapshot.table(dimension, scope);
                assert_eq!(table.len(), 1, "{} {:?}", dimension, scope);
                assert_eq!(table[0].ms_played, 90_000);
                assert_eq!(table[0].play_count, 2);
            }
        }
        assert_eq!(snapshot.years(), vec![2023]);
        assert_eq!(snapshot.days(), vec![ts.date_naive()]);
    }

    #[test]
    fn test_finalize_prunes_silent_entities() {
        let mut aggregator = Aggregator::new();
        let ts = Utc.with_ymd_and_hms(2023, 6, 15, 10, 0, 0).unwrap();
        aggregator.accumulate(&play(ts, "Loud", "Band", 60_000));
        aggregator.accumulate(&play(ts, "Silent", "Mute", 0));
        let snapshot = aggregator.finalize();

        let tracks = snapshot.table(Dimension::Track, Scope::Day(ts.date_naive()));
        assert_eq!(tracks.len(), 1);
        assert_eq!(snapshot.label(Dimension::Track, tracks[0].id), "Loud - Band");
        let artists = snapshot.table(Dimension::Artist, Scope::All);
        assert_eq!(artists.len(), 1);
        assert_eq!(
            snapshot.title(Dimension::Track, tracks[0].id, artists[0].id),
            "Loud"
        );
        assert_eq!(snapshot.track_profiles().len(), 1);
    }

    #[test]
    fn test_range_table_sums_days() {
        let mut aggregator = Aggregator::new();
        let d1 = Utc.with_ymd_and_hms(2023, 5, 31, 23, 0, 0).unwrap();
        let d2 = Utc.with_ymd_and_hms(2023, 6, 1, 1, 0, 0).unwrap();
        let d3 = Utc.with_ymd_and_hms(2023, 6, 20, 1, 0, 0).unwrap();
        aggregator.accumulate(&play(d1, "A", "X", 10_000));
        aggregator.accumulate(&play(d2, "A", "X", 20_000));
        aggregator.accumulate(&play(d3, "B", "X", 5_000));
        let snapshot = aggregator.finalize();

        let june = snapshot.range_table(
            Dimension::Artist,
            NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 6, 30).unwrap(),
        );
        assert_eq!(june.len(), 1);
        assert_eq!(june[0].ms_played, 25_000);
        assert_eq!(june[0].play_count, 2);
    }
}
