//! Bucket storage keyed by `(dimension, scope, entity)`.

use crate::types::{Dimension, EntityId, Scope, Totals};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// One ranked table row: `[entityId, totalMsPlayed, playCount]` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(EntityId, u64, u64)", into = "(EntityId, u64, u64)")]
pub struct TableRow {
    pub id: EntityId,
    pub ms_played: u64,
    pub play_count: u64,
}

impl From<(EntityId, u64, u64)> for TableRow {
    fn from((id, ms_played, play_count): (EntityId, u64, u64)) -> Self {
        Self {
            id,
            ms_played,
            play_count,
        }
    }
}

impl From<TableRow> for (EntityId, u64, u64) {
    fn from(row: TableRow) -> Self {
        (row.id, row.ms_played, row.play_count)
    }
}

impl TableRow {
    pub fn totals(&self) -> Totals {
        Totals {
            ms_played: self.ms_played,
            play_count: self.play_count,
        }
    }
}

/// Sort rows by play time descending, ties by id.
pub(crate) fn rank_rows(entries: impl IntoIterator<Item = (EntityId, Totals)>) -> Vec<TableRow> {
    let mut rows: Vec<TableRow> = entries
        .into_iter()
        .map(|(id, totals)| TableRow {
            id,
            ms_played: totals.ms_played,
            play_count: totals.play_count,
        })
        .collect();
    rows.sort_by(|a, b| b.ms_played.cmp(&a.ms_played).then(a.id.cmp(&b.id)));
    rows
}

/// All buckets of a run.
///
/// Every present bucket has `play_count >= 1`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BucketStore {
    tables: BTreeMap<(Dimension, Scope), HashMap<EntityId, Totals>>,
}

impl BucketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one play to a bucket.
    pub fn add(&mut self, dimension: Dimension, scope: Scope, id: EntityId, ms_played: u64) {
        self.tables
            .entry((dimension, scope))
            .or_default()
            .entry(id)
            .or_default()
            .add_play(ms_played);
    }

    /// Add every bucket of `other` into this store.
    ///
    /// Both stores must share one interner id space.
    pub fn merge(&mut self, other: &BucketStore) {
        for (key, entries) in &other.tables {
            let table = self.tables.entry(*key).or_default();
            for (id, totals) in entries {
                table.entry(*id).or_default().merge(*totals);
            }
        }
    }

    pub fn get(&self, dimension: Dimension, scope: Scope, id: EntityId) -> Option<Totals> {
        self.tables
            .get(&(dimension, scope))
            .and_then(|table| table.get(&id))
            .copied()
    }

    /// Raw entries of one table, unordered.
    pub fn entries(
        &self,
        dimension: Dimension,
        scope: Scope,
    ) -> impl Iterator<Item = (EntityId, Totals)> + '_ {
        self.tables
            .get(&(dimension, scope))
            .into_iter()
            .flat_map(|table| table.iter().map(|(id, totals)| (*id, *totals)))
    }

    /// Ranked table for one dimension and scope.
    pub fn table(&self, dimension: Dimension, scope: Scope) -> Vec<TableRow> {
        rank_rows(self.entries(dimension, scope))
    }

    /// Sum of every bucket in one table.
    pub fn total(&self, dimension: Dimension, scope: Scope) -> Totals {
        let mut total = Totals::default();
        for (_, totals) in self.entries(dimension, scope) {
            total.merge(totals);
        }
        total
    }

    /// Distinct scopes present for a dimension, in order.
    pub fn scopes(&self, dimension: Dimension) -> impl Iterator<Item = Scope> + '_ {
        self.tables
            .keys()
            .filter(move |(d, _)| *d == dimension)
            .map(|(_, scope)| *scope)
    }

    pub fn years(&self) -> Vec<i32> {
        self.scopes(Dimension::Track)
            .filter_map(|scope| match scope {
                Scope::Year(year) => Some(year),
                _ => None,
            })
            .collect()
    }

    pub fn days(&self) -> Vec<NaiveDate> {
        self.scopes(Dimension::Track)
            .filter_map(|scope| match scope {
                Scope::Day(date) => Some(date),
                _ => None,
            })
            .collect()
    }

    /// Drop one entity from every scope of a dimension.
    pub(crate) fn remove_entity(&mut self, dimension: Dimension, id: EntityId) {
        for ((d, _), table) in self.tables.iter_mut() {
            if *d == dimension {
                table.remove(&id);
            }
        }
        self.tables.retain(|_, table| !table.is_empty());
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
