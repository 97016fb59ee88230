//! Entity interning
//!
//! Every distinct artist, track and album label is replaced by a small
//! [`EntityId`] so that buckets and report tables never repeat full names.
//! Missing, empty and whitespace-only labels all collapse into one
//! "Unknown ..." entity per dimension.

use crate::types::{Dimension, EntityId, EventEntities, PlayEvent};
use std::collections::HashMap;

/// Labels for one dimension, addressable both ways.
#[derive(Debug, Default, Clone)]
struct LabelTable {
    labels: Vec<String>,
    index: HashMap<String, EntityId>,
}

impl LabelTable {
    fn intern(&mut self, label: String) -> EntityId {
        if let Some(id) = self.index.get(&label) {
            return *id;
        }
        let id = EntityId(self.labels.len() as u32);
        self.labels.push(label.clone());
        self.index.insert(label, id);
        id
    }
}

/// Run-scoped label interner.
#[derive(Debug, Default, Clone)]
pub struct EntityInterner {
    tables: [LabelTable; 3],
    /// First non-empty URI seen for each track id
    track_uris: Vec<Option<String>>,
}

/// Trim a label, mapping missing and blank values to the dimension's sentinel.
pub fn normalize_label(dimension: Dimension, label: Option<&str>) -> String {
    match label.map(str::trim) {
        Some(trimmed) if !trimmed.is_empty() => trimmed.to_string(),
        _ => dimension.unknown_label().to_string(),
    }
}

impl EntityInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a label, returning the same id for equal normalized labels.
    pub fn intern(&mut self, dimension: Dimension, label: Option<&str>) -> EntityId {
        let id = self.tables[dimension.index()].intern(normalize_label(dimension, label));
        if dimension == Dimension::Track && self.track_uris.len() <= id.index() {
            self.track_uris.resize(id.index() + 1, None);
        }
        id
    }

    /// Intern all three entities of a play.
    ///
    /// Tracks and albums are qualified by their artist ("Song - Artist") so
    /// equally named tracks by different artists stay distinct.
    pub fn intern_event(&mut self, event: &PlayEvent) -> EventEntities {
        let artist_name = normalize_label(Dimension::Artist, event.artist_label.as_deref());
        let track_name = normalize_label(Dimension::Track, event.track_label.as_deref());
        let album_name = normalize_label(Dimension::Album, event.album_label.as_deref());

        let artist = self.intern(Dimension::Artist, Some(&artist_name));
        let track = self.intern(
            Dimension::Track,
            Some(&format!("{} - {}", track_name, artist_name)),
        );
        let album = self.intern(
            Dimension::Album,
            Some(&format!("{} - {}", album_name, artist_name)),
        );

        if let Some(uri) = event.track_uri.as_deref().map(str::trim) {
            let slot = &mut self.track_uris[track.index()];
            if slot.is_none() && !uri.is_empty() {
                *slot = Some(uri.to_string());
            }
        }

        EventEntities {
            artist,
            track,
            album,
        }
    }

    /// Look up an id without interning.
    pub fn lookup(&self, dimension: Dimension, label: Option<&str>) -> Option<EntityId> {
        self.tables[dimension.index()]
            .index
            .get(&normalize_label(dimension, label))
            .copied()
    }

    /// Reverse mapping id → label.
    pub fn label(&self, dimension: Dimension, id: EntityId) -> Option<&str> {
        self.tables[dimension.index()]
            .labels
            .get(id.index())
            .map(String::as_str)
    }

    /// All labels of a dimension; the position of a label is its id.
    pub fn names(&self, dimension: Dimension) -> &[String] {
        &self.tables[dimension.index()].labels
    }

    /// Track URIs aligned with [`Self::names`] for [`Dimension::Track`].
    pub fn uris(&self) -> &[Option<String>] {
        &self.track_uris
    }

    pub fn len(&self, dimension: Dimension) -> usize {
        self.tables[dimension.index()].labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.iter().all(|t| t.labels.is_empty())
    }
}
