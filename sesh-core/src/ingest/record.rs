//! Export record schema
//!
//! Streaming-history exports come in two shapes: the extended export
//! (`ts`, `ms_played`, `master_metadata_*`) and the older account-data
//! export (`endTime`, `msPlayed`, `trackName`, `artistName`). [`RawRecord`]
//! accepts both and [`RawRecord::into_event`] turns one into a [`PlayEvent`]
//! or reports the field that made it unusable.

use crate::error::{Error, Result};
use crate::types::PlayEvent;
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

/// Timestamp layout of the legacy `endTime` field.
const LEGACY_END_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// `reason_end` value meaning the user pressed "next".
const FORWARD_BUTTON: &str = "fwdbtn";

/// One element of an export file, before validation.
#[derive(Debug, Default, Deserialize)]
pub struct RawRecord {
    /// Start (extended export) as RFC 3339
    #[serde(default)]
    pub ts: Option<String>,

    /// End of playback (legacy export), minute precision
    #[serde(default, rename = "endTime")]
    pub end_time: Option<String>,

    #[serde(default, alias = "msPlayed")]
    pub ms_played: Option<serde_json::Value>,

    #[serde(default, alias = "track_name", alias = "trackName")]
    pub master_metadata_track_name: Option<String>,

    #[serde(default, alias = "artist_name", alias = "artistName")]
    pub master_metadata_album_artist_name: Option<String>,

    #[serde(default, alias = "album_name")]
    pub master_metadata_album_album_name: Option<String>,

    #[serde(default)]
    pub platform: Option<String>,

    #[serde(default)]
    pub offline: Option<bool>,

    #[serde(default)]
    pub skipped: Option<bool>,

    #[serde(default)]
    pub reason_end: Option<String>,

    #[serde(default)]
    pub spotify_track_uri: Option<String>,
}

impl RawRecord {
    /// Deserialize a single array element.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        if !value.is_object() {
            return Err(Error::invalid_field("record", "element is not an object"));
        }
        serde_json::from_value(value).map_err(|e| Error::invalid_field("record", e.to_string()))
    }

    /// Validate and convert into a play event.
    ///
    /// No filtering or repair happens here; see [`super::EventFilter`].
    pub fn into_event(self) -> Result<PlayEvent> {
        let ms_played = self.parse_ms_played()?;
        let timestamp = self.parse_timestamp(ms_played)?;

        let skipped = match self.skipped {
            Some(skipped) => skipped,
            None => self.reason_end.as_deref() == Some(FORWARD_BUTTON),
        };

        Ok(PlayEvent {
            timestamp,
            track_label: non_blank(self.master_metadata_track_name),
            artist_label: non_blank(self.master_metadata_album_artist_name),
            album_label: non_blank(self.master_metadata_album_album_name),
            ms_played,
            platform: non_blank(self.platform),
            offline: self.offline.unwrap_or(false),
            skipped,
            track_uri: non_blank(self.spotify_track_uri),
        })
    }

    fn parse_ms_played(&self) -> Result<u64> {
        let value = self
            .ms_played
            .as_ref()
            .ok_or_else(|| Error::invalid_field("ms_played", "missing"))?;

        let number = value
            .as_f64()
            .ok_or_else(|| Error::invalid_field("ms_played", format!("not a number: {}", value)))?;

        if !number.is_finite() || number < 0.0 {
            return Err(Error::invalid_field(
                "ms_played",
                format!("out of range: {}", value),
            ));
        }

        Ok(number.round() as u64)
    }

    fn parse_timestamp(&self, ms_played: u64) -> Result<DateTime<Utc>> {
        if let Some(ts) = self.ts.as_deref() {
            return DateTime::parse_from_rfc3339(ts.trim())
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| Error::invalid_field("ts", format!("{}: {}", ts, e)));
        }

        if let Some(end_time) = self.end_time.as_deref() {
            let naive = NaiveDateTime::parse_from_str(end_time.trim(), LEGACY_END_TIME_FORMAT)
                .map_err(|e| Error::invalid_field("endTime", format!("{}: {}", end_time, e)))?;
            let end = Utc.from_utc_datetime(&naive);
            // Durations past the loader cap are clamped there anyway; the start
            // only has to stay representable.
            let played = ms_played.min(super::MAX_MS_PLAYED) as i64;
            return Ok(end - Duration::milliseconds(played));
        }

        Err(Error::invalid_field("ts", "missing"))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
