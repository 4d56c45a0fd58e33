//! JSON timeline of a [`TrackStore`].
//!
//! The document maps every frame index, as a string key in ascending numeric
//! order, to the array of tracks shown in that frame:
//!
//! ```json
//! {
//!   "0": [{"id": 1, "class": "car", "box": [10.0, 10.0, 50.0, 50.0], "origin": "automatic", "confidence": 0.9}],
//!   "1": [{"id": 2, "class": "person", "box": [0.0, 0.0, 30.0, 30.0], "origin": "manual", "remaining": 4}]
//! }
//! ```
//!
//! `remaining` is written for manual tracks with a finite lifetime only.
//! Output is deterministic: same store and filter, same bytes.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize as _;
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

use crate::bbox::{BBox, Ltrb};
use crate::error::{Error, Result};
use crate::filter::ClassFilter;
use crate::store::{FrameRecord, TrackStore};
use crate::track::{Lifetime, Origin, Track};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    /// Export only what the class filter lets through.
    pub apply_filter: bool,
    pub pretty: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            apply_filter: true,
            pretty: true,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
struct ExportedTrack {
    id: u32,
    class: String,
    #[serde(rename = "box")]
    bbox: BBox<Ltrb>,
    origin: Origin,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    remaining: Option<u32>,
}

impl From<&Track> for ExportedTrack {
    fn from(t: &Track) -> Self {
        Self {
            id: t.id,
            class: t.class.clone(),
            bbox: t.bbox,
            origin: t.origin,
            confidence: t.confidence,
            remaining: match (t.origin, t.remaining_lifetime) {
                (Origin::Manual, Lifetime::Frames(n)) => Some(n),
                _ => None,
            },
        }
    }
}

struct Timeline<'a> {
    store: &'a TrackStore,
    filter: &'a ClassFilter,
}

impl<'a> serde::Serialize for Timeline<'a> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.store.len()))?;

        for record in self.store.iter() {
            let tracks: Vec<ExportedTrack> = self
                .filter
                .iter(&record.tracks)
                .map(ExportedTrack::from)
                .collect();

            map.serialize_entry(&record.frame_index.to_string(), &tracks)?;
        }

        map.end()
    }
}

pub fn to_writer<W: Write>(
    writer: W,
    store: &TrackStore,
    filter: &ClassFilter,
    config: &ExportConfig,
) -> Result<()> {
    let all = ClassFilter::All;
    let filter = if config.apply_filter { filter } else { &all };

    let timeline = Timeline { store, filter };

    if config.pretty {
        let mut ser = serde_json::Serializer::pretty(writer);
        timeline.serialize(&mut ser)?;
    } else {
        let mut ser = serde_json::Serializer::new(writer);
        timeline.serialize(&mut ser)?;
    }

    Ok(())
}

pub fn to_string(store: &TrackStore, filter: &ClassFilter, config: &ExportConfig) -> Result<String> {
    let mut buf = Vec::new();
    to_writer(&mut buf, store, filter, config)?;

    String::from_utf8(buf).map_err(|e| Error::invalid(e.to_string()))
}

/// Writes the timeline to `path`.
///
/// The document is written to a temporary file next to `path` and renamed
/// over it once complete; a failed export leaves nothing behind.
pub fn export(
    store: &TrackStore,
    filter: &ClassFilter,
    config: &ExportConfig,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(&mut tmp);
        to_writer(&mut writer, store, filter, config)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }

    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    info!(path = %path.display(), frames = store.len(), "timeline exported");

    Ok(())
}

/// Rebuilds a store from an exported document.
///
/// Manual tracks without `remaining` live until removed; the id allocator
/// resumes after the largest id seen.
pub fn from_str(s: &str) -> Result<TrackStore> {
    let doc: BTreeMap<usize, Vec<ExportedTrack>> = serde_json::from_str(s)?;

    for (expected, &frame_index) in doc.keys().enumerate() {
        if frame_index != expected {
            return Err(Error::invalid(format!(
                "frame {} is missing from the document",
                expected
            )));
        }
    }

    let mut max_id = 0;
    let mut records = Vec::with_capacity(doc.len());

    for (frame_index, tracks) in doc {
        let mut seen = Vec::with_capacity(tracks.len());
        let mut out = Vec::with_capacity(tracks.len());

        for t in tracks {
            if seen.contains(&t.id) {
                return Err(Error::invalid(format!(
                    "track {} appears twice in frame {}",
                    t.id, frame_index
                )));
            }
            seen.push(t.id);
            max_id = max_id.max(t.id);

            let (confidence, remaining_lifetime) = match (t.origin, t.remaining) {
                (Origin::Automatic, _) => (t.confidence, Lifetime::Infinite),
                (Origin::Manual, Some(0)) => {
                    return Err(Error::invalid(format!(
                        "track {} in frame {} has no lifetime left",
                        t.id, frame_index
                    )));
                }
                (Origin::Manual, Some(n)) => (None, Lifetime::Frames(n)),
                (Origin::Manual, None) => (None, Lifetime::Infinite),
            };

            out.push(Track {
                id: t.id,
                class: t.class,
                origin: t.origin,
                bbox: t.bbox,
                confidence,
                remaining_lifetime,
            });
        }

        records.push(FrameRecord {
            frame_index,
            tracks: out,
        });
    }

    Ok(TrackStore::from_parts(records, max_id + 1))
}

pub fn import(path: impl AsRef<Path>) -> Result<TrackStore> {
    let path = path.as_ref();
    let store = from_str(&std::fs::read_to_string(path)?)?;

    info!(path = %path.display(), frames = store.len(), "timeline imported");

    Ok(store)
}
