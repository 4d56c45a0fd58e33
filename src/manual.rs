use serde_derive::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bbox::{BBox, Ltrb};
use crate::error::{Error, Result};
use crate::store::{FrameRecord, TrackStore};
use crate::track::{Lifetime, Origin, Track};

/// A box drawn by the annotator on the current frame
#[derive(Debug, Clone, PartialEq)]
pub struct ManualBoxRequest {
    pub class: String,
    pub bbox: BBox<Ltrb>,
    pub lifetime_frames: u32,
}

impl ManualBoxRequest {
    /// `bbox` may be given left-top-right-bottom or left-top-width-height.
    pub fn new(class: impl Into<String>, bbox: impl Into<BBox<Ltrb>>, lifetime_frames: u32) -> Self {
        Self {
            class: class.into(),
            bbox: bbox.into(),
            lifetime_frames,
        }
    }
}

/// Changes applied to a track from one frame forward
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditRequest {
    pub bbox: Option<BBox<Ltrb>>,
    pub class: Option<String>,
    /// Restarts the lifetime count from the edited frame.
    pub lifetime_frames: Option<u32>,
}

impl EditRequest {
    pub fn bbox(bbox: BBox<Ltrb>) -> Self {
        Self {
            bbox: Some(bbox),
            ..Default::default()
        }
    }

    pub fn class(class: impl Into<String>) -> Self {
        Self {
            class: Some(class.into()),
            ..Default::default()
        }
    }

    pub fn with_lifetime(mut self, lifetime_frames: u32) -> Self {
        self.lifetime_frames = Some(lifetime_frames);
        self
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.bbox.is_none() && self.class.is_none() && self.lifetime_frames.is_none()
    }

    fn validate(&self, dims: (u32, u32)) -> Result<()> {
        if let Some(bbox) = &self.bbox {
            validate_bbox(bbox, dims)?;
        }

        if self.lifetime_frames == Some(0) {
            return Err(Error::invalid("lifetime_frames must be positive"));
        }

        Ok(())
    }

    fn apply_to(&self, track: &mut Track) {
        if let Some(bbox) = self.bbox {
            track.bbox = bbox;
        }

        if let Some(class) = &self.class {
            track.class = class.clone();
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ManualConfig {
    /// Lifetime given to automatic tracks converted to manual ones when the
    /// edit does not name one; `None` keeps them until removed.
    pub converted_lifetime: Option<u32>,
}

impl ManualConfig {
    pub fn validate(&self) -> Result<()> {
        if self.converted_lifetime == Some(0) {
            return Err(Error::invalid("converted_lifetime must be positive"));
        }

        Ok(())
    }

    #[inline]
    fn converted_lifetime(&self) -> Lifetime {
        self.converted_lifetime
            .map(Lifetime::Frames)
            .unwrap_or(Lifetime::Infinite)
    }
}

pub(crate) fn validate_bbox(bbox: &BBox<Ltrb>, dims: (u32, u32)) -> Result<()> {
    if bbox.is_degenerate() {
        return Err(Error::invalid(format!("degenerate box {:?}", bbox.as_slice())));
    }

    if !bbox.within(dims) {
        return Err(Error::invalid(format!(
            "box {:?} is outside the {}x{} frame",
            bbox.as_slice(),
            dims.0,
            dims.1
        )));
    }

    Ok(())
}

/// Entries taken out of the store by one removal
#[derive(Debug, Clone)]
struct Removal {
    id: u32,
    // (frame index, position in the record, track)
    entries: Vec<(usize, usize, Track)>,
}

impl Removal {
    #[inline]
    fn covers(&self, frame_index: usize) -> bool {
        self.entries.iter().any(|(f, _, _)| *f == frame_index)
    }
}

/// Writes `track` into every record from `from` onward, decaying its lifetime
/// frame by frame, and drops the id from the records past its lifetime.
fn rewrite_forward(store: &mut TrackStore, from: usize, mut track: Track) {
    let id = track.id;

    for record in store.records_from_mut(from) {
        let pos = record.position(id);

        if track.remaining_lifetime.is_expired() {
            if let Some(pos) = pos {
                record.tracks.remove(pos);
            }
        } else {
            match pos {
                Some(pos) => record.tracks[pos] = track.clone(),
                None => record.tracks.push(track.clone()),
            }
        }

        track = track.carried_forward();
    }
}

/// Writes a converted track forward like [`rewrite_forward`].
///
/// Later automatic entries of the same id stand for detections the converted
/// box no longer claims. They move to `successor`, the track association
/// starts for such detections, instead of being dropped.
fn convert_forward(store: &mut TrackStore, from: usize, mut track: Track, successor: Option<u32>) {
    let id = track.id;

    for record in store.records_from_mut(from) {
        let alive = !track.remaining_lifetime.is_expired();

        match (record.position(id), successor) {
            (Some(pos), Some(successor))
                if record.frame_index > from && !record.tracks[pos].is_manual() =>
            {
                let mut detected = if alive {
                    std::mem::replace(&mut record.tracks[pos], track.clone())
                } else {
                    record.tracks.remove(pos)
                };

                detected.id = successor;
                record.tracks.push(detected);
            }
            (Some(pos), _) if alive => record.tracks[pos] = track.clone(),
            (Some(pos), _) => {
                record.tracks.remove(pos);
            }
            (None, _) if alive => record.tracks.push(track.clone()),
            (None, _) => {}
        }

        track = track.carried_forward();
    }
}

/// Drops manual tracks whose lifetime ran out, returns how many were dropped.
pub fn expire(record: &mut FrameRecord) -> usize {
    let before = record.tracks.len();
    record
        .tracks
        .retain(|t| !(t.is_manual() && t.remaining_lifetime.is_expired()));

    let expired = before - record.tracks.len();
    if expired > 0 {
        debug!(frame = record.frame_index, expired, "manual boxes expired");
    }

    expired
}

/// Creation, edition and deletion of manual boxes.
///
/// Manual boxes are never merged with automatic tracks covering the same
/// region: both stay in the record until the annotator removes one.
#[derive(Debug, Clone, Default)]
pub struct ManualAnnotations {
    config: ManualConfig,
    removed: Vec<Removal>,
}

impl ManualAnnotations {
    pub fn new(config: ManualConfig) -> Self {
        Self {
            config,
            removed: Vec::new(),
        }
    }

    fn find<'a>(store: &'a TrackStore, id: u32, frame_index: usize) -> Result<&'a Track> {
        store
            .get(frame_index)
            .and_then(|r| r.get(id))
            .ok_or(Error::NotFound {
                id,
                frame: frame_index,
            })
    }

    /// Spawns a manual track at `frame_index`, living `lifetime_frames` frames.
    pub fn add(
        &mut self,
        store: &mut TrackStore,
        request: ManualBoxRequest,
        frame_index: usize,
        dims: (u32, u32),
    ) -> Result<Track> {
        if request.lifetime_frames == 0 {
            return Err(Error::invalid("lifetime_frames must be positive"));
        }

        validate_bbox(&request.bbox, dims)?;

        if store.get(frame_index).is_none() {
            return Err(Error::invalid(format!(
                "frame {} has not been processed",
                frame_index
            )));
        }

        let id = store.allocate_id();
        let track = Track::manual(
            id,
            request.class,
            request.bbox,
            Lifetime::Frames(request.lifetime_frames),
        );

        rewrite_forward(store, frame_index, track.clone());
        info!(id, frame = frame_index, lifetime = request.lifetime_frames, "manual box added");

        Ok(track)
    }

    /// Edits a manual track from `frame_index` forward; earlier frames keep
    /// their values.
    pub fn edit(
        &mut self,
        store: &mut TrackStore,
        id: u32,
        frame_index: usize,
        edit: EditRequest,
        dims: (u32, u32),
    ) -> Result<Track> {
        if edit.is_empty() {
            return Err(Error::invalid("empty edit"));
        }

        edit.validate(dims)?;

        let track = Self::find(store, id, frame_index)?;
        if track.origin != Origin::Manual {
            return Err(Error::OriginMismatch {
                id,
                frame: frame_index,
                origin: track.origin,
            });
        }

        let mut updated = track.clone();
        edit.apply_to(&mut updated);

        if let Some(lifetime) = edit.lifetime_frames {
            updated.remaining_lifetime = Lifetime::Frames(lifetime);
            rewrite_forward(store, frame_index, updated.clone());
        } else {
            for record in store.records_from_mut(frame_index) {
                if let Some(t) = record.tracks.iter_mut().find(|t| t.id == id) {
                    edit.apply_to(t);
                }
            }
        }

        info!(id, frame = frame_index, "manual box edited");

        Ok(updated)
    }

    /// Turns an automatic track into a manual one from `frame_index` forward,
    /// keeping its id.
    pub fn convert(
        &mut self,
        store: &mut TrackStore,
        id: u32,
        frame_index: usize,
        edit: EditRequest,
        dims: (u32, u32),
    ) -> Result<Track> {
        edit.validate(dims)?;

        let track = Self::find(store, id, frame_index)?;
        if track.origin != Origin::Automatic {
            return Err(Error::OriginMismatch {
                id,
                frame: frame_index,
                origin: track.origin,
            });
        }

        let lifetime = edit
            .lifetime_frames
            .map(Lifetime::Frames)
            .unwrap_or_else(|| self.config.converted_lifetime());

        let mut converted = Track::manual(id, track.class.clone(), track.bbox, lifetime);
        edit.apply_to(&mut converted);

        let detected_later = store
            .iter()
            .skip(frame_index + 1)
            .any(|r| r.get(id).map_or(false, |t| !t.is_manual()));
        let successor = detected_later.then(|| store.allocate_id());

        convert_forward(store, frame_index, converted.clone(), successor);
        info!(id, frame = frame_index, ?successor, "automatic track converted to manual");

        Ok(converted)
    }

    /// Deletes the track from `frame_index` forward. Earlier frames keep it.
    pub fn remove(&mut self, store: &mut TrackStore, id: u32, frame_index: usize) -> Result<()> {
        Self::find(store, id, frame_index)?;

        let mut entries = Vec::new();
        for record in store.records_from_mut(frame_index) {
            if let Some(pos) = record.position(id) {
                entries.push((record.frame_index, pos, record.tracks.remove(pos)));
            }
        }

        info!(id, frame = frame_index, frames = entries.len(), "box removed");
        self.removed.push(Removal { id, entries });

        Ok(())
    }

    /// Forgets removed entries at or past `frame_index`, for records that are
    /// about to be computed again.
    pub fn forget_from(&mut self, frame_index: usize) {
        for removal in &mut self.removed {
            removal.entries.retain(|(f, _, _)| *f < frame_index);
        }

        self.removed.retain(|r| !r.entries.is_empty());
    }

    /// Undoes the latest removal of `id` that took it out of `frame_index`.
    ///
    /// Entries go back into the records that still exist and do not hold the
    /// id again.
    pub fn restore(&mut self, store: &mut TrackStore, id: u32, frame_index: usize) -> Result<Track> {
        let idx = self
            .removed
            .iter()
            .rposition(|r| r.id == id && r.covers(frame_index))
            .ok_or(Error::NotFound {
                id,
                frame: frame_index,
            })?;

        let removal = self.removed.remove(idx);
        let restored = removal
            .entries
            .iter()
            .find(|(f, _, _)| *f == frame_index)
            .map(|(_, _, t)| t.clone())
            .ok_or(Error::NotFound {
                id,
                frame: frame_index,
            })?;

        let mut count = 0;
        for (f, pos, track) in removal.entries {
            if let Some(record) = store.get_mut(f) {
                if record.position(id).is_none() {
                    let pos = pos.min(record.tracks.len());
                    record.tracks.insert(pos, track);
                    count += 1;
                }
            }
        }

        info!(id, frame = frame_index, frames = count, "box restored");

        Ok(restored)
    }
}
