use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::association;
use crate::config::Config;
use crate::detector::{DetectionAdapter, Detector};
use crate::error::{Error, Result};
use crate::export;
use crate::filter::ClassFilter;
use crate::manual::{self, EditRequest, ManualAnnotations, ManualBoxRequest};
use crate::store::{FrameRecord, TrackStore};
use crate::track::Track;
use crate::video::VideoSource;

/// Everything one annotation session works on.
///
/// The store grows one frame at a time, either lazily while playback moves
/// forward or eagerly through [`Session::precompute`]. Operations are plain
/// synchronous calls; none of them keeps running in the background.
pub struct Session<V, D> {
    video: V,
    detector: DetectionAdapter<D>,
    store: TrackStore,
    manual: ManualAnnotations,
    filter: ClassFilter,
    config: Config,
    cursor: Option<usize>,
}

impl<V: VideoSource, D: Detector> Session<V, D> {
    pub fn new(video: V, detector: D, config: Config) -> Result<Self> {
        Self::with_store(video, detector, config, TrackStore::new())
    }

    /// Resumes a session over an existing store, e.g. an imported timeline.
    pub fn with_store(video: V, detector: D, config: Config, store: TrackStore) -> Result<Self> {
        config.validate()?;

        if store.len() > video.frame_count() {
            return Err(Error::invalid(format!(
                "store holds {} frames but the video has {}",
                store.len(),
                video.frame_count()
            )));
        }

        Ok(Self {
            video,
            detector: DetectionAdapter::new(detector, config.detector.clone()),
            store,
            manual: ManualAnnotations::new(config.manual.clone()),
            filter: ClassFilter::All,
            config,
            cursor: None,
        })
    }

    #[inline]
    pub fn store(&self) -> &TrackStore {
        &self.store
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn filter(&self) -> &ClassFilter {
        &self.filter
    }

    #[inline]
    pub fn current_frame(&self) -> Option<usize> {
        self.cursor
    }

    #[inline]
    pub fn frame_count(&self) -> usize {
        self.video.frame_count()
    }

    /// Every frame of the video has a record.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.store.len() == self.video.frame_count()
    }

    fn process_next(&mut self) -> usize {
        let frame_index = self.store.len();

        let detections = match self.video.get_frame(frame_index) {
            Ok(frame) => self.detector.detect(&frame),
            Err(err) => {
                warn!(frame = frame_index, %err, "frame unavailable, using zero detections");
                Vec::new()
            }
        };

        let previous = self
            .store
            .last()
            .map(|r| r.tracks.clone())
            .unwrap_or_default();

        let store = &mut self.store;
        let tracks = association::update(
            &previous,
            &detections,
            &self.config.association,
            &mut || store.allocate_id(),
        );

        let mut record = FrameRecord {
            frame_index,
            tracks,
        };
        manual::expire(&mut record);

        debug!(frame = frame_index, tracks = record.len(), "frame processed");
        self.store.push(record.tracks)
    }

    /// Moves to the next frame, processing it if needed. `None` at the end of
    /// the video.
    pub fn advance(&mut self) -> Result<Option<&FrameRecord>> {
        let next = self.cursor.map_or(0, |c| c + 1);
        if next >= self.video.frame_count() {
            return Ok(None);
        }

        while self.store.len() <= next {
            self.process_next();
        }

        self.cursor = Some(next);
        Ok(self.store.get(next))
    }

    /// Jumps to `frame_index`, processing every frame up to it first.
    pub fn seek(&mut self, frame_index: usize) -> Result<&FrameRecord> {
        if frame_index >= self.video.frame_count() {
            return Err(Error::invalid(format!(
                "frame {} is past the end of the video ({} frames)",
                frame_index,
                self.video.frame_count()
            )));
        }

        while self.store.len() <= frame_index {
            self.process_next();
        }

        self.cursor = Some(frame_index);
        self.store
            .get(frame_index)
            .ok_or_else(|| Error::invalid(format!("frame {} has no record", frame_index)))
    }

    /// Processes the rest of the video, checking `cancel` between frames.
    /// Returns the number of frames with a record.
    pub fn precompute(&mut self, cancel: &AtomicBool) -> usize {
        while self.store.len() < self.video.frame_count() {
            if cancel.load(Ordering::Relaxed) {
                info!(frames = self.store.len(), "precompute cancelled");
                break;
            }

            self.process_next();
        }

        self.store.len()
    }

    /// Forgets the records from `frame_index` onward so they get computed
    /// again. Removals recorded for those frames can no longer be restored
    /// there.
    pub fn reprocess_from(&mut self, frame_index: usize) {
        self.store.truncate(frame_index);
        self.manual.forget_from(frame_index);

        if matches!(self.cursor, Some(c) if c >= frame_index) {
            self.cursor = frame_index.checked_sub(1);
        }

        info!(frame = frame_index, "frames scheduled for reprocessing");
    }

    pub fn set_filter(&mut self, filter: ClassFilter) {
        debug!(?filter, "class filter set");
        self.filter = filter;
    }

    #[inline]
    pub fn clear_filter(&mut self) {
        self.set_filter(ClassFilter::All);
    }

    pub fn set_confidence_threshold(&mut self, confidence_threshold: f32) -> Result<()> {
        self.detector.set_confidence_threshold(confidence_threshold)?;
        self.config.detector = self.detector.config().clone();

        Ok(())
    }

    /// Tracks of `frame_index` that pass the class filter.
    pub fn tracks_at(&self, frame_index: usize) -> Option<Vec<Track>> {
        self.store
            .get(frame_index)
            .map(|r| self.filter.apply(&r.tracks))
    }

    /// Tracks of the current frame that pass the class filter.
    pub fn visible_tracks(&self) -> Vec<Track> {
        self.cursor
            .and_then(|c| self.tracks_at(c))
            .unwrap_or_default()
    }

    /// Adds a manual box on the current frame.
    pub fn add_box(&mut self, request: ManualBoxRequest) -> Result<Track> {
        let frame_index = self
            .cursor
            .ok_or_else(|| Error::invalid("no frame is loaded"))?;
        let dims = self.video.dims();

        self.manual.add(&mut self.store, request, frame_index, dims)
    }

    pub fn edit_box(&mut self, id: u32, frame_index: usize, edit: EditRequest) -> Result<Track> {
        let dims = self.video.dims();
        self.manual.edit(&mut self.store, id, frame_index, edit, dims)
    }

    pub fn convert_box(&mut self, id: u32, frame_index: usize, edit: EditRequest) -> Result<Track> {
        let dims = self.video.dims();
        self.manual
            .convert(&mut self.store, id, frame_index, edit, dims)
    }

    pub fn remove_box(&mut self, id: u32, frame_index: usize) -> Result<()> {
        self.manual.remove(&mut self.store, id, frame_index)
    }

    pub fn restore_box(&mut self, id: u32, frame_index: usize) -> Result<Track> {
        self.manual.restore(&mut self.store, id, frame_index)
    }

    pub fn export(&self, path: impl AsRef<Path>) -> Result<()> {
        export::export(&self.store, &self.filter, &self.config.export, path)
    }

    pub fn export_string(&self) -> Result<String> {
        export::to_string(&self.store, &self.filter, &self.config.export)
    }
}
