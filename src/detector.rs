use serde_derive::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::detection::Detection;
use crate::error::{Error, Result};
use crate::frame::Frame;

/// The detection model, treated as a black box
pub trait Detector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>>;
}

impl<F> Detector for F
where
    F: FnMut(&Frame) -> Result<Vec<Detection>>,
{
    #[inline]
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        self(frame)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct DetectorConfig {
    pub confidence_threshold: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.25,
        }
    }
}

impl DetectorConfig {
    pub fn new(confidence_threshold: f32) -> Self {
        Self {
            confidence_threshold,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(Error::invalid(format!(
                "confidence_threshold must be in [0, 1], got {}",
                self.confidence_threshold
            )));
        }

        Ok(())
    }
}

/// Wraps a [`Detector`] and cleans up its output.
///
/// Detections under the confidence threshold are dropped, boxes are clamped
/// to the frame and whatever collapses to a degenerate box is discarded. A
/// failing detector yields an empty list for that frame so playback can go
/// on.
pub struct DetectionAdapter<D> {
    detector: D,
    config: DetectorConfig,
}

impl<D: Detector> DetectionAdapter<D> {
    pub fn new(detector: D, config: DetectorConfig) -> Self {
        Self { detector, config }
    }

    #[inline]
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn set_confidence_threshold(&mut self, confidence_threshold: f32) -> Result<()> {
        let config = DetectorConfig::new(confidence_threshold);
        config.validate()?;
        self.config = config;

        Ok(())
    }

    pub fn detect(&mut self, frame: &Frame) -> Vec<Detection> {
        let raw = match self.detector.detect(frame) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(frame = frame.index, %err, "detector failed, using zero detections");
                return Vec::new();
            }
        };

        self.postprocess(raw, frame.dims())
    }

    fn postprocess(&self, raw: Vec<Detection>, dims: (u32, u32)) -> Vec<Detection> {
        let total = raw.len();

        let dets: Vec<_> = raw
            .into_iter()
            .filter(|d| d.confidence >= self.config.confidence_threshold)
            .filter_map(|mut d| {
                d.bbox = d.bbox.clamped(dims);
                d.confidence = d.confidence.clamp(0.0, 1.0);

                (!d.bbox.is_degenerate()).then_some(d)
            })
            .collect();

        if dets.len() < total {
            debug!(kept = dets.len(), total, "detections filtered");
        }

        dets
    }
}
