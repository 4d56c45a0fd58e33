#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use annotrack::bbox::BBox;
use annotrack::{Detection, Error, Frame, Result, VideoSource};

pub const DIMS: (u32, u32) = (200, 100);

/// Video whose frames can be made to fail
pub struct ScriptedVideo {
    pub frame_count: usize,
    pub broken: BTreeSet<usize>,
}

impl ScriptedVideo {
    pub fn new(frame_count: usize) -> Self {
        Self {
            frame_count,
            broken: BTreeSet::new(),
        }
    }
}

impl VideoSource for ScriptedVideo {
    fn frame_count(&self) -> usize {
        self.frame_count
    }

    fn dims(&self) -> (u32, u32) {
        DIMS
    }

    fn get_frame(&mut self, index: usize) -> Result<Frame> {
        if self.broken.contains(&index) {
            return Err(Error::DetectionFailure(format!("frame {} is corrupted", index)));
        }

        Ok(Frame::blank(index, DIMS))
    }
}

/// Detections per frame index; a missing entry means nothing detected and
/// a `None` entry means the model failed on that frame.
#[derive(Default, Clone)]
pub struct Script {
    frames: BTreeMap<usize, Option<Vec<Detection>>>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, frame: usize, class: &str, confidence: f32, b: [f32; 4]) -> Self {
        self.frames
            .entry(frame)
            .or_insert_with(|| Some(Vec::new()))
            .get_or_insert_with(Vec::new)
            .push(Detection::new(class, confidence, BBox::assigned(&b)));
        self
    }

    /// Same detection on every frame of `frames`, moving by `step` px each frame.
    pub fn moving(
        mut self,
        frames: std::ops::Range<usize>,
        class: &str,
        start: [f32; 4],
        step: f32,
    ) -> Self {
        for (n, frame) in frames.enumerate() {
            let dx = step * n as f32;
            self = self.at(
                frame,
                class,
                0.9,
                [start[0] + dx, start[1], start[2] + dx, start[3]],
            );
        }
        self
    }

    pub fn failing(mut self, frame: usize) -> Self {
        self.frames.insert(frame, None);
        self
    }

    pub fn detector(self) -> impl FnMut(&Frame) -> Result<Vec<Detection>> {
        move |frame: &Frame| -> Result<Vec<Detection>> {
            match self.frames.get(&frame.index) {
                Some(Some(dets)) => Ok(dets.clone()),
                Some(None) => Err(Error::DetectionFailure("model crashed".into())),
                None => Ok(Vec::new()),
            }
        }
    }
}
