use crate::error::{Error, Result};
use crate::frame::Frame;

/// Random-access frame retrieval for the loaded video
pub trait VideoSource {
    fn frame_count(&self) -> usize;

    /// (width, height) shared by every frame
    fn dims(&self) -> (u32, u32);

    fn get_frame(&mut self, index: usize) -> Result<Frame>;
}

/// Video of blank frames, for replaying detections recorded elsewhere
#[derive(Debug, Clone)]
pub struct BlankVideo {
    frame_count: usize,
    dims: (u32, u32),
}

impl BlankVideo {
    pub fn new(frame_count: usize, dims: (u32, u32)) -> Self {
        Self { frame_count, dims }
    }
}

impl VideoSource for BlankVideo {
    #[inline]
    fn frame_count(&self) -> usize {
        self.frame_count
    }

    #[inline]
    fn dims(&self) -> (u32, u32) {
        self.dims
    }

    fn get_frame(&mut self, index: usize) -> Result<Frame> {
        if index >= self.frame_count {
            return Err(Error::invalid(format!(
                "frame {} is past the end of the video ({} frames)",
                index, self.frame_count
            )));
        }

        Ok(Frame::blank(index, self.dims))
    }
}
