use ndarray::prelude::*;

/// One decoded video frame, pixels laid out as height x width x channels
pub struct Frame {
    pub index: usize,
    pub pixels: Array3<u8>,
}

impl Frame {
    pub fn new(index: usize, pixels: Array3<u8>) -> Self {
        Self { index, pixels }
    }

    /// Blank frame, useful when only the detections matter.
    pub fn blank(index: usize, dims: (u32, u32)) -> Self {
        let (w, h) = dims;
        Self::new(index, Array3::zeros([h as usize, w as usize, 3]))
    }

    /// (width, height)
    #[inline]
    pub fn dims(&self) -> (u32, u32) {
        let shape = self.pixels.shape();
        (shape[1] as u32, shape[0] as u32)
    }
}
