use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::marker::PhantomData;

pub trait BBoxFormat: std::fmt::Debug + Copy {}

/// Left, top, width, height: how a box is drawn by dragging from a corner
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ltwh;
impl BBoxFormat for Ltwh {}

/// Left, top, right, bottom in pixels; the format tracks are stored in
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ltrb;
impl BBoxFormat for Ltrb {}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BBox<F: BBoxFormat>([f32; 4], PhantomData<F>);

impl<F: BBoxFormat> From<BBox<F>> for [f32; 4] {
    fn from(bbox: BBox<F>) -> Self {
        bbox.0
    }
}

// Boxes go over the wire as plain `[a, b, c, d]` arrays in their own format.
impl<F: BBoxFormat> Serialize for BBox<F> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de, F: BBoxFormat> Deserialize<'de> for BBox<F> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <[f32; 4]>::deserialize(deserializer).map(|raw| BBox::assigned(&raw))
    }
}

impl<F: BBoxFormat> BBox<F> {
    #[inline]
    pub fn as_slice(&self) -> &[f32; 4] {
        &self.0
    }

    // no conversion: `slice` must already be laid out as `F`
    #[inline(always)]
    pub fn assigned(slice: &[f32; 4]) -> Self {
        BBox(*slice, Default::default())
    }
}

impl BBox<Ltwh> {
    #[inline]
    pub fn ltwh(x1: f32, x2: f32, x3: f32, x4: f32) -> Self {
        BBox([x1, x2, x3, x4], Default::default())
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3]
    }

    #[inline]
    pub fn as_ltrb(&self) -> BBox<Ltrb> {
        (*self).into()
    }
}

impl BBox<Ltrb> {
    #[inline]
    pub fn ltrb(x1: f32, x2: f32, x3: f32, x4: f32) -> Self {
        BBox([x1, x2, x3, x4], Default::default())
    }

    #[inline]
    pub fn as_ltwh(&self) -> BBox<Ltwh> {
        (*self).into()
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn right(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn bottom(&self) -> f32 {
        self.0[3]
    }

    #[inline(always)]
    pub fn width(&self) -> f32 {
        self.0[2] - self.0[0]
    }

    #[inline(always)]
    pub fn height(&self) -> f32 {
        self.0[3] - self.0[1]
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.width().max(0.) * self.height().max(0.)
    }

    /// Zero or negative extent on either axis (NaN counts as degenerate).
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        !(self.width() > 0. && self.height() > 0.)
    }

    /// Fully inside a `width` x `height` frame.
    pub fn within(&self, dims: (u32, u32)) -> bool {
        let (fw, fh) = (dims.0 as f32, dims.1 as f32);

        self.left() >= 0. && self.top() >= 0. && self.right() <= fw && self.bottom() <= fh
    }

    pub fn clamped(&self, dims: (u32, u32)) -> Self {
        let (fw, fh) = (dims.0 as f32, dims.1 as f32);

        BBox::ltrb(
            self.left().clamp(0., fw),
            self.top().clamp(0., fh),
            self.right().clamp(0., fw),
            self.bottom().clamp(0., fh),
        )
    }

    /// Intersection over union, `0.0` when the union is empty.
    pub fn iou(&self, other: &BBox<Ltrb>) -> f32 {
        let i_xmin = self.left().max(other.left());
        let i_xmax = self.right().min(other.right());
        let i_ymin = self.top().max(other.top());
        let i_ymax = self.bottom().min(other.bottom());
        let i_area = (i_xmax - i_xmin).max(0.) * (i_ymax - i_ymin).max(0.);

        let union = self.area() + other.area() - i_area;
        if union <= 0. {
            return 0.;
        }

        i_area / union
    }
}

impl From<BBox<Ltwh>> for BBox<Ltrb> {
    #[inline]
    fn from(roi: BBox<Ltwh>) -> Self {
        let [l, t, w, h] = roi.0;
        BBox::ltrb(l, t, l + w, t + h)
    }
}

impl From<BBox<Ltrb>> for BBox<Ltwh> {
    #[inline]
    fn from(bbox: BBox<Ltrb>) -> Self {
        BBox::ltwh(bbox.left(), bbox.top(), bbox.width(), bbox.height())
    }
}
