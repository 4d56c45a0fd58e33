use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};
use crate::detection::Detection;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Automatic,
    Manual,
}

/// Frames a track still has to live, counted from the frame it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    Frames(u32),
    Infinite,
}

impl Lifetime {
    /// Lifetime one frame later.
    #[inline]
    pub fn decayed(self) -> Self {
        match self {
            Lifetime::Frames(n) => Lifetime::Frames(n.saturating_sub(1)),
            Lifetime::Infinite => Lifetime::Infinite,
        }
    }

    #[inline]
    pub fn is_expired(self) -> bool {
        self == Lifetime::Frames(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: u32,
    pub class: String,
    pub origin: Origin,
    pub bbox: BBox<Ltrb>,
    pub confidence: Option<f32>,
    pub remaining_lifetime: Lifetime,
}

impl Track {
    pub fn automatic(id: u32, det: &Detection) -> Self {
        Self {
            id,
            class: det.class.clone(),
            origin: Origin::Automatic,
            bbox: det.bbox,
            confidence: Some(det.confidence),
            remaining_lifetime: Lifetime::Infinite,
        }
    }

    pub fn manual(id: u32, class: impl Into<String>, bbox: BBox<Ltrb>, lifetime: Lifetime) -> Self {
        Self {
            id,
            class: class.into(),
            origin: Origin::Manual,
            bbox,
            confidence: None,
            remaining_lifetime: lifetime,
        }
    }

    #[inline]
    pub fn is_manual(&self) -> bool {
        self.origin == Origin::Manual
    }

    /// Copy of a manual track as it appears one frame later
    pub fn carried_forward(&self) -> Self {
        Self {
            remaining_lifetime: self.remaining_lifetime.decayed(),
            ..self.clone()
        }
    }
}
