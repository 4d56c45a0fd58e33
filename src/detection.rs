use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};

/// A raw detector output: class label, confidence and a left-top-right-bottom box
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Detection {
    #[serde(rename = "c")]
    pub class: String,
    #[serde(rename = "p")]
    pub confidence: f32,
    pub bbox: BBox<Ltrb>,
}

impl Detection {
    pub fn new(class: impl Into<String>, confidence: f32, bbox: BBox<Ltrb>) -> Self {
        Self {
            class: class.into(),
            confidence,
            bbox,
        }
    }
}
