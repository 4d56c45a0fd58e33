use thiserror::Error;

use crate::track::Origin;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Track {id} not found at frame {frame}")]
    NotFound { id: u32, frame: usize },

    #[error("Track {id} at frame {frame} has origin {origin:?}")]
    OriginMismatch { id: u32, frame: usize, origin: Origin },

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Detection failure: {0}")]
    DetectionFailure(String),
}

impl Error {
    #[inline]
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidRequest(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
