pub mod association;
pub mod bbox;
pub mod command;
pub mod config;
pub mod detection;
pub mod detector;
pub mod error;
pub mod export;
pub mod filter;
pub mod frame;
pub mod manual;
pub mod session;
pub mod store;
pub mod track;
pub mod video;

pub use command::{Command, Outcome};
pub use config::Config;
pub use detection::Detection;
pub use detector::Detector;
pub use error::{Error, Result};
pub use filter::ClassFilter;
pub use frame::Frame;
pub use session::Session;
pub use store::{FrameRecord, TrackStore};
pub use track::{Lifetime, Origin, Track};
pub use video::VideoSource;
