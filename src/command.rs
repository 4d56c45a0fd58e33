use std::path::PathBuf;

use crate::detector::Detector;
use crate::error::Result;
use crate::filter::ClassFilter;
use crate::manual::{EditRequest, ManualBoxRequest};
use crate::session::Session;
use crate::track::Track;
use crate::video::VideoSource;

/// One request from the user interface.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Advance,
    Seek(usize),
    Reprocess(usize),
    AddBox(ManualBoxRequest),
    EditBox {
        id: u32,
        frame: usize,
        edit: EditRequest,
    },
    ConvertBox {
        id: u32,
        frame: usize,
        edit: EditRequest,
    },
    RemoveBox {
        id: u32,
        frame: usize,
    },
    RestoreBox {
        id: u32,
        frame: usize,
    },
    SetFilter(ClassFilter),
    ClearFilter,
    SetConfidenceThreshold(f32),
    Export(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The frame now under the cursor, with the tracks the filter shows.
    Frame { index: usize, tracks: Vec<Track> },
    EndOfVideo,
    Track(Track),
    Exported(PathBuf),
    Done,
}

impl<V: VideoSource, D: Detector> Session<V, D> {
    fn frame_outcome(&self) -> Outcome {
        match self.current_frame() {
            Some(index) => Outcome::Frame {
                index,
                tracks: self.visible_tracks(),
            },
            None => Outcome::Done,
        }
    }

    pub fn dispatch(&mut self, command: Command) -> Result<Outcome> {
        tracing::debug!(?command, "dispatch");

        Ok(match command {
            Command::Advance => match self.advance()? {
                Some(_) => self.frame_outcome(),
                None => Outcome::EndOfVideo,
            },
            Command::Seek(frame) => {
                self.seek(frame)?;
                self.frame_outcome()
            }
            Command::Reprocess(frame) => {
                self.reprocess_from(frame);
                Outcome::Done
            }
            Command::AddBox(request) => Outcome::Track(self.add_box(request)?),
            Command::EditBox { id, frame, edit } => Outcome::Track(self.edit_box(id, frame, edit)?),
            Command::ConvertBox { id, frame, edit } => {
                Outcome::Track(self.convert_box(id, frame, edit)?)
            }
            Command::RemoveBox { id, frame } => {
                self.remove_box(id, frame)?;
                Outcome::Done
            }
            Command::RestoreBox { id, frame } => Outcome::Track(self.restore_box(id, frame)?),
            Command::SetFilter(filter) => {
                self.set_filter(filter);
                self.frame_outcome()
            }
            Command::ClearFilter => {
                self.clear_filter();
                self.frame_outcome()
            }
            Command::SetConfidenceThreshold(threshold) => {
                self.set_confidence_threshold(threshold)?;
                Outcome::Done
            }
            Command::Export(path) => {
                self.export(&path)?;
                Outcome::Exported(path)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BBox;
    use crate::config::Config;
    use crate::detection::Detection;
    use crate::error::Error;
    use crate::frame::Frame;
    use crate::video::BlankVideo;

    fn session() -> Session<BlankVideo, impl FnMut(&Frame) -> Result<Vec<Detection>>> {
        let detector = |frame: &Frame| -> Result<Vec<Detection>> {
            let x = 10.0 + frame.index as f32;
            Ok(vec![Detection::new("car", 0.9, BBox::ltrb(x, 10., x + 40., 50.))])
        };

        Session::new(BlankVideo::new(3, (100, 100)), detector, Config::default()).unwrap()
    }

    #[test]
    fn advance_until_end() {
        let mut session = session();

        for expected in 0..3 {
            match session.dispatch(Command::Advance).unwrap() {
                Outcome::Frame { index, tracks } => {
                    assert_eq!(index, expected);
                    assert_eq!(tracks.len(), 1);
                    assert_eq!(tracks[0].id, 1);
                }
                other => panic!("unexpected outcome {:?}", other),
            }
        }

        assert_eq!(session.dispatch(Command::Advance).unwrap(), Outcome::EndOfVideo);
    }

    #[test]
    fn filter_changes_visible_tracks() {
        let mut session = session();
        session.dispatch(Command::Seek(1)).unwrap();

        let outcome = session
            .dispatch(Command::SetFilter(ClassFilter::only(["person"])))
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Frame {
                index: 1,
                tracks: vec![]
            }
        );
        assert_eq!(session.store().get(1).unwrap().len(), 1);
    }

    #[test]
    fn errors_pass_through() {
        let mut session = session();

        assert!(matches!(
            session.dispatch(Command::Seek(3)),
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(
            session.dispatch(Command::AddBox(ManualBoxRequest::new(
                "car",
                BBox::ltrb(0., 0., 10., 10.),
                2
            ))),
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(
            session.dispatch(Command::RemoveBox { id: 9, frame: 0 }),
            Err(Error::NotFound { id: 9, frame: 0 })
        ));
    }
}
