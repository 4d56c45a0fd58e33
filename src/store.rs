use crate::track::Track;

/// All tracks present at one frame index
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub frame_index: usize,
    pub tracks: Vec<Track>,
}

impl FrameRecord {
    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    #[inline]
    pub fn get(&self, id: u32) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    #[inline]
    pub fn position(&self, id: u32) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }
}

/// Frame-indexed timeline of a video session.
///
/// Records always cover the contiguous range `0..len()`; the only way to
/// grow the store is [`TrackStore::push`], which stamps the next index.
/// Ids are handed out by [`TrackStore::allocate_id`] and never reused, even
/// after the records holding them are truncated.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackStore {
    records: Vec<FrameRecord>,
    next_id: u32,
}

impl TrackStore {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            next_id: 1,
        }
    }

    pub(crate) fn from_parts(records: Vec<FrameRecord>, next_id: u32) -> Self {
        debug_assert!(records
            .iter()
            .enumerate()
            .all(|(idx, r)| r.frame_index == idx));

        Self {
            records,
            next_id: next_id.max(1),
        }
    }

    #[inline]
    pub fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    #[inline]
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn get(&self, frame_index: usize) -> Option<&FrameRecord> {
        self.records.get(frame_index)
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, frame_index: usize) -> Option<&mut FrameRecord> {
        self.records.get_mut(frame_index)
    }

    #[inline]
    pub fn last(&self) -> Option<&FrameRecord> {
        self.records.last()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &FrameRecord> {
        self.records.iter()
    }

    /// Records from `frame_index` to the end of the store.
    #[inline]
    pub(crate) fn records_from_mut(&mut self, frame_index: usize) -> &mut [FrameRecord] {
        let start = frame_index.min(self.records.len());
        &mut self.records[start..]
    }

    /// Appends the record of the next frame and returns its index.
    pub(crate) fn push(&mut self, tracks: Vec<Track>) -> usize {
        let frame_index = self.records.len();
        self.records.push(FrameRecord {
            frame_index,
            tracks,
        });

        frame_index
    }

    /// Drops every record from `frame_index` onward.
    pub(crate) fn truncate(&mut self, frame_index: usize) {
        self.records.truncate(frame_index);
    }
}

impl Default for TrackStore {
    fn default() -> Self {
        Self::new()
    }
}
