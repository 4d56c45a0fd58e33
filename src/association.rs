use munkres::{solve_assignment, WeightMatrix};
use serde_derive::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::detection::Detection;
use crate::error::{Error, Result};
use crate::track::{Origin, Track};

const MAX_OPTIMAL_SIZE: usize = 256;
const UNASSIGNABLE: f32 = 100000.0;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Best IoU first, ties resolved by detection order
    Greedy,
    /// Hungarian assignment over `1 - IoU`
    Optimal,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AssociationConfig {
    pub iou_threshold: f32,
    pub strategy: Strategy,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.3,
            strategy: Strategy::Greedy,
        }
    }
}

impl AssociationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.iou_threshold > 0.0 && self.iou_threshold <= 1.0) {
            return Err(Error::invalid(format!(
                "iou_threshold must be in (0, 1], got {}",
                self.iou_threshold
            )));
        }

        Ok(())
    }
}

/// Outcome of matching one frame's detections against the previous tracks.
///
/// Indices in `matched` are `(track position in previous frame, detection
/// index, iou)`; `missed` lists detection indices in ascending order.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionsMapping {
    pub matched: Vec<(usize, usize, f32)>,
    pub missed: Vec<usize>,
}

fn greedy(
    threshold: f32,
    detections: &[Detection],
    tracks: &[(usize, &Track)],
) -> Vec<(usize, usize, f32)> {
    let mut candidates = Vec::with_capacity(tracks.len() * detections.len());

    for &(pos, track) in tracks {
        for (j, det) in detections.iter().enumerate() {
            let iou = track.bbox.iou(&det.bbox);
            if iou >= threshold {
                candidates.push((pos, j, iou));
            }
        }
    }

    candidates.sort_by(|a, b| {
        b.2.total_cmp(&a.2)
            .then(a.1.cmp(&b.1))
            .then(a.0.cmp(&b.0))
    });

    let mut track_claimed = vec![false; tracks.iter().map(|(p, _)| p + 1).max().unwrap_or(0)];
    let mut det_claimed = vec![false; detections.len()];
    let mut assignments = Vec::new();

    for (pos, j, iou) in candidates {
        if track_claimed[pos] || det_claimed[j] {
            continue;
        }

        track_claimed[pos] = true;
        det_claimed[j] = true;
        assignments.push((pos, j, iou));
    }

    assignments
}

fn optimal(
    threshold: f32,
    detections: &[Detection],
    tracks: &[(usize, &Track)],
) -> Vec<(usize, usize, f32)> {
    if tracks.is_empty() || detections.is_empty() {
        return Vec::new();
    }

    let n = detections.len().max(tracks.len());
    if n > MAX_OPTIMAL_SIZE {
        warn!(n, "cost matrix is too big, falling back to greedy assignment");
        return greedy(threshold, detections, tracks);
    }

    let mut mat = WeightMatrix::from_fn(n, |(r, c)| {
        if r < tracks.len() && c < detections.len() {
            1.0 - tracks[r].1.bbox.iou(&detections[c].bbox)
        } else {
            UNASSIGNABLE
        }
    });

    match solve_assignment(&mut mat) {
        Ok(inner) => {
            let mut assignments: Vec<_> = inner
                .into_iter()
                .filter(|p| p.row < tracks.len() && p.column < detections.len())
                .filter_map(|p| {
                    let (pos, track) = tracks[p.row];
                    let iou = track.bbox.iou(&detections[p.column].bbox);

                    (iou >= threshold).then_some((pos, p.column, iou))
                })
                .collect();

            assignments.sort_by_key(|&(_, j, _)| j);
            assignments
        }
        Err(_) => {
            warn!("assignment could not be solved");
            Vec::new()
        }
    }
}

/// Matches `detections` against the automatic tracks of the previous frame.
pub fn map_detections(
    previous: &[Track],
    detections: &[Detection],
    config: &AssociationConfig,
) -> DetectionsMapping {
    let automatic: Vec<(usize, &Track)> = previous
        .iter()
        .enumerate()
        .filter(|(_, t)| t.origin == Origin::Automatic)
        .collect();

    let matched = match config.strategy {
        Strategy::Greedy => greedy(config.iou_threshold, detections, &automatic),
        Strategy::Optimal => optimal(config.iou_threshold, detections, &automatic),
    };

    let mut missed: Vec<_> = (0..detections.len()).collect();
    missed.retain(|&x| !matched.iter().any(|&(_, j, _)| j == x));

    DetectionsMapping { matched, missed }
}

/// Builds the track set of the next frame.
///
/// Matched automatic tracks keep their id and class and take the box and
/// confidence of their detection; unmatched automatic tracks end; manual
/// tracks are carried forward with one frame less to live. Survivors keep
/// their previous order and new tracks follow in detection order.
pub fn update(
    previous: &[Track],
    detections: &[Detection],
    config: &AssociationConfig,
    next_id: &mut impl FnMut() -> u32,
) -> Vec<Track> {
    let mapping = map_detections(previous, detections, config);

    let mut by_track: Vec<Option<usize>> = vec![None; previous.len()];
    for &(i, j, _) in &mapping.matched {
        by_track[i] = Some(j);
    }

    let mut tracks = Vec::with_capacity(previous.len() + mapping.missed.len());

    for (track, matched) in previous.iter().zip(by_track) {
        match (track.origin, matched) {
            (Origin::Manual, _) => tracks.push(track.carried_forward()),
            (Origin::Automatic, Some(j)) => {
                let det = &detections[j];
                tracks.push(Track {
                    bbox: det.bbox,
                    confidence: Some(det.confidence),
                    ..track.clone()
                });
            }
            (Origin::Automatic, None) => debug!(id = track.id, "track ended"),
        }
    }

    for j in mapping.missed {
        let id = next_id();
        debug!(id, class = %detections[j].class, "track started");
        tracks.push(Track::automatic(id, &detections[j]));
    }

    tracks
}
