use std::collections::BTreeMap;
use std::io::BufRead;
use std::sync::atomic::AtomicBool;

use annotrack::video::BlankVideo;
use annotrack::{Config, Detection, Error, Frame, Session};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn parse_line(line: &str) -> Option<(usize, Vec<Detection>)> {
    let idx = match line.find(':') {
        Some(idx) => idx,
        None => {
            warn!("wrong file format: expected `:`");
            return None;
        }
    };

    let (index, vector) = line.split_at(idx);

    match (
        index.trim().parse::<usize>(),
        serde_json::from_str(&vector[1..]),
    ) {
        (Ok(index), Ok(vector)) => Some((index, vector)),
        (Ok(_), Err(err)) => {
            warn!(%err, "wrong file format: parse json failed");
            None
        }
        (Err(_), Ok(_)) => {
            warn!("wrong file format: parse frame index failed");
            None
        }
        _ => {
            warn!("wrong file format: parse failed");
            None
        }
    }
}

const MAX_FRAME_SIDE: u32 = 16384;

/// Smallest frame size holding every recorded box.
fn frame_dims(dump: &BTreeMap<usize, Vec<Detection>>) -> Result<(u32, u32), Error> {
    let mut dims = (1, 1);

    for (index, det) in dump.iter().flat_map(|(i, dets)| dets.iter().map(move |d| (i, d))) {
        let (right, bottom) = (det.bbox.right(), det.bbox.bottom());

        if !(right.is_finite() && bottom.is_finite())
            || right > MAX_FRAME_SIDE as f32
            || bottom > MAX_FRAME_SIDE as f32
        {
            return Err(Error::InvalidRequest(format!(
                "box {:?} at frame {} exceeds the {}px frame limit",
                det.bbox.as_slice(),
                index,
                MAX_FRAME_SIDE
            )));
        }

        dims = (
            dims.0.max(right.ceil() as u32),
            dims.1.max(bottom.ceil() as u32),
        );
    }

    Ok(dims)
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);

    let in_file_name = args
        .next()
        .ok_or_else(|| Error::InvalidRequest("expected detections file name".into()))?;
    let out_file_name = args
        .next()
        .ok_or_else(|| Error::InvalidRequest("expected output file name".into()))?;

    let config = match args.next() {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    let dets_file = std::fs::File::open(&in_file_name)?;

    let mut dump = BTreeMap::new();
    for line in std::io::BufReader::new(dets_file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        if let Some((index, detections)) = parse_line(&line) {
            dump.insert(index, detections);
        }
    }

    let frame_count = dump.keys().next_back().map_or(0, |&i| i + 1);
    let dims = frame_dims(&dump)?;

    info!(frames = frame_count, ?dims, "detections loaded");

    let detector = move |frame: &Frame| -> annotrack::Result<Vec<Detection>> {
        Ok(dump.get(&frame.index).cloned().unwrap_or_default())
    };

    let mut session = Session::new(BlankVideo::new(frame_count, dims), detector, config)?;
    session.precompute(&AtomicBool::new(false));

    for record in session.store().iter() {
        for t in &record.tracks {
            let [l, top, r, b] = t.bbox.as_slice();
            println!(
                "{} {} {} {} {} {} {}",
                record.frame_index, t.id, t.class, l, top, r, b
            );
        }
    }

    session.export(&out_file_name)?;

    Ok(())
}
