mod common;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use annotrack::bbox::BBox;
use annotrack::manual::{EditRequest, ManualBoxRequest};
use annotrack::{
    ClassFilter, Config, Detector, Error, Frame, Lifetime, Origin, Result, Session, VideoSource,
};
use common::{Script, ScriptedVideo};

#[test]
fn car_keeps_its_id() {
    let detector = Script::new()
        .at(0, "car", 0.9, [10., 10., 50., 50.])
        .at(1, "car", 0.9, [12., 11., 52., 49.])
        .detector();

    let mut session = Session::new(ScriptedVideo::new(2), detector, Config::default()).unwrap();
    session.advance().unwrap();
    let record = session.advance().unwrap().unwrap().clone();

    assert_eq!(record.frame_index, 1);
    assert_eq!(record.len(), 1);

    let car = &record.tracks[0];
    assert_eq!(car.id, 1);
    assert_eq!(car.class, "car");
    assert_eq!(car.origin, Origin::Automatic);
    assert_eq!(car.bbox.as_slice(), &[12., 11., 52., 49.]);
}

#[test]
fn manual_box_lives_for_its_lifetime() {
    let mut session = Session::new(
        ScriptedVideo::new(10),
        Script::new().detector(),
        Config::default(),
    )
    .unwrap();

    session.seek(5).unwrap();
    let person = session
        .add_box(ManualBoxRequest::new(
            "person",
            BBox::ltrb(0., 0., 30., 30.),
            3,
        ))
        .unwrap();

    session.precompute(&AtomicBool::new(false));
    let store = session.store();

    for (frame, remaining) in [(5, 3), (6, 2), (7, 1)] {
        let t = store.get(frame).unwrap().get(person.id).unwrap();
        assert_eq!(t.remaining_lifetime, Lifetime::Frames(remaining));
        assert_eq!(t.origin, Origin::Manual);
    }

    for frame in [4, 8, 9] {
        assert!(store.get(frame).unwrap().get(person.id).is_none());
    }
}

#[test]
fn ids_are_unique_and_frames_contiguous() {
    let detector = Script::new()
        .moving(0..6, "car", [10., 10., 50., 50.], 2.)
        .moving(2..8, "person", [100., 20., 120., 80.], -1.)
        .at(4, "dog", 0.8, [150., 50., 190., 90.])
        .failing(6)
        .detector();

    let mut session = Session::new(ScriptedVideo::new(10), detector, Config::default()).unwrap();
    session.precompute(&AtomicBool::new(false));
    session.seek(3).unwrap();
    session
        .add_box(ManualBoxRequest::new("sign", BBox::ltrb(60., 0., 80., 20.), 4))
        .unwrap();

    let mut seen = HashSet::new();
    for (expected, record) in session.store().iter().enumerate() {
        assert_eq!(record.frame_index, expected);

        let ids: HashSet<u32> = record.iter().map(|t| t.id).collect();
        assert_eq!(ids.len(), record.len());

        seen.extend(ids);
    }

    assert!(seen.iter().all(|&id| id < session.store().next_id()));
    assert_eq!(session.store().len(), 10);
}

#[test]
fn association_is_deterministic() {
    let script = Script::new()
        .moving(0..5, "car", [10., 10., 50., 50.], 3.)
        .moving(0..5, "car", [30., 10., 70., 50.], -3.)
        .moving(1..4, "person", [120., 10., 140., 60.], 0.);

    let run = || {
        let mut session =
            Session::new(ScriptedVideo::new(5), script.clone().detector(), Config::default())
                .unwrap();
        session.precompute(&AtomicBool::new(false));
        session
    };

    let (a, b) = (run(), run());
    assert_eq!(a.store(), b.store());
    assert_eq!(a.export_string().unwrap(), b.export_string().unwrap());
}

#[test]
fn filter_is_a_view() {
    let detector = Script::new()
        .at(0, "car", 0.9, [10., 10., 50., 50.])
        .at(0, "person", 0.9, [100., 10., 130., 90.])
        .detector();

    let mut session = Session::new(ScriptedVideo::new(1), detector, Config::default()).unwrap();
    session.advance().unwrap();

    session.set_filter(ClassFilter::only(["person"]));
    let visible = session.visible_tracks();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].class, "person");
    assert_eq!(session.filter().apply(&visible), visible);

    assert_eq!(session.store().get(0).unwrap().len(), 2);

    session.clear_filter();
    assert_eq!(session.visible_tracks().len(), 2);
}

#[test]
fn detection_failure_yields_empty_frame() {
    let detector = Script::new()
        .at(0, "car", 0.9, [10., 10., 50., 50.])
        .failing(1)
        .at(2, "car", 0.9, [10., 10., 50., 50.])
        .detector();

    let mut video = ScriptedVideo::new(5);
    video.broken.insert(3);

    let mut session = Session::new(video, detector, Config::default()).unwrap();
    assert_eq!(session.precompute(&AtomicBool::new(false)), 5);

    let store = session.store();
    assert!(store.get(1).unwrap().is_empty());
    assert!(store.get(3).unwrap().is_empty());

    // the car went missing for a frame and comes back as a new track
    assert_eq!(store.get(0).unwrap().tracks[0].id, 1);
    assert_eq!(store.get(2).unwrap().tracks[0].id, 2);
}

#[test]
fn precompute_stops_when_cancelled() {
    let cancel = AtomicBool::new(false);
    let detector = |frame: &Frame| -> Result<Vec<annotrack::Detection>> {
        if frame.index == 2 {
            cancel.store(true, Ordering::Relaxed);
        }
        Ok(Vec::new())
    };

    let mut session = Session::new(ScriptedVideo::new(10), detector, Config::default()).unwrap();

    assert_eq!(session.precompute(&cancel), 3);
    assert!(!session.is_complete());

    cancel.store(false, Ordering::Relaxed);
    assert_eq!(session.precompute(&cancel), 10);
    assert!(session.is_complete());
}

#[test]
fn reprocess_recomputes_later_frames() {
    let detector = Script::new()
        .moving(0..6, "car", [10., 10., 50., 50.], 1.)
        .detector();

    let mut session = Session::new(ScriptedVideo::new(6), detector, Config::default()).unwrap();
    session.seek(4).unwrap();
    let next_id = session.store().next_id();

    session.reprocess_from(2);
    assert_eq!(session.store().len(), 2);
    assert_eq!(session.current_frame(), Some(1));

    let record = session.advance().unwrap().unwrap();
    assert_eq!(record.frame_index, 2);
    assert_eq!(record.tracks[0].id, 1);
    assert_eq!(session.store().next_id(), next_id);
}

#[test]
fn manual_and_automatic_boxes_coexist() {
    let detector = Script::new()
        .moving(0..4, "car", [10., 10., 50., 50.], 0.)
        .detector();

    let mut session = Session::new(ScriptedVideo::new(4), detector, Config::default()).unwrap();
    session.advance().unwrap();
    let manual = session
        .add_box(ManualBoxRequest::new("car", BBox::ltrb(10., 10., 50., 50.), 10))
        .unwrap();

    session.precompute(&AtomicBool::new(false));

    for record in session.store().iter() {
        assert_eq!(record.len(), 2);
        assert_eq!(record.get(1).unwrap().origin, Origin::Automatic);
        assert_eq!(record.get(manual.id).unwrap().origin, Origin::Manual);
    }
}

#[test]
fn edit_convert_remove_restore() {
    let detector = Script::new()
        .moving(0..6, "car", [10., 10., 50., 50.], 0.)
        .detector();

    let mut session = Session::new(ScriptedVideo::new(6), detector, Config::default()).unwrap();
    session.precompute(&AtomicBool::new(false));

    assert!(matches!(
        session.edit_box(1, 2, EditRequest::class("truck")),
        Err(Error::OriginMismatch { id: 1, frame: 2, .. })
    ));

    let converted = session
        .convert_box(1, 2, EditRequest::class("truck").with_lifetime(2))
        .unwrap();
    assert_eq!(converted.id, 1);
    assert_eq!(converted.origin, Origin::Manual);

    let store = session.store();
    assert_eq!(store.get(1).unwrap().get(1).unwrap().class, "car");
    assert_eq!(store.get(2).unwrap().get(1).unwrap().class, "truck");
    assert_eq!(store.get(3).unwrap().get(1).unwrap().class, "truck");
    assert!(store.get(4).unwrap().get(1).is_none());

    session.remove_box(1, 3).unwrap();
    assert!(session.store().get(3).unwrap().get(1).is_none());
    assert!(session.store().get(2).unwrap().get(1).is_some());

    let restored = session.restore_box(1, 3).unwrap();
    assert_eq!(restored.class, "truck");
    assert!(session.store().get(3).unwrap().get(1).is_some());

    assert!(matches!(
        session.restore_box(1, 3),
        Err(Error::NotFound { id: 1, frame: 3 })
    ));
}

#[test]
fn rejected_requests_leave_store_untouched() {
    let mut session = Session::new(
        ScriptedVideo::new(3),
        Script::new().moving(0..3, "car", [10., 10., 50., 50.], 0.).detector(),
        Config::default(),
    )
    .unwrap();
    session.seek(1).unwrap();
    let before = session.store().clone();

    for request in [
        ManualBoxRequest::new("car", BBox::ltrb(10., 10., 10., 40.), 2),
        ManualBoxRequest::new("car", BBox::ltrb(10., 10., 300., 40.), 2),
        ManualBoxRequest::new("car", BBox::ltrb(10., 10., 30., 40.), 0),
    ] {
        assert!(matches!(
            session.add_box(request),
            Err(Error::InvalidRequest(_))
        ));
    }

    assert!(matches!(
        session.remove_box(7, 1),
        Err(Error::NotFound { id: 7, frame: 1 })
    ));
    assert!(matches!(session.seek(3), Err(Error::InvalidRequest(_))));
    assert!(session.set_confidence_threshold(1.5).is_err());

    assert_eq!(session.store(), &before);
    assert_eq!(session.current_frame(), Some(1));
}

#[test]
fn restore_after_reprocess_does_not_duplicate() {
    let script = Script::new().moving(0..6, "car", [10., 10., 50., 50.], 0.);
    let mut session =
        Session::new(ScriptedVideo::new(6), script.detector(), Config::default()).unwrap();
    session.precompute(&AtomicBool::new(false));

    session.remove_box(1, 0).unwrap();
    session.reprocess_from(0);
    session.precompute(&AtomicBool::new(false));

    assert!(matches!(
        session.restore_box(1, 0),
        Err(Error::NotFound { id: 1, frame: 0 })
    ));

    for record in session.store().iter() {
        assert_eq!(record.len(), 1);
        assert!(record.get(1).is_none());
    }
}

fn ids_per_frame<V: VideoSource, D: Detector>(session: &Session<V, D>) -> Vec<Vec<(u32, Origin, String)>> {
    session
        .store()
        .iter()
        .map(|r| {
            let mut ids: Vec<_> = r.iter().map(|t| (t.id, t.origin, t.class.clone())).collect();
            ids.sort_by_key(|e| e.0);
            ids
        })
        .collect()
}

#[test]
fn convert_gives_same_timeline_eager_or_lazy() {
    let script = Script::new().moving(0..6, "car", [10., 10., 50., 50.], 1.);
    let edit = EditRequest::class("truck").with_lifetime(2);

    let mut eager =
        Session::new(ScriptedVideo::new(6), script.clone().detector(), Config::default()).unwrap();
    eager.precompute(&AtomicBool::new(false));
    eager.convert_box(1, 2, edit.clone()).unwrap();

    let mut lazy =
        Session::new(ScriptedVideo::new(6), script.detector(), Config::default()).unwrap();
    lazy.seek(2).unwrap();
    lazy.convert_box(1, 2, edit).unwrap();
    lazy.precompute(&AtomicBool::new(false));

    let timeline = ids_per_frame(&eager);
    assert_eq!(timeline, ids_per_frame(&lazy));

    let counts: Vec<_> = timeline.iter().map(Vec::len).collect();
    assert_eq!(counts, vec![1, 1, 1, 2, 1, 1]);
    assert!(timeline[5]
        .iter()
        .all(|(id, origin, _)| *id == 2 && *origin == Origin::Automatic));
}
