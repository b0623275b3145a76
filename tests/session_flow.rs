use anyhow::Result;
use regex::Regex;

use watchcam::{
    CameraConfig, CameraSource, Detection, DetectionSession, PollOutcome, SessionState,
    SnapshotStore, StubBackend, GRAB_FAILURE_NOTICE,
};

fn camera(device: &str) -> Result<CameraSource> {
    CameraSource::new(CameraConfig {
        device: device.to_string(),
        width: 160,
        height: 120,
    })
}

fn session_with(
    device: &str,
    script: Vec<Vec<Detection>>,
) -> Result<(DetectionSession, tempfile::TempDir)> {
    let dir = tempfile::tempdir()?;
    let store = SnapshotStore::open(dir.path())?;
    let backend = StubBackend::with_script(script);
    Ok((
        DetectionSession::new(camera(device)?, Box::new(backend), store),
        dir,
    ))
}

#[test]
fn frame_without_person_saves_nothing() -> Result<()> {
    let (mut session, dir) = session_with("stub://cam", vec![vec![]])?;
    session.start()?;

    let outcome = session.poll()?;
    assert_eq!(
        outcome,
        PollOutcome::Processed {
            persons: 0,
            saved: None
        }
    );

    assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
    let notice = session.notice().unwrap_or("");
    assert!(!notice.contains("Person detected"));
    Ok(())
}

#[test]
fn frame_with_person_saves_exactly_one_snapshot() -> Result<()> {
    let script = vec![vec![Detection::person(10.0, 10.0, 50.0, 120.0, 0.9)]];
    let (mut session, dir) = session_with("stub://cam", script)?;
    session.start()?;

    let before = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
    let outcome = session.poll()?;
    let after = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();

    let PollOutcome::Processed { persons, saved } = outcome else {
        panic!("expected a processed frame");
    };
    assert_eq!(persons, 1);
    let name = saved.expect("snapshot saved");

    let pattern = Regex::new(r"^person_detected_\d{8}_\d{6}\.jpg$")?;
    assert!(pattern.is_match(&name), "bad snapshot name {name}");

    // Timestamp component equals the wall-clock second at save time.
    let ts = &name["person_detected_".len()..name.len() - ".jpg".len()];
    assert!(
        ts >= before.as_str() && ts <= after.as_str(),
        "timestamp {ts} outside [{before}, {after}]"
    );

    assert_eq!(std::fs::read_dir(dir.path())?.count(), 1);
    assert!(dir.path().join(&name).exists());
    assert_eq!(
        session.notice(),
        Some(format!("Person detected! Image saved as {name}").as_str())
    );
    Ok(())
}

#[test]
fn non_person_detections_do_not_trigger_saves() -> Result<()> {
    // COCO class 16 is "dog".
    let script = vec![vec![Detection::new(5.0, 5.0, 60.0, 60.0, 0.95, 16)]];
    let (mut session, dir) = session_with("stub://cam", script)?;
    session.start()?;

    let outcome = session.poll()?;
    assert_eq!(
        outcome,
        PollOutcome::Processed {
            persons: 0,
            saved: None
        }
    );
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);
    Ok(())
}

#[test]
fn grab_failure_ends_session_without_saving() -> Result<()> {
    let (mut session, dir) = session_with("stub-fail://cam", vec![])?;
    session.start()?;
    assert_eq!(session.state(), SessionState::Running);

    let outcome = session.poll()?;
    assert_eq!(outcome, PollOutcome::SessionEnded);
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.notice(), Some(GRAB_FAILURE_NOTICE));
    assert_eq!(std::fs::read_dir(dir.path())?.count(), 0);

    // The device was released; polling again is a no-op until restarted.
    assert_eq!(session.poll()?, PollOutcome::Idle);
    Ok(())
}

#[test]
fn single_person_scenario_end_to_end() -> Result<()> {
    let script = vec![vec![Detection::person(10.0, 10.0, 50.0, 120.0, 0.9)], vec![]];
    let (mut session, _dir) = session_with("stub://cam", script)?;

    assert!(session.store().list()?.is_empty());

    session.start()?;
    let PollOutcome::Processed { saved, .. } = session.poll()? else {
        panic!("expected a processed frame");
    };
    let name = saved.expect("snapshot saved");
    session.stop();

    let sidebar = session.store().recent(watchcam::SIDEBAR_LIMIT)?;
    assert_eq!(sidebar, vec![name]);
    assert_eq!(watchcam::gallery_column(0), 0);
    Ok(())
}

#[test]
fn stopped_session_can_be_restarted() -> Result<()> {
    let script = vec![vec![], vec![]];
    let (mut session, _dir) = session_with("stub://cam", script)?;

    session.start()?;
    assert!(matches!(session.poll()?, PollOutcome::Processed { .. }));
    session.stop();
    assert_eq!(session.poll()?, PollOutcome::Idle);

    session.start()?;
    assert!(matches!(session.poll()?, PollOutcome::Processed { .. }));
    Ok(())
}
