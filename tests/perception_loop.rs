use anyhow::Result;

use focus_kernel::ingest::SyntheticConfig;
use focus_kernel::{
    AutofocusConfig, DecoderConfig, FocusPhase, FocusPipeline, FrameReport, FrameSource,
    InferenceBackend, LensCommand, ModelResolution, StubBackend, SyntheticCamera,
};

const FOCUS_DISTANCE: f32 = 0.6;

fn camera() -> SyntheticCamera {
    SyntheticCamera::new(SyntheticConfig {
        width: 64,
        height: 48,
        focus_distance: FOCUS_DISTANCE,
        ..SyntheticConfig::default()
    })
    .unwrap()
}

fn pipeline() -> FocusPipeline {
    FocusPipeline::new(DecoderConfig::default(), AutofocusConfig::default()).unwrap()
}

fn run(
    frames: usize,
    camera: &mut SyntheticCamera,
    backend: &mut StubBackend,
    pipe: &mut FocusPipeline,
) -> Result<Vec<FrameReport>> {
    let mut reports = Vec::with_capacity(frames);
    for _ in 0..frames {
        let frame = camera.next_frame()?;
        let output = backend.infer(&frame)?;
        reports.push(pipe.process(&frame, &output.tensor, &mut *camera)?);
    }
    Ok(reports)
}

fn lock_frame(reports: &[FrameReport]) -> Option<&FrameReport> {
    reports
        .iter()
        .find(|r| matches!(r.command, Some(LensCommand::Park(_))))
}

#[test]
fn sweep_locks_on_the_in_focus_position() -> Result<()> {
    let mut cam = camera();
    let mut backend = StubBackend::new(ModelResolution::Px160, 80);
    let mut pipe = pipeline();
    pipe.start(&mut cam)?;

    let reports = run(20, &mut cam, &mut backend, &mut pipe)?;
    let lock = lock_frame(&reports).expect("autofocus never locked");
    let Some(LensCommand::Park(best)) = lock.command else {
        unreachable!()
    };
    assert!(
        (best - FOCUS_DISTANCE).abs() < 0.05,
        "parked at {best}, expected near {FOCUS_DISTANCE}"
    );
    assert!((cam.lens_position() - best).abs() < f32::EPSILON);
    assert_eq!(cam.blur_radius(), 0);

    // Searching until the lock, holding afterwards.
    let lock_index = reports.iter().position(|r| r.is_fixed).unwrap();
    assert!(reports[..lock_index]
        .iter()
        .all(|r| r.phase == FocusPhase::Searching));
    assert!(reports[lock_index + 1..]
        .iter()
        .all(|r| r.command == Some(LensCommand::Hold)));

    // Nobody in frame, so nothing is captured even with focus locked.
    assert!(reports.iter().all(|r| !r.capture));
    assert_eq!(cam.stats().autofocus_triggers, 1);
    Ok(())
}

#[test]
fn appearing_subject_restarts_focus_and_opens_capture_gate() -> Result<()> {
    let mut cam = camera();
    let mut backend =
        StubBackend::new(ModelResolution::Px160, 80).with_subject(0, 15..u64::MAX);
    let mut pipe = pipeline();
    pipe.start(&mut cam)?;

    let before = run(14, &mut cam, &mut backend, &mut pipe)?;
    assert!(before.last().unwrap().is_fixed);
    assert!(before.iter().all(|r| !r.batch.has_trigger && !r.capture));
    assert_eq!(pipe.controller().episode(), 1);

    let appear = run(1, &mut cam, &mut backend, &mut pipe)?.remove(0);
    assert_eq!(appear.sequence, 15);
    assert!(appear.batch.has_trigger);
    assert!(appear.refocused);
    assert!(!appear.capture);
    assert_eq!(appear.command, None);
    assert_eq!(pipe.controller().episode(), 2);
    assert_eq!(cam.lens_position(), 0.0);
    assert_eq!(cam.stats().autofocus_triggers, 2);

    let after = run(20, &mut cam, &mut backend, &mut pipe)?;
    assert!(after.iter().all(|r| r.batch.has_trigger && !r.refocused));
    let lock_index = after.iter().position(|r| r.is_fixed).expect("no relock");
    assert!(after[..lock_index].iter().all(|r| !r.capture));
    assert!(after[lock_index..].iter().all(|r| r.capture));
    assert!((cam.lens_position() - FOCUS_DISTANCE).abs() < 0.05);

    let subject = &after[lock_index].batch.detections[0];
    assert_eq!(subject.class_id, 0);
    Ok(())
}

#[test]
fn malformed_tensor_is_skipped_without_moving_the_lens() -> Result<()> {
    let mut cam = camera();
    let mut pipe = pipeline();
    pipe.start(&mut cam)?;
    let moves = cam.stats().lens_moves;

    let frame = cam.next_frame()?;
    assert!(pipe.process(&frame, &[0.0; 32], &mut cam).is_err());
    assert_eq!(cam.stats().lens_moves, moves);
    assert_eq!(pipe.controller().phase(), FocusPhase::Searching);
    Ok(())
}
