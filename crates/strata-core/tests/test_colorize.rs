mod common;

use std::sync::Arc;

use common::{dummy_keyframe, ManualColorizer};
use strata_core::colorize::{
    combined_progress, ColorizationPipeline, ColorizeEvent, ColorizeKind, ColorizeOptions,
};
use strata_core::sim::box_mesh;
use strata_core::volume::VolumeSize;

fn pipeline_with(colorizer: &ManualColorizer) -> ColorizationPipeline {
    ColorizationPipeline::new(Arc::new(colorizer.clone()), ColorizeOptions::default())
}

#[test]
fn test_combined_progress_mapping() {
    assert_eq!(combined_progress(ColorizeKind::Preview, 0.0), 0.0);
    assert_eq!(combined_progress(ColorizeKind::Preview, 0.5), 10.0);
    assert_eq!(combined_progress(ColorizeKind::Preview, 1.0), 20.0);
    assert_eq!(combined_progress(ColorizeKind::Enhanced, 0.0), 20.0);
    assert_eq!(combined_progress(ColorizeKind::Enhanced, 0.5), 60.0);
    assert_eq!(combined_progress(ColorizeKind::Enhanced, 1.0), 100.0);
}

#[test]
fn test_enhanced_starts_only_after_preview_success() {
    let colorizer = ManualColorizer::new();
    let mut pipeline = pipeline_with(&colorizer);

    assert!(pipeline.request_colorize(box_mesh(VolumeSize::cube(0.5)), vec![dummy_keyframe()]));
    assert_eq!(colorizer.pending_count(), 1);
    assert!(pipeline.is_busy());
    assert!(!pipeline.enhanced_in_flight());

    let (kind, sender) = colorizer.take_task().unwrap();
    assert_eq!(kind, ColorizeKind::Preview);
    sender.finish(Ok(box_mesh(VolumeSize::cube(0.5))));

    let events = pipeline.poll();
    assert!(events
        .iter()
        .any(|e| matches!(e, ColorizeEvent::PreviewReady { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, ColorizeEvent::EnhancedStarted)));
    assert!(pipeline.enhanced_in_flight());

    let (kind, sender) = colorizer.take_task().unwrap();
    assert_eq!(kind, ColorizeKind::Enhanced);
    sender.finish(Ok(box_mesh(VolumeSize::cube(0.5))));

    let events = pipeline.poll();
    assert!(events
        .iter()
        .any(|e| matches!(e, ColorizeEvent::EnhancedReady { .. })));
    assert!(!pipeline.is_busy());
}

#[test]
fn test_preview_failure_stops_the_workflow() {
    let colorizer = ManualColorizer::new();
    let mut pipeline = pipeline_with(&colorizer);

    assert!(pipeline.request_colorize(box_mesh(VolumeSize::cube(0.5)), vec![]));
    let (_, sender) = colorizer.take_task().unwrap();
    sender.finish(Err("out of memory".into()));

    let events = pipeline.poll();
    assert!(events.iter().any(|e| matches!(
        e,
        ColorizeEvent::Failed { kind: ColorizeKind::Preview, .. }
    )));
    // No enhanced task was launched and the pipeline is free again.
    assert_eq!(colorizer.pending_count(), 0);
    assert!(!pipeline.is_busy());
}

#[test]
fn test_request_rejected_while_busy() {
    let colorizer = ManualColorizer::new();
    let mut pipeline = pipeline_with(&colorizer);

    let mesh = box_mesh(VolumeSize::cube(0.5));
    assert!(pipeline.request_colorize(mesh.clone(), vec![]));
    assert!(!pipeline.request_colorize(mesh, vec![]));
    // The refused request did not spawn a second task.
    assert_eq!(colorizer.pending_count(), 1);
}

#[test]
fn test_cancel_all_with_nothing_running_is_a_noop() {
    let colorizer = ManualColorizer::new();
    let mut pipeline = pipeline_with(&colorizer);

    pipeline.cancel_all();
    pipeline.cancel_all();
    assert!(!pipeline.is_busy());
    // Still usable afterwards.
    assert!(pipeline.request_colorize(box_mesh(VolumeSize::cube(0.5)), vec![]));
}

#[test]
fn test_no_events_after_cancel() {
    let colorizer = ManualColorizer::new();
    let mut pipeline = pipeline_with(&colorizer);

    assert!(pipeline.request_colorize(box_mesh(VolumeSize::cube(0.5)), vec![]));
    let (_, sender) = colorizer.take_task().unwrap();

    pipeline.cancel_all();
    assert!(sender.is_cancelled());

    // A worker that raced the cancellation delivers nothing.
    sender.progress(0.7);
    sender.finish(Ok(box_mesh(VolumeSize::cube(0.5))));
    assert!(pipeline.poll().is_empty());
    assert!(!pipeline.is_busy());
}

#[test]
fn test_cancel_enhanced_keeps_preview_result() {
    let colorizer = ManualColorizer::new();
    let mut pipeline = pipeline_with(&colorizer);

    assert!(pipeline.request_colorize(box_mesh(VolumeSize::cube(0.5)), vec![]));
    let (_, sender) = colorizer.take_task().unwrap();
    sender.finish(Ok(box_mesh(VolumeSize::cube(0.5))));
    let events = pipeline.poll();
    assert!(events
        .iter()
        .any(|e| matches!(e, ColorizeEvent::PreviewReady { .. })));

    pipeline.cancel_enhanced();
    assert!(!pipeline.enhanced_in_flight());
    assert!(!pipeline.is_busy());

    // The cancelled enhanced worker cannot report back.
    let (_, sender) = colorizer.take_task().unwrap();
    sender.finish(Ok(box_mesh(VolumeSize::cube(0.5))));
    assert!(pipeline.poll().is_empty());
}
