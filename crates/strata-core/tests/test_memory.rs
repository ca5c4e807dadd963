mod common;

use std::sync::Arc;

use common::{rig, rig_with_colorizer, ManualColorizer};
use nalgebra::Matrix4;
use strata_core::memory::{
    MemoryPressureGuard, MEMORY_COLORIZE_CANCELED_MESSAGE, MEMORY_SCAN_STOPPED_MESSAGE,
};
use strata_core::session::{ScanState, SessionEvent};
use strata_core::sim::box_mesh;
use strata_core::volume::VolumeSize;

#[test]
fn test_guard_is_one_shot_until_acknowledged() {
    let mut guard = MemoryPressureGuard::new();
    assert!(guard.try_arm());
    assert!(guard.is_showing());
    // Further signals are dropped while the dialog is up.
    assert!(!guard.try_arm());

    guard.acknowledge();
    assert!(!guard.is_showing());
    assert!(guard.try_arm());
}

#[test]
fn test_memory_warning_in_cube_placement_is_ignored() {
    let mut r = rig();
    r.session.memory_warning();
    let events = r.session.pump();
    assert!(events
        .iter()
        .all(|e| !matches!(e, SessionEvent::MemoryWarning { .. })));
}

#[test]
fn test_memory_warning_while_scanning_stops_after_acknowledgment() {
    let mut r = rig();
    r.factory.set_pose(true, Matrix4::identity());
    assert!(r.session.enter_scanning());

    r.session.memory_warning();
    let events = r.session.pump();
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::MemoryWarning { message } if *message == MEMORY_SCAN_STOPPED_MESSAGE
    )));
    // The scan keeps running until the user has seen the dialog.
    assert_eq!(r.session.state(), ScanState::Scanning);

    // A second signal while the dialog is up adds nothing.
    r.session.memory_warning();
    assert!(r
        .session
        .pump()
        .iter()
        .all(|e| !matches!(e, SessionEvent::MemoryWarning { .. })));

    r.session.acknowledge_memory_warning();
    assert_eq!(r.session.state(), ScanState::Viewing);
}

#[test]
fn test_memory_warning_while_viewing_cancels_enhanced_only() {
    let colorizer = ManualColorizer::new();
    let mut r = rig_with_colorizer(Arc::new(colorizer.clone()));
    r.factory.set_pose(true, Matrix4::identity());
    assert!(r.session.enter_scanning());
    r.session.enter_viewing().unwrap();
    r.session.pump();

    assert!(r.session.request_colorize(box_mesh(VolumeSize::cube(0.5))));
    let (_, sender) = colorizer.take_task().unwrap();
    sender.finish(Ok(box_mesh(VolumeSize::cube(0.5))));
    let events = r.session.pump();
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::ColorizePreviewReady { .. })));

    // Enhanced is now in flight; memory pressure cancels it.
    r.session.memory_warning();
    let events = r.session.pump();
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::MemoryWarning { message } if *message == MEMORY_COLORIZE_CANCELED_MESSAGE
    )));

    // The cancelled worker finishes into the void.
    let (_, sender) = colorizer.take_task().unwrap();
    sender.finish(Ok(box_mesh(VolumeSize::cube(0.5))));
    let events = r.session.pump();
    assert!(events
        .iter()
        .all(|e| !matches!(e, SessionEvent::ColorizeEnhancedReady { .. })));
    assert!(!r.session.colorize_in_flight());
}

#[test]
fn test_memory_warning_while_viewing_without_enhanced_is_ignored() {
    let mut r = rig();
    r.factory.set_pose(true, Matrix4::identity());
    assert!(r.session.enter_scanning());
    r.session.enter_viewing().unwrap();
    r.session.pump();

    r.session.memory_warning();
    assert!(r
        .session
        .pump()
        .iter()
        .all(|e| !matches!(e, SessionEvent::MemoryWarning { .. })));
}
