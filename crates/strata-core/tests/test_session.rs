mod common;

use common::{dummy_keyframe, rig, rig_with_sensor};
use nalgebra::Matrix4;
use strata_core::error::StrataError;
use strata_core::session::{
    ScanState, SessionEvent, NEED_COLOR_CAMERA_ACCESS_MESSAGE, PLEASE_CHARGE_SENSOR_MESSAGE,
    PLEASE_CONNECT_SENSOR_MESSAGE,
};
use strata_core::sim::{SimSensor, box_mesh};
use strata_core::slam::SensorStatus;
use strata_core::volume::VolumeSize;

#[test]
fn test_starts_in_cube_placement() {
    let r = rig();
    assert_eq!(r.session.state(), ScanState::CubePlacement);
    assert!(r.session.current_state_needs_sensor());
}

#[test]
fn test_enter_scanning_rejected_without_valid_pose() {
    let mut r = rig();
    assert!(!r.session.enter_scanning());
    assert_eq!(r.session.state(), ScanState::CubePlacement);
    assert!(!r.sensor.is_exposure_locked());
}

#[test]
fn test_enter_scanning_with_valid_pose() {
    let mut r = rig();
    r.session.app_did_become_active();
    r.factory.set_pose(true, Matrix4::identity());

    assert!(r.session.enter_scanning());
    assert_eq!(r.session.state(), ScanState::Scanning);
    // Exposure is locked for consistent coloring during the scan.
    assert!(r.sensor.is_exposure_locked());
    // Option toggles are frozen for the duration.
    assert!(!r.session.dynamic_options().any_switch_enabled());
}

#[test]
fn test_enter_scanning_rejected_outside_cube_placement() {
    let mut r = rig();
    r.factory.set_pose(true, Matrix4::identity());
    assert!(r.session.enter_scanning());
    // Already scanning; a second request must not restart anything.
    assert!(!r.session.enter_scanning());
}

#[test]
fn test_enter_viewing_finalizes_mesh_and_stops_sensor() {
    let mut r = rig();
    r.session.app_did_become_active();
    r.factory.set_pose(true, Matrix4::identity());
    assert!(r.session.enter_scanning());

    r.session.enter_viewing().unwrap();
    assert_eq!(r.session.state(), ScanState::Viewing);
    assert!(!r.sensor.is_streaming());
    assert!(!r.sensor.is_color_capturing());
    assert!(!r.session.current_state_needs_sensor());

    let events = r.session.pump();
    let mesh = events.iter().find_map(|e| match e {
        SessionEvent::MeshReady { mesh, .. } => Some(mesh),
        _ => None,
    });
    let mesh = mesh.expect("viewing should deliver the finalized mesh");
    assert_eq!(mesh.num_vertices(), 8);
    assert_eq!(mesh.num_faces(), 12);
}

#[test]
fn test_enter_viewing_invalid_from_cube_placement() {
    let mut r = rig();
    let err = r.session.enter_viewing().unwrap_err();
    assert!(matches!(err, StrataError::InvalidTransition { .. }));
    assert_eq!(r.session.state(), ScanState::CubePlacement);
}

#[test]
fn test_options_locked_while_scanning() {
    let mut r = rig();
    r.factory.set_pose(true, Matrix4::identity());
    assert!(r.session.enter_scanning());

    let options = r.session.dynamic_options();
    let err = r.session.on_options_changed(options).unwrap_err();
    assert!(matches!(err, StrataError::OptionsLockedWhileScanning));
    assert_eq!(r.session.state(), ScanState::Scanning);
}

#[test]
fn test_options_change_rebuilds_and_restores_volume() {
    let mut r = rig();
    r.session.adjust_volume_size(VolumeSize::cube(1.25));

    let mut options = r.session.dynamic_options();
    options.new_mapper_is_on = !options.new_mapper_is_on;
    r.session.on_options_changed(options).unwrap();

    assert_eq!(r.session.state(), ScanState::CubePlacement);
    assert_eq!(r.session.volume_size(), VolumeSize::cube(1.25));
    assert_eq!(
        r.session.dynamic_options().new_mapper_is_on,
        options.new_mapper_is_on
    );
}

#[test]
fn test_adjust_volume_size_clamps() {
    let mut r = rig();
    r.session.adjust_volume_size(VolumeSize::cube(50.0));
    assert_eq!(r.session.volume_size(), VolumeSize::cube(3.0));

    r.session.adjust_volume_size(VolumeSize::new(f32::NAN, 0.5, 0.0));
    let v = r.session.volume_size();
    assert_eq!(v.x, 0.1);
    assert_eq!(v.y, 0.5);
    assert_eq!(v.z, 0.1);
}

#[test]
fn test_pinch_scales_volume_from_initial_size() {
    let mut r = rig();
    r.session.pinch_began(1.0);
    r.session.pinch_changed(2.0);
    // Default initial volume is a 0.5 m cube.
    assert_eq!(r.session.volume_size(), VolumeSize::cube(1.0));
}

#[test]
fn test_pinch_ignored_outside_cube_placement() {
    let mut r = rig();
    r.factory.set_pose(true, Matrix4::identity());
    assert!(r.session.enter_scanning());
    let before = r.session.volume_size();

    r.session.pinch_began(1.0);
    r.session.pinch_changed(3.0);
    assert_eq!(r.session.volume_size(), before);
}

#[test]
fn test_suspend_mid_scan_forces_reset() {
    let mut r = rig();
    r.session.app_did_become_active();
    r.factory.set_pose(true, Matrix4::identity());
    assert!(r.session.enter_scanning());

    let connects_before = r.sensor.connect_calls();
    r.session.app_did_become_active();
    assert_eq!(r.session.state(), ScanState::CubePlacement);
    assert!(r.sensor.connect_calls() > connects_before);
    // The abandoned scan left nothing behind.
    assert_eq!(r.session.keyframe_count(), 0);
}

#[test]
fn test_status_message_reflects_sensor_health() {
    let mut r = rig_with_sensor(SimSensor::with_status(SensorStatus::NeedsConnect));
    let events = r.session.pump();
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::StatusMessage { message: Some(m) } if m == PLEASE_CONNECT_SENSOR_MESSAGE
    )));

    r.sensor.set_status(SensorStatus::NeedsCharge);
    r.session.update_app_status_message();
    let events = r.session.pump();
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::StatusMessage { message: Some(m) } if m == PLEASE_CHARGE_SENSOR_MESSAGE
    )));
}

#[test]
fn test_sensor_issues_outrank_camera_permission() {
    let mut r = rig_with_sensor(SimSensor::with_status(SensorStatus::NeedsConnect));
    r.session.set_color_camera_authorized(false);
    let events = r.session.pump();
    // The sensor problem wins while both apply.
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::StatusMessage { message: Some(m) } if m == PLEASE_CONNECT_SENSOR_MESSAGE
    )));

    r.sensor.set_status(SensorStatus::Ok);
    r.session.update_app_status_message();
    let events = r.session.pump();
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::StatusMessage { message: Some(m) } if m == NEED_COLOR_CAMERA_ACCESS_MESSAGE
    )));

    r.session.set_color_camera_authorized(true);
    let events = r.session.pump();
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::StatusMessage { message: None })));
}

#[test]
fn test_status_message_suppressed_while_viewing() {
    let mut r = rig();
    r.session.app_did_become_active();
    r.sensor.set_status(SensorStatus::NeedsCharge);
    r.session.update_app_status_message();
    r.session.pump();

    r.factory.set_pose(true, Matrix4::identity());
    // Status reset on set_status; re-mark healthy so the scan can start.
    r.sensor.set_status(SensorStatus::Ok);
    r.session.update_app_status_message();
    assert!(r.session.enter_scanning());
    r.sensor.set_status(SensorStatus::NeedsCharge);
    r.session.enter_viewing().unwrap();

    let events = r.session.pump();
    // Viewing disables the persistent message even with an unhealthy sensor.
    assert!(events
        .iter()
        .all(|e| !matches!(e, SessionEvent::StatusMessage { message: Some(_) })));
}

#[test]
fn test_idle_sleep_suppressed_only_with_active_sensor() {
    let mut r = rig();
    assert!(r.session.is_idle_sleep_suppressed());

    r.sensor.set_status(SensorStatus::NeedsConnect);
    assert!(!r.session.is_idle_sleep_suppressed());

    r.sensor.set_status(SensorStatus::Ok);
    r.factory.set_pose(true, Matrix4::identity());
    assert!(r.session.enter_scanning());
    r.session.enter_viewing().unwrap();
    // Viewing does not consume sensor data.
    assert!(!r.session.is_idle_sleep_suppressed());
}

#[test]
fn test_keyframes_capped_at_maximum() {
    let mut r = rig();
    r.factory.set_pose(true, Matrix4::identity());
    assert!(r.session.enter_scanning());

    for _ in 0..60 {
        r.session.record_keyframe(dummy_keyframe());
    }
    assert_eq!(r.session.keyframe_count(), 48);
}

#[test]
fn test_keyframes_ignored_outside_scanning() {
    let mut r = rig();
    r.session.record_keyframe(dummy_keyframe());
    assert_eq!(r.session.keyframe_count(), 0);
}

#[test]
fn test_colorize_two_phase_ordering() {
    let mut r = rig();
    r.factory.set_pose(true, Matrix4::identity());
    assert!(r.session.enter_scanning());
    for _ in 0..4 {
        r.session.record_keyframe(dummy_keyframe());
    }
    r.session.enter_viewing().unwrap();
    r.session.pump();

    assert!(r.session.request_colorize(box_mesh(VolumeSize::cube(0.5))));
    let events = r.session.pump();

    let mut progress = Vec::new();
    let mut order = Vec::new();
    for event in &events {
        match event {
            SessionEvent::ColorizeProgress { combined } => progress.push(*combined),
            SessionEvent::ColorizePreviewReady { mesh } => {
                assert!(mesh.has_per_vertex_colors());
                order.push("preview");
            }
            SessionEvent::ColorizeEnhancedStarted => order.push("enhanced-started"),
            SessionEvent::ColorizeEnhancedReady { mesh } => {
                assert!(mesh.has_per_vertex_colors());
                assert!(mesh.has_per_vertex_uv_texture_coords());
                order.push("enhanced-ready");
            }
            SessionEvent::ColorizeFailed { .. } => panic!("colorize should not fail"),
            _ => {}
        }
    }
    assert_eq!(order, vec!["preview", "enhanced-started", "enhanced-ready"]);
    // Preview covers 0-20 on the combined scale, enhanced 20-100.
    assert_eq!(progress, vec![10.0, 20.0, 60.0, 100.0]);
    // Enhanced start frees the keyframes.
    assert_eq!(r.session.keyframe_count(), 0);
}

#[test]
fn test_request_colorize_rejected_while_busy() {
    let mut r = rig();
    r.factory.set_pose(true, Matrix4::identity());
    assert!(r.session.enter_scanning());
    r.session.enter_viewing().unwrap();
    r.session.pump();

    let mesh = box_mesh(VolumeSize::cube(0.5));
    assert!(r.session.request_colorize(mesh.clone()));
    // Tasks have completed but are not yet drained; still counts as busy.
    assert!(!r.session.request_colorize(mesh));
}

#[test]
fn test_tracking_lost_only_reported_while_scanning() {
    let mut r = rig();
    r.session.report_tracking_lost("too fast");
    assert!(r
        .session
        .pump()
        .iter()
        .all(|e| !matches!(e, SessionEvent::TrackingLost { .. })));

    r.factory.set_pose(true, Matrix4::identity());
    assert!(r.session.enter_scanning());
    r.session.report_tracking_lost("too fast");
    assert!(r
        .session
        .pump()
        .iter()
        .any(|e| matches!(e, SessionEvent::TrackingLost { .. })));
}

#[test]
fn test_high_res_switch_follows_sensor_support() {
    let sensor = SimSensor::healthy();
    sensor.set_high_res_color(true);
    let mut r = rig_with_sensor(sensor);
    assert!(r.session.dynamic_options().high_res_coloring);
    assert!(r.session.dynamic_options().high_res_coloring_switch_enabled);

    r.factory.set_pose(true, Matrix4::identity());
    assert!(r.session.enter_scanning());
    assert!(!r.session.dynamic_options().high_res_coloring_switch_enabled);

    // Reset returns to cube placement and unfreezes the toggles.
    r.session.reset();
    assert_eq!(r.session.state(), ScanState::CubePlacement);
    assert!(r.session.dynamic_options().high_res_coloring_switch_enabled);
}

#[test]
fn test_viewer_dismissal_restarts_session() {
    let mut r = rig();
    r.session.app_did_become_active();
    r.factory.set_pose(true, Matrix4::identity());
    assert!(r.session.enter_scanning());
    r.session.enter_viewing().unwrap();
    assert!(!r.sensor.is_streaming());

    r.session.viewer_will_dismiss();
    r.session.viewer_did_dismiss();
    assert_eq!(r.session.state(), ScanState::CubePlacement);
    assert!(r.sensor.is_streaming());
    assert!(!r.session.colorize_in_flight());
}
