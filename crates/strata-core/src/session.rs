//! The scan-session state machine.
//!
//! Owns the sensor/tracker/mapper lifecycle across the CubePlacement ->
//! Scanning -> Viewing states, rebuilds the pipeline when dynamic options
//! change, and degrades under memory pressure. Everything here runs on the
//! UI-affinity thread; background work comes back through the colorization
//! pipeline's completion queue, drained by [`ScanSessionController::pump`].

use std::collections::VecDeque;
use std::sync::Arc;

use nalgebra::{Point3, Vector3};
use tracing::{info, warn};

use crate::colorize::{ColorizationPipeline, ColorizeEvent, ColorizeKind, ColorizeOptions, Colorizer};
use crate::error::{Result, StrataError};
use crate::memory::{
    MemoryAction, MemoryPressureGuard, MEMORY_COLORIZE_CANCELED_MESSAGE,
    MEMORY_SCAN_STOPPED_MESSAGE,
};
use crate::mesh::Mesh;
use crate::options::{DynamicOptions, FixedOptions};
use crate::slam::{
    CubeRenderer, Keyframe, KeyframeManager, Mapper, MotionSample, PoseInitializer, Scene,
    SensorStatus, SensorStream, SlamFactory, Tracker,
};
use crate::volume::{PinchScaleState, VolumeSize};

pub const PLEASE_CONNECT_SENSOR_MESSAGE: &str = "Please connect the depth sensor.";
pub const PLEASE_CHARGE_SENSOR_MESSAGE: &str = "Please charge the depth sensor.";
pub const NEED_COLOR_CAMERA_ACCESS_MESSAGE: &str =
    "Camera access is required to capture color. Allow access in the system privacy settings.";

/// Number of vertices sampled when estimating the mesh center for the viewer.
const MESH_CENTER_SAMPLE_TARGET: usize = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanState {
    /// Defining the volume to scan.
    CubePlacement,
    /// Accumulating tracked frames into the volume.
    Scanning,
    /// Visualizing the finalized mesh.
    Viewing,
}

impl ScanState {
    pub fn name(self) -> &'static str {
        match self {
            Self::CubePlacement => "cube-placement",
            Self::Scanning => "scanning",
            Self::Viewing => "viewing",
        }
    }
}

/// Notifications drained by the UI via [`ScanSessionController::pump`].
#[derive(Debug)]
pub enum SessionEvent {
    StateChanged { state: ScanState },
    VolumeChanged { volume: VolumeSize },
    /// `None` clears a previously shown status message.
    StatusMessage { message: Option<String> },
    TrackingLost { message: String },
    TrackingRecovered,
    /// The finalized mesh, ready for the viewer, with its estimated center.
    MeshReady { mesh: Mesh, center: Point3<f32> },
    ColorizeProgress { combined: f32 },
    ColorizePreviewReady { mesh: Mesh },
    ColorizeEnhancedStarted,
    ColorizeEnhancedReady { mesh: Mesh },
    ColorizeFailed { kind: ColorizeKind, message: String },
    /// Shown as a dialog; must be acknowledged before another can appear.
    MemoryWarning { message: &'static str },
}

/// Tracker/mapper/scene stack built from the current dynamic options.
struct SlamStack {
    scene: Arc<dyn Scene>,
    tracker: Box<dyn Tracker>,
    /// Built fresh on every scan start, sized to the volume at that moment.
    mapper: Option<Box<dyn Mapper>>,
    pose_initializer: Box<dyn PoseInitializer>,
    keyframes: Box<dyn KeyframeManager>,
}

pub struct ScanSessionController {
    sensor: Box<dyn SensorStream>,
    factory: Box<dyn SlamFactory>,
    cube_renderer: Box<dyn CubeRenderer>,
    pipeline: ColorizationPipeline,

    fixed: FixedOptions,
    dynamic: DynamicOptions,

    state: ScanState,
    slam: Option<SlamStack>,
    volume_size: VolumeSize,
    pinch: PinchScaleState,
    last_gravity: Vector3<f32>,

    color_camera_authorized: bool,
    status_message_disabled: bool,
    current_status_message: Option<String>,

    memory_guard: MemoryPressureGuard,
    pending_memory_action: Option<MemoryAction>,

    events: VecDeque<SessionEvent>,
}

impl ScanSessionController {
    pub fn new(
        sensor: Box<dyn SensorStream>,
        factory: Box<dyn SlamFactory>,
        cube_renderer: Box<dyn CubeRenderer>,
        colorizer: Arc<dyn Colorizer>,
        fixed: FixedOptions,
    ) -> Self {
        let mut dynamic = DynamicOptions::default();
        let high_res = sensor.supports_high_res_color();
        dynamic.high_res_coloring = high_res;
        dynamic.high_res_coloring_switch_enabled = high_res;

        let colorize_options = ColorizeOptions {
            prioritize_first_frame_color: fixed.prioritize_first_frame_color,
            quality: fixed.colorizer_quality,
            target_num_faces: fixed.colorizer_target_num_faces,
        };

        let mut session = Self {
            sensor,
            factory,
            cube_renderer,
            pipeline: ColorizationPipeline::new(colorizer, colorize_options),
            fixed,
            dynamic,
            state: ScanState::CubePlacement,
            slam: None,
            volume_size: VolumeSize::default(),
            pinch: PinchScaleState::new(),
            last_gravity: Vector3::zeros(),
            color_camera_authorized: true,
            status_message_disabled: false,
            current_status_message: None,
            memory_guard: MemoryPressureGuard::new(),
            pending_memory_action: None,
            events: VecDeque::new(),
        };
        session.setup_slam();
        session.enter_cube_placement();
        session
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn volume_size(&self) -> VolumeSize {
        self.volume_size
    }

    pub fn dynamic_options(&self) -> DynamicOptions {
        self.dynamic
    }

    pub fn fixed_options(&self) -> &FixedOptions {
        &self.fixed
    }

    pub fn sensor_status(&self) -> SensorStatus {
        self.sensor.status()
    }

    pub fn colorize_in_flight(&self) -> bool {
        self.pipeline.is_busy()
    }

    /// Initialization and scanning need the sensor; viewing does not.
    pub fn current_state_needs_sensor(&self) -> bool {
        matches!(self.state, ScanState::CubePlacement | ScanState::Scanning)
    }

    /// Keep the device awake only while sensor data is actively consumed.
    pub fn is_idle_sleep_suppressed(&self) -> bool {
        self.sensor.status() == SensorStatus::Ok && self.current_state_needs_sensor()
    }

    // ------------------------------------------------------------------
    // State transitions
    // ------------------------------------------------------------------

    /// Valid from any state. Restores the placement UI affordances and the
    /// live-preview camera parameters.
    pub fn enter_cube_placement(&mut self) {
        self.sensor.set_exposure_locked(false);
        self.dynamic
            .enable_all_switches(self.sensor.supports_high_res_color());
        self.status_message_disabled = false;
        self.state = ScanState::CubePlacement;
        self.events
            .push_back(SessionEvent::StateChanged { state: self.state });
        self.update_app_status_message();
    }

    /// Start scanning. Rejected (no state change, no side effect) outside
    /// cube placement or while the initial pose is still invalid.
    pub fn enter_scanning(&mut self) -> bool {
        if self.state != ScanState::CubePlacement {
            return false;
        }
        let Some(slam) = &mut self.slam else {
            return false;
        };
        let pose = slam.pose_initializer.last_output();
        if !pose.has_valid_pose {
            warn!("not entering scanning state: initial pose is not valid");
            return false;
        }

        // Fresh mapper sized to the volume the user settled on.
        slam.mapper = Some(
            self.factory
                .make_mapper(&self.dynamic, self.volume_size),
        );
        slam.tracker.set_initial_camera_pose(pose.camera_pose);

        // Lock exposure during scanning to ensure consistent coloring.
        self.sensor.set_exposure_locked(true);

        self.dynamic.disable_all_switches();
        self.state = ScanState::Scanning;
        self.events
            .push_back(SessionEvent::StateChanged { state: self.state });
        info!(volume = ?self.volume_size, "scanning started");
        true
    }

    /// Finalize the scan and hand the mesh to the viewer. Only valid from
    /// the scanning state.
    pub fn enter_viewing(&mut self) -> Result<()> {
        if self.state != ScanState::Scanning {
            return Err(StrataError::InvalidTransition {
                from: self.state.name(),
                to: ScanState::Viewing.name(),
            });
        }

        self.sensor.stop_streaming();
        self.sensor.stop_color_capture();

        let slam = self.slam.as_mut().ok_or(StrataError::InvalidTransition {
            from: ScanState::Scanning.name(),
            to: ScanState::Viewing.name(),
        })?;
        if let Some(mapper) = slam.mapper.as_mut() {
            mapper.finalize_triangle_mesh();
        }

        // Scoped mesh handoff: hold the scene lock only for the copy.
        let mut mesh = None;
        slam.scene.with_locked_mesh(&mut |m| mesh = Some(m.clone()));
        let mesh = mesh.ok_or(StrataError::EmptyMesh)?;
        let center = mesh.estimate_center(self.volume_size, MESH_CENTER_SAMPLE_TARGET);

        self.status_message_disabled = true;
        self.state = ScanState::Viewing;
        self.events
            .push_back(SessionEvent::StateChanged { state: self.state });
        self.events.push_back(SessionEvent::MeshReady { mesh, center });
        self.update_app_status_message();
        info!("entered viewing state");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Dynamic reconfiguration
    // ------------------------------------------------------------------

    /// Apply changed dynamic options with a full tracker/mapper rebuild.
    /// The UI disables these controls while scanning; the rejection here
    /// makes that invariant hold even without the UI wiring.
    pub fn on_options_changed(&mut self, options: DynamicOptions) -> Result<()> {
        if self.state == ScanState::Scanning {
            return Err(StrataError::OptionsLockedWhileScanning);
        }

        self.dynamic = options;
        self.dynamic
            .enable_all_switches(self.sensor.supports_high_res_color());

        // Full reset to force creation of a new tracker, then restore the
        // volume size the rebuild just cleared.
        let volume = self.volume_size;
        self.reset_slam();
        self.clear_slam();
        self.setup_slam();
        self.adjust_volume_size(volume);
        Ok(())
    }

    fn setup_slam(&mut self) {
        let scene: Arc<dyn Scene> = Arc::from(self.factory.make_scene());
        self.slam = Some(SlamStack {
            scene,
            tracker: self.factory.make_tracker(&self.dynamic),
            mapper: None,
            pose_initializer: self.factory.make_pose_initializer(),
            keyframes: self
                .factory
                .make_keyframe_manager(self.fixed.max_num_key_frames),
        });
        self.apply_volume_to_collaborators();
    }

    /// Quiesce the current stack and fall back to cube placement.
    fn reset_slam(&mut self) {
        if let Some(slam) = &mut self.slam {
            slam.tracker.reset();
            if let Some(mapper) = slam.mapper.as_mut() {
                mapper.reset();
            }
            slam.mapper = None;
            slam.keyframes.clear();
        }
        self.enter_cube_placement();
    }

    fn clear_slam(&mut self) {
        self.slam = None;
    }

    /// Reset button: abandon the scan and return to cube placement.
    pub fn reset(&mut self) {
        self.reset_slam();
    }

    // ------------------------------------------------------------------
    // Volume
    // ------------------------------------------------------------------

    /// The only path by which volume changes reach the collaborators.
    pub fn adjust_volume_size(&mut self, volume: VolumeSize) {
        self.volume_size = volume.clamped();
        self.apply_volume_to_collaborators();
        self.events.push_back(SessionEvent::VolumeChanged {
            volume: self.volume_size,
        });
    }

    fn apply_volume_to_collaborators(&mut self) {
        if let Some(slam) = &mut self.slam {
            slam.pose_initializer.set_volume_size(self.volume_size);
        }
        self.cube_renderer.adjust_cube_size(self.volume_size);
    }

    pub fn pinch_began(&mut self, gesture_scale: f32) {
        if self.state == ScanState::CubePlacement {
            self.pinch.begin(gesture_scale);
        }
    }

    pub fn pinch_changed(&mut self, gesture_scale: f32) {
        if self.state != ScanState::CubePlacement {
            return;
        }
        if let Some(scale) = self.pinch.update(gesture_scale) {
            let new_volume = self.fixed.init_volume_size_in_meters.scaled(scale);
            self.adjust_volume_size(new_volume);
        }
    }

    // ------------------------------------------------------------------
    // IMU / keyframes
    // ------------------------------------------------------------------

    /// Apply one device-motion sample. Samples arrive serially and are fed
    /// to the tracker in arrival order.
    pub fn handle_motion(&mut self, motion: &MotionSample) {
        if self.state == ScanState::CubePlacement {
            // The cube placement initializer uses the gravity vector.
            self.last_gravity = motion.gravity;
        }
        if matches!(self.state, ScanState::CubePlacement | ScanState::Scanning) {
            if let Some(slam) = &mut self.slam {
                slam.tracker.update_camera_pose(motion);
            }
        }
    }

    pub fn last_gravity(&self) -> Vector3<f32> {
        self.last_gravity
    }

    /// Retain a keyframe for colorization. Only meaningful while scanning.
    pub fn record_keyframe(&mut self, frame: Keyframe) {
        if self.state != ScanState::Scanning {
            return;
        }
        if let Some(slam) = &mut self.slam {
            slam.keyframes.add_key_frame(frame);
        }
    }

    pub fn keyframe_count(&self) -> usize {
        self.slam.as_ref().map_or(0, |s| s.keyframes.len())
    }

    // ------------------------------------------------------------------
    // App lifecycle
    // ------------------------------------------------------------------

    /// The app came back to the foreground. Reconnect the sensor if the
    /// current state consumes it; a scan interrupted by a suspend cannot be
    /// resumed (tracking continuity is lost), so force a reset.
    pub fn app_did_become_active(&mut self) {
        if self.current_state_needs_sensor() {
            let connected = self.sensor.connect_and_start_streaming();
            if !connected {
                warn!(status = ?self.sensor.status(), "sensor connect failed on resume");
            }
        }
        if self.state == ScanState::Scanning {
            info!("app was suspended mid-scan; aborting the scan");
            self.reset_slam();
        }
        self.update_app_status_message();
    }

    pub fn set_color_camera_authorized(&mut self, authorized: bool) {
        self.color_camera_authorized = authorized;
        self.update_app_status_message();
    }

    /// Recompute the persistent status message: sensor issues first, then
    /// camera permission. Suppressed entirely while viewing.
    pub fn update_app_status_message(&mut self) {
        let message = if self.status_message_disabled {
            None
        } else {
            match self.sensor.status() {
                SensorStatus::NeedsConnect => Some(PLEASE_CONNECT_SENSOR_MESSAGE.to_string()),
                SensorStatus::NeedsCharge => Some(PLEASE_CHARGE_SENSOR_MESSAGE.to_string()),
                SensorStatus::Ok => {
                    if !self.color_camera_authorized {
                        Some(NEED_COLOR_CAMERA_ACCESS_MESSAGE.to_string())
                    } else {
                        None
                    }
                }
            }
        };
        if message != self.current_status_message {
            self.current_status_message = message.clone();
            self.events.push_back(SessionEvent::StatusMessage { message });
        }
    }

    // ------------------------------------------------------------------
    // Tracking feedback
    // ------------------------------------------------------------------

    pub fn report_tracking_lost(&mut self, message: impl Into<String>) {
        // Tracking cannot be lost outside of an active scan.
        if self.state == ScanState::Scanning {
            self.events.push_back(SessionEvent::TrackingLost {
                message: message.into(),
            });
        }
    }

    pub fn report_tracking_recovered(&mut self) {
        self.events.push_back(SessionEvent::TrackingRecovered);
    }

    // ------------------------------------------------------------------
    // Colorization
    // ------------------------------------------------------------------

    /// Kick off the two-phase colorize workflow for the viewed mesh.
    /// Returns `false` when a task is already in flight.
    pub fn request_colorize(&mut self, mesh: Mesh) -> bool {
        let keyframes = self
            .slam
            .as_ref()
            .map(|s| s.keyframes.get_key_frames())
            .unwrap_or_default();
        self.pipeline.request_colorize(mesh, keyframes)
    }

    /// The mesh viewer is about to close: stop any colorize work.
    pub fn viewer_will_dismiss(&mut self) {
        self.pipeline.cancel_all();
    }

    /// The mesh viewer closed: bring the sensor back and start over.
    pub fn viewer_did_dismiss(&mut self) {
        self.status_message_disabled = false;
        let _ = self.sensor.connect_and_start_streaming();
        self.reset_slam();
        self.update_app_status_message();
    }

    // ------------------------------------------------------------------
    // Memory pressure
    // ------------------------------------------------------------------

    /// Degrade gracefully on a low-memory signal. At most one warning is
    /// surfaced until [`Self::acknowledge_memory_warning`] runs.
    pub fn memory_warning(&mut self) {
        match self.state {
            ScanState::Viewing => {
                if self.pipeline.enhanced_in_flight() && self.memory_guard.try_arm() {
                    // Cancel right away; the dialog is informational.
                    self.pipeline.cancel_enhanced();
                    self.pending_memory_action = Some(MemoryAction::CancelEnhancedColorize);
                    self.events.push_back(SessionEvent::MemoryWarning {
                        message: MEMORY_COLORIZE_CANCELED_MESSAGE,
                    });
                }
            }
            ScanState::Scanning => {
                if self.memory_guard.try_arm() {
                    self.pending_memory_action = Some(MemoryAction::StopScanning);
                    self.events.push_back(SessionEvent::MemoryWarning {
                        message: MEMORY_SCAN_STOPPED_MESSAGE,
                    });
                }
            }
            ScanState::CubePlacement => {}
        }
    }

    /// The user dismissed the memory warning dialog.
    pub fn acknowledge_memory_warning(&mut self) {
        self.memory_guard.acknowledge();
        match self.pending_memory_action.take() {
            Some(MemoryAction::StopScanning) => {
                if let Err(err) = self.enter_viewing() {
                    warn!(%err, "could not stop scanning after memory warning");
                }
            }
            // The enhanced task was already cancelled at signal time.
            Some(MemoryAction::CancelEnhancedColorize) | None => {}
        }
    }

    // ------------------------------------------------------------------
    // Event pump
    // ------------------------------------------------------------------

    /// Drain the colorize completion queue and all pending session events.
    /// Runs on the UI-affinity thread once per frame tick.
    pub fn pump(&mut self) -> Vec<SessionEvent> {
        for event in self.pipeline.poll() {
            match event {
                ColorizeEvent::Progress { combined } => {
                    self.events
                        .push_back(SessionEvent::ColorizeProgress { combined });
                }
                ColorizeEvent::PreviewReady { mesh } => {
                    // Colorizing has begun in earnest: the scan can no longer
                    // be resumed, so release the tracking/mapping resources.
                    if let Some(slam) = &mut self.slam {
                        if let Some(mapper) = slam.mapper.as_mut() {
                            mapper.reset();
                        }
                        slam.mapper = None;
                        slam.tracker.reset();
                    }
                    self.events
                        .push_back(SessionEvent::ColorizePreviewReady { mesh });
                }
                ColorizeEvent::EnhancedStarted => {
                    // The enhanced task holds its own copy; free the keyframe
                    // memory as early as possible.
                    if let Some(slam) = &mut self.slam {
                        slam.keyframes.clear();
                    }
                    self.events.push_back(SessionEvent::ColorizeEnhancedStarted);
                }
                ColorizeEvent::EnhancedReady { mesh } => {
                    self.events
                        .push_back(SessionEvent::ColorizeEnhancedReady { mesh });
                }
                ColorizeEvent::Failed { kind, message } => {
                    self.events
                        .push_back(SessionEvent::ColorizeFailed { kind, message });
                }
            }
        }
        self.events.drain(..).collect()
    }
}
