//! Capability contracts for the sensor, tracking, and mapping collaborators.
//!
//! The session controller only ever talks to these traits; the numerical
//! implementations live behind them (real SDK bindings in production, the
//! [`crate::sim`] doubles in tests and demos).

use nalgebra::{Matrix4, Vector3};

use crate::mesh::Mesh;
use crate::options::DynamicOptions;
use crate::volume::VolumeSize;

/// Depth sensor health as reported by the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SensorStatus {
    Ok,
    NeedsConnect,
    NeedsCharge,
}

/// Depth/color sensor stream.
pub trait SensorStream: Send {
    /// Connect to the sensor and begin streaming. Returns `false` when the
    /// sensor is missing or uncharged; the session surfaces that as a
    /// persistent status message, not an error.
    fn connect_and_start_streaming(&mut self) -> bool;

    fn stop_streaming(&mut self);

    fn status(&self) -> SensorStatus;

    /// Whether the color camera can deliver high-resolution frames.
    fn supports_high_res_color(&self) -> bool {
        false
    }

    fn start_color_capture(&mut self);
    fn stop_color_capture(&mut self);

    /// Lock color exposure during a scan for consistent coloring; unlock for
    /// the live cube-placement preview.
    fn set_exposure_locked(&mut self, locked: bool);
}

/// Output of the cube-placement pose initializer.
#[derive(Clone, Copy, Debug)]
pub struct PoseEstimate {
    pub has_valid_pose: bool,
    pub camera_pose: Matrix4<f32>,
}

impl Default for PoseEstimate {
    fn default() -> Self {
        Self {
            has_valid_pose: false,
            camera_pose: Matrix4::identity(),
        }
    }
}

/// Estimates the initial camera pose relative to the scan volume.
pub trait PoseInitializer: Send {
    fn set_volume_size(&mut self, volume: VolumeSize);
    fn last_output(&self) -> PoseEstimate;
}

/// A single IMU device-motion sample, delivered in arrival order.
#[derive(Clone, Copy, Debug)]
pub struct MotionSample {
    pub gravity: Vector3<f32>,
    pub rotation_rate: Vector3<f32>,
    pub timestamp: f64,
}

/// Camera pose tracker.
pub trait Tracker: Send {
    fn set_initial_camera_pose(&mut self, pose: Matrix4<f32>);

    /// Feed a motion sample; the tracker is more robust to fast moves with
    /// IMU data.
    fn update_camera_pose(&mut self, motion: &MotionSample);

    fn reset(&mut self);
}

/// Accumulates tracked depth frames into the scene's triangle mesh.
pub trait Mapper: Send {
    /// Turn the accumulated volume into a triangle mesh inside the scene.
    fn finalize_triangle_mesh(&mut self);

    fn reset(&mut self);
}

/// Owns the mesh shared between the mapper thread and the viewer.
pub trait Scene: Send {
    /// Run `f` with the mesh while holding the scene's mesh lock. The lock is
    /// held only for the duration of the closure, so callers should copy what
    /// they need and get out.
    fn with_locked_mesh(&self, f: &mut dyn FnMut(&Mesh));
}

/// A retained capture (image + pose) used as colorization input.
#[derive(Clone, Debug)]
pub struct Keyframe {
    pub camera_pose: Matrix4<f32>,
    /// Downsampled color image, row-major RGBA.
    pub color: Vec<u32>,
    pub width: u32,
    pub height: u32,
}

/// Bounded store of keyframes captured during the scan.
pub trait KeyframeManager: Send {
    fn add_key_frame(&mut self, frame: Keyframe);
    fn get_key_frames(&self) -> Vec<Keyframe>;
    fn clear(&mut self);
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Renders the scan volume boundary during cube placement.
pub trait CubeRenderer: Send {
    fn adjust_cube_size(&mut self, volume: VolumeSize);
}

/// Builds trackers and mappers from the current dynamic options. A rebuild
/// goes through here so an options change swaps algorithm variants cleanly.
pub trait SlamFactory: Send {
    fn make_tracker(&self, options: &DynamicOptions) -> Box<dyn Tracker>;
    fn make_mapper(&self, options: &DynamicOptions, volume: VolumeSize) -> Box<dyn Mapper>;
    fn make_pose_initializer(&self) -> Box<dyn PoseInitializer>;
    fn make_scene(&self) -> Box<dyn Scene>;
    fn make_keyframe_manager(&self, max_key_frames: usize) -> Box<dyn KeyframeManager>;
}
