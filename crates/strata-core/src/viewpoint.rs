//! Inertial viewpoint controller for the mesh viewer.
//!
//! Gestures accumulate into an orbit/pan/zoom transform around the mesh
//! center. Released pans leave a velocity behind that decays over the next
//! ticks, so the mesh keeps gliding briefly. `update` runs once per frame
//! tick and reports whether anything moved, which is what lets the viewport
//! skip rendering entirely on idle frames.

use nalgebra::{Matrix4, Point3, Rotation3, Translation3, Vector2};

use crate::volume::keep_in_range;

/// Radians of orbit per pixel of one-finger pan.
const ROTATION_SENSITIVITY: f32 = 0.006;
/// Meters of pan per pixel of two-finger pan.
const TRANSLATION_SENSITIVITY: f32 = 0.001;
/// Per-tick decay applied to release velocities.
const VELOCITY_DAMPING: f32 = 0.92;
/// Below this speed the inertia is considered stopped.
const VELOCITY_EPSILON: f32 = 1.0e-4;
/// Assumed tick interval for converting gesture velocity (units/second).
const TICK_SECONDS: f32 = 1.0 / 60.0;

const MIN_SCALE: f32 = 0.1;
const MAX_SCALE: f32 = 10.0;

/// Distance from the camera to the orbit pivot, in meters.
const VIEW_DISTANCE: f32 = 1.0;

#[derive(Clone, Copy, Debug, Default)]
struct Transform {
    yaw: f32,
    pitch: f32,
    pan: Vector2<f32>,
    scale: f32,
}

impl Transform {
    fn identity() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            pan: Vector2::zeros(),
            scale: 1.0,
        }
    }
}

pub struct ViewpointController {
    screen_size: Vector2<f32>,
    projection: Matrix4<f32>,
    mesh_center: Point3<f32>,

    transform: Transform,
    rotation_velocity: Vector2<f32>,
    pan_velocity: Vector2<f32>,

    initial_pinch_scale: f32,
    last_one_finger_pos: Option<Vector2<f32>>,
    last_two_finger_pos: Option<Vector2<f32>>,

    /// Set by any gesture mutation; consumed by `update`.
    modified_since_last_update: bool,
}

impl ViewpointController {
    pub fn new(screen_size_x: f32, screen_size_y: f32) -> Self {
        Self {
            screen_size: Vector2::new(screen_size_x, screen_size_y),
            projection: Matrix4::identity(),
            mesh_center: Point3::origin(),
            transform: Transform::identity(),
            rotation_velocity: Vector2::zeros(),
            pan_velocity: Vector2::zeros(),
            initial_pinch_scale: 1.0,
            last_one_finger_pos: None,
            last_two_finger_pos: None,
            modified_since_last_update: false,
        }
    }

    /// Restore the baseline transform computed before any user interaction.
    pub fn reset(&mut self) {
        self.transform = Transform::identity();
        self.rotation_velocity = Vector2::zeros();
        self.pan_velocity = Vector2::zeros();
        self.last_one_finger_pos = None;
        self.last_two_finger_pos = None;
        self.modified_since_last_update = true;
    }

    pub fn set_camera_projection(&mut self, projection: Matrix4<f32>) {
        self.projection = projection;
        self.modified_since_last_update = true;
    }

    pub fn set_mesh_center(&mut self, center: Point3<f32>) {
        self.mesh_center = center;
        self.modified_since_last_update = true;
    }

    pub fn set_screen_size(&mut self, x: f32, y: f32) {
        self.screen_size = Vector2::new(x, y);
    }

    /// A touch landed; kill any in-flight inertia.
    pub fn on_touch_began(&mut self) {
        self.rotation_velocity = Vector2::zeros();
        self.pan_velocity = Vector2::zeros();
    }

    pub fn on_pinch_gesture_began(&mut self, gesture_scale: f32) {
        self.initial_pinch_scale = self.transform.scale / gesture_scale;
    }

    pub fn on_pinch_gesture_changed(&mut self, gesture_scale: f32) {
        if self.initial_pinch_scale.is_nan() {
            return;
        }
        self.transform.scale = keep_in_range(
            gesture_scale * self.initial_pinch_scale,
            MIN_SCALE,
            MAX_SCALE,
        );
        self.modified_since_last_update = true;
    }

    pub fn on_one_finger_pan_began(&mut self, pos: Vector2<f32>) {
        self.on_touch_began();
        self.last_one_finger_pos = Some(pos);
    }

    pub fn on_one_finger_pan_changed(&mut self, pos: Vector2<f32>) {
        if let Some(last) = self.last_one_finger_pos.replace(pos) {
            let delta = pos - last;
            self.apply_orbit(delta * ROTATION_SENSITIVITY);
        }
    }

    pub fn on_one_finger_pan_ended(&mut self, velocity: Vector2<f32>) {
        self.last_one_finger_pos = None;
        self.rotation_velocity = velocity * ROTATION_SENSITIVITY * TICK_SECONDS;
    }

    pub fn on_two_fingers_pan_began(&mut self, pos: Vector2<f32>) {
        self.on_touch_began();
        self.last_two_finger_pos = Some(pos);
    }

    pub fn on_two_fingers_pan_changed(&mut self, pos: Vector2<f32>) {
        if let Some(last) = self.last_two_finger_pos.replace(pos) {
            let delta = pos - last;
            self.apply_pan(delta * TRANSLATION_SENSITIVITY);
        }
    }

    pub fn on_two_fingers_pan_ended(&mut self, velocity: Vector2<f32>) {
        self.last_two_finger_pos = None;
        self.pan_velocity = velocity * TRANSLATION_SENSITIVITY * TICK_SECONDS;
    }

    fn apply_orbit(&mut self, delta: Vector2<f32>) {
        self.transform.yaw += delta.x;
        self.transform.pitch = keep_in_range(
            self.transform.pitch + delta.y,
            -std::f32::consts::FRAC_PI_2,
            std::f32::consts::FRAC_PI_2,
        );
        self.modified_since_last_update = true;
    }

    fn apply_pan(&mut self, delta: Vector2<f32>) {
        self.transform.pan += delta;
        self.modified_since_last_update = true;
    }

    /// Integrate inertia for one tick. Returns whether the transform changed
    /// since the previous tick, from gestures or from coasting.
    pub fn update(&mut self) -> bool {
        let mut changed = self.modified_since_last_update;
        self.modified_since_last_update = false;

        if self.rotation_velocity.norm() > VELOCITY_EPSILON {
            let step = self.rotation_velocity;
            self.apply_orbit(step);
            self.modified_since_last_update = false;
            self.rotation_velocity *= VELOCITY_DAMPING;
            if self.rotation_velocity.norm() <= VELOCITY_EPSILON {
                self.rotation_velocity = Vector2::zeros();
            }
            changed = true;
        }

        if self.pan_velocity.norm() > VELOCITY_EPSILON {
            let step = self.pan_velocity;
            self.apply_pan(step);
            self.modified_since_last_update = false;
            self.pan_velocity *= VELOCITY_DAMPING;
            if self.pan_velocity.norm() <= VELOCITY_EPSILON {
                self.pan_velocity = Vector2::zeros();
            }
            changed = true;
        }

        changed
    }

    pub fn has_inertia(&self) -> bool {
        self.rotation_velocity.norm() > VELOCITY_EPSILON
            || self.pan_velocity.norm() > VELOCITY_EPSILON
    }

    pub fn scale(&self) -> f32 {
        self.transform.scale
    }

    /// Model-view matrix: pan and back off from the pivot, orbit around it,
    /// scale, and re-center the mesh.
    pub fn current_model_view_matrix(&self) -> Matrix4<f32> {
        let pan = Translation3::new(
            self.transform.pan.x,
            -self.transform.pan.y,
            -VIEW_DISTANCE,
        )
        .to_homogeneous();
        let orbit = Rotation3::from_euler_angles(self.transform.pitch, self.transform.yaw, 0.0)
            .to_homogeneous();
        let scale = Matrix4::new_scaling(self.transform.scale);
        let center = Translation3::from(-self.mesh_center.coords).to_homogeneous();
        pan * orbit * scale * center
    }

    pub fn current_projection_matrix(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn screen_size(&self) -> Vector2<f32> {
        self.screen_size
    }
}
