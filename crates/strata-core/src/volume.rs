//! Scan volume sizing and the gesture scale that drives it.

use serde::{Deserialize, Serialize};

/// Smallest allowed scan volume edge, in meters.
pub const MIN_VOLUME_EDGE_METERS: f32 = 0.1;
/// Largest allowed scan volume edge, in meters.
pub const MAX_VOLUME_EDGE_METERS: f32 = 3.0;

/// Clamp `value` to `[min_value, max_value]`. NaN collapses to `min_value`.
pub fn keep_in_range(value: f32, min_value: f32, max_value: f32) -> f32 {
    if value.is_nan() {
        return min_value;
    }
    if value > max_value {
        return max_value;
    }
    if value < min_value {
        return min_value;
    }
    value
}

/// Cuboid scan volume size in meters.
///
/// X is left-right, Y is up-down, Z is forward-back.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VolumeSize {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl VolumeSize {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Uniform cube with the given edge length.
    pub fn cube(edge: f32) -> Self {
        Self::new(edge, edge, edge)
    }

    /// Constrain every axis to the supported range. NaN axes clamp to the minimum.
    pub fn clamped(self) -> Self {
        Self {
            x: keep_in_range(self.x, MIN_VOLUME_EDGE_METERS, MAX_VOLUME_EDGE_METERS),
            y: keep_in_range(self.y, MIN_VOLUME_EDGE_METERS, MAX_VOLUME_EDGE_METERS),
            z: keep_in_range(self.z, MIN_VOLUME_EDGE_METERS, MAX_VOLUME_EDGE_METERS),
        }
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }
}

impl Default for VolumeSize {
    fn default() -> Self {
        Self::cube(0.5)
    }
}

/// Accumulates a pinch gesture into a volume scale multiplier.
///
/// The multiplier is kept in a sane range so a runaway gesture cannot
/// produce an absurd volume before the per-axis clamp kicks in.
#[derive(Clone, Copy, Debug)]
pub struct PinchScaleState {
    current_scale: f32,
    initial_pinch_scale: f32,
}

pub const MIN_PINCH_SCALE: f32 = 0.01;
pub const MAX_PINCH_SCALE: f32 = 1000.0;

impl PinchScaleState {
    pub fn new() -> Self {
        Self {
            current_scale: 1.0,
            initial_pinch_scale: 1.0,
        }
    }

    /// Gesture began with the recognizer reporting `gesture_scale`.
    pub fn begin(&mut self, gesture_scale: f32) {
        self.initial_pinch_scale = self.current_scale / gesture_scale;
    }

    /// Gesture moved; returns the updated multiplier, or `None` when the
    /// recognizer handed us a bogus initial scale.
    pub fn update(&mut self, gesture_scale: f32) -> Option<f32> {
        if self.initial_pinch_scale.is_nan() {
            return None;
        }
        self.current_scale = keep_in_range(
            gesture_scale * self.initial_pinch_scale,
            MIN_PINCH_SCALE,
            MAX_PINCH_SCALE,
        );
        Some(self.current_scale)
    }

    pub fn current(&self) -> f32 {
        self.current_scale
    }
}

impl Default for PinchScaleState {
    fn default() -> Self {
        Self::new()
    }
}
