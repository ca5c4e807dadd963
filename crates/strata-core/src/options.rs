//! Session configuration: fixed scan parameters and the dynamic toggles
//! that force a pipeline rebuild when changed.

use serde::{Deserialize, Serialize};

use crate::volume::VolumeSize;

/// Colorizer output quality for the enhanced pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColorizerQuality {
    High,
    #[default]
    Normal,
    Fast,
}

/// Parameters fixed for the lifetime of a session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FixedOptions {
    /// Initial scanning volume; the pinch gesture scales this base size.
    pub init_volume_size_in_meters: VolumeSize,

    /// Maximum number of keyframes retained for colorization.
    pub max_num_key_frames: usize,

    /// Enhanced colorizer quality.
    pub colorizer_quality: ColorizerQuality,

    /// Take a new keyframe when the rotation difference exceeds this (radians).
    pub max_key_frame_rotation: f32,

    /// Take a new keyframe when the translation difference exceeds this (meters).
    pub max_key_frame_translation: f32,

    /// Rotation speed above which a frame is rejected as a keyframe, to avoid
    /// motion blur (degrees per second).
    pub max_keyframe_rotation_speed_degrees_per_second: f32,

    /// Whether the colorizer should try harder to preserve the appearance of
    /// the first keyframe. Recommended for face scans.
    pub prioritize_first_frame_color: bool,

    /// Target number of faces for the final textured mesh.
    pub colorizer_target_num_faces: usize,

    /// Fixed focus position for the color camera, in [0, 1]. Must not move
    /// once depth streaming has started.
    pub lens_position: f32,
}

impl Default for FixedOptions {
    fn default() -> Self {
        Self {
            init_volume_size_in_meters: VolumeSize::cube(0.5),
            max_num_key_frames: 48,
            colorizer_quality: ColorizerQuality::Normal,
            max_key_frame_rotation: 30.0_f32.to_radians(),
            max_key_frame_translation: 0.3,
            max_keyframe_rotation_speed_degrees_per_second: 1.0,
            prioritize_first_frame_color: true,
            colorizer_target_num_faces: 50_000,
            lens_position: 0.75,
        }
    }
}

/// Toggles the user may flip between scans. Changing any of them tears down
/// and rebuilds the tracker/mapper, so they are locked while scanning.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DynamicOptions {
    pub new_tracker_is_on: bool,
    pub new_tracker_switch_enabled: bool,

    pub high_res_coloring: bool,
    pub high_res_coloring_switch_enabled: bool,

    pub new_mapper_is_on: bool,
    pub new_mapper_switch_enabled: bool,

    pub high_res_mapping: bool,
    pub high_res_mapping_switch_enabled: bool,
}

impl Default for DynamicOptions {
    fn default() -> Self {
        Self {
            new_tracker_is_on: true,
            new_tracker_switch_enabled: true,
            high_res_coloring: false,
            high_res_coloring_switch_enabled: false,
            new_mapper_is_on: true,
            new_mapper_switch_enabled: true,
            high_res_mapping: true,
            high_res_mapping_switch_enabled: true,
        }
    }
}

impl DynamicOptions {
    /// Disable every toggle; used while scanning.
    pub fn disable_all_switches(&mut self) {
        self.new_tracker_switch_enabled = false;
        self.high_res_coloring_switch_enabled = false;
        self.new_mapper_switch_enabled = false;
        self.high_res_mapping_switch_enabled = false;
    }

    /// Restore the toggles to their normal enabled state. High-resolution
    /// coloring stays disabled when the color device cannot provide it.
    pub fn enable_all_switches(&mut self, high_res_color_supported: bool) {
        self.new_tracker_switch_enabled = true;
        self.high_res_coloring_switch_enabled = high_res_color_supported;
        self.new_mapper_switch_enabled = true;
        self.high_res_mapping_switch_enabled = true;
    }

    pub fn any_switch_enabled(&self) -> bool {
        self.new_tracker_switch_enabled
            || self.high_res_coloring_switch_enabled
            || self.new_mapper_switch_enabled
            || self.high_res_mapping_switch_enabled
    }
}
