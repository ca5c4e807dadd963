use strata_core::options::{DynamicOptions, FixedOptions};
use strata_core::volume::VolumeSize;

#[test]
fn test_fixed_defaults() {
    let fixed = FixedOptions::default();
    assert_eq!(fixed.init_volume_size_in_meters, VolumeSize::cube(0.5));
    assert_eq!(fixed.max_num_key_frames, 48);
    assert_eq!(fixed.colorizer_target_num_faces, 50_000);
    assert!(fixed.prioritize_first_frame_color);
}

#[test]
fn test_high_res_coloring_defaults_off() {
    let dynamic = DynamicOptions::default();
    assert!(!dynamic.high_res_coloring);
    assert!(!dynamic.high_res_coloring_switch_enabled);
    assert!(dynamic.new_tracker_is_on);
    assert!(dynamic.new_mapper_is_on);
}

#[test]
fn test_disable_all_switches() {
    let mut dynamic = DynamicOptions::default();
    dynamic.disable_all_switches();
    assert!(!dynamic.any_switch_enabled());
    // The on/off values themselves are untouched.
    assert!(dynamic.new_tracker_is_on);
}

#[test]
fn test_enable_all_switches_respects_color_support() {
    let mut dynamic = DynamicOptions::default();
    dynamic.disable_all_switches();

    dynamic.enable_all_switches(false);
    assert!(dynamic.new_tracker_switch_enabled);
    assert!(!dynamic.high_res_coloring_switch_enabled);

    dynamic.enable_all_switches(true);
    assert!(dynamic.high_res_coloring_switch_enabled);
}
