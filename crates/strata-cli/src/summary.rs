use std::path::Path;

use console::Style;
use strata_core::options::{ColorizerQuality, FixedOptions};
use strata_core::volume::VolumeSize;

struct Styles {
    title: Style,
    label: Style,
    value: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_scan_summary(fixed: &FixedOptions, volume: VolumeSize, output: &Path) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Strata Scan"));
    println!("  {}", s.title.apply_to("\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}\u{2550}"));
    println!();
    println!(
        "  {} {}",
        s.label.apply_to("Volume:    "),
        s.value
            .apply_to(format!("{:.2} x {:.2} x {:.2} m", volume.x, volume.y, volume.z))
    );
    println!(
        "  {} {}",
        s.label.apply_to("Keyframes: "),
        s.value.apply_to(format!("up to {}", fixed.max_num_key_frames))
    );
    println!(
        "  {} {}",
        s.label.apply_to("Quality:   "),
        s.value.apply_to(quality_name(fixed.colorizer_quality))
    );
    println!(
        "  {} {}",
        s.label.apply_to("Faces:     "),
        s.value
            .apply_to(format!("target {}", fixed.colorizer_target_num_faces))
    );
    println!(
        "  {} {}",
        s.label.apply_to("Output:    "),
        s.path.apply_to(output.display())
    );
    println!();
}

fn quality_name(quality: ColorizerQuality) -> &'static str {
    match quality {
        ColorizerQuality::High => "high",
        ColorizerQuality::Normal => "normal",
        ColorizerQuality::Fast => "fast",
    }
}
