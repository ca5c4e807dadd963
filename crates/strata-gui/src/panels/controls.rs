use strata_core::session::ScanState;
use strata_core::viewport::DisplayMode;
use strata_core::volume::{VolumeSize, MAX_VOLUME_EDGE_METERS, MIN_VOLUME_EDGE_METERS};

use crate::app::StrataApp;
use crate::state::DISPLAY_MODE_NAMES;

pub fn show(ctx: &egui::Context, app: &mut StrataApp) {
    egui::SidePanel::left("controls")
        .default_width(260.0)
        .show(ctx, |ui| {
            ui.add_space(4.0);
            match app.session.state() {
                ScanState::CubePlacement => cube_placement_controls(ui, app),
                ScanState::Scanning => scanning_controls(ui, app),
                ScanState::Viewing => viewing_controls(ui, app),
            }
        });
}

fn cube_placement_controls(ui: &mut egui::Ui, app: &mut StrataApp) {
    ui.heading("Place the Cube");
    ui.add_space(8.0);

    ui.label("Volume size (m)");
    let mut edge = app.ui_state.volume_edge;
    let slider = egui::Slider::new(&mut edge, MIN_VOLUME_EDGE_METERS..=MAX_VOLUME_EDGE_METERS)
        .fixed_decimals(2);
    if ui.add(slider).changed() {
        app.session.adjust_volume_size(VolumeSize::cube(edge));
    }

    ui.add_space(12.0);
    options_section(ui, app);
    ui.add_space(12.0);

    let can_scan = app.session.sensor_status() == strata_core::slam::SensorStatus::Ok;
    if ui
        .add_enabled(can_scan, egui::Button::new("Start Scanning"))
        .clicked()
        && !app.session.enter_scanning()
    {
        app.ui_state
            .add_log("Cannot start: no valid pose yet".into());
    }
}

fn scanning_controls(ui: &mut egui::Ui, app: &mut StrataApp) {
    ui.heading("Scanning");
    ui.add_space(8.0);
    ui.label(format!("Keyframes: {}", app.session.keyframe_count()));
    ui.add_space(12.0);

    // Toggles stay visible but frozen while scanning.
    options_section(ui, app);
    ui.add_space(12.0);

    if ui.button("Done").clicked() {
        if let Err(err) = app.session.enter_viewing() {
            app.ui_state.add_log(format!("ERROR: {err}"));
        }
    }
    if ui.button("Reset").clicked() {
        app.session.reset();
    }
}

fn viewing_controls(ui: &mut egui::Ui, app: &mut StrataApp) {
    ui.heading("View Mesh");
    ui.add_space(8.0);

    ui.label("Display");
    let mut index = app.ui_state.display_mode_index;
    egui::ComboBox::from_id_salt("display_mode")
        .selected_text(DISPLAY_MODE_NAMES[index])
        .show_ui(ui, |ui| {
            for (i, name) in DISPLAY_MODE_NAMES.iter().enumerate() {
                ui.selectable_value(&mut index, i, *name);
            }
        });
    if index != app.ui_state.display_mode_index {
        app.ui_state.display_mode_index = index;
        let mode = match index {
            0 => DisplayMode::XRay,
            1 => DisplayMode::LightedGray,
            _ => DisplayMode::Color,
        };
        if let Some(request) = app.viewport.set_display_mode(mode) {
            // Color was requested on a mesh with no appearance data yet.
            let strata_core::viewport::ViewportRequest::Colorize { mesh } = request;
            if !app.session.request_colorize(mesh) {
                app.ui_state.add_log("Colorize already running".into());
            }
        }
    }

    ui.add_space(12.0);
    if ui.button("Colorize").clicked() {
        app.start_colorize();
    }
    if ui.button("Reset View").clicked() {
        app.viewport.viewpoint.reset();
    }
    ui.add_space(12.0);
    if ui.button("New Scan").clicked() {
        app.new_scan();
    }
}

fn options_section(ui: &mut egui::Ui, app: &mut StrataApp) {
    ui.label("Options");
    let current = app.session.dynamic_options();
    let mut edited = current;

    ui.add_enabled(
        current.new_tracker_switch_enabled,
        egui::Checkbox::new(&mut edited.new_tracker_is_on, "New tracker"),
    );
    ui.add_enabled(
        current.high_res_coloring_switch_enabled,
        egui::Checkbox::new(&mut edited.high_res_coloring, "High-res coloring"),
    );
    ui.add_enabled(
        current.new_mapper_switch_enabled,
        egui::Checkbox::new(&mut edited.new_mapper_is_on, "New mapper"),
    );
    ui.add_enabled(
        current.high_res_mapping_switch_enabled,
        egui::Checkbox::new(&mut edited.high_res_mapping, "High-res mapping"),
    );

    let changed = edited.new_tracker_is_on != current.new_tracker_is_on
        || edited.high_res_coloring != current.high_res_coloring
        || edited.new_mapper_is_on != current.new_mapper_is_on
        || edited.high_res_mapping != current.high_res_mapping;
    if changed {
        if let Err(err) = app.session.on_options_changed(edited) {
            app.ui_state.add_log(format!("ERROR: {err}"));
        }
    }
}
