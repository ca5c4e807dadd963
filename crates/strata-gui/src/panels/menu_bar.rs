use strata_core::options::DynamicOptions;

use crate::app::StrataApp;

pub fn show(ctx: &egui::Context, app: &mut StrataApp) {
    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::MenuBar::new().ui(ui, |ui| {
            ui.menu_button("File", |ui| {
                let save_shortcut = egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::S);
                let has_mesh = app.viewport.mesh().is_some();
                if ui.add_enabled(has_mesh, egui::Button::new("Export Mesh...").shortcut_text(ctx.format_shortcut(&save_shortcut))).clicked() {
                    ui.close();
                    export_mesh(app);
                }

                if ui.button("Export Config...").clicked() {
                    ui.close();
                    export_config(app);
                }

                ui.separator();

                let quit_shortcut = egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::Q);
                if ui.add(egui::Button::new("Quit").shortcut_text(ctx.format_shortcut(&quit_shortcut))).clicked() {
                    ui.close();
                    ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                }
            });

            ui.menu_button("Edit", |ui| {
                if ui.button("Reset Session").clicked() {
                    ui.close();
                    app.session.reset();
                    app.viewport.clear_mesh();
                    app.ui_state.add_log("Session reset".into());
                }

                if ui.button("Reset Options").clicked() {
                    ui.close();
                    if let Err(err) = app.session.on_options_changed(DynamicOptions::default()) {
                        app.ui_state.add_log(format!("ERROR: {err}"));
                    } else {
                        app.ui_state.add_log("Options reset to defaults".into());
                    }
                }
            });

            ui.menu_button("Debug", |ui| {
                if ui.button("Simulate Memory Pressure").clicked() {
                    ui.close();
                    app.session.memory_warning();
                }
            });

            ui.menu_button("Help", |ui| {
                if ui.button("About").clicked() {
                    ui.close();
                    app.ui_state.show_about = true;
                }
            });
        });

        // Keyboard shortcuts (consumed outside menus)
        if ctx.input_mut(|i| i.consume_shortcut(&egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::S))) {
            export_mesh(app);
        }
        if ctx.input_mut(|i| i.consume_shortcut(&egui::KeyboardShortcut::new(egui::Modifiers::COMMAND, egui::Key::Q))) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    });
}

fn export_mesh(app: &mut StrataApp) {
    let Some(mesh) = app.viewport.mesh().cloned() else {
        return;
    };
    std::thread::spawn(move || {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Wavefront OBJ", &["obj"])
            .set_file_name("mesh.obj")
            .save_file()
        {
            if let Err(err) = mesh.write_obj(&path) {
                tracing::error!(%err, "mesh export failed");
            }
        }
    });
}

fn export_config(app: &mut StrataApp) {
    #[derive(serde::Serialize)]
    struct ExportedConfig {
        fixed: strata_core::options::FixedOptions,
        dynamic: DynamicOptions,
    }
    let config = ExportedConfig {
        fixed: app.session.fixed_options().clone(),
        dynamic: app.session.dynamic_options(),
    };

    std::thread::spawn(move || {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("TOML", &["toml"])
            .set_file_name("strata_config.toml")
            .save_file()
        {
            if let Ok(content) = toml::to_string_pretty(&config) {
                let _ = std::fs::write(path, content);
            }
        }
    });
}
