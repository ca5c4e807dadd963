use crate::app::StrataApp;

pub fn show(ctx: &egui::Context, app: &mut StrataApp) {
    egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
        ui.add_space(2.0);

        // Colorize progress bar
        if let Some(progress) = app.ui_state.colorize_progress {
            ui.add(
                egui::ProgressBar::new(progress / 100.0)
                    .text(format!("Colorizing ({progress:.0}%)"))
                    .animate(true),
            );
        } else {
            // Invisible placeholder — same height, no animation
            ui.add(egui::ProgressBar::new(0.0).text(""));
        }

        // Log area — fixed height for 4 lines, scrollable.
        let line_height = ui.text_style_height(&egui::TextStyle::Body);
        let spacing = ui.spacing().item_spacing.y;
        let log_height = line_height * 4.0 + spacing * 3.0;

        egui::ScrollArea::vertical()
            .max_height(log_height)
            .min_scrolled_height(log_height)
            .stick_to_bottom(true)
            .show(ui, |ui| {
                if app.ui_state.log_messages.is_empty() {
                    // Reserve space for 4 empty lines to prevent layout jump.
                    for _ in 0..4 {
                        ui.label("");
                    }
                } else {
                    for msg in &app.ui_state.log_messages {
                        ui.label(msg);
                    }
                }
            });

        // Status line
        ui.horizontal(|ui| {
            ui.label(app.session.state().name());
            ui.separator();
            let v = app.session.volume_size();
            ui.label(format!("{:.2} x {:.2} x {:.2} m", v.x, v.y, v.z));
            ui.separator();
            ui.label(format!("Zoom: {:.0}%", app.viewport.viewpoint.scale() * 100.0));
            if let Some(ref message) = app.ui_state.status_message {
                ui.separator();
                ui.colored_label(egui::Color32::YELLOW, message);
            }
        });

        ui.add_space(2.0);
    });
}
