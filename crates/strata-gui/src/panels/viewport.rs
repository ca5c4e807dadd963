use nalgebra::Vector2;

use strata_core::session::ScanState;

use crate::app::StrataApp;

pub fn show(ctx: &egui::Context, app: &mut StrataApp) {
    egui::CentralPanel::default().show(ctx, |ui| {
        let rect = ui.available_rect_before_wrap();
        paint_background(ui, rect);

        app.viewport
            .viewpoint
            .set_screen_size(rect.width(), rect.height());

        let response = ui.allocate_rect(rect, egui::Sense::click_and_drag());
        handle_orbit(ui, &response, app);
        handle_pan(ui, &response, app);
        handle_zoom(ui, &response, app);

        // Re-project when the content or the viewpoint changed.
        app.viewport.draw();

        if app.viewport.mesh().is_some() {
            if let Ok(output) = app.render_output.lock() {
                if let Some(projected) = output.as_ref() {
                    ui.painter().add(to_screen(projected, rect));
                }
            }
            draw_overlay_label(ui, rect, "Drag to orbit, right-drag to pan, scroll to zoom");
        } else {
            show_placeholder(ui, app.session.state());
        }
    });
}

fn paint_background(ui: &egui::Ui, rect: egui::Rect) {
    ui.painter()
        .rect_filled(rect, 0.0, egui::Color32::from_gray(30));
}

fn pointer_vec(pos: egui::Pos2) -> Vector2<f32> {
    Vector2::new(pos.x, pos.y)
}

fn handle_orbit(ui: &egui::Ui, response: &egui::Response, app: &mut StrataApp) {
    let viewpoint = &mut app.viewport.viewpoint;
    if response.drag_started_by(egui::PointerButton::Primary) {
        if let Some(pos) = response.interact_pointer_pos() {
            viewpoint.on_one_finger_pan_began(pointer_vec(pos));
        }
    } else if response.dragged_by(egui::PointerButton::Primary) {
        if let Some(pos) = response.interact_pointer_pos() {
            viewpoint.on_one_finger_pan_changed(pointer_vec(pos));
        }
    } else if response.drag_stopped_by(egui::PointerButton::Primary) {
        let velocity = ui.input(|i| i.pointer.velocity());
        viewpoint.on_one_finger_pan_ended(Vector2::new(velocity.x, velocity.y));
    }
}

fn handle_pan(ui: &egui::Ui, response: &egui::Response, app: &mut StrataApp) {
    let viewpoint = &mut app.viewport.viewpoint;
    if response.drag_started_by(egui::PointerButton::Secondary) {
        if let Some(pos) = response.interact_pointer_pos() {
            viewpoint.on_two_fingers_pan_began(pointer_vec(pos));
        }
    } else if response.dragged_by(egui::PointerButton::Secondary) {
        if let Some(pos) = response.interact_pointer_pos() {
            viewpoint.on_two_fingers_pan_changed(pointer_vec(pos));
        }
    } else if response.drag_stopped_by(egui::PointerButton::Secondary) {
        let velocity = ui.input(|i| i.pointer.velocity());
        viewpoint.on_two_fingers_pan_ended(Vector2::new(velocity.x, velocity.y));
    }
}

fn handle_zoom(ui: &egui::Ui, response: &egui::Response, app: &mut StrataApp) {
    if !response.hovered() {
        return;
    }
    let scroll_delta = ui.input(|i| i.smooth_scroll_delta.y);
    let zoom_delta = ui.input(|i| i.zoom_delta());
    let factor = if zoom_delta != 1.0 {
        zoom_delta
    } else if scroll_delta != 0.0 {
        (scroll_delta * 0.005).exp()
    } else {
        return;
    };

    match app.session.state() {
        // During placement the pinch resizes the scan volume.
        ScanState::CubePlacement => {
            app.session.pinch_began(1.0);
            app.session.pinch_changed(factor);
        }
        // Otherwise it zooms the viewer.
        _ => {
            let viewpoint = &mut app.viewport.viewpoint;
            viewpoint.on_pinch_gesture_began(1.0);
            viewpoint.on_pinch_gesture_changed(factor);
        }
    }
}

/// Map the renderer's normalized device coordinates into the panel rect.
fn to_screen(projected: &egui::epaint::Mesh, rect: egui::Rect) -> egui::epaint::Mesh {
    let scale = 0.5 * rect.width().min(rect.height());
    let center = rect.center();
    let mut mesh = projected.clone();
    for vertex in &mut mesh.vertices {
        vertex.pos = egui::pos2(
            center.x + vertex.pos.x * scale,
            center.y + vertex.pos.y * scale,
        );
    }
    mesh
}

fn draw_overlay_label(ui: &egui::Ui, rect: egui::Rect, label: &str) {
    let label_pos = rect.left_top() + egui::vec2(8.0, 8.0);
    ui.painter().text(
        label_pos,
        egui::Align2::LEFT_TOP,
        label,
        egui::FontId::proportional(14.0),
        egui::Color32::from_white_alpha(200),
    );
}

fn show_placeholder(ui: &mut egui::Ui, state: ScanState) {
    let message = match state {
        ScanState::CubePlacement => "Size the volume, then start scanning",
        ScanState::Scanning => "Scanning... press Done to finish",
        ScanState::Viewing => "No mesh captured",
    };
    ui.centered_and_justified(|ui| {
        ui.label(
            egui::RichText::new(message)
                .size(18.0)
                .color(egui::Color32::from_gray(100)),
        );
    });
}
