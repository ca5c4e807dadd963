use nalgebra::{Matrix4, Vector3};

use strata_core::session::{ScanSessionController, ScanState, SessionEvent};
use strata_core::sim::{SimColorizer, SimColorizerMode, SimCubeRenderer, SimSensor, SimSlamFactory};
use strata_core::slam::{Keyframe, MotionSample};
use strata_core::viewpoint::ViewpointController;
use strata_core::viewport::MeshViewportController;

use crate::panels;
use crate::renderer::{PainterMeshRenderer, RenderOutput};
use crate::state::UIState;

/// Record a keyframe every this many scanning frames.
const KEYFRAME_INTERVAL: u64 = 10;

pub struct StrataApp {
    pub session: ScanSessionController,
    /// Shared handles into the simulated stack, for scripting and probes.
    pub factory: SimSlamFactory,
    pub sensor: SimSensor,

    pub viewport: MeshViewportController,
    pub render_output: RenderOutput,
    pub ui_state: UIState,

    frames_seen: u64,
}

impl StrataApp {
    pub fn new() -> Self {
        let sensor = SimSensor::healthy();
        let factory = SimSlamFactory::new();
        let mut session = ScanSessionController::new(
            Box::new(sensor.clone()),
            Box::new(factory.clone()),
            Box::new(SimCubeRenderer::new()),
            std::sync::Arc::new(SimColorizer::new(SimColorizerMode::Threaded)),
            Default::default(),
        );
        session.app_did_become_active();
        // The simulated camera locks onto the cube right away.
        factory.set_pose(true, Matrix4::identity());

        let renderer = PainterMeshRenderer::new();
        let render_output = renderer.output();
        let mut viewport = MeshViewportController::new(
            Box::new(renderer),
            ViewpointController::new(1280.0, 800.0),
        );
        viewport
            .viewpoint
            .set_camera_projection(Matrix4::new_perspective(1280.0 / 800.0, 1.0, 0.01, 100.0));

        let volume_edge = session.volume_size().x;
        Self {
            session,
            factory,
            sensor,
            viewport,
            render_output,
            ui_state: UIState::new(volume_edge),
            frames_seen: 0,
        }
    }

    /// Drain all pending session events.
    fn poll_session(&mut self, ctx: &egui::Context) {
        for event in self.session.pump() {
            match event {
                SessionEvent::StateChanged { state } => {
                    self.ui_state.add_log(format!("State: {}", state.name()));
                }
                SessionEvent::VolumeChanged { volume } => {
                    self.ui_state.volume_edge = volume.x;
                }
                SessionEvent::StatusMessage { message } => {
                    self.ui_state.status_message = message;
                }
                SessionEvent::TrackingLost { message } => {
                    self.ui_state.add_log(format!("Tracking lost: {message}"));
                }
                SessionEvent::TrackingRecovered => {
                    self.ui_state.add_log("Tracking recovered".into());
                }
                SessionEvent::MeshReady { mesh, center } => {
                    self.ui_state.add_log(format!(
                        "Scan complete: {} vertices, {} faces",
                        mesh.num_vertices(),
                        mesh.num_faces()
                    ));
                    self.viewport.viewpoint.set_mesh_center(center);
                    self.viewport.set_mesh(mesh);
                }
                SessionEvent::ColorizeProgress { combined } => {
                    self.ui_state.colorize_progress = Some(combined);
                    ctx.request_repaint();
                }
                SessionEvent::ColorizePreviewReady { mesh } => {
                    self.ui_state.add_log("Preview colors ready".into());
                    self.viewport.set_mesh(mesh);
                }
                SessionEvent::ColorizeEnhancedStarted => {
                    self.ui_state.add_log("Enhancing colors...".into());
                }
                SessionEvent::ColorizeEnhancedReady { mesh } => {
                    self.ui_state.colorize_progress = None;
                    self.ui_state.add_log("Enhanced colors ready".into());
                    self.viewport.set_mesh(mesh);
                }
                SessionEvent::ColorizeFailed { kind, message } => {
                    self.ui_state.colorize_progress = None;
                    self.ui_state
                        .add_log(format!("ERROR: {kind:?} colorize failed: {message}"));
                }
                SessionEvent::MemoryWarning { message } => {
                    self.ui_state.memory_warning = Some(message.to_string());
                }
            }
        }
    }

    /// Feed the simulated sensor stream while it is being consumed.
    fn advance_simulation(&mut self) {
        if !self.session.current_state_needs_sensor() {
            return;
        }
        self.frames_seen += 1;
        self.session.handle_motion(&MotionSample {
            gravity: Vector3::new(0.0, -1.0, 0.0),
            rotation_rate: Vector3::zeros(),
            timestamp: self.frames_seen as f64 / 60.0,
        });
        if self.session.state() == ScanState::Scanning
            && self.frames_seen % KEYFRAME_INTERVAL == 0
        {
            self.session.record_keyframe(synthetic_keyframe(self.frames_seen));
        }
    }

    /// Kick off colorization of the currently viewed mesh.
    pub fn start_colorize(&mut self) {
        let Some(mesh) = self.viewport.mesh().cloned() else {
            self.ui_state.add_log("No mesh to colorize".into());
            return;
        };
        if !self.session.request_colorize(mesh) {
            self.ui_state.add_log("Colorize already running".into());
        }
    }

    /// Close the viewer and start a fresh scan session.
    pub fn new_scan(&mut self) {
        self.session.viewer_will_dismiss();
        self.session.viewer_did_dismiss();
        self.viewport.clear_mesh();
        self.viewport.viewpoint.reset();
        self.ui_state.colorize_progress = None;
    }
}

impl eframe::App for StrataApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_session(ctx);
        self.advance_simulation();

        panels::menu_bar::show(ctx, self);
        panels::status::show(ctx, self);
        panels::controls::show(ctx, self);
        panels::viewport::show(ctx, self);

        // Memory warning dialog; one at a time, acknowledged explicitly.
        if let Some(message) = self.ui_state.memory_warning.clone() {
            egui::Window::new("Memory Warning")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(&message);
                    ui.add_space(8.0);
                    if ui.button("OK").clicked() {
                        self.ui_state.memory_warning = None;
                        self.session.acknowledge_memory_warning();
                    }
                });
        }

        if self.ui_state.show_about {
            egui::Window::new("About Strata")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.heading("Strata");
                        ui.label("Interactive 3D Scanning");
                        ui.add_space(8.0);
                        ui.label(format!("Version {}", env!("CARGO_PKG_VERSION")));
                        ui.add_space(8.0);
                        if ui.button("Close").clicked() {
                            self.ui_state.show_about = false;
                        }
                    });
                });
        }

        // Keep animating while the mesh coasts or work is in flight.
        if self.viewport.viewpoint.has_inertia()
            || self.session.colorize_in_flight()
            || self.session.current_state_needs_sensor()
        {
            ctx.request_repaint();
        }
    }
}

fn synthetic_keyframe(index: u64) -> Keyframe {
    let (width, height) = (64u32, 48u32);
    let mut color = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let r = (x * 255 / width) as u8;
            let g = (y * 255 / height) as u8;
            color.push(u32::from_le_bytes([r, g, (index % 256) as u8, 255]));
        }
    }
    Keyframe {
        camera_pose: Matrix4::new_translation(&Vector3::new(0.0, 0.0, index as f32 * 0.005)),
        color,
        width,
        height,
    }
}
