//! Software mesh renderer painting into egui.
//!
//! Projects the mesh with the viewpoint's matrices and emits an
//! `epaint::Mesh` in normalized device coordinates; the viewport panel maps
//! that into its screen rect each frame. Flat shading with a painter's-sort
//! is plenty for scan-sized meshes and keeps the viewer free of GPU state.

use std::sync::{Arc, Mutex};

use egui::epaint;
use nalgebra::{Matrix4, Point3, Vector3};

use strata_core::mesh::Mesh;
use strata_core::viewport::{MeshRenderer, RenderingMode};

/// Light direction in view space, pointing toward the camera.
const LIGHT_DIR: Vector3<f32> = Vector3::new(0.3, 0.5, 0.81);

/// Projected triangles shared between the renderer and the viewport panel.
pub type RenderOutput = Arc<Mutex<Option<epaint::Mesh>>>;

pub struct PainterMeshRenderer {
    mesh: Option<Mesh>,
    mode: RenderingMode,
    output: RenderOutput,
}

impl PainterMeshRenderer {
    pub fn new() -> Self {
        Self {
            mesh: None,
            mode: RenderingMode::LightedGray,
            output: Arc::new(Mutex::new(None)),
        }
    }

    /// Handle the panel keeps for painting the latest projection.
    pub fn output(&self) -> RenderOutput {
        Arc::clone(&self.output)
    }
}

impl Default for PainterMeshRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshRenderer for PainterMeshRenderer {
    fn upload_mesh(&mut self, mesh: &Mesh) {
        self.mesh = Some(mesh.clone());
    }

    fn set_rendering_mode(&mut self, mode: RenderingMode) {
        self.mode = mode;
    }

    fn render(&mut self, projection: &Matrix4<f32>, model_view: &Matrix4<f32>) {
        let Some(mesh) = &self.mesh else { return };
        let painted = project_mesh(mesh, self.mode, projection, model_view);
        if let Ok(mut output) = self.output.lock() {
            *output = Some(painted);
        }
    }

    fn clear(&mut self) {
        if let Ok(mut output) = self.output.lock() {
            *output = None;
        }
    }
}

fn project_mesh(
    mesh: &Mesh,
    mode: RenderingMode,
    projection: &Matrix4<f32>,
    model_view: &Matrix4<f32>,
) -> epaint::Mesh {
    let mvp = projection * model_view;
    let positions = mesh.positions();

    // View-space positions for shading and depth, clip-space for layout.
    let view_points: Vec<Point3<f32>> = positions
        .iter()
        .map(|p| model_view.transform_point(p))
        .collect();
    let ndc: Vec<Point3<f32>> = positions.iter().map(|p| mvp.transform_point(p)).collect();

    // Painter's algorithm: far faces first.
    let mut order: Vec<usize> = (0..mesh.num_faces()).collect();
    let depth = |face: &[u32; 3]| -> f32 {
        face.iter().map(|&i| view_points[i as usize].z).sum::<f32>() / 3.0
    };
    let faces = mesh.faces();
    order.sort_by(|&a, &b| {
        depth(&faces[a])
            .partial_cmp(&depth(&faces[b]))
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let colors = mesh.per_vertex_colors();
    let mut out = epaint::Mesh::default();
    for &face_index in &order {
        let face = faces[face_index];
        let [i0, i1, i2] = [face[0] as usize, face[1] as usize, face[2] as usize];

        let shade = face_shade(&view_points[i0], &view_points[i1], &view_points[i2]);
        let base = out.vertices.len() as u32;
        for &i in &[i0, i1, i2] {
            let color = vertex_color(mode, shade, colors.map(|c| c[i]));
            out.vertices.push(epaint::Vertex {
                // NDC y grows upward; screen y grows downward.
                pos: egui::pos2(ndc[i].x, -ndc[i].y),
                uv: epaint::WHITE_UV,
                color,
            });
        }
        out.indices.extend_from_slice(&[base, base + 1, base + 2]);
    }
    out
}

/// Lambert term from the face normal in view space.
fn face_shade(a: &Point3<f32>, b: &Point3<f32>, c: &Point3<f32>) -> f32 {
    let normal = (b - a).cross(&(c - a));
    let len = normal.norm();
    if len <= f32::EPSILON {
        return 0.5;
    }
    let lambert = (normal / len).dot(&LIGHT_DIR.normalize()).abs();
    0.25 + 0.75 * lambert
}

fn vertex_color(mode: RenderingMode, shade: f32, vertex_rgb: Option<[f32; 3]>) -> epaint::Color32 {
    match mode {
        RenderingMode::XRay => epaint::Color32::from_rgba_unmultiplied(140, 190, 255, 40),
        RenderingMode::LightedGray => {
            let v = (200.0 * shade) as u8;
            epaint::Color32::from_rgb(v, v, v)
        }
        // The software painter has no texture sampling; textured meshes fall
        // back to their vertex colors.
        RenderingMode::PerVertexColor | RenderingMode::Textured => match vertex_rgb {
            Some([r, g, b]) => epaint::Color32::from_rgb(
                (255.0 * r * shade) as u8,
                (255.0 * g * shade) as u8,
                (255.0 * b * shade) as u8,
            ),
            None => {
                let v = (200.0 * shade) as u8;
                epaint::Color32::from_rgb(v, v, v)
            }
        },
    }
}
