//! Mesh viewer: per-frame render decision, render-mode selection, and
//! screenshot export from a bottom-up framebuffer read.

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use tracing::debug;

use crate::error::Result;
use crate::mesh::Mesh;
use crate::viewpoint::ViewpointController;

/// Concrete shading mode sent to the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderingMode {
    XRay,
    LightedGray,
    PerVertexColor,
    Textured,
}

/// What the user picked on the display selector. `Color` resolves to the
/// best mode the mesh attributes allow.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayMode {
    XRay,
    LightedGray,
    Color,
}

/// Low-level rendering backend for the mesh viewer.
pub trait MeshRenderer: Send {
    fn upload_mesh(&mut self, mesh: &Mesh);
    fn set_rendering_mode(&mut self, mode: RenderingMode);
    fn render(&mut self, projection: &nalgebra::Matrix4<f32>, model_view: &nalgebra::Matrix4<f32>);
    fn clear(&mut self);
}

/// Pixel-read primitive over the rendering surface. Rows are delivered
/// bottom-up, matching a GL framebuffer read.
pub trait PixelSource {
    /// Read a `width` x `height` RGBA block starting at (`x`, `y`) into
    /// `out`, row-major. `y` counts from the bottom of the surface.
    fn read_pixels(&self, x: u32, y: u32, width: u32, height: u32, out: &mut [u32]);
}

/// Read the full surface once, then exchange row `h` with row
/// `height - 1 - h` in place so the buffer comes out top-down. An odd
/// height leaves the middle row alone, which is already correct.
pub fn read_flipped_rgba(source: &dyn PixelSource, width: u32, height: u32) -> Vec<u32> {
    let w = width as usize;
    let mut buffer = vec![0u32; w * height as usize];
    source.read_pixels(0, 0, width, height, &mut buffer);

    let mut row = vec![0u32; w];
    for h in 0..(height as usize) / 2 {
        let top = h * w;
        let bottom = (height as usize - 1 - h) * w;
        row.copy_from_slice(&buffer[top..top + w]);
        buffer.copy_within(bottom..bottom + w, top);
        buffer[bottom..bottom + w].copy_from_slice(&row);
    }
    buffer
}

/// Encode a top-down RGBA buffer as a JPEG file. Each `u32` holds one pixel
/// as little-endian `[r, g, b, a]` bytes; the alpha channel is dropped.
pub fn save_jpeg_from_rgba(path: &Path, buffer: &[u32], width: u32, height: u32) -> Result<()> {
    let mut rgb = Vec::with_capacity(buffer.len() * 3);
    for px in buffer {
        let [r, g, b, _a] = px.to_le_bytes();
        rgb.extend_from_slice(&[r, g, b]);
    }
    let img = image::RgbImage::from_raw(width, height, rgb)
        .ok_or(crate::error::StrataError::InvalidDimensions { width, height })?;
    let file = std::fs::File::create(path)?;
    let encoder = JpegEncoder::new_with_quality(std::io::BufWriter::new(file), 90);
    img.write_with_encoder(encoder)?;
    Ok(())
}

/// Request the viewport cannot satisfy on its own.
#[derive(Debug)]
pub enum ViewportRequest {
    /// Color display was selected but the mesh carries no appearance
    /// attributes yet; the session should start colorization.
    Colorize { mesh: Mesh },
}

/// Drives the mesh viewer frame loop: skips rendering when neither the
/// content nor the viewpoint changed, and owns the display-mode logic.
pub struct MeshViewportController {
    renderer: Box<dyn MeshRenderer>,
    pub viewpoint: ViewpointController,
    mesh: Option<Mesh>,
    display_mode: DisplayMode,
    needs_display: bool,
}

impl MeshViewportController {
    pub fn new(renderer: Box<dyn MeshRenderer>, viewpoint: ViewpointController) -> Self {
        let mut controller = Self {
            renderer,
            viewpoint,
            mesh: None,
            display_mode: DisplayMode::LightedGray,
            needs_display: false,
        };
        controller
            .renderer
            .set_rendering_mode(RenderingMode::LightedGray);
        controller
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        self.mesh.as_ref()
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    pub fn needs_display(&self) -> bool {
        self.needs_display
    }

    /// Upload a new (or recolorized) mesh and force a redraw.
    pub fn set_mesh(&mut self, mesh: Mesh) {
        self.renderer.upload_mesh(&mesh);
        self.mesh = Some(mesh);
        self.try_switch_to_color_rendering_mode();
        self.needs_display = true;
    }

    pub fn clear_mesh(&mut self) {
        self.mesh = None;
        self.needs_display = false;
    }

    pub fn mark_dirty(&mut self) {
        self.needs_display = true;
    }

    /// When color display is active, pick the richest mode the mesh
    /// supports: textured, then per-vertex color, then lighted gray.
    fn try_switch_to_color_rendering_mode(&mut self) {
        if self.display_mode != DisplayMode::Color {
            return;
        }
        let Some(mesh) = &self.mesh else { return };
        let mode = if mesh.has_per_vertex_uv_texture_coords() {
            RenderingMode::Textured
        } else if mesh.has_per_vertex_colors() {
            RenderingMode::PerVertexColor
        } else {
            RenderingMode::LightedGray
        };
        self.renderer.set_rendering_mode(mode);
    }

    /// Handle a display-selector change. May ask the session to colorize
    /// when color was requested but the mesh has no appearance attributes.
    pub fn set_display_mode(&mut self, mode: DisplayMode) -> Option<ViewportRequest> {
        self.display_mode = mode;
        self.needs_display = true;
        match mode {
            DisplayMode::XRay => {
                self.renderer.set_rendering_mode(RenderingMode::XRay);
                None
            }
            DisplayMode::LightedGray => {
                self.renderer.set_rendering_mode(RenderingMode::LightedGray);
                None
            }
            DisplayMode::Color => {
                self.try_switch_to_color_rendering_mode();
                let needs_colorize = self.mesh.as_ref().is_some_and(|m| {
                    !m.has_per_vertex_colors() && !m.has_per_vertex_uv_texture_coords()
                });
                if needs_colorize {
                    debug!("color display requested on an uncolorized mesh");
                    self.mesh
                        .clone()
                        .map(|mesh| ViewportRequest::Colorize { mesh })
                } else {
                    None
                }
            }
        }
    }

    /// One frame tick. Renders only when the content is dirty or the
    /// viewpoint moved; returns whether a render happened.
    pub fn draw(&mut self) -> bool {
        let viewpoint_changed = self.viewpoint.update();
        if !self.needs_display && !viewpoint_changed {
            return false;
        }

        let projection = self.viewpoint.current_projection_matrix();
        let model_view = self.viewpoint.current_model_view_matrix();
        self.renderer.clear();
        self.renderer.render(&projection, &model_view);
        self.needs_display = false;
        true
    }

    /// Capture the current viewpoint as a top-down RGBA buffer.
    pub fn screenshot(&self, source: &dyn PixelSource, width: u32, height: u32) -> Vec<u32> {
        read_flipped_rgba(source, width, height)
    }

    /// Capture and write a JPEG preview of the current viewpoint.
    pub fn save_screenshot(
        &self,
        source: &dyn PixelSource,
        width: u32,
        height: u32,
        path: &Path,
    ) -> Result<()> {
        let buffer = self.screenshot(source, width, height);
        save_jpeg_from_rgba(path, &buffer, width, height)
    }
}
