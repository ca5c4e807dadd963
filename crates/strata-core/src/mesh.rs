//! Triangle mesh handle produced by the mapper and consumed by the viewer.

use std::io::Write;
use std::path::Path;

use nalgebra::{Point3, Vector3};

use crate::error::Result;
use crate::volume::VolumeSize;

/// Geometry handed from the mapper to the viewer. Colorization replaces the
/// appearance attributes; positions and faces stay put.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    positions: Vec<Point3<f32>>,
    faces: Vec<[u32; 3]>,
    per_vertex_colors: Option<Vec<[f32; 3]>>,
    uv_coords: Option<Vec<[f32; 2]>>,
}

impl Mesh {
    pub fn new(positions: Vec<Point3<f32>>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            positions,
            faces,
            per_vertex_colors: None,
            uv_coords: None,
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    pub fn positions(&self) -> &[Point3<f32>] {
        &self.positions
    }

    pub fn faces(&self) -> &[[u32; 3]] {
        &self.faces
    }

    pub fn has_per_vertex_colors(&self) -> bool {
        self.per_vertex_colors.is_some()
    }

    pub fn has_per_vertex_uv_texture_coords(&self) -> bool {
        self.uv_coords.is_some()
    }

    pub fn per_vertex_colors(&self) -> Option<&[[f32; 3]]> {
        self.per_vertex_colors.as_deref()
    }

    /// Install per-vertex colors. Length must match the vertex count.
    pub fn set_per_vertex_colors(&mut self, colors: Vec<[f32; 3]>) {
        debug_assert_eq!(colors.len(), self.positions.len());
        self.per_vertex_colors = Some(colors);
    }

    /// Install per-vertex texture coordinates. Length must match the vertex count.
    pub fn set_uv_coords(&mut self, uvs: Vec<[f32; 2]>) {
        debug_assert_eq!(uvs.len(), self.positions.len());
        self.uv_coords = Some(uvs);
    }

    /// Estimate the mesh centroid by sampling roughly `target_samples`
    /// vertices. An empty mesh falls back to half the scan volume.
    pub fn estimate_center(&self, volume: VolumeSize, target_samples: usize) -> Point3<f32> {
        let total = self.positions.len();
        if total == 0 || target_samples == 0 {
            return Point3::new(volume.x * 0.5, volume.y * 0.5, volume.z * 0.5);
        }

        let step = (total / target_samples).max(1);
        let mut sum = Vector3::zeros();
        let mut count = 0usize;
        for p in self.positions.iter().step_by(step) {
            sum += p.coords;
            count += 1;
        }
        Point3::from(sum / count as f32)
    }

    /// Write the mesh as a Wavefront OBJ file.
    pub fn write_obj(&self, path: &Path) -> Result<()> {
        let mut out = std::io::BufWriter::new(std::fs::File::create(path)?);
        match &self.per_vertex_colors {
            Some(colors) => {
                for (p, c) in self.positions.iter().zip(colors) {
                    writeln!(
                        out,
                        "v {} {} {} {} {} {}",
                        p.x, p.y, p.z, c[0], c[1], c[2]
                    )?;
                }
            }
            None => {
                for p in &self.positions {
                    writeln!(out, "v {} {} {}", p.x, p.y, p.z)?;
                }
            }
        }
        if let Some(uvs) = &self.uv_coords {
            for uv in uvs {
                writeln!(out, "vt {} {}", uv[0], uv[1])?;
            }
        }
        for f in &self.faces {
            // OBJ indices are 1-based.
            writeln!(out, "f {} {} {}", f[0] + 1, f[1] + 1, f[2] + 1)?;
        }
        out.flush()?;
        Ok(())
    }
}
