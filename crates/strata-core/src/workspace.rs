//! On-disk layout for scan outputs.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const SCREENSHOT_FILE_NAME: &str = "screenshot.jpg";
pub const MESH_FILE_NAME: &str = "mesh.obj";
pub const CONFIG_FILE_NAME: &str = "scan.toml";

/// Paths for one scan's artifacts, all under a single root directory.
#[derive(Clone, Debug)]
pub struct ScanWorkspace {
    root: PathBuf,
}

impl ScanWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the root directory if it does not exist yet.
    pub fn ensure(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// JPEG preview captured from the mesh viewer.
    pub fn screenshot_path(&self) -> PathBuf {
        self.root.join(SCREENSHOT_FILE_NAME)
    }

    /// Exported mesh geometry.
    pub fn mesh_path(&self) -> PathBuf {
        self.root.join(MESH_FILE_NAME)
    }

    /// Session options snapshot.
    pub fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE_NAME)
    }
}
