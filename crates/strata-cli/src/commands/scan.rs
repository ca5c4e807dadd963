use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use nalgebra::{Matrix4, Vector3};
use strata_core::mesh::Mesh;
use strata_core::session::{ScanSessionController, SessionEvent};
use strata_core::sim::{
    SimColorizer, SimColorizerMode, SimCubeRenderer, SimMeshRenderer, SimPixelSource, SimSensor,
    SimSlamFactory,
};
use strata_core::slam::{Keyframe, MotionSample};
use strata_core::viewpoint::ViewpointController;
use strata_core::viewport::{DisplayMode, MeshViewportController};
use strata_core::volume::VolumeSize;
use strata_core::workspace::ScanWorkspace;

use super::config::ScanConfig;
use crate::summary;

const SCREENSHOT_WIDTH: u32 = 640;
const SCREENSHOT_HEIGHT: u32 = 480;
const COLORIZE_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Args)]
pub struct ScanArgs {
    /// Output directory for scan artifacts
    #[arg(short, long, default_value = "scan-output")]
    pub output: PathBuf,

    /// Scan config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Scan volume edge length in meters
    #[arg(long, default_value = "0.5")]
    pub volume: f32,

    /// Number of simulated keyframes to capture
    #[arg(long, default_value = "12")]
    pub keyframes: usize,

    /// Skip the screenshot export
    #[arg(long)]
    pub no_screenshot: bool,
}

/// Drive a full simulated session: place the cube, scan, finalize, colorize
/// both phases, and export the artifacts.
pub fn run(args: &ScanArgs) -> Result<()> {
    let config = if let Some(ref path) = args.config {
        ScanConfig::load(path)?
    } else {
        ScanConfig::default()
    };

    let sensor = SimSensor::healthy();
    let factory = SimSlamFactory::new();
    let mut session = ScanSessionController::new(
        Box::new(sensor.clone()),
        Box::new(factory.clone()),
        Box::new(SimCubeRenderer::new()),
        Arc::new(SimColorizer::new(SimColorizerMode::Threaded)),
        config.fixed.clone(),
    );
    session.on_options_changed(config.dynamic)?;
    session.app_did_become_active();

    let volume = VolumeSize::cube(args.volume);
    session.adjust_volume_size(volume);
    summary::print_scan_summary(&config.fixed, session.volume_size(), &args.output);
    if !config.onboarding_dismissed {
        println!("Tip: pass --volume to size the scan cube, --config for full control.\n");
    }

    // The virtual camera locks onto the cube immediately.
    factory.set_pose(true, Matrix4::identity());
    if !session.enter_scanning() {
        bail!("could not start scanning");
    }

    for i in 0..args.keyframes {
        session.handle_motion(&MotionSample {
            gravity: Vector3::new(0.0, -1.0, 0.0),
            rotation_rate: Vector3::zeros(),
            timestamp: i as f64 / 30.0,
        });
        session.record_keyframe(synthetic_keyframe(i));
    }
    println!("Captured {} keyframes", session.keyframe_count());

    session.enter_viewing().context("could not finish the scan")?;
    let mesh = pump_for_mesh(&mut session)?;
    println!(
        "Scanned mesh: {} vertices, {} faces",
        mesh.num_vertices(),
        mesh.num_faces()
    );

    let mut viewport = MeshViewportController::new(
        Box::new(SimMeshRenderer::new()),
        ViewpointController::new(SCREENSHOT_WIDTH as f32, SCREENSHOT_HEIGHT as f32),
    );
    viewport
        .viewpoint
        .set_mesh_center(mesh.estimate_center(session.volume_size(), 1000));
    viewport.set_mesh(mesh.clone());

    let colored = colorize(&mut session, mesh)?;
    viewport.set_display_mode(DisplayMode::Color);
    viewport.set_mesh(colored.clone());
    viewport.draw();

    let workspace = ScanWorkspace::new(&args.output);
    workspace.ensure()?;
    colored.write_obj(&workspace.mesh_path())?;
    println!("Mesh saved to {}", workspace.mesh_path().display());

    if !args.no_screenshot {
        let source = synthetic_framebuffer(SCREENSHOT_WIDTH, SCREENSHOT_HEIGHT);
        viewport.save_screenshot(
            &source,
            SCREENSHOT_WIDTH,
            SCREENSHOT_HEIGHT,
            &workspace.screenshot_path(),
        )?;
        println!(
            "Screenshot saved to {}",
            workspace.screenshot_path().display()
        );
    }

    Ok(())
}

/// Drain session events until the finalized mesh arrives.
fn pump_for_mesh(session: &mut ScanSessionController) -> Result<Mesh> {
    for event in session.pump() {
        if let SessionEvent::MeshReady { mesh, .. } = event {
            return Ok(mesh);
        }
    }
    bail!("scan finished without producing a mesh")
}

/// Run both colorize phases with a combined progress bar.
fn colorize(session: &mut ScanSessionController, mesh: Mesh) -> Result<Mesh> {
    if !session.request_colorize(mesh) {
        bail!("a colorize task is already running");
    }

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:20} [{bar:40}] {pos}%")?
            .progress_chars("=> "),
    );
    pb.set_message("Colorizing");

    let start = Instant::now();
    loop {
        for event in session.pump() {
            match event {
                SessionEvent::ColorizeProgress { combined } => {
                    pb.set_position(combined as u64);
                }
                SessionEvent::ColorizePreviewReady { .. } => {
                    pb.set_message("Enhancing");
                }
                SessionEvent::ColorizeEnhancedReady { mesh } => {
                    pb.finish_with_message("Done");
                    return Ok(mesh);
                }
                SessionEvent::ColorizeFailed { kind, message } => {
                    pb.abandon_with_message("Failed");
                    bail!("{:?} colorize failed: {}", kind, message);
                }
                _ => {}
            }
        }
        if start.elapsed() > COLORIZE_TIMEOUT {
            pb.abandon_with_message("Timed out");
            bail!("colorize did not finish in time");
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

/// Small gradient image standing in for a captured color frame.
fn synthetic_keyframe(index: usize) -> Keyframe {
    let (width, height) = (64u32, 48u32);
    let mut color = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let r = (x * 255 / width) as u8;
            let g = (y * 255 / height) as u8;
            let b = (index * 20 % 256) as u8;
            color.push(u32::from_le_bytes([r, g, b, 255]));
        }
    }
    Keyframe {
        camera_pose: Matrix4::new_translation(&Vector3::new(0.0, 0.0, index as f32 * 0.01)),
        color,
        width,
        height,
    }
}

/// Bottom-up framebuffer with a vertical gradient, as a GL read would see it.
fn synthetic_framebuffer(width: u32, height: u32) -> SimPixelSource {
    let mut pixels = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        let v = (y * 255 / height) as u8;
        for _ in 0..width {
            pixels.push(u32::from_le_bytes([v, v, v, 255]));
        }
    }
    SimPixelSource::new(pixels, width, height)
}
