//! Simulated collaborators.
//!
//! In-memory stand-ins for the sensor/tracking/mapping hardware stack, used
//! by the command-line demo and the test suites. They honor the trait
//! contracts (streaming state, pose validity, the scene mesh lock, the
//! keyframe cap) without any real sensor attached.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use nalgebra::{Matrix4, Point3};
use rayon::prelude::*;
use tracing::debug;

use crate::colorize::{ColorizeKind, ColorizeOptions, Colorizer, TaskSender};
use crate::mesh::Mesh;
use crate::options::DynamicOptions;
use crate::slam::{
    CubeRenderer, Keyframe, KeyframeManager, Mapper, MotionSample, PoseEstimate, PoseInitializer,
    Scene, SensorStatus, SensorStream, SlamFactory, Tracker,
};
use crate::viewport::{MeshRenderer, PixelSource, RenderingMode};
use crate::volume::VolumeSize;

// ---------------------------------------------------------------------------
// Sensor
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct SensorState {
    status: SensorStatus,
    high_res_color: bool,
    streaming: bool,
    color_capturing: bool,
    exposure_locked: bool,
    connect_calls: usize,
}

/// Sensor double with scriptable health. Clones share the same state, so a
/// clone kept outside the session can change the status or observe what the
/// session did to the sensor.
#[derive(Clone)]
pub struct SimSensor {
    state: Arc<Mutex<SensorState>>,
}

impl SimSensor {
    /// A connected, charged sensor.
    pub fn healthy() -> Self {
        Self::with_status(SensorStatus::Ok)
    }

    pub fn with_status(status: SensorStatus) -> Self {
        Self {
            state: Arc::new(Mutex::new(SensorState {
                status,
                high_res_color: false,
                streaming: false,
                color_capturing: false,
                exposure_locked: false,
                connect_calls: 0,
            })),
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut SensorState) -> T) -> Option<T> {
        self.state.lock().ok().map(|mut s| f(&mut s))
    }

    pub fn set_high_res_color(&self, supported: bool) {
        self.with_state(|s| s.high_res_color = supported);
    }

    pub fn set_status(&self, status: SensorStatus) {
        self.with_state(|s| s.status = status);
    }

    pub fn is_streaming(&self) -> bool {
        self.with_state(|s| s.streaming).unwrap_or(false)
    }

    pub fn is_color_capturing(&self) -> bool {
        self.with_state(|s| s.color_capturing).unwrap_or(false)
    }

    pub fn is_exposure_locked(&self) -> bool {
        self.with_state(|s| s.exposure_locked).unwrap_or(false)
    }

    pub fn connect_calls(&self) -> usize {
        self.with_state(|s| s.connect_calls).unwrap_or(0)
    }
}

impl SensorStream for SimSensor {
    fn connect_and_start_streaming(&mut self) -> bool {
        self.with_state(|s| {
            s.connect_calls += 1;
            if s.status == SensorStatus::Ok {
                s.streaming = true;
                s.color_capturing = true;
                true
            } else {
                false
            }
        })
        .unwrap_or(false)
    }

    fn stop_streaming(&mut self) {
        self.with_state(|s| s.streaming = false);
    }

    fn status(&self) -> SensorStatus {
        self.with_state(|s| s.status).unwrap_or(SensorStatus::NeedsConnect)
    }

    fn supports_high_res_color(&self) -> bool {
        self.with_state(|s| s.high_res_color).unwrap_or(false)
    }

    fn start_color_capture(&mut self) {
        self.with_state(|s| s.color_capturing = true);
    }

    fn stop_color_capture(&mut self) {
        self.with_state(|s| s.color_capturing = false);
    }

    fn set_exposure_locked(&mut self, locked: bool) {
        self.with_state(|s| s.exposure_locked = locked);
    }
}

// ---------------------------------------------------------------------------
// Pose / tracking / mapping
// ---------------------------------------------------------------------------

struct SimPoseInitializer {
    shared: Arc<Mutex<PoseEstimate>>,
    volume: VolumeSize,
}

impl PoseInitializer for SimPoseInitializer {
    fn set_volume_size(&mut self, volume: VolumeSize) {
        self.volume = volume;
    }

    fn last_output(&self) -> PoseEstimate {
        self.shared
            .lock()
            .map(|p| *p)
            .unwrap_or_default()
    }
}

struct SimTracker {
    initial_pose: Matrix4<f32>,
    motion_samples: usize,
}

impl Tracker for SimTracker {
    fn set_initial_camera_pose(&mut self, pose: Matrix4<f32>) {
        self.initial_pose = pose;
    }

    fn update_camera_pose(&mut self, _motion: &MotionSample) {
        self.motion_samples += 1;
    }

    fn reset(&mut self) {
        self.initial_pose = Matrix4::identity();
        self.motion_samples = 0;
    }
}

/// Writes a synthetic box mesh, sized to the scan volume, into the scene.
struct SimMapper {
    scene_mesh: Arc<Mutex<Mesh>>,
    volume: VolumeSize,
}

impl Mapper for SimMapper {
    fn finalize_triangle_mesh(&mut self) {
        let mesh = box_mesh(self.volume);
        if let Ok(mut shared) = self.scene_mesh.lock() {
            *shared = mesh;
        }
    }

    fn reset(&mut self) {
        if let Ok(mut shared) = self.scene_mesh.lock() {
            *shared = Mesh::default();
        }
    }
}

/// Axis-aligned box centered at half the volume extents, 8 vertices and
/// 12 triangles. Enough geometry to exercise the viewer and colorizer.
pub fn box_mesh(volume: VolumeSize) -> Mesh {
    let (x, y, z) = (volume.x, volume.y, volume.z);
    let positions = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(x, 0.0, 0.0),
        Point3::new(x, y, 0.0),
        Point3::new(0.0, y, 0.0),
        Point3::new(0.0, 0.0, z),
        Point3::new(x, 0.0, z),
        Point3::new(x, y, z),
        Point3::new(0.0, y, z),
    ];
    let faces = vec![
        [0, 2, 1],
        [0, 3, 2],
        [4, 5, 6],
        [4, 6, 7],
        [0, 1, 5],
        [0, 5, 4],
        [2, 3, 7],
        [2, 7, 6],
        [1, 2, 6],
        [1, 6, 5],
        [3, 0, 4],
        [3, 4, 7],
    ];
    Mesh::new(positions, faces)
}

struct SimScene {
    mesh: Arc<Mutex<Mesh>>,
}

impl Scene for SimScene {
    fn with_locked_mesh(&self, f: &mut dyn FnMut(&Mesh)) {
        if let Ok(mesh) = self.mesh.lock() {
            f(&mesh);
        }
    }
}

struct SimKeyframeManager {
    frames: Vec<Keyframe>,
    max_key_frames: usize,
}

impl KeyframeManager for SimKeyframeManager {
    fn add_key_frame(&mut self, frame: Keyframe) {
        if self.frames.len() < self.max_key_frames {
            self.frames.push(frame);
        }
    }

    fn get_key_frames(&self) -> Vec<Keyframe> {
        self.frames.clone()
    }

    fn clear(&mut self) {
        self.frames.clear();
    }

    fn len(&self) -> usize {
        self.frames.len()
    }
}

/// Records the last volume the session pushed at it.
#[derive(Default)]
pub struct SimCubeRenderer {
    last_volume: Arc<Mutex<Option<VolumeSize>>>,
}

impl SimCubeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle for observing volume updates from outside the session.
    pub fn volume_probe(&self) -> Arc<Mutex<Option<VolumeSize>>> {
        Arc::clone(&self.last_volume)
    }
}

impl CubeRenderer for SimCubeRenderer {
    fn adjust_cube_size(&mut self, volume: VolumeSize) {
        if let Ok(mut last) = self.last_volume.lock() {
            *last = Some(volume);
        }
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Builds the simulated stack. The factory keeps shared handles to the pose
/// estimate and the scene mesh so demos and tests can script pose validity
/// and observe the mapped mesh. Clones share those handles, so keep a clone
/// around to script a factory that has been handed to a session.
#[derive(Clone)]
pub struct SimSlamFactory {
    pose: Arc<Mutex<PoseEstimate>>,
    scene_mesh: Arc<Mutex<Mesh>>,
}

impl SimSlamFactory {
    pub fn new() -> Self {
        Self {
            pose: Arc::new(Mutex::new(PoseEstimate::default())),
            scene_mesh: Arc::new(Mutex::new(Mesh::default())),
        }
    }

    /// Script the initializer output. Demos call this once the virtual
    /// camera "sees" the cube.
    pub fn set_pose(&self, has_valid_pose: bool, camera_pose: Matrix4<f32>) {
        if let Ok(mut pose) = self.pose.lock() {
            *pose = PoseEstimate {
                has_valid_pose,
                camera_pose,
            };
        }
    }

    pub fn scene_mesh(&self) -> Arc<Mutex<Mesh>> {
        Arc::clone(&self.scene_mesh)
    }
}

impl Default for SimSlamFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl SlamFactory for SimSlamFactory {
    fn make_tracker(&self, options: &DynamicOptions) -> Box<dyn Tracker> {
        debug!(new_tracker = options.new_tracker_is_on, "building tracker");
        Box::new(SimTracker {
            initial_pose: Matrix4::identity(),
            motion_samples: 0,
        })
    }

    fn make_mapper(&self, options: &DynamicOptions, volume: VolumeSize) -> Box<dyn Mapper> {
        debug!(
            new_mapper = options.new_mapper_is_on,
            high_res = options.high_res_mapping,
            ?volume,
            "building mapper"
        );
        Box::new(SimMapper {
            scene_mesh: Arc::clone(&self.scene_mesh),
            volume,
        })
    }

    fn make_pose_initializer(&self) -> Box<dyn PoseInitializer> {
        Box::new(SimPoseInitializer {
            shared: Arc::clone(&self.pose),
            volume: VolumeSize::default(),
        })
    }

    fn make_scene(&self) -> Box<dyn Scene> {
        Box::new(SimScene {
            mesh: Arc::clone(&self.scene_mesh),
        })
    }

    fn make_keyframe_manager(&self, max_key_frames: usize) -> Box<dyn KeyframeManager> {
        Box::new(SimKeyframeManager {
            frames: Vec::new(),
            max_key_frames,
        })
    }
}

// ---------------------------------------------------------------------------
// Colorizer
// ---------------------------------------------------------------------------

/// Where the simulated colorize work runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimColorizerMode {
    /// Run the task to completion inside `start_task`. Deterministic; used
    /// by tests and the CLI demo.
    Inline,
    /// Run on a spawned worker thread, like a production colorizer would.
    Threaded,
}

/// Colorizer double: paints vertices by normalized position within the mesh
/// bounding box. The enhanced pass additionally decimates toward the target
/// face count and attaches planar texture coordinates.
pub struct SimColorizer {
    mode: SimColorizerMode,
}

impl SimColorizer {
    pub fn new(mode: SimColorizerMode) -> Self {
        Self { mode }
    }

    fn run(kind: ColorizeKind, mut mesh: Mesh, options: &ColorizeOptions, sender: TaskSender) {
        sender.progress(0.5);
        if sender.is_cancelled() {
            return;
        }

        let colors = position_colors(&mesh);
        mesh.set_per_vertex_colors(colors);

        if kind == ColorizeKind::Enhanced {
            decimate_faces(&mut mesh, options.target_num_faces);
            let uvs = planar_uvs(&mesh);
            mesh.set_uv_coords(uvs);
        }

        sender.progress(1.0);
        sender.finish(Ok(mesh));
    }
}

impl Colorizer for SimColorizer {
    fn start_task(
        &self,
        kind: ColorizeKind,
        mesh: Mesh,
        _keyframes: Vec<Keyframe>,
        options: &ColorizeOptions,
        sender: TaskSender,
    ) {
        match self.mode {
            SimColorizerMode::Inline => Self::run(kind, mesh, options, sender),
            SimColorizerMode::Threaded => {
                let options = options.clone();
                thread::spawn(move || Self::run(kind, mesh, &options, sender));
            }
        }
    }
}

/// Map each vertex position into the mesh bounding box and use the
/// normalized coordinates as an RGB triple.
fn position_colors(mesh: &Mesh) -> Vec<[f32; 3]> {
    let positions = mesh.positions();
    if positions.is_empty() {
        return Vec::new();
    }

    let mut min = positions[0];
    let mut max = positions[0];
    for p in positions {
        min = Point3::new(min.x.min(p.x), min.y.min(p.y), min.z.min(p.z));
        max = Point3::new(max.x.max(p.x), max.y.max(p.y), max.z.max(p.z));
    }
    let extent = max - min;
    let normalize = move |v: f32, lo: f32, range: f32| {
        if range > f32::EPSILON {
            (v - lo) / range
        } else {
            0.5
        }
    };

    positions
        .par_iter()
        .map(|p| {
            [
                normalize(p.x, min.x, extent.x),
                normalize(p.y, min.y, extent.y),
                normalize(p.z, min.z, extent.z),
            ]
        })
        .collect()
}

/// Keep roughly `target` faces by dropping every k-th face. Vertices are
/// left in place; dangling vertices are harmless for the simulated viewer.
fn decimate_faces(mesh: &mut Mesh, target: usize) {
    let total = mesh.num_faces();
    if target == 0 || total <= target {
        return;
    }
    let step = total.div_ceil(target);
    let faces: Vec<[u32; 3]> = mesh.faces().iter().step_by(step).copied().collect();
    let positions = mesh.positions().to_vec();
    let colors = mesh.per_vertex_colors().map(|c| c.to_vec());
    let mut out = Mesh::new(positions, faces);
    if let Some(colors) = colors {
        out.set_per_vertex_colors(colors);
    }
    *mesh = out;
}

/// Planar XY projection of each vertex into [0, 1]^2.
fn planar_uvs(mesh: &Mesh) -> Vec<[f32; 2]> {
    position_colors(mesh)
        .into_iter()
        .map(|c| [c[0], c[1]])
        .collect()
}

// ---------------------------------------------------------------------------
// Viewer doubles
// ---------------------------------------------------------------------------

/// Renderer double that counts draw calls and remembers the last mode.
pub struct SimMeshRenderer {
    mode: RenderingMode,
    uploaded_vertices: usize,
    render_count: Arc<Mutex<usize>>,
    mode_probe: Arc<Mutex<RenderingMode>>,
}

impl SimMeshRenderer {
    pub fn new() -> Self {
        Self {
            mode: RenderingMode::LightedGray,
            uploaded_vertices: 0,
            render_count: Arc::new(Mutex::new(0)),
            mode_probe: Arc::new(Mutex::new(RenderingMode::LightedGray)),
        }
    }

    pub fn render_count_probe(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.render_count)
    }

    pub fn mode_probe(&self) -> Arc<Mutex<RenderingMode>> {
        Arc::clone(&self.mode_probe)
    }
}

impl Default for SimMeshRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshRenderer for SimMeshRenderer {
    fn upload_mesh(&mut self, mesh: &Mesh) {
        self.uploaded_vertices = mesh.num_vertices();
    }

    fn set_rendering_mode(&mut self, mode: RenderingMode) {
        self.mode = mode;
        if let Ok(mut probe) = self.mode_probe.lock() {
            *probe = mode;
        }
    }

    fn render(
        &mut self,
        _projection: &Matrix4<f32>,
        _model_view: &Matrix4<f32>,
    ) {
        if let Ok(mut count) = self.render_count.lock() {
            *count += 1;
        }
    }

    fn clear(&mut self) {}
}

/// Pixel source backed by a bottom-up buffer, like a GL framebuffer.
pub struct SimPixelSource {
    pixels: Vec<u32>,
    width: u32,
    height: u32,
    reads: AtomicBool,
}

impl SimPixelSource {
    /// `pixels` is bottom-up row-major, `width * height` entries.
    pub fn new(pixels: Vec<u32>, width: u32, height: u32) -> Self {
        debug_assert_eq!(pixels.len(), (width * height) as usize);
        Self {
            pixels,
            width,
            height,
            reads: AtomicBool::new(false),
        }
    }

    pub fn was_read(&self) -> bool {
        self.reads.load(Ordering::Relaxed)
    }
}

impl PixelSource for SimPixelSource {
    fn read_pixels(&self, x: u32, y: u32, width: u32, height: u32, out: &mut [u32]) {
        self.reads.store(true, Ordering::Relaxed);
        let src_w = self.width as usize;
        for row in 0..height as usize {
            let src_row = y as usize + row;
            if src_row >= self.height as usize {
                break;
            }
            let src_start = src_row * src_w + x as usize;
            let dst_start = row * width as usize;
            out[dst_start..dst_start + width as usize]
                .copy_from_slice(&self.pixels[src_start..src_start + width as usize]);
        }
    }
}
