//! Two-phase mesh colorization: a cheap per-vertex preview followed by an
//! enhanced textured pass, both running on worker threads with completion
//! messages drained on the UI-affinity thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::mesh::Mesh;
use crate::options::ColorizerQuality;
use crate::slam::Keyframe;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorizeKind {
    /// Fast per-vertex colorization shown while the enhanced pass runs.
    Preview,
    /// Texture-mapped colorization of the simplified mesh.
    Enhanced,
}

/// Options forwarded to the colorizer collaborator.
#[derive(Clone, Debug)]
pub struct ColorizeOptions {
    pub prioritize_first_frame_color: bool,
    pub quality: ColorizerQuality,
    pub target_num_faces: usize,
}

impl Default for ColorizeOptions {
    fn default() -> Self {
        Self {
            prioritize_first_frame_color: true,
            quality: ColorizerQuality::Normal,
            target_num_faces: 50_000,
        }
    }
}

/// Message from a colorize worker back to the pipeline.
pub enum TaskMessage {
    Progress { task: u64, fraction: f64 },
    Finished {
        task: u64,
        result: std::result::Result<Mesh, String>,
    },
}

/// Worker-side endpoint for one colorize task. Progress and completion are
/// suppressed once the task has been cancelled; the pipeline additionally
/// drops messages from stale task generations, so cancellation guarantees no
/// further callbacks on the UI side.
pub struct TaskSender {
    id: u64,
    cancelled: Arc<AtomicBool>,
    tx: Sender<TaskMessage>,
}

impl TaskSender {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    pub fn progress(&self, fraction: f64) {
        if !self.is_cancelled() {
            let _ = self.tx.send(TaskMessage::Progress {
                task: self.id,
                fraction,
            });
        }
    }

    pub fn finish(self, result: std::result::Result<Mesh, String>) {
        if !self.is_cancelled() {
            let _ = self.tx.send(TaskMessage::Finished {
                task: self.id,
                result,
            });
        }
    }
}

/// Pipeline-side handle to an in-flight task.
struct TaskHandle {
    id: u64,
    cancelled: Arc<AtomicBool>,
}

impl TaskHandle {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

/// Colorization collaborator. Implementations run the work on their own
/// worker context and report through the [`TaskSender`].
pub trait Colorizer: Send + Sync {
    fn start_task(
        &self,
        kind: ColorizeKind,
        mesh: Mesh,
        keyframes: Vec<Keyframe>,
        options: &ColorizeOptions,
        sender: TaskSender,
    );
}

/// Event produced by [`ColorizationPipeline::poll`], in order, on the
/// UI-affinity thread.
#[derive(Debug)]
pub enum ColorizeEvent {
    /// Combined two-phase progress on a 0-100 scale.
    Progress { combined: f32 },
    /// Preview colorization finished; the scan is no longer resumable.
    PreviewReady { mesh: Mesh },
    /// Enhanced task launched; the keyframe set can be freed now.
    EnhancedStarted,
    /// Final mesh ready.
    EnhancedReady { mesh: Mesh },
    /// A task failed. No retry; the previous mesh stays on screen.
    Failed { kind: ColorizeKind, message: String },
}

/// Remap a per-task fraction to the combined 0-100 indicator. The preview
/// covers the first 20 points, the enhanced pass the remaining 80.
pub fn combined_progress(kind: ColorizeKind, fraction: f64) -> f32 {
    match kind {
        ColorizeKind::Preview => (fraction * 20.0) as f32,
        ColorizeKind::Enhanced => (20.0 + fraction * 80.0) as f32,
    }
}

/// Owns the preview/enhanced task pair and enforces single-flight: at most
/// one of each, and the enhanced task only ever starts from the preview's
/// success handling.
pub struct ColorizationPipeline {
    colorizer: Arc<dyn Colorizer>,
    options: ColorizeOptions,
    tx: Sender<TaskMessage>,
    rx: Receiver<TaskMessage>,
    preview: Option<TaskHandle>,
    enhanced: Option<TaskHandle>,
    /// Keyframes held only long enough to seed the enhanced task.
    pending_keyframes: Vec<Keyframe>,
    next_task_id: u64,
}

impl ColorizationPipeline {
    pub fn new(colorizer: Arc<dyn Colorizer>, options: ColorizeOptions) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            colorizer,
            options,
            tx,
            rx,
            preview: None,
            enhanced: None,
            pending_keyframes: Vec::new(),
            next_task_id: 0,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.preview.is_some() || self.enhanced.is_some()
    }

    pub fn enhanced_in_flight(&self) -> bool {
        self.enhanced.is_some()
    }

    /// Start the preview task. Refused while either task is in flight.
    pub fn request_colorize(&mut self, mesh: Mesh, keyframes: Vec<Keyframe>) -> bool {
        if self.is_busy() {
            warn!("colorize requested while a task is already running");
            return false;
        }
        debug!(keyframes = keyframes.len(), "starting preview colorize");
        self.pending_keyframes = keyframes;
        let handle = self.start(ColorizeKind::Preview, mesh, self.pending_keyframes.clone());
        self.preview = Some(handle);
        true
    }

    fn start(&mut self, kind: ColorizeKind, mesh: Mesh, keyframes: Vec<Keyframe>) -> TaskHandle {
        let id = self.next_task_id;
        self.next_task_id += 1;
        let cancelled = Arc::new(AtomicBool::new(false));
        let sender = TaskSender {
            id,
            cancelled: Arc::clone(&cancelled),
            tx: self.tx.clone(),
        };
        self.colorizer
            .start_task(kind, mesh, keyframes, &self.options, sender);
        TaskHandle { id, cancelled }
    }

    /// Cancel whatever is in flight. Safe to call with nothing running.
    pub fn cancel_all(&mut self) {
        if let Some(task) = self.preview.take() {
            task.cancel();
        }
        if let Some(task) = self.enhanced.take() {
            task.cancel();
        }
        self.pending_keyframes.clear();
    }

    /// Cancel only the enhanced task (memory-pressure degradation keeps the
    /// preview-quality mesh).
    pub fn cancel_enhanced(&mut self) {
        if let Some(task) = self.enhanced.take() {
            task.cancel();
        }
    }

    /// Drain completion-queue messages. Must run on the UI-affinity thread;
    /// the events it returns may mutate state/UI without further locking.
    pub fn poll(&mut self) -> Vec<ColorizeEvent> {
        let mut events = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                TaskMessage::Progress { task, fraction } => {
                    let kind = if self.preview.as_ref().map(|t| t.id) == Some(task) {
                        ColorizeKind::Preview
                    } else if self.enhanced.as_ref().map(|t| t.id) == Some(task) {
                        ColorizeKind::Enhanced
                    } else {
                        // Stale generation; task was cancelled or replaced.
                        continue;
                    };
                    events.push(ColorizeEvent::Progress {
                        combined: combined_progress(kind, fraction),
                    });
                }
                TaskMessage::Finished { task, result } => {
                    if self.preview.as_ref().map(|t| t.id) == Some(task) {
                        self.preview = None;
                        match result {
                            Ok(mesh) => {
                                events.push(ColorizeEvent::PreviewReady { mesh: mesh.clone() });
                                let keyframes = std::mem::take(&mut self.pending_keyframes);
                                let handle =
                                    self.start(ColorizeKind::Enhanced, mesh, keyframes);
                                self.enhanced = Some(handle);
                                events.push(ColorizeEvent::EnhancedStarted);
                            }
                            Err(message) => {
                                error!(%message, "preview colorize failed");
                                self.pending_keyframes.clear();
                                events.push(ColorizeEvent::Failed {
                                    kind: ColorizeKind::Preview,
                                    message,
                                });
                            }
                        }
                    } else if self.enhanced.as_ref().map(|t| t.id) == Some(task) {
                        self.enhanced = None;
                        match result {
                            Ok(mesh) => events.push(ColorizeEvent::EnhancedReady { mesh }),
                            Err(message) => {
                                error!(%message, "enhanced colorize failed");
                                events.push(ColorizeEvent::Failed {
                                    kind: ColorizeKind::Enhanced,
                                    message,
                                });
                            }
                        }
                    }
                    // else: stale, drop on the floor.
                }
            }
        }
        events
    }
}
