/// Overall UI state.
#[derive(Default)]
pub struct UIState {
    /// Persistent sensor/permission banner, if any.
    pub status_message: Option<String>,

    /// Combined colorize progress on a 0-100 scale; `None` when idle.
    pub colorize_progress: Option<f32>,

    /// Pending memory warning dialog text.
    pub memory_warning: Option<String>,

    /// Volume edge slider value, in meters.
    pub volume_edge: f32,

    /// Selected entry of [`DISPLAY_MODE_NAMES`].
    pub display_mode_index: usize,

    /// Log messages.
    pub log_messages: Vec<String>,

    pub show_about: bool,
}

impl UIState {
    pub fn new(volume_edge: f32) -> Self {
        Self {
            volume_edge,
            display_mode_index: 1,
            ..Default::default()
        }
    }

    pub fn add_log(&mut self, msg: String) {
        self.log_messages.push(msg);
    }
}

pub const DISPLAY_MODE_NAMES: &[&str] = &["X-Ray", "Gray", "Color"];
