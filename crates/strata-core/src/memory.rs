//! Low-memory degradation policy.
//!
//! A pressure signal degrades the most expensive work in flight instead of
//! letting the process die: the enhanced colorize pass is cancelled while
//! viewing, and an active scan is wound down to viewing. A one-shot flag
//! keeps a flood of signals from stacking warning dialogs.

/// What the session should do about a memory warning.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MemoryAction {
    /// Cancel the enhanced colorize task; keep the preview-quality mesh.
    CancelEnhancedColorize,
    /// Stop the scan (transition to viewing) once the user acknowledges.
    StopScanning,
}

pub const MEMORY_COLORIZE_CANCELED_MESSAGE: &str = "Memory low. Colorizing was canceled.";
pub const MEMORY_SCAN_STOPPED_MESSAGE: &str =
    "Memory low. Scanning will be stopped to avoid loss.";

/// One-shot guard around the memory warning dialog.
#[derive(Debug, Default)]
pub struct MemoryPressureGuard {
    showing_warning: bool,
}

impl MemoryPressureGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the guard for a new warning. Returns `false` when a prior warning
    /// is still awaiting acknowledgment, in which case the signal is dropped.
    pub fn try_arm(&mut self) -> bool {
        if self.showing_warning {
            return false;
        }
        self.showing_warning = true;
        true
    }

    /// The user dismissed the dialog.
    pub fn acknowledge(&mut self) {
        self.showing_warning = false;
    }

    pub fn is_showing(&self) -> bool {
        self.showing_warning
    }
}
