use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no valid initial pose; cannot start scanning")]
    InvalidInitialPose,

    #[error("dynamic options are locked while scanning")]
    OptionsLockedWhileScanning,

    #[error("state transition not allowed: {from} -> {to}")]
    InvalidTransition { from: &'static str, to: &'static str },

    #[error("colorize task failed: {0}")]
    Colorize(String),

    #[error("mesh has no geometry")]
    EmptyMesh,

    #[error("invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("image format error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error("sensor error: {0}")]
    Sensor(String),
}

pub type Result<T> = std::result::Result<T, StrataError>;
