pub mod colorize;
pub mod error;
pub mod memory;
pub mod mesh;
pub mod options;
pub mod session;
pub mod sim;
pub mod slam;
pub mod viewpoint;
pub mod viewport;
pub mod volume;
pub mod workspace;
