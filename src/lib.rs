// Core modules
pub mod common;
pub mod core;
pub mod storage;
pub mod service;
pub mod cli;

// Re-export commonly used types
pub use common::{Config, DevMode, OptimizerError, Result};
pub use core::{
    optimize, simulate_compress, Download, ImageKind, Quality, QualityVariant, Session,
    SessionSettings, SessionState, SizeCheck, UploadedImage,
};
pub use storage::{measure_size_mb, read_all, write_all, SessionWorkspace};
pub use service::{router, AppState, PageRenderer, SessionRegistry};
