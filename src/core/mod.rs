pub mod optimizer;
pub mod quality;
pub mod session;
pub mod upload;

pub use optimizer::{build_variant, optimize, simulate_compress, QualityVariant};
pub use quality::{Quality, DEFAULT_LEVELS};
pub use session::{Download, Session, SessionSettings, SessionState, SizeCheck};
pub use upload::{ImageKind, UploadedImage};
