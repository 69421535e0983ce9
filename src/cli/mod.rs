pub mod optimize;
pub mod report;

pub use optimize::{optimize_file, OptimizeOutcome};
pub use report::render_report;
