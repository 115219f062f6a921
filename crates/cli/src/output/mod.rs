//! Terminal rendering of progress and results.

mod format;
mod render;

pub use format::OutputFormat;
pub use render::{ProgressPrinter, write_failure, write_json, write_results};
