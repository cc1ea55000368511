use std::path::PathBuf;
use thiserror::Error;

/// Per-file outcomes the orchestrator routes on.
///
/// Only `InvalidRoot` is fatal to a run; conversion and pair-validation
/// failures are recorded and the run continues with the next file.
#[derive(Debug, Error)]
pub enum MuxError {
    #[error("not a usable directory: {}", .0.display())]
    InvalidRoot(PathBuf),

    #[error("conversion failed for {}: {reason}", .path.display())]
    Conversion { path: PathBuf, reason: String },

    #[error("invalid still/video pair: {0}")]
    InvalidPair(String),
}
