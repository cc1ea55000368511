pub mod classify;
pub mod config;
pub mod convert;
pub mod error;
pub mod ledger;
pub mod matching;
pub mod mux;
pub mod pipeline;
pub mod report;
pub mod xmp;

pub use classify::{MediaAsset, MediaKind};
pub use config::MuxConfig;
pub use convert::{HeifCliConverter, StillConverter};
pub use error::MuxError;
pub use ledger::Ledger;
pub use pipeline::{Pipeline, RunSummary};
pub use xmp::{ExiftoolWriter, MetadataWriter};
