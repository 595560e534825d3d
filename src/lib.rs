pub mod config;
pub mod diff;
pub mod error;
pub mod file_io;
pub mod inserter;
pub mod patcher;
pub mod rewriter;

pub use config::PatchConfig;
pub use error::PatchError;
pub use patcher::{PatchOutcome, PatchReport, Patcher, WriteMode};
