use std::path::PathBuf;
use thiserror::Error;

/// Everything that can stop a patch run.
///
/// Non-matches are deliberately absent: a target that is never found or a call
/// pattern that rewrites nothing shows up in the [`PatchReport`](crate::patcher::PatchReport)
/// instead, because re-running over already patched text is expected to match nothing.
#[derive(Error, Debug)]
pub enum PatchError {
    /// The source file could not be read. Raised before any mutation.
    #[error("cannot read '{}': {source}", path.display())]
    InputUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The patched text could not be persisted. The original file is left untouched.
    #[error("cannot write '{}': {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read config '{}': {source}", path.display())]
    ConfigUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config '{}': {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// The recipe parsed but describes something the engine cannot apply.
    #[error("invalid config: {0}")]
    ConfigInvalid(String),

    /// Strict runs only: some targets or patterns matched nothing.
    #[error("nothing matched for: {}", names.join(", "))]
    Unmatched { names: Vec<String> },

    #[error("call pattern '{name}' does not compile: {source}")]
    Pattern {
        name: String,
        #[source]
        source: regex::Error,
    },
}

pub type Result<T> = std::result::Result<T, PatchError>;
