//! # Patch Pipeline
//!
//! Runs the structural inserter and then the call-site rewriter over one
//! in-memory buffer. The file is read once and written once; nothing touches
//! the disk if any step fails.

use crate::config::PatchConfig;
use crate::error::{PatchError, Result};
use crate::file_io;
use crate::inserter::{self, InsertionReport};
use crate::rewriter::{CallRewriter, RewriteReport};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Atomically replace the file when the patch changed something.
    InPlace,
    /// Compute the patch, write nothing.
    DryRun,
}

/// Everything a run found, including what it did not find.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchReport {
    pub insertion: InsertionReport,
    pub rewrite: RewriteReport,
    pub changed: bool,
}

impl PatchReport {
    pub fn unmatched_targets(&self) -> Vec<&str> {
        self.insertion.unmatched()
    }

    pub fn unmatched_patterns(&self) -> Vec<&str> {
        self.rewrite.unmatched()
    }

    /// Whether every configured target and pattern matched something.
    pub fn is_complete(&self) -> bool {
        self.unmatched_targets().is_empty() && self.unmatched_patterns().is_empty()
    }

    /// Turns unmatched targets and patterns into an error, for strict runs.
    pub fn require_complete(&self) -> Result<()> {
        if self.is_complete() {
            return Ok(());
        }
        let names = self
            .unmatched_targets()
            .into_iter()
            .chain(self.unmatched_patterns())
            .map(String::from)
            .collect();
        Err(PatchError::Unmatched { names })
    }
}

#[derive(Debug)]
pub struct PatchOutcome {
    pub original: String,
    pub text: String,
    pub report: PatchReport,
}

#[derive(Debug)]
pub struct Patcher {
    config: PatchConfig,
    rewriter: CallRewriter,
}

impl Patcher {
    pub fn new(config: PatchConfig) -> Result<Self> {
        config.validate()?;
        let rewriter = CallRewriter::new(&config.patterns)?;
        Ok(Self { config, rewriter })
    }

    pub fn config(&self) -> &PatchConfig {
        &self.config
    }

    pub fn patch_text(&self, text: &str) -> PatchOutcome {
        // `split` keeps a trailing empty line, so `join` restores the input exactly.
        let lines = text.split('\n').map(String::from).collect();
        let inserted = inserter::insert_bindings(lines, &self.config.inserter);
        let rewritten = self.rewriter.rewrite(&inserted.lines.join("\n"));

        PatchOutcome {
            report: PatchReport {
                insertion: inserted.report,
                rewrite: rewritten.report,
                changed: rewritten.text != text,
            },
            original: text.to_string(),
            text: rewritten.text,
        }
    }

    pub fn patch_file(&self, path: &Path, mode: WriteMode) -> Result<PatchOutcome> {
        let original = file_io::read_source(path)?;
        let outcome = self.patch_text(&original);

        if mode == WriteMode::InPlace && outcome.report.changed {
            file_io::write_atomic(path, &outcome.text)?;
        }
        Ok(outcome)
    }
}
