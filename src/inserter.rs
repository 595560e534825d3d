//! # Structural Inserter
//!
//! Finds target function definitions line by line and makes sure the first
//! statement of each body declares the configured binding.
//!
//! Matching is textual but anchored: a definition is a line that starts (after
//! indentation) with the definition marker immediately followed by a target
//! name and an identifier boundary. Comments, string literals and longer names
//! that merely contain a target never qualify.

use crate::config::InserterConfig;
use log::{debug, info, warn};
use std::collections::BTreeMap;

/// What happened to one target name during a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOutcome {
    /// The binding was inserted. `line` is the 1-based definition line in the output.
    Inserted { line: usize },
    /// The first body line already declares the binding.
    AlreadyPresent { line: usize },
    /// The definition was found but no opening `{` follows it.
    Unterminated { line: usize },
    NotFound,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertionReport {
    pub outcomes: BTreeMap<String, TargetOutcome>,
}

impl InsertionReport {
    pub fn inserted(&self) -> usize {
        self.outcomes
            .values()
            .filter(|o| matches!(o, TargetOutcome::Inserted { .. }))
            .count()
    }

    /// Targets that could not be located or opened.
    pub fn unmatched(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| {
                matches!(o, TargetOutcome::NotFound | TargetOutcome::Unterminated { .. })
            })
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

#[derive(Debug)]
pub struct Inserted {
    pub lines: Vec<String>,
    pub report: InsertionReport,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Returns the pending target this line defines, if any.
fn definition_name(
    line: &str,
    marker: &str,
    outcomes: &BTreeMap<String, TargetOutcome>,
) -> Option<String> {
    let rest = line.trim_start().strip_prefix(marker)?;
    outcomes
        .iter()
        .filter(|(_, outcome)| **outcome == TargetOutcome::NotFound)
        .map(|(name, _)| name)
        .find(|name| {
            rest.strip_prefix(name.as_str())
                .is_some_and(|after| !after.starts_with(is_ident_char))
        })
        .cloned()
}

/// Locates the `{` that opens the body of the definition starting at `start`.
///
/// Braces inside parameter or result lists (`interface{}`, `struct{}`) are
/// skipped by tracking parenthesis depth. Returns `(line, byte column)`.
fn find_body_open(lines: &[String], start: usize) -> Option<(usize, usize)> {
    let mut depth = 0i32;
    for (idx, line) in lines.iter().enumerate().skip(start) {
        for (col, ch) in line.char_indices() {
            match ch {
                '(' => depth += 1,
                ')' => depth -= 1,
                '{' if depth <= 0 => return Some((idx, col)),
                _ => {}
            }
        }
    }
    None
}

/// Inserts the binding as the first body line of every target function that lacks it.
///
/// The pass is idempotent: a body whose first line already contains
/// `<name> <marker>` is left alone, so running it over its own output changes nothing.
pub fn insert_bindings(mut lines: Vec<String>, config: &InserterConfig) -> Inserted {
    let binding = &config.binding;
    let statement = binding.statement();
    let existing = binding.existing_marker();

    let mut outcomes: BTreeMap<String, TargetOutcome> = config
        .targets
        .iter()
        .map(|name| (name.clone(), TargetOutcome::NotFound))
        .collect();

    let mut i = 0;
    while i < lines.len() {
        let Some(name) = definition_name(&lines[i], &config.definition_marker, &outcomes) else {
            i += 1;
            continue;
        };
        let definition_line = i + 1;

        let Some((open, column)) = find_body_open(&lines, i) else {
            warn!("{name}: no opening brace after line {definition_line}, skipping");
            outcomes.insert(name, TargetOutcome::Unterminated { line: definition_line });
            i += 1;
            continue;
        };

        let eol = if lines[open].ends_with('\r') { "\r" } else { "" };
        let binding_line = format!("{}{statement}{eol}", binding.indent);
        let rest = &lines[open][column + 1..];
        let inline = rest.trim();

        if !inline.is_empty() && !inline.starts_with("//") {
            // Body starts on the brace line: split it so the binding comes first.
            if rest.contains(&existing) {
                debug!("{name}: binding already present");
                outcomes.insert(name, TargetOutcome::AlreadyPresent { line: definition_line });
                i = open + 1;
                continue;
            }
            // A closing brace lines up with the brace line, body text is indented.
            let prefix = if inline.starts_with('}') {
                let line = &lines[open];
                &line[..line.len() - line.trim_start().len()]
            } else {
                binding.indent.as_str()
            };
            let body = format!("{prefix}{}", rest.trim_start());
            lines[open].truncate(column + 1);
            lines[open].push_str(eol);
            lines.insert(open + 1, binding_line);
            lines.insert(open + 2, body);
            info!("Added {} to {name}", binding.name);
            outcomes.insert(name, TargetOutcome::Inserted { line: definition_line });
            i = open + 2;
            continue;
        }

        let candidate = open + 1;
        if candidate >= lines.len() {
            warn!("{name}: body opens on the last line, skipping");
            outcomes.insert(name, TargetOutcome::Unterminated { line: definition_line });
            break;
        }

        if lines[candidate].contains(&existing) {
            debug!("{name}: binding already present");
            outcomes.insert(name, TargetOutcome::AlreadyPresent { line: definition_line });
        } else {
            lines.insert(candidate, binding_line);
            info!("Added {} to {name}", binding.name);
            outcomes.insert(name, TargetOutcome::Inserted { line: definition_line });
        }
        i = candidate + 1;
    }

    Inserted {
        lines,
        report: InsertionReport { outcomes },
    }
}
