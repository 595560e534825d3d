//! # Patch Recipe
//!
//! A recipe says which functions get the binding and which call shapes get the
//! extra argument. It is read from TOML; without a file the built-in recipe is
//! used, which threads `parquetSource` through the event repository queries.

use crate::error::{PatchError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = "sprigfix";
const CONFIG_FILE: &str = "config.toml";

static ARGUMENT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$").expect("Invalid regex")
});

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PatchConfig {
    pub inserter: InserterConfig,
    #[serde(default)]
    pub patterns: Vec<CallPattern>,
}

/// Configuration of the structural inserter.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct InserterConfig {
    /// Text that precedes a target name at the start of its definition,
    /// e.g. `func (r *eventRepository) `.
    pub definition_marker: String,
    pub targets: BTreeSet<String>,
    pub binding: InsertionSpec,
}

/// The binding inserted as the first statement of a matched function.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct InsertionSpec {
    pub name: String,
    pub init: String,
    #[serde(default = "default_indent")]
    pub indent: String,
    #[serde(default = "default_marker")]
    pub marker: String,
}

impl InsertionSpec {
    /// The statement text, without indentation.
    pub fn statement(&self) -> String {
        format!("{} {} {}", self.name, self.marker, self.init)
    }

    /// The fragment whose presence means the binding is already declared.
    pub fn existing_marker(&self) -> String {
        format!("{} {}", self.name, self.marker)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Applied first, across the whole text.
    #[default]
    General,
    /// Applied after every general pattern, for irregular call shapes.
    Exception,
}

/// One call shape to rewrite.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct CallPattern {
    pub name: String,
    #[serde(default)]
    pub kind: PatternKind,
    #[serde(default = "default_callee")]
    pub callee: String,
    /// Opens and closes the template literal.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
    /// Must appear inside the literal for the call to be touched.
    pub guard: String,
    /// The trailing arguments the call currently passes, in order.
    pub args: Vec<String>,
    /// The argument to thread through.
    pub insert: String,
    /// The existing argument `insert` goes in front of. Defaults to the first of `args`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,
}

impl CallPattern {
    fn insert_position(&self) -> Option<usize> {
        match &self.before {
            Some(before) => self.args.iter().position(|arg| arg == before),
            None => Some(0),
        }
    }

    /// The argument list a matching call ends up with.
    pub fn rewritten_args(&self) -> Result<Vec<&str>> {
        let position = self.insert_position().ok_or_else(|| {
            PatchError::ConfigInvalid(format!(
                "pattern '{}': '{}' is not one of the trailing args",
                self.name,
                self.before.as_deref().unwrap_or_default()
            ))
        })?;
        let mut args: Vec<&str> = self.args.iter().map(String::as_str).collect();
        args.insert(position, &self.insert);
        Ok(args)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| -> Result<()> {
            Err(PatchError::ConfigInvalid(format!(
                "pattern '{}': {reason}",
                self.name
            )))
        };

        if self.callee.is_empty() {
            return invalid("callee is empty");
        }
        if self.delimiter.chars().count() != 1 {
            return invalid("delimiter must be a single character");
        }
        if self.guard.is_empty() {
            return invalid("guard is empty");
        }
        if self.guard.contains(&self.delimiter) {
            return invalid("guard contains the literal delimiter");
        }
        if self.args.is_empty() {
            return invalid("args is empty");
        }
        for arg in self.args.iter().chain(std::iter::once(&self.insert)) {
            if !ARGUMENT_REGEX.is_match(arg) {
                return invalid(&format!("'{arg}' is not an identifier"));
            }
        }
        if self.args.contains(&self.insert) {
            return invalid(&format!("'{}' is already passed", self.insert));
        }
        self.rewritten_args().map(|_| ())
    }
}

fn default_indent() -> String {
    "\t".to_string()
}

fn default_marker() -> String {
    ":=".to_string()
}

fn default_callee() -> String {
    "fmt.Sprintf".to_string()
}

fn default_delimiter() -> String {
    "`".to_string()
}

impl Default for PatchConfig {
    fn default() -> Self {
        let targets = [
            "GetEntryExitPages",
            "GetTopCountries",
            "GetTopSources",
            "GetTopEvents",
            "GetBrowsersDevicesOS",
            "GetChannels",
            "GetProjects",
        ];

        Self {
            inserter: InserterConfig {
                definition_marker: "func (r *eventRepository) ".to_string(),
                targets: targets.iter().map(|t| t.to_string()).collect(),
                binding: InsertionSpec {
                    name: "parquetSource".to_string(),
                    init: "r.getParquetSource()".to_string(),
                    indent: default_indent(),
                    marker: default_marker(),
                },
            },
            patterns: vec![
                CallPattern {
                    name: "from-placeholder".to_string(),
                    kind: PatternKind::General,
                    callee: default_callee(),
                    delimiter: default_delimiter(),
                    guard: "FROM %s".to_string(),
                    args: vec!["whereClause".to_string()],
                    insert: "parquetSource".to_string(),
                    before: None,
                },
                CallPattern {
                    name: "monthly-timeline".to_string(),
                    kind: PatternKind::Exception,
                    callee: default_callee(),
                    delimiter: default_delimiter(),
                    guard: "strftime(DATE_TRUNC('month', timestamp), '%%Y-%%m-01') as date"
                        .to_string(),
                    args: vec!["selectClause".to_string(), "whereClause".to_string()],
                    insert: "parquetSource".to_string(),
                    before: Some("whereClause".to_string()),
                },
            ],
        }
    }
}

impl PatchConfig {
    /// Rejects recipes the engine cannot apply meaningfully.
    pub fn validate(&self) -> Result<()> {
        let inserter = &self.inserter;
        if inserter.definition_marker.trim().is_empty() {
            return Err(PatchError::ConfigInvalid(
                "inserter.definition_marker is empty".to_string(),
            ));
        }
        if inserter.targets.is_empty() {
            return Err(PatchError::ConfigInvalid(
                "inserter.targets is empty".to_string(),
            ));
        }
        if let Some(target) = inserter.targets.iter().find(|t| !ARGUMENT_REGEX.is_match(t)) {
            return Err(PatchError::ConfigInvalid(format!(
                "target '{target}' is not an identifier"
            )));
        }
        if inserter.binding.name.is_empty() || inserter.binding.init.is_empty() {
            return Err(PatchError::ConfigInvalid(
                "inserter.binding needs both a name and an init".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for pattern in &self.patterns {
            if !names.insert(pattern.name.as_str()) {
                return Err(PatchError::ConfigInvalid(format!(
                    "pattern name '{}' is used twice",
                    pattern.name
                )));
            }
            pattern.validate()?;
        }
        Ok(())
    }

    /// Parses and validates a recipe from TOML text.
    pub fn from_toml(path: &Path, content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|source| PatchError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }
}

/// Where the effective recipe came from.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    File(PathBuf),
    BuiltIn,
}

pub fn load(path: &Path) -> Result<PatchConfig> {
    let content = fs::read_to_string(path).map_err(|source| PatchError::ConfigUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    PatchConfig::from_toml(path, &content)
}

/// Resolves the recipe: an explicit path wins, then `sprigfix/config.toml` in
/// the XDG config dirs, then the built-in recipe.
pub fn resolve(explicit: Option<&Path>) -> Result<(PatchConfig, ConfigSource)> {
    if let Some(path) = explicit {
        return Ok((load(path)?, ConfigSource::File(path.to_path_buf())));
    }

    let xdg_dirs = xdg::BaseDirectories::with_prefix(CONFIG_DIR);
    if let Some(path) = xdg_dirs.find_config_file(CONFIG_FILE) {
        return Ok((load(&path)?, ConfigSource::File(path)));
    }

    Ok((PatchConfig::default(), ConfigSource::BuiltIn))
}
