//! Pipeline specification data structures.
//!
//! A spec is a JSON document describing an input file, an ordered list of
//! steps and an optional output file. Specs are compiled into a
//! [`DataPipeline`](super::DataPipeline) by the executor.

use crate::data::Value;
use crate::error::OpencleanError;
use crate::function::Predicate;
use crate::profiling::RawType;
use anyhow::{Context as _, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current pipeline spec version
pub const SPEC_VERSION: &str = "0.1";

/// Root pipeline specification structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Specification version for future migrations
    pub version: String,

    /// Human-readable pipeline name
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Input file configuration
    #[serde(default)]
    pub input: InputConfig,

    /// Ordered sequence of transformation steps
    #[serde(default)]
    pub steps: Vec<Step>,

    /// Output file configuration; without it a run only counts rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

impl PipelineSpec {
    /// Create a new pipeline spec with default settings
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: SPEC_VERSION.to_owned(),
            name: name.into(),
            description: None,
            input: InputConfig::default(),
            steps: Vec::new(),
            output: None,
        }
    }

    /// Load a pipeline spec from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline spec file {}", path.display()))?;
        Self::from_json(&content)
    }

    /// Parse a pipeline spec from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse pipeline spec JSON")
    }

    /// Save pipeline spec to a JSON file
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path.as_ref(), json).context("Failed to write pipeline spec file")
    }

    /// Serialize pipeline spec to JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize pipeline spec")
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }
}

/// Input file configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputConfig {
    /// Default input path, used when the caller does not pass one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Single-character delimiter; inferred from the extension when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,

    /// Column names for files without a header line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<Vec<String>>,
}

/// Output file configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
}

/// Transformation step (tagged enum)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Keep the listed columns in order, optionally renaming them
    Select {
        columns: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        names: Option<Vec<String>>,
    },

    /// Rename columns according to mapping
    Rename { mapping: IndexMap<String, String> },

    /// Keep rows matching the condition
    Filter { condition: Condition },

    /// Remove rows matching the condition
    Delete { condition: Condition },

    /// Keep at most this many rows
    Limit { rows: usize },

    /// Insert a column holding a constant
    Insert {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        position: Option<usize>,
        #[serde(default)]
        value: Value,
    },

    /// Replace column values with a constant or through a mapping.
    /// Exactly one of `value` and `mapping` must be given.
    Update {
        columns: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mapping: Option<IndexMap<String, Value>>,
    },

    /// Convert string cells to the first raw type that parses them
    Typecast {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        types: Option<Vec<RawType>>,
    },

    Lower { columns: Vec<String> },

    Upper { columns: Vec<String> },

    /// Trim leading/trailing whitespace
    Trim { columns: Vec<String> },
}

impl Step {
    /// Short label used in log output and validation messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Select { .. } => "select",
            Self::Rename { .. } => "rename",
            Self::Filter { .. } => "filter",
            Self::Delete { .. } => "delete",
            Self::Limit { .. } => "limit",
            Self::Insert { .. } => "insert",
            Self::Update { .. } => "update",
            Self::Typecast { .. } => "typecast",
            Self::Lower { .. } => "lower",
            Self::Upper { .. } => "upper",
            Self::Trim { .. } => "trim",
        }
    }
}

/// Serializable row condition for filter and delete steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum Condition {
    Eq { column: String, value: Value },
    Ne { column: String, value: Value },
    Gt { column: String, value: Value },
    Ge { column: String, value: Value },
    Lt { column: String, value: Value },
    Le { column: String, value: Value },
    /// Null or empty string
    IsEmpty { column: String },
    /// Regular expression match anchored at the start of the cell, or over
    /// the whole cell when `full` is set
    Matches {
        column: String,
        pattern: String,
        #[serde(default)]
        full: bool,
    },
}

impl Condition {
    pub fn column(&self) -> &str {
        match self {
            Self::Eq { column, .. }
            | Self::Ne { column, .. }
            | Self::Gt { column, .. }
            | Self::Ge { column, .. }
            | Self::Lt { column, .. }
            | Self::Le { column, .. }
            | Self::IsEmpty { column }
            | Self::Matches { column, .. } => column,
        }
    }

    /// Build the predicate. Fails only for invalid patterns.
    pub fn to_predicate(&self) -> std::result::Result<Predicate, OpencleanError> {
        let column = self.column();
        Ok(match self {
            Self::Eq { value, .. } => Predicate::eq(column, value.clone()),
            Self::Ne { value, .. } => Predicate::ne(column, value.clone()),
            Self::Gt { value, .. } => Predicate::gt(column, value.clone()),
            Self::Ge { value, .. } => Predicate::ge(column, value.clone()),
            Self::Lt { value, .. } => Predicate::lt(column, value.clone()),
            Self::Le { value, .. } => Predicate::le(column, value.clone()),
            Self::IsEmpty { .. } => Predicate::is_empty(column),
            Self::Matches { pattern, full, .. } => {
                // Cells read from files are strings; other values are matched
                // on their text form.
                let regex = if *full {
                    Predicate::is_fullmatch(column, pattern)?
                } else {
                    Predicate::is_match(column, pattern)?
                };
                match regex {
                    Predicate::Regex(m) => Predicate::Regex(m.as_string()),
                    other => other,
                }
            }
        })
    }
}
