//! Static checks of a [`PipelineSpec`] against the header of its input.
//!
//! Nothing is read beyond the column names. Each step is checked against
//! the columns left by the steps before it, and every problem is collected
//! rather than stopping at the first one.

use super::spec::{Condition, PipelineSpec, SPEC_VERSION, Step};
use crate::data::Schema;
use anyhow::Result;
use std::collections::HashSet;
use tracing::warn;

/// One problem found in a spec, optionally tied to a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub step_index: Option<usize>,
    pub message: String,
}

impl ValidationError {
    fn new(step_index: Option<usize>, message: impl Into<String>) -> Self {
        Self {
            step_index,
            message: message.into(),
        }
    }

    fn step(step_index: usize, message: impl Into<String>) -> Self {
        Self::new(Some(step_index), message)
    }

    fn schema(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(idx) = self.step_index {
            write!(f, "Step {}: {}", idx + 1, self.message)
        } else {
            write!(f, "Schema: {}", self.message)
        }
    }
}

/// Validate a pipeline spec against an input schema.
///
/// Steps are checked in order against the columns produced by the steps
/// before them. Every problem found is returned; an empty list means the spec
/// can run.
pub fn validate_pipeline(
    spec: &PipelineSpec,
    input_schema: &Schema,
) -> Result<Vec<ValidationError>> {
    let mut errors = Vec::new();

    if spec.version != SPEC_VERSION {
        errors.push(ValidationError::schema(format!(
            "Unsupported spec version '{}', expected '{SPEC_VERSION}'",
            spec.version
        )));
    }

    // Columns as they would look after each step.
    let mut columns: Vec<String> = input_schema.names().to_vec();
    for (idx, step) in spec.steps.iter().enumerate() {
        validate_step(step, idx, &mut columns, &mut errors);
    }

    Ok(errors)
}

/// Check one step and apply its effect to `columns`.
fn validate_step(
    step: &Step,
    idx: usize,
    columns: &mut Vec<String>,
    errors: &mut Vec<ValidationError>,
) {
    match step {
        Step::Select {
            columns: selected,
            names,
        } => {
            if selected.is_empty() {
                errors.push(ValidationError::step(idx, "Select needs at least one column"));
            }
            validate_columns_exist(selected, columns, idx, "select", errors);
            let output = match names {
                Some(names) if names.len() != selected.len() => {
                    errors.push(ValidationError::step(
                        idx,
                        format!(
                            "Got {} new names for {} selected columns",
                            names.len(),
                            selected.len()
                        ),
                    ));
                    selected.clone()
                }
                Some(names) => names.clone(),
                None => selected.clone(),
            };
            check_unique(&output, idx, errors);
            *columns = output;
        }

        Step::Rename { mapping } => {
            for (from, to) in mapping {
                match columns.iter().position(|c| c == from) {
                    None => errors.push(ValidationError::step(
                        idx,
                        format!("Cannot rename non-existent column '{from}'"),
                    )),
                    Some(_) if from == to => {
                        warn!(step = idx + 1, column = %from, "Rename to the same name has no effect");
                    }
                    Some(_) if columns.contains(to) => {
                        errors.push(ValidationError::step(
                            idx,
                            format!("Cannot rename '{from}' to '{to}': target already exists"),
                        ));
                    }
                    Some(pos) => {
                        if let Some(name) = columns.get_mut(pos) {
                            name.clone_from(to);
                        }
                    }
                }
            }
        }

        Step::Filter { condition } | Step::Delete { condition } => {
            validate_condition(condition, idx, columns, errors);
        }

        Step::Limit { .. } => {}

        Step::Insert { name, position, .. } => {
            if columns.contains(name) {
                errors.push(ValidationError::step(
                    idx,
                    format!("Cannot insert column '{name}': column already exists"),
                ));
            } else {
                match position {
                    Some(pos) if *pos > columns.len() => errors.push(ValidationError::step(
                        idx,
                        format!(
                            "Insert position {pos} out of range for {} columns",
                            columns.len()
                        ),
                    )),
                    Some(pos) => columns.insert(*pos, name.clone()),
                    None => columns.push(name.clone()),
                }
            }
        }

        Step::Update {
            columns: targets,
            value,
            mapping,
        } => {
            validate_columns_exist(targets, columns, idx, "update", errors);
            if value.is_some() == mapping.is_some() {
                errors.push(ValidationError::step(
                    idx,
                    "Update needs exactly one of 'value' or 'mapping'",
                ));
            }
        }

        Step::Typecast { types } => {
            if types.as_ref().is_some_and(Vec::is_empty) {
                errors.push(ValidationError::step(idx, "Typecast type list is empty"));
            }
        }

        Step::Lower { columns: targets }
        | Step::Upper { columns: targets }
        | Step::Trim { columns: targets } => {
            validate_columns_exist(targets, columns, idx, step.label(), errors);
        }
    }
}

fn validate_condition(
    condition: &Condition,
    idx: usize,
    columns: &[String],
    errors: &mut Vec<ValidationError>,
) {
    let column = condition.column();
    if !columns.iter().any(|c| c == column) {
        errors.push(ValidationError::step(
            idx,
            format!("Condition references non-existent column '{column}'"),
        ));
    }
    if let Condition::Matches { pattern, .. } = condition
        && let Err(e) = regex::Regex::new(pattern)
    {
        errors.push(ValidationError::step(
            idx,
            format!("Invalid regex pattern: {e}"),
        ));
    }
}

/// Report every column in `target_cols` missing from `available_cols`.
fn validate_columns_exist(
    target_cols: &[String],
    available_cols: &[String],
    step_idx: usize,
    operation: &str,
    errors: &mut Vec<ValidationError>,
) {
    for col in target_cols {
        if !available_cols.contains(col) {
            errors.push(ValidationError::step(
                step_idx,
                format!("Cannot {operation} non-existent column '{col}'"),
            ));
        }
    }
}

fn check_unique(names: &[String], idx: usize, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            errors.push(ValidationError::step(
                idx,
                format!("Duplicate column name '{name}'"),
            ));
        }
    }
}
