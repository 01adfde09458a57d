//! Pipeline execution engine.
//!
//! Compiles pipeline specs into a [`DataPipeline`] over a CSV input, streams
//! the rows into a CSV output (or just counts them) and reports what
//! happened.

use super::builder::DataPipeline;
use super::spec::{PipelineSpec, Step};
use super::validation::validate_pipeline;
use crate::data::stream::{CsvFile, RowSource as _};
use crate::data::Value;
use crate::function::{Eval, StringOp};
use crate::operator::{RowCount, UpdateFn, Write};
use crate::profiling::DatatypeConverter;
use anyhow::{Context as _, Result, anyhow, bail};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

/// Report generated after pipeline execution
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Rows read from the input
    pub rows_read: usize,

    /// Rows that reached the output
    pub rows_written: usize,

    /// Number of columns before processing
    pub columns_before: usize,

    /// Number of columns after processing
    pub columns_after: usize,

    /// Number of steps compiled into the pipeline
    pub steps_applied: usize,

    /// Output file, if the spec or the caller named one
    pub output: Option<PathBuf>,

    /// Time taken for execution
    pub duration: std::time::Duration,
}

impl RunReport {
    /// Create a summary message
    pub fn summary(&self) -> String {
        let target = match &self.output {
            Some(path) => format!(" → {}", path.display()),
            None => String::new(),
        };
        format!(
            "Pipeline completed: {} of {} rows kept, {} columns ({} → {}), {} steps, {:.2}s{target}",
            self.rows_written,
            self.rows_read,
            if self.columns_after > self.columns_before {
                "added"
            } else if self.columns_after < self.columns_before {
                "removed"
            } else {
                "unchanged"
            },
            self.columns_before,
            self.columns_after,
            self.steps_applied,
            self.duration.as_secs_f64()
        )
    }
}

/// Execute a pipeline spec on a CSV input.
///
/// The input path defaults to `spec.input.path` and the output path to
/// `spec.output.path`. Without an output the rows are only counted.
pub fn run_pipeline(
    spec: &PipelineSpec,
    input_path: Option<&Path>,
    output_path_override: Option<&Path>,
) -> Result<RunReport> {
    let start = std::time::Instant::now();

    let input = input_file(spec, input_path)?;
    let input_schema = input
        .columns()
        .with_context(|| format!("Failed to read header of {}", input.path().display()))?;
    let columns_before = input_schema.len();

    let validation_errors = validate_pipeline(spec, &input_schema)?;
    if !validation_errors.is_empty() {
        bail!(
            "Pipeline validation failed:\n{}",
            validation_errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    let pipeline = build_pipeline(spec, DataPipeline::new(input))?;
    let columns_after = pipeline.columns()?.len();

    let output = output_file(spec, output_path_override)?;
    let output_path = output.as_ref().map(|file| file.path().to_path_buf());
    let (rows_written, stats) = match output {
        Some(file) => pipeline.stream_with_stats(&Write::new(file)),
        None => pipeline.stream_with_stats(&RowCount),
    }
    .with_context(|| format!("Pipeline '{}' failed", spec.name))?;

    let report = RunReport {
        rows_read: stats.rows_read,
        rows_written,
        columns_before,
        columns_after,
        steps_applied: spec.steps.len(),
        output: output_path,
        duration: start.elapsed(),
    };
    info!(pipeline = %spec.name, "{}", report.summary());
    Ok(report)
}

/// Append the operators for every step of `spec` to `pipeline`.
pub fn build_pipeline(spec: &PipelineSpec, pipeline: DataPipeline) -> Result<DataPipeline> {
    spec.steps
        .iter()
        .enumerate()
        .try_fold(pipeline, |pipeline, (idx, step)| {
            apply_step(step, &pipeline)
                .with_context(|| format!("Step {} ({}) is invalid", idx + 1, step.label()))
        })
}

/// Apply a single transformation step
fn apply_step(step: &Step, pipeline: &DataPipeline) -> Result<DataPipeline> {
    let next = match step {
        Step::Select { columns, names } => match names {
            Some(names) => pipeline.select_as(columns, names.clone())?,
            None => pipeline.select(columns),
        },

        Step::Rename { mapping } => {
            pipeline.rename(mapping.keys(), mapping.values().cloned().collect())?
        }

        Step::Filter { condition } => pipeline.filter(condition.to_predicate()?, None),

        Step::Delete { condition } => pipeline.delete(condition.to_predicate()?),

        Step::Limit { rows } => pipeline.limit(*rows),

        Step::Insert {
            name,
            position,
            value,
        } => pipeline.insert(vec![name.clone()], *position, value.clone())?,

        Step::Update {
            columns,
            value,
            mapping,
        } => {
            let func = match (value, mapping) {
                (Some(value), None) => UpdateFn::Const(value.clone()),
                (None, Some(mapping)) => UpdateFn::Map(
                    mapping
                        .iter()
                        .map(|(from, to)| (Value::from(from.as_str()), to.clone()))
                        .collect::<HashMap<_, _>>(),
                ),
                _ => bail!("update needs exactly one of 'value' or 'mapping'"),
            };
            pipeline.update(columns, func)?
        }

        Step::Typecast { types } => pipeline.typecast(match types {
            Some(types) => DatatypeConverter::new(types.clone()),
            None => DatatypeConverter::default(),
        }),

        Step::Lower { columns } => string_update(pipeline, columns, StringOp::Lower)?,
        Step::Upper { columns } => string_update(pipeline, columns, StringOp::Upper)?,
        Step::Trim { columns } => string_update(pipeline, columns, StringOp::Trim)?,
    };
    Ok(next)
}

/// One update per column, applying `op` to the column's text.
fn string_update(pipeline: &DataPipeline, columns: &[String], op: StringOp) -> Result<DataPipeline> {
    columns.iter().try_fold(pipeline.clone(), |pipeline, column| {
        let func = Eval::string(op.clone(), Eval::col(column.as_str()), true);
        Ok(pipeline.update([column], func)?)
    })
}

fn input_file(spec: &PipelineSpec, input_path: Option<&Path>) -> Result<CsvFile> {
    let path = input_path
        .map(Path::to_path_buf)
        .or_else(|| spec.input.path.as_ref().map(PathBuf::from))
        .ok_or_else(|| anyhow!("No input path specified (pass one or set input.path in spec)"))?;
    let mut file = CsvFile::new(path);
    if let Some(delimiter) = &spec.input.delimiter {
        file = file.with_delimiter(parse_delimiter(delimiter)?);
    }
    if let Some(header) = &spec.input.header {
        file = file.with_header(header.iter().cloned());
    }
    Ok(file)
}

fn output_file(spec: &PipelineSpec, override_path: Option<&Path>) -> Result<Option<CsvFile>> {
    let configured = spec.output.as_ref();
    let path = match (override_path, configured) {
        (Some(path), _) => path.to_path_buf(),
        (None, Some(output)) => PathBuf::from(&output.path),
        (None, None) => return Ok(None),
    };
    let mut file = CsvFile::new(path);
    if let Some(delimiter) = configured.and_then(|o| o.delimiter.as_ref()) {
        file = file.with_delimiter(parse_delimiter(delimiter)?);
    }
    Ok(Some(file))
}

/// Single-byte delimiter; `\t` may be written out as an escape.
pub fn parse_delimiter(text: &str) -> Result<u8> {
    match text {
        "\\t" | "tab" => Ok(b'\t'),
        _ => match text.as_bytes() {
            [byte] => Ok(*byte),
            _ => bail!("Invalid delimiter '{text}': expected a single character"),
        },
    }
}
