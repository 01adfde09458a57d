//! Frequency outlier detection.

use crate::data::{ColumnRef, Counter, Table, Value};
use crate::error::{OpencleanError, Result};
use crate::grouping::frame::project;
use serde::{Deserialize, Serialize};

/// Condition on a relative frequency.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Threshold {
    Gt(f64),
    Ge(f64),
    Lt(f64),
    Le(f64),
    Eq(f64),
}

impl Threshold {
    /// A bare number `t` means `freq > t`, except `1.0` which means
    /// `freq == 1.0`.
    pub fn from_number(t: f64) -> Self {
        if t == 1.0 { Self::Eq(t) } else { Self::Gt(t) }
    }

    pub fn holds(self, freq: f64) -> bool {
        match self {
            Self::Gt(t) => freq > t,
            Self::Ge(t) => freq >= t,
            Self::Lt(t) => freq < t,
            Self::Le(t) => freq <= t,
            Self::Eq(t) => freq == t,
        }
    }
}

impl From<f64> for Threshold {
    fn from(t: f64) -> Self {
        Self::from_number(t)
    }
}

/// A value (or value combination) whose relative frequency met the threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrequencyOutlier {
    pub value: Value,
    pub count: usize,
    pub frequency: f64,
}

/// Values in `columns` whose relative frequency satisfies `threshold`.
/// Several columns are combined into list values. Results keep first-seen
/// order.
pub fn frequency_outliers(
    table: &Table,
    columns: &[ColumnRef],
    threshold: impl Into<Threshold>,
) -> Result<Vec<FrequencyOutlier>> {
    if columns.is_empty() {
        return Err(OpencleanError::construction("no columns given for frequency outliers"));
    }
    let threshold = threshold.into();
    let positions = table.schema().resolve_all(columns)?;
    let counts: Counter<Value> = table
        .rows()
        .iter()
        .map(|row| project(row, &positions))
        .collect::<Result<_>>()?;
    let total = counts.total();
    if total == 0 {
        return Ok(Vec::new());
    }
    Ok(counts
        .iter()
        .filter_map(|(value, count)| {
            let frequency = count as f64 / total as f64;
            threshold.holds(frequency).then(|| FrequencyOutlier {
                value: value.clone(),
                count,
                frequency,
            })
        })
        .collect())
}
