//! Aggregation over values taken from several cells of the same row.

use super::eval::Callable;
use crate::data::Value;
use crate::error::{OpencleanError, Result};
use std::cmp::Ordering;

/// Aggregator applied to the per-row list of child results.
#[derive(Debug, Clone)]
pub enum Aggregator {
    Max,
    Min,
    Mean,
    Sum,
    /// User function receiving all values as its arguments.
    Custom(Callable),
}

impl Aggregator {
    pub fn apply(&self, values: Vec<Value>) -> Result<Value> {
        match self {
            Self::Max => Ok(pick(values, Ordering::Greater)),
            Self::Min => Ok(pick(values, Ordering::Less)),
            Self::Sum => sum(&values),
            Self::Mean => {
                let n = values.len();
                let total = sum(&values)?
                    .as_f64()
                    .ok_or_else(|| OpencleanError::type_error("mean of non-numeric values"))?;
                Ok(Value::Float(total / n as f64))
            }
            Self::Custom(func) => func.call(&values),
        }
    }
}

/// First value that no other value beats in direction `wins`.
fn pick(values: Vec<Value>, wins: Ordering) -> Value {
    values
        .into_iter()
        .reduce(|best, v| if v.compare(&best) == wins { v } else { best })
        .unwrap_or_default()
}

fn sum(values: &[Value]) -> Result<Value> {
    let mut int_total: i64 = 0;
    let mut float_total: Option<f64> = None;
    for value in values {
        match value {
            Value::Int(i) => match float_total.as_mut() {
                Some(total) => *total += *i as f64,
                None => {
                    int_total = int_total.checked_add(*i).ok_or_else(|| {
                        OpencleanError::type_error("integer overflow in sum")
                    })?;
                }
            },
            Value::Float(x) => {
                *float_total.get_or_insert(int_total as f64) += x;
            }
            other => {
                return Err(OpencleanError::type_error(format!(
                    "cannot add {} value '{other}'",
                    other.type_label()
                )));
            }
        }
    }
    Ok(float_total.map_or(Value::Int(int_total), Value::Float))
}
