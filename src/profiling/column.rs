//! Column profiler: values are counted in one pass, statistics are
//! aggregated with polars.

use super::datatype::DatatypeConverter;
use crate::data::frame::value_from_any;
use crate::data::{ColumnRef, Counter, Table, Value, cell};
use crate::error::{OpencleanError, Result};
use indexmap::IndexMap;
use polars::prelude::{
    Column, DataFrame, IdxSize, IntoLazy as _, SortMultipleOptions, col, len,
};
use serde::Serialize;

/// Smallest and largest value seen for one raw type.
#[derive(Clone, Serialize, Debug, PartialEq)]
pub struct MinMax {
    pub minimum: Value,
    pub maximum: Value,
}

/// Statistics for one column.
///
/// Empty cells (null or empty string) only count towards `total_count` and
/// `empty_count`; every other statistic covers the non-empty values.
#[derive(Clone, Serialize, Debug)]
pub struct ColumnProfile {
    pub column: String,
    pub total_count: usize,
    pub empty_count: usize,
    pub distinct_count: usize,
    /// Value count per raw type label.
    pub datatypes: Counter<String>,
    /// Distinct value count per raw type label.
    pub distinct_datatypes: Counter<String>,
    /// Range per raw type label, in first-seen label order.
    pub min_max: IndexMap<String, MinMax>,
    /// Most frequent raw values.
    pub top_values: Vec<(Value, usize)>,
}

impl ColumnProfile {
    pub fn empty_pct(&self) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            (self.empty_count as f64 / self.total_count as f64) * 100.0
        }
    }
}

/// Accumulates the values of one column.
///
/// Values are counted as they stream in; the statistics are computed by
/// polars over the distinct values when the profiler finishes.
#[derive(Debug, Clone)]
pub struct ColumnProfiler {
    converter: DatatypeConverter,
    top_k: usize,
    total_count: usize,
    empty_count: usize,
    values: Counter<Value>,
}

impl ColumnProfiler {
    pub fn new(converter: DatatypeConverter, top_k: usize) -> Self {
        Self {
            converter,
            top_k,
            total_count: 0,
            empty_count: 0,
            values: Counter::new(),
        }
    }

    pub fn add(&mut self, value: &Value) {
        self.total_count += 1;
        if value.is_empty() {
            self.empty_count += 1;
        } else {
            self.values.add(value.clone());
        }
    }

    /// Profile one column of a materialized table.
    ///
    /// # Errors
    ///
    /// Fails for an unknown column or when the statistics cannot be computed.
    pub fn run(mut self, table: &Table, column: impl Into<ColumnRef>) -> Result<ColumnProfile> {
        let column = column.into();
        let pos = table.schema().resolve(&column)?;
        for row in table.rows() {
            self.add(cell(row, pos)?);
        }
        let name = table.schema().name(pos).unwrap_or_default().to_owned();
        self.finish(name)
    }

    /// Compute the statistics of everything added so far.
    ///
    /// # Errors
    ///
    /// Fails when polars cannot evaluate the aggregation.
    pub fn finish(self, column: impl Into<String>) -> Result<ColumnProfile> {
        let entries: Vec<(&Value, usize)> = self.values.iter().collect();
        let frame = self.distinct_frame(&entries)?;

        let by_type = frame
            .clone()
            .lazy()
            .group_by_stable([col("label")])
            .agg([
                col("count").sum().alias("values"),
                len().alias("distinct"),
                col("int").min().alias("int_min"),
                col("int").max().alias("int_max"),
                col("float").min().alias("float_min"),
                col("float").max().alias("float_max"),
                col("bool").min().alias("bool_min"),
                col("bool").max().alias("bool_max"),
                col("text").min().alias("text_min"),
                col("text").max().alias("text_max"),
            ])
            .collect()?;

        let mut datatypes = Counter::new();
        let mut distinct_datatypes = Counter::new();
        let mut min_max: IndexMap<String, MinMax> = IndexMap::new();
        for row in 0..by_type.height() {
            let label = value_at(&by_type, "label", row)?.to_text();
            datatypes.add_n(label.clone(), count_at(&by_type, "values", row)?);
            distinct_datatypes.add_n(label.clone(), count_at(&by_type, "distinct", row)?);
            for kind in ["int", "float", "bool", "text"] {
                let minimum = value_at(&by_type, &format!("{kind}_min"), row)?;
                if !minimum.is_null() {
                    let maximum = value_at(&by_type, &format!("{kind}_max"), row)?;
                    min_max.insert(label, MinMax { minimum, maximum });
                    break;
                }
            }
        }

        let limit = IdxSize::try_from(self.top_k).unwrap_or(IdxSize::MAX);
        let top = frame
            .lazy()
            .sort(
                ["count"],
                SortMultipleOptions::default()
                    .with_order_descending(true)
                    .with_maintain_order(true),
            )
            .limit(limit)
            .collect()?;
        let mut top_values = Vec::with_capacity(top.height());
        for row in 0..top.height() {
            let pos = count_at(&top, "pos", row)?;
            let (value, count) = entries.get(pos).ok_or_else(|| {
                OpencleanError::Other(format!("profile position {pos} out of range"))
            })?;
            top_values.push(((*value).clone(), *count));
        }

        Ok(ColumnProfile {
            column: column.into(),
            total_count: self.total_count,
            empty_count: self.empty_count,
            distinct_count: entries.len(),
            datatypes,
            distinct_datatypes,
            min_max,
            top_values,
        })
    }

    /// One row per distinct raw value: its position, count, type label and
    /// converted value in the typed column matching the label.
    fn distinct_frame(&self, entries: &[(&Value, usize)]) -> Result<DataFrame> {
        let mut labels = Vec::with_capacity(entries.len());
        let mut ints = Vec::with_capacity(entries.len());
        let mut floats = Vec::with_capacity(entries.len());
        let mut bools = Vec::with_capacity(entries.len());
        let mut texts = Vec::with_capacity(entries.len());
        for (raw, _) in entries {
            let (label, value) = self.converter.cast(raw);
            labels.push(label);
            ints.push(match value {
                Value::Int(i) => Some(i),
                _ => None,
            });
            floats.push(match value {
                Value::Float(x) => Some(x),
                _ => None,
            });
            bools.push(value.as_bool());
            texts.push(match value {
                Value::Int(_) | Value::Float(_) | Value::Bool(_) => None,
                other => Some(other.to_text()),
            });
        }
        let positions: Vec<u64> = (0..entries.len() as u64).collect();
        let counts: Vec<u64> = entries.iter().map(|(_, n)| *n as u64).collect();
        Ok(DataFrame::new(vec![
            Column::new("pos".into(), positions),
            Column::new("count".into(), counts),
            Column::new("label".into(), labels),
            Column::new("int".into(), ints),
            Column::new("float".into(), floats),
            Column::new("bool".into(), bools),
            Column::new("text".into(), texts),
        ])?)
    }
}

fn value_at(frame: &DataFrame, column: &str, row: usize) -> Result<Value> {
    Ok(value_from_any(frame.column(column)?.get(row)?))
}

fn count_at(frame: &DataFrame, column: &str, row: usize) -> Result<usize> {
    match value_at(frame, column, row)? {
        Value::Int(n) => usize::try_from(n)
            .map_err(|_| OpencleanError::type_error(format!("negative count {n} in '{column}'"))),
        other => Err(OpencleanError::type_error(format!(
            "expected a count in '{column}', got '{other}'"
        ))),
    }
}

/// Profile every column of a polars data frame.
///
/// # Errors
///
/// Fails when the frame cannot be read or a column cannot be profiled.
pub fn profile_dataframe(
    df: &DataFrame,
    converter: &DatatypeConverter,
    top_k: usize,
) -> Result<Vec<ColumnProfile>> {
    let table = Table::from_dataframe(df)?;
    (0..table.width())
        .map(|pos| ColumnProfiler::new(converter.clone(), top_k).run(&table, pos))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grades() -> Table {
        let raw = ["09-12", "07", "1", "8", "09-12", "MS Core", "2.5", "", "07", "K-8"];
        Table::from_rows(["grade"], raw.iter().map(|g| vec![Value::from(*g)]).collect()).unwrap()
    }

    #[test]
    fn test_profile_counts() {
        let profile = ColumnProfiler::new(DatatypeConverter::default(), 3)
            .run(&grades(), "grade")
            .unwrap();
        assert_eq!(profile.column, "grade");
        assert_eq!(profile.total_count, 10);
        assert_eq!(profile.empty_count, 1);
        assert_eq!(profile.distinct_count, 7);
        assert_eq!(profile.datatypes.get(&"int".to_owned()), 4);
        assert_eq!(profile.datatypes.get(&"float".to_owned()), 1);
        assert_eq!(profile.datatypes.get(&"str".to_owned()), 4);
        assert_eq!(profile.distinct_datatypes.get(&"int".to_owned()), 3);
        assert_eq!(profile.distinct_datatypes.get(&"str".to_owned()), 3);
    }

    #[test]
    fn test_min_max_per_type() {
        let profile = ColumnProfiler::new(DatatypeConverter::default(), 3)
            .run(&grades(), 0_usize)
            .unwrap();
        assert_eq!(
            profile.min_max["int"],
            MinMax {
                minimum: Value::Int(1),
                maximum: Value::Int(8)
            }
        );
        assert_eq!(
            profile.min_max["str"],
            MinMax {
                minimum: Value::from("09-12"),
                maximum: Value::from("MS Core")
            }
        );
        assert_eq!(profile.min_max.len(), 3);
    }

    #[test]
    fn test_top_values() {
        let profile = ColumnProfiler::new(DatatypeConverter::default(), 2)
            .run(&grades(), "grade")
            .unwrap();
        assert_eq!(
            profile.top_values,
            vec![(Value::from("09-12"), 2), (Value::from("07"), 2)]
        );
    }

    #[test]
    fn test_profile_dataframe() {
        let table = Table::from_rows(
            ["Dept", "Age"],
            vec![
                vec!["R&D".into(), 31.into()],
                vec!["Ops".into(), Value::Null],
                vec!["R&D".into(), 27.into()],
            ],
        )
        .unwrap();
        let df = table.to_dataframe().unwrap();
        let profiles = profile_dataframe(&df, &DatatypeConverter::default(), 5).unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].column, "Dept");
        assert_eq!(profiles[0].top_values[0], (Value::from("R&D"), 2));
        assert_eq!(profiles[1].empty_count, 1);
        assert_eq!(
            profiles[1].min_max["int"],
            MinMax {
                minimum: Value::Int(27),
                maximum: Value::Int(31)
            }
        );
    }

    #[test]
    fn test_empty_column() {
        let mut profiler = ColumnProfiler::new(DatatypeConverter::default(), 3);
        profiler.add(&Value::Null);
        let profile = profiler.finish("blank").unwrap();
        assert_eq!(profile.total_count, 1);
        assert_eq!(profile.distinct_count, 0);
        assert!(profile.min_max.is_empty());
        assert!(profile.top_values.is_empty());
    }
}
