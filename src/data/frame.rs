//! Conversion between [`Table`] and polars data frames.
//!
//! A table column becomes a typed polars column when its non-null values
//! agree on a type: all booleans, all integers, or integers mixed with
//! floats (stored as `Float64`). Any other mix is stored as strings. Row
//! identifiers do not survive the trip; a table read back from a frame gets
//! the dense index `0..n`.

use super::{Row, Schema, Table, Value, cell};
use crate::error::{OpencleanError, Result};
use polars::prelude::{AnyValue, Column, DataFrame, NamedFrom as _, Series};

/// Storage type chosen for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Empty,
    Bool,
    Int,
    Float,
    Text,
}

impl Kind {
    fn of(value: &Value) -> Self {
        match value {
            Value::Null => Self::Empty,
            Value::Bool(_) => Self::Bool,
            Value::Int(_) => Self::Int,
            Value::Float(_) => Self::Float,
            Value::Str(_) | Value::List(_) => Self::Text,
        }
    }

    fn merge(self, other: Self) -> Self {
        match (self, other) {
            (Self::Empty, kind) | (kind, Self::Empty) => kind,
            (a, b) if a == b => a,
            (Self::Int, Self::Float) | (Self::Float, Self::Int) => Self::Float,
            _ => Self::Text,
        }
    }
}

/// Build one polars column from cell values.
pub(crate) fn series_from_values(name: &str, values: &[&Value]) -> Series {
    let kind = values
        .iter()
        .fold(Kind::Empty, |kind, value| kind.merge(Kind::of(value)));
    match kind {
        Kind::Bool => {
            let cells: Vec<Option<bool>> = values.iter().map(|v| v.as_bool()).collect();
            Series::new(name.into(), cells)
        }
        Kind::Int => {
            let cells: Vec<Option<i64>> = values
                .iter()
                .map(|v| match v {
                    Value::Int(i) => Some(*i),
                    _ => None,
                })
                .collect();
            Series::new(name.into(), cells)
        }
        Kind::Float => {
            let cells: Vec<Option<f64>> = values.iter().map(|v| v.as_f64()).collect();
            Series::new(name.into(), cells)
        }
        Kind::Empty | Kind::Text => {
            let cells: Vec<Option<String>> = values
                .iter()
                .map(|v| (!v.is_null()).then(|| v.to_text()))
                .collect();
            Series::new(name.into(), cells)
        }
    }
}

/// Cell value for a polars scalar. Types without a native counterpart keep
/// their display form.
pub(crate) fn value_from_any(value: AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(b),
        AnyValue::Int8(i) => Value::Int(i64::from(i)),
        AnyValue::Int16(i) => Value::Int(i64::from(i)),
        AnyValue::Int32(i) => Value::Int(i64::from(i)),
        AnyValue::Int64(i) => Value::Int(i),
        AnyValue::UInt8(u) => Value::Int(i64::from(u)),
        AnyValue::UInt16(u) => Value::Int(i64::from(u)),
        AnyValue::UInt32(u) => Value::Int(i64::from(u)),
        AnyValue::UInt64(u) => i64::try_from(u).map_or(Value::Float(u as f64), Value::Int),
        AnyValue::Float32(x) => Value::Float(f64::from(x)),
        AnyValue::Float64(x) => Value::Float(x),
        AnyValue::String(s) => Value::from(s),
        AnyValue::StringOwned(s) => Value::from(s.as_str()),
        other => Value::Str(other.to_string()),
    }
}

impl Table {
    /// Copy the table into a polars data frame, one typed column per table
    /// column.
    ///
    /// # Errors
    ///
    /// Fails when polars rejects the columns.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.width());
        for (pos, name) in self.schema().iter().enumerate() {
            let values = self
                .rows()
                .iter()
                .map(|row| cell(row, pos))
                .collect::<Result<Vec<_>>>()?;
            columns.push(Column::from(series_from_values(name, &values)));
        }
        Ok(DataFrame::new(columns)?)
    }

    /// Read a polars data frame into a table with the index `0..n`.
    ///
    /// # Errors
    ///
    /// Fails on duplicate column names or when a cell cannot be read.
    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let schema = Schema::new(df.get_column_names().iter().map(|name| name.as_str()))?;
        let columns = df.get_columns();
        let mut rows: Vec<Row> = Vec::with_capacity(df.height());
        for pos in 0..df.height() {
            let row = columns
                .iter()
                .map(|column| column.get(pos).map(value_from_any))
                .collect::<std::result::Result<Row, _>>()?;
            rows.push(row);
        }
        Self::new(schema, rows)
    }
}

impl TryFrom<&DataFrame> for Table {
    type Error = OpencleanError;

    fn try_from(df: &DataFrame) -> Result<Self> {
        Self::from_dataframe(df)
    }
}

impl TryFrom<&Table> for DataFrame {
    type Error = OpencleanError;

    fn try_from(table: &Table) -> Result<Self> {
        table.to_dataframe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::DataType;

    fn mixed() -> Table {
        Table::with_index(
            Schema::new(["Name", "Age", "Score", "Active", "Code"]).unwrap(),
            vec![4, 9],
            vec![
                vec!["Ann".into(), 31.into(), 2.into(), true.into(), 7.into()],
                vec![Value::Null, Value::Null, 2.5.into(), false.into(), "x7".into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_column_types() {
        let df = mixed().to_dataframe().unwrap();
        assert_eq!(df.shape(), (2, 5));
        let dtypes: Vec<DataType> = df.dtypes();
        assert_eq!(
            dtypes,
            [
                DataType::String,
                DataType::Int64,
                DataType::Float64,
                DataType::Boolean,
                DataType::String
            ]
        );
        let age = df.column("Age").unwrap().as_materialized_series();
        assert_eq!(age.null_count(), 1);
    }

    #[test]
    fn test_read_back_resets_index() {
        let table = Table::try_from(&mixed().to_dataframe().unwrap()).unwrap();
        assert_eq!(table.index(), [0, 1]);
        assert_eq!(table.schema().names(), ["Name", "Age", "Score", "Active", "Code"]);
        assert_eq!(
            table.rows()[0],
            vec![
                Value::from("Ann"),
                Value::Int(31),
                Value::Float(2.0),
                Value::Bool(true),
                Value::from("7"),
            ]
        );
        assert_eq!(table.rows()[1][0], Value::Null);
    }

    #[test]
    fn test_empty_table() {
        let table = Table::empty(Schema::new(["A"]).unwrap());
        let df = DataFrame::try_from(&table).unwrap();
        assert_eq!(df.shape(), (0, 1));
        assert!(Table::from_dataframe(&df).unwrap().is_empty());
    }
}
