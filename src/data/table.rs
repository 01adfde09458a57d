//! In-memory tabular container.

use super::{ColumnRef, Row, RowId, Schema, Value, cell};
use crate::error::{OpencleanError, Result};
use std::collections::HashSet;

/// A materialized table: schema, row identifiers and row values.
///
/// This is the externally supplied container the pipeline and grouping code
/// work against. It is never modified in place by either; transformations
/// produce new tables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    schema: Schema,
    index: Vec<RowId>,
    rows: Vec<Row>,
}

impl Table {
    /// Create a table with the default index `0..n`.
    pub fn new(schema: Schema, rows: Vec<Row>) -> Result<Self> {
        let index = (0..rows.len() as RowId).collect();
        Self::with_index(schema, index, rows)
    }

    /// Create a table with explicit row identifiers.
    pub fn with_index(schema: Schema, index: Vec<RowId>, rows: Vec<Row>) -> Result<Self> {
        if index.len() != rows.len() {
            return Err(OpencleanError::construction(format!(
                "{} row identifiers for {} rows",
                index.len(),
                rows.len()
            )));
        }
        if let Some((pos, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != schema.len())
        {
            return Err(OpencleanError::construction(format!(
                "row {pos} has {} values, schema has {} columns",
                row.len(),
                schema.len()
            )));
        }
        Ok(Self {
            schema,
            index,
            rows,
        })
    }

    /// Convenience constructor from column names and rows.
    pub fn from_rows<I, S>(columns: I, rows: Vec<Row>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(Schema::new(columns)?, rows)
    }

    /// Empty table with the given schema.
    pub fn empty(schema: Schema) -> Self {
        Self {
            schema,
            index: Vec::new(),
            rows: Vec::new(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn index(&self) -> &[RowId] {
        &self.index
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.schema.len()
    }

    pub fn row(&self, pos: usize) -> Option<&Row> {
        self.rows.get(pos)
    }

    /// Row at `pos`, failing when the position is out of range.
    pub(crate) fn row_at(&self, pos: usize) -> Result<&Row> {
        self.rows.get(pos).ok_or_else(|| {
            OpencleanError::construction(format!(
                "row position {pos} out of range for {} rows",
                self.rows.len()
            ))
        })
    }

    pub fn row_id(&self, pos: usize) -> Option<RowId> {
        self.index.get(pos).copied()
    }

    /// Iterate `(row id, row)` pairs in positional order.
    pub fn iter(&self) -> impl Iterator<Item = (RowId, &Row)> {
        self.index.iter().copied().zip(self.rows.iter())
    }

    /// All values of one column.
    pub fn column(&self, column: impl Into<ColumnRef>) -> Result<Vec<&Value>> {
        let pos = self.schema.resolve(&column.into())?;
        self.rows.iter().map(|row| cell(row, pos)).collect()
    }

    /// Table with the rows at the given positions, keeping their identifiers.
    pub fn take(&self, positions: &[usize]) -> Result<Self> {
        let mut index = Vec::with_capacity(positions.len());
        let mut rows = Vec::with_capacity(positions.len());
        for &pos in positions {
            let (Some(row), Some(id)) = (self.rows.get(pos), self.index.get(pos)) else {
                return Err(OpencleanError::construction(format!(
                    "row position {pos} out of range for {} rows",
                    self.rows.len()
                )));
            };
            index.push(*id);
            rows.push(row.clone());
        }
        Ok(Self {
            schema: self.schema.clone(),
            index,
            rows,
        })
    }

    pub fn has_duplicate_index(&self) -> bool {
        let mut seen = HashSet::with_capacity(self.index.len());
        !self.index.iter().all(|id| seen.insert(*id))
    }

    /// Replace the row identifiers with the dense range `0..n`.
    pub fn reset_index(mut self) -> Self {
        self.index = (0..self.rows.len() as RowId).collect();
        self
    }

    /// Break the table into its parts.
    pub fn into_parts(self) -> (Schema, Vec<RowId>, Vec<Row>) {
        (self.schema, self.index, self.rows)
    }
}
