//! Functional dependency and unique key checks.

use crate::data::{ColumnRef, Counter, Table, Value};
use crate::error::Result;
use crate::grouping::frame::project;
use crate::grouping::groupby::{column_key, group_positions, with_unique_index};
use crate::grouping::{DataFrameGrouping, DataFrameViolation};
use std::sync::Arc;
use tracing::debug;

/// Groups of rows that agree on `lhs` but disagree on `rhs`. Each group
/// carries the counter of its `rhs` values as metadata.
pub fn fd_violations(
    table: impl Into<Arc<Table>>,
    lhs: &[ColumnRef],
    rhs: &[ColumnRef],
) -> Result<DataFrameViolation> {
    let table = with_unique_index(table.into());
    let rhs_positions = table.schema().resolve_all(rhs)?;
    let buckets = group_positions(&table, column_key(lhs)?)?;
    let mut violations = DataFrameViolation::new(Arc::clone(&table), lhs.to_vec(), rhs.to_vec());
    for (key, rows) in buckets {
        let values: Counter<Value> = rows
            .iter()
            .map(|&pos| project(table.row_at(pos)?, &rhs_positions))
            .collect::<Result<_>>()?;
        if values.len() > 1 {
            violations.add(key, rows, Some(values))?;
        }
    }
    debug!(groups = violations.len(), "Found functional dependency violations");
    Ok(violations)
}

/// Groups of more than one row sharing the same value for a candidate key.
pub fn key_violations(
    table: impl Into<Arc<Table>>,
    columns: &[ColumnRef],
) -> Result<DataFrameGrouping> {
    let table = with_unique_index(table.into());
    let buckets = group_positions(&table, column_key(columns)?)?;
    let mut grouping = DataFrameGrouping::new(Arc::clone(&table));
    for (key, rows) in buckets.into_iter().filter(|(_, rows)| rows.len() > 1) {
        grouping.add(key, rows)?;
    }
    Ok(grouping)
}
