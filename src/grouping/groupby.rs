//! Group the rows of a table by the value of a key function.

use super::frame::DataFrameGrouping;
use crate::data::{ColumnRef, Table, Value};
use crate::error::{OpencleanError, Result};
use crate::function::{Callable, Eval, EvalFunction as _};
use indexmap::IndexMap;
use polars::prelude::DataFrame;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Callback deciding whether a group is kept. Must return `Value::Bool`.
pub type GroupPredicate = Arc<dyn Fn(&Table) -> Value + Send + Sync>;

/// Selection of groups after grouping.
#[derive(Clone)]
pub enum Having {
    /// Keep groups with exactly this many rows.
    Size(usize),
    /// Keep groups for which the callback returns `true`.
    Predicate(GroupPredicate),
}

impl Having {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Table) -> Value + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    fn keep(&self, table: &Table, rows: &[usize]) -> Result<bool> {
        match self {
            Self::Size(n) => Ok(rows.len() == *n),
            Self::Predicate(f) => match f(&table.take(rows)?) {
                Value::Bool(keep) => Ok(keep),
                other => Err(OpencleanError::Contract(format!(
                    "having callback returned {} value '{other}', expected a boolean",
                    other.type_label()
                ))),
            },
        }
    }
}

impl fmt::Debug for Having {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Size(n) => f.debug_tuple("Size").field(n).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Table with a dense `0..n` index when its row identifiers repeat.
pub(crate) fn with_unique_index(table: Arc<Table>) -> Arc<Table> {
    if table.has_duplicate_index() {
        debug!(rows = table.len(), "Resetting duplicate row index before grouping");
        Arc::new(Arc::unwrap_or_clone(table).reset_index())
    } else {
        table
    }
}

/// Row positions per key value, in first-seen key order.
pub(crate) fn group_positions(table: &Table, key: Eval) -> Result<IndexMap<Value, Vec<usize>>> {
    let key = key.prepared(table.schema())?;
    let mut buckets: IndexMap<Value, Vec<usize>> = IndexMap::new();
    for (pos, row) in table.rows().iter().enumerate() {
        buckets.entry(key.eval(row)?).or_default().push(pos);
    }
    Ok(buckets)
}

/// Group rows by the result of `key`. A list result is used as a tuple key.
///
/// If the table's row identifiers contain duplicates the grouping is built
/// over a copy with a dense index.
pub fn groupby(
    table: impl Into<Arc<Table>>,
    key: Eval,
    having: Option<&Having>,
) -> Result<DataFrameGrouping> {
    let table = with_unique_index(table.into());
    let buckets = group_positions(&table, key)?;
    let mut grouping = DataFrameGrouping::new(Arc::clone(&table));
    for (key, rows) in buckets {
        if let Some(having) = having
            && !having.keep(&table, &rows)?
        {
            continue;
        }
        grouping.add(key, rows)?;
    }
    debug!(groups = grouping.len(), "Grouped table");
    Ok(grouping)
}

/// Group the rows of a polars data frame by the result of `key`. The
/// grouping is backed by a table copy of the frame with the index `0..n`.
///
/// # Errors
///
/// Fails when the frame cannot be read, or as [`groupby`] does.
pub fn groupby_dataframe(
    df: &DataFrame,
    key: Eval,
    having: Option<&Having>,
) -> Result<DataFrameGrouping> {
    groupby(Table::from_dataframe(df)?, key, having)
}

/// Group by the values of one or more columns.
pub fn groupby_columns(
    table: impl Into<Arc<Table>>,
    columns: &[ColumnRef],
    having: Option<&Having>,
) -> Result<DataFrameGrouping> {
    groupby(table, column_key(columns)?, having)
}

/// Group by the result of `func` applied to the values of `columns`.
pub fn groupby_apply(
    table: impl Into<Arc<Table>>,
    columns: &[ColumnRef],
    func: Callable,
    having: Option<&Having>,
) -> Result<DataFrameGrouping> {
    let key = Eval::apply_to_columns(func, columns.iter().cloned())?;
    groupby(table, key, having)
}

pub(crate) fn column_key(columns: &[ColumnRef]) -> Result<Eval> {
    match columns {
        [] => Err(OpencleanError::construction("no key columns given")),
        [column] => Ok(Eval::col(column.clone())),
        _ => Ok(Eval::cols(columns.iter().cloned())),
    }
}
