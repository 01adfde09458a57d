//! Core data model: cell values, schemas, column references, the in-memory
//! table container, frequency counters, and the row source/sink contracts.
//!
//! Rows are plain `Vec<Value>` paired with an opaque [`RowId`]. Row
//! identifiers are unique within a source but need not be contiguous; they
//! survive filtering and projection.

use crate::error::{OpencleanError, Result};

pub mod counter;
pub mod frame;
pub mod schema;
pub mod stream;
pub mod table;
pub mod value;

pub use counter::Counter;
pub use schema::{ColumnRef, Schema, column_refs};
pub use table::Table;
pub use value::Value;

/// Stable identifier of a row within its source.
pub type RowId = u64;

/// Ordered cell values for one row.
pub type Row = Vec<Value>;

/// Cell at `pos`, or [`OpencleanError::UnknownColumn`] past the end of the row.
pub(crate) fn cell(row: &[Value], pos: usize) -> Result<&Value> {
    row.get(pos).ok_or_else(|| {
        OpencleanError::UnknownColumn(format!("position {pos} in a row of {} values", row.len()))
    })
}
