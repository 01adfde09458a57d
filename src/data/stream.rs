//! Row source and row sink contracts.
//!
//! A [`RowSource`] exposes a schema and a scoped reader over
//! `(row id, row values)` pairs. The reader owns whatever handle backs it
//! (an open file, a borrowed table) and releases it when dropped, which
//! covers normal exhaustion as well as early termination of a pipeline.
//! A [`RowSink`] is the write-side counterpart.

pub mod csv_file;

use super::{Row, RowId, Schema, Table, Value};
use crate::error::Result;
use std::fmt;
use std::sync::Arc;

pub use csv_file::{CsvFile, CsvWriter};

/// Scoped iterator over the rows of a source.
pub type RowReader<'a> = Box<dyn Iterator<Item = Result<(RowId, Row)>> + 'a>;

/// Supplier of rows and their schema.
pub trait RowSource: fmt::Debug + Send + Sync {
    /// Column names of the rows produced by [`RowSource::open`].
    fn columns(&self) -> Result<Schema>;

    /// Open the source for reading.
    fn open(&self) -> Result<RowReader<'_>>;
}

/// Consumer of rows written by a pipeline.
pub trait RowSink {
    fn write_header(&mut self, schema: &Schema) -> Result<()>;

    fn write(&mut self, row: &[Value]) -> Result<()>;

    /// Flush buffered output.
    fn finish(&mut self) -> Result<()>;
}

/// Row source over an in-memory table.
#[derive(Debug, Clone)]
pub struct TableSource {
    table: Arc<Table>,
}

impl TableSource {
    pub fn new(table: impl Into<Arc<Table>>) -> Self {
        Self {
            table: table.into(),
        }
    }

    pub fn table(&self) -> &Table {
        &self.table
    }
}

impl RowSource for TableSource {
    fn columns(&self) -> Result<Schema> {
        Ok(self.table.schema().clone())
    }

    fn open(&self) -> Result<RowReader<'_>> {
        Ok(Box::new(
            self.table.iter().map(|(id, row)| Ok((id, row.clone()))),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_source_preserves_ids() {
        let table = Table::with_index(
            Schema::new(["A"]).unwrap(),
            vec![10, 20],
            vec![vec![Value::Int(1)], vec![Value::Int(2)]],
        )
        .unwrap();
        let source = TableSource::new(table);
        assert_eq!(source.columns().unwrap().names(), ["A"]);
        let rows: Vec<(RowId, Row)> = source.open().unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(rows[0], (10, vec![Value::Int(1)]));
        assert_eq!(rows[1], (20, vec![Value::Int(2)]));
    }
}
