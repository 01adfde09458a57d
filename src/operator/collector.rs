//! Terminal consumers that produce the result of a pipeline run.

use super::stream::{Flow, StreamCollector, StreamConsumer};
use crate::data::stream::{CsvFile, CsvWriter, RowSink as _};
use crate::data::{ColumnRef, Counter, Row, RowId, Schema, Table, Value, cell};
use crate::error::Result;
use crate::grouping::frame::project;
use crate::profiling::{ColumnProfile, ColumnProfiler, DatatypeConverter};
use tracing::info;

/// Materializes the stream as a [`Table`], keeping row identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct Collect;

struct CollectConsumer {
    schema: Schema,
    index: Vec<RowId>,
    rows: Vec<Row>,
}

impl StreamCollector for Collect {
    type Output = Table;

    fn open(&self, schema: &Schema) -> Result<Box<dyn StreamConsumer<Output = Table>>> {
        Ok(Box::new(CollectConsumer {
            schema: schema.clone(),
            index: Vec::new(),
            rows: Vec::new(),
        }))
    }
}

impl StreamConsumer for CollectConsumer {
    type Output = Table;

    fn consume(&mut self, row_id: RowId, row: Row) -> Result<Flow> {
        self.index.push(row_id);
        self.rows.push(row);
        Ok(Flow::Drop)
    }

    fn close(self: Box<Self>) -> Result<Table> {
        Table::with_index(self.schema, self.index, self.rows)
    }
}

/// Counts the rows reaching the end of the pipeline.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowCount;

struct RowCountConsumer(usize);

impl StreamCollector for RowCount {
    type Output = usize;

    fn open(&self, _schema: &Schema) -> Result<Box<dyn StreamConsumer<Output = usize>>> {
        Ok(Box::new(RowCountConsumer(0)))
    }
}

impl StreamConsumer for RowCountConsumer {
    type Output = usize;

    fn consume(&mut self, _row_id: RowId, _row: Row) -> Result<Flow> {
        self.0 += 1;
        Ok(Flow::Drop)
    }

    fn close(self: Box<Self>) -> Result<usize> {
        Ok(self.0)
    }
}

/// Frequency of distinct values. With one column the keys are plain values,
/// with several they are lists; with none the whole row is the key.
#[derive(Debug, Clone, Default)]
pub struct Distinct {
    columns: Vec<ColumnRef>,
}

impl Distinct {
    pub fn new(columns: Vec<ColumnRef>) -> Self {
        Self { columns }
    }
}

struct DistinctConsumer {
    positions: Vec<usize>,
    counts: Counter<Value>,
}

impl StreamCollector for Distinct {
    type Output = Counter<Value>;

    fn open(&self, schema: &Schema) -> Result<Box<dyn StreamConsumer<Output = Counter<Value>>>> {
        let positions = if self.columns.is_empty() {
            (0..schema.len()).collect()
        } else {
            schema.resolve_all(&self.columns)?
        };
        Ok(Box::new(DistinctConsumer {
            positions,
            counts: Counter::new(),
        }))
    }
}

impl StreamConsumer for DistinctConsumer {
    type Output = Counter<Value>;

    fn consume(&mut self, _row_id: RowId, row: Row) -> Result<Flow> {
        self.counts.add(project(&row, &self.positions)?);
        Ok(Flow::Drop)
    }

    fn close(self: Box<Self>) -> Result<Counter<Value>> {
        Ok(self.counts)
    }
}

/// Per-column profiles of the streamed rows.
#[derive(Debug, Clone)]
pub struct Profile {
    columns: Option<Vec<ColumnRef>>,
    top_k: usize,
    converter: DatatypeConverter,
}

impl Profile {
    /// Profile all columns, or only `columns` when given.
    pub fn new(columns: Option<Vec<ColumnRef>>) -> Self {
        Self {
            columns,
            top_k: 10,
            converter: DatatypeConverter::default(),
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_converter(mut self, converter: DatatypeConverter) -> Self {
        self.converter = converter;
        self
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new(None)
    }
}

struct ProfileConsumer {
    columns: Vec<(usize, String, ColumnProfiler)>,
}

impl StreamCollector for Profile {
    type Output = Vec<ColumnProfile>;

    fn open(&self, schema: &Schema) -> Result<Box<dyn StreamConsumer<Output = Vec<ColumnProfile>>>> {
        let positions = match &self.columns {
            Some(columns) => schema.resolve_all(columns)?,
            None => (0..schema.len()).collect(),
        };
        let columns = positions
            .into_iter()
            .map(|pos| {
                let name = schema.name(pos).unwrap_or_default().to_owned();
                let profiler = ColumnProfiler::new(self.converter.clone(), self.top_k);
                (pos, name, profiler)
            })
            .collect();
        Ok(Box::new(ProfileConsumer { columns }))
    }
}

impl StreamConsumer for ProfileConsumer {
    type Output = Vec<ColumnProfile>;

    fn consume(&mut self, _row_id: RowId, row: Row) -> Result<Flow> {
        for (pos, _, profiler) in &mut self.columns {
            profiler.add(cell(&row, *pos)?);
        }
        Ok(Flow::Drop)
    }

    fn close(self: Box<Self>) -> Result<Vec<ColumnProfile>> {
        self.columns
            .into_iter()
            .map(|(_, name, profiler)| profiler.finish(name))
            .collect()
    }
}

/// Writes the streamed rows to a CSV file and returns the number written.
#[derive(Debug, Clone)]
pub struct Write {
    file: CsvFile,
}

impl Write {
    pub fn new(file: CsvFile) -> Self {
        Self { file }
    }
}

struct WriteConsumer {
    writer: CsvWriter,
    path: String,
    written: usize,
}

impl StreamCollector for Write {
    type Output = usize;

    fn open(&self, schema: &Schema) -> Result<Box<dyn StreamConsumer<Output = usize>>> {
        let mut writer = self.file.writer()?;
        writer.write_header(schema)?;
        Ok(Box::new(WriteConsumer {
            writer,
            path: self.file.path().display().to_string(),
            written: 0,
        }))
    }
}

impl StreamConsumer for WriteConsumer {
    type Output = usize;

    fn consume(&mut self, _row_id: RowId, row: Row) -> Result<Flow> {
        self.writer.write(&row)?;
        self.written += 1;
        Ok(Flow::Drop)
    }

    fn close(mut self: Box<Self>) -> Result<usize> {
        self.writer.finish()?;
        info!(rows = self.written, path = %self.path, "Wrote output file");
        Ok(self.written)
    }
}
