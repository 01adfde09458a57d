//! Consumer contracts and the chain that drives rows through them.

use crate::data::stream::RowReader;
use crate::data::{Row, RowId, Schema};
use crate::error::Result;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Outcome of handing one row to a consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// The (possibly transformed) row survives.
    Emit(Row),
    /// The row is filtered out. Terminal consumers return this for every
    /// row they absorb.
    Drop,
    /// The row survives and the stream ends after it.
    EmitLast(Row),
    /// The stream ends now; the row is not forwarded.
    Stop,
}

/// Stateful, schema-bound row handler created by an operator or collector.
pub trait StreamConsumer {
    type Output;

    fn consume(&mut self, row_id: RowId, row: Row) -> Result<Flow>;

    /// `true` once the consumer will not accept further rows. Checked before
    /// the source is asked for the next row.
    fn is_exhausted(&self) -> bool {
        false
    }

    /// Finish the stream and produce the consumer's result.
    fn close(self: Box<Self>) -> Result<Self::Output>;
}

/// Consumer of an intermediate stage.
pub type BoxedConsumer = Box<dyn StreamConsumer<Output = ()>>;

/// An opened intermediate stage: its output schema and its consumer.
pub struct OpenedStage {
    pub schema: Schema,
    pub consumer: BoxedConsumer,
}

impl OpenedStage {
    pub fn new(schema: Schema, consumer: impl StreamConsumer<Output = ()> + 'static) -> Self {
        Self {
            schema,
            consumer: Box::new(consumer),
        }
    }
}

impl fmt::Debug for OpenedStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenedStage")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// Immutable factory for intermediate consumers. Operators are shared between
/// pipelines; every run opens fresh consumers.
pub trait StreamOperator: fmt::Debug + Send + Sync {
    /// Bind to the input schema, returning the output schema and a consumer.
    fn open(&self, schema: &Schema) -> Result<OpenedStage>;

    /// Short name used in log output.
    fn name(&self) -> &'static str;
}

/// Factory for the terminal consumer that produces a run's result.
pub trait StreamCollector {
    type Output;

    fn open(&self, schema: &Schema) -> Result<Box<dyn StreamConsumer<Output = Self::Output>>>;
}

/// Row counts observed while driving a chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    /// Rows pulled from the source.
    pub rows_read: usize,
    /// Rows that survived every intermediate stage.
    pub rows_emitted: usize,
}

/// Opened intermediate stages plus an optional terminal consumer.
pub struct ConsumerChain<T> {
    stages: Vec<BoxedConsumer>,
    terminal: Option<Box<dyn StreamConsumer<Output = T>>>,
    schema: Schema,
    stats: StreamStats,
    stopped: bool,
}

impl ConsumerChain<()> {
    /// Chain without a terminal consumer; surviving rows are handed back by
    /// [`ConsumerChain::push`].
    pub fn without_terminal(operators: &[Arc<dyn StreamOperator>], schema: &Schema) -> Result<Self> {
        Self::build(operators, schema, None)
    }
}

impl<T> ConsumerChain<T> {
    /// Open every operator against the output schema of its predecessor, then
    /// the collector against the final schema.
    pub fn open(
        operators: &[Arc<dyn StreamOperator>],
        schema: &Schema,
        collector: &dyn StreamCollector<Output = T>,
    ) -> Result<Self> {
        Self::build(operators, schema, Some(collector))
    }

    fn build(
        operators: &[Arc<dyn StreamOperator>],
        schema: &Schema,
        collector: Option<&dyn StreamCollector<Output = T>>,
    ) -> Result<Self> {
        let mut schema = schema.clone();
        let mut stages = Vec::with_capacity(operators.len());
        for op in operators {
            let stage = op.open(&schema)?;
            debug!(operator = op.name(), columns = %stage.schema, "Opened stage");
            schema = stage.schema;
            stages.push(stage.consumer);
        }
        let terminal = collector.map(|c| c.open(&schema)).transpose()?;
        Ok(Self {
            stages,
            terminal,
            schema,
            stats: StreamStats::default(),
            stopped: false,
        })
    }

    /// Schema of the rows leaving the last intermediate stage.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    /// `true` once any consumer refuses further rows or the stream was stopped.
    pub fn is_exhausted(&self) -> bool {
        self.stopped
            || self.stages.iter().any(|s| s.is_exhausted())
            || self.terminal.as_ref().is_some_and(|t| t.is_exhausted())
    }

    /// Pass one row through the stages. Returns the surviving row when the
    /// chain has no terminal consumer.
    pub fn push(&mut self, row_id: RowId, row: Row) -> Result<Option<Row>> {
        self.stats.rows_read += 1;
        let mut current = Some(row);
        for stage in &mut self.stages {
            let Some(row) = current.take() else {
                break;
            };
            match stage.consume(row_id, row)? {
                Flow::Emit(out) => current = Some(out),
                Flow::EmitLast(out) => {
                    current = Some(out);
                    self.stopped = true;
                }
                Flow::Drop => {}
                Flow::Stop => self.stopped = true,
            }
        }
        let Some(row) = current else {
            return Ok(None);
        };
        self.stats.rows_emitted += 1;
        match self.terminal.as_mut() {
            Some(terminal) => {
                if matches!(terminal.consume(row_id, row)?, Flow::EmitLast(_) | Flow::Stop) {
                    self.stopped = true;
                }
                Ok(None)
            }
            None => Ok(Some(row)),
        }
    }

    /// Pull rows from `reader` until it is exhausted or the chain stops, then
    /// close the chain. The reader is dropped before the consumers close.
    pub fn drive(mut self, mut reader: RowReader<'_>) -> Result<(Option<T>, StreamStats)> {
        while !self.is_exhausted() {
            let Some(item) = reader.next() else {
                break;
            };
            let (row_id, row) = item?;
            self.push(row_id, row)?;
        }
        drop(reader);
        let stats = self.stats;
        Ok((self.close()?, stats))
    }

    /// Close intermediate stages in order, then the terminal consumer.
    pub fn close(self) -> Result<Option<T>> {
        for stage in self.stages {
            stage.close()?;
        }
        debug!(
            rows_read = self.stats.rows_read,
            rows_emitted = self.stats.rows_emitted,
            "Closed consumer chain"
        );
        self.terminal.map(|t| t.close()).transpose()
    }
}
