//! Immutable, structurally shared pipeline builder.

use crate::data::stream::{CsvFile, RowReader, RowSource, TableSource};
use crate::data::{ColumnRef, Counter, Row, RowId, Schema, Table, Value, column_refs};
use crate::error::{OpencleanError, Result};
use crate::function::Predicate;
use crate::operator::{
    Collect, ConsumerChain, Distinct, Filter, InsCol, InsertValues, Limit, Profile, Rename,
    RowCount, Select, StreamCollector, StreamOperator, StreamStats, Typecast, Update, UpdateFn,
    Write,
};
use crate::profiling::{ColumnProfile, DatatypeConverter};
use polars::prelude::DataFrame;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// One link of the persistent operator list.
struct OpNode {
    op: Arc<dyn StreamOperator>,
    prev: Option<Arc<OpNode>>,
}

/// A row source plus an ordered list of stream operators.
///
/// Builder methods never modify the pipeline they are called on; they return
/// a new pipeline whose operator list extends the existing one without
/// copying it. Nothing is read from the source until one of the execution
/// methods (`run`, `stream`, `to_table`, `count`, ...) is called, and every
/// execution opens fresh consumers.
///
/// ```
/// use openclean::data::Table;
/// use openclean::function::Predicate;
/// use openclean::pipeline::DataPipeline;
///
/// let table = Table::from_rows(
///     ["Name", "Age"],
///     vec![vec!["Ann".into(), 31.into()], vec!["Bo".into(), 24.into()]],
/// )?;
/// let pipeline = DataPipeline::stream_table(table);
/// let adults = pipeline.filter(Predicate::gt("Age", 30), None);
/// assert_eq!(adults.count()?, 1);
/// assert_eq!(pipeline.count()?, 2);
/// # Ok::<(), openclean::error::OpencleanError>(())
/// ```
#[derive(Clone)]
pub struct DataPipeline {
    source: Arc<dyn RowSource>,
    tail: Option<Arc<OpNode>>,
    len: usize,
}

impl DataPipeline {
    pub fn new(source: impl RowSource + 'static) -> Self {
        Self::from_shared(Arc::new(source))
    }

    /// Pipeline over a source that may be shared with other pipelines.
    pub fn from_shared(source: Arc<dyn RowSource>) -> Self {
        Self {
            source,
            tail: None,
            len: 0,
        }
    }

    /// Stream the rows of an in-memory table.
    pub fn stream_table(table: impl Into<Arc<Table>>) -> Self {
        Self::new(TableSource::new(table))
    }

    /// Stream a CSV file with a header line. The delimiter is inferred from
    /// the file extension.
    pub fn stream_csv(path: impl Into<PathBuf>) -> Self {
        Self::new(CsvFile::new(path))
    }

    pub fn source(&self) -> &dyn RowSource {
        self.source.as_ref()
    }

    /// Number of operators in the pipeline.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Operators from first to last.
    pub fn operators(&self) -> Vec<Arc<dyn StreamOperator>> {
        let mut ops = Vec::with_capacity(self.len);
        let mut node = self.tail.as_deref();
        while let Some(current) = node {
            ops.push(Arc::clone(&current.op));
            node = current.prev.as_deref();
        }
        ops.reverse();
        ops
    }

    // -- Builders ---------------------------------------------------------

    /// New pipeline with `op` appended.
    pub fn append(&self, op: impl StreamOperator + 'static) -> Self {
        self.append_shared(Arc::new(op))
    }

    pub fn append_shared(&self, op: Arc<dyn StreamOperator>) -> Self {
        Self {
            source: Arc::clone(&self.source),
            tail: Some(Arc::new(OpNode {
                op,
                prev: self.tail.clone(),
            })),
            len: self.len + 1,
        }
    }

    /// Keep rows satisfying `predicate`, optionally followed by a limit.
    pub fn filter(&self, predicate: Predicate, limit: Option<usize>) -> Self {
        let filtered = self.append(Filter::new(predicate));
        match limit {
            Some(rows) => filtered.limit(rows),
            None => filtered,
        }
    }

    /// Synonym for [`DataPipeline::filter`].
    pub fn where_(&self, predicate: Predicate, limit: Option<usize>) -> Self {
        self.filter(predicate, limit)
    }

    /// Remove rows satisfying `predicate`.
    pub fn delete(&self, predicate: Predicate) -> Self {
        self.append(Filter::delete(predicate))
    }

    /// Keep only the given columns, in the given order.
    pub fn select<I, C>(&self, columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        self.append(Select::new(column_refs(columns)))
    }

    /// Select columns and give them new names, in the same order.
    pub fn select_as<I, C>(&self, columns: I, names: Vec<String>) -> Result<Self>
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        let columns = column_refs(columns);
        let positions: Vec<ColumnRef> = (0..columns.len()).map(ColumnRef::Position).collect();
        let rename = Rename::new(positions, names)?;
        Ok(self.append(Select::new(columns)).append(rename))
    }

    /// Rename the given columns; `names` pairs with `columns` by position.
    pub fn rename<I, C>(&self, columns: I, names: Vec<String>) -> Result<Self>
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        Ok(self.append(Rename::new(column_refs(columns), names)?))
    }

    /// Insert columns at `pos`, or append them when `pos` is `None`.
    pub fn insert(
        &self,
        names: Vec<String>,
        pos: Option<usize>,
        values: impl Into<InsertValues>,
    ) -> Result<Self> {
        Ok(self.append(InsCol::new(names, pos, values.into())?))
    }

    /// Replace the values of `columns` with the result of `func`.
    pub fn update<I, C>(&self, columns: I, func: impl Into<UpdateFn>) -> Result<Self>
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        Ok(self.append(Update::new(column_refs(columns), func.into())?))
    }

    /// Convert every cell with `converter`.
    pub fn typecast(&self, converter: DatatypeConverter) -> Self {
        self.append(Typecast::new(converter))
    }

    /// Stop the stream after `rows` surviving rows.
    pub fn limit(&self, rows: usize) -> Self {
        self.append(Limit::new(rows))
    }

    // -- Execution --------------------------------------------------------

    /// Output schema, computed by opening every operator against the source
    /// schema. No rows are read.
    pub fn columns(&self) -> Result<Schema> {
        let chain = ConsumerChain::without_terminal(&self.operators(), &self.source.columns()?)?;
        Ok(chain.schema().clone())
    }

    /// Stream all rows into `collector` and return its result.
    pub fn stream<T>(&self, collector: &dyn StreamCollector<Output = T>) -> Result<T> {
        self.stream_with_stats(collector).map(|(result, _)| result)
    }

    /// Like [`DataPipeline::stream`], also returning the row counts.
    pub fn stream_with_stats<T>(
        &self,
        collector: &dyn StreamCollector<Output = T>,
    ) -> Result<(T, StreamStats)> {
        let ops = self.operators();
        let chain = ConsumerChain::open(&ops, &self.source.columns()?, collector)?;
        let (result, stats) = chain.drive(self.source.open()?)?;
        debug!(
            operators = ops.len(),
            rows_read = stats.rows_read,
            rows_emitted = stats.rows_emitted,
            "Pipeline run finished"
        );
        let result = result
            .ok_or_else(|| OpencleanError::Other("collector produced no result".to_owned()))?;
        Ok((result, stats))
    }

    /// Stream every row through the operators without a collector. Returns
    /// `None` for a pipeline without operators; the source is not read.
    pub fn run(&self) -> Result<Option<StreamStats>> {
        if self.is_empty() {
            return Ok(None);
        }
        let chain = ConsumerChain::without_terminal(&self.operators(), &self.source.columns()?)?;
        let (_, stats) = chain.drive(self.source.open()?)?;
        Ok(Some(stats))
    }

    /// Materialize the surviving rows, keeping their row identifiers.
    pub fn to_table(&self) -> Result<Table> {
        self.stream(&Collect)
    }

    /// Materialize the surviving rows as a polars data frame. Row
    /// identifiers are dropped.
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        self.to_table()?.to_dataframe()
    }

    /// First `rows` surviving rows. Stops reading the source after them.
    pub fn head(&self, rows: usize) -> Result<Table> {
        self.limit(rows).to_table()
    }

    /// Number of surviving rows.
    pub fn count(&self) -> Result<usize> {
        self.stream(&RowCount)
    }

    /// Frequency of distinct rows.
    pub fn distinct(&self) -> Result<Counter<Value>> {
        self.stream(&Distinct::default())
    }

    /// Frequency of distinct values of the given columns. Keys are plain
    /// values for one column and lists for several.
    pub fn distinct_columns<I, C>(&self, columns: I) -> Result<Counter<Value>>
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        self.select(columns).distinct()
    }

    /// Profile all columns, or the given ones.
    pub fn profile(&self, columns: Option<Vec<ColumnRef>>) -> Result<Vec<ColumnProfile>> {
        self.stream(&Profile::new(columns))
    }

    /// Write the surviving rows to `file`; returns the number of rows written.
    pub fn write(&self, file: CsvFile) -> Result<usize> {
        self.stream(&Write::new(file))
    }

    /// Lazy iterator over surviving `(row id, row)` pairs.
    ///
    /// Operators are opened immediately so binding errors surface here. The
    /// source is read one row at a time as the iterator advances.
    pub fn iterrows(&self) -> Result<RowIter<'_>> {
        let chain = ConsumerChain::without_terminal(&self.operators(), &self.source.columns()?)?;
        Ok(RowIter {
            chain: Some(chain),
            reader: Some(self.source.open()?),
        })
    }
}

impl fmt::Debug for DataPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.operators().iter().map(|op| op.name()).collect();
        f.debug_struct("DataPipeline")
            .field("source", &self.source)
            .field("operators", &names)
            .finish()
    }
}

/// Iterator returned by [`DataPipeline::iterrows`].
///
/// The source reader is released and the consumers are closed as soon as the
/// stream ends, either because the source is exhausted or an operator stopped
/// it.
pub struct RowIter<'a> {
    chain: Option<ConsumerChain<()>>,
    reader: Option<RowReader<'a>>,
}

impl RowIter<'_> {
    fn finish(&mut self) -> Result<()> {
        self.reader = None;
        if let Some(chain) = self.chain.take() {
            chain.close()?;
        }
        Ok(())
    }
}

impl Iterator for RowIter<'_> {
    type Item = Result<(RowId, Row)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let chain = self.chain.as_mut()?;
            let next = if chain.is_exhausted() {
                None
            } else {
                self.reader.as_mut().and_then(Iterator::next)
            };
            let Some(item) = next else {
                return self.finish().err().map(Err);
            };
            let pushed = item.and_then(|(row_id, row)| {
                chain.push(row_id, row).map(|out| out.map(|row| (row_id, row)))
            });
            match pushed {
                Ok(Some(out)) => return Some(Ok(out)),
                Ok(None) => {}
                Err(err) => {
                    self.chain = None;
                    self.reader = None;
                    return Some(Err(err));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::Eval;

    fn people() -> Table {
        Table::from_rows(
            ["Name", "Age"],
            vec![
                vec!["Alice".into(), 32.into()],
                vec!["Bob".into(), 45.into()],
                vec!["Claire".into(), 27.into()],
                vec!["Dave".into(), 56.into()],
                vec!["Eve".into(), 19.into()],
                vec!["Frank".into(), 38.into()],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_builders_share_prefix() {
        let base = DataPipeline::stream_table(people()).filter(Predicate::gt("Age", 30), None);
        let named = base.select(["Name"]);
        let aged = base.select(["Age"]);
        assert_eq!(base.len(), 1);
        assert_eq!(named.len(), 2);
        assert!(Arc::ptr_eq(&named.operators()[0], &aged.operators()[0]));
        assert_eq!(named.columns().unwrap().names(), ["Name"]);
        assert_eq!(aged.columns().unwrap().names(), ["Age"]);
        assert_eq!(base.columns().unwrap().names(), ["Name", "Age"]);
    }

    #[test]
    fn test_filter_with_limit() {
        let pipeline = DataPipeline::stream_table(people()).filter(Predicate::gt("Age", 30), Some(2));
        assert_eq!(pipeline.len(), 2);
        let table = pipeline.to_table().unwrap();
        assert_eq!(table.index(), [0, 1]);
    }

    #[test]
    fn test_where_is_filter() {
        let pipeline = DataPipeline::stream_table(people());
        let filtered = pipeline.filter(Predicate::lt("Age", 40), Some(2)).to_table().unwrap();
        let matched = pipeline.where_(Predicate::lt("Age", 40), Some(2)).to_table().unwrap();
        assert_eq!(matched, filtered);
        assert_eq!(matched.index(), [0, 2]);
        assert_eq!(pipeline.where_(Predicate::lt("Age", 40), None).count().unwrap(), 4);
    }

    #[test]
    fn test_to_dataframe() {
        let df = DataPipeline::stream_table(people())
            .filter(Predicate::gt("Age", 40), None)
            .to_dataframe()
            .unwrap();
        assert_eq!(df.shape(), (2, 2));
        let ages = df.column("Age").unwrap().as_materialized_series();
        assert_eq!(ages.dtype(), &polars::prelude::DataType::Int64);
        assert_eq!(ages.i64().unwrap().get(1), Some(56));
    }

    #[test]
    fn test_run_without_operators() {
        let pipeline = DataPipeline::stream_table(people());
        assert!(pipeline.run().unwrap().is_none());
        let stats = pipeline.limit(3).run().unwrap().unwrap();
        assert_eq!(stats.rows_read, 3);
        assert_eq!(stats.rows_emitted, 3);
    }

    #[test]
    fn test_select_as() {
        let pipeline = DataPipeline::stream_table(people());
        assert!(pipeline.select_as(["Name", "Age"], vec!["N".to_owned()]).is_err());
        let renamed = pipeline
            .select_as(["Age", "Name"], vec!["Years".to_owned(), "Who".to_owned()])
            .unwrap();
        let head = renamed.head(1).unwrap();
        assert_eq!(head.schema().names(), ["Years", "Who"]);
        assert_eq!(head.rows()[0], vec![Value::Int(32), Value::from("Alice")]);
    }

    #[test]
    fn test_distinct_columns() {
        let pipeline = DataPipeline::stream_table(people())
            .insert(vec!["Group".to_owned()], None, Eval::from(Predicate::ge("Age", 30)))
            .unwrap();
        let groups = pipeline.distinct_columns(["Group"]).unwrap();
        assert_eq!(groups.get(&Value::Bool(true)), 4);
        assert_eq!(groups.get(&Value::Bool(false)), 2);
        assert_eq!(pipeline.distinct().unwrap().len(), 6);
    }

    #[test]
    fn test_iterrows_is_lazy_and_stops() {
        let pipeline = DataPipeline::stream_table(people())
            .delete(Predicate::lt("Age", 30))
            .limit(2);
        let rows: Vec<(RowId, Row)> = pipeline.iterrows().unwrap().collect::<Result<_>>().unwrap();
        let ids: Vec<RowId> = rows.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, [0, 1]);

        let err = DataPipeline::stream_table(people())
            .select(["Height"])
            .iterrows()
            .err()
            .unwrap();
        assert!(matches!(err, OpencleanError::UnknownColumn(_)));
    }

    #[test]
    fn test_evaluation_error_aborts_run() {
        let pipeline = DataPipeline::stream_table(people())
            .update(["Age"], Eval::upper("Age"))
            .unwrap();
        assert!(matches!(
            pipeline.to_table().unwrap_err(),
            OpencleanError::Type(_)
        ));
    }
}
