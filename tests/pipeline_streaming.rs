//! End-to-end tests for streaming pipelines over tables and CSV files.

use openclean::data::stream::{CsvFile, RowReader, RowSource, TableSource};
use openclean::data::{Schema, Table, Value};
use openclean::function::{Eval, Predicate};
use openclean::pipeline::DataPipeline;
use openclean::profiling::DatatypeConverter;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

fn people() -> Table {
    let rows = [
        ("alice", 32),
        ("bob", 45),
        ("claire", 27),
        ("dave", 61),
        ("eve", 19),
        ("frank", 38),
    ];
    Table::from_rows(
        ["Name", "Age"],
        rows.into_iter()
            .map(|(name, age)| vec![Value::from(name), Value::from(age)])
            .collect(),
    )
    .unwrap()
}

/// Table source that counts how many rows were pulled from it.
#[derive(Debug)]
struct CountingSource {
    inner: TableSource,
    pulled: Arc<AtomicUsize>,
}

impl RowSource for CountingSource {
    fn columns(&self) -> openclean::error::Result<Schema> {
        self.inner.columns()
    }

    fn open(&self) -> openclean::error::Result<RowReader<'_>> {
        let pulled = Arc::clone(&self.pulled);
        let rows = self.inner.open()?;
        Ok(Box::new(rows.inspect(move |_| {
            pulled.fetch_add(1, Ordering::SeqCst);
        })))
    }
}

#[test]
fn test_filter_keeps_row_ids_and_columns() {
    let older = DataPipeline::stream_table(people())
        .filter(Predicate::gt("Age", 30), None)
        .to_table()
        .unwrap();

    assert_eq!(older.schema().names(), ["Name", "Age"]);
    assert_eq!(older.index(), [0, 1, 3, 5]);
    assert_eq!(older.rows()[2], vec![Value::from("dave"), Value::from(61)]);
}

#[test]
fn test_limit_stops_reading_the_source() {
    let pulled = Arc::new(AtomicUsize::new(0));
    let source = CountingSource {
        inner: TableSource::new(people()),
        pulled: Arc::clone(&pulled),
    };

    let first = DataPipeline::new(source).limit(2).to_table().unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(pulled.load(Ordering::SeqCst), 2);
}

#[test]
fn test_head_after_filter_reads_only_what_it_needs() {
    let pulled = Arc::new(AtomicUsize::new(0));
    let source = CountingSource {
        inner: TableSource::new(people()),
        pulled: Arc::clone(&pulled),
    };

    let head = DataPipeline::new(source)
        .filter(Predicate::lt("Age", 30), None)
        .head(1)
        .unwrap();

    assert_eq!(head.index(), [2]);
    assert_eq!(pulled.load(Ordering::SeqCst), 3);
}

#[test]
fn test_derived_pipelines_do_not_affect_each_other() {
    let base = DataPipeline::stream_table(people()).filter(Predicate::ge("Age", 30), None);
    let upper = base.update(["Name"], Eval::upper("Name")).unwrap();
    let names = base.select(["Name"]);

    assert_eq!(base.len(), 1);
    assert_eq!(upper.len(), 2);
    assert_eq!(base.count().unwrap(), 4);
    assert_eq!(upper.head(1).unwrap().rows()[0][0], Value::from("ALICE"));
    assert_eq!(base.head(1).unwrap().rows()[0][0], Value::from("alice"));
    assert_eq!(names.columns().unwrap().names(), ["Name"]);
}

#[test]
fn test_csv_typecast_filter_and_write() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("people.csv");
    let output = dir.path().join("out/older.csv");
    std::fs::write(
        &input,
        "Name,Age,City\nalice,32,Oslo\nbob,45,Bergen\nclaire,27,Oslo\ndave,61,Tromso\n",
    )
    .unwrap();
    std::fs::create_dir_all(output.parent().unwrap()).unwrap();

    let written = DataPipeline::stream_csv(&input)
        .typecast(DatatypeConverter::default())
        .filter(Predicate::gt("Age", 40), None)
        .select(["City", "Name"])
        .write(CsvFile::new(&output))
        .unwrap();

    assert_eq!(written, 2);
    let text = std::fs::read_to_string(&output).unwrap();
    assert_eq!(text, "City,Name\nBergen,bob\nTromso,dave\n");
}

#[test]
fn test_csv_row_ids_are_zero_based() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("cities.csv");
    std::fs::write(&input, "City\nOslo\nBergen\nOslo\n").unwrap();

    let pipeline = DataPipeline::stream_csv(&input);
    let oslo = pipeline
        .filter(Predicate::eq("City", "Oslo"), None)
        .to_table()
        .unwrap();
    assert_eq!(oslo.index(), [0, 2]);

    let counts = pipeline.distinct_columns(["City"]).unwrap();
    assert_eq!(counts.get(&Value::from("Oslo")), 2);
    assert_eq!(counts.get(&Value::from("Bergen")), 1);
}

#[test]
fn test_iterrows_yields_transformed_rows() {
    let pipeline = DataPipeline::stream_table(people())
        .insert(vec!["Senior".to_owned()], None, Eval::from(Predicate::ge("Age", 40)))
        .unwrap()
        .limit(3);

    let rows: Vec<_> = pipeline
        .iterrows()
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(rows.len(), 3);
    let flags: Vec<&Value> = rows.iter().map(|(_, row)| &row[2]).collect();
    assert_eq!(flags, [&Value::Bool(false), &Value::Bool(true), &Value::Bool(false)]);
}

#[test]
fn test_unknown_column_fails_before_reading() {
    let pulled = Arc::new(AtomicUsize::new(0));
    let source = CountingSource {
        inner: TableSource::new(people()),
        pulled: Arc::clone(&pulled),
    };

    let result = DataPipeline::new(source)
        .filter(Predicate::eq("Country", "NO"), None)
        .count();

    assert!(result.is_err());
    assert_eq!(pulled.load(Ordering::SeqCst), 0);
}

#[test]
fn test_short_csv_rows_under_supplied_header_are_rejected() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("keys.csv");
    std::fs::write(&input, "a\nb\n").unwrap();

    let result = DataPipeline::new(CsvFile::new(&input).with_header(["Key", "Count"]))
        .select(["Count"])
        .to_table();

    let err = result.unwrap_err();
    assert!(
        matches!(err, openclean::error::OpencleanError::Malformed { row: 0, .. }),
        "unexpected error: {err}"
    );
}
