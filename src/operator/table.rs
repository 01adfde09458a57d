//! One-shot application of operators to an in-memory table.
//!
//! Each helper streams the table through a single operator and collects the
//! surviving rows into a new table. Row identifiers are preserved.

use super::collector::Collect;
use super::stream::{ConsumerChain, StreamOperator};
use super::transform::{Filter, InsCol, InsertValues, Limit, Rename, Select, Typecast, Update, UpdateFn};
use crate::data::stream::{RowSource as _, TableSource};
use crate::data::{ColumnRef, Row, Table, Value};
use crate::error::{OpencleanError, Result};
use crate::function::Predicate;
use crate::grouping::frame::project;
use crate::profiling::DatatypeConverter;
use indexmap::IndexMap;
use std::sync::Arc;

/// Run `operators` over `table` and materialize the result.
pub fn transform(table: &Table, operators: &[Arc<dyn StreamOperator>]) -> Result<Table> {
    // The source clones rows on read; the input table is left untouched.
    let source = TableSource::new(table.clone());
    let chain = ConsumerChain::open(operators, &source.columns()?, &Collect)?;
    let (result, _) = chain.drive(source.open()?)?;
    result.ok_or_else(|| OpencleanError::Other("collector produced no result".to_owned()))
}

fn apply(table: &Table, op: impl StreamOperator + 'static) -> Result<Table> {
    let op: Arc<dyn StreamOperator> = Arc::new(op);
    transform(table, &[op])
}

pub fn filter(table: &Table, predicate: Predicate) -> Result<Table> {
    apply(table, Filter::new(predicate))
}

pub fn delete(table: &Table, predicate: Predicate) -> Result<Table> {
    apply(table, Filter::delete(predicate))
}

pub fn select(table: &Table, columns: Vec<ColumnRef>) -> Result<Table> {
    apply(table, Select::new(columns))
}

pub fn rename(table: &Table, columns: Vec<ColumnRef>, names: Vec<String>) -> Result<Table> {
    apply(table, Rename::new(columns, names)?)
}

pub fn limit(table: &Table, rows: usize) -> Result<Table> {
    apply(table, Limit::new(rows))
}

pub fn insert(
    table: &Table,
    names: Vec<String>,
    pos: Option<usize>,
    values: InsertValues,
) -> Result<Table> {
    apply(table, InsCol::new(names, pos, values)?)
}

pub fn update(table: &Table, columns: Vec<ColumnRef>, func: UpdateFn) -> Result<Table> {
    apply(table, Update::new(columns, func)?)
}

pub fn typecast(table: &Table, converter: DatatypeConverter) -> Result<Table> {
    apply(table, Typecast::new(converter))
}

/// Table of the values of `columns` next to what `func` turns them into, one
/// row per distinct source value in first-seen order. A source value seen
/// again with a different result keeps the last one.
///
/// Without `names` the columns are `source` and `target`, or `source0..` and
/// `target0..` when several columns are mapped.
///
/// # Errors
///
/// Fails for unknown columns, a `names` list that does not hold one name per
/// source and target column, or when `func` fails on a row.
pub fn mapping(
    table: &Table,
    columns: Vec<ColumnRef>,
    func: UpdateFn,
    names: Option<Vec<String>>,
) -> Result<Table> {
    let positions = table.schema().resolve_all(&columns)?;
    let width = positions.len();
    let names = names.unwrap_or_else(|| mapping_names(width));
    if names.len() != 2 * width {
        return Err(OpencleanError::construction(format!(
            "expected {} column names for the mapping, got {}",
            2 * width,
            names.len()
        )));
    }
    let updated = update(table, columns, func)?;
    let mut pairs: IndexMap<Value, Value> = IndexMap::new();
    for (before, after) in table.rows().iter().zip(updated.rows()) {
        pairs.insert(project(before, &positions)?, project(after, &positions)?);
    }
    let rows = pairs
        .into_iter()
        .map(|(source, target)| {
            let mut row = spread(source, width);
            row.extend(spread(target, width));
            row
        })
        .collect();
    Table::from_rows(names, rows)
}

fn mapping_names(width: usize) -> Vec<String> {
    if width == 1 {
        return vec!["source".to_owned(), "target".to_owned()];
    }
    let sources = (0..width).map(|i| format!("source{i}"));
    let targets = (0..width).map(|i| format!("target{i}"));
    sources.chain(targets).collect()
}

fn spread(value: Value, width: usize) -> Row {
    match value {
        Value::List(values) if width > 1 => values,
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Schema, Value};
    use crate::function::Eval;

    fn people() -> Table {
        Table::with_index(
            Schema::new(["Name", "Age"]).unwrap(),
            vec![10, 11, 12, 13],
            vec![
                vec!["alice".into(), 32.into()],
                vec!["bob".into(), 45.into()],
                vec!["claire".into(), 27.into()],
                vec!["dave".into(), Value::Null],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_filter_preserves_ids() {
        let out = filter(&people(), Predicate::gt("Age", 30)).unwrap();
        assert_eq!(out.index(), [10, 11]);
        assert_eq!(out.schema(), people().schema());
    }

    #[test]
    fn test_delete_is_complement() {
        let kept = filter(&people(), Predicate::is_empty("Age")).unwrap();
        let rest = delete(&people(), Predicate::is_empty("Age")).unwrap();
        assert_eq!(kept.len() + rest.len(), 4);
        assert_eq!(kept.index(), [13]);
    }

    #[test]
    fn test_chained_transform() {
        let ops: Vec<Arc<dyn StreamOperator>> = vec![
            Arc::new(Update::new(vec!["Name".into()], Eval::upper("Name").into()).unwrap()),
            Arc::new(Select::new(vec!["Name".into()])),
            Arc::new(Limit::new(2)),
        ];
        let out = transform(&people(), &ops).unwrap();
        assert_eq!(out.schema().names(), ["Name"]);
        assert_eq!(out.rows(), [vec![Value::from("ALICE")], vec![Value::from("BOB")]]);
        // Input is not modified.
        assert_eq!(people().rows()[0][0], Value::from("alice"));
    }

    #[test]
    fn test_insert_and_rename() {
        let out = insert(&people(), vec!["Country".to_owned()], Some(1), Value::from("NO").into()).unwrap();
        assert_eq!(out.schema().names(), ["Name", "Country", "Age"]);
        let out = rename(&out, vec![1_usize.into()], vec!["Land".to_owned()]).unwrap();
        assert_eq!(out.schema().names(), ["Name", "Land", "Age"]);
        assert_eq!(limit(&out, 0).unwrap().len(), 0);
    }

    #[test]
    fn test_typecast_table() {
        let table = Table::from_rows(["N"], vec![vec!["7".into()], vec!["x".into()]]).unwrap();
        let out = typecast(&table, DatatypeConverter::default()).unwrap();
        assert_eq!(out.rows()[0][0], Value::Int(7));
        assert!(select(&out, vec!["M".into()]).is_err());
    }

    #[test]
    fn test_mapping_of_single_column() {
        let table = Table::from_rows(
            ["Name"],
            vec![vec!["ann".into()], vec!["Bo".into()], vec!["ann".into()]],
        )
        .unwrap();
        let out = mapping(&table, vec!["Name".into()], Eval::upper("Name").into(), None).unwrap();
        assert_eq!(out.schema().names(), ["source", "target"]);
        assert_eq!(
            out.rows(),
            [
                vec![Value::from("ann"), Value::from("ANN")],
                vec![Value::from("Bo"), Value::from("BO")],
            ]
        );
    }

    #[test]
    fn test_mapping_of_several_columns() {
        let swap = crate::function::Callable::new(
            "swap",
            crate::function::Arity::Exactly(2),
            |args| Ok(Value::List(args.iter().rev().cloned().collect())),
        );
        let out = mapping(
            &people(),
            vec!["Name".into(), "Age".into()],
            swap.into(),
            None,
        )
        .unwrap();
        assert_eq!(out.schema().names(), ["source0", "source1", "target0", "target1"]);
        assert_eq!(out.len(), 4);
        assert_eq!(
            out.row(0).unwrap(),
            &vec![Value::from("alice"), Value::Int(32), Value::Int(32), Value::from("alice")]
        );
    }

    #[test]
    fn test_mapping_names() {
        let names = vec!["Before".to_owned(), "After".to_owned()];
        let out = mapping(&people(), vec!["Age".into()], Value::Int(0).into(), Some(names)).unwrap();
        assert_eq!(out.schema().names(), ["Before", "After"]);
        assert_eq!(out.len(), 4);

        let err = mapping(&people(), vec!["Age".into()], Value::Int(0).into(), Some(vec![])).unwrap_err();
        assert!(matches!(err, OpencleanError::Construction(_)));
    }
}
