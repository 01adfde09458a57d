//! Row transforming operators.

use super::stream::{Flow, OpenedStage, StreamConsumer, StreamOperator};
use crate::data::{ColumnRef, Row, RowId, Schema, Value, cell};
use crate::error::{OpencleanError, Result};
use crate::function::{Callable, Eval, EvalFunction as _, Predicate};
use crate::profiling::DatatypeConverter;
use std::collections::HashMap;

/// Keeps the rows that satisfy a predicate, or removes them when negated.
#[derive(Debug, Clone)]
pub struct Filter {
    predicate: Predicate,
    negated: bool,
}

impl Filter {
    pub fn new(predicate: Predicate) -> Self {
        Self {
            predicate,
            negated: false,
        }
    }

    /// Filter that drops the rows satisfying `predicate`.
    pub fn delete(predicate: Predicate) -> Self {
        Self {
            predicate,
            negated: true,
        }
    }
}

struct FilterConsumer {
    predicate: Predicate,
    negated: bool,
}

impl StreamOperator for Filter {
    fn open(&self, schema: &Schema) -> Result<OpenedStage> {
        let predicate = self.predicate.clone().prepared(schema)?;
        Ok(OpenedStage::new(
            schema.clone(),
            FilterConsumer {
                predicate,
                negated: self.negated,
            },
        ))
    }

    fn name(&self) -> &'static str {
        if self.negated { "delete" } else { "filter" }
    }
}

impl StreamConsumer for FilterConsumer {
    type Output = ();

    fn consume(&mut self, _row_id: RowId, row: Row) -> Result<Flow> {
        if self.predicate.test(&row)? != self.negated {
            Ok(Flow::Emit(row))
        } else {
            Ok(Flow::Drop)
        }
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Projects rows onto a list of columns, in the given order.
#[derive(Debug, Clone)]
pub struct Select {
    columns: Vec<ColumnRef>,
}

impl Select {
    pub fn new(columns: Vec<ColumnRef>) -> Self {
        Self { columns }
    }
}

struct SelectConsumer {
    positions: Vec<usize>,
}

impl StreamOperator for Select {
    fn open(&self, schema: &Schema) -> Result<OpenedStage> {
        let positions = schema.resolve_all(&self.columns)?;
        let projected = schema.project(&positions)?;
        Ok(OpenedStage::new(projected, SelectConsumer { positions }))
    }

    fn name(&self) -> &'static str {
        "select"
    }
}

impl StreamConsumer for SelectConsumer {
    type Output = ();

    fn consume(&mut self, _row_id: RowId, row: Row) -> Result<Flow> {
        let selected = self
            .positions
            .iter()
            .map(|&pos| cell(&row, pos).cloned())
            .collect::<Result<Row>>()?;
        Ok(Flow::Emit(selected))
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Renames columns. Rows pass through unchanged.
#[derive(Debug, Clone)]
pub struct Rename {
    columns: Vec<ColumnRef>,
    names: Vec<String>,
}

impl Rename {
    pub fn new(columns: Vec<ColumnRef>, names: Vec<String>) -> Result<Self> {
        if columns.len() != names.len() {
            return Err(OpencleanError::construction(format!(
                "{} new names for {} columns",
                names.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, names })
    }
}

/// Consumer that forwards every row as is.
struct PassThrough;

impl StreamConsumer for PassThrough {
    type Output = ();

    fn consume(&mut self, _row_id: RowId, row: Row) -> Result<Flow> {
        Ok(Flow::Emit(row))
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

impl StreamOperator for Rename {
    fn open(&self, schema: &Schema) -> Result<OpenedStage> {
        let positions = schema.resolve_all(&self.columns)?;
        Ok(OpenedStage::new(
            schema.rename(&positions, &self.names)?,
            PassThrough,
        ))
    }

    fn name(&self) -> &'static str {
        "rename"
    }
}

/// Passes at most `rows` rows and then ends the stream.
#[derive(Debug, Clone, Copy)]
pub struct Limit {
    rows: usize,
}

impl Limit {
    pub fn new(rows: usize) -> Self {
        Self { rows }
    }
}

struct LimitConsumer {
    limit: usize,
    count: usize,
}

impl StreamOperator for Limit {
    fn open(&self, schema: &Schema) -> Result<OpenedStage> {
        Ok(OpenedStage::new(
            schema.clone(),
            LimitConsumer {
                limit: self.rows,
                count: 0,
            },
        ))
    }

    fn name(&self) -> &'static str {
        "limit"
    }
}

impl StreamConsumer for LimitConsumer {
    type Output = ();

    fn consume(&mut self, _row_id: RowId, row: Row) -> Result<Flow> {
        if self.count >= self.limit {
            return Ok(Flow::Stop);
        }
        self.count += 1;
        if self.count == self.limit {
            Ok(Flow::EmitLast(row))
        } else {
            Ok(Flow::Emit(row))
        }
    }

    fn is_exhausted(&self) -> bool {
        self.count >= self.limit
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Values for inserted columns.
#[derive(Debug, Clone)]
pub enum InsertValues {
    /// Same value in every new column.
    Const(Value),
    /// One constant per new column.
    List(Vec<Value>),
    /// Row function; must return a list when more than one column is
    /// inserted.
    Eval(Eval),
}

impl Default for InsertValues {
    fn default() -> Self {
        Self::Const(Value::Null)
    }
}

impl From<Value> for InsertValues {
    fn from(value: Value) -> Self {
        Self::Const(value)
    }
}

impl From<Eval> for InsertValues {
    fn from(f: Eval) -> Self {
        Self::Eval(f)
    }
}

/// Inserts new columns at a position, or appends them.
#[derive(Debug, Clone)]
pub struct InsCol {
    names: Vec<String>,
    pos: Option<usize>,
    values: InsertValues,
}

impl InsCol {
    pub fn new(names: Vec<String>, pos: Option<usize>, values: InsertValues) -> Result<Self> {
        if names.is_empty() {
            return Err(OpencleanError::construction("no column names to insert"));
        }
        if let InsertValues::List(list) = &values
            && list.len() != names.len()
        {
            return Err(OpencleanError::construction(format!(
                "{} values for {} inserted columns",
                list.len(),
                names.len()
            )));
        }
        Ok(Self { names, pos, values })
    }
}

struct InsColConsumer {
    pos: usize,
    width: usize,
    values: InsertValues,
}

impl InsColConsumer {
    fn new_values(&self, row: &Row) -> Result<Vec<Value>> {
        match &self.values {
            InsertValues::Const(value) => Ok(vec![value.clone(); self.width]),
            InsertValues::List(list) => Ok(list.clone()),
            InsertValues::Eval(f) => expand(f.eval(row)?, self.width),
        }
    }
}

/// Spread a function result over `width` columns.
fn expand(result: Value, width: usize) -> Result<Vec<Value>> {
    if width == 1 {
        return Ok(vec![result]);
    }
    match result {
        Value::List(values) if values.len() == width => Ok(values),
        other => Err(OpencleanError::type_error(format!(
            "expected a list of {width} values, got '{other}'"
        ))),
    }
}

impl StreamOperator for InsCol {
    fn open(&self, schema: &Schema) -> Result<OpenedStage> {
        let out = schema.insert(self.pos, &self.names)?;
        let mut values = self.values.clone();
        if let InsertValues::Eval(f) = &mut values {
            f.prepare(schema)?;
        }
        Ok(OpenedStage::new(
            out,
            InsColConsumer {
                pos: self.pos.unwrap_or(schema.len()),
                width: self.names.len(),
                values,
            },
        ))
    }

    fn name(&self) -> &'static str {
        "insert"
    }
}

impl StreamConsumer for InsColConsumer {
    type Output = ();

    fn consume(&mut self, _row_id: RowId, mut row: Row) -> Result<Flow> {
        let values = self.new_values(&row)?;
        row.splice(self.pos..self.pos, values);
        Ok(Flow::Emit(row))
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// How updated cells get their new values.
#[derive(Debug, Clone)]
pub enum UpdateFn {
    /// Same value in every updated cell.
    Const(Value),
    /// Function over the whole row.
    Eval(Eval),
    /// Lookup of each updated cell; unmapped values stay unchanged.
    Map(HashMap<Value, Value>),
    /// Function over the values of the updated columns.
    Callable(Callable),
}

impl From<Value> for UpdateFn {
    fn from(value: Value) -> Self {
        Self::Const(value)
    }
}

impl From<Eval> for UpdateFn {
    fn from(f: Eval) -> Self {
        Self::Eval(f)
    }
}

impl From<HashMap<Value, Value>> for UpdateFn {
    fn from(mapping: HashMap<Value, Value>) -> Self {
        Self::Map(mapping)
    }
}

impl From<Callable> for UpdateFn {
    fn from(func: Callable) -> Self {
        Self::Callable(func)
    }
}

/// Replaces the values of one or more columns. A function updating several
/// columns must return a list with one value per column.
#[derive(Debug, Clone)]
pub struct Update {
    columns: Vec<ColumnRef>,
    func: UpdateFn,
}

impl Update {
    pub fn new(columns: Vec<ColumnRef>, func: UpdateFn) -> Result<Self> {
        if columns.is_empty() {
            return Err(OpencleanError::construction("no columns to update"));
        }
        Ok(Self { columns, func })
    }
}

struct UpdateConsumer {
    positions: Vec<usize>,
    func: UpdateFn,
}

impl StreamOperator for Update {
    fn open(&self, schema: &Schema) -> Result<OpenedStage> {
        let positions = schema.resolve_all(&self.columns)?;
        let mut func = self.func.clone();
        if let UpdateFn::Eval(f) = &mut func {
            f.prepare(schema)?;
        }
        Ok(OpenedStage::new(
            schema.clone(),
            UpdateConsumer { positions, func },
        ))
    }

    fn name(&self) -> &'static str {
        "update"
    }
}

impl StreamConsumer for UpdateConsumer {
    type Output = ();

    fn consume(&mut self, _row_id: RowId, mut row: Row) -> Result<Flow> {
        let width = self.positions.len();
        let values = match &self.func {
            UpdateFn::Const(value) => vec![value.clone(); width],
            UpdateFn::Map(mapping) => self
                .positions
                .iter()
                .map(|&pos| {
                    let value = cell(&row, pos)?;
                    Ok(mapping.get(value).unwrap_or(value).clone())
                })
                .collect::<Result<Vec<_>>>()?,
            UpdateFn::Eval(f) => expand(f.eval(&row)?, width)?,
            UpdateFn::Callable(func) => {
                let args = self
                    .positions
                    .iter()
                    .map(|&pos| cell(&row, pos).cloned())
                    .collect::<Result<Vec<_>>>()?;
                expand(func.call(&args)?, width)?
            }
        };
        let row_len = row.len();
        for (&pos, value) in self.positions.iter().zip(values) {
            let slot = row.get_mut(pos).ok_or_else(|| {
                OpencleanError::UnknownColumn(format!("position {pos} in a row of {row_len} values"))
            })?;
            *slot = value;
        }
        Ok(Flow::Emit(row))
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Converts every cell with a [`DatatypeConverter`].
#[derive(Debug, Clone, Default)]
pub struct Typecast {
    converter: DatatypeConverter,
}

impl Typecast {
    pub fn new(converter: DatatypeConverter) -> Self {
        Self { converter }
    }
}

struct TypecastConsumer {
    converter: DatatypeConverter,
}

impl StreamOperator for Typecast {
    fn open(&self, schema: &Schema) -> Result<OpenedStage> {
        Ok(OpenedStage::new(
            schema.clone(),
            TypecastConsumer {
                converter: self.converter.clone(),
            },
        ))
    }

    fn name(&self) -> &'static str {
        "typecast"
    }
}

impl StreamConsumer for TypecastConsumer {
    type Output = ();

    fn consume(&mut self, _row_id: RowId, row: Row) -> Result<Flow> {
        Ok(Flow::Emit(
            row.iter().map(|v| self.converter.convert(v)).collect(),
        ))
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::ConsumerChain;
    use std::sync::Arc;

    fn run(op: impl StreamOperator + 'static, schema: &Schema, rows: Vec<Row>) -> Result<(Schema, Vec<Row>)> {
        let ops: Vec<Arc<dyn StreamOperator>> = vec![Arc::new(op)];
        let mut chain = ConsumerChain::without_terminal(&ops, schema)?;
        let mut out = Vec::new();
        for (id, row) in rows.into_iter().enumerate() {
            if chain.is_exhausted() {
                break;
            }
            if let Some(row) = chain.push(id as RowId, row)? {
                out.push(row);
            }
        }
        let schema = chain.schema().clone();
        chain.close()?;
        Ok((schema, out))
    }

    fn schema() -> Schema {
        Schema::new(["Name", "Age"]).unwrap()
    }

    fn rows() -> Vec<Row> {
        vec![
            vec!["Alice".into(), 32.into()],
            vec!["Bob".into(), 45.into()],
            vec!["Claire".into(), 27.into()],
        ]
    }

    #[test]
    fn test_filter_and_delete() {
        let (_, kept) = run(Filter::new(Predicate::gt("Age", 30)), &schema(), rows()).unwrap();
        assert_eq!(kept.len(), 2);
        let (_, kept) = run(Filter::delete(Predicate::gt("Age", 30)), &schema(), rows()).unwrap();
        assert_eq!(kept, vec![vec![Value::from("Claire"), Value::Int(27)]]);
    }

    #[test]
    fn test_select_reorders() {
        let op = Select::new(vec!["Age".into(), "Name".into()]);
        let (schema, out) = run(op, &schema(), rows()).unwrap();
        assert_eq!(schema.names(), ["Age", "Name"]);
        assert_eq!(out[0], vec![Value::Int(32), Value::from("Alice")]);
        assert!(Select::new(vec!["Height".into()]).open(&self::schema()).is_err());
    }

    #[test]
    fn test_short_rows_are_errors() {
        let short = vec![vec![Value::from("Alice")]];
        let err = run(Select::new(vec!["Age".into()]), &schema(), short.clone()).unwrap_err();
        assert!(matches!(err, OpencleanError::UnknownColumn(_)));
        let update = Update::new(vec!["Age".into()], Value::Int(0).into()).unwrap();
        assert!(run(update, &schema(), short).is_err());
    }

    #[test]
    fn test_rename_checks_lengths() {
        assert!(Rename::new(vec!["Age".into()], vec![]).is_err());
        let op = Rename::new(vec!["Age".into()], vec!["Years".to_owned()]).unwrap();
        let (schema, _) = run(op, &schema(), rows()).unwrap();
        assert_eq!(schema.names(), ["Name", "Years"]);
        let dup = Rename::new(vec!["Age".into()], vec!["Name".to_owned()]).unwrap();
        assert!(matches!(
            dup.open(&self::schema()).unwrap_err(),
            OpencleanError::DuplicateColumn(_)
        ));
    }

    #[test]
    fn test_limit() {
        let (_, out) = run(Limit::new(2), &schema(), rows()).unwrap();
        assert_eq!(out.len(), 2);
        let (_, out) = run(Limit::new(0), &schema(), rows()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_insert_columns() {
        let op = InsCol::new(
            vec!["Id".to_owned(), "Flag".to_owned()],
            Some(0),
            InsertValues::List(vec![Value::Int(0), Value::Bool(false)]),
        )
        .unwrap();
        let (schema, out) = run(op, &schema(), rows()).unwrap();
        assert_eq!(schema.names(), ["Id", "Flag", "Name", "Age"]);
        assert_eq!(out[1][..2], [Value::Int(0), Value::Bool(false)]);

        let op = InsCol::new(vec!["Shout".to_owned()], None, Eval::upper("Name").into()).unwrap();
        let (_, out) = run(op, &self::schema(), rows()).unwrap();
        assert_eq!(out[2][2], Value::from("CLAIRE"));

        assert!(InsCol::new(vec!["A".to_owned()], None, InsertValues::List(vec![])).is_err());
        let op = InsCol::new(vec!["Age".to_owned()], None, InsertValues::default()).unwrap();
        assert!(op.open(&self::schema()).is_err());
    }

    #[test]
    fn test_update_variants() {
        let mapping: HashMap<Value, Value> = [(Value::from("Bob"), Value::from("Robert"))].into();
        let op = Update::new(vec!["Name".into()], mapping.into()).unwrap();
        let (_, out) = run(op, &schema(), rows()).unwrap();
        let names: Vec<_> = out.iter().map(|r| r[0].to_text()).collect();
        assert_eq!(names, ["Alice", "Robert", "Claire"]);

        let op = Update::new(vec!["Name".into()], Eval::lower("Name").into()).unwrap();
        let (_, out) = run(op, &schema(), rows()).unwrap();
        assert_eq!(out[0][0], Value::from("alice"));

        let swap = Callable::new("swap", crate::function::Arity::Exactly(2), |args| {
            Ok(Value::List(vec![args[1].clone(), args[0].clone()]))
        });
        let op = Update::new(vec!["Name".into(), "Age".into()], swap.into()).unwrap();
        let (_, out) = run(op, &schema(), rows()).unwrap();
        assert_eq!(out[0], vec![Value::Int(32), Value::from("Alice")]);

        let bad = Update::new(vec!["Name".into(), "Age".into()], Value::Null.into()).unwrap();
        assert!(run(bad, &schema(), rows()).is_ok());
        let bad = Update::new(vec!["Name".into(), "Age".into()], Eval::col("Age").into()).unwrap();
        assert!(matches!(
            run(bad, &schema(), rows()).unwrap_err(),
            OpencleanError::Type(_)
        ));
    }

    #[test]
    fn test_typecast() {
        let rows = vec![vec!["Ann".into(), "31".into()], vec!["Bo".into(), "4.5".into()]];
        let (_, out) = run(Typecast::default(), &schema(), rows).unwrap();
        assert_eq!(out[0][1], Value::Int(31));
        assert_eq!(out[1][1], Value::Float(4.5));
        assert_eq!(out[1][0], Value::from("Bo"));
    }
}
