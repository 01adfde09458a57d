//! The closed set of evaluation-function variants.

use super::aggregate::Aggregator;
use super::predicate::Predicate;
use super::string::StringOp;
use super::EvalFunction;
use crate::data::{ColumnRef, Schema, Value};
use crate::error::{OpencleanError, Result};
use std::fmt;
use std::sync::Arc;

/// Shared user function over the ordered results of child functions.
pub type ValueFn = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// Number of arguments a [`Callable`] accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
    Any,
}

impl Arity {
    fn check(self, actual: usize) -> Result<()> {
        match self {
            Self::Exactly(expected) if expected != actual => {
                Err(OpencleanError::Arity { expected, actual })
            }
            Self::AtLeast(expected) if actual < expected => {
                Err(OpencleanError::Arity { expected, actual })
            }
            _ => Ok(()),
        }
    }
}

/// A named user function with a declared arity.
#[derive(Clone)]
pub struct Callable {
    name: String,
    arity: Arity,
    unpack_list: bool,
    func: ValueFn,
}

impl Callable {
    pub fn new<F>(name: impl Into<String>, arity: Arity, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arity,
            unpack_list: false,
            func: Arc::new(func),
        }
    }

    /// Function of exactly one argument.
    pub fn unary<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self::new(name, Arity::Exactly(1), move |args| match args {
            [arg] => func(arg),
            _ => Err(OpencleanError::Arity {
                expected: 1,
                actual: args.len(),
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Receive a single list argument as separate arguments.
    pub fn unpack_list(mut self) -> Self {
        self.unpack_list = true;
        self
    }

    /// Call the function, checking the argument count.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        if self.unpack_list
            && let [Value::List(values)] = args
        {
            self.arity.check(values.len())?;
            return (self.func)(values);
        }
        self.arity.check(args.len())?;
        (self.func)(args)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("unpack_list", &self.unpack_list)
            .finish_non_exhaustive()
    }
}

/// Column extractor bound to a position at prepare time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    column: ColumnRef,
    position: Option<usize>,
}

impl Column {
    pub fn new(column: impl Into<ColumnRef>) -> Self {
        Self {
            column: column.into(),
            position: None,
        }
    }

    pub fn reference(&self) -> &ColumnRef {
        &self.column
    }

    /// Position resolved by the last call to [`Column::prepare`].
    pub fn position(&self) -> Option<usize> {
        self.position
    }

    pub fn prepare(&mut self, schema: &Schema) -> Result<()> {
        self.position = Some(schema.resolve(&self.column)?);
        Ok(())
    }

    pub fn eval(&self, row: &[Value]) -> Result<Value> {
        let pos = self
            .position
            .ok_or_else(|| OpencleanError::Unprepared(self.column.to_string()))?;
        row.get(pos).cloned().ok_or_else(|| {
            OpencleanError::type_error(format!(
                "row with {} values has no column at position {pos}",
                row.len()
            ))
        })
    }
}

/// Evaluation function over a single row.
///
/// Children are evaluated left to right, each bound independently; the outer
/// computation then sees the ordered list of child results.
#[derive(Debug, Clone)]
pub enum Eval {
    /// Constant value, independent of the row.
    Const(Value),
    /// Value of one column.
    Col(Column),
    /// List of the values of several columns.
    Cols(Vec<Column>),
    /// User function applied to the results of the child functions.
    Apply { func: Callable, args: Vec<Self> },
    /// Aggregation over the results of the child functions.
    Aggregate {
        aggregator: Aggregator,
        args: Vec<Self>,
    },
    /// String transformation of the child result.
    Str {
        op: StringOp,
        arg: Box<Self>,
        as_string: bool,
    },
    /// One element of the child results.
    Get { args: Vec<Self>, index: usize },
    /// Reordered subset of the child results.
    List { args: Vec<Self>, positions: Vec<usize> },
    /// Boolean result of a predicate.
    Predicate(Box<Predicate>),
}

impl Eval {
    pub fn constant(value: impl Into<Value>) -> Self {
        Self::Const(value.into())
    }

    pub fn col(column: impl Into<ColumnRef>) -> Self {
        Self::Col(Column::new(column))
    }

    pub fn cols<I, C>(columns: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        Self::Cols(columns.into_iter().map(Column::new).collect())
    }

    /// Apply `func` to the results of `args`. The number of arguments must
    /// match the function's declared arity.
    pub fn apply(func: Callable, args: Vec<Self>) -> Result<Self> {
        if !(func.unpack_list && args.len() == 1) {
            func.arity().check(args.len())?;
        }
        Ok(Self::Apply { func, args })
    }

    /// Apply a callable to the values of the given columns.
    pub fn apply_to_columns<I, C>(func: Callable, columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = C>,
        C: Into<ColumnRef>,
    {
        Self::apply(func, columns.into_iter().map(Self::col).collect())
    }

    pub fn aggregate(aggregator: Aggregator, args: Vec<Self>) -> Result<Self> {
        if args.is_empty() {
            return Err(OpencleanError::construction(format!(
                "{aggregator:?} needs at least one argument"
            )));
        }
        if let Aggregator::Custom(func) = &aggregator {
            func.arity().check(args.len())?;
        }
        Ok(Self::Aggregate { aggregator, args })
    }

    pub fn max<I, E>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<Self>,
    {
        Self::aggregate(Aggregator::Max, args.into_iter().map(Into::into).collect())
    }

    pub fn min<I, E>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<Self>,
    {
        Self::aggregate(Aggregator::Min, args.into_iter().map(Into::into).collect())
    }

    pub fn mean<I, E>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<Self>,
    {
        Self::aggregate(Aggregator::Mean, args.into_iter().map(Into::into).collect())
    }

    pub fn sum<I, E>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = E>,
        E: Into<Self>,
    {
        Self::aggregate(Aggregator::Sum, args.into_iter().map(Into::into).collect())
    }

    pub fn string(op: StringOp, arg: impl Into<Self>, as_string: bool) -> Self {
        Self::Str {
            op,
            arg: Box::new(arg.into()),
            as_string,
        }
    }

    pub fn lower(arg: impl Into<Self>) -> Self {
        Self::string(StringOp::Lower, arg, false)
    }

    pub fn upper(arg: impl Into<Self>) -> Self {
        Self::string(StringOp::Upper, arg, false)
    }

    pub fn capitalize(arg: impl Into<Self>) -> Self {
        Self::string(StringOp::Capitalize, arg, false)
    }

    pub fn trim(arg: impl Into<Self>) -> Self {
        Self::string(StringOp::Trim, arg, false)
    }

    pub fn length(arg: impl Into<Self>) -> Self {
        Self::string(StringOp::Length, arg, false)
    }

    pub fn concat(arg: impl Into<Self>, delimiter: impl Into<String>) -> Self {
        Self::string(StringOp::Concat(delimiter.into()), arg, false)
    }

    /// Element `index` of the results of `args`.
    pub fn get(args: Vec<Self>, index: usize) -> Result<Self> {
        if index >= args.len() {
            return Err(OpencleanError::construction(format!(
                "index {index} out of range for {} values",
                args.len()
            )));
        }
        Ok(Self::Get { args, index })
    }

    /// The results of `args` at `positions`, in that order.
    pub fn list(args: Vec<Self>, positions: Vec<usize>) -> Result<Self> {
        if let Some(pos) = positions.iter().find(|&&pos| pos >= args.len()) {
            return Err(OpencleanError::construction(format!(
                "index {pos} out of range for {} values",
                args.len()
            )));
        }
        Ok(Self::List { args, positions })
    }

    fn children_mut(&mut self) -> &mut [Self] {
        match self {
            Self::Apply { args, .. }
            | Self::Aggregate { args, .. }
            | Self::Get { args, .. }
            | Self::List { args, .. } => args,
            Self::Str { arg, .. } => std::slice::from_mut(arg.as_mut()),
            Self::Const(_) | Self::Col(_) | Self::Cols(_) | Self::Predicate(_) => &mut [],
        }
    }

    fn eval_all(args: &[Self], row: &[Value]) -> Result<Vec<Value>> {
        args.iter().map(|f| f.eval(row)).collect()
    }

    fn arg(args: &[Self], index: usize) -> Result<&Self> {
        args.get(index).ok_or_else(|| {
            OpencleanError::construction(format!(
                "argument {index} out of range for {} argument(s)",
                args.len()
            ))
        })
    }
}

impl EvalFunction for Eval {
    fn prepare(&mut self, schema: &Schema) -> Result<()> {
        match self {
            Self::Col(column) => column.prepare(schema),
            Self::Cols(columns) => columns.iter_mut().try_for_each(|c| c.prepare(schema)),
            Self::Predicate(predicate) => predicate.prepare(schema),
            _ => self
                .children_mut()
                .iter_mut()
                .try_for_each(|f| f.prepare(schema)),
        }
    }

    fn eval(&self, row: &[Value]) -> Result<Value> {
        match self {
            Self::Const(value) => Ok(value.clone()),
            Self::Col(column) => column.eval(row),
            Self::Cols(columns) => columns
                .iter()
                .map(|c| c.eval(row))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            Self::Apply { func, args } => func.call(&Self::eval_all(args, row)?),
            Self::Aggregate { aggregator, args } => aggregator.apply(Self::eval_all(args, row)?),
            Self::Str { op, arg, as_string } => op.apply(&arg.eval(row)?, *as_string),
            Self::Get { args, index } => Self::arg(args, *index)?.eval(row),
            Self::List { args, positions } => positions
                .iter()
                .map(|&pos| Self::arg(args, pos)?.eval(row))
                .collect::<Result<Vec<_>>>()
                .map(Value::List),
            Self::Predicate(predicate) => predicate.test(row).map(Value::Bool),
        }
    }
}

impl From<&str> for Eval {
    fn from(name: &str) -> Self {
        Self::col(name)
    }
}

impl From<String> for Eval {
    fn from(name: String) -> Self {
        Self::col(name)
    }
}

impl From<usize> for Eval {
    fn from(pos: usize) -> Self {
        Self::col(pos)
    }
}

impl From<ColumnRef> for Eval {
    fn from(column: ColumnRef) -> Self {
        Self::col(column)
    }
}

impl From<Value> for Eval {
    fn from(value: Value) -> Self {
        Self::Const(value)
    }
}

impl From<Predicate> for Eval {
    fn from(predicate: Predicate) -> Self {
        Self::Predicate(Box::new(predicate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Schema {
        Schema::new(["Name", "Age", "Height"]).unwrap()
    }

    fn alice() -> Vec<Value> {
        vec!["alice davies".into(), 23.into(), 180.into()]
    }

    #[test]
    fn test_column_binding() {
        let mut f = Eval::col("Height");
        assert!(matches!(
            f.eval(&alice()),
            Err(OpencleanError::Unprepared(_))
        ));
        f.prepare(&people()).unwrap();
        assert_eq!(f.eval(&alice()).unwrap(), Value::Int(180));

        let err = Eval::col("Weight").prepared(&people()).unwrap_err();
        assert!(matches!(err, OpencleanError::UnknownColumn(_)));
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let mut f = Eval::cols(["Age", "Name"]);
        f.prepare(&people()).unwrap();
        let first = f.eval(&alice()).unwrap();
        f.prepare(&people()).unwrap();
        assert_eq!(f.eval(&alice()).unwrap(), first);
        assert_eq!(
            first,
            Value::List(vec![Value::Int(23), Value::from("alice davies")])
        );
    }

    #[test]
    fn test_binding_survives_reordered_schema() {
        let mut f = Eval::col("Age");
        f.prepare(&Schema::new(["Age", "Name"]).unwrap()).unwrap();
        assert_eq!(
            f.eval(&[Value::Int(40), "Bob".into()]).unwrap(),
            Value::Int(40)
        );
    }

    #[test]
    fn test_apply_checks_arity_at_construction() {
        let add = Callable::new("add", Arity::Exactly(2), |args| {
            match (&args[0], &args[1]) {
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
                _ => Err(OpencleanError::type_error("add expects integers")),
            }
        });
        let err = Eval::apply(add.clone(), vec![Eval::col("Age")]).unwrap_err();
        assert!(matches!(
            err,
            OpencleanError::Arity {
                expected: 2,
                actual: 1
            }
        ));

        let f = Eval::apply_to_columns(add, ["Age", "Height"])
            .unwrap()
            .prepared(&people())
            .unwrap();
        assert_eq!(f.eval(&alice()).unwrap(), Value::Int(203));
    }

    #[test]
    fn test_unpack_list_argument() {
        let pair = Callable::new("pair", Arity::Exactly(2), |args| {
            Ok(Value::from(format!("{}:{}", args[0], args[1])))
        })
        .unpack_list();
        let f = Eval::apply(pair, vec![Eval::cols(["Name", "Age"])])
            .unwrap()
            .prepared(&people())
            .unwrap();
        assert_eq!(f.eval(&alice()).unwrap(), Value::from("alice davies:23"));
    }

    #[test]
    fn test_nested_composition() {
        let f = Eval::length(Eval::upper("Name")).prepared(&people()).unwrap();
        assert_eq!(f.eval(&alice()).unwrap(), Value::Int(12));
    }

    #[test]
    fn test_get_and_list() {
        let f = Eval::get(
            vec![
                Eval::constant(3),
                Eval::constant(2),
                Eval::constant(1),
            ],
            2,
        )
        .unwrap()
        .prepared(&Schema::default())
        .unwrap();
        assert_eq!(f.eval(&[]).unwrap(), Value::Int(1));

        let f = Eval::list(vec!["Name".into(), "Age".into(), "Height".into()], vec![2, 1])
            .unwrap()
            .prepared(&people())
            .unwrap();
        assert_eq!(
            f.eval(&alice()).unwrap(),
            Value::List(vec![Value::Int(180), Value::Int(23)])
        );

        assert!(Eval::get(vec![Eval::constant(1)], 1).is_err());
        assert!(Eval::list(vec![Eval::constant(1)], vec![0, 4]).is_err());
    }

    #[test]
    fn test_aggregate_needs_arguments() {
        let err = Eval::max(Vec::<Eval>::new()).unwrap_err();
        assert!(matches!(err, OpencleanError::Construction(_)));
    }
}
