//! Boolean functions over a row.

use super::eval::Eval;
use super::EvalFunction;
use crate::data::{Schema, Value};
use crate::error::{OpencleanError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Comparison operator for [`Predicate::Compare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn holds(self, ord: Ordering) -> bool {
        match self {
            Self::Eq => ord == Ordering::Equal,
            Self::Ne => ord != Ordering::Equal,
            Self::Gt => ord == Ordering::Greater,
            Self::Ge => ord != Ordering::Less,
            Self::Lt => ord == Ordering::Less,
            Self::Le => ord != Ordering::Greater,
        }
    }
}

/// Regular-expression test on the result of a function.
#[derive(Debug, Clone)]
pub struct RegexMatch {
    arg: Eval,
    pattern: String,
    regex: Regex,
    fullmatch: bool,
    as_string: bool,
    negated: bool,
}

impl RegexMatch {
    /// Compile `pattern`. A partial match anchors at the start of the value
    /// only; a full match must cover the whole value.
    pub fn new(arg: impl Into<Eval>, pattern: &str, fullmatch: bool) -> Result<Self> {
        let anchored = if fullmatch {
            format!(r"\A(?:{pattern})\z")
        } else {
            format!(r"\A(?:{pattern})")
        };
        Ok(Self {
            arg: arg.into(),
            pattern: pattern.to_owned(),
            regex: Regex::new(&anchored)?,
            fullmatch,
            as_string: false,
            negated: false,
        })
    }

    /// Match against the text form of non-string values.
    pub fn as_string(mut self) -> Self {
        self.as_string = true;
        self
    }

    /// Invert the result.
    pub fn negated(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_fullmatch(&self) -> bool {
        self.fullmatch
    }

    fn test(&self, row: &[Value]) -> Result<bool> {
        let value = self.arg.eval(row)?;
        let matched = match &value {
            Value::Str(s) => self.regex.is_match(s),
            other if self.as_string => self.regex.is_match(&other.to_text()),
            other => {
                return Err(OpencleanError::type_error(format!(
                    "cannot match pattern '{}' against {} value '{other}'",
                    self.pattern,
                    other.type_label()
                )));
            }
        };
        Ok(matched != self.negated)
    }
}

/// Boolean function over a row.
///
/// `And` and `Or` evaluate their arguments left to right and stop at the
/// first argument that decides the result.
#[derive(Debug, Clone)]
pub enum Predicate {
    Compare { op: CompareOp, left: Eval, right: Eval },
    And(Vec<Self>),
    Or(Vec<Self>),
    Not(Box<Self>),
    /// Value is null.
    IsNull(Eval),
    /// Value is null or the empty string.
    IsEmpty(Eval),
    IsIn { arg: Eval, domain: HashSet<Value> },
    Regex(RegexMatch),
    /// Function whose result must be a boolean.
    Eval(Eval),
}

impl Predicate {
    pub fn compare(op: CompareOp, left: impl Into<Eval>, right: impl Into<Eval>) -> Self {
        Self::Compare {
            op,
            left: left.into(),
            right: right.into(),
        }
    }

    fn against(op: CompareOp, left: impl Into<Eval>, right: impl Into<Value>) -> Self {
        Self::compare(op, left, Eval::Const(right.into()))
    }

    pub fn eq(left: impl Into<Eval>, right: impl Into<Value>) -> Self {
        Self::against(CompareOp::Eq, left, right)
    }

    pub fn ne(left: impl Into<Eval>, right: impl Into<Value>) -> Self {
        Self::against(CompareOp::Ne, left, right)
    }

    pub fn gt(left: impl Into<Eval>, right: impl Into<Value>) -> Self {
        Self::against(CompareOp::Gt, left, right)
    }

    pub fn ge(left: impl Into<Eval>, right: impl Into<Value>) -> Self {
        Self::against(CompareOp::Ge, left, right)
    }

    pub fn lt(left: impl Into<Eval>, right: impl Into<Value>) -> Self {
        Self::against(CompareOp::Lt, left, right)
    }

    pub fn le(left: impl Into<Eval>, right: impl Into<Value>) -> Self {
        Self::against(CompareOp::Le, left, right)
    }

    pub fn and(args: Vec<Self>) -> Result<Self> {
        if args.is_empty() {
            return Err(OpencleanError::construction("And needs at least one argument"));
        }
        Ok(Self::And(args))
    }

    pub fn or(args: Vec<Self>) -> Result<Self> {
        if args.is_empty() {
            return Err(OpencleanError::construction("Or needs at least one argument"));
        }
        Ok(Self::Or(args))
    }

    pub fn not(arg: Self) -> Self {
        Self::Not(Box::new(arg))
    }

    pub fn is_null(arg: impl Into<Eval>) -> Self {
        Self::IsNull(arg.into())
    }

    pub fn is_empty(arg: impl Into<Eval>) -> Self {
        Self::IsEmpty(arg.into())
    }

    pub fn is_in<I, V>(arg: impl Into<Eval>, domain: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::IsIn {
            arg: arg.into(),
            domain: domain.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_match(arg: impl Into<Eval>, pattern: &str) -> Result<Self> {
        RegexMatch::new(arg, pattern, false).map(Self::Regex)
    }

    pub fn is_fullmatch(arg: impl Into<Eval>, pattern: &str) -> Result<Self> {
        RegexMatch::new(arg, pattern, true).map(Self::Regex)
    }

    pub fn is_not_match(arg: impl Into<Eval>, pattern: &str) -> Result<Self> {
        RegexMatch::new(arg, pattern, false).map(|m| Self::Regex(m.negated()))
    }

    /// Evaluate the predicate on one row.
    pub fn test(&self, row: &[Value]) -> Result<bool> {
        match self {
            Self::Compare { op, left, right } => {
                let (l, r) = (left.eval(row)?, right.eval(row)?);
                Ok(op.holds(l.compare(&r)))
            }
            Self::And(args) => {
                for arg in args {
                    if !arg.test(row)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Or(args) => {
                for arg in args {
                    if arg.test(row)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Not(arg) => Ok(!arg.test(row)?),
            Self::IsNull(arg) => Ok(arg.eval(row)?.is_null()),
            Self::IsEmpty(arg) => Ok(arg.eval(row)?.is_empty()),
            Self::IsIn { arg, domain } => Ok(domain.contains(&arg.eval(row)?)),
            Self::Regex(m) => m.test(row),
            Self::Eval(f) => match f.eval(row)? {
                Value::Bool(b) => Ok(b),
                other => Err(OpencleanError::type_error(format!(
                    "predicate function returned {} value '{other}'",
                    other.type_label()
                ))),
            },
        }
    }
}

impl EvalFunction for Predicate {
    fn prepare(&mut self, schema: &Schema) -> Result<()> {
        match self {
            Self::Compare { left, right, .. } => {
                left.prepare(schema)?;
                right.prepare(schema)
            }
            Self::And(args) | Self::Or(args) => {
                args.iter_mut().try_for_each(|p| p.prepare(schema))
            }
            Self::Not(arg) => arg.prepare(schema),
            Self::IsNull(arg) | Self::IsEmpty(arg) | Self::IsIn { arg, .. } | Self::Eval(arg) => {
                arg.prepare(schema)
            }
            Self::Regex(m) => m.arg.prepare(schema),
        }
    }

    fn eval(&self, row: &[Value]) -> Result<Value> {
        self.test(row).map(Value::Bool)
    }
}
