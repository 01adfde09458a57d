//! Evaluation functions: per-row computations used by pipeline operators and
//! grouping.
//!
//! Every function follows the same two-phase contract:
//!
//! 1. [`EvalFunction::prepare`] binds column references to positions in a
//!    concrete [`Schema`](crate::data::Schema), recursing into child
//!    functions. Binding errors surface here, before any row is seen.
//! 2. [`EvalFunction::eval`] computes the result for one row using only the
//!    resolved positions.
//!
//! ```
//! use openclean::data::{Schema, Value};
//! use openclean::function::{Eval, EvalFunction as _, Predicate};
//!
//! let schema = Schema::new(["Name", "Age"])?;
//! let mut older = Predicate::gt("Age", 30);
//! older.prepare(&schema)?;
//! assert!(older.test(&["Bob".into(), Value::Int(45)])?);
//!
//! let mut name = Eval::lower("Name");
//! name.prepare(&schema)?;
//! assert_eq!(name.eval(&["Bob".into(), Value::Int(45)])?, Value::from("bob"));
//! # Ok::<(), openclean::error::OpencleanError>(())
//! ```

pub mod aggregate;
pub mod eval;
pub mod predicate;
pub mod string;

pub use aggregate::Aggregator;
pub use eval::{Arity, Callable, Column, Eval};
pub use predicate::{CompareOp, Predicate, RegexMatch};
pub use string::StringOp;

use crate::data::{Schema, Value};
use crate::error::Result;

/// Interface shared by all evaluation functions.
pub trait EvalFunction {
    /// Bind column references against `schema`. Must run before [`EvalFunction::eval`].
    fn prepare(&mut self, schema: &Schema) -> Result<()>;

    /// Evaluate the function on one row.
    fn eval(&self, row: &[Value]) -> Result<Value>;

    /// Prepare and return `self`.
    fn prepared(mut self, schema: &Schema) -> Result<Self>
    where
        Self: Sized,
    {
        self.prepare(schema)?;
        Ok(self)
    }
}
