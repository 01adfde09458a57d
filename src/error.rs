//! Centralized error handling for openclean.
//!
//! Errors fall into a few categories that surface at different times:
//!
//! - **Construction** errors (bad arity, invalid arguments, invalid regex
//!   patterns) are raised when a function, predicate or pipeline step is
//!   built, never deferred to row evaluation.
//! - **Binding** errors (unknown or duplicate columns) are raised when an
//!   evaluation function is prepared or an operator is opened against a
//!   schema, before any row is read.
//! - **Evaluation** errors (a value of the wrong type reaching a string or
//!   numeric function) are raised per row and abort the run.
//! - **Grouping** and **contract** errors cover duplicate group keys and
//!   user callbacks that return something other than what they promised.
//!
//! ```
//! use openclean::error::OpencleanError;
//!
//! fn describe(err: &OpencleanError) -> &'static str {
//!     match err {
//!         OpencleanError::UnknownColumn(_) => "binding",
//!         OpencleanError::Type(_) => "evaluation",
//!         OpencleanError::DuplicateKey(_) => "grouping",
//!         _ => "other",
//!     }
//! }
//! ```
//!
//! The `ResultExt` trait adds `.context()` to any result whose error converts
//! into [`OpencleanError`]:
//!
//! ```no_run
//! use openclean::error::ResultExt as _;
//!
//! fn load() -> openclean::error::Result<String> {
//!     std::fs::read_to_string("data.csv").context("Failed to load dataset")
//! }
//! ```

use thiserror::Error;

/// Main error type for openclean operations.
#[derive(Debug, Error)]
pub enum OpencleanError {
    /// Invalid arguments detected while building a function or operator.
    #[error("Construction error: {0}")]
    Construction(String),

    /// A function received a different number of arguments than it declares.
    #[error("Arity mismatch: expected {expected} argument(s), got {actual}")]
    Arity { expected: usize, actual: usize },

    /// A column name or position that does not exist in the bound schema.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// A schema that would contain the same column name twice.
    #[error("Duplicate column name: {0}")]
    DuplicateColumn(String),

    /// Evaluation was attempted before the function was bound to a schema.
    #[error("Function evaluated before prepare: {0}")]
    Unprepared(String),

    /// A value of an unexpected type reached a function during evaluation.
    #[error("Type error: {0}")]
    Type(String),

    /// A group key inserted twice into a grouping.
    #[error("Duplicate group key: {0}")]
    DuplicateKey(String),

    /// A source row whose width differs from the source schema.
    #[error("Malformed row {row}: expected {expected} value(s), got {actual}")]
    Malformed {
        row: u64,
        expected: usize,
        actual: usize,
    },

    /// A user callback broke its documented contract.
    #[error("Contract violation: {0}")]
    Contract(String),

    /// Regular expression failed to compile.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// I/O errors from row sources and sinks.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader or writer errors.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Errors raised by polars while building or reading a data frame.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// JSON (de)serialization errors.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{0}")]
    Other(String),
}

impl OpencleanError {
    pub(crate) fn construction(msg: impl Into<String>) -> Self {
        Self::Construction(msg.into())
    }

    pub(crate) fn type_error(msg: impl Into<String>) -> Self {
        Self::Type(msg.into())
    }
}

impl From<anyhow::Error> for OpencleanError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(format!("{err:#}"))
    }
}

/// Result type alias for openclean operations.
pub type Result<T> = std::result::Result<T, OpencleanError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<OpencleanError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err: OpencleanError = e.into();
            OpencleanError::Other(format!("{}: {}", msg.into(), err))
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err: OpencleanError = e.into();
            OpencleanError::Other(format!("{}: {}", f(), err))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OpencleanError::UnknownColumn("Age".to_owned());
        assert_eq!(err.to_string(), "Unknown column: Age");

        let err = OpencleanError::Arity {
            expected: 2,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "Arity mismatch: expected 2 argument(s), got 3"
        );
    }

    #[test]
    fn test_malformed_row_display() {
        let err = OpencleanError::Malformed {
            row: 1,
            expected: 2,
            actual: 1,
        };
        assert_eq!(err.to_string(), "Malformed row 1: expected 2 value(s), got 1");
    }

    #[test]
    fn test_result_context() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file.csv",
        ));

        let result: Result<()> = result.context("Failed to open row source");
        let message = result.unwrap_err().to_string();
        assert!(message.contains("Failed to open row source"));
        assert!(message.contains("file.csv"));
    }

    #[test]
    fn test_regex_conversion() {
        let err: OpencleanError = regex::Regex::new("(").unwrap_err().into();
        assert!(matches!(err, OpencleanError::InvalidPattern(_)));
    }
}
