//! # openclean - Profiling, Transforming and Cleaning Tabular Data
//!
//! openclean streams rows from a source through a chain of operators
//! without materializing the whole dataset, evaluates per-row functions and
//! predicates, and groups rows to find data-quality conflicts.
//!
//! ## Quick Start
//!
//! ```
//! use openclean::data::{Table, Value};
//! use openclean::function::{Eval, Predicate};
//! use openclean::pipeline::DataPipeline;
//!
//! let people = Table::from_rows(
//!     ["Name", "Age"],
//!     vec![
//!         vec!["alice".into(), 32.into()],
//!         vec!["bob".into(), 45.into()],
//!         vec!["claire".into(), 27.into()],
//!     ],
//! )?;
//!
//! let older = DataPipeline::stream_table(people)
//!     .filter(Predicate::gt("Age", 30), None)
//!     .update(["Name"], Eval::upper("Name"))?
//!     .to_table()?;
//!
//! assert_eq!(older.index(), [0, 1]);
//! assert_eq!(older.rows()[1][0], Value::from("BOB"));
//! # Ok::<(), openclean::error::OpencleanError>(())
//! ```
//!
//! ## Core Modules
//!
//! - [`data`]: values, schemas, tables, counters and row sources/sinks
//! - [`function`]: evaluation functions and predicates
//! - [`operator`]: stream operators, collectors and one-shot table helpers
//! - [`pipeline`]: the [`DataPipeline`](pipeline::DataPipeline) builder and
//!   JSON pipeline specs
//! - [`grouping`]: group-by, groupings and conflict summaries
//! - [`profiling`]: column profiles, type detection and constraint checks
//! - [`error`]: error types and handling utilities
//!
//! ## Key Concepts
//!
//! ### Lazy Evaluation
//!
//! Building a pipeline only records operators. Rows are read when a result
//! is requested, and short-circuiting operations (`head`, `limit`) stop
//! reading the source as soon as their result is complete.
//!
//! ### Two-Phase Functions
//!
//! Functions reference columns by name or position and are bound to a
//! concrete schema before the first row, so unknown columns are reported
//! before any data is read.
//!
//! ### Polars Interop
//!
//! Tables convert to and from polars `DataFrame`s
//! ([`Table::to_dataframe`](data::Table::to_dataframe)). Pipelines can
//! collect into a frame, groupings accept one, and column profiles are
//! aggregated with polars.

#![warn(clippy::all, rust_2018_idioms)]

pub mod config;
pub mod data;
pub mod error;
pub mod function;
pub mod grouping;
pub mod logging;
pub mod operator;
pub mod pipeline;
pub mod profiling;
