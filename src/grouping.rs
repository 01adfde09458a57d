//! Keyed, possibly overlapping groupings of table rows and the conflict
//! analysis built on top of them.
//!
//! A grouping shares its backing [`Table`](crate::data::Table) read-only and
//! stores, per key, the positions of the rows in that group. Keys keep their
//! insertion order.

pub mod conflict;
pub mod frame;
pub mod groupby;
pub mod violation;

pub use conflict::{ConflictEntry, ConflictSummary};
pub use frame::DataFrameGrouping;
pub use groupby::{Having, groupby, groupby_apply, groupby_columns, groupby_dataframe};
pub use violation::DataFrameViolation;
