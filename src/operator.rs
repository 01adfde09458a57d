//! Streaming operators.
//!
//! An operator is an immutable description of one pipeline step. Opening it
//! against an input schema yields the output schema and a fresh stateful
//! consumer, so the same operator can be shared by any number of pipelines
//! and runs. Collectors are the terminal step of a run and produce its
//! result.

pub mod collector;
pub mod stream;
pub mod table;
pub mod transform;

pub use collector::{Collect, Distinct, Profile, RowCount, Write};
pub use stream::{
    BoxedConsumer, ConsumerChain, Flow, OpenedStage, StreamCollector, StreamConsumer,
    StreamOperator, StreamStats,
};
pub use transform::{
    Filter, InsCol, InsertValues, Limit, Rename, Select, Typecast, Update, UpdateFn,
};
