//! Data profiling: raw type detection, per-column statistics, frequency
//! outliers and dependency checks.
//!
//! Column profiles are computed in a single pass and can run as a pipeline
//! collector (see [`crate::operator::Profile`]) or directly over a table.

pub mod anomalies;
pub mod column;
pub mod constraints;
pub mod datatype;

pub use anomalies::{FrequencyOutlier, Threshold, frequency_outliers};
pub use column::{ColumnProfile, ColumnProfiler, MinMax, profile_dataframe};
pub use constraints::{fd_violations, key_violations};
pub use datatype::{DatatypeConverter, RawType};
