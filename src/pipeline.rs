//! Data pipelines: composable chains of stream operators over a row source.
//!
//! [`DataPipeline`] is the programmatic interface. Pipelines can also be
//! described as versioned JSON specs ([`PipelineSpec`]) that are validated
//! against the input header and executed headlessly via the CLI.
//!
//! # Example: Programmatic Pipeline
//!
//! ```no_run
//! use openclean::function::{Eval, Predicate};
//! use openclean::pipeline::DataPipeline;
//!
//! let adults = DataPipeline::stream_csv("people.csv")
//!     .filter(Predicate::ge("Age", "18"), None)
//!     .update(["Name"], Eval::upper("Name"))?;
//! println!("{}", adults.head(5)?.len());
//! # Ok::<(), openclean::error::OpencleanError>(())
//! ```
//!
//! # Example: Spec Execution
//!
//! ```no_run
//! use openclean::pipeline::{PipelineSpec, run_pipeline};
//! use std::path::Path;
//!
//! let spec = PipelineSpec::from_file("cleanup.json")?;
//! let report = run_pipeline(&spec, Some(Path::new("data.csv")), None)?;
//! println!("{}", report.summary());
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod builder;
pub mod executor;
pub mod spec;
pub mod validation;

pub use builder::{DataPipeline, RowIter};
pub use executor::{RunReport, build_pipeline, run_pipeline};
pub use spec::{Condition, InputConfig, OutputConfig, PipelineSpec, SPEC_VERSION, Step};
pub use validation::{ValidationError, validate_pipeline};
