#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Loading, normalization, key, and join errors.
mod errors;
/// Reconciliation joins over derived and natural keys.
pub mod join;
/// Composite key derivation.
pub mod key;
/// Delimited source loading.
pub mod loader;
/// Schema normalization: renames and lenient typed coercion.
pub mod normalize;
/// Stage chaining into a full pipeline run.
pub mod pipeline;
/// Ready-made specs for the SAP cash-flow extract family.
pub mod presets;
/// Diagnostic counters surfaced by pipeline stages.
pub mod report;
/// Immutable columnar table model.
pub mod table;
/// Input transports used by the loader.
pub mod transport;
/// Shared type aliases.
pub mod types;

pub use errors::PipelineError;
pub use join::{join, JoinMode, JoinSpec};
pub use key::{derive_key, KeySpec};
pub use loader::{load, load_table, load_table_from_root, MalformedRowPolicy, SourceDescriptor};
pub use normalize::{normalize, Leniency, NormalizeSpec};
pub use pipeline::{Pipeline, PipelineRun, SourcePipeline};
pub use report::{CoercionReport, LoadReport, PipelineReport, SourceReport};
pub use table::{LogicalType, Table, TableBuilder, Value};
pub use types::{ColumnName, KeyName, RawHeader, TableName};
