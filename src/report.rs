//! Diagnostic counters surfaced by pipeline stages.
//!
//! Row-level leniency (skipped malformed rows, coerced-to-null cells) is
//! absorbed locally but never silently: every absorbed row or cell lands in
//! one of these reports so a host runner can alert on dirty extract batches.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::types::{ColumnName, TableName};

/// Per-source load diagnostics.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Rows that parsed into the declared column count.
    pub rows_loaded: usize,
    /// Rows skipped under [`crate::loader::MalformedRowPolicy::SkipAndCount`].
    pub rows_skipped: usize,
    /// Extract files contributing to the batch.
    pub files_read: usize,
}

impl LoadReport {
    /// Fold another file's counters into this batch report.
    pub fn absorb(&mut self, other: &LoadReport) {
        self.rows_loaded += other.rows_loaded;
        self.rows_skipped += other.rows_skipped;
        self.files_read += other.files_read;
    }
}

/// Per-source coercion diagnostics: cells nulled by lenient casts, per column.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoercionReport {
    /// Count of coerced-to-null cells keyed by canonical column name.
    pub nulled_cells: IndexMap<ColumnName, usize>,
}

impl CoercionReport {
    /// Record `count` failed casts for `column`.
    pub fn record(&mut self, column: impl Into<ColumnName>, count: usize) {
        if count > 0 {
            *self.nulled_cells.entry(column.into()).or_insert(0) += count;
        }
    }

    /// Total coerced-to-null cells across all columns.
    pub fn total(&self) -> usize {
        self.nulled_cells.values().sum()
    }

    /// Whether every cell coerced cleanly.
    pub fn is_clean(&self) -> bool {
        self.nulled_cells.is_empty()
    }
}

/// Diagnostics for one source stage (load + normalize).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    /// Logical table name of the source.
    pub table: TableName,
    /// Rows loaded/skipped and files read.
    pub load: LoadReport,
    /// Cells nulled by lenient casts.
    pub coercion: CoercionReport,
}

/// Aggregated diagnostics for a full pipeline run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineReport {
    /// One entry per configured source, in pipeline order.
    pub sources: Vec<SourceReport>,
}

impl PipelineReport {
    /// Total skipped rows across all sources.
    pub fn rows_skipped(&self) -> usize {
        self.sources.iter().map(|s| s.load.rows_skipped).sum()
    }

    /// Total coerced-to-null cells across all sources.
    pub fn cells_nulled(&self) -> usize {
        self.sources.iter().map(|s| s.coercion.total()).sum()
    }
}
