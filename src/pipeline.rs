//! Stage chaining: load → normalize → derive keys → join.
//!
//! Nothing here is stateful; a run threads immutable [`Table`] values through
//! the configured stages and hands back the unified table plus the aggregated
//! diagnostics. Each stage output is a complete table, so a host runner can
//! checkpoint or abort between stages.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::PipelineError;
use crate::join::{join, JoinSpec};
use crate::key::{derive_key, KeySpec};
use crate::loader::{load, MalformedRowPolicy, SourceDescriptor};
use crate::normalize::{normalize, NormalizeSpec};
use crate::report::{CoercionReport, PipelineReport, SourceReport};
use crate::table::Table;

/// Per-source stage configuration: where to load from and how to shape the
/// loaded table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourcePipeline {
    /// Where and how to load the raw extract.
    pub descriptor: SourceDescriptor,
    /// Malformed-row handling during load.
    #[serde(default)]
    pub policy: MalformedRowPolicy,
    /// Optional rename/retype step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalize: Option<NormalizeSpec>,
    /// Keys derived after normalization, in order.
    #[serde(default)]
    pub keys: Vec<KeySpec>,
}

impl SourcePipeline {
    /// Source stage with no normalization and no derived keys.
    pub fn new(descriptor: SourceDescriptor) -> Self {
        Self {
            descriptor,
            policy: MalformedRowPolicy::default(),
            normalize: None,
            keys: Vec::new(),
        }
    }

    /// Override the malformed-row policy.
    pub fn with_policy(mut self, policy: MalformedRowPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the normalization spec.
    pub fn with_normalize(mut self, spec: NormalizeSpec) -> Self {
        self.normalize = Some(spec);
        self
    }

    /// Append a derived key.
    pub fn with_key(mut self, spec: KeySpec) -> Self {
        self.keys.push(spec);
        self
    }

    /// Load the source and shape it: normalize, then derive each key.
    pub fn run(&self) -> Result<(Table, SourceReport), PipelineError> {
        let loaded = load(&self.descriptor, self.policy)?;
        let (table, coercion) = self.shape(loaded.table)?;
        Ok((
            table,
            SourceReport {
                table: self.descriptor.name.clone(),
                load: loaded.report,
                coercion,
            },
        ))
    }

    /// The pure part of the stage: normalize and derive keys on an
    /// already-loaded table.
    pub fn shape(&self, table: Table) -> Result<(Table, CoercionReport), PipelineError> {
        let (mut table, coercion) = match &self.normalize {
            Some(spec) => normalize(&table, spec)?,
            None => (table, CoercionReport::default()),
        };
        for key in &self.keys {
            table = derive_key(&table, key)?;
        }
        Ok((table, coercion))
    }
}

/// Full pipeline: sources joined left-to-right into one unified table.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Pipeline {
    /// Sources in join order; the first is the join chain's left side.
    pub sources: Vec<SourcePipeline>,
    /// Join `i` combines the accumulated table with source `i + 1`.
    pub joins: Vec<JoinSpec>,
}

/// Result of a pipeline run: the unified table plus diagnostics.
#[derive(Clone, Debug)]
pub struct PipelineRun {
    /// The joined output table.
    pub unified: Table,
    /// Per-source load and coercion diagnostics.
    pub report: PipelineReport,
}

impl Pipeline {
    /// Empty pipeline; add sources and joins with the builder methods.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source stage.
    pub fn with_source(mut self, source: SourcePipeline) -> Self {
        self.sources.push(source);
        self
    }

    /// Append a join combining the next source into the chain.
    pub fn with_join(mut self, spec: JoinSpec) -> Self {
        self.joins.push(spec);
        self
    }

    /// Run every source stage, then fold the join chain.
    pub fn run(&self) -> Result<PipelineRun, PipelineError> {
        if self.sources.is_empty() {
            return Err(PipelineError::Configuration(
                "pipeline has no sources".to_string(),
            ));
        }
        if self.joins.len() + 1 != self.sources.len() {
            return Err(PipelineError::Configuration(format!(
                "{} sources require {} joins, got {}",
                self.sources.len(),
                self.sources.len() - 1,
                self.joins.len()
            )));
        }
        let mut report = PipelineReport::default();
        let mut shaped = Vec::with_capacity(self.sources.len());
        for source in &self.sources {
            let (table, source_report) = source.run()?;
            debug!(
                source = source_report.table.as_str(),
                rows = table.num_rows(),
                skipped = source_report.load.rows_skipped,
                nulled = source_report.coercion.total(),
                "source stage complete"
            );
            report.sources.push(source_report);
            shaped.push(table);
        }
        let mut shaped = shaped.into_iter();
        let mut unified = shaped.next().expect("validated non-empty");
        for (table, spec) in shaped.zip(&self.joins) {
            unified = join(&unified, &table, spec)?;
        }
        Ok(PipelineRun { unified, report })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{TableBuilder, Value};

    #[test]
    fn join_count_must_match_source_count() {
        let descriptor = SourceDescriptor::new("a", "/nonexistent");
        let pipeline = Pipeline::new()
            .with_source(SourcePipeline::new(descriptor.clone()))
            .with_source(SourcePipeline::new(descriptor));
        assert!(matches!(
            pipeline.run(),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn empty_pipeline_is_rejected() {
        assert!(matches!(
            Pipeline::new().run(),
            Err(PipelineError::Configuration(_))
        ));
    }

    #[test]
    fn shape_applies_normalize_then_keys() {
        let mut builder = TableBuilder::new("flujo_mixto", vec!["Cta.mayor".into(), "D/H".into()]);
        builder.push_row(vec![
            Value::Text("4101".to_string()),
            Value::Text("H".to_string()),
        ]);
        let stage = SourcePipeline::new(SourceDescriptor::new("flujo_mixto", "unused"))
            .with_normalize(NormalizeSpec::new().with_rename("Cta.mayor", "Cta mayor"))
            .with_key(KeySpec::new("LLave FM", ["Cta mayor", "D/H"]));
        let (table, coercion) = stage.shape(builder.build()).unwrap();
        assert_eq!(
            table.column("LLave FM").unwrap(),
            &[Value::Text("4101H".to_string())]
        );
        assert!(coercion.is_clean());
    }
}
