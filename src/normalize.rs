//! Schema normalization: canonical renames plus typed, lenient coercion.
//!
//! Each extract family ships its own header spelling drift (`Cta.mayor` vs
//! `Cta mayor`) and everything arrives as text. Normalization maps raw
//! headers onto the canonical vocabulary shared by all sources and casts the
//! columns downstream stages treat as numbers, dates, or flags.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::PipelineError;
use crate::report::CoercionReport;
use crate::table::{LogicalType, Table, Value};
use crate::types::{ColumnName, RawHeader};

/// Cast failure policy. Lenient casting is the production default for
/// manually-produced finance extracts; strict casting exists for callers that
/// prefer failing a run over nulling a dirty cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Leniency {
    /// An uncoercible cell becomes null and is counted in the report.
    #[default]
    Lenient,
    /// The first uncoercible cell aborts with [`PipelineError::TypeCoercion`].
    Strict,
}

/// Per-source normalization: raw-header renames and target column types.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NormalizeSpec {
    /// Raw header token to canonical name. Missing raw columns are no-ops.
    #[serde(default)]
    pub renames: IndexMap<RawHeader, ColumnName>,
    /// Canonical column name to target logical type.
    #[serde(default)]
    pub types: IndexMap<ColumnName, LogicalType>,
    /// Cast failure policy.
    #[serde(default)]
    pub leniency: Leniency,
}

impl NormalizeSpec {
    /// Empty spec: no renames, no coercions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw-header rename.
    pub fn with_rename(
        mut self,
        raw: impl Into<RawHeader>,
        canonical: impl Into<ColumnName>,
    ) -> Self {
        self.renames.insert(raw.into(), canonical.into());
        self
    }

    /// Add a target type for a canonical column.
    pub fn with_type(mut self, column: impl Into<ColumnName>, target: LogicalType) -> Self {
        self.types.insert(column.into(), target);
        self
    }

    /// Override the cast failure policy.
    pub fn with_leniency(mut self, leniency: Leniency) -> Self {
        self.leniency = leniency;
        self
    }
}

/// Rename raw headers to canonical names, then coerce typed columns.
///
/// Renames tolerate absent raw columns (extract batches drift); the type map
/// is strict about column presence since a typed column the table lacks means
/// the pipeline configuration does not match the data.
pub fn normalize(
    table: &Table,
    spec: &NormalizeSpec,
) -> Result<(Table, CoercionReport), PipelineError> {
    let mut table = table.clone();
    for (raw, canonical) in &spec.renames {
        if !table.has_column(raw) {
            debug!(
                table = table.name(),
                raw = raw.as_str(),
                "rename skipped, raw column absent"
            );
            continue;
        }
        table = table.rename_column(raw, canonical)?;
    }

    let mut report = CoercionReport::default();
    for (column, target) in &spec.types {
        let values = table.require_column(column)?;
        let mut coerced = Vec::with_capacity(values.len());
        let mut nulled = 0usize;
        for value in values {
            match coerce(value, *target) {
                Some(value) => coerced.push(value),
                None => match spec.leniency {
                    Leniency::Lenient => {
                        nulled += 1;
                        coerced.push(Value::Null);
                    }
                    Leniency::Strict => {
                        return Err(PipelineError::TypeCoercion {
                            column: column.clone(),
                            value: value.render_text(),
                            target: *target,
                        });
                    }
                },
            }
        }
        if nulled > 0 {
            warn!(
                table = table.name(),
                column = column.as_str(),
                nulled,
                "lenient cast nulled uncoercible cells"
            );
        }
        report.record(column.clone(), nulled);
        table = table.with_column_values(column, coerced)?;
    }
    Ok((table, report))
}

/// Cast one cell to `target`, or `None` when the value does not coerce.
///
/// Nulls stay null and values already of the target type pass through; text
/// parses per type below. Cross-type casts go through the canonical text
/// rendering, which also gives integer-to-decimal widening for free.
fn coerce(value: &Value, target: LogicalType) -> Option<Value> {
    if value.is_null() {
        return Some(Value::Null);
    }
    if value.logical_type() == Some(target) {
        return Some(value.clone());
    }
    let text = value.render_text();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(Value::Null);
    }
    match target {
        LogicalType::Text => Some(Value::Text(text)),
        LogicalType::Integer => trimmed.parse::<i64>().ok().map(Value::Integer),
        LogicalType::Decimal => trimmed
            .parse::<f64>()
            .ok()
            .filter(|d| d.is_finite())
            .map(Value::Decimal),
        LogicalType::Date => parse_date(trimmed).map(Value::Date),
        LogicalType::Boolean => parse_boolean(trimmed).map(Value::Boolean),
    }
}

/// Accepted date spellings: ISO, and the dotted/slashed day-first forms the
/// SAP exports use.
fn parse_date(text: &str) -> Option<chrono::NaiveDate> {
    for format in ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"] {
        if let Ok(date) = chrono::NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }
    None
}

/// Accepted flag spellings; `X` is the SAP checkbox convention for true.
fn parse_boolean(text: &str) -> Option<bool> {
    match text {
        "true" | "TRUE" | "True" | "1" | "X" | "x" => Some(true),
        "false" | "FALSE" | "False" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableBuilder;

    fn text(value: &str) -> Value {
        Value::Text(value.to_string())
    }

    fn debtor_table() -> Table {
        let mut builder = TableBuilder::new(
            "dato_maestro_deudor",
            vec!["Cliente".into(), "Nº ident.fis.1".into()],
        );
        builder.push_row(vec![text("1002"), text("A-77")]);
        builder.push_row(vec![text("abc"), Value::Null]);
        builder.push_row(vec![Value::Null, text("B-12")]);
        builder.build()
    }

    #[test]
    fn rename_is_noop_for_absent_raw_column() {
        let spec = NormalizeSpec::new()
            .with_rename("Nº ident.fis.1", "Nº ident fis 1")
            .with_rename("cod. Empresa", "cod Empresa");
        let (table, report) = normalize(&debtor_table(), &spec).unwrap();
        assert_eq!(table.num_rows(), 3);
        assert!(table.has_column("Nº ident fis 1"));
        assert!(!table.has_column("cod Empresa"));
        assert!(report.is_clean());
    }

    #[test]
    fn lenient_cast_nulls_and_counts_bad_cells() {
        let spec = NormalizeSpec::new().with_type("Cliente", LogicalType::Decimal);
        let (table, report) = normalize(&debtor_table(), &spec).unwrap();
        assert_eq!(
            table.column("Cliente").unwrap(),
            &[Value::Decimal(1002.0), Value::Null, Value::Null]
        );
        // The pre-existing null is not a cast failure.
        assert_eq!(report.total(), 1);
        assert_eq!(report.nulled_cells.get("Cliente"), Some(&1));
        assert_eq!(table.num_rows(), 3);
    }

    #[test]
    fn strict_cast_aborts_on_first_bad_cell() {
        let spec = NormalizeSpec::new()
            .with_type("Cliente", LogicalType::Decimal)
            .with_leniency(Leniency::Strict);
        let err = normalize(&debtor_table(), &spec).unwrap_err();
        match err {
            PipelineError::TypeCoercion { column, value, .. } => {
                assert_eq!(column, "Cliente");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn typed_column_must_exist() {
        let spec = NormalizeSpec::new().with_type("Importe", LogicalType::Decimal);
        let err = normalize(&debtor_table(), &spec).unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { .. }));
    }

    #[test]
    fn date_and_boolean_spellings() {
        let mut builder = TableBuilder::new("t", vec!["Fecha".into(), "Activo".into()]);
        builder.push_row(vec![text("31.01.2024"), text("X")]);
        builder.push_row(vec![text("2024-02-01"), text("0")]);
        builder.push_row(vec![text("not a date"), text("maybe")]);
        let spec = NormalizeSpec::new()
            .with_type("Fecha", LogicalType::Date)
            .with_type("Activo", LogicalType::Boolean);
        let (table, report) = normalize(&builder.build(), &spec).unwrap();
        let dates = table.column("Fecha").unwrap();
        assert_eq!(
            dates[0],
            Value::Date(chrono::NaiveDate::from_ymd_opt(2024, 1, 31).unwrap())
        );
        assert_eq!(
            dates[1],
            Value::Date(chrono::NaiveDate::from_ymd_opt(2024, 2, 1).unwrap())
        );
        assert_eq!(dates[2], Value::Null);
        let flags = table.column("Activo").unwrap();
        assert_eq!(flags[0], Value::Boolean(true));
        assert_eq!(flags[1], Value::Boolean(false));
        assert_eq!(flags[2], Value::Null);
        assert_eq!(report.total(), 2);
    }

    #[test]
    fn rename_then_type_applies_to_canonical_name() {
        let mut builder = TableBuilder::new("t", vec!["Cta.mayor".into()]);
        builder.push_row(vec![text("4101")]);
        let spec = NormalizeSpec::new()
            .with_rename("Cta.mayor", "Cta mayor")
            .with_type("Cta mayor", LogicalType::Integer);
        let (table, _) = normalize(&builder.build(), &spec).unwrap();
        assert_eq!(
            table.column("Cta mayor").unwrap(),
            &[Value::Integer(4101)]
        );
    }
}
