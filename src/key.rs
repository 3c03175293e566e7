//! Composite key derivation.
//!
//! A derived key is the ordered, unseparated concatenation of contributor
//! cells rendered as text, with nulls contributing the empty string. The
//! rule is total: every row gets a non-null key, however sparse the business
//! columns are in the original extract. Rows are independent, so derivation
//! is row-parallel and insensitive to row order or partitioning.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::PipelineError;
use crate::table::{Table, Value};
use crate::types::{ColumnName, KeyName};

/// One derived key: the new column name plus its ordered contributors.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeySpec {
    /// Name of the key column added to the table.
    pub name: KeyName,
    /// Contributing columns, concatenated in this order.
    pub columns: Vec<ColumnName>,
}

impl KeySpec {
    /// Key over `columns` in the given order.
    pub fn new<I, S>(name: impl Into<KeyName>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ColumnName>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Add the derived key column described by `spec` to a new table.
///
/// Contributor presence and key-name availability are validated before any
/// row work. An all-null contributor row yields the empty string, which is a
/// valid (if low-information) key; duplicate keys are not rejected here.
pub fn derive_key(table: &Table, spec: &KeySpec) -> Result<Table, PipelineError> {
    if spec.columns.is_empty() {
        return Err(PipelineError::Configuration(format!(
            "key '{}' for table '{}' has no contributing columns",
            spec.name,
            table.name()
        )));
    }
    if table.has_column(&spec.name) {
        return Err(PipelineError::duplicate_column(
            table.name().to_string(),
            spec.name.clone(),
        ));
    }
    let contributors = spec
        .columns
        .iter()
        .map(|column| table.require_column(column))
        .collect::<Result<Vec<_>, _>>()?;

    let keys: Vec<Value> = (0..table.num_rows())
        .into_par_iter()
        .map(|row| {
            let mut key = String::new();
            for column in &contributors {
                key.push_str(&column[row].render_text());
            }
            Value::Text(key)
        })
        .collect();
    debug!(
        table = table.name(),
        key = spec.name.as_str(),
        rows = keys.len(),
        "derived key column"
    );
    table.with_column(spec.name.clone(), keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableBuilder;

    fn text(value: &str) -> Value {
        Value::Text(value.to_string())
    }

    fn movements() -> Table {
        let mut builder = TableBuilder::new(
            "flujo_mixto",
            vec!["Cta mayor".into(), "D/H".into(), "Nulo".into()],
        );
        builder.push_row(vec![text("4101"), text("H"), Value::Null]);
        builder.push_row(vec![Value::Null, Value::Null, Value::Null]);
        builder.push_row(vec![text("4101"), text("H"), Value::Null]);
        builder.build()
    }

    #[test]
    fn concatenates_in_order_with_null_substitution() {
        let spec = KeySpec::new("LLave FM", ["Cta mayor", "D/H", "Nulo"]);
        let keyed = derive_key(&movements(), &spec).unwrap();
        assert_eq!(
            keyed.column("LLave FM").unwrap(),
            &[text("4101H"), text(""), text("4101H")]
        );
    }

    #[test]
    fn every_row_gets_a_non_null_key() {
        let spec = KeySpec::new("k", ["Cta mayor", "D/H", "Nulo"]);
        let keyed = derive_key(&movements(), &spec).unwrap();
        assert!(keyed.column("k").unwrap().iter().all(|v| !v.is_null()));
    }

    #[test]
    fn typed_contributors_use_canonical_rendering() {
        let mut builder = TableBuilder::new("t", vec!["n".into(), "d".into()]);
        builder.push_row(vec![Value::Decimal(4101.0), text("H")]);
        let spec = KeySpec::new("k", ["n", "d"]);
        let keyed = derive_key(&builder.build(), &spec).unwrap();
        assert_eq!(keyed.column("k").unwrap(), &[text("4101H")]);
    }

    #[test]
    fn missing_contributor_fails_before_row_work() {
        let spec = KeySpec::new("k", ["Cta mayor", "Sociedad"]);
        let err = derive_key(&movements(), &spec).unwrap_err();
        match err {
            PipelineError::SchemaMismatch { table, column, .. } => {
                assert_eq!(table, "flujo_mixto");
                assert_eq!(column, "Sociedad");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn key_name_collision_fails() {
        let spec = KeySpec::new("D/H", ["Cta mayor"]);
        assert!(matches!(
            derive_key(&movements(), &spec),
            Err(PipelineError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn empty_contributor_list_is_a_configuration_error() {
        let spec = KeySpec::new("k", Vec::<String>::new());
        assert!(matches!(
            derive_key(&movements(), &spec),
            Err(PipelineError::Configuration(_))
        ));
    }
}
