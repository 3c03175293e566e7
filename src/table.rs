//! Immutable columnar table model threaded through pipeline stages.
//!
//! Ownership model:
//! - `Table` is a value: every transformation builds a new `Table` and leaves
//!   its input untouched, so stages compose as pure functions.
//! - Columns are ordered and named; rows carry no ordering semantics.
//! - `TableBuilder` is the only row-major entry point, used where rows are
//!   produced incrementally (loading, join output).

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::errors::PipelineError;
use crate::types::{ColumnName, TableName};

/// Logical column types understood by the normalizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum LogicalType {
    Text,
    Integer,
    Decimal,
    Date,
    Boolean,
}

/// A single cell value. `Null` stands for a missing/empty cell.
#[derive(Clone, Debug, PartialEq)]
#[allow(missing_docs)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Decimal(f64),
    Date(NaiveDate),
    Boolean(bool),
}

impl Value {
    /// Whether this cell is missing.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Logical type of a non-null value.
    pub fn logical_type(&self) -> Option<LogicalType> {
        match self {
            Value::Null => None,
            Value::Text(_) => Some(LogicalType::Text),
            Value::Integer(_) => Some(LogicalType::Integer),
            Value::Decimal(_) => Some(LogicalType::Decimal),
            Value::Date(_) => Some(LogicalType::Date),
            Value::Boolean(_) => Some(LogicalType::Boolean),
        }
    }

    /// Canonical text rendering used by key derivation and text coercion.
    ///
    /// `Null` renders as the empty string. Integral decimals render without a
    /// trailing `.0` so a value that round-tripped through a numeric cast
    /// still concatenates to the same key as its original text form. Dates
    /// render as ISO-8601 (`2024-01-31`).
    pub fn render_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Text(text) => text.clone(),
            Value::Integer(n) => n.to_string(),
            Value::Decimal(d) => {
                if d.is_finite() && d.fract() == 0.0 && d.abs() < 9.007_199_254_740_992e15 {
                    format!("{}", *d as i64)
                } else {
                    format!("{d}")
                }
            }
            Value::Date(date) => date.format("%Y-%m-%d").to_string(),
            Value::Boolean(b) => b.to_string(),
        }
    }
}

/// Ordered collection of equal-length named columns.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    name: TableName,
    columns: IndexMap<ColumnName, Vec<Value>>,
    rows: usize,
}

impl Table {
    /// Create an empty table with no columns and no rows.
    pub fn empty(name: impl Into<TableName>) -> Self {
        Self {
            name: name.into(),
            columns: IndexMap::new(),
            rows: 0,
        }
    }

    /// Build a table from pre-assembled columns, validating equal lengths.
    pub fn from_columns(
        name: impl Into<TableName>,
        columns: IndexMap<ColumnName, Vec<Value>>,
    ) -> Result<Self, PipelineError> {
        let name = name.into();
        let rows = columns.values().next().map(Vec::len).unwrap_or(0);
        if let Some((column, values)) = columns.iter().find(|(_, v)| v.len() != rows) {
            return Err(PipelineError::Configuration(format!(
                "column '{column}' in table '{name}' has {} values, expected {rows}",
                values.len()
            )));
        }
        Ok(Self {
            name,
            columns,
            rows,
        })
    }

    /// Logical table name used in reports and errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Whether a column exists under `name`.
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Cell values of a column, if present.
    pub fn column(&self, name: &str) -> Option<&[Value]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Cell values of a column, or a fail-fast schema mismatch naming this
    /// table and the missing column.
    pub fn require_column(&self, name: &str) -> Result<&[Value], PipelineError> {
        self.column(name)
            .ok_or_else(|| PipelineError::missing_column(self.name.clone(), name))
    }

    /// One row as a cell vector in column order.
    pub fn row(&self, idx: usize) -> Vec<Value> {
        self.columns
            .values()
            .map(|values| values[idx].clone())
            .collect()
    }

    /// New table with `values` appended as column `name`.
    ///
    /// Fails when the name is taken or the length differs from the row count.
    pub fn with_column(
        &self,
        name: impl Into<ColumnName>,
        values: Vec<Value>,
    ) -> Result<Self, PipelineError> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(PipelineError::duplicate_column(self.name.clone(), name));
        }
        if values.len() != self.rows && !self.columns.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "column '{name}' has {} values, table '{}' has {} rows",
                values.len(),
                self.name,
                self.rows
            )));
        }
        let mut table = self.clone();
        table.rows = values.len();
        table.columns.insert(name, values);
        Ok(table)
    }

    /// New table with the cells of an existing column replaced in place.
    pub fn with_column_values(
        &self,
        name: &str,
        values: Vec<Value>,
    ) -> Result<Self, PipelineError> {
        if !self.columns.contains_key(name) {
            return Err(PipelineError::missing_column(self.name.clone(), name));
        }
        if values.len() != self.rows {
            return Err(PipelineError::Configuration(format!(
                "column '{name}' has {} values, table '{}' has {} rows",
                values.len(),
                self.name,
                self.rows
            )));
        }
        let mut table = self.clone();
        table.columns.insert(name.to_string(), values);
        Ok(table)
    }

    /// New table with column `from` renamed to `to`, preserving its position.
    ///
    /// A missing `from` is a no-op (extract batches drift in schema); renaming
    /// onto an existing distinct column is a schema mismatch since it would
    /// silently clobber data.
    pub fn rename_column(&self, from: &str, to: &str) -> Result<Self, PipelineError> {
        if from == to || !self.columns.contains_key(from) {
            return Ok(self.clone());
        }
        if self.columns.contains_key(to) {
            return Err(PipelineError::duplicate_column(self.name.clone(), to));
        }
        let columns = self
            .columns
            .iter()
            .map(|(name, values)| {
                let name = if name == from { to } else { name.as_str() };
                (name.to_string(), values.clone())
            })
            .collect();
        Ok(Self {
            name: self.name.clone(),
            columns,
            rows: self.rows,
        })
    }

    /// Vertically concatenate extract batches that share one schema.
    ///
    /// Every table must expose the same column names in the same order;
    /// anything else is a schema mismatch naming the first offender.
    pub fn concat(
        name: impl Into<TableName>,
        tables: &[Table],
    ) -> Result<Self, PipelineError> {
        let name = name.into();
        let Some(first) = tables.first() else {
            return Ok(Self::empty(name));
        };
        let schema: Vec<&str> = first.column_names().collect();
        for table in &tables[1..] {
            let other: Vec<&str> = table.column_names().collect();
            if other != schema {
                let column = schema
                    .iter()
                    .zip(other.iter().chain(std::iter::repeat(&"")))
                    .find(|(a, b)| a != b)
                    .map(|(a, _)| a.to_string())
                    .unwrap_or_else(|| "<column count>".to_string());
                return Err(PipelineError::SchemaMismatch {
                    table: table.name.clone(),
                    column,
                    details: format!("header differs from batch sibling '{}'", first.name),
                });
            }
        }
        let mut columns: IndexMap<ColumnName, Vec<Value>> = IndexMap::new();
        for column in &schema {
            let mut values = Vec::new();
            for table in tables {
                values.extend_from_slice(table.column(column).expect("checked schema"));
            }
            columns.insert((*column).to_string(), values);
        }
        Self::from_columns(name, columns)
    }
}

/// Row-major accumulator for stages that produce rows incrementally.
pub struct TableBuilder {
    name: TableName,
    columns: Vec<ColumnName>,
    rows: Vec<Vec<Value>>,
}

impl TableBuilder {
    /// Start a builder for a table with the given column names.
    pub fn new(name: impl Into<TableName>, columns: Vec<ColumnName>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    /// Append one row. The cell count must match the declared columns.
    pub fn push_row(&mut self, row: Vec<Value>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Number of rows accumulated so far.
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of declared columns.
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Transpose the accumulated rows into an immutable columnar table.
    pub fn build(self) -> Table {
        let rows = self.rows.len();
        let mut columns: IndexMap<ColumnName, Vec<Value>> = self
            .columns
            .iter()
            .map(|name| (name.clone(), Vec::with_capacity(rows)))
            .collect();
        for row in self.rows {
            for (values, cell) in columns.values_mut().zip(row) {
                values.push(cell);
            }
        }
        Table {
            name: self.name,
            columns,
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Value {
        Value::Text(value.to_string())
    }

    #[test]
    fn render_text_is_canonical() {
        assert_eq!(Value::Null.render_text(), "");
        assert_eq!(text("4101").render_text(), "4101");
        assert_eq!(Value::Integer(-7).render_text(), "-7");
        assert_eq!(Value::Decimal(4101.0).render_text(), "4101");
        assert_eq!(Value::Decimal(0.25).render_text(), "0.25");
        assert_eq!(
            Value::Date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()).render_text(),
            "2024-01-31"
        );
        assert_eq!(Value::Boolean(true).render_text(), "true");
    }

    #[test]
    fn rename_missing_column_is_noop() {
        let mut builder = TableBuilder::new("t", vec!["a".into()]);
        builder.push_row(vec![text("1")]);
        let table = builder.build();
        let renamed = table.rename_column("missing", "b").unwrap();
        assert_eq!(renamed, table);
    }

    #[test]
    fn rename_onto_existing_column_fails() {
        let mut builder = TableBuilder::new("t", vec!["a".into(), "b".into()]);
        builder.push_row(vec![text("1"), text("2")]);
        let table = builder.build();
        let err = table.rename_column("a", "b").unwrap_err();
        assert!(matches!(err, PipelineError::SchemaMismatch { .. }));
    }

    #[test]
    fn rename_preserves_column_order() {
        let mut builder = TableBuilder::new("t", vec!["a".into(), "b".into(), "c".into()]);
        builder.push_row(vec![text("1"), text("2"), text("3")]);
        let table = builder.build().rename_column("b", "B").unwrap();
        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, vec!["a", "B", "c"]);
    }

    #[test]
    fn with_column_rejects_duplicates_and_bad_lengths() {
        let mut builder = TableBuilder::new("t", vec!["a".into()]);
        builder.push_row(vec![text("1")]);
        let table = builder.build();
        assert!(table.with_column("a", vec![text("x")]).is_err());
        assert!(table.with_column("b", vec![]).is_err());
        let grown = table.with_column("b", vec![Value::Null]).unwrap();
        assert_eq!(grown.num_columns(), 2);
        assert_eq!(grown.num_rows(), 1);
    }

    #[test]
    fn concat_requires_matching_headers() {
        let mut left = TableBuilder::new("jan", vec!["a".into(), "b".into()]);
        left.push_row(vec![text("1"), text("2")]);
        let mut right = TableBuilder::new("feb", vec!["a".into(), "c".into()]);
        right.push_row(vec![text("3"), text("4")]);
        let err = Table::concat("all", &[left.build(), right.build()]).unwrap_err();
        match err {
            PipelineError::SchemaMismatch { table, column, .. } => {
                assert_eq!(table, "feb");
                assert_eq!(column, "b");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn concat_appends_rows_in_column_order() {
        let mut left = TableBuilder::new("jan", vec!["a".into()]);
        left.push_row(vec![text("1")]);
        let mut right = TableBuilder::new("feb", vec!["a".into()]);
        right.push_row(vec![text("2")]);
        right.push_row(vec![Value::Null]);
        let all = Table::concat("all", &[left.build(), right.build()]).unwrap();
        assert_eq!(all.num_rows(), 3);
        assert_eq!(
            all.column("a").unwrap(),
            &[text("1"), text("2"), Value::Null]
        );
    }
}
