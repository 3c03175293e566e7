//! Reconciliation joins over derived and natural keys.
//!
//! Matching is exact value equality with upstream normalization responsible
//! for making values comparable; there is no fuzzy matching or case folding.
//! Nulls never match nulls. Duplicate right-side keys fan out (one output row
//! per match), which is legitimate for finance master tables that repeat keys
//! across fiscal periods; callers needing 1:1 must pre-deduplicate.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::PipelineError;
use crate::table::{Table, TableBuilder, Value};
use crate::types::ColumnName;

/// Unmatched-row handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinMode {
    /// Drop left rows with no right match.
    Inner,
    /// Keep every left row, filling right columns with null on no match.
    Left,
}

/// One join: ordered (left column, right column) pairs plus a mode.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JoinSpec {
    /// Column pairs compared for equality, all of which must match.
    pub on: Vec<(ColumnName, ColumnName)>,
    /// Unmatched-row handling.
    pub mode: JoinMode,
}

impl JoinSpec {
    /// Empty inner-join spec; add pairs with [`JoinSpec::on`].
    pub fn inner() -> Self {
        Self {
            on: Vec::new(),
            mode: JoinMode::Inner,
        }
    }

    /// Empty left-join spec; add pairs with [`JoinSpec::on`].
    pub fn left() -> Self {
        Self {
            on: Vec::new(),
            mode: JoinMode::Left,
        }
    }

    /// Add an equality pair.
    pub fn on(mut self, left: impl Into<ColumnName>, right: impl Into<ColumnName>) -> Self {
        self.on.push((left.into(), right.into()));
        self
    }
}

/// Join two tables per `spec`, producing the unified table.
///
/// Both sides of every `on` pair are validated before any row scan; a missing
/// column is a schema mismatch naming the offending table. Output columns are
/// all left columns followed by the right columns, minus right key columns
/// that mirror an equal-named left key; a surviving right column whose name
/// collides with a left column is prefixed with the right table's name.
pub fn join(left: &Table, right: &Table, spec: &JoinSpec) -> Result<Table, PipelineError> {
    if spec.on.is_empty() {
        return Err(PipelineError::Configuration(format!(
            "join of '{}' and '{}' has no key pairs",
            left.name(),
            right.name()
        )));
    }
    let left_keys = spec
        .on
        .iter()
        .map(|(column, _)| left.require_column(column))
        .collect::<Result<Vec<_>, _>>()?;
    let right_keys = spec
        .on
        .iter()
        .map(|(_, column)| right.require_column(column))
        .collect::<Result<Vec<_>, _>>()?;

    // Right key columns whose pair shares one name carry no extra information
    // in the output; differently-named pairs keep both sides.
    let mirrored: Vec<&str> = spec
        .on
        .iter()
        .filter(|(l, r)| l == r)
        .map(|(_, r)| r.as_str())
        .collect();
    let mut columns: Vec<ColumnName> = left.column_names().map(str::to_string).collect();
    let mut kept_right: Vec<&str> = Vec::new();
    for column in right.column_names() {
        if mirrored.contains(&column) {
            continue;
        }
        let output = if left.has_column(column) {
            format!("{}.{}", right.name(), column)
        } else {
            column.to_string()
        };
        if columns.contains(&output) {
            return Err(PipelineError::duplicate_column(right.name().to_string(), output));
        }
        columns.push(output);
        kept_right.push(column);
    }

    let mut probe: HashMap<Vec<HashCell>, Vec<usize>> =
        HashMap::with_capacity(right.num_rows());
    for row in 0..right.num_rows() {
        if let Some(key) = hash_key(&right_keys, row) {
            probe.entry(key).or_default().push(row);
        }
    }

    let name = format!("{}+{}", left.name(), right.name());
    let mut builder = TableBuilder::new(name, columns);
    for row in 0..left.num_rows() {
        let matches = hash_key(&left_keys, row)
            .and_then(|key| probe.get(&key))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        if matches.is_empty() {
            if spec.mode == JoinMode::Left {
                let mut cells = left.row(row);
                cells.extend(kept_right.iter().map(|_| Value::Null));
                builder.push_row(cells);
            }
            continue;
        }
        for &right_row in matches {
            let mut cells = left.row(row);
            for &column in &kept_right {
                cells.push(right.column(column).expect("validated above")[right_row].clone());
            }
            builder.push_row(cells);
        }
    }
    debug!(
        left = left.name(),
        right = right.name(),
        rows = builder.num_rows(),
        "joined tables"
    );
    Ok(builder.build())
}

/// Hashable, exact-equality image of one composite key.
///
/// `None` marks a key that can never match: any null contributor, or a NaN
/// decimal. Decimals hash by bit pattern with negative zero normalized so
/// hash equality coincides with value equality.
#[derive(Hash, PartialEq, Eq)]
enum HashCell {
    Text(String),
    Integer(i64),
    DecimalBits(u64),
    Date(NaiveDate),
    Boolean(bool),
}

fn hash_key(columns: &[&[Value]], row: usize) -> Option<Vec<HashCell>> {
    columns
        .iter()
        .map(|values| hash_cell(&values[row]))
        .collect()
}

fn hash_cell(value: &Value) -> Option<HashCell> {
    match value {
        Value::Null => None,
        Value::Text(text) => Some(HashCell::Text(text.clone())),
        Value::Integer(n) => Some(HashCell::Integer(*n)),
        Value::Decimal(d) if d.is_nan() => None,
        Value::Decimal(d) => {
            let normalized = if *d == 0.0 { 0.0f64 } else { *d };
            Some(HashCell::DecimalBits(normalized.to_bits()))
        }
        Value::Date(date) => Some(HashCell::Date(*date)),
        Value::Boolean(b) => Some(HashCell::Boolean(*b)),
    }
}
