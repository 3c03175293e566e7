//! Delimited source loading.
//!
//! Turns one raw delimited dataset into a typed [`Table`] whose column names
//! are the header tokens verbatim (`Cta.mayor`, `D/H`, `Nº ident.fis.1`) and
//! whose cells are text, with empty fields surfaced as nulls. What happens to
//! a malformed row is the caller's call via [`MalformedRowPolicy`]; this
//! component only detects, counts, and logs.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::PipelineError;
use crate::report::LoadReport;
use crate::table::{Table, TableBuilder, Value};
use crate::transport::FileStream;
use crate::types::TableName;

/// Identifies one logical dataset: a location plus parse options.
///
/// `location` may point at a single delimited file or at a directory holding
/// one file per export batch; directories are concatenated into one table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Logical table name used in reports, logs, and errors.
    pub name: TableName,
    /// File or directory holding the raw extract(s).
    pub location: PathBuf,
    /// Field delimiter; must be a single ASCII character.
    pub delimiter: char,
    /// Whether the first record of each file is a header row.
    pub has_header: bool,
}

impl SourceDescriptor {
    /// Descriptor with comma delimiter and a header row.
    pub fn new(name: impl Into<TableName>, location: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
            delimiter: ',',
            has_header: true,
        }
    }

    /// Override the field delimiter.
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Override header presence.
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    fn delimiter_byte(&self) -> Result<u8, PipelineError> {
        u8::try_from(self.delimiter).map_err(|_| {
            PipelineError::Configuration(format!(
                "delimiter '{}' for source '{}' is not a single-byte character",
                self.delimiter, self.name
            ))
        })
    }
}

/// Host policy for rows that fail to parse into the declared column count.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MalformedRowPolicy {
    /// Log the row, count it in the [`LoadReport`], and continue.
    #[default]
    SkipAndCount,
    /// Abort the load with [`PipelineError::MalformedRecord`].
    Propagate,
}

/// A loaded table plus its load diagnostics.
#[derive(Clone, Debug)]
pub struct LoadedTable {
    /// The loaded (possibly batch-concatenated) table.
    pub table: Table,
    /// Rows loaded/skipped and files read.
    pub report: LoadReport,
}

/// Load one dataset, dispatching on whether the location is a file or a
/// directory of per-batch extract files.
pub fn load(
    descriptor: &SourceDescriptor,
    policy: MalformedRowPolicy,
) -> Result<LoadedTable, PipelineError> {
    if descriptor.location.is_dir() {
        load_table_from_root(descriptor, policy)
    } else {
        load_table(descriptor, policy)
    }
}

/// Load a single delimited file into a table.
pub fn load_table(
    descriptor: &SourceDescriptor,
    policy: MalformedRowPolicy,
) -> Result<LoadedTable, PipelineError> {
    let file = File::open(&descriptor.location)?;
    let location = descriptor.location.display().to_string();
    load_table_from_reader(
        descriptor.name.clone(),
        &location,
        BufReader::new(file),
        descriptor,
        policy,
    )
}

/// Load and vertically concatenate every extract file under a directory.
///
/// Files are read in stable sorted order and must share one header; a
/// divergent file fails the batch with a schema mismatch.
pub fn load_table_from_root(
    descriptor: &SourceDescriptor,
    policy: MalformedRowPolicy,
) -> Result<LoadedTable, PipelineError> {
    let files = FileStream::new(&descriptor.location).files()?;
    if files.is_empty() {
        return Err(PipelineError::Configuration(format!(
            "no extract files under '{}' for source '{}'",
            descriptor.location.display(),
            descriptor.name
        )));
    }
    let mut tables = Vec::with_capacity(files.len());
    let mut report = LoadReport::default();
    for path in &files {
        let file = File::open(path)?;
        let location = path.display().to_string();
        let loaded = load_table_from_reader(
            location.clone(),
            &location,
            BufReader::new(file),
            descriptor,
            policy,
        )?;
        report.absorb(&loaded.report);
        tables.push(loaded.table);
    }
    let table = Table::concat(descriptor.name.clone(), &tables)?;
    debug!(
        source = descriptor.name.as_str(),
        files = report.files_read,
        rows = report.rows_loaded,
        "loaded extract batch"
    );
    Ok(LoadedTable { table, report })
}

/// Load a delimited table from any reader; `location` labels parse errors.
pub fn load_table_from_reader<R: Read>(
    name: impl Into<TableName>,
    location: &str,
    reader: R,
    descriptor: &SourceDescriptor,
    policy: MalformedRowPolicy,
) -> Result<LoadedTable, PipelineError> {
    let name = name.into();
    let mut records = csv::ReaderBuilder::new()
        .delimiter(descriptor.delimiter_byte()?)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader)
        .into_records();

    let mut builder: Option<TableBuilder> = None;
    let mut report = LoadReport {
        files_read: 1,
        ..LoadReport::default()
    };
    while let Some(record) = records.next() {
        let record = record.map_err(|source| PipelineError::Delimited {
            location: location.to_string(),
            source,
        })?;
        if builder.is_none() {
            let columns = if descriptor.has_header {
                header_columns(&name, &record)?
            } else {
                (0..record.len()).map(|idx| format!("col_{idx}")).collect()
            };
            let mut fresh = TableBuilder::new(name.clone(), columns);
            if !descriptor.has_header {
                fresh.push_row(record.iter().map(cell_value).collect());
                report.rows_loaded += 1;
            }
            builder = Some(fresh);
            continue;
        }
        let builder = builder.as_mut().expect("initialized above");
        let expected = builder.num_columns();
        if record.len() != expected {
            let row = record.position().map(|pos| pos.line()).unwrap_or(0);
            match policy {
                MalformedRowPolicy::Propagate => {
                    return Err(PipelineError::MalformedRecord {
                        location: location.to_string(),
                        row,
                        expected,
                        found: record.len(),
                    });
                }
                MalformedRowPolicy::SkipAndCount => {
                    warn!(
                        location,
                        row,
                        expected,
                        found = record.len(),
                        "skipping malformed record"
                    );
                    report.rows_skipped += 1;
                    continue;
                }
            }
        }
        builder.push_row(record.iter().map(cell_value).collect());
        report.rows_loaded += 1;
    }

    let table = match builder {
        Some(builder) => builder.build(),
        // Zero-record input: no header to declare columns from.
        None => Table::empty(name),
    };
    Ok(LoadedTable { table, report })
}

fn header_columns(
    name: &str,
    record: &csv::StringRecord,
) -> Result<Vec<String>, PipelineError> {
    let columns: Vec<String> = record.iter().map(str::to_string).collect();
    for (idx, column) in columns.iter().enumerate() {
        if columns[..idx].contains(column) {
            return Err(PipelineError::SchemaMismatch {
                table: name.to_string(),
                column: column.clone(),
                details: "duplicate header token".to_string(),
            });
        }
    }
    Ok(columns)
}

fn cell_value(field: &str) -> Value {
    if field.is_empty() {
        Value::Null
    } else {
        Value::Text(field.to_string())
    }
}
