/// Column name as exposed by a table (raw header token before normalization,
/// canonical name after).
/// Examples: `Cta mayor`, `D/H`, `Nº ident fis 1`
pub type ColumnName = String;
/// Raw header token exactly as present in a delimited extract.
/// Examples: `Cta.mayor`, `Nº ident.fis.1`, `cod. Empresa`
pub type RawHeader = String;
/// Logical dataset/table name used in reports, logs, and errors.
/// Examples: `flujo_mixto`, `listado_empresas`, `dato_maestro_deudor`
pub type TableName = String;
/// Name of a derived key column.
/// Example: `LLave FM`
pub type KeyName = String;
