//! Ready-made specs for the SAP cash-flow extract family.
//!
//! Three extract families feed the reconciliation: mixed cash-flow movements
//! (`flujo_mixto`), the company listing (`listado_empresas`), and debtor
//! master data (`dato_maestro_deudor`). All three are semicolon-delimited
//! with a header row. The rename maps below absorb the header spelling drift
//! the exports are known for; the join graph itself stays caller-defined.

use std::path::Path;

use crate::key::KeySpec;
use crate::loader::SourceDescriptor;
use crate::normalize::NormalizeSpec;
use crate::pipeline::SourcePipeline;
use crate::table::LogicalType;

/// Logical name of the mixed cash-flow movements source.
pub const FLUJO_MIXTO: &str = "flujo_mixto";
/// Logical name of the company listing source.
pub const LISTADO_EMPRESAS: &str = "listado_empresas";
/// Logical name of the debtor master data source.
pub const DATO_MAESTRO_DEUDOR: &str = "dato_maestro_deudor";

fn descriptor(name: &str, location: &Path) -> SourceDescriptor {
    SourceDescriptor::new(name, location).with_delimiter(';')
}

/// Normalization for the movements extract: `Cta.mayor` to `Cta mayor`.
pub fn flujo_mixto_normalize() -> NormalizeSpec {
    NormalizeSpec::new().with_rename("Cta.mayor", "Cta mayor")
}

/// The movements reconciliation key: account, debit/credit flag, and the
/// (frequently empty) `Nulo` marker, concatenated with no separator.
pub fn flujo_mixto_key() -> KeySpec {
    KeySpec::new("LLave FM", ["Cta mayor", "D/H", "Nulo"])
}

/// Normalization for the debtor master extract: identifier and company-code
/// header cleanup plus the numeric `Cliente` cast.
pub fn dato_maestro_deudor_normalize() -> NormalizeSpec {
    NormalizeSpec::new()
        .with_rename("Nº ident.fis.1", "Nº ident fis 1")
        .with_rename("cod. Empresa", "cod Empresa")
        .with_type("Cliente", LogicalType::Decimal)
}

/// Full source stage for the movements extract rooted at `location`.
pub fn flujo_mixto_pipeline(location: impl AsRef<Path>) -> SourcePipeline {
    SourcePipeline::new(descriptor(FLUJO_MIXTO, location.as_ref()))
        .with_normalize(flujo_mixto_normalize())
        .with_key(flujo_mixto_key())
}

/// Full source stage for the company listing rooted at `location`. The
/// listing needs no renames; its headers are already canonical.
pub fn listado_empresas_pipeline(location: impl AsRef<Path>) -> SourcePipeline {
    SourcePipeline::new(descriptor(LISTADO_EMPRESAS, location.as_ref()))
}

/// Full source stage for the debtor master extract rooted at `location`.
pub fn dato_maestro_deudor_pipeline(location: impl AsRef<Path>) -> SourcePipeline {
    SourcePipeline::new(descriptor(DATO_MAESTRO_DEUDOR, location.as_ref()))
        .with_normalize(dato_maestro_deudor_normalize())
}
