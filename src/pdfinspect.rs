use crate::acroform::{FieldKind, acroform, collect_fields};
use crate::error::SheetFillError;
use crate::patch::load_template;
use crate::schema::SchemaTag;
use lopdf::Document;
use serde::Serialize;
use sheetfill_schema::SlotKind;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PdfInspectErrorCode {
    PdfParseFailed,
    PdfEncryptedUnsupported,
    PdfIoError,
}

impl PdfInspectErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PdfInspectErrorCode::PdfParseFailed => "PDF_PARSE_FAILED",
            PdfInspectErrorCode::PdfEncryptedUnsupported => "PDF_ENCRYPTED_UNSUPPORTED",
            PdfInspectErrorCode::PdfIoError => "PDF_IO_ERROR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}: {message}", .code.as_str())]
pub struct PdfInspectError {
    pub code: PdfInspectErrorCode,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateField {
    pub name: String,
    pub kind: FieldKind,
    pub widgets: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateReport {
    pub pdf_version: String,
    pub page_count: usize,
    pub file_size_bytes: usize,
    pub has_acroform: bool,
    pub fields: Vec<TemplateField>,
}

impl TemplateReport {
    pub fn kind_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for field in &self.fields {
            *counts.entry(field.kind.as_str()).or_insert(0) += 1;
        }
        counts
    }

    pub fn field(&self, name: &str) -> Option<&TemplateField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

fn open(bytes: &[u8]) -> Result<Document, PdfInspectError> {
    load_template(bytes).map_err(|err| match err {
        SheetFillError::TemplateEncrypted => PdfInspectError {
            code: PdfInspectErrorCode::PdfEncryptedUnsupported,
            message: "encrypted templates cannot be inspected".to_string(),
        },
        other => PdfInspectError {
            code: PdfInspectErrorCode::PdfParseFailed,
            message: other.to_string(),
        },
    })
}

pub fn inspect_template_bytes(bytes: &[u8]) -> Result<TemplateReport, PdfInspectError> {
    let doc = open(bytes)?;
    let fields = collect_fields(&doc)
        .into_iter()
        .map(|f| TemplateField {
            name: f.name,
            kind: f.kind,
            widgets: f.widgets.len(),
        })
        .collect();
    Ok(TemplateReport {
        pdf_version: doc.version.clone(),
        page_count: doc.get_pages().len(),
        file_size_bytes: bytes.len(),
        has_acroform: acroform(&doc).is_some(),
        fields,
    })
}

pub fn inspect_template_path(path: &Path) -> Result<TemplateReport, PdfInspectError> {
    let data = std::fs::read(path).map_err(|err| PdfInspectError {
        code: PdfInspectErrorCode::PdfIoError,
        message: err.to_string(),
    })?;
    inspect_template_bytes(&data)
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaCoverage {
    pub schema: String,
    pub matched: usize,
    pub missing: Vec<String>,
    pub kind_mismatches: Vec<String>,
}

impl SchemaCoverage {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.kind_mismatches.is_empty()
    }
}

pub fn schema_coverage(report: &TemplateReport, schema: SchemaTag) -> SchemaCoverage {
    let mut coverage = SchemaCoverage {
        schema: schema.id().to_string(),
        ..SchemaCoverage::default()
    };
    for def in schema.table() {
        let Some(field) = report.field(def.field) else {
            coverage.missing.push(def.field.to_string());
            continue;
        };
        let compatible = match def.kind {
            SlotKind::Text => matches!(
                field.kind,
                FieldKind::Text | FieldKind::Dropdown | FieldKind::OptionList
            ),
            SlotKind::Check => field.kind == FieldKind::Checkbox,
        };
        if compatible {
            coverage.matched += 1;
        } else {
            coverage.kind_mismatches.push(def.field.to_string());
        }
    }
    coverage
}
