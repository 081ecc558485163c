mod acroform;
mod appearance;
mod character;
mod debug;
mod derived;
mod error;
mod field_map;
mod patch;
mod pdfinspect;
mod perf;
mod portrait;
mod reference;
mod schema;
mod summary;
#[cfg(test)]
mod testutil;

pub use acroform::FieldKind;
pub use character::{
    Ability, AbilityBonus, AbilityScores, Appearance, BackgroundInfo, CharacterRecord, ChoiceGroup,
    ClassEntry, Currency, FeatureSet, InventoryItem, NamedEntry, OptionalProficiencies,
    Proficiencies, ProficiencyChoices, RaceInfo,
};
pub use derived::{
    AbilityValue, CheckValue, DerivedValues, Skill, ability_modifier, compute_derived,
    compute_derived_with_notes, proficiency_bonus,
};
pub use error::{ExportErrorCode, SheetFillError};
pub use field_map::{FieldMap, SlotValue, build_field_map, semantic_values, signed};
pub use patch::{
    PatchOptions, PatchOutput, PatchReport, PatchWarning, WarningCode, patch_template,
};
pub use pdfinspect::{
    PdfInspectError, PdfInspectErrorCode, SchemaCoverage, TemplateField, TemplateReport,
    inspect_template_bytes, inspect_template_path, schema_coverage,
};
pub use portrait::{PortraitError, PortraitFormat, PortraitSource};
pub use reference::CategoryNotes;
pub use schema::{SchemaTag, select_schema};
pub use summary::SheetText;

use debug::DebugLogger;
use perf::PerfLogger;
use std::path::{Path, PathBuf};

impl CharacterRecord {
    pub fn from_json_str(raw: &str) -> Result<Self, SheetFillError> {
        serde_json::from_str(raw)
            .map_err(|err| SheetFillError::InvalidConfiguration(format!("character json: {err}")))
    }

    pub fn from_json_path(path: &Path) -> Result<Self, SheetFillError> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetExport {
    pub bytes: Vec<u8>,
    pub schema: SchemaTag,
    pub report: PatchReport,
}

#[derive(Debug, Clone)]
pub struct ExportJob {
    pub character: CharacterRecord,
    pub template: PathBuf,
    pub portrait: Option<PortraitSource>,
    pub output: PathBuf,
}

// No per-export state; one instance serves concurrent exports.
pub struct SheetExporter {
    notes: CategoryNotes,
    portrait_candidates: Vec<String>,
    debug: Option<DebugLogger>,
    perf: Option<PerfLogger>,
}

#[derive(Clone)]
pub struct SheetExporterBuilder {
    notes: Option<CategoryNotes>,
    portrait_candidates: Vec<String>,
    debug_path: Option<PathBuf>,
    perf_enabled: bool,
    perf_path: Option<PathBuf>,
}

impl Default for SheetExporterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SheetExporterBuilder {
    pub fn new() -> Self {
        Self {
            notes: None,
            portrait_candidates: sheetfill_schema::PORTRAIT_FIELDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            debug_path: None,
            perf_enabled: false,
            perf_path: None,
        }
    }

    pub fn category_notes(mut self, notes: CategoryNotes) -> Self {
        self.notes = Some(notes);
        self
    }

    // Image button names tried in order when binding a portrait.
    pub fn portrait_candidates<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.portrait_candidates = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn perf_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.perf_enabled = true;
        self.perf_path = Some(path.into());
        self
    }

    // default file when no perf_log path is set
    pub fn perf_enabled(mut self, enabled: bool) -> Self {
        self.perf_enabled = enabled;
        self
    }

    pub fn build(self) -> Result<SheetExporter, SheetFillError> {
        if self.portrait_candidates.iter().all(|c| c.trim().is_empty()) {
            return Err(SheetFillError::InvalidConfiguration(
                "portrait_candidates must name at least one field".to_string(),
            ));
        }
        let debug = match self.debug_path {
            Some(path) => Some(DebugLogger::new(path)?),
            None => None,
        };
        let perf = if self.perf_enabled || self.perf_path.is_some() {
            let path = self
                .perf_path
                .unwrap_or_else(|| PathBuf::from("sheetfill_perf.log"));
            Some(PerfLogger::new(path)?)
        } else {
            None
        };
        Ok(SheetExporter {
            notes: self.notes.unwrap_or_else(CategoryNotes::bundled),
            portrait_candidates: self.portrait_candidates,
            debug,
            perf,
        })
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl SheetExporter {
    pub fn builder() -> SheetExporterBuilder {
        SheetExporterBuilder::new()
    }

    pub fn notes(&self) -> &CategoryNotes {
        &self.notes
    }

    pub fn derive(&self, record: &CharacterRecord) -> DerivedValues {
        compute_derived_with_notes(record, &self.notes)
    }

    pub fn field_map(
        &self,
        record: &CharacterRecord,
        template_name: &str,
    ) -> (SchemaTag, FieldMap) {
        let schema = select_schema(template_name);
        let derived = self.derive(record);
        (schema, build_field_map(record, schema, &derived))
    }

    fn patch_options(&self, label: &str) -> PatchOptions {
        PatchOptions {
            portrait_candidates: self.portrait_candidates.clone(),
            export_label: label.to_string(),
            debug: self.debug.clone(),
            perf: self.perf.clone(),
        }
    }

    pub fn export_bytes(
        &self,
        record: &CharacterRecord,
        template: &[u8],
        template_name: &str,
        portrait: Option<&PortraitSource>,
    ) -> Result<SheetExport, SheetFillError> {
        let (schema, map) = self.field_map(record, template_name);
        log::debug!(
            "{template_name}: schema {} with {} mapped fields",
            schema.id(),
            map.len()
        );
        let output = patch_template(template, &map, portrait, &self.patch_options(template_name))?;
        Ok(SheetExport {
            bytes: output.bytes,
            schema,
            report: output.report,
        })
    }

    pub fn export_to_path(
        &self,
        record: &CharacterRecord,
        template: &Path,
        portrait: Option<&PortraitSource>,
        output: &Path,
    ) -> Result<PatchReport, SheetFillError> {
        let bytes = std::fs::read(template)?;
        let (schema, map) = self.field_map(record, &display_name(template));
        let label = display_name(output);
        let patched = patch_template(&bytes, &map, portrait, &self.patch_options(&label))?;
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(output, &patched.bytes)?;
        log::info!(
            "wrote {} ({} schema, {} warnings)",
            output.display(),
            schema.id(),
            patched.report.warnings.len()
        );
        Ok(patched.report)
    }

    pub fn export_batch(&self, jobs: &[ExportJob]) -> Vec<Result<PatchReport, SheetFillError>> {
        use rayon::prelude::*;

        jobs.par_iter()
            .map(|job| {
                self.export_to_path(
                    &job.character,
                    &job.template,
                    job.portrait.as_ref(),
                    &job.output,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FixtureField, FixtureKind, build_encrypted_pdf, build_form_pdf};

    fn fighter() -> CharacterRecord {
        CharacterRecord::from_json_str(
            r#"{
                "name": "Brienne",
                "classes": [{ "name": "Fighter", "level": 3 }],
                "abilityScores": { "strength": 16, "dexterity": 12, "constitution": 14, "intelligence": 8 },
                "proficiencies": { "savingThrows": ["Strength", "Constitution"], "skills": ["Athletics"] }
            }"#,
        )
        .expect("character")
    }

    fn legacy_template() -> Vec<u8> {
        build_form_pdf(&[
            FixtureField::new("CharacterName", FixtureKind::Text),
            FixtureField::new("STRmod", FixtureKind::Text),
            FixtureField::new("ST Strength", FixtureKind::Text),
            FixtureField::new("Check Box 11", FixtureKind::Checkbox),
        ])
    }

    #[test]
    fn builder_rejects_empty_portrait_candidates() {
        let err = SheetExporter::builder()
            .portrait_candidates(Vec::<String>::new())
            .build()
            .err()
            .expect("must fail");
        assert_eq!(err.code(), ExportErrorCode::InvalidConfiguration);
    }

    #[test]
    fn export_bytes_fills_legacy_fields() {
        let exporter = SheetExporter::builder().build().expect("exporter");
        let export = exporter
            .export_bytes(&fighter(), &legacy_template(), "5E_CharacterSheet.pdf", None)
            .expect("export");
        assert_eq!(export.schema, SchemaTag::Legacy);
        assert_eq!(export.report.text_filled, 3);
        assert_eq!(export.report.checkboxes_set, 1);
        assert!(export.bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn export_bytes_propagates_encrypted_template() {
        let exporter = SheetExporter::builder().build().expect("exporter");
        let err = exporter
            .export_bytes(&fighter(), &build_encrypted_pdf(), "sheet.pdf", None)
            .unwrap_err();
        assert_eq!(err.code(), ExportErrorCode::TemplateEncrypted);
    }

    #[test]
    fn batch_export_writes_every_job_in_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let template = dir.path().join("sheet.pdf");
        std::fs::write(&template, legacy_template()).expect("template");
        let broken = dir.path().join("broken.pdf");
        std::fs::write(&broken, b"not a pdf").expect("broken");

        let jobs: Vec<ExportJob> = (0..4)
            .map(|i| ExportJob {
                character: fighter(),
                template: if i == 2 { broken.clone() } else { template.clone() },
                portrait: None,
                output: dir.path().join("out").join(format!("sheet-{i}.pdf")),
            })
            .collect();
        let debug_path = dir.path().join("debug.jsonl");
        let exporter = SheetExporter::builder()
            .debug_log(&debug_path)
            .build()
            .expect("exporter");
        let results = exporter.export_batch(&jobs);
        assert_eq!(results.len(), 4);
        for (i, result) in results.iter().enumerate() {
            if i == 2 {
                assert!(matches!(result, Err(SheetFillError::TemplateUnreadable(_))));
            } else {
                assert!(result.is_ok());
                assert!(jobs[i].output.exists());
            }
        }
        let log = std::fs::read_to_string(&debug_path).expect("debug log");
        let summaries: Vec<serde_json::Value> = log
            .lines()
            .map(|l| serde_json::from_str(l).expect("json line"))
            .filter(|v: &serde_json::Value| v["type"] == "export.summary")
            .collect();
        assert_eq!(summaries.len(), 3);
        for (job, result) in jobs.iter().zip(&results) {
            let Ok(report) = result else { continue };
            let label = job.output.file_name().and_then(|n| n.to_str()).expect("name");
            let summary = summaries
                .iter()
                .find(|s| s["export"] == label)
                .expect("summary per export");
            assert_eq!(summary["text_filled"], report.text_filled as u64);
            assert_eq!(summary["counts"]["FIELD_NOT_FOUND"], report.warnings.len() as u64);
        }
    }

    #[test]
    fn schema_marker_in_a_folder_name_is_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let folder = dir.path().join("2024");
        std::fs::create_dir_all(&folder).expect("folder");
        let template = folder.join("5E_CharacterSheet_Fillable.pdf");
        std::fs::write(&template, legacy_template()).expect("template");

        let exporter = SheetExporter::builder().build().expect("exporter");
        let report = exporter
            .export_to_path(&fighter(), &template, None, &dir.path().join("out.pdf"))
            .expect("export");
        assert_eq!(report.text_filled, 3);
        assert_eq!(report.checkboxes_set, 1);
    }
}
