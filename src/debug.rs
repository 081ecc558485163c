use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::patch::{PatchReport, PatchWarning};

// JSONL trace of export decisions. Shared across parallel exports, so it only
// writes lines; every count it emits comes from the export's own report.
#[derive(Clone)]
pub(crate) struct DebugLogger {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }

    pub fn log_value(&self, value: &Value) {
        if let Ok(mut writer) = self.inner.lock() {
            let _ = writeln!(writer, "{value}");
        }
    }

    pub fn log_warning(&self, export: &str, warning: &PatchWarning) {
        self.log_value(&json!({
            "type": "export.warning",
            "export": export,
            "code": warning.code.as_str(),
            "field": warning.field,
            "message": warning.message,
        }));
    }

    pub fn emit_summary(&self, export: &str, report: &PatchReport) {
        let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
        for warning in &report.warnings {
            *counts.entry(warning.code.as_str()).or_insert(0) += 1;
        }
        self.log_value(&json!({
            "type": "export.summary",
            "export": export,
            "counts": counts,
            "text_filled": report.text_filled,
            "checkboxes_set": report.checkboxes_set,
            "widgets_hidden": report.widgets_hidden,
        }));
    }

    pub fn flush(&self) {
        if let Ok(mut writer) = self.inner.lock() {
            let _ = writer.flush();
        }
    }
}
