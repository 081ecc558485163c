use crate::acroform::{
    FLAG_READ_ONLY, FieldKind, FormField, acroform_mut, collect_fields, dict_mut, hide_widget,
    object_text, on_state_name, resolve, strip_scripts, text_object,
};
use crate::appearance::{regenerate_appearances, remove_off_states};
use crate::debug::DebugLogger;
use crate::error::SheetFillError;
use crate::field_map::FieldMap;
use crate::perf::{PerfLogger, StepTimer};
use crate::portrait::{PortraitSource, embed_portrait};
use lopdf::{Document, Object};
use serde::Serialize;
use sheetfill_schema::{
    CALCULATED_FIELDS, PLACEHOLDER_DROPDOWNS, PORTRAIT_FIELDS, STATIC_PUSHBUTTONS,
    TRACKER_CHECKBOXES,
};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    FieldNotFound,
    FieldKindMismatch,
    FieldValueRejected,
    PortraitEmbedFailed,
}

impl WarningCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WarningCode::FieldNotFound => "FIELD_NOT_FOUND",
            WarningCode::FieldKindMismatch => "FIELD_KIND_MISMATCH",
            WarningCode::FieldValueRejected => "FIELD_VALUE_REJECTED",
            WarningCode::PortraitEmbedFailed => "PORTRAIT_EMBED_FAILED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchWarning {
    pub code: WarningCode,
    pub field: String,
    pub message: String,
}

impl PatchWarning {
    pub fn new(code: WarningCode, field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatchReport {
    pub text_filled: usize,
    pub options_added: usize,
    pub checkboxes_set: usize,
    pub portrait_field: Option<String>,
    pub widgets_hidden: usize,
    pub dropdowns_cleared: usize,
    pub scripts_removed: usize,
    pub fields_unlocked: usize,
    pub appearances_written: usize,
    pub off_states_removed: usize,
    pub warnings: Vec<PatchWarning>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutput {
    pub bytes: Vec<u8>,
    pub report: PatchReport,
}

#[derive(Clone)]
pub struct PatchOptions {
    pub portrait_candidates: Vec<String>,
    pub export_label: String,
    pub(crate) debug: Option<DebugLogger>,
    pub(crate) perf: Option<PerfLogger>,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self {
            portrait_candidates: PORTRAIT_FIELDS.iter().map(|s| s.to_string()).collect(),
            export_label: "export".to_string(),
            debug: None,
            perf: None,
        }
    }
}

impl std::fmt::Debug for PatchOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatchOptions")
            .field("portrait_candidates", &self.portrait_candidates)
            .field("export_label", &self.export_label)
            .field("debug", &self.debug.is_some())
            .field("perf", &self.perf.is_some())
            .finish()
    }
}

// Only consulted when lopdf cannot parse the file. Looks at `trailer`
// dictionaries and cross-reference stream dictionaries, never at strings or
// content streams.
pub(crate) fn trailer_declares_encryption(bytes: &[u8]) -> bool {
    trailer_dictionaries(bytes)
        .iter()
        .any(|dict| has_encrypt_entry(dict))
}

fn trailer_dictionaries(bytes: &[u8]) -> Vec<&[u8]> {
    let mut out = Vec::new();
    for pos in find_all(bytes, b"trailer") {
        if let Some(dict) = dictionary_after(&bytes[pos..]) {
            out.push(dict);
        }
    }
    for pos in find_all(bytes, b"/XRef") {
        let Some(header) = rfind(&bytes[..pos], b" obj") else {
            continue;
        };
        if let Some(dict) = dictionary_after(&bytes[header..])
            .filter(|dict| find(dict, b"/XRef").is_some())
        {
            out.push(dict);
        }
    }
    out
}

fn has_encrypt_entry(dict: &[u8]) -> bool {
    const KEY: &[u8] = b"/Encrypt";
    let mut idx = 0;
    while idx < dict.len() {
        match dict[idx] {
            b'(' => idx = skip_literal_string(dict, idx),
            b'/' if dict[idx..].starts_with(KEY) => {
                idx += KEY.len();
                let next = dict[idx..]
                    .iter()
                    .find(|b| !b.is_ascii_whitespace())
                    .copied();
                if matches!(next, Some(b'0'..=b'9' | b'<')) {
                    return true;
                }
            }
            _ => idx += 1,
        }
    }
    false
}

// The balanced `<< ... >>` starting at the first `<<` in `bytes`. Literal
// strings are skipped so a `>>` inside one does not close the dictionary.
fn dictionary_after(bytes: &[u8]) -> Option<&[u8]> {
    let open = find(bytes, b"<<")?;
    let mut depth = 0usize;
    let mut idx = open;
    while idx < bytes.len() {
        match bytes[idx] {
            b'(' => idx = skip_literal_string(bytes, idx),
            b'<' if bytes.get(idx + 1) == Some(&b'<') => {
                depth += 1;
                idx += 2;
            }
            b'>' if bytes.get(idx + 1) == Some(&b'>') => {
                depth = depth.saturating_sub(1);
                idx += 2;
                if depth == 0 {
                    return Some(&bytes[open..idx]);
                }
            }
            _ => idx += 1,
        }
    }
    None
}

fn skip_literal_string(bytes: &[u8], start: usize) -> usize {
    let mut nesting = 0usize;
    let mut idx = start;
    while idx < bytes.len() {
        match bytes[idx] {
            b'\\' => idx += 1,
            b'(' => nesting += 1,
            b')' => {
                nesting = nesting.saturating_sub(1);
                if nesting == 0 {
                    return idx + 1;
                }
            }
            _ => {}
        }
        idx += 1;
    }
    idx
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

fn find_all(haystack: &[u8], needle: &[u8]) -> Vec<usize> {
    haystack
        .windows(needle.len())
        .enumerate()
        .filter(|(_, w)| *w == needle)
        .map(|(pos, _)| pos)
        .collect()
}

// Also the inspector's loader.
pub(crate) fn load_template(bytes: &[u8]) -> Result<Document, SheetFillError> {
    let doc = match Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(_) if trailer_declares_encryption(bytes) => {
            return Err(SheetFillError::TemplateEncrypted);
        }
        Err(err) => return Err(SheetFillError::TemplateUnreadable(err.to_string())),
    };
    if doc.is_encrypted() || doc.trailer.has(b"Encrypt") {
        return Err(SheetFillError::TemplateEncrypted);
    }
    Ok(doc)
}

struct FormSession<'a> {
    doc: Document,
    fields: Vec<FormField>,
    by_name: BTreeMap<String, usize>,
    report: PatchReport,
    options: &'a PatchOptions,
}

impl<'a> FormSession<'a> {
    fn open(template: &[u8], options: &'a PatchOptions) -> Result<Self, SheetFillError> {
        let doc = load_template(template)?;
        let fields = collect_fields(&doc);
        let by_name = fields
            .iter()
            .enumerate()
            .map(|(idx, f)| (f.name.clone(), idx))
            .rev()
            .collect();
        log::debug!("{}: template has {} fields", options.export_label, fields.len());
        Ok(Self {
            doc,
            fields,
            by_name,
            report: PatchReport::default(),
            options,
        })
    }

    fn field(&self, name: &str) -> Option<&FormField> {
        self.by_name.get(name).map(|idx| &self.fields[*idx])
    }

    fn warn(&mut self, warning: PatchWarning) {
        log::warn!(
            "{}: {} `{}`: {}",
            self.options.export_label,
            warning.code.as_str(),
            warning.field,
            warning.message
        );
        if let Some(debug) = &self.options.debug {
            debug.log_warning(&self.options.export_label, &warning);
        }
        self.report.warnings.push(warning);
    }

    fn timer(&self, step: &'static str) -> StepTimer<'a> {
        StepTimer::start(self.options.perf.as_ref(), &self.options.export_label, step)
    }

    fn fill_text(&mut self, map: &FieldMap) {
        let _t = self.timer("fill_text");
        for (name, value) in &map.text_fields {
            let Some(field) = self.field(name).cloned() else {
                self.warn(PatchWarning::new(
                    WarningCode::FieldNotFound,
                    name,
                    "no text or dropdown field with this name",
                ));
                continue;
            };
            match field.kind {
                FieldKind::Text => match self.set_text(&field, value) {
                    Ok(()) => self.report.text_filled += 1,
                    Err(warning) => self.warn(warning),
                },
                FieldKind::Dropdown | FieldKind::OptionList => {
                    if self.select_option(&field, value) {
                        self.report.options_added += 1;
                    }
                    self.report.text_filled += 1;
                }
                other => self.warn(PatchWarning::new(
                    WarningCode::FieldKindMismatch,
                    name,
                    format!("expected a text or dropdown field, found {}", other.as_str()),
                )),
            }
        }
    }

    fn set_text(&mut self, field: &FormField, value: &str) -> Result<(), PatchWarning> {
        let max_len = self
            .doc
            .get_object(field.id)
            .ok()
            .and_then(|o| o.as_dict().ok())
            .and_then(|d| d.get(b"MaxLen").ok())
            .and_then(|m| resolve(&self.doc, m))
            .and_then(|m| m.as_i64().ok());
        if let Some(max) = max_len.filter(|max| value.chars().count() as i64 > *max) {
            return Err(PatchWarning::new(
                WarningCode::FieldValueRejected,
                &field.name,
                format!("value exceeds the field's MaxLen of {max}"),
            ));
        }
        if let Some(dict) = dict_mut(&mut self.doc, field.id) {
            dict.set("V", text_object(value));
        }
        Ok(())
    }

    fn select_option(&mut self, field: &FormField, value: &str) -> bool {
        let options: Vec<Object> = self
            .doc
            .get_object(field.id)
            .ok()
            .and_then(|o| o.as_dict().ok())
            .and_then(|d| d.get(b"Opt").ok())
            .and_then(|o| resolve(&self.doc, o))
            .and_then(|o| o.as_array().ok())
            .cloned()
            .unwrap_or_default();
        let present = options.iter().any(|opt| {
            let texts: Vec<String> = match resolve(&self.doc, opt) {
                Some(Object::Array(pair)) => {
                    pair.iter().filter_map(|p| object_text(&self.doc, p)).collect()
                }
                Some(other) => object_text(&self.doc, other).into_iter().collect(),
                None => Vec::new(),
            };
            texts.iter().any(|t| t == value)
        });
        let Some(dict) = dict_mut(&mut self.doc, field.id) else {
            return false;
        };
        if !present {
            let mut options = options;
            options.push(text_object(value));
            dict.set("Opt", options);
        }
        dict.set("V", text_object(value));
        dict.remove(b"I");
        !present
    }

    fn fill_checkboxes(&mut self, map: &FieldMap) {
        let _t = self.timer("fill_checkboxes");
        for (name, checked) in &map.checkbox_fields {
            let Some(field) = self.field(name).cloned() else {
                self.warn(PatchWarning::new(
                    WarningCode::FieldNotFound,
                    name,
                    "no checkbox with this name",
                ));
                continue;
            };
            if field.kind != FieldKind::Checkbox {
                self.warn(PatchWarning::new(
                    WarningCode::FieldKindMismatch,
                    name,
                    format!("expected a checkbox, found {}", field.kind.as_str()),
                ));
                continue;
            }
            let field_on = field
                .widgets
                .iter()
                .find_map(|w| on_state_name(&self.doc, *w))
                .unwrap_or_else(|| b"Yes".to_vec());
            let widget_states: Vec<Vec<u8>> = field
                .widgets
                .iter()
                .map(|w| on_state_name(&self.doc, *w).unwrap_or_else(|| field_on.clone()))
                .collect();
            let value = if *checked { field_on } else { b"Off".to_vec() };
            if let Some(dict) = dict_mut(&mut self.doc, field.id) {
                dict.set("V", Object::Name(value));
            }
            for (widget, on) in field.widgets.iter().zip(widget_states) {
                let state = if *checked { on } else { b"Off".to_vec() };
                if let Some(dict) = dict_mut(&mut self.doc, *widget) {
                    dict.set("AS", Object::Name(state));
                }
            }
            self.report.checkboxes_set += 1;
        }
    }

    fn embed_portrait(&mut self, portrait: Option<&PortraitSource>) {
        let Some(source) = portrait else {
            return;
        };
        let _t = self.timer("embed_portrait");
        match embed_portrait(
            &mut self.doc,
            &self.fields,
            source,
            &self.options.portrait_candidates,
        ) {
            Ok(field) => {
                log::debug!("{}: portrait bound to `{field}`", self.options.export_label);
                self.report.portrait_field = Some(field);
            }
            Err(err) => self.warn(PatchWarning::new(
                WarningCode::PortraitEmbedFailed,
                "",
                err.to_string(),
            )),
        }
    }

    fn hide_chrome(&mut self) {
        let _t = self.timer("hide_chrome");
        let keep = |name: &str| {
            STATIC_PUSHBUTTONS.contains(&name)
                || self.options.portrait_candidates.iter().any(|c| c == name)
        };
        let widgets: Vec<_> = self
            .fields
            .iter()
            .filter(|f| f.kind == FieldKind::PushButton && !keep(&f.name))
            .flat_map(|f| f.widgets.iter().copied())
            .collect();
        for widget in widgets {
            if hide_widget(&mut self.doc, widget) {
                self.report.widgets_hidden += 1;
            }
        }
    }

    fn hide_trackers(&mut self) {
        let _t = self.timer("hide_trackers");
        for name in TRACKER_CHECKBOXES {
            let Some(field) = self.field(name).cloned() else {
                continue;
            };
            for widget in field.widgets {
                if hide_widget(&mut self.doc, widget) {
                    self.report.widgets_hidden += 1;
                }
            }
        }
    }

    fn clear_placeholders(&mut self) {
        let _t = self.timer("clear_placeholders");
        for name in PLACEHOLDER_DROPDOWNS {
            let Some(field) = self.field(name).cloned() else {
                continue;
            };
            if !matches!(field.kind, FieldKind::Dropdown | FieldKind::OptionList) {
                continue;
            }
            if let Some(dict) = dict_mut(&mut self.doc, field.id) {
                dict.remove(b"V");
                dict.remove(b"I");
                self.report.dropdowns_cleared += 1;
            }
        }
    }

    fn strip_scripts(&mut self) {
        let _t = self.timer("strip_scripts");
        let mut ids: Vec<_> = self
            .fields
            .iter()
            .flat_map(|f| std::iter::once(f.id).chain(f.widgets.iter().copied()))
            .collect();
        ids.sort();
        ids.dedup();
        for id in ids {
            self.report.scripts_removed += strip_scripts(&mut self.doc, id);
        }
        let removed_co =
            acroform_mut(&mut self.doc).is_some_and(|form| form.remove(b"CO").is_some());
        if removed_co {
            self.report.scripts_removed += 1;
        }
    }

    fn unlock_calculated(&mut self) {
        let _t = self.timer("unlock_calculated");
        for name in CALCULATED_FIELDS {
            let Some(idx) = self.by_name.get(name).copied() else {
                continue;
            };
            let field = &mut self.fields[idx];
            if field.flags & FLAG_READ_ONLY == 0 {
                continue;
            }
            field.flags &= !FLAG_READ_ONLY;
            if let Some(dict) = dict_mut(&mut self.doc, field.id) {
                dict.set("Ff", field.flags);
                self.report.fields_unlocked += 1;
            }
        }
    }

    fn regenerate_appearances(&mut self) {
        let _t = self.timer("regenerate_appearances");
        let stats = regenerate_appearances(&mut self.doc, &self.fields);
        self.report.appearances_written = stats.text_widgets + stats.checkbox_widgets;
        if let Some(form) = acroform_mut(&mut self.doc) {
            form.remove(b"NeedAppearances");
        }
    }

    fn remove_off_states(&mut self) {
        let _t = self.timer("remove_off_states");
        self.report.off_states_removed = remove_off_states(&mut self.doc, &self.fields);
    }

    fn serialize(mut self) -> Result<PatchOutput, SheetFillError> {
        let mut bytes = Vec::new();
        {
            let _t = self.timer("serialize");
            self.doc
                .save_to(&mut bytes)
                .map_err(|err| SheetFillError::Serialize(err.to_string()))?;
        }
        if let Some(debug) = &self.options.debug {
            debug.emit_summary(&self.options.export_label, &self.report);
            debug.flush();
        }
        if let Some(perf) = &self.options.perf {
            perf.flush();
        }
        Ok(PatchOutput {
            bytes,
            report: self.report,
        })
    }
}

// Missing fields and portrait problems land in the report, never in Err.
pub fn patch_template(
    template: &[u8],
    map: &FieldMap,
    portrait: Option<&PortraitSource>,
    options: &PatchOptions,
) -> Result<PatchOutput, SheetFillError> {
    let mut session = {
        let _t = StepTimer::start(options.perf.as_ref(), &options.export_label, "load");
        FormSession::open(template, options)?
    };
    session.fill_text(map);
    session.fill_checkboxes(map);
    session.embed_portrait(portrait);
    session.hide_chrome();
    session.hide_trackers();
    session.clear_placeholders();
    session.strip_scripts();
    session.unlock_calculated();
    session.regenerate_appearances();
    session.remove_off_states();
    let output = session.serialize()?;
    log::info!(
        "{}: {} text, {} checkboxes, {} warnings, {} bytes",
        options.export_label,
        output.report.text_filled,
        output.report.checkboxes_set,
        output.report.warnings.len(),
        output.bytes.len()
    );
    Ok(output)
}
