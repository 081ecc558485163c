use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use serde::Serialize;
use std::collections::BTreeSet;

pub const FLAG_READ_ONLY: i64 = 1;
pub const FLAG_MULTILINE: i64 = 1 << 12;
pub const FLAG_RADIO: i64 = 1 << 15;
pub const FLAG_PUSHBUTTON: i64 = 1 << 16;
pub const FLAG_COMBO: i64 = 1 << 17;

const MAX_FIELD_DEPTH: usize = 32;
const MAX_REF_HOPS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Text,
    Checkbox,
    RadioGroup,
    PushButton,
    Dropdown,
    OptionList,
    Signature,
    Unknown,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Checkbox => "checkbox",
            FieldKind::RadioGroup => "radio_group",
            FieldKind::PushButton => "push_button",
            FieldKind::Dropdown => "dropdown",
            FieldKind::OptionList => "option_list",
            FieldKind::Signature => "signature",
            FieldKind::Unknown => "unknown",
        }
    }

    fn classify(field_type: Option<&[u8]>, flags: i64) -> Self {
        match field_type {
            Some(b"Tx") => FieldKind::Text,
            Some(b"Btn") if flags & FLAG_PUSHBUTTON != 0 => FieldKind::PushButton,
            Some(b"Btn") if flags & FLAG_RADIO != 0 => FieldKind::RadioGroup,
            Some(b"Btn") => FieldKind::Checkbox,
            Some(b"Ch") if flags & FLAG_COMBO != 0 => FieldKind::Dropdown,
            Some(b"Ch") => FieldKind::OptionList,
            Some(b"Sig") => FieldKind::Signature,
            _ => FieldKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    pub id: ObjectId,
    pub name: String,
    pub kind: FieldKind,
    pub flags: i64,
    pub widgets: Vec<ObjectId>,
}

pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    let mut current = obj;
    for _ in 0..MAX_REF_HOPS {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

pub fn resolve_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    resolve(doc, obj)?.as_dict().ok()
}

fn dict_entry<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    resolve(doc, dict.get(key).ok()?)
}

pub fn number(doc: &Document, obj: &Object) -> Option<f32> {
    match resolve(doc, obj)? {
        Object::Integer(v) => Some(*v as f32),
        Object::Real(v) => Some(*v),
        _ => None,
    }
}

pub fn catalog_id(doc: &Document) -> Option<ObjectId> {
    doc.trailer.get(b"Root").ok()?.as_reference().ok()
}

pub fn acroform(doc: &Document) -> Option<&Dictionary> {
    let catalog = doc.get_object(catalog_id(doc)?).ok()?.as_dict().ok()?;
    dict_entry(doc, catalog, b"AcroForm")?.as_dict().ok()
}

pub fn acroform_mut(doc: &mut Document) -> Option<&mut Dictionary> {
    let catalog_id = catalog_id(doc)?;
    let indirect = doc
        .get_object(catalog_id)
        .ok()?
        .as_dict()
        .ok()?
        .get(b"AcroForm")
        .ok()?
        .as_reference()
        .ok();
    match indirect {
        Some(id) => doc.get_object_mut(id).ok()?.as_dict_mut().ok(),
        None => doc
            .get_object_mut(catalog_id)
            .ok()?
            .as_dict_mut()
            .ok()?
            .get_mut(b"AcroForm")
            .ok()?
            .as_dict_mut()
            .ok(),
    }
}

pub fn dict_mut(doc: &mut Document, id: ObjectId) -> Option<&mut Dictionary> {
    doc.get_object_mut(id).ok()?.as_dict_mut().ok()
}

// UTF-16BE with BOM, otherwise single-byte.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|b| *b as char).collect()
}

pub fn encode_text_string(text: &str) -> Vec<u8> {
    if text.chars().all(|c| (c as u32) < 0x100) {
        return text.chars().map(|c| c as u32 as u8).collect();
    }
    let mut out = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

pub fn text_object(text: &str) -> Object {
    Object::String(encode_text_string(text), StringFormat::Literal)
}

pub fn object_text(doc: &Document, obj: &Object) -> Option<String> {
    match resolve(doc, obj)? {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        _ => None,
    }
}

pub fn collect_fields(doc: &Document) -> Vec<FormField> {
    let mut out = Vec::new();
    let Some(form) = acroform(doc) else {
        return out;
    };
    let Some(Object::Array(roots)) = dict_entry(doc, form, b"Fields") else {
        return out;
    };
    let mut visited = BTreeSet::new();
    for root in roots {
        if let Ok(id) = root.as_reference() {
            walk_field(doc, id, None, None, 0, 0, &mut visited, &mut out);
        }
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn walk_field(
    doc: &Document,
    id: ObjectId,
    parent_name: Option<&str>,
    inherited_type: Option<&[u8]>,
    inherited_flags: i64,
    depth: usize,
    visited: &mut BTreeSet<ObjectId>,
    out: &mut Vec<FormField>,
) {
    if depth > MAX_FIELD_DEPTH || !visited.insert(id) {
        return;
    }
    let Some(dict) = doc.get_object(id).ok().and_then(|o| o.as_dict().ok()) else {
        return;
    };

    let partial = dict.get(b"T").ok().and_then(|t| object_text(doc, t));
    let name = match (parent_name, partial) {
        (Some(parent), Some(own)) => format!("{parent}.{own}"),
        (None, Some(own)) => own,
        (Some(parent), None) => parent.to_string(),
        (None, None) => String::new(),
    };
    let field_type = match dict_entry(doc, dict, b"FT") {
        Some(Object::Name(ft)) => Some(ft.as_slice()),
        _ => inherited_type,
    };
    let flags = match dict_entry(doc, dict, b"Ff") {
        Some(Object::Integer(ff)) => *ff,
        _ => inherited_flags,
    };

    let kids: Vec<ObjectId> = match dict_entry(doc, dict, b"Kids") {
        Some(Object::Array(kids)) => kids.iter().filter_map(|k| k.as_reference().ok()).collect(),
        _ => Vec::new(),
    };
    let (field_kids, widget_kids): (Vec<ObjectId>, Vec<ObjectId>) =
        kids.into_iter().partition(|kid| {
            doc.get_object(*kid)
                .ok()
                .and_then(|o| o.as_dict().ok())
                .is_some_and(|d| d.has(b"T"))
        });

    for kid in &field_kids {
        walk_field(doc, *kid, Some(&name), field_type, flags, depth + 1, visited, out);
    }
    if !field_kids.is_empty() && widget_kids.is_empty() {
        return;
    }
    if name.is_empty() {
        return;
    }
    let widgets = if widget_kids.is_empty() {
        vec![id]
    } else {
        widget_kids
    };
    out.push(FormField {
        id,
        name,
        kind: FieldKind::classify(field_type, flags),
        flags,
        widgets,
    });
}

pub fn widget_rect(doc: &Document, widget: ObjectId) -> Option<[f32; 4]> {
    let dict = doc.get_object(widget).ok()?.as_dict().ok()?;
    let Some(Object::Array(items)) = dict_entry(doc, dict, b"Rect") else {
        return None;
    };
    if items.len() != 4 {
        return None;
    }
    let mut rect = [0.0f32; 4];
    for (slot, item) in rect.iter_mut().zip(items) {
        *slot = number(doc, item)?;
    }
    let [x1, y1, x2, y2] = rect;
    Some([x1.min(x2), y1.min(y2), x1.max(x2), y1.max(y2)])
}

pub fn widget_is_hidden(doc: &Document, widget: ObjectId) -> bool {
    match widget_rect(doc, widget) {
        Some([x1, y1, x2, y2]) => (x2 - x1) <= 0.0 || (y2 - y1) <= 0.0,
        None => true,
    }
}

// Zero rectangle and no appearance. Flattening would bake the last-drawn
// state into the page instead.
pub fn hide_widget(doc: &mut Document, widget: ObjectId) -> bool {
    let Some(dict) = dict_mut(doc, widget) else {
        return false;
    };
    dict.set("Rect", vec![Object::Integer(0); 4]);
    dict.remove(b"AP");
    true
}

pub fn on_state_name(doc: &Document, widget: ObjectId) -> Option<Vec<u8>> {
    let dict = doc.get_object(widget).ok()?.as_dict().ok()?;
    let ap = dict_entry(doc, dict, b"AP")?.as_dict().ok()?;
    let normal = dict_entry(doc, ap, b"N")?.as_dict().ok()?;
    normal
        .iter()
        .map(|(key, _)| key)
        .find(|key| key.as_slice() != b"Off")
        .cloned()
}

fn is_javascript_action(doc: &Document, action: &Object) -> bool {
    resolve_dict(doc, action)
        .and_then(|a| a.get(b"S").ok())
        .and_then(|s| s.as_name().ok())
        .is_some_and(|s| s == b"JavaScript")
}

pub fn strip_scripts(doc: &mut Document, id: ObjectId) -> usize {
    let js_action = doc
        .get_object(id)
        .ok()
        .and_then(|o| o.as_dict().ok())
        .and_then(|d| d.get(b"A").ok())
        .is_some_and(|a| is_javascript_action(doc, a));
    let Some(dict) = dict_mut(doc, id) else {
        return 0;
    };
    let mut removed = usize::from(dict.remove(b"AA").is_some());
    if js_action && dict.remove(b"A").is_some() {
        removed += 1;
    }
    removed
}

pub fn remove_off_appearance(doc: &mut Document, widget: ObjectId) -> bool {
    let Some(widget_dict) = doc.get_object(widget).ok().and_then(|o| o.as_dict().ok()) else {
        return false;
    };
    let ap_ref = match widget_dict.get(b"AP") {
        Ok(Object::Reference(id)) => Some(*id),
        Ok(Object::Dictionary(_)) => None,
        _ => return false,
    };
    let state_refs: Vec<ObjectId> = dict_entry(doc, widget_dict, b"AP")
        .and_then(|ap| ap.as_dict().ok())
        .map(|ap| {
            [b"N".as_slice(), b"D".as_slice()]
                .iter()
                .filter_map(|key| ap.get(key).ok()?.as_reference().ok())
                .collect()
        })
        .unwrap_or_default();

    let mut removed = false;
    for id in state_refs {
        if let Some(states) = dict_mut(doc, id) {
            removed |= states.remove(b"Off").is_some();
        }
    }

    let ap = match ap_ref {
        Some(id) => dict_mut(doc, id),
        None => dict_mut(doc, widget)
            .and_then(|w| w.get_mut(b"AP").ok())
            .and_then(|o| o.as_dict_mut().ok()),
    };
    if let Some(ap) = ap {
        for key in [b"N".as_slice(), b"D".as_slice()] {
            if let Ok(Object::Dictionary(states)) = ap.get_mut(key) {
                removed |= states.remove(b"Off").is_some();
            }
        }
    }
    removed
}

#[cfg(test)]
pub fn has_off_appearance(doc: &Document, widget: ObjectId) -> bool {
    let Some(dict) = doc.get_object(widget).ok().and_then(|o| o.as_dict().ok()) else {
        return false;
    };
    let Some(ap) = dict_entry(doc, dict, b"AP").and_then(|ap| ap.as_dict().ok()) else {
        return false;
    };
    [b"N".as_slice(), b"D".as_slice()].iter().any(|key| {
        dict_entry(doc, ap, key)
            .and_then(|states| states.as_dict().ok())
            .is_some_and(|states| states.has(b"Off"))
    })
}
