use crate::acroform::{
    FLAG_MULTILINE, FieldKind, FormField, acroform, dict_mut, object_text, on_state_name,
    remove_off_appearance, resolve, resolve_dict, widget_is_hidden, widget_rect,
};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};

// Half an em per glyph; real metrics only matter once a reader edits the field.
const CHAR_WIDTH_EM: f32 = 0.5;
const PADDING: f32 = 2.0;
const LEADING: f32 = 1.15;
const MIN_FONT_SIZE: f32 = 4.0;
const MAX_AUTO_FONT_SIZE: f32 = 12.0;
const MAX_PARENT_HOPS: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub struct DefaultAppearance {
    pub font: String,
    // zero: auto-size
    pub size: f32,
    pub color: String,
}

impl Default for DefaultAppearance {
    fn default() -> Self {
        Self {
            font: "Helv".to_string(),
            size: 0.0,
            color: "0 g".to_string(),
        }
    }
}

pub fn parse_default_appearance(da: &str) -> DefaultAppearance {
    let mut out = DefaultAppearance::default();
    let mut operands: Vec<&str> = Vec::new();
    for token in da.split_whitespace() {
        match token {
            "Tf" => {
                if let [.., font, size] = operands.as_slice() {
                    out.font = font.trim_start_matches('/').to_string();
                    out.size = size.parse().unwrap_or(0.0);
                }
                operands.clear();
            }
            "g" | "rg" | "k" => {
                let mut color = operands.join(" ");
                color.push(' ');
                color.push_str(token);
                out.color = color;
                operands.clear();
            }
            _ if token.chars().all(|c| c.is_ascii_alphabetic()) => operands.clear(),
            _ => operands.push(token),
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadding {
    Left,
    Center,
    Right,
}

impl Quadding {
    fn from_code(code: i64) -> Self {
        match code {
            1 => Quadding::Center,
            2 => Quadding::Right,
            _ => Quadding::Left,
        }
    }
}

fn inherited<'a>(doc: &'a Document, id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = doc.get_object(id).ok()?.as_dict().ok()?;
    for _ in 0..MAX_PARENT_HOPS {
        if let Ok(value) = current.get(key) {
            return resolve(doc, value);
        }
        current = resolve_dict(doc, current.get(b"Parent").ok()?)?;
    }
    None
}

fn field_default_appearance(doc: &Document, widget: ObjectId) -> DefaultAppearance {
    let da = inherited(doc, widget, b"DA")
        .and_then(|da| object_text(doc, da))
        .or_else(|| {
            let form = acroform(doc)?;
            object_text(doc, form.get(b"DA").ok()?)
        });
    da.map(|da| parse_default_appearance(&da)).unwrap_or_default()
}

fn field_quadding(doc: &Document, widget: ObjectId) -> Quadding {
    let code = inherited(doc, widget, b"Q")
        .and_then(|q| q.as_i64().ok())
        .or_else(|| acroform(doc)?.get(b"Q").ok()?.as_i64().ok())
        .unwrap_or(0);
    Quadding::from_code(code)
}

pub fn field_value_text(doc: &Document, field: &FormField) -> String {
    let Some(value) = inherited(doc, field.id, b"V") else {
        return String::new();
    };
    match value {
        Object::Array(items) => items
            .iter()
            .filter_map(|item| object_text(doc, item))
            .collect::<Vec<_>>()
            .join(", "),
        other => object_text(doc, other).unwrap_or_default(),
    }
}

pub fn escape_pdf_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            '\r' | '\n' | '\t' => out.push(' '),
            c if (c as u32) < 0x20 => {}
            c if (c as u32) < 0x80 => out.push(c),
            c if (c as u32) < 0x100 => out.push_str(&format!("\\{:03o}", c as u32)),
            _ => out.push('?'),
        }
    }
    out
}

fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * CHAR_WIDTH_EM
}

pub fn wrap_lines(text: &str, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{line} {word}")
            };
            if !line.is_empty() && text_width(&candidate, size) > max_width {
                lines.push(std::mem::take(&mut line));
                line = word.to_string();
            } else {
                line = candidate;
            }
        }
        lines.push(line);
    }
    lines
}

fn single_line_size(text: &str, da_size: f32, width: f32, height: f32) -> f32 {
    if da_size > 0.0 {
        return da_size;
    }
    let mut size = ((height - 2.0 * PADDING) * 0.75).clamp(MIN_FONT_SIZE, MAX_AUTO_FONT_SIZE);
    let unit = text_width(text, 1.0);
    if unit > 0.0 {
        size = size.min((width - 2.0 * PADDING) / unit);
    }
    size.max(MIN_FONT_SIZE)
}

fn multiline_layout(text: &str, da_size: f32, width: f32, height: f32) -> (f32, Vec<String>) {
    let inner_w = width - 2.0 * PADDING;
    if da_size > 0.0 {
        return (da_size, wrap_lines(text, da_size, inner_w));
    }
    let mut size = MAX_AUTO_FONT_SIZE;
    loop {
        let lines = wrap_lines(text, size, inner_w);
        let fits = lines.len() as f32 * size * LEADING <= height - 2.0 * PADDING;
        if fits || size <= MIN_FONT_SIZE {
            return (size, lines);
        }
        size -= 0.5;
    }
}

fn line_x(line: &str, size: f32, width: f32, quadding: Quadding) -> f32 {
    let used = text_width(line, size);
    match quadding {
        Quadding::Left => PADDING,
        Quadding::Center => ((width - used) / 2.0).max(PADDING),
        Quadding::Right => (width - PADDING - used).max(PADDING),
    }
}

pub fn text_content(
    text: &str,
    da: &DefaultAppearance,
    quadding: Quadding,
    multiline: bool,
    width: f32,
    height: f32,
) -> String {
    let mut out = String::from("/Tx BMC\nq\n");
    out.push_str(&format!(
        "{PADDING} {PADDING} {:.2} {:.2} re W n\n",
        (width - 2.0 * PADDING).max(0.0),
        (height - 2.0 * PADDING).max(0.0)
    ));
    if !text.is_empty() {
        let (size, lines) = if multiline {
            multiline_layout(text, da.size, width, height)
        } else {
            let line = text.replace(['\r', '\n'], " ");
            (single_line_size(&line, da.size, width, height), vec![line])
        };
        out.push_str(&format!("BT\n/{} {size:.2} Tf\n{}\n", da.font, da.color));
        for (i, line) in lines.iter().enumerate() {
            let y = if multiline {
                height - PADDING - size - i as f32 * size * LEADING
            } else {
                (height - size) / 2.0 + size * 0.22
            };
            let x = line_x(line, size, width, quadding);
            out.push_str(&format!(
                "1 0 0 1 {x:.2} {y:.2} Tm\n({}) Tj\n",
                escape_pdf_text(line)
            ));
        }
        out.push_str("ET\n");
    }
    out.push_str("Q\nEMC\n");
    out
}

fn check_content(width: f32, height: f32) -> String {
    let s = width.min(height);
    let (ox, oy) = ((width - s) / 2.0, (height - s) / 2.0);
    format!(
        "q 0 g {lw:.2} w {x1:.2} {y1:.2} m {x2:.2} {y2:.2} l {x3:.2} {y3:.2} l S Q\n",
        lw = (s * 0.1).max(0.5),
        x1 = ox + s * 0.2,
        y1 = oy + s * 0.5,
        x2 = ox + s * 0.42,
        y2 = oy + s * 0.25,
        x3 = ox + s * 0.8,
        y3 = oy + s * 0.78,
    )
}

fn off_content(width: f32, height: f32) -> String {
    format!(
        "q 0 G 0.75 w 0.38 0.38 {:.2} {:.2} re S Q\n",
        (width - 0.75).max(0.0),
        (height - 0.75).max(0.0)
    )
}

pub struct AppearanceWriter {
    fallback_font: Option<ObjectId>,
}

impl Default for AppearanceWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl AppearanceWriter {
    pub fn new() -> Self {
        Self { fallback_font: None }
    }

    fn font_reference(&mut self, doc: &mut Document, name: &str) -> Object {
        let from_dr = acroform(doc)
            .and_then(|form| resolve_dict(doc, form.get(b"DR").ok()?))
            .and_then(|dr| resolve_dict(doc, dr.get(b"Font").ok()?))
            .and_then(|fonts| fonts.get(name.as_bytes()).ok())
            .cloned();
        if let Some(font) = from_dr {
            return font;
        }
        let id = *self.fallback_font.get_or_insert_with(|| {
            doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            })
        });
        Object::Reference(id)
    }

    fn form_xobject(
        &mut self,
        doc: &mut Document,
        width: f32,
        height: f32,
        resources: Dictionary,
        content: String,
    ) -> ObjectId {
        doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), Object::Real(width), Object::Real(height)],
                "Resources" => resources,
            },
            content.into_bytes(),
        ))
    }

    pub fn write_text_field(&mut self, doc: &mut Document, field: &FormField) -> usize {
        let value = field_value_text(doc, field);
        let multiline = field.kind == FieldKind::Text && field.flags & FLAG_MULTILINE != 0;
        let mut written = 0;
        for widget in &field.widgets {
            if widget_is_hidden(doc, *widget) {
                continue;
            }
            let Some([x1, y1, x2, y2]) = widget_rect(doc, *widget) else {
                continue;
            };
            let (width, height) = (x2 - x1, y2 - y1);
            let da = field_default_appearance(doc, *widget);
            let quadding = field_quadding(doc, *widget);
            let content = text_content(&value, &da, quadding, multiline, width, height);
            let font = self.font_reference(doc, &da.font);
            let mut fonts = Dictionary::new();
            fonts.set(da.font.as_bytes().to_vec(), font);
            let face = self.form_xobject(doc, width, height, dictionary! { "Font" => fonts }, content);
            if let Some(dict) = dict_mut(doc, *widget) {
                dict.set("AP", dictionary! { "N" => face });
                written += 1;
            }
        }
        written
    }

    pub fn write_checkbox(&mut self, doc: &mut Document, field: &FormField) -> usize {
        let mut written = 0;
        for widget in &field.widgets {
            if widget_is_hidden(doc, *widget) {
                continue;
            }
            let Some([x1, y1, x2, y2]) = widget_rect(doc, *widget) else {
                continue;
            };
            let (width, height) = (x2 - x1, y2 - y1);
            let on_name = on_state_name(doc, *widget).unwrap_or_else(|| b"Yes".to_vec());
            let existing_on = existing_state(doc, *widget, &on_name);
            let on = match existing_on {
                Some(on) => on,
                None => Object::Reference(self.form_xobject(
                    doc,
                    width,
                    height,
                    Dictionary::new(),
                    check_content(width, height),
                )),
            };
            let off = self.form_xobject(doc, width, height, Dictionary::new(), off_content(width, height));
            let mut normal = Dictionary::new();
            normal.set(on_name.clone(), on.clone());
            normal.set("Off", off);
            let mut down = Dictionary::new();
            down.set(on_name, on);
            down.set("Off", off);
            if let Some(dict) = dict_mut(doc, *widget) {
                dict.set("AP", dictionary! { "N" => normal, "D" => down });
                written += 1;
            }
        }
        written
    }
}

fn existing_state(doc: &Document, widget: ObjectId, state: &[u8]) -> Option<Object> {
    let dict = doc.get_object(widget).ok()?.as_dict().ok()?;
    let ap = resolve_dict(doc, dict.get(b"AP").ok()?)?;
    let normal = resolve_dict(doc, ap.get(b"N").ok()?)?;
    normal.get(state).ok().cloned()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppearanceStats {
    pub text_widgets: usize,
    pub checkbox_widgets: usize,
}

pub fn regenerate_appearances(doc: &mut Document, fields: &[FormField]) -> AppearanceStats {
    let mut writer = AppearanceWriter::new();
    let mut stats = AppearanceStats::default();
    for field in fields {
        match field.kind {
            FieldKind::Text | FieldKind::Dropdown => {
                stats.text_widgets += writer.write_text_field(doc, field);
            }
            FieldKind::Checkbox => {
                stats.checkbox_widgets += writer.write_checkbox(doc, field);
            }
            _ => {}
        }
    }
    stats
}

// Must run after regenerate_appearances.
pub fn remove_off_states(doc: &mut Document, fields: &[FormField]) -> usize {
    fields
        .iter()
        .filter(|f| f.kind == FieldKind::Checkbox)
        .flat_map(|f| f.widgets.iter())
        .filter(|w| remove_off_appearance(doc, **w))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acroform::{collect_fields, has_off_appearance, text_object};

    fn any_off_state(doc: &Document, fields: &[FormField]) -> bool {
        fields
            .iter()
            .filter(|f| f.kind == FieldKind::Checkbox)
            .flat_map(|f| f.widgets.iter())
            .any(|w| has_off_appearance(doc, *w))
    }
    use crate::testutil::{FixtureField, FixtureKind, build_form_document};

    fn normal_stream(doc: &Document, widget: ObjectId) -> String {
        let id = doc
            .get_object(widget)
            .and_then(Object::as_dict)
            .and_then(|d| d.get(b"AP"))
            .and_then(Object::as_dict)
            .and_then(|ap| ap.get(b"N"))
            .and_then(Object::as_reference)
            .expect("normal appearance");
        let stream = doc.get_object(id).and_then(Object::as_stream).expect("stream");
        String::from_utf8_lossy(&stream.content).into_owned()
    }

    #[test]
    fn default_appearance_parses_font_size_and_color() {
        let da = parse_default_appearance("/HeBo 9 Tf 0.2 0.2 0.2 rg");
        assert_eq!(da.font, "HeBo");
        assert_eq!(da.size, 9.0);
        assert_eq!(da.color, "0.2 0.2 0.2 rg");
        assert_eq!(parse_default_appearance(""), DefaultAppearance::default());
    }

    #[test]
    fn escape_handles_delimiters_and_latin1() {
        assert_eq!(escape_pdf_text("a(b)\\c"), "a\\(b\\)\\\\c");
        assert_eq!(escape_pdf_text("é"), "\\351");
        assert_eq!(escape_pdf_text("Ω"), "?");
    }

    #[test]
    fn wrap_breaks_on_words_and_newlines() {
        let lines = wrap_lines("one two three\nfour", 10.0, 50.0);
        assert_eq!(lines, vec!["one two", "three", "four"]);
    }

    #[test]
    fn text_content_is_marked_and_aligned() {
        let da = parse_default_appearance("/Helv 10 Tf 0 g");
        let left = text_content("+3", &da, Quadding::Left, false, 40.0, 20.0);
        assert!(left.starts_with("/Tx BMC\nq\n"));
        assert!(left.ends_with("Q\nEMC\n"));
        assert!(left.contains("/Helv 10.00 Tf"));
        assert!(left.contains("1 0 0 1 2.00 7.20 Tm\n(+3) Tj"));
        let centered = text_content("+3", &da, Quadding::Center, false, 40.0, 20.0);
        assert!(centered.contains("1 0 0 1 15.00 7.20 Tm"));
        let empty = text_content("", &da, Quadding::Left, false, 40.0, 20.0);
        assert!(!empty.contains("BT"));
    }

    #[test]
    fn auto_size_shrinks_long_single_lines() {
        let da = DefaultAppearance::default();
        let content = text_content(&"x".repeat(40), &da, Quadding::Left, false, 84.0, 20.0);
        assert!(content.contains("/Helv 4.00 Tf"));
    }

    #[test]
    fn text_fields_get_fresh_appearance_from_value() {
        let mut doc = build_form_document(&[FixtureField::new("STRmod", FixtureKind::Text)]);
        let field = collect_fields(&doc).remove(0);
        doc.get_object_mut(field.id)
            .and_then(Object::as_dict_mut)
            .expect("field")
            .set("V", text_object("+3"));
        let stats = regenerate_appearances(&mut doc, std::slice::from_ref(&field));
        assert_eq!(stats.text_widgets, 1);
        assert!(normal_stream(&doc, field.widgets[0]).contains("(+3) Tj"));
    }

    #[test]
    fn checkbox_regeneration_adds_off_then_removal_strips_it() {
        let mut doc = build_form_document(&[FixtureField::new("Check Box 11", FixtureKind::Checkbox)]);
        let fields = collect_fields(&doc);
        assert!(!any_off_state(&doc, &fields));
        let stats = regenerate_appearances(&mut doc, &fields);
        assert_eq!(stats.checkbox_widgets, 1);
        assert!(any_off_state(&doc, &fields));
        assert_eq!(remove_off_states(&mut doc, &fields), 1);
        assert!(!any_off_state(&doc, &fields));
        assert_eq!(on_state_name(&doc, fields[0].widgets[0]), Some(b"Yes".to_vec()));
    }
}
