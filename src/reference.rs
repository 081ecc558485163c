use std::collections::BTreeMap;

const BUNDLED_REFERENCE: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/assets/equipment_categories.md"
));

// Caller-owned. Empty is valid: consumers fall back to bare names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryNotes {
    by_category: BTreeMap<String, String>,
}

impl CategoryNotes {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn bundled() -> Self {
        Self::from_reference_text(BUNDLED_REFERENCE)
    }

    pub fn from_reference_text(text: &str) -> Self {
        let mut by_category = BTreeMap::new();
        let mut heading: Option<String> = None;
        let mut prose = String::new();
        for line in text.lines() {
            let trimmed = line.trim();
            if let Some(rest) = trimmed.strip_prefix("## ") {
                flush_section(&mut by_category, heading.take(), &prose);
                prose.clear();
                heading = Some(rest.trim().to_string());
                continue;
            }
            if trimmed.starts_with('#') {
                flush_section(&mut by_category, heading.take(), &prose);
                prose.clear();
                continue;
            }
            if heading.is_some() && !trimmed.is_empty() {
                if !prose.is_empty() {
                    prose.push(' ');
                }
                prose.push_str(trimmed);
            }
        }
        flush_section(&mut by_category, heading, &prose);
        Self { by_category }
    }

    pub fn len(&self) -> usize {
        self.by_category.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_category.is_empty()
    }

    pub fn blurb(&self, category: &str) -> Option<&str> {
        let key = category.trim().to_ascii_lowercase();
        if key.is_empty() {
            return None;
        }
        if let Some(found) = self.by_category.get(&key) {
            return Some(found.as_str());
        }
        self.by_category
            .iter()
            .filter(|(known, _)| key.contains(known.as_str()))
            .max_by_key(|(known, _)| known.len())
            .map(|(_, blurb)| blurb.as_str())
    }
}

fn flush_section(out: &mut BTreeMap<String, String>, heading: Option<String>, prose: &str) {
    let Some(heading) = heading else {
        return;
    };
    let sentence = first_sentence(prose);
    if heading.is_empty() || sentence.is_empty() {
        return;
    }
    out.insert(heading.to_ascii_lowercase(), sentence);
}

fn first_sentence(prose: &str) -> String {
    let bytes = prose.as_bytes();
    for (idx, b) in bytes.iter().enumerate() {
        if *b == b'.' && bytes.get(idx + 1).is_none_or(|next| next.is_ascii_whitespace()) {
            return prose[..=idx].trim().to_string();
        }
    }
    prose.trim().to_string()
}
