use std::collections::BTreeSet;

use crate::character::{CharacterRecord, ClassEntry, InventoryItem};
use crate::reference::CategoryNotes;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetText {
    pub class_level: String,
    pub race: String,
    pub background: String,
    pub hit_dice: String,
    pub features: String,
    pub species_traits: String,
    pub feats: String,
    pub proficiencies: String,
    pub equipment: String,
    pub attacks: String,
    pub appearance: String,
}

pub fn sheet_text(record: &CharacterRecord, notes: &CategoryNotes) -> SheetText {
    SheetText {
        class_level: class_level(&record.classes),
        race: race(record),
        background: record.background.name.trim().to_string(),
        hit_dice: hit_dice(&record.classes),
        features: features(record),
        species_traits: species_traits(record).join("\n"),
        feats: feat_lines(record).join("\n"),
        proficiencies: proficiency_listing(record),
        equipment: equipment(&record.inventory),
        attacks: attacks(&record.inventory, notes),
        appearance: appearance_summary(record),
    }
}

// "Fighter 3 (Champion) / Wizard 2"
pub fn class_level(classes: &[ClassEntry]) -> String {
    classes
        .iter()
        .filter(|c| !c.name.trim().is_empty())
        .map(|c| {
            let mut out = format!("{} {}", c.name.trim(), c.effective_level());
            if let Some(sub) = c.subclass.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                out.push_str(&format!(" ({sub})"));
            }
            out
        })
        .collect::<Vec<_>>()
        .join(" / ")
}

pub fn race(record: &CharacterRecord) -> String {
    let name = record.race.name.trim();
    match record
        .race
        .subrace
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        Some(sub) if sub.to_ascii_lowercase().ends_with(&name.to_ascii_lowercase()) => {
            sub.to_string()
        }
        Some(sub) => format!("{sub} {name}"),
        None => name.to_string(),
    }
}

// "3d10, 2d6"
pub fn hit_dice(classes: &[ClassEntry]) -> String {
    classes
        .iter()
        .filter(|c| !c.name.trim().is_empty() || c.hit_die.is_some())
        .map(|c| {
            let die = c
                .hit_die
                .filter(|d| *d > 0)
                .unwrap_or_else(|| crate::derived::class_hit_die(&c.name));
            format!("{}d{}", c.effective_level(), die)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn species_traits(record: &CharacterRecord) -> Vec<String> {
    let features = &record.features;
    let mut lines = Vec::new();
    if let Some(range) = features.darkvision.filter(|r| *r > 0) {
        lines.push(format!("Darkvision {range} ft."));
    }
    let resistances: Vec<&str> = features
        .resistances
        .iter()
        .map(|r| r.trim())
        .filter(|r| !r.is_empty())
        .collect();
    if !resistances.is_empty() {
        lines.push(format!("Resistances: {}", resistances.join(", ")));
    }
    for t in &features.traits {
        if let Some(line) = named_line(&t.name, &t.description) {
            lines.push(line);
        }
    }
    lines
}

fn feat_lines(record: &CharacterRecord) -> Vec<String> {
    record
        .feats
        .iter()
        .filter_map(|f| named_line(&f.name, &f.description))
        .collect()
}

fn named_line(name: &str, description: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let description = description.trim();
    if description.is_empty() {
        Some(name.to_string())
    } else {
        Some(format!("{name}: {description}"))
    }
}

pub fn features(record: &CharacterRecord) -> String {
    let mut lines = species_traits(record);
    lines.extend(feat_lines(record).into_iter().map(|l| format!("Feat - {l}")));
    lines.join("\n")
}

pub fn proficiency_listing(record: &CharacterRecord) -> String {
    let profs = &record.proficiencies;
    let opts = &record.optional_proficiencies;
    let chosen_tools = opts.sources().flat_map(|s| s.tools.selected.iter());
    let chosen_languages = opts.sources().flat_map(|s| s.languages.selected.iter());

    let groups = [
        ("Armor", dedup_ci(profs.armor.iter())),
        ("Weapons", dedup_ci(profs.weapons.iter())),
        ("Tools", dedup_ci(profs.tools.iter().chain(chosen_tools))),
        (
            "Languages",
            dedup_ci(profs.languages.iter().chain(chosen_languages)),
        ),
    ];
    groups
        .iter()
        .filter(|(_, items)| !items.is_empty())
        .map(|(label, items)| format!("{label}: {}", items.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

fn dedup_ci<'a>(items: impl Iterator<Item = &'a String>) -> Vec<&'a str> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for item in items {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_ascii_lowercase()) {
            out.push(trimmed);
        }
    }
    out
}

pub fn equipment(inventory: &[InventoryItem]) -> String {
    inventory
        .iter()
        .filter(|i| !i.name.trim().is_empty())
        .map(|i| {
            if i.quantity == 1 {
                i.name.trim().to_string()
            } else {
                format!("{} (x{})", i.name.trim(), i.quantity)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn attacks(inventory: &[InventoryItem], notes: &CategoryNotes) -> String {
    inventory
        .iter()
        .filter(|i| !i.name.trim().is_empty())
        .filter_map(|i| {
            let category = i.category.as_deref().map(str::trim)?;
            if !category.to_ascii_lowercase().contains("weapon") {
                return None;
            }
            let head = format!("{} ({})", i.name.trim(), category);
            Some(match notes.blurb(category) {
                Some(blurb) => format!("{head}: {blurb}"),
                None => head,
            })
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn appearance_summary(record: &CharacterRecord) -> String {
    let a = &record.appearance;
    [
        ("Age", &a.age),
        ("Height", &a.height),
        ("Weight", &a.weight),
        ("Eyes", &a.eyes),
        ("Skin", &a.skin),
        ("Hair", &a.hair),
    ]
    .iter()
    .filter(|(_, v)| !v.trim().is_empty())
    .map(|(label, v)| format!("{label}: {}", v.trim()))
    .collect::<Vec<_>>()
    .join(", ")
}
