use std::collections::BTreeMap;

use serde::Serialize;
use sheetfill_schema::SlotKind;

use crate::character::{Ability, CharacterRecord};
use crate::derived::{DerivedValues, Skill};
use crate::schema::SchemaTag;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldMap {
    pub text_fields: BTreeMap<String, String>,
    pub checkbox_fields: BTreeMap<String, bool>,
}

impl FieldMap {
    pub fn len(&self) -> usize {
        self.text_fields.len() + self.checkbox_fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text_fields.is_empty() && self.checkbox_fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotValue {
    Text(String),
    Check(bool),
}

impl SlotValue {
    fn kind(&self) -> SlotKind {
        match self {
            SlotValue::Text(_) => SlotKind::Text,
            SlotValue::Check(_) => SlotKind::Check,
        }
    }
}

pub fn signed(value: i32) -> String {
    if value >= 0 {
        format!("+{value}")
    } else {
        value.to_string()
    }
}

pub fn skill_slot_key(skill: Skill) -> String {
    skill.name().to_ascii_lowercase().replace(' ', "_")
}

fn ability_slot_key(ability: Ability) -> String {
    ability.abbreviation().to_ascii_lowercase()
}

fn has_armor_training(record: &CharacterRecord, needle: &str) -> bool {
    record
        .proficiencies
        .armor
        .iter()
        .any(|a| a.to_ascii_lowercase().contains(needle))
}

pub fn semantic_values(
    record: &CharacterRecord,
    derived: &DerivedValues,
) -> Vec<(String, SlotValue)> {
    let mut out: Vec<(String, SlotValue)> = Vec::new();
    let mut text = |slot: &str, value: String| out.push((slot.to_string(), SlotValue::Text(value)));

    text("character.name", record.name.clone());
    text("character.name.page2", record.name.clone());
    text("character.player_name", record.player_name.clone());
    text("character.class_level", derived.text.class_level.clone());
    text("character.race", derived.text.race.clone());
    text("character.background", derived.text.background.clone());
    text("character.alignment", record.alignment.clone());
    text("character.experience", record.experience.to_string());

    for ability in Ability::ALL {
        let key = ability_slot_key(ability);
        let value = derived.ability(ability);
        text(&format!("ability.{key}.score"), value.score.to_string());
        text(&format!("ability.{key}.modifier"), signed(value.modifier));
        text(&format!("save.{key}.modifier"), signed(derived.save(ability).modifier));
    }
    for skill in Skill::ALL {
        let key = skill_slot_key(skill);
        text(&format!("skill.{key}.modifier"), signed(derived.skill(skill).modifier));
    }

    text("combat.proficiency_bonus", signed(derived.proficiency_bonus));
    text("combat.armor_class", derived.armor_class.to_string());
    text("combat.initiative", signed(derived.initiative));
    text("combat.speed", derived.speed.to_string());
    text("combat.hp_max", derived.max_hp.to_string());
    text("combat.hp_current", derived.current_hp.to_string());
    text("combat.hit_dice_total", derived.text.hit_dice.clone());
    text("combat.hit_dice", derived.text.hit_dice.clone());
    text("passive.perception", derived.passive_perception.to_string());

    text("text.proficiencies", derived.text.proficiencies.clone());
    text("text.equipment", derived.text.equipment.clone());
    text("text.features", derived.text.features.clone());
    text("text.species_traits", derived.text.species_traits.clone());
    text("text.feats", derived.text.feats.clone());
    text("text.attacks", derived.text.attacks.clone());

    let coins = &record.currency;
    for (key, amount) in [
        ("cp", coins.cp),
        ("sp", coins.sp),
        ("ep", coins.ep),
        ("gp", coins.gp),
        ("pp", coins.pp),
    ] {
        text(&format!("coin.{key}"), amount.to_string());
    }

    let bg = &record.background;
    text("story.personality_traits", bg.personality_traits.clone());
    text("story.ideals", bg.ideals.clone());
    text("story.bonds", bg.bonds.clone());
    text("story.flaws", bg.flaws.clone());
    text("story.backstory", record.backstory.clone());

    let look = &record.appearance;
    text("appearance.age", look.age.clone());
    text("appearance.height", look.height.clone());
    text("appearance.weight", look.weight.clone());
    text("appearance.eyes", look.eyes.clone());
    text("appearance.skin", look.skin.clone());
    text("appearance.hair", look.hair.clone());
    text("appearance.summary", derived.text.appearance.clone());

    for ability in Ability::ALL {
        let key = ability_slot_key(ability);
        out.push((
            format!("save.{key}.proficient"),
            SlotValue::Check(derived.save(ability).proficient),
        ));
    }
    for skill in Skill::ALL {
        let key = skill_slot_key(skill);
        out.push((
            format!("skill.{key}.proficient"),
            SlotValue::Check(derived.skill(skill).proficient),
        ));
    }
    for (key, needle) in [
        ("light", "light"),
        ("medium", "medium"),
        ("heavy", "heavy"),
        ("shields", "shield"),
    ] {
        out.push((
            format!("training.armor.{key}"),
            SlotValue::Check(has_armor_training(record, needle)),
        ));
    }
    out
}

pub fn build_field_map(
    record: &CharacterRecord,
    schema: SchemaTag,
    derived: &DerivedValues,
) -> FieldMap {
    let mut map = FieldMap::default();
    for (slot, value) in semantic_values(record, derived) {
        let Some(def) = sheetfill_schema::slot_def(schema.id(), &slot) else {
            continue;
        };
        if def.kind != value.kind() {
            continue;
        }
        match value {
            SlotValue::Text(text) => {
                map.text_fields.insert(def.field.to_string(), text);
            }
            SlotValue::Check(checked) => {
                map.checkbox_fields.insert(def.field.to_string(), checked);
            }
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::{AbilityScores, ClassEntry, Proficiencies};
    use crate::derived::compute_derived;
    use std::collections::BTreeSet;

    fn sample() -> CharacterRecord {
        CharacterRecord {
            name: "Brenna".into(),
            classes: vec![ClassEntry {
                name: "Fighter".into(),
                level: 3,
                ..ClassEntry::default()
            }],
            ability_scores: AbilityScores {
                strength: 16,
                dexterity: 8,
                ..AbilityScores::default()
            },
            proficiencies: Proficiencies {
                skills: vec!["Athletics".into()],
                saving_throws: vec!["STR".into(), "con".into()],
                armor: vec!["Heavy Armor".into(), "Shields".into()],
                ..Proficiencies::default()
            },
            ..CharacterRecord::default()
        }
    }

    fn map_for(schema: SchemaTag) -> FieldMap {
        let record = sample();
        let derived = compute_derived(&record);
        build_field_map(&record, schema, &derived)
    }

    #[test]
    fn signed_formats_explicit_plus() {
        assert_eq!(signed(3), "+3");
        assert_eq!(signed(0), "+0");
        assert_eq!(signed(-1), "-1");
    }

    #[test]
    fn legacy_map_uses_literal_field_names() {
        let map = map_for(SchemaTag::Legacy);
        assert_eq!(map.text_fields["STR"], "16");
        assert_eq!(map.text_fields["STRmod"], "+3");
        assert_eq!(map.text_fields["DEXmod "], "-1");
        assert_eq!(map.text_fields["ProfBonus"], "+2");
        assert_eq!(map.text_fields["ST Strength"], "+5");
        assert_eq!(map.text_fields["Athletics"], "+5");
        assert_eq!(map.text_fields["CharacterName 2"], "Brenna");
        assert_eq!(map.checkbox_fields["Check Box 11"], true);
        assert_eq!(map.checkbox_fields["Check Box 19"], true);
        assert_eq!(map.checkbox_fields["Check Box 26"], true);
        assert_eq!(map.checkbox_fields["Check Box 23"], false);
    }

    #[test]
    fn current_map_keeps_semantics_under_new_names() {
        let legacy = map_for(SchemaTag::Legacy);
        let current = map_for(SchemaTag::Current);
        assert_eq!(current.text_fields["STR_MOD"], legacy.text_fields["STRmod"]);
        assert_eq!(current.text_fields["STR_SAVE"], legacy.text_fields["ST Strength"]);
        assert_eq!(current.text_fields["HP_MAX"], legacy.text_fields["HPMax"]);
        assert_eq!(current.checkbox_fields["ARMOR_TRAINING_HEAVY"], true);
        assert_eq!(current.checkbox_fields["ARMOR_TRAINING_SHIELDS"], true);
        assert_eq!(current.checkbox_fields["ARMOR_TRAINING_LIGHT"], false);
    }

    #[test]
    fn schemas_produce_disjoint_field_names() {
        let legacy = map_for(SchemaTag::Legacy);
        let current = map_for(SchemaTag::Current);
        let a: BTreeSet<&String> = legacy
            .text_fields
            .keys()
            .chain(legacy.checkbox_fields.keys())
            .collect();
        let b: BTreeSet<&String> = current
            .text_fields
            .keys()
            .chain(current.checkbox_fields.keys())
            .collect();
        assert!(a.is_disjoint(&b));
        assert!(!legacy.text_fields.contains_key("BACKSTORY_PERSONALITY"));
        assert!(!current.text_fields.contains_key("Bonds"));
    }

    #[test]
    fn build_is_idempotent() {
        let first = map_for(SchemaTag::Current);
        let second = map_for(SchemaTag::Current);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn every_table_slot_has_a_value_and_every_value_has_a_slot() {
        let record = sample();
        let derived = compute_derived(&record);
        let produced: BTreeSet<String> = semantic_values(&record, &derived)
            .into_iter()
            .map(|(slot, _)| slot)
            .collect();
        let mut tabled = BTreeSet::new();
        for tag in SchemaTag::ALL {
            for def in tag.table() {
                assert!(produced.contains(def.slot), "{} has no value", def.slot);
                tabled.insert(def.slot.to_string());
            }
        }
        assert_eq!(produced, tabled);
    }

    #[test]
    fn table_covers_whole_map() {
        let map = map_for(SchemaTag::Legacy);
        assert_eq!(map.len(), SchemaTag::Legacy.table().len());
        assert!(!map.is_empty());
    }
}
