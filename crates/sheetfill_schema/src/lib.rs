use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

pub const SCHEMA_SET_ID: &str = "sheetfill.field_schemas";
pub const SCHEMA_SET_VERSION: &str = "1";

pub const LEGACY_SCHEMA_ID: &str = "legacy";
pub const CURRENT_SCHEMA_ID: &str = "current";

pub const CURRENT_SCHEMA_MARKER: &str = "2024";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Text,
    Check,
}

impl SlotKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotKind::Text => "text",
            SlotKind::Check => "check",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSlotDef {
    pub slot: &'static str,
    pub field: &'static str,
    pub kind: SlotKind,
}

// Field names are copied byte for byte from the templates, trailing spaces included.
pub const LEGACY_FIELDS_V1: [FieldSlotDef; 97] = [
    FieldSlotDef { slot: "character.name", field: "CharacterName", kind: SlotKind::Text },
    FieldSlotDef { slot: "character.name.page2", field: "CharacterName 2", kind: SlotKind::Text },
    FieldSlotDef { slot: "character.player_name", field: "PlayerName", kind: SlotKind::Text },
    FieldSlotDef { slot: "character.class_level", field: "ClassLevel", kind: SlotKind::Text },
    FieldSlotDef { slot: "character.race", field: "Race ", kind: SlotKind::Text },
    FieldSlotDef { slot: "character.background", field: "Background", kind: SlotKind::Text },
    FieldSlotDef { slot: "character.alignment", field: "Alignment", kind: SlotKind::Text },
    FieldSlotDef { slot: "character.experience", field: "XP", kind: SlotKind::Text },
    FieldSlotDef { slot: "ability.str.score", field: "STR", kind: SlotKind::Text },
    FieldSlotDef { slot: "ability.str.modifier", field: "STRmod", kind: SlotKind::Text },
    FieldSlotDef { slot: "ability.dex.score", field: "DEX", kind: SlotKind::Text },
    FieldSlotDef { slot: "ability.dex.modifier", field: "DEXmod ", kind: SlotKind::Text },
    FieldSlotDef { slot: "ability.con.score", field: "CON", kind: SlotKind::Text },
    FieldSlotDef { slot: "ability.con.modifier", field: "CONmod", kind: SlotKind::Text },
    FieldSlotDef { slot: "ability.int.score", field: "INT", kind: SlotKind::Text },
    FieldSlotDef { slot: "ability.int.modifier", field: "INTmod", kind: SlotKind::Text },
    FieldSlotDef { slot: "ability.wis.score", field: "WIS", kind: SlotKind::Text },
    FieldSlotDef { slot: "ability.wis.modifier", field: "WISmod", kind: SlotKind::Text },
    FieldSlotDef { slot: "ability.cha.score", field: "CHA", kind: SlotKind::Text },
    FieldSlotDef { slot: "ability.cha.modifier", field: "CHamod", kind: SlotKind::Text },
    FieldSlotDef { slot: "save.str.modifier", field: "ST Strength", kind: SlotKind::Text },
    FieldSlotDef { slot: "save.str.proficient", field: "Check Box 11", kind: SlotKind::Check },
    FieldSlotDef { slot: "save.dex.modifier", field: "ST Dexterity", kind: SlotKind::Text },
    FieldSlotDef { slot: "save.dex.proficient", field: "Check Box 18", kind: SlotKind::Check },
    FieldSlotDef { slot: "save.con.modifier", field: "ST Constitution", kind: SlotKind::Text },
    FieldSlotDef { slot: "save.con.proficient", field: "Check Box 19", kind: SlotKind::Check },
    FieldSlotDef { slot: "save.int.modifier", field: "ST Intelligence", kind: SlotKind::Text },
    FieldSlotDef { slot: "save.int.proficient", field: "Check Box 20", kind: SlotKind::Check },
    FieldSlotDef { slot: "save.wis.modifier", field: "ST Wisdom", kind: SlotKind::Text },
    FieldSlotDef { slot: "save.wis.proficient", field: "Check Box 21", kind: SlotKind::Check },
    FieldSlotDef { slot: "save.cha.modifier", field: "ST Charisma", kind: SlotKind::Text },
    FieldSlotDef { slot: "save.cha.proficient", field: "Check Box 22", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.acrobatics.modifier", field: "Acrobatics", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.acrobatics.proficient", field: "Check Box 23", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.animal_handling.modifier", field: "Animal", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.animal_handling.proficient", field: "Check Box 24", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.arcana.modifier", field: "Arcana", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.arcana.proficient", field: "Check Box 25", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.athletics.modifier", field: "Athletics", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.athletics.proficient", field: "Check Box 26", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.deception.modifier", field: "Deception ", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.deception.proficient", field: "Check Box 27", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.history.modifier", field: "History ", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.history.proficient", field: "Check Box 28", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.insight.modifier", field: "Insight", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.insight.proficient", field: "Check Box 29", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.intimidation.modifier", field: "Intimidation", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.intimidation.proficient", field: "Check Box 30", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.investigation.modifier", field: "Investigation ", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.investigation.proficient", field: "Check Box 31", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.medicine.modifier", field: "Medicine", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.medicine.proficient", field: "Check Box 32", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.nature.modifier", field: "Nature", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.nature.proficient", field: "Check Box 33", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.perception.modifier", field: "Perception ", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.perception.proficient", field: "Check Box 34", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.performance.modifier", field: "Performance", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.performance.proficient", field: "Check Box 35", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.persuasion.modifier", field: "Persuasion", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.persuasion.proficient", field: "Check Box 36", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.religion.modifier", field: "Religion", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.religion.proficient", field: "Check Box 37", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.sleight_of_hand.modifier", field: "SleightofHand", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.sleight_of_hand.proficient", field: "Check Box 38", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.stealth.modifier", field: "Stealth ", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.stealth.proficient", field: "Check Box 39", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.survival.modifier", field: "Survival", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.survival.proficient", field: "Check Box 40", kind: SlotKind::Check },
    FieldSlotDef { slot: "combat.proficiency_bonus", field: "ProfBonus", kind: SlotKind::Text },
    FieldSlotDef { slot: "combat.armor_class", field: "AC", kind: SlotKind::Text },
    FieldSlotDef { slot: "combat.initiative", field: "Initiative", kind: SlotKind::Text },
    FieldSlotDef { slot: "combat.speed", field: "Speed", kind: SlotKind::Text },
    FieldSlotDef { slot: "combat.hp_max", field: "HPMax", kind: SlotKind::Text },
    FieldSlotDef { slot: "combat.hp_current", field: "HPCurrent", kind: SlotKind::Text },
    FieldSlotDef { slot: "combat.hit_dice_total", field: "HDTotal", kind: SlotKind::Text },
    FieldSlotDef { slot: "combat.hit_dice", field: "HD", kind: SlotKind::Text },
    FieldSlotDef { slot: "passive.perception", field: "Passive", kind: SlotKind::Text },
    FieldSlotDef { slot: "text.proficiencies", field: "ProficienciesLang", kind: SlotKind::Text },
    FieldSlotDef { slot: "text.equipment", field: "Equipment", kind: SlotKind::Text },
    FieldSlotDef { slot: "text.features", field: "Features and Traits", kind: SlotKind::Text },
    FieldSlotDef { slot: "text.attacks", field: "AttacksSpellcasting", kind: SlotKind::Text },
    FieldSlotDef { slot: "coin.cp", field: "CP", kind: SlotKind::Text },
    FieldSlotDef { slot: "coin.sp", field: "SP", kind: SlotKind::Text },
    FieldSlotDef { slot: "coin.ep", field: "EP", kind: SlotKind::Text },
    FieldSlotDef { slot: "coin.gp", field: "GP", kind: SlotKind::Text },
    FieldSlotDef { slot: "coin.pp", field: "PP", kind: SlotKind::Text },
    FieldSlotDef { slot: "story.personality_traits", field: "PersonalityTraits ", kind: SlotKind::Text },
    FieldSlotDef { slot: "story.ideals", field: "Ideals", kind: SlotKind::Text },
    FieldSlotDef { slot: "story.bonds", field: "Bonds", kind: SlotKind::Text },
    FieldSlotDef { slot: "story.flaws", field: "Flaws", kind: SlotKind::Text },
    FieldSlotDef { slot: "story.backstory", field: "Backstory", kind: SlotKind::Text },
    FieldSlotDef { slot: "appearance.age", field: "Age", kind: SlotKind::Text },
    FieldSlotDef { slot: "appearance.height", field: "Height", kind: SlotKind::Text },
    FieldSlotDef { slot: "appearance.weight", field: "Weight", kind: SlotKind::Text },
    FieldSlotDef { slot: "appearance.eyes", field: "Eyes", kind: SlotKind::Text },
    FieldSlotDef { slot: "appearance.skin", field: "Skin", kind: SlotKind::Text },
    FieldSlotDef { slot: "appearance.hair", field: "Hair", kind: SlotKind::Text },
];

pub const CURRENT_FIELDS_V1: [FieldSlotDef; 90] = [
    FieldSlotDef { slot: "character.name", field: "CHARACTER_NAME", kind: SlotKind::Text },
    FieldSlotDef { slot: "character.class_level", field: "CLASS_AND_LEVEL", kind: SlotKind::Text },
    FieldSlotDef { slot: "character.race", field: "SPECIES", kind: SlotKind::Text },
    FieldSlotDef { slot: "character.background", field: "BACKGROUND_NAME", kind: SlotKind::Text },
    FieldSlotDef { slot: "character.alignment", field: "ALIGNMENT_TEXT", kind: SlotKind::Text },
    FieldSlotDef { slot: "character.experience", field: "XP_POINTS", kind: SlotKind::Text },
    FieldSlotDef { slot: "ability.str.score", field: "STR_SCORE", kind: SlotKind::Text },
    FieldSlotDef { slot: "ability.str.modifier", field: "STR_MOD", kind: SlotKind::Text },
    FieldSlotDef { slot: "save.str.modifier", field: "STR_SAVE", kind: SlotKind::Text },
    FieldSlotDef { slot: "save.str.proficient", field: "STR_SAVE_PROF", kind: SlotKind::Check },
    FieldSlotDef { slot: "ability.dex.score", field: "DEX_SCORE", kind: SlotKind::Text },
    FieldSlotDef { slot: "ability.dex.modifier", field: "DEX_MOD", kind: SlotKind::Text },
    FieldSlotDef { slot: "save.dex.modifier", field: "DEX_SAVE", kind: SlotKind::Text },
    FieldSlotDef { slot: "save.dex.proficient", field: "DEX_SAVE_PROF", kind: SlotKind::Check },
    FieldSlotDef { slot: "ability.con.score", field: "CON_SCORE", kind: SlotKind::Text },
    FieldSlotDef { slot: "ability.con.modifier", field: "CON_MOD", kind: SlotKind::Text },
    FieldSlotDef { slot: "save.con.modifier", field: "CON_SAVE", kind: SlotKind::Text },
    FieldSlotDef { slot: "save.con.proficient", field: "CON_SAVE_PROF", kind: SlotKind::Check },
    FieldSlotDef { slot: "ability.int.score", field: "INT_SCORE", kind: SlotKind::Text },
    FieldSlotDef { slot: "ability.int.modifier", field: "INT_MOD", kind: SlotKind::Text },
    FieldSlotDef { slot: "save.int.modifier", field: "INT_SAVE", kind: SlotKind::Text },
    FieldSlotDef { slot: "save.int.proficient", field: "INT_SAVE_PROF", kind: SlotKind::Check },
    FieldSlotDef { slot: "ability.wis.score", field: "WIS_SCORE", kind: SlotKind::Text },
    FieldSlotDef { slot: "ability.wis.modifier", field: "WIS_MOD", kind: SlotKind::Text },
    FieldSlotDef { slot: "save.wis.modifier", field: "WIS_SAVE", kind: SlotKind::Text },
    FieldSlotDef { slot: "save.wis.proficient", field: "WIS_SAVE_PROF", kind: SlotKind::Check },
    FieldSlotDef { slot: "ability.cha.score", field: "CHA_SCORE", kind: SlotKind::Text },
    FieldSlotDef { slot: "ability.cha.modifier", field: "CHA_MOD", kind: SlotKind::Text },
    FieldSlotDef { slot: "save.cha.modifier", field: "CHA_SAVE", kind: SlotKind::Text },
    FieldSlotDef { slot: "save.cha.proficient", field: "CHA_SAVE_PROF", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.acrobatics.modifier", field: "SKILL_ACROBATICS", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.acrobatics.proficient", field: "SKILL_ACROBATICS_PROF", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.animal_handling.modifier", field: "SKILL_ANIMAL_HANDLING", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.animal_handling.proficient", field: "SKILL_ANIMAL_HANDLING_PROF", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.arcana.modifier", field: "SKILL_ARCANA", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.arcana.proficient", field: "SKILL_ARCANA_PROF", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.athletics.modifier", field: "SKILL_ATHLETICS", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.athletics.proficient", field: "SKILL_ATHLETICS_PROF", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.deception.modifier", field: "SKILL_DECEPTION", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.deception.proficient", field: "SKILL_DECEPTION_PROF", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.history.modifier", field: "SKILL_HISTORY", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.history.proficient", field: "SKILL_HISTORY_PROF", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.insight.modifier", field: "SKILL_INSIGHT", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.insight.proficient", field: "SKILL_INSIGHT_PROF", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.intimidation.modifier", field: "SKILL_INTIMIDATION", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.intimidation.proficient", field: "SKILL_INTIMIDATION_PROF", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.investigation.modifier", field: "SKILL_INVESTIGATION", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.investigation.proficient", field: "SKILL_INVESTIGATION_PROF", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.medicine.modifier", field: "SKILL_MEDICINE", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.medicine.proficient", field: "SKILL_MEDICINE_PROF", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.nature.modifier", field: "SKILL_NATURE", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.nature.proficient", field: "SKILL_NATURE_PROF", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.perception.modifier", field: "SKILL_PERCEPTION", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.perception.proficient", field: "SKILL_PERCEPTION_PROF", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.performance.modifier", field: "SKILL_PERFORMANCE", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.performance.proficient", field: "SKILL_PERFORMANCE_PROF", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.persuasion.modifier", field: "SKILL_PERSUASION", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.persuasion.proficient", field: "SKILL_PERSUASION_PROF", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.religion.modifier", field: "SKILL_RELIGION", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.religion.proficient", field: "SKILL_RELIGION_PROF", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.sleight_of_hand.modifier", field: "SKILL_SLEIGHT_OF_HAND", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.sleight_of_hand.proficient", field: "SKILL_SLEIGHT_OF_HAND_PROF", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.stealth.modifier", field: "SKILL_STEALTH", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.stealth.proficient", field: "SKILL_STEALTH_PROF", kind: SlotKind::Check },
    FieldSlotDef { slot: "skill.survival.modifier", field: "SKILL_SURVIVAL", kind: SlotKind::Text },
    FieldSlotDef { slot: "skill.survival.proficient", field: "SKILL_SURVIVAL_PROF", kind: SlotKind::Check },
    FieldSlotDef { slot: "combat.proficiency_bonus", field: "PROFICIENCY_BONUS", kind: SlotKind::Text },
    FieldSlotDef { slot: "combat.armor_class", field: "ARMOR_CLASS", kind: SlotKind::Text },
    FieldSlotDef { slot: "combat.initiative", field: "INITIATIVE_MOD", kind: SlotKind::Text },
    FieldSlotDef { slot: "combat.speed", field: "SPEED_WALK", kind: SlotKind::Text },
    FieldSlotDef { slot: "combat.hp_max", field: "HP_MAX", kind: SlotKind::Text },
    FieldSlotDef { slot: "combat.hp_current", field: "HP_CURRENT", kind: SlotKind::Text },
    FieldSlotDef { slot: "combat.hit_dice_total", field: "HIT_DICE_MAX", kind: SlotKind::Text },
    FieldSlotDef { slot: "passive.perception", field: "PASSIVE_PERCEPTION", kind: SlotKind::Text },
    FieldSlotDef { slot: "text.proficiencies", field: "TRAINING_PROFICIENCIES", kind: SlotKind::Text },
    FieldSlotDef { slot: "text.equipment", field: "EQUIPMENT_LIST", kind: SlotKind::Text },
    FieldSlotDef { slot: "text.attacks", field: "WEAPONS_DAMAGE_CANTRIPS", kind: SlotKind::Text },
    FieldSlotDef { slot: "text.species_traits", field: "SPECIES_TRAITS", kind: SlotKind::Text },
    FieldSlotDef { slot: "text.feats", field: "FEATS_LIST", kind: SlotKind::Text },
    FieldSlotDef { slot: "coin.cp", field: "COIN_CP", kind: SlotKind::Text },
    FieldSlotDef { slot: "coin.sp", field: "COIN_SP", kind: SlotKind::Text },
    FieldSlotDef { slot: "coin.ep", field: "COIN_EP", kind: SlotKind::Text },
    FieldSlotDef { slot: "coin.gp", field: "COIN_GP", kind: SlotKind::Text },
    FieldSlotDef { slot: "coin.pp", field: "COIN_PP", kind: SlotKind::Text },
    FieldSlotDef { slot: "story.backstory", field: "BACKSTORY_PERSONALITY", kind: SlotKind::Text },
    FieldSlotDef { slot: "appearance.summary", field: "APPEARANCE_NOTES", kind: SlotKind::Text },
    FieldSlotDef { slot: "training.armor.light", field: "ARMOR_TRAINING_LIGHT", kind: SlotKind::Check },
    FieldSlotDef { slot: "training.armor.medium", field: "ARMOR_TRAINING_MEDIUM", kind: SlotKind::Check },
    FieldSlotDef { slot: "training.armor.heavy", field: "ARMOR_TRAINING_HEAVY", kind: SlotKind::Check },
    FieldSlotDef { slot: "training.armor.shields", field: "ARMOR_TRAINING_SHIELDS", kind: SlotKind::Check },
];

// Death-save and inspiration trackers; hidden rather than filled.
pub const TRACKER_CHECKBOXES: [&str; 13] = [
    "Check Box 12",
    "Check Box 13",
    "Check Box 14",
    "Check Box 15",
    "Check Box 16",
    "Check Box 17",
    "DEATH_SAVE_SUCCESS_1",
    "DEATH_SAVE_SUCCESS_2",
    "DEATH_SAVE_SUCCESS_3",
    "DEATH_SAVE_FAILURE_1",
    "DEATH_SAVE_FAILURE_2",
    "DEATH_SAVE_FAILURE_3",
    "HEROIC_INSPIRATION",
];

// Template default renders as a truncated placeholder glyph.
pub const PLACEHOLDER_DROPDOWNS: [&str; 2] = ["SIZE_SELECT", "SPELLCASTING_ABILITY_SELECT"];

pub const CALCULATED_FIELDS: [&str; 4] = ["AC", "ProfBonus", "ARMOR_CLASS", "PROFICIENCY_BONUS"];

// Priority order.
pub const PORTRAIT_FIELDS: [&str; 3] = ["CHARACTER IMAGE", "PORTRAIT", "Portrait"];

pub const STATIC_PUSHBUTTONS: [&str; 3] = ["Faction Symbol Image", "SHEET_LOGO", "CLASS_ICON"];

#[derive(Debug, Clone)]
pub struct SchemaSetMetadata {
    pub set_id: &'static str,
    pub set_version: &'static str,
    pub set_fingerprint_sha256: String,
    pub legacy_table_hash_sha256: String,
    pub current_table_hash_sha256: String,
}

fn hex_sha256(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

fn canonical_table_bytes(defs: &[FieldSlotDef]) -> Vec<u8> {
    let mut out = Vec::new();
    for def in defs {
        out.extend_from_slice(def.slot.as_bytes());
        out.push(b'\t');
        out.extend_from_slice(def.field.as_bytes());
        out.push(b'\t');
        out.extend_from_slice(def.kind.as_str().as_bytes());
        out.push(b'\n');
    }
    out
}

fn hash_memoized(cell: &OnceLock<String>, defs: &[FieldSlotDef]) -> String {
    cell.get_or_init(|| hex_sha256(&canonical_table_bytes(defs))).clone()
}

static LEGACY_TABLE_HASH: OnceLock<String> = OnceLock::new();
static CURRENT_TABLE_HASH: OnceLock<String> = OnceLock::new();
static SET_FINGERPRINT: OnceLock<String> = OnceLock::new();

pub fn schema_ids() -> [&'static str; 2] {
    [LEGACY_SCHEMA_ID, CURRENT_SCHEMA_ID]
}

pub fn table(schema_id: &str) -> Option<&'static [FieldSlotDef]> {
    match schema_id {
        LEGACY_SCHEMA_ID => Some(&LEGACY_FIELDS_V1),
        CURRENT_SCHEMA_ID => Some(&CURRENT_FIELDS_V1),
        _ => None,
    }
}

pub fn slot_def(schema_id: &str, slot: &str) -> Option<&'static FieldSlotDef> {
    table(schema_id)?.iter().find(|d| d.slot == slot)
}

pub fn field_name(schema_id: &str, slot: &str) -> Option<&'static str> {
    slot_def(schema_id, slot).map(|d| d.field)
}

pub fn table_hash_sha256(schema_id: &str) -> Option<String> {
    match schema_id {
        LEGACY_SCHEMA_ID => Some(hash_memoized(&LEGACY_TABLE_HASH, &LEGACY_FIELDS_V1)),
        CURRENT_SCHEMA_ID => Some(hash_memoized(&CURRENT_TABLE_HASH, &CURRENT_FIELDS_V1)),
        _ => None,
    }
}

pub fn set_fingerprint_sha256() -> String {
    SET_FINGERPRINT
        .get_or_init(|| {
            let mut material = String::new();
            material.push_str(SCHEMA_SET_ID);
            material.push('\n');
            material.push_str(SCHEMA_SET_VERSION);
            material.push('\n');
            for id in schema_ids() {
                material.push_str(id);
                material.push('=');
                material.push_str(&table_hash_sha256(id).unwrap_or_default());
                material.push('\n');
            }
            hex_sha256(material.as_bytes())
        })
        .clone()
}

pub fn table_json(schema_id: &str) -> Option<Value> {
    let defs = table(schema_id)?;
    let rows: Vec<Value> = defs
        .iter()
        .map(|d| json!({ "slot": d.slot, "field": d.field, "kind": d.kind.as_str() }))
        .collect();
    Some(json!({
        "schema": schema_id,
        "hash_sha256": table_hash_sha256(schema_id),
        "fields": rows,
    }))
}

pub fn metadata() -> SchemaSetMetadata {
    SchemaSetMetadata {
        set_id: SCHEMA_SET_ID,
        set_version: SCHEMA_SET_VERSION,
        set_fingerprint_sha256: set_fingerprint_sha256(),
        legacy_table_hash_sha256: table_hash_sha256(LEGACY_SCHEMA_ID).unwrap_or_default(),
        current_table_hash_sha256: table_hash_sha256(CURRENT_SCHEMA_ID).unwrap_or_default(),
    }
}
