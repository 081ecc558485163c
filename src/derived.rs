use std::collections::BTreeSet;

use crate::character::{Ability, CharacterRecord, ClassEntry};
use crate::reference::CategoryNotes;
use crate::summary::{self, SheetText};

const DEFAULT_HIT_DIE: i32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Skill {
    Acrobatics,
    AnimalHandling,
    Arcana,
    Athletics,
    Deception,
    History,
    Insight,
    Intimidation,
    Investigation,
    Medicine,
    Nature,
    Perception,
    Performance,
    Persuasion,
    Religion,
    SleightOfHand,
    Stealth,
    Survival,
}

impl Skill {
    pub const ALL: [Skill; 18] = [
        Skill::Acrobatics,
        Skill::AnimalHandling,
        Skill::Arcana,
        Skill::Athletics,
        Skill::Deception,
        Skill::History,
        Skill::Insight,
        Skill::Intimidation,
        Skill::Investigation,
        Skill::Medicine,
        Skill::Nature,
        Skill::Perception,
        Skill::Performance,
        Skill::Persuasion,
        Skill::Religion,
        Skill::SleightOfHand,
        Skill::Stealth,
        Skill::Survival,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Skill::Acrobatics => "Acrobatics",
            Skill::AnimalHandling => "Animal Handling",
            Skill::Arcana => "Arcana",
            Skill::Athletics => "Athletics",
            Skill::Deception => "Deception",
            Skill::History => "History",
            Skill::Insight => "Insight",
            Skill::Intimidation => "Intimidation",
            Skill::Investigation => "Investigation",
            Skill::Medicine => "Medicine",
            Skill::Nature => "Nature",
            Skill::Perception => "Perception",
            Skill::Performance => "Performance",
            Skill::Persuasion => "Persuasion",
            Skill::Religion => "Religion",
            Skill::SleightOfHand => "Sleight of Hand",
            Skill::Stealth => "Stealth",
            Skill::Survival => "Survival",
        }
    }

    pub fn ability(&self) -> Ability {
        match self {
            Skill::Athletics => Ability::Strength,
            Skill::Acrobatics | Skill::SleightOfHand | Skill::Stealth => Ability::Dexterity,
            Skill::Arcana
            | Skill::History
            | Skill::Investigation
            | Skill::Nature
            | Skill::Religion => Ability::Intelligence,
            Skill::AnimalHandling
            | Skill::Insight
            | Skill::Medicine
            | Skill::Perception
            | Skill::Survival => Ability::Wisdom,
            Skill::Deception | Skill::Intimidation | Skill::Performance | Skill::Persuasion => {
                Ability::Charisma
            }
        }
    }

    fn index(&self) -> usize {
        Skill::ALL.iter().position(|s| s == self).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AbilityValue {
    pub score: i32,
    pub modifier: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CheckValue {
    pub modifier: i32,
    pub proficient: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedValues {
    abilities: [AbilityValue; 6],
    saves: [CheckValue; 6],
    skills: [CheckValue; 18],
    pub proficiency_bonus: i32,
    pub total_level: i32,
    pub max_hp: i32,
    pub current_hp: i32,
    pub armor_class: i32,
    pub initiative: i32,
    pub speed: i32,
    pub passive_perception: i32,
    pub text: SheetText,
}

impl DerivedValues {
    pub fn ability(&self, ability: Ability) -> AbilityValue {
        self.abilities[ability_index(ability)]
    }

    pub fn save(&self, ability: Ability) -> CheckValue {
        self.saves[ability_index(ability)]
    }

    pub fn skill(&self, skill: Skill) -> CheckValue {
        self.skills[skill.index()]
    }
}

fn ability_index(ability: Ability) -> usize {
    Ability::ALL.iter().position(|a| *a == ability).unwrap_or(0)
}

pub fn ability_modifier(score: i32) -> i32 {
    (score - 10).div_euclid(2)
}

pub fn proficiency_bonus(total_level: i32) -> i32 {
    (total_level.max(1) - 1).div_euclid(4) + 2
}

pub fn ability_score(record: &CharacterRecord, ability: Ability) -> i32 {
    let bonus: i32 = record
        .ability_bonuses
        .iter()
        .filter(|b| Ability::parse(&b.ability) == Some(ability))
        .map(|b| b.amount)
        .sum();
    record.ability_scores.get(ability) + bonus
}

pub fn total_level(record: &CharacterRecord) -> i32 {
    if record.classes.is_empty() {
        return 1;
    }
    record.classes.iter().map(ClassEntry::effective_level).sum()
}

pub fn class_hit_die(class_name: &str) -> i32 {
    match class_name.trim().to_ascii_lowercase().as_str() {
        "barbarian" => 12,
        "fighter" | "paladin" | "ranger" => 10,
        "sorcerer" | "wizard" => 6,
        _ => DEFAULT_HIT_DIE,
    }
}

// Stored max HP when non-zero, otherwise fixed value per level.
pub fn resolve_max_hp(record: &CharacterRecord, con_modifier: i32) -> i32 {
    if record.hit_points != 0 {
        return record.hit_points;
    }
    if record.classes.is_empty() {
        return (DEFAULT_HIT_DIE + con_modifier).max(1);
    }
    let mut total = 0;
    let mut first_level = true;
    for class in &record.classes {
        let hit_die = class
            .hit_die
            .filter(|d| *d > 0)
            .unwrap_or_else(|| class_hit_die(&class.name));
        for _ in 0..class.effective_level() {
            if first_level {
                total += hit_die + con_modifier;
                first_level = false;
            } else {
                total += hit_die / 2 + 1 + con_modifier;
            }
        }
    }
    total.max(1)
}

fn normalize_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

pub fn proficient_skill_keys(record: &CharacterRecord) -> BTreeSet<String> {
    let opts = &record.optional_proficiencies;
    record
        .proficiencies
        .skills
        .iter()
        .chain(opts.sources().flat_map(|s| s.all_selected()))
        .chain(opts.selected.iter())
        .map(|s| normalize_key(s))
        .filter(|s| !s.is_empty())
        .collect()
}

pub fn is_save_proficient(record: &CharacterRecord, ability: Ability) -> bool {
    record
        .proficiencies
        .saving_throws
        .iter()
        .any(|s| Ability::parse(s) == Some(ability))
}

pub fn compute_derived(record: &CharacterRecord) -> DerivedValues {
    compute_derived_with_notes(record, &CategoryNotes::empty())
}

pub fn compute_derived_with_notes(
    record: &CharacterRecord,
    notes: &CategoryNotes,
) -> DerivedValues {
    let mut abilities = [AbilityValue::default(); 6];
    for (idx, ability) in Ability::ALL.into_iter().enumerate() {
        let score = ability_score(record, ability);
        abilities[idx] = AbilityValue {
            score,
            modifier: ability_modifier(score),
        };
    }
    let modifier = |a: Ability| abilities[ability_index(a)].modifier;

    let total_level = total_level(record);
    let prof = proficiency_bonus(total_level);

    let mut saves = [CheckValue::default(); 6];
    for (idx, ability) in Ability::ALL.into_iter().enumerate() {
        let proficient = is_save_proficient(record, ability);
        saves[idx] = CheckValue {
            modifier: modifier(ability) + if proficient { prof } else { 0 },
            proficient,
        };
    }

    let proficient_skills = proficient_skill_keys(record);
    let mut skills = [CheckValue::default(); 18];
    for (idx, skill) in Skill::ALL.into_iter().enumerate() {
        let proficient = proficient_skills.contains(&normalize_key(skill.name()));
        skills[idx] = CheckValue {
            modifier: modifier(skill.ability()) + if proficient { prof } else { 0 },
            proficient,
        };
    }

    let perception_prof = skills[Skill::Perception.index()].proficient;
    let passive_perception = 10 + modifier(Ability::Wisdom) + if perception_prof { prof } else { 0 };

    let max_hp = resolve_max_hp(record, modifier(Ability::Constitution));
    let current_hp = record.current_hit_points.unwrap_or(max_hp);
    let initiative = modifier(Ability::Dexterity);
    let armor_class = record.armor_class.unwrap_or(10 + initiative);

    DerivedValues {
        abilities,
        saves,
        skills,
        proficiency_bonus: prof,
        total_level,
        max_hp,
        current_hp,
        armor_class,
        initiative,
        speed: record.speed.max(0),
        passive_perception,
        text: summary::sheet_text(record, notes),
    }
}
