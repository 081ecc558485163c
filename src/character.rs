use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Ability {
    Strength,
    Dexterity,
    Constitution,
    Intelligence,
    Wisdom,
    Charisma,
}

impl Ability {
    pub const ALL: [Ability; 6] = [
        Ability::Strength,
        Ability::Dexterity,
        Ability::Constitution,
        Ability::Intelligence,
        Ability::Wisdom,
        Ability::Charisma,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Ability::Strength => "Strength",
            Ability::Dexterity => "Dexterity",
            Ability::Constitution => "Constitution",
            Ability::Intelligence => "Intelligence",
            Ability::Wisdom => "Wisdom",
            Ability::Charisma => "Charisma",
        }
    }

    pub fn abbreviation(&self) -> &'static str {
        match self {
            Ability::Strength => "STR",
            Ability::Dexterity => "DEX",
            Ability::Constitution => "CON",
            Ability::Intelligence => "INT",
            Ability::Wisdom => "WIS",
            Ability::Charisma => "CHA",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Ability::ALL.into_iter().find(|a| {
            raw.eq_ignore_ascii_case(a.name()) || raw.eq_ignore_ascii_case(a.abbreviation())
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CharacterRecord {
    pub name: String,
    pub player_name: String,
    pub alignment: String,
    pub experience: i64,
    pub race: RaceInfo,
    pub background: BackgroundInfo,
    pub classes: Vec<ClassEntry>,
    pub ability_scores: AbilityScores,
    pub ability_bonuses: Vec<AbilityBonus>,
    pub proficiencies: Proficiencies,
    pub optional_proficiencies: OptionalProficiencies,
    pub feats: Vec<NamedEntry>,
    pub features: FeatureSet,
    pub speed: i32,
    pub hit_points: i32,
    pub current_hit_points: Option<i32>,
    pub armor_class: Option<i32>,
    pub inventory: Vec<InventoryItem>,
    pub appearance: Appearance,
    pub backstory: String,
    pub currency: Currency,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RaceInfo {
    pub name: String,
    pub subrace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BackgroundInfo {
    pub name: String,
    pub personality_traits: String,
    pub ideals: String,
    pub bonds: String,
    pub flaws: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClassEntry {
    pub name: String,
    pub level: i32,
    pub hit_die: Option<i32>,
    pub subclass: Option<String>,
}

impl ClassEntry {
    // A listed class is at least level 1, even when the record omits the level.
    pub fn effective_level(&self) -> i32 {
        self.level.max(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AbilityScores {
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
}

impl Default for AbilityScores {
    fn default() -> Self {
        Self {
            strength: 10,
            dexterity: 10,
            constitution: 10,
            intelligence: 10,
            wisdom: 10,
            charisma: 10,
        }
    }
}

impl AbilityScores {
    pub fn get(&self, ability: Ability) -> i32 {
        match ability {
            Ability::Strength => self.strength,
            Ability::Dexterity => self.dexterity,
            Ability::Constitution => self.constitution,
            Ability::Intelligence => self.intelligence,
            Ability::Wisdom => self.wisdom,
            Ability::Charisma => self.charisma,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AbilityBonus {
    pub ability: String,
    pub amount: i32,
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Proficiencies {
    pub skills: Vec<String>,
    pub saving_throws: Vec<String>,
    pub armor: Vec<String>,
    pub weapons: Vec<String>,
    pub tools: Vec<String>,
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChoiceGroup {
    pub options: Vec<String>,
    pub selected: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProficiencyChoices {
    pub skills: ChoiceGroup,
    pub tools: ChoiceGroup,
    pub languages: ChoiceGroup,
}

impl ProficiencyChoices {
    pub fn all_selected(&self) -> impl Iterator<Item = &String> {
        self.skills
            .selected
            .iter()
            .chain(self.tools.selected.iter())
            .chain(self.languages.selected.iter())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct OptionalProficiencies {
    pub race: Option<ProficiencyChoices>,
    pub class: Option<ProficiencyChoices>,
    pub background: Option<ProficiencyChoices>,
    pub selected: Vec<String>,
}

impl OptionalProficiencies {
    pub fn sources(&self) -> impl Iterator<Item = &ProficiencyChoices> {
        [&self.race, &self.class, &self.background]
            .into_iter()
            .flatten()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NamedEntry {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeatureSet {
    pub darkvision: Option<i32>,
    pub resistances: Vec<String>,
    pub traits: Vec<NamedEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InventoryItem {
    pub name: String,
    pub quantity: i32,
    pub category: Option<String>,
    pub equipped: bool,
}

impl Default for InventoryItem {
    fn default() -> Self {
        Self {
            name: String::new(),
            quantity: 1,
            category: None,
            equipped: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Appearance {
    pub age: String,
    pub height: String,
    pub weight: String,
    pub eyes: String,
    pub skin: String,
    pub hair: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Currency {
    pub cp: i64,
    pub sp: i64,
    pub ep: i64,
    pub gp: i64,
    pub pp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ability_parse_accepts_names_and_abbreviations() {
        assert_eq!(Ability::parse("strength"), Some(Ability::Strength));
        assert_eq!(Ability::parse("DEX"), Some(Ability::Dexterity));
        assert_eq!(Ability::parse(" wis "), Some(Ability::Wisdom));
        assert_eq!(Ability::parse("Cha"), Some(Ability::Charisma));
        assert_eq!(Ability::parse("luck"), None);
    }

    #[test]
    fn sparse_json_record_deserializes_with_defaults() {
        let record: CharacterRecord =
            serde_json::from_str(r#"{"name":"Vex","classes":[{"name":"Rogue","level":2}]}"#)
                .expect("parse");
        assert_eq!(record.name, "Vex");
        assert_eq!(record.classes[0].level, 2);
        assert_eq!(record.classes[0].hit_die, None);
        assert_eq!(record.ability_scores.strength, 10);
        assert_eq!(record.hit_points, 0);
        assert!(record.optional_proficiencies.sources().next().is_none());
    }

    #[test]
    fn inventory_quantity_defaults_to_one() {
        let item: InventoryItem = serde_json::from_str(r#"{"name":"Rope"}"#).expect("parse");
        assert_eq!(item.quantity, 1);
    }

    #[test]
    fn optional_sources_yield_only_present_entries() {
        let opts = OptionalProficiencies {
            class: Some(ProficiencyChoices {
                skills: ChoiceGroup {
                    options: vec!["Stealth".into(), "Arcana".into()],
                    selected: vec!["Stealth".into()],
                },
                ..ProficiencyChoices::default()
            }),
            ..OptionalProficiencies::default()
        };
        let selected: Vec<&String> = opts.sources().flat_map(|s| s.all_selected()).collect();
        assert_eq!(selected, vec!["Stealth"]);
    }
}
