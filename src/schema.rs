use sheetfill_schema::{
    CURRENT_SCHEMA_ID, CURRENT_SCHEMA_MARKER, FieldSlotDef, LEGACY_SCHEMA_ID,
};

// A new template version gets a new variant and table; existing tables are frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SchemaTag {
    #[default]
    Legacy,
    Current,
}

impl SchemaTag {
    pub const ALL: [SchemaTag; 2] = [SchemaTag::Legacy, SchemaTag::Current];

    pub fn id(&self) -> &'static str {
        match self {
            SchemaTag::Legacy => LEGACY_SCHEMA_ID,
            SchemaTag::Current => CURRENT_SCHEMA_ID,
        }
    }

    pub fn from_id(raw: &str) -> Option<Self> {
        SchemaTag::ALL
            .into_iter()
            .find(|tag| tag.id().eq_ignore_ascii_case(raw.trim()))
    }

    pub fn table(&self) -> &'static [FieldSlotDef] {
        sheetfill_schema::table(self.id()).unwrap_or(&[])
    }
}

pub fn select_schema(template_name: &str) -> SchemaTag {
    if template_name.contains(CURRENT_SCHEMA_MARKER) {
        SchemaTag::Current
    } else {
        SchemaTag::Legacy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_selects_current_schema() {
        assert_eq!(
            select_schema("templates/character-sheet-2024.pdf"),
            SchemaTag::Current
        );
        assert_eq!(select_schema("5E_CharacterSheet_Fillable.pdf"), SchemaTag::Legacy);
        assert_eq!(select_schema(""), SchemaTag::Legacy);
    }

    #[test]
    fn tags_round_trip_through_ids() {
        for tag in SchemaTag::ALL {
            assert_eq!(SchemaTag::from_id(tag.id()), Some(tag));
            assert!(!tag.table().is_empty());
        }
        assert_eq!(SchemaTag::from_id("CURRENT"), Some(SchemaTag::Current));
        assert_eq!(SchemaTag::from_id("2014"), None);
    }
}
