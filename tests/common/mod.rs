#![allow(dead_code)]

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};

pub enum Kind {
    Text,
    Check,
    Button,
}

fn literal(text: &str) -> Object {
    Object::String(text.as_bytes().to_vec(), StringFormat::Literal)
}

pub fn form_pdf(fields: &[(&str, Kind)]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let page_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut ids: Vec<Object> = Vec::new();
    for (idx, (name, kind)) in fields.iter().enumerate() {
        let top = 780 - (idx as i64 % 60) * 12;
        let mut dict = dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "T" => literal(name),
            "P" => page_id,
            "DA" => literal("/Helv 0 Tf 0 g"),
        };
        match kind {
            Kind::Text => {
                dict.set("FT", "Tx");
                dict.set("Rect", rect(40, top - 10, 240, top));
            }
            Kind::Check => {
                dict.set("FT", "Btn");
                dict.set("Rect", rect(20, top - 10, 30, top));
                let on = doc.add_object(Stream::new(Dictionary::new(), b"0 g 2 2 6 6 re f".to_vec()));
                dict.set("AP", dictionary! { "N" => dictionary! { "Yes" => on } });
                dict.set("AS", "Off");
            }
            Kind::Button => {
                dict.set("FT", "Btn");
                dict.set("Ff", 1 << 16);
                dict.set("Rect", rect(300, top - 100, 400, top));
                dict.set("AA", dictionary! {
                    "U" => dictionary! { "S" => "JavaScript", "JS" => literal("event.target.buttonImportIcon();") },
                });
            }
        }
        ids.push(doc.add_object(dict).into());
    }

    doc.objects.insert(
        page_id,
        Object::Dictionary(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Annots" => ids.clone(),
        }),
    );
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let acroform = doc.add_object(dictionary! {
        "Fields" => ids,
        "DA" => literal("/Helv 0 Tf 0 g"),
        "DR" => dictionary! { "Font" => dictionary! { "Helv" => font_id } },
        "NeedAppearances" => true,
    });
    let catalog = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
        "AcroForm" => acroform,
    });
    doc.trailer.set("Root", catalog);
    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save fixture");
    out
}

fn rect(x1: i64, y1: i64, x2: i64, y2: i64) -> Vec<Object> {
    vec![x1.into(), y1.into(), x2.into(), y2.into()]
}

pub fn field_dict<'a>(doc: &'a Document, name: &str) -> &'a Dictionary {
    let id = field_id(doc, name);
    doc.get_object(id).and_then(Object::as_dict).expect("field dict")
}

pub fn field_id(doc: &Document, name: &str) -> ObjectId {
    doc.objects
        .iter()
        .find(|(_, obj)| {
            obj.as_dict()
                .ok()
                .and_then(|d| d.get(b"T").ok())
                .and_then(|t| t.as_str().ok())
                .is_some_and(|t| t == name.as_bytes())
        })
        .map(|(id, _)| *id)
        .expect("field present")
}

pub fn text_value(doc: &Document, name: &str) -> Option<String> {
    field_dict(doc, name)
        .get(b"V")
        .ok()
        .and_then(|v| v.as_str().ok())
        .map(|v| String::from_utf8_lossy(v).into_owned())
}

pub fn name_value(doc: &Document, name: &str, key: &[u8]) -> Option<String> {
    field_dict(doc, name)
        .get(key)
        .ok()
        .and_then(|v| v.as_name().ok())
        .map(|v| String::from_utf8_lossy(v).into_owned())
}

pub const FIGHTER_JSON: &str = r#"{
    "name": "Brienne",
    "playerName": "Sam",
    "alignment": "Lawful Good",
    "experience": 900,
    "race": { "name": "Human" },
    "background": { "name": "Soldier", "ideals": "Responsibility." },
    "classes": [{ "name": "Fighter", "level": 3, "subclass": "Champion" }],
    "abilityScores": {
        "strength": 15, "dexterity": 12, "constitution": 14,
        "intelligence": 8, "wisdom": 10, "charisma": 10
    },
    "abilityBonuses": [{ "ability": "STR", "amount": 1, "source": "Human" }],
    "proficiencies": {
        "savingThrows": ["Strength", "Constitution"],
        "skills": ["Athletics", "Intimidation"],
        "armor": ["Light armor", "Medium armor", "Heavy armor", "Shields"],
        "weapons": ["Simple weapons", "Martial weapons"]
    },
    "speed": 30,
    "inventory": [
        { "name": "Longsword", "category": "Martial Melee Weapons" },
        { "name": "Chain Mail", "category": "Heavy Armor" }
    ],
    "currency": { "gp": 10, "sp": 5 }
}"#;
