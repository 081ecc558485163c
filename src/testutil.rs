use lopdf::{Document, Object, ObjectId, Stream, StringFormat, dictionary};

#[derive(Debug, Clone)]
pub enum FixtureKind {
    Text,
    MultilineText,
    Checkbox,
    PushButton,
    Dropdown(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct FixtureField {
    pub parent: Option<String>,
    pub name: String,
    pub kind: FixtureKind,
    pub read_only: bool,
    pub scripted: bool,
    pub off_state: bool,
    pub value: Option<String>,
    pub rect: [i64; 4],
}

impl FixtureField {
    pub fn new(name: &str, kind: FixtureKind) -> Self {
        Self {
            parent: None,
            name: name.to_string(),
            kind,
            read_only: false,
            scripted: false,
            off_state: false,
            value: None,
            rect: [50, 600, 200, 620],
        }
    }

    pub fn nested(parent: &str, name: &str, kind: FixtureKind) -> Self {
        Self {
            parent: Some(parent.to_string()),
            ..Self::new(name, kind)
        }
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn scripted(mut self) -> Self {
        self.scripted = true;
        self
    }

    pub fn with_off_state(mut self) -> Self {
        self.off_state = true;
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn rect(mut self, rect: [i64; 4]) -> Self {
        self.rect = rect;
        self
    }
}

fn literal(text: &str) -> Object {
    Object::String(text.as_bytes().to_vec(), StringFormat::Literal)
}

fn field_dict(doc: &mut Document, page_id: ObjectId, field: &FixtureField) -> lopdf::Dictionary {
    let rect: Vec<Object> = field.rect.iter().map(|v| Object::Integer(*v)).collect();
    let mut dict = dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "T" => literal(&field.name),
        "Rect" => rect,
        "P" => page_id,
        "F" => 4,
        "DA" => literal("/Helv 0 Tf 0 g"),
    };
    let mut flags = if field.read_only { 1 } else { 0 };
    match &field.kind {
        FixtureKind::Text => dict.set("FT", "Tx"),
        FixtureKind::MultilineText => {
            dict.set("FT", "Tx");
            flags |= 1 << 12;
        }
        FixtureKind::Checkbox => {
            dict.set("FT", "Btn");
            let on = doc.add_object(Stream::new(dictionary! {}, b"q 0 g 2 2 m 8 8 l S Q".to_vec()));
            let mut normal = dictionary! { "Yes" => on };
            if field.off_state {
                let off = doc.add_object(Stream::new(dictionary! {}, b"q 0 G 0 0 10 10 re S Q".to_vec()));
                normal.set("Off", off);
            }
            dict.set("AP", dictionary! { "N" => normal });
            dict.set("V", "Off");
            dict.set("AS", "Off");
        }
        FixtureKind::PushButton => {
            dict.set("FT", "Btn");
            flags |= 1 << 16;
            let face = doc.add_object(Stream::new(dictionary! {}, b"q 0.5 g 0 0 20 20 re f Q".to_vec()));
            dict.set("AP", dictionary! { "N" => face });
        }
        FixtureKind::Dropdown(options) => {
            dict.set("FT", "Ch");
            flags |= 1 << 17;
            let opts: Vec<Object> = options.iter().map(|o| literal(o)).collect();
            dict.set("Opt", opts);
            if let Some(first) = options.first() {
                dict.set("V", literal(first));
                dict.set("I", vec![Object::Integer(0)]);
            }
        }
    }
    dict.set("Ff", flags);
    if let Some(value) = &field.value {
        dict.set("V", literal(value));
    }
    if field.scripted {
        dict.set(
            "AA",
            dictionary! {
                "K" => dictionary! { "S" => "JavaScript", "JS" => literal("AFNumber_Keystroke(0);") },
            },
        );
    }
    dict
}

// One page, one widget per field, /NeedAppearances true and a /CO entry.
pub fn build_form_document(fields: &[FixtureField]) -> Document {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let page_id = doc.new_object_id();

    let mut roots: Vec<Object> = Vec::new();
    let mut annots: Vec<Object> = Vec::new();
    let mut calc_order: Vec<Object> = Vec::new();
    for field in fields {
        let dict = field_dict(&mut doc, page_id, field);
        match &field.parent {
            Some(parent) => {
                let parent_id = doc.new_object_id();
                let mut kid = dict;
                kid.set("Parent", parent_id);
                let kid_id = doc.add_object(kid);
                doc.objects.insert(
                    parent_id,
                    Object::Dictionary(dictionary! {
                        "T" => literal(parent),
                        "Kids" => vec![Object::Reference(kid_id)],
                    }),
                );
                roots.push(parent_id.into());
                annots.push(kid_id.into());
            }
            None => {
                let id = doc.add_object(dict);
                roots.push(id.into());
                annots.push(id.into());
                calc_order.push(id.into());
            }
        }
    }

    doc.objects.insert(
        page_id,
        Object::Dictionary(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Annots" => annots,
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
    let acroform_id = doc.add_object(dictionary! {
        "Fields" => roots,
        "DA" => literal("/Helv 0 Tf 0 g"),
        "DR" => dictionary! { "Font" => dictionary! { "Helv" => font_id } },
        "NeedAppearances" => true,
        "CO" => calc_order,
    });
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
        "AcroForm" => acroform_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

pub fn build_form_pdf(fields: &[FixtureField]) -> Vec<u8> {
    let mut doc = build_form_document(fields);
    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save fixture");
    out
}

pub fn build_encrypted_pdf() -> Vec<u8> {
    let mut doc = build_form_document(&[FixtureField::new("Name", FixtureKind::Text)]);
    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 1,
        "R" => 2,
        "O" => Object::String(vec![0u8; 32], StringFormat::Hexadecimal),
        "U" => Object::String(vec![0u8; 32], StringFormat::Hexadecimal),
        "P" => -44,
    });
    doc.trailer.set("Encrypt", encrypt_id);
    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save fixture");
    out
}

// Some writers inline the security handler instead of referencing it.
pub fn build_inline_encrypted_pdf() -> Vec<u8> {
    let mut doc = build_form_document(&[FixtureField::new("Name", FixtureKind::Text)]);
    doc.trailer.set(
        "Encrypt",
        dictionary! {
            "Filter" => "Standard",
            "V" => 1,
            "R" => 2,
            "P" => -44,
        },
    );
    let mut out = Vec::new();
    doc.save_to(&mut out).expect("save fixture");
    out
}

pub fn tiny_png(width: u32, height: u32, alpha: u8) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 40, alpha]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut out, image::ImageFormat::Png)
        .expect("encode png");
    out.into_inner()
}

pub fn tiny_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([30, 90, 160]));
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut out, image::ImageFormat::Jpeg)
        .expect("encode jpeg");
    out.into_inner()
}
