use crate::acroform::{FieldKind, FormField, dict_mut, widget_is_hidden, widget_rect};
use base64::Engine;
use image::GenericImageView;
use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortraitFormat {
    Png,
    Jpeg,
}

impl PortraitFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "png" => Some(PortraitFormat::Png),
            "jpg" | "jpeg" => Some(PortraitFormat::Jpeg),
            _ => None,
        }
    }

    fn from_mime(mime: &str) -> Option<Self> {
        if mime.contains("png") {
            Some(PortraitFormat::Png)
        } else if mime.contains("jpeg") || mime.contains("jpg") {
            Some(PortraitFormat::Jpeg)
        } else {
            None
        }
    }

    fn image_format(self) -> image::ImageFormat {
        match self {
            PortraitFormat::Png => image::ImageFormat::Png,
            PortraitFormat::Jpeg => image::ImageFormat::Jpeg,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PortraitError {
    #[error("unsupported portrait format `{0}` (PNG or JPEG only)")]
    UnsupportedFormat(String),
    #[error("portrait could not be decoded: {0}")]
    Decode(String),
    #[error("portrait could not be read: {0}")]
    Read(String),
    #[error("template has no portrait field")]
    NoTargetField,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortraitSource {
    pub bytes: Vec<u8>,
    pub extension: String,
}

impl PortraitSource {
    pub fn from_bytes(bytes: Vec<u8>, extension: impl Into<String>) -> Self {
        Self {
            bytes,
            extension: extension.into(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, PortraitError> {
        let bytes = std::fs::read(path).map_err(|err| PortraitError::Read(err.to_string()))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Self { bytes, extension })
    }

    pub fn from_data_uri(uri: &str) -> Result<Self, PortraitError> {
        let Some((header, payload)) = uri.strip_prefix("data:").and_then(|r| r.split_once(','))
        else {
            return Err(PortraitError::Read("not a data URI".to_string()));
        };
        let mime = header.split(';').next().unwrap_or_default();
        let format = PortraitFormat::from_mime(mime)
            .ok_or_else(|| PortraitError::UnsupportedFormat(mime.to_string()))?;
        let bytes = if header.contains("base64") {
            base64::engine::general_purpose::STANDARD
                .decode(payload.trim())
                .map_err(|err| PortraitError::Decode(err.to_string()))?
        } else {
            payload.as_bytes().to_vec()
        };
        let extension = match format {
            PortraitFormat::Png => "png",
            PortraitFormat::Jpeg => "jpg",
        };
        Ok(Self::from_bytes(bytes, extension))
    }

    pub fn format(&self) -> Option<PortraitFormat> {
        PortraitFormat::from_extension(&self.extension)
    }
}

struct DecodedImage {
    width: u32,
    height: u32,
    color_space: &'static str,
    filter: &'static str,
    data: Vec<u8>,
    alpha: Option<Vec<u8>>,
}

fn flate_compress(data: &[u8]) -> Vec<u8> {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    let _ = encoder.write_all(data);
    encoder.finish().unwrap_or_default()
}

fn decode_portrait(source: &PortraitSource) -> Result<DecodedImage, PortraitError> {
    let format = source
        .format()
        .ok_or_else(|| PortraitError::UnsupportedFormat(source.extension.clone()))?;
    let decoded = image::load_from_memory_with_format(&source.bytes, format.image_format())
        .map_err(|err| PortraitError::Decode(err.to_string()))?;
    let (width, height) = decoded.dimensions();

    if format == PortraitFormat::Jpeg {
        let color_space = match decoded.color() {
            image::ColorType::L8 | image::ColorType::La8 => "DeviceGray",
            _ => "DeviceRGB",
        };
        return Ok(DecodedImage {
            width,
            height,
            color_space,
            filter: "DCTDecode",
            data: source.bytes.clone(),
            alpha: None,
        });
    }

    let rgba = decoded.to_rgba8();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    let mut has_alpha = false;
    for pixel in rgba.pixels() {
        let [r, g, b, a] = pixel.0;
        has_alpha |= a != 255;
        rgb.extend_from_slice(&[r, g, b]);
        alpha.push(a);
    }
    Ok(DecodedImage {
        width,
        height,
        color_space: "DeviceRGB",
        filter: "FlateDecode",
        data: flate_compress(&rgb),
        alpha: has_alpha.then(|| flate_compress(&alpha)),
    })
}

fn add_image_xobject(doc: &mut Document, image: DecodedImage) -> ObjectId {
    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => image.width as i64,
        "Height" => image.height as i64,
        "ColorSpace" => image.color_space,
        "BitsPerComponent" => 8,
        "Filter" => image.filter,
    };
    if let Some(alpha) = image.alpha {
        let smask = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => image.width as i64,
                "Height" => image.height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
                "Filter" => "FlateDecode",
            },
            alpha,
        ));
        dict.set("SMask", smask);
    }
    let mut stream = Stream::new(dict, image.data);
    stream.allows_compression = false;
    doc.add_object(stream)
}

// (w, h, x, y)
fn fit_centered(img_w: f32, img_h: f32, box_w: f32, box_h: f32) -> (f32, f32, f32, f32) {
    let scale = (box_w / img_w).min(box_h / img_h);
    let (w, h) = (img_w * scale, img_h * scale);
    (w, h, (box_w - w) / 2.0, (box_h - h) / 2.0)
}

fn target_field<'a>(fields: &'a [FormField], candidates: &[String]) -> Option<&'a FormField> {
    candidates.iter().find_map(|candidate| {
        fields
            .iter()
            .find(|f| &f.name == candidate && f.kind == FieldKind::PushButton)
    })
}

pub fn embed_portrait(
    doc: &mut Document,
    fields: &[FormField],
    source: &PortraitSource,
    candidates: &[String],
) -> Result<String, PortraitError> {
    let field = target_field(fields, candidates).ok_or(PortraitError::NoTargetField)?;
    let widgets: Vec<(ObjectId, [f32; 4])> = field
        .widgets
        .iter()
        .filter(|w| !widget_is_hidden(doc, **w))
        .filter_map(|w| Some((*w, widget_rect(doc, *w)?)))
        .collect();
    if widgets.is_empty() {
        return Err(PortraitError::NoTargetField);
    }

    let decoded = decode_portrait(source)?;
    let (img_w, img_h) = (decoded.width as f32, decoded.height as f32);
    let image_id = add_image_xobject(doc, decoded);

    for (widget, [x1, y1, x2, y2]) in widgets {
        let (box_w, box_h) = (x2 - x1, y2 - y1);
        let (w, h, x, y) = fit_centered(img_w, img_h, box_w, box_h);
        let content = format!("q {w:.3} 0 0 {h:.3} {x:.3} {y:.3} cm /Portrait Do Q");
        let face = doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), Object::Real(box_w), Object::Real(box_h)],
                "Resources" => dictionary! {
                    "XObject" => dictionary! { "Portrait" => image_id },
                },
            },
            content.into_bytes(),
        ));
        if let Some(dict) = dict_mut(doc, widget) {
            dict.set("AP", dictionary! { "N" => face });
            let mut mk = match dict.get(b"MK") {
                Ok(Object::Dictionary(mk)) => mk.clone(),
                _ => lopdf::Dictionary::new(),
            };
            mk.set("I", face);
            dict.set("MK", mk);
        }
    }
    Ok(field.name.clone())
}
