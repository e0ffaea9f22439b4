//! Deterministic PDF assembly.
//!
//! Pages share one resource dictionary with the two built-in Helvetica
//! fonts in WinAnsi encoding. No Info dictionary, no document id, no
//! compression: the output bytes are a function of the content alone.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

pub const REGULAR_FONT: &str = "F1";
pub const BOLD_FONT: &str = "F2";

pub struct Pdf {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    width: f32,
    height: f32,
}

impl Pdf {
    pub fn new(width: f32, height: f32) -> Self {
        let mut doc = Document::with_version("1.4");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
            width,
            height,
        }
    }

    pub fn add_page(&mut self, content: Content) -> Result<(), lopdf::Error> {
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
        });
        self.page_ids.push(page_id);
        Ok(())
    }

    pub fn finish(mut self) -> Result<Vec<u8>, lopdf::Error> {
        let regular = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold = self.doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = self.doc.add_object(dictionary! {
            "Font" => dictionary! {
                REGULAR_FONT => regular,
                BOLD_FONT => bold,
            },
        });

        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::Reference(*id)).collect();
        let count = self.page_ids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![
                    0f32.into(),
                    0f32.into(),
                    self.width.into(),
                    self.height.into(),
                ],
            }),
        );

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        self.doc.save_to(&mut out)?;
        Ok(out)
    }
}

/// One text run at (x, y), baseline coordinates.
pub fn text(font: &str, size: f32, x: f32, y: f32, encoded: Vec<u8>) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![font.into(), size.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![Object::String(encoded, StringFormat::Literal)]),
        Operation::new("ET", vec![]),
    ]
}

/// A horizontal rule from x1 to x2 at height y.
pub fn hline(x1: f32, y: f32, x2: f32) -> Vec<Operation> {
    vec![
        Operation::new("w", vec![0.5f32.into()]),
        Operation::new("m", vec![x1.into(), y.into()]),
        Operation::new("l", vec![x2.into(), y.into()]),
        Operation::new("S", vec![]),
    ]
}

/// Encode text for the WinAnsi (CP1252) fonts. `Err` carries the first
/// character with no code point in the repertoire.
pub fn encode_win_ansi(text: &str) -> Result<Vec<u8>, char> {
    text.chars().map(|ch| win_ansi_byte(ch).ok_or(ch)).collect()
}

fn win_ansi_byte(ch: char) -> Option<u8> {
    match ch {
        ' '..='~' => Some(ch as u8),
        // Latin-1 block maps 1:1.
        '\u{00A0}'..='\u{00FF}' => Some(ch as u32 as u8),
        // CP1252 repurposes 0x80..0x9F.
        '\u{20AC}' => Some(0x80), // euro sign
        '\u{201A}' => Some(0x82),
        '\u{0192}' => Some(0x83),
        '\u{201E}' => Some(0x84),
        '\u{2026}' => Some(0x85), // horizontal ellipsis
        '\u{2020}' => Some(0x86),
        '\u{2021}' => Some(0x87),
        '\u{02C6}' => Some(0x88),
        '\u{2030}' => Some(0x89),
        '\u{0160}' => Some(0x8A),
        '\u{2039}' => Some(0x8B),
        '\u{0152}' => Some(0x8C),
        '\u{017D}' => Some(0x8E),
        '\u{2018}' => Some(0x91),
        '\u{2019}' => Some(0x92),
        '\u{201C}' => Some(0x93),
        '\u{201D}' => Some(0x94),
        '\u{2022}' => Some(0x95), // bullet
        '\u{2013}' => Some(0x96), // en dash
        '\u{2014}' => Some(0x97), // em dash
        '\u{02DC}' => Some(0x98),
        '\u{2122}' => Some(0x99), // trade mark
        '\u{0161}' => Some(0x9A),
        '\u{203A}' => Some(0x9B),
        '\u{0153}' => Some(0x9C),
        '\u{017E}' => Some(0x9E),
        '\u{0178}' => Some(0x9F),
        _ => None,
    }
}
