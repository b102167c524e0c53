use std::collections::BTreeMap;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::fonts::{EmbeddedFont, FontChoice};
use super::RenderError;

const FONT_RESOURCE: &str = "F1";

/// Fixed-leading flow layout. Lines are never wrapped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfLayout {
    pub page_width: f32,
    pub page_height: f32,
    pub font_size: f32,
    pub origin_x: f32,
    pub origin_y: f32,
    pub leading: f32,
    pub bottom_margin: f32,
}

impl Default for PdfLayout {
    fn default() -> Self {
        Self {
            page_width: 595.28,
            page_height: 841.89,
            font_size: 14.0,
            origin_x: 40.0,
            origin_y: 800.0,
            leading: 16.8,
            bottom_margin: 40.0,
        }
    }
}

impl PdfLayout {
    /// Baselines that fit between the origin and the bottom margin.
    pub fn lines_per_page(&self) -> usize {
        let span = (self.origin_y - self.bottom_margin).max(0.0);
        (span / self.leading).floor() as usize + 1
    }
}

/// Splits text into pages of at most `lines_per_page` lines. Empty text
/// still yields one (empty) page.
pub fn paginate<'a>(text: &'a str, layout: &PdfLayout) -> Vec<Vec<&'a str>> {
    if text.is_empty() {
        return vec![Vec::new()];
    }

    let lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();

    lines
        .chunks(layout.lines_per_page().max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Lays `text` out into a new PDF set in `font`.
pub fn render_pdf(
    text: &str,
    font: &FontChoice,
    layout: &PdfLayout,
) -> Result<Vec<u8>, RenderError> {
    let pages = paginate(text, layout);
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut encoder = match font {
        FontChoice::Registered(embedded) => TextEncoder::Identity(GlyphEncoder::new(embedded)?),
        FontChoice::Fallback { .. } => TextEncoder::WinAnsi,
    };

    let mut kids = Vec::with_capacity(pages.len());
    let mut contents = Vec::with_capacity(pages.len());
    for lines in &pages {
        let content = page_content(lines, &mut encoder, layout);
        let encoded = content.encode().map_err(pdf_error)?;
        contents.push(doc.add_object(Stream::new(dictionary! {}, encoded)));
    }

    let font_id = match encoder {
        TextEncoder::WinAnsi => doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        }),
        TextEncoder::Identity(glyphs) => glyphs.embed(&mut doc)?,
    };
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { FONT_RESOURCE => font_id },
    });

    for content_id in contents {
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    let pages_dict = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => count,
        "Resources" => resources_id,
        "MediaBox" => vec![
            0.into(),
            0.into(),
            Object::Real(layout.page_width),
            Object::Real(layout.page_height),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(pdf_error)?;
    Ok(bytes)
}

fn page_content(lines: &[&str], encoder: &mut TextEncoder, layout: &PdfLayout) -> Content {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![FONT_RESOURCE.into(), Object::Real(layout.font_size)]),
        Operation::new("TL", vec![Object::Real(layout.leading)]),
        Operation::new("Td", vec![Object::Real(layout.origin_x), Object::Real(layout.origin_y)]),
    ];

    for (index, line) in lines.iter().enumerate() {
        if index > 0 {
            operations.push(Operation::new("T*", vec![]));
        }
        if !line.is_empty() {
            operations.push(Operation::new("Tj", vec![encoder.encode(line)]));
        }
    }
    operations.push(Operation::new("ET", vec![]));

    Content { operations }
}

fn pdf_error<E: std::fmt::Display>(err: E) -> RenderError {
    RenderError::Pdf {
        details: err.to_string(),
    }
}

enum TextEncoder<'f> {
    WinAnsi,
    Identity(GlyphEncoder<'f>),
}

impl TextEncoder<'_> {
    fn encode(&mut self, line: &str) -> Object {
        match self {
            TextEncoder::WinAnsi => Object::String(encode_win_ansi(line), StringFormat::Literal),
            TextEncoder::Identity(glyphs) => {
                Object::String(glyphs.encode(line), StringFormat::Hexadecimal)
            }
        }
    }
}

/// Standard 14 fonts only cover WinAnsi; anything else prints as `?`.
pub fn encode_win_ansi(line: &str) -> Vec<u8> {
    line.chars()
        .map(|c| match c {
            '\t' => b' ',
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            _ => b'?',
        })
        .collect()
}

/// Maps characters to two-byte glyph ids of an embedded TrueType font and
/// remembers what was used for the width and ToUnicode tables.
struct GlyphEncoder<'f> {
    font: &'f EmbeddedFont,
    face: ttf_parser::Face<'f>,
    used: BTreeMap<u16, char>,
}

impl<'f> GlyphEncoder<'f> {
    fn new(font: &'f EmbeddedFont) -> Result<Self, RenderError> {
        Ok(Self {
            face: font.face()?,
            font,
            used: BTreeMap::new(),
        })
    }

    fn encode(&mut self, line: &str) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(line.len() * 2);
        for c in line.chars() {
            let c = if c == '\t' { ' ' } else { c };
            let gid = self.face.glyph_index(c).map(|g| g.0).unwrap_or(0);
            if gid != 0 {
                self.used.entry(gid).or_insert(c);
            }
            bytes.extend_from_slice(&gid.to_be_bytes());
        }
        bytes
    }

    /// Advance width in PDF glyph space
    fn width(&self, gid: u16) -> i64 {
        let advance = self
            .face
            .glyph_hor_advance(ttf_parser::GlyphId(gid))
            .unwrap_or(0) as i64;
        self.scale(advance)
    }

    fn scale(&self, value: i64) -> i64 {
        value * 1000 / self.font.units_per_em.max(1) as i64
    }

    fn embed(self, doc: &mut Document) -> Result<ObjectId, RenderError> {
        let font = self.font;
        let base_font = format!("{}-Regular", font.family);

        let file_id = doc.add_object(Stream::new(
            dictionary! { "Length1" => font.data.len() as i64 },
            font.data.clone(),
        ));

        let [x_min, y_min, x_max, y_max] = font.bbox;
        let descriptor_id = doc.add_object(dictionary! {
            "Type" => "FontDescriptor",
            "FontName" => base_font.as_str(),
            "Flags" => 32,
            "FontBBox" => vec![
                self.scale(x_min as i64).into(),
                self.scale(y_min as i64).into(),
                self.scale(x_max as i64).into(),
                self.scale(y_max as i64).into(),
            ],
            "ItalicAngle" => 0,
            "Ascent" => self.scale(font.ascender as i64),
            "Descent" => self.scale(font.descender as i64),
            "CapHeight" => self.scale(font.cap_height as i64),
            "StemV" => 80,
            "FontFile2" => file_id,
        });

        let mut widths = Vec::with_capacity(self.used.len() * 2);
        for gid in self.used.keys() {
            widths.push(Object::Integer(*gid as i64));
            widths.push(Object::Array(vec![Object::Integer(self.width(*gid))]));
        }

        let cid_font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "BaseFont" => base_font.as_str(),
            "CIDSystemInfo" => dictionary! {
                "Registry" => Object::string_literal("Adobe"),
                "Ordering" => Object::string_literal("Identity"),
                "Supplement" => 0,
            },
            "FontDescriptor" => descriptor_id,
            "DW" => 1000,
            "W" => widths,
            "CIDToGIDMap" => "Identity",
        });

        let to_unicode_id = doc.add_object(Stream::new(
            Dictionary::new(),
            to_unicode_cmap(&self.used).into_bytes(),
        ));

        Ok(doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => base_font.as_str(),
            "Encoding" => "Identity-H",
            "DescendantFonts" => vec![Object::Reference(cid_font_id)],
            "ToUnicode" => to_unicode_id,
        }))
    }
}

fn to_unicode_cmap(used: &BTreeMap<u16, char>) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );

    let entries: Vec<(&u16, &char)> = used.iter().collect();
    // bfchar blocks hold at most 100 entries
    for block in entries.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", block.len()));
        for (gid, c) in block {
            let mut units = [0u16; 2];
            let hex: String = c
                .encode_utf16(&mut units)
                .iter()
                .map(|unit| format!("{:04X}", unit))
                .collect();
            cmap.push_str(&format!("<{:04X}> <{}>\n", gid, hex));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend\n");
    cmap
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::fonts::tests::system_ttf;
    use std::sync::Arc;

    fn fallback() -> FontChoice {
        FontChoice::Fallback {
            reason: "test".to_string(),
        }
    }

    /// Text-showing operands of every page, in order.
    fn shown_strings(pdf: &[u8]) -> Vec<Vec<Vec<u8>>> {
        let doc = Document::load_mem(pdf).unwrap();
        doc.get_pages()
            .values()
            .map(|page_id| {
                let data = doc.get_page_content(*page_id).unwrap();
                Content::decode(&data)
                    .unwrap()
                    .operations
                    .into_iter()
                    .filter(|op| op.operator == "Tj")
                    .filter_map(|op| match op.operands.first() {
                        Some(Object::String(bytes, _)) => Some(bytes.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_default_layout_fits_46_lines() {
        assert_eq!(PdfLayout::default().lines_per_page(), 46);
    }

    #[test]
    fn test_paginate_breaks_on_overflow_without_trailing_page() {
        let layout = PdfLayout::default();
        let text = vec!["line"; 92].join("\n");
        let pages = paginate(&text, &layout);
        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(|p| p.len() == 46));

        let text = vec!["line"; 93].join("\n");
        let pages = paginate(&text, &layout);
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[2], vec!["line"]);
    }

    #[test]
    fn test_paginate_empty_text() {
        let pages = paginate("", &PdfLayout::default());
        assert_eq!(pages, vec![Vec::<&str>::new()]);
    }

    #[test]
    fn test_paginate_strips_carriage_returns() {
        let pages = paginate("a\r\nb", &PdfLayout::default());
        assert_eq!(pages, vec![vec!["a", "b"]]);
    }

    #[test]
    fn test_win_ansi_replaces_unencodable() {
        assert_eq!(encode_win_ansi("Café – ok"), b"Caf\xe9 \x96 ok".to_vec());
        assert_eq!(encode_win_ansi("नमस्ते"), b"??????".to_vec());
    }

    #[test]
    fn test_render_helvetica_pages() {
        let text = (1..=50).map(|i| format!("Line {}", i)).collect::<Vec<_>>().join("\n");
        let pdf = render_pdf(&text, &fallback(), &PdfLayout::default()).unwrap();

        let pages = shown_strings(&pdf);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].len(), 46);
        assert_eq!(pages[0][0], b"Line 1".to_vec());
        assert_eq!(pages[1].last().unwrap(), &b"Line 50".to_vec());
    }

    #[test]
    fn test_render_empty_text_is_one_blank_page() {
        let pdf = render_pdf("", &fallback(), &PdfLayout::default()).unwrap();
        let pages = shown_strings(&pdf);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].is_empty());
    }

    #[test]
    fn test_render_page_break_marker_text() {
        let text = format!("first{}second", crate::ocr::PAGE_BREAK);
        let pdf = render_pdf(&text, &fallback(), &PdfLayout::default()).unwrap();
        let strings: Vec<Vec<u8>> = shown_strings(&pdf).into_iter().flatten().collect();
        assert!(strings.contains(&b"--- Page Break ---".to_vec()));
    }

    #[test]
    fn test_render_embedded_font() {
        let Some(data) = system_ttf() else {
            eprintln!("no system TrueType font, skipping");
            return;
        };
        let font = Arc::new(EmbeddedFont::from_bytes("TestSans", data).unwrap());
        let pdf = render_pdf("AB", &FontChoice::Registered(font), &PdfLayout::default()).unwrap();

        let doc = Document::load_mem(&pdf).unwrap();
        assert_eq!(doc.get_pages().len(), 1);

        let type0 = doc.objects.values().any(|obj| {
            obj.as_dict()
                .ok()
                .and_then(|d| d.get(b"Subtype").ok())
                .and_then(|s| s.as_name().ok())
                == Some(b"Type0".as_slice())
        });
        assert!(type0);

        let strings = shown_strings(&pdf);
        // two glyphs, two bytes each
        assert_eq!(strings[0][0].len(), 4);
    }

    #[test]
    fn test_to_unicode_cmap_entries() {
        let used = BTreeMap::from([(36u16, 'A'), (1234u16, 'क')]);
        let cmap = to_unicode_cmap(&used);
        assert!(cmap.contains("2 beginbfchar"));
        assert!(cmap.contains("<0024> <0041>"));
        assert!(cmap.contains("<04D2> <0915>"));
    }
}
