use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use super::RenderError;

/// Per-script fonts, keyed by OCR language code
pub const FONT_TABLE: &[(&str, &str)] = &[
    ("hin", "NotoSansDevanagari"),
    ("mar", "NotoSansDevanagari"),
    ("ben", "NotoSansBengali"),
    ("guj", "NotoSansGujarati"),
    ("kan", "NotoSansKannada"),
    ("mal", "NotoSansMalayalam"),
    ("ori", "NotoSansOriya"),
    ("tam", "NotoSansTamil"),
    ("tel", "NotoSansTelugu"),
];

/// A TrueType font ready to be embedded into generated PDFs.
///
/// Metrics are in font units; the renderer scales them to the PDF 1000-unit
/// glyph space.
#[derive(Debug)]
pub struct EmbeddedFont {
    pub family: String,
    pub data: Vec<u8>,
    pub units_per_em: u16,
    pub ascender: i16,
    pub descender: i16,
    pub cap_height: i16,
    pub bbox: [i16; 4],
}

impl EmbeddedFont {
    pub fn from_bytes(family: &str, data: Vec<u8>) -> Result<Self, RenderError> {
        let face = ttf_parser::Face::parse(&data, 0).map_err(|e| RenderError::Font {
            family: family.to_string(),
            details: e.to_string(),
        })?;

        let bbox = face.global_bounding_box();
        let units_per_em = face.units_per_em();
        let ascender = face.ascender();
        let descender = face.descender();
        let cap_height = face.capital_height().unwrap_or(ascender);

        Ok(Self {
            family: family.to_string(),
            units_per_em,
            ascender,
            descender,
            cap_height,
            bbox: [bbox.x_min, bbox.y_min, bbox.x_max, bbox.y_max],
            data,
        })
    }

    pub fn from_file(family: &str, path: &Path) -> Result<Self, RenderError> {
        let data = std::fs::read(path).map_err(|e| RenderError::Font {
            family: family.to_string(),
            details: format!("{}: {}", path.display(), e),
        })?;
        Self::from_bytes(family, data)
    }

    pub fn face(&self) -> Result<ttf_parser::Face<'_>, RenderError> {
        ttf_parser::Face::parse(&self.data, 0).map_err(|e| RenderError::Font {
            family: self.family.clone(),
            details: e.to_string(),
        })
    }
}

/// Which font a PDF for a given language is set in
#[derive(Debug, Clone)]
pub enum FontChoice {
    Registered(Arc<EmbeddedFont>),
    /// Built-in Helvetica
    Fallback { reason: String },
}

impl FontChoice {
    pub fn is_fallback(&self) -> bool {
        matches!(self, FontChoice::Fallback { .. })
    }
}

/// Fonts found at startup. Never mutated afterwards.
#[derive(Debug, Default)]
pub struct FontRegistry {
    fonts: HashMap<String, Arc<EmbeddedFont>>,
}

impl FontRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Loads `<Family>-Regular.ttf` for every family in [`FONT_TABLE`].
    /// Missing or broken files are logged and left unregistered.
    pub fn load<P: AsRef<Path>>(fonts_dir: P) -> Self {
        let fonts_dir = fonts_dir.as_ref();
        let mut fonts = HashMap::new();

        for (_, family) in FONT_TABLE {
            if fonts.contains_key(*family) {
                continue;
            }
            let path = fonts_dir.join(format!("{}-Regular.ttf", family));
            match EmbeddedFont::from_file(family, &path) {
                Ok(font) => {
                    info!("Registered font {} from {}", family, path.display());
                    fonts.insert(family.to_string(), Arc::new(font));
                }
                Err(e) => warn!("Font {} unavailable: {}", family, e),
            }
        }

        Self { fonts }
    }

    pub fn len(&self) -> usize {
        self.fonts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fonts.is_empty()
    }

    pub fn lookup(&self, language: &str) -> FontChoice {
        let Some((_, family)) = FONT_TABLE.iter().find(|(code, _)| *code == language) else {
            return FontChoice::Fallback {
                reason: format!("no script font for '{}'", language),
            };
        };

        match self.fonts.get(*family) {
            Some(font) => FontChoice::Registered(Arc::clone(font)),
            None => {
                warn!(
                    "Font {} for '{}' is not registered, falling back to Helvetica",
                    family, language
                );
                FontChoice::Fallback {
                    reason: format!("{} is not registered", family),
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    /// A system TrueType font to exercise embedding; tests skip when absent.
    pub(crate) fn system_ttf() -> Option<Vec<u8>> {
        [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        ]
        .iter()
        .find_map(|p| std::fs::read(p).ok())
    }

    #[test]
    fn test_english_uses_fallback() {
        let registry = FontRegistry::empty();
        match registry.lookup("eng") {
            FontChoice::Fallback { reason } => assert!(reason.contains("eng")),
            other => panic!("expected fallback, got {:?}", other),
        }
    }

    #[test]
    fn test_unregistered_script_font_falls_back() {
        let temp = TempDir::new().unwrap();
        let registry = FontRegistry::load(temp.path());

        assert!(registry.is_empty());
        match registry.lookup("hin") {
            FontChoice::Fallback { reason } => assert!(reason.contains("NotoSansDevanagari")),
            other => panic!("expected fallback, got {:?}", other),
        }
    }

    #[test]
    fn test_broken_font_file_is_skipped() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("NotoSansTamil-Regular.ttf"), b"not a font").unwrap();

        let registry = FontRegistry::load(temp.path());
        assert!(registry.lookup("tam").is_fallback());
    }

    #[test]
    fn test_registered_font_is_shared_between_languages() {
        let Some(data) = system_ttf() else {
            eprintln!("no system TrueType font, skipping");
            return;
        };
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("NotoSansDevanagari-Regular.ttf"), data).unwrap();

        let registry = FontRegistry::load(temp.path());
        assert_eq!(registry.len(), 1);

        let (FontChoice::Registered(hin), FontChoice::Registered(mar)) =
            (registry.lookup("hin"), registry.lookup("mar"))
        else {
            panic!("expected registered fonts");
        };
        assert!(Arc::ptr_eq(&hin, &mar));
        assert!(hin.units_per_em > 0);
    }
}
