#![allow(dead_code)]

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, Response};
use axum::Router;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use lopdf::{dictionary, Object};
use tempfile::TempDir;

use wikisource_ocr::{
    build_router,
    config::{Config, WikiConfig},
    languages::LanguageRegistry,
    ocr::{
        error::{ConversionError, OcrError},
        format::DocumentConverter,
        engine::TextRecognizer,
        rasterize::Rasterizer,
        OcrService, PageWindow,
    },
    render::FontRegistry,
    AppState,
};

pub const BOUNDARY: &str = "----wikisource-ocr-test-boundary";

/// Rasterizes every page to a 1x1 image whose pixel is the page number
pub struct PageNumberRasterizer;

impl Rasterizer for PageNumberRasterizer {
    fn rasterize(
        &self,
        _pdf_path: &Path,
        window: PageWindow,
        _dpi: u32,
    ) -> Result<Vec<DynamicImage>, OcrError> {
        Ok((window.start..=window.end)
            .map(|page| DynamicImage::ImageLuma8(GrayImage::from_pixel(1, 1, Luma([page as u8]))))
            .collect())
    }
}

/// Reads the planted page number back as text
pub struct PixelRecognizer;

impl TextRecognizer for PixelRecognizer {
    fn recognize(&self, page: &GrayImage, language: &str) -> Result<String, OcrError> {
        if language == "xyz" {
            return Err(OcrError::EngineFailed {
                language: language.to_string(),
                details: "Failed loading language 'xyz'".to_string(),
            });
        }
        let Luma([value]) = *page.get_pixel(0, 0);
        Ok(format!("page {}", value))
    }
}

/// Stands in for ddjvu by writing a PDF with a fixed page count
pub struct FixtureConverter {
    pub pages: usize,
}

impl DocumentConverter for FixtureConverter {
    fn convert(&self, _djvu_path: &Path, output_dir: &Path) -> Result<PathBuf, ConversionError> {
        let output = output_dir.join("output.pdf");
        std::fs::write(&output, pdf_bytes(self.pages))?;
        Ok(output)
    }
}

pub struct BrokenConverter;

impl DocumentConverter for BrokenConverter {
    fn convert(&self, _djvu_path: &Path, _output_dir: &Path) -> Result<PathBuf, ConversionError> {
        Err(ConversionError::Failed {
            details: "ddjvu: corrupted file".to_string(),
        })
    }
}

pub struct TestContext {
    pub app: Router,
    pub upload_dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with(|_| {}, Arc::new(FixtureConverter { pages: 7 }))
    }

    pub fn with_converter(converter: Arc<dyn DocumentConverter>) -> Self {
        Self::with(|_| {}, converter)
    }

    pub fn with_config(customize: impl FnOnce(&mut Config)) -> Self {
        Self::with(customize, Arc::new(FixtureConverter { pages: 7 }))
    }

    fn with(customize: impl FnOnce(&mut Config), converter: Arc<dyn DocumentConverter>) -> Self {
        let upload_dir = TempDir::new().expect("Failed to create upload directory");
        let mut config = Config {
            upload_path: upload_dir.path().to_string_lossy().to_string(),
            download_timeout_seconds: 5,
            wiki: WikiConfig {
                wikisource_hosts: vec!["127.0.0.1".to_string()],
                asset_host: "127.0.0.1".to_string(),
                ..WikiConfig::default()
            },
            ..Config::default()
        };
        customize(&mut config);

        let languages_path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/languages.json");
        let languages = LanguageRegistry::load(&languages_path);
        let ocr = OcrService::new(
            Arc::new(PageNumberRasterizer),
            Arc::new(PixelRecognizer),
            converter,
            config.ocr_dpi,
        );

        let state = AppState::with_registries(config, languages, FontRegistry::empty(), ocr)
            .expect("Failed to build state");

        Self {
            app: build_router(Arc::new(state)),
            upload_dir,
        }
    }

    pub fn uploads_left(&self) -> usize {
        std::fs::read_dir(self.upload_dir.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

/// Minimal PDF with `page_count` empty A4 pages
pub fn pdf_bytes(page_count: usize) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = (0..page_count)
        .map(|_| {
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            })
            .into()
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("Failed to write fixture PDF");
    bytes
}

/// 1x1 grayscale PNG with the given pixel value
pub fn png_bytes(value: u8) -> Vec<u8> {
    let image = DynamicImage::ImageLuma8(GrayImage::from_pixel(1, 1, Luma([value])));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("Failed to encode fixture PNG");
    bytes.into_inner()
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

pub fn multipart_request(uri: &str, parts: &[Part]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                        name, value
                    )
                    .as_bytes(),
                );
            }
            Part::File(name, filename, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, filename
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .expect("Failed to build multipart request")
}

pub fn form_request(uri: &str, fields: &[(&str, &str)]) -> Request<Body> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish();

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .expect("Failed to build form request")
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).expect("Body is not JSON")
}
