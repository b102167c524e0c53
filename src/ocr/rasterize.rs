use std::path::{Path, PathBuf};
use std::process::Command;

use image::DynamicImage;
use tracing::debug;

use crate::ocr::error::OcrError;
use crate::ocr::PageWindow;

/// Renders a window of PDF pages to images.
pub trait Rasterizer: Send + Sync {
    /// Returns one image per page of `window`, in page order. Pages outside
    /// the window must not be rendered.
    fn rasterize(
        &self,
        pdf_path: &Path,
        window: PageWindow,
        dpi: u32,
    ) -> Result<Vec<DynamicImage>, OcrError>;
}

/// Rasterizer backed by poppler's `pdftoppm`
#[derive(Debug, Clone, Default)]
pub struct PdftoppmRasterizer;

impl PdftoppmRasterizer {
    pub fn new() -> Self {
        Self
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn rasterize(
        &self,
        pdf_path: &Path,
        window: PageWindow,
        dpi: u32,
    ) -> Result<Vec<DynamicImage>, OcrError> {
        if window.is_empty() {
            return Ok(Vec::new());
        }

        let output_dir = tempfile::tempdir()?;
        let output_prefix = output_dir.path().join("page");
        let (first, last) = (window.start.to_string(), window.end.to_string());

        let output = Command::new("pdftoppm")
            .args(["-png", "-r", &dpi.to_string(), "-f", &first, "-l", &last])
            .arg(pdf_path)
            .arg(&output_prefix)
            .output();

        match output {
            Ok(output) if output.status.success() => {}
            Ok(output) => {
                return Err(OcrError::RasterizationFailed {
                    start: window.start,
                    end: window.end,
                    details: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(OcrError::RasterizerNotInstalled)
            }
            Err(e) => return Err(OcrError::Io(e)),
        }

        let pages = rendered_pages(output_dir.path())?;
        debug!(
            "pdftoppm rendered {} page(s) for window {}-{}",
            pages.len(),
            window.start,
            window.end
        );

        pages
            .iter()
            .map(|path| {
                image::open(path).map_err(|e| OcrError::InvalidImageFormat {
                    details: format!("{}: {}", path.display(), e),
                })
            })
            .collect()
    }
}

/// PNGs written by pdftoppm, in page order.
///
/// pdftoppm names files like page-01.png, page-02.png; the padding width is
/// the same for every file of one run, so a name sort is a page sort.
fn rendered_pages(dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
    let mut pages: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("png"))
        .collect();
    pages.sort();
    Ok(pages)
}

/// Page count straight from the PDF structure, without rendering anything.
pub fn count_pages(pdf_path: &Path) -> Result<u64, OcrError> {
    let document = lopdf::Document::load(pdf_path).map_err(|e| OcrError::PdfUnreadable {
        details: e.to_string(),
    })?;
    Ok(document.get_pages().len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_rendered_pages_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        for name in ["page-12.png", "page-10.png", "page-11.png", "notes.txt"] {
            std::fs::write(temp.path().join(name), b"x").unwrap();
        }

        let pages = rendered_pages(temp.path()).unwrap();
        let names: Vec<_> = pages
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["page-10.png", "page-11.png", "page-12.png"]);
    }

    #[test]
    fn test_count_pages_rejects_garbage() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.pdf");
        std::fs::write(&path, b"definitely not a pdf").unwrap();

        assert!(matches!(
            count_pages(&path),
            Err(OcrError::PdfUnreadable { .. })
        ));
    }

    #[test]
    fn test_empty_window_skips_pdftoppm() {
        let temp = TempDir::new().unwrap();
        let window = PageWindow::new(4, 5, 12);
        let images = PdftoppmRasterizer::new()
            .rasterize(&temp.path().join("missing.pdf"), window, 300)
            .unwrap();
        assert!(images.is_empty());
    }
}
