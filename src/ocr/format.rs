use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{error, info};

use crate::errors::SourceError;
use crate::ocr::error::ConversionError;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tiff"];

/// Every extension an upload or download may carry
pub const ALLOWED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tiff", "pdf", "djvu"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Image,
    Pdf,
    Djvu,
}

impl DocumentKind {
    /// Case-insensitive suffix match; `None` means the file must be rejected
    pub fn from_filename(filename: &str) -> Option<Self> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())?
            .to_lowercase();

        match extension.as_str() {
            ext if IMAGE_EXTENSIONS.contains(&ext) => Some(DocumentKind::Image),
            "pdf" => Some(DocumentKind::Pdf),
            "djvu" => Some(DocumentKind::Djvu),
            _ => None,
        }
    }
}

pub fn classify(filename: &str) -> Result<DocumentKind, SourceError> {
    DocumentKind::from_filename(filename).ok_or_else(|| SourceError::unsupported(filename))
}

/// Turns a DjVu document into a PDF the rasterizer can read.
pub trait DocumentConverter: Send + Sync {
    /// Writes the PDF somewhere inside `output_dir` and returns its path.
    fn convert(&self, djvu_path: &Path, output_dir: &Path) -> Result<PathBuf, ConversionError>;
}

/// Converter backed by djvulibre's `ddjvu` binary
#[derive(Debug, Clone)]
pub struct DdjvuConverter {
    binary: String,
}

impl DdjvuConverter {
    pub fn new() -> Self {
        Self {
            binary: "ddjvu".to_string(),
        }
    }

    pub fn with_binary<S: Into<String>>(binary: S) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for DdjvuConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentConverter for DdjvuConverter {
    fn convert(&self, djvu_path: &Path, output_dir: &Path) -> Result<PathBuf, ConversionError> {
        let output_path = output_dir.join("output.pdf");
        info!("Converting DjVu {} to PDF", djvu_path.display());

        let output = Command::new(&self.binary)
            .arg("-format=pdf")
            .arg(djvu_path)
            .arg(&output_path)
            .output();

        match output {
            Ok(output) if output.status.success() => Ok(output_path),
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                error!(
                    "Error converting DjVu to PDF ({}): {}",
                    output.status,
                    stderr.trim()
                );
                Err(ConversionError::Failed {
                    details: format!("{}: {}", output.status, stderr.trim()),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                error!("{} command not found. Please install djvulibre-bin", self.binary);
                Err(ConversionError::NotInstalled)
            }
            Err(e) => Err(ConversionError::Io(e)),
        }
    }
}
