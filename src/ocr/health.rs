use std::process::Command;

use tracing::{info, warn};

use crate::languages::LanguageRegistry;
use crate::ocr::error::{ConversionError, OcrError};

/// Startup check of the external programs the OCR pipeline shells out to.
///
/// Nothing here blocks start-up; a missing tool only fails the requests
/// that need it.
pub struct ToolHealthChecker;

impl ToolHealthChecker {
    pub fn new() -> Self {
        Self
    }

    pub fn check_tesseract_installation(&self) -> Result<String, OcrError> {
        let output = Command::new("tesseract")
            .arg("--version")
            .output()
            .map_err(|_| OcrError::TesseractNotInstalled)?;

        if !output.status.success() {
            return Err(OcrError::TesseractNotInstalled);
        }

        Ok(first_line(&output.stdout, &output.stderr))
    }

    pub fn get_available_languages(&self) -> Result<Vec<String>, OcrError> {
        let output = Command::new("tesseract")
            .arg("--list-langs")
            .output()
            .map_err(|_| OcrError::TesseractNotInstalled)?;

        if !output.status.success() {
            return Err(OcrError::TesseractNotInstalled);
        }

        let langs_output = String::from_utf8_lossy(&output.stdout);
        let mut languages: Vec<String> = langs_output
            .lines()
            .skip(1) // "List of available languages ..."
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        languages.sort();
        Ok(languages)
    }

    pub fn check_rasterizer(&self) -> Result<String, OcrError> {
        // pdftoppm prints its version on stderr
        let output = Command::new("pdftoppm")
            .arg("-v")
            .output()
            .map_err(|_| OcrError::RasterizerNotInstalled)?;
        Ok(first_line(&output.stdout, &output.stderr))
    }

    pub fn check_converter(&self) -> Result<(), ConversionError> {
        match Command::new("ddjvu").arg("--help").output() {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ConversionError::NotInstalled)
            }
            Err(e) => Err(ConversionError::Io(e)),
        }
    }

    /// Logs one line per tool, plus registry languages Tesseract has no data for.
    pub fn report(&self, registry: &LanguageRegistry) {
        match self.check_tesseract_installation() {
            Ok(version) => info!("OCR engine available: {}", version),
            Err(e) => warn!("{}", e),
        }

        match self.check_rasterizer() {
            Ok(version) => info!("PDF rasterizer available: {}", version),
            Err(e) => warn!("{}", e),
        }

        match self.check_converter() {
            Ok(()) => info!("DjVu converter available: ddjvu"),
            Err(e) => warn!("{}", e),
        }

        if let Ok(installed) = self.get_available_languages() {
            let missing = missing_languages(registry, &installed);
            if !missing.is_empty() {
                warn!(
                    "Tesseract has no traineddata for registry languages: {}",
                    missing.join(", ")
                );
            }
        }
    }
}

impl Default for ToolHealthChecker {
    fn default() -> Self {
        Self::new()
    }
}

fn first_line(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    stdout
        .lines()
        .chain(stderr.lines())
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("Unknown")
        .to_string()
}

fn missing_languages(registry: &LanguageRegistry, installed: &[String]) -> Vec<String> {
    registry
        .list()
        .iter()
        .filter(|entry| !installed.contains(&entry.code))
        .map(|entry| entry.code.clone())
        .collect()
}
