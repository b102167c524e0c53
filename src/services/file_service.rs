use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tokio::fs;
use tracing::{debug, warn};
use url::Url;

use crate::errors::SourceError;
use crate::ocr::format::ALLOWED_EXTENSIONS;

/// Stores uploads under a server-controlled directory.
#[derive(Clone, Debug)]
pub struct FileService {
    upload_path: PathBuf,
}

impl FileService {
    pub fn new<P: Into<PathBuf>>(upload_path: P) -> Self {
        Self {
            upload_path: upload_path.into(),
        }
    }

    pub fn upload_path(&self) -> &Path {
        &self.upload_path
    }

    /// Writes an upload under its sanitized name. Two requests uploading the
    /// same name at once overwrite each other.
    pub async fn save_upload(
        &self,
        filename: &str,
        data: &[u8],
    ) -> Result<StoredUpload, SourceError> {
        let sanitized = sanitize_filename(filename);
        if !is_allowed_file_type(&sanitized) {
            return Err(SourceError::unsupported(filename));
        }

        fs::create_dir_all(&self.upload_path).await?;
        let file_path = self.upload_path.join(&sanitized);
        fs::write(&file_path, data).await?;
        debug!("Stored upload {} ({} bytes)", file_path.display(), data.len());

        Ok(StoredUpload {
            filename: sanitized,
            path: file_path,
        })
    }
}

/// An upload on disk; the file is removed when this is dropped.
#[derive(Debug)]
pub struct StoredUpload {
    filename: String,
    path: PathBuf,
}

impl StoredUpload {
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoredUpload {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove upload {}: {}", self.path.display(), e);
            }
        }
    }
}

pub fn is_allowed_file_type(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Reduces a client-supplied name to a safe single path component: path
/// parts are dropped, whitespace becomes `_`, anything outside
/// `[A-Za-z0-9_.-]` is removed, and leading/trailing `.`/`_` are trimmed.
pub fn sanitize_filename(filename: &str) -> String {
    static UNSAFE: OnceLock<Regex> = OnceLock::new();
    let unsafe_chars = UNSAFE.get_or_init(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("valid regex"));

    let base = filename.rsplit(['/', '\\']).next().unwrap_or_default();
    let joined = base.split_whitespace().collect::<Vec<_>>().join("_");
    unsafe_chars
        .replace_all(&joined, "")
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

/// Last path segment of a URL, ignoring query and fragment.
pub fn filename_from_url(url: &Url) -> Option<String> {
    url.path_segments()?
        .next_back()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_file_service() -> (FileService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let service = FileService::new(temp_dir.path().join("uploads"));
        (service, temp_dir)
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("My cool scan.png"), "My_cool_scan.png");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\page 1.pdf"), "page_1.pdf");
        assert_eq!(sanitize_filename("..hidden.djvu"), "hidden.djvu");
        assert_eq!(sanitize_filename("बंगाल.pdf"), "pdf");
        assert_eq!(sanitize_filename(""), "");
    }

    #[test]
    fn test_allowed_file_types() {
        assert!(is_allowed_file_type("book.PDF"));
        assert!(is_allowed_file_type("scan.jpeg"));
        assert!(is_allowed_file_type("book.djvu"));
        assert!(!is_allowed_file_type("notes.txt"));
        assert!(!is_allowed_file_type("pdf"));
    }

    #[test]
    fn test_filename_from_url() {
        let url =
            Url::parse("https://upload.wikimedia.org/wikipedia/commons/a/ab/Book.djvu?download=1")
                .unwrap();
        assert_eq!(filename_from_url(&url).as_deref(), Some("Book.djvu"));

        let url = Url::parse("https://example.org/").unwrap();
        assert_eq!(filename_from_url(&url), None);
    }

    #[tokio::test]
    async fn test_save_upload_and_cleanup_on_drop() {
        let (service, _temp_dir) = create_test_file_service();

        let stored = service.save_upload("My Scan.png", b"png bytes").await.unwrap();
        assert_eq!(stored.filename(), "My_Scan.png");
        assert_eq!(std::fs::read(stored.path()).unwrap(), b"png bytes");

        let path = stored.path().to_path_buf();
        drop(stored);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_disallowed_upload_writes_nothing() {
        let (service, _temp_dir) = create_test_file_service();

        let result = service.save_upload("notes.txt", b"hello").await;
        assert!(matches!(result, Err(SourceError::UnsupportedType { .. })));
        let upload_dir = service.upload_path();
        assert!(!upload_dir.exists() || std::fs::read_dir(upload_dir).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn test_name_that_sanitizes_away_is_rejected() {
        let (service, _temp_dir) = create_test_file_service();

        let result = service.save_upload("../.png", b"x").await;
        assert!(matches!(result, Err(SourceError::UnsupportedType { .. })));
    }
}
