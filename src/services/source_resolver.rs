use std::path::Path;
use std::time::Duration;

use axum::body::Bytes;
use futures_util::StreamExt;
use reqwest::Client;
use tempfile::TempPath;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use url::Url;

use crate::config::{Config, WikiConfig};
use crate::errors::SourceError;
use crate::ocr::format::{classify, DocumentKind};
use crate::services::commons_auth::{
    AnonymousReason, CommonsAuthenticator, SessionOutcome, USER_AGENT,
};
use crate::services::file_service::{
    filename_from_url, is_allowed_file_type, FileService, StoredUpload,
};
use crate::services::wikisource::{extract_direct_file_url, host_matches_any, is_file_page};

/// A file part of an OCR request
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Bytes,
}

/// Where the document of one request comes from
#[derive(Debug, Clone)]
pub enum SourceInput {
    Upload(UploadedFile),
    Url(String),
}

impl SourceInput {
    /// Exactly one of `file` and `url` must be present.
    pub fn from_parts(
        file: Option<UploadedFile>,
        url: Option<String>,
    ) -> Result<Self, SourceError> {
        match (file, url) {
            (Some(_), Some(_)) => Err(SourceError::ConflictingInput),
            (None, None) => Err(SourceError::MissingInput),
            (Some(file), None) => Ok(SourceInput::Upload(file)),
            (None, Some(url)) => Ok(SourceInput::Url(url)),
        }
    }
}

#[derive(Debug)]
enum Artifact {
    Upload(StoredUpload),
    Download(TempPath),
}

/// A local copy of the requested document, private to one request.
///
/// Dropping it deletes the file, whichever way the request ends.
#[derive(Debug)]
pub struct ResolvedDocument {
    filename: String,
    kind: DocumentKind,
    artifact: Artifact,
}

impl ResolvedDocument {
    pub fn path(&self) -> &Path {
        match &self.artifact {
            Artifact::Upload(upload) => upload.path(),
            Artifact::Download(temp) => temp,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn kind(&self) -> DocumentKind {
        self.kind
    }
}

pub struct SourceResolver {
    client: Client,
    file_service: FileService,
    authenticator: CommonsAuthenticator,
    wiki: WikiConfig,
    download_timeout: Duration,
}

impl SourceResolver {
    pub fn new(config: &Config) -> Result<Self, SourceError> {
        let download_timeout = Duration::from_secs(config.download_timeout_seconds);
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SourceError::download_failed("", e))?;

        Ok(Self {
            client,
            file_service: FileService::new(&config.upload_path),
            authenticator: CommonsAuthenticator::new(
                config.wiki.commons_api_url.clone(),
                config.credentials.clone(),
                download_timeout,
            ),
            wiki: config.wiki.clone(),
            download_timeout,
        })
    }

    pub async fn resolve(&self, input: SourceInput) -> Result<ResolvedDocument, SourceError> {
        match input {
            SourceInput::Upload(file) => self.resolve_upload(file).await,
            SourceInput::Url(url) => self.resolve_url(&url).await,
        }
    }

    async fn resolve_upload(&self, file: UploadedFile) -> Result<ResolvedDocument, SourceError> {
        let stored = self.file_service.save_upload(&file.filename, &file.data).await?;
        let kind = classify(stored.filename())?;
        info!("Received upload {} ({:?})", stored.filename(), kind);

        Ok(ResolvedDocument {
            filename: stored.filename().to_string(),
            kind,
            artifact: Artifact::Upload(stored),
        })
    }

    async fn resolve_url(&self, raw_url: &str) -> Result<ResolvedDocument, SourceError> {
        let mut url = Url::parse(raw_url.trim()).map_err(|e| SourceError::InvalidUrl {
            url: raw_url.to_string(),
            details: e.to_string(),
        })?;

        if is_file_page(&url, &self.wiki.wikisource_hosts) {
            url = extract_direct_file_url(
                &self.client,
                &url,
                &self.wiki.asset_host,
                self.download_timeout,
            )
            .await?;
        }

        // Reject by name before spending a download on it
        let filename = filename_from_url(&url)
            .filter(|name| is_allowed_file_type(name))
            .ok_or_else(|| SourceError::unsupported(url.as_str()))?;
        let kind = classify(&filename)?;

        let client = self.client_for(&url).await;
        let temp_path = self.download(&client, &url, &filename).await?;
        info!("Downloaded {} as {:?}", url, kind);

        Ok(ResolvedDocument {
            filename,
            kind,
            artifact: Artifact::Download(temp_path),
        })
    }

    async fn client_for(&self, url: &Url) -> Client {
        let is_commons = url
            .host_str()
            .map(|host| host_matches_any(host, &self.wiki.commons_hosts))
            .unwrap_or(false);
        if !is_commons {
            return self.client.clone();
        }

        match self.authenticator.session().await {
            SessionOutcome::Authenticated(client) => client,
            SessionOutcome::Anonymous(reason) => {
                if reason != AnonymousReason::NoCredentials {
                    warn!("Downloading {} anonymously", url);
                }
                self.client.clone()
            }
        }
    }

    /// Streams the body into a private temp file that keeps the extension.
    async fn download(
        &self,
        client: &Client,
        url: &Url,
        filename: &str,
    ) -> Result<TempPath, SourceError> {
        let response = client
            .get(url.clone())
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(|e| SourceError::download_failed(url.as_str(), e))?;

        if !response.status().is_success() {
            return Err(SourceError::DownloadStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let suffix = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();
        let temp_path = tempfile::Builder::new()
            .prefix("wikisource-ocr-")
            .suffix(&suffix)
            .tempfile()?
            .into_temp_path();

        let mut file = tokio::fs::File::create(&temp_path).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| SourceError::download_failed(url.as_str(), e))?;
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        Ok(temp_path)
    }
}
