use anyhow::Result;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const PLACEHOLDER_USERNAME: &str = "your_username_here";

#[derive(Clone, Debug)]
pub struct Config {
    pub server_address: String,
    pub upload_path: String,
    pub languages_config: String,
    pub fonts_dir: String,
    pub download_timeout_seconds: u64,
    pub max_upload_bytes: usize,
    pub ocr_dpi: u32,
    pub default_batch_size: u32,
    pub wiki: WikiConfig,
    /// `None` means downloads from the document repository stay anonymous
    pub credentials: Option<Credentials>,
}

/// Hosts and endpoints of the Wikisource / Wikimedia Commons family
#[derive(Clone, Debug)]
pub struct WikiConfig {
    /// Hosts whose `/wiki/File:` pages are resolved to a direct asset link
    pub wikisource_hosts: Vec<String>,
    /// Host a direct asset link must point at
    pub asset_host: String,
    /// Hosts that get an authenticated session when credentials exist
    pub commons_hosts: Vec<String>,
    pub commons_api_url: String,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            wikisource_hosts: vec!["wikisource.org".to_string()],
            asset_host: "upload.wikimedia.org".to_string(),
            commons_hosts: vec![
                "upload.wikimedia.org".to_string(),
                "commons.wikimedia.org".to_string(),
            ],
            commons_api_url: "https://commons.wikimedia.org/w/api.php".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Empty values and the sample placeholder do not count as credentials.
    pub fn usable(username: Option<String>, password: Option<String>) -> Option<Self> {
        let username = username.filter(|u| !u.trim().is_empty())?;
        let password = password.filter(|p| !p.is_empty())?;
        if username.contains(PLACEHOLDER_USERNAME) {
            return None;
        }
        Some(Self { username, password })
    }
}

#[derive(Debug, Default, Deserialize)]
struct WikiFile {
    #[serde(default)]
    wiki: WikiSection,
}

#[derive(Debug, Default, Deserialize)]
struct WikiSection {
    username: Option<String>,
    password: Option<String>,
}

/// Reads `[wiki] username/password` from a TOML file; `WIKI_USERNAME` and
/// `WIKI_PASSWORD` override whatever the file says.
pub fn load_credentials(path: &Path) -> Option<Credentials> {
    let section = match std::fs::read_to_string(path) {
        Ok(raw) => match toml::from_str::<WikiFile>(&raw) {
            Ok(file) => file.wiki,
            Err(e) => {
                warn!("Ignoring unparseable {}: {}", path.display(), e);
                WikiSection::default()
            }
        },
        Err(_) => WikiSection::default(),
    };

    let username = env::var("WIKI_USERNAME").ok().or(section.username);
    let password = env::var("WIKI_PASSWORD").ok().or(section.password);
    let credentials = Credentials::usable(username, password);

    match &credentials {
        Some(c) => info!("Wikimedia Commons credentials configured for '{}'", c.username),
        None => info!("No Wikimedia Commons credentials; downloads are anonymous"),
    }
    credentials
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_address: "0.0.0.0:5000".to_string(),
            upload_path: "./uploads".to_string(),
            languages_config: "./config/languages.json".to_string(),
            fonts_dir: "./fonts".to_string(),
            download_timeout_seconds: 60,
            max_upload_bytes: 16 * 1024 * 1024,
            ocr_dpi: 300,
            default_batch_size: 5,
            wiki: WikiConfig::default(),
            credentials: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Config::default();
        let wiki_defaults = WikiConfig::default();
        let credentials_path =
            PathBuf::from(env::var("WIKI_CONFIG").unwrap_or_else(|_| "./config.toml".to_string()));

        Ok(Config {
            server_address: env::var("SERVER_ADDRESS").unwrap_or(defaults.server_address),
            upload_path: env::var("UPLOAD_PATH").unwrap_or(defaults.upload_path),
            languages_config: env::var("LANGUAGES_CONFIG").unwrap_or(defaults.languages_config),
            fonts_dir: env::var("FONTS_DIR").unwrap_or(defaults.fonts_dir),
            download_timeout_seconds: parsed_var("DOWNLOAD_TIMEOUT_SECONDS")?
                .unwrap_or(defaults.download_timeout_seconds),
            max_upload_bytes: parsed_var("MAX_UPLOAD_BYTES")?.unwrap_or(defaults.max_upload_bytes),
            ocr_dpi: parsed_var("OCR_DPI")?.unwrap_or(defaults.ocr_dpi),
            default_batch_size: parsed_var("DEFAULT_BATCH_SIZE")?
                .unwrap_or(defaults.default_batch_size),
            wiki: WikiConfig {
                wikisource_hosts: list_var("WIKISOURCE_HOSTS")
                    .unwrap_or(wiki_defaults.wikisource_hosts),
                asset_host: env::var("ASSET_HOST").unwrap_or(wiki_defaults.asset_host),
                commons_hosts: list_var("COMMONS_HOSTS").unwrap_or(wiki_defaults.commons_hosts),
                commons_api_url: env::var("COMMONS_API_URL")
                    .unwrap_or(wiki_defaults.commons_api_url),
            },
            credentials: load_credentials(&credentials_path),
        })
    }
}

fn parsed_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Invalid {}='{}': {}", name, raw, e)),
        Err(_) => Ok(None),
    }
}

fn list_var(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    })
}
