//! Application configuration for itemsync.
//!
//! User config lives at `~/.itemsync/itemsync.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{ItemSyncError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "itemsync.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".itemsync";

// ---------------------------------------------------------------------------
// Config structs (matching itemsync.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Spreadsheet source.
    #[serde(default)]
    pub source: SourceSection,

    /// Item page scraping.
    #[serde(default)]
    pub enricher: EnricherSection,

    /// Output locations.
    #[serde(default)]
    pub output: OutputSection,
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSection {
    /// Spreadsheet identifier.
    #[serde(default = "default_sheet_id")]
    pub sheet_id: String,

    /// Sheet (tab) name to export.
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,

    /// Base URL of the spreadsheet export service.
    #[serde(default = "default_export_base_url")]
    pub export_base_url: String,

    /// Local CSV cache path.
    #[serde(default = "default_cache_path")]
    pub cache_path: String,
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            sheet_id: default_sheet_id(),
            sheet_name: default_sheet_name(),
            export_base_url: default_export_base_url(),
            cache_path: default_cache_path(),
        }
    }
}

fn default_sheet_id() -> String {
    "1xWFQgV3T2NOvfN_I8kvFxWHbH9i240rp2UFi2SEi6Zc".into()
}
fn default_sheet_name() -> String {
    "Data".into()
}
fn default_export_base_url() -> String {
    "https://docs.google.com".into()
}
fn default_cache_path() -> String {
    "input/data.csv".into()
}

/// `[enricher]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnricherSection {
    /// Item detail page; the item id is appended as `?id=<id>`.
    #[serde(default = "default_item_page_url")]
    pub item_page_url: String,

    /// Request timeout in seconds. Unset means no timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Maximum item pages fetched at once. `1` keeps fetches sequential.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
}

impl Default for EnricherSection {
    fn default() -> Self {
        Self {
            item_page_url: default_item_page_url(),
            timeout_secs: None,
            concurrency: default_concurrency(),
        }
    }
}

fn default_item_page_url() -> String {
    "https://www.mousehuntgame.com/i.php".into()
}
fn default_concurrency() -> u32 {
    1
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSection {
    /// Directory the category files are written to.
    #[serde(default = "default_output_dir")]
    pub dir: String,

    /// Directory holding the existing item index (`<category>s.yml` files).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_dir: Option<String>,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            index_dir: None,
        }
    }
}

fn default_output_dir() -> String {
    "output".into()
}

// ---------------------------------------------------------------------------
// Runtime configs (merged from config file + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime source acquisition settings.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Spreadsheet identifier.
    pub sheet_id: String,
    /// Sheet (tab) name.
    pub sheet_name: String,
    /// Export service base URL.
    pub export_base_url: Url,
    /// Local CSV cache path.
    pub cache_path: PathBuf,
}

impl TryFrom<&AppConfig> for SourceConfig {
    type Error = ItemSyncError;

    fn try_from(config: &AppConfig) -> Result<Self> {
        let export_base_url = parse_url("source.export_base_url", &config.source.export_base_url)?;
        Ok(Self {
            sheet_id: config.source.sheet_id.clone(),
            sheet_name: config.source.sheet_name.clone(),
            export_base_url,
            cache_path: PathBuf::from(&config.source.cache_path),
        })
    }
}

/// Runtime item page scraping settings.
#[derive(Debug, Clone)]
pub struct EnricherConfig {
    /// Item detail page URL, without the `id` query.
    pub item_page_url: Url,
    /// Optional request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Maximum concurrent item page fetches (at least 1).
    pub concurrency: usize,
}

impl TryFrom<&AppConfig> for EnricherConfig {
    type Error = ItemSyncError;

    fn try_from(config: &AppConfig) -> Result<Self> {
        let item_page_url = parse_url("enricher.item_page_url", &config.enricher.item_page_url)?;
        Ok(Self {
            item_page_url,
            timeout_secs: config.enricher.timeout_secs,
            concurrency: config.enricher.concurrency.max(1) as usize,
        })
    }
}

fn parse_url(field: &str, value: &str) -> Result<Url> {
    Url::parse(value)
        .map_err(|e| ItemSyncError::config(format!("invalid URL for {field} '{value}': {e}")))
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.itemsync/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ItemSyncError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.itemsync/itemsync.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| ItemSyncError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        ItemSyncError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ItemSyncError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ItemSyncError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ItemSyncError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
