//! Spreadsheet source acquisition and row streaming.
//!
//! The item sheet is exported as CSV and cached on disk. A cached copy is
//! always trusted as-is; the remote export is only hit when the cache file
//! is missing (or when a refresh is explicitly requested).

mod rows;

use std::path::{Path, PathBuf};

use reqwest::Client;
use tracing::{info, instrument};
use url::Url;

use itemsync_shared::{ItemSyncError, Result, SourceConfig};

pub use rows::{ClassifiedRow, REQUIRED_COLUMNS, RawRow, RowClass, RowReader, classify};

/// Maximum number of redirects to follow on the export endpoint.
const MAX_REDIRECTS: usize = 5;

/// User-Agent string for export requests.
const USER_AGENT: &str = concat!("itemsync/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Acquired
// ---------------------------------------------------------------------------

/// Where the local CSV came from on this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquired {
    /// The cache file already existed and was used untouched.
    Cached { path: PathBuf },
    /// The sheet was downloaded and written to the cache path.
    Fetched { path: PathBuf, bytes: usize },
}

impl Acquired {
    /// Path of the local CSV file.
    pub fn path(&self) -> &Path {
        match self {
            Self::Cached { path } | Self::Fetched { path, .. } => path,
        }
    }

    /// Whether a network download happened.
    pub fn was_fetched(&self) -> bool {
        matches!(self, Self::Fetched { .. })
    }
}

impl std::fmt::Display for Acquired {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cached { .. } => f.write_str("cache"),
            Self::Fetched { bytes, .. } => write!(f, "download ({bytes} bytes)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Ensure the CSV cache exists, downloading the sheet only if it is missing.
#[instrument(skip_all, fields(cache = %config.cache_path.display()))]
pub async fn acquire(config: &SourceConfig, client: &Client) -> Result<Acquired> {
    if config.cache_path.exists() {
        info!("reading from existing CSV cache");
        return Ok(Acquired::Cached {
            path: config.cache_path.clone(),
        });
    }

    refresh(config, client).await
}

/// Download the sheet and overwrite the CSV cache unconditionally.
#[instrument(skip_all, fields(sheet = %config.sheet_name))]
pub async fn refresh(config: &SourceConfig, client: &Client) -> Result<Acquired> {
    let url = export_url(config)?;
    info!(%url, "retrieving sheet export");

    let body = fetch_text(client, &url).await?;
    write_cache(&config.cache_path, &body)?;

    info!(
        path = %config.cache_path.display(),
        bytes = body.len(),
        "CSV cache written"
    );

    Ok(Acquired::Fetched {
        path: config.cache_path.clone(),
        bytes: body.len(),
    })
}

/// Build the CSV export URL for the configured sheet.
///
/// Shape: `<base>/spreadsheets/d/<sheet_id>/gviz/tq?tqx=out:csv&sheet=<name>`.
pub fn export_url(config: &SourceConfig) -> Result<Url> {
    let mut url = config.export_base_url.clone();

    url.path_segments_mut()
        .map_err(|()| {
            ItemSyncError::validation(format!(
                "export base URL cannot carry a path: {}",
                config.export_base_url
            ))
        })?
        .pop_if_empty()
        .extend(["spreadsheets", "d", config.sheet_id.as_str(), "gviz", "tq"]);

    url.query_pairs_mut()
        .append_pair("tqx", "out:csv")
        .append_pair("sheet", &config.sheet_name);

    Ok(url)
}

/// Build a reqwest client for the export endpoint.
pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
        .map_err(|e| ItemSyncError::Network(format!("failed to build HTTP client: {e}")))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn fetch_text(client: &Client, url: &Url) -> Result<String> {
    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| ItemSyncError::Network(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ItemSyncError::Network(format!("{url}: HTTP {status}")));
    }

    response
        .text()
        .await
        .map_err(|e| ItemSyncError::Network(format!("{url}: failed to read body: {e}")))
}

fn write_cache(path: &Path, body: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ItemSyncError::io(parent, e))?;
    }
    std::fs::write(path, body).map_err(|e| ItemSyncError::io(path, e))
}
