//! Item page scraping.
//!
//! Unknown items get their type key from the public item page, which carries
//! it as a `data-item-type="<key>"` attribute somewhere in the markup.

use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use itemsync_shared::{EnricherConfig, ItemId, ItemSyncError, Result};

/// Maximum number of redirects to follow on item pages.
const MAX_REDIRECTS: usize = 5;

/// User-Agent string for item page requests.
const USER_AGENT: &str = concat!("itemsync/", env!("CARGO_PKG_VERSION"));

/// Fetch the type key for one item.
pub trait KeyScraper: Send + Sync {
    /// Resolve `id` to its type key.
    ///
    /// `Ok(None)` means the page was fetched but carried no key.
    fn fetch_key(&self, id: ItemId) -> impl Future<Output = Result<Option<String>>> + Send;
}

// ---------------------------------------------------------------------------
// ItemPageScraper
// ---------------------------------------------------------------------------

/// Scrapes item keys from the game's item pages over HTTP.
#[derive(Debug, Clone)]
pub struct ItemPageScraper {
    client: Client,
    page_url: Url,
}

impl ItemPageScraper {
    /// Create a scraper with its own HTTP client.
    pub fn new(config: &EnricherConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS));

        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        let client = builder
            .build()
            .map_err(|e| ItemSyncError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            page_url: config.item_page_url.clone(),
        })
    }

    /// Item page URL for `id` (`<page_url>?id=<id>`).
    pub fn item_url(&self, id: ItemId) -> Url {
        let mut url = self.page_url.clone();
        url.query_pairs_mut().append_pair("id", &id.to_string());
        url
    }
}

impl KeyScraper for ItemPageScraper {
    #[instrument(skip_all, fields(%id))]
    async fn fetch_key(&self, id: ItemId) -> Result<Option<String>> {
        let url = self.item_url(id);
        debug!(%url, "fetching item page");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| ItemSyncError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ItemSyncError::Network(format!("{url}: HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ItemSyncError::Network(format!("{url}: failed to read body: {e}")))?;

        let key = extract_item_type(&body);
        debug!(key = key.as_deref().unwrap_or("<none>"), "item page scraped");
        Ok(key)
    }
}

/// Extract the first `data-item-type="..."` value from an HTML document.
pub fn extract_item_type(html: &str) -> Option<String> {
    static ITEM_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"data-item-type="([^"]+)""#).expect("valid regex")
    });

    ITEM_TYPE_RE
        .captures(html)
        .map(|caps| caps[1].to_string())
}
