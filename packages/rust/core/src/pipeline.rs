//! End-to-end sync pipeline: sheet → classify → lookup/scrape → category files.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use itemsync_enricher::KeyScraper;
use itemsync_index::ItemLookup;
use itemsync_shared::{Category, ItemId, ItemRecord, ItemSyncError, Result, SourceConfig};
use itemsync_source::{Acquired, ClassifiedRow, RowClass, RowReader};
use itemsync_writer::WrittenFile;

use crate::buckets::CategoryBuckets;

/// Configuration for [`run_pipeline`].
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Sheet export and CSV cache settings.
    pub source: SourceConfig,
    /// Directory the category files are written to.
    pub output_dir: PathBuf,
    /// Maximum item pages fetched at once; `1` fetches strictly in row order.
    pub concurrency: usize,
}

/// Result of a pipeline run.
#[derive(Debug)]
pub struct RunSummary {
    /// Where the CSV came from.
    pub source: Acquired,
    /// Rows decoded (or failed to decode) from the CSV.
    pub rows_read: usize,
    /// Rows dropped because their class is not kept.
    pub discarded: usize,
    /// Rows skipped because they could not be decoded or had a bad id.
    pub malformed: usize,
    /// Items taken from the existing index.
    pub known: usize,
    /// Items resolved by scraping their item page.
    pub enriched: usize,
    /// Scraped items whose page carried no key.
    pub missing_keys: usize,
    /// Category files written.
    pub files: Vec<WrittenFile>,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// How an item's record was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Reused from the existing index.
    Known,
    /// Built from a freshly scraped item page.
    Enriched,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called once per accepted row, in row order.
    fn item_resolved(&self, item: &ItemRecord, resolution: Resolution, resolved: usize);
    /// Called when the pipeline completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn item_resolved(&self, _item: &ItemRecord, _resolution: Resolution, _resolved: usize) {}
    fn done(&self, _summary: &RunSummary) {}
}

/// Run the full sync pipeline.
///
/// 1. Acquire the CSV (cache or download)
/// 2. Stream and classify rows
/// 3. Reuse known items, scrape keys for the rest
/// 4. Write one file per non-empty category
///
/// Any scrape failure aborts the run before a single file is written.
#[instrument(skip_all, fields(cache = %config.source.cache_path.display(), out = %config.output_dir.display()))]
pub async fn run_pipeline<L, S>(
    config: &RunConfig,
    lookup: &L,
    scraper: Arc<S>,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary>
where
    L: ItemLookup + ?Sized,
    S: KeyScraper + 'static,
{
    let start = Instant::now();

    // --- Phase 1: Source ---
    progress.phase("Retrieving item sheet");
    let client = itemsync_source::build_client()?;
    let source = itemsync_source::acquire(&config.source, &client).await?;

    // --- Phase 2: Classify + resolve ---
    progress.phase("Processing items");
    let rows = RowReader::open(source.path())?;
    let mut state = RunState::new(config.concurrency.max(1), progress);

    for (index, row) in rows.enumerate() {
        state.rows_read += 1;

        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(record = index + 1, error = %e, "skipping undecodable row");
                state.malformed += 1;
                continue;
            }
        };

        match itemsync_source::classify(row) {
            RowClass::Accept(row) => {
                if let Some(existing) = lookup.get_item(row.id) {
                    info!(id = %row.id, name = %row.name, "item already exists");
                    state.submit(row.category, Slot::Ready(existing)).await?;
                } else {
                    info!(id = %row.id, name = %row.name, "processing item");
                    let slot = spawn_scrape(&scraper, row);
                    state.submit_pending(slot).await?;
                }
            }
            RowClass::Discard => {
                state.discarded += 1;
            }
            RowClass::Malformed { reason } => {
                warn!(record = index + 1, %reason, "skipping malformed row");
                state.malformed += 1;
            }
        }
    }

    state.flush().await?;

    // --- Phase 3: Write ---
    progress.phase("Writing category files");
    let files = itemsync_writer::write_categories(&config.output_dir, state.buckets.iter())?;

    let summary = RunSummary {
        source,
        rows_read: state.rows_read,
        discarded: state.discarded,
        malformed: state.malformed,
        known: state.known,
        enriched: state.enriched,
        missing_keys: state.missing_keys,
        files,
        elapsed: start.elapsed(),
    };

    info!(
        rows = summary.rows_read,
        discarded = summary.discarded,
        malformed = summary.malformed,
        known = summary.known,
        enriched = summary.enriched,
        missing_keys = summary.missing_keys,
        files = summary.files.len(),
        elapsed_ms = summary.elapsed.as_millis(),
        "sync completed"
    );

    progress.done(&summary);
    Ok(summary)
}

// ---------------------------------------------------------------------------
// Run state
// ---------------------------------------------------------------------------

/// A row waiting for its record, in submission order.
enum Slot {
    Ready(ItemRecord),
    Pending {
        id: ItemId,
        name: String,
        handle: JoinHandle<Result<Option<String>>>,
    },
}

/// Spawn the scrape for an unknown item.
fn spawn_scrape<S: KeyScraper + 'static>(scraper: &Arc<S>, row: ClassifiedRow) -> (Category, Slot) {
    let scraper = Arc::clone(scraper);
    let id = row.id;
    let handle = tokio::spawn(async move { scraper.fetch_key(id).await });

    (
        row.category,
        Slot::Pending {
            id,
            name: row.name,
            handle,
        },
    )
}

/// Mutable state of one run: counters, buckets, and the in-flight window.
struct RunState<'p> {
    progress: &'p dyn ProgressReporter,
    concurrency: usize,
    window: Vec<(Category, Slot)>,
    in_flight: usize,
    buckets: CategoryBuckets,
    rows_read: usize,
    discarded: usize,
    malformed: usize,
    known: usize,
    enriched: usize,
    missing_keys: usize,
}

impl<'p> RunState<'p> {
    fn new(concurrency: usize, progress: &'p dyn ProgressReporter) -> Self {
        Self {
            progress,
            concurrency,
            window: Vec::new(),
            in_flight: 0,
            buckets: CategoryBuckets::default(),
            rows_read: 0,
            discarded: 0,
            malformed: 0,
            known: 0,
            enriched: 0,
            missing_keys: 0,
        }
    }

    /// Queue a resolved slot behind any scrapes still in flight.
    async fn submit(&mut self, category: Category, slot: Slot) -> Result<()> {
        if self.window.is_empty() {
            self.place(category, slot).await
        } else {
            self.window.push((category, slot));
            Ok(())
        }
    }

    /// Queue a scrape and drain the window once it is full.
    async fn submit_pending(&mut self, (category, slot): (Category, Slot)) -> Result<()> {
        self.window.push((category, slot));
        self.in_flight += 1;

        if self.in_flight >= self.concurrency {
            self.flush().await?;
        }
        Ok(())
    }

    /// Await every queued slot in submission order and bucket the records.
    async fn flush(&mut self) -> Result<()> {
        let window = std::mem::take(&mut self.window);
        self.in_flight = 0;

        let mut slots = window.into_iter();
        while let Some((category, slot)) = slots.next() {
            if let Err(e) = self.place(category, slot).await {
                for (_, rest) in slots {
                    if let Slot::Pending { handle, .. } = rest {
                        handle.abort();
                    }
                }
                return Err(e);
            }
        }
        Ok(())
    }

    async fn place(&mut self, category: Category, slot: Slot) -> Result<()> {
        let (record, resolution) = match slot {
            Slot::Ready(record) => {
                self.known += 1;
                (record, Resolution::Known)
            }
            Slot::Pending { id, name, handle } => {
                let key = handle.await.map_err(|e| {
                    ItemSyncError::Network(format!("item {id}: scrape task failed: {e}"))
                })??;

                if key.is_none() {
                    warn!(%id, %name, "item page has no data-item-type marker");
                    self.missing_keys += 1;
                }
                self.enriched += 1;

                (ItemRecord { name, key, id }, Resolution::Enriched)
            }
        };

        debug!(%category, id = %record.id, ?resolution, "item resolved");
        self.progress
            .item_resolved(&record, resolution, self.known + self.enriched);
        self.buckets.push(category, record);
        Ok(())
    }
}
