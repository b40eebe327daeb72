//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use itemsync_core::{ProgressReporter, Resolution, RunConfig, RunSummary};
use itemsync_enricher::{ItemPageScraper, KeyScraper};
use itemsync_index::{ItemLookup, MemoryIndex, YamlIndex};
use itemsync_shared::{
    AppConfig, EnricherConfig, ItemId, ItemRecord, SourceConfig, init_config, load_config,
    load_config_from,
};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// itemsync: turn the item sheet into per-category YAML files.
#[derive(Parser)]
#[command(
    name = "itemsync",
    version,
    about = "Sync the item spreadsheet into per-category YAML files.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Config file to use instead of ~/.itemsync/itemsync.toml.
    #[arg(long, global = true, env = "ITEMSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the full sync: sheet, lookup/scrape, category files.
    Run {
        /// Local CSV cache path.
        #[arg(long)]
        cache: Option<PathBuf>,

        /// Output directory for the category files.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Directory of existing category files to reuse items from.
        #[arg(long)]
        index: Option<PathBuf>,

        /// Maximum item pages fetched at once.
        #[arg(long)]
        concurrency: Option<u32>,
    },

    /// Download the sheet into the local CSV cache.
    Fetch {
        /// Re-download even if the cache already exists.
        #[arg(long)]
        force: bool,

        /// Local CSV cache path.
        #[arg(long)]
        cache: Option<PathBuf>,
    },

    /// Scrape and print the type key of a single item.
    Key {
        /// Item id.
        id: u64,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "itemsync=info",
        1 => "itemsync=debug",
        _ => "itemsync=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone();
    match cli.command {
        Command::Run {
            cache,
            out,
            index,
            concurrency,
        } => {
            let mut config = resolve_config(config_path)?;
            if let Some(cache) = cache {
                config.source.cache_path = cache.to_string_lossy().into_owned();
            }
            if let Some(out) = out {
                config.output.dir = out.to_string_lossy().into_owned();
            }
            if let Some(index) = index {
                config.output.index_dir = Some(index.to_string_lossy().into_owned());
            }
            if let Some(concurrency) = concurrency {
                config.enricher.concurrency = concurrency;
            }
            cmd_run(&config).await
        }
        Command::Fetch { force, cache } => {
            let mut config = resolve_config(config_path)?;
            if let Some(cache) = cache {
                config.source.cache_path = cache.to_string_lossy().into_owned();
            }
            cmd_fetch(&config, force).await
        }
        Command::Key { id } => cmd_key(&resolve_config(config_path)?, ItemId(id)).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&resolve_config(config_path)?).await,
        },
    }
}

/// Load the config file named on the command line, or the default one.
fn resolve_config(path: Option<PathBuf>) -> Result<AppConfig> {
    let config = match path {
        Some(path) => load_config_from(&path)?,
        None => load_config()?,
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config: &AppConfig) -> Result<()> {
    let source = SourceConfig::try_from(config)?;
    let enricher = EnricherConfig::try_from(config)?;

    let lookup: Box<dyn ItemLookup> = match &config.output.index_dir {
        Some(dir) => Box::new(YamlIndex::load(&PathBuf::from(dir))?),
        None => {
            info!("no existing item index configured, every item will be scraped");
            Box::new(MemoryIndex::default())
        }
    };

    let scraper = Arc::new(ItemPageScraper::new(&enricher)?);

    let run_config = RunConfig {
        source,
        output_dir: PathBuf::from(&config.output.dir),
        concurrency: enricher.concurrency,
    };

    info!(
        cache = %run_config.source.cache_path.display(),
        out = %run_config.output_dir.display(),
        concurrency = run_config.concurrency,
        "starting item sync"
    );

    let reporter = CliProgress::new()?;
    let summary =
        itemsync_core::run_pipeline(&run_config, lookup.as_ref(), scraper, &reporter).await?;

    // Print summary
    println!();
    println!("  Item sync complete!");
    println!("  Source:    {}", summary.source);
    println!("  Rows:      {}", summary.rows_read);
    println!("  Known:     {}", summary.known);
    println!("  Scraped:   {}", summary.enriched);
    println!("  No key:    {}", summary.missing_keys);
    println!("  Skipped:   {} discarded, {} malformed", summary.discarded, summary.malformed);
    for file in &summary.files {
        println!("  Wrote:     {} ({} items)", file.path.display(), file.items);
    }
    println!("  Time:      {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_fetch(config: &AppConfig, force: bool) -> Result<()> {
    let source = SourceConfig::try_from(config)?;
    let client = itemsync_source::build_client()?;

    let acquired = if force {
        itemsync_source::refresh(&source, &client).await?
    } else {
        itemsync_source::acquire(&source, &client).await?
    };

    if acquired.was_fetched() {
        println!("CSV database written to: {}", acquired.path().display());
    } else {
        println!(
            "CSV database already present at: {} (use --force to re-download)",
            acquired.path().display()
        );
    }
    Ok(())
}

async fn cmd_key(config: &AppConfig, id: ItemId) -> Result<()> {
    let enricher = EnricherConfig::try_from(config)?;
    let scraper = ItemPageScraper::new(&enricher)?;

    info!(%id, url = %scraper.item_url(id), "scraping item page");

    match scraper.fetch_key(id).await? {
        Some(key) => println!("{key}"),
        None => return Err(eyre!("item {id} page has no data-item-type marker")),
    }
    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(config: &AppConfig) -> Result<()> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Result<Self> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")?
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Ok(Self { spinner })
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn item_resolved(&self, item: &ItemRecord, resolution: Resolution, resolved: usize) {
        let verb = match resolution {
            Resolution::Known => "Known",
            Resolution::Enriched => "Scraped",
        };
        self.spinner
            .set_message(format!("{verb} [{resolved}] #{} {}", item.id, item.name));
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}
