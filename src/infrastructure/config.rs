//! Configuration infrastructure.
//!
//! All tunables live in one serde tree: named settle delays, declarative
//! selector/caption rule data, worker limits, and output locations. The
//! [`ConfigManager`] loads and saves the tree as pretty JSON, creating the
//! default file on first run.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;
use tracing::info;

use super::page::Locator;
use super::parsing::ClassificationRules;

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub site: SiteConfig,
    pub browser: BrowserConfig,
    pub timing: TimingConfig,
    pub listing: ListingConfig,
    pub workers: WorkerConfig,
    pub output: OutputConfig,
    pub classification: ClassificationRules,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

/// Extraction-service settings for `serve` mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Address the extraction service binds to.
    pub bind_addr: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
        }
    }
}

/// Target site addresses and the result-view URL shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Entry URL of the paginated listing.
    pub listing_url: String,

    /// Origin prepended to relative hrefs found on cards.
    pub base_url: String,

    /// Pattern a captured result URL must match to be worth fetching.
    pub result_url_pattern: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            listing_url: "https://bidplus.gem.gov.in/all-bids".to_string(),
            base_url: "https://bidplus.gem.gov.in".to_string(),
            result_url_pattern: "(?i)bid[_-]?results?".to_string(),
        }
    }
}

/// Browser session settings for the WebDriver adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// WebDriver endpoint (chromedriver).
    pub webdriver_url: String,

    /// Run the browser headless.
    pub headless: bool,

    /// Extra Chrome arguments.
    pub chrome_args: Vec<String>,

    pub window_width: u32,
    pub window_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            webdriver_url: "http://localhost:9515".to_string(),
            headless: false,
            chrome_args: [
                "--disable-images",
                "--disable-extensions",
                "--disable-gpu",
                "--no-sandbox",
            ]
            .map(String::from)
            .to_vec(),
            window_width: 1280,
            window_height: 800,
        }
    }
}

/// Named settle delays and poll budgets for the listing phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Settle delay after deactivating the ongoing-only toggle.
    pub filter_settle_ms: u64,

    /// Longer settle delay after activating the status filter, which
    /// triggers a full results refresh.
    pub status_filter_settle_ms: u64,

    /// Delay after both filter adjustments to let the result set stabilize.
    pub post_filter_settle_ms: u64,

    /// Settle delay after a page-number navigation.
    pub page_settle_ms: u64,

    /// Total poll budget while waiting for cards to appear on a page.
    pub card_poll_max_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            filter_settle_ms: 1_500,
            status_filter_settle_ms: 3_000,
            post_filter_settle_ms: 4_000,
            page_settle_ms: 2_500,
            card_poll_max_ms: 20_000,
        }
    }
}

/// Result-affordance captions, tried in priority order. Absence of every
/// caption on a card is a normal outcome, not an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionRules {
    pub bid_result: Vec<String>,
    pub ra_result: Vec<String>,
}

impl Default for CaptionRules {
    fn default() -> Self {
        Self {
            bid_result: ["View BID Results", "View Bid Results"]
                .map(String::from)
                .to_vec(),
            ra_result: vec!["View RA Results".to_string()],
        }
    }
}

/// Listing-page markup knowledge: locators, label texts and caption rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// One card per procurement record.
    pub card_locator: Locator,

    /// Labelled spans inside a card.
    pub label_locator: Locator,

    /// Anchor following a label span.
    pub label_anchor_locator: Locator,

    /// Filter toggle containers; state is read via the checked marker.
    pub ongoing_filter_locator: Locator,
    pub status_filter_locator: Locator,
    pub checked_marker: String,

    /// Literal marker preceding the status text in a card.
    pub status_marker: String,

    /// XPath template locating a result anchor; `{caption}` is substituted
    /// with each caption variant in turn.
    pub result_anchor_template: String,

    /// CSS template locating the navigation control for a page number.
    pub page_link_template: String,

    pub captions: CaptionRules,

    pub termination: TerminationPolicy,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            card_locator: Locator::css("div.card"),
            label_locator: Locator::css("span.bid_title"),
            label_anchor_locator: Locator::xpath("./following-sibling::a"),
            ongoing_filter_locator: Locator::xpath(
                "//label[contains(., 'Ongoing Bids/RA')]",
            ),
            status_filter_locator: Locator::xpath("//label[contains(., 'Bid/RA Status')]"),
            checked_marker: "checked".to_string(),
            status_marker: "Status:".to_string(),
            result_anchor_template: ".//a[.//input[@value='{caption}']]".to_string(),
            page_link_template: "a.page-link[href='#page-{page}']".to_string(),
            captions: CaptionRules::default(),
            termination: TerminationPolicy::default(),
        }
    }
}

/// When the pagination loop stops: when no further page-number control
/// exists, or additionally after a configured number of pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TerminationPolicy {
    #[default]
    UntilExhausted,
    BoundedPages { max_pages: u32 },
}

impl TerminationPolicy {
    /// Whether the navigator may advance to `next_page`.
    pub fn allows_page(&self, next_page: u32) -> bool {
        match self {
            TerminationPolicy::UntilExhausted => true,
            TerminationPolicy::BoundedPages { max_pages } => next_page <= *max_pages,
        }
    }
}

/// Worker pool and HTTP settings for the reconciliation phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Maximum concurrent enrichment tasks.
    pub max_concurrent: usize,

    /// Per-fetch timeout in seconds.
    pub request_timeout_seconds: u64,

    pub user_agent: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 16,
            request_timeout_seconds: 60,
            user_agent: "Mozilla/5.0".to_string(),
        }
    }
}

/// Output directory and per-sink file names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub listing_file: String,
    pub basic_info_file: String,
    pub technical_file: String,
    pub financial_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            listing_file: "main_rowdata.csv".to_string(),
            basic_info_file: "bid_info.csv".to_string(),
            technical_file: "technical.csv".to_string(),
            financial_file: "financial.csv".to_string(),
        }
    }
}

impl OutputConfig {
    pub fn listing_path(&self) -> PathBuf {
        self.dir.join(&self.listing_file)
    }

    pub fn basic_info_path(&self) -> PathBuf {
        self.dir.join(&self.basic_info_file)
    }

    pub fn technical_path(&self) -> PathBuf {
        self.dir.join(&self.technical_file)
    }

    pub fn financial_path(&self) -> PathBuf {
        self.dir.join(&self.financial_file)
    }
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: String,

    /// Enable console output.
    pub console_output: bool,

    /// Enable rolling file output under `log_dir`.
    pub file_output: bool,

    pub log_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: false,
            log_dir: PathBuf::from("logs"),
        }
    }
}

/// Configuration manager for loading and saving settings.
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    const DEFAULT_FILE: &'static str = "bid_harvester.json";

    pub fn new() -> Self {
        Self {
            config_path: PathBuf::from(Self::DEFAULT_FILE),
        }
    }

    pub fn with_path(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    /// Load configuration from file, creating the default if it doesn't exist.
    pub async fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!(
                "configuration file not found, creating default: {:?}",
                self.config_path
            );
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .context("Failed to read configuration file")?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Invalid configuration in {:?}", self.config_path))?;
        info!("loaded configuration from {:?}", self.config_path);
        Ok(config)
    }

    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create config directory")?;
            }
        }
        let content =
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;
        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;
        Ok(())
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}
