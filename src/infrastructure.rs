//! Infrastructure layer: configuration, logging, HTTP fetching, the
//! renderable-page capability and its WebDriver implementation, HTML
//! parsing, and CSV sinks.

pub mod config;
pub mod http_client;
pub mod logging;
pub mod page;
pub mod parsing;
pub mod sink;
pub mod webdriver;

// Re-export commonly used items
pub use config::{AppConfig, ConfigManager, TerminationPolicy};
pub use http_client::{FetchError, HttpClient, HttpClientConfig};
pub use logging::init_logging;
pub use page::{Locator, NavigationError, PageElement, RenderablePage, TransientReadError};
pub use parsing::{ClassificationRules, DetailParser};
pub use sink::{CsvSink, SinkWriteError};
pub use webdriver::WebDriverPage;
