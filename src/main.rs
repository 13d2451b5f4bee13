//! Thin command entry: mode selection and phase wiring.
//!
//! Usage: `bid-harvester [listing|enrich|all|serve] [config-path]`

use anyhow::{bail, Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{info, warn};

use bid_harvester::api;
use bid_harvester::application::{EnrichmentSinks, ListingNavigator, ReconciliationDispatcher};
use bid_harvester::infrastructure::config::{AppConfig, ConfigManager};
use bid_harvester::infrastructure::{init_logging, CsvSink, DetailParser, HttpClient, WebDriverPage};

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let mode = args.next().unwrap_or_else(|| "all".to_string());
    let manager = match args.next() {
        Some(path) => ConfigManager::with_path(PathBuf::from(path)),
        None => ConfigManager::new(),
    };

    let config = manager.load_config().await?;
    init_logging(&config.logging)?;

    match mode.as_str() {
        "listing" => {
            run_listing(&config).await?;
        }
        "enrich" => {
            run_enrichment(&config).await?;
        }
        "all" => {
            run_listing(&config).await?;
            run_enrichment(&config).await?;
        }
        "serve" => {
            run_api(&config).await?;
        }
        other => bail!("unknown mode '{other}' (expected: listing | enrich | all | serve)"),
    }

    Ok(())
}

async fn run_listing(config: &AppConfig) -> Result<()> {
    let page = WebDriverPage::connect(&config.browser)
        .await
        .context("starting browser session")?;
    let sink = CsvSink::new(config.output.listing_path());
    let navigator = ListingNavigator::new(Box::new(page), config, sink);

    let summary = navigator.run().await?;
    info!(
        pages = summary.pages,
        cards = summary.cards,
        "listing phase finished"
    );
    Ok(())
}

async fn run_enrichment(config: &AppConfig) -> Result<()> {
    let http = HttpClient::from_worker_config(&config.workers)?;
    let parser = DetailParser::with_rules(config.classification.clone())?;
    let sinks = EnrichmentSinks {
        basic_info: CsvSink::new(config.output.basic_info_path()),
        technical: CsvSink::new(config.output.technical_path()),
        financial: CsvSink::new(config.output.financial_path()),
    };
    let dispatcher = ReconciliationDispatcher::new(
        http,
        parser,
        sinks,
        config.workers.max_concurrent,
        &config.site.result_url_pattern,
    )?;

    let stop = dispatcher.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("stop requested, letting in-flight tasks finish");
            stop.cancel();
        }
    });

    let summary = dispatcher.run(&config.output.listing_path()).await?;
    info!(
        attempted = summary.attempted,
        succeeded = summary.succeeded,
        skipped = summary.skipped,
        "enrichment phase finished"
    );
    Ok(())
}

async fn run_api(config: &AppConfig) -> Result<()> {
    let addr: SocketAddr = config
        .api
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind address '{}'", config.api.bind_addr))?;
    let http = HttpClient::from_worker_config(&config.workers)?;
    let parser = DetailParser::with_rules(config.classification.clone())?;
    api::serve(addr, http, parser).await
}
