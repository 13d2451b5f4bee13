//! Phase 2: detail reconciliation.
//!
//! Reads the persisted listing records, discards records with no usable
//! result URL, and fans the remainder out to a bounded worker pool. Workers
//! share nothing but the three enrichment sinks; the business id embedded
//! in every emitted row is the sole correlation key.

use anyhow::{Context, Result};
use regex::Regex;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::{DetailExtraction, EvaluationTable, ListingRecord};
use crate::infrastructure::http_client::{FetchError, HttpClient};
use crate::infrastructure::parsing::DetailParser;
use crate::infrastructure::sink::{CsvSink, SinkWriteError};

/// Task accounting reported once every task has finished or been skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped: usize,
}

/// The three destinations enrichment rows land in.
#[derive(Debug)]
pub struct EnrichmentSinks {
    pub basic_info: CsvSink,
    pub technical: CsvSink,
    pub financial: CsvSink,
}

#[derive(Debug, Error)]
enum TaskError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Sink(#[from] SinkWriteError),
}

enum TaskOutcome {
    Succeeded,
    Skipped,
    SinkFailed(SinkWriteError),
}

/// Fans one enrichment task per eligible record out to a semaphore-bounded
/// worker pool.
pub struct ReconciliationDispatcher {
    http: HttpClient,
    parser: Arc<DetailParser>,
    sinks: Arc<EnrichmentSinks>,
    max_concurrent: usize,
    result_url_pattern: Regex,
    cancel: CancellationToken,
}

impl ReconciliationDispatcher {
    pub fn new(
        http: HttpClient,
        parser: DetailParser,
        sinks: EnrichmentSinks,
        max_concurrent: usize,
        result_url_pattern: &str,
    ) -> Result<Self> {
        let result_url_pattern = Regex::new(result_url_pattern)
            .with_context(|| format!("invalid result URL pattern '{result_url_pattern}'"))?;
        Ok(Self {
            http,
            parser: Arc::new(parser),
            sinks: Arc::new(sinks),
            max_concurrent: max_concurrent.max(1),
            result_url_pattern,
            cancel: CancellationToken::new(),
        })
    }

    /// Token for requesting a stop: new task starts are prevented, in-flight
    /// tasks finish.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Process every eligible record. Completes only after every task has
    /// been accounted for; per-task fetch/parse failures are contained,
    /// sink failures abort with an error once in-flight tasks have drained.
    pub async fn run(&self, listing_path: &Path) -> Result<DispatchSummary> {
        let records = load_records(listing_path)?;
        let total = records.len();
        let eligible: Vec<ListingRecord> = records
            .into_iter()
            .filter(|record| self.is_eligible(record))
            .collect();

        info!(
            total,
            eligible = eligible.len(),
            workers = self.max_concurrent,
            "dispatching enrichment tasks"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut tasks = Vec::with_capacity(eligible.len());

        for record in eligible {
            let semaphore = Arc::clone(&semaphore);
            let http = self.http.clone();
            let parser = Arc::clone(&self.parser);
            let sinks = Arc::clone(&self.sinks);
            let cancel = self.cancel.clone();

            tasks.push(tokio::spawn(async move {
                let _permit = match semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return TaskOutcome::Skipped,
                };
                if cancel.is_cancelled() {
                    debug!(bid_no = %record.bid_no, "stop requested, task not started");
                    return TaskOutcome::Skipped;
                }

                match enrich_one(&http, &parser, &sinks, &record).await {
                    Ok(()) => {
                        debug!(bid_no = %record.bid_no, "enrichment appended");
                        TaskOutcome::Succeeded
                    }
                    Err(TaskError::Fetch(e)) => {
                        // No retry budget: a missing enrichment row is a
                        // reportable outcome, not a pipeline failure.
                        warn!(bid_no = %record.bid_no, url = %record.bid_result_url, "enrichment fetch failed: {e}");
                        TaskOutcome::Skipped
                    }
                    Err(TaskError::Sink(e)) => {
                        error!(bid_no = %record.bid_no, "sink write failed: {e}");
                        cancel.cancel();
                        TaskOutcome::SinkFailed(e)
                    }
                }
            }));
        }

        let mut summary = DispatchSummary {
            attempted: tasks.len(),
            ..DispatchSummary::default()
        };
        let mut sink_failure: Option<SinkWriteError> = None;

        for outcome in futures::future::join_all(tasks).await {
            match outcome {
                Ok(TaskOutcome::Succeeded) => summary.succeeded += 1,
                Ok(TaskOutcome::Skipped) => summary.skipped += 1,
                Ok(TaskOutcome::SinkFailed(e)) => {
                    summary.skipped += 1;
                    sink_failure.get_or_insert(e);
                }
                Err(e) => {
                    warn!("enrichment task aborted: {e}");
                    summary.skipped += 1;
                }
            }
        }

        info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            "reconciliation complete"
        );

        match sink_failure {
            Some(e) => Err(e).context("enrichment output lost"),
            None => Ok(summary),
        }
    }

    /// Cheap pre-filter: skip records that cannot yield an enrichment fetch.
    fn is_eligible(&self, record: &ListingRecord) -> bool {
        if !record.has_result_affordance() {
            return false;
        }
        if !self.result_url_pattern.is_match(&record.bid_result_url) {
            debug!(
                bid_no = %record.bid_no,
                url = %record.bid_result_url,
                "result URL does not match the result-view pattern, skipping"
            );
            return false;
        }
        true
    }
}

fn load_records(listing_path: &Path) -> Result<Vec<ListingRecord>> {
    let mut reader = csv::Reader::from_path(listing_path)
        .with_context(|| format!("opening listing store {}", listing_path.display()))?;
    let mut records = Vec::new();
    for row in reader.deserialize::<ListingRecord>() {
        match row {
            Ok(record) => records.push(record),
            Err(e) => warn!("unreadable listing row skipped: {e}"),
        }
    }
    Ok(records)
}

/// One enrichment task: fetch, extract, append to the three sinks.
async fn enrich_one(
    http: &HttpClient,
    parser: &DetailParser,
    sinks: &EnrichmentSinks,
    record: &ListingRecord,
) -> Result<(), TaskError> {
    info!(bid_no = %record.bid_no, "fetching result document");
    let body = http.fetch_text(&record.bid_result_url).await?;
    let extraction: DetailExtraction = parser.extract(&body);

    let info = &extraction.basic_info.bid_info;
    if !info.is_empty() {
        let mut headers = Vec::with_capacity(info.len() + 1);
        headers.push("bid_no".to_string());
        headers.extend(info.keys().map(String::from));

        let mut row = Vec::with_capacity(info.len() + 1);
        row.push(record.bid_no.clone());
        row.extend(info.iter().map(|(_, value)| value.to_string()));

        sinks.basic_info.append(&headers, &row).await?;
    }

    if let Some(table) = &extraction.technical_evaluation {
        append_table(&sinks.technical, &record.bid_no, table).await?;
    }
    if let Some(table) = &extraction.financial_evaluation {
        append_table(&sinks.financial, &record.bid_no, table).await?;
    }

    Ok(())
}

/// Append a classified table, each row prefixed with the business id.
async fn append_table(
    sink: &CsvSink,
    bid_no: &str,
    table: &EvaluationTable,
) -> Result<(), SinkWriteError> {
    if table.headers.is_empty() || table.rows.is_empty() {
        return Ok(());
    }

    let mut headers = Vec::with_capacity(table.headers.len() + 1);
    headers.push("bid_no".to_string());
    headers.extend(table.headers.iter().cloned());

    for row in &table.rows {
        let mut out = Vec::with_capacity(row.len() + 1);
        out.push(bid_no.to_string());
        out.extend(row.iter().cloned());
        sink.append(&headers, &out).await?;
    }
    Ok(())
}
