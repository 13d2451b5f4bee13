//! Phase 1: listing extraction.
//!
//! Drives the renderable page through filter configuration, pagination and
//! per-card scraping, appending one record per card to the listing sink.
//! The phase is strictly sequential: the page session is an exclusive
//! resource, and every wait is a fixed settle delay or a bounded poll.

use anyhow::{Context, Result};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::domain::ListingRecord;
use crate::infrastructure::config::{
    AppConfig, ListingConfig, SiteConfig, TerminationPolicy, TimingConfig,
};
use crate::infrastructure::page::{Locator, NavigationError, PageElement, RenderablePage};
use crate::infrastructure::sink::CsvSink;

const CARD_POLL_INTERVAL_MS: u64 = 500;
const SCROLL_SETTLE_MS: u64 = 500;

/// Totals reported after a listing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingSummary {
    pub pages: u32,
    pub cards: u32,
}

/// State machine over the renderable page:
/// `Init → FiltersApplied → PageLoaded(n) → [PageLoaded(n+1) | Done]`.
pub struct ListingNavigator {
    page: Box<dyn RenderablePage>,
    site: SiteConfig,
    timing: TimingConfig,
    listing: ListingConfig,
    termination: TerminationPolicy,
    sink: CsvSink,
}

impl ListingNavigator {
    pub fn new(page: Box<dyn RenderablePage>, config: &AppConfig, sink: CsvSink) -> Self {
        Self {
            page,
            site: config.site.clone(),
            timing: config.timing.clone(),
            listing: config.listing.clone(),
            termination: config.listing.termination,
            sink,
        }
    }

    /// Run the whole listing phase. The page session is released on every
    /// exit path, including navigation failure.
    pub async fn run(mut self) -> Result<ListingSummary> {
        let outcome = self.drive().await;
        if let Err(e) = self.page.close().await {
            warn!("failed to close page session: {e}");
        }
        outcome
    }

    async fn drive(&mut self) -> Result<ListingSummary> {
        info!("listing extraction starting at {}", self.site.listing_url);
        self.page.goto(&self.site.listing_url).await?;
        self.page.wait_for_load().await?;

        self.apply_filters().await?;
        self.page.wait_for_load().await?;

        self.sink
            .ensure_header(&ListingRecord::HEADERS)
            .await
            .context("initializing listing store")?;

        let mut serial = 1u32;
        let mut page_no = 1u32;
        let mut cards = 0u32;

        loop {
            info!(page = page_no, "scraping listing page");
            self.scroll_to_top().await;
            self.wait_for_cards().await;
            cards += self.scrape_current_page(&mut serial).await?;

            let next = page_no + 1;
            if !self.termination.allows_page(next) {
                info!(pages = page_no, "configured page bound reached");
                break;
            }
            if !self.advance_to(next).await? {
                info!(pages = page_no, "no more pages found, reached last page");
                break;
            }
            self.page.wait(self.timing.page_settle_ms).await;
            page_no = next;
        }

        info!(pages = page_no, cards, "listing extraction complete");
        Ok(ListingSummary {
            pages: page_no,
            cards,
        })
    }

    /// `Init → FiltersApplied`: deactivate the ongoing-only toggle if
    /// active, activate the status filter if inactive, then let the result
    /// set stabilize.
    async fn apply_filters(&mut self) -> Result<(), NavigationError> {
        let ongoing = self
            .wait_for_single(&self.listing.ongoing_filter_locator, "ongoing-only filter")
            .await?;
        if self.toggle_checked(ongoing.as_ref(), "ongoing-only").await? {
            info!("deactivating ongoing-only filter");
            ongoing.click().await?;
            self.page.wait(self.timing.filter_settle_ms).await;
        }

        let status = self
            .wait_for_single(&self.listing.status_filter_locator, "status filter")
            .await?;
        if !self.toggle_checked(status.as_ref(), "status-filter").await? {
            info!("activating status filter");
            status.click().await?;
            // Longer settle: this triggers a full results refresh.
            self.page.wait(self.timing.status_filter_settle_ms).await;
        }

        self.page.wait(self.timing.post_filter_settle_ms).await;
        Ok(())
    }

    /// Toggle state is the presence of the checked marker in the
    /// container's inner HTML.
    async fn toggle_checked(
        &self,
        toggle: &dyn PageElement,
        name: &str,
    ) -> Result<bool, NavigationError> {
        let html = toggle
            .inner_html()
            .await
            .map_err(|e| NavigationError::action(format!("read {name} toggle state"), e))?;
        Ok(html.contains(&self.listing.checked_marker))
    }

    /// Poll for exactly one element, bounded by the card-poll budget.
    async fn wait_for_single(
        &self,
        locator: &Locator,
        what: &str,
    ) -> Result<Box<dyn PageElement>, NavigationError> {
        let budget = Duration::from_millis(self.timing.card_poll_max_ms);
        let start = Instant::now();
        loop {
            match self.page.locate(locator).await {
                Ok(mut elements) if !elements.is_empty() => {
                    return Ok(elements.swap_remove(0));
                }
                Ok(_) => {}
                Err(e) => debug!("transient read while waiting for {what}: {e}"),
            }
            if start.elapsed() >= budget {
                return Err(NavigationError::Timeout {
                    what: what.to_string(),
                    waited_ms: self.timing.card_poll_max_ms,
                });
            }
            self.page.wait(CARD_POLL_INTERVAL_MS).await;
        }
    }

    async fn scroll_to_top(&self) {
        if let Err(e) = self.page.evaluate_script("window.scrollTo(0, 0)").await {
            debug!("scroll to top failed: {e}");
        }
        self.page.wait(SCROLL_SETTLE_MS).await;
    }

    /// Poll until at least one card is present. Transient read failures
    /// keep the loop going; an exhausted budget is not fatal — scraping
    /// proceeds with whatever cards are present.
    async fn wait_for_cards(&self) -> bool {
        let budget = Duration::from_millis(self.timing.card_poll_max_ms);
        let start = Instant::now();
        while start.elapsed() < budget {
            match self.page.locate(&self.listing.card_locator).await {
                Ok(cards) if !cards.is_empty() => return true,
                Ok(_) => {}
                Err(e) => debug!("transient card read failure: {e}"),
            }
            self.page.wait(CARD_POLL_INTERVAL_MS).await;
        }
        warn!("card poll budget exhausted, scraping whatever is present");
        false
    }

    /// Scrape every card present at this instant. A single unreadable card
    /// never aborts the page; its fields stay empty.
    async fn scrape_current_page(&mut self, serial: &mut u32) -> Result<u32> {
        let cards = match self.page.locate(&self.listing.card_locator).await {
            Ok(cards) => cards,
            Err(e) => {
                warn!("card read failed after poll, treating page as empty: {e}");
                Vec::new()
            }
        };

        let mut scraped = 0u32;
        for card in &cards {
            let record = self.scrape_card(card.as_ref(), *serial).await;
            debug!(serial = record.serial, bid_no = %record.bid_no, "card extracted");
            self.sink
                .append(&ListingRecord::HEADERS, &record.to_row())
                .await
                .context("appending listing record")?;
            *serial += 1;
            scraped += 1;
        }
        Ok(scraped)
    }

    /// Scrape one card. Unreadable fields are left empty.
    async fn scrape_card(&self, card: &dyn PageElement, serial: u32) -> ListingRecord {
        let mut record = ListingRecord::with_serial(serial);

        match card.locate(&self.listing.label_locator).await {
            Ok(labels) => {
                for label in &labels {
                    self.scrape_labelled_pair(label.as_ref(), &mut record).await;
                }
            }
            Err(e) => debug!(serial, "label read failed: {e}"),
        }

        match card.text().await {
            Ok(full_text) => {
                if let Some(status) = extract_status(&full_text, &self.listing.status_marker) {
                    record.status = status;
                }
            }
            Err(e) => debug!(serial, "card text read failed: {e}"),
        }

        record.bid_result_url = self
            .result_affordance_url(card, &self.listing.captions.bid_result)
            .await;
        record.ra_result_url = self
            .result_affordance_url(card, &self.listing.captions.ra_result)
            .await;

        record
    }

    /// Match one labelled anchor pair against the known label texts.
    async fn scrape_labelled_pair(&self, label: &dyn PageElement, record: &mut ListingRecord) {
        let text = match label.text().await {
            Ok(text) => text.to_uppercase(),
            Err(e) => {
                debug!("label text read failed: {e}");
                return;
            }
        };

        let anchors = match label.locate(&self.listing.label_anchor_locator).await {
            Ok(anchors) => anchors,
            Err(_) => return,
        };
        let Some(anchor) = anchors.first() else {
            return;
        };

        let value = match anchor.text().await {
            Ok(value) => value.trim().to_string(),
            Err(_) => return,
        };
        let url = match anchor.attribute("href").await {
            Ok(Some(href)) if !href.is_empty() => self.absolutize(&href),
            _ => String::new(),
        };

        if text.contains("BID NO") {
            record.bid_no = value;
            record.bid_url = url;
        } else if text.contains("RA NO") {
            record.ra_no = value;
            record.ra_url = url;
        }
    }

    /// Try each caption variant in priority order; the first anchor with an
    /// href wins. No caption present means no result affordance — the field
    /// stays empty.
    async fn result_affordance_url(&self, card: &dyn PageElement, captions: &[String]) -> String {
        for caption in captions {
            let locator = Locator::xpath(
                self.listing
                    .result_anchor_template
                    .replace("{caption}", caption),
            );
            let anchors = match card.locate(&locator).await {
                Ok(anchors) => anchors,
                Err(e) => {
                    debug!("result anchor read failed for '{caption}': {e}");
                    continue;
                }
            };
            if let Some(anchor) = anchors.first() {
                if let Ok(Some(href)) = anchor.attribute("href").await {
                    if !href.is_empty() {
                        debug!("result URL captured via caption '{caption}'");
                        return self.absolutize(&href);
                    }
                }
            }
        }
        String::new()
    }

    /// `PageLoaded(n) → PageLoaded(n+1) | Done`: absent control means the
    /// last page has been scraped.
    async fn advance_to(&self, page_no: u32) -> Result<bool, NavigationError> {
        let locator = Locator::css(
            self.listing
                .page_link_template
                .replace("{page}", &page_no.to_string()),
        );
        let links = self.page.locate(&locator).await?;
        match links.first() {
            Some(link) => {
                link.click().await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn absolutize(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            href.to_string()
        } else {
            format!("{}{}", self.site.base_url, href)
        }
    }
}

/// Text after the status marker, up to the next line break.
fn extract_status(full_text: &str, marker: &str) -> Option<String> {
    let index = full_text.find(marker)?;
    let rest = &full_text[index + marker.len()..];
    Some(rest.lines().next().unwrap_or("").trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_text_up_to_next_line_break() {
        let text = "BID NO: GEM/2024/B/1\nItems: Desktops\nStatus: Ongoing Evaluation\nDept: XYZ";
        assert_eq!(
            extract_status(text, "Status:"),
            Some("Ongoing Evaluation".to_string())
        );
    }

    #[test]
    fn missing_marker_yields_none() {
        assert_eq!(extract_status("no marker here", "Status:"), None);
    }

    #[test]
    fn status_at_end_of_text_is_taken_whole() {
        assert_eq!(
            extract_status("Status:  Completed", "Status:"),
            Some("Completed".to_string())
        );
    }
}
