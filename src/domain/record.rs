//! Listing records produced by phase 1 and consumed by phase 2.

use serde::{Deserialize, Serialize};

/// One row per card discovered on the listing pages.
///
/// `serial` is unique and strictly increasing across a whole listing run.
/// Every other field may legitimately be empty: a card without a result
/// affordance simply has an empty `bid_result_url`, which also makes the
/// record ineligible for reconciliation.
///
/// Field order here is the persisted CSV column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    pub serial: u32,
    pub bid_no: String,
    pub bid_url: String,
    pub ra_no: String,
    pub ra_url: String,
    pub status: String,
    pub bid_result_url: String,
    pub ra_result_url: String,
}

impl ListingRecord {
    /// CSV header row matching the serialized field order.
    pub const HEADERS: [&'static str; 8] = [
        "serial",
        "bid_no",
        "bid_url",
        "ra_no",
        "ra_url",
        "status",
        "bid_result_url",
        "ra_result_url",
    ];

    /// Create an empty record carrying only its serial number.
    pub fn with_serial(serial: u32) -> Self {
        Self {
            serial,
            bid_no: String::new(),
            bid_url: String::new(),
            ra_no: String::new(),
            ra_url: String::new(),
            status: String::new(),
            bid_result_url: String::new(),
            ra_result_url: String::new(),
        }
    }

    /// Whether a "view results" affordance was captured for this record.
    pub fn has_result_affordance(&self) -> bool {
        !self.bid_result_url.trim().is_empty()
    }

    /// Row values in persisted column order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.serial.to_string(),
            self.bid_no.clone(),
            self.bid_url.clone(),
            self.ra_no.clone(),
            self.ra_url.clone(),
            self.status.clone(),
            self.bid_result_url.clone(),
            self.ra_result_url.clone(),
        ]
    }
}
