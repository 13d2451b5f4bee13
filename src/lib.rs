//! Two-phase harvester for the GeM bid portal.
//!
//! Phase 1 (listing extraction) drives a rendered listing UI through filter
//! configuration and pagination, turning each card into one durable CSV
//! record. Phase 2 (reconciliation) enriches those records concurrently
//! from their bid-result documents, classifying evaluation tables and
//! appending basic-info, technical and financial rows keyed by bid number.

// Module declarations
pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{ListingNavigator, ReconciliationDispatcher};
pub use domain::{DetailExtraction, ListingRecord};
