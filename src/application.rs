//! Application layer: the two phase orchestrators.

pub mod listing;
pub mod reconciliation;

pub use listing::{ListingNavigator, ListingSummary};
pub use reconciliation::{DispatchSummary, EnrichmentSinks, ReconciliationDispatcher};
