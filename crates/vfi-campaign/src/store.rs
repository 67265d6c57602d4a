//! Persistence contract for campaign records.

use vfi_core::{CampaignRecord, VfiError};

/// Append-only sink for campaign attempts.
///
/// Implementations key records by a campaign table chosen when the store is
/// opened, support resuming into an existing table, and keep a cumulative
/// runtime counter per table.
pub trait ResultStore {
    /// Appends one attempt record; durable before returning.
    fn append(&mut self, record: &CampaignRecord) -> Result<(), VfiError>;

    /// Adds `seconds` to the table's cumulative runtime counter.
    fn add_runtime(&mut self, seconds: f64) -> Result<(), VfiError>;
}
