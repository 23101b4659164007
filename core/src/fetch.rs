//! Listing every record of a type across the store's cursor pages.
//!
//! # Design
//! The store reports the size of a listing only alongside its first page, so
//! `list_all` probes cursor 0, fixes `total = count + remaining` from that
//! response, and then issues one request per remaining page at once. The
//! remaining pages are joined with `try_join_all`: results come back in
//! issuance order whatever order they complete in, and the first failure
//! drops every page still in flight.

use futures::future::try_join_all;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::client::RecordClient;
use crate::error::ApiError;
use crate::http::Transport;
use crate::types::{Constraint, Record, PAGE_SIZE};

/// Cursors still to fetch once the first page has reported `total`.
///
/// Strictly below `total`: a listing of exactly 200 records needs cursors 0
/// and 100 only.
pub fn remaining_cursors(total: u64) -> Vec<u64> {
    (PAGE_SIZE..total).step_by(PAGE_SIZE as usize).collect()
}

impl<T: Transport> RecordClient<T> {
    /// Every record of `record_type` matching all `constraints`.
    ///
    /// The first page's records come first, then each later page in cursor
    /// order. Any failing page fails the whole call; no partial collection is
    /// returned.
    pub async fn list_all<F: DeserializeOwned>(
        &self,
        record_type: &str,
        constraints: &[Constraint],
    ) -> Result<Vec<Record<F>>, ApiError> {
        let first = self
            .fetch_page::<F>(record_type, 0, constraints)
            .await
            .inspect_err(|e| warn!(record_type, cursor = 0, error = %e, "first page failed"))?;

        let total = first
            .total()
            .inspect_err(|e| warn!(record_type, error = %e, "unusable page total"))?;
        let cursors = remaining_cursors(total);
        debug!(record_type, total, pages = cursors.len() + 1, "listing records");

        let mut records = first.results;
        if cursors.is_empty() {
            return Ok(records);
        }

        let pages = try_join_all(
            cursors
                .iter()
                .map(|&cursor| self.fetch_page::<F>(record_type, cursor, constraints)),
        )
        .await
        .inspect_err(|e| warn!(record_type, total, error = %e, "page fan-out failed"))?;

        records.reserve(pages.iter().map(|p| p.results.len()).sum());
        for page in pages {
            records.extend(page.results);
        }
        Ok(records)
    }
}
