//! Async client core for the record store's data API.
//!
//! # Overview
//! `RecordClient` lists and creates records of a named type in a remote,
//! schema-less record store. Listing pages transparently: the first page
//! reports how many records match, and the remaining pages are fetched
//! concurrently and stitched back together in cursor order.
//!
//! # Design
//! - `RecordClient` is stateless: endpoint, token and a `Transport`.
//! - Each operation is split into `build_*` (produces an `HttpRequest`) and
//!   `parse_*` (consumes an `HttpResponse`), so request shape and status
//!   classification are testable without a network.
//! - `Transport` is the I/O seam; `ReqwestTransport` is the production
//!   implementation.
//! - Errors distinguish "the store answered no" (`ApiError::Remote`) from
//!   "no answer at all" (`ApiError::Unknown`).

pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod http;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::RecordClient;
pub use config::{DeploymentMode, RecordStoreConfig};
pub use error::{ApiError, TransportError};
pub use fetch::remaining_cursors;
pub use http::{HttpMethod, HttpRequest, HttpResponse, ReqwestTransport, Transport};
pub use types::{Constraint, Fields, Operator, Page, Record, PAGE_SIZE, SYSTEM_FIELDS};
