//! Google Sheets access.
//!
//! - [`auth`]: service-account JWT exchange and bearer-token caching
//! - [`client`]: `values.get` over HTTP
//! - [`source`]: grid → [`stockwatch_inventory::Snapshot`] per stream

pub mod auth;
pub mod client;
pub mod error;
pub mod source;

pub use auth::{ServiceAccountKey, TokenProvider};
pub use client::{SheetsClient, ValuesReader};
pub use error::FetchError;
pub use source::{SheetsSnapshotSource, SnapshotSource};
