//! Remote collection access
//!
//! # Module Structure
//!
//! - [`client`] - Placeholder API client building `<base-url>/<kind>` URLs
//! - [`http`] - reqwest wrapper mapping transport and decode failures to [`FetchError`]
//!
//! The fetcher talks to the network only through [`Source`], so tests can
//! substitute a source whose responses they resolve by hand.

pub mod client;
pub mod http;

use crate::error::FetchError;
use crate::resource::ResourceKind;
use serde_json::Value;
use std::future::Future;

pub use client::{PlaceholderClient, DEFAULT_BASE_URL};

/// Something that can produce the raw JSON payload for a kind
pub trait Source: Send + Sync + 'static {
    fn get(&self, kind: ResourceKind) -> impl Future<Output = Result<Value, FetchError>> + Send;
}
