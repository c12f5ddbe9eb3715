//! Resource layer
//!
//! # Architecture
//!
//! - [`kind`] - The two collections that can be requested
//! - [`record`] - Record shapes, the kind-to-shape mapping and payload decoding
//! - [`fetcher`] - Background fetcher exposing the latest collection for a kind
//! - [`classify`] - Routing loosely shaped values into one variant of a closed set
//!
//! # Example
//!
//! ```ignore
//! use tfetch::api::PlaceholderClient;
//! use tfetch::resource::{ResourceFetcher, ResourceKind};
//!
//! async fn first_todos() -> anyhow::Result<usize> {
//!     let client = PlaceholderClient::new(tfetch::api::DEFAULT_BASE_URL, None)?;
//!     let mut fetcher = ResourceFetcher::new(client, ResourceKind::Todos);
//!     fetcher.settled().await;
//!     Ok(fetcher.observe(ResourceKind::Todos).len())
//! }
//! ```

pub mod classify;
mod fetcher;
mod kind;
mod record;

pub use classify::{classify, classify_record, Payment, PaymentMethod, Variant};
pub use fetcher::{fetch_many, fetch_once, FetchState, Phase, ResourceFetcher, StaleWritePolicy};
pub use kind::ResourceKind;
pub use record::{decode_as, BaseRecord, PostRecord, Posts, Records, Resource, TodoRecord, Todos};
