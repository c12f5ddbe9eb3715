//! Typed fetcher for the `todos` and `posts` collections of a
//! JSONPlaceholder-style REST host.
//!
//! - [`api`] - HTTP access behind the [`api::Source`] seam
//! - [`resource`] - Kinds, record shapes, the background fetcher and classification
//! - [`config`] - Persisted defaults
//! - [`error`] - Typed errors

pub mod api;
pub mod config;
pub mod error;
pub mod resource;

pub use error::{ClassifyError, ClientError, FetchError};
