//! # Stowage Client
//!
//! Access to a single bucket on an S3-compatible backend, hardened for
//! unreliable networks.
//!
//! ## Features
//!
//! - **SigV4**: Header signing and presigned URLs without an SDK dependency
//! - **Classified failures**: Transport trouble is separated from credential
//!   and request errors
//! - **Retry**: Exponential backoff for transient failures only
//! - **Substitutable backend**: Everything above the wire talks to the
//!   [`ObjectStore`] trait
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stowage_client::{BackendConfig, ObjectStore, RetryPolicy, RetryingClient, S3Client};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BackendConfig::new(
//!         "https://account.r2.cloudflarestorage.com",
//!         "photos",
//!         "access-key-id",
//!         "secret-key",
//!     );
//!     let client = RetryingClient::new(Arc::new(S3Client::new(config)?), RetryPolicy::default());
//!
//!     for object in client.list_all(Some("2024/")).await? {
//!         println!("{} ({} bytes)", object.key, object.size);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod client;
pub mod classify;
mod config;
mod error;
pub mod probe;
mod retry;
pub mod signing;
mod store;
mod types;

pub use classify::{classify, describe, ErrorClass, ErrorDescriptor};
pub use client::S3Client;
pub use config::{BackendConfig, DEFAULT_REGION};
pub use error::{ClientError, NetworkFailure, Result};
pub use probe::{ConnectivityProbe, HttpConnectivityProbe, DEFAULT_PROBE_TARGETS};
pub use retry::{RetryDecision, RetryPolicy, RetryingClient};
pub use store::ObjectStore;
pub use types::*;
