//! # Stowage Gateway
//!
//! HTTP front door for one S3-compatible bucket.
//!
//! This crate provides:
//! - **Action API**: list, upload/download URLs, delete and folder operations
//!   selected by `?action=`, with per-request credential overrides
//! - **Reverse proxy**: raw pass-through under a path prefix, with an
//!   inline-preview branch for images
//! - **Resilience**: every backend call is retried on transient network
//!   failures and fails fast otherwise
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   Browser / UI                      │
//! └──────────────┬───────────────────────┬──────────────┘
//!                │ /api/r2?action=       │ /r2-proxy/*
//! ┌──────────────▼──────────────┐ ┌──────▼──────────────┐
//! │      ActionDispatcher       │ │    Proxy gateway    │
//! │  resolve config → validate  │ │  image | generic    │
//! ├─────────────────────────────┤ └──────┬──────────────┘
//! │  RetryingClient (classify,  │        │
//! │  backoff, probe)            │        │
//! ├─────────────────────────────┤        │
//! │  S3Client (SigV4)           │        │
//! └──────────────┬──────────────┘        │
//!                └───────────┬───────────┘
//!                   S3-compatible backend
//! ```

pub mod actions;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod proxy;
pub mod resolver;
pub mod routes;
pub mod server;
pub mod state;

pub use actions::Action;
pub use config::{GatewayConfig, StorageDefaults};
pub use error::{ApiError, ErrorCode, ProxyError};
pub use handlers::{ActionDispatcher, ActionResult};
pub use resolver::{mask_secret, resolve, ActionBody, EffectiveConfig};
pub use server::{run_server, run_server_with_shutdown};
pub use state::{AppState, BackendFactory, S3BackendFactory};
