//! # Reviews Gateway
//!
//! A review-caching gateway for the App Store customer reviews feed. HTTP
//! clients ask for the reviews of an app; the local storage is the source of
//! truth, and a background polling subsystem keeps it fresh.
//!
//! ## Architecture
//!
//! - **Poll queue**: deduplicating ordered buffer of per-app poll tasks
//! - **Worker pool**: executors that drain the queue, call the upstream feed
//!   and write to storage
//! - **Scheduler**: periodic refresher for every known app, paced by worker
//!   availability
//! - **API server**: thin handlers that serve the cache and hand off to the
//!   queue, waiting only when an app has never been polled before
//!
//! Requests for apps already in the cache never block on upstream latency;
//! first-ever requests block until data exists. Simultaneous requests for the
//! same app coalesce onto one poll task and one upstream fetch.

/// HTTP API server and endpoints
pub mod api;
/// Application context and lifecycle
pub mod app;
/// System configuration
pub mod config;
/// System-wide constants
pub mod constants;
/// Error types and handling
pub mod error;
/// Core data models
pub mod models;
/// Task queue, workers and scheduler
pub mod polling;
/// Persistence service
pub mod storage;
/// Upstream reviews feed adapter
pub mod upstream;


pub use error::{GatewayError, Result};
