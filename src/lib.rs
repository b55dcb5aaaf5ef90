//! # Airdrop Claim Checker
//!
//! Checks a list of wallet addresses against several airdrop-claim APIs and
//! aggregates, per address, the claimable amount reported by each source into
//! one report.
//!
//! ## Overview
//!
//! The pipeline is built around concurrent network I/O:
//!
//! - **Proxy warm-up**: every candidate proxy is probed once; the working set is
//!   shuffled and shared read-only by all later requests
//! - **Fetching**: one GET per (API, address) with a bounded, fixed-delay retry
//!   policy and Content-Encoding aware JSON decoding
//! - **Batching**: all addresses of one API are fetched concurrently and the
//!   results are attributed through the address tag carried by each task
//! - **Aggregation**: API specific extraction rules turn heterogeneous payloads
//!   into one record per address
//!
//! ## Architecture
//!
//! ### Network Layer
//! [`proxy`], [`proxy_pool`], [`retry`], [`decompression`] and [`fetcher`].
//!
//! ### Pipeline Layer
//! [`batch_runner`], [`aggregator`], [`report`] and the [`orchestrator`] that
//! sequences them with a fixed cooldown between APIs.
//!
//! ### Ambient
//! [`settings`] (config file + env overrides), [`inputs`] (line-delimited input
//! files), [`progress`] and [`metrics`].

// Core Types
/// Per-API request descriptors and the built-in endpoint catalog
pub mod api_spec;
/// Proxy descriptors parsed from proxy list lines
pub mod proxy;

// Network Layer
/// Proxy liveness probing and random selection
pub mod proxy_pool;
/// Fixed-delay retry policy
pub mod retry;
/// Content-Encoding aware body decoding
pub mod decompression;
/// Single (API, address) fetch with retries
pub mod fetcher;

// Pipeline Layer
/// Concurrent per-API batch execution
pub mod batch_runner;
/// Extraction and normalization of claim amounts
pub mod aggregator;
/// Combined records, totals and persistence
pub mod report;
/// End-to-end run sequencing
pub mod orchestrator;

// Infrastructure
/// Configuration management
pub mod settings;
/// Address and proxy list loading
pub mod inputs;
/// Progress bars for batch runs
pub mod progress;
/// Metrics and observability
pub mod metrics;

// Re-exports for convenience
pub use api_spec::{ApiCatalog, ApiKind, ApiSpec};
pub use fetcher::{FetchResult, Fetcher};
pub use orchestrator::Orchestrator;
pub use proxy::Proxy;
pub use proxy_pool::ProxyPool;
pub use report::{CombinedRecord, Report};
pub use settings::Settings;
