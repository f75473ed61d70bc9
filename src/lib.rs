//! Medley - resilient media catalog aggregation
//!
//! This library crate exposes the provider resilience and aggregation core
//! for integration testing: error classification, retrying transports,
//! connection probing, the reliability metrics ledger, and content
//! filtering / faceting over normalized media items.

pub mod config;
pub mod error;
pub mod facets;
pub mod filter;
pub mod media;
pub mod metrics;
pub mod providers;
pub mod retry;
pub mod server;
