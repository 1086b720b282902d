//! # Finboard Analytics
//!
//! This crate turns account value histories into net worth figures.
//!
//! ## Architectural Principles
//!
//! - **Layer 1 Logic:** This is a pure logic crate. It has no knowledge of external systems.
//!   It depends only on `core-types` (Layer 0).
//! - **Stateless Calculation:** Every function takes a snapshot of accounts and returns a
//!   fresh result. Nothing is cached between calls, so concurrent requests can each roll
//!   up their own snapshot.
//!
//! ## Public API
//!
//! - `rollup`: Buckets every observation onto a fixed time grid, carrying each account's
//!   latest value forward, and returns the ascending net worth series.
//! - `net_worth_series`: `rollup` for adapters, mapping an empty dataset to an empty series.
//! - `current_totals`: Assets, liabilities and net worth as of the latest observations.
//! - `AnalyticsError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod error;
pub mod rollup;
pub mod totals;

// Re-export the key components to create a clean, public-facing API.
pub use error::AnalyticsError;
pub use rollup::{
    net_worth_series, rollup, round_to_interval, TimeBuckets, MAX_BUCKETS, MAX_INTERVAL_DAYS,
};
pub use totals::{current_totals, NetWorthTotals};
