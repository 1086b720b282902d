//! # Finboard Database Crate
//!
//! This crate acts as a high-level, application-specific interface to the
//! PostgreSQL database that holds accounts and their value histories.
//!
//! ## Architectural Principles
//!
//! - **Layer 2 Adapter:** This crate is an adapter that encapsulates all database-specific
//!   logic. Callers see the `AccountStore` trait, never SQL.
//! - **Soft Deletes:** Accounts are removed by stamping `deleted_at`. Every query states
//!   `deleted_at IS NULL` explicitly rather than relying on the driver.
//! - **Asynchronous & Pooled:** All operations are asynchronous, and it uses a
//!   connection pool (`PgPool`) for concurrent database access.
//!
//! ## Public API
//!
//! - `connect`: The async function to establish the database connection pool.
//! - `run_migrations`: A utility to apply database migrations, ensuring the schema is up-to-date.
//! - `AccountStore`: The datastore capability injected into the web layer.
//! - `DbRepository`: The PostgreSQL implementation of `AccountStore`.
//! - `DbError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod repository;
pub mod store;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, run_migrations};
pub use error::DbError;
pub use repository::DbRepository;
pub use store::AccountStore;
