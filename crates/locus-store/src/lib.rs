#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/locus-rs/locus/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Store backends for locus records.
//!
//! This crate provides implementations of the [`Store`] trait from `locus-core`:
//!
//! - [`SqliteStore`] - Persistent SQLite-based store (default, requires `sqlite` feature)
//! - [`ZenohStore`] - Broadcast store publishing to a zenoh topic (requires `zenoh` feature)
//! - [`InMemoryStore`] - Simple in-memory store for testing
//! - [`NoopStore`] - No-op store that discards everything

/// In-memory store implementation.
pub mod memory;
/// No-op store implementation.
pub mod noop;

/// SQLite-based store implementation.
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Zenoh broadcast store implementation.
#[cfg(feature = "zenoh")]
pub mod broadcast;

// Re-export the trait for convenience
pub use locus_core::Store;

// Re-export implementations
pub use memory::InMemoryStore;
pub use noop::NoopStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

#[cfg(feature = "zenoh")]
pub use broadcast::ZenohStore;
