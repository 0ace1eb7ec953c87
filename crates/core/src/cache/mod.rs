//! SQLite-backed cache stores.
//!
//! This module provides persistent, named `url -> response` stores using
//! SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Lazily created stores, matched in creation order
//! - Wholesale store deletion with cascading entry removal
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod migrations;
pub mod storage;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use storage::CacheStorage;
pub use stores::EntryInfo;
