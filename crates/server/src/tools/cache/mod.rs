//! Cache-related MCP tools.
//!
//! This module provides read-only views into the controller's cache stores.

pub mod get;
pub mod list;

pub use get::{CacheMatchParams, match_impl};
pub use list::{CacheListParams, list_impl};
