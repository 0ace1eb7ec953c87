//! Core types and shared functionality for the offline cache controller.
//!
//! This crate provides:
//! - Durable, named cache stores with a SQLite backend
//! - Request/response types shared by the controller and its hosts
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod http;

pub use cache::{CacheDb, CacheStorage};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use http::{Destination, Request, RequestMode, Response, ResponseType};
