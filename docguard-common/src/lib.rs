//! # DocGuard Common Library
//!
//! Shared code for the DocGuard service crates:
//! - Error types
//! - Bootstrap configuration and root folder resolution
//! - SQLite pool setup
//! - Event types and the broadcast EventBus

pub mod config;
pub mod db;
pub mod error;
pub mod events;

pub use error::{Error, Result};
