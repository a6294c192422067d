//! # FDA Common Library
//!
//! Shared code for the financial document analyzer services:
//! - Error types
//! - Bootstrap configuration loading (TOML + environment)
//! - Logging initialization
//! - Human-readable formatting helpers

pub mod config;
pub mod error;
pub mod human_bytes;
pub mod logging;

pub use error::{Error, Result};
pub use human_bytes::format_bytes;
