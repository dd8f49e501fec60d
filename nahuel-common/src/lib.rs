//! # Nahuel Common Library
//!
//! Shared code for the Nahuel catalog services including:
//! - Database initialization and row models
//! - Configuration loading
//! - Common error type
//! - Utility functions

pub mod config;
pub mod db;
pub mod error;
pub mod uuid_utils;

pub use config::{CodeResolution, ServiceConfig};
pub use error::{Error, Result};
