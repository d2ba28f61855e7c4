//! # Inquisitor Common Library
//!
//! Shared code for the inquisitor workspace:
//! - Error and result types
//! - Configuration loading (TOML bootstrap file, environment, root folder)
//! - SQLite database initialization

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
