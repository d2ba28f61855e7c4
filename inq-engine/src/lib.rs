//! # Inquisitor engine
//!
//! Asset graph engine for mapping an organization's internet footprint:
//! - `assets`: the five asset kinds, canonicalization and the kind registry
//! - `repository`: deduplicated storage with relation closure
//! - `ownership` / `hierarchy`: ownership inference and parent resolution
//! - `transform` / `scan`: cached, quota-aware OSINT discovery
//! - `lookup` / `sources`: DNS, RDAP, Google Custom Search and Shodan
//! - `commands` / `cli`: the `inq` command-line tool

pub mod assets;
pub mod cli;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod hierarchy;
pub mod lookup;
pub mod ownership;
pub mod repository;
pub mod scan;
pub mod sources;
pub mod transform;
pub mod utils;

pub use crate::error::{InqResult, InquisitorError};
pub use crate::repository::IntelligenceRepository;
