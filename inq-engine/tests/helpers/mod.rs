//! Test Helper Utilities
//!
//! Shared utilities for inq-engine integration tests

#![allow(dead_code)]

pub mod db_utils;
pub mod fixtures;

pub use db_utils::{file_repository, memory_repository, reopen_repository};
pub use fixtures::{acme_lookup, classified, names};
