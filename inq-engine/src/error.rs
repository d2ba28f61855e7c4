//! Error types for inq-engine
//!
//! Errors are split by the layer that raises them:
//! - `ValidationError`: canonicalization rejected a raw identifier
//! - `LookupError`: DNS/RDAP collaborator failures while deriving attributes
//! - `SourceError`: OSINT source failures while paging through results
//! - `InquisitorError`: everything the repository, engine and commands return

use crate::assets::AssetKind;
use thiserror::Error;

/// A raw identifier failed canonicalization for its asset kind
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid {kind} '{input}': {reason}")]
pub struct ValidationError {
    /// Kind whose canonicalizer rejected the input
    pub kind: AssetKind,
    /// Raw input as received
    pub input: String,
    /// Human-readable rejection reason
    pub reason: String,
}

impl ValidationError {
    pub fn new(kind: AssetKind, input: &str, reason: impl Into<String>) -> Self {
        Self {
            kind,
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Registration/DNS lookup errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    /// Rate limit, timeout or transport failure; worth retrying
    #[error("Transient lookup failure: {0}")]
    Transient(String),

    /// The registry has no data for the subject
    #[error("No registration data: {0}")]
    NotFound(String),

    /// The registry answered with something unparseable
    #[error("Malformed registration data: {0}")]
    Malformed(String),
}

impl LookupError {
    pub fn is_transient(&self) -> bool {
        matches!(self, LookupError::Transient(_))
    }
}

/// Result type for lookup operations
pub type LookupResult<T> = Result<T, LookupError>;

/// OSINT source errors
///
/// None of these are fatal to a scan: the source stops paging and whatever
/// was gathered so far is returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("Source unavailable: {0}")]
    Unavailable(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("API error {0}: {1}")]
    Http(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Query budget exhausted for {0}")]
    QuotaExhausted(String),

    #[error("Cancelled")]
    Cancelled,
}

/// Result type for source operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum InquisitorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The same key was placed into more than one classification bucket
    #[error("Conflicting classifications for {kind}: {}", .keys.join(", "))]
    ConflictingClassification { kind: AssetKind, keys: Vec<String> },

    /// A stored record does not map onto its kind's schema
    #[error("Corrupt {kind} record '{key}': {reason}")]
    CorruptRecord {
        kind: AssetKind,
        key: String,
        reason: String,
    },

    #[error("Store error: {0}")]
    Store(#[from] inq_common::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No valid transform sources available")]
    NoSources,

    #[error("No assets available to transform; seed the database with the classify command")]
    NoOwnedAssets,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for engine operations
pub type InqResult<T> = Result<T, InquisitorError>;
