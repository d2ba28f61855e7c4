//! Kind registration table
//!
//! Built once at startup and handed to the repository and the commands.
//! Maps each kind to its storage collection, identity field and
//! canonicalizer.

use super::{block, email, host, linkedin, registrant, AssetKind};
use crate::error::ValidationError;

pub type Canonicalizer = fn(&str) -> Result<String, ValidationError>;

#[derive(Debug, Clone, Copy)]
pub struct KindSpec {
    pub kind: AssetKind,
    /// Storage collection (also the dump's top-level key)
    pub repository: &'static str,
    /// Name of the JSON field holding the canonical key
    pub identity_field: &'static str,
    pub canonicalize: Canonicalizer,
}

/// Indexed by `AssetKind as usize`
#[derive(Debug, Clone)]
pub struct AssetRegistry {
    specs: [KindSpec; 5],
}

fn spec(kind: AssetKind, repository: &'static str, canonicalize: Canonicalizer) -> KindSpec {
    KindSpec {
        kind,
        repository,
        identity_field: kind.name(),
        canonicalize,
    }
}

impl AssetRegistry {
    /// All five kinds in status/dump order
    pub fn standard() -> Self {
        Self {
            specs: [
                spec(AssetKind::Registrant, "registrants", registrant::canonicalize),
                spec(AssetKind::Block, "blocks", block::canonicalize),
                spec(AssetKind::Host, "hosts", host::canonicalize),
                spec(AssetKind::Email, "emails", email::canonicalize),
                spec(AssetKind::LinkedIn, "linkedins", linkedin::canonicalize),
            ],
        }
    }

    pub fn spec(&self, kind: AssetKind) -> &KindSpec {
        &self.specs[kind as usize]
    }

    pub fn canonicalize(&self, kind: AssetKind, raw: &str) -> Result<String, ValidationError> {
        (self.spec(kind).canonicalize)(raw)
    }

    pub fn iter(&self) -> impl Iterator<Item = &KindSpec> {
        self.specs.iter()
    }
}

impl Default for AssetRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
