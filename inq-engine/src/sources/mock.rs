//! Scripted source for tests
//!
//! Answers queries from a fixed table and records every query it receives,
//! so tests can assert on quota spent.

use super::{materialize, Discovery, QueryOutcome, Source, SourceKind};
use crate::assets::AssetKind;
use crate::error::SourceError;
use crate::repository::IntelligenceRepository;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct MockSource {
    kind: SourceKind,
    responses: HashMap<String, Vec<Discovery>>,
    failures: HashMap<String, SourceError>,
    delays: HashMap<String, Duration>,
    queries: Mutex<Vec<String>>,
}

impl MockSource {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            responses: HashMap::new(),
            failures: HashMap::new(),
            delays: HashMap::new(),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Answer `query` with the given (kind, raw identifier) pairs
    pub fn respond(mut self, query: &str, found: &[(AssetKind, &str)]) -> Self {
        self.responses.insert(
            query.to_string(),
            found.iter().map(|(kind, raw)| Discovery::new(*kind, *raw)).collect(),
        );
        self
    }

    /// Answer `query` with fully specified discoveries
    pub fn respond_with(mut self, query: &str, found: Vec<Discovery>) -> Self {
        self.responses.insert(query.to_string(), found);
        self
    }

    /// Hold `query` for `delay` before answering
    pub fn stall(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    /// Answer `query` with its scripted discoveries (if any) and then `error`
    pub fn fail(mut self, query: &str, error: SourceError) -> Self {
        self.failures.insert(query.to_string(), error);
        self
    }

    /// Every query received so far, in order
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[async_trait]
impl Source for MockSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn transform(
        &self,
        repo: &IntelligenceRepository,
        query: &str,
        cancel: &CancellationToken,
    ) -> QueryOutcome {
        if cancel.is_cancelled() {
            return QueryOutcome {
                assets: Vec::new(),
                error: Some(SourceError::Cancelled),
            };
        }

        self.queries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(query.to_string());

        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }

        let discoveries = self.responses.get(query).cloned().unwrap_or_default();
        QueryOutcome {
            assets: materialize(repo, discoveries).await,
            error: self.failures.get(query).cloned(),
        }
    }
}
