use crate::aggregation::AggregationEngine;
use crate::orchestrator::{Orchestrator, SearchOutcome};
use opinion_core::{AppConfig, CoreError, SearchQuery, Suggestion};
use solr_client::SearchBackend;
use std::sync::Arc;
use text_analysis::Tokenizer;
use tracing::{debug, info};

/// The user-facing side of searching: remembers the last search and the
/// spelling suggestion on offer.
pub struct SearchSession<B> {
    orchestrator: Orchestrator<B>,
    last: Option<SearchOutcome>,
    pending: Option<Suggestion>,
}

impl<B: SearchBackend> SearchSession<B> {
    pub fn new(orchestrator: Orchestrator<B>) -> Self {
        Self {
            orchestrator,
            last: None,
            pending: None,
        }
    }

    pub fn from_config(backend: B, config: &AppConfig) -> Self {
        let engine = AggregationEngine::from_config(&config.models, Arc::new(Tokenizer::new()));
        Self::new(Orchestrator::new(backend, config.search.clone(), engine))
    }

    pub fn orchestrator(&self) -> &Orchestrator<B> {
        &self.orchestrator
    }

    pub fn last_outcome(&self) -> Option<&SearchOutcome> {
        self.last.as_ref()
    }

    pub fn pending_suggestion(&self) -> Option<&Suggestion> {
        self.pending.as_ref()
    }

    pub fn dismiss_suggestion(&mut self) {
        self.pending = None;
    }

    /// Runs `query` unless it is identical to the last one, in which case the
    /// stored outcome is returned as is.
    pub async fn submit(&mut self, query: SearchQuery) -> Result<SearchOutcome, CoreError> {
        if let Some(last) = &self.last {
            if last.query == query {
                debug!("Query unchanged, reusing previous results");
                return Ok(last.clone());
            }
        }
        self.run(query, true).await
    }

    /// Reruns the last search with the offered correction. The correction is
    /// used up, and the rerun does not offer another one.
    pub async fn accept_suggestion(&mut self) -> Result<Option<SearchOutcome>, CoreError> {
        let Some(suggestion) = self.pending.take() else {
            return Ok(None);
        };
        let Some(last) = &self.last else {
            return Ok(None);
        };

        info!(
            "Accepted suggestion '{}' for '{}'",
            suggestion.suggested, suggestion.original
        );
        let query = last.query.clone().with_text(suggestion.suggested);
        self.run(query, false).await.map(Some)
    }

    async fn run(
        &mut self,
        query: SearchQuery,
        offer_suggestion: bool,
    ) -> Result<SearchOutcome, CoreError> {
        let outcome = self.orchestrator.search(&query, offer_suggestion).await?;
        self.pending = outcome.suggestion.clone();
        self.last = Some(outcome.clone());
        Ok(outcome)
    }
}
