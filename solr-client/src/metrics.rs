//! Request accounting for one Solr client.
//!
//! Requests are grouped by the search step they serve, so a slow search can be
//! traced to its primary query, the all-terms retry, the per-post comment
//! lookups or the spellchecker. Solr's own `QTime` is kept next to the
//! measured round trip.

use crate::query::QueryPurpose;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Primary,
    Widened,
    CommentLookup,
    Spellcheck,
}

impl From<QueryPurpose> for RequestKind {
    fn from(purpose: QueryPurpose) -> Self {
        match purpose {
            QueryPurpose::Primary => RequestKind::Primary,
            QueryPurpose::Widened => RequestKind::Widened,
            QueryPurpose::CommentLookup => RequestKind::CommentLookup,
        }
    }
}

/// One finished request.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub kind: RequestKind,
    /// HTTP status, when a response arrived at all.
    pub status_code: Option<u16>,
    pub round_trip: Duration,
    /// Server-side time from `responseHeader.QTime`.
    pub q_time: Option<Duration>,
    pub documents: u64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KindStats {
    pub requests: u64,
    pub failures: u64,
    pub documents: u64,
    pub total_round_trip: Duration,
    pub total_q_time: Duration,
    q_time_samples: u64,
    pub statuses: BTreeMap<u16, u64>,
    pub last_error: Option<String>,
}

impl KindStats {
    fn add(&mut self, record: &RequestRecord) {
        self.requests += 1;
        self.documents += record.documents;
        self.total_round_trip += record.round_trip;
        if let Some(q_time) = record.q_time {
            self.total_q_time += q_time;
            self.q_time_samples += 1;
        }
        if let Some(status) = record.status_code {
            *self.statuses.entry(status).or_insert(0) += 1;
        }
        if let Some(error) = &record.error {
            self.failures += 1;
            self.last_error = Some(error.clone());
        }
    }

    pub fn average_round_trip(&self) -> Duration {
        if self.requests == 0 {
            Duration::ZERO
        } else {
            self.total_round_trip / self.requests as u32
        }
    }

    /// Mean `QTime` over the requests that reported one.
    pub fn average_q_time(&self) -> Option<Duration> {
        (self.q_time_samples > 0).then(|| self.total_q_time / self.q_time_samples as u32)
    }

    /// Round trip not spent inside Solr: network, queueing and JSON decoding.
    pub fn average_overhead(&self) -> Option<Duration> {
        self.average_q_time()
            .map(|q_time| self.average_round_trip().saturating_sub(q_time))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SolrMetrics {
    pub total_requests: u64,
    pub failed_requests: u64,
    pub last_request_at: Option<DateTime<Utc>>,
    pub by_kind: BTreeMap<RequestKind, KindStats>,
}

impl SolrMetrics {
    pub fn kind(&self, kind: RequestKind) -> Option<&KindStats> {
        self.by_kind.get(&kind)
    }
}

#[derive(Debug, Default)]
pub struct MetricsCollector {
    metrics: Arc<RwLock<SolrMetrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, record: RequestRecord) {
        let mut metrics = self.metrics.write().await;
        metrics.total_requests += 1;
        if record.error.is_some() {
            metrics.failed_requests += 1;
        }
        metrics.last_request_at = Some(Utc::now());
        metrics.by_kind.entry(record.kind).or_default().add(&record);
    }

    pub async fn snapshot(&self) -> SolrMetrics {
        self.metrics.read().await.clone()
    }

    pub async fn reset(&self) {
        *self.metrics.write().await = SolrMetrics::default();
    }

    pub async fn export_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.snapshot().await)
    }
}
