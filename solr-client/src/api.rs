use crate::metrics::{MetricsCollector, RequestKind, RequestRecord, SolrMetrics};
use crate::query::QueryExpression;
use chrono::{DateTime, Utc};
use opinion_core::{
    CoreError, DocType, DocumentError, SearchDocument, SearchServerError, SolrConfig,
};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const QUERY_ENDPOINT: &str = "/query";
const SPELL_ENDPOINT: &str = "/spell";
const SCORE_SUFFIX: &str = "_score";

/// The search-server operations the rest of the system depends on.
pub trait SearchBackend {
    async fn query(&self, expression: &QueryExpression) -> Result<QueryPage, CoreError>;

    /// Zero or one replacement for `text`.
    async fn suggest(&self, text: &str) -> Result<Option<String>, CoreError>;
}

/// One page of normalized results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage {
    pub num_found: u64,
    pub docs: Vec<SearchDocument>,
    /// Records dropped because they could not be normalized.
    pub skipped: Vec<DocumentError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolrQueryResponse {
    #[serde(rename = "responseHeader")]
    pub response_header: Option<SolrResponseHeader>,
    pub response: SolrResultPage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolrResponseHeader {
    pub status: i32,
    #[serde(rename = "QTime")]
    pub q_time: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolrResultPage {
    #[serde(rename = "numFound")]
    pub num_found: u64,
    #[serde(default)]
    pub start: u64,
    #[serde(default)]
    pub docs: Vec<Map<String, Value>>,
}

impl SolrQueryResponse {
    pub fn into_page(self) -> QueryPage {
        let mut page = QueryPage {
            num_found: self.response.num_found,
            ..QueryPage::default()
        };

        for raw in &self.response.docs {
            match normalize_document(raw) {
                Ok(doc) => page.docs.push(doc),
                Err(e) => {
                    warn!("Skipping malformed document: {}", e);
                    page.skipped.push(e);
                }
            }
        }

        page
    }
}

/// Multi-valued fields arrive as single-element arrays; take the first value.
fn first_value<'a>(raw: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    match raw.get(field)? {
        Value::Array(values) => values.first(),
        Value::Null => None,
        value => Some(value),
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn optional_string(raw: &Map<String, Value>, field: &str) -> Option<String> {
    first_value(raw, field).and_then(value_as_string)
}

fn required_string(raw: &Map<String, Value>, id: &str, field: &str) -> Result<String, DocumentError> {
    optional_string(raw, field).ok_or_else(|| DocumentError::MissingField {
        id: id.to_string(),
        field: field.to_string(),
    })
}

fn required_label<T: FromStr>(
    raw: &Map<String, Value>,
    id: &str,
    field: &str,
) -> Result<T, DocumentError> {
    let value = required_string(raw, id, field)?;
    value.parse().map_err(|_| DocumentError::InvalidLabel {
        id: id.to_string(),
        field: field.to_string(),
        value,
    })
}

fn integer_field(raw: &Map<String, Value>, field: &str) -> i64 {
    match first_value(raw, field) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or_default(),
        Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => 0,
    }
}

fn score_fields(raw: &Map<String, Value>) -> BTreeMap<String, f64> {
    raw.keys()
        .filter(|key| key.ends_with(SCORE_SUFFIX))
        .filter_map(|key| {
            let score = first_value(raw, key)?.as_f64()?;
            Some((key.clone(), score))
        })
        .collect()
}

/// Flattens a stored Solr record into a `SearchDocument`.
pub fn normalize_document(raw: &Map<String, Value>) -> Result<SearchDocument, DocumentError> {
    let id = required_string(raw, "<unknown>", "id")?;

    let created = required_string(raw, &id, "created_utc")?;
    let created_utc = DateTime::parse_from_rfc3339(&created)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DocumentError::InvalidTimestamp {
            id: id.clone(),
            value: created.clone(),
        })?;

    let doc_type: DocType = required_label(raw, &id, "type")?;

    Ok(SearchDocument {
        doc_type,
        post_id: optional_string(raw, "post_id"),
        author: optional_string(raw, "author").unwrap_or_default(),
        text: required_string(raw, &id, "text")?,
        created_utc,
        permalink: optional_string(raw, "permalink").unwrap_or_default(),
        upvote: integer_field(raw, "upvote"),
        subreddit_name: optional_string(raw, "subreddit_name").unwrap_or_default(),
        vader_sentiment: required_label(raw, &id, "vader_sentiment")?,
        vader_subjectivity: required_label(raw, &id, "vader_subjectivity")?,
        textblob_sentiment: required_label(raw, &id, "textblob_sentiment")?,
        textblob_subjectivity: required_label(raw, &id, "textblob_subjectivity")?,
        scores: score_fields(raw),
        id,
    })
}

fn collation_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(o) => o.get("collationQuery")?.as_str().map(str::to_string),
        _ => None,
    }
}

fn suggestion_word(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(o) => o.get("word")?.as_str().map(str::to_string),
        _ => None,
    }
}

/// Extracts the best correction from a `/spell` response.
///
/// Prefers the collation (the whole corrected query) and falls back to the
/// first per-word suggestion. Handles both the flat and the map rendering of
/// Solr named lists.
pub fn parse_spellcheck(body: &Value) -> Option<String> {
    let spellcheck = body.get("spellcheck")?;

    let collation = match spellcheck.get("collations") {
        Some(Value::Array(items)) => items
            .chunks(2)
            .find(|pair| pair[0].as_str() == Some("collation"))
            .and_then(|pair| pair.get(1))
            .and_then(collation_text),
        Some(Value::Object(map)) => map.get("collation").and_then(collation_text),
        _ => None,
    };

    let suggestion = || {
        let entry = match spellcheck.get("suggestions")? {
            Value::Array(items) => items.get(1)?.clone(),
            Value::Object(map) => map.values().next()?.clone(),
            _ => return None,
        };
        entry
            .get("suggestion")?
            .as_array()?
            .first()
            .and_then(suggestion_word)
    };

    collation
        .or_else(suggestion)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[derive(Debug)]
pub struct SolrApiClient {
    http_client: Client,
    core_url: String,
    metrics: Arc<MetricsCollector>,
}

impl SolrApiClient {
    pub fn new(config: &SolrConfig) -> Result<Self, CoreError> {
        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let core_url = format!(
            "{}/{}",
            config.base_url.trim_end_matches('/'),
            config.core
        );
        info!("Solr client targeting {}", core_url);

        Ok(Self {
            http_client,
            core_url,
            metrics: Arc::new(MetricsCollector::new()),
        })
    }

    pub fn core_url(&self) -> &str {
        &self.core_url
    }

    async fn make_request(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Response, CoreError> {
        let url = format!("{}{}", self.core_url, endpoint);

        info!("Making Solr request: GET {}", endpoint);
        match self.http_client.get(&url).query(params).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("Request successful: {} {}", response.status(), endpoint);
                Ok(response)
            }
            Ok(response) => {
                let status_code = response.status().as_u16();
                error!("Request failed with status: {} for {}", status_code, endpoint);

                if response.status().is_server_error() {
                    Err(SearchServerError::ServerError { status_code }.into())
                } else {
                    Err(SearchServerError::RequestRejected { status_code }.into())
                }
            }
            Err(e) => {
                error!("Network error for {}: {}", endpoint, e);

                if e.is_timeout() {
                    Err(SearchServerError::RequestTimeout.into())
                } else if e.is_connect() {
                    Err(SearchServerError::Unreachable { url }.into())
                } else {
                    Err(CoreError::Network(e))
                }
            }
        }
    }

    /// Records the finished request and hands back its value.
    async fn account<T>(
        &self,
        kind: RequestKind,
        started: Instant,
        result: Result<SolrReply<T>, CoreError>,
        documents: impl Fn(&T) -> u64,
    ) -> Result<T, CoreError> {
        let round_trip = started.elapsed();
        let record = match &result {
            Ok(reply) => RequestRecord {
                kind,
                status_code: Some(reply.status_code),
                round_trip,
                q_time: reply.q_time.map(Duration::from_millis),
                documents: documents(&reply.value),
                error: None,
            },
            Err(e) => RequestRecord {
                kind,
                status_code: failed_status(e),
                round_trip,
                q_time: None,
                documents: 0,
                error: Some(match e {
                    CoreError::SearchServer(inner) => format!("{:?}", inner),
                    other => other.to_string(),
                }),
            },
        };
        if let Some(q_time) = record.q_time {
            debug!(
                "{:?} request took {:?}, {:?} inside Solr",
                kind, round_trip, q_time
            );
        }
        self.metrics.record(record).await;

        result.map(|reply| reply.value)
    }

    pub async fn select(&self, expression: &QueryExpression) -> Result<QueryPage, CoreError> {
        let started = Instant::now();
        let result = self.fetch_page(expression).await;
        let page = self
            .account(expression.purpose().into(), started, result, |page: &QueryPage| {
                page.docs.len() as u64
            })
            .await?;

        info!(
            "Retrieved {} of {} documents for {}",
            page.docs.len(),
            page.num_found,
            expression.q()
        );
        Ok(page)
    }

    async fn fetch_page(
        &self,
        expression: &QueryExpression,
    ) -> Result<SolrReply<QueryPage>, CoreError> {
        let params = expression.to_params();
        let response = self.make_request(QUERY_ENDPOINT, &params).await?;
        let status_code = response.status().as_u16();

        let body: SolrQueryResponse = response.json().await.map_err(|e| {
            error!("Failed to parse query response: {}", e);
            CoreError::SearchServer(SearchServerError::InvalidResponse {
                details: format!("Failed to parse results for {}", expression.q()),
            })
        })?;

        let mut q_time = None;
        if let Some(header) = &body.response_header {
            if header.status != 0 {
                return Err(SearchServerError::InvalidResponse {
                    details: format!("Solr reported status {}", header.status),
                }
                .into());
            }
            q_time = header.q_time;
        }

        Ok(SolrReply {
            value: body.into_page(),
            status_code,
            q_time,
        })
    }

    pub async fn spell_check(&self, text: &str) -> Result<Option<String>, CoreError> {
        let started = Instant::now();
        let result = self.fetch_suggestion(text).await;
        let suggestion = self
            .account(RequestKind::Spellcheck, started, result, |s: &Option<String>| {
                s.is_some() as u64
            })
            .await?;

        debug!("Spellcheck for '{}' suggested {:?}", text, suggestion);
        Ok(suggestion)
    }

    async fn fetch_suggestion(&self, text: &str) -> Result<SolrReply<Option<String>>, CoreError> {
        let params = [
            ("indent", "true".to_string()),
            ("spellcheck.q", text.to_string()),
            ("spellcheck", "true".to_string()),
            ("spellcheck.collate", "true".to_string()),
        ];
        let response = self.make_request(SPELL_ENDPOINT, &params).await?;
        let status_code = response.status().as_u16();

        let body: Value = response.json().await.map_err(|e| {
            error!("Failed to parse spellcheck response: {}", e);
            CoreError::SearchServer(SearchServerError::InvalidResponse {
                details: "Failed to parse spellcheck response".to_string(),
            })
        })?;

        Ok(SolrReply {
            q_time: body
                .pointer("/responseHeader/QTime")
                .and_then(Value::as_u64),
            value: parse_spellcheck(&body),
            status_code,
        })
    }

    pub async fn get_metrics(&self) -> SolrMetrics {
        self.metrics.snapshot().await
    }

    pub async fn export_metrics(&self) -> Result<String, serde_json::Error> {
        self.metrics.export_json().await
    }

    pub async fn reset_metrics(&self) {
        self.metrics.reset().await;
    }
}

/// A decoded response with the facts kept for accounting.
struct SolrReply<T> {
    value: T,
    status_code: u16,
    q_time: Option<u64>,
}

fn failed_status(error: &CoreError) -> Option<u16> {
    match error {
        CoreError::SearchServer(SearchServerError::ServerError { status_code })
        | CoreError::SearchServer(SearchServerError::RequestRejected { status_code }) => {
            Some(*status_code)
        }
        _ => None,
    }
}

impl SearchBackend for SolrApiClient {
    async fn query(&self, expression: &QueryExpression) -> Result<QueryPage, CoreError> {
        self.select(expression).await
    }

    async fn suggest(&self, text: &str) -> Result<Option<String>, CoreError> {
        self.spell_check(text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opinion_core::{Sentiment, Subjectivity};
    use serde_json::json;

    fn raw(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_normalize_single_element_arrays() {
        let doc = normalize_document(&raw(json!({
            "id": "jq3c9x",
            "type": ["comment"],
            "post_id": ["t3_13ru6m6"],
            "author": ["volt_owner"],
            "text": ["Buyback complete, surrendered it back to ford today"],
            "created_utc": "2023-05-26T08:15:00Z",
            "permalink": ["/r/electricvehicles/comments/13ru6m6/_/jq3c9x/"],
            "upvote": [57],
            "subreddit_name": ["electricvehicles"],
            "vader_sentiment": ["Positive"],
            "vader_subjectivity": ["objective"],
            "textblob_sentiment": ["neutral"],
            "textblob_subjectivity": ["subjective"],
            "roberta_score": [0.82],
            "_version_": 1790000000000000000u64
        })))
        .unwrap();

        assert_eq!(doc.id, "jq3c9x");
        assert_eq!(doc.doc_type, DocType::Comment);
        assert_eq!(doc.post_id.as_deref(), Some("t3_13ru6m6"));
        assert_eq!(doc.upvote, 57);
        assert_eq!(doc.vader_sentiment, Sentiment::Positive);
        assert_eq!(doc.textblob_subjectivity, Subjectivity::Subjective);
        assert_eq!(doc.scores.get("roberta_score"), Some(&0.82));
        assert_eq!(doc.scores.len(), 1);
    }

    #[test]
    fn test_normalize_missing_label_is_error() {
        let result = normalize_document(&raw(json!({
            "id": "p1",
            "type": ["post"],
            "text": ["hello"],
            "created_utc": "2023-05-26T08:15:00Z",
            "vader_sentiment": ["positive"],
            "vader_subjectivity": ["objective"],
            "textblob_sentiment": ["neutral"]
        })));

        assert_eq!(
            result,
            Err(DocumentError::MissingField {
                id: "p1".to_string(),
                field: "textblob_subjectivity".to_string(),
            })
        );
    }

    #[test]
    fn test_normalize_rejects_unknown_label() {
        let result = normalize_document(&raw(json!({
            "id": "p2",
            "type": ["post"],
            "text": ["hello"],
            "created_utc": "2023-05-26T08:15:00Z",
            "vader_sentiment": ["mixed"],
            "vader_subjectivity": ["objective"],
            "textblob_sentiment": ["neutral"],
            "textblob_subjectivity": ["objective"]
        })));

        assert!(matches!(result, Err(DocumentError::InvalidLabel { .. })));
    }

    #[test]
    fn test_response_into_page_skips_malformed() {
        let response: SolrQueryResponse = serde_json::from_value(json!({
            "responseHeader": {"status": 0, "QTime": 3},
            "response": {
                "numFound": 2,
                "start": 0,
                "docs": [
                    {
                        "id": "p1",
                        "type": ["post"],
                        "text": ["Lightning range test"],
                        "created_utc": "2023-01-02T03:04:05Z",
                        "vader_sentiment": ["neutral"],
                        "vader_subjectivity": ["objective"],
                        "textblob_sentiment": ["neutral"],
                        "textblob_subjectivity": ["objective"]
                    },
                    {"id": "broken", "type": ["post"]}
                ]
            }
        }))
        .unwrap();

        let page = response.into_page();
        assert_eq!(page.num_found, 2);
        assert_eq!(page.docs.len(), 1);
        assert_eq!(page.skipped.len(), 1);
        assert_eq!(page.docs[0].upvote, 0);
        assert_eq!(page.docs[0].author, "");
    }

    #[test]
    fn test_parse_spellcheck_flat_collation() {
        let body = json!({
            "spellcheck": {
                "suggestions": ["ev", {"numFound": 1, "startOffset": 0, "endOffset": 2, "suggestion": ["evs"]}],
                "collations": ["collation", "evs"]
            }
        });
        assert_eq!(parse_spellcheck(&body), Some("evs".to_string()));
    }

    #[test]
    fn test_parse_spellcheck_extended_collation() {
        let body = json!({
            "spellcheck": {
                "suggestions": [],
                "collations": ["collation", {"collationQuery": "tesla", "hits": 120}]
            }
        });
        assert_eq!(parse_spellcheck(&body), Some("tesla".to_string()));
    }

    #[test]
    fn test_parse_spellcheck_falls_back_to_word_suggestion() {
        let body = json!({
            "spellcheck": {
                "suggestions": ["teslaa", {"numFound": 1, "suggestion": [{"word": "tesla", "freq": 40}]}]
            }
        });
        assert_eq!(parse_spellcheck(&body), Some("tesla".to_string()));
    }

    #[test]
    fn test_parse_spellcheck_without_suggestion() {
        let body = json!({"spellcheck": {"suggestions": [], "collations": []}});
        assert_eq!(parse_spellcheck(&body), None);
        assert_eq!(parse_spellcheck(&json!({"responseHeader": {"status": 0}})), None);
    }
}
