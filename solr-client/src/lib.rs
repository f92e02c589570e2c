//! Client for the Solr core holding the scraped EV posts and comments.

pub mod api;
pub mod metrics;
pub mod query;


pub use api::{normalize_document, parse_spellcheck, QueryPage, SearchBackend, SolrApiClient};
pub use metrics::{KindStats, MetricsCollector, RequestKind, RequestRecord, SolrMetrics};
pub use query::{
    build_comment_query, build_post_comment_text_query, build_text_query, QueryExpression,
    QueryPurpose, LINK_ID_PREFIX,
};
