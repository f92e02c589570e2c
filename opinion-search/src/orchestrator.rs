use crate::aggregation::{AggregationEngine, AggregationState};
use opinion_core::{
    CommentLookup, CoreError, DocType, DocumentError, ErrorExt, ResultSet, ResultType,
    SearchDocument, SearchQuery, SearchSettings, Suggestion,
};
use solr_client::{
    build_comment_query, build_post_comment_text_query, build_text_query, QueryExpression,
    QueryPage, SearchBackend,
};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Everything one search action produced.
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub query: SearchQuery,
    pub results: ResultSet,
    /// Match count reported for the primary search, after widening.
    pub num_found: u64,
    pub aggregation: AggregationState,
    /// Tokens of the query text, left out of word clouds.
    pub query_tokens: Vec<String>,
    pub suggestion: Option<Suggestion>,
    pub widened: bool,
    pub elapsed: Duration,
    /// User-facing messages for degraded steps.
    pub notices: Vec<String>,
    /// Records the server returned that could not be normalized.
    pub skipped_documents: Vec<DocumentError>,
    /// Displayed documents that could not be bucketed.
    pub unclassified_documents: Vec<DocumentError>,
}

impl SearchOutcome {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Mutable state of the search in flight. Reset at the start of every search.
#[derive(Debug, Clone)]
pub struct SearchContext {
    engine: AggregationEngine,
    absorbed: HashSet<String>,
    notices: Vec<String>,
    skipped_documents: Vec<DocumentError>,
    unclassified_documents: Vec<DocumentError>,
}

impl SearchContext {
    pub fn new(engine: AggregationEngine) -> Self {
        Self {
            engine,
            absorbed: HashSet::new(),
            notices: Vec::new(),
            skipped_documents: Vec::new(),
            unclassified_documents: Vec::new(),
        }
    }

    pub fn reset(&mut self) {
        self.engine.reset();
        self.absorbed.clear();
        self.notices.clear();
        self.skipped_documents.clear();
        self.unclassified_documents.clear();
    }

    pub fn aggregation(&self) -> &AggregationState {
        self.engine.state()
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    /// Buckets `doc` unless it was already absorbed during this search.
    pub fn absorb(&mut self, doc: &SearchDocument) {
        if !self.absorbed.insert(doc.id.clone()) {
            debug!("Document {} already absorbed", doc.id);
            return;
        }
        if let Err(e) = self.engine.absorb(doc) {
            self.unclassified_documents.push(e);
        }
    }

    fn notice(&mut self, message: String) {
        if !self.notices.contains(&message) {
            self.notices.push(message);
        }
    }

    fn query_tokens(&self, text: &str) -> Vec<String> {
        self.engine.tokenizer().tokenize(text)
    }
}

/// Runs search actions against a backend: primary query, lenient widening,
/// spelling suggestion, comment expansion, aggregation.
pub struct Orchestrator<B> {
    backend: B,
    settings: SearchSettings,
    context: SearchContext,
}

impl<B: SearchBackend> Orchestrator<B> {
    pub fn new(backend: B, settings: SearchSettings, engine: AggregationEngine) -> Self {
        Self {
            backend,
            settings,
            context: SearchContext::new(engine),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub fn context(&self) -> &SearchContext {
        &self.context
    }

    /// Executes one search action.
    ///
    /// Only invalid input is an error. Server failures degrade to empty results
    /// and are reported through the outcome's notices.
    pub async fn search(
        &mut self,
        query: &SearchQuery,
        offer_suggestion: bool,
    ) -> Result<SearchOutcome, CoreError> {
        query.validate(self.settings.min_rows, self.settings.max_rows)?;
        let started = Instant::now();
        self.context.reset();

        info!(
            "Searching {} for '{}' (exact: {}, rows: {})",
            query.result_type, query.text, query.exact_phrase, query.rows
        );

        let doc_type = query.result_type.primary_doc_type();
        let primary = build_text_query(
            &query.text,
            doc_type,
            query.date_range.as_ref(),
            query.exact_phrase,
        )?
        .with_rows(query.rows);

        let mut page = self.fetch(&primary).await;
        let mut widened = false;

        let under_cap = |page: &Option<QueryPage>| {
            page.as_ref().is_some_and(|p| p.num_found < query.rows as u64)
        };

        if under_cap(&page) && query.is_multi_word() && query.exact_phrase {
            info!(
                "Phrase search found fewer than {} results, widening to all terms",
                query.rows
            );
            let lenient =
                build_text_query(&query.text, doc_type, query.date_range.as_ref(), false)?
                    .with_rows(query.rows)
                    .widened();
            if let Some(wider) = self.fetch(&lenient).await {
                widened = true;
                page = Some(merge_pages(page.unwrap_or_default(), wider, query.rows));
            }
        }

        let mut suggestion = None;
        if offer_suggestion && under_cap(&page) && !query.is_multi_word() {
            suggestion = self.suggest(&query.text).await;
        }

        let page = page.unwrap_or_default();
        let num_found = page.num_found;
        let results = match query.result_type {
            ResultType::PostsOnly => ResultSet::posts_only(page.docs),
            ResultType::CommentsOnly => ResultSet::comments_only(page.docs),
            ResultType::PostsAndComments => {
                let mut threads = Vec::with_capacity(page.docs.len());
                for post in page.docs {
                    let comments = self.expand_comments(&post, query).await;
                    threads.push((post, comments));
                }
                ResultSet::threaded(threads)
            }
        };

        for doc in results.documents() {
            self.context.absorb(doc);
        }

        if results.is_empty() {
            info!("No documents matched '{}'", query.text);
        }

        let elapsed = started.elapsed();
        debug!(
            "Search for '{}' finished in {:.2}s with {} documents",
            query.text,
            elapsed.as_secs_f64(),
            results.len()
        );

        Ok(SearchOutcome {
            query: query.clone(),
            results,
            num_found,
            aggregation: self.context.aggregation().clone(),
            query_tokens: self.context.query_tokens(&query.text),
            suggestion,
            widened,
            elapsed,
            notices: self.context.notices.clone(),
            skipped_documents: self.context.skipped_documents.clone(),
            unclassified_documents: self.context.unclassified_documents.clone(),
        })
    }

    /// One query round trip. A failure is logged, noted, and read as no result.
    async fn fetch(&mut self, expression: &QueryExpression) -> Option<QueryPage> {
        match self.backend.query(expression).await {
            Ok(mut page) => {
                for skipped in &page.skipped {
                    warn!("Dropped malformed document: {}", skipped);
                }
                self.context.skipped_documents.append(&mut page.skipped);
                Some(page)
            }
            Err(e) => {
                e.log_error();
                self.context.notice(e.user_friendly_message());
                None
            }
        }
    }

    async fn suggest(&mut self, text: &str) -> Option<Suggestion> {
        match self.backend.suggest(text).await {
            Ok(Some(suggested)) => {
                let suggested = suggested.trim();
                if suggested.is_empty() || suggested.eq_ignore_ascii_case(text.trim()) {
                    debug!("Ignoring spelling suggestion identical to '{}'", text);
                    return None;
                }
                info!("Offering spelling suggestion '{}' for '{}'", suggested, text);
                Some(Suggestion {
                    original: text.to_string(),
                    suggested: suggested.to_string(),
                })
            }
            Ok(None) => None,
            Err(e) => {
                e.log_warn();
                self.context.notice(e.user_friendly_message());
                None
            }
        }
    }

    /// The comment group of one post. Lookup failures yield an empty group.
    async fn expand_comments(
        &mut self,
        post: &SearchDocument,
        query: &SearchQuery,
    ) -> Vec<SearchDocument> {
        let limit = self.settings.comments_per_post;
        let tiers = match comment_tiers(&post.id, query, limit, self.settings.comment_lookup) {
            Ok(tiers) => tiers,
            Err(e) => {
                e.log_warn();
                vec![build_comment_query(&post.id, limit)]
            }
        };

        let mut seen = HashSet::new();
        let mut comments = Vec::new();
        for tier in tiers {
            if comments.len() >= limit {
                break;
            }
            let Some(page) = self.fetch(&tier).await else {
                warn!("Comment lookup failed for post {}", post.id);
                continue;
            };
            for comment in page.docs {
                if comment.doc_type != DocType::Comment {
                    continue;
                }
                if comments.len() < limit && seen.insert(comment.id.clone()) {
                    comments.push(comment);
                }
            }
        }

        debug!("Post {} has {} comments attached", post.id, comments.len());
        comments
    }
}

fn comment_tiers(
    post_id: &str,
    query: &SearchQuery,
    limit: usize,
    lookup: CommentLookup,
) -> Result<Vec<QueryExpression>, CoreError> {
    let mut tiers = Vec::new();
    if lookup == CommentLookup::TextThenPost {
        tiers.push(build_post_comment_text_query(
            post_id,
            &query.text,
            query.exact_phrase,
            limit,
        )?);
        if query.is_multi_word() && query.exact_phrase {
            tiers.push(build_post_comment_text_query(
                post_id,
                &query.text,
                false,
                limit,
            )?);
        }
    }
    tiers.push(build_comment_query(post_id, limit));
    Ok(tiers)
}

/// Phrase matches first, then lenient matches not already present, up to `rows`.
fn merge_pages(strict: QueryPage, lenient: QueryPage, rows: usize) -> QueryPage {
    let mut seen = HashSet::new();
    let mut docs = Vec::with_capacity(rows);
    for doc in strict.docs.into_iter().chain(lenient.docs) {
        if docs.len() < rows && seen.insert(doc.id.clone()) {
            docs.push(doc);
        }
    }

    QueryPage {
        num_found: strict.num_found.max(lenient.num_found),
        docs,
        skipped: Vec::new(),
    }
}
