//! Builds the boolean expressions sent to the `search_reddit` core.
//!
//! Field names and syntax (`AND`, quoted phrases, `[start TO end]` ranges)
//! follow the Solr standard query parser, so the server interprets every
//! expression exactly as written here.

use opinion_core::{CoreError, DateRange, DocType};

/// Reddit marks link (post) ids with this prefix in a comment's parent reference.
pub const LINK_ID_PREFIX: &str = "t3_";

/// Results are always ranked by community votes.
pub const UPVOTE_DESC: &str = "upvote desc";

const DEFAULT_ROWS: usize = 10;

const SPECIAL_CHARS: &[char] = &[
    '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\',
    '/',
];

/// Which step of a search an expression serves. Only used for accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryPurpose {
    Primary,
    Widened,
    CommentLookup,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryExpression {
    q: String,
    rows: usize,
    sort: &'static str,
    purpose: QueryPurpose,
}

impl QueryExpression {
    fn new(q: String, purpose: QueryPurpose) -> Self {
        Self {
            q,
            rows: DEFAULT_ROWS,
            sort: UPVOTE_DESC,
            purpose,
        }
    }

    pub fn with_rows(mut self, rows: usize) -> Self {
        self.rows = rows;
        self
    }

    /// Marks a primary expression as the all-terms retry of a phrase search.
    pub fn widened(mut self) -> Self {
        if self.purpose == QueryPurpose::Primary {
            self.purpose = QueryPurpose::Widened;
        }
        self
    }

    pub fn purpose(&self) -> QueryPurpose {
        self.purpose
    }

    pub fn q(&self) -> &str {
        &self.q
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn sort(&self) -> &str {
        self.sort
    }

    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        vec![
            ("q", self.q.clone()),
            ("rows", self.rows.to_string()),
            ("sort", self.sort.to_string()),
        ]
    }
}

/// Backslash-escapes query-parser operators inside a single term.
pub fn escape_term(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if SPECIAL_CHARS.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn escape_phrase(phrase: &str) -> String {
    phrase.replace('\\', "\\\\").replace('"', "\\\"")
}

fn text_clause(query: &str, phrase_search: bool) -> Result<String, CoreError> {
    let terms: Vec<&str> = query.split_whitespace().collect();
    let clause = match terms.as_slice() {
        [] => return Err(CoreError::invalid_input("Please enter keywords.")),
        [word] => format!("text:({})", escape_term(word)),
        _ if phrase_search => format!("text:\"{}\"", escape_phrase(&terms.join(" "))),
        _ => {
            let all_terms: Vec<String> = terms.iter().map(|term| escape_term(term)).collect();
            format!("text:({})", all_terms.join(" AND "))
        }
    };
    Ok(clause)
}

fn parent_reference(post_id: &str) -> String {
    let bare = post_id.strip_prefix(LINK_ID_PREFIX).unwrap_or(post_id);
    format!("{}{}", LINK_ID_PREFIX, escape_term(bare))
}

/// Expression for the primary search of one document type.
///
/// A single word is matched as `text:(word)` whatever `phrase_search` says.
/// Several words need either the exact phrase or every term in any order.
pub fn build_text_query(
    query: &str,
    doc_type: DocType,
    date_range: Option<&DateRange>,
    phrase_search: bool,
) -> Result<QueryExpression, CoreError> {
    let mut q = text_clause(query, phrase_search)?;
    q.push_str(&format!(" AND type:{}", doc_type));

    if let Some(range) = date_range {
        q.push_str(&format!(
            " AND created_utc:[{} TO {}]",
            range.lower_bound(),
            range.upper_bound()
        ));
    }

    Ok(QueryExpression::new(q, QueryPurpose::Primary))
}

/// All comments attached to a post, without any text restriction.
pub fn build_comment_query(post_id: &str, num_rows: usize) -> QueryExpression {
    let q = format!("post_id:{} AND type:comment", parent_reference(post_id));
    QueryExpression::new(q, QueryPurpose::CommentLookup).with_rows(num_rows)
}

/// Comments of a post that also match the query text.
pub fn build_post_comment_text_query(
    post_id: &str,
    query: &str,
    phrase_search: bool,
    num_rows: usize,
) -> Result<QueryExpression, CoreError> {
    let q = format!(
        "post_id:{} AND {} AND type:comment",
        parent_reference(post_id),
        text_clause(query, phrase_search)?
    );
    Ok(QueryExpression::new(q, QueryPurpose::CommentLookup).with_rows(num_rows))
}
