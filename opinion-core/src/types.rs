use crate::error::CoreError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const REDDIT_BASE_URL: &str = "https://www.reddit.com";

const POSTED_ON_FORMAT: &str = "%d %B %Y, %I:%M%p";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown label '{0}'")]
pub struct UnknownLabel(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
    Post,
    Comment,
}

impl DocType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Post => "post",
            DocType::Comment => "comment",
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "post" => Ok(DocType::Post),
            "comment" => Ok(DocType::Comment),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

/// Which documents a search targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    PostsOnly,
    CommentsOnly,
    /// Posts, each expanded with the comments attached to it.
    PostsAndComments,
}

impl ResultType {
    /// The document type the primary query runs against.
    pub fn primary_doc_type(&self) -> DocType {
        match self {
            ResultType::PostsOnly | ResultType::PostsAndComments => DocType::Post,
            ResultType::CommentsOnly => DocType::Comment,
        }
    }
}

impl fmt::Display for ResultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResultType::PostsOnly => "Posts",
            ResultType::CommentsOnly => "Comments",
            ResultType::PostsAndComments => "Posts and Comments",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl FromStr for Sentiment {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(Sentiment::Positive),
            "neutral" => Ok(Sentiment::Neutral),
            "negative" => Ok(Sentiment::Negative),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subjectivity {
    Subjective,
    Objective,
}

impl FromStr for Subjectivity {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "subjective" => Ok(Subjectivity::Subjective),
            "objective" => Ok(Subjectivity::Objective),
            _ => Err(UnknownLabel(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Sentiment,
    Subjectivity,
}

impl Axis {
    pub fn categories(&self) -> &'static [Category] {
        match self {
            Axis::Sentiment => &[Category::Positive, Category::Neutral, Category::Negative],
            Axis::Subjectivity => &[Category::Subjective, Category::Objective],
        }
    }
}

/// A bucket label on either axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Positive,
    Neutral,
    Negative,
    Subjective,
    Objective,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Positive => "positive",
            Category::Neutral => "neutral",
            Category::Negative => "negative",
            Category::Subjective => "subjective",
            Category::Objective => "objective",
        }
    }

    pub fn axis(&self) -> Axis {
        match self {
            Category::Positive | Category::Neutral | Category::Negative => Axis::Sentiment,
            Category::Subjective | Category::Objective => Axis::Subjectivity,
        }
    }

    pub fn html_color(&self) -> &'static str {
        match self {
            Category::Positive => "green",
            Category::Neutral => "gray",
            Category::Negative => "red",
            Category::Subjective => "orange",
            Category::Objective => "blue",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(sentiment) = s.parse::<Sentiment>() {
            return Ok(sentiment.into());
        }
        s.parse::<Subjectivity>().map(Category::from)
    }
}

impl From<Sentiment> for Category {
    fn from(sentiment: Sentiment) -> Self {
        match sentiment {
            Sentiment::Positive => Category::Positive,
            Sentiment::Neutral => Category::Neutral,
            Sentiment::Negative => Category::Negative,
        }
    }
}

impl From<Subjectivity> for Category {
    fn from(subjectivity: Subjectivity) -> Self {
        match subjectivity {
            Subjectivity::Subjective => Category::Subjective,
            Subjectivity::Objective => Category::Objective,
        }
    }
}

/// A retrieved post or comment with its precomputed labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: String,
    pub doc_type: DocType,
    /// Parent reference, comments only.
    pub post_id: Option<String>,
    pub author: String,
    pub text: String,
    pub created_utc: DateTime<Utc>,
    pub permalink: String,
    pub upvote: i64,
    pub subreddit_name: String,
    pub vader_sentiment: Sentiment,
    pub vader_subjectivity: Subjectivity,
    pub textblob_sentiment: Sentiment,
    pub textblob_subjectivity: Subjectivity,
    /// Numeric model scores stored alongside the labels, keyed by field name.
    #[serde(default)]
    pub scores: BTreeMap<String, f64>,
}

impl SearchDocument {
    pub fn reddit_url(&self) -> String {
        format!("{}{}", REDDIT_BASE_URL, self.permalink)
    }

    pub fn posted_on(&self) -> String {
        self.created_utc.format(POSTED_ON_FORMAT).to_string()
    }
}

/// Inclusive calendar-day range on `created_utc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::invalid_input(format!(
                "Date range start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn lower_bound(&self) -> String {
        format!("{}T00:00:00Z", self.start)
    }

    pub fn upper_bound(&self) -> String {
        format!("{}T23:59:59Z", self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    pub result_type: ResultType,
    pub date_range: Option<DateRange>,
    pub exact_phrase: bool,
    pub rows: usize,
}

impl SearchQuery {
    pub const DEFAULT_ROWS: usize = 10;

    pub fn new(text: impl Into<String>, result_type: ResultType) -> Self {
        Self {
            text: text.into(),
            result_type,
            date_range: None,
            exact_phrase: false,
            rows: Self::DEFAULT_ROWS,
        }
    }

    pub fn with_date_range(mut self, date_range: Option<DateRange>) -> Self {
        self.date_range = date_range;
        self
    }

    pub fn with_exact_phrase(mut self, exact_phrase: bool) -> Self {
        self.exact_phrase = exact_phrase;
        self
    }

    pub fn with_rows(mut self, rows: usize) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn terms(&self) -> Vec<&str> {
        self.text.split_whitespace().collect()
    }

    pub fn is_multi_word(&self) -> bool {
        self.text.split_whitespace().nth(1).is_some()
    }

    pub fn validate(&self, min_rows: usize, max_rows: usize) -> Result<(), CoreError> {
        if self.text.trim().is_empty() {
            return Err(CoreError::invalid_input("Please enter keywords."));
        }
        if self.rows < min_rows || self.rows > max_rows {
            return Err(CoreError::invalid_input(format!(
                "Number of results must be between {} and {}, got {}",
                min_rows, max_rows, self.rows
            )));
        }
        Ok(())
    }
}

/// Comments attached to a result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "items", rename_all = "snake_case")]
pub enum CommentSet {
    Flat(Vec<SearchDocument>),
    /// Aligned with the posts: entry `i` holds the comments of post `i`.
    Grouped(Vec<Vec<SearchDocument>>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    posts: Vec<SearchDocument>,
    comments: CommentSet,
}

impl ResultSet {
    pub fn empty() -> Self {
        Self {
            posts: Vec::new(),
            comments: CommentSet::Flat(Vec::new()),
        }
    }

    pub fn posts_only(posts: Vec<SearchDocument>) -> Self {
        Self {
            posts,
            comments: CommentSet::Flat(Vec::new()),
        }
    }

    pub fn comments_only(comments: Vec<SearchDocument>) -> Self {
        Self {
            posts: Vec::new(),
            comments: CommentSet::Flat(comments),
        }
    }

    pub fn threaded(threads: Vec<(SearchDocument, Vec<SearchDocument>)>) -> Self {
        let (posts, groups) = threads.into_iter().unzip();
        Self {
            posts,
            comments: CommentSet::Grouped(groups),
        }
    }

    pub fn posts(&self) -> &[SearchDocument] {
        &self.posts
    }

    pub fn comments(&self) -> &CommentSet {
        &self.comments
    }

    pub fn comment_groups(&self) -> Option<&[Vec<SearchDocument>]> {
        match &self.comments {
            CommentSet::Grouped(groups) => Some(groups),
            CommentSet::Flat(_) => None,
        }
    }

    pub fn flat_comments(&self) -> Option<&[SearchDocument]> {
        match &self.comments {
            CommentSet::Flat(comments) => Some(comments),
            CommentSet::Grouped(_) => None,
        }
    }

    /// Every document in display order: posts first, then comments.
    pub fn documents(&self) -> impl Iterator<Item = &SearchDocument> {
        let (flat, grouped): (&[SearchDocument], &[Vec<SearchDocument>]) = match &self.comments {
            CommentSet::Flat(comments) => (comments, &[]),
            CommentSet::Grouped(groups) => (&[], groups),
        };
        self.posts
            .iter()
            .chain(flat.iter())
            .chain(grouped.iter().flatten())
    }

    pub fn len(&self) -> usize {
        self.documents().count()
    }

    pub fn is_empty(&self) -> bool {
        self.documents().next().is_none()
    }

    pub fn find(&self, id: &str) -> Option<&SearchDocument> {
        self.documents().find(|doc| doc.id == id)
    }
}

/// A spelling correction offered to the user, never applied automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub original: String,
    pub suggested: String,
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Did you mean: {}?", self.suggested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_document(id: &str, doc_type: DocType) -> SearchDocument {
        SearchDocument {
            id: id.to_string(),
            doc_type,
            post_id: None,
            author: "driver42".to_string(),
            text: "Range anxiety is real".to_string(),
            created_utc: Utc.with_ymd_and_hms(2023, 5, 1, 15, 30, 0).unwrap(),
            permalink: format!("/r/electricvehicles/comments/{}/", id),
            upvote: 12,
            subreddit_name: "electricvehicles".to_string(),
            vader_sentiment: Sentiment::Negative,
            vader_subjectivity: Subjectivity::Subjective,
            textblob_sentiment: Sentiment::Neutral,
            textblob_subjectivity: Subjectivity::Objective,
            scores: BTreeMap::new(),
        }
    }

    #[test]
    fn test_label_parsing_is_case_insensitive() {
        assert_eq!("Positive".parse::<Sentiment>(), Ok(Sentiment::Positive));
        assert_eq!(" objective ".parse::<Subjectivity>(), Ok(Subjectivity::Objective));
        assert_eq!("COMMENT".parse::<DocType>(), Ok(DocType::Comment));
        assert!("mixed".parse::<Sentiment>().is_err());
        assert_eq!("neutral".parse::<Category>(), Ok(Category::Neutral));
        assert_eq!("subjective".parse::<Category>(), Ok(Category::Subjective));
    }

    #[test]
    fn test_category_axes() {
        for category in Axis::Sentiment.categories() {
            assert_eq!(category.axis(), Axis::Sentiment);
        }
        for category in Axis::Subjectivity.categories() {
            assert_eq!(category.axis(), Axis::Subjectivity);
        }
        assert_eq!(Category::Negative.html_color(), "red");
    }

    #[test]
    fn test_date_range_bounds() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let range = DateRange::new(start, end).unwrap();
        assert_eq!(range.lower_bound(), "2023-01-01T00:00:00Z");
        assert_eq!(range.upper_bound(), "2023-12-31T23:59:59Z");

        assert!(DateRange::new(end, start).is_err());
        assert!(DateRange::new(start, start).is_ok());
    }

    #[test]
    fn test_query_validation() {
        let query = SearchQuery::new("   ", ResultType::PostsOnly);
        match query.validate(5, 30) {
            Err(CoreError::InvalidInput { message }) => assert_eq!(message, "Please enter keywords."),
            other => panic!("Expected InvalidInput, got {:?}", other),
        }

        let query = SearchQuery::new("tesla", ResultType::PostsOnly).with_rows(31);
        assert!(query.validate(5, 30).is_err());

        let query = SearchQuery::new("tesla", ResultType::PostsOnly).with_rows(5);
        assert!(query.validate(5, 30).is_ok());
    }

    #[test]
    fn test_multi_word_detection() {
        assert!(!SearchQuery::new("  ev  ", ResultType::CommentsOnly).is_multi_word());
        assert!(SearchQuery::new("tesla battery", ResultType::CommentsOnly).is_multi_word());
        assert_eq!(
            SearchQuery::new("tesla  battery fire", ResultType::PostsOnly).terms(),
            vec!["tesla", "battery", "fire"]
        );
    }

    #[test]
    fn test_threaded_result_set_alignment() {
        let post_a = sample_document("a", DocType::Post);
        let post_b = sample_document("b", DocType::Post);
        let comment = sample_document("c1", DocType::Comment);

        let results = ResultSet::threaded(vec![(post_a, vec![comment]), (post_b, Vec::new())]);
        let groups = results.comment_groups().unwrap();
        assert_eq!(results.posts().len(), groups.len());
        assert!(groups[1].is_empty());
        assert_eq!(results.len(), 3);
        assert!(results.find("c1").is_some());
        assert!(results.flat_comments().is_none());
    }

    #[test]
    fn test_empty_result_set() {
        let results = ResultSet::empty();
        assert!(results.is_empty());
        assert_eq!(results.len(), 0);
        assert_eq!(results.flat_comments().map(|c| c.len()), Some(0));
    }

    #[test]
    fn test_document_display_helpers() {
        let doc = sample_document("13ru6m6", DocType::Post);
        assert_eq!(
            doc.reddit_url(),
            "https://www.reddit.com/r/electricvehicles/comments/13ru6m6/"
        );
        assert_eq!(doc.posted_on(), "01 May 2023, 03:30PM");
    }

    #[test]
    fn test_suggestion_display() {
        let suggestion = Suggestion {
            original: "ev".to_string(),
            suggested: "evs".to_string(),
        };
        assert_eq!(suggestion.to_string(), "Did you mean: evs?");
    }
}
