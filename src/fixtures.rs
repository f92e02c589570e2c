use chrono::{TimeZone, Utc};
use opinion_core::{
    DocType, ModelsConfig, ResultSet, ResultType, SearchDocument, SearchQuery, Sentiment,
    Subjectivity,
};
use opinion_search::{AggregationEngine, SearchOutcome};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use text_analysis::Tokenizer;

fn comment(id: &str, text: &str, sentiment: Sentiment) -> SearchDocument {
    SearchDocument {
        id: id.to_string(),
        doc_type: DocType::Comment,
        post_id: Some("t3_p1".to_string()),
        author: "driver42".to_string(),
        text: text.to_string(),
        created_utc: Utc.with_ymd_and_hms(2023, 5, 30, 14, 5, 0).unwrap(),
        permalink: format!("/r/electricvehicles/comments/p1/{}/", id),
        upvote: 7,
        subreddit_name: "electricvehicles".to_string(),
        vader_sentiment: sentiment,
        vader_subjectivity: Subjectivity::Objective,
        textblob_sentiment: Sentiment::Neutral,
        textblob_subjectivity: Subjectivity::Subjective,
        scores: BTreeMap::new(),
    }
}

/// Two comments for "tesla", one positive and one negative under VADER.
pub fn outcome() -> SearchOutcome {
    let docs = vec![
        comment("c1", "tesla battery", Sentiment::Positive),
        comment("c2", "tesla recall", Sentiment::Negative),
    ];

    let tokenizer = Arc::new(Tokenizer::new());
    let mut engine = AggregationEngine::from_config(&ModelsConfig::default(), tokenizer.clone());
    for doc in &docs {
        engine.absorb(doc).unwrap();
    }

    SearchOutcome {
        query: SearchQuery::new("tesla", ResultType::CommentsOnly),
        results: ResultSet::comments_only(docs),
        num_found: 2,
        aggregation: engine.state().clone(),
        query_tokens: tokenizer.tokenize("tesla"),
        suggestion: None,
        widened: false,
        elapsed: Duration::from_millis(420),
        notices: Vec::new(),
        skipped_documents: Vec::new(),
        unclassified_documents: Vec::new(),
    }
}
