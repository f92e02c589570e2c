//! Terminal and JSON presentation of a search outcome.

use opinion_core::{Axis, Category, DocType, ResultSet, SearchDocument};
use opinion_search::{bucket_name, AggregationState, SearchOutcome};
use serde_json::{json, Value};
use std::fmt::Write;

/// What the user asked to see besides the result list.
#[derive(Debug, Clone, Default)]
pub struct View {
    pub model: Option<String>,
    pub category: Option<Category>,
    pub cloud_size: usize,
}

pub fn labels(doc: &SearchDocument) -> String {
    format!(
        "vader: {}/{}  textblob: {}/{}",
        Category::from(doc.vader_sentiment),
        Category::from(doc.vader_subjectivity),
        Category::from(doc.textblob_sentiment),
        Category::from(doc.textblob_subjectivity),
    )
}

fn write_document(out: &mut String, index: usize, doc: &SearchDocument, indent: &str) {
    let kind = match doc.doc_type {
        DocType::Post => "post",
        DocType::Comment => "comment",
    };
    let _ = writeln!(
        out,
        "{}[{}] {} by u/{} in r/{} on {} ({} upvotes)",
        indent,
        index,
        kind,
        doc.author,
        doc.subreddit_name,
        doc.posted_on(),
        doc.upvote
    );
    let _ = writeln!(out, "{}    {}", indent, doc.reddit_url());
    let _ = writeln!(out, "{}    {}", indent, labels(doc));
    for line in doc.text.lines().filter(|l| !l.trim().is_empty()) {
        let _ = writeln!(out, "{}    > {}", indent, line.trim());
    }
}

fn write_results(out: &mut String, results: &ResultSet) {
    match results.comment_groups() {
        Some(groups) => {
            for (i, (post, group)) in results.posts().iter().zip(groups).enumerate() {
                write_document(out, i + 1, post, "");
                if group.is_empty() {
                    let _ = writeln!(out, "      (no comments)");
                }
                for (j, comment) in group.iter().enumerate() {
                    write_document(out, j + 1, comment, "      ");
                }
                out.push('\n');
            }
        }
        None => {
            for (i, doc) in results.documents().enumerate() {
                write_document(out, i + 1, doc, "");
                out.push('\n');
            }
        }
    }
}

fn percent(share: f64) -> String {
    format!("{:.1}%", share * 100.0)
}

fn write_breakdown(
    out: &mut String,
    state: &AggregationState,
    model: &str,
    query_tokens: &[String],
    cloud_size: usize,
) {
    for axis in [Axis::Sentiment, Axis::Subjectivity] {
        let shares = state.proportions(model, axis);
        if axis.categories().iter().all(|c| state.bucket(model, *c).is_none()) {
            continue;
        }
        let parts: Vec<String> = shares
            .iter()
            .map(|(category, share)| {
                let count = state.counter(&bucket_name(model, *category));
                format!("{} {} ({})", category, percent(*share), count)
            })
            .collect();
        let _ = writeln!(out, "  {} {:?}: {}", model, axis, parts.join(" | "));

        for category in axis.categories() {
            let words = state.word_cloud(model, *category, query_tokens, cloud_size);
            if words.is_empty() {
                continue;
            }
            let listed: Vec<String> = words
                .iter()
                .map(|(word, count)| format!("{}({})", word, count))
                .collect();
            let _ = writeln!(out, "    {} words: {}", category, listed.join(", "));
        }
    }
}

pub fn render_text(outcome: &SearchOutcome, view: &View) -> String {
    let mut out = String::new();
    let query = &outcome.query;

    let _ = writeln!(
        out,
        "Retrieved results in: {:.2} sec",
        outcome.elapsed.as_secs_f64()
    );
    let _ = writeln!(
        out,
        "{} matching \"{}\": {} shown of {} found",
        query.result_type,
        query.text,
        outcome.results.len(),
        outcome.num_found
    );
    if outcome.widened {
        let _ = writeln!(out, "Few exact matches, showing results containing all keywords.");
    }
    for notice in &outcome.notices {
        let _ = writeln!(out, "Notice: {}", notice);
    }
    if let Some(suggestion) = &outcome.suggestion {
        let _ = writeln!(out, "{}", suggestion);
    }
    if !outcome.skipped_documents.is_empty() {
        let _ = writeln!(
            out,
            "{} malformed documents were left out.",
            outcome.skipped_documents.len()
        );
    }
    out.push('\n');

    if outcome.is_empty() {
        let _ = writeln!(out, "No results found.");
        return out;
    }

    match (&view.model, view.category) {
        (Some(model), Some(category)) => {
            let ids = outcome.aggregation.documents_in(model, category);
            let _ = writeln!(out, "{} {} documents: {}\n", model, category, ids.len());
            for (i, id) in ids.iter().enumerate() {
                if let Some(doc) = outcome.results.find(id) {
                    write_document(&mut out, i + 1, doc, "");
                    out.push('\n');
                }
            }
            let words = outcome.aggregation.word_cloud(
                model,
                category,
                &outcome.query_tokens,
                view.cloud_size,
            );
            let listed: Vec<String> = words
                .iter()
                .map(|(word, count)| format!("{}({})", word, count))
                .collect();
            let _ = writeln!(out, "Top words: {}", listed.join(", "));
        }
        (model, _) => {
            write_results(&mut out, &outcome.results);
            let _ = writeln!(out, "Breakdown:");
            let models: Vec<String> = match model {
                Some(model) => vec![model.clone()],
                None => outcome.aggregation.models().to_vec(),
            };
            for model in &models {
                write_breakdown(
                    &mut out,
                    &outcome.aggregation,
                    model,
                    &outcome.query_tokens,
                    view.cloud_size,
                );
            }
        }
    }

    out
}

pub fn render_json(outcome: &SearchOutcome) -> Value {
    let unclassified: Vec<String> = outcome
        .unclassified_documents
        .iter()
        .map(|e| e.to_string())
        .collect();
    let skipped: Vec<String> = outcome
        .skipped_documents
        .iter()
        .map(|e| e.to_string())
        .collect();

    json!({
        "query": outcome.query,
        "num_found": outcome.num_found,
        "widened": outcome.widened,
        "elapsed_secs": outcome.elapsed.as_secs_f64(),
        "suggestion": outcome.suggestion,
        "notices": outcome.notices,
        "skipped_documents": skipped,
        "unclassified_documents": unclassified,
        "results": outcome.results,
        "counters": outcome.aggregation.counters(),
        "aggregation": outcome.aggregation,
    })
}
