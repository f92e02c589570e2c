//! Static HTML dashboard page.

use opinion_core::{Axis, Category, SearchDocument};
use opinion_search::SearchOutcome;
use std::fmt::Write;
use std::path::Path;
use text_analysis::{escape_html, Decorator};

const MIN_FONT_PX: u64 = 12;
const MAX_FONT_PX: u64 = 48;

const STYLE: &str = "body{font-family:sans-serif;max-width:960px;margin:2em auto;color:#222}\
.doc{border:1px solid #ddd;border-radius:6px;padding:.8em;margin:.8em 0}\
.comments{margin-left:2em}\
.meta{color:#666;font-size:.85em}\
.badge{color:#fff;border-radius:4px;padding:0 .4em;margin-right:.3em;font-size:.8em}\
.bar{display:flex;height:1.2em;border-radius:4px;overflow:hidden;margin:.3em 0}\
.cloud span{margin:0 .3em;display:inline-block}\
.notice{background:#fff3cd;padding:.5em;border-radius:4px}";

fn badge(category: Category) -> String {
    format!(
        "<span class='badge' style='background:{};'>{}</span>",
        category.html_color(),
        category
    )
}

fn write_document(out: &mut String, doc: &SearchDocument, query: &str, decorator: &Decorator) {
    let _ = write!(
        out,
        "<div class='doc'><div class='meta'>u/{} &middot; r/{} &middot; {} &middot; {} upvotes &middot; \
         <a href='{}'>open on Reddit</a></div><div>vader {}{} textblob {}{}</div><p>{}</p></div>",
        escape_html(&doc.author),
        escape_html(&doc.subreddit_name),
        doc.posted_on(),
        doc.upvote,
        escape_html(&doc.reddit_url()),
        badge(doc.vader_sentiment.into()),
        badge(doc.vader_subjectivity.into()),
        badge(doc.textblob_sentiment.into()),
        badge(doc.textblob_subjectivity.into()),
        decorator.decorate_escaped(query, &doc.text),
    );
}

fn font_size(count: u64, max: u64) -> u64 {
    if max == 0 {
        return MIN_FONT_PX;
    }
    MIN_FONT_PX + (MAX_FONT_PX - MIN_FONT_PX) * count / max
}

fn write_breakdown(out: &mut String, outcome: &SearchOutcome, cloud_size: usize) {
    let state = &outcome.aggregation;
    for model in state.models() {
        let _ = write!(out, "<h3>{}</h3>", escape_html(model));
        for axis in [Axis::Sentiment, Axis::Subjectivity] {
            if axis.categories().iter().all(|c| state.bucket(model, *c).is_none()) {
                continue;
            }
            out.push_str("<div class='bar'>");
            for (category, share) in state.proportions(model, axis) {
                if share > 0.0 {
                    let _ = write!(
                        out,
                        "<div title='{} {:.1}%' style='width:{:.1}%;background:{};'></div>",
                        category,
                        share * 100.0,
                        share * 100.0,
                        category.html_color()
                    );
                }
            }
            out.push_str("</div>");

            for category in axis.categories() {
                let words = state.word_cloud(model, *category, &outcome.query_tokens, cloud_size);
                if words.is_empty() {
                    continue;
                }
                let max = words.first().map_or(0, |(_, n)| *n);
                let _ = write!(out, "<div class='cloud'>{} ", badge(*category));
                for (word, count) in &words {
                    let _ = write!(
                        out,
                        "<span style='font-size:{}px;color:{};'>{}</span>",
                        font_size(*count, max),
                        category.html_color(),
                        escape_html(word)
                    );
                }
                out.push_str("</div>");
            }
        }
    }
}

pub fn render_page(outcome: &SearchOutcome, decorator: &Decorator, cloud_size: usize) -> String {
    let query = &outcome.query.text;
    let mut out = String::new();
    let _ = write!(
        out,
        "<!DOCTYPE html><html><head><meta charset='utf-8'><title>EV opinions: {}</title>\
         <style>{}</style></head><body><h1>EV Reddit opinions</h1>",
        escape_html(query),
        STYLE
    );
    let _ = write!(
        out,
        "<p class='meta'>{} matching <strong>{}</strong>: {} of {} found. \
         Retrieved results in: {:.2} sec</p>",
        outcome.query.result_type,
        escape_html(query),
        outcome.results.len(),
        outcome.num_found,
        outcome.elapsed.as_secs_f64()
    );

    for notice in &outcome.notices {
        let _ = write!(out, "<p class='notice'>{}</p>", escape_html(notice));
    }
    if let Some(suggestion) = &outcome.suggestion {
        let _ = write!(out, "<p class='notice'>{}</p>", escape_html(&suggestion.to_string()));
    }

    if outcome.is_empty() {
        out.push_str("<p>No results found.</p></body></html>");
        return out;
    }

    out.push_str("<h2>Breakdown</h2>");
    write_breakdown(&mut out, outcome, cloud_size);

    out.push_str("<h2>Results</h2>");
    match outcome.results.comment_groups() {
        Some(groups) => {
            for (post, group) in outcome.results.posts().iter().zip(groups) {
                write_document(&mut out, post, query, decorator);
                out.push_str("<div class='comments'>");
                for comment in group {
                    write_document(&mut out, comment, query, decorator);
                }
                out.push_str("</div>");
            }
        }
        None => {
            for doc in outcome.results.documents() {
                write_document(&mut out, doc, query, decorator);
            }
        }
    }

    out.push_str("</body></html>");
    out
}

pub fn write_page(
    path: &Path,
    outcome: &SearchOutcome,
    decorator: &Decorator,
    cloud_size: usize,
) -> std::io::Result<()> {
    std::fs::write(path, render_page(outcome, decorator, cloud_size))
}
