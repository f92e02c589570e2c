//! Display decoration for document text: query-term highlighting and the small
//! inline markup Reddit users write (`*italic*`, `**bold**`, `[underline]`).

use regex::{Captures, Regex};
use std::sync::OnceLock;
use tracing::warn;

pub const DEFAULT_HIGHLIGHT_COLOR: &str = "#FF4B4B";

static ITALIC: OnceLock<Regex> = OnceLock::new();
static BOLD: OnceLock<Regex> = OnceLock::new();
static UNDERLINE: OnceLock<Regex> = OnceLock::new();

fn markup_pattern(cell: &'static OnceLock<Regex>, pattern: &str) -> Option<&'static Regex> {
    if let Some(re) = cell.get() {
        return Some(re);
    }
    match Regex::new(pattern) {
        Ok(re) => Some(cell.get_or_init(|| re)),
        Err(e) => {
            warn!("Invalid markup pattern {}: {}", pattern, e);
            None
        }
    }
}

fn substitute(text: String, pattern: Option<&Regex>, replacement: &str) -> String {
    match pattern {
        Some(re) => re.replace_all(&text, replacement).into_owned(),
        None => text,
    }
}

/// Expands inline markup into HTML.
///
/// Italic runs first, then bold, then underline. A `**x**` run is consumed by
/// the italic pass as two empty emphasis pairs before the bold pass sees it.
pub fn render_markup(text: &str) -> String {
    let text = substitute(
        text.to_string(),
        markup_pattern(&ITALIC, r"\*(.*?)\*"),
        "<em>${1}</em>",
    );
    let text = substitute(
        text,
        markup_pattern(&BOLD, r"\*\*(.*?)\*\*"),
        "<strong>${1}</strong>",
    );
    substitute(
        text,
        markup_pattern(&UNDERLINE, r"\[(.*?)\]"),
        "<u>${1}</u>",
    )
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[derive(Debug, Clone)]
pub struct Decorator {
    highlight_color: String,
}

impl Decorator {
    pub fn new(highlight_color: impl Into<String>) -> Self {
        Self {
            highlight_color: highlight_color.into(),
        }
    }

    pub fn highlight_color(&self) -> &str {
        &self.highlight_color
    }

    /// Wraps every whole-word, case-insensitive occurrence of each query term.
    ///
    /// Terms are applied one after another; a later term may match inside
    /// markup inserted for an earlier one.
    pub fn highlight(&self, query: &str, text: &str) -> String {
        let mut highlighted = text.to_string();
        for term in query.split_whitespace() {
            let pattern = format!(r"(?i)\b{}\b", regex::escape(term));
            let re = match Regex::new(&pattern) {
                Ok(re) => re,
                Err(e) => {
                    warn!("Skipping highlight for term {:?}: {}", term, e);
                    continue;
                }
            };
            highlighted = re
                .replace_all(&highlighted, |caps: &Captures| {
                    format!(
                        "<span style='color:{};'><strong>{}</strong></span>",
                        self.highlight_color, &caps[0]
                    )
                })
                .into_owned();
        }
        highlighted
    }

    /// Highlight then markup, the order documents are displayed in.
    pub fn decorate(&self, query: &str, text: &str) -> String {
        render_markup(&self.highlight(query, text))
    }

    /// `decorate` for raw text that still needs HTML escaping.
    ///
    /// Terms are matched against the raw text in a single pass and every
    /// segment is escaped on its own, so a term never lands inside an entity
    /// such as `&amp;`.
    pub fn decorate_escaped(&self, query: &str, text: &str) -> String {
        let terms: Vec<String> = query.split_whitespace().map(regex::escape).collect();
        if terms.is_empty() {
            return render_markup(&escape_html(text));
        }

        let pattern = format!(r"(?i)\b(?:{})\b", terms.join("|"));
        let re = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(e) => {
                warn!("Skipping highlight for {:?}: {}", query, e);
                return render_markup(&escape_html(text));
            }
        };

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for found in re.find_iter(text) {
            out.push_str(&escape_html(&text[last..found.start()]));
            out.push_str(&format!(
                "<span style='color:{};'><strong>{}</strong></span>",
                self.highlight_color,
                escape_html(found.as_str())
            ));
            last = found.end();
        }
        out.push_str(&escape_html(&text[last..]));
        render_markup(&out)
    }
}

impl Default for Decorator {
    fn default() -> Self {
        Self::new(DEFAULT_HIGHLIGHT_COLOR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrapped(word: &str) -> String {
        format!("<span style='color:#FF4B4B;'><strong>{}</strong></span>", word)
    }

    #[test]
    fn test_highlight_is_case_insensitive_and_keeps_original_case() {
        let decorator = Decorator::default();
        let out = decorator.highlight("tesla", "My Tesla and your TESLA");
        assert_eq!(out, format!("My {} and your {}", wrapped("Tesla"), wrapped("TESLA")));
    }

    #[test]
    fn test_highlight_respects_word_boundaries() {
        let decorator = Decorator::default();
        assert_eq!(
            decorator.highlight("ev", "evs are not an ev"),
            format!("evs are not an {}", wrapped("ev"))
        );
    }

    #[test]
    fn test_highlight_escapes_terms() {
        let decorator = Decorator::default();
        let out = decorator.highlight("f-150", "the f-150 lightning");
        assert_eq!(out, format!("the {} lightning", wrapped("f-150")));
        assert_eq!(decorator.highlight("(", "a ( b"), "a ( b");
    }

    #[test]
    fn test_highlight_multiple_terms() {
        let decorator = Decorator::new("green");
        let out = decorator.highlight("ford lightning", "Ford Lightning owners");
        assert_eq!(
            out,
            "<span style='color:green;'><strong>Ford</strong></span> \
             <span style='color:green;'><strong>Lightning</strong></span> owners"
        );
    }

    #[test]
    fn test_later_terms_match_inside_inserted_markup() {
        let decorator = Decorator::default();
        let out = decorator.highlight("battery strong", "battery");
        assert!(out.starts_with("<span style='color:#FF4B4B;'><<span"));
    }

    #[test]
    fn test_decorate_escaped_keeps_entities_intact() {
        let decorator = Decorator::default();
        let out = decorator.decorate_escaped("amp lt", "Tom & Jerry <3 the amp");
        assert_eq!(out, format!("Tom &amp; Jerry &lt;3 the {}", wrapped("amp")));

        let out = decorator.decorate_escaped("tesla", "<b>*Tesla*</b>");
        assert_eq!(out, format!("&lt;b&gt;<em>{}</em>&lt;/b&gt;", wrapped("Tesla")));
        assert_eq!(decorator.decorate_escaped("", "a & b"), "a &amp; b");
    }

    #[test]
    fn test_markup_basic() {
        assert_eq!(
            render_markup("*really* good [range]"),
            "<em>really</em> good <u>range</u>"
        );
    }

    #[test]
    fn test_markup_italic_pass_runs_first() {
        assert_eq!(render_markup("**bold**"), "<em></em>bold<em></em>");
        assert_eq!(render_markup("no markers"), "no markers");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b & \"c\""), "a &lt; b &amp; &quot;c&quot;");
    }
}
