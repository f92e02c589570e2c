pub mod decorate;
pub mod lemma;
pub mod tokenizer;

pub use decorate::{escape_html, render_markup, Decorator, DEFAULT_HIGHLIGHT_COLOR};
pub use lemma::VerbLemmatizer;
pub use tokenizer::Tokenizer;
