use crate::lemma::VerbLemmatizer;
use std::collections::{HashMap, HashSet};
use unicode_segmentation::UnicodeSegmentation;

/// Turns document text into normalized word tokens.
///
/// Pipeline, in order: word segmentation, ASCII punctuation removal, dropping
/// empty tokens, dropping English stopwords (case-insensitive), verb
/// lemmatization, lowercasing.
///
/// The stopword list is NLTK's English list. Opinion words such as "good" or
/// "better" are not stopwords there and reach the word tables.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    stop_words: HashSet<String>,
    lemmatizer: VerbLemmatizer,
}

impl Tokenizer {
    pub fn new() -> Self {
        let stop_words = stop_words::get(stop_words::LANGUAGE::English)
            .into_iter()
            .filter(|word| !word.is_empty())
            .map(|word| word.to_lowercase())
            .collect();

        Self {
            stop_words,
            lemmatizer: VerbLemmatizer::new(),
        }
    }

    pub fn is_stop_word(&self, word: &str) -> bool {
        self.stop_words.contains(&word.to_lowercase())
    }

    /// Lazily yields the tokens of `text`.
    pub fn tokens<'a>(&'a self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        text.split_word_bounds()
            .map(|segment| {
                segment
                    .chars()
                    .filter(|c| !c.is_ascii_punctuation())
                    .collect::<String>()
            })
            .filter(|token| !token.trim().is_empty())
            .filter(|token| !self.is_stop_word(token))
            .map(|token| self.lemmatizer.lemmatize(&token).to_lowercase())
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.tokens(text).collect()
    }

    pub fn tokenize_freq(&self, text: &str) -> HashMap<String, u64> {
        let mut freq = HashMap::new();
        for token in self.tokens(text) {
            *freq.entry(token).or_insert(0) += 1;
        }
        freq
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}
