//! Verb lemmatization over a bundled verb lexicon.
//!
//! Candidate base forms come from the irregular-form table when the word is
//! listed there, otherwise from detaching regular verb suffixes. Only candidates
//! present in the lexicon survive, and the shortest one wins. Lookup is
//! case-sensitive: `Charging` is left alone while `charging` becomes `charge`.

use std::collections::{HashMap, HashSet};
use tracing::debug;

const VERB_LEXICON: &str = include_str!("../data/verbs.txt");
const VERB_EXCEPTIONS: &str = include_str!("../data/verb_exceptions.txt");

/// Suffix detachment rules, tried in this order.
const SUFFIX_RULES: &[(&str, &str)] = &[
    ("s", ""),
    ("ies", "y"),
    ("es", "e"),
    ("es", ""),
    ("ed", "e"),
    ("ed", ""),
    ("ing", "e"),
    ("ing", ""),
];

#[derive(Debug, Clone)]
pub struct VerbLemmatizer {
    lexicon: HashSet<&'static str>,
    exceptions: HashMap<&'static str, Vec<&'static str>>,
}

impl VerbLemmatizer {
    pub fn new() -> Self {
        let mut lexicon: HashSet<&'static str> = VERB_LEXICON
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();

        let mut exceptions: HashMap<&'static str, Vec<&'static str>> = HashMap::new();
        for line in VERB_EXCEPTIONS.lines() {
            let mut fields = line.split_whitespace();
            let Some(inflected) = fields.next() else {
                continue;
            };
            for base in fields {
                lexicon.insert(base);
                exceptions.entry(inflected).or_default().push(base);
            }
        }

        debug!(
            "Verb lemmatizer loaded {} base forms and {} irregular forms",
            lexicon.len(),
            exceptions.len()
        );

        Self {
            lexicon,
            exceptions,
        }
    }

    pub fn is_verb(&self, word: &str) -> bool {
        self.lexicon.contains(word)
    }

    /// Every lexicon form `word` could be an inflection of, in discovery order.
    pub fn candidates(&self, word: &str) -> Vec<String> {
        let mut forms = vec![word.to_string()];
        match self.exceptions.get(word) {
            Some(bases) => forms.extend(bases.iter().map(|base| base.to_string())),
            None => {
                for (suffix, replacement) in SUFFIX_RULES {
                    if let Some(stem) = word.strip_suffix(suffix) {
                        forms.push(format!("{}{}", stem, replacement));
                    }
                }
            }
        }

        let mut seen = HashSet::new();
        forms
            .into_iter()
            .filter(|form| self.is_verb(form))
            .filter(|form| seen.insert(form.clone()))
            .collect()
    }

    /// The verb lemma of `word`, or `word` itself when it is not a known verb form.
    pub fn lemmatize(&self, word: &str) -> String {
        let mut best: Option<String> = None;
        for candidate in self.candidates(word) {
            // Ties keep the earlier candidate.
            if best.as_ref().map_or(true, |b| candidate.len() < b.len()) {
                best = Some(candidate);
            }
        }
        best.unwrap_or_else(|| word.to_string())
    }
}

impl Default for VerbLemmatizer {
    fn default() -> Self {
        Self::new()
    }
}
