//! Per-search sentiment and subjectivity buckets.
//!
//! Every absorbed document lands in exactly one sentiment bucket and, for
//! models that label subjectivity, exactly one subjectivity bucket per model.
//! A bucket keeps a document count, the merged token frequencies of its
//! documents and their ids.

use opinion_core::{
    Axis, Category, DocumentError, ModelsConfig, ScoreThresholdConfig, SearchDocument,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use text_analysis::Tokenizer;
use tracing::{debug, warn};

/// Source of one model's labels for a document.
pub trait SentimentModel: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    fn axes(&self) -> &'static [Axis];

    fn classify(&self, doc: &SearchDocument, axis: Axis) -> Result<Category, DocumentError>;
}

const BOTH_AXES: &[Axis] = &[Axis::Sentiment, Axis::Subjectivity];
const SENTIMENT_ONLY: &[Axis] = &[Axis::Sentiment];

#[derive(Debug, Clone, Copy, Default)]
pub struct Vader;

impl SentimentModel for Vader {
    fn name(&self) -> &str {
        "vader"
    }

    fn axes(&self) -> &'static [Axis] {
        BOTH_AXES
    }

    fn classify(&self, doc: &SearchDocument, axis: Axis) -> Result<Category, DocumentError> {
        Ok(match axis {
            Axis::Sentiment => doc.vader_sentiment.into(),
            Axis::Subjectivity => doc.vader_subjectivity.into(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TextBlob;

impl SentimentModel for TextBlob {
    fn name(&self) -> &str {
        "textblob"
    }

    fn axes(&self) -> &'static [Axis] {
        BOTH_AXES
    }

    fn classify(&self, doc: &SearchDocument, axis: Axis) -> Result<Category, DocumentError> {
        Ok(match axis {
            Axis::Sentiment => doc.textblob_sentiment.into(),
            Axis::Subjectivity => doc.textblob_subjectivity.into(),
        })
    }
}

/// Sentiment derived from a stored numeric score, e.g. a transformer model's
/// compound output.
#[derive(Debug, Clone)]
pub struct ScoreThresholdModel {
    config: ScoreThresholdConfig,
}

impl ScoreThresholdModel {
    pub fn new(config: ScoreThresholdConfig) -> Self {
        Self { config }
    }
}

impl SentimentModel for ScoreThresholdModel {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn axes(&self) -> &'static [Axis] {
        SENTIMENT_ONLY
    }

    fn classify(&self, doc: &SearchDocument, _axis: Axis) -> Result<Category, DocumentError> {
        let score = doc
            .scores
            .get(&self.config.score_field)
            .copied()
            .ok_or_else(|| DocumentError::MissingScore {
                id: doc.id.clone(),
                model: self.config.name.clone(),
            })?;

        Ok(if score > self.config.positive_above {
            Category::Positive
        } else if score < self.config.negative_below {
            Category::Negative
        } else {
            Category::Neutral
        })
    }
}

pub fn bucket_name(model: &str, category: Category) -> String {
    format!("{}_{}", model, category)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Bucket {
    pub count: u64,
    pub words: HashMap<String, u64>,
    pub doc_ids: Vec<String>,
}

impl Bucket {
    fn add(&mut self, doc_id: &str, tokens: &HashMap<String, u64>) {
        self.count += 1;
        self.doc_ids.push(doc_id.to_string());
        for (token, n) in tokens {
            *self.words.entry(token.clone()).or_insert(0) += n;
        }
    }
}

/// Counters and word tables for one search.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregationState {
    models: Vec<String>,
    buckets: BTreeMap<String, Bucket>,
    documents_absorbed: u64,
}

impl AggregationState {
    fn for_models(models: &[Arc<dyn SentimentModel>]) -> Self {
        let mut buckets = BTreeMap::new();
        for model in models {
            for axis in model.axes() {
                for category in axis.categories() {
                    buckets.insert(bucket_name(model.name(), *category), Bucket::default());
                }
            }
        }

        Self {
            models: models.iter().map(|m| m.name().to_string()).collect(),
            buckets,
            documents_absorbed: 0,
        }
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn documents_absorbed(&self) -> u64 {
        self.documents_absorbed
    }

    /// Counter by bucket name, e.g. `vader_positive`. Unknown names read as zero.
    pub fn counter(&self, name: &str) -> u64 {
        self.buckets.get(name).map_or(0, |b| b.count)
    }

    pub fn counters(&self) -> BTreeMap<String, u64> {
        self.buckets
            .iter()
            .map(|(name, bucket)| (name.clone(), bucket.count))
            .collect()
    }

    pub fn bucket(&self, model: &str, category: Category) -> Option<&Bucket> {
        self.buckets.get(&bucket_name(model, category))
    }

    pub fn documents_in(&self, model: &str, category: Category) -> &[String] {
        self.bucket(model, category)
            .map(|b| b.doc_ids.as_slice())
            .unwrap_or(&[])
    }

    /// Share of each category on `axis`. All zeros when nothing was absorbed
    /// or the model does not label that axis.
    pub fn proportions(&self, model: &str, axis: Axis) -> Vec<(Category, f64)> {
        let counts: Vec<(Category, u64)> = axis
            .categories()
            .iter()
            .map(|c| (*c, self.bucket(model, *c).map_or(0, |b| b.count)))
            .collect();
        let total: u64 = counts.iter().map(|(_, n)| n).sum();

        counts
            .into_iter()
            .map(|(c, n)| {
                let share = if total == 0 {
                    0.0
                } else {
                    n as f64 / total as f64
                };
                (c, share)
            })
            .collect()
    }

    /// Most frequent words of a bucket, most frequent first, ties alphabetical.
    pub fn word_cloud(
        &self,
        model: &str,
        category: Category,
        exclude: &[String],
        top_n: usize,
    ) -> Vec<(String, u64)> {
        let Some(bucket) = self.bucket(model, category) else {
            return Vec::new();
        };
        let excluded: HashSet<&str> = exclude.iter().map(String::as_str).collect();

        let mut words: Vec<(String, u64)> = bucket
            .words
            .iter()
            .filter(|(token, _)| !excluded.contains(token.as_str()))
            .map(|(token, n)| (token.clone(), *n))
            .collect();
        words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        words.truncate(top_n);
        words
    }
}

#[derive(Debug, Clone)]
pub struct AggregationEngine {
    models: Vec<Arc<dyn SentimentModel>>,
    tokenizer: Arc<Tokenizer>,
    state: AggregationState,
}

impl AggregationEngine {
    pub fn new(models: Vec<Arc<dyn SentimentModel>>, tokenizer: Arc<Tokenizer>) -> Self {
        let state = AggregationState::for_models(&models);
        Self {
            models,
            tokenizer,
            state,
        }
    }

    /// VADER and TextBlob, plus the score-threshold model when configured.
    ///
    /// A score-threshold model named like a built-in one is left out so the
    /// two never share buckets.
    pub fn from_config(config: &ModelsConfig, tokenizer: Arc<Tokenizer>) -> Self {
        let mut models: Vec<Arc<dyn SentimentModel>> =
            vec![Arc::new(Vader), Arc::new(TextBlob)];
        if let Some(threshold) = &config.score_threshold {
            let clashes = models
                .iter()
                .any(|m| m.name().eq_ignore_ascii_case(threshold.name.trim()));
            if clashes {
                warn!(
                    "Score-threshold model {} clashes with a built-in model, ignoring it",
                    threshold.name
                );
            } else {
                debug!("Enabling score-threshold model {}", threshold.name);
                models.push(Arc::new(ScoreThresholdModel::new(threshold.clone())));
            }
        }
        Self::new(models, tokenizer)
    }

    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    pub fn state(&self) -> &AggregationState {
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = AggregationState::for_models(&self.models);
    }

    /// Adds one document to its buckets.
    ///
    /// Either every bucket of the document is updated or none is. Absorbing the
    /// same document twice counts it twice.
    pub fn absorb(&mut self, doc: &SearchDocument) -> Result<(), DocumentError> {
        let mut targets = Vec::new();
        for model in &self.models {
            for axis in model.axes() {
                let category = model.classify(doc, *axis).map_err(|e| {
                    warn!(
                        "Cannot classify document {} with {}: {}",
                        doc.id,
                        model.name(),
                        e
                    );
                    e
                })?;
                targets.push(bucket_name(model.name(), category));
            }
        }

        let tokens = self.tokenizer.tokenize_freq(&doc.text);
        for name in targets {
            self.state
                .buckets
                .entry(name)
                .or_default()
                .add(&doc.id, &tokens);
        }
        self.state.documents_absorbed += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use opinion_core::{DocType, Sentiment, Subjectivity};

    fn doc(
        id: &str,
        text: &str,
        sentiment: Sentiment,
        subjectivity: Subjectivity,
    ) -> SearchDocument {
        SearchDocument {
            id: id.to_string(),
            doc_type: DocType::Post,
            post_id: None,
            author: "driver42".to_string(),
            text: text.to_string(),
            created_utc: Utc.with_ymd_and_hms(2023, 5, 30, 14, 5, 0).unwrap(),
            permalink: format!("/r/electricvehicles/comments/{}/", id),
            upvote: 12,
            subreddit_name: "electricvehicles".to_string(),
            vader_sentiment: sentiment,
            vader_subjectivity: subjectivity,
            textblob_sentiment: Sentiment::Neutral,
            textblob_subjectivity: Subjectivity::Subjective,
            scores: BTreeMap::new(),
        }
    }

    fn engine() -> AggregationEngine {
        AggregationEngine::from_config(&ModelsConfig::default(), Arc::new(Tokenizer::new()))
    }

    fn roberta() -> ScoreThresholdConfig {
        ScoreThresholdConfig {
            name: "roberta".to_string(),
            score_field: "roberta_score".to_string(),
            positive_above: 0.05,
            negative_below: -0.05,
        }
    }

    #[test]
    fn test_reset_state_has_ten_zeroed_counters() {
        let engine = engine();
        let counters = engine.state().counters();
        assert_eq!(counters.len(), 10);
        assert!(counters.values().all(|n| *n == 0));
        assert_eq!(engine.state().models(), &["vader", "textblob"]);
    }

    #[test]
    fn test_third_model_adds_three_counters() {
        let models = ModelsConfig {
            score_threshold: Some(roberta()),
        };
        let engine = AggregationEngine::from_config(&models, Arc::new(Tokenizer::new()));
        assert_eq!(engine.state().counters().len(), 13);
    }

    #[test]
    fn test_third_model_named_like_builtin_is_ignored() {
        let models = ModelsConfig {
            score_threshold: Some(ScoreThresholdConfig {
                name: "Vader".to_string(),
                ..roberta()
            }),
        };
        let mut engine = AggregationEngine::from_config(&models, Arc::new(Tokenizer::new()));
        assert_eq!(engine.state().models(), &["vader", "textblob"]);

        let mut d = doc("a1", "ford", Sentiment::Positive, Subjectivity::Objective);
        d.scores.insert("roberta_score".to_string(), 0.9);
        engine.absorb(&d).unwrap();
        assert_eq!(engine.state().counter("vader_positive"), 1);
    }

    #[test]
    fn test_absorb_touches_one_bucket_per_axis() {
        let mut engine = engine();
        engine
            .absorb(&doc("a1", "Tesla battery", Sentiment::Positive, Subjectivity::Objective))
            .unwrap();

        let state = engine.state();
        assert_eq!(state.counter("vader_positive"), 1);
        assert_eq!(state.counter("vader_objective"), 1);
        assert_eq!(state.counter("vader_neutral"), 0);
        assert_eq!(state.counter("vader_negative"), 0);
        assert_eq!(state.counter("vader_subjective"), 0);
        assert_eq!(state.counter("textblob_neutral"), 1);
        assert_eq!(state.counter("textblob_subjective"), 1);
        assert_eq!(state.documents_absorbed(), 1);
    }

    #[test]
    fn test_word_tables_accumulate_counts() {
        let mut engine = engine();
        let first = doc(
            "a1",
            "battery battery warranty",
            Sentiment::Negative,
            Subjectivity::Subjective,
        );
        let second = doc("a2", "battery recall", Sentiment::Negative, Subjectivity::Objective);
        engine.absorb(&first).unwrap();
        engine.absorb(&second).unwrap();

        let bucket = engine.state().bucket("vader", Category::Negative).unwrap();
        assert_eq!(bucket.count, 2);
        assert_eq!(bucket.words.get("battery"), Some(&3));
        assert_eq!(bucket.doc_ids, vec!["a1", "a2"]);
        assert_eq!(engine.state().documents_in("vader", Category::Objective), &["a2"]);
    }

    #[test]
    fn test_word_cloud_excludes_query_tokens() {
        let mut engine = engine();
        let text = "battery battery warranty recall recall";
        engine
            .absorb(&doc("a1", text, Sentiment::Positive, Subjectivity::Objective))
            .unwrap();

        let exclude = vec!["battery".to_string()];
        let cloud = engine
            .state()
            .word_cloud("vader", Category::Positive, &exclude, 10);
        assert_eq!(cloud, vec![("recall".to_string(), 2), ("warranty".to_string(), 1)]);

        let top = engine.state().word_cloud("vader", Category::Positive, &[], 1);
        assert_eq!(top, vec![("battery".to_string(), 2)]);
        assert!(engine.state().word_cloud("unknown", Category::Positive, &[], 5).is_empty());
    }

    #[test]
    fn test_proportions() {
        let mut engine = engine();
        assert!(engine
            .state()
            .proportions("vader", Axis::Sentiment)
            .iter()
            .all(|(_, share)| *share == 0.0));

        let labels = [
            ("a", Sentiment::Positive),
            ("b", Sentiment::Positive),
            ("c", Sentiment::Negative),
            ("d", Sentiment::Neutral),
        ];
        for (id, sentiment) in labels {
            engine
                .absorb(&doc(id, "ford", sentiment, Subjectivity::Objective))
                .unwrap();
        }
        let shares = engine.state().proportions("vader", Axis::Sentiment);
        assert_eq!(
            shares,
            vec![
                (Category::Positive, 0.5),
                (Category::Neutral, 0.25),
                (Category::Negative, 0.25)
            ]
        );
    }

    #[test]
    fn test_score_threshold_model() {
        let model = ScoreThresholdModel::new(roberta());
        let mut d = doc("a1", "ford", Sentiment::Neutral, Subjectivity::Objective);

        d.scores.insert("roberta_score".to_string(), 0.7);
        assert_eq!(model.classify(&d, Axis::Sentiment), Ok(Category::Positive));
        d.scores.insert("roberta_score".to_string(), -0.7);
        assert_eq!(model.classify(&d, Axis::Sentiment), Ok(Category::Negative));
        d.scores.insert("roberta_score".to_string(), 0.0);
        assert_eq!(model.classify(&d, Axis::Sentiment), Ok(Category::Neutral));
    }

    #[test]
    fn test_absorb_is_atomic_when_a_model_fails() {
        let models = ModelsConfig {
            score_threshold: Some(roberta()),
        };
        let mut engine = AggregationEngine::from_config(&models, Arc::new(Tokenizer::new()));

        let unscored = doc("a1", "ford", Sentiment::Positive, Subjectivity::Objective);
        let result = engine.absorb(&unscored);
        assert_eq!(
            result,
            Err(DocumentError::MissingScore {
                id: "a1".to_string(),
                model: "roberta".to_string()
            })
        );
        assert!(engine.state().counters().values().all(|n| *n == 0));
        assert_eq!(engine.state().documents_absorbed(), 0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut engine = engine();
        engine
            .absorb(&doc("a1", "ford", Sentiment::Positive, Subjectivity::Objective))
            .unwrap();
        engine.reset();
        assert_eq!(engine.state().counter("vader_positive"), 0);
        assert_eq!(engine.state().documents_absorbed(), 0);
        assert!(engine.state().documents_in("vader", Category::Positive).is_empty());
    }
}
