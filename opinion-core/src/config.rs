//! Application configuration.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working setup against a local Solr node. Environment variables prefixed
//! with `EV_SEARCH_` override the file after it is parsed.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

const ENV_PREFIX: &str = "EV_SEARCH_";

/// Models whose labels are stored on every document.
pub const BUILTIN_MODELS: &[&str] = &["vader", "textblob"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub solr: SolrConfig,
    pub search: SearchSettings,
    pub models: ModelsConfig,
    pub display: DisplayConfig,
    pub log_filter: LogFilter,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogFilter(pub String);

impl Default for LogFilter {
    fn default() -> Self {
        Self("info".to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolrConfig {
    pub base_url: String,
    pub core: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for SolrConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8983/solr".to_string(),
            core: "search_reddit".to_string(),
            timeout_secs: 30,
            user_agent: "ev-opinion-search/0.1".to_string(),
        }
    }
}

/// How the comments of a post are fetched in posts-and-comments mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentLookup {
    /// Parent post and type only.
    #[default]
    PostOnly,
    /// Text-matching comments of the post first, remaining slots filled post-only.
    TextThenPost,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_rows: usize,
    pub min_rows: usize,
    pub max_rows: usize,
    pub comments_per_post: usize,
    pub comment_lookup: CommentLookup,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_rows: 10,
            min_rows: 5,
            max_rows: 30,
            comments_per_post: 10,
            comment_lookup: CommentLookup::PostOnly,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    pub score_threshold: Option<ScoreThresholdConfig>,
}

/// A sentiment model whose buckets are derived from a stored numeric score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreThresholdConfig {
    pub name: String,
    pub score_field: String,
    pub positive_above: f64,
    pub negative_below: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub highlight_color: String,
    pub word_cloud_size: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            highlight_color: "#FF4B4B".to_string(),
            word_cloud_size: 50,
        }
    }
}

impl AppConfig {
    /// Load from a TOML file, apply environment overrides, and validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                value: format!("{}: {}", path.display(), e),
            })?;
        debug!("Loaded configuration from {}", path.display());

        let mut config = Self::from_toml_str(&content)?;
        config.apply_env_overrides(std::env::vars());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn apply_env_overrides<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "SOLR_URL" => self.solr.base_url = value,
                "SOLR_CORE" => self.solr.core = value,
                "LOG" => self.log_filter = LogFilter(value),
                _ => warn!("Ignoring unknown environment override {}", key),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.solr.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "solr.base_url".to_string(),
                value: self.solr.base_url.clone(),
            });
        }
        if self.solr.core.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "solr.core".to_string(),
                value: self.solr.core.clone(),
            });
        }

        let search = &self.search;
        if search.min_rows == 0 || search.min_rows > search.max_rows {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "row bounds must satisfy 0 < min_rows <= max_rows, got {}..{}",
                    search.min_rows, search.max_rows
                ),
            });
        }
        if search.default_rows < search.min_rows || search.default_rows > search.max_rows {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "default_rows {} is outside {}..={}",
                    search.default_rows, search.min_rows, search.max_rows
                ),
            });
        }
        if search.comments_per_post == 0 {
            return Err(ConfigError::InvalidValue {
                field: "search.comments_per_post".to_string(),
                value: "0".to_string(),
            });
        }

        if let Some(model) = &self.models.score_threshold {
            if model.name.trim().is_empty() || model.score_field.trim().is_empty() {
                return Err(ConfigError::ValidationFailed {
                    reason: "score_threshold model needs a name and a score_field".to_string(),
                });
            }
            if BUILTIN_MODELS
                .iter()
                .any(|builtin| builtin.eq_ignore_ascii_case(model.name.trim()))
            {
                return Err(ConfigError::InvalidValue {
                    field: "models.score_threshold.name".to_string(),
                    value: model.name.clone(),
                });
            }
            if model.negative_below > model.positive_above {
                return Err(ConfigError::ValidationFailed {
                    reason: format!(
                        "negative_below {} exceeds positive_above {}",
                        model.negative_below, model.positive_above
                    ),
                });
            }
        }

        Ok(())
    }

    /// Query endpoint of the configured core.
    pub fn core_url(&self) -> String {
        format!(
            "{}/{}",
            self.solr.base_url.trim_end_matches('/'),
            self.solr.core
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_dashboard() {
        let config = AppConfig::default();
        assert_eq!(config.search.default_rows, 10);
        assert_eq!(config.search.min_rows, 5);
        assert_eq!(config.search.max_rows, 30);
        assert_eq!(config.search.comment_lookup, CommentLookup::PostOnly);
        assert_eq!(config.core_url(), "http://localhost:8983/solr/search_reddit");
        assert!(config.models.score_threshold.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            log_filter = "debug"

            [search]
            comment_lookup = "text_then_post"

            [models.score_threshold]
            name = "roberta"
            score_field = "roberta_score"
            positive_above = 0.05
            negative_below = -0.05
            "#,
        )
        .unwrap();

        assert_eq!(config.search.comment_lookup, CommentLookup::TextThenPost);
        assert_eq!(config.search.default_rows, 10);
        assert_eq!(config.log_filter, LogFilter("debug".to_string()));
        assert_eq!(config.solr.core, "search_reddit");
        let model = config.models.score_threshold.unwrap();
        assert_eq!(model.name, "roberta");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config.apply_env_overrides(vec![
            ("EV_SEARCH_SOLR_URL".to_string(), "http://solr:8983/solr/".to_string()),
            ("EV_SEARCH_SOLR_CORE".to_string(), "ev".to_string()),
            ("HOME".to_string(), "/root".to_string()),
        ]);
        assert_eq!(config.core_url(), "http://solr:8983/solr/ev");
    }

    #[test]
    fn test_validation_rejects_inconsistent_rows() {
        let mut config = AppConfig::default();
        config.search.min_rows = 40;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed { .. })
        ));

        let mut config = AppConfig::default();
        config.search.default_rows = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_inverted_thresholds() {
        let mut config = AppConfig::default();
        config.models.score_threshold = Some(ScoreThresholdConfig {
            name: "roberta".to_string(),
            score_field: "roberta_score".to_string(),
            positive_above: -0.5,
            negative_below: 0.5,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_builtin_model_names() {
        for name in ["vader", "TextBlob", " VADER "] {
            let mut config = AppConfig::default();
            config.models.score_threshold = Some(ScoreThresholdConfig {
                name: name.to_string(),
                score_field: "roberta_score".to_string(),
                positive_above: 0.05,
                negative_below: -0.05,
            });
            assert!(
                matches!(config.validate(), Err(ConfigError::InvalidValue { .. })),
                "{} was accepted",
                name
            );
        }
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[solr]\ncore = \"reddit_ev\"").unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.solr.core, "reddit_ev");

        let missing = AppConfig::load(Path::new("/nonexistent/ev-search.toml"));
        assert!(matches!(missing, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_invalid_toml_is_parse_error() {
        let result = AppConfig::from_toml_str("[search\nmax_rows = 3");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
