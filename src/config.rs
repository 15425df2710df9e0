// Engine configuration
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which entity recognizer the service constructs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecognizerKind {
    /// Capitalization + gazetteer rules
    #[default]
    Heuristic,
    /// User supplied regexes, see [`Config::patterns`]
    Pattern,
}

impl std::str::FromStr for RecognizerKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "heuristic" => Ok(Self::Heuristic),
            "pattern" | "regex" => Ok(Self::Pattern),
            other => bail!("unknown recognizer `{}` (use `heuristic` or `pattern`)", other),
        }
    }
}

/// One regex rule for the pattern recognizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternRule {
    /// Raw NER label emitted for matches (e.g. `ORG`)
    pub label: String,
    /// Regex; the first capture group is the span if present, else the whole match
    pub regex: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage_root: PathBuf,
    pub recognizer: RecognizerKind,
    pub patterns: Vec<PatternRule>,
    /// Adjacent messages considered together for co-occurrence. 1 = same message only.
    pub relation_window: usize,
    pub max_message_chars: usize,
    pub excerpt_chars: usize,
    pub max_predicate_words: usize,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("./data/knowledge_graphs"),
            recognizer: RecognizerKind::Heuristic,
            patterns: Vec::new(),
            relation_window: 1,
            max_message_chars: 20_000,
            excerpt_chars: 100,
            max_predicate_words: 4,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load a JSON config file; missing fields keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by `CHAT_KG_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::default().with_env_overrides()
    }

    /// Apply `CHAT_KG_*` environment variables on top of this config
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(path) = std::env::var("CHAT_KG_PATH") {
            self.storage_root = PathBuf::from(path);
        }
        if let Ok(kind) = std::env::var("CHAT_KG_RECOGNIZER") {
            self.recognizer = kind.parse()?;
        }
        if let Some(window) = env_usize("CHAT_KG_RELATION_WINDOW")? {
            self.relation_window = window;
        }
        if let Some(max) = env_usize("CHAT_KG_MAX_MESSAGE_CHARS")? {
            self.max_message_chars = max;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.relation_window == 0 {
            bail!("relation_window must be at least 1");
        }
        if self.max_message_chars == 0 {
            bail!("max_message_chars must be at least 1");
        }
        if self.max_predicate_words == 0 {
            bail!("max_predicate_words must be at least 1");
        }
        if self.recognizer == RecognizerKind::Pattern && self.patterns.is_empty() {
            bail!("recognizer `pattern` needs at least one entry in `patterns`");
        }
        Ok(())
    }
}

fn env_usize(key: &str) -> Result<Option<usize>> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} must be a positive integer, got `{}`", key, value)),
        Err(_) => Ok(None),
    }
}
