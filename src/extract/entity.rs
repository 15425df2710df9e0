// Entity recognition and canonicalization
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use super::lexicon;
use crate::config::{Config, PatternRule, RecognizerKind};
use crate::conversation::graph::{canonicalize, entity_id, EntityId, EntityType};
use crate::error::ExtractionError;

/// A recognized span with the recognizer's raw label
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSpan {
    pub text: String,
    pub label: String,
    /// Byte offsets into the recognized text
    pub start: usize,
    pub end: usize,
}

/// Pluggable named-entity recognizer.
///
/// Implementations are built once and shared read-only across builds.
pub trait EntityRecognizer: Send + Sync {
    fn name(&self) -> &str;

    /// Spans in text order. Repeated occurrences are all returned.
    fn recognize(&self, text: &str) -> Result<Vec<RawSpan>, ExtractionError>;
}

/// Build the recognizer selected in `config`
pub fn build_recognizer(config: &Config) -> anyhow::Result<Arc<dyn EntityRecognizer>> {
    Ok(match config.recognizer {
        RecognizerKind::Heuristic => Arc::new(HeuristicRecognizer::new()),
        RecognizerKind::Pattern => Arc::new(PatternRecognizer::new(&config.patterns)?),
    })
}

/// A word token with byte offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Token<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
}

fn word_regex() -> &'static Regex {
    static WORD: OnceLock<Regex> = OnceLock::new();
    WORD.get_or_init(|| Regex::new(r"[\p{L}\p{N}][\p{L}\p{N}&'’\-]*").expect("word regex is valid"))
}

/// Split text into word tokens; possessive `'s` and trailing apostrophes/hyphens are cut off
pub(crate) fn tokenize(text: &str) -> Vec<Token<'_>> {
    word_regex()
        .find_iter(text)
        .filter_map(|m| {
            let raw = m.as_str();
            let word = raw
                .strip_suffix("'s")
                .or_else(|| raw.strip_suffix("’s"))
                .unwrap_or(raw)
                .trim_end_matches(|c| c == '\'' || c == '’' || c == '-');
            if word.is_empty() {
                return None;
            }
            Some(Token {
                text: word,
                start: m.start(),
                end: m.start() + word.len(),
            })
        })
        .collect()
}

fn is_capitalized(word: &str) -> bool {
    word.chars().next().map(|c| c.is_uppercase()).unwrap_or(false)
}

/// Only spaces/tabs, or a spaced ampersand ("Johnson & Johnson")
fn is_plain_gap(gap: &str) -> bool {
    if gap.is_empty() || gap.contains('\n') {
        return false;
    }
    gap.chars().all(|c| c == ' ' || c == '\t') || gap.trim() == "&"
}

fn set(words: &'static [&'static str]) -> HashSet<&'static str> {
    words.iter().copied().collect()
}

/// Rule-based recognizer: capitalized runs classified by gazetteers, organization
/// suffixes, person titles and given names.
pub struct HeuristicRecognizer {
    titles: HashSet<&'static str>,
    org_suffixes: HashSet<&'static str>,
    org_keywords: HashSet<&'static str>,
    locations: HashSet<&'static str>,
    norp: HashSet<&'static str>,
    products: HashSet<&'static str>,
    products_lowercase: HashSet<&'static str>,
    given_names: HashSet<&'static str>,
    connectors: HashSet<&'static str>,
    stop_words: HashSet<&'static str>,
}

impl HeuristicRecognizer {
    pub fn new() -> Self {
        Self {
            titles: set(lexicon::PERSON_TITLES),
            org_suffixes: set(lexicon::ORG_SUFFIXES),
            org_keywords: set(lexicon::ORG_KEYWORDS),
            locations: set(lexicon::LOCATION_KEYWORDS),
            norp: set(lexicon::NORP_KEYWORDS),
            products: set(lexicon::PRODUCT_KEYWORDS),
            products_lowercase: set(lexicon::PRODUCT_LOWERCASE_OK),
            given_names: set(lexicon::GIVEN_NAMES),
            connectors: set(lexicon::NAME_CONNECTORS),
            stop_words: set(lexicon::STOP_WORDS),
        }
    }

    fn is_stop(&self, word: &str) -> bool {
        self.stop_words.contains(word.to_lowercase().as_str())
    }

    fn is_title(&self, word: &str) -> bool {
        self.titles.contains(word.to_lowercase().as_str())
    }

    /// First token, or first after sentence punctuation (titles like "Dr." excepted)
    fn is_sentence_start(&self, text: &str, tokens: &[Token], i: usize) -> bool {
        if i == 0 {
            return true;
        }
        let prev = &tokens[i - 1];
        let gap = &text[prev.end..tokens[i].start];
        gap.contains(|c| matches!(c, '.' | '!' | '?' | '\n' | ':')) && !self.is_title(prev.text)
    }

    /// Raw label for a capitalized run, or None when there is not enough evidence
    fn classify(&self, words: &[String], sentence_start: bool, after_title: bool) -> Option<&'static str> {
        let phrase = words.join(" ");
        let first = words.first()?.as_str();
        let last = words.last()?.as_str();

        if after_title {
            return Some("PERSON");
        }
        if self.org_keywords.contains(phrase.as_str()) {
            return Some("ORG");
        }
        if self.locations.contains(phrase.as_str()) {
            return Some("GPE");
        }
        if self.norp.contains(phrase.as_str()) {
            return Some("NORP");
        }
        if self.products.contains(phrase.as_str()) {
            return Some("PRODUCT");
        }
        if words.len() > 1
            && (self.org_suffixes.contains(last) || self.org_suffixes.contains(first))
        {
            return Some("ORG");
        }
        if words.len() <= 3 && self.given_names.contains(first) {
            return Some("PERSON");
        }
        if words.len() > 1 {
            return Some("MISC");
        }
        // 文頭の大文字1語は根拠が弱いので捨てる
        if sentence_start {
            None
        } else {
            Some("MISC")
        }
    }
}

impl Default for HeuristicRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityRecognizer for HeuristicRecognizer {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn recognize(&self, text: &str) -> Result<Vec<RawSpan>, ExtractionError> {
        let tokens = tokenize(text);
        let mut spans = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            let token = tokens[i];
            let lower = token.text.to_lowercase();

            if !is_capitalized(token.text) {
                if self.products_lowercase.contains(lower.as_str()) {
                    spans.push(RawSpan {
                        text: token.text.to_string(),
                        label: "PRODUCT".to_string(),
                        start: token.start,
                        end: token.end,
                    });
                }
                i += 1;
                continue;
            }

            if self.stop_words.contains(lower.as_str()) {
                i += 1;
                continue;
            }

            // Title followed by a name: the name is the entity
            if self.titles.contains(lower.as_str())
                && tokens
                    .get(i + 1)
                    .map(|next| is_capitalized(next.text) && !self.is_stop(next.text))
                    .unwrap_or(false)
            {
                i += 1;
                continue;
            }

            // Extend the capitalized run
            let mut end = i + 1;
            while end < tokens.len() {
                let gap = &text[tokens[end - 1].end..tokens[end].start];
                if !is_plain_gap(gap) {
                    break;
                }
                let next = tokens[end];
                if is_capitalized(next.text) && !self.is_stop(next.text) {
                    end += 1;
                    continue;
                }
                let joins = self.connectors.contains(next.text.to_lowercase().as_str())
                    && tokens
                        .get(end + 1)
                        .map(|after| {
                            is_capitalized(after.text)
                                && !self.is_stop(after.text)
                                && is_plain_gap(&text[next.end..after.start])
                        })
                        .unwrap_or(false);
                if joins {
                    end += 2;
                    continue;
                }
                break;
            }

            let words: Vec<String> = tokens[i..end].iter().map(|t| t.text.to_lowercase()).collect();
            let sentence_start = self.is_sentence_start(text, &tokens, i);
            let after_title = i > 0 && self.is_title(tokens[i - 1].text);

            if let Some(label) = self.classify(&words, sentence_start, after_title) {
                let start = token.start;
                let stop = tokens[end - 1].end;
                spans.push(RawSpan {
                    text: text[start..stop].to_string(),
                    label: label.to_string(),
                    start,
                    end: stop,
                });
            }
            i = end;
        }

        Ok(spans)
    }
}

/// Regex recognizer driven by configured `{label, regex}` rules.
///
/// Overlapping matches keep the earliest, then longest, span.
pub struct PatternRecognizer {
    rules: Vec<(String, Regex)>,
}

impl PatternRecognizer {
    pub fn new(rules: &[PatternRule]) -> anyhow::Result<Self> {
        let compiled = rules
            .iter()
            .map(|rule| {
                let regex = Regex::new(&rule.regex).map_err(|e| {
                    anyhow::anyhow!("Invalid pattern for label {}: {}", rule.label, e)
                })?;
                Ok((rule.label.clone(), regex))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok(Self { rules: compiled })
    }
}

impl EntityRecognizer for PatternRecognizer {
    fn name(&self) -> &str {
        "pattern"
    }

    fn recognize(&self, text: &str) -> Result<Vec<RawSpan>, ExtractionError> {
        let mut spans = Vec::new();
        for (label, regex) in &self.rules {
            for caps in regex.captures_iter(text) {
                let Some(m) = caps.get(1).or_else(|| caps.get(0)) else {
                    continue;
                };
                if m.as_str().trim().is_empty() {
                    continue;
                }
                spans.push(RawSpan {
                    text: m.as_str().to_string(),
                    label: label.clone(),
                    start: m.start(),
                    end: m.end(),
                });
            }
        }

        spans.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| (b.end - b.start).cmp(&(a.end - a.start))));
        let mut kept: Vec<RawSpan> = Vec::with_capacity(spans.len());
        for span in spans {
            let overlaps = kept.last().map(|k| span.start < k.end).unwrap_or(false);
            if !overlaps {
                kept.push(span);
            }
        }
        Ok(kept)
    }
}

/// An entity occurrence mapped into the taxonomy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedEntity {
    pub surface: String,
    pub raw_label: String,
    pub entity_type: EntityType,
    pub start: usize,
    pub end: usize,
}

impl ExtractedEntity {
    pub fn id(&self) -> EntityId {
        entity_id(&self.surface, self.entity_type)
    }
}

/// Runs the configured recognizer over a message and maps labels into the taxonomy
#[derive(Clone)]
pub struct EntityExtractor {
    recognizer: Arc<dyn EntityRecognizer>,
    max_message_chars: usize,
}

impl EntityExtractor {
    pub fn new(recognizer: Arc<dyn EntityRecognizer>, max_message_chars: usize) -> Self {
        Self {
            recognizer,
            max_message_chars,
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Ok(Self::new(build_recognizer(config)?, config.max_message_chars))
    }

    pub fn recognizer_name(&self) -> &str {
        self.recognizer.name()
    }

    /// Entities in one message's text, in text order
    pub fn extract(&self, text: &str) -> Result<Vec<ExtractedEntity>, ExtractionError> {
        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyText);
        }
        let len = text.chars().count();
        if len > self.max_message_chars {
            return Err(ExtractionError::TooLong {
                len,
                max: self.max_message_chars,
            });
        }

        let mut entities: Vec<ExtractedEntity> = self
            .recognizer
            .recognize(text)?
            .into_iter()
            .filter(|span| !canonicalize(&span.text).is_empty())
            .map(|span| ExtractedEntity {
                entity_type: EntityType::from_label(&span.label),
                surface: span.text,
                raw_label: span.label,
                start: span.start,
                end: span.end,
            })
            .collect();
        entities.sort_by_key(|e| e.start);
        Ok(entities)
    }
}
