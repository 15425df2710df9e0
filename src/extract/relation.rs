// Relation inference between co-mentioned entities
use std::collections::HashSet;
use tracing::debug;

use super::entity::{tokenize, ExtractedEntity};
use super::lexicon;
use crate::config::Config;
use crate::conversation::graph::{EntityId, InferenceTier, DEFAULT_PREDICATE};

/// One inferred `(source, predicate, target)` triple with its evidence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredRelation {
    pub source: EntityId,
    pub predicate: String,
    pub target: EntityId,
    pub message_ids: Vec<usize>,
    pub tier: InferenceTier,
}

impl InferredRelation {
    /// `related_to` edge with endpoints ordered by id
    fn symmetric(a: &str, b: &str, message_ids: Vec<usize>, tier: InferenceTier) -> Self {
        let (source, target) = ordered(a, b);
        Self {
            source: source.to_string(),
            predicate: DEFAULT_PREDICATE.to_string(),
            target: target.to_string(),
            message_ids,
            tier,
        }
    }
}

/// Characters that end a clause between two spans
const BREAK_CHARS: &[char] = &[
    '.', ',', ';', ':', '!', '?', '(', ')', '[', ']', '{', '}', '"', '“', '”', '\n',
];

pub struct RelationExtractor {
    max_predicate_words: usize,
    window: usize,
    fillers: HashSet<&'static str>,
    breakers: HashSet<&'static str>,
    verbs: HashSet<&'static str>,
    nouns: HashSet<&'static str>,
    prepositions: HashSet<&'static str>,
}

impl RelationExtractor {
    pub fn new(max_predicate_words: usize, window: usize) -> Self {
        Self {
            max_predicate_words: max_predicate_words.max(1),
            window: window.max(1),
            fillers: lexicon::PREDICATE_FILLERS.iter().copied().collect(),
            breakers: lexicon::CLAUSE_BREAKERS.iter().copied().collect(),
            verbs: lexicon::COMMON_VERBS.iter().copied().collect(),
            nouns: lexicon::RELATION_NOUNS.iter().copied().collect(),
            prepositions: lexicon::PREPOSITIONS.iter().copied().collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_predicate_words, config.relation_window)
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Relations among the entities of one message.
    ///
    /// Pairs are visited in order of first mention; the first tier that fires wins.
    pub fn infer_message(
        &self,
        message_id: usize,
        text: &str,
        entities: &[ExtractedEntity],
    ) -> Vec<InferredRelation> {
        // distinct ids in first-mention order
        let mut order: Vec<EntityId> = Vec::new();
        for entity in entities {
            let id = entity.id();
            if !order.contains(&id) {
                order.push(id);
            }
        }

        let mut relations = Vec::new();
        for (i, a) in order.iter().enumerate() {
            for b in order.iter().skip(i + 1) {
                let relation = self
                    .link_pair(message_id, text, entities, a, b)
                    .unwrap_or_else(|| {
                        InferredRelation::symmetric(a, b, vec![message_id], InferenceTier::CoOccurrence)
                    });
                relations.push(relation);
            }
        }
        relations
    }

    /// Syntactic link between any occurrence of `a` and any occurrence of `b`
    fn link_pair(
        &self,
        message_id: usize,
        text: &str,
        entities: &[ExtractedEntity],
        a: &str,
        b: &str,
    ) -> Option<InferredRelation> {
        for left in entities {
            for right in entities {
                let left_id = left.id();
                let right_id = right.id();
                let is_pair = (left_id == a && right_id == b) || (left_id == b && right_id == a);
                if !is_pair || left.end > right.start {
                    continue;
                }
                // another entity sits between the two spans
                if entities
                    .iter()
                    .any(|e| e.start >= left.end && e.end <= right.start)
                {
                    continue;
                }
                let Some(between) = text.get(left.end..right.start) else {
                    debug!(message_id, left = %left_id, right = %right_id, "Span offsets off char boundary, skipping pair");
                    continue;
                };
                if let Some(predicate) = self.link_phrase(between) {
                    return Some(InferredRelation {
                        source: left_id,
                        predicate,
                        target: right_id,
                        message_ids: vec![message_id],
                        tier: InferenceTier::Syntactic,
                    });
                }
            }
        }
        None
    }

    /// Predicate read from the text between two spans, e.g. " works at " → `works_at`
    pub fn link_phrase(&self, between: &str) -> Option<String> {
        if between.contains(BREAK_CHARS) {
            return None;
        }

        let words: Vec<String> = tokenize(between)
            .into_iter()
            .map(|t| t.text.to_lowercase())
            .filter(|w| !self.fillers.contains(w.as_str()))
            .collect();

        if words.is_empty() || words.len() > self.max_predicate_words {
            return None;
        }
        if words
            .iter()
            .any(|w| self.breakers.contains(w.as_str()) || w.contains("n't") || w.contains("n’t"))
        {
            return None;
        }

        let has_verb = words.iter().enumerate().any(|(i, w)| {
            self.is_verb_like(w, words.get(i + 1).map(|s| s.as_str()))
        });
        let noun_head = words.len() >= 2
            && self.nouns.contains(words[0].as_str())
            && words
                .last()
                .map(|w| self.prepositions.contains(w.as_str()))
                .unwrap_or(false);

        if !has_verb && !noun_head {
            return None;
        }
        Some(words.join("_"))
    }

    fn is_verb_like(&self, word: &str, next: Option<&str>) -> bool {
        if self.verbs.contains(word) {
            return true;
        }
        let len = word.chars().count();
        if len > 4 && word.ends_with("ed") {
            return true;
        }
        if len > 5 && word.ends_with("ing") {
            return true;
        }
        // "collaborates with"
        len > 3
            && word.ends_with('s')
            && !word.ends_with("ss")
            && next.map(|n| self.prepositions.contains(n)).unwrap_or(false)
    }

    /// `related_to` edges for entities that only meet across adjacent messages.
    ///
    /// `sets` holds each message's distinct entity ids in sequence order. A pair that
    /// shares a message anywhere in the window is left to the per-message pass.
    pub fn infer_window(&self, sets: &[(usize, Vec<EntityId>)]) -> Vec<InferredRelation> {
        if self.window <= 1 {
            return Vec::new();
        }

        // unordered pairs co-occurring inside each single message
        let local: Vec<HashSet<(&str, &str)>> = sets
            .iter()
            .map(|(_, ids)| {
                let mut pairs = HashSet::new();
                for (k, a) in ids.iter().enumerate() {
                    for b in &ids[k + 1..] {
                        pairs.insert(ordered(a, b));
                    }
                }
                pairs
            })
            .collect();

        let mut relations = Vec::new();
        for i in 0..sets.len() {
            let (seq_i, ids_i) = &sets[i];
            let last = (i + self.window).min(sets.len());
            let shared: HashSet<(&str, &str)> = local[i..last].iter().flatten().copied().collect();

            for (seq_j, ids_j) in &sets[i + 1..last] {
                for a in ids_i {
                    for b in ids_j {
                        if a == b || shared.contains(&ordered(a, b)) {
                            continue;
                        }
                        relations.push(InferredRelation::symmetric(
                            a,
                            b,
                            vec![*seq_i, *seq_j],
                            InferenceTier::Window,
                        ));
                    }
                }
            }
        }
        relations
    }
}

fn ordered<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

impl Default for RelationExtractor {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
