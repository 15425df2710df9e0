use chat_kg::conversation::graph::{entity_id, EntityType};
use chat_kg::conversation::message::Role;
use chat_kg::{Config, GraphBuilder, GraphStore, Message};
use chrono::{DateTime, FixedOffset, TimeZone};
use proptest::prelude::*;
use std::collections::HashSet;

const WORDS: &[&str] = &[
    "Alice", "Bob", "Acme", "Corp", "Paris", "Tokyo", "Google", "Rust", "works", "at", "lives",
    "in", "met", "and", "the", "with", "joined", "loves", "Sarah", "Johnson", ".", ",", "London",
];

fn sentence() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(WORDS), 0..16).prop_map(|words| words.join(" "))
}

fn conversation() -> impl Strategy<Value = Vec<Message>> {
    prop::collection::vec(sentence(), 0..8).prop_map(|texts| {
        texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| if i % 2 == 0 { Message::user(text) } else { Message::assistant(text) })
            .collect()
    })
}

fn role() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("user".to_string()),
        Just("assistant".to_string()),
        Just(" Human ".to_string()),
        Just("Tool".to_string()),
        "[A-Za-z _]{0,8}",
    ]
}

/// Whole-second instants with a whole-minute offset, as RFC 3339 can carry them
fn timestamp() -> impl Strategy<Value = Option<DateTime<FixedOffset>>> {
    prop::option::of((-720i32..840, 0i64..4_000_000_000)).prop_map(|ts| {
        ts.and_then(|(minutes, secs)| {
            FixedOffset::east_opt(minutes * 60).and_then(|offset| offset.timestamp_opt(secs, 0).single())
        })
    })
}

fn annotated_conversation() -> impl Strategy<Value = Vec<Message>> {
    prop::collection::vec((role(), sentence(), timestamp()), 0..8).prop_map(|items| {
        items
            .into_iter()
            .map(|(role, text, ts)| {
                let message = Message::new(Role::from(role.as_str()), text);
                match ts {
                    Some(ts) => message.with_timestamp(ts),
                    None => message,
                }
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn entity_id_ignores_case_and_spacing(surface in "[A-Za-z]{1,8}( [A-Za-z]{1,8}){0,2}") {
        let spaced = surface.replace(' ', "   ");
        prop_assert_eq!(
            entity_id(&surface.to_uppercase(), EntityType::Organization),
            entity_id(&format!(" {} ", spaced.to_lowercase()), EntityType::Organization)
        );
    }

    #[test]
    fn build_invariants(messages in conversation(), window in 1usize..4) {
        let config = Config { relation_window: window, ..Config::default() };
        let builder = GraphBuilder::from_config(&config).unwrap();
        let graph = builder.build("prop", &messages);

        // one message node per input, in order
        prop_assert_eq!(graph.messages.len(), messages.len());
        for (i, node) in graph.messages.iter().enumerate() {
            prop_assert_eq!(node.id, i);
        }

        // unique triples, no self-relations, known endpoints
        let mut triples = HashSet::new();
        for r in &graph.relations {
            prop_assert!(r.source != r.target);
            prop_assert!(graph.get_entity(&r.source).is_some());
            prop_assert!(graph.get_entity(&r.target).is_some());
            prop_assert!(triples.insert((r.source.clone(), r.target.clone(), r.predicate.clone())));
            prop_assert!(r.weight >= 1);
        }

        // unique mention pairs
        let mut pairs = HashSet::new();
        for m in &graph.mentions {
            prop_assert!(pairs.insert((m.message_id, m.entity_id.clone())));
        }

        // deterministic across builds
        let again = builder.build("prop", &messages);
        let ids: Vec<_> = graph.entities.iter().map(|e| (&e.id, e.mention_count)).collect();
        let ids_again: Vec<_> = again.entities.iter().map(|e| (&e.id, e.mention_count)).collect();
        prop_assert_eq!(ids, ids_again);
        prop_assert_eq!(graph.relations, again.relations);
    }

    #[test]
    fn saved_graph_loads_back_equal(messages in annotated_conversation(), window in 1usize..4) {
        let config = Config { relation_window: window, ..Config::default() };
        let graph = GraphBuilder::from_config(&config).unwrap().build("prop", &messages);

        let dir = tempfile::TempDir::new().unwrap();
        let store = GraphStore::new(dir.path());
        store.save(&graph, "prop").unwrap();
        let loaded = store.load("prop").unwrap();

        prop_assert_eq!(loaded, Some(graph));
    }
}
