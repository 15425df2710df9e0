// Entity and relation extraction

pub mod entity;
pub mod lexicon;
pub mod relation;

pub use entity::{EntityExtractor, EntityRecognizer, ExtractedEntity, HeuristicRecognizer, PatternRecognizer, RawSpan};
pub use relation::{InferredRelation, RelationExtractor};
