// Error taxonomy for the graph engine
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure to extract entities from a single message.
///
/// Always recovered by the builder: the message is skipped and a warning is
/// recorded on the graph.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("message has no text to extract from")]
    EmptyText,

    #[error("message is {len} chars, over the {max} char extraction limit")]
    TooLong { len: usize, max: usize },

    #[error("recognizer `{recognizer}` failed: {reason}")]
    Recognizer { recognizer: String, reason: String },
}

/// Persistence errors surfaced to the caller.
///
/// Load-side corruption never shows up here; it is reported as an absent graph.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid conversation id `{0}` (expected [A-Za-z0-9][A-Za-z0-9._-]{{0,127}})")]
    InvalidConversationId(String),

    #[error("graph belongs to conversation `{graph}`, refusing to save it under `{requested}`")]
    ConversationMismatch { graph: String, requested: String },

    #[error("conversation id `{requested}` collides with stored id `{existing}` (ids are compared case-insensitively)")]
    IdCollision { requested: String, existing: String },

    #[error("failed to write graph to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to delete {path}: {source}")]
    Delete {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to list storage root {path}: {source}")]
    List {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize graph: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Export errors. An empty graph is never one of these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("unsupported export format `{0}` (use `node_link` or `cytoscape`)")]
    UnsupportedFormat(String),
}

/// Errors returned by [`crate::service::GraphService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("graph build for `{conversation_id}` did not finish within {timeout:?}")]
    Timeout {
        conversation_id: String,
        timeout: Duration,
    },

    #[error("graph build worker for `{0}` exited without a result")]
    WorkerLost(String),
}
