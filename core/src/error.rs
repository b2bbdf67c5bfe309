use std::path::PathBuf;
use thiserror::Error;

use crate::DocId;

/// Errors raised while building an index from a corpus.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("document id {0} appears more than once in the corpus")]
    DuplicateDocument(DocId),

    #[error("document {id} has {tokens} tokens, more than a u32 length can hold")]
    DocumentTooLong { id: DocId, tokens: usize },
}

/// Errors raised by query-time operations.
#[derive(Error, Debug, PartialEq)]
pub enum QueryError {
    /// A single-term operation received text that tokenizes to several tokens.
    #[error("term {term:?} must be a single token, got {tokens:?}")]
    MultiTokenQuery { term: String, tokens: Vec<String> },

    /// Average document length requested over zero documents.
    #[error("index contains no documents")]
    EmptyIndex,
}

/// Errors raised while saving or loading index artifacts.
#[derive(Error, Debug)]
pub enum PersistError {
    /// No artifact exists under the cache root.
    #[error("index not built: no artifacts under {root:?}")]
    IndexNotBuilt { root: PathBuf },

    /// One artifact is absent while others are present.
    #[error("missing index artifact {0:?}")]
    MissingArtifact(&'static str),

    #[error("artifact {path:?} holds {found:?}, expected {expected:?}")]
    WrongArtifact {
        path: PathBuf,
        expected: &'static str,
        found: String,
    },

    #[error("artifact {artifact:?} has format version {found}, supported version is {supported}")]
    UnsupportedVersion {
        artifact: &'static str,
        found: u32,
        supported: u32,
    },

    /// A count does not fit the manifest's u32 fields.
    #[error("{what} count {count} does not fit in u32")]
    CountOverflow { what: &'static str, count: usize },

    /// Loaded artifacts disagree with each other.
    #[error("inconsistent index: {0}")]
    Inconsistent(String),

    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed artifact {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
