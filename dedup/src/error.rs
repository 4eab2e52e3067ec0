use bugsim_embed::EmbedError;
use bugsim_vecstore::VecError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DedupError {
    /// A required routing field (application name, query text) is missing.
    #[error("dedup: {0}")]
    Validation(String),

    #[error("dedup: embedding unavailable: {0}")]
    EmbeddingUnavailable(#[from] EmbedError),

    #[error("dedup: source fetch failed: {0}")]
    SourceFetchFailed(#[from] SourceError),

    #[error("dedup: malformed record at index {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    #[error("dedup: index error: {0}")]
    Index(#[from] VecError),
}

/// Failures talking to the external bug-report source.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("source: transport error: {0}")]
    Transport(String),

    #[error("source: HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("source: invalid response: {0}")]
    Decode(String),
}
