pub mod chunker;
pub mod map_reduce;
pub mod parse;
pub mod phrases;
pub mod prefilter;

pub use chunker::chunk;
pub use map_reduce::*;
pub use parse::*;
pub use phrases::*;
pub use prefilter::{FilterPolicy, filter_chunks, query_keywords};

use thiserror::Error;

/// Pipeline-level failures
///
/// Map-stage degradation is governed by [`ChunkFailurePolicy`]; only the
/// `Fail` policy surfaces a `Map` error. Reduce and revise failures are fatal
/// to the query they belong to, never to a whole batch.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid chunk config: overlap {overlap} must be less than max_size {max_size}")]
    ChunkConfig { max_size: usize, overlap: usize },

    #[error("map stage failed for chunk {chunk_index}")]
    Map { chunk_index: usize },

    #[error("no partial summaries survived the map stage")]
    EmptyMapOutput,

    #[error("reduce stage failed: {0}")]
    Reduce(#[source] crate::llm::ClientError),

    #[error("revision stage failed: {0}")]
    Revise(#[source] crate::llm::ClientError),

    #[error("completion failed: {0}")]
    Completion(#[from] crate::llm::ClientError),
}

/// What to do when a map call still fails after the client's own retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChunkFailurePolicy {
    /// Record an empty partial summary; the chunk contributes nothing but the
    /// query still completes (partial success over total failure)
    #[default]
    EmptySummary,
    /// Drop the chunk from the reduce input entirely
    Skip,
    /// Abort the whole query
    Fail,
}

/// Tunables for one pipeline instance
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Completion model identifier
    pub model: String,
    /// Chunk window size in characters
    pub chunk_chars: usize,
    /// Overlap between consecutive chunks in characters
    pub overlap_chars: usize,
    /// Cap on chunks mapped per query, applied after prefiltering
    pub max_chunks: Option<usize>,
    /// Keyword prefilter policy; `None` disables prefiltering
    pub prefilter: Option<FilterPolicy>,
    /// Run the revision pass on the merged draft
    pub revise: bool,
    /// Prepend the worked example to map prompts
    pub few_shot: bool,
    /// Ask the model to preserve this many top transcript bigrams
    pub preserve_phrases: Option<usize>,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Concurrent map calls per query
    pub map_concurrency: usize,
    pub on_chunk_failure: ChunkFailurePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            chunk_chars: 12_000,
            overlap_chars: 1_000,
            max_chunks: Some(6),
            prefilter: None,
            revise: false,
            few_shot: false,
            preserve_phrases: Some(8),
            temperature: 0.0,
            max_tokens: 320,
            map_concurrency: 4,
            on_chunk_failure: ChunkFailurePolicy::EmptySummary,
        }
    }
}
