pub mod cache;
pub mod io;
pub mod llm;
pub mod models;
pub mod pipeline;

pub use cache::{CacheKey, CompletionCache, DiskCache, MemoryCache};
pub use io::{JsonlWriter, SummaryOutput, load_qmsum_dir, load_transcript_file};
pub use llm::{
    CompletionProvider, CompletionRequest, OpenAiClient, OpenAiConfig, SummaryMode,
};
pub use models::{Chunk, PartialSummary, PredictionRecord, QueryRecord, Transcript};
pub use pipeline::{
    ChunkFailurePolicy, FilterPolicy, MapReduceSummarizer, PipelineConfig, PipelineError,
    parse_summary,
};
