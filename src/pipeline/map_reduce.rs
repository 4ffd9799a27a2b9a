use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CompletionCache};
use crate::llm::{
    CompletionProvider, CompletionRequest, REVISE_SYSTEM_PROMPT, SYSTEM_PROMPT, SummaryMode,
    build_map_prompt, build_reduce_prompt, build_revise_prompt, build_single_prompt,
};
use crate::models::{Chunk, PartialSummary};
use crate::pipeline::{ChunkFailurePolicy, PipelineConfig, PipelineError, chunker, prefilter};

/// Outcome of one pipeline run
#[derive(Debug, Clone)]
pub struct SummaryResult {
    /// Final answer text (reduce output, or revision output when enabled)
    pub text: String,
    /// Chunks produced by the chunker before filtering
    pub chunks_total: usize,
    /// Chunks actually mapped (after prefilter and chunk cap)
    pub chunks_mapped: usize,
    /// Map calls that failed after client retries
    pub map_failures: usize,
}

/// Orchestrates the chunk -> (filter) -> map -> reduce -> (revise) pipeline
///
/// Owns the chunk and partial-summary collections for the duration of one
/// run; the cache is the only long-lived state and is shared across runs and
/// concurrent callers.
pub struct MapReduceSummarizer<C> {
    client: Arc<C>,
    cache: Arc<dyn CompletionCache>,
    config: PipelineConfig,
}

impl<C: CompletionProvider + 'static> MapReduceSummarizer<C> {
    pub fn new(client: Arc<C>, cache: Arc<dyn CompletionCache>, config: PipelineConfig) -> Self {
        Self {
            client,
            cache,
            config,
        }
    }

    /// Summarize one transcript in the given mode
    pub async fn summarize(
        &self,
        transcript: &str,
        mode: &SummaryMode,
    ) -> Result<SummaryResult, PipelineError> {
        let chunks = chunker::chunk(
            transcript,
            self.config.chunk_chars,
            self.config.overlap_chars,
        )?;
        let chunks_total = chunks.len();

        // Short transcript: no map/reduce, one mode-scoped call
        if chunks_total == 1 {
            debug!("Transcript fits in one chunk, skipping map/reduce");
            let prompt = build_single_prompt(mode, transcript);
            let text = self.call(SYSTEM_PROMPT, prompt).await?;
            let text = self.maybe_revise(text, mode).await?;
            return Ok(SummaryResult {
                text,
                chunks_total: 1,
                chunks_mapped: 1,
                map_failures: 0,
            });
        }

        // Prefiltering needs a query to score against
        let chunks = match (mode, &self.config.prefilter) {
            (SummaryMode::Query(query), Some(policy)) => {
                let before = chunks.len();
                let kept = prefilter::filter_chunks(chunks, query, policy);
                debug!("Prefilter kept {} of {} chunks", kept.len(), before);
                kept
            }
            _ => chunks,
        };

        let chunks = match self.config.max_chunks {
            Some(cap) if chunks.len() > cap => {
                warn!("Capping {} chunks at {}", chunks.len(), cap);
                chunks.into_iter().take(cap).collect()
            }
            _ => chunks,
        };

        // Phrases come from the chunks that survived filtering, so the
        // preserve list only names terms the map stage will actually see
        let phrases = self.config.preserve_phrases.map(|k| {
            let kept: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
            crate::pipeline::top_bigrams(&kept.join("\n"), k)
        });

        let (partials, map_failures) = self.map_chunks(&chunks, mode, phrases.as_deref()).await?;
        let chunks_mapped = chunks.len();

        if partials.is_empty() {
            return Err(PipelineError::EmptyMapOutput);
        }

        info!(
            "Mapped {} chunks ({} failures), reducing",
            chunks_mapped, map_failures
        );

        let text = if partials.len() == 1 {
            partials.into_iter().next().map(|p| p.text).unwrap_or_default()
        } else {
            let texts: Vec<String> = partials.into_iter().map(|p| p.text).collect();
            let prompt = build_reduce_prompt(mode, &texts, phrases.as_deref());
            self.call(SYSTEM_PROMPT, prompt)
                .await
                .map_err(PipelineError::Reduce)?
        };

        let text = self.maybe_revise(text, mode).await?;

        Ok(SummaryResult {
            text,
            chunks_total,
            chunks_mapped,
            map_failures,
        })
    }

    /// Fan out map calls under bounded concurrency, reassembling results in
    /// chunk-index order regardless of completion order
    async fn map_chunks(
        &self,
        chunks: &[Chunk],
        mode: &SummaryMode,
        phrases: Option<&[String]>,
    ) -> Result<(Vec<PartialSummary>, usize), PipelineError> {
        let semaphore = Arc::new(Semaphore::new(self.config.map_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (slot, chunk) in chunks.iter().enumerate() {
            let request = self.request(
                SYSTEM_PROMPT,
                build_map_prompt(mode, &chunk.text, phrases, self.config.few_shot),
            );
            let client = Arc::clone(&self.client);
            let cache = Arc::clone(&self.cache);
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                (slot, complete_cached(&*client, &*cache, &request).await)
            });
        }

        // Index-addressed slots: completion order must not leak into reduce
        let mut slots: Vec<Option<Result<String, _>>> = (0..chunks.len()).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((slot, result)) => slots[slot] = Some(result),
                Err(e) => warn!("Map task aborted: {}", e),
            }
        }

        let mut partials = Vec::with_capacity(chunks.len());
        let mut map_failures = 0usize;

        for (slot, outcome) in slots.into_iter().enumerate() {
            let chunk_index = chunks[slot].index;
            match outcome {
                Some(Ok(text)) => partials.push(PartialSummary {
                    chunk_index,
                    text: text.trim().to_string(),
                }),
                other => {
                    map_failures += 1;
                    if let Some(Err(e)) = &other {
                        warn!("Map call failed for chunk {}: {}", chunk_index, e);
                    }
                    match self.config.on_chunk_failure {
                        ChunkFailurePolicy::EmptySummary => partials.push(PartialSummary {
                            chunk_index,
                            text: String::new(),
                        }),
                        ChunkFailurePolicy::Skip => {}
                        ChunkFailurePolicy::Fail => {
                            return Err(PipelineError::Map { chunk_index });
                        }
                    }
                }
            }
        }

        Ok((partials, map_failures))
    }

    async fn maybe_revise(
        &self,
        draft: String,
        mode: &SummaryMode,
    ) -> Result<String, PipelineError> {
        if !self.config.revise {
            return Ok(draft);
        }
        let prompt = build_revise_prompt(mode, &draft);
        self.call(REVISE_SYSTEM_PROMPT, prompt)
            .await
            .map(|text| text.trim().to_string())
            .map_err(PipelineError::Revise)
    }

    fn request(&self, system: &str, user: String) -> CompletionRequest {
        CompletionRequest {
            model: self.config.model.clone(),
            system: Some(system.to_string()),
            user,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }

    async fn call(
        &self,
        system: &str,
        user: String,
    ) -> Result<String, crate::llm::ClientError> {
        let request = self.request(system, user);
        complete_cached(&*self.client, &*self.cache, &request)
            .await
            .map(|text| text.trim().to_string())
    }
}

/// Read-through/write-through wrapper around a completion call
///
/// On a cache hit the provider is never invoked, so a hit has no network side
/// effect. Every successful call is written back, including calls whose
/// result will later be revised: revision uses a different prompt and so a
/// different key.
pub async fn complete_cached<C: CompletionProvider + ?Sized>(
    client: &C,
    cache: &dyn CompletionCache,
    request: &CompletionRequest,
) -> Result<String, crate::llm::ClientError> {
    let key = CacheKey::derive(
        &request.model,
        request.system.as_deref().unwrap_or(""),
        &request.user,
    );
    if let Some(hit) = cache.get(&key) {
        debug!("Cache hit for {}", key.as_str());
        return Ok(hit);
    }
    let completion = client.complete(request).await?;
    cache.put(&key, &completion);
    Ok(completion)
}
