use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

use recap::{
    ChunkFailurePolicy, CompletionCache, DiskCache, FilterPolicy, JsonlWriter,
    MapReduceSummarizer, OpenAiClient, OpenAiConfig, PipelineConfig, PredictionRecord,
    QueryRecord, SummaryMode, SummaryOutput, load_qmsum_dir, load_transcript_file, parse_summary,
};

#[derive(Parser)]
#[command(name = "recap")]
#[command(author, version, about = "Query-focused meeting summarization pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a single meeting transcript
    Summarize {
        /// Input transcript file (JSON array of turns)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file for the parsed summary (JSON)
        #[arg(short, long, default_value = "output/summary.json")]
        output: PathBuf,

        /// Summarization mode: general, decision, blocker, or query
        #[arg(long, default_value = "general")]
        mode: String,

        /// Query text (required for query mode)
        #[arg(long)]
        query: Option<String>,

        /// Human-readable run log file
        #[arg(long, default_value = "logs/runs.log")]
        run_log: PathBuf,

        /// Completion cache directory
        #[arg(long, default_value = "cache")]
        cache_dir: PathBuf,

        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Run the QMSum benchmark over a dataset split directory
    Bench {
        /// Directory of QMSum meeting JSON files (e.g. data/ALL/test)
        #[arg(long)]
        split_dir: PathBuf,

        /// Output predictions file (JSONL, one record per query)
        #[arg(long, default_value = "output/qmsum_preds.jsonl")]
        out_jsonl: PathBuf,

        /// Completion cache directory
        #[arg(long, default_value = "cache_qmsum")]
        cache_dir: PathBuf,

        /// Fraction of meetings to sample
        #[arg(long, default_value = "1.0")]
        sample_ratio: f64,

        /// Cap on sampled meetings
        #[arg(long, default_value = "10")]
        max_meetings: usize,

        /// Cap on queries taken per meeting
        #[arg(long, default_value = "2")]
        max_queries_per_meeting: usize,

        /// Sampling seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Concurrent queries in flight
        #[arg(long, default_value = "4")]
        query_concurrency: usize,

        #[command(flatten)]
        pipeline: PipelineArgs,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },
}

/// Pipeline knobs shared by both subcommands
#[derive(Debug, clap::Args)]
struct PipelineArgs {
    /// Completion model
    #[arg(long, default_value = "gpt-3.5-turbo")]
    model: String,

    /// Chunk window size in characters
    #[arg(long, default_value = "12000")]
    chunk_chars: usize,

    /// Overlap between consecutive chunks in characters
    #[arg(long, default_value = "1000")]
    overlap_chars: usize,

    /// Cap on chunks mapped per query
    #[arg(long, default_value = "6")]
    max_chunks: usize,

    /// Disable the keyword prefilter
    #[arg(long)]
    no_prefilter: bool,

    /// Prefilter policy: keep the top K chunks by keyword score
    #[arg(long, conflicts_with = "prefilter_min_score")]
    prefilter_top_k: Option<usize>,

    /// Prefilter policy: keep chunks scoring at least this many keyword hits
    #[arg(long)]
    prefilter_min_score: Option<usize>,

    /// Run a revision pass on the merged draft
    #[arg(long)]
    revise: bool,

    /// Prepend a worked example to map prompts
    #[arg(long)]
    few_shot: bool,

    /// Disable phrase preservation (top transcript bigrams)
    #[arg(long)]
    no_preserve_ngrams: bool,

    /// Sampling temperature
    #[arg(long, default_value = "0.0")]
    temperature: f64,

    /// Maximum completion tokens per call
    #[arg(long, default_value = "320")]
    max_tokens: u32,

    /// Concurrent map calls per query
    #[arg(long, default_value = "4")]
    map_concurrency: usize,

    /// Failed map chunk handling: empty, skip, or fail
    #[arg(long, default_value = "empty")]
    on_chunk_failure: String,
}

impl PipelineArgs {
    fn to_config(&self) -> Result<PipelineConfig> {
        let prefilter = if self.no_prefilter {
            None
        } else if let Some(k) = self.prefilter_top_k {
            Some(FilterPolicy::TopK(k))
        } else {
            Some(FilterPolicy::MinScore(self.prefilter_min_score.unwrap_or(1)))
        };

        let on_chunk_failure = match self.on_chunk_failure.as_str() {
            "empty" => ChunkFailurePolicy::EmptySummary,
            "skip" => ChunkFailurePolicy::Skip,
            "fail" => ChunkFailurePolicy::Fail,
            other => bail!("Unknown chunk failure policy: {}", other),
        };

        Ok(PipelineConfig {
            model: self.model.clone(),
            chunk_chars: self.chunk_chars,
            overlap_chars: self.overlap_chars,
            max_chunks: Some(self.max_chunks),
            prefilter,
            revise: self.revise,
            few_shot: self.few_shot,
            preserve_phrases: if self.no_preserve_ngrams { None } else { Some(8) },
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            map_concurrency: self.map_concurrency,
            on_chunk_failure,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Summarize {
            input,
            output,
            mode,
            query,
            run_log,
            cache_dir,
            pipeline,
            verbose,
        } => {
            setup_logging(verbose);
            let mode = parse_mode(&mode, query)?;
            summarize_transcript(input, output, mode, run_log, cache_dir, &pipeline).await
        }
        Commands::Bench {
            split_dir,
            out_jsonl,
            cache_dir,
            sample_ratio,
            max_meetings,
            max_queries_per_meeting,
            seed,
            query_concurrency,
            pipeline,
            verbose,
        } => {
            setup_logging(verbose);
            run_benchmark(
                split_dir,
                out_jsonl,
                cache_dir,
                sample_ratio,
                max_meetings,
                max_queries_per_meeting,
                seed,
                query_concurrency,
                &pipeline,
            )
            .await
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn parse_mode(mode: &str, query: Option<String>) -> Result<SummaryMode> {
    match mode {
        "general" => Ok(SummaryMode::General),
        "decision" => Ok(SummaryMode::Decision),
        "blocker" => Ok(SummaryMode::Blocker),
        "query" => match query {
            Some(query) => Ok(SummaryMode::Query(query)),
            None => bail!("--query is required for query mode"),
        },
        other => bail!("Unknown mode: {} (expected general, decision, blocker, or query)", other),
    }
}

async fn summarize_transcript(
    input: PathBuf,
    output: PathBuf,
    mode: SummaryMode,
    run_log: PathBuf,
    cache_dir: PathBuf,
    args: &PipelineArgs,
) -> Result<()> {
    info!("Loading transcript from {:?}", input);
    let transcript = load_transcript_file(&input).context("Failed to load input transcript")?;
    if transcript.is_empty() {
        bail!("Transcript {:?} contains no usable turns", input);
    }
    info!("Loaded {} turns", transcript.turns.len());

    let config = args.to_config()?;
    let model = config.model.clone();

    let client = Arc::new(OpenAiClient::new(OpenAiConfig::from_env()?));
    let cache: Arc<dyn CompletionCache> = Arc::new(DiskCache::open(&cache_dir)?);
    let pipeline = MapReduceSummarizer::new(client, cache, config);

    let dialogue = transcript.render_dialogue();
    let result = pipeline
        .summarize(&dialogue, &mode)
        .await
        .context("Summarization failed")?;

    info!(
        "Summarized {} chunks ({} map failures)",
        result.chunks_mapped, result.map_failures
    );

    let summary = SummaryOutput::new(
        parse_summary(&result.text),
        mode.label().to_string(),
        model,
        result.chunks_total,
        result.chunks_mapped,
        result.map_failures,
    );
    summary.write_json(&output)?;
    summary.append_run_log(&run_log)?;

    info!("Summary written to {:?}", output);
    info!("Run log entry appended to {:?}", run_log);
    Ok(())
}

async fn run_benchmark(
    split_dir: PathBuf,
    out_jsonl: PathBuf,
    cache_dir: PathBuf,
    sample_ratio: f64,
    max_meetings: usize,
    max_queries_per_meeting: usize,
    seed: u64,
    query_concurrency: usize,
    args: &PipelineArgs,
) -> Result<()> {
    info!("Loading dataset from {:?}", split_dir);
    let records = load_qmsum_dir(&split_dir)?;
    if records.is_empty() {
        bail!("No queries found in {:?}", split_dir);
    }

    // Group queries by meeting, keeping first-seen meeting order
    let mut meeting_order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<QueryRecord>> = HashMap::new();
    let total_queries = records.len();
    for record in records {
        if !groups.contains_key(&record.meeting_id) {
            meeting_order.push(record.meeting_id.clone());
        }
        groups.entry(record.meeting_id.clone()).or_default().push(record);
    }

    let target = ((meeting_order.len() as f64 * sample_ratio).ceil() as usize)
        .clamp(1, meeting_order.len())
        .min(max_meetings.max(1));
    let mut rng = StdRng::seed_from_u64(seed);
    let sampled: Vec<String> = meeting_order
        .choose_multiple(&mut rng, target)
        .cloned()
        .collect();

    let mut run_items: Vec<QueryRecord> = Vec::new();
    for meeting_id in &sampled {
        if let Some(queries) = groups.remove(meeting_id) {
            run_items.extend(queries.into_iter().take(max_queries_per_meeting));
        }
    }

    info!(
        "Meetings: {} total, {} sampled; queries to process: {} (of {} total)",
        meeting_order.len(),
        sampled.len(),
        run_items.len(),
        total_queries
    );

    let config = args.to_config()?;
    let client = Arc::new(OpenAiClient::new(OpenAiConfig::from_env()?));
    let cache: Arc<dyn CompletionCache> = Arc::new(DiskCache::open(&cache_dir)?);
    let pipeline = Arc::new(MapReduceSummarizer::new(client, cache, config));

    let semaphore = Arc::new(Semaphore::new(query_concurrency.max(1)));
    let mut tasks = JoinSet::new();
    for record in run_items {
        let pipeline = Arc::clone(&pipeline);
        let semaphore = Arc::clone(&semaphore);
        tasks.spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            let mode = SummaryMode::Query(record.query.clone());
            match pipeline.summarize(&record.input_text, &mode).await {
                Ok(result) => PredictionRecord::from_query(&record, Some(result.text)),
                Err(e) => {
                    warn!(
                        "Query {}/{} failed: {}",
                        record.meeting_id, record.query_id, e
                    );
                    PredictionRecord::from_query(&record, None)
                }
            }
        });
    }

    // Rows land in completion order; a slow query never blocks the others
    let mut writer = JsonlWriter::create(&out_jsonl)?;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(record) => writer.write_record(&record)?,
            Err(e) => warn!("Query task aborted: {}", e),
        }
    }

    info!("Wrote {} predictions to {:?}", writer.written(), out_jsonl);
    Ok(())
}
