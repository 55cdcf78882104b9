//! Lantas command-line interface
//!
//! Annotates traffic-incident posts through an LLM endpoint and turns the
//! tagged text into BIO-labeled CSV datasets.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{Level, error, info};

use lantas_annotator::config::{
    DEFAULT_CHUNK_SIZE, DEFAULT_ENDPOINT, DEFAULT_LIMIT, DEFAULT_MODEL, DIAGNOSTIC_LIMIT,
};
use lantas_annotator::{
    ChatCompletionClient, ClientConfig, CorpusConfig, DatasetWriter, Orchestrator, OutputKind,
    ProgressStore, RetryPolicy, RowTable, load_corpus, load_system_prompt,
};
use lantas_core::TagConverter;

/// CLI arguments
#[derive(Parser)]
#[command(name = "lantas")]
#[command(about = "Resumable LLM annotation of traffic-incident posts into BIO datasets")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Progress snapshot file
    #[arg(short, long, env = "LANTAS_PROGRESS", default_value = "progress.csv")]
    progress: PathBuf,

    /// Directory for dataset outputs
    #[arg(short, long, env = "LANTAS_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Log debug events
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Annotate pending rows, resuming from the progress snapshot
    Annotate(AnnotateArgs),
    /// Rebuild a dataset from the progress snapshot without network calls
    Tokenize,
    /// Show how many rows are tagged, errored and pending
    Status,
}

#[derive(clap::Args)]
struct AnnotateArgs {
    /// Source corpus CSV
    #[arg(short, long, env = "LANTAS_INPUT", default_value = "data.csv")]
    input: PathBuf,

    /// API key for the completion endpoint
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Chat completion endpoint
    #[arg(long, env = "LANTAS_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Completion model
    #[arg(short, long, env = "LANTAS_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Replace the built-in system instruction
    #[arg(long, env = "LANTAS_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Per-attempt request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Attempts per row, including the first
    #[arg(long, default_value_t = 3)]
    attempts: u32,

    /// Pause after a transport failure, in seconds
    #[arg(long, default_value_t = 2)]
    backoff_secs: u64,

    /// Rows per checkpoint
    #[arg(short, long, env = "LANTAS_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,

    /// Selected rows to consider
    #[arg(short, long, default_value_t = DEFAULT_LIMIT)]
    limit: usize,

    /// Only consider the first two selected rows
    #[arg(long)]
    diagnostic: bool,

    /// Annotate a random subset of this many rows
    #[arg(long)]
    sample: Option<usize>,

    /// Seed for --sample
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Boolean column selecting rows to annotate
    #[arg(long, default_value = "is_aduan")]
    selector: String,

    /// Send rows marked ERROR in the snapshot again
    #[arg(long)]
    retry_errors: bool,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    let store = ProgressStore::new(&cli.progress);
    let writer = DatasetWriter::new(&cli.output_dir);

    let outcome = match cli.command {
        Commands::Annotate(args) => annotate(args, store, writer).await,
        Commands::Tokenize => tokenize(&store, &writer),
        Commands::Status => status(&store),
    };

    if let Err(e) = &outcome {
        error!("lantas failed: {e:#}");
    }
    outcome
}

async fn annotate(args: AnnotateArgs, store: ProgressStore, writer: DatasetWriter) -> Result<()> {
    let api_key = args
        .api_key
        .context("API_KEY is not set (environment or .env file)")?;
    let system_prompt = load_system_prompt(args.prompt_file.as_deref())
        .context("Failed to read system prompt")?;

    let limit = if args.diagnostic { DIAGNOSTIC_LIMIT } else { args.limit };
    let corpus = CorpusConfig::new(&args.input)
        .with_selector_column(args.selector)
        .with_limit(limit)
        .with_sample(args.sample, args.seed);
    let source = load_corpus(&corpus)
        .with_context(|| format!("Failed to load corpus from {}", args.input.display()))?;

    let rows = store
        .resume(source, args.retry_errors)
        .context("Failed to read progress snapshot")?;

    let client_config = ClientConfig::new(api_key, system_prompt)
        .with_endpoint(args.endpoint)
        .with_model(args.model)
        .with_timeout(Duration::from_secs(args.timeout_secs));
    info!(endpoint = %client_config.endpoint, model = %client_config.model, "using completion endpoint");
    let client = ChatCompletionClient::new(client_config).context("Failed to build HTTP client")?;

    let policy = RetryPolicy::new()
        .with_max_attempts(args.attempts)
        .with_transport_backoff(Duration::from_secs(args.backoff_secs));

    let mut orchestrator = Orchestrator::new(client, store, writer)
        .with_policy(policy)
        .with_chunk_size(args.chunk_size);
    if !args.no_progress {
        orchestrator = orchestrator.with_progress_bar();
    }

    let summary = orchestrator.run(rows).await.context("Annotation run failed")?;

    if let Some(path) = &summary.final_output {
        info!(
            tagged = summary.tagged,
            errored = summary.errored,
            skipped = summary.skipped,
            "dataset saved to: {}",
            path.display()
        );
    }
    Ok(())
}

fn tokenize(store: &ProgressStore, writer: &DatasetWriter) -> Result<()> {
    let rows = store
        .load()
        .context("Failed to read progress snapshot")?
        .with_context(|| format!("No progress snapshot at {}", store.path().display()))?;

    let triples = TagConverter::new().convert_rows(&rows);
    let path = writer
        .write(&triples, OutputKind::Single)
        .context("Failed to write dataset")?;

    info!(rows = rows.len(), triples = triples.len(), "dataset saved to: {}", path.display());
    Ok(())
}

fn status(store: &ProgressStore) -> Result<()> {
    let Some(rows) = store.load().context("Failed to read progress snapshot")? else {
        println!("No progress snapshot at {}", store.path().display());
        return Ok(());
    };

    let counts = RowTable::new(rows).counts();
    println!("Snapshot: {}", store.path().display());
    println!("  tagged:  {}", counts.tagged);
    println!("  errored: {}", counts.errored);
    println!("  pending: {}", counts.pending);
    Ok(())
}
