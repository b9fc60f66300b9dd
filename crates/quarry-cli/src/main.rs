// Quarry command-line entry point.
//
// `run` answers a JSONL batch, `schema` prints the dataset schema and `rank`
// shows the fragments retrieval would consult for one question.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use quarry_core::config::{CliOverrides, QuarryConfig};
use quarry_core::tracing::{init_tracing, LogFormat};
use quarry_core::traits::IQueryExecutor;
use quarry_pipeline::{read_batch, write_records, BatchRunner, Pipeline};
use quarry_retrieval::{Corpus, RankerOptions, SegmentOptions, TextRanker};
use quarry_sql::SqliteDataset;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "quarry", version, about = "Answer analytics questions over documents and a SQLite dataset")]
struct Args {
    /// Explicit config file; replaces the project `quarry.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Document directory (overrides `retrieval.docs_dir`).
    #[arg(long, global = true)]
    docs: Option<PathBuf>,

    /// SQLite dataset (overrides `dataset.path`).
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Answer every question of a JSONL batch.
    Run(RunArgs),
    /// Print the dataset schema description.
    Schema,
    /// Show the ranked fragments for one question.
    Rank {
        question: String,
    },
}

#[derive(Parser, Debug, Clone)]
struct RunArgs {
    /// Input JSONL: one `{id, question, format_hint}` per line.
    #[arg(long)]
    batch: PathBuf,

    /// Output JSONL: one answer record per input question.
    #[arg(long)]
    out: PathBuf,

    /// Run without a language model (templates and deterministic composition).
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Maximum questions answered at once.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Include the per-question stage trace in each record.
    #[arg(long, default_value_t = false)]
    trace: bool,

    /// Language model name (overrides `model.model`).
    #[arg(long)]
    model: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(if args.json_logs { LogFormat::Json } else { LogFormat::Text });

    let mut overrides = CliOverrides {
        config_file: args.config.clone(),
        docs_dir: args.docs.clone(),
        dataset_path: args.db.clone(),
        ..CliOverrides::default()
    };
    if let Command::Run(run) = &args.cmd {
        overrides.offline = run.offline;
        overrides.max_concurrency = run.concurrency;
        overrides.include_trace = run.trace.then_some(true);
        overrides.model = run.model.clone();
    }

    let root = std::env::current_dir().context("resolve working directory")?;
    let config = QuarryConfig::load(&root, Some(&overrides)).context("load configuration")?;

    match args.cmd {
        Command::Run(run) => run_batch(&config, &run),
        Command::Schema => print_schema(&config),
        Command::Rank { question } => print_ranking(&config, &question),
    }
}

fn run_batch(config: &QuarryConfig, args: &RunArgs) -> anyhow::Result<()> {
    let started = Instant::now();
    let ranker = load_ranker(config)?;
    let dataset = open_dataset(config)?;
    let model = quarry_llm::create_model(&config.model);

    let input = read_batch(&args.batch)
        .with_context(|| format!("read batch {}", args.batch.display()))?;
    if input.questions.is_empty() {
        bail!("batch {} holds no valid questions", args.batch.display());
    }
    info!(
        questions = input.questions.len(),
        skipped = input.skipped,
        model = model.name(),
        version = quarry_core::constants::VERSION,
        "batch loaded"
    );

    let pipeline = Arc::new(Pipeline::new(config, model, ranker, dataset));
    let runner = BatchRunner::from_config(pipeline, config);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;
    let records = runtime.block_on(runner.run(input.questions));

    write_records(&args.out, &records)
        .with_context(|| format!("write answers to {}", args.out.display()))?;
    info!(
        records = records.len(),
        out = %args.out.display(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "answers written"
    );
    Ok(())
}

fn print_schema(config: &QuarryConfig) -> anyhow::Result<()> {
    let dataset = open_dataset(config)?;
    println!("{}", dataset.schema().summary());
    Ok(())
}

fn print_ranking(config: &QuarryConfig, question: &str) -> anyhow::Result<()> {
    let ranker = load_ranker(config)?;
    let ranked = ranker.rank(question);
    if ranked.is_empty() {
        println!("no fragment scored above {}", ranker.options().min_relevance);
        return Ok(());
    }
    for entry in ranked.iter() {
        let line = serde_json::json!({
            "id": entry.fragment.id(),
            "score": entry.score,
            "title": entry.fragment.title(),
        });
        println!("{line}");
    }
    let retained: Vec<_> = ranked.iter().collect();
    println!("coverage {:.2}", ranker.coverage(question, &retained));
    Ok(())
}

fn load_ranker(config: &QuarryConfig) -> anyhow::Result<Arc<TextRanker>> {
    let dir = config.retrieval.effective_docs_dir();
    let corpus = Corpus::load(&dir, SegmentOptions::from_config(&config.retrieval))
        .with_context(|| format!("load documents from {}", dir.display()))?;
    info!(fragments = corpus.len(), dir = %dir.display(), "corpus loaded");
    Ok(Arc::new(TextRanker::new(
        Arc::new(corpus),
        RankerOptions::from_config(&config.retrieval),
    )))
}

fn open_dataset(config: &QuarryConfig) -> anyhow::Result<Arc<dyn IQueryExecutor>> {
    let path = config.dataset.effective_path();
    let dataset = SqliteDataset::open(&path, &config.dataset)
        .with_context(|| format!("open dataset {}", path.display()))?;
    Ok(Arc::new(dataset))
}
