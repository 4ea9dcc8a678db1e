use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use alacarte::config::Config;
use alacarte::cooccurrence::Accumulator;
use alacarte::corpus::pipeline;
use alacarte::embeddings::table::EmbeddingTable;
use alacarte::evaluate::Evaluator;
use alacarte::output::{self, RunReport};
use alacarte::{persist, solver};

/// A La Carte embedding induction.
///
/// Learns a linear map from a word's averaged context embeddings to its
/// pretrained embedding, writes it to disk, and reports how well it
/// reproduces the corpus's own vocabulary.
#[derive(Parser)]
#[command(name = "alacarte", version, about)]
struct Cli {
    /// Corpus text file (paragraphs separated by blank lines)
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Pretrained embeddings (.bin for binary word2vec, anything else is text)
    #[arg(long)]
    embeddings: Option<PathBuf>,

    /// Where to write the induction matrix
    #[arg(long, default_value = "./A.bin")]
    opath: PathBuf,

    /// Context window size in tokens
    #[arg(short = 'n', default_value = "5")]
    n: usize,

    /// Tokenizer worker count (overrides ALACARTE_WORKERS)
    #[arg(long)]
    workers: Option<usize>,

    /// Also write a JSON run report to this path
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Logs go to stderr so the summary line stays last on stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("alacarte=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let Some(corpus_path) = cli.corpus.clone() else {
        eprintln!("{} --corpus is required", "Error:".red());
        process::exit(1);
    };
    let Some(embeddings_path) = cli.embeddings.clone() else {
        eprintln!("{} --embeddings is required", "Error:".red());
        process::exit(2);
    };

    let mut config = Config::load()?;
    if let Some(workers) = cli.workers {
        config.workers = workers.max(1);
    }

    run(&cli, &config, corpus_path, embeddings_path).await
}

async fn run(cli: &Cli, config: &Config, corpus_path: PathBuf, embeddings_path: PathBuf) -> Result<()> {
    println!("Loading embeddings from {}...", embeddings_path.display());
    let table = {
        let path = embeddings_path.clone();
        tokio::task::spawn_blocking(move || EmbeddingTable::load(&path))
            .await
            .context("embedding loader panicked")?
            .with_context(|| format!("Failed to load embeddings from {}", embeddings_path.display()))?
    };
    println!(
        "  {} words, {} dimensions",
        table.len(),
        table.dimension()
    );

    println!("Tokenizing {} ({} workers)...", corpus_path.display(), config.workers);
    let corpus = pipeline::load_corpus(&corpus_path, config.pool_options())
        .await
        .with_context(|| format!("Failed to read corpus from {}", corpus_path.display()))?;
    println!(
        "  {} documents, {} tokens",
        corpus.len(),
        corpus.token_count()
    );

    // Co-occurrence counting
    let pb = progress_bar(corpus.len(), "  Counting [{bar:30}] {pos}/{len} ({eta})")?;
    let mut accumulator = Accumulator::new(&table, cli.n)?;
    for document in &corpus {
        accumulator.add_document(document);
        pb.inc(1);
    }
    pb.finish_and_clear();
    let counts = accumulator.finish();
    info!(windows = counts.windows, "Co-occurrence statistics collected");

    println!("Fitting induction matrix...");
    let selected = solver::select_supported(&counts.frequencies).count_ones();
    let induction = solver::fit(&counts.matrix, &table, &counts.frequencies)
        .context("Failed to fit the induction matrix")?;

    persist::save(&cli.opath, &induction)
        .with_context(|| format!("Failed to write induction matrix to {}", cli.opath.display()))?;
    println!("  Wrote {}x{} matrix to {}", induction.nrows(), induction.ncols(), cli.opath.display());

    // Evaluation pass over the same corpus
    let pb = progress_bar(corpus.len(), "  Scoring [{bar:30}] {pos}/{len} ({eta})")?;
    let mut evaluator = Evaluator::new(&table, &induction, cli.n)?;
    for document in &corpus {
        evaluator.add_document(document);
        pb.inc(1);
    }
    pb.finish_and_clear();
    let summary = evaluator.finish().context("Failed to evaluate the induction matrix")?;

    let report = RunReport {
        corpus: corpus_path,
        embeddings: embeddings_path,
        output: cli.opath.clone(),
        window: cli.n,
        vocabulary: table.len(),
        dimension: table.dimension(),
        documents: corpus.len(),
        tokens: corpus.token_count(),
        selected,
        summary,
    };
    output::display_report(&report);
    if let Some(path) = &cli.report {
        output::write_report(path, &report)?;
        info!(path = %path.display(), "Wrote run report");
    }

    println!("{}", output::summary_line(&summary));
    Ok(())
}

fn progress_bar(len: usize, template: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new(len as u64);
    pb.set_style(ProgressStyle::default_bar().template(template)?);
    Ok(pb)
}
