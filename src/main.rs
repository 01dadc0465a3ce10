use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use requote::dataset::{build_cbow_dataset, CbowConfig};
use requote::discovery;
use requote::pipeline::{self, PipelineConfig, TextPreparer};
use requote::RegexSentenceTokenizer;

#[derive(Parser, Debug)]
#[command(name = "requote")]
#[command(about = "Dialog-aware direct speech reconstructor for Project Gutenberg texts")]
#[command(version)]
struct Args {
    /// Root directory to scan for *-0.txt files
    root_dir: PathBuf,

    /// Overwrite even up-to-date aux files
    #[arg(long)]
    overwrite_all: bool,

    /// Abort on first error
    #[arg(long)]
    fail_fast: bool,

    /// Use memory-mapped I/O instead of async buffered
    #[arg(long)]
    use_mmap: bool,

    /// Suppress console progress bars
    #[arg(long)]
    no_progress: bool,

    /// Stats output file path
    #[arg(long, default_value = "run_stats.json")]
    stats_out: PathBuf,

    /// Also build a CBOW dataset CSV at this path
    #[arg(long)]
    dataset_out: Option<PathBuf>,

    /// Context window radius for the CBOW dataset
    #[arg(long, default_value_t = 5)]
    window_size: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    // WHY: structured JSON logging enables observability and debugging in production
    tracing_subscriber::fmt().with_target(false).json().init();

    let args = Args::parse();

    info!("Starting requote");
    info!(?args, "Parsed CLI arguments");

    // WHY: validate root directory exists early to fail fast with clear error
    if !args.root_dir.exists() {
        anyhow::bail!("Root directory does not exist: {}", args.root_dir.display());
    }
    if !args.root_dir.is_dir() {
        anyhow::bail!("Root path is not a directory: {}", args.root_dir.display());
    }

    info!("Starting file discovery in: {}", args.root_dir.display());
    let discovery_config = discovery::DiscoveryConfig {
        fail_fast: args.fail_fast,
    };
    let discovered = discovery::collect_book_files(&args.root_dir, discovery_config).await?;

    let valid_files: Vec<PathBuf> = discovered
        .iter()
        .filter(|f| f.utf8_ok && f.error.is_none())
        .map(|f| f.path.clone())
        .collect();
    let invalid_count = discovered.len() - valid_files.len();

    info!(
        "File discovery completed: {} total, {} valid, {} with issues",
        discovered.len(),
        valid_files.len(),
        invalid_count
    );
    for file in discovered.iter().filter(|f| !f.utf8_ok || f.error.is_some()) {
        if let Some(ref error) = file.error {
            info!("Issue with {}: {}", file.path.display(), error);
        } else {
            info!("UTF-8 validation failed: {}", file.path.display());
        }
    }

    println!(
        "requote v{} - found {} files matching *-0.txt ({} valid, {} with issues)",
        env!("CARGO_PKG_VERSION"),
        discovered.len(),
        valid_files.len(),
        invalid_count
    );

    if valid_files.is_empty() {
        println!("Nothing to do.");
        return Ok(());
    }

    let preparer = Arc::new(TextPreparer::new()?);
    let pipeline_config = PipelineConfig {
        overwrite_all: args.overwrite_all,
        fail_fast: args.fail_fast,
        use_mmap: args.use_mmap,
        ..Default::default()
    };

    let progress = if args.no_progress {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(valid_files.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    };

    let mut on_done = |stats: &pipeline::FileStats| {
        progress.set_message(stats.path.clone());
        progress.inc(1);
    };
    let run_stats = pipeline::process_files(
        &valid_files,
        Arc::clone(&preparer),
        &pipeline_config,
        Some(&mut on_done),
    )
    .await?;
    progress.finish_and_clear();

    pipeline::write_run_stats(&args.stats_out, &run_stats).await?;

    println!("Processing complete:");
    println!("  Processed: {} files", run_stats.files_processed);
    println!("  Skipped (up to date): {} files", run_stats.files_skipped);
    if run_stats.files_failed > 0 {
        println!("  Failed: {} files", run_stats.files_failed);
    }
    println!("  Paragraphs written: {}", run_stats.total_paragraphs);
    println!("  Characters processed: {}", run_stats.total_chars);
    println!("  Stats written to: {}", args.stats_out.display());

    if let Some(dataset_out) = args.dataset_out {
        info!("Building CBOW dataset at {}", dataset_out.display());
        let config = CbowConfig {
            window_size: args.window_size,
            ..Default::default()
        };
        let tokenizer = RegexSentenceTokenizer::new()?;
        let rows = tokio::task::spawn_blocking(move || {
            build_cbow_dataset(&valid_files, &dataset_out, &config, &preparer, &tokenizer)
        })
        .await??;
        println!("  Dataset rows written: {rows}");
    }

    Ok(())
}
