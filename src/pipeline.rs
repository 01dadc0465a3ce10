//! Per-file processing: raw book text → paragraphs → cleanup → direct-speech
//! reconstruction → aux file next to the source, with per-file and per-run
//! statistics.

use anyhow::{Context, Result};
use futures::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, warn};

use crate::cleanup::BookCleaner;
use crate::paragraphs::split_paragraphs;
use crate::reconstruct::SpeechReconstructor;
use crate::sent_tokenize::RegexSentenceTokenizer;

/// Configuration for pipeline behavior
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Rewrite aux files even when they are newer than their source
    pub overwrite_all: bool,
    /// Abort on first failed file instead of recording and continuing
    pub fail_fast: bool,
    /// Use memory-mapped I/O instead of async buffered reads
    pub use_mmap: bool,
    /// Number of files processed concurrently
    pub concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            overwrite_all: false,
            fail_fast: false,
            use_mmap: false,
            concurrency: num_cpus::get(),
        }
    }
}

/// Per-file processing statistics
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FileStats {
    /// Source file path
    pub path: String,
    /// Number of paragraphs written to the aux file
    pub paragraphs: u64,
    /// Number of characters processed
    pub chars_processed: u64,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
    /// Throughput in characters per second
    pub chars_per_sec: f64,
    /// Processing status (success, skipped, failed)
    pub status: String,
    /// Error message if processing failed
    pub error: Option<String>,
}

impl FileStats {
    fn skipped(path: &Path) -> Self {
        Self {
            path: path.display().to_string(),
            paragraphs: 0,
            chars_processed: 0,
            processing_time_ms: 0,
            chars_per_sec: 0.0,
            status: "skipped".to_string(),
            error: None,
        }
    }

    fn failed(path: &Path, started: Instant, error: String) -> Self {
        Self {
            path: path.display().to_string(),
            paragraphs: 0,
            chars_processed: 0,
            processing_time_ms: started.elapsed().as_millis() as u64,
            chars_per_sec: 0.0,
            status: "failed".to_string(),
            error: Some(error),
        }
    }
}

/// Whole-run statistics written as JSON at the end of a run
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RunStats {
    pub files_processed: u64,
    pub files_skipped: u64,
    pub files_failed: u64,
    pub total_paragraphs: u64,
    pub total_chars: u64,
    pub total_time_ms: u64,
    pub file_stats: Vec<FileStats>,
}

/// Generate the aux file path for a source file: `11-0.txt` → `11-0_requote.txt`
pub fn aux_file_path(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");
    source.with_file_name(format!("{stem}_requote.txt"))
}

/// True when the aux file exists and is at least as new as its source, so the
/// file can be skipped on incremental runs.
pub fn aux_is_current(source: &Path) -> bool {
    let aux = aux_file_path(source);
    let (Ok(aux_meta), Ok(src_meta)) = (std::fs::metadata(&aux), std::fs::metadata(source)) else {
        return false;
    };
    match (aux_meta.modified(), src_meta.modified()) {
        (Ok(aux_time), Ok(src_time)) => aux_time >= src_time,
        _ => false,
    }
}

/// The full text-preparation stack: cleanup, reconstruction, and the default
/// tokenizer, compiled once and shared across files.
pub struct TextPreparer {
    cleaner: BookCleaner,
    reconstructor: SpeechReconstructor,
    tokenizer: RegexSentenceTokenizer,
}

impl TextPreparer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            cleaner: BookCleaner::new()?,
            reconstructor: SpeechReconstructor::new()?,
            tokenizer: RegexSentenceTokenizer::new()?,
        })
    }

    /// Mechanical cleanup only.
    pub fn clean(&self, raw: &str) -> String {
        self.cleaner.prepare_book_text(raw)
    }

    /// Direct-speech reconstruction with the bundled tokenizer.
    pub fn reconstruct(&self, text: &str) -> String {
        self.reconstructor.reconstruct(text, &self.tokenizer)
    }

    /// Cleanup followed by reconstruction — one raw paragraph in, one
    /// narrative paragraph out.
    pub fn prepare_paragraph(&self, raw: &str) -> String {
        let cleaned = self.clean(raw);
        self.reconstruct(&cleaned)
    }
}

async fn read_text(path: &Path, use_mmap: bool) -> Result<String> {
    if use_mmap {
        let path = path.to_path_buf();
        let text = tokio::task::spawn_blocking(move || -> Result<String> {
            let file = std::fs::File::open(&path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            let mmap = unsafe { memmap2::Mmap::map(&file) }
                .with_context(|| format!("failed to mmap {}", path.display()))?;
            let text = std::str::from_utf8(&mmap)
                .with_context(|| format!("invalid UTF-8 in {}", path.display()))?;
            Ok(text.to_string())
        })
        .await
        .context("mmap read task failed")??;
        Ok(text)
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))
    }
}

async fn write_aux_file(aux_path: &Path, paragraphs: &[String]) -> Result<()> {
    let file = tokio::fs::File::create(aux_path)
        .await
        .with_context(|| format!("failed to create {}", aux_path.display()))?;
    let mut writer = BufWriter::new(file);
    for paragraph in paragraphs {
        if paragraph.is_empty() {
            continue;
        }
        writer.write_all(paragraph.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }
    writer.flush().await?;
    Ok(())
}

/// Process one source file into its aux file, returning stats either way.
pub async fn process_file(path: &Path, preparer: &TextPreparer, config: &PipelineConfig) -> FileStats {
    let started = Instant::now();

    if !config.overwrite_all && aux_is_current(path) {
        debug!("skipping up-to-date {}", path.display());
        return FileStats::skipped(path);
    }

    let text = match read_text(path, config.use_mmap).await {
        Ok(text) => text,
        Err(e) => return FileStats::failed(path, started, e.to_string()),
    };

    let raw_paragraphs = split_paragraphs(&text);
    let prepared: Vec<String> = raw_paragraphs
        .iter()
        .map(|p| preparer.prepare_paragraph(p))
        .filter(|p| !p.is_empty())
        .collect();

    let aux_path = aux_file_path(path);
    if let Err(e) = write_aux_file(&aux_path, &prepared).await {
        return FileStats::failed(path, started, e.to_string());
    }

    let elapsed_ms = started.elapsed().as_millis() as u64;
    let chars = text.chars().count() as u64;
    info!(
        "processed {}: {} paragraphs, {} chars in {}ms",
        path.display(),
        prepared.len(),
        chars,
        elapsed_ms
    );
    FileStats {
        path: path.display().to_string(),
        paragraphs: prepared.len() as u64,
        chars_processed: chars,
        processing_time_ms: elapsed_ms,
        chars_per_sec: if elapsed_ms > 0 {
            chars as f64 / (elapsed_ms as f64 / 1000.0)
        } else {
            0.0
        },
        status: "success".to_string(),
        error: None,
    }
}

/// Process files concurrently, honoring `fail_fast`, and aggregate run stats.
/// The optional callback fires once per finished file (progress reporting).
pub async fn process_files(
    files: &[PathBuf],
    preparer: Arc<TextPreparer>,
    config: &PipelineConfig,
    mut on_file_done: Option<&mut (dyn FnMut(&FileStats) + Send)>,
) -> Result<RunStats> {
    let started = Instant::now();

    let mut tasks = stream::iter(files.iter().cloned().map(|path| {
        let preparer = Arc::clone(&preparer);
        let config = config.clone();
        async move { process_file(&path, &preparer, &config).await }
    }))
    .buffer_unordered(config.concurrency.max(1));

    let mut file_stats = Vec::with_capacity(files.len());
    while let Some(stats) = tasks.next().await {
        if let Some(callback) = on_file_done.as_deref_mut() {
            callback(&stats);
        }
        if stats.status == "failed" {
            warn!("failed to process {}: {:?}", stats.path, stats.error);
            if config.fail_fast {
                anyhow::bail!(
                    "processing failed for {}: {}",
                    stats.path,
                    stats.error.clone().unwrap_or_default()
                );
            }
        }
        file_stats.push(stats);
    }
    drop(tasks);

    file_stats.sort_by(|a, b| a.path.cmp(&b.path));

    let count_status = |status: &str| file_stats.iter().filter(|s| s.status == status).count() as u64;
    Ok(RunStats {
        files_processed: count_status("success"),
        files_skipped: count_status("skipped"),
        files_failed: count_status("failed"),
        total_paragraphs: file_stats.iter().map(|s| s.paragraphs).sum(),
        total_chars: file_stats.iter().map(|s| s.chars_processed).sum(),
        total_time_ms: started.elapsed().as_millis() as u64,
        file_stats,
    })
}

/// Write the run stats JSON next to wherever the caller points.
pub async fn write_run_stats(path: &Path, stats: &RunStats) -> Result<()> {
    let json = serde_json::to_string_pretty(stats).context("failed to serialize run stats")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aux_file_path() {
        assert_eq!(
            aux_file_path(Path::new("/data/books/11-0.txt")),
            Path::new("/data/books/11-0_requote.txt")
        );
    }

    #[test]
    fn test_prepare_paragraph_end_to_end() {
        let preparer = TextPreparer::new().unwrap();
        let raw = "\u{201C}Yes,\u{201D} said Alice, \u{201C}we learned French and music.\u{201D}";
        assert_eq!(
            preparer.prepare_paragraph(raw),
            "Yes, we learned French and music. Said Alice."
        );
    }

    #[test]
    fn test_prepare_paragraph_plain_narration() {
        let preparer = TextPreparer::new().unwrap();
        assert_eq!(
            preparer.prepare_paragraph("the rabbit ran past her"),
            "The rabbit ran past her."
        );
    }
}
