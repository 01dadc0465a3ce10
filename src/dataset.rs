//! CBOW dataset export: reconstructed narrative text → context/target windows
//! with a deterministic train/val/test assignment, written as CSV.

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::paragraphs::split_paragraphs;
use crate::pipeline::TextPreparer;
use crate::sent_tokenize::SentenceTokenizer;
use crate::sentence_part::is_word_char;

/// Dataset split labels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Train,
    Val,
    Test,
}

impl Split {
    pub fn as_str(self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Val => "val",
            Split::Test => "test",
        }
    }
}

const SPLITS: [Split; 3] = [Split::Train, Split::Val, Split::Test];

/// Distributes samples over train/val/test so the realized byte ratios track
/// the configured ones. Deterministic for a fixed seed and input sequence.
pub struct SampleDistributor {
    ratios: [f64; 3],
    lengths: [u64; 3],
    sum: u64,
    cursor: usize,
    rng: StdRng,
}

impl SampleDistributor {
    pub fn new(train_ratio: f64, val_ratio: f64, test_ratio: f64, seed: u64) -> Self {
        Self {
            ratios: [train_ratio, val_ratio, test_ratio],
            lengths: [0; 3],
            sum: 0,
            cursor: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn under_ratio(&self, idx: usize) -> bool {
        if self.sum < 1 {
            return true;
        }
        (self.lengths[idx] as f64) / (self.sum as f64) < self.ratios[idx]
    }

    /// Assign a sample of the given length to a split: advance the cycle by a
    /// random shift, then take the first split still under its ratio, falling
    /// back to the last candidate.
    pub fn assign(&mut self, length: usize) -> Split {
        let shift = self.rng.gen_range(0..SPLITS.len());
        self.cursor = (self.cursor + shift) % SPLITS.len();

        let mut choice = self.cursor;
        for i in 0..SPLITS.len() {
            choice = self.cursor;
            self.cursor = (self.cursor + 1) % SPLITS.len();
            if i == SPLITS.len() - 1 || self.under_ratio(choice) {
                break;
            }
        }
        self.lengths[choice] += length as u64;
        self.sum += length as u64;
        SPLITS[choice]
    }
}

/// Configuration for CBOW dataset creation
#[derive(Debug, Clone)]
pub struct CbowConfig {
    /// Context window radius around the target word
    pub window_size: usize,
    pub train_ratio: f64,
    pub val_ratio: f64,
    pub test_ratio: f64,
    /// Seed for the split assignment
    pub seed: u64,
}

impl Default for CbowConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            train_ratio: 0.7,
            val_ratio: 0.15,
            test_ratio: 0.15,
            seed: 1719,
        }
    }
}

/// Lowercased word/punctuation tokens; apostrophes stay word-internal.
pub fn word_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if is_word_char(c) || c == '\'' {
            current.extend(c.to_lowercase());
        } else {
            flush_token(&mut current, &mut tokens);
            if !c.is_whitespace() {
                tokens.push(c.to_string());
            }
        }
    }
    flush_token(&mut current, &mut tokens);
    tokens
}

fn flush_token(current: &mut String, tokens: &mut Vec<String>) {
    let token = current.trim_matches('\'');
    if !token.is_empty() {
        tokens.push(token.to_string());
    }
    current.clear();
}

/// One (context, target) row per token: the context is the up-to-`window`
/// neighbors on each side, target excluded, order preserved.
pub fn cbow_rows(tokens: &[String], window: usize) -> Vec<(String, String)> {
    let mut rows = Vec::with_capacity(tokens.len());
    for (i, target) in tokens.iter().enumerate() {
        let from = i.saturating_sub(window);
        let to = (i + window + 1).min(tokens.len());
        let context: Vec<&str> = (from..to)
            .filter(|&j| j != i)
            .map(|j| tokens[j].as_str())
            .collect();
        rows.push((context.join(" "), target.clone()));
    }
    rows
}

/// Build a CBOW CSV dataset (`context,target,split`) from raw book files.
///
/// Each paragraph is assigned a split by its raw length, cleaned, stripped of
/// mid-sentence colons and semicolons, reconstructed, sentence-tokenized, and
/// windowed per sentence. Blocking; call from `spawn_blocking` in async
/// contexts.
pub fn build_cbow_dataset(
    paths: &[PathBuf],
    output: &Path,
    config: &CbowConfig,
    preparer: &TextPreparer,
    tokenizer: &dyn SentenceTokenizer,
) -> Result<u64> {
    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    writer
        .write_record(["context", "target", "split"])
        .context("failed to write dataset header")?;

    let mut distributor = SampleDistributor::new(
        config.train_ratio,
        config.val_ratio,
        config.test_ratio,
        config.seed,
    );

    let mut rows_written = 0u64;
    for path in paths {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        for paragraph in split_paragraphs(&text) {
            let split = distributor.assign(paragraph.len());

            let cleaned = preparer.clean(&paragraph);
            let cleaned = cleaned.replace(';', ".").replace(':', ".");
            let narrative = preparer.reconstruct(&cleaned);

            for sentence in tokenizer.tokenize(&narrative) {
                let tokens = word_tokens(&sentence);
                for (context, target) in cbow_rows(&tokens, config.window_size) {
                    writer
                        .write_record([context.as_str(), target.as_str(), split.as_str()])
                        .context("failed to write dataset row")?;
                    rows_written += 1;
                }
            }
        }
    }
    writer.flush().context("failed to flush dataset")?;
    info!("wrote {} dataset rows to {}", rows_written, output.display());
    Ok(rows_written)
}
