//! Paragraph extraction from raw book text.
//!
//! A paragraph is a run of lines separated by delimiter lines — lines with no
//! word character at all, which covers blank lines and ornament rows like
//! `* * *`. The async reader streams a file line by line so a whole book never
//! has to sit in memory twice, and soft-breaks runaway paragraphs at a
//! whitespace boundary.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::sentence_part::is_word_char;

/// Configuration for paragraph reading behavior
#[derive(Debug, Clone)]
pub struct ParagraphReaderConfig {
    /// Buffer size for async reading
    pub buffer_size: usize,
    /// Soft cap on a single paragraph; longer ones break at whitespace
    pub max_paragraph_bytes: usize,
}

impl Default for ParagraphReaderConfig {
    fn default() -> Self {
        Self {
            buffer_size: 8192,
            max_paragraph_bytes: 256 * 1024,
        }
    }
}

/// True for lines that delimit paragraphs rather than belong to one.
fn is_delimiter_line(line: &str) -> bool {
    !line.chars().any(is_word_char)
}

/// Split already-loaded text into trimmed, non-empty paragraphs.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if is_delimiter_line(line) {
            flush_paragraph(&mut current, &mut paragraphs);
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }
    flush_paragraph(&mut current, &mut paragraphs);
    paragraphs
}

fn flush_paragraph(current: &mut String, paragraphs: &mut Vec<String>) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        paragraphs.push(trimmed.to_string());
    }
    current.clear();
}

/// Async paragraph reader over a single text file.
pub struct AsyncParagraphReader {
    config: ParagraphReaderConfig,
}

impl AsyncParagraphReader {
    pub fn new(config: ParagraphReaderConfig) -> Self {
        Self { config }
    }

    /// Read the file and return its paragraphs in order.
    pub async fn read_paragraphs<P: AsRef<Path>>(&self, path: P) -> Result<Vec<String>> {
        let path = path.as_ref();
        let file = File::open(path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;
        let reader = BufReader::with_capacity(self.config.buffer_size, file);
        let mut lines = reader.lines();

        let mut paragraphs = Vec::new();
        let mut current = String::new();
        while let Some(line) = lines
            .next_line()
            .await
            .with_context(|| format!("failed to read {}", path.display()))?
        {
            if is_delimiter_line(&line) {
                flush_paragraph(&mut current, &mut paragraphs);
                continue;
            }
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(&line);

            // A missing delimiter must not grow one paragraph without bound:
            // break at the last whitespace inside the cap, repeatedly for
            // lines far over it.
            while current.len() >= self.config.max_paragraph_bytes {
                let mut limit = self.config.max_paragraph_bytes.min(current.len());
                while !current.is_char_boundary(limit) {
                    limit -= 1;
                }
                let Some(cut) = current[..limit].rfind(char::is_whitespace) else {
                    break;
                };
                let cut_end = cut + current[cut..].chars().next().map_or(1, char::len_utf8);
                let tail = current[cut_end..].to_string();
                current.truncate(cut_end);
                flush_paragraph(&mut current, &mut paragraphs);
                current = tail;
            }
        }
        flush_paragraph(&mut current, &mut paragraphs);

        debug!("read {} paragraphs from {}", paragraphs.len(), path.display());
        Ok(paragraphs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::fs;

    #[test]
    fn test_split_on_blank_lines() {
        let text = "First paragraph\nstill first.\n\nSecond paragraph.\n\n\nThird.";
        assert_eq!(
            split_paragraphs(text),
            vec![
                "First paragraph\nstill first.",
                "Second paragraph.",
                "Third.",
            ]
        );
    }

    #[test]
    fn test_ornament_lines_are_delimiters() {
        let text = "Chapter one ends.\n* * *\nChapter two begins.";
        assert_eq!(
            split_paragraphs(text),
            vec!["Chapter one ends.", "Chapter two begins."]
        );
    }

    #[test]
    fn test_whitespace_only_input() {
        assert!(split_paragraphs("").is_empty());
        assert!(split_paragraphs("\n \n\t\n").is_empty());
    }

    #[tokio::test]
    async fn test_read_paragraphs_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("book-0.txt");
        fs::write(&path, "One paragraph\nover two lines.\n\nAnother.\n")
            .await
            .unwrap();

        let reader = AsyncParagraphReader::new(ParagraphReaderConfig::default());
        let paragraphs = reader.read_paragraphs(&path).await.unwrap();
        assert_eq!(paragraphs, vec!["One paragraph\nover two lines.", "Another."]);
    }

    #[tokio::test]
    async fn test_oversized_paragraph_breaks_at_whitespace() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("big-0.txt");
        let long_line = "word ".repeat(100);
        fs::write(&path, &long_line).await.unwrap();

        let reader = AsyncParagraphReader::new(ParagraphReaderConfig {
            buffer_size: 1024,
            max_paragraph_bytes: 128,
        });
        let paragraphs = reader.read_paragraphs(&path).await.unwrap();
        assert!(paragraphs.len() > 1, "expected a forced break, got {paragraphs:?}");
        assert!(paragraphs.iter().all(|p| p.len() <= 128 + 5));
        let rejoined = paragraphs.join(" ");
        assert_eq!(rejoined.split_whitespace().count(), 100);
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let reader = AsyncParagraphReader::new(ParagraphReaderConfig::default());
        let result = reader.read_paragraphs("/nonexistent/book-0.txt").await;
        assert!(result.is_err());
    }
}
