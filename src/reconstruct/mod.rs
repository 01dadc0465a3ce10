//! Reconstruction of attributed direct speech into plain narrative prose.
//!
//! `"Yes," said Alice, "we learned French and music."` becomes
//! `Yes, we learned French and music. Said Alice.` — the attribution turned
//! into its own sentence, punctuation normalized, and nested single-quoted
//! speech resolved before the outer pass.

use anyhow::Result;
use tracing::debug;

use crate::sent_tokenize::SentenceTokenizer;
use crate::sentence_part::SentencePart;

mod reassembly;
mod splitter;

pub use splitter::QuoteStyle;

use splitter::{split_into_parts, SpeechPatterns};

/// Nesting in real prose stops at one level (single quotes inside double
/// quotes); the cap only guards against pathological or adversarial input.
const MAX_RECONSTRUCT_DEPTH: usize = 8;

/// Direct-speech reconstruction engine with its span patterns compiled once.
///
/// The engine holds no mutable state; one instance can serve concurrent
/// callers.
pub struct SpeechReconstructor {
    patterns: SpeechPatterns,
}

impl SpeechReconstructor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            patterns: SpeechPatterns::compile()?,
        })
    }

    /// Reconstruct attributed direct speech in `text` into narrative prose.
    pub fn reconstruct(&self, text: &str, tokenizer: &dyn SentenceTokenizer) -> String {
        self.reconstruct_at_depth(text, tokenizer, QuoteStyle::Primary, 0)
    }

    /// Run a single pass with an explicit quoting style. `Secondary` treats
    /// single-quoted spans as the speech to reconstruct.
    pub fn reconstruct_with_style(
        &self,
        text: &str,
        tokenizer: &dyn SentenceTokenizer,
        style: QuoteStyle,
    ) -> String {
        self.reconstruct_at_depth(text, tokenizer, style, 0)
    }

    fn reconstruct_at_depth(
        &self,
        text: &str,
        tokenizer: &dyn SentenceTokenizer,
        style: QuoteStyle,
        depth: usize,
    ) -> String {
        if depth >= MAX_RECONSTRUCT_DEPTH {
            debug!(depth, "recursion cap reached, returning input unmodified");
            return text.to_string();
        }

        let mut parts = split_into_parts(text, &self.patterns, tokenizer, style);

        match style {
            QuoteStyle::Secondary => {
                if parts.len() == 1 {
                    // A single part means no nested speech was found.
                    return text.to_string();
                }
            }
            QuoteStyle::Primary => {
                // Resolve nested single-quoted speech inside each quoted span
                // before the outer pass.
                for part in parts.iter_mut() {
                    if part.is_direct() {
                        let inner = self.reconstruct_at_depth(
                            part.text(),
                            tokenizer,
                            QuoteStyle::Secondary,
                            depth + 1,
                        );
                        part.text = inner;
                    }
                }
            }
        }

        if parts.is_empty() {
            return String::new();
        }

        let mut parts = reassembly::reassemble_parts(parts);
        finalize_parts(&mut parts, style);

        let texts: Vec<&str> = parts.iter().map(|p| p.text()).collect();
        texts.join(" ")
    }
}

/// Final pass over the reassembled sequence: capitalize the opening part (in
/// primary style) and every part following a closed one; close the last part
/// in primary style.
fn finalize_parts(parts: &mut [SentencePart<'_>], style: QuoteStyle) {
    let primary = style == QuoteStyle::Primary;
    let last = parts.len().saturating_sub(1);
    for idx in 0..parts.len() {
        let after_closed = idx > 0 && !parts[idx - 1].opened();
        let part = &mut parts[idx];
        if idx == 0 && primary {
            part.capitalize();
        }
        if after_closed {
            part.capitalize();
        }
        if idx == last && primary {
            part.close();
        }
    }
}

/// One-shot convenience over [`SpeechReconstructor`].
pub fn reconstruct_direct_speech(text: &str, tokenizer: &dyn SentenceTokenizer) -> Result<String> {
    let reconstructor = SpeechReconstructor::new()?;
    Ok(reconstructor.reconstruct(text, tokenizer))
}
