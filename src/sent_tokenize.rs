// WHY: sentence splitting is an injected capability, not a core concern.
// The engine only asks "is this span more than one sentence?", so callers can
// swap in a model-based tokenizer without touching the reconstruction logic.

use anyhow::Result;
use regex_automata::meta::Regex;

/// Capability for decomposing text into an ordered sequence of sentences.
///
/// Implementations must be deterministic pure functions of the input string:
/// trimmed sentences re-joined with single spaces reproduce the input modulo
/// whitespace.
pub trait SentenceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Closures work as tokenizers, so tests and callers can inject behavior
/// without defining a type.
impl<F> SentenceTokenizer for F
where
    F: Fn(&str) -> Vec<String>,
{
    fn tokenize(&self, text: &str) -> Vec<String> {
        self(text)
    }
}

/// Regex-based sentence splitter.
///
/// A less-than-precise tokenizer that treats abbreviations as the end of a
/// sentence. Good enough to decide single- vs multi-sentence spans; use a
/// model-based [`SentenceTokenizer`] for precision work.
pub struct RegexSentenceTokenizer {
    boundary: Regex,
}

impl RegexSentenceTokenizer {
    pub fn new() -> Result<Self> {
        // Boundary: word character, optional non-word run, terminal marks plus
        // trailing closers, whitespace, and the start of the next sentence.
        let boundary = Regex::new(r"\w[^\s\w]*([?!.]+[^\s\w,]*)\s+\S")?;
        Ok(Self { boundary })
    }
}

impl SentenceTokenizer for RegexSentenceTokenizer {
    fn tokenize(&self, text: &str) -> Vec<String> {
        let mut sentences = Vec::new();
        let mut pos = 0;
        for caps in self.boundary.captures_iter(text) {
            if let Some(span) = caps.get_group(1) {
                sentences.push(text[pos..span.end].trim().to_string());
                pos = span.end;
            }
        }
        let tail = text[pos..].trim_start();
        if !tail.is_empty() {
            sentences.push(tail.to_string());
        }
        sentences
    }
}
