use std::fmt;

use crate::sent_tokenize::SentenceTokenizer;

/// Marks that may trail a clause: `! , . : ; ?`
pub(crate) const CLAUSE_MARKS: [char; 6] = ['!', ',', '.', ':', ';', '?'];

/// Marks that terminate a sentence: `. ? !`
pub(crate) const TERMINAL_MARKS: [char; 3] = ['.', '?', '!'];

/// Word character in the sense of `\w`: Unicode alphanumeric or underscore.
pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// One span of a split sentence: either quoted direct speech or surrounding
/// narration.
///
/// The `text` of a direct part never contains the enclosing quote characters;
/// `quoted_text`, when present, always does. Parts are created by the splitter
/// and mutated in place by the reconstruction pass; they carry a shared,
/// non-owned tokenizer so the single-/multi-sentence predicate stays cheap to
/// recompute after edits.
pub struct SentencePart<'t> {
    pub(crate) text: String,
    pub(crate) direct: bool,
    quoted_text: Option<String>,
    tokenizer: &'t dyn SentenceTokenizer,
}

impl<'t> SentencePart<'t> {
    pub fn new(text: impl Into<String>, direct: bool, tokenizer: &'t dyn SentenceTokenizer) -> Self {
        Self {
            text: text.into(),
            direct,
            quoted_text: None,
            tokenizer,
        }
    }

    /// A direct-speech part remembering its original quoted form.
    pub fn quoted(
        text: impl Into<String>,
        quoted_text: impl Into<String>,
        tokenizer: &'t dyn SentenceTokenizer,
    ) -> Self {
        Self {
            text: text.into(),
            direct: true,
            quoted_text: Some(quoted_text.into()),
            tokenizer,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_direct(&self) -> bool {
        self.direct
    }

    /// The original matched text including quote marks, falling back to `text`
    /// when the part was never quoted.
    pub fn quoted_text(&self) -> &str {
        self.quoted_text.as_deref().unwrap_or(&self.text)
    }

    /// Byte offset just past the last word character, if any.
    fn word_end(&self) -> Option<usize> {
        self.text
            .char_indices()
            .rev()
            .find(|&(_, c)| is_word_char(c))
            .map(|(i, c)| i + c.len_utf8())
    }

    /// True when the span lacks terminal punctuation: no `. ? !` occurs after
    /// the last word character (a mark at the very start of the text does not
    /// count as terminating anything).
    pub fn opened(&self) -> bool {
        let tail_start = self.word_end().unwrap_or(0);
        !self.text[tail_start..]
            .char_indices()
            .any(|(off, c)| TERMINAL_MARKS.contains(&c) && tail_start + off > 0)
    }

    /// The single clause mark immediately after the last word character.
    pub fn punct(&self) -> Option<char> {
        let end = self.word_end()?;
        self.text[end..].chars().next().filter(|c| CLAUSE_MARKS.contains(c))
    }

    /// True when the tokenizer splits `text` into more than one sentence.
    pub fn is_multi_sentence(&self) -> bool {
        self.tokenizer.tokenize(&self.text).len() > 1
    }

    /// Uppercase the first character if it is a lowercase letter. Idempotent.
    pub fn capitalize(&mut self) {
        if let Some(c) = self.text.chars().next() {
            if c.is_lowercase() {
                let upper: String = c.to_uppercase().collect();
                self.text.replace_range(..c.len_utf8(), &upper);
            }
        }
    }

    /// Terminate the span with a period if it is still open. Idempotent.
    pub fn close(&mut self) {
        if self.opened() {
            self.replace_punct('.');
        }
    }

    /// Replace (or insert, if absent) the clause mark after the last word
    /// character, preserving any trailing non-word characters such as a
    /// closing quote or parenthesis.
    pub fn replace_punct(&mut self, punct: char) {
        self.splice_punct(Some(punct));
    }

    /// Remove the clause mark after the last word character.
    pub fn clear_punct(&mut self) {
        self.splice_punct(None);
    }

    fn splice_punct(&mut self, replacement: Option<char>) {
        let Some(end) = self.word_end() else { return };
        let mark_len = self.text[end..]
            .chars()
            .next()
            .filter(|c| CLAUSE_MARKS.contains(c))
            .map_or(0, char::len_utf8);
        let mut out = String::with_capacity(self.text.len() + 1);
        out.push_str(&self.text[..end]);
        if let Some(p) = replacement {
            out.push(p);
        }
        out.push_str(&self.text[end + mark_len..]);
        self.text = out;
    }

    /// Split into one part per sentence, each sharing this part's `direct`
    /// flag and tokenizer.
    pub fn sent_tokenize(&self) -> Vec<SentencePart<'t>> {
        self.tokenizer
            .tokenize(&self.text)
            .into_iter()
            .map(|s| SentencePart::new(s, self.direct, self.tokenizer))
            .collect()
    }
}

impl fmt::Debug for SentencePart<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SentencePart")
            .field("text", &self.text)
            .field("direct", &self.direct)
            .finish()
    }
}
