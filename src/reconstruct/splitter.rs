use anyhow::Result;
use regex_automata::{meta::Regex, Input};
use tracing::trace;

use crate::sent_tokenize::SentenceTokenizer;
use crate::sentence_part::{SentencePart, CLAUSE_MARKS};

/// Which quoting convention a pass matches: outer double-quote dialog or
/// nested single-quote speech inside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    Primary,
    Secondary,
}

impl QuoteStyle {
    fn quote_char(self) -> char {
        match self {
            QuoteStyle::Primary => '"',
            QuoteStyle::Secondary => '\'',
        }
    }
}

/// The two span matchers, compiled once per reconstructor.
pub(crate) struct SpeechPatterns {
    primary: Regex,
    secondary: Regex,
}

impl SpeechPatterns {
    pub(crate) fn compile() -> Result<Self> {
        // Primary: a double-quoted run containing at least one word character,
        // ending in clause marks plus an optional apostrophe before the closing
        // quote, or in a bare closing quote at end of input.
        let primary = Regex::new(r#""[^"]*\w[^"]*(?:[!,.:;?]+'?"|'?"\s*$)"#)?;
        // Secondary: a single-quoted run starting with a word character whose
        // interior apostrophes are word-internal only, ending in clause marks
        // plus the closing quote. The clause-break context before the opening
        // quote is checked separately in `secondary_spans`.
        let secondary = Regex::new(r"'\w(?:[^']|'\w)*[,.:;?!]+'")?;
        Ok(Self { primary, secondary })
    }
}

/// Split raw text into an ordered part sequence: matched quoted spans become
/// direct parts (quotes stripped, original kept as `quoted_text`); the trimmed
/// text between matches becomes non-direct parts, dropped when empty.
pub(crate) fn split_into_parts<'t>(
    text: &str,
    patterns: &SpeechPatterns,
    tokenizer: &'t dyn SentenceTokenizer,
    style: QuoteStyle,
) -> Vec<SentencePart<'t>> {
    let spans = match style {
        QuoteStyle::Primary => primary_spans(patterns, text),
        QuoteStyle::Secondary => secondary_spans(patterns, text),
    };
    trace!("matched {} quoted spans", spans.len());

    let quote = style.quote_char();
    let mut parts: Vec<SentencePart<'t>> = Vec::new();
    let mut pos = 0;
    for (start, end) in spans {
        if pos < start {
            let gap = text[pos..start].trim();
            if !gap.is_empty() {
                parts.push(SentencePart::new(gap, false, tokenizer));
            }
        }
        pos = end;

        let quoted = text[start..end].trim();
        let inner = quoted.trim_matches(quote);
        if !inner.is_empty() {
            parts.push(SentencePart::quoted(inner, quoted, tokenizer));
        }
    }
    if pos < text.len() {
        let gap = text[pos..].trim();
        if !gap.is_empty() {
            parts.push(SentencePart::new(gap, false, tokenizer));
        }
    }

    fixup_tail(&mut parts, style);
    parts
}

fn primary_spans(patterns: &SpeechPatterns, text: &str) -> Vec<(usize, usize)> {
    patterns
        .primary
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect()
}

/// Secondary matches must start at input start or right after a clause mark
/// plus whitespace; rejected candidates resume the scan one byte further so a
/// later valid opening inside them is still found.
fn secondary_spans(patterns: &SpeechPatterns, text: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut search = 0;
    while let Some(m) = patterns.secondary.find(Input::new(text).range(search..)) {
        if m.start() == 0 || follows_clause_break(text, m.start()) {
            spans.push((m.start(), m.end()));
            search = m.end();
        } else {
            search = m.start() + 1;
        }
        if search > text.len() {
            break;
        }
    }
    spans
}

fn follows_clause_break(text: &str, start: usize) -> bool {
    let mut before = text[..start].chars().rev();
    before.next().is_some_and(|c| c.is_whitespace())
        && before.next().is_some_and(|c| CLAUSE_MARKS.contains(&c))
}

/// Trailing-part corner cases, applied after the scan.
fn fixup_tail(parts: &mut Vec<SentencePart<'_>>, style: QuoteStyle) {
    let n = parts.len();
    match style {
        QuoteStyle::Secondary => {
            // A trailing quoted span after an unpunctuated clause belongs to
            // that clause: merge it in and drop the part.
            if n >= 2 && parts[n - 1].is_direct() && parts[n - 2].punct().is_none() {
                if let Some(tail) = parts.pop() {
                    if let Some(prev) = parts.last_mut() {
                        prev.text.push(' ');
                        prev.text.push_str(&tail.text);
                    }
                }
            }
        }
        QuoteStyle::Primary => {
            // An unpunctuated trailing quote after an unpunctuated clause is
            // narrative, not speech; standing alone it is an unterminated line
            // that gets closed.
            let prev_unpunctuated = n >= 2 && parts[n - 2].punct().is_none();
            if let Some(last) = parts.last_mut() {
                if last.direct && last.punct().is_none() {
                    if prev_unpunctuated {
                        last.direct = false;
                    } else {
                        last.close();
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sent_tokenize::RegexSentenceTokenizer;
    use std::sync::OnceLock;

    static PATTERNS: OnceLock<SpeechPatterns> = OnceLock::new();
    static TOKENIZER: OnceLock<RegexSentenceTokenizer> = OnceLock::new();

    fn split(text: &str, style: QuoteStyle) -> Vec<SentencePart<'static>> {
        let patterns = PATTERNS.get_or_init(|| SpeechPatterns::compile().unwrap());
        let tokenizer = TOKENIZER.get_or_init(|| RegexSentenceTokenizer::new().unwrap());
        split_into_parts(text, patterns, tokenizer, style)
    }

    fn texts(parts: &[SentencePart<'_>]) -> Vec<(String, bool)> {
        parts
            .iter()
            .map(|p| (p.text().to_string(), p.is_direct()))
            .collect()
    }

    #[test]
    fn test_primary_alternating_speech() {
        let parts = split(
            "\"Yes,\" said Alice, \"we learned French and music.\"",
            QuoteStyle::Primary,
        );
        assert_eq!(
            texts(&parts),
            vec![
                ("Yes,".to_string(), true),
                ("said Alice,".to_string(), false),
                ("we learned French and music.".to_string(), true),
            ]
        );
        assert_eq!(parts[0].quoted_text(), "\"Yes,\"");
        assert_eq!(parts[2].quoted_text(), "\"we learned French and music.\"");
    }

    #[test]
    fn test_primary_no_quotes_is_one_part() {
        let parts = split("It was a bright cold day in April.", QuoteStyle::Primary);
        assert_eq!(
            texts(&parts),
            vec![("It was a bright cold day in April.".to_string(), false)]
        );
    }

    #[test]
    fn test_primary_unbalanced_quote_never_matches() {
        let parts = split("He opened the door and said \"wait for me", QuoteStyle::Primary);
        assert_eq!(parts.len(), 1);
        assert!(!parts[0].is_direct());
    }

    #[test]
    fn test_primary_trailing_quote_at_end_of_input() {
        // No terminal punctuation inside the quote, but it closes the input.
        let parts = split("He arrived. \"Tired\"", QuoteStyle::Primary);
        assert_eq!(
            texts(&parts),
            vec![
                ("He arrived.".to_string(), false),
                ("Tired.".to_string(), true),
            ]
        );
    }

    #[test]
    fn test_primary_trailing_quote_after_open_clause_is_narrative() {
        let parts = split("He said \"come here\"", QuoteStyle::Primary);
        assert_eq!(
            texts(&parts),
            vec![
                ("He said".to_string(), false),
                ("come here".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_primary_lone_quote_is_closed() {
        let parts = split("\"come here\"", QuoteStyle::Primary);
        assert_eq!(texts(&parts), vec![("come here.".to_string(), true)]);
    }

    #[test]
    fn test_primary_keeps_interior_apostrophes() {
        let parts = split(
            "\"Ah! you'd want to take a thing or two with you,\" he retorted.",
            QuoteStyle::Primary,
        );
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].text(), "Ah! you'd want to take a thing or two with you,");
        assert!(parts[0].is_direct());
    }

    #[test]
    fn test_secondary_requires_clause_break_context() {
        // "said " before the quote is not a clause break, so nothing matches.
        let parts = split("He said 'No, sir,' and left,", QuoteStyle::Secondary);
        assert_eq!(parts.len(), 1);
        assert!(!parts[0].is_direct());
    }

    #[test]
    fn test_secondary_after_colon() {
        let parts = split(
            "Then he shouted: 'Come here, Jim!' and waved,",
            QuoteStyle::Secondary,
        );
        assert_eq!(
            texts(&parts),
            vec![
                ("Then he shouted:".to_string(), false),
                ("Come here, Jim!".to_string(), true),
                ("and waved,".to_string(), false),
            ]
        );
        assert_eq!(parts[1].quoted_text(), "'Come here, Jim!'");
    }

    #[test]
    fn test_secondary_at_input_start() {
        let parts = split("'Hold on,' cried Jim.", QuoteStyle::Secondary);
        assert_eq!(
            texts(&parts),
            vec![
                ("Hold on,".to_string(), true),
                ("cried Jim.".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_secondary_word_internal_apostrophe_stays_inside() {
        let parts = split("'I don't know,' he said.", QuoteStyle::Secondary);
        assert_eq!(
            texts(&parts),
            vec![
                ("I don't know,".to_string(), true),
                ("he said.".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_secondary_trailing_merge_into_unpunctuated_clause() {
        // The gap between the spans carries no word character, so the clause
        // before the trailing quote has no punctuation of its own.
        let parts = split("'Go!', 'run.'", QuoteStyle::Secondary);
        assert_eq!(
            texts(&parts),
            vec![
                ("Go!".to_string(), true),
                (", run.".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_empty_input_yields_no_parts() {
        assert!(split("", QuoteStyle::Primary).is_empty());
        assert!(split("   ", QuoteStyle::Primary).is_empty());
    }
}
