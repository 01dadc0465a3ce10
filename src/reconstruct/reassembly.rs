use crate::sentence_part::SentencePart;

/// Decide whether the direct part at `idx` is really a quotation — a quoted
/// phrase embedded in narration — rather than a spoken line.
///
/// In
///
/// ```text
/// "Ah! you'd want to take a thing or two with you," retorted "The Blue
/// Posts," "if you was a-going to cross the Atlantic in a small boat."
/// ```
///
/// the span `"The Blue Posts,"` is a quotation while the outer two spans are
/// genuine speech. The forward scan reads the fixed list by index and never
/// mutates it.
pub(crate) fn is_quotation_part(parts: &[SentencePart<'_>], idx: usize, ds_open: bool) -> bool {
    if idx < 1 {
        return false;
    }
    let part = &parts[idx];
    let prev = &parts[idx - 1];
    if !part.is_direct() || prev.punct().is_some() || prev.is_direct() {
        return false;
    }
    if !ds_open {
        return true;
    }
    for later in &parts[idx + 1..] {
        if later.is_direct() {
            return true;
        }
        if !later.opened() || later.is_multi_sentence() {
            break;
        }
    }
    false
}

/// Single left-to-right pass that reorders the parts so that direct speech is
/// separated as little as possible and attribution clauses become their own
/// sentences.
///
/// The pass works over the fixed vector by index: `out` accumulates finalized
/// part indices, `deferred` holds back non-direct parts that may still belong
/// to an open speech span, and `prev` tracks the last finalized part for
/// closing and joining decisions.
pub(crate) fn reassemble_parts<'t>(parts: Vec<SentencePart<'t>>) -> Vec<SentencePart<'t>> {
    debug_assert!(!parts.is_empty(), "empty part sequence reached the reconstructor");

    let mut parts = parts;
    let mut out: Vec<usize> = Vec::with_capacity(parts.len());
    let mut deferred: Vec<usize> = Vec::new();
    let mut ds_open = false;
    let mut prev: Option<usize> = None;

    for idx in 0..parts.len() {
        // A direct part that turns out to be a quotation goes back to its
        // quoted form and is treated as narration from here on.
        if is_quotation_part(&parts, idx, ds_open) {
            let part = &mut parts[idx];
            let quoted = part.quoted_text().to_string();
            part.text = quoted;
            part.direct = false;
        }

        // Consecutive non-direct parts collapse into one.
        if let Some(p) = prev {
            if !parts[p].is_direct() && !parts[idx].is_direct() {
                let tail = std::mem::take(&mut parts[idx].text);
                parts[p].text.push(' ');
                parts[p].text.push_str(&tail);
                continue;
            }
        }

        if parts[idx].is_direct() && prev.is_some() && !ds_open {
            if let Some(p) = prev {
                parts[p].close();
            }
            parts[idx].capitalize();
        }

        if !parts[idx].opened() {
            ds_open = false;
            if parts[idx].is_direct() {
                out.push(idx);
                if let Some(&held) = deferred.last() {
                    parts[held].close();
                    out.append(&mut deferred);
                }
            } else {
                // A closed narrative part ends any dangling speech before it.
                if let Some(p) = prev {
                    if parts[p].opened() {
                        parts[p].close();
                    }
                }
                deferred.push(idx);
                out.append(&mut deferred);
            }
        } else if parts[idx].is_direct() {
            ds_open = true;
            out.push(idx);
        } else if ds_open {
            if parts[idx].is_multi_sentence() {
                // More than one sentence cannot be the attribution of the open
                // speech span: emit everything and close the span.
                parts[idx].capitalize();
                out.append(&mut deferred);
                out.push(idx);
                ds_open = false;
                if let Some(p) = prev {
                    parts[p].close();
                }
            } else {
                deferred.push(idx);
            }
        } else {
            out.append(&mut deferred);
            out.push(idx);
        }

        prev = Some(idx);
    }

    out.append(&mut deferred);

    let mut slots: Vec<Option<SentencePart<'t>>> = parts.into_iter().map(Some).collect();
    out.into_iter().filter_map(|i| slots[i].take()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sent_tokenize::RegexSentenceTokenizer;
    use std::sync::OnceLock;

    static TOKENIZER: OnceLock<RegexSentenceTokenizer> = OnceLock::new();

    fn tokenizer() -> &'static RegexSentenceTokenizer {
        TOKENIZER.get_or_init(|| RegexSentenceTokenizer::new().unwrap())
    }

    fn narration(text: &str) -> SentencePart<'static> {
        SentencePart::new(text, false, tokenizer())
    }

    fn speech(text: &str) -> SentencePart<'static> {
        SentencePart::quoted(text, format!("\"{text}\""), tokenizer())
    }

    #[test]
    fn test_first_part_is_never_a_quotation() {
        let parts = vec![speech("Yes,"), narration("said Alice.")];
        assert!(!is_quotation_part(&parts, 0, false));
    }

    #[test]
    fn test_quotation_inside_closed_narration() {
        // "Bob called it" has no trailing punctuation and no speech is open.
        let parts = vec![narration("Bob called it"), speech("The Blue Posts,"), narration("and left.")];
        assert!(is_quotation_part(&parts, 1, false));
    }

    #[test]
    fn test_not_a_quotation_after_punctuated_clause() {
        let parts = vec![narration("said Alice,"), speech("we learned French and music.")];
        assert!(!is_quotation_part(&parts, 1, false));
    }

    #[test]
    fn test_open_speech_scan_finds_later_direct() {
        let parts = vec![
            speech("Ah! you'd want to take a thing or two with you,"),
            narration("retorted"),
            speech("The Blue Posts,"),
            speech("if you was a-going to cross the Atlantic in a small boat."),
        ];
        assert!(is_quotation_part(&parts, 2, true));
    }

    #[test]
    fn test_open_speech_scan_stops_at_closed_part() {
        let parts = vec![
            speech("Wait,"),
            narration("said"),
            speech("The Camel,"),
            narration("then he left. The end came."),
        ];
        assert!(!is_quotation_part(&parts, 2, true));
    }

    #[test]
    fn test_open_speech_scan_stops_at_end_without_direct() {
        let parts = vec![speech("Wait,"), narration("said"), speech("The Camel,")];
        assert!(!is_quotation_part(&parts, 2, true));
    }

    fn joined(parts: Vec<SentencePart<'static>>) -> Vec<(String, bool)> {
        reassemble_parts(parts)
            .into_iter()
            .map(|p| (p.text.clone(), p.direct))
            .collect()
    }

    #[test]
    fn test_attribution_moves_after_speech() {
        let parts = vec![
            speech("Yes,"),
            narration("said Alice,"),
            speech("we learned French and music."),
        ];
        assert_eq!(
            joined(parts),
            vec![
                ("Yes,".to_string(), true),
                ("we learned French and music.".to_string(), true),
                ("said Alice.".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_closed_speech_then_narration() {
        let parts = vec![speech("What a day!"), narration("he exclaimed.")];
        assert_eq!(
            joined(parts),
            vec![
                ("What a day!".to_string(), true),
                ("he exclaimed.".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_consecutive_narration_merges() {
        let parts = vec![narration("Bob called it"), narration("and left.")];
        assert_eq!(
            joined(parts),
            vec![("Bob called it and left.".to_string(), false)]
        );
    }

    #[test]
    fn test_multi_sentence_attribution_closes_open_speech() {
        let parts = vec![
            speech("Go,"),
            narration("he said. The rain fell. Still they waited,"),
            speech("and then?"),
        ];
        assert_eq!(
            joined(parts),
            vec![
                ("Go.".to_string(), true),
                ("He said. The rain fell. Still they waited.".to_string(), false),
                ("And then?".to_string(), true),
            ]
        );
    }

    #[test]
    #[should_panic(expected = "empty part sequence")]
    #[cfg(debug_assertions)]
    fn test_empty_sequence_is_a_contract_violation() {
        reassemble_parts(Vec::new());
    }
}
