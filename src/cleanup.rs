//! Mechanical cleanup of raw Gutenberg book text before reconstruction:
//! whitespace and smart-quote normalization, bracketed-annotation removal,
//! em-dash and double-hyphen repair, parenthesis removal.
//!
//! The rewrite rules run in a fixed order; each one names the shape it fixes
//! next to its pattern. Substitutions are non-overlapping left-to-right.

use anyhow::Result;
use regex::{Captures, Regex};

use crate::sentence_part::is_word_char;

const EM_DASH: char = '\u{2014}';

/// Book-text cleaner with all rewrite patterns compiled once.
pub struct BookCleaner {
    multi_space: Regex,
    line_join: Regex,
    bracket_lead: Regex,
    bracket_trail: Regex,
    bracket_mid: Regex,
    em_dash_rules: Vec<(Regex, &'static str)>,
    double_hyphen_rules: Vec<(Regex, &'static str)>,
    paren_rules: Vec<(Regex, &'static str)>,
}

impl BookCleaner {
    pub fn new() -> Result<Self> {
        let em = EM_DASH;

        let em_dash_rules = compile_rules(vec![
            // and—oh => and, oh
            (format!(r"(\w)[^\S\r\n]*{em}[^\S\r\n]*(\w)"), "${1}, ${2}"),
            // to—", said => to," said
            (
                format!(r"(\w){em}([^\w\s,.:;?!()]{{1,2}})([,.:;?!]+)([^\S\r\n]\w)"),
                "${1}${3}${2}${4}",
            ),
            // mean—" continued => mean," continued
            // little—'" and => little,'" and
            (format!(r"(\w){em}([^\w\s,.:;?!()]{{1,2}}[^\S\r\n]\w)"), "${1},${2}"),
            // know—" => know"
            (format!(r"(\w){em}([^\w\s,.:;?!()]{{1,2}}(\s|$))"), "${1}${2}"),
            // 'Henrietta'—" resumed => 'Henrietta,'" resumed
            (
                format!(r"(\w)([^\w\s,.:;?!()]){em}([^\w\s,.:;?!()][^\S\r\n]\w)"),
                "${1},${2}${3}",
            ),
            // But!—" cried => But!" cried
            (format!(r"(\w[,.:;?!]+){em}([^\w\s,.:;?!()]{{1,2}}(\s|$))"), "${1}${2}"),
            // you.—Come => you. Come
            (format!(r"(\w[,.:;?!]+){em}(\w)"), "${1} ${2}"),
            // this:— => this:
            (format!(r"(\w[,.:;?!]+){em}(\s|$)"), "${1}${2}"),
            // "—change => "change
            (format!(r"((\s|^)[^\w\s,.:;?!()]{{1,2}}){em}(\w)"), "${1}${3}"),
            // along—"Catch => along, "Catch
            (format!(r"(\w){em}([^\w\s,.:;?!()]{{1,2}}\w)"), "${1}, ${2}"),
            // the dash is between words, but not before punctuation
            (format!(r"(\w[^\w\r\n]*){em}([^\w,.:;?!\r\n]*\w)"), "${1} ${2}"),
        ])?;

        let dh = r"(?:--){1,2}";
        let double_hyphen_rules = compile_rules(vec![
            // and--well => and, well
            (format!(r"(\w)[^\S\r\n\-]*{dh}[^\S\r\n\-]*(\w)"), "${1}, ${2}"),
            // but--" he => but," he
            (format!(r"(\w){dh}([^\w\s,.:;?!()\-]{{1,2}}[^\S\r\n]\w)"), "${1},${2}"),
            // that--" => that"
            (format!(r"(\w){dh}([^\w\s,.:;?!()\-]{{1,2}}(\s|$))"), "${1}${2}"),
            // oh!--" => oh!"
            (
                format!(r"(\w[,.:;?!]+){dh}([^\w\s,.:;?!()\-]{{1,2}}(\s|$))"),
                "${1}${2}",
            ),
            // etc.--but => etc. but
            (format!(r"(\w[,.:;?!]+){dh}(\w)"), "${1} ${2}"),
            // said:-- => said:
            (format!(r"(\w[,.:;?!]+){dh}(\s|$)"), "${1}${2}"),
            // "--not => "not
            (format!(r"((\s|^)[^\w\s,.:;?!()\-]{{1,2}}){dh}(\w)"), "${1}${3}"),
            // commented--"and => commented, "and
            (format!(r"(\w){dh}([^\w\s,.:;?!()\-]{{1,2}}\w)"), "${1}, ${2}"),
            // the dash is between words, but not before punctuation
            (format!(r"(\w[^\w\r\n\-]*){dh}([^\w,.:;?!\r\n\-]*\w)"), "${1} ${2}"),
            // in all other cases, remove the separator
            (format!(r"([^\-]|^){dh}([^\-]|$)"), "${1}${2}"),
        ])?;

        let paren_rules = compile_rules(vec![
            // (Beginning => Beginning
            (r"(^|\n\s*\n)(\W*)\(".to_string(), "${1}${2}"),
            // ending) => ending
            (r"\)(\W*)($|\n\s*\n)".to_string(), "${1}${2}"),
            // mind (as => mind, as
            (r"(\w)([^\S\n]+)\(([^\w\s,.:;?!()]{0,2}\w)".to_string(), "${1},${2}${3}"),
            // prepare) your => prepare, your
            (r"(\w)\)([^\S\n]+\w)".to_string(), "${1},${2}"),
            // think" (for => think," for
            (
                r#"(\w)([^\w\s,.:;?!()]{1,2}[^\S\n]+)\(([^\w\s,.:;?!()]{0,2}\w)"#.to_string(),
                "${1},${2}${3}",
            ),
            // over) "yes => over, "yes
            (r"(\w)\)([^\S\n]+[^\w\s,.:;?!()]{1,2}\w)".to_string(), "${1},${2}"),
            // it?), and => it? and
            (
                r"(\w[,.:;?!]+[^\w\s,.:;?!()]{0,2})\)[,.:;?!]+([^\S\n]+\w)".to_string(),
                "${1}${2}",
            ),
            // it), and => it, and
            (r"\)([^\w\s()]*[^\S\n]+)".to_string(), "${1}"),
            // wig, (look => wig, look
            (r"([^\S\n]+[^\w\s()]*)\(".to_string(), "${1}"),
            // remove the rest of the parentheses, replacing them with a space
            (r"[()]+".to_string(), " "),
        ])?;

        Ok(Self {
            multi_space: Regex::new(r"[^\S\n]+")?,
            line_join: Regex::new(r"(\S)[^\S\n]*\n[^\S\n]*(\S)")?,
            bracket_lead: Regex::new(r"^\s*\[[^\[\]\n]*\]\s*")?,
            bracket_trail: Regex::new(r"\s*\[[^\[\]\n]*\]\s*$")?,
            bracket_mid: Regex::new(r"([^\S\n]*)\[[^\[\]\n]*\]([^\S\n]*)")?,
            em_dash_rules,
            double_hyphen_rules,
            paren_rules,
        })
    }

    /// Whitespace, smart-quote, underscore and bracket normalization.
    pub fn prepare_prelim(&self, text: &str) -> String {
        let text = self.multi_space.replace_all(text, " ");
        let text = self.line_join.replace_all(&text, "${1} ${2}");

        let text = text.replace('_', "");

        // Smart quotation marks to their ASCII forms
        let text = text
            .replace('\u{2018}', "'")
            .replace('\u{2019}', "'")
            .replace('\u{201C}', "\"")
            .replace('\u{201D}', "\"");

        // Bracketed transcriber annotations
        let text = self.bracket_lead.replace_all(&text, "");
        let text = self.bracket_trail.replace_all(&text, "");
        let text = self.bracket_mid.replace_all(&text, |caps: &Captures<'_>| {
            if caps[1].is_empty() && caps[2].is_empty() {
                String::new()
            } else {
                " ".to_string()
            }
        });

        self.multi_space.replace_all(&text, " ").into_owned()
    }

    /// Repair the `U+2014 EM DASH` character.
    pub fn replace_em_dash(&self, text: &str) -> String {
        let text = collapse_stutter(text, "\u{2014}");
        let text = apply_rules(&self.em_dash_rules, &text);
        text.replace(EM_DASH, "")
    }

    /// Repair the double hyphen separator (`--`).
    pub fn replace_double_hyphen(&self, text: &str) -> String {
        let text = collapse_stutter(text, "--");
        apply_rules(&self.double_hyphen_rules, &text)
    }

    /// Remove parentheses, keeping the clause structure readable.
    pub fn remove_parentheses(&self, text: &str) -> String {
        apply_rules(&self.paren_rules, text)
    }

    /// The full cleanup pass in source order.
    pub fn prepare_book_text(&self, text: &str) -> String {
        let text = self.prepare_prelim(text);
        let text = self.replace_em_dash(&text);
        let text = self.replace_double_hyphen(&text);
        self.remove_parentheses(&text)
    }
}

fn compile_rules(rules: Vec<(String, &'static str)>) -> Result<Vec<(Regex, &'static str)>> {
    rules
        .into_iter()
        .map(|(pattern, replacement)| Ok((Regex::new(&pattern)?, replacement)))
        .collect()
}

fn apply_rules(rules: &[(Regex, &'static str)], text: &str) -> String {
    let mut text = text.to_string();
    for (pattern, replacement) in rules {
        text = pattern.replace_all(&text, *replacement).into_owned();
    }
    text
}

/// Collapse separator-stuttered letters: `eve—e—e—ening` becomes `evening`,
/// `Anita—a` becomes `Anita`, `H--hup!` becomes `Hup!`.
///
/// Runs of three or more case-insensitively equal word characters joined by
/// the separator collapse anywhere; runs of exactly two collapse only against
/// a word boundary on either side.
fn collapse_stutter(text: &str, sep: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let sep_chars: Vec<char> = sep.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if !is_word_char(c) {
            out.push(c);
            i += 1;
            continue;
        }

        // Gather the stuttered run starting here.
        let mut letters = vec![c];
        let mut j = i + 1;
        loop {
            if chars.get(j..j + sep_chars.len()) != Some(sep_chars.as_slice()) {
                break;
            }
            match chars.get(j + sep_chars.len()) {
                Some(&d) if is_word_char(d) && eq_ignore_case(c, d) => {
                    letters.push(d);
                    j = j + sep_chars.len() + 1;
                }
                _ => break,
            }
        }

        let n = letters.len();
        if n >= 3 {
            out.push(letters[n - 3]);
            i = j;
        } else if n == 2 {
            let word_after = chars.get(j).is_some_and(|&d| is_word_char(d));
            let word_before = i > 0 && is_word_char(chars[i - 1]);
            if !word_after || !word_before {
                out.push(letters[0]);
                i = j;
            } else {
                out.push(c);
                i += 1;
            }
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

fn eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}
