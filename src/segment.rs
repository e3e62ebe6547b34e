//! Rule-based sentence segmentation over Unicode text.
//!
//! Recognizes `.`, `!`, `?`, and ellipses as terminators while protecting
//! abbreviations, bare initials, and decimals. Closing quotes and brackets
//! are absorbed into the prior sentence, paragraph breaks force boundaries,
//! and orphan fragments are merged with a neighbor. Identical input yields
//! identical output.

use std::collections::HashSet;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

/// One segmented sentence. Offsets are character indices into the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sentence {
    /// Character offset of the first character.
    pub start: usize,
    /// Character offset one past the last character.
    pub end: usize,
    /// The sentence text, exactly `text[start..end]` in character terms.
    pub text: String,
}

/// Abbreviations whose trailing period never ends a sentence.
///
/// Stored lowercased, without the trailing period, with internal periods
/// kept (`u.s`, `ph.d`).
static ABBREVIATIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        // Titles
        "mr", "mrs", "ms", "dr", "prof", "rev", "hon", "gen", "sen", "rep", "sgt", "capt", "lt",
        "col", "cmdr", "gov", "pres", "fr", "br",
        // Geographic
        "st", "mt", "ave", "blvd", "rd", "hwy",
        // Academic
        "ph.d", "m.d", "b.a", "m.a", "b.s", "m.s", "d.d.s", "j.d", "esq",
        // Calendar
        "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "sept", "oct", "nov", "dec",
        "mon", "tue", "tues", "wed", "thu", "thur", "thurs", "fri", "sat", "sun",
        // Misc
        "u.s", "u.k", "u.s.a", "inc", "ltd", "co", "corp", "vs", "etc", "e.g", "i.e", "no",
        "vol", "fig", "dept", "est", "approx",
    ]
    .into_iter()
    .collect()
});

/// Lowercase words that may legitimately start a sentence.
static PERMISSIBLE_STARTERS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    ["the", "a", "an", "and", "but", "or", "so", "yet"]
        .into_iter()
        .collect()
});

/// Whether `word` (without its period) is a known abbreviation.
pub fn is_known_abbreviation(word: &str) -> bool {
    ABBREVIATIONS.contains(word.trim_end_matches('.').to_lowercase().as_str())
}

/// Quote marks and brackets absorbed into the prior sentence after a terminator.
const ABSORBED_TRAILERS: &[char] = &['"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}',
    '\u{00AB}', '\u{00BB}', ')', ']'];

/// Minimum sentence length in characters; shorter fragments merge with a neighbor.
const MIN_SENTENCE_CHARS: usize = 10;

/// Segment `text` into ordered sentences with character offsets.
///
/// Returns an empty vector for whitespace-only input.
pub fn segment(text: &str) -> Vec<Sentence> {
    let chars: Vec<char> = text.chars().collect();
    if chars.iter().all(|c| c.is_whitespace()) {
        return Vec::new();
    }

    let boundaries = find_boundaries(&chars);
    let mut sentences = build_sentences(&chars, &boundaries);
    merge_orphans(&chars, &mut sentences);
    sentences
}

/// Scan for boundary positions: each entry is the exclusive end index of a
/// sentence (after absorbed trailers).
fn find_boundaries(chars: &[char]) -> Vec<usize> {
    let mut boundaries = Vec::new();
    let len = chars.len();
    let mut i = 0;

    while i < len {
        let c = chars[i];

        // Paragraph break: a blank line always closes the current sentence.
        if c == '\n' && is_paragraph_break(chars, i) {
            push_boundary(&mut boundaries, i);
            i += 1;
            continue;
        }

        if c == '!' || c == '?' || c == '\u{2026}' {
            let mut end = i + 1;
            // Runs of terminal punctuation ("?!", "!!") collapse into one boundary.
            while end < len && matches!(chars[end], '!' | '?' | '\u{2026}') {
                end += 1;
            }
            end = absorb_trailers(chars, end);
            if continuation_permitted(chars, end) {
                push_boundary(&mut boundaries, end);
            }
            i = end;
            continue;
        }

        if c == '.' {
            // Ellipsis spelled as consecutive dots terminates at the last dot.
            let mut end = i + 1;
            while end < len && chars[end] == '.' {
                end += 1;
            }
            let is_ellipsis = end - i >= 3;

            if !is_ellipsis {
                if is_decimal_point(chars, i)
                    || is_initial(chars, i)
                    || is_abbreviation(chars, i)
                {
                    i += 1;
                    continue;
                }
            }

            end = absorb_trailers(chars, end);
            if continuation_permitted(chars, end) {
                push_boundary(&mut boundaries, end);
            }
            i = end;
            continue;
        }

        i += 1;
    }

    push_boundary(&mut boundaries, len);
    boundaries
}

fn push_boundary(boundaries: &mut Vec<usize>, end: usize) {
    if boundaries.last() != Some(&end) {
        boundaries.push(end);
    }
}

/// A newline followed (ignoring spaces and tabs) by another newline.
fn is_paragraph_break(chars: &[char], i: usize) -> bool {
    let mut j = i + 1;
    while j < chars.len() && matches!(chars[j], ' ' | '\t' | '\r') {
        j += 1;
    }
    j < chars.len() && chars[j] == '\n'
}

/// Period between two digits (`3.14`).
fn is_decimal_point(chars: &[char], i: usize) -> bool {
    i > 0
        && i + 1 < chars.len()
        && chars[i - 1].is_ascii_digit()
        && chars[i + 1].is_ascii_digit()
}

/// Period terminating a single capital letter preceded by whitespace or
/// start-of-text (`J.` in `J. K. Rowling`).
fn is_initial(chars: &[char], i: usize) -> bool {
    if i == 0 || !chars[i - 1].is_uppercase() {
        return false;
    }
    i == 1 || chars[i - 2].is_whitespace()
}

/// Period preceded by a known abbreviation.
fn is_abbreviation(chars: &[char], i: usize) -> bool {
    let mut start = i;
    while start > 0 {
        let prev = chars[start - 1];
        if prev.is_alphanumeric() || prev == '.' {
            start -= 1;
        } else {
            break;
        }
    }
    if start == i {
        return false;
    }
    let word: String = chars[start..i]
        .iter()
        .collect::<String>()
        .trim_start_matches('.')
        .to_lowercase();
    ABBREVIATIONS.contains(word.as_str())
}

/// Absorb closing quote marks and trailing brackets into the sentence.
fn absorb_trailers(chars: &[char], mut end: usize) -> usize {
    while end < chars.len() && ABSORBED_TRAILERS.contains(&chars[end]) {
        end += 1;
    }
    end
}

/// A boundary is rejected when the next non-space character begins a
/// lowercase word outside the permissible-starter whitelist.
fn continuation_permitted(chars: &[char], end: usize) -> bool {
    let mut j = end;
    while j < chars.len() && chars[j].is_whitespace() {
        j += 1;
    }
    if j >= chars.len() {
        return true;
    }
    if !chars[j].is_lowercase() {
        return true;
    }
    let mut word = String::new();
    while j < chars.len() && chars[j].is_alphabetic() {
        word.push(chars[j]);
        j += 1;
    }
    PERMISSIBLE_STARTERS.contains(word.as_str())
}

/// Build trimmed sentence records between consecutive boundaries.
fn build_sentences(chars: &[char], boundaries: &[usize]) -> Vec<Sentence> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for &end in boundaries {
        if let Some(sentence) = make_sentence(chars, start, end) {
            sentences.push(sentence);
        }
        start = end;
    }
    sentences
}

/// Trim surrounding whitespace from `[start, end)`; `None` if nothing remains.
fn make_sentence(chars: &[char], mut start: usize, mut end: usize) -> Option<Sentence> {
    while start < end && chars[start].is_whitespace() {
        start += 1;
    }
    while end > start && chars[end - 1].is_whitespace() {
        end -= 1;
    }
    if start >= end {
        return None;
    }
    Some(Sentence {
        start,
        end,
        text: chars[start..end].iter().collect(),
    })
}

/// Merge fragments shorter than [`MIN_SENTENCE_CHARS`] with the previous
/// sentence (or the next one, for a leading fragment).
fn merge_orphans(chars: &[char], sentences: &mut Vec<Sentence>) {
    let mut i = 0;
    while i < sentences.len() {
        if sentences.len() > 1 && sentences[i].end - sentences[i].start < MIN_SENTENCE_CHARS {
            if i > 0 {
                let end = sentences[i].end;
                let prev = &mut sentences[i - 1];
                prev.end = end;
                prev.text = chars[prev.start..end].iter().collect();
                sentences.remove(i);
            } else {
                let start = sentences[0].start;
                let next = &mut sentences[1];
                next.start = start;
                next.text = chars[start..next.end].iter().collect();
                sentences.remove(0);
            }
        } else {
            i += 1;
        }
    }
}
