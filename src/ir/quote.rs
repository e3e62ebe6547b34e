//! Quoted-speech detection for attribution.
//!
//! The coref adapter supplies quotes with speakers when available; this
//! scanner is the built-in fallback. It pairs straight and curly quote
//! marks and attributes a speaker from "said X" / "X said" frames near
//! the quote, noting thought verbs separately.

use std::sync::LazyLock;

use regex::Regex;

use crate::segment::Sentence;

/// A detected quotation with an optional speaker surface.
#[derive(Debug, Clone)]
pub struct DetectedQuote {
    /// Character offset of the opening quote mark.
    pub start: usize,
    /// Character offset one past the closing quote mark.
    pub end: usize,
    /// Speaker surface form, when an attribution frame was found.
    pub speaker_surface: Option<String>,
    /// The attribution verb marked thought rather than speech.
    pub is_thought: bool,
    pub sentence_index: usize,
}

const SPEECH_VERBS: &str =
    "said|asked|replied|answered|shouted|whispered|cried|muttered|called|snapped|added|began";
const THOUGHT_VERBS: &str = "thought|mused|wondered|reflected|recalled";

/// `" ... " said Barty` (verb before name).
static TRAILING_VERB_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^[\s,]*(?P<verb>{SPEECH_VERBS}|{THOUGHT_VERBS})\s+(?P<name>[A-Z][\w'\u{{2019}}.-]*(?:\s+[A-Z][\w'\u{{2019}}.-]*)*)"
    ))
    .expect("trailing attribution pattern")
});

/// `" ... " Barty said` (name before verb).
static TRAILING_NAME_VERB: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^[\s,]*(?P<name>[A-Z][\w'\u{{2019}}.-]*(?:\s+[A-Z][\w'\u{{2019}}.-]*)*)\s+(?P<verb>{SPEECH_VERBS}|{THOUGHT_VERBS})"
    ))
    .expect("trailing name-verb pattern")
});

/// `Barty said, " ... "` (frame before the quote).
static LEADING_FRAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?P<name>[A-Z][\w'\u{{2019}}.-]*(?:\s+[A-Z][\w'\u{{2019}}.-]*)*)\s+(?P<verb>{SPEECH_VERBS}|{THOUGHT_VERBS})[,:]?\s*$"
    ))
    .expect("leading attribution pattern")
});

fn is_open_quote(c: char) -> bool {
    c == '"' || c == '\u{201C}'
}

fn is_close_quote(c: char, opener: char) -> bool {
    match opener {
        '"' => c == '"',
        '\u{201C}' => c == '\u{201D}',
        _ => false,
    }
}

/// Scan the document for quotations and their speakers.
pub fn scan_quotes(text: &str, sentences: &[Sentence]) -> Vec<DetectedQuote> {
    let chars: Vec<char> = text.chars().collect();
    let mut quotes = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        if !is_open_quote(chars[i]) {
            i += 1;
            continue;
        }
        let opener = chars[i];
        let start = i;
        let mut j = i + 1;
        while j < chars.len() && !is_close_quote(chars[j], opener) {
            j += 1;
        }
        if j >= chars.len() {
            break; // unbalanced; stop scanning
        }
        let end = j + 1;

        let after: String = chars[end..chars.len().min(end + 60)].iter().collect();
        let before_start = start.saturating_sub(60);
        let before: String = chars[before_start..start].iter().collect();

        let (speaker_surface, is_thought) = attribute(&after, &before);
        let sentence_index = sentences
            .iter()
            .position(|s| s.start <= start && start < s.end)
            .unwrap_or(0);

        quotes.push(DetectedQuote {
            start,
            end,
            speaker_surface,
            is_thought,
            sentence_index,
        });
        i = end;
    }
    quotes
}

fn attribute(after: &str, before: &str) -> (Option<String>, bool) {
    for pattern in [&*TRAILING_VERB_NAME, &*TRAILING_NAME_VERB] {
        if let Some(captures) = pattern.captures(after) {
            let thought = THOUGHT_VERBS
                .split('|')
                .any(|v| v == &captures["verb"]);
            return (Some(captures["name"].to_string()), thought);
        }
    }
    if let Some(captures) = LEADING_FRAME.captures(before) {
        let thought = THOUGHT_VERBS
            .split('|')
            .any(|v| v == &captures["verb"]);
        return (Some(captures["name"].to_string()), thought);
    }
    (None, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::segment;

    #[test]
    fn trailing_said_name() {
        let text = "\"Leave the gate open,\" said Barty with a shrug.";
        let quotes = scan_quotes(text, &segment(text));
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].speaker_surface.as_deref(), Some("Barty"));
        assert!(!quotes[0].is_thought);
    }

    #[test]
    fn leading_frame_name_said() {
        let text = "Preston said, \"Nobody followed us here tonight.\"";
        let quotes = scan_quotes(text, &segment(text));
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].speaker_surface.as_deref(), Some("Preston"));
    }

    #[test]
    fn curly_quotes_pair_up() {
        let text = "\u{201C}It is late,\u{201D} Wren whispered into the dark.";
        let quotes = scan_quotes(text, &segment(text));
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].speaker_surface.as_deref(), Some("Wren"));
    }

    #[test]
    fn thought_verb_marks_thought() {
        let text = "\"They will never find it,\" thought Barty as he walked.";
        let quotes = scan_quotes(text, &segment(text));
        assert_eq!(quotes.len(), 1);
        assert!(quotes[0].is_thought);
    }

    #[test]
    fn unattributed_quote_has_no_speaker() {
        let text = "\"Run while you still can.\" The door slammed shut behind them.";
        let quotes = scan_quotes(text, &segment(text));
        assert_eq!(quotes.len(), 1);
        assert!(quotes[0].speaker_surface.is_none());
    }
}
