//! Mention candidates: span generation from parsed sentences.
//!
//! Candidates come from three sources per sentence: NER spans, noun chunks,
//! and proper-noun runs. Each candidate lives for one sentence; the meaning
//! gate decides whether it becomes durable.

pub mod gate;

use serde::{Deserialize, Serialize};

use crate::adapter::{ParsedSentence, Token};

/// Where a candidate span came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateSource {
    Ner,
    NounChunk,
    ProperRun,
    /// NP object extracted from a preposition-led span by the gate.
    ExtractedNp,
}

/// One mention-candidate span within a sentence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MentionCandidate {
    /// Surface text of the span.
    pub text: String,
    /// Character offset of the span start in the document.
    pub start: usize,
    /// Character offset one past the span end.
    pub end: usize,
    /// Index of the containing sentence.
    pub sentence_index: usize,
    /// The tokens covered by the span.
    pub tokens: Vec<Token>,
    /// NER label covering the whole span, if any.
    pub ner: Option<String>,
    /// Whether the span starts at the first token of its sentence.
    pub sentence_initial: bool,
    /// Whether a capitalized word ends within 30 characters before the span,
    /// inside the same sentence, with only spaces or hyphens between.
    pub compound_prefix: bool,
    /// Which generator produced the span.
    pub source: CandidateSource,
}

impl MentionCandidate {
    /// The head token: the last nominal token, else the last token.
    pub fn head_token(&self) -> Option<&Token> {
        self.tokens
            .iter()
            .rev()
            .find(|t| t.is_nominal())
            .or_else(|| self.tokens.last())
    }

    /// Whether any covered token is nominal.
    pub fn has_nominal(&self) -> bool {
        self.tokens.iter().any(Token::is_nominal)
    }

    /// Whether any covered token is capitalized.
    pub fn has_capitalized(&self) -> bool {
        self.tokens.iter().any(Token::is_capitalized)
    }
}

/// Generate candidates for every sentence, deduplicated by span.
pub fn generate_candidates(sentences: &[ParsedSentence]) -> Vec<MentionCandidate> {
    let mut candidates = Vec::new();
    for (index, sentence) in sentences.iter().enumerate() {
        ner_spans(sentence, index, &mut candidates);
        proper_noun_runs(sentence, index, &mut candidates);
        noun_chunks(sentence, index, &mut candidates);
    }
    dedup_by_span(candidates)
}

/// Contiguous tokens sharing a non-empty NER label.
fn ner_spans(sentence: &ParsedSentence, index: usize, out: &mut Vec<MentionCandidate>) {
    let tokens = &sentence.tokens;
    let mut i = 0;
    while i < tokens.len() {
        if tokens[i].ent.is_empty() {
            i += 1;
            continue;
        }
        let label = tokens[i].ent.clone();
        let run_start = i;
        while i < tokens.len() && tokens[i].ent == label {
            i += 1;
        }
        out.push(make_candidate(
            sentence,
            index,
            run_start,
            i,
            Some(label),
            CandidateSource::Ner,
        ));
    }
}

/// Maximal runs of proper nouns (and capitalized nominals).
fn proper_noun_runs(sentence: &ParsedSentence, index: usize, out: &mut Vec<MentionCandidate>) {
    let tokens = &sentence.tokens;
    let mut i = 0;
    while i < tokens.len() {
        let t = &tokens[i];
        let proper = t.pos == "PROPN" || (t.is_capitalized() && t.is_nominal());
        if !proper {
            i += 1;
            continue;
        }
        let run_start = i;
        while i < tokens.len() {
            let t = &tokens[i];
            if t.pos == "PROPN" || (t.is_capitalized() && t.is_nominal()) {
                i += 1;
            } else {
                break;
            }
        }
        out.push(make_candidate(
            sentence,
            index,
            run_start,
            i,
            None,
            CandidateSource::ProperRun,
        ));
    }
}

/// Determiner/adjective/noun runs ending in a nominal.
fn noun_chunks(sentence: &ParsedSentence, index: usize, out: &mut Vec<MentionCandidate>) {
    let tokens = &sentence.tokens;
    let chunkable =
        |t: &Token| matches!(t.pos.as_str(), "DET" | "ADJ" | "NOUN" | "PROPN" | "NUM");
    let mut i = 0;
    while i < tokens.len() {
        if !chunkable(&tokens[i]) {
            i += 1;
            continue;
        }
        let run_start = i;
        let mut last_nominal = None;
        while i < tokens.len() && chunkable(&tokens[i]) {
            if tokens[i].is_nominal() {
                last_nominal = Some(i);
            }
            i += 1;
        }
        if let Some(nominal_end) = last_nominal {
            out.push(make_candidate(
                sentence,
                index,
                run_start,
                nominal_end + 1,
                None,
                CandidateSource::NounChunk,
            ));
        }
    }
}

fn make_candidate(
    sentence: &ParsedSentence,
    index: usize,
    token_start: usize,
    token_end: usize,
    ner: Option<String>,
    source: CandidateSource,
) -> MentionCandidate {
    let tokens = sentence.tokens[token_start..token_end].to_vec();
    let start = tokens.first().map(|t| t.start).unwrap_or(sentence.start);
    let end = tokens.last().map(|t| t.end).unwrap_or(sentence.start);
    let rel_start = start - sentence.start;
    let rel_end = end - sentence.start;
    let text: String = sentence
        .text
        .chars()
        .skip(rel_start)
        .take(rel_end - rel_start)
        .collect();
    let compound_prefix = has_compound_prefix(sentence, token_start, start);
    MentionCandidate {
        text,
        start,
        end,
        sentence_index: index,
        sentence_initial: token_start == 0,
        compound_prefix,
        ner,
        tokens,
        source,
    }
}

/// A capitalized token ends within 30 characters before `span_start` in the
/// same sentence, separated only by spaces or hyphens.
fn has_compound_prefix(sentence: &ParsedSentence, token_start: usize, span_start: usize) -> bool {
    if token_start == 0 {
        return false;
    }
    let prev = &sentence.tokens[token_start - 1];
    if !prev.is_capitalized() || span_start.saturating_sub(prev.end) > 30 {
        return false;
    }
    let rel_gap_start = prev.end - sentence.start;
    let rel_gap_end = span_start - sentence.start;
    sentence
        .text
        .chars()
        .skip(rel_gap_start)
        .take(rel_gap_end - rel_gap_start)
        .all(|c| c == ' ' || c == '-')
}

/// Keep one candidate per `(start, end)`, preferring NER over other sources.
fn dedup_by_span(candidates: Vec<MentionCandidate>) -> Vec<MentionCandidate> {
    let mut kept: Vec<MentionCandidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if let Some(existing) = kept
            .iter_mut()
            .find(|c| c.start == candidate.start && c.end == candidate.end)
        {
            if existing.ner.is_none() && candidate.ner.is_some() {
                *existing = candidate;
            }
            continue;
        }
        kept.push(candidate);
    }
    kept.sort_by_key(|c| (c.start, c.end));
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{FallbackParser, ParserAdapter};

    fn parse(text: &str) -> Vec<ParsedSentence> {
        FallbackParser.parse(text).unwrap()
    }

    #[test]
    fn proper_runs_span_multiword_names() {
        let sentences = parse("They visited Meridian Ridge in the autumn season.");
        let candidates = generate_candidates(&sentences);
        assert!(
            candidates.iter().any(|c| c.text == "Meridian Ridge"),
            "expected a Meridian Ridge run, got {candidates:?}"
        );
    }

    #[test]
    fn ner_spans_win_dedup() {
        let mut sentences = parse("Harry waved at the crowd of strangers.");
        for token in &mut sentences[0].tokens {
            if token.text == "Harry" {
                token.ent = "PERSON".into();
                token.pos = "PROPN".into();
            }
        }
        let candidates = generate_candidates(&sentences);
        let harry = candidates.iter().find(|c| c.text == "Harry").unwrap();
        assert_eq!(harry.ner.as_deref(), Some("PERSON"));
    }

    #[test]
    fn sentence_initial_flag_set() {
        let sentences = parse("Preston saw the tall tower from afar yesterday.");
        let candidates = generate_candidates(&sentences);
        let preston = candidates.iter().find(|c| c.text == "Preston").unwrap();
        assert!(preston.sentence_initial);
    }

    #[test]
    fn compound_prefix_detected_within_sentence_only() {
        let sentences = parse("Barty waited outside. Preston saw the gate open.");
        let candidates = generate_candidates(&sentences);
        let preston = candidates.iter().find(|c| c.text == "Preston").unwrap();
        assert!(
            !preston.compound_prefix,
            "previous-sentence capital must not mark a compound prefix"
        );
    }

    #[test]
    fn head_token_is_last_nominal() {
        let sentences = parse("The old Meridian lighthouse keeper slept soundly that night.");
        let candidates = generate_candidates(&sentences);
        let chunk = candidates
            .iter()
            .find(|c| c.text.contains("keeper"))
            .unwrap();
        assert_eq!(chunk.head_token().unwrap().text, "keeper");
    }
}
