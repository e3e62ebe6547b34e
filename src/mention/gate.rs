//! The meaning gate: classifies mention candidates before clustering.
//!
//! Thirteen phases evaluated in order; the first matching reason wins. The
//! closed-class sets are fixed (see [`crate::wordlists`]); the gate adds no
//! heuristics beyond them. Preposition-led spans are rejected but may emit
//! an extracted NP object.

use serde::{Deserialize, Serialize};

use crate::wordlists;

use super::{CandidateSource, MentionCandidate};

/// Final classification of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GateVerdict {
    /// Not an entity reference at all; drop.
    NonEntity,
    /// A real reference but too weak to mint on its own; usable as context.
    ContextOnly,
    /// Qualifies for clustering and eventual minting.
    DurableCandidate,
}

/// The gate's decision for one candidate.
#[derive(Debug, Clone)]
pub struct GateDecision {
    pub verdict: GateVerdict,
    /// Machine-readable reason for non-durable verdicts.
    pub reason: Option<&'static str>,
    /// NP object extracted from a preposition-led span.
    pub extracted_np_object: Option<MentionCandidate>,
}

impl GateDecision {
    fn reject(reason: &'static str) -> Self {
        Self {
            verdict: GateVerdict::NonEntity,
            reason: Some(reason),
            extracted_np_object: None,
        }
    }

    fn context_only(reason: &'static str) -> Self {
        Self {
            verdict: GateVerdict::ContextOnly,
            reason: Some(reason),
            extracted_np_object: None,
        }
    }

    fn durable() -> Self {
        Self {
            verdict: GateVerdict::DurableCandidate,
            reason: None,
            extracted_np_object: None,
        }
    }
}

/// Classify one candidate. Phases run in order; first match wins.
pub fn evaluate(candidate: &MentionCandidate) -> GateDecision {
    let trimmed = candidate.text.trim();

    // Phase 1: trivial rejections.
    if trimmed.is_empty() {
        return GateDecision::reject("empty");
    }
    if trimmed.chars().count() < 2 {
        return GateDecision::reject("too_short");
    }
    if trimmed.chars().all(|c| c.is_ascii_digit() || c.is_whitespace()) {
        return GateDecision::reject("all_numeric");
    }

    let tokens = &candidate.tokens;
    let single = tokens.len() == 1;
    let first_lower = tokens
        .first()
        .map(|t| t.text.to_lowercase())
        .unwrap_or_default();

    // Phase 2: closed-class heads.
    if single {
        let w = first_lower.as_str();
        if wordlists::PRONOUNS.contains(w) {
            return GateDecision::reject("pronoun_only");
        }
        if wordlists::WH_WORDS.contains(w) {
            return GateDecision::reject("wh_word");
        }
        if wordlists::DISCOURSE_MARKERS.contains(w) {
            return GateDecision::reject("discourse_marker");
        }
        if wordlists::INTERJECTIONS.contains(w) {
            return GateDecision::reject("interjection");
        }
        if wordlists::MODALS.contains(w) {
            return GateDecision::reject("modal");
        }
        if wordlists::DETERMINERS.contains(w) {
            return GateDecision::reject("determiner");
        }
    }

    // Phase 3: verb-led spans. A participial form modifying a nominal head
    // is allowed through ("running water").
    if tokens.first().is_some_and(|t| t.pos == "VERB") {
        let participial = first_lower.ends_with("ing") || first_lower.ends_with("ed");
        let nominal_after = tokens.iter().skip(1).any(|t| t.is_nominal());
        if !(participial && nominal_after) {
            return GateDecision::reject("verb_led");
        }
    }

    // Phase 4: adverb-led spans.
    if tokens.first().is_some_and(|t| t.pos == "ADV") && !candidate.has_nominal() {
        return GateDecision::reject("adverb_led");
    }

    // Phase 5: conjunction-led or subordinator-led.
    if wordlists::COORDINATORS.contains(first_lower.as_str())
        || wordlists::SUBORDINATORS.contains(first_lower.as_str())
        || tokens
            .first()
            .is_some_and(|t| t.pos == "CCONJ" || t.pos == "SCONJ")
    {
        return GateDecision::reject("conjunction_led");
    }

    // Phase 6: preposition-led. Reject the PP but extract the NP object.
    if wordlists::PREPOSITIONS.contains(first_lower.as_str())
        || tokens.first().is_some_and(|t| t.pos == "ADP")
    {
        let mut decision = GateDecision::reject("preposition_led");
        decision.extracted_np_object = extract_np_object(candidate);
        return decision;
    }

    // Phase 7: all tokens closed-class.
    if tokens
        .iter()
        .all(|t| wordlists::is_closed_class(&t.text.to_lowercase()))
    {
        return GateDecision::reject("all_closed_class");
    }

    // Phase 8: single sentence-initial adjective.
    if single && candidate.sentence_initial && tokens[0].pos == "ADJ" {
        return GateDecision::reject("predicate_adjective");
    }

    // Phase 9: compound-fragment detection.
    if single && (tokens[0].dep == "compound" || candidate.compound_prefix) {
        return GateDecision::reject("compound_fragment");
    }

    // Phase 10: incomplete constituent.
    if !candidate.has_nominal() && !candidate.has_capitalized() {
        return GateDecision::reject("incomplete_constituent");
    }

    // Phase 11: all-lowercase non-nominal.
    let all_lowercase = !candidate.has_capitalized();
    if all_lowercase && !tokens.last().is_some_and(|t| t.is_nominal()) {
        return GateDecision::reject("lowercase_non_nominal");
    }

    // Phase 12: context-only verdicts.
    if single && candidate.ner.is_none() {
        let w = first_lower.as_str();
        if wordlists::ROLE_NOUNS.contains(w) {
            return GateDecision::context_only("bare_role_noun");
        }
        if candidate.sentence_initial
            && (all_lowercase || wordlists::PERSON_HEAD_BLOCKLIST.contains(w))
        {
            return GateDecision::context_only("weak_sentence_initial");
        }
    }
    if !single && all_lowercase && candidate.ner.is_none() {
        // Multi-token generic description ("a long journey home").
        return GateDecision::context_only("generic_theme");
    }

    // Phase 13: durable.
    GateDecision::durable()
}

/// Skip the preposition and leading determiners; emit the remainder when it
/// still has a nominal head.
fn extract_np_object(candidate: &MentionCandidate) -> Option<MentionCandidate> {
    let mut skip = 1; // the preposition itself
    while candidate
        .tokens
        .get(skip)
        .is_some_and(|t| wordlists::DETERMINERS.contains(t.text.to_lowercase().as_str()))
    {
        skip += 1;
    }
    let rest = &candidate.tokens[skip.min(candidate.tokens.len())..];
    if rest.is_empty() || !rest.iter().any(|t| t.is_nominal()) {
        return None;
    }
    let start = rest[0].start;
    let end = rest[rest.len() - 1].end;
    let offset = start - candidate.start;
    let text: String = candidate
        .text
        .chars()
        .skip(offset)
        .take(end - start)
        .collect();
    Some(MentionCandidate {
        text,
        start,
        end,
        sentence_index: candidate.sentence_index,
        tokens: rest.to_vec(),
        ner: candidate.ner.clone(),
        sentence_initial: false,
        compound_prefix: false,
        source: CandidateSource::ExtractedNp,
    })
}
