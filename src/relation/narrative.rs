//! Narrative and possessive relation heuristics.
//!
//! The coreference-aware sibling of the lexicon: possessive pronouns in
//! kinship appositives ("his wife Maren") resolve through the pronoun
//! resolver, "each other" reciprocals expand over collective referents,
//! and coordinated subjects fan out. This is the richer of the two
//! narrative variants and the only one that ships.

use std::sync::LazyLock;

use regex::Regex;

use crate::adapter::ParsedSentence;
use crate::ident::{AtomicIdAllocator, EntityId};
use crate::resolve::ResolverContext;
use crate::resolve::pronoun::PronounSite;

use super::families::{NAME, NP};
use super::{EvidenceSource, EvidenceSpan, ExtractionOutput, ExtractorKind, Relation};

const NARRATIVE_CONFIDENCE: f32 = 0.80;

/// "his wife Maren" / "her brother, Tomas".
static PRONOUN_KIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?P<pronoun>[Hh]is|[Hh]er|[Tt]heir)\s+(?P<cue>wife|husband|brother|sister|son|daughter|mother|father|friend)\s*,?\s+(?P<name>{NAME})"
    ))
    .expect("pronoun kin pattern")
});

/// "They loved each other" / "Aria and Elias trusted each other".
static RECIPROCAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?P<subj>{NP})\s+(?P<verb>loved|hated|trusted|distrusted|feared|embraced)\s+(?:one\s+another|each\s+other)"
    ))
    .expect("reciprocal pattern")
});

/// Map a kinship cue seen after a possessive pronoun to a predicate and
/// direction. Returns `(predicate, owner_is_subject, symmetric)`.
fn kin_rule(cue: &str) -> Option<(&'static str, bool, bool)> {
    Some(match cue {
        "wife" | "husband" => ("married_to", true, true),
        "brother" | "sister" => ("sibling_of", true, true),
        "son" | "daughter" => ("parent_of", true, false),
        "mother" | "father" => ("parent_of", false, false),
        "friend" => ("friends_with", true, true),
        _ => return None,
    })
}

fn reciprocal_predicate(verb: &str) -> &'static str {
    match verb {
        "loved" => "loves",
        "hated" | "distrusted" => "enemy_of",
        "trusted" => "allied_with",
        "feared" => "fears",
        _ => "met",
    }
}

/// Run the narrative heuristics over every sentence.
pub fn run(
    doc_id: &str,
    sentences: &[ParsedSentence],
    resolver: &ResolverContext<'_>,
    allocator: &AtomicIdAllocator,
    output: &mut ExtractionOutput,
) {
    for (sentence_index, sentence) in sentences.iter().enumerate() {
        let evidence = |source| {
            vec![EvidenceSpan {
                doc_id: doc_id.to_string(),
                span: (sentence.start, sentence.end),
                sentence_index,
                source,
            }]
        };

        // Possessive-pronoun kinship appositives.
        for captures in PRONOUN_KIN.captures_iter(&sentence.text) {
            let pronoun = captures["pronoun"].to_lowercase();
            let Some((predicate, owner_first, symmetric)) = kin_rule(&captures["cue"]) else {
                continue;
            };
            let Some(other) = resolver.find_by_surface(&captures["name"]) else {
                continue;
            };
            let pos = sentence.start
                + sentence.text[..captures.get(0).unwrap().start()]
                    .chars()
                    .count();
            let Some((owner, _)) =
                resolver.resolve_pronoun(&pronoun, pos, sentence_index, PronounSite::SentenceMid)
            else {
                continue;
            };
            if owner == other {
                continue;
            }
            let (subj, obj) = if owner_first {
                (owner, other)
            } else {
                (other, owner)
            };
            push_pair(
                output,
                allocator,
                subj,
                obj,
                predicate,
                symmetric,
                evidence(EvidenceSource::Rule),
                ExtractorKind::Possessive,
            );
        }

        // Reciprocals over collective or coordinated subjects.
        for captures in RECIPROCAL.captures_iter(&sentence.text) {
            let subj_surface = &captures["subj"];
            let predicate = reciprocal_predicate(&captures["verb"]);
            let pos = sentence.start
                + sentence.text[..captures.get(0).unwrap().start()]
                    .chars()
                    .count();

            let members: Vec<EntityId> = if subj_surface.contains(" and ") {
                subj_surface
                    .split(" and ")
                    .filter_map(|part| resolver.find_by_surface(part.trim()))
                    .collect()
            } else {
                resolver.resolve_collective(subj_surface, pos)
            };
            if members.len() < 2 {
                continue;
            }
            for (i, &a) in members.iter().enumerate() {
                for &b in &members[i + 1..] {
                    push_pair(
                        output,
                        allocator,
                        a,
                        b,
                        predicate,
                        true,
                        evidence(EvidenceSource::Rule),
                        ExtractorKind::Narrative,
                    );
                }
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn push_pair(
    output: &mut ExtractionOutput,
    allocator: &AtomicIdAllocator,
    subj: EntityId,
    obj: EntityId,
    predicate: &str,
    symmetric: bool,
    evidence: Vec<EvidenceSpan>,
    extractor: ExtractorKind,
) {
    output.relations.push(Relation {
        id: allocator.next_relation(),
        subj,
        pred: predicate.to_string(),
        obj,
        confidence: NARRATIVE_CONFIDENCE,
        evidence: evidence.clone(),
        extractor,
    });
    if symmetric {
        output.relations.push(Relation {
            id: allocator.next_relation(),
            subj: obj,
            pred: predicate.to_string(),
            obj: subj,
            confidence: NARRATIVE_CONFIDENCE,
            evidence,
            extractor,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pronoun_kin_captures() {
        let captures = PRONOUN_KIN.captures("He arrived with his wife Maren.").unwrap();
        assert_eq!(&captures["pronoun"], "his");
        assert_eq!(&captures["cue"], "wife");
        assert_eq!(&captures["name"], "Maren");
    }

    #[test]
    fn reciprocal_captures_coordination() {
        let captures = RECIPROCAL
            .captures("Aria and Elias trusted each other.")
            .unwrap();
        assert_eq!(&captures["subj"], "Aria and Elias");
        assert_eq!(&captures["verb"], "trusted");
    }

    #[test]
    fn kin_rules_direction() {
        // "his father X": X is the parent.
        assert_eq!(kin_rule("father"), Some(("parent_of", false, false)));
        // "his son X": the owner is the parent.
        assert_eq!(kin_rule("son"), Some(("parent_of", true, false)));
    }
}
