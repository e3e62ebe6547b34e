//! Domain lexicon for implicit relations.
//!
//! Kinship and role nouns in genitive appositives carry relations no verb
//! states outright: "Barty's father, Orin" or "Orin, Barty's father". The
//! lexicon maps each cue noun to a predicate and an argument direction.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::adapter::ParsedSentence;
use crate::ident::AtomicIdAllocator;
use crate::resolve::ResolverContext;

use super::families::NAME;
use super::{EvidenceSource, EvidenceSpan, ExtractionOutput, ExtractorKind, Relation};

/// Which way the cue points: `married_to(owner, other)` vs
/// `parent_of(other, owner)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// predicate(owner, other): "Barty's son Tom" -> parent_of(Barty, Tom).
    OwnerFirst,
    /// predicate(other, owner): "Barty's father Orin" -> parent_of(Orin, Barty).
    OtherFirst,
}

struct LexiconEntry {
    predicate: &'static str,
    direction: Direction,
    symmetric: bool,
}

static LEXICON: LazyLock<HashMap<&'static str, LexiconEntry>> = LazyLock::new(|| {
    let entry = |predicate, direction, symmetric| LexiconEntry {
        predicate,
        direction,
        symmetric,
    };
    [
        ("wife", entry("married_to", Direction::OwnerFirst, true)),
        ("husband", entry("married_to", Direction::OwnerFirst, true)),
        ("brother", entry("sibling_of", Direction::OwnerFirst, true)),
        ("sister", entry("sibling_of", Direction::OwnerFirst, true)),
        ("son", entry("parent_of", Direction::OwnerFirst, false)),
        ("daughter", entry("parent_of", Direction::OwnerFirst, false)),
        ("father", entry("parent_of", Direction::OtherFirst, false)),
        ("mother", entry("parent_of", Direction::OtherFirst, false)),
        ("grandfather", entry("grandparent_of", Direction::OtherFirst, false)),
        ("grandmother", entry("grandparent_of", Direction::OtherFirst, false)),
        ("grandson", entry("grandparent_of", Direction::OwnerFirst, false)),
        ("granddaughter", entry("grandparent_of", Direction::OwnerFirst, false)),
        ("friend", entry("friends_with", Direction::OwnerFirst, true)),
        ("ally", entry("allied_with", Direction::OwnerFirst, true)),
        ("rival", entry("rival_of", Direction::OwnerFirst, true)),
        ("enemy", entry("enemy_of", Direction::OwnerFirst, true)),
        ("teacher", entry("taught", Direction::OtherFirst, false)),
        ("mentor", entry("taught", Direction::OtherFirst, false)),
        ("servant", entry("serves", Direction::OtherFirst, false)),
        ("master", entry("serves", Direction::OwnerFirst, false)),
    ]
    .into_iter()
    .collect()
});

const LEXICAL_CONFIDENCE: f32 = 0.80;

/// `Owner's cue, Other` — genitive then appositive name.
static GENITIVE_FORWARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?P<owner>{NAME})[''\u{{2019}}]s\s+(?P<cue>[a-z]+),?\s+(?P<other>{NAME})"
    ))
    .expect("genitive forward pattern")
});

/// `Other, Owner's cue` — appositive name then genitive.
static GENITIVE_BACKWARD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?P<other>{NAME}),\s+(?P<owner>{NAME})[''\u{{2019}}]s\s+(?P<cue>[a-z]+)"
    ))
    .expect("genitive backward pattern")
});

/// Scan for genitive appositive cues and emit the mapped relations.
pub fn run(
    doc_id: &str,
    sentences: &[ParsedSentence],
    resolver: &ResolverContext<'_>,
    allocator: &AtomicIdAllocator,
    output: &mut ExtractionOutput,
) {
    for (sentence_index, sentence) in sentences.iter().enumerate() {
        for pattern in [&*GENITIVE_FORWARD, &*GENITIVE_BACKWARD] {
            for captures in pattern.captures_iter(&sentence.text) {
                let cue = &captures["cue"];
                let Some(entry) = LEXICON.get(cue) else {
                    continue;
                };
                let (Some(owner), Some(other)) = (
                    resolver.find_by_surface(&captures["owner"]),
                    resolver.find_by_surface(&captures["other"]),
                ) else {
                    continue;
                };
                if owner == other {
                    continue;
                }
                let (subj, obj) = match entry.direction {
                    Direction::OwnerFirst => (owner, other),
                    Direction::OtherFirst => (other, owner),
                };

                let evidence = vec![EvidenceSpan {
                    doc_id: doc_id.to_string(),
                    span: (sentence.start, sentence.end),
                    sentence_index,
                    source: EvidenceSource::Rule,
                }];
                output.relations.push(Relation {
                    id: allocator.next_relation(),
                    subj,
                    pred: entry.predicate.to_string(),
                    obj,
                    confidence: LEXICAL_CONFIDENCE,
                    evidence: evidence.clone(),
                    extractor: ExtractorKind::Lexical,
                });
                if entry.symmetric {
                    output.relations.push(Relation {
                        id: allocator.next_relation(),
                        subj: obj,
                        pred: entry.predicate.to_string(),
                        obj: subj,
                        confidence: LEXICAL_CONFIDENCE,
                        evidence,
                        extractor: ExtractorKind::Lexical,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_pattern_captures_genitive() {
        let captures = GENITIVE_FORWARD
            .captures("Barty's father, Orin Selwyn")
            .unwrap();
        assert_eq!(&captures["owner"], "Barty");
        assert_eq!(&captures["cue"], "father");
        assert_eq!(&captures["other"], "Orin Selwyn");
    }

    #[test]
    fn backward_pattern_captures_appositive() {
        let captures = GENITIVE_BACKWARD
            .captures("Orin, Barty's father")
            .unwrap();
        assert_eq!(&captures["other"], "Orin");
        assert_eq!(&captures["owner"], "Barty");
        assert_eq!(&captures["cue"], "father");
    }

    #[test]
    fn lexicon_directions() {
        assert_eq!(LEXICON.get("father").unwrap().direction, Direction::OtherFirst);
        assert_eq!(LEXICON.get("son").unwrap().direction, Direction::OwnerFirst);
        assert!(LEXICON.get("wife").unwrap().symmetric);
    }
}
