//! The three-pass assertion builder.
//!
//! Passes always run in the same order: attribution, modality, reference.
//! Each pass is deterministic; the reference pass applies its confidence
//! penalties exactly once (tracked by `compiler_pass`), so building an
//! already-built assertion is a fixed point.

use std::sync::LazyLock;

use regex::Regex;

use crate::config::ConfidenceTable;
use crate::ident::{AtomicIdAllocator, EntityId};
use crate::relation::{PendingArg, PendingAssertion, Relation};
use crate::resolve::ResolverContext;
use crate::resolve::pronoun::PronounSite;
use crate::wordlists;

use super::quote::DetectedQuote;
use super::{
    Assertion, AssertionArg, AssertionConfidence, Attribution, AttributionSource, Modality,
};

/// A quote with its speaker resolved to an entity.
#[derive(Debug, Clone)]
pub struct ResolvedQuote {
    pub start: usize,
    pub end: usize,
    pub speaker: Option<EntityId>,
    pub speaker_confidence: Option<f32>,
    pub is_thought: bool,
}

impl ResolvedQuote {
    /// Resolve detected quotes' speaker surfaces against the entity table.
    pub fn from_detected(
        quotes: &[DetectedQuote],
        resolver: &ResolverContext<'_>,
    ) -> Vec<Self> {
        quotes
            .iter()
            .map(|q| {
                let speaker = q
                    .speaker_surface
                    .as_deref()
                    .and_then(|s| resolver.find_by_surface(s));
                ResolvedQuote {
                    start: q.start,
                    end: q.end,
                    speaker,
                    speaker_confidence: speaker.map(|_| 0.85),
                    is_thought: q.is_thought,
                }
            })
            .collect()
    }
}

/// Pronouns the reference pass will try to resolve.
const RESOLVABLE_PRONOUNS: &[&str] = &["he", "him", "his", "she", "her", "hers", "it", "its"];

static BELIEF_CUES: LazyLock<Regex> = LazyLock::new(|| {
    word_cue(&[
        "believe", "believes", "believed", "think", "thinks", "thought", "assume", "assumes",
        "assumed", "suppose", "supposes", "supposed", "imagine", "imagines", "imagined",
        "suspect", "suspects", "suspected", "fear", "fears", "feared", "hope", "hopes", "hoped",
        "expect", "expects", "expected", "consider", "considers", "considered",
    ])
});

static NEGATION_WORD_CUES: LazyLock<Regex> = LazyLock::new(|| {
    word_cue(&[
        "not", "never", "neither", "nor", "denied", "denies", "refused", "refuses", "rejected",
        "rejects",
    ])
});

/// Multi-word and contraction negation cues, matched by substring.
const NEGATION_SUBSTRING_CUES: &[&str] = &["n't", "no longer", "by no means"];

static RUMOR_SUBSTRING_CUES: &[&str] = &[
    "rumored", "rumoured", "allegedly", "supposedly", "reportedly", "said to be",
    "it was said", "word spread", "whispers claimed",
];

static PLAN_SUBSTRING_CUES: &[&str] = &[
    "plans to", "planned to", "intends to", "intended to", "will ", "going to", "wants to",
    "wanted to", "wishes to", "wished to", "hopes to", "hoped to", "means to", "meant to",
];

fn word_cue(words: &[&str]) -> Regex {
    Regex::new(&format!(r"(?i)\b(?:{})\b", words.join("|"))).expect("cue pattern")
}

/// The assertion builder for one document.
pub struct AssertionBuilder<'a> {
    text_chars: Vec<char>,
    quotes: Vec<ResolvedQuote>,
    resolver: &'a ResolverContext<'a>,
    table: &'a ConfidenceTable,
}

impl<'a> AssertionBuilder<'a> {
    pub fn new(
        text: &str,
        quotes: Vec<ResolvedQuote>,
        resolver: &'a ResolverContext<'a>,
        table: &'a ConfidenceTable,
    ) -> Self {
        Self {
            text_chars: text.chars().collect(),
            quotes,
            resolver,
            table,
        }
    }

    /// Adapt extractor output into raw assertions.
    pub fn adapt(
        &self,
        relations: &[Relation],
        pending: &[PendingAssertion],
        allocator: &AtomicIdAllocator,
    ) -> Vec<Assertion> {
        let mut assertions = Vec::with_capacity(relations.len() + pending.len());
        for relation in relations {
            assertions.push(Assertion {
                id: allocator.next_assertion(),
                subject: AssertionArg::Entity(relation.subj),
                predicate: relation.pred.clone(),
                object: AssertionArg::Entity(relation.obj),
                evidence: relation.evidence.clone(),
                confidence: AssertionConfidence::uniform(relation.confidence),
                attribution: None,
                modality: None,
                compiler_pass: 0,
            });
        }
        for p in pending {
            assertions.push(Assertion {
                id: allocator.next_assertion(),
                subject: to_arg(&p.subject),
                predicate: p.predicate.clone(),
                object: to_arg(&p.object),
                evidence: p.evidence.clone(),
                confidence: AssertionConfidence::uniform(p.confidence),
                attribution: None,
                modality: None,
                compiler_pass: 0,
            });
        }
        assertions
    }

    /// Run the three passes over every assertion, in order.
    pub fn build(&self, assertions: &mut [Assertion]) {
        for assertion in assertions.iter_mut() {
            self.pass_attribution(assertion);
            self.pass_modality(assertion);
            self.pass_reference(assertion);
        }
    }

    // -- Pass A: attribution ------------------------------------------------

    fn pass_attribution(&self, assertion: &mut Assertion) {
        let attribution = match self.enclosing_quote(assertion) {
            Some(quote) => match quote.speaker {
                Some(speaker) => Attribution {
                    source: AttributionSource::Character,
                    character: Some(speaker),
                    reliability: quote.speaker_confidence.unwrap_or(0.8),
                    is_dialogue: !quote.is_thought,
                    is_thought: quote.is_thought,
                },
                None => Attribution {
                    source: AttributionSource::Character,
                    character: None,
                    reliability: self.table.unknown_speaker_reliability,
                    is_dialogue: !quote.is_thought,
                    is_thought: quote.is_thought,
                },
            },
            None => Attribution {
                source: AttributionSource::Narrator,
                character: None,
                reliability: self.table.narrator_reliability,
                is_dialogue: false,
                is_thought: false,
            },
        };
        assertion.attribution = Some(attribution);
        assertion.compiler_pass = assertion.compiler_pass.max(1);
    }

    fn enclosing_quote(&self, assertion: &Assertion) -> Option<&ResolvedQuote> {
        let (start, end) = assertion.evidence.first().map(|e| e.span)?;
        self.quotes
            .iter()
            .find(|q| q.start <= start && end <= q.end)
    }

    // -- Pass B: modality ---------------------------------------------------

    fn pass_modality(&self, assertion: &mut Assertion) {
        let text = self.evidence_text(assertion);
        let lower = text.to_lowercase();

        let modality = if assertion
            .attribution
            .as_ref()
            .is_some_and(|a| a.is_dialogue)
        {
            Modality::Claim
        } else if BELIEF_CUES.is_match(&text) {
            Modality::Belief
        } else if NEGATION_WORD_CUES.is_match(&text)
            || NEGATION_SUBSTRING_CUES.iter().any(|c| lower.contains(c))
        {
            Modality::Negated
        } else if RUMOR_SUBSTRING_CUES.iter().any(|c| lower.contains(c)) {
            Modality::Rumor
        } else if PLAN_SUBSTRING_CUES.iter().any(|c| lower.contains(c)) {
            Modality::Plan
        } else {
            Modality::Fact
        };
        assertion.modality = Some(modality);
        assertion.compiler_pass = assertion.compiler_pass.max(2);
    }

    fn evidence_text(&self, assertion: &Assertion) -> String {
        assertion
            .evidence
            .iter()
            .map(|e| {
                let (start, end) = e.span;
                let end = end.min(self.text_chars.len());
                if start >= end {
                    String::new()
                } else {
                    self.text_chars[start..end].iter().collect()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    // -- Pass C: reference resolution ---------------------------------------

    fn pass_reference(&self, assertion: &mut Assertion) {
        // The penalty side of this pass must apply exactly once.
        let first_run = assertion.compiler_pass < 3;
        let position = assertion
            .evidence
            .first()
            .map(|e| e.span.0)
            .unwrap_or(0);
        let sentence_index = assertion
            .evidence
            .first()
            .map(|e| e.sentence_index)
            .unwrap_or(0);

        for side in [true, false] {
            let arg = if side {
                assertion.subject.clone()
            } else {
                assertion.object.clone()
            };
            let AssertionArg::Surface(surface) = arg else {
                continue;
            };
            let lower = surface.trim().to_lowercase();

            if wordlists::GROUP_PLACEHOLDERS.contains(lower.as_str()) {
                if first_run {
                    assertion
                        .confidence
                        .reduce(self.table.group_placeholder_penalty);
                }
                continue;
            }

            if RESOLVABLE_PRONOUNS.contains(&lower.as_str()) {
                match self.resolver.resolve_pronoun(
                    &lower,
                    position,
                    sentence_index,
                    PronounSite::SentenceMid,
                ) {
                    Some((id, _)) => {
                        let resolved = AssertionArg::Entity(id);
                        if side {
                            assertion.subject = resolved;
                        } else {
                            assertion.object = resolved;
                        }
                    }
                    None => {
                        if first_run {
                            assertion
                                .confidence
                                .reduce(self.table.unresolved_pronoun_penalty);
                        }
                    }
                }
            } else if let Some(id) = self.resolver.find_by_surface(&surface) {
                let resolved = AssertionArg::Entity(id);
                if side {
                    assertion.subject = resolved;
                } else {
                    assertion.object = resolved;
                }
            } else if first_run {
                // Other unresolved surfaces degrade like placeholders.
                assertion
                    .confidence
                    .reduce(self.table.group_placeholder_penalty);
            }
        }
        assertion.compiler_pass = 3;
    }
}

fn to_arg(pending: &PendingArg) -> AssertionArg {
    match pending {
        PendingArg::Entity(id) => AssertionArg::Entity(*id),
        PendingArg::Surface(s) => AssertionArg::Surface(s.clone()),
        PendingArg::None => AssertionArg::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{FallbackParser, LexiconNerParser, ParserAdapter};
    use crate::config::ExtractionConfig;
    use crate::entity::cluster::MentionClusterer;
    use crate::entity::mint::mint_clusters;
    use crate::ident::RelationId;
    use crate::ir::quote;
    use crate::mention::{gate, generate_candidates};
    use crate::relation::{EvidenceSource, EvidenceSpan, ExtractorKind};
    use crate::resolve::gender;
    use crate::segment::segment;

    struct Fixture {
        text: String,
        entities: Vec<crate::entity::Entity>,
        spans: Vec<crate::entity::EntitySpan>,
        sentences: Vec<crate::adapter::ParsedSentence>,
        config: ExtractionConfig,
    }

    fn fixture(text: &str, ner: &[(&str, &str)]) -> Fixture {
        let parser = LexiconNerParser::new(
            FallbackParser,
            ner.iter().map(|&(a, b)| (a.to_string(), b.to_string())),
        );
        let sentences = parser.parse(text).unwrap();
        let mut clusterer = MentionClusterer::new();
        for candidate in generate_candidates(&sentences) {
            let decision = gate::evaluate(&candidate);
            clusterer.add(candidate, decision.verdict);
        }
        let batch = mint_clusters(
            clusterer.into_clusters(),
            &AtomicIdAllocator::new(),
            &Default::default(),
        );
        let mut entities = batch.entities;
        gender::infer_genders(&mut entities, text);
        Fixture {
            text: text.to_string(),
            entities,
            spans: batch.spans,
            sentences,
            config: ExtractionConfig::default(),
        }
    }

    fn evidence(fix: &Fixture, sentence_index: usize) -> Vec<EvidenceSpan> {
        let s = &fix.sentences[sentence_index];
        vec![EvidenceSpan {
            doc_id: "doc".into(),
            span: (s.start, s.end),
            sentence_index,
            source: EvidenceSource::Rule,
        }]
    }

    fn entity_id(fix: &Fixture, canonical: &str) -> EntityId {
        fix.entities
            .iter()
            .find(|e| e.canonical == canonical)
            .unwrap_or_else(|| panic!("no entity {canonical}"))
            .id
    }

    #[test]
    fn rumor_cue_sets_rumor_modality() {
        let fix = fixture(
            "It is rumored that Alice betrayed Bob.",
            &[("Alice", "PERSON"), ("Bob", "PERSON")],
        );
        let resolver = ResolverContext::new(
            &fix.entities,
            &fix.spans,
            &fix.sentences,
            &fix.text,
            &fix.config,
            None,
        );
        let builder =
            AssertionBuilder::new(&fix.text, vec![], &resolver, &fix.config.confidence);
        let allocator = AtomicIdAllocator::new();
        let relations = vec![Relation {
            id: RelationId::new(1).unwrap(),
            subj: entity_id(&fix, "Alice"),
            pred: "betrayed".into(),
            obj: entity_id(&fix, "Bob"),
            confidence: 0.85,
            evidence: evidence(&fix, 0),
            extractor: ExtractorKind::Regex,
        }];
        let mut assertions = builder.adapt(&relations, &[], &allocator);
        builder.build(&mut assertions);

        assert_eq!(assertions[0].modality, Some(Modality::Rumor));
        let attribution = assertions[0].attribution.as_ref().unwrap();
        assert_eq!(attribution.source, AttributionSource::Narrator);
    }

    #[test]
    fn dialogue_attribution_yields_claim() {
        let fix = fixture(
            "\"Barty attacked Wren,\" said Preston near the gate.",
            &[("Barty", "PERSON"), ("Wren", "PERSON"), ("Preston", "PERSON")],
        );
        let resolver = ResolverContext::new(
            &fix.entities,
            &fix.spans,
            &fix.sentences,
            &fix.text,
            &fix.config,
            None,
        );
        let detected = quote::scan_quotes(&fix.text, &segment(&fix.text));
        let quotes = ResolvedQuote::from_detected(&detected, &resolver);
        let builder = AssertionBuilder::new(&fix.text, quotes, &resolver, &fix.config.confidence);

        let quote_span = (0usize, fix.text.find(',').unwrap() + 2);
        let mut assertions = vec![Assertion {
            id: crate::ident::AssertionId::new(1).unwrap(),
            subject: AssertionArg::Entity(entity_id(&fix, "Barty")),
            predicate: "attacked".into(),
            object: AssertionArg::Entity(entity_id(&fix, "Wren")),
            evidence: vec![EvidenceSpan {
                doc_id: "doc".into(),
                span: quote_span,
                sentence_index: 0,
                source: EvidenceSource::Rule,
            }],
            confidence: AssertionConfidence::uniform(0.85),
            attribution: None,
            modality: None,
            compiler_pass: 0,
        }];
        builder.build(&mut assertions);

        let attribution = assertions[0].attribution.as_ref().unwrap();
        assert_eq!(attribution.source, AttributionSource::Character);
        assert_eq!(attribution.character, Some(entity_id(&fix, "Preston")));
        assert!(attribution.is_dialogue);
        assert_eq!(assertions[0].modality, Some(Modality::Claim));
    }

    #[test]
    fn unresolved_pronoun_degrades_confidence() {
        // No female antecedent exists: the only person is male via the
        // "Mr." title tier, so "she" stays unresolved.
        let fix = fixture(
            "Mr. Snape was the head of Slytherin. She was also the head of Ravenclaw.",
            &[("Snape", "PERSON")],
        );
        let resolver = ResolverContext::new(
            &fix.entities,
            &fix.spans,
            &fix.sentences,
            &fix.text,
            &fix.config,
            None,
        );
        let builder =
            AssertionBuilder::new(&fix.text, vec![], &resolver, &fix.config.confidence);
        let pending = vec![PendingAssertion {
            subject: PendingArg::Surface("She".into()),
            predicate: "leads".into(),
            object: PendingArg::Surface("Ravenclaw".into()),
            confidence: 0.85,
            evidence: evidence(&fix, 1),
        }];
        let allocator = AtomicIdAllocator::new();
        let mut assertions = builder.adapt(&[], &pending, &allocator);
        builder.build(&mut assertions);

        let assertion = &assertions[0];
        assert!(assertion.subject.is_surface(), "she must stay unresolved");
        // 0.85 - 0.2 (pronoun) - 0.3 (unresolved object surface) = 0.35.
        assert!((assertion.confidence.composite - 0.35).abs() < 1e-6);
    }

    #[test]
    fn group_placeholder_is_not_resolved() {
        let fix = fixture(
            "Barty waved at Wren. The family gathered in the hall.",
            &[("Barty", "PERSON"), ("Wren", "PERSON")],
        );
        let resolver = ResolverContext::new(
            &fix.entities,
            &fix.spans,
            &fix.sentences,
            &fix.text,
            &fix.config,
            None,
        );
        let builder =
            AssertionBuilder::new(&fix.text, vec![], &resolver, &fix.config.confidence);
        let pending = vec![PendingAssertion {
            subject: PendingArg::Surface("the family".into()),
            predicate: "met".into(),
            object: PendingArg::Entity(entity_id(&fix, "Barty")),
            confidence: 0.80,
            evidence: evidence(&fix, 1),
        }];
        let allocator = AtomicIdAllocator::new();
        let mut assertions = builder.adapt(&[], &pending, &allocator);
        builder.build(&mut assertions);

        assert!(assertions[0].subject.is_surface());
        assert!((assertions[0].confidence.semantic - 0.5).abs() < 1e-6);
    }

    #[test]
    fn build_is_idempotent() {
        let fix = fixture(
            "Barty met Wren at dusk. She never forgot it.",
            &[("Barty", "PERSON"), ("Wren", "PERSON")],
        );
        let resolver = ResolverContext::new(
            &fix.entities,
            &fix.spans,
            &fix.sentences,
            &fix.text,
            &fix.config,
            None,
        );
        let builder =
            AssertionBuilder::new(&fix.text, vec![], &resolver, &fix.config.confidence);
        let pending = vec![PendingAssertion {
            subject: PendingArg::Surface("someone".into()),
            predicate: "met".into(),
            object: PendingArg::Entity(entity_id(&fix, "Wren")),
            confidence: 0.80,
            evidence: evidence(&fix, 0),
        }];
        let allocator = AtomicIdAllocator::new();
        let mut assertions = builder.adapt(&[], &pending, &allocator);
        builder.build(&mut assertions);
        let once = assertions.clone();
        builder.build(&mut assertions);
        let twice = assertions;

        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.modality, b.modality);
            assert_eq!(a.attribution, b.attribution);
            assert_eq!(a.subject, b.subject);
            assert!((a.confidence.composite - b.confidence.composite).abs() < 1e-9);
        }
    }
}
