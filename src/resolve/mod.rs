//! Reference resolution.
//!
//! Owns a per-document context built from entities, entity spans, sentences,
//! and the raw text. Resolves pronouns (position-aware dispatch), bridges
//! titles to their holders, resolves definite descriptions by salience with
//! a no-guessing tie rule, and emits [`CorefLink`] records that downstream
//! passes consume as a black box.

pub mod gender;
pub mod nickname;
pub mod pronoun;
pub mod titles;

use serde::{Deserialize, Serialize};

use crate::adapter::{CorefMethod, CorefOutput, ParsedSentence};
use crate::config::ExtractionConfig;
use crate::entity::{Entity, EntitySpan, EntityType, MentionType};
use crate::ident::EntityId;
use crate::wordlists;

use pronoun::{PronounCase, PronounSite, constraint_for, distance_confidence, satisfies};
use titles::TitleBridge;

/// A resolved reference: mention surface to entity, with provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorefLink {
    pub mention_text: String,
    pub start: usize,
    pub end: usize,
    pub sentence_index: usize,
    pub entity_id: EntityId,
    pub confidence: f32,
    pub method: CorefMethod,
}

/// Collective phrases that resolve to a set of recent PERSON entities.
const COLLECTIVE_PHRASES: &[&str] = &[
    "the couple", "the pair", "each other", "both", "the two",
];

/// Per-document resolution context.
pub struct ResolverContext<'a> {
    entities: &'a [Entity],
    /// Minted spans sorted by start offset.
    spans: Vec<EntitySpan>,
    sentences: &'a [ParsedSentence],
    config: &'a ExtractionConfig,
    /// Title table, updated by pronoun reinforcement.
    pub titles: TitleBridge,
    /// Pre-built pronoun map from the external coref capability:
    /// `(lowercased surface, start, end, entity)`.
    pattern_map: Vec<(String, usize, usize, EntityId)>,
    /// Paragraph index per sentence.
    paragraph_of: Vec<usize>,
}

impl<'a> ResolverContext<'a> {
    /// Build the context. External coref links below the configured
    /// confidence floor are dropped; invalid ones were already sanitized.
    pub fn new(
        entities: &'a [Entity],
        spans: &[EntitySpan],
        sentences: &'a [ParsedSentence],
        text: &str,
        config: &'a ExtractionConfig,
        external: Option<&CorefOutput>,
    ) -> Self {
        let mut sorted = spans.to_vec();
        sorted.sort_by_key(|s| (s.start, s.end));
        let titles = TitleBridge::from_spans(&sorted);

        let breaks = paragraph_breaks(text);
        let paragraph_of = sentences
            .iter()
            .map(|s| breaks.iter().filter(|&&b| b < s.start).count())
            .collect();

        let mut pattern_map = Vec::new();
        if let Some(output) = external {
            for link in &output.links {
                if link.confidence < config.min_coref_confidence {
                    continue;
                }
                if let Some(id) = EntityId::new(link.entity_id) {
                    pattern_map.push((
                        link.mention.text.to_lowercase(),
                        link.mention.start,
                        link.mention.end,
                        id,
                    ));
                }
            }
        }

        Self {
            entities,
            spans: sorted,
            sentences,
            config,
            titles,
            pattern_map,
            paragraph_of,
        }
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Direct canonical/alias match, then nickname-aware full-name match.
    pub fn find_by_surface(&self, surface: &str) -> Option<EntityId> {
        let needle = surface.trim();
        if needle.is_empty() {
            return None;
        }
        let lower = needle.to_lowercase();
        for entity in self.entities {
            if entity.canonical.to_lowercase() == lower
                || entity.aliases.iter().any(|a| a.to_lowercase() == lower)
            {
                return Some(entity.id);
            }
        }
        for entity in self.entities {
            if nickname::are_full_names_equivalent(&entity.canonical, needle) {
                return Some(entity.id);
            }
        }
        None
    }

    /// Resolve one pronoun occurrence. Returns the antecedent and a
    /// confidence, or `None` when constraints eliminate every candidate.
    pub fn resolve_pronoun(
        &self,
        surface: &str,
        position: usize,
        sentence_index: usize,
        site: PronounSite,
    ) -> Option<(EntityId, f32)> {
        let constraint = constraint_for(surface)?;

        match site {
            PronounSite::PatternMatch => {
                // Exact-range hit is authoritative.
                let lower = surface.to_lowercase();
                if let Some((_, _, _, id)) = self
                    .pattern_map
                    .iter()
                    .find(|(p, start, _, _)| *p == lower && *start == position)
                {
                    return Some((*id, 0.9));
                }
                // Nearest entry within 50 characters.
                self.pattern_map
                    .iter()
                    .filter(|(p, start, _, _)| {
                        *p == lower && start.abs_diff(position) <= 50
                    })
                    .min_by_key(|(_, start, _, _)| start.abs_diff(position))
                    .map(|(_, _, _, id)| (*id, 0.75))
            }

            PronounSite::SentenceStart => {
                let prev = sentence_index.checked_sub(1)?;
                let cross_paragraph = self.paragraph_of.get(prev)
                    != self.paragraph_of.get(sentence_index);
                let (search_sentence, penalty) = if cross_paragraph {
                    // Topic position: the first sentence of the previous paragraph.
                    let target_para = *self.paragraph_of.get(prev)?;
                    let first = self
                        .paragraph_of
                        .iter()
                        .position(|&p| p == target_para)
                        .unwrap_or(prev);
                    (first, self.config.confidence.cross_paragraph_penalty)
                } else {
                    (prev, 0.0)
                };

                let found = if constraint.case == PronounCase::Possessive {
                    self.last_satisfying_before(position, &constraint)
                } else {
                    self.sentence_subject(search_sentence, &constraint)
                        .or_else(|| self.last_satisfying_before(position, &constraint))
                };
                found.map(|id| (id, (0.75 - penalty).max(0.0)))
            }

            PronounSite::SentenceMid | PronounSite::Possessive => {
                // An object pronoun is disjoint from its own clause's
                // subject, so the scan skips same-sentence antecedents.
                let exclude_sentence = (constraint.case == PronounCase::Object)
                    .then(|| self.sentences.get(sentence_index).map(|s| s.start))
                    .flatten();
                self.scan_before_excluding(position, &constraint, exclude_sentence)
            }
        }
    }

    /// Most-recent-first scan with gender/number/type filtering and
    /// distance-decayed confidence.
    fn scan_before(
        &self,
        position: usize,
        constraint: &pronoun::PronounConstraint,
    ) -> Option<(EntityId, f32)> {
        self.scan_before_excluding(position, constraint, None)
    }

    fn scan_before_excluding(
        &self,
        position: usize,
        constraint: &pronoun::PronounConstraint,
        exclude_from: Option<usize>,
    ) -> Option<(EntityId, f32)> {
        for span in self.spans.iter().rev() {
            if span.end > position {
                continue;
            }
            if exclude_from.is_some_and(|from| span.start >= from) {
                continue;
            }
            let Some(entity) = self.entity(span.entity_id) else {
                continue;
            };
            if satisfies(entity, constraint) {
                let distance = position - span.end;
                return Some((entity.id, distance_confidence(distance)));
            }
        }
        None
    }

    fn last_satisfying_before(
        &self,
        position: usize,
        constraint: &pronoun::PronounConstraint,
    ) -> Option<EntityId> {
        self.scan_before(position, constraint).map(|(id, _)| id)
    }

    /// The subject of a sentence: its first minted span's entity, provided
    /// it satisfies the constraint.
    fn sentence_subject(
        &self,
        sentence_index: usize,
        constraint: &pronoun::PronounConstraint,
    ) -> Option<EntityId> {
        let sentence = self.sentences.get(sentence_index)?;
        self.spans
            .iter()
            .find(|s| s.start >= sentence.start && s.end <= sentence.end)
            .and_then(|s| self.entity(s.entity_id))
            .filter(|e| satisfies(e, constraint))
            .map(|e| e.id)
    }

    /// Up to `k` distinct recent PERSON entities mentioned before `position`.
    pub fn resolve_plural(&self, position: usize, k: usize) -> Vec<EntityId> {
        let mut out = Vec::new();
        for span in self.spans.iter().rev() {
            if span.end > position {
                continue;
            }
            let Some(entity) = self.entity(span.entity_id) else {
                continue;
            };
            if entity.entity_type.effective() == EntityType::Person && !out.contains(&entity.id) {
                out.push(entity.id);
                if out.len() == k {
                    break;
                }
            }
        }
        out
    }

    /// Resolve a collective phrase ("the couple", "their", "each other") to
    /// a set of PERSON entities.
    pub fn resolve_collective(&self, phrase: &str, position: usize) -> Vec<EntityId> {
        let lower = phrase.trim().to_lowercase();
        if COLLECTIVE_PHRASES.contains(&lower.as_str())
            || matches!(lower.as_str(), "their" | "they" | "them")
        {
            self.resolve_plural(position, 2)
        } else {
            Vec::new()
        }
    }

    /// The most recent PLACE entity mentioned before `position`, for
    /// deictic objects ("there", "here").
    pub fn resolve_deictic_place(&self, position: usize) -> Option<EntityId> {
        for span in self.spans.iter().rev() {
            if span.end > position {
                continue;
            }
            let Some(entity) = self.entity(span.entity_id) else {
                continue;
            };
            if entity.entity_type.effective() == EntityType::Place {
                return Some(entity.id);
            }
        }
        None
    }

    /// Definite-description resolution: "the <role>" at `position`.
    ///
    /// Title bridging wins when the role is a remembered title; otherwise
    /// the most salient type-matching entity within the sentence lookback
    /// window. Returns `None` on a salience tie (no guessing).
    pub fn resolve_definite(
        &self,
        role: &str,
        position: usize,
        sentence_index: usize,
    ) -> Option<(EntityId, f32, CorefMethod)> {
        let lower = role.to_lowercase();
        if let Some(id) = self.titles.resolve(&lower, position) {
            return Some((id, 0.85, CorefMethod::Title));
        }
        if !wordlists::ROLE_NOUNS.contains(lower.as_str()) {
            return None;
        }

        let expected = role_type(&lower);
        let window_start = self
            .sentences
            .get(sentence_index.saturating_sub(self.config.max_sentence_lookback))
            .map(|s| s.start)
            .unwrap_or(0);

        // Salience per entity: sum of 1/(1 + distance/100) over its mentions
        // inside the window.
        let mut saliences: Vec<(EntityId, f32)> = Vec::new();
        for span in &self.spans {
            if span.end > position || span.start < window_start {
                continue;
            }
            let Some(entity) = self.entity(span.entity_id) else {
                continue;
            };
            let type_ok = entity.entity_type.effective() == expected
                || entity.entity_type == EntityType::Unknown;
            if !type_ok {
                continue;
            }
            let distance = position - span.end;
            let salience = 1.0 / (1.0 + distance as f32 / 100.0);
            match saliences.iter_mut().find(|(id, _)| *id == span.entity_id) {
                Some((_, s)) => *s += salience,
                None => saliences.push((span.entity_id, salience)),
            }
        }

        saliences.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        match saliences.as_slice() {
            [] => None,
            [(id, s)] => Some((*id, (0.6 + s * 0.2).min(0.9), CorefMethod::Nominal)),
            [(id, top), (_, second), ..] => {
                // Within the tie margin, refuse to guess.
                if second / top > 1.0 - self.config.salience.tie_margin {
                    None
                } else {
                    Some((*id, (0.6 + top * 0.2).min(0.9), CorefMethod::Nominal))
                }
            }
        }
    }

    /// Walk the document, resolving pronouns and definite descriptions.
    ///
    /// Returns the links plus pronoun spans for resolved references. Title
    /// bindings are reinforced as pronouns resolve.
    pub fn resolve_document(&mut self) -> (Vec<CorefLink>, Vec<EntitySpan>) {
        let mut links = Vec::new();
        let mut new_spans = Vec::new();

        let sentences = self.sentences;
        for (sentence_index, sentence) in sentences.iter().enumerate() {
            for (ti, token) in sentence.tokens.iter().enumerate() {
                let lower = token.text.to_lowercase();

                if let Some(constraint) = constraint_for(&lower) {
                    let site = if self
                        .pattern_map
                        .iter()
                        .any(|(p, start, _, _)| *p == lower && start.abs_diff(token.start) <= 50)
                    {
                        PronounSite::PatternMatch
                    } else if ti == 0 {
                        PronounSite::SentenceStart
                    } else if constraint.case == PronounCase::Possessive {
                        PronounSite::Possessive
                    } else {
                        PronounSite::SentenceMid
                    };

                    if constraint.plural && constraint.case == PronounCase::Possessive {
                        for id in self.resolve_plural(token.start, 2) {
                            links.push(CorefLink {
                                mention_text: token.text.clone(),
                                start: token.start,
                                end: token.end,
                                sentence_index,
                                entity_id: id,
                                confidence: 0.7,
                                method: CorefMethod::Pronoun,
                            });
                        }
                        continue;
                    }

                    if let Some((id, confidence)) =
                        self.resolve_pronoun(&lower, token.start, sentence_index, site)
                    {
                        self.titles.reinforce(id, token.start);
                        links.push(CorefLink {
                            mention_text: token.text.clone(),
                            start: token.start,
                            end: token.end,
                            sentence_index,
                            entity_id: id,
                            confidence,
                            method: CorefMethod::Pronoun,
                        });
                        new_spans.push(EntitySpan {
                            entity_id: id,
                            start: token.start,
                            end: token.end,
                            text: Some(token.text.clone()),
                            mention_type: Some(MentionType::Pronoun),
                            source: "resolver".into(),
                        });
                    }
                    continue;
                }

                // Definite description: "the <role>".
                if lower == "the" {
                    if let Some(next) = sentence.tokens.get(ti + 1) {
                        let role = next.text.to_lowercase();
                        if let Some((id, confidence, method)) =
                            self.resolve_definite(&role, token.start, sentence_index)
                        {
                            links.push(CorefLink {
                                mention_text: format!("the {role}"),
                                start: token.start,
                                end: next.end,
                                sentence_index,
                                entity_id: id,
                                confidence,
                                method,
                            });
                            new_spans.push(EntitySpan {
                                entity_id: id,
                                start: token.start,
                                end: next.end,
                                text: Some(format!("the {role}")),
                                mention_type: Some(MentionType::Nominal),
                                source: "resolver".into(),
                            });
                        }
                    }
                }
            }
        }

        (links, new_spans)
    }
}

/// Expected entity type for a role noun.
fn role_type(role: &str) -> EntityType {
    match role {
        "company" | "firm" | "school" => EntityType::Org,
        "village" | "town" | "city" | "castle" | "kingdom" => EntityType::Place,
        _ => EntityType::Person,
    }
}

/// Character offsets of paragraph breaks (`\n\n`, allowing interior spaces).
fn paragraph_breaks(text: &str) -> Vec<usize> {
    let chars: Vec<char> = text.chars().collect();
    let mut breaks = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '\n' {
            let mut j = i + 1;
            while j < chars.len() && matches!(chars[j], ' ' | '\t' | '\r') {
                j += 1;
            }
            if j < chars.len() && chars[j] == '\n' {
                breaks.push(i);
                i = j + 1;
                continue;
            }
        }
        i += 1;
    }
    breaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{FallbackParser, LexiconNerParser, ParserAdapter};
    use crate::config::ExtractionConfig;
    use crate::entity::cluster::MentionClusterer;
    use crate::entity::mint::{MintBatch, mint_clusters};
    use crate::ident::AtomicIdAllocator;
    use crate::mention::{gate, generate_candidates};

    struct Doc {
        entities: Vec<Entity>,
        spans: Vec<EntitySpan>,
        sentences: Vec<ParsedSentence>,
        text: String,
    }

    fn build(text: &str, ner: &[(&str, &str)]) -> Doc {
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
        let MintBatch { mut entities, spans } = mint_clusters(
            clusterer.into_clusters(),
            &AtomicIdAllocator::new(),
            &Default::default(),
        );
        gender::infer_genders(&mut entities, text);
        Doc {
            entities,
            spans,
            sentences,
            text: text.to_string(),
        }
    }

    #[test]
    fn mid_sentence_pronoun_resolves_to_recent_match() {
        let doc = build(
            "Barty crossed the square slowly. Preston watched him from the balcony.",
            &[("Barty", "PERSON"), ("Preston", "PERSON")],
        );
        let config = ExtractionConfig::default();
        let mut ctx = ResolverContext::new(
            &doc.entities,
            &doc.spans,
            &doc.sentences,
            &doc.text,
            &config,
            None,
        );
        let (links, _) = ctx.resolve_document();
        let him = links.iter().find(|l| l.mention_text == "him").expect("him link");
        let barty = doc.entities.iter().find(|e| e.canonical == "Barty").unwrap();
        assert_eq!(him.entity_id, barty.id);
    }

    #[test]
    fn gender_filter_rejects_mismatched_antecedent() {
        // "Crane" is outside the first-name lexicon; the male reading comes
        // from the "Mr." title tier during gender inference.
        let doc = build(
            "Mr. Crane led the class. She wrote on the board.",
            &[("Crane", "PERSON")],
        );
        let crane = doc
            .entities
            .iter()
            .find(|e| e.canonical.contains("Crane"))
            .expect("Crane minted");
        assert_eq!(crane.gender, crate::entity::Gender::Male);

        let config = ExtractionConfig::default();
        let ctx = ResolverContext::new(
            &doc.entities,
            &doc.spans,
            &doc.sentences,
            &doc.text,
            &config,
            None,
        );
        let she_pos = doc.text.find("She").unwrap();
        let resolved = ctx.resolve_pronoun("she", she_pos, 1, PronounSite::SentenceStart);
        assert!(
            resolved.is_none(),
            "she must not resolve to the titled male entity, got {resolved:?}"
        );
    }

    #[test]
    fn title_bridging_resolves_definite_description() {
        let doc = build(
            "President Biden spoke for an hour. The president then left.",
            &[("Biden", "PERSON")],
        );
        let config = ExtractionConfig::default();
        let mut ctx = ResolverContext::new(
            &doc.entities,
            &doc.spans,
            &doc.sentences,
            &doc.text,
            &config,
            None,
        );
        let (links, _) = ctx.resolve_document();
        let bridged = links
            .iter()
            .find(|l| l.mention_text == "the president")
            .expect("definite description link");
        assert_eq!(bridged.method, CorefMethod::Title);
        let biden = doc
            .entities
            .iter()
            .find(|e| e.canonical.contains("Biden"))
            .unwrap();
        assert_eq!(bridged.entity_id, biden.id);
    }

    #[test]
    fn collective_resolves_two_recent_persons() {
        let doc = build(
            "Aria and Elias married in the spring. The couple settled nearby.",
            &[("Aria", "PERSON"), ("Elias", "PERSON")],
        );
        let config = ExtractionConfig::default();
        let ctx = ResolverContext::new(
            &doc.entities,
            &doc.spans,
            &doc.sentences,
            &doc.text,
            &config,
            None,
        );
        let pos = doc.text.find("The couple").unwrap();
        let members = ctx.resolve_collective("the couple", pos);
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn pattern_match_exact_range_is_authoritative() {
        let doc = build(
            "Barty crossed the square. Preston waved at him warmly.",
            &[("Barty", "PERSON"), ("Preston", "PERSON")],
        );
        let config = ExtractionConfig::default();
        let preston = doc
            .entities
            .iter()
            .find(|e| e.canonical == "Preston")
            .unwrap();
        let him_pos = doc.text.find("him").unwrap();
        let external = CorefOutput {
            links: vec![crate::adapter::ExternalCorefLink {
                mention: crate::adapter::CorefMention {
                    text: "him".into(),
                    start: him_pos,
                    end: him_pos + 3,
                    sentence_index: 1,
                    mention_type: None,
                },
                entity_id: preston.id.get(),
                confidence: 0.95,
                method: CorefMethod::Pronoun,
            }],
            quotes: vec![],
        };
        let ctx = ResolverContext::new(
            &doc.entities,
            &doc.spans,
            &doc.sentences,
            &doc.text,
            &config,
            Some(&external),
        );
        let resolved = ctx
            .resolve_pronoun("him", him_pos, 1, PronounSite::PatternMatch)
            .expect("pattern match");
        assert_eq!(resolved.0, preston.id);
        assert!((resolved.1 - 0.9).abs() < 1e-6);
    }

    #[test]
    fn definite_description_tie_returns_unresolved() {
        let doc = build(
            "Barty and Preston entered the hall together. The captain smiled.",
            &[("Barty", "PERSON"), ("Preston", "PERSON")],
        );
        let config = ExtractionConfig::default();
        let ctx = ResolverContext::new(
            &doc.entities,
            &doc.spans,
            &doc.sentences,
            &doc.text,
            &config,
            None,
        );
        let pos = doc.text.find("The captain").unwrap();
        // Both persons sit at nearly equal salience: refuse to guess.
        let resolved = ctx.resolve_definite("captain", pos, 1);
        assert!(resolved.is_none(), "tie must stay unresolved, got {resolved:?}");
    }

    #[test]
    fn nickname_surface_lookup() {
        let doc = build(
            "James Hawkins sailed at dawn. James Hawkins never looked back.",
            &[("James", "PERSON"), ("Hawkins", "PERSON")],
        );
        let config = ExtractionConfig::default();
        let ctx = ResolverContext::new(
            &doc.entities,
            &doc.spans,
            &doc.sentences,
            &doc.text,
            &config,
            None,
        );
        let by_nick = ctx.find_by_surface("Jim Hawkins");
        assert!(by_nick.is_some(), "nickname-equivalent full name should match");
    }
}
