//! The per-document extraction pipeline.
//!
//! Stages run top-down over a shared document context: segmentation and
//! parsing, mention gating, clustering, deferred minting, gender inference,
//! reference resolution, relation extraction, the assertion builder, and
//! event/fact materialization. Every extraction returns a result object
//! (possibly with zero entities and a reason) rather than erroring, unless
//! the caller opted into strict mode.

pub mod chunk;

use serde::{Deserialize, Serialize};

use crate::adapter::{
    self, CorefAdapter, FallbackParser, ParsedSentence, ParserAdapter,
};
use crate::cancel::CancelToken;
use crate::config::ExtractionConfig;
use crate::entity::cluster::MentionClusterer;
use crate::entity::mint::{MintBatch, mint_clusters};
use crate::entity::normalize::normalize_surface;
use crate::entity::{Entity, EntitySpan};
use crate::error::{FabulaError, FabulaResult, PipelineError};
use crate::ident::AtomicIdAllocator;
use crate::ir::assertion::{AssertionBuilder, ResolvedQuote};
use crate::ir::{Assertion, Fact, StoryEvent, event, fact, quote};
use crate::mention::{gate, generate_candidates};
use crate::relation::{self, Relation};
use crate::resolve::{CorefLink, ResolverContext, gender};
use crate::segment::Sentence;
use crate::wordlists;

/// Counters and flags describing one extraction run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub sentences: usize,
    pub mention_candidates: usize,
    pub durable_mentions: usize,
    pub entities: usize,
    pub relations: usize,
    pub assertions: usize,
    pub events: usize,
    /// The external parser was unavailable and the fallback tokenizer ran.
    pub degraded_parser: bool,
    /// Extraction stopped early on a cancellation signal.
    pub cancelled: bool,
}

/// Everything extracted from one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub doc_id: String,
    pub entities: Vec<Entity>,
    pub spans: Vec<EntitySpan>,
    pub relations: Vec<Relation>,
    pub coref_links: Vec<CorefLink>,
    pub assertions: Vec<Assertion>,
    pub events: Vec<StoryEvent>,
    pub facts: Vec<Fact>,
    pub stats: ExtractionStats,
    /// Why the result is empty or partial, when it is.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ExtractionResult {
    fn empty(doc_id: &str, reason: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.to_string(),
            reason: Some(reason.into()),
            ..Default::default()
        }
    }
}

/// The per-document pipeline driver.
pub struct DocumentPipeline<'a> {
    config: &'a ExtractionConfig,
    parser: Option<&'a dyn ParserAdapter>,
    coref: Option<&'a dyn CorefAdapter>,
}

impl<'a> DocumentPipeline<'a> {
    pub fn new(config: &'a ExtractionConfig) -> Self {
        Self {
            config,
            parser: None,
            coref: None,
        }
    }

    /// Wire an external parser.
    pub fn with_parser(mut self, parser: &'a dyn ParserAdapter) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Wire an external coreference capability.
    pub fn with_coref(mut self, coref: &'a dyn CorefAdapter) -> Self {
        self.coref = Some(coref);
        self
    }

    /// Extract one document. `base_order` seeds event ordering for corpus
    /// runs (documents are ordered by their sequence number).
    pub fn extract(
        &self,
        doc_id: &str,
        text: &str,
        cancel: &CancelToken,
        base_order: u64,
    ) -> FabulaResult<ExtractionResult> {
        if text.trim().is_empty() {
            if self.config.strict {
                return Err(PipelineError::InvalidInput {
                    reason: "empty document text".into(),
                }
                .into());
            }
            return Ok(ExtractionResult::empty(doc_id, "empty document text"));
        }

        let mut stats = ExtractionStats::default();

        // Stage 1-2: segmentation and parsing.
        let sentences = match self.parse(text, &mut stats) {
            Ok(sentences) => sentences,
            Err(e) => {
                if self.config.strict || self.config.baseline_required {
                    return Err(e);
                }
                return Ok(ExtractionResult::empty(doc_id, e.to_string()));
            }
        };
        stats.sentences = sentences.len();
        tracing::debug!(doc_id, sentences = sentences.len(), "segmented and parsed");

        // Stage 3-6: candidates, gate, clustering.
        let mut clusterer = MentionClusterer::new();
        let mut pending_candidates = generate_candidates(&sentences);
        stats.mention_candidates = pending_candidates.len();
        let mut current_sentence = usize::MAX;
        for candidate in pending_candidates.drain(..) {
            if candidate.sentence_index != current_sentence {
                current_sentence = candidate.sentence_index;
                if cancel.is_cancelled() {
                    stats.cancelled = true;
                    break;
                }
            }
            let decision = gate::evaluate(&candidate);
            if decision.verdict == gate::GateVerdict::DurableCandidate {
                stats.durable_mentions += 1;
            }
            let key = normalize_surface(&candidate.text).base.to_lowercase();
            let window = context_window(&sentences, &candidate);
            let determiner = determiner_before(&sentences, &candidate);
            if let Some(np) = decision.extracted_np_object {
                let np_decision = gate::evaluate(&np);
                clusterer.add(np, np_decision.verdict);
            }
            clusterer.add(candidate, decision.verdict);
            clusterer.add_context(&key, &window);
            if determiner {
                clusterer.mark_determiner(&key);
            }
        }

        // Stage 7: deferred minting (the single atomic batch).
        let allocator = AtomicIdAllocator::new();
        let MintBatch {
            mut entities,
            mut spans,
        } = mint_clusters(clusterer.into_clusters(), &allocator, &self.config.confidence);

        // Stage 8: gender inference feeds the resolver.
        gender::infer_genders(&mut entities, text);

        // External coref, when wired.
        let external = match self.coref {
            Some(adapter) => match adapter.coref(text) {
                Ok(output) => Some(adapter::sanitize_coref(text, output)),
                Err(e) => {
                    tracing::warn!(doc_id, error = %e, "coref adapter failed; continuing without");
                    None
                }
            },
            None => None,
        };

        if self.config.debug_identity {
            let report = crate::graph::identity::identity_report(&entities);
            tracing::debug!(doc_id, groups = report.groups.len(), "identity report");
        }

        if cancel.is_cancelled() {
            if self.config.strict {
                return Err(PipelineError::Cancelled {
                    completed: 0,
                    total: 1,
                }
                .into());
            }
            stats.cancelled = true;
            stats.entities = entities.len();
            return Ok(ExtractionResult {
                doc_id: doc_id.to_string(),
                entities,
                spans,
                stats,
                reason: Some("cancelled before reference resolution".into()),
                ..Default::default()
            });
        }

        // Stage 9: reference resolution and relation extraction share one
        // resolver over the minted entities.
        let (coref_links, resolver_spans, extraction) = {
            let mut resolver = ResolverContext::new(
                &entities,
                &spans,
                &sentences,
                text,
                self.config,
                external.as_ref(),
            );
            let (links, resolver_spans) = resolver.resolve_document();
            let extraction =
                relation::extract_relations(doc_id, &sentences, &resolver, &allocator);
            (links, resolver_spans, extraction)
        };
        spans.extend(resolver_spans);
        spans.sort_by_key(|s| (s.start, s.end));

        // Pattern type guards contributed typing evidence.
        for override_ in &extraction.overrides {
            if let Some(entity) = entities.iter_mut().find(|e| e.id == override_.entity_id) {
                entity.entity_type = override_.entity_type;
                entity.confidence = entity.confidence.max(0.7);
                entity.meta.type_signal = Some("pattern_guard".into());
            }
        }

        if cancel.is_cancelled() {
            stats.cancelled = true;
        }

        // Stage 10-11: assertions, events, facts over the final typing.
        let resolver = ResolverContext::new(
            &entities,
            &spans,
            &sentences,
            text,
            self.config,
            external.as_ref(),
        );
        let quotes = match &external {
            Some(output) if !output.quotes.is_empty() => output
                .quotes
                .iter()
                .map(|q| ResolvedQuote {
                    start: q.start,
                    end: q.end,
                    speaker: q.speaker_entity_id.and_then(crate::ident::EntityId::new),
                    speaker_confidence: Some(0.85),
                    is_thought: false,
                })
                .collect(),
            _ => {
                let plain: Vec<Sentence> = sentences
                    .iter()
                    .map(|s| Sentence {
                        start: s.start,
                        end: s.end,
                        text: s.text.clone(),
                    })
                    .collect();
                ResolvedQuote::from_detected(&quote::scan_quotes(text, &plain), &resolver)
            }
        };

        let builder = AssertionBuilder::new(text, quotes, &resolver, &self.config.confidence);
        let mut assertions =
            builder.adapt(&extraction.relations, &extraction.pending, &allocator);
        builder.build(&mut assertions);

        let events = event::build_events(&assertions, &allocator, base_order);
        let facts = fact::build_facts(&events);

        stats.entities = entities.len();
        stats.relations = extraction.relations.len();
        stats.assertions = assertions.len();
        stats.events = events.len();
        tracing::info!(
            doc_id,
            entities = stats.entities,
            relations = stats.relations,
            events = stats.events,
            "document extraction complete"
        );

        Ok(ExtractionResult {
            doc_id: doc_id.to_string(),
            entities,
            spans,
            relations: extraction.relations,
            coref_links,
            assertions,
            events,
            facts,
            stats,
            reason: None,
        })
    }

    fn parse(
        &self,
        text: &str,
        stats: &mut ExtractionStats,
    ) -> FabulaResult<Vec<ParsedSentence>> {
        let parsed = match self.parser {
            Some(parser) => match parser.parse(text) {
                Ok(parsed) => parsed,
                Err(e) => {
                    if self.config.baseline_required {
                        return Err(FabulaError::Adapter(e));
                    }
                    tracing::warn!(error = %e, "parser unavailable; using fallback tokenizer");
                    stats.degraded_parser = true;
                    FallbackParser.parse(text).map_err(FabulaError::Adapter)?
                }
            },
            None => {
                stats.degraded_parser = true;
                FallbackParser.parse(text).map_err(FabulaError::Adapter)?
            }
        };
        if let Err(e) = adapter::validate_sentences(text, &parsed) {
            if self.config.baseline_required {
                return Err(FabulaError::Adapter(e));
            }
            tracing::warn!(error = %e, "parser output malformed; using fallback tokenizer");
            stats.degraded_parser = true;
            return FallbackParser.parse(text).map_err(FabulaError::Adapter);
        }
        Ok(parsed)
    }
}

/// Lowercased words within the +-3 token window of a candidate.
fn context_window(
    sentences: &[ParsedSentence],
    candidate: &crate::mention::MentionCandidate,
) -> Vec<String> {
    let Some(sentence) = sentences.get(candidate.sentence_index) else {
        return Vec::new();
    };
    let first = candidate.tokens.first().map(|t| t.i).unwrap_or(0);
    let last = candidate.tokens.last().map(|t| t.i).unwrap_or(0);
    let from = first.saturating_sub(3);
    let to = (last + 4).min(sentence.tokens.len());
    sentence.tokens[from..to]
        .iter()
        .filter(|t| t.i < first || t.i > last)
        .map(|t| t.text.to_lowercase())
        .collect()
}

/// Whether a determiner directly precedes the candidate.
fn determiner_before(
    sentences: &[ParsedSentence],
    candidate: &crate::mention::MentionCandidate,
) -> bool {
    let Some(sentence) = sentences.get(candidate.sentence_index) else {
        return false;
    };
    let Some(first) = candidate.tokens.first() else {
        return false;
    };
    first.i > 0
        && sentence
            .tokens
            .get(first.i - 1)
            .is_some_and(|t| {
                t.pos == "DET" || wordlists::DETERMINERS.contains(t.text.to_lowercase().as_str())
            })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::LexiconNerParser;

    fn ner_parser(entries: &[(&str, &str)]) -> LexiconNerParser<FallbackParser> {
        LexiconNerParser::new(
            FallbackParser,
            entries.iter().map(|&(a, b)| (a.to_string(), b.to_string())),
        )
    }

    #[test]
    fn empty_text_returns_reason_not_error() {
        let config = ExtractionConfig::default();
        let pipeline = DocumentPipeline::new(&config);
        let result = pipeline
            .extract("doc", "   ", &CancelToken::new(), 0)
            .unwrap();
        assert!(result.entities.is_empty());
        assert!(result.reason.is_some());
    }

    #[test]
    fn empty_text_errors_in_strict_mode() {
        let config = ExtractionConfig {
            strict: true,
            ..Default::default()
        };
        let pipeline = DocumentPipeline::new(&config);
        assert!(
            pipeline
                .extract("doc", "", &CancelToken::new(), 0)
                .is_err()
        );
    }

    #[test]
    fn no_parser_marks_degraded() {
        let config = ExtractionConfig::default();
        let pipeline = DocumentPipeline::new(&config);
        let result = pipeline
            .extract(
                "doc",
                "Barty met Wren at the mill. Barty smiled at Wren warmly.",
                &CancelToken::new(),
                0,
            )
            .unwrap();
        assert!(result.stats.degraded_parser);
        assert!(result.stats.entities >= 2);
    }

    #[test]
    fn cancelled_token_yields_partial_result() {
        let config = ExtractionConfig::default();
        let pipeline = DocumentPipeline::new(&config);
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = pipeline
            .extract("doc", "Barty met Wren. Barty left early.", &cancel, 0)
            .unwrap();
        assert!(result.stats.cancelled);
        assert!(result.relations.is_empty());
    }

    #[test]
    fn full_pipeline_produces_relations_and_events() {
        let parser = ner_parser(&[
            ("Aria", "PERSON"),
            ("Elias", "PERSON"),
        ]);
        let config = ExtractionConfig::default();
        let pipeline = DocumentPipeline::new(&config).with_parser(&parser);
        let result = pipeline
            .extract(
                "doc",
                "Aria met Elias at the harbor. Aria traveled to Meridian Ridge.",
                &CancelToken::new(),
                0,
            )
            .unwrap();
        assert!(
            result.relations.iter().any(|r| r.pred == "met"),
            "expected a met relation, got {:?}",
            result.relations
        );
        assert!(
            result.events.iter().any(|e| e.predicate == "traveled_to"),
            "expected a MOVE event, got {:?}",
            result.events
        );
    }

    #[test]
    fn spans_respect_offset_integrity() {
        let parser = ner_parser(&[("Barty", "PERSON"), ("Preston", "PERSON")]);
        let config = ExtractionConfig::default();
        let pipeline = DocumentPipeline::new(&config).with_parser(&parser);
        let text = "Barty met Preston at the mill. He greeted him warmly.";
        let result = pipeline
            .extract("doc", text, &CancelToken::new(), 0)
            .unwrap();
        let len = text.chars().count();
        for span in &result.spans {
            assert!(span.is_valid(len), "invalid span {span:?}");
        }
    }
}
