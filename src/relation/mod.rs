//! Relation extraction.
//!
//! Four extractors feed one stream: the pattern-family engine over
//! normalized text (whose subject grammar handles "X and Y" coordination
//! and whose passive cues pre-swap their capture groups), dependency-path
//! patterns, the domain lexicon for implicit relations, and coref-aware
//! narrative/possessive heuristics. Post-extraction guardrails prune
//! contradictory or type-clashing relations.

pub mod dep;
pub mod families;
pub mod guard;
pub mod lexicon;
pub mod narrative;
pub mod pattern;
pub mod vocabulary;

use serde::{Deserialize, Serialize};

use crate::adapter::ParsedSentence;
use crate::entity::EntityType;
use crate::ident::{AtomicIdAllocator, EntityId, RelationId};
use crate::resolve::ResolverContext;

/// Which layer produced an evidence span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EvidenceSource {
    Rule,
    Dep,
    Llm,
}

/// A pointer into the source text backing a relation or assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceSpan {
    pub doc_id: String,
    /// Character span `(start, end)`.
    pub span: (usize, usize),
    pub sentence_index: usize,
    pub source: EvidenceSource,
}

/// Which extractor emitted a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractorKind {
    Regex,
    Dep,
    Lexical,
    Narrative,
    Possessive,
}

/// A typed relation between two entities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub id: RelationId,
    pub subj: EntityId,
    pub pred: String,
    pub obj: EntityId,
    pub confidence: f32,
    pub evidence: Vec<EvidenceSpan>,
    pub extractor: ExtractorKind,
}

/// A request to retype a weakly-typed entity based on pattern type guards.
///
/// Patterns provide type evidence: an entity filling an ORG-guarded slot
/// with only a capitalization-grade type is retyped to the guard's type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeOverride {
    pub entity_id: EntityId,
    pub entity_type: EntityType,
}

/// An assertion argument that may still be an unresolved surface form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingArg {
    Entity(EntityId),
    Surface(String),
    None,
}

/// A pattern match whose subject or object did not resolve to an entity.
///
/// These never become relations; they flow into the assertion builder,
/// whose reference pass makes a final resolution attempt and degrades
/// confidence when it fails.
#[derive(Debug, Clone)]
pub struct PendingAssertion {
    pub subject: PendingArg,
    pub predicate: String,
    pub object: PendingArg,
    pub confidence: f32,
    pub evidence: Vec<EvidenceSpan>,
}

/// Combined output of the extractor stack.
#[derive(Debug, Default)]
pub struct ExtractionOutput {
    pub relations: Vec<Relation>,
    pub pending: Vec<PendingAssertion>,
    pub overrides: Vec<TypeOverride>,
}

/// Run every extractor over the document, then apply guardrails.
///
/// A failure in one pattern family never aborts its siblings; each family
/// is independent by construction (pure scans over the same inputs).
pub fn extract_relations(
    doc_id: &str,
    sentences: &[ParsedSentence],
    resolver: &ResolverContext<'_>,
    allocator: &AtomicIdAllocator,
) -> ExtractionOutput {
    let mut output = ExtractionOutput::default();

    pattern::run_families(doc_id, sentences, resolver, allocator, &mut output);
    dep::run(doc_id, sentences, resolver, allocator, &mut output);
    lexicon::run(doc_id, sentences, resolver, allocator, &mut output);
    narrative::run(doc_id, sentences, resolver, allocator, &mut output);

    guard::apply(&mut output.relations, resolver, sentences, &output.overrides);
    dedup(&mut output.relations);
    output
}

/// Deduplicate by `(pred, subj, obj)`, keeping the highest confidence.
pub fn dedup(relations: &mut Vec<Relation>) {
    relations.sort_by(|a, b| {
        (a.pred.as_str(), a.subj, a.obj)
            .cmp(&(b.pred.as_str(), b.subj, b.obj))
            .then(
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });
    relations.dedup_by(|a, b| a.pred == b.pred && a.subj == b.subj && a.obj == b.obj);
}
