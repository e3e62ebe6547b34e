//! The pattern-family matching engine.
//!
//! One matcher over the declarative catalog: normalizes sentence text,
//! resolves capture surfaces to entity sets (direct match, collective
//! coref, compound splitting, bounded pronoun resolution), applies type
//! guards with weak-type overrides, and emits relations with sentence-level
//! evidence. Symmetric predicates emit their mirror with identical evidence.

use std::sync::LazyLock;

use regex::Regex;

use crate::adapter::ParsedSentence;
use crate::entity::EntityType;
use crate::ident::{AtomicIdAllocator, EntityId};
use crate::resolve::ResolverContext;
use crate::resolve::pronoun::{PronounSite, constraint_for};

use crate::wordlists;

use super::families::{CATALOG, CompiledFamily, NAME};
use super::vocabulary::type_allowed;
use super::{
    EvidenceSource, EvidenceSpan, ExtractionOutput, ExtractorKind, PendingArg, PendingAssertion,
    Relation, TypeOverride,
};

/// Penalty applied to list- and salience-mediated matches.
const MEDIATED_PENALTY: f32 = 0.05;

static NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(NAME).expect("name subpattern"));

// Leading articles stay: the subject grammar consumes them ("The couple",
// "The president"), so only conjunctions are noise here.
static LEADING_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:And|But|Or|So|Yet|Then)\s+").expect("leading noise pattern")
});

/// Run every family over every sentence.
pub fn run_families(
    doc_id: &str,
    sentences: &[ParsedSentence],
    resolver: &ResolverContext<'_>,
    allocator: &AtomicIdAllocator,
    output: &mut ExtractionOutput,
) {
    for (sentence_index, sentence) in sentences.iter().enumerate() {
        let (normalized, stripped) = normalize_sentence(&sentence.text);
        for family in CATALOG.iter() {
            match_family(
                doc_id,
                family,
                sentence,
                sentence_index,
                &normalized,
                stripped,
                resolver,
                allocator,
                output,
            );
        }
    }
}

/// Strip a leading conjunction or article and collapse whitespace.
/// Returns the normalized text and the count of characters stripped.
fn normalize_sentence(text: &str) -> (String, usize) {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if let Some(m) = LEADING_NOISE.find(&collapsed) {
        let stripped = m.as_str().chars().count();
        (collapsed[m.end()..].to_string(), stripped)
    } else {
        (collapsed, 0)
    }
}

#[allow(clippy::too_many_arguments)]
fn match_family(
    doc_id: &str,
    family: &CompiledFamily,
    sentence: &ParsedSentence,
    sentence_index: usize,
    normalized: &str,
    stripped: usize,
    resolver: &ResolverContext<'_>,
    allocator: &AtomicIdAllocator,
    output: &mut ExtractionOutput,
) {
    for captures in family.regex.captures_iter(normalized) {
        let Some(subj_match) = captures.name("subj") else {
            continue;
        };
        let match_pos = sentence.start
            + stripped
            + normalized[..subj_match.start()].chars().count();

        let (subjects, subj_mediated) = resolve_np(
            subj_match.as_str(),
            match_pos,
            sentence_index,
            family.spec.subj_types,
            resolver,
            &mut output.overrides,
        );
        let evidence = vec![EvidenceSpan {
            doc_id: doc_id.to_string(),
            span: (sentence.start, sentence.end),
            sentence_index,
            source: EvidenceSource::Rule,
        }];

        if subjects.is_empty() {
            // A referring subject that failed to resolve still yields an
            // assertion; the builder's reference pass owns the final word.
            if is_referring_surface(subj_match.as_str()) {
                let object = captures
                    .name("obj")
                    .map(|m| match resolver.find_by_surface(m.as_str()) {
                        Some(id) => PendingArg::Entity(id),
                        None => PendingArg::Surface(m.as_str().to_string()),
                    })
                    .unwrap_or(PendingArg::None);
                output.pending.push(PendingAssertion {
                    subject: PendingArg::Surface(subj_match.as_str().to_string()),
                    predicate: family.spec.predicate.to_string(),
                    object,
                    confidence: family.spec.confidence,
                    evidence: evidence.clone(),
                });
            }
            continue;
        }

        let mut mediated = subj_mediated;
        let objects: Vec<EntityId> = if family.spec.list_extraction {
            mediated = true;
            list_items(normalized, captures.get(0).map(|m| m.end()).unwrap_or(0))
                .into_iter()
                .filter_map(|item| resolver.find_by_surface(&item))
                .filter(|id| {
                    admit(*id, family.spec.obj_types, resolver, &mut output.overrides)
                })
                .collect()
        } else if let Some(obj_match) = captures.name("obj") {
            let obj_surface = obj_match.as_str();
            if family.spec.deictic_obj
                && matches!(obj_surface.to_lowercase().as_str(), "there" | "here")
            {
                mediated = true;
                resolver
                    .resolve_deictic_place(match_pos)
                    .into_iter()
                    .collect()
            } else {
                let obj_pos = sentence.start
                    + stripped
                    + normalized[..obj_match.start()].chars().count();
                let (objs, obj_mediated) = resolve_np(
                    obj_surface,
                    obj_pos,
                    sentence_index,
                    family.spec.obj_types,
                    resolver,
                    &mut output.overrides,
                );
                mediated |= obj_mediated;
                objs
            }
        } else {
            Vec::new()
        };

        let confidence = if mediated {
            family.spec.confidence - MEDIATED_PENALTY
        } else {
            family.spec.confidence
        };

        let mut emit = |subj: EntityId, obj: EntityId| {
            if subj == obj {
                return;
            }
            output.relations.push(Relation {
                id: allocator.next_relation(),
                subj,
                pred: family.spec.predicate.to_string(),
                obj,
                confidence,
                evidence: evidence.clone(),
                extractor: ExtractorKind::Regex,
            });
        };

        if objects.is_empty() {
            // Subject-only cue ("X and Y married"): pair up the subjects.
            if family.spec.symmetric && subjects.len() >= 2 {
                for (i, &a) in subjects.iter().enumerate() {
                    for &b in &subjects[i + 1..] {
                        emit(a, b);
                        emit(b, a);
                    }
                }
                continue;
            }
            // An objectless cue ("X departed") carries no relation but
            // still asserts something about its subject.
            if !family.has_obj {
                for &subj in &subjects {
                    output.pending.push(PendingAssertion {
                        subject: PendingArg::Entity(subj),
                        predicate: family.spec.predicate.to_string(),
                        object: PendingArg::None,
                        confidence,
                        evidence: evidence.clone(),
                    });
                }
                continue;
            }
            // A referring object that failed to resolve degrades to a
            // pending assertion per subject.
            if let Some(obj_match) = captures.name("obj") {
                if is_referring_surface(obj_match.as_str()) {
                    for &subj in &subjects {
                        output.pending.push(PendingAssertion {
                            subject: PendingArg::Entity(subj),
                            predicate: family.spec.predicate.to_string(),
                            object: PendingArg::Surface(obj_match.as_str().to_string()),
                            confidence,
                            evidence: evidence.clone(),
                        });
                    }
                }
            }
            continue;
        }

        // Same-collective detection: both sides resolved to one multi-entity
        // set; emit pairwise cross-relations without self-loops.
        let same_collective = subjects.len() >= 2
            && subjects.len() == objects.len()
            && subjects.iter().all(|s| objects.contains(s));
        if same_collective {
            for &a in &subjects {
                for &b in &objects {
                    emit(a, b);
                }
            }
            continue;
        }

        for &subj in &subjects {
            for &obj in &objects {
                emit(subj, obj);
                if family.spec.symmetric {
                    emit(obj, subj);
                }
            }
        }
    }
}

/// Resolve a captured noun phrase to a set of entities.
///
/// Direct canonical/alias match first; then collective reference via coref;
/// then compound splitting on "and"; then bounded pronoun resolution. The
/// boolean reports whether resolution was mediated (collective, pronoun, or
/// deictic), which costs a small confidence penalty.
fn resolve_np(
    surface: &str,
    position: usize,
    sentence_index: usize,
    allowed: &[EntityType],
    resolver: &ResolverContext<'_>,
    overrides: &mut Vec<TypeOverride>,
) -> (Vec<EntityId>, bool) {
    let trimmed = surface.trim();

    // Direct match.
    if let Some(id) = resolver.find_by_surface(trimmed) {
        let ids = if admit(id, allowed, resolver, overrides) {
            vec![id]
        } else {
            vec![]
        };
        return (ids, false);
    }

    // Collective reference ("the couple", "the pair", "they", "their").
    let collective = resolver.resolve_collective(trimmed, position);
    if !collective.is_empty() {
        let ids = collective
            .into_iter()
            .filter(|id| admit(*id, allowed, resolver, overrides))
            .collect();
        return (ids, true);
    }

    // Definite description ("the president", "the captain"): title
    // bridging or salience, mediated either way.
    let lower = trimmed.to_lowercase();
    if let Some(role) = lower.strip_prefix("the ") {
        if let Some((id, _, _)) = resolver.resolve_definite(role, position, sentence_index) {
            if admit_strict(id, allowed, resolver) {
                return (vec![id], true);
            }
        }
    }

    // Compound splitting on "and".
    if trimmed.contains(" and ") {
        let ids: Vec<EntityId> = trimmed
            .split(" and ")
            .filter_map(|part| resolver.find_by_surface(part.trim()))
            .filter(|id| admit(*id, allowed, resolver, overrides))
            .collect();
        if !ids.is_empty() {
            return (ids, false);
        }
    }

    // Pronoun resolution bounded to the pattern's allowed types.
    if constraint_for(trimmed).is_some() {
        if let Some((id, _)) = resolver.resolve_pronoun(
            trimmed,
            position,
            sentence_index,
            PronounSite::SentenceMid,
        ) {
            if admit_strict(id, allowed, resolver) {
                return (vec![id], true);
            }
        }
    }

    (Vec::new(), false)
}

/// Admit an entity into a guarded slot, retyping weakly-typed entities.
///
/// An entity whose type evidence is no stronger than the capitalization
/// heuristic takes the guard's primary type as new evidence.
fn admit(
    id: EntityId,
    allowed: &[EntityType],
    resolver: &ResolverContext<'_>,
    overrides: &mut Vec<TypeOverride>,
) -> bool {
    let Some(entity) = resolver.entity(id) else {
        return false;
    };
    if allowed.is_empty() {
        return true;
    }
    if type_allowed(allowed, entity.entity_type) {
        if (entity.entity_type == EntityType::Unknown || entity.confidence <= 0.6)
            && !overrides.iter().any(|o| o.entity_id == id)
        {
            overrides.push(TypeOverride {
                entity_id: id,
                entity_type: allowed[0],
            });
        }
        return true;
    }
    if entity.confidence <= 0.6 {
        if !overrides.iter().any(|o| o.entity_id == id) {
            overrides.push(TypeOverride {
                entity_id: id,
                entity_type: allowed[0],
            });
        }
        return true;
    }
    false
}

/// Whether a surface is a referring expression (pronoun, collective, or
/// group placeholder) rather than a name that simply is not an entity.
fn is_referring_surface(surface: &str) -> bool {
    let lower = surface.trim().to_lowercase();
    constraint_for(&lower).is_some()
        || wordlists::GROUP_PLACEHOLDERS.contains(lower.as_str())
        || matches!(
            lower.as_str(),
            "the couple" | "the pair" | "the two" | "the group" | "the family" | "each other"
        )
}

/// Guard check without override side effects (for pronoun-mediated fills).
fn admit_strict(id: EntityId, allowed: &[EntityType], resolver: &ResolverContext<'_>) -> bool {
    resolver
        .entity(id)
        .is_some_and(|e| type_allowed(allowed, e.entity_type))
}

/// Proper-noun items after a colon, until the sentence terminator.
fn list_items(normalized: &str, from_byte: usize) -> Vec<String> {
    let rest = &normalized[from_byte.min(normalized.len())..];
    let rest = rest.split(['.', ';', '!', '?']).next().unwrap_or("");
    NAME_RE
        .find_iter(rest)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
