//! Deferred entity minting.
//!
//! After the promotion gate, clusters become entities with fresh IDs,
//! canonical names, aliases, and evidence-weighted types. Minting emits the
//! entity and its spans in a single atomic batch; entity IDs must not exist
//! before this point.

use std::collections::BTreeSet;

use crate::config::ConfidenceTable;
use crate::entity::cluster::MentionCluster;
use crate::entity::normalize::normalize_surface;
use crate::entity::typing::{self, TypeEvidence, ner_prior};
use crate::entity::{Entity, EntityMeta, EntitySpan, EntityType, MentionType};
use crate::ident::AtomicIdAllocator;
use crate::wordlists;

/// The atomic result of minting one document's clusters.
#[derive(Debug, Default)]
pub struct MintBatch {
    pub entities: Vec<Entity>,
    pub spans: Vec<EntitySpan>,
}

/// NER labels strong enough to promote a single-mention cluster.
const STRONG_NER: &[&str] = &["PERSON", "PER", "ORG", "GPE", "LOC"];

/// Promotion gate: at least one durable mention, plus either repetition or
/// a strong single-mention signal.
pub fn promotes(cluster: &MentionCluster) -> bool {
    if cluster.durable_count() == 0 {
        return false;
    }
    if cluster.mention_count() >= 2 {
        return true;
    }
    if let Some((label, _)) = cluster.top_ner() {
        if STRONG_NER.contains(&label) {
            return true;
        }
    }
    if cluster
        .surface_variants
        .iter()
        .any(|s| has_title_prefix(s))
    {
        return true;
    }
    // A gazetteer hit or a typing-keyword headword is signal enough.
    if cluster
        .base_key
        .split(' ')
        .any(|w| typing::PLACE_GAZETTEER.contains(w))
    {
        return true;
    }
    cluster
        .base_key
        .rsplit(' ')
        .next()
        .is_some_and(|head| {
            typing::PLACE_KEYWORDS.contains(head) || typing::ORG_KEYWORDS.contains(head)
        })
}

fn has_title_prefix(surface: &str) -> bool {
    surface
        .split_whitespace()
        .next()
        .map(|w| w.trim_end_matches('.').to_lowercase())
        .is_some_and(|w| wordlists::TITLE_PREFIXES.contains(w.as_str()))
}

/// Mint all promoted clusters into entities and spans.
pub fn mint_clusters(
    clusters: Vec<MentionCluster>,
    allocator: &AtomicIdAllocator,
    table: &ConfidenceTable,
) -> MintBatch {
    let mut batch = MintBatch::default();
    let mut taken: BTreeSet<(EntityType, String)> = BTreeSet::new();

    for cluster in clusters {
        if !promotes(&cluster) {
            continue;
        }

        let canonical = best_canonical(&cluster);
        let normalized = normalize_surface(&canonical);
        let (entity_type, confidence, signal) = derive_type(&cluster, table);

        // Canonical is unique per (type, lowercased canonical) per document;
        // a duplicate means two clusters collapsed to the same face.
        let key = (entity_type, normalized.canonical.to_lowercase());
        if taken.contains(&key) {
            continue;
        }
        taken.insert(key);

        let mut aliases: BTreeSet<String> = BTreeSet::new();
        aliases.insert(normalized.canonical.clone());
        for surface in cluster
            .surface_variants
            .iter()
            .chain(cluster.alias_variants.iter())
        {
            let trimmed = surface.trim();
            if !trimmed.is_empty() {
                aliases.insert(trimmed.to_string());
            }
        }

        let id = allocator.next_entity();
        batch.entities.push(Entity {
            id,
            entity_type,
            canonical: normalized.canonical.clone(),
            aliases,
            confidence,
            attrs: Default::default(),
            meta: EntityMeta {
                name_suffix: normalized.name_suffix.clone(),
                type_signal: Some(signal.to_string()),
            },
            booknlp_id: None,
            eid: None,
            mention_count: Some(cluster.mention_count()),
            gender: cluster.gender,
        });

        for mention in &cluster.mentions {
            let candidate = &mention.candidate;
            let mention_type = if has_title_prefix(&candidate.text) {
                MentionType::Title
            } else {
                MentionType::Name
            };
            batch.spans.push(EntitySpan {
                entity_id: id,
                start: candidate.start,
                end: candidate.end,
                text: Some(candidate.text.clone()),
                mention_type: Some(mention_type),
                source: "minter".into(),
            });
        }
    }

    batch.spans.sort_by_key(|s| (s.start, s.end));
    batch
}

/// Final type priority: the §keyword/JR cascade first, then the NER vote
/// weighted by count, then the grammatical possessive signal, then the
/// capitalization heuristic.
fn derive_type(cluster: &MentionCluster, table: &ConfidenceTable) -> (EntityType, f32, &'static str) {
    let top_ner = cluster.top_ner();
    let evidence = TypeEvidence {
        base: &cluster.canonical_form,
        ner: top_ner.map(|(label, _)| label),
        context_window: &cluster.context_words,
        attached_only_fragment: !cluster.base_key.contains(' ')
            && cluster.durable_count() == 0,
        possessive_evidence: cluster.possessive_evidence,
        determiner_before: cluster.determiner_before,
    };
    let decision = typing::classify(&evidence, table);

    if decision.signal == "ner_prior" {
        // Evidence-weighted NER vote: confidence grows with vote share.
        if let Some((label, count)) = top_ner {
            if let Some(entity_type) = ner_prior(label) {
                let proportion = count as f32 / cluster.mention_count().max(1) as f32;
                return (entity_type, 0.6 + 0.3 * proportion, "ner_vote");
            }
        }
    }
    (decision.entity_type, decision.confidence, decision.signal)
}

/// Choose the best canonical name among a cluster's variants.
///
/// Penalizes collective nouns, verbs, and generic heads; prefers multi-token
/// capitalized forms. Ties break toward the longer, then lexicographically
/// earlier form so the choice is deterministic.
fn best_canonical(cluster: &MentionCluster) -> String {
    let mut candidates: BTreeSet<String> = BTreeSet::new();
    candidates.insert(cluster.canonical_form.clone());
    for s in &cluster.surface_variants {
        candidates.insert(normalize_surface(s).canonical);
    }
    for s in &cluster.alias_variants {
        candidates.insert(s.clone());
    }

    candidates
        .into_iter()
        .filter(|c| !c.is_empty())
        .max_by(|a, b| {
            canonical_score(a)
                .partial_cmp(&canonical_score(b))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.len().cmp(&b.len()))
                .then_with(|| b.cmp(a))
        })
        .unwrap_or_else(|| cluster.canonical_form.clone())
}

fn canonical_score(name: &str) -> f32 {
    let words: Vec<&str> = name.split_whitespace().collect();
    let mut score = 0.0;
    for w in &words {
        if w.chars().next().is_some_and(char::is_uppercase) {
            score += 2.0;
        }
    }
    if words.len() > 1 {
        score += 1.0;
    }
    if let Some(last) = words.last() {
        let lower = last.to_lowercase();
        if wordlists::PERSON_HEAD_BLOCKLIST.contains(lower.as_str()) {
            score -= 3.0;
        }
        if matches!(lower.as_str(), "said" | "went" | "came" | "looked" | "ran") {
            score -= 3.0;
        }
    }
    if words.iter().all(|w| w.chars().all(char::is_lowercase)) {
        score -= 2.0;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{FallbackParser, ParserAdapter};
    use crate::entity::cluster::MentionClusterer;
    use crate::mention::gate;
    use crate::mention::generate_candidates;

    fn mint_text(text: &str) -> MintBatch {
        let sentences = FallbackParser.parse(text).unwrap();
        let mut clusterer = MentionClusterer::new();
        for candidate in generate_candidates(&sentences) {
            let decision = gate::evaluate(&candidate);
            clusterer.add(candidate, decision.verdict);
        }
        mint_clusters(
            clusterer.into_clusters(),
            &AtomicIdAllocator::new(),
            &ConfidenceTable::default(),
        )
    }

    #[test]
    fn repeated_name_mints_with_spans() {
        let batch = mint_text("Barty met the miller at dawn. Barty smiled at everyone there.");
        let barty = batch
            .entities
            .iter()
            .find(|e| e.canonical == "Barty")
            .expect("Barty minted");
        assert_eq!(barty.mention_count, Some(2));
        let spans: Vec<_> = batch
            .spans
            .iter()
            .filter(|s| s.entity_id == barty.id)
            .collect();
        assert_eq!(spans.len(), 2);
    }

    #[test]
    fn single_mention_without_signal_is_not_minted() {
        let batch = mint_text("Preston slipped away before the rain started falling hard.");
        assert!(
            !batch.entities.iter().any(|e| e.canonical == "Preston"),
            "one unlabeled mention must not promote"
        );
    }

    #[test]
    fn single_mention_with_ner_promotes() {
        let sentences = FallbackParser
            .parse("Preston slipped away before the rain started falling hard.")
            .unwrap();
        let mut clusterer = MentionClusterer::new();
        for mut candidate in generate_candidates(&sentences) {
            if candidate.text == "Preston" {
                candidate.ner = Some("PERSON".into());
            }
            let decision = gate::evaluate(&candidate);
            clusterer.add(candidate, decision.verdict);
        }
        let batch = mint_clusters(
            clusterer.into_clusters(),
            &AtomicIdAllocator::new(),
            &ConfidenceTable::default(),
        );
        let preston = batch
            .entities
            .iter()
            .find(|e| e.canonical == "Preston")
            .expect("NER-backed single mention promotes");
        assert_eq!(preston.entity_type, EntityType::Person);
    }

    #[test]
    fn titled_single_mention_promotes() {
        let batch = mint_text("Mr. Hollis inspected every crate in the cellar again.");
        assert!(batch.entities.iter().any(|e| e.canonical.contains("Hollis")));
    }

    #[test]
    fn canonical_is_in_aliases() {
        let batch = mint_text(
            "Severus Snape entered the dungeon quietly. Snape glared at everyone present.",
        );
        for entity in &batch.entities {
            assert!(
                entity.is_consistent(),
                "canonical {:?} missing from aliases {:?}",
                entity.canonical,
                entity.aliases
            );
        }
    }

    #[test]
    fn longer_capitalized_form_wins_canonical() {
        let batch = mint_text(
            "Severus Snape entered the dungeon quietly. Snape glared at everyone present.",
        );
        let snape = batch
            .entities
            .iter()
            .find(|e| e.canonical.contains("Snape"))
            .unwrap();
        assert_eq!(snape.canonical, "Severus Snape");
        assert!(snape.aliases.contains("Snape"));
    }

    #[test]
    fn headword_types_place() {
        let batch = mint_text(
            "They reached Meridian Ridge at dusk. Meridian Ridge loomed over the valley.",
        );
        let ridge = batch
            .entities
            .iter()
            .find(|e| e.canonical == "Meridian Ridge")
            .expect("ridge minted");
        assert_eq!(ridge.entity_type, EntityType::Place);
    }

    #[test]
    fn ner_vote_confidence_scales_with_share() {
        let sentences = FallbackParser
            .parse("Elias waved at the crowd. Elias left the town at once.")
            .unwrap();
        let mut clusterer = MentionClusterer::new();
        for mut candidate in generate_candidates(&sentences) {
            if candidate.text == "Elias" {
                candidate.ner = Some("PERSON".into());
            }
            let decision = gate::evaluate(&candidate);
            clusterer.add(candidate, decision.verdict);
        }
        let batch = mint_clusters(
            clusterer.into_clusters(),
            &AtomicIdAllocator::new(),
            &ConfidenceTable::default(),
        );
        let elias = batch.entities.iter().find(|e| e.canonical == "Elias").unwrap();
        // Both mentions voted PERSON: confidence = 0.6 + 0.3 * 1.0.
        assert!((elias.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn mint_ids_are_fresh_and_ordered() {
        let batch = mint_text("Barty met Wren by the gate. Barty and Wren talked for hours.");
        let mut ids: Vec<u64> = batch.entities.iter().map(|e| e.id.get()).collect();
        let deduped: BTreeSet<u64> = ids.iter().copied().collect();
        assert_eq!(deduped.len(), ids.len());
        ids.sort_unstable();
        assert_eq!(ids.first(), Some(&1));
    }
}
