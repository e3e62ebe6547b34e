//! The cross-document global knowledge graph.
//!
//! Dual-indexed for fast candidate filtering: by effective type, by
//! `(type, first letter)`, and by `(type, lowercased canonical)` for exact
//! hits. `add_document` is the single writer; readers observe a consistent
//! snapshot. Merging applies the Jaccard-plus-rules scorer with soft and
//! hard thresholds and the cross-type guardrails.

pub mod identity;
pub mod merge;

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::entity::typing::{ORG_KEYWORDS, PLACE_KEYWORDS};
use crate::entity::{Entity, EntityType};
use crate::error::GraphError;
use crate::ident::{AtomicIdAllocator, EntityId};
use crate::pipeline::ExtractionResult;
use crate::relation::vocabulary::{self, Violation};
use crate::relation::{EvidenceSpan, Relation};
use crate::wordlists;

/// Whether any ORG or PLACE keyword occurs in a lowercased name.
pub(crate) fn org_keyword_in(lower: &str) -> bool {
    lower
        .split_whitespace()
        .any(|w| ORG_KEYWORDS.contains(w) || PLACE_KEYWORDS.contains(w))
}

/// A globally merged entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalEntity {
    #[serde(flatten)]
    pub entity: Entity,
    /// Documents this entity appeared in.
    pub documents: Vec<String>,
    /// Aggregate mention count across documents.
    pub mention_count: usize,
}

/// A globally merged relation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalRelation {
    pub subj: EntityId,
    pub pred: String,
    pub obj: EntityId,
    pub confidence: f32,
    pub evidence: Vec<EvidenceSpan>,
    pub documents: Vec<String>,
}

/// Serializable snapshot of the whole graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphExport {
    pub entities: Vec<GlobalEntity>,
    pub relations: Vec<GlobalRelation>,
}

/// Query filters; all present filters must match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,
    /// Case-insensitive substring over canonical names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
    /// Case-insensitive exact alias match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// What happened to one document during merging.
#[derive(Debug, Clone, Default)]
pub struct MergeReport {
    pub new_entities: usize,
    pub merged_entities: usize,
    pub relations_added: usize,
    /// Per-document entity id to global id.
    pub id_remap: HashMap<EntityId, EntityId>,
}

/// The global knowledge graph. Writes serialize through a gate; the
/// DashMap indices support concurrent reads.
pub struct GlobalKnowledgeGraph {
    soft_threshold: f32,
    hard_threshold: f32,
    entities: DashMap<EntityId, GlobalEntity>,
    relations: Mutex<Vec<GlobalRelation>>,
    /// (effective type, lowercased canonical) -> entity id.
    canonical_index: DashMap<(EntityType, String), EntityId>,
    /// (effective type, first letter) -> entity ids.
    letter_index: DashMap<(EntityType, char), Vec<EntityId>>,
    allocator: AtomicIdAllocator,
    write_gate: Mutex<()>,
}

impl GlobalKnowledgeGraph {
    pub fn new(soft_threshold: f32, hard_threshold: f32) -> Self {
        Self {
            soft_threshold,
            hard_threshold,
            entities: DashMap::new(),
            relations: Mutex::new(Vec::new()),
            canonical_index: DashMap::new(),
            letter_index: DashMap::new(),
            allocator: AtomicIdAllocator::new(),
            write_gate: Mutex::new(()),
        }
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn relation_count(&self) -> usize {
        self.relations.lock().expect("relations lock poisoned").len()
    }

    /// Merge one document's extraction into the graph. Single writer.
    pub fn add_document(&self, result: &ExtractionResult) -> Result<MergeReport, GraphError> {
        let _writer = self.write_gate.lock().map_err(|_| GraphError::MergeConflict {
            detail: "write gate poisoned".into(),
        })?;
        let mut report = MergeReport::default();

        let mut incoming: Vec<&Entity> = result.entities.iter().collect();
        incoming.sort_by_key(|e| e.id);

        for entity in incoming {
            let global_id = self.merge_entity(entity, &result.doc_id, &mut report)?;
            report.id_remap.insert(entity.id, global_id);
        }

        // Rewire relations through the remap and deduplicate.
        {
            let mut relations = self
                .relations
                .lock()
                .map_err(|_| GraphError::MergeConflict {
                    detail: "relations lock poisoned".into(),
                })?;
            for relation in &result.relations {
                let (Some(&subj), Some(&obj)) = (
                    report.id_remap.get(&relation.subj),
                    report.id_remap.get(&relation.obj),
                ) else {
                    continue;
                };
                if let Some(existing) = relations.iter_mut().find(|r| {
                    r.pred == relation.pred && r.subj == subj && r.obj == obj
                }) {
                    existing.confidence = existing.confidence.max(relation.confidence);
                    if !existing.documents.contains(&result.doc_id) {
                        existing.documents.push(result.doc_id.clone());
                    }
                    continue;
                }
                relations.push(GlobalRelation {
                    subj,
                    pred: relation.pred.clone(),
                    obj,
                    confidence: relation.confidence,
                    evidence: relation.evidence.clone(),
                    documents: vec![result.doc_id.clone()],
                });
                report.relations_added += 1;
            }
        }

        self.post_merge_filter();
        tracing::debug!(
            doc_id = %result.doc_id,
            new = report.new_entities,
            merged = report.merged_entities,
            "document merged into global graph"
        );
        Ok(report)
    }

    fn merge_entity(
        &self,
        entity: &Entity,
        doc_id: &str,
        report: &mut MergeReport,
    ) -> Result<EntityId, GraphError> {
        let bucket_type = entity.entity_type.effective();
        let canonical_key = (bucket_type, entity.canonical.to_lowercase());

        // Exact-match hit.
        if let Some(id) = self.canonical_index.get(&canonical_key).map(|e| *e.value()) {
            let mut existing = self.entities.get_mut(&id).ok_or(GraphError::MergeConflict {
                detail: format!("canonical index points at missing entity {id}"),
            })?;
            absorb(&mut existing, entity, doc_id);
            report.merged_entities += 1;
            return Ok(id);
        }

        // Candidate scan in the type+letter bucket (UNKNOWN scans all letters
        // of its own bucket only; cross-type guardrails live in the scorer).
        let best = self
            .candidate_ids(bucket_type, &entity.canonical)
            .into_iter()
            .filter_map(|id| {
                let candidate = self.entities.get(&id)?;
                let score = merge::merge_score(&candidate.entity, entity);
                Some((id, score))
            })
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

        if let Some((id, score)) = best {
            if score >= self.hard_threshold {
                let mut existing =
                    self.entities.get_mut(&id).ok_or(GraphError::MergeConflict {
                        detail: format!("letter index points at missing entity {id}"),
                    })?;
                absorb(&mut existing, entity, doc_id);
                let new_canonical_key =
                    (bucket_type, existing.entity.canonical.to_lowercase());
                drop(existing);
                self.canonical_index.insert(new_canonical_key, id);
                self.canonical_index.insert(canonical_key, id);
                report.merged_entities += 1;
                return Ok(id);
            } else if score >= self.soft_threshold {
                tracing::debug!(
                    candidate = %id,
                    score,
                    canonical = %entity.canonical,
                    "soft-threshold merge candidate left unmerged"
                );
            }
        }

        // Below hard threshold: mint a fresh global entity.
        let id = self.allocator.next_entity();
        let mut global = GlobalEntity {
            entity: entity.clone(),
            documents: vec![doc_id.to_string()],
            mention_count: entity.mention_count.unwrap_or(1),
        };
        global.entity.id = id;
        self.entities.insert(id, global);
        self.canonical_index.insert(canonical_key, id);
        if let Some(letter) = first_letter(&entity.canonical) {
            self.letter_index
                .entry((bucket_type, letter))
                .or_default()
                .push(id);
        }
        report.new_entities += 1;
        Ok(id)
    }

    fn candidate_ids(&self, bucket_type: EntityType, canonical: &str) -> Vec<EntityId> {
        let mut ids = Vec::new();
        if let Some(letter) = first_letter(canonical) {
            for t in [bucket_type, EntityType::Unknown] {
                if let Some(bucket) = self.letter_index.get(&(t, letter)) {
                    ids.extend(bucket.iter().copied());
                }
            }
        }
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Post-merge filtering of fragment PERSON entities.
    fn post_merge_filter(&self) {
        let mut doomed: Vec<EntityId> = Vec::new();
        let org_names: Vec<String> = self
            .entities
            .iter()
            .filter(|e| e.entity.entity_type.effective() == EntityType::Org)
            .map(|e| e.entity.canonical.to_lowercase())
            .collect();

        for entry in self.entities.iter() {
            let entity = &entry.entity;
            if entity.entity_type.effective() != EntityType::Person {
                continue;
            }
            let canonical = entity.canonical.to_lowercase();
            if canonical.contains(' ') {
                continue;
            }
            if wordlists::PERSON_HEAD_BLOCKLIST.contains(canonical.as_str()) {
                doomed.push(entity.id);
                continue;
            }
            let longest_alias = entity.aliases.iter().map(|a| a.len()).max().unwrap_or(0);
            let only_substring_of_orgs = longest_alias <= entity.canonical.len()
                && org_names
                    .iter()
                    .any(|org| org.split_whitespace().any(|w| w == canonical));
            if only_substring_of_orgs {
                doomed.push(entity.id);
            }
        }

        if doomed.is_empty() {
            return;
        }
        for id in &doomed {
            self.entities.remove(id);
        }
        self.canonical_index
            .retain(|_, id| !doomed.contains(id));
        self.letter_index
            .iter_mut()
            .for_each(|mut bucket| bucket.retain(|id| !doomed.contains(id)));
        let mut relations = self.relations.lock().expect("relations lock poisoned");
        relations.retain(|r| !doomed.contains(&r.subj) && !doomed.contains(&r.obj));
    }

    /// Query entities; all present filters must match.
    pub fn query(&self, query: &GraphQuery) -> Vec<GlobalEntity> {
        let canonical_needle = query.canonical.as_deref().map(str::to_lowercase);
        let alias_needle = query.alias.as_deref().map(str::to_lowercase);
        let mut out: Vec<GlobalEntity> = self
            .entities
            .iter()
            .filter(|e| {
                query
                    .entity_type
                    .is_none_or(|t| e.entity.entity_type.effective() == t.effective())
            })
            .filter(|e| {
                canonical_needle
                    .as_deref()
                    .is_none_or(|n| e.entity.canonical.to_lowercase().contains(n))
            })
            .filter(|e| {
                alias_needle.as_deref().is_none_or(|n| {
                    e.entity.aliases.iter().any(|a| a.to_lowercase() == n)
                })
            })
            .map(|e| e.clone())
            .collect();
        out.sort_by_key(|e| e.entity.id);
        out
    }

    /// Export a consistent snapshot.
    pub fn export(&self) -> GraphExport {
        let _writer = self.write_gate.lock().expect("write gate poisoned");
        let mut entities: Vec<GlobalEntity> =
            self.entities.iter().map(|e| e.clone()).collect();
        entities.sort_by_key(|e| e.entity.id);
        let relations = self
            .relations
            .lock()
            .expect("relations lock poisoned")
            .clone();
        GraphExport {
            entities,
            relations,
        }
    }

    /// Run consumer-side constraint checks (antisymmetric-cycle detection).
    pub fn check_constraints(&self) -> Vec<Violation> {
        let relations = self.relations.lock().expect("relations lock poisoned");
        let as_relations: Vec<Relation> = relations
            .iter()
            .enumerate()
            .map(|(i, r)| Relation {
                id: crate::ident::RelationId::new(i as u64 + 1).expect("nonzero"),
                subj: r.subj,
                pred: r.pred.clone(),
                obj: r.obj,
                confidence: r.confidence,
                evidence: r.evidence.clone(),
                extractor: crate::relation::ExtractorKind::Regex,
            })
            .collect();
        vocabulary::detect_cycles(&as_relations)
    }
}

/// Merge an incoming per-document entity into an existing global one.
fn absorb(existing: &mut GlobalEntity, incoming: &Entity, doc_id: &str) {
    existing.mention_count += incoming.mention_count.unwrap_or(1);
    if !existing.documents.contains(&doc_id.to_string()) {
        existing.documents.push(doc_id.to_string());
    }
    for alias in &incoming.aliases {
        existing.entity.aliases.insert(alias.clone());
    }

    // Attribute merge: prefer the more specific (longer) string value and
    // keep the displaced one in an `<key>Alternatives` list.
    let mut displaced: BTreeMap<String, serde_json::Value> = BTreeMap::new();
    for (key, value) in &incoming.attrs {
        match existing.entity.attrs.get(key) {
            None => {
                existing.entity.attrs.insert(key.clone(), value.clone());
            }
            Some(old) => {
                let old_len = old.as_str().map(str::len).unwrap_or(0);
                let new_len = value.as_str().map(str::len).unwrap_or(0);
                if new_len > old_len {
                    displaced.insert(key.clone(), old.clone());
                    existing.entity.attrs.insert(key.clone(), value.clone());
                } else if value != old {
                    displaced.insert(key.clone(), value.clone());
                }
            }
        }
    }
    for (key, value) in displaced {
        let alternatives_key = format!("{key}Alternatives");
        let list = existing
            .entity
            .attrs
            .entry(alternatives_key)
            .or_insert_with(|| serde_json::Value::Array(vec![]));
        if let serde_json::Value::Array(items) = list {
            if !items.contains(&value) {
                items.push(value);
            }
        }
    }

    // Re-pick the canonical: prefer the higher-scoring face.
    if canonical_preference(&incoming.canonical) > canonical_preference(&existing.entity.canonical)
    {
        existing.entity.canonical = incoming.canonical.clone();
    }
    existing
        .entity
        .aliases
        .insert(existing.entity.canonical.clone());
    if incoming.confidence > existing.entity.confidence {
        existing.entity.confidence = incoming.confidence;
    }
    if existing.entity.gender == crate::entity::Gender::Unknown {
        existing.entity.gender = incoming.gender;
    }
    existing.entity.mention_count = Some(existing.mention_count);
}

/// Canonical preference: multi-token capitalized beats short or generic.
fn canonical_preference(name: &str) -> f32 {
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
        if wordlists::PERSON_HEAD_BLOCKLIST.contains(last.to_lowercase().as_str()) {
            score -= 3.0;
        }
    }
    score
}

fn first_letter(canonical: &str) -> Option<char> {
    canonical
        .chars()
        .next()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
}
