//! The debug identity report.
//!
//! Groups entities by the strongest identity key available (`eid`, then
//! BookNLP cluster id, then name+type) and reports a "worst offender"
//! attribute diff per group plus a mention tally. Purely observational;
//! never affects extraction.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::ident::EntityId;

/// Attribute diff between the two most divergent members of a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttrDiff {
    pub a: EntityId,
    pub b: EntityId,
    pub differing_keys: Vec<String>,
}

/// One identity group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityGroup {
    /// The grouping key ("eid:...", "booknlp:...", or "name:<type>:<name>").
    pub key: String,
    pub members: Vec<EntityId>,
    pub mention_tally: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worst_offender: Option<AttrDiff>,
}

/// The full grouped report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityReport {
    pub groups: Vec<IdentityGroup>,
}

/// Strongest identity key for one entity.
fn identity_key(entity: &Entity) -> String {
    if let Some(eid) = &entity.eid {
        return format!("eid:{eid}");
    }
    if let Some(booknlp) = entity.booknlp_id {
        return format!("booknlp:{booknlp}");
    }
    format!(
        "name:{}:{}",
        entity.entity_type,
        entity.canonical.to_lowercase()
    )
}

/// Build the grouped identity report.
pub fn identity_report(entities: &[Entity]) -> IdentityReport {
    let mut groups: BTreeMap<String, Vec<&Entity>> = BTreeMap::new();
    for entity in entities {
        groups.entry(identity_key(entity)).or_default().push(entity);
    }

    let groups = groups
        .into_iter()
        .map(|(key, members)| {
            let mention_tally = members
                .iter()
                .map(|e| e.mention_count.unwrap_or(1))
                .sum();
            let worst_offender = worst_pair(&members);
            IdentityGroup {
                key,
                members: members.iter().map(|e| e.id).collect(),
                mention_tally,
                worst_offender,
            }
        })
        .collect();
    IdentityReport { groups }
}

/// The pair of members with the most differing attribute keys.
fn worst_pair(members: &[&Entity]) -> Option<AttrDiff> {
    if members.len() < 2 {
        return None;
    }
    let mut worst: Option<AttrDiff> = None;
    for (i, a) in members.iter().enumerate() {
        for b in &members[i + 1..] {
            let mut differing: Vec<String> = Vec::new();
            for key in a.attrs.keys().chain(b.attrs.keys()) {
                if a.attrs.get(key) != b.attrs.get(key) && !differing.contains(key) {
                    differing.push(key.clone());
                }
            }
            if worst
                .as_ref()
                .map(|w| differing.len() > w.differing_keys.len())
                .unwrap_or(true)
            {
                worst = Some(AttrDiff {
                    a: a.id,
                    b: b.id,
                    differing_keys: differing,
                });
            }
        }
    }
    worst
}
