//! Canonical entities and their spans.
//!
//! Entities are minted once per document by the deferred minter and merged
//! across documents by the global graph. Spans are created by the minter and
//! the reference resolver and never mutated thereafter.

pub mod cluster;
pub mod mint;
pub mod normalize;
pub mod typing;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ident::EntityId;

/// Entity type tags. `Gpe` passes through to `Place` for downstream
/// consumers but is preserved on the entity itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityType {
    Person,
    Org,
    Place,
    Gpe,
    Event,
    Work,
    Item,
    Artifact,
    House,
    Tribe,
    Species,
    Title,
    Date,
    Time,
    Unknown,
}

impl EntityType {
    /// The type seen by downstream consumers (GPE folds into PLACE).
    pub fn effective(self) -> Self {
        match self {
            EntityType::Gpe => EntityType::Place,
            other => other,
        }
    }

    /// Whether two types count as the same bucket for merging.
    pub fn unifies_with(self, other: EntityType) -> bool {
        self.effective() == other.effective()
            || self == EntityType::Unknown
            || other == EntityType::Unknown
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityType::Person => "PERSON",
            EntityType::Org => "ORG",
            EntityType::Place => "PLACE",
            EntityType::Gpe => "GPE",
            EntityType::Event => "EVENT",
            EntityType::Work => "WORK",
            EntityType::Item => "ITEM",
            EntityType::Artifact => "ARTIFACT",
            EntityType::House => "HOUSE",
            EntityType::Tribe => "TRIBE",
            EntityType::Species => "SPECIES",
            EntityType::Title => "TITLE",
            EntityType::Date => "DATE",
            EntityType::Time => "TIME",
            EntityType::Unknown => "UNKNOWN",
        };
        write!(f, "{name}")
    }
}

/// Grammatical gender hint for pronoun resolution.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Neutral,
    #[default]
    Unknown,
}

impl Gender {
    /// Whether two hints can describe the same referent.
    pub fn compatible(self, other: Gender) -> bool {
        self == Gender::Unknown || other == Gender::Unknown || self == other
    }
}

/// Auxiliary metadata attached to an entity at mint time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityMeta {
    /// Name suffix stripped from the base matching form ("Jr.", "III").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_suffix: Option<String>,
    /// Reason string from the typing cascade, for diagnostics.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_signal: Option<String>,
}

/// A canonical entity.
///
/// Invariant: `canonical` is always a member of `aliases`; canonical is
/// unique per `(type, lowercased canonical)` within one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub canonical: String,
    pub aliases: BTreeSet<String>,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub meta: EntityMeta,
    /// External character-cluster id for cross-reference, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booknlp_id: Option<u64>,
    /// Upstream extraction id, when available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mention_count: Option<usize>,
    #[serde(default, skip_serializing_if = "is_unknown_gender")]
    pub gender: Gender,
}

fn is_unknown_gender(g: &Gender) -> bool {
    *g == Gender::Unknown
}

impl Entity {
    /// Check the canonical-in-aliases invariant.
    pub fn is_consistent(&self) -> bool {
        self.aliases.contains(&self.canonical)
    }
}

/// How a span refers to its entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MentionType {
    Name,
    Title,
    Nominal,
    Pronoun,
    Quote,
}

/// One occurrence of an entity in the document.
///
/// Offsets are character indices; invariant `start < end`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySpan {
    pub entity_id: EntityId,
    pub start: usize,
    pub end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mention_type: Option<MentionType>,
    /// Which stage produced the span ("minter", "resolver", ...).
    pub source: String,
}

impl EntitySpan {
    /// Check the non-empty-span invariant against a document length.
    pub fn is_valid(&self, text_len: usize) -> bool {
        self.start < self.end && self.end <= text_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpe_folds_into_place() {
        assert_eq!(EntityType::Gpe.effective(), EntityType::Place);
        assert!(EntityType::Gpe.unifies_with(EntityType::Place));
    }

    #[test]
    fn unknown_unifies_with_anything() {
        assert!(EntityType::Unknown.unifies_with(EntityType::Person));
        assert!(EntityType::Org.unifies_with(EntityType::Unknown));
        assert!(!EntityType::Person.unifies_with(EntityType::Org));
    }

    #[test]
    fn gender_compatibility() {
        assert!(Gender::Male.compatible(Gender::Unknown));
        assert!(!Gender::Male.compatible(Gender::Female));
    }

    #[test]
    fn span_validity() {
        let span = EntitySpan {
            entity_id: EntityId::new(1).unwrap(),
            start: 4,
            end: 9,
            text: None,
            mention_type: None,
            source: "minter".into(),
        };
        assert!(span.is_valid(20));
        assert!(!span.is_valid(8));
    }
}
