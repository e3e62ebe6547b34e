//! The epistemic intermediate representation.
//!
//! Assertions carry attribution, modality, and reference status; eligible
//! assertions materialize into story events with typed participants, and
//! events project into idempotent fact rows.

pub mod assertion;
pub mod event;
pub mod fact;
pub mod quote;

use serde::{Deserialize, Serialize};

use crate::ident::{AssertionId, EntityId, EventId};
use crate::relation::EvidenceSpan;

/// Epistemic status of an assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Modality {
    Fact,
    Belief,
    Claim,
    Rumor,
    Plan,
    Negated,
}

/// Who an assertion is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttributionSource {
    Narrator,
    Character,
    Unknown,
}

/// Attribution details set by the builder's first pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub source: AttributionSource,
    /// The speaking character, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character: Option<EntityId>,
    pub reliability: f32,
    pub is_dialogue: bool,
    pub is_thought: bool,
}

/// Paired semantic and composite confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssertionConfidence {
    pub semantic: f32,
    pub composite: f32,
}

impl AssertionConfidence {
    pub fn uniform(value: f32) -> Self {
        Self {
            semantic: value,
            composite: value,
        }
    }

    /// Reduce both fields, floored at zero.
    pub fn reduce(&mut self, amount: f32) {
        self.semantic = (self.semantic - amount).max(0.0);
        self.composite = (self.composite - amount).max(0.0);
    }
}

/// An assertion argument: resolved entity, unresolved surface, or absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssertionArg {
    Entity(EntityId),
    Surface(String),
    None,
}

impl AssertionArg {
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            AssertionArg::Entity(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_surface(&self) -> bool {
        matches!(self, AssertionArg::Surface(_))
    }
}

/// One epistemically-qualified assertion.
///
/// Created by the extractor adapter, then enriched in place by the
/// three-pass builder; `compiler_pass` records the last completed pass so
/// rebuilding is a fixed point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assertion {
    pub id: AssertionId,
    pub subject: AssertionArg,
    pub predicate: String,
    pub object: AssertionArg,
    pub evidence: Vec<EvidenceSpan>,
    pub confidence: AssertionConfidence,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribution: Option<Attribution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modality: Option<Modality>,
    pub compiler_pass: u8,
}

/// Closed set of story event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    Move,
    Learn,
    Tell,
    Promise,
    Attack,
    Meet,
    Death,
    Transfer,
}

/// Role a participant plays in an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Agent,
    Patient,
    Recipient,
    Location,
}

/// One event participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub entity: EntityId,
    pub role: Role,
}

/// A narrative event materialized from an eligible assertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryEvent {
    pub id: EventId,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub participants: Vec<Participant>,
    pub evidence: Vec<EvidenceSpan>,
    /// Monotone in document order across the corpus.
    pub order_index: u64,
    /// The source predicate, kept for fact projection.
    pub predicate: String,
}

/// A materialized fact row. Idempotent by `(predicate, subject, object)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    pub predicate: String,
    pub subject: EntityId,
    pub object: Option<EntityId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<EventId>,
}
