//! Story event materialization.
//!
//! Eligible assertions map onto the closed event-type set via normalized
//! predicate membership. The eligibility gate drops assertions with
//! unresolved pronouns, group-placeholder subjects, missing required
//! objects, or NEGATED modality. Order indices are monotone in document
//! order across the corpus.

use crate::ident::AtomicIdAllocator;

use super::{
    Assertion, AssertionArg, EventType, Modality, Participant, Role, StoryEvent,
};

/// Predicate membership for each event type, with the object's role and
/// whether an object is required.
fn event_schema(predicate: &str) -> Option<(EventType, Role, bool)> {
    Some(match predicate {
        "moved_to" | "traveled_to" => (EventType::Move, Role::Location, true),
        "departed" => (EventType::Move, Role::Location, false),
        "learned_of" | "knows" => (EventType::Learn, Role::Patient, true),
        "told" | "spoke_with" => (EventType::Tell, Role::Recipient, true),
        "promised" => (EventType::Promise, Role::Recipient, true),
        "attacked" | "fought_against" => (EventType::Attack, Role::Patient, true),
        "met" | "saw" => (EventType::Meet, Role::Patient, true),
        "killed" => (EventType::Death, Role::Patient, true),
        "died" => (EventType::Death, Role::Patient, false),
        "gave_to" => (EventType::Transfer, Role::Recipient, true),
        _ => return None,
    })
}

/// Materialize events from built assertions.
///
/// `base_order` offsets the per-document order so corpus-level ordering is
/// the concatenation of per-document order with document-sequence order.
pub fn build_events(
    assertions: &[Assertion],
    allocator: &AtomicIdAllocator,
    base_order: u64,
) -> Vec<StoryEvent> {
    let mut events = Vec::new();
    let mut per_doc = 0u64;

    // Document order: by first evidence position.
    let mut ordered: Vec<&Assertion> = assertions.iter().collect();
    ordered.sort_by_key(|a| {
        a.evidence
            .first()
            .map(|e| (e.sentence_index, e.span.0))
            .unwrap_or((usize::MAX, usize::MAX))
    });

    for assertion in ordered {
        let Some((event_type, object_role, object_required)) =
            event_schema(&assertion.predicate)
        else {
            continue;
        };
        if !eligible(assertion, object_required) {
            continue;
        }
        let Some(subject) = assertion.subject.entity() else {
            continue;
        };

        let mut participants = vec![Participant {
            entity: subject,
            role: Role::Agent,
        }];
        if let Some(object) = assertion.object.entity() {
            participants.push(Participant {
                entity: object,
                role: object_role,
            });
        }

        events.push(StoryEvent {
            id: allocator.next_event(),
            event_type,
            participants,
            evidence: assertion.evidence.clone(),
            order_index: base_order + per_doc,
            predicate: assertion.predicate.clone(),
        });
        per_doc += 1;
    }
    events
}

/// The eligibility gate.
fn eligible(assertion: &Assertion, object_required: bool) -> bool {
    if assertion.modality == Some(Modality::Negated) {
        return false;
    }
    // Unresolved subjects (pronouns or group placeholders) never anchor events.
    if !matches!(assertion.subject, AssertionArg::Entity(_)) {
        return false;
    }
    // Unresolved object surfaces are equally disqualifying.
    if assertion.object.is_surface() {
        return false;
    }
    if object_required && assertion.object == AssertionArg::None {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::{AssertionId, EntityId};
    use crate::ir::AssertionConfidence;

    fn assertion(predicate: &str, subject: AssertionArg, object: AssertionArg) -> Assertion {
        Assertion {
            id: AssertionId::new(1).unwrap(),
            subject,
            predicate: predicate.into(),
            object,
            evidence: vec![],
            confidence: AssertionConfidence::uniform(0.8),
            attribution: None,
            modality: Some(Modality::Fact),
            compiler_pass: 3,
        }
    }

    fn ent(id: u64) -> AssertionArg {
        AssertionArg::Entity(EntityId::new(id).unwrap())
    }

    #[test]
    fn move_event_from_traveled_to() {
        let assertions = vec![assertion("traveled_to", ent(1), ent(2))];
        let events = build_events(&assertions, &AtomicIdAllocator::new(), 0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::Move);
        assert_eq!(events[0].participants[0].role, Role::Agent);
        assert_eq!(events[0].participants[1].role, Role::Location);
    }

    #[test]
    fn negated_assertions_are_dropped() {
        let mut a = assertion("met", ent(1), ent(2));
        a.modality = Some(Modality::Negated);
        assert!(build_events(&[a], &AtomicIdAllocator::new(), 0).is_empty());
    }

    #[test]
    fn unresolved_subject_is_dropped() {
        let a = assertion("met", AssertionArg::Surface("she".into()), ent(2));
        assert!(build_events(&[a], &AtomicIdAllocator::new(), 0).is_empty());
    }

    #[test]
    fn missing_required_object_is_dropped() {
        let a = assertion("told", ent(1), AssertionArg::None);
        assert!(build_events(&[a], &AtomicIdAllocator::new(), 0).is_empty());
    }

    #[test]
    fn unmapped_predicate_yields_no_event() {
        let a = assertion("married_to", ent(1), ent(2));
        assert!(build_events(&[a], &AtomicIdAllocator::new(), 0).is_empty());
    }

    #[test]
    fn order_index_is_monotone_with_base() {
        let assertions = vec![
            assertion("met", ent(1), ent(2)),
            assertion("told", ent(1), ent(2)),
        ];
        let events = build_events(&assertions, &AtomicIdAllocator::new(), 1000);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].order_index, 1000);
        assert_eq!(events[1].order_index, 1001);
    }
}
