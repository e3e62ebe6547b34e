//! Fact projection.
//!
//! Each event projects into a `(predicate, subject, object, event_id)` row;
//! rows deduplicate by triple, so projecting twice changes nothing.

use super::{Fact, Role, StoryEvent};

/// Project events into deduplicated fact rows.
pub fn build_facts(events: &[StoryEvent]) -> Vec<Fact> {
    let mut facts: Vec<Fact> = Vec::with_capacity(events.len());
    for event in events {
        let subject = event
            .participants
            .iter()
            .find(|p| p.role == Role::Agent)
            .map(|p| p.entity);
        let Some(subject) = subject else { continue };
        let object = event
            .participants
            .iter()
            .find(|p| p.role != Role::Agent)
            .map(|p| p.entity);

        let fact = Fact {
            predicate: event.predicate.clone(),
            subject,
            object,
            event_id: Some(event.id),
        };
        let duplicate = facts.iter().any(|f| {
            f.predicate == fact.predicate && f.subject == fact.subject && f.object == fact.object
        });
        if !duplicate {
            facts.push(fact);
        }
    }
    facts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::{AtomicIdAllocator, EntityId};
    use crate::ir::{EventType, Participant};

    fn event(allocator: &AtomicIdAllocator, predicate: &str, subj: u64, obj: u64) -> StoryEvent {
        StoryEvent {
            id: allocator.next_event(),
            event_type: EventType::Meet,
            participants: vec![
                Participant {
                    entity: EntityId::new(subj).unwrap(),
                    role: Role::Agent,
                },
                Participant {
                    entity: EntityId::new(obj).unwrap(),
                    role: Role::Patient,
                },
            ],
            evidence: vec![],
            order_index: 0,
            predicate: predicate.into(),
        }
    }

    #[test]
    fn projection_deduplicates_by_triple() {
        let allocator = AtomicIdAllocator::new();
        let events = vec![
            event(&allocator, "met", 1, 2),
            event(&allocator, "met", 1, 2),
            event(&allocator, "met", 2, 1),
        ];
        let facts = build_facts(&events);
        assert_eq!(facts.len(), 2);
    }

    #[test]
    fn projection_is_idempotent() {
        let allocator = AtomicIdAllocator::new();
        let events = vec![event(&allocator, "met", 1, 2)];
        let once = build_facts(&events);
        let twice = build_facts(&events);
        assert_eq!(once, twice);
    }
}
