//! The relation vocabulary registry and cycle detection.
//!
//! Every predicate carries a rule defining symmetry, an optional inverse,
//! and argument type constraints. Predicates form an open vocabulary:
//! unknown ones receive a permissive default rule. Antisymmetric predicates
//! (those with an inverse) must be acyclic; a DFS over each predicate's
//! induced graph reports violations for consumers to prune or warn on.

use std::collections::HashMap;
use std::sync::LazyLock;

use petgraph::graph::DiGraph;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

use crate::entity::EntityType;
use crate::ident::EntityId;

use super::Relation;

/// Argument type constraint: allowed subject and object types (empty = any).
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeConstraint {
    pub from: &'static [EntityType],
    pub to: &'static [EntityType],
}

/// Registry rule for one predicate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PredicateRule {
    pub symmetric: bool,
    pub inverse_of: Option<&'static str>,
    pub type_constraint: Option<TypeConstraint>,
}

const PERSON: &[EntityType] = &[EntityType::Person];
const ORG_OR_PLACE: &[EntityType] = &[
    EntityType::Org,
    EntityType::Place,
    EntityType::Gpe,
    EntityType::House,
];
const PLACE: &[EntityType] = &[EntityType::Place, EntityType::Gpe];

/// The fixed registry, seeded with the core vocabulary.
static REGISTRY: LazyLock<HashMap<&'static str, PredicateRule>> = LazyLock::new(|| {
    let mut map = HashMap::new();
    let sym = PredicateRule {
        symmetric: true,
        ..Default::default()
    };
    let sym_person = PredicateRule {
        symmetric: true,
        type_constraint: Some(TypeConstraint {
            from: PERSON,
            to: PERSON,
        }),
        ..Default::default()
    };
    let person_to_org = PredicateRule {
        type_constraint: Some(TypeConstraint {
            from: PERSON,
            to: ORG_OR_PLACE,
        }),
        ..Default::default()
    };

    // Symmetric predicates.
    map.insert("married_to", sym_person);
    map.insert("friends_with", sym_person);
    map.insert("sibling_of", sym_person);
    map.insert("allied_with", sym);
    map.insert("rival_of", sym);
    map.insert("enemy_of", sym);
    map.insert("met", sym_person);
    map.insert("spoke_with", sym_person);
    map.insert("fought_against", sym);

    // Antisymmetric pairs.
    map.insert(
        "parent_of",
        PredicateRule {
            inverse_of: Some("child_of"),
            type_constraint: Some(TypeConstraint {
                from: PERSON,
                to: PERSON,
            }),
            ..Default::default()
        },
    );
    map.insert(
        "child_of",
        PredicateRule {
            inverse_of: Some("parent_of"),
            type_constraint: Some(TypeConstraint {
                from: PERSON,
                to: PERSON,
            }),
            ..Default::default()
        },
    );
    map.insert(
        "grandparent_of",
        PredicateRule {
            inverse_of: Some("grandchild_of"),
            ..Default::default()
        },
    );
    map.insert(
        "grandchild_of",
        PredicateRule {
            inverse_of: Some("grandparent_of"),
            ..Default::default()
        },
    );

    // Directed PERSON -> ORG/PLACE.
    map.insert("works_at", person_to_org);
    map.insert("studies_at", person_to_org);
    map.insert("teaches_at", person_to_org);
    map.insert("member_of", person_to_org);
    map.insert("leads", person_to_org);
    map.insert(
        "lives_in",
        PredicateRule {
            type_constraint: Some(TypeConstraint {
                from: PERSON,
                to: PLACE,
            }),
            ..Default::default()
        },
    );
    map.insert(
        "moved_to",
        PredicateRule {
            type_constraint: Some(TypeConstraint {
                from: PERSON,
                to: PLACE,
            }),
            ..Default::default()
        },
    );
    map.insert(
        "traveled_to",
        PredicateRule {
            type_constraint: Some(TypeConstraint {
                from: PERSON,
                to: PLACE,
            }),
            ..Default::default()
        },
    );

    // Directed, unconstrained beyond person subjects where sensible.
    for pred in [
        "loves", "fears", "serves", "betrayed", "killed", "attacked", "saw", "told", "taught",
        "knows", "learned_of", "gave_to", "created", "rules", "part_of", "became", "owns",
        "promised", "departed",
    ] {
        map.insert(pred, PredicateRule::default());
    }

    map
});

/// Look up a predicate's rule; unknown predicates get the permissive default.
pub fn rule_for(predicate: &str) -> PredicateRule {
    REGISTRY.get(predicate).copied().unwrap_or_default()
}

/// Whether the registry explicitly knows this predicate.
pub fn is_registered(predicate: &str) -> bool {
    REGISTRY.contains_key(predicate)
}

/// Whether an entity type may fill the given slot.
pub fn type_allowed(allowed: &[EntityType], entity_type: EntityType) -> bool {
    allowed.is_empty()
        || entity_type == EntityType::Unknown
        || allowed
            .iter()
            .any(|t| t.effective() == entity_type.effective())
}

// ---------------------------------------------------------------------------
// Cycle detection
// ---------------------------------------------------------------------------

/// A constraint violation found by the consumer-side checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    #[serde(rename = "type")]
    pub kind: String,
    /// The relation implicated (its id).
    pub relation: u64,
    pub message: String,
}

/// Detect cycles in each antisymmetric predicate's induced graph.
///
/// Emits one violation per back edge found during DFS.
pub fn detect_cycles(relations: &[Relation]) -> Vec<Violation> {
    use std::collections::HashSet;

    let mut violations = Vec::new();
    let antisymmetric: HashSet<&str> = relations
        .iter()
        .map(|r| r.pred.as_str())
        .filter(|p| rule_for(p).inverse_of.is_some())
        .collect();

    for pred in antisymmetric {
        let mut graph: DiGraph<EntityId, u64> = DiGraph::new();
        let mut nodes: HashMap<EntityId, _> = HashMap::new();
        for relation in relations.iter().filter(|r| r.pred == pred) {
            let s = *nodes
                .entry(relation.subj)
                .or_insert_with(|| graph.add_node(relation.subj));
            let o = *nodes
                .entry(relation.obj)
                .or_insert_with(|| graph.add_node(relation.obj));
            graph.add_edge(s, o, relation.id.get());
        }

        // Iterative DFS with three colors; a back edge closes a cycle.
        #[derive(Clone, Copy, PartialEq)]
        enum Color {
            White,
            Gray,
            Black,
        }
        let mut color = vec![Color::White; graph.node_count()];
        for start in graph.node_indices() {
            if color[start.index()] != Color::White {
                continue;
            }
            let mut stack = vec![(start, false)];
            while let Some((node, processed)) = stack.pop() {
                if processed {
                    color[node.index()] = Color::Black;
                    continue;
                }
                if color[node.index()] != Color::White {
                    continue;
                }
                color[node.index()] = Color::Gray;
                stack.push((node, true));
                for edge in graph.edges(node) {
                    let target = edge.target();
                    match color[target.index()] {
                        Color::Gray => violations.push(Violation {
                            kind: "cycle".into(),
                            relation: *edge.weight(),
                            message: format!(
                                "predicate {pred} forms a cycle through {} -> {}",
                                graph[node], graph[target]
                            ),
                        }),
                        Color::White => stack.push((target, false)),
                        Color::Black => {}
                    }
                }
            }
        }
    }

    violations.sort_by_key(|v| v.relation);
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ident::RelationId;
    use crate::relation::ExtractorKind;

    fn relation(id: u64, pred: &str, subj: u64, obj: u64) -> Relation {
        Relation {
            id: RelationId::new(id).unwrap(),
            subj: EntityId::new(subj).unwrap(),
            pred: pred.into(),
            obj: EntityId::new(obj).unwrap(),
            confidence: 0.8,
            evidence: vec![],
            extractor: ExtractorKind::Regex,
        }
    }

    #[test]
    fn symmetric_predicates_are_marked() {
        assert!(rule_for("married_to").symmetric);
        assert!(rule_for("friends_with").symmetric);
        assert!(!rule_for("parent_of").symmetric);
    }

    #[test]
    fn antisymmetric_pairs_point_at_each_other() {
        assert_eq!(rule_for("parent_of").inverse_of, Some("child_of"));
        assert_eq!(rule_for("child_of").inverse_of, Some("parent_of"));
    }

    #[test]
    fn unknown_predicate_gets_permissive_default() {
        let rule = rule_for("serenaded");
        assert!(!rule.symmetric);
        assert!(rule.inverse_of.is_none());
        assert!(rule.type_constraint.is_none());
    }

    #[test]
    fn type_allowed_unifies_gpe_and_place() {
        assert!(type_allowed(PLACE, EntityType::Gpe));
        assert!(type_allowed(PLACE, EntityType::Place));
        assert!(!type_allowed(PLACE, EntityType::Person));
        assert!(type_allowed(PLACE, EntityType::Unknown));
    }

    #[test]
    fn cycle_is_detected() {
        let relations = vec![
            relation(1, "parent_of", 1, 2),
            relation(2, "parent_of", 2, 3),
            relation(3, "parent_of", 3, 1),
        ];
        let violations = detect_cycles(&relations);
        assert!(!violations.is_empty());
        assert_eq!(violations[0].kind, "cycle");
    }

    #[test]
    fn acyclic_chain_is_clean() {
        let relations = vec![
            relation(1, "parent_of", 1, 2),
            relation(2, "parent_of", 2, 3),
        ];
        assert!(detect_cycles(&relations).is_empty());
    }

    #[test]
    fn symmetric_predicates_are_not_cycle_checked() {
        let relations = vec![
            relation(1, "married_to", 1, 2),
            relation(2, "married_to", 2, 1),
        ];
        assert!(detect_cycles(&relations).is_empty());
    }
}
