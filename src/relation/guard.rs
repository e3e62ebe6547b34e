//! Post-extraction guardrails.
//!
//! Centralizes the pruning rules every extractor used to carry separately:
//! the married/parent exclusion, the sibling-appositive exclusion, and the
//! final type-compatibility check against the vocabulary registry.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::adapter::ParsedSentence;
use crate::entity::EntityType;
use crate::ident::EntityId;
use crate::resolve::ResolverContext;

use super::families::NAME;
use super::vocabulary::{rule_for, type_allowed};
use super::{Relation, TypeOverride};

/// "X, the eldest son/daughter/sibling ..." marks X as a sibling, not a
/// parent.
static SIBLING_APPOSITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?P<name>{NAME}),\s+the\s+(?:eldest|oldest|youngest|middle|second)\s+(?:son|daughter|sibling|brother|sister|child)"
    ))
    .expect("sibling apposition pattern")
});

/// Apply all guardrails in place.
pub fn apply(
    relations: &mut Vec<Relation>,
    resolver: &ResolverContext<'_>,
    sentences: &[ParsedSentence],
    overrides: &[TypeOverride],
) {
    married_parent_exclusion(relations);
    sibling_apposition_exclusion(relations, resolver, sentences);
    type_compatibility(relations, resolver, overrides);
}

/// If `married_to(a, b)` exists, drop `parent_of` and `child_of` for that
/// pair in either direction.
fn married_parent_exclusion(relations: &mut Vec<Relation>) {
    let married: HashSet<(EntityId, EntityId)> = relations
        .iter()
        .filter(|r| r.pred == "married_to")
        .flat_map(|r| [(r.subj, r.obj), (r.obj, r.subj)])
        .collect();
    relations.retain(|r| {
        if r.pred != "parent_of" && r.pred != "child_of" {
            return true;
        }
        !married.contains(&(r.subj, r.obj))
    });
}

/// Drop `parent_of(X, _)` whenever a sibling-apposition cue names X.
fn sibling_apposition_exclusion(
    relations: &mut Vec<Relation>,
    resolver: &ResolverContext<'_>,
    sentences: &[ParsedSentence],
) {
    let mut siblings: HashSet<EntityId> = HashSet::new();
    for sentence in sentences {
        for captures in SIBLING_APPOSITION.captures_iter(&sentence.text) {
            if let Some(id) = resolver.find_by_surface(&captures["name"]) {
                siblings.insert(id);
            }
        }
    }
    if siblings.is_empty() {
        return;
    }
    relations.retain(|r| !(r.pred == "parent_of" && siblings.contains(&r.subj)));
}

/// Drop relations whose argument types clash with the predicate's registry
/// constraint after final typing (pattern-guard overrides included).
fn type_compatibility(
    relations: &mut Vec<Relation>,
    resolver: &ResolverContext<'_>,
    overrides: &[TypeOverride],
) {
    let final_type = |id: EntityId| -> EntityType {
        overrides
            .iter()
            .find(|o| o.entity_id == id)
            .map(|o| o.entity_type)
            .or_else(|| resolver.entity(id).map(|e| e.entity_type))
            .unwrap_or(EntityType::Unknown)
    };
    relations.retain(|r| {
        let Some(constraint) = rule_for(&r.pred).type_constraint else {
            return true;
        };
        type_allowed(constraint.from, final_type(r.subj))
            && type_allowed(constraint.to, final_type(r.obj))
    });
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
            confidence: 0.85,
            evidence: vec![],
            extractor: ExtractorKind::Regex,
        }
    }

    #[test]
    fn married_pair_cannot_be_parent_child() {
        let mut relations = vec![
            relation(1, "married_to", 1, 2),
            relation(2, "married_to", 2, 1),
            relation(3, "parent_of", 1, 2),
            relation(4, "child_of", 2, 1),
            relation(5, "parent_of", 1, 3),
        ];
        married_parent_exclusion(&mut relations);
        assert!(relations.iter().all(|r| {
            !(r.pred == "parent_of" && r.subj.get() == 1 && r.obj.get() == 2)
        }));
        assert!(relations.iter().all(|r| r.pred != "child_of"));
        // Unrelated parenthood survives.
        assert!(
            relations
                .iter()
                .any(|r| r.pred == "parent_of" && r.obj.get() == 3)
        );
    }

    #[test]
    fn sibling_apposition_regex_matches() {
        let captures = SIBLING_APPOSITION
            .captures("Wren Tarly, the eldest daughter of the house, rode ahead.")
            .unwrap();
        assert_eq!(&captures["name"], "Wren Tarly");
    }
}
