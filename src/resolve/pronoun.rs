//! Pronoun constraint tables and confidence decay.
//!
//! Gender and number constraints per pronoun family, the grammatical case
//! split used by the sentence-start dispatch, and the distance decay curve
//! for mid-sentence scans.

use crate::entity::{Entity, EntityType, Gender};

/// Grammatical case of a pronoun, as far as dispatch cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PronounCase {
    Subject,
    Object,
    Possessive,
    Reflexive,
}

/// Resolution context for one pronoun occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PronounSite {
    /// First token of its sentence.
    SentenceStart,
    /// Anywhere else in the sentence.
    SentenceMid,
    /// A pre-built pronoun map covers this position.
    PatternMatch,
    /// Possessive determiner position ("their house").
    Possessive,
}

/// What a pronoun requires of its antecedent.
#[derive(Debug, Clone, Copy)]
pub struct PronounConstraint {
    /// Required gender (`Unknown` = no requirement).
    pub gender: Gender,
    /// Antecedent must be (effectively) a PERSON.
    pub requires_person: bool,
    /// Antecedent must NOT be a PERSON.
    pub requires_non_person: bool,
    /// Plural reference: may bind a set of antecedents.
    pub plural: bool,
    pub case: PronounCase,
}

/// Constraint for a pronoun surface, or `None` for non-pronouns.
pub fn constraint_for(pronoun: &str) -> Option<PronounConstraint> {
    let p = pronoun.to_lowercase();
    let c = |gender, requires_person, requires_non_person, plural, case| PronounConstraint {
        gender,
        requires_person,
        requires_non_person,
        plural,
        case,
    };
    Some(match p.as_str() {
        "he" => c(Gender::Male, true, false, false, PronounCase::Subject),
        "him" => c(Gender::Male, true, false, false, PronounCase::Object),
        "his" => c(Gender::Male, true, false, false, PronounCase::Possessive),
        "himself" => c(Gender::Male, true, false, false, PronounCase::Reflexive),
        "she" => c(Gender::Female, true, false, false, PronounCase::Subject),
        "her" => c(Gender::Female, true, false, false, PronounCase::Possessive),
        "hers" => c(Gender::Female, true, false, false, PronounCase::Possessive),
        "herself" => c(Gender::Female, true, false, false, PronounCase::Reflexive),
        "it" => c(Gender::Unknown, false, true, false, PronounCase::Subject),
        "its" => c(Gender::Unknown, false, true, false, PronounCase::Possessive),
        "itself" => c(Gender::Unknown, false, true, false, PronounCase::Reflexive),
        "they" => c(Gender::Unknown, false, false, true, PronounCase::Subject),
        "them" => c(Gender::Unknown, false, false, true, PronounCase::Object),
        "their" => c(Gender::Unknown, false, false, true, PronounCase::Possessive),
        "theirs" => c(Gender::Unknown, false, false, true, PronounCase::Possessive),
        "themselves" => c(Gender::Unknown, false, false, true, PronounCase::Reflexive),
        _ => return None,
    })
}

/// Whether `entity` can serve as the antecedent under `constraint`.
pub fn satisfies(entity: &Entity, constraint: &PronounConstraint) -> bool {
    let effective = entity.entity_type.effective();
    if constraint.requires_person
        && effective != EntityType::Person
        && entity.entity_type != EntityType::Unknown
    {
        return false;
    }
    if constraint.requires_non_person && effective == EntityType::Person {
        return false;
    }
    if constraint.gender != Gender::Unknown && !entity.gender.compatible(constraint.gender) {
        return false;
    }
    true
}

/// Mid-sentence confidence decay: `max(0.5, 0.75 - distance/2000 * 0.25)`.
pub fn distance_confidence(distance: usize) -> f32 {
    (0.75 - distance as f32 / 2000.0 * 0.25).max(0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityMeta;
    use crate::ident::EntityId;
    use std::collections::BTreeSet;

    fn entity(entity_type: EntityType, gender: Gender) -> Entity {
        Entity {
            id: EntityId::new(1).unwrap(),
            entity_type,
            canonical: "X".into(),
            aliases: BTreeSet::from(["X".to_string()]),
            confidence: 0.8,
            attrs: Default::default(),
            meta: EntityMeta::default(),
            booknlp_id: None,
            eid: None,
            mention_count: None,
            gender,
        }
    }

    #[test]
    fn he_requires_male_or_unknown() {
        let constraint = constraint_for("he").unwrap();
        assert!(satisfies(&entity(EntityType::Person, Gender::Male), &constraint));
        assert!(satisfies(&entity(EntityType::Person, Gender::Unknown), &constraint));
        assert!(!satisfies(&entity(EntityType::Person, Gender::Female), &constraint));
    }

    #[test]
    fn she_rejects_male_antecedent() {
        let constraint = constraint_for("she").unwrap();
        assert!(!satisfies(&entity(EntityType::Person, Gender::Male), &constraint));
    }

    #[test]
    fn it_requires_non_person() {
        let constraint = constraint_for("it").unwrap();
        assert!(satisfies(&entity(EntityType::Place, Gender::Unknown), &constraint));
        assert!(!satisfies(&entity(EntityType::Person, Gender::Male), &constraint));
    }

    #[test]
    fn they_accepts_anything() {
        let constraint = constraint_for("they").unwrap();
        assert!(satisfies(&entity(EntityType::Person, Gender::Female), &constraint));
        assert!(satisfies(&entity(EntityType::Org, Gender::Unknown), &constraint));
        assert!(constraint.plural);
    }

    #[test]
    fn non_pronoun_has_no_constraint() {
        assert!(constraint_for("castle").is_none());
    }

    #[test]
    fn decay_floors_at_half() {
        assert!((distance_confidence(0) - 0.75).abs() < 1e-6);
        assert!((distance_confidence(1000) - 0.625).abs() < 1e-6);
        assert!((distance_confidence(10_000) - 0.5).abs() < 1e-6);
    }
}
