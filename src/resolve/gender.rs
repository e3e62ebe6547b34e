//! Gender inference for minted entities.
//!
//! Three evidence tiers, strongest first: first-name lists, title patterns
//! on the entity's surfaces, and relational context patterns in the text
//! ("his wife Z", "their son, X") that bind names to a gender.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::entity::{Entity, EntityType, Gender};
use crate::ident::EntityId;

static MALE_FIRST_NAMES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "james", "john", "robert", "michael", "william", "david", "richard", "joseph", "thomas",
        "charles", "daniel", "matthew", "anthony", "mark", "donald", "steven", "paul", "andrew",
        "joshua", "kenneth", "kevin", "brian", "george", "edward", "ronald", "timothy", "jason",
        "jeffrey", "ryan", "jacob", "gary", "nicholas", "eric", "jonathan", "stephen", "larry",
        "justin", "scott", "brandon", "benjamin", "samuel", "frank", "gregory", "raymond",
        "alexander", "patrick", "jack", "dennis", "jerry", "henry", "peter", "walter", "harold",
        "arthur", "albert", "frederick", "howard", "hugh", "oliver", "oscar", "philip", "ralph",
        "simon", "theodore", "victor", "vincent", "harry", "ron", "bill", "jim", "tom", "bob",
    ]
    .into_iter()
    .collect()
});

static FEMALE_FIRST_NAMES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "mary", "patricia", "jennifer", "linda", "elizabeth", "barbara", "susan", "jessica",
        "sarah", "karen", "nancy", "lisa", "margaret", "betty", "sandra", "ashley", "dorothy",
        "kimberly", "emily", "donna", "michelle", "carol", "amanda", "melissa", "deborah",
        "stephanie", "rebecca", "laura", "sharon", "cynthia", "kathleen", "amy", "shirley",
        "angela", "helen", "anna", "brenda", "pamela", "nicole", "ruth", "katherine", "virginia",
        "catherine", "christine", "samantha", "rachel", "janet", "emma", "carolyn", "maria",
        "heather", "diane", "julie", "joyce", "victoria", "kelly", "christina", "joan", "evelyn",
        "lauren", "judith", "olivia", "frances", "martha", "cheryl", "megan", "andrea", "hannah",
        "jacqueline", "ann", "jean", "alice", "kathryn", "grace", "rose", "lucy", "clara",
        "agnes", "edith", "jane",
    ]
    .into_iter()
    .collect()
});

/// Title words implying a male referent.
const MALE_TITLES: &[&str] = &[
    "mr", "sir", "king", "lord", "prince", "duke", "baron", "count", "emperor", "father",
    "brother", "master", "uncle",
];

/// Title words implying a female referent.
const FEMALE_TITLES: &[&str] = &[
    "mrs", "ms", "miss", "lady", "queen", "princess", "duchess", "baroness", "countess",
    "empress", "mother", "sister", "dame", "madam", "madame", "aunt",
];

/// Relational context patterns binding the captured name to a gender.
static CONTEXT_PATTERNS: LazyLock<Vec<(Regex, Gender)>> = LazyLock::new(|| {
    let make = |p: &str| Regex::new(p).expect("gender context pattern");
    vec![
        (
            make(r"(?:their|the couple's|his|her) son,?\s+([A-Z][a-z]+)"),
            Gender::Male,
        ),
        (
            make(r"(?:their|the couple's|his|her) daughter,?\s+([A-Z][a-z]+)"),
            Gender::Female,
        ),
        (make(r"his wife,?\s+([A-Z][a-z]+)"), Gender::Female),
        (make(r"her husband,?\s+([A-Z][a-z]+)"), Gender::Male),
        (
            make(r"(?:his|her|their) brother,?\s+([A-Z][a-z]+)"),
            Gender::Male,
        ),
        (
            make(r"(?:his|her|their) sister,?\s+([A-Z][a-z]+)"),
            Gender::Female,
        ),
        (make(r"([A-Z][a-z]+),? his wife"), Gender::Female),
        (make(r"([A-Z][a-z]+),? her husband"), Gender::Male),
        (make(r"(?:his|her) mother,?\s+([A-Z][a-z]+)"), Gender::Female),
        (make(r"(?:his|her) father,?\s+([A-Z][a-z]+)"), Gender::Male),
    ]
});

/// Gender from a first-name lookup.
pub fn from_first_name(name: &str) -> Gender {
    let lower = name.to_lowercase();
    if MALE_FIRST_NAMES.contains(lower.as_str()) {
        Gender::Male
    } else if FEMALE_FIRST_NAMES.contains(lower.as_str()) {
        Gender::Female
    } else {
        Gender::Unknown
    }
}

/// Gender from a title prefix on a surface form.
pub fn from_title(surface: &str) -> Gender {
    let first = surface
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_end_matches('.')
        .to_lowercase();
    if MALE_TITLES.contains(&first.as_str()) {
        Gender::Male
    } else if FEMALE_TITLES.contains(&first.as_str()) {
        Gender::Female
    } else {
        Gender::Unknown
    }
}

/// Infer genders for all PERSON entities.
///
/// Name lists first, then title patterns on any alias, then context
/// patterns learned from the document text. Existing non-unknown genders
/// are kept.
pub fn infer_genders(entities: &mut [Entity], text: &str) {
    // Context bindings: first-capitalized-name -> gender.
    let mut context_bindings: HashMap<String, Gender> = HashMap::new();
    for (pattern, gender) in CONTEXT_PATTERNS.iter() {
        for captures in pattern.captures_iter(text) {
            if let Some(name) = captures.get(1) {
                context_bindings
                    .entry(name.as_str().to_lowercase())
                    .or_insert(*gender);
            }
        }
    }

    for entity in entities.iter_mut() {
        if entity.entity_type.effective() != EntityType::Person
            && entity.entity_type != EntityType::Unknown
        {
            continue;
        }
        if entity.gender != Gender::Unknown {
            continue;
        }

        let first_name = entity
            .canonical
            .split_whitespace()
            .find(|w| {
                !crate::wordlists::TITLE_PREFIXES
                    .contains(w.trim_end_matches('.').to_lowercase().as_str())
            })
            .unwrap_or("");
        let by_name = from_first_name(first_name);
        if by_name != Gender::Unknown {
            entity.gender = by_name;
            continue;
        }

        let by_title = entity
            .aliases
            .iter()
            .map(|a| from_title(a))
            .find(|g| *g != Gender::Unknown);
        if let Some(gender) = by_title {
            entity.gender = gender;
            continue;
        }

        for word in entity.canonical.split_whitespace() {
            if let Some(gender) = context_bindings.get(&word.to_lowercase()) {
                entity.gender = *gender;
                break;
            }
        }
    }
}

/// Look up an entity's gender by id in a slice.
pub fn gender_of(entities: &[Entity], id: EntityId) -> Gender {
    entities
        .iter()
        .find(|e| e.id == id)
        .map(|e| e.gender)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityMeta;
    use std::collections::BTreeSet;

    fn person(id: u64, canonical: &str) -> Entity {
        let mut aliases = BTreeSet::new();
        aliases.insert(canonical.to_string());
        Entity {
            id: EntityId::new(id).unwrap(),
            entity_type: EntityType::Person,
            canonical: canonical.into(),
            aliases,
            confidence: 0.8,
            attrs: Default::default(),
            meta: EntityMeta::default(),
            booknlp_id: None,
            eid: None,
            mention_count: Some(1),
            gender: Gender::Unknown,
        }
    }

    #[test]
    fn first_name_list_wins() {
        let mut entities = vec![person(1, "James Hawkins")];
        infer_genders(&mut entities, "");
        assert_eq!(entities[0].gender, Gender::Male);
    }

    #[test]
    fn title_pattern_applies() {
        let mut entities = vec![person(1, "Mrs. Weasley")];
        infer_genders(&mut entities, "");
        assert_eq!(entities[0].gender, Gender::Female);
    }

    #[test]
    fn context_pattern_binds_gender() {
        let mut entities = vec![person(1, "Wren")];
        infer_genders(&mut entities, "They doted on their daughter, Wren, every day.");
        assert_eq!(entities[0].gender, Gender::Female);
    }

    #[test]
    fn his_wife_pattern() {
        let mut entities = vec![person(1, "Maren")];
        infer_genders(&mut entities, "He arrived with his wife Maren at dusk.");
        assert_eq!(entities[0].gender, Gender::Female);
    }

    #[test]
    fn unknown_without_evidence() {
        let mut entities = vec![person(1, "Zyx")];
        infer_genders(&mut entities, "Zyx stood at the window.");
        assert_eq!(entities[0].gender, Gender::Unknown);
    }

    #[test]
    fn existing_gender_is_kept() {
        let mut entities = vec![person(1, "Quill")];
        entities[0].gender = Gender::Female;
        infer_genders(&mut entities, "His brother Quill arrived.");
        assert_eq!(entities[0].gender, Gender::Female);
    }
}
