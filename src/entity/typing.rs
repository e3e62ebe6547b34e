//! Entity type classification.
//!
//! A strict decision cascade: Jr/Junior disambiguation, keyword cues, the
//! NER soft prior, attached-only fragment suppression, the person-shape
//! check, and the UNKNOWN fallback. Confidence is coarse and comes from the
//! named table in the configuration.

use std::collections::HashSet;
use std::sync::LazyLock;

use crate::config::ConfidenceTable;
use crate::wordlists;

use super::EntityType;

/// Words that mark an organization by word-boundary scan.
pub static ORG_KEYWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "school", "academy", "university", "college", "institute", "company", "corporation",
        "corp", "inc", "ltd", "bank", "church", "ministry", "council", "guild", "order",
        "brotherhood", "sisterhood", "army", "legion", "guard", "society", "club", "team",
        "house", "firm", "agency", "bureau", "department", "committee", "union", "alliance",
        "federation", "empire", "senate", "parliament", "court", "press", "times", "gazette",
        "hospital", "clinic", "library", "museum", "theater", "theatre", "restaurant", "inn",
        "tavern", "shop", "store", "market",
    ]
    .into_iter()
    .collect()
});

/// Words that mark a place by word-boundary scan.
pub static PLACE_KEYWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "river", "mountain", "mount", "lake", "sea", "ocean", "forest", "wood", "woods",
        "valley", "hill", "hills", "ridge", "creek", "bay", "island", "isle", "desert",
        "plain", "plains", "canyon", "cliff", "beach", "coast", "street", "road", "avenue",
        "lane", "boulevard", "alley", "square", "plaza", "park", "garden", "bridge", "harbor",
        "harbour", "port", "village", "town", "city", "county", "province", "kingdom", "realm",
        "land", "country", "district", "quarter", "castle", "palace", "tower", "keep", "manor",
        "hall", "house", "cottage", "farm", "field", "fields", "grove", "marsh", "swamp",
        "cave", "cavern", "pass", "gate", "station", "crossing",
    ]
    .into_iter()
    .collect()
});

/// Small gazetteer of well-known place names.
pub static PLACE_GAZETTEER: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "london", "paris", "rome", "moscow", "york", "boston", "chicago", "springfield",
        "franklin", "madison", "washington", "jefferson", "lincoln", "england", "france",
        "scotland", "ireland", "america", "europe", "africa", "asia",
    ]
    .into_iter()
    .collect()
});

/// Evidence available to the typing cascade for one name.
#[derive(Debug, Clone, Default)]
pub struct TypeEvidence<'a> {
    /// Normalized base form (suffix removed).
    pub base: &'a str,
    /// Strongest NER label seen across mentions, if any.
    pub ner: Option<&'a str>,
    /// Lowercased words within the +-3 token window of a mention.
    pub context_window: &'a [String],
    /// The surface only ever appears inside longer proper-noun phrases.
    pub attached_only_fragment: bool,
    /// Seen in possessive position ("X's sword").
    pub possessive_evidence: bool,
    /// A determiner directly preceded a mention ("the X").
    pub determiner_before: bool,
}

/// Outcome of the typing cascade.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecision {
    pub entity_type: EntityType,
    pub confidence: f32,
    /// Which rule fired, for diagnostics.
    pub signal: &'static str,
}

/// Map an NER label to an entity type prior.
pub fn ner_prior(label: &str) -> Option<EntityType> {
    match label {
        "PERSON" | "PER" => Some(EntityType::Person),
        "ORG" => Some(EntityType::Org),
        "GPE" => Some(EntityType::Gpe),
        "LOC" | "FAC" => Some(EntityType::Place),
        "EVENT" => Some(EntityType::Event),
        "WORK_OF_ART" => Some(EntityType::Work),
        "PRODUCT" => Some(EntityType::Item),
        "DATE" => Some(EntityType::Date),
        "TIME" => Some(EntityType::Time),
        "NORP" => Some(EntityType::Tribe),
        _ => None,
    }
}

/// Run the typing cascade for one entity.
pub fn classify(evidence: &TypeEvidence<'_>, table: &ConfidenceTable) -> TypeDecision {
    let words: Vec<String> = evidence
        .base
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'').to_lowercase())
        .filter(|w| !w.is_empty())
        .collect();

    // (a) Jr/Junior disambiguation.
    if let Some(decision) = junior_rule(evidence, &words, table) {
        return decision;
    }

    // (b) Keyword cues.
    let org_cue = words.iter().any(|w| ORG_KEYWORDS.contains(w.as_str()));
    let place_cue = words.iter().any(|w| PLACE_KEYWORDS.contains(w.as_str()));
    let gazetteer_hit = words.iter().any(|w| PLACE_GAZETTEER.contains(w.as_str()));

    // "house" and "hall" appear in both lists; an org keyword elsewhere in
    // the name wins, otherwise the place reading stands.
    if org_cue && !place_cue {
        return TypeDecision {
            entity_type: EntityType::Org,
            confidence: table.type_keyword,
            signal: "org_keyword",
        };
    }
    if place_cue && !org_cue {
        let confidence = if gazetteer_hit {
            table.type_gazetteer
        } else {
            table.type_keyword
        };
        return TypeDecision {
            entity_type: EntityType::Place,
            confidence,
            signal: "place_keyword",
        };
    }
    if org_cue && place_cue {
        // Ambiguous head; school-like words outrank geography.
        let school_like = words
            .iter()
            .any(|w| matches!(w.as_str(), "school" | "academy" | "university" | "college"));
        let entity_type = if school_like {
            EntityType::Org
        } else {
            EntityType::Place
        };
        return TypeDecision {
            entity_type,
            confidence: table.type_keyword,
            signal: "mixed_keyword",
        };
    }
    if gazetteer_hit && words.len() == 1 {
        return TypeDecision {
            entity_type: EntityType::Place,
            confidence: table.type_gazetteer,
            signal: "gazetteer",
        };
    }

    // (c) NER soft prior, only while keyword cues are silent.
    let mut tentative = evidence.ner.and_then(ner_prior);

    // (d) Attached-only fragment suppression.
    if evidence.attached_only_fragment && words.len() == 1 {
        return TypeDecision {
            entity_type: EntityType::Unknown,
            confidence: 0.0,
            signal: "attached_only_fragment",
        };
    }

    // (e) PERSON shape check.
    if tentative == Some(EntityType::Person) && !looks_like_person_name(evidence, &words) {
        tentative = None;
    }

    if let Some(entity_type) = tentative {
        return TypeDecision {
            entity_type,
            confidence: table.type_keyword,
            signal: "ner_prior",
        };
    }

    // Possessive evidence suggests a person in narrative prose.
    if evidence.possessive_evidence && looks_like_person_name(evidence, &words) {
        return TypeDecision {
            entity_type: EntityType::Person,
            confidence: table.type_suffix_person,
            signal: "possessive_person",
        };
    }

    // Capitalization heuristic: capitalized, person-shaped names.
    if looks_like_person_name(evidence, &words)
        && evidence
            .base
            .chars()
            .next()
            .is_some_and(char::is_uppercase)
    {
        return TypeDecision {
            entity_type: EntityType::Person,
            confidence: table.type_capitalization,
            signal: "capitalization",
        };
    }

    // (f) Fallback.
    TypeDecision {
        entity_type: EntityType::Unknown,
        confidence: 0.0,
        signal: "fallback",
    }
}

/// The JR rule: `X Jr.` is an ORG (a junior-high school) when the root is a
/// known place and school-context words surround the mention; a PERSON when
/// two or more capitalized tokens precede the suffix without school context.
fn junior_rule(
    evidence: &TypeEvidence<'_>,
    words: &[String],
    table: &ConfidenceTable,
) -> Option<TypeDecision> {
    let last = words.last()?;
    if !matches!(last.as_str(), "jr" | "jr." | "junior") || words.len() < 2 {
        return None;
    }
    let root = &words[..words.len() - 1];
    let root_is_place = root
        .iter()
        .any(|w| PLACE_GAZETTEER.contains(w.as_str()) || PLACE_KEYWORDS.contains(w.as_str()));
    let school_context = evidence
        .context_window
        .iter()
        .any(|w| wordlists::SCHOOL_CONTEXT_WORDS.contains(w.as_str()));

    if root_is_place && school_context {
        return Some(TypeDecision {
            entity_type: EntityType::Org,
            confidence: table.type_keyword,
            signal: "junior_school",
        });
    }

    let capitalized_roots = evidence
        .base
        .split_whitespace()
        .rev()
        .skip(1)
        .filter(|w| w.chars().next().is_some_and(char::is_uppercase))
        .count();
    if capitalized_roots >= 2 && !school_context {
        return Some(TypeDecision {
            entity_type: EntityType::Person,
            confidence: table.type_suffix_person,
            signal: "junior_person",
        });
    }
    None
}

/// Whether the noun-phrase context looks like a person name: capitalization
/// pattern, no blocklisted head, no determiner.
fn looks_like_person_name(evidence: &TypeEvidence<'_>, words: &[String]) -> bool {
    if evidence.determiner_before {
        return false;
    }
    if words
        .last()
        .is_some_and(|w| wordlists::PERSON_HEAD_BLOCKLIST.contains(w.as_str()))
    {
        return false;
    }
    if words.len() > 4 {
        return false;
    }
    evidence
        .base
        .split_whitespace()
        .all(|w| w.chars().next().is_some_and(|c| c.is_uppercase() || c == '\''))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ConfidenceTable {
        ConfidenceTable::default()
    }

    #[test]
    fn org_keyword_wins_over_ner() {
        let evidence = TypeEvidence {
            base: "Meridian Academy",
            ner: Some("PERSON"),
            ..Default::default()
        };
        let decision = classify(&evidence, &table());
        assert_eq!(decision.entity_type, EntityType::Org);
        assert_eq!(decision.signal, "org_keyword");
    }

    #[test]
    fn place_keyword_types_place() {
        let evidence = TypeEvidence {
            base: "Meridian Ridge",
            ..Default::default()
        };
        let decision = classify(&evidence, &table());
        assert_eq!(decision.entity_type, EntityType::Place);
    }

    #[test]
    fn junior_school_rule() {
        let window: Vec<String> = ["the", "students", "at"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let evidence = TypeEvidence {
            base: "Franklin Jr.",
            context_window: &window,
            ..Default::default()
        };
        let decision = classify(&evidence, &table());
        assert_eq!(decision.entity_type, EntityType::Org);
        assert_eq!(decision.signal, "junior_school");
    }

    #[test]
    fn junior_person_rule() {
        let evidence = TypeEvidence {
            base: "Martin Eden Jr.",
            ..Default::default()
        };
        let decision = classify(&evidence, &table());
        assert_eq!(decision.entity_type, EntityType::Person);
        assert_eq!(decision.signal, "junior_person");
    }

    #[test]
    fn ner_prior_applies_when_keywords_silent() {
        let evidence = TypeEvidence {
            base: "Elias",
            ner: Some("PERSON"),
            ..Default::default()
        };
        let decision = classify(&evidence, &table());
        assert_eq!(decision.entity_type, EntityType::Person);
    }

    #[test]
    fn attached_only_fragment_is_unknown() {
        let evidence = TypeEvidence {
            base: "Ridge",
            attached_only_fragment: true,
            ..Default::default()
        };
        let decision = classify(&evidence, &table());
        assert_eq!(decision.entity_type, EntityType::Unknown);
        assert_eq!(decision.signal, "attached_only_fragment");
    }

    #[test]
    fn determiner_blocks_person_reading() {
        let evidence = TypeEvidence {
            base: "Stranger",
            ner: Some("PERSON"),
            determiner_before: true,
            ..Default::default()
        };
        let decision = classify(&evidence, &table());
        assert_ne!(decision.entity_type, EntityType::Person);
    }

    #[test]
    fn blocklisted_head_fails_person_check() {
        let evidence = TypeEvidence {
            base: "Students",
            ner: Some("PERSON"),
            ..Default::default()
        };
        let decision = classify(&evidence, &table());
        assert_ne!(decision.entity_type, EntityType::Person);
    }

    #[test]
    fn capitalized_name_defaults_to_person() {
        let evidence = TypeEvidence {
            base: "Preston",
            ..Default::default()
        };
        let decision = classify(&evidence, &table());
        assert_eq!(decision.entity_type, EntityType::Person);
        assert_eq!(decision.signal, "capitalization");
    }
}
