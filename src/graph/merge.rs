//! Entity merge scoring.
//!
//! The Jaccard-plus-rules scorer behind both macro-chunk merging and the
//! cross-document global graph. Scores are confidences in [0, 1]; the
//! caller compares them against the soft and hard merge thresholds.

use std::collections::HashSet;

use crate::entity::{Entity, EntityType};
use crate::resolve::nickname::are_full_names_equivalent;

use super::org_keyword_in;

/// Tokens ignored by the Jaccard comparison.
const STOP_WORDS: &[&str] = &["the", "of", "and", "a", "an"];

/// School-name tails dropped when comparing ORG roots.
const SCHOOL_TAILS: &[&str] = &[
    "junior high school",
    "junior high",
    "high school",
    "middle school",
    "elementary school",
    "school",
    "academy",
    "university",
    "college",
    "institute",
];

/// Score two entities for merging. Same effective type required (UNKNOWN
/// unifies with anything; GPE unifies with PLACE).
pub fn merge_score(a: &Entity, b: &Entity) -> f32 {
    if !a.entity_type.unifies_with(b.entity_type) {
        return 0.0;
    }

    let a_canonical = a.canonical.to_lowercase();
    let b_canonical = b.canonical.to_lowercase();

    // PERSON vs ORG shape clash caps hard, whatever else matches.
    if person_org_clash(&a.canonical, &b.canonical) {
        return 0.1;
    }

    if a_canonical == b_canonical {
        return 1.0;
    }

    let a_tokens = content_tokens(&a_canonical);
    let b_tokens = content_tokens(&b_canonical);
    let jaccard = token_jaccard(&a_tokens, &b_tokens);

    let effective = if a.entity_type != EntityType::Unknown {
        a.entity_type.effective()
    } else {
        b.entity_type.effective()
    };

    // PERSON-specific decisions come before the generic caps.
    if effective == EntityType::Person {
        if let Some(score) = person_score(&a.canonical, &b.canonical) {
            return score;
        }
    }

    // ORG-specific: school-name variants match on their roots.
    if effective == EntityType::Org && school_root(&a_canonical) == school_root(&b_canonical) {
        let root = school_root(&a_canonical);
        if !root.is_empty() && root != a_canonical.trim() {
            return 0.95;
        }
    }

    let mut score: f32 = if a_canonical.contains(&b_canonical)
        || b_canonical.contains(&a_canonical)
    {
        if jaccard >= 0.7 { 0.85 } else { 0.6 }
    } else if jaccard >= 0.7 {
        0.80
    } else {
        jaccard
    };

    if jaccard < 0.4 {
        score = score.min((1.5 * jaccard).min(0.6));
    }

    // Length mismatch guard.
    let (long, short) = if a_tokens.len() >= b_tokens.len() {
        (&a_tokens, &b_tokens)
    } else {
        (&b_tokens, &a_tokens)
    };
    if long.len() >= 3 && short.len() <= 2 {
        let shared_surname = long.last() == short.last();
        if !shared_surname {
            score = score.min(0.5);
        }
        let long_text = long.join(" ");
        if org_keyword_in(&long_text) && person_shaped(&short.join(" ")) {
            score = score.min(0.3);
        }
    }

    score.clamp(0.0, 1.0)
}

/// One name carries an ORG/PLACE keyword while the other is person-shaped.
fn person_org_clash(a: &str, b: &str) -> bool {
    (org_keyword_in(&a.to_lowercase()) && person_shaped(b))
        || (org_keyword_in(&b.to_lowercase()) && person_shaped(a))
}

/// Capitalized, short, keyword-free: shaped like a personal name.
pub fn person_shaped(name: &str) -> bool {
    let words: Vec<&str> = name.split_whitespace().collect();
    !words.is_empty()
        && words.len() <= 3
        && words
            .iter()
            .all(|w| w.chars().next().is_some_and(char::is_uppercase))
        && !org_keyword_in(&name.to_lowercase())
}

fn content_tokens(lower: &str) -> Vec<String> {
    lower
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| !w.is_empty() && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

fn token_jaccard(a: &[String], b: &[String]) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a_set: HashSet<&str> = a.iter().map(String::as_str).collect();
    let b_set: HashSet<&str> = b.iter().map(String::as_str).collect();
    let intersection = a_set.intersection(&b_set).count();
    let union = a_set.union(&b_set).count();
    intersection as f32 / union as f32
}

/// PERSON decisions: `None` falls through to the generic path.
fn person_score(a: &str, b: &str) -> Option<f32> {
    let a_words: Vec<&str> = a.split_whitespace().collect();
    let b_words: Vec<&str> = b.split_whitespace().collect();

    if a_words.len() >= 2 && b_words.len() >= 2 {
        if are_full_names_equivalent(a, b) {
            return Some(0.95);
        }
        let a_first = a_words[0].to_lowercase();
        let b_first = b_words[0].to_lowercase();
        let a_last = a_words.last().unwrap().to_lowercase();
        let b_last = b_words.last().unwrap().to_lowercase();
        if a_first == b_first && a_last == b_last {
            return Some(0.95);
        }
        // Different first names never merge.
        if a_first != b_first && a_first.len() >= 2 && b_first.len() >= 2 {
            return Some(0.0);
        }
        return None;
    }

    // Single token against a full name: surname match is strong.
    if a_words.len() == 1 && b_words.len() >= 2 {
        if a_words[0].to_lowercase() == b_words.last().unwrap().to_lowercase() {
            return Some(0.90);
        }
        return None;
    }
    if b_words.len() == 1 && a_words.len() >= 2 {
        if b_words[0].to_lowercase() == a_words.last().unwrap().to_lowercase() {
            return Some(0.90);
        }
        return None;
    }
    None
}

/// Drop a recognized school tail: "franklin junior high school" -> "franklin".
fn school_root(lower: &str) -> String {
    let trimmed = lower.trim();
    for tail in SCHOOL_TAILS {
        if let Some(root) = trimmed.strip_suffix(tail) {
            let root = root.trim();
            if !root.is_empty() {
                return root.to_string();
            }
        }
    }
    trimmed.to_string()
}
