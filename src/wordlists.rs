//! Shared closed-class vocabulary.
//!
//! The fixed, finite grammatical sets consulted by the meaning gate, the
//! fallback tokenizer, and the reference resolver. These sets are enumerated
//! here in full; no stage adds ad-hoc members.

use std::collections::HashSet;
use std::sync::LazyLock;

/// Personal, possessive, and reflexive pronouns.
pub static PRONOUNS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "i", "me", "my", "mine", "myself", "we", "us", "our", "ours", "ourselves", "you", "your",
        "yours", "yourself", "yourselves", "he", "him", "his", "himself", "she", "her", "hers",
        "herself", "it", "its", "itself", "they", "them", "their", "theirs", "themselves", "one",
        "oneself",
    ]
    .into_iter()
    .collect()
});

/// Wh-words (interrogatives and relatives).
pub static WH_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "who", "whom", "whose", "what", "which", "when", "where", "why", "how", "whoever",
        "whatever", "whichever", "wherever", "whenever",
    ]
    .into_iter()
    .collect()
});

/// Discourse markers and connective adverbs.
pub static DISCOURSE_MARKERS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "however", "therefore", "meanwhile", "moreover", "furthermore", "nevertheless",
        "nonetheless", "anyway", "besides", "instead", "otherwise", "thus", "hence",
        "consequently", "accordingly", "indeed", "well", "now", "then", "also",
    ]
    .into_iter()
    .collect()
});

/// Interjections.
pub static INTERJECTIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "oh", "ah", "ouch", "wow", "alas", "hey", "hi", "hello", "hmm", "huh", "oops", "ugh",
        "yes", "no", "yeah", "nah", "please", "thanks",
    ]
    .into_iter()
    .collect()
});

/// Modal verbs.
pub static MODALS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "can", "could", "may", "might", "must", "shall", "should", "will", "would", "ought",
    ]
    .into_iter()
    .collect()
});

/// Determiners and articles.
pub static DETERMINERS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "the", "a", "an", "this", "that", "these", "those", "each", "every", "either", "neither",
        "some", "any", "all", "both", "no", "another", "such",
    ]
    .into_iter()
    .collect()
});

/// Prepositions.
pub static PREPOSITIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "in", "on", "at", "by", "for", "with", "about", "against", "between", "into", "through",
        "during", "before", "after", "above", "below", "to", "from", "up", "down", "out", "of", "off",
        "over", "under", "near", "across", "along", "around", "behind", "beneath", "beside",
        "beyond", "inside", "outside", "toward", "towards", "upon", "within", "without",
        "despite", "among", "amid", "per", "via",
    ]
    .into_iter()
    .collect()
});

/// Coordinating conjunctions.
pub static COORDINATORS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    ["and", "but", "or", "nor", "for", "so", "yet"].into_iter().collect()
});

/// Subordinating conjunctions.
pub static SUBORDINATORS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "although", "though", "because", "since", "unless", "until", "while", "whereas", "if",
        "that", "whether", "once", "whenever", "wherever", "as",
    ]
    .into_iter()
    .collect()
});

/// Role nouns licensing definite-description resolution ("the captain").
pub static ROLE_NOUNS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "president", "king", "queen", "prince", "princess", "emperor", "empress", "duke",
        "duchess", "lord", "lady", "captain", "general", "colonel", "major", "sergeant",
        "admiral", "commander", "lieutenant", "senator", "governor", "mayor", "judge", "doctor",
        "professor", "teacher", "principal", "headmaster", "headmistress", "director", "chief",
        "chairman", "chairwoman", "minister", "chancellor", "ambassador", "bishop", "priest",
        "wizard", "witch", "knight", "baron", "baroness", "count", "countess", "sheriff",
        "detective", "inspector", "officer", "company", "firm", "school", "village", "town",
        "city", "castle", "kingdom",
    ]
    .into_iter()
    .collect()
});

/// Group-placeholder phrases that are intentionally never resolved.
pub static GROUP_PLACEHOLDERS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "the family", "the group", "the couple", "the pair", "the crowd", "the others",
        "everyone", "everybody", "someone", "somebody", "anyone", "anybody", "no one", "nobody",
        "people", "they", "them", "their", "we", "us", "our",
    ]
    .into_iter()
    .collect()
});

/// Honorific and rank titles recognized as name prefixes.
pub static TITLE_PREFIXES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "mr", "mrs", "ms", "miss", "dr", "prof", "professor", "president", "king", "queen",
        "prince", "princess", "sir", "dame", "lord", "lady", "captain", "capt", "general", "gen",
        "colonel", "col", "major", "maj", "sergeant", "sgt", "admiral", "commander", "cmdr",
        "lieutenant", "lt", "senator", "sen", "governor", "gov", "mayor", "judge", "bishop",
        "father", "reverend", "rev", "master", "madam", "madame", "duke", "duchess", "baron",
        "baroness", "count", "countess", "emperor", "empress",
    ]
    .into_iter()
    .collect()
});

/// Heads that disqualify a single-token span from being a PERSON entity.
pub static PERSON_HEAD_BLOCKLIST: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "students", "kids", "people", "children", "men", "women", "folks", "others", "family",
        "group", "crowd", "team", "side", "thing", "things", "stuff", "way", "time", "day",
        "night", "morning", "year", "place", "home", "door", "room", "hand", "eyes", "voice",
        "face", "moment", "words", "everyone", "everybody",
    ]
    .into_iter()
    .collect()
});

/// School-context words used by the Jr/Junior disambiguation rule.
pub static SCHOOL_CONTEXT_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "student", "students", "teacher", "teachers", "principal", "school", "class",
        "classes", "classroom", "hall", "cafeteria", "gym", "campus", "grade", "graders",
        "homeroom", "locker", "lockers", "pupils", "semester", "attend", "attended", "attends",
        "enrolled",
    ]
    .into_iter()
    .collect()
});

/// Whether a single lowercase token belongs to any closed class.
pub fn is_closed_class(word: &str) -> bool {
    PRONOUNS.contains(word)
        || WH_WORDS.contains(word)
        || DISCOURSE_MARKERS.contains(word)
        || INTERJECTIONS.contains(word)
        || MODALS.contains(word)
        || DETERMINERS.contains(word)
        || PREPOSITIONS.contains(word)
        || COORDINATORS.contains(word)
        || SUBORDINATORS.contains(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pronouns_are_closed_class() {
        assert!(is_closed_class("he"));
        assert!(is_closed_class("themselves"));
    }

    #[test]
    fn open_class_words_are_not() {
        assert!(!is_closed_class("castle"));
        assert!(!is_closed_class("ran"));
    }

    #[test]
    fn titles_are_stored_lowercase_without_period() {
        assert!(TITLE_PREFIXES.contains("mr"));
        assert!(TITLE_PREFIXES.contains("president"));
        assert!(!TITLE_PREFIXES.contains("Mr."));
    }

    #[test]
    fn role_nouns_cover_both_person_and_org_roles() {
        assert!(ROLE_NOUNS.contains("president"));
        assert!(ROLE_NOUNS.contains("company"));
    }
}
