//! Name normalization and suffix extraction.
//!
//! Produces the canonical surface used for clustering and merging: collapsed
//! whitespace, straight quotes, no outer quotes or dashes, no possessive
//! marker, spaced initials, no leading article (with fixed exceptions), and
//! recognized name suffixes split off into their own field.

use std::collections::HashSet;
use std::sync::LazyLock;

use unicode_normalization::UnicodeNormalization;

/// Name suffixes preserved during normalization, lowercased without periods.
static NAME_SUFFIXES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "jr", "sr", "ii", "iii", "iv", "v", "vi", "esq", "md", "phd", "dds", "junior", "senior",
    ]
    .into_iter()
    .collect()
});

/// Leading articles stripped from canonical names.
const LEADING_ARTICLES: &[&str] = &["the", "a", "an"];

/// Names where the leading article is part of the name itself.
static ARTICLE_EXCEPTIONS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    ["the hague", "the bronx", "the gambia", "the shire", "the vatican"]
        .into_iter()
        .collect()
});

/// Result of normalizing a surface form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedName {
    /// Canonical display form (suffix kept, e.g. "Martin Eden Jr.").
    pub canonical: String,
    /// Base form used for matching, with any name suffix removed.
    pub base: String,
    /// The recognized name suffix, if the last word was one.
    pub name_suffix: Option<String>,
}

/// Normalize a raw surface form into its canonical shape.
pub fn normalize_surface(raw: &str) -> NormalizedName {
    let mut s: String = raw.nfc().collect();

    s = straighten_quotes(&s);
    s = collapse_whitespace(&s);
    s = strip_outer_quotes_and_dashes(&s);
    s = strip_possessive(&s);
    s = space_initials(&s);
    s = strip_trailing_punctuation(&s);
    s = strip_leading_article(&s);
    s = strip_trailing_household(&s);
    s = collapse_whitespace(&s);

    let (base, name_suffix) = split_name_suffix(&s);
    NormalizedName {
        canonical: s,
        base,
        name_suffix,
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn straighten_quotes(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect()
}

/// Strip matched outer quote pairs and leading/trailing dashes.
fn strip_outer_quotes_and_dashes(s: &str) -> String {
    let mut out = s.trim().to_string();
    loop {
        let trimmed = out
            .trim_matches(|c: char| c == '-' || c == '\u{2013}' || c == '\u{2014}')
            .trim();
        let mut next = trimmed.to_string();
        for (open, close) in [('"', '"'), ('\'', '\''), ('\u{00AB}', '\u{00BB}')] {
            if next.len() >= 2 && next.starts_with(open) && next.ends_with(close) {
                next = next[open.len_utf8()..next.len() - close.len_utf8()]
                    .trim()
                    .to_string();
            }
        }
        if next == out {
            return out;
        }
        out = next;
    }
}

/// Remove a trailing possessive marker (`'s` or bare `'` after s).
fn strip_possessive(s: &str) -> String {
    let lower = s.to_lowercase();
    if lower.ends_with("'s") {
        s[..s.len() - 2].trim_end().to_string()
    } else if lower.ends_with("s'") {
        s[..s.len() - 1].to_string()
    } else {
        s.to_string()
    }
}

/// Insert spaces after intra-word initial periods: `J.K.Rowling` becomes
/// `J. K. Rowling`.
fn space_initials(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        out.push(c);
        if c == '.'
            && i >= 1
            && chars[i - 1].is_uppercase()
            && (i < 2 || !chars[i - 2].is_alphabetic())
            && chars.get(i + 1).is_some_and(|n| n.is_alphabetic())
        {
            out.push(' ');
        }
    }
    out
}

/// Strip trailing punctuation except a period that closes a recognized
/// suffix ("Jr.", "Esq.").
fn strip_trailing_punctuation(s: &str) -> String {
    let trimmed = s.trim_end_matches([',', ';', ':', '!', '?']);
    if let Some(stripped) = trimmed.strip_suffix('.') {
        let last_word = stripped.rsplit(' ').next().unwrap_or("");
        if NAME_SUFFIXES.contains(last_word.to_lowercase().as_str()) {
            return trimmed.to_string();
        }
        // A period after a bare initial also stays ("Ulysses S.").
        if last_word.chars().count() == 1 {
            return trimmed.to_string();
        }
        return stripped.to_string();
    }
    trimmed.to_string()
}

fn strip_leading_article(s: &str) -> String {
    if ARTICLE_EXCEPTIONS.contains(s.to_lowercase().as_str()) {
        return s.to_string();
    }
    for article in LEADING_ARTICLES {
        let prefix_len = article.len();
        if s.len() > prefix_len + 1
            && s[..prefix_len].eq_ignore_ascii_case(article)
            && s[prefix_len..].starts_with(' ')
        {
            return s[prefix_len + 1..].to_string();
        }
    }
    s.to_string()
}

/// Strip a trailing "house"/"family" when it follows a plain capitalized
/// name ("Potter family" -> "Potter"). A possessive root keeps the word:
/// "Barty's house" names the place, not the household.
fn strip_trailing_household(s: &str) -> String {
    let words: Vec<&str> = s.split(' ').collect();
    if words.len() < 2 {
        return s.to_string();
    }
    let last = words[words.len() - 1].to_lowercase();
    if last != "house" && last != "family" {
        return s.to_string();
    }
    let prev = words[words.len() - 2];
    let prev_is_plain_name =
        prev.chars().next().is_some_and(char::is_uppercase) && !prev.contains('\'');
    if prev_is_plain_name {
        words[..words.len() - 1].join(" ")
    } else {
        s.to_string()
    }
}

/// Split a recognized name suffix off the end of the canonical form.
fn split_name_suffix(s: &str) -> (String, Option<String>) {
    let words: Vec<&str> = s.split(' ').collect();
    if words.len() < 2 {
        return (s.to_string(), None);
    }
    let last = words[words.len() - 1];
    let key = last.trim_end_matches('.').to_lowercase();
    if NAME_SUFFIXES.contains(key.as_str()) {
        (words[..words.len() - 1].join(" "), Some(last.to_string()))
    } else {
        (s.to_string(), None)
    }
}
