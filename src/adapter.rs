//! External parser and coreference adapter contracts.
//!
//! The engine consumes a `parse(text) -> sentences[]` capability and an
//! optional `coref(text) -> links[]` capability. Wire types mirror the
//! external services' JSON schemas; POS and dependency values follow
//! Universal Dependencies labels. A built-in fallback tokenizer supplies
//! tokens when no external parser is wired, so extraction degrades instead
//! of failing when `baseline_required` is off.

use serde::{Deserialize, Serialize};

use crate::error::AdapterError;
use crate::segment::{self, Sentence};
use crate::wordlists;

/// One token with syntactic annotations, per the parser wire format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Token {
    /// Token index within its sentence.
    pub i: usize,
    /// Surface text.
    pub text: String,
    /// Lemma (fallback: lowercased surface).
    pub lemma: String,
    /// Universal Dependencies coarse POS tag (NOUN, PROPN, VERB, ...).
    pub pos: String,
    /// Fine-grained tag, if the parser provides one.
    #[serde(default)]
    pub tag: String,
    /// Dependency relation to the head (nsubj, compound, ...).
    #[serde(default)]
    pub dep: String,
    /// Index of the syntactic head within the sentence.
    #[serde(default)]
    pub head: usize,
    /// NER label (PERSON, ORG, GPE, ...), empty when untagged.
    #[serde(default)]
    pub ent: String,
    /// Character offset of the token start in the document.
    pub start: usize,
    /// Character offset one past the token end.
    pub end: usize,
}

impl Token {
    /// Nominal POS: noun or proper noun.
    pub fn is_nominal(&self) -> bool {
        self.pos == "NOUN" || self.pos == "PROPN"
    }

    /// Whether the surface begins with an uppercase letter.
    pub fn is_capitalized(&self) -> bool {
        self.text.chars().next().is_some_and(char::is_uppercase)
    }
}

/// A parsed sentence: segmenter offsets plus the parser's token stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedSentence {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub tokens: Vec<Token>,
}

/// The external syntactic parser capability.
pub trait ParserAdapter {
    /// Parse the full document into sentences with annotated tokens.
    fn parse(&self, text: &str) -> Result<Vec<ParsedSentence>, AdapterError>;
}

// ---------------------------------------------------------------------------
// Coreference adapter
// ---------------------------------------------------------------------------

/// How a coref mention refers to its entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorefMethod {
    Pronoun,
    Title,
    Nominal,
    Quote,
    Coordination,
    Appositive,
}

/// One mention inside a coref link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorefMention {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub sentence_index: usize,
    #[serde(rename = "type", default)]
    pub mention_type: Option<String>,
}

/// One external coreference link: mention surface to entity id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalCorefLink {
    pub mention: CorefMention,
    pub entity_id: u64,
    pub confidence: f32,
    pub method: CorefMethod,
}

/// A quoted span with an optional attributed speaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteSpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub speaker_entity_id: Option<u64>,
    pub sentence_index: usize,
}

/// Full output of the coreference capability.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorefOutput {
    #[serde(default)]
    pub links: Vec<ExternalCorefLink>,
    #[serde(default)]
    pub quotes: Vec<QuoteSpan>,
}

/// The external coreference capability.
pub trait CorefAdapter {
    fn coref(&self, text: &str) -> Result<CorefOutput, AdapterError>;
}

// ---------------------------------------------------------------------------
// Contract validation
// ---------------------------------------------------------------------------

/// Validate parser output against the adapter contract.
///
/// Checks sentence and token offsets against the document length, token
/// index order, and head references. A violation is reported with the
/// offending sentence index.
pub fn validate_sentences(
    text: &str,
    sentences: &[ParsedSentence],
) -> Result<(), AdapterError> {
    let len = text.chars().count();
    for (si, sentence) in sentences.iter().enumerate() {
        if sentence.start >= sentence.end || sentence.end > len {
            return Err(AdapterError::ContractViolation {
                sentence_index: si,
                detail: format!(
                    "sentence span [{}, {}) out of range for text of length {len}",
                    sentence.start, sentence.end
                ),
            });
        }
        for (ti, token) in sentence.tokens.iter().enumerate() {
            if token.i != ti {
                return Err(AdapterError::ContractViolation {
                    sentence_index: si,
                    detail: format!("token index {} at position {ti} out of order", token.i),
                });
            }
            if token.start >= token.end || token.end > len {
                return Err(AdapterError::ContractViolation {
                    sentence_index: si,
                    detail: format!(
                        "token span [{}, {}) out of range",
                        token.start, token.end
                    ),
                });
            }
            if token.head >= sentence.tokens.len() {
                return Err(AdapterError::ContractViolation {
                    sentence_index: si,
                    detail: format!(
                        "token head {} past sentence end ({} tokens)",
                        token.head,
                        sentence.tokens.len()
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Drop coref links whose offsets do not fit the document. Invalid links
/// are ignored, not fatal.
pub fn sanitize_coref(text: &str, mut output: CorefOutput) -> CorefOutput {
    let len = text.chars().count();
    output.links.retain(|link| {
        let ok = link.mention.start < link.mention.end && link.mention.end <= len;
        if !ok {
            tracing::warn!(
                start = link.mention.start,
                end = link.mention.end,
                "ignoring coref link with invalid offsets"
            );
        }
        ok
    });
    output.quotes.retain(|q| q.start < q.end && q.end <= len);
    output
}

// ---------------------------------------------------------------------------
// Fallback tokenizer
// ---------------------------------------------------------------------------

/// Built-in parser used when no external parser is wired.
///
/// Segments with the rule-based segmenter and tokenizes on whitespace and
/// punctuation with heuristic POS assignment. Dependency and NER fields are
/// left empty; downstream stages treat their absence as weak evidence.
#[derive(Debug, Default)]
pub struct FallbackParser;

impl ParserAdapter for FallbackParser {
    fn parse(&self, text: &str) -> Result<Vec<ParsedSentence>, AdapterError> {
        Ok(segment::segment(text)
            .into_iter()
            .map(|s| tokenize_sentence(&s))
            .collect())
    }
}

fn tokenize_sentence(sentence: &Sentence) -> ParsedSentence {
    let mut tokens = Vec::new();
    let chars: Vec<char> = sentence.text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        if c.is_alphanumeric() {
            // Words keep internal apostrophes and hyphens ("couldn't", "well-known").
            while i < chars.len()
                && (chars[i].is_alphanumeric()
                    || ((chars[i] == '\'' || chars[i] == '\u{2019}' || chars[i] == '-')
                        && i + 1 < chars.len()
                        && chars[i + 1].is_alphanumeric()))
            {
                i += 1;
            }
        } else {
            i += 1;
        }
        let mut surface: String = chars[start..i].iter().collect();
        // Abbreviation periods stay attached ("Mr.", "J.", "St.") so title
        // and initial handling sees whole tokens.
        if i < chars.len()
            && chars[i] == '.'
            && (segment::is_known_abbreviation(&surface)
                || (surface.chars().count() == 1
                    && surface.chars().next().is_some_and(char::is_uppercase)))
        {
            surface.push('.');
            i += 1;
        }
        let idx = tokens.len();
        let pos = heuristic_pos(&surface, idx == 0);
        tokens.push(Token {
            i: idx,
            lemma: surface.to_lowercase(),
            pos,
            start: sentence.start + start,
            end: sentence.start + i,
            text: surface,
            ..Token::default()
        });
    }
    ParsedSentence {
        text: sentence.text.clone(),
        start: sentence.start,
        end: sentence.end,
        tokens,
    }
}

/// Assign a coarse UD POS tag from surface shape and the closed-class sets.
fn heuristic_pos(surface: &str, sentence_initial: bool) -> String {
    let lower = surface.to_lowercase();
    if surface.chars().all(|c| !c.is_alphanumeric()) {
        return "PUNCT".into();
    }
    if surface.chars().all(|c| c.is_ascii_digit() || c == '-') {
        return "NUM".into();
    }
    if wordlists::PRONOUNS.contains(lower.as_str()) {
        return "PRON".into();
    }
    if wordlists::DETERMINERS.contains(lower.as_str()) {
        return "DET".into();
    }
    if wordlists::MODALS.contains(lower.as_str()) {
        return "AUX".into();
    }
    if wordlists::PREPOSITIONS.contains(lower.as_str()) {
        return "ADP".into();
    }
    if wordlists::COORDINATORS.contains(lower.as_str()) {
        return "CCONJ".into();
    }
    if wordlists::SUBORDINATORS.contains(lower.as_str()) {
        return "SCONJ".into();
    }
    if wordlists::WH_WORDS.contains(lower.as_str()) {
        return "PRON".into();
    }
    if wordlists::INTERJECTIONS.contains(lower.as_str()) {
        return "INTJ".into();
    }
    if wordlists::DISCOURSE_MARKERS.contains(lower.as_str()) {
        return "ADV".into();
    }
    if is_common_verb(&lower) {
        return "VERB".into();
    }
    if is_common_adverb(&lower) || (lower.ends_with("ly") && lower.len() > 4) {
        return "ADV".into();
    }
    if surface.chars().next().is_some_and(char::is_uppercase) && !sentence_initial {
        return "PROPN".into();
    }
    if sentence_initial && surface.chars().next().is_some_and(char::is_uppercase) {
        // Sentence-initial capitalization is ambiguous; stay nominal unless
        // the word is a known verb form.
        return "NOUN".into();
    }
    "NOUN".into()
}

/// Wraps another parser and stamps NER labels from a fixed lexicon.
///
/// Useful for dataset wiring and tests where the external parser's NER layer
/// is unavailable: any token whose surface matches a lexicon entry receives
/// the mapped label (and PROPN, since every lexicon entry names something).
pub struct LexiconNerParser<P> {
    inner: P,
    labels: std::collections::HashMap<String, String>,
}

impl<P: ParserAdapter> LexiconNerParser<P> {
    pub fn new<I, S>(inner: P, entries: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        Self {
            inner,
            labels: entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<P: ParserAdapter> ParserAdapter for LexiconNerParser<P> {
    fn parse(&self, text: &str) -> Result<Vec<ParsedSentence>, AdapterError> {
        let mut sentences = self.inner.parse(text)?;
        for sentence in &mut sentences {
            for token in &mut sentence.tokens {
                if let Some(label) = self.labels.get(&token.text) {
                    token.ent = label.clone();
                    if token.is_capitalized() {
                        token.pos = "PROPN".into();
                    }
                }
            }
        }
        Ok(sentences)
    }
}

/// High-frequency verb forms for the fallback tagger.
fn is_common_verb(lower: &str) -> bool {
    const VERBS: &[&str] = &[
        "is", "are", "was", "were", "be", "been", "being", "am", "has", "have", "had", "do",
        "does", "did", "said", "says", "say", "went", "go", "goes", "gone", "came", "come",
        "comes", "saw", "see", "sees", "seen", "took", "take", "takes", "taken", "made", "make",
        "makes", "got", "get", "gets", "knew", "know", "knows", "known", "thought", "think",
        "thinks", "told", "tell", "tells", "asked", "ask", "asks", "left", "leave", "leaves",
        "met", "meet", "meets", "married", "marry", "marries", "lived", "live", "lives", "died",
        "die", "dies", "gave", "give", "gives", "given", "found", "find", "finds", "felt",
        "feel", "feels", "looked", "look", "looks", "walked", "walk", "walks", "ran", "run",
        "runs", "spoke", "speak", "speaks", "wrote", "write", "writes", "written", "became",
        "become", "becomes", "moved", "move", "moves", "arrived", "arrive", "arrives",
        "returned", "return", "returns", "promised", "promise", "promises", "attacked",
        "attack", "attacks", "learned", "learn", "learns", "taught", "teach", "teaches",
        "crossed", "cross", "crosses", "slept", "sleep", "sleeps", "smiled", "smile", "smiles",
        "waved", "wave", "waves", "followed", "follow", "follows", "trusted", "trust",
        "trusts", "settled", "settle", "settles", "entered", "enter", "enters", "glared",
        "glare", "glares", "watched", "watch", "watches", "sorted", "sort", "sorts",
        "noticed", "notice", "notices", "spotted", "stared", "stare", "turned", "turn",
        "turns", "talked", "talk", "talks", "laughed", "laugh", "laughs", "rode", "ride",
        "rides", "sailed", "sail", "sails", "reached", "reach", "reaches", "stood", "stand",
        "stands", "sat", "sit", "sits", "paused", "pause", "waited", "wait", "waits",
        "greeted", "greet", "greets", "inspected", "inspect", "slipped", "slip", "barked",
        "bark", "barks", "loved", "love", "loves", "hated", "hate", "hates", "feared", "fear",
        "fears", "served", "serve", "serves", "ruled", "rule", "rules", "led", "lead",
        "leads", "joined", "join", "joins", "belonged", "belong", "belongs", "studied",
        "study", "studies", "worked", "work", "works", "headed", "commanded", "command",
        "commands", "governed", "govern", "governs", "founded", "built", "build", "builds",
        "remained", "remain", "remains", "stayed", "stay", "stays", "travels", "travel",
        "traveled", "travelled", "journeyed", "betrayed", "betray", "betrays", "killed",
        "kill", "kills", "fought", "fight", "fights", "whispered", "whisper", "shouted",
        "shout", "cried", "cry", "muttered", "mutter", "replied", "reply", "answered",
        "answer", "glanced", "glance", "doted", "wheeled", "forgot", "forget", "forgets",
        "fled", "flee", "departed", "depart", "departs", "sided", "wed", "befriended",
        "befriend", "despised", "despise", "loathed", "loathe", "adored", "adore",
        "dreaded", "dread", "swore", "swear", "betrothed", "embraced", "embrace",
        "reunited", "reunite", "argued", "argue", "argues", "quarreled", "quarrel",
        "opened", "opens", "closed", "closes", "thrived", "thrive", "announced", "announce",
        "declared", "declare",
    ];
    VERBS.contains(&lower)
}

/// High-frequency adverbs and particles without the `-ly` suffix.
fn is_common_adverb(lower: &str) -> bool {
    const ADVERBS: &[&str] = &[
        "too", "also", "again", "away", "back", "here", "there", "now", "soon", "often",
        "never", "always", "still", "just", "even", "only", "already", "almost", "perhaps",
        "maybe", "together", "apart", "twice", "once", "ahead", "north", "south", "east",
        "west", "home",
    ];
    ADVERBS.contains(&lower)
}
