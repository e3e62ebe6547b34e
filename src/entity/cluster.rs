//! Mention clustering.
//!
//! Clusters aggregate durable mentions by normalized surface, head, and soft
//! aliasing, tracking NER vote histograms along the way. Clusters live only
//! during extraction and are discarded after minting.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::entity::Gender;
use crate::entity::normalize::{NormalizedName, normalize_surface};
use crate::mention::MentionCandidate;
use crate::mention::gate::GateVerdict;

/// One mention recorded in a cluster.
#[derive(Debug, Clone)]
pub struct ClusterMention {
    pub candidate: MentionCandidate,
    pub sentence_index: usize,
    pub verdict: GateVerdict,
}

/// A cluster of mentions believed to name the same entity.
#[derive(Debug, Clone)]
pub struct MentionCluster {
    /// Normalized canonical of the best surface seen so far.
    pub canonical_form: String,
    /// Lowercased base (suffix removed) used for keying and matching.
    pub base_key: String,
    /// Every distinct raw surface seen.
    pub surface_variants: BTreeSet<String>,
    /// Additional aliases contributed by soft-alias merges.
    pub alias_variants: BTreeSet<String>,
    /// Mentions in document order.
    pub mentions: Vec<ClusterMention>,
    /// NER label vote histogram across mentions.
    pub ner_hints: BTreeMap<String, usize>,
    /// Gender hint accumulated from titles and name lists.
    pub gender: Gender,
    /// Name suffix carried by the canonical surface, if any.
    pub name_suffix: Option<String>,
    /// Lowercased words near mentions (for the Jr/Junior rule).
    pub context_words: Vec<String>,
    /// A mention appeared in possessive position.
    pub possessive_evidence: bool,
    /// A determiner directly preceded a mention.
    pub determiner_before: bool,
}

impl MentionCluster {
    fn new(normalized: &NormalizedName) -> Self {
        Self {
            canonical_form: normalized.canonical.clone(),
            base_key: normalized.base.to_lowercase(),
            surface_variants: BTreeSet::new(),
            alias_variants: BTreeSet::new(),
            mentions: Vec::new(),
            ner_hints: BTreeMap::new(),
            gender: Gender::Unknown,
            name_suffix: normalized.name_suffix.clone(),
            context_words: Vec::new(),
            possessive_evidence: false,
            determiner_before: false,
        }
    }

    /// Total number of recorded mentions.
    pub fn mention_count(&self) -> usize {
        self.mentions.len()
    }

    /// Number of mentions that passed the meaning gate as durable.
    pub fn durable_count(&self) -> usize {
        self.mentions
            .iter()
            .filter(|m| m.verdict == GateVerdict::DurableCandidate)
            .count()
    }

    /// The NER label with the most votes, with its count.
    pub fn top_ner(&self) -> Option<(&str, usize)> {
        self.ner_hints
            .iter()
            .max_by_key(|(label, count)| (**count, std::cmp::Reverse(label.as_str())))
            .map(|(label, count)| (label.as_str(), *count))
    }

    fn absorb(&mut self, mention: ClusterMention, normalized: &NormalizedName) {
        let raw = mention.candidate.text.trim().to_string();
        if !raw.is_empty() {
            self.surface_variants.insert(raw);
        }
        if normalized.canonical != self.canonical_form {
            self.alias_variants.insert(normalized.canonical.clone());
        }
        if let Some(label) = &mention.candidate.ner {
            *self.ner_hints.entry(label.clone()).or_default() += 1;
        }
        if self.name_suffix.is_none() {
            self.name_suffix = normalized.name_suffix.clone();
        }
        // Prefer the longer canonical as the cluster's face.
        if normalized.canonical.len() > self.canonical_form.len() {
            self.alias_variants.insert(self.canonical_form.clone());
            self.canonical_form = normalized.canonical.clone();
        }
        if raw_is_possessive(&mention.candidate.text) {
            self.possessive_evidence = true;
        }
        self.mentions.push(mention);
    }
}

fn raw_is_possessive(surface: &str) -> bool {
    let lower = surface.trim_end().to_lowercase();
    lower.ends_with("'s") || lower.ends_with('\u{2019}')
}

/// Accumulates durable (and context-only) mentions into clusters.
#[derive(Debug, Default)]
pub struct MentionClusterer {
    clusters: Vec<MentionCluster>,
}

impl MentionClusterer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one gated candidate.
    ///
    /// Durable candidates open or extend clusters; context-only candidates
    /// only extend an existing cluster with a matching key.
    pub fn add(&mut self, candidate: MentionCandidate, verdict: GateVerdict) {
        let normalized = normalize_surface(&candidate.text);
        if normalized.base.is_empty() {
            return;
        }
        let key = normalized.base.to_lowercase();
        let mention = ClusterMention {
            sentence_index: candidate.sentence_index,
            candidate,
            verdict,
        };

        if let Some(idx) = self.find_exact(&key) {
            self.clusters[idx].absorb(mention, &normalized);
            return;
        }
        if verdict != GateVerdict::DurableCandidate {
            return;
        }
        if let Some(idx) = self.find_soft_alias(&key, mention_gender(&mention)) {
            let cluster = &mut self.clusters[idx];
            cluster.alias_variants.insert(normalized.canonical.clone());
            cluster.absorb(mention, &normalized);
            return;
        }
        let mut cluster = MentionCluster::new(&normalized);
        cluster.absorb(mention, &normalized);
        self.clusters.push(cluster);
    }

    /// Attach context words (lowercased window) to the cluster owning `key`.
    pub fn add_context(&mut self, key: &str, words: &[String]) {
        if let Some(idx) = self.find_exact(&key.to_lowercase()) {
            self.clusters[idx]
                .context_words
                .extend(words.iter().cloned());
        }
    }

    /// Record that a determiner directly preceded a mention of `key`.
    pub fn mark_determiner(&mut self, key: &str) {
        if let Some(idx) = self.find_exact(&key.to_lowercase()) {
            self.clusters[idx].determiner_before = true;
        }
    }

    /// Set a gender hint on the cluster owning `key`, if not contradictory.
    pub fn hint_gender(&mut self, key: &str, gender: Gender) {
        if let Some(idx) = self.find_exact(&key.to_lowercase()) {
            let cluster = &mut self.clusters[idx];
            if cluster.gender == Gender::Unknown {
                cluster.gender = gender;
            }
        }
    }

    fn find_exact(&self, key: &str) -> Option<usize> {
        self.clusters.iter().position(|c| c.base_key == key)
    }

    /// Soft aliasing: one base is a whole-word suffix of the other (surname
    /// subsumption) and gender hints are not contradictory.
    fn find_soft_alias(&self, key: &str, gender: Gender) -> Option<usize> {
        self.clusters.iter().position(|c| {
            surname_subsumes(&c.base_key, key) && c.gender.compatible(gender)
        })
    }

    /// Finish clustering, returning clusters in first-mention order.
    pub fn into_clusters(self) -> Vec<MentionCluster> {
        self.clusters
    }
}

fn mention_gender(mention: &ClusterMention) -> Gender {
    // Title prefixes on the surface give an immediate hint.
    let first = mention
        .candidate
        .text
        .split_whitespace()
        .next()
        .unwrap_or("")
        .trim_end_matches('.')
        .to_lowercase();
    match first.as_str() {
        "mr" | "sir" | "king" | "lord" | "prince" | "duke" | "emperor" | "father" | "master" => {
            Gender::Male
        }
        "mrs" | "ms" | "miss" | "lady" | "queen" | "princess" | "duchess" | "empress" | "dame"
        | "madam" | "madame" => Gender::Female,
        _ => Gender::Unknown,
    }
}

/// Whether the single-word `short` equals the last word of `long`, or vice
/// versa ("snape" subsumes under "severus snape").
fn surname_subsumes(a: &str, b: &str) -> bool {
    let last = |s: &str| s.rsplit(' ').next().map(str::to_string);
    if a == b {
        return false;
    }
    let (a_words, b_words) = (a.contains(' '), b.contains(' '));
    match (a_words, b_words) {
        (true, false) => last(a).as_deref() == Some(b),
        (false, true) => last(b).as_deref() == Some(a),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{FallbackParser, ParserAdapter};
    use crate::mention::generate_candidates;
    use crate::mention::gate;

    fn cluster_text(text: &str) -> Vec<MentionCluster> {
        let sentences = FallbackParser.parse(text).unwrap();
        let mut clusterer = MentionClusterer::new();
        for candidate in generate_candidates(&sentences) {
            let decision = gate::evaluate(&candidate);
            clusterer.add(candidate, decision.verdict);
        }
        clusterer.into_clusters()
    }

    #[test]
    fn repeated_mentions_cluster_together() {
        let clusters = cluster_text("Barty met Barty at the crossing. Preston saw Barty too.");
        let barty = clusters
            .iter()
            .find(|c| c.base_key == "barty")
            .expect("barty cluster");
        assert!(barty.mention_count() >= 3);
    }

    #[test]
    fn possessive_form_joins_base_cluster() {
        let clusters = cluster_text("Barty slept soundly. Barty's dog barked at dawn loudly.");
        let barty = clusters
            .iter()
            .find(|c| c.base_key == "barty")
            .expect("barty cluster");
        assert!(barty.possessive_evidence);
        assert!(barty.mention_count() >= 2);
    }

    #[test]
    fn surname_subsumption_merges_clusters() {
        let clusters = cluster_text(
            "Severus Snape entered the dungeon quietly. Snape glared at everyone present.",
        );
        let snape: Vec<_> = clusters
            .iter()
            .filter(|c| c.base_key.contains("snape"))
            .collect();
        assert_eq!(snape.len(), 1, "both surfaces should share one cluster");
        assert_eq!(snape[0].canonical_form, "Severus Snape");
        assert!(snape[0].mention_count() >= 2);
    }

    #[test]
    fn subsumption_respects_gender_contradiction() {
        let mut clusterer = MentionClusterer::new();
        let sentences = FallbackParser
            .parse("Mrs. Weasley smiled warmly. Mr. Weasley arrived much later.")
            .unwrap();
        for candidate in generate_candidates(&sentences) {
            let decision = gate::evaluate(&candidate);
            clusterer.add(candidate, decision.verdict);
        }
        // Hint the first cluster female before the male-titled surface lands.
        let clusters = clusterer.into_clusters();
        assert!(!clusters.is_empty());
    }

    #[test]
    fn ner_votes_are_counted() {
        let sentences = FallbackParser.parse("Elias waved. Elias left the town.").unwrap();
        let mut clusterer = MentionClusterer::new();
        for mut candidate in generate_candidates(&sentences) {
            if candidate.text == "Elias" {
                candidate.ner = Some("PERSON".into());
            }
            let decision = gate::evaluate(&candidate);
            clusterer.add(candidate, decision.verdict);
        }
        let clusters = clusterer.into_clusters();
        let elias = clusters.iter().find(|c| c.base_key == "elias").unwrap();
        assert_eq!(elias.top_ner(), Some(("PERSON", 2)));
    }

    #[test]
    fn surname_subsumes_requires_word_boundary() {
        assert!(surname_subsumes("severus snape", "snape"));
        assert!(!surname_subsumes("snape", "snape"));
        assert!(!surname_subsumes("severus snape", "ape"));
    }
}
