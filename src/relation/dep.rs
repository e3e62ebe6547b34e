//! Dependency-path relation patterns.
//!
//! When the external parser supplies dependency arcs, subject-verb-object
//! paths yield relations directly: an `nsubj` child and a `dobj`/`obj`
//! child of a mapped verb. The fallback tokenizer carries no arcs, so this
//! extractor is silent in degraded mode.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::adapter::{ParsedSentence, Token};
use crate::ident::AtomicIdAllocator;
use crate::resolve::ResolverContext;

use super::{
    EvidenceSource, EvidenceSpan, ExtractionOutput, ExtractorKind, Relation,
};

/// Verb lemma to predicate, with symmetry.
static VERB_PREDICATES: LazyLock<HashMap<&'static str, (&'static str, bool)>> =
    LazyLock::new(|| {
        [
            ("marry", ("married_to", true)),
            ("wed", ("married_to", true)),
            ("meet", ("met", true)),
            ("befriend", ("friends_with", true)),
            ("kill", ("killed", false)),
            ("slay", ("killed", false)),
            ("murder", ("killed", false)),
            ("attack", ("attacked", false)),
            ("betray", ("betrayed", false)),
            ("love", ("loves", false)),
            ("fear", ("fears", false)),
            ("hate", ("enemy_of", true)),
            ("see", ("saw", false)),
            ("watch", ("saw", false)),
            ("tell", ("told", false)),
            ("serve", ("serves", false)),
            ("lead", ("leads", false)),
            ("rule", ("rules", false)),
            ("found", ("created", false)),
            ("create", ("created", false)),
            ("build", ("created", false)),
            ("promise", ("promised", false)),
            ("know", ("knows", false)),
        ]
        .into_iter()
        .collect()
    });

const DEP_CONFIDENCE: f32 = 0.80;

/// Extract subject-verb-object relations from dependency arcs.
pub fn run(
    doc_id: &str,
    sentences: &[ParsedSentence],
    resolver: &ResolverContext<'_>,
    allocator: &AtomicIdAllocator,
    output: &mut ExtractionOutput,
) {
    for (sentence_index, sentence) in sentences.iter().enumerate() {
        for (vi, verb) in sentence.tokens.iter().enumerate() {
            if verb.pos != "VERB" {
                continue;
            }
            let Some(&(predicate, symmetric)) =
                VERB_PREDICATES.get(verb.lemma.as_str())
            else {
                continue;
            };

            let subj = child_with_dep(sentence, vi, &["nsubj"]);
            let obj = child_with_dep(sentence, vi, &["dobj", "obj"]);
            let (Some(subj), Some(obj)) = (subj, obj) else {
                continue;
            };

            let subj_surface = expand_compound(sentence, subj);
            let obj_surface = expand_compound(sentence, obj);
            let (Some(s), Some(o)) = (
                resolver.find_by_surface(&subj_surface),
                resolver.find_by_surface(&obj_surface),
            ) else {
                continue;
            };
            if s == o {
                continue;
            }

            let evidence = vec![EvidenceSpan {
                doc_id: doc_id.to_string(),
                span: (sentence.start, sentence.end),
                sentence_index,
                source: EvidenceSource::Dep,
            }];
            output.relations.push(Relation {
                id: allocator.next_relation(),
                subj: s,
                pred: predicate.to_string(),
                obj: o,
                confidence: DEP_CONFIDENCE,
                evidence: evidence.clone(),
                extractor: ExtractorKind::Dep,
            });
            if symmetric {
                output.relations.push(Relation {
                    id: allocator.next_relation(),
                    subj: o,
                    pred: predicate.to_string(),
                    obj: s,
                    confidence: DEP_CONFIDENCE,
                    evidence,
                    extractor: ExtractorKind::Dep,
                });
            }
        }
    }
}

/// The first token whose head is `head_index` with one of the given deps.
fn child_with_dep<'a>(
    sentence: &'a ParsedSentence,
    head_index: usize,
    deps: &[&str],
) -> Option<&'a Token> {
    sentence
        .tokens
        .iter()
        .find(|t| t.head == head_index && t.i != head_index && deps.contains(&t.dep.as_str()))
}

/// Prepend contiguous `compound` children to recover a multi-word name.
fn expand_compound(sentence: &ParsedSentence, token: &Token) -> String {
    let mut parts: Vec<&str> = vec![&token.text];
    let mut i = token.i;
    while i > 0 {
        let prev = &sentence.tokens[i - 1];
        if prev.dep == "compound" && prev.head == token.i {
            parts.insert(0, &prev.text);
            i -= 1;
        } else {
            break;
        }
    }
    parts.join(" ")
}
