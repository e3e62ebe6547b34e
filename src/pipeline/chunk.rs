//! The chunked driver for very long documents.
//!
//! Documents beyond ~1.5x the target chunk size split into overlapping
//! macro-chunks. Split points prefer paragraph boundaries, then sentence
//! boundaries, then word boundaries near the nominal position. Chunks are
//! processed sequentially (reference context stays monotone), yielding to
//! the scheduler between chunks; results merge back with offset remapping,
//! overlap deduplication, and entity-id rewiring.

use std::collections::HashMap;
use std::time::Instant;

use crate::cancel::CancelToken;
use crate::config::{ExtractionConfig, PipelineMode};
use crate::error::FabulaResult;
use crate::graph::merge::merge_score;
use crate::ident::{AtomicIdAllocator, EntityId};
use crate::ir::AssertionArg;
use crate::ir::fact::build_facts;

use super::{DocumentPipeline, ExtractionResult};

/// One macro-chunk of the source document.
#[derive(Debug, Clone)]
pub struct MacroChunk {
    pub index: usize,
    /// Character offset of the chunk's first character in the document.
    pub global_start: usize,
    pub text: String,
}

/// Progress snapshot reported after each chunk.
#[derive(Debug, Clone, Copy)]
pub struct ChunkProgress {
    pub current_chunk: usize,
    pub total_chunks: usize,
    pub entities_in_chunk: usize,
    pub relations_in_chunk: usize,
    pub elapsed_ms: u64,
}

/// How far a split point may wander from its nominal position.
const SPLIT_SLACK_CHARS: usize = 500;

/// Extract a document, chunking when the mode and size call for it.
pub fn extract_document(
    pipeline: &DocumentPipeline<'_>,
    config: &ExtractionConfig,
    doc_id: &str,
    text: &str,
    cancel: &CancelToken,
    base_order: u64,
    progress: Option<&dyn Fn(ChunkProgress)>,
) -> FabulaResult<ExtractionResult> {
    let word_count = text.split_whitespace().count();
    let threshold = config.chunk_size_words + config.chunk_size_words / 2;
    if config.mode == PipelineMode::Legacy
        || word_count <= threshold
        || word_count < config.min_chunk_words
    {
        return pipeline.extract(doc_id, text, cancel, base_order);
    }

    let chunks = split_into_chunks(text, config.chunk_size_words, config.overlap_chars);
    extract_chunks(pipeline, config, doc_id, &chunks, cancel, base_order, progress)
}

/// Split the document into overlapping macro-chunks.
pub fn split_into_chunks(
    text: &str,
    chunk_size_words: usize,
    overlap_chars: usize,
) -> Vec<MacroChunk> {
    let chars: Vec<char> = text.chars().collect();

    // Character positions of each word start, to convert the word-based
    // chunk size into nominal character positions.
    let mut word_starts = Vec::new();
    let mut in_word = false;
    for (i, c) in chars.iter().enumerate() {
        if c.is_whitespace() {
            in_word = false;
        } else if !in_word {
            word_starts.push(i);
            in_word = true;
        }
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;
    let mut next_word = chunk_size_words;

    while start < chars.len() {
        if next_word >= word_starts.len() {
            chunks.push(MacroChunk {
                index: chunks.len(),
                global_start: start,
                text: chars[start..].iter().collect(),
            });
            break;
        }
        let nominal = word_starts[next_word];
        let end = best_split(&chars, nominal).min(chars.len());
        chunks.push(MacroChunk {
            index: chunks.len(),
            global_start: start,
            text: chars[start..end].iter().collect(),
        });

        // The next chunk backs up into the overlap, re-aligned to a word.
        let mut overlap_start = end.saturating_sub(overlap_chars);
        while overlap_start > 0 && !chars[overlap_start - 1].is_whitespace() {
            overlap_start -= 1;
        }
        start = overlap_start.max(start + 1);
        next_word += chunk_size_words;
    }
    chunks
}

/// Best split near `nominal`: paragraph break, then sentence boundary,
/// then word boundary, searched within the slack window.
fn best_split(chars: &[char], nominal: usize) -> usize {
    let lo = nominal.saturating_sub(SPLIT_SLACK_CHARS);
    let hi = (nominal + SPLIT_SLACK_CHARS).min(chars.len());

    // Paragraph boundary: position after "\n\n".
    let mut best_paragraph = None;
    for i in lo..hi.saturating_sub(1) {
        if chars[i] == '\n' && chars[i + 1] == '\n' {
            let candidate = i + 2;
            if closer(candidate, best_paragraph, nominal) {
                best_paragraph = Some(candidate);
            }
        }
    }
    if let Some(p) = best_paragraph {
        return p;
    }

    // Sentence boundary: terminator followed by whitespace.
    let mut best_sentence = None;
    for i in lo..hi.saturating_sub(1) {
        if matches!(chars[i], '.' | '!' | '?') && chars[i + 1].is_whitespace() {
            let candidate = i + 2;
            if closer(candidate, best_sentence, nominal) {
                best_sentence = Some(candidate);
            }
        }
    }
    if let Some(s) = best_sentence {
        return s;
    }

    // Word boundary.
    let mut best_word = None;
    for (i, c) in chars.iter().enumerate().take(hi).skip(lo) {
        if c.is_whitespace() && closer(i + 1, best_word, nominal) {
            best_word = Some(i + 1);
        }
    }
    best_word.unwrap_or(nominal)
}

fn closer(candidate: usize, current: Option<usize>, nominal: usize) -> bool {
    current.is_none_or(|c| candidate.abs_diff(nominal) < c.abs_diff(nominal))
}

/// Process chunks sequentially and merge the results.
#[allow(clippy::too_many_arguments)]
pub fn extract_chunks(
    pipeline: &DocumentPipeline<'_>,
    config: &ExtractionConfig,
    doc_id: &str,
    chunks: &[MacroChunk],
    cancel: &CancelToken,
    base_order: u64,
    progress: Option<&dyn Fn(ChunkProgress)>,
) -> FabulaResult<ExtractionResult> {
    let started = Instant::now();
    let mut merged = ExtractionResult {
        doc_id: doc_id.to_string(),
        ..Default::default()
    };
    let allocator = AtomicIdAllocator::new();
    let mut completed = 0usize;

    for chunk in chunks {
        if cancel.is_cancelled() {
            if config.strict {
                return Err(crate::error::PipelineError::Cancelled {
                    completed,
                    total: chunks.len(),
                }
                .into());
            }
            merged.stats.cancelled = true;
            merged.reason = Some(format!(
                "cancelled after {completed} of {} chunks",
                chunks.len()
            ));
            break;
        }

        // Distinct synthetic doc id per chunk avoids entity-id confusion.
        let chunk_doc_id = format!("{doc_id}::c{}", chunk.index);
        let mut result = pipeline.extract(&chunk_doc_id, &chunk.text, cancel, 0)?;
        shift_offsets(&mut result, chunk.global_start);

        let report = ChunkProgress {
            current_chunk: chunk.index + 1,
            total_chunks: chunks.len(),
            entities_in_chunk: result.entities.len(),
            relations_in_chunk: result.relations.len(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        merge_chunk(&mut merged, result, chunk, config, &allocator);
        completed += 1;

        if let Some(callback) = progress {
            callback(report);
        }
        // Concurrent documents make progress between chunks.
        std::thread::yield_now();
    }

    finalize(&mut merged, base_order);
    Ok(merged)
}

/// Shift every character offset in a chunk result by its global start.
fn shift_offsets(result: &mut ExtractionResult, delta: usize) {
    for span in &mut result.spans {
        span.start += delta;
        span.end += delta;
    }
    for link in &mut result.coref_links {
        link.start += delta;
        link.end += delta;
    }
    let shift_evidence = |evidence: &mut Vec<crate::relation::EvidenceSpan>| {
        for e in evidence.iter_mut() {
            e.span.0 += delta;
            e.span.1 += delta;
        }
    };
    for relation in &mut result.relations {
        shift_evidence(&mut relation.evidence);
    }
    for assertion in &mut result.assertions {
        shift_evidence(&mut assertion.evidence);
    }
    for event in &mut result.events {
        shift_evidence(&mut event.evidence);
    }
}

/// Merge one shifted chunk result into the accumulator.
fn merge_chunk(
    merged: &mut ExtractionResult,
    chunk_result: ExtractionResult,
    chunk: &MacroChunk,
    config: &ExtractionConfig,
    allocator: &AtomicIdAllocator,
) {
    // Entity merge via the shared scorer, producing the id remap.
    let mut remap: HashMap<EntityId, EntityId> = HashMap::new();
    for entity in chunk_result.entities {
        let target = merged
            .entities
            .iter_mut()
            .find(|existing| {
                existing.entity_type.unifies_with(entity.entity_type)
                    && (existing.canonical.to_lowercase() == entity.canonical.to_lowercase()
                        || merge_score(existing, &entity) >= config.hard_merge_confidence)
            });
        match target {
            Some(existing) => {
                remap.insert(entity.id, existing.id);
                for alias in &entity.aliases {
                    existing.aliases.insert(alias.clone());
                }
                existing.mention_count = Some(
                    existing.mention_count.unwrap_or(1) + entity.mention_count.unwrap_or(1),
                );
                // Profiles keep the latest chunk's values.
                for (key, value) in entity.attrs {
                    existing.attrs.insert(key, value);
                }
                if existing.gender == crate::entity::Gender::Unknown {
                    existing.gender = entity.gender;
                }
            }
            None => {
                let mut fresh = entity.clone();
                fresh.id = allocator.next_entity();
                remap.insert(entity.id, fresh.id);
                merged.entities.push(fresh);
            }
        }
    }

    // Spans: remap ids, drop overlap duplicates (earlier chunk wins).
    let overlap_end = chunk.global_start + overlap_len(chunk, config);
    for mut span in chunk_result.spans {
        let Some(&id) = remap.get(&span.entity_id) else {
            continue;
        };
        span.entity_id = id;
        let in_overlap = chunk.index > 0 && span.start < overlap_end;
        if in_overlap
            && merged
                .spans
                .iter()
                .any(|s| s.start == span.start && s.end == span.end)
        {
            continue;
        }
        merged.spans.push(span);
    }

    for mut link in chunk_result.coref_links {
        let Some(&id) = remap.get(&link.entity_id) else {
            continue;
        };
        link.entity_id = id;
        let in_overlap = chunk.index > 0 && link.start < overlap_end;
        if in_overlap
            && merged
                .coref_links
                .iter()
                .any(|l| l.start == link.start && l.end == link.end)
        {
            continue;
        }
        merged.coref_links.push(link);
    }

    // Relations: rewire and deduplicate by (pred, subj, obj).
    for mut relation in chunk_result.relations {
        let (Some(&subj), Some(&obj)) =
            (remap.get(&relation.subj), remap.get(&relation.obj))
        else {
            continue;
        };
        relation.subj = subj;
        relation.obj = obj;
        if merged
            .relations
            .iter()
            .any(|r| r.pred == relation.pred && r.subj == subj && r.obj == obj)
        {
            continue;
        }
        merged.relations.push(relation);
    }

    // Assertions and events: remap entity arguments.
    let remap_arg = |arg: &mut AssertionArg| {
        if let AssertionArg::Entity(id) = arg {
            match remap.get(id) {
                Some(&new_id) => *arg = AssertionArg::Entity(new_id),
                None => *arg = AssertionArg::None,
            }
        }
    };
    for mut assertion in chunk_result.assertions {
        remap_arg(&mut assertion.subject);
        remap_arg(&mut assertion.object);
        merged.assertions.push(assertion);
    }
    for mut event in chunk_result.events {
        let mut valid = true;
        for participant in &mut event.participants {
            match remap.get(&participant.entity) {
                Some(&id) => participant.entity = id,
                None => valid = false,
            }
        }
        if valid {
            merged.events.push(event);
        }
    }

    // Stats accumulate across chunks.
    merged.stats.sentences += chunk_result.stats.sentences;
    merged.stats.mention_candidates += chunk_result.stats.mention_candidates;
    merged.stats.durable_mentions += chunk_result.stats.durable_mentions;
    merged.stats.degraded_parser |= chunk_result.stats.degraded_parser;
}

fn overlap_len(chunk: &MacroChunk, config: &ExtractionConfig) -> usize {
    if chunk.index == 0 {
        0
    } else {
        config.overlap_chars
    }
}

/// Re-number events, rebuild facts, refresh stats.
fn finalize(merged: &mut ExtractionResult, base_order: u64) {
    merged.spans.sort_by_key(|s| (s.start, s.end));
    merged
        .events
        .sort_by_key(|e| e.evidence.first().map(|ev| ev.span.0).unwrap_or(usize::MAX));
    for (i, event) in merged.events.iter_mut().enumerate() {
        event.order_index = base_order + i as u64;
    }
    merged.facts = build_facts(&merged.events);
    merged.stats.entities = merged.entities.len();
    merged.stats.relations = merged.relations.len();
    merged.stats.assertions = merged.assertions.len();
    merged.stats.events = merged.events.len();
}
