//! Corpus processing: many documents into one global graph.
//!
//! Document-level extraction has no cross-document dependencies and runs
//! embarrassingly parallel under rayon. The global graph is the only shared
//! resource; documents merge into it sequentially (in corpus order) so
//! identical inputs produce identical outputs.

use rayon::prelude::*;

use crate::adapter::ParserAdapter;
use crate::cancel::CancelToken;
use crate::config::ExtractionConfig;
use crate::error::FabulaResult;
use crate::graph::GlobalKnowledgeGraph;
use crate::pipeline::chunk;
use crate::pipeline::{DocumentPipeline, ExtractionResult};
use crate::relation::vocabulary::Violation;

/// One corpus input document.
#[derive(Debug, Clone)]
pub struct CorpusDocument {
    pub id: String,
    pub text: String,
}

/// Everything a corpus run produces.
pub struct CorpusOutput {
    pub graph: GlobalKnowledgeGraph,
    pub results: Vec<ExtractionResult>,
    pub violations: Vec<Violation>,
}

/// Event-order stride between documents, so corpus order concatenates
/// document-sequence order with per-document order.
const DOC_ORDER_STRIDE: u64 = 1_000_000;

/// Process a corpus: parallel per-document extraction, sequential merge.
pub fn process_corpus<P: ParserAdapter + Sync>(
    config: &ExtractionConfig,
    parser: Option<&P>,
    documents: &[CorpusDocument],
    cancel: &CancelToken,
) -> FabulaResult<CorpusOutput> {
    let results: Vec<FabulaResult<ExtractionResult>> = documents
        .par_iter()
        .enumerate()
        .map(|(index, document)| {
            let mut pipeline = DocumentPipeline::new(config);
            if let Some(p) = parser {
                pipeline = pipeline.with_parser(p);
            }
            chunk::extract_document(
                &pipeline,
                config,
                &document.id,
                &document.text,
                cancel,
                index as u64 * DOC_ORDER_STRIDE,
                None,
            )
        })
        .collect();

    let mut extracted = Vec::with_capacity(results.len());
    for result in results {
        extracted.push(result?);
    }

    let graph = GlobalKnowledgeGraph::new(
        config.soft_merge_confidence,
        config.hard_merge_confidence,
    );
    for result in &extracted {
        graph
            .add_document(result)
            .map_err(crate::error::FabulaError::Graph)?;
    }
    let violations = graph.check_constraints();

    tracing::info!(
        documents = extracted.len(),
        entities = graph.entity_count(),
        relations = graph.relation_count(),
        violations = violations.len(),
        "corpus processing complete"
    );

    Ok(CorpusOutput {
        graph,
        results: extracted,
        violations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{FallbackParser, LexiconNerParser};

    fn parser() -> LexiconNerParser<FallbackParser> {
        LexiconNerParser::new(
            FallbackParser,
            [
                ("Aria".to_string(), "PERSON".to_string()),
                ("Elias".to_string(), "PERSON".to_string()),
                ("Preston".to_string(), "PERSON".to_string()),
            ],
        )
    }

    #[test]
    fn corpus_merges_across_documents() {
        let documents = vec![
            CorpusDocument {
                id: "a".into(),
                text: "Aria met Elias at the harbor. Aria smiled at Elias.".into(),
            },
            CorpusDocument {
                id: "b".into(),
                text: "Aria traveled to Meridian Ridge. Preston followed Aria north.".into(),
            },
        ];
        let config = ExtractionConfig::default();
        let p = parser();
        let output =
            process_corpus(&config, Some(&p), &documents, &CancelToken::new()).unwrap();

        assert_eq!(output.results.len(), 2);
        let aria = output.graph.query(&crate::graph::GraphQuery {
            canonical: Some("aria".into()),
            ..Default::default()
        });
        assert_eq!(aria.len(), 1, "Aria merges across documents");
        assert_eq!(aria[0].documents.len(), 2);
    }

    #[test]
    fn event_order_respects_document_sequence() {
        let documents = vec![
            CorpusDocument {
                id: "a".into(),
                text: "Aria traveled to Meridian Ridge. Aria waved at Elias.".into(),
            },
            CorpusDocument {
                id: "b".into(),
                text: "Preston traveled to Meridian Ridge. Preston met Aria there.".into(),
            },
        ];
        let config = ExtractionConfig::default();
        let p = parser();
        let output =
            process_corpus(&config, Some(&p), &documents, &CancelToken::new()).unwrap();

        let first_doc_max = output.results[0]
            .events
            .iter()
            .map(|e| e.order_index)
            .max()
            .unwrap_or(0);
        let second_doc_min = output.results[1]
            .events
            .iter()
            .map(|e| e.order_index)
            .min()
            .unwrap_or(u64::MAX);
        assert!(
            first_doc_max < second_doc_min,
            "document order must be monotone: {first_doc_max} vs {second_doc_min}"
        );
    }
}
