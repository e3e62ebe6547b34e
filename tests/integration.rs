//! End-to-end integration tests for the fabula engine.
//!
//! These exercise the full pipeline from raw prose through entities,
//! relations, assertions, events, and the cross-document graph, including
//! the literal extraction scenarios the engine is specified against.

use fabula::adapter::{FallbackParser, LexiconNerParser};
use fabula::cancel::CancelToken;
use fabula::config::ExtractionConfig;
use fabula::corpus::{self, CorpusDocument};
use fabula::entity::EntityType;
use fabula::graph::{GlobalKnowledgeGraph, GraphQuery};
use fabula::ident::EntityId;
use fabula::ir::{AttributionSource, Modality};
use fabula::pipeline::{DocumentPipeline, ExtractionResult};
use fabula::segment::segment;

/// A parser with the NER layer the external baseline would provide.
fn ner_parser(entries: &[(&str, &str)]) -> LexiconNerParser<FallbackParser> {
    LexiconNerParser::new(
        FallbackParser,
        entries.iter().map(|&(a, b)| (a.to_string(), b.to_string())),
    )
}

fn extract_with(text: &str, ner: &[(&str, &str)]) -> ExtractionResult {
    let parser = ner_parser(ner);
    let config = ExtractionConfig::default();
    let pipeline = DocumentPipeline::new(&config).with_parser(&parser);
    pipeline
        .extract("doc", text, &CancelToken::new(), 0)
        .unwrap()
}

fn entity<'a>(result: &'a ExtractionResult, canonical: &str) -> &'a fabula::entity::Entity {
    result
        .entities
        .iter()
        .find(|e| e.canonical == canonical)
        .unwrap_or_else(|| {
            panic!(
                "no entity {canonical:?}; got {:?}",
                result
                    .entities
                    .iter()
                    .map(|e| &e.canonical)
                    .collect::<Vec<_>>()
            )
        })
}

fn has_relation(result: &ExtractionResult, pred: &str, subj: EntityId, obj: EntityId) -> bool {
    result
        .relations
        .iter()
        .any(|r| r.pred == pred && r.subj == subj && r.obj == obj)
}

// ---------------------------------------------------------------------------
// Literal scenarios
// ---------------------------------------------------------------------------

#[test]
fn scenario_self_reference_and_possessive_place() {
    let result = extract_with(
        "Barty met Barty at Barty's house. Preston saw Barty too.",
        &[("Barty", "PERSON"), ("Preston", "PERSON")],
    );

    let barty = entity(&result, "Barty");
    assert_eq!(barty.entity_type, EntityType::Person);
    let preston = entity(&result, "Preston");
    assert_eq!(preston.entity_type, EntityType::Person);

    let house = result
        .entities
        .iter()
        .find(|e| e.canonical.contains("house"))
        .expect("possessive place entity");
    assert_eq!(house.entity_type.effective(), EntityType::Place);

    // met(Barty, Barty) is a self-loop and must have been dropped.
    assert!(
        !has_relation(&result, "met", barty.id, barty.id),
        "self-relation must be dropped"
    );
    // No lives_in from the mere "at X's house" mention.
    assert!(
        !result.relations.iter().any(|r| r.pred == "lives_in"),
        "no residence relation from a bare location mention: {:?}",
        result.relations
    );
}

#[test]
fn scenario_sorted_into_membership() {
    let result = extract_with(
        "Harry and Ron were sorted into Gryffindor.",
        &[("Harry", "PERSON"), ("Ron", "PERSON"), ("Gryffindor", "ORG")],
    );

    let harry = entity(&result, "Harry");
    let ron = entity(&result, "Ron");
    let gryffindor = entity(&result, "Gryffindor");
    assert_eq!(harry.entity_type, EntityType::Person);
    assert_eq!(ron.entity_type, EntityType::Person);
    assert_eq!(gryffindor.entity_type.effective(), EntityType::Org);

    assert!(has_relation(&result, "member_of", harry.id, gryffindor.id));
    assert!(has_relation(&result, "member_of", ron.id, gryffindor.id));
    for relation in result.relations.iter().filter(|r| r.pred == "member_of") {
        assert!(
            (relation.confidence - 0.85).abs() < 1e-6,
            "membership confidence should be 0.85, got {}",
            relation.confidence
        );
    }
}

#[test]
fn scenario_gender_mismatch_blocks_resolution() {
    // "Snape" is not in the first-name lexicon; the male reading comes from
    // the "Mr." title tier, so the gender block generalizes to unseen names.
    let result = extract_with(
        "Mr. Snape was the head of Slytherin. She was also the head of Ravenclaw.",
        &[("Snape", "PERSON"), ("Slytherin", "ORG"), ("Ravenclaw", "ORG")],
    );

    let snape = entity(&result, "Mr. Snape");
    assert_eq!(snape.gender, fabula::entity::Gender::Male);
    let slytherin = result
        .entities
        .iter()
        .find(|e| e.canonical == "Slytherin")
        .expect("Slytherin minted");
    assert!(has_relation(&result, "leads", snape.id, slytherin.id));

    // The second sentence's subject stays unresolved: no leads relation
    // whose object is Ravenclaw, and the assertion is degraded.
    assert!(
        !result.relations.iter().any(|r| {
            r.pred == "leads"
                && result
                    .entities
                    .iter()
                    .any(|e| e.id == r.obj && e.canonical == "Ravenclaw")
        }),
        "she must not resolve to the titled male entity"
    );
    let degraded = result
        .assertions
        .iter()
        .find(|a| a.predicate == "leads" && a.subject.is_surface())
        .expect("unresolved assertion survives with degraded confidence");
    assert!(degraded.confidence.composite < 0.85);
}

#[test]
fn scenario_title_bridging_and_move_event() {
    let result = extract_with(
        "President Biden spoke. The president then left.",
        &[("Biden", "PERSON")],
    );

    let persons: Vec<_> = result
        .entities
        .iter()
        .filter(|e| e.entity_type == EntityType::Person)
        .collect();
    assert_eq!(persons.len(), 1, "one PERSON entity: {persons:?}");
    let biden = persons[0];

    let bridged = result
        .coref_links
        .iter()
        .find(|l| l.mention_text == "the president")
        .expect("definite description resolves via title bridging");
    assert_eq!(bridged.entity_id, biden.id);

    assert!(
        result
            .events
            .iter()
            .any(|e| e.event_type == fabula::ir::EventType::Move
                && e.participants.iter().any(|p| p.entity == biden.id)),
        "a MOVE event for Biden: {:?}",
        result.events
    );
}

#[test]
fn scenario_collective_coref_residence() {
    let result = extract_with(
        "Aria and Elias married. The couple lived in Meridian Ridge.",
        &[("Aria", "PERSON"), ("Elias", "PERSON")],
    );

    let aria = entity(&result, "Aria");
    let elias = entity(&result, "Elias");
    let ridge = entity(&result, "Meridian Ridge");
    assert_eq!(ridge.entity_type.effective(), EntityType::Place);

    assert!(has_relation(&result, "married_to", aria.id, elias.id));
    assert!(has_relation(&result, "married_to", elias.id, aria.id));
    assert!(has_relation(&result, "lives_in", aria.id, ridge.id));
    assert!(has_relation(&result, "lives_in", elias.id, ridge.id));
}

#[test]
fn scenario_rumor_modality() {
    let result = extract_with(
        "It is rumored that Alice betrayed Bob.",
        &[("Alice", "PERSON"), ("Bob", "PERSON")],
    );

    let assertion = result
        .assertions
        .iter()
        .find(|a| a.predicate == "betrayed")
        .expect("betrayal assertion");
    assert_eq!(assertion.modality, Some(Modality::Rumor));
    let attribution = assertion.attribution.as_ref().unwrap();
    assert_eq!(attribution.source, AttributionSource::Narrator);
}

// ---------------------------------------------------------------------------
// Invariants
// ---------------------------------------------------------------------------

#[test]
fn segmenter_is_deterministic_and_tiles_text() {
    let text = "Mr. Holt left at 3.5 past noon. \u{201C}Strange,\u{201D} said Ms. Pike! \
                The clock ticked on... Nobody noticed anything amiss that night.";
    let first = segment(text);
    let second = segment(text);
    assert_eq!(first, second);

    let chars: Vec<char> = text.chars().collect();
    let mut cursor = 0;
    for sentence in &first {
        let gap: String = chars[cursor..sentence.start].iter().collect();
        assert!(gap.chars().all(char::is_whitespace));
        let slice: String = chars[sentence.start..sentence.end].iter().collect();
        assert_eq!(slice, sentence.text);
        cursor = sentence.end;
    }
}

#[test]
fn offset_integrity_for_all_spans() {
    let text = "Aria met Elias near the old mill. She smiled at him. \
                The couple walked home through Meridian Ridge together.";
    let result = extract_with(text, &[("Aria", "PERSON"), ("Elias", "PERSON")]);
    let len = text.chars().count();
    for span in &result.spans {
        assert!(span.start < span.end && span.end <= len, "bad span {span:?}");
    }
    for relation in &result.relations {
        for evidence in &relation.evidence {
            assert!(evidence.span.0 < evidence.span.1 && evidence.span.1 <= len);
        }
    }
}

#[test]
fn canonical_is_always_in_aliases() {
    let result = extract_with(
        "Severus Snape taught potions. Snape also watched Harry closely. \
         Harry and Ron were sorted into Gryffindor.",
        &[("Harry", "PERSON"), ("Ron", "PERSON"), ("Severus", "PERSON"), ("Snape", "PERSON")],
    );
    for entity in &result.entities {
        assert!(
            entity.aliases.contains(&entity.canonical),
            "canonical {:?} missing from aliases {:?}",
            entity.canonical,
            entity.aliases
        );
    }
}

#[test]
fn symmetric_relations_have_identical_evidence() {
    let result = extract_with(
        "Aria married Elias in the spring.",
        &[("Aria", "PERSON"), ("Elias", "PERSON")],
    );
    let forward = result
        .relations
        .iter()
        .find(|r| r.pred == "married_to")
        .expect("married_to relation");
    let mirror = result
        .relations
        .iter()
        .find(|r| r.pred == "married_to" && r.subj == forward.obj && r.obj == forward.subj)
        .expect("mirrored relation");
    assert_eq!(forward.evidence, mirror.evidence);
}

#[test]
fn married_parent_exclusion_holds() {
    let result = extract_with(
        "Orin married Maren last autumn. Orin was the father of Maren.",
        &[("Orin", "PERSON"), ("Maren", "PERSON")],
    );
    let orin = entity(&result, "Orin");
    let maren = entity(&result, "Maren");
    assert!(has_relation(&result, "married_to", orin.id, maren.id));
    assert!(
        !has_relation(&result, "parent_of", orin.id, maren.id),
        "married pair cannot also be parent/child"
    );
}

#[test]
fn sibling_appositive_blocks_parenthood() {
    let result = extract_with(
        "Wren, the eldest daughter of the house, rode ahead. \
         Wren was the mother of Tomas.",
        &[("Wren", "PERSON"), ("Tomas", "PERSON")],
    );
    let wren = entity(&result, "Wren");
    assert!(
        !result
            .relations
            .iter()
            .any(|r| r.pred == "parent_of" && r.subj == wren.id),
        "sibling-appositive cue excludes parent_of from that subject"
    );
}

#[test]
fn merge_monotonicity_across_identical_documents() {
    let parser = ner_parser(&[("Barty", "PERSON"), ("Wren", "PERSON")]);
    let config = ExtractionConfig::default();
    let pipeline = DocumentPipeline::new(&config).with_parser(&parser);
    let result = pipeline
        .extract(
            "doc",
            "Barty met Wren at the mill. Barty trusted Wren completely.",
            &CancelToken::new(),
            0,
        )
        .unwrap();

    let graph = GlobalKnowledgeGraph::new(0.80, 0.88);
    graph.add_document(&result).unwrap();
    let entities_once = graph.entity_count();
    let mentions_once: usize = graph.export().entities.iter().map(|e| e.mention_count).sum();

    graph.add_document(&result).unwrap();
    assert_eq!(graph.entity_count(), entities_once);
    let mentions_twice: usize = graph.export().entities.iter().map(|e| e.mention_count).sum();
    assert_eq!(mentions_twice, mentions_once * 2);
}

#[test]
fn assertion_builder_is_idempotent_end_to_end() {
    let result = extract_with(
        "It is rumored that Alice betrayed Bob. \"I saw it,\" said Alice.",
        &[("Alice", "PERSON"), ("Bob", "PERSON")],
    );
    // Re-extracting yields identical assertion fields: the builder reaches
    // a fixed point inside one extraction, so two runs agree exactly.
    let again = extract_with(
        "It is rumored that Alice betrayed Bob. \"I saw it,\" said Alice.",
        &[("Alice", "PERSON"), ("Bob", "PERSON")],
    );
    assert_eq!(result.assertions.len(), again.assertions.len());
    for (a, b) in result.assertions.iter().zip(again.assertions.iter()) {
        assert_eq!(a.modality, b.modality);
        assert_eq!(a.predicate, b.predicate);
        assert!((a.confidence.composite - b.confidence.composite).abs() < 1e-9);
    }
}

#[test]
fn corpus_runs_are_deterministic() {
    let documents = vec![
        CorpusDocument {
            id: "one".into(),
            text: "Aria met Elias at the harbor. Aria traveled to Meridian Ridge.".into(),
        },
        CorpusDocument {
            id: "two".into(),
            text: "Elias followed Aria north. Elias settled in Meridian Ridge.".into(),
        },
    ];
    let config = ExtractionConfig::default();
    let parser = ner_parser(&[("Aria", "PERSON"), ("Elias", "PERSON")]);

    let run = |docs: &[CorpusDocument]| {
        let output =
            corpus::process_corpus(&config, Some(&parser), docs, &CancelToken::new()).unwrap();
        let export = output.graph.export();
        let mut summary: Vec<(String, String, usize)> = export
            .entities
            .iter()
            .map(|e| {
                (
                    e.entity.canonical.clone(),
                    e.entity.entity_type.to_string(),
                    e.mention_count,
                )
            })
            .collect();
        summary.sort();
        (summary, export.relations.len())
    };

    assert_eq!(run(&documents), run(&documents));
}

#[test]
fn unknown_entities_query_by_type_and_alias() {
    let parser = ner_parser(&[("Aria", "PERSON"), ("Elias", "PERSON")]);
    let config = ExtractionConfig::default();
    let pipeline = DocumentPipeline::new(&config).with_parser(&parser);
    let result = pipeline
        .extract(
            "doc",
            "Aria and Elias married. The couple lived in Meridian Ridge.",
            &CancelToken::new(),
            0,
        )
        .unwrap();
    let graph = GlobalKnowledgeGraph::new(0.80, 0.88);
    graph.add_document(&result).unwrap();

    let places = graph.query(&GraphQuery {
        entity_type: Some(EntityType::Place),
        ..Default::default()
    });
    assert!(
        places.iter().any(|e| e.entity.canonical == "Meridian Ridge"),
        "place query finds the ridge: {places:?}"
    );
}
