//! # fabula
//!
//! Narrative knowledge extraction: ingests long-form prose and produces a
//! structured knowledge representation of canonical entities, typed
//! relations, and an epistemically-qualified intermediate representation of
//! assertions and story events, accumulated across documents into a global
//! knowledge graph.
//!
//! ## Architecture
//!
//! - **Segmentation** (`segment`): rule-based sentence splitting
//! - **Adapters** (`adapter`): external parser and coreference contracts
//! - **Mentions** (`mention`): candidate spans and the meaning gate
//! - **Entities** (`entity`): normalization, typing, clustering, minting
//! - **Resolution** (`resolve`): pronouns, titles, definites, nicknames
//! - **Relations** (`relation`): pattern families, dep paths, guardrails
//! - **IR** (`ir`): assertions (three-pass builder), events, facts
//! - **Pipeline** (`pipeline`): per-document driver and macro-chunking
//! - **Graph** (`graph`): cross-document merge with indexed query
//!
//! ## Library usage
//!
//! ```no_run
//! use fabula::cancel::CancelToken;
//! use fabula::config::ExtractionConfig;
//! use fabula::pipeline::DocumentPipeline;
//!
//! let config = ExtractionConfig::default();
//! let pipeline = DocumentPipeline::new(&config);
//! let result = pipeline
//!     .extract("doc1", "Aria met Elias at the harbor.", &CancelToken::new(), 0)
//!     .unwrap();
//! println!("{} entities", result.entities.len());
//! ```

pub mod adapter;
pub mod cancel;
pub mod config;
pub mod corpus;
pub mod entity;
pub mod error;
pub mod graph;
pub mod ident;
pub mod ir;
pub mod mention;
pub mod pipeline;
pub mod relation;
pub mod resolve;
pub mod segment;
pub mod wordlists;
