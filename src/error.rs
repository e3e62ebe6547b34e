//! Rich diagnostic error types for the fabula engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]`
//! derives, providing error codes, help text, and source chains so callers
//! know exactly what went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for the fabula engine.
///
/// Each variant wraps a subsystem-specific error, preserving the full
/// diagnostic chain (error codes, help text) through to the caller.
#[derive(Debug, Error, Diagnostic)]
pub enum FabulaError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Segment(#[from] SegmentError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Entity(#[from] EntityError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Relation(#[from] RelationError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Ir(#[from] IrError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Segmenter errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SegmentError {
    #[error("empty input text")]
    #[diagnostic(
        code(fabula::segment::empty_input),
        help("Provide non-empty text. Whitespace-only documents have no sentences.")
    )]
    EmptyInput,
}

// ---------------------------------------------------------------------------
// Adapter errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum AdapterError {
    #[error("parser unavailable: {reason}")]
    #[diagnostic(
        code(fabula::adapter::parser_unavailable),
        help(
            "The external syntactic parser could not be reached. With \
             `baseline_required = false` the document proceeds with the \
             built-in fallback tokenizer; with `baseline_required = true` \
             this error is fatal for the document."
        )
    )]
    ParserUnavailable { reason: String },

    #[error("adapter contract violation in sentence {sentence_index}: {detail}")]
    #[diagnostic(
        code(fabula::adapter::contract_violation),
        help(
            "The parser returned malformed data (offsets out of range, \
             token indices out of order, or head references past the end). \
             Check the parser's wire format against the adapter contract."
        )
    )]
    ContractViolation {
        sentence_index: usize,
        detail: String,
    },

    #[error("malformed span [{start}, {end}) against text of length {len}")]
    #[diagnostic(
        code(fabula::adapter::invalid_span),
        help("Spans must satisfy 0 <= start < end <= text length.")
    )]
    InvalidSpan {
        start: usize,
        end: usize,
        len: usize,
    },
}

// ---------------------------------------------------------------------------
// Entity errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum EntityError {
    #[error("mint attempted before promotion gate for cluster \"{canonical}\"")]
    #[diagnostic(
        code(fabula::entity::premature_mint),
        help(
            "Entity IDs must not be assigned before the promotion gate has \
             passed a cluster. Run the clusterer to completion first."
        )
    )]
    PrematureMint { canonical: String },

    #[error("extraction invariant broken: {detail}")]
    #[diagnostic(
        code(fabula::entity::invariant),
        help("A stage-internal invariant failed. This is a bug in the extraction engine.")
    )]
    Invariant { detail: String },
}

// ---------------------------------------------------------------------------
// Relation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RelationError {
    #[error("relation {predicate}({subject}, {object}) violates its argument type constraint")]
    #[diagnostic(
        code(fabula::relation::type_constraint),
        help(
            "The predicate's registry rule restricts subject/object entity \
             types. Either the typing stage mis-typed an entity or the \
             pattern's type guard is wrong."
        )
    )]
    TypeConstraint {
        predicate: String,
        subject: u64,
        object: u64,
    },

    #[error("unknown predicate \"{predicate}\" queried against the vocabulary registry")]
    #[diagnostic(
        code(fabula::relation::unknown_predicate),
        help(
            "Predicates form an open vocabulary; unknown ones receive a \
             permissive default rule. Seeing this error means a consumer \
             asked for a strict lookup."
        )
    )]
    UnknownPredicate { predicate: String },
}

// ---------------------------------------------------------------------------
// IR errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum IrError {
    #[error("assertion builder ran out of order: {detail}")]
    #[diagnostic(
        code(fabula::ir::pass_order),
        help(
            "The three builder passes must run attribution -> modality -> \
             reference. Use `AssertionBuilder::build` rather than calling \
             passes directly."
        )
    )]
    PassOrder { detail: String },
}

// ---------------------------------------------------------------------------
// Pipeline errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum PipelineError {
    #[error("invalid input: {reason}")]
    #[diagnostic(
        code(fabula::pipeline::invalid_input),
        help("The document text or configuration was rejected before extraction began.")
    )]
    InvalidInput { reason: String },

    #[error("extraction cancelled after {completed} of {total} chunks")]
    #[diagnostic(
        code(fabula::pipeline::cancelled),
        help(
            "A cancellation signal (or timeout surfaced as one) stopped the \
             pipeline. Partial outputs for completed chunks were returned."
        )
    )]
    Cancelled { completed: usize, total: usize },

    #[error("extraction failure in stage {stage}: {detail}")]
    #[diagnostic(
        code(fabula::pipeline::extraction_failure),
        help("A stage-internal invariant broke. Sibling stages were not affected.")
    )]
    ExtractionFailure { stage: String, detail: String },
}

// ---------------------------------------------------------------------------
// Global graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("merge conflict: {detail}")]
    #[diagnostic(
        code(fabula::graph::merge_conflict),
        help(
            "The global graph indices are inconsistent (an index points at a \
             missing entity). The graph is corrupt; rebuild it from the \
             per-document artifacts."
        )
    )]
    MergeConflict { detail: String },

    #[error("global entity not found: {id}")]
    #[diagnostic(
        code(fabula::graph::entity_not_found),
        help("No entity with this global ID exists. Check the ID against a fresh export.")
    )]
    EntityNotFound { id: u64 },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    #[diagnostic(
        code(fabula::config::io),
        help("Check that the path exists and is readable.")
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {message}")]
    #[diagnostic(
        code(fabula::config::parse),
        help("The file must be valid TOML matching the ExtractionConfig schema.")
    )]
    Parse { message: String },

    #[error("invalid configuration: {message}")]
    #[diagnostic(
        code(fabula::config::invalid),
        help("Check the field ranges: confidences lie in [0,1] and sizes are positive.")
    )]
    Invalid { message: String },
}

/// Convenience alias for functions returning fabula results.
pub type FabulaResult<T> = std::result::Result<T, FabulaError>;
