//! Extraction configuration and named tunable tables.
//!
//! The enumerated configuration surface, plus the confidence constants and
//! salience dominance thresholds collected into named tables so they are
//! tunable configuration rather than constants sprinkled through the stages.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Pipeline mode: single-pass or macro-chunked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PipelineMode {
    /// Process the whole document in one pass.
    Legacy,
    /// Split long documents into overlapping macro-chunks.
    #[default]
    Chunked,
}

/// Base confidences and penalty constants used across the extractors.
///
/// Collected here so they read as one tunable table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceTable {
    /// Gazetteer hit during type classification.
    pub type_gazetteer: f32,
    /// Strong ORG/PLACE keyword cue during type classification.
    pub type_keyword: f32,
    /// Suffix-only person signal (Jr./Sr. with capitalized root).
    pub type_suffix_person: f32,
    /// Pure capitalization signal.
    pub type_capitalization: f32,
    /// Penalty applied to list- and salience-mediated pattern matches.
    pub mediated_match_penalty: f32,
    /// Confidence reduction for unresolved group placeholders (pass C).
    pub group_placeholder_penalty: f32,
    /// Confidence reduction for unresolvable third-person pronouns (pass C).
    pub unresolved_pronoun_penalty: f32,
    /// Cross-paragraph penalty for sentence-start pronoun resolution.
    pub cross_paragraph_penalty: f32,
    /// Reliability for narrator attribution.
    pub narrator_reliability: f32,
    /// Reliability for quoted speech with an unknown speaker.
    pub unknown_speaker_reliability: f32,
}

impl Default for ConfidenceTable {
    fn default() -> Self {
        Self {
            type_gazetteer: 0.95,
            type_keyword: 0.85,
            type_suffix_person: 0.75,
            type_capitalization: 0.6,
            mediated_match_penalty: 0.05,
            group_placeholder_penalty: 0.3,
            unresolved_pronoun_penalty: 0.2,
            cross_paragraph_penalty: 0.1,
            narrator_reliability: 0.9,
            unknown_speaker_reliability: 0.5,
        }
    }
}

/// Salience dominance thresholds for definite-description resolution.
///
/// The ratios are empirical; they are exposed as tunables rather than baked
/// into the resolver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalienceTunables {
    /// Required dominance ratio within a paragraph.
    pub paragraph_dominance: f32,
    /// Required dominance ratio across the document.
    pub document_dominance: f32,
    /// Required dominance ratio for profile-backed candidates.
    pub profile_dominance: f32,
    /// Top two candidates within this relative margin return unresolved.
    pub tie_margin: f32,
}

impl Default for SalienceTunables {
    fn default() -> Self {
        Self {
            paragraph_dominance: 2.0,
            document_dominance: 1.5,
            profile_dominance: 2.0,
            tie_margin: 0.10,
        }
    }
}

/// The enumerated configuration surface for the extraction engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Target macro-chunk size in words.
    pub chunk_size_words: usize,
    /// Character overlap between adjacent macro-chunks.
    pub overlap_chars: usize,
    /// Minimum words before a document is considered for chunking.
    pub min_chunk_words: usize,
    /// Coref links below this confidence are ignored.
    pub min_coref_confidence: f32,
    /// Cross-document merge: score at which a merge is considered.
    pub soft_merge_confidence: f32,
    /// Cross-document merge: score at which a merge is automatic.
    pub hard_merge_confidence: f32,
    /// Definite descriptions search this many sentences back.
    pub max_sentence_lookback: usize,
    /// Pipeline mode.
    pub mode: PipelineMode,
    /// When true, parser unavailability is fatal for the document.
    pub baseline_required: bool,
    /// Emit the grouped identity report alongside extraction results.
    pub debug_identity: bool,
    /// When true, errors are returned instead of degraded result objects.
    pub strict: bool,
    /// Named confidence constants.
    pub confidence: ConfidenceTable,
    /// Salience dominance tunables.
    pub salience: SalienceTunables,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            chunk_size_words: 5000,
            overlap_chars: 500,
            min_chunk_words: 1000,
            min_coref_confidence: 0.7,
            soft_merge_confidence: 0.80,
            hard_merge_confidence: 0.88,
            max_sentence_lookback: 5,
            mode: PipelineMode::default(),
            baseline_required: false,
            debug_identity: false,
            strict: false,
            confidence: ConfidenceTable::default(),
            salience: SalienceTunables::default(),
        }
    }
}

impl ExtractionConfig {
    /// Load a config from a TOML file, validating field ranges.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size_words == 0 {
            return Err(ConfigError::Invalid {
                message: "chunk_size_words must be positive".into(),
            });
        }
        if self.min_chunk_words > self.chunk_size_words {
            return Err(ConfigError::Invalid {
                message: "min_chunk_words must not exceed chunk_size_words".into(),
            });
        }
        for (name, value) in [
            ("min_coref_confidence", self.min_coref_confidence),
            ("soft_merge_confidence", self.soft_merge_confidence),
            ("hard_merge_confidence", self.hard_merge_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid {
                    message: format!("{name} must lie in [0, 1], got {value}"),
                });
            }
        }
        if self.soft_merge_confidence > self.hard_merge_confidence {
            return Err(ConfigError::Invalid {
                message: "soft_merge_confidence must not exceed hard_merge_confidence".into(),
            });
        }
        if self.max_sentence_lookback == 0 {
            return Err(ConfigError::Invalid {
                message: "max_sentence_lookback must be positive".into(),
            });
        }
        Ok(())
    }
}
