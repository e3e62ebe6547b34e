//! fabula CLI: narrative knowledge extraction.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use fabula::cancel::CancelToken;
use fabula::config::{ExtractionConfig, PipelineMode};
use fabula::corpus::{self, CorpusDocument};
use fabula::entity::EntityType;
use fabula::graph::identity::identity_report;
use fabula::graph::{GraphExport, GraphQuery};
use fabula::pipeline::chunk::{self, ChunkProgress};
use fabula::pipeline::DocumentPipeline;

#[derive(Parser)]
#[command(name = "fabula", version, about = "Narrative knowledge extraction engine")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Strict mode: errors instead of degraded result objects.
    #[arg(long, global = true)]
    strict: bool,

    /// Pipeline mode: "legacy" or "chunked".
    #[arg(long, global = true)]
    mode: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract one document and print its artifacts as JSON.
    Extract {
        /// Path to the text file.
        file: PathBuf,

        /// Print chunk progress to stderr.
        #[arg(long)]
        progress: bool,
    },

    /// Process a directory of .txt files into a global graph export.
    Corpus {
        /// Directory containing the documents.
        dir: PathBuf,

        /// Write the graph export here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Query a graph export produced by `corpus`.
    Query {
        /// Path to the JSON graph export.
        export: PathBuf,

        /// Filter by entity type (PERSON, ORG, PLACE, ...).
        #[arg(long)]
        entity_type: Option<String>,

        /// Case-insensitive canonical substring.
        #[arg(long)]
        name: Option<String>,
    },

    /// Print the grouped identity report for one document.
    IdentityReport {
        /// Path to the text file.
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => ExtractionConfig::from_toml_file(path).into_diagnostic()?,
        None => ExtractionConfig::default(),
    };
    config.strict |= cli.strict;
    if let Some(mode) = &cli.mode {
        config.mode = match mode.as_str() {
            "legacy" => PipelineMode::Legacy,
            "chunked" => PipelineMode::Chunked,
            other => miette::bail!("unknown mode {other:?}; expected legacy or chunked"),
        };
    }

    match cli.command {
        Commands::Extract { file, progress } => {
            let text = std::fs::read_to_string(&file).into_diagnostic()?;
            let doc_id = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document".into());
            let pipeline = DocumentPipeline::new(&config);
            let report = |p: ChunkProgress| {
                eprintln!(
                    "chunk {}/{}: {} entities, {} relations ({} ms)",
                    p.current_chunk,
                    p.total_chunks,
                    p.entities_in_chunk,
                    p.relations_in_chunk,
                    p.elapsed_ms
                );
            };
            let result = chunk::extract_document(
                &pipeline,
                &config,
                &doc_id,
                &text,
                &CancelToken::new(),
                0,
                progress.then_some(&report as &dyn Fn(ChunkProgress)),
            )?;
            println!(
                "{}",
                serde_json::to_string_pretty(&result).into_diagnostic()?
            );
        }

        Commands::Corpus { dir, out } => {
            let mut documents = Vec::new();
            let mut entries: Vec<_> = std::fs::read_dir(&dir)
                .into_diagnostic()?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "txt"))
                .collect();
            entries.sort();
            for path in entries {
                let id = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let text = std::fs::read_to_string(&path).into_diagnostic()?;
                documents.push(CorpusDocument { id, text });
            }
            if documents.is_empty() {
                miette::bail!("no .txt files found in {}", dir.display());
            }

            let output = corpus::process_corpus(
                &config,
                None::<&fabula::adapter::FallbackParser>,
                &documents,
                &CancelToken::new(),
            )?;
            for violation in &output.violations {
                eprintln!("constraint violation: {}", violation.message);
            }
            let export = output.graph.export();
            let json = serde_json::to_string_pretty(&export).into_diagnostic()?;
            match out {
                Some(path) => std::fs::write(&path, json).into_diagnostic()?,
                None => println!("{json}"),
            }
        }

        Commands::Query {
            export,
            entity_type,
            name,
        } => {
            let raw = std::fs::read_to_string(&export).into_diagnostic()?;
            let export: GraphExport = serde_json::from_str(&raw).into_diagnostic()?;
            let entity_type = entity_type
                .map(|t| parse_entity_type(&t))
                .transpose()?;
            let query = GraphQuery {
                entity_type,
                canonical: name,
                alias: None,
            };
            let needle = query.canonical.as_deref().map(str::to_lowercase);
            let hits: Vec<_> = export
                .entities
                .iter()
                .filter(|e| {
                    query
                        .entity_type
                        .is_none_or(|t| e.entity.entity_type.effective() == t.effective())
                })
                .filter(|e| {
                    needle
                        .as_deref()
                        .is_none_or(|n| e.entity.canonical.to_lowercase().contains(n))
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&hits).into_diagnostic()?);
        }

        Commands::IdentityReport { file } => {
            let text = std::fs::read_to_string(&file).into_diagnostic()?;
            let pipeline = DocumentPipeline::new(&config);
            let result = pipeline.extract("document", &text, &CancelToken::new(), 0)?;
            let report = identity_report(&result.entities);
            println!(
                "{}",
                serde_json::to_string_pretty(&report).into_diagnostic()?
            );
        }
    }

    Ok(())
}

fn parse_entity_type(raw: &str) -> Result<EntityType> {
    serde_json::from_value(serde_json::Value::String(raw.to_uppercase()))
        .map_err(|_| miette::miette!("unknown entity type {raw:?}"))
}
