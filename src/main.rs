//! `fitment-engine` command-line entry point
//!
//! Thin routing layer over the library: load configuration, initialise
//! logging, build the orchestrator and print results as JSON on stdout.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{info, warn};

use fitment_engine_lib::application::{
    BatchExtractor, BatchItem, DocumentSupplier, ExtractionOrchestrator, SearchResultHints,
    candidate_urls, rank_by_authority,
};
use fitment_engine_lib::domain::SourceDocument;
use fitment_engine_lib::infrastructure::config::{ConfigManager, EngineConfig};
use fitment_engine_lib::infrastructure::logging::{init_logging_with_config, log_system_info};

#[derive(Parser, Debug)]
#[command(
    name = "fitment-engine",
    version,
    about = "Extract vehicle fitment (year/make/model) from automotive product pages."
)]
struct Cli {
    /// Configuration file; defaults to the user config directory
    #[arg(long, global = true, env = "FITMENT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract fitment for one part from local HTML files
    Extract {
        #[arg(long)]
        part: String,
        #[arg(long)]
        brand: String,
        /// `URL=PATH` pairs, best candidate first. A bare path has no URL.
        #[arg(long = "document", required = true)]
        documents: Vec<String>,
    },
    /// Run a JSON manifest of parts through the batch pipeline
    Batch {
        #[arg(long)]
        manifest: PathBuf,
    },
    /// Suggest URLs worth fetching for a part, best first
    Discover {
        #[arg(long)]
        part: String,
        #[arg(long)]
        brand: String,
        /// Links from an earlier search; they rank ahead of guessed URLs
        #[arg(long = "hint")]
        hints: Vec<String>,
    },
    /// List the vendor registry
    Vendors,
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    part_number: String,
    brand: String,
    #[serde(default)]
    documents: Vec<ManifestDocument>,
}

#[derive(Debug, Clone, Deserialize)]
struct ManifestDocument {
    #[serde(default)]
    source_url: String,
    path: PathBuf,
}

/// Serves documents listed in a batch manifest, read from disk on demand.
struct ManifestSupplier {
    orchestrator: Arc<ExtractionOrchestrator>,
    documents: HashMap<(String, String), Vec<ManifestDocument>>,
}

#[async_trait]
impl DocumentSupplier for ManifestSupplier {
    async fn candidate_documents(&self, part_number: &str, brand: &str) -> Result<Vec<SourceDocument>> {
        let Some(listed) = self
            .documents
            .get(&(part_number.to_string(), brand.to_string()))
        else {
            return Ok(Vec::new());
        };

        let mut documents = Vec::with_capacity(listed.len());
        for doc in listed {
            documents.push(read_document(&doc.source_url, &doc.path).await?);
        }
        rank_by_authority(&mut documents, self.orchestrator.registry());
        Ok(documents)
    }
}

async fn read_document(source_url: &str, path: &Path) -> Result<SourceDocument> {
    let html = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read document {}", path.display()))?;
    Ok(SourceDocument::new(source_url, html))
}

fn discover(orchestrator: &ExtractionOrchestrator, part: &str, brand: &str, hints: Vec<String>) -> Vec<String> {
    let hints = (!hints.is_empty()).then_some(hints);
    candidate_urls(
        part,
        brand,
        orchestrator.registry(),
        hints.as_ref().map(|h| h as &dyn SearchResultHints),
    )
}

fn split_document_arg(arg: &str) -> (&str, &str) {
    // URLs contain '=' in query strings, so split on the last one
    arg.rsplit_once('=').unwrap_or(("", arg))
}

async fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => ConfigManager::with_path(path).load_config().await,
        None => ConfigManager::new()?.initialize_on_first_run().await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).await?;

    if let Err(e) = init_logging_with_config(config.logging.clone()) {
        eprintln!("Logging disabled: {e:#}");
    }
    log_system_info();

    let orchestrator = Arc::new(ExtractionOrchestrator::from_config(&config)?);

    match cli.command {
        Command::Extract { part, brand, documents } => {
            let mut loaded = Vec::with_capacity(documents.len());
            for arg in &documents {
                let (url, path) = split_document_arg(arg);
                loaded.push(read_document(url, Path::new(path)).await?);
            }

            let report = tokio::task::spawn_blocking({
                let orchestrator = Arc::clone(&orchestrator);
                move || orchestrator.extract_with_report(&part, &brand, &loaded)
            })
            .await
            .map_err(|e| anyhow!("Extraction task failed: {e}"))?;

            info!(
                "Found {} applications (best: {:?}, confidence {:.2})",
                report.applications.len(),
                report.best_strategy,
                report.best_confidence
            );
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Batch { manifest } => {
            let raw = tokio::fs::read_to_string(&manifest)
                .await
                .with_context(|| format!("Failed to read manifest {}", manifest.display()))?;
            let entries: Vec<ManifestEntry> =
                serde_json::from_str(&raw).context("Manifest is not a valid JSON array of parts")?;
            let base_dir = manifest.parent().map(Path::to_path_buf).unwrap_or_default();

            let mut documents = HashMap::new();
            let mut items = Vec::with_capacity(entries.len());
            for entry in entries {
                let resolved = entry
                    .documents
                    .into_iter()
                    .map(|doc| ManifestDocument {
                        path: base_dir.join(&doc.path),
                        ..doc
                    })
                    .collect();
                let key = (entry.part_number.trim().to_string(), entry.brand.trim().to_string());
                if documents.insert(key, resolved).is_some() {
                    warn!("Duplicate manifest entry for {} / {}", entry.part_number, entry.brand);
                    continue;
                }
                items.push(BatchItem::new(entry.part_number.trim(), entry.brand.trim()));
            }

            let supplier = Arc::new(ManifestSupplier {
                orchestrator: Arc::clone(&orchestrator),
                documents,
            });
            let extractor = BatchExtractor::new(orchestrator, supplier, config.batch.concurrency);
            let report = extractor.run(items).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Discover { part, brand, hints } => {
            let urls = discover(&orchestrator, &part, &brand, hints);
            info!("{} candidate URLs for {} / {}", urls.len(), part, brand);
            println!("{}", serde_json::to_string_pretty(&urls)?);
        }
        Command::Vendors => {
            for vendor in orchestrator.registry().vendors() {
                let chain: Vec<String> = vendor
                    .config
                    .strategy_chain()
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                println!(
                    "{:<14} authority {:>3}  [{}]  {}",
                    vendor.key(),
                    vendor.config.authority_score,
                    chain.join(" > "),
                    vendor.config.brand_names.join(", ")
                );
            }
        }
    }

    Ok(())
}
