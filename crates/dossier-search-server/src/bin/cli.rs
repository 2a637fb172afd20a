//! Dossier Search CLI
//!
//! Operator commands against the local search store.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use dossier_search_core::engine::parse_entity_types;
use dossier_search_core::{
    Caller, ClearanceAuthorizer, EntityType, SearchConfig, SearchEngine, SearchParams, SqliteStore,
};
use dossier_search_server::Importer;

/// Dossier Search - operator CLI
#[derive(Parser)]
#[command(name = "dossier-search-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operator CLI for the dossier search store")]
struct Cli {
    /// SQLite database path (defaults to the platform data directory)
    #[arg(long, global = true, env = "DOSSIER_SEARCH_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import documents from a JSONL file
    Import {
        /// Path to the JSONL file
        file: PathBuf,
        /// Stop at the first invalid line
        #[arg(long)]
        strict: bool,
        /// Embedding width for generated and supplied vectors
        #[arg(long, env = "DOSSIER_SEARCH_EMBEDDING_DIMENSIONS", default_value_t = 1536)]
        dimensions: usize,
    },

    /// Show document counts and embedding coverage
    Stats,

    /// Run a full search and print ranked results
    Search {
        /// Query (Boolean operators and quoted phrases allowed)
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Entity types (comma-separated)
        #[arg(long = "type")]
        entity_type: Option<String>,
        /// Clearance level to search as
        #[arg(long, default_value_t = 0)]
        clearance: u8,
        #[arg(long)]
        include_archived: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Import {
            file,
            strict,
            dimensions,
        } => run_import(cli.db, file, strict, dimensions),
        Commands::Stats => run_stats(cli.db),
        Commands::Search {
            query,
            limit,
            offset,
            entity_type,
            clearance,
            include_archived,
        } => {
            let params = SearchParams {
                q: query,
                limit: Some(limit),
                offset: Some(offset),
                entity_types: entity_type
                    .as_deref()
                    .map(parse_entity_types)
                    .transpose()?,
                include_archived,
            };
            run_search(cli.db, params, clearance).await
        }
    }
}

/// Run import command
fn run_import(db: Option<PathBuf>, file: PathBuf, strict: bool, dimensions: usize) -> anyhow::Result<()> {
    let store = SqliteStore::new(db)?;

    println!("{}", "=== Dossier Search Import ===".cyan().bold());
    println!("{}: {}", "File".white().bold(), file.display());
    println!();

    let summary = Importer::new(&store)
        .with_dimensions(dimensions)
        .strict(strict)
        .import_file(&file)?;

    println!("{}: {}", "Documents".white().bold(), summary.documents);
    println!("{}: {}", "Supplied Embeddings".white().bold(), summary.supplied_embeddings);
    println!("{}: {}", "Generated Embeddings".white().bold(), summary.generated_embeddings);
    if summary.skipped > 0 {
        println!("{}: {}", "Skipped Lines".yellow().bold(), summary.skipped);
    }
    println!();
    println!("{}", "Import complete.".green());

    Ok(())
}

/// Run stats command
fn run_stats(db: Option<PathBuf>) -> anyhow::Result<()> {
    let store = SqliteStore::new(db)?;
    let stats = store.stats()?;

    println!("{}", "=== Dossier Search Statistics ===".cyan().bold());
    println!();

    println!("{}: {}", "Total Documents".white().bold(), stats.documents);
    println!("{}: {}", "Archived".white().bold(), stats.archived);
    println!("{}: {}", "With Embeddings".white().bold(), stats.embeddings);

    let semantic_documents: usize = EntityType::SEMANTIC
        .iter()
        .map(|t| stats.by_type.get(t).copied().unwrap_or(0))
        .sum();
    let coverage = if semantic_documents > 0 {
        (stats.embeddings as f64 / semantic_documents as f64) * 100.0
    } else {
        0.0
    };
    println!("{}: {:.1}%", "Embedding Coverage".white().bold(), coverage);

    println!();
    println!("{}", "=== By Entity Type ===".yellow().bold());
    if stats.by_type.is_empty() {
        println!("{}", "No documents found.".dimmed());
    }
    for (entity_type, count) in &stats.by_type {
        println!("  {:<12} {}", entity_type.plural(), count);
    }

    Ok(())
}

/// Run search command
async fn run_search(db: Option<PathBuf>, params: SearchParams, clearance: u8) -> anyhow::Result<()> {
    let store = SqliteStore::new(db)?;
    let engine = SearchEngine::builder(Arc::new(store))
        .config(SearchConfig::from_env())
        .authorizer(Arc::new(ClearanceAuthorizer))
        .build()?;

    let response = engine
        .search(&Caller::anonymous(clearance), &params)
        .await
        .map_err(|e| anyhow::anyhow!("{} / {}", e.message(), e.message_ar()))?;

    println!(
        "{} {} ({} ms)",
        "=== Results for".cyan().bold(),
        format!("\"{}\" ===", response.query.original).cyan().bold(),
        response.took_ms
    );
    println!(
        "{}: {}  {}: {}",
        "Total".white().bold(),
        response.counts.total,
        "Restricted".white().bold(),
        response.counts.restricted
    );
    for warning in &response.warnings {
        println!("{} {}", "warning:".yellow().bold(), warning);
    }
    println!();

    if response.results.is_empty() {
        println!("{}", "No results.".dimmed());
        return Ok(());
    }

    let offset = params.offset.unwrap_or(0);
    for (i, result) in response.results.iter().enumerate() {
        let title = if result.title_en.is_empty() {
            &result.title_ar
        } else {
            &result.title_en
        };
        println!(
            "{:>3}. [{}] {} {}",
            offset + i + 1,
            result.entity_type.as_str().magenta(),
            title.white().bold(),
            format!("({:.3})", result.rank_score).dimmed()
        );
        for snippet in [&result.snippet_en, &result.snippet_ar].into_iter().flatten() {
            println!("     {}", render_snippet(snippet));
        }
    }

    if let Some(next) = response.metadata.as_ref().and_then(|m| m.next_offset) {
        println!();
        println!("{}", format!("More results: --offset {}", next).dimmed());
    }

    Ok(())
}

/// Terminal rendering of an HTML snippet: marked terms in bold yellow
fn render_snippet(snippet: &str) -> String {
    let mut out = String::new();
    for (i, part) in snippet.split("<mark>").enumerate() {
        if i == 0 {
            out.push_str(&unescape(part));
            continue;
        }
        match part.split_once("</mark>") {
            Some((marked, rest)) => {
                out.push_str(&unescape(marked).yellow().bold().to_string());
                out.push_str(&unescape(rest));
            }
            None => out.push_str(&unescape(part)),
        }
    }
    out
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}
