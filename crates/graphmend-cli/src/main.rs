//! Graphmend CLI
//!
//! Operator interface for the curation pipeline:
//! - `extract` a document into a fragment graph
//! - `merge` fragments into the unified graph
//! - `analyze` a graph for defects
//! - `fix` a graph by applying one structured fix
//!
//! Model configuration comes from the environment (`GRAPHMEND_LLM_MODEL`,
//! `GRAPHMEND_LLM_BASE_URL`, `GRAPHMEND_LLM_API_KEY`). Without a model,
//! extraction is unavailable and analysis runs tier 1 only.

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use graphmend_curate::llm::{ModelConfig, OpenAiCompatibleModel, TextModel};
use graphmend_curate::{
    AnalyzeRequest, Analyzer, CurationService, ExtractRequest, Extractor, FixApplier, FixRequest,
    MergeRequest,
};
use graphmend_model::{Fix, Graph, Severity};
use graphmend_storage::{
    DocumentContent, DocumentProvider, FileDocumentProvider, FileGraphStore, GraphStore,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "graphmend")]
#[command(
    author,
    version,
    about = "Knowledge-graph curation: extract, merge, analyze, fix"
)]
struct Cli {
    /// Directory holding the named graph store
    #[arg(long, global = true, default_value = "./graphs")]
    store: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract a document into a fragment graph
    Extract {
        /// Input document (text, markdown, or binary with a known MIME type)
        input: Option<PathBuf>,
        /// Inline text instead of a file
        #[arg(long, conflicts_with = "input")]
        text: Option<String>,
        /// Source label; defaults to the input file name
        #[arg(long)]
        source: Option<String>,
    },

    /// Merge fragment graphs into the unified graph (requires >= 2 ids)
    Merge {
        /// Graph ids to merge, in order
        graph_ids: Vec<String>,
    },

    /// Analyze a graph for structural and semantic defects
    Analyze {
        graph_id: String,
        /// Restrict analysis to these node ids (repeatable)
        #[arg(long = "node")]
        nodes: Vec<String>,
        /// Skip the model-assisted tier even when a model is configured
        #[arg(long)]
        heuristic_only: bool,
    },

    /// Apply one structured fix to a graph
    Fix {
        graph_id: String,
        /// Fix as inline JSON, e.g. '{"type":"delete","data":{"nodeId":"..."}}'
        #[arg(long, conflicts_with = "fix_file")]
        fix: Option<String>,
        /// Fix as a JSON file
        #[arg(long)]
        fix_file: Option<PathBuf>,
    },

    /// List stored graphs
    List,

    /// Print a stored graph summary
    Show { graph_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store: Arc<dyn GraphStore> = Arc::new(FileGraphStore::open(&cli.store)?);
    let model = load_model()?;

    match cli.command {
        Commands::Extract {
            input,
            text,
            source,
        } => {
            let Some(model) = model else {
                bail!("extraction needs a configured model; set GRAPHMEND_LLM_MODEL");
            };
            let (content, default_label) = read_content(input, text)?;
            let source_label = source
                .or(default_label)
                .ok_or_else(|| anyhow!("--source is required with --text"))?;

            let service = build_service(store, Some(model));
            let response = service
                .extract_document(ExtractRequest {
                    content,
                    source_label,
                })
                .await?;

            let meta = &response.result.metadata;
            if meta.degraded {
                println!(
                    "{} extraction degraded: model output did not parse, empty fragment saved",
                    "!".yellow().bold()
                );
            }
            println!(
                "{} extracted {} entities, {} relations from {} -> {}",
                "✓".green().bold(),
                meta.entity_count,
                meta.relation_count,
                meta.source,
                response.fragment_graph_id.bold(),
            );
        }

        Commands::Merge { graph_ids } => {
            let service = build_service(store, model);
            let response = service.merge_graphs(MergeRequest { graph_ids }).await?;
            let stats = &response.stats;
            println!(
                "{} merged {} graphs into {}: {} nodes, {} edges, {} unique entities",
                "✓".green().bold(),
                stats.graph_count,
                response.unified_graph_id.bold(),
                stats.total_nodes,
                stats.total_edges,
                stats.unique_entities,
            );
        }

        Commands::Analyze {
            graph_id,
            nodes,
            heuristic_only,
        } => {
            let model = if heuristic_only { None } else { model };
            if model.is_none() {
                println!("{}", "running deterministic checks only".dimmed());
            }
            let service = build_service(store, model);
            let response = service
                .analyze_graph(AnalyzeRequest {
                    graph_id,
                    selected_node_ids: nodes,
                })
                .await?;

            for issue in &response.issues {
                let severity = match issue.severity {
                    Severity::High => "high".red().bold(),
                    Severity::Medium => "medium".yellow(),
                    Severity::Low => "low".normal(),
                };
                println!("[{severity}] {} ({})", issue.title.bold(), issue.kind);
                println!("    {}", issue.description);
                if let Some(fix) = &issue.fix {
                    println!(
                        "    {} {}",
                        "fix:".dimmed(),
                        serde_json::to_string(fix)?.dimmed()
                    );
                }
            }
            let total = response.stats.get("total").copied().unwrap_or(0);
            println!(
                "{} {} issues ({})",
                "✓".green().bold(),
                total,
                summarize_stats(&response.stats),
            );
        }

        Commands::Fix {
            graph_id,
            fix,
            fix_file,
        } => {
            let raw = match (fix, fix_file) {
                (Some(inline), None) => inline,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                _ => bail!("provide exactly one of --fix or --fix-file"),
            };
            let fix: Fix = serde_json::from_str(&raw).context("parsing fix JSON")?;

            let service = build_service(store, model);
            let response = service.apply_fix(FixRequest { graph_id, fix }).await?;
            if response.ok {
                println!("{} fix applied", "✓".green().bold());
            } else {
                println!(
                    "{} fix rejected: {}",
                    "✗".red().bold(),
                    response.error.unwrap_or_default()
                );
                std::process::exit(1);
            }
        }

        Commands::List => {
            for id in store.list_graphs()? {
                println!("{id}");
            }
        }

        Commands::Show { graph_id } => {
            let graph = store.load_graph(&graph_id)?;
            print_graph(&graph_id, &graph);
        }
    }

    Ok(())
}

fn load_model() -> Result<Option<Arc<dyn TextModel>>> {
    match ModelConfig::from_env() {
        Some(config) => {
            let model = OpenAiCompatibleModel::new(config)
                .map_err(|e| anyhow!("building model client: {e}"))?;
            Ok(Some(Arc::new(model)))
        }
        None => Ok(None),
    }
}

fn build_service(
    store: Arc<dyn GraphStore>,
    model: Option<Arc<dyn TextModel>>,
) -> Arc<CurationService> {
    let (extractor, analyzer, fixer) = match model {
        Some(model) => (
            Extractor::new(model.clone()),
            Analyzer::new(model.clone()),
            FixApplier::new(model),
        ),
        None => (
            // Extraction without a model fails at the transport level; the
            // extract command guards against reaching it.
            Extractor::new(Arc::new(graphmend_curate::MockModel::failing())),
            Analyzer::heuristic_only(),
            FixApplier::heuristic_only(),
        ),
    };
    Arc::new(CurationService::new(store, extractor, analyzer, fixer))
}

fn read_content(
    input: Option<PathBuf>,
    text: Option<String>,
) -> Result<(DocumentContent, Option<String>)> {
    if let Some(text) = text {
        return Ok((DocumentContent::Text(text), None));
    }
    let path = input.ok_or_else(|| anyhow!("provide an input file or --text"))?;
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("input has no file name: {}", path.display()))?
        .to_string_lossy()
        .to_string();
    let root = path.parent().unwrap_or_else(|| std::path::Path::new("."));
    let provider = FileDocumentProvider::new(root);
    let content = provider
        .fetch(&file_name)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok((content, Some(file_name)))
}

fn summarize_stats(stats: &graphmend_curate::AnalysisStats) -> String {
    ["high", "medium", "low"]
        .iter()
        .map(|severity| format!("{severity}: {}", stats.get(*severity).copied().unwrap_or(0)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_graph(id: &str, graph: &Graph) {
    println!(
        "{}: {} nodes, {} edges",
        id.bold(),
        graph.nodes.len(),
        graph.edges.len()
    );
    for node in &graph.nodes {
        let description = node
            .description
            .as_deref()
            .map(|d| format!(" - {d}"))
            .unwrap_or_default();
        println!("  [{}] {} ({}){}", node.id, node.label.bold(), node.kind, description);
    }
    for edge in &graph.edges {
        println!(
            "  {} -{}-> {} (w={:.2})",
            edge.source,
            edge.kind.dimmed(),
            edge.target,
            edge.weight
        );
    }
}
