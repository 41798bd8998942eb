//! Corpus consolidator process entry point: loads configuration, wires the
//! concrete provider implementations, and either runs the stdio tool server
//! or performs a single one-shot tool invocation for smoke testing.

mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use config::Config;
use corpus_core::traits::{EmbeddingService, LLMService};
use corpus_providers::config::ProviderConfig;
use corpus_providers::embedding::{HttpEmbeddingService, MockEmbeddingService};
use corpus_providers::llm::{HttpLLMService, MockLLMService};
use corpus_server::server::ServerState;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "corpus")]
#[command(version, about = "Multi-source document consolidation tool server", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormat,

    /// Use deterministic mock LLM/embedding providers instead of HTTP ones.
    #[arg(long, env = "CORPUS_USE_MOCK_PROVIDERS")]
    mock_providers: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the stdio tool server (the default when no subcommand is given).
    Serve,
    /// Send a single tool call read from stdin (or --input) and print the response.
    Invoke {
        /// Tool name, e.g. `ingest_document` or `consolidate_documents`.
        tool: String,
        /// JSON arguments; reads stdin if omitted.
        #[arg(long)]
        input: Option<String>,
        /// Force `dry_run: true` onto consolidate_documents arguments.
        #[arg(long)]
        dry_run: bool,
        /// Force `output_format` onto consolidate_documents arguments.
        #[arg(long)]
        format: Option<String>,
    },
}

fn init_logging(format: &LogFormat) {
    let filter = EnvFilter::try_from_env("CORPUS_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
}

fn build_llm(config: &Config, use_mock: bool) -> Box<dyn LLMService> {
    if use_mock || config.use_mock_providers {
        return Box::new(MockLLMService::fixed("{\"claims\":[]}"));
    }
    let provider = ProviderConfig::new("llm", config.llm_endpoint.clone(), config.llm_model.clone())
        .from_env();
    Box::new(HttpLLMService::new(provider))
}

fn build_embeddings(config: &Config, use_mock: bool) -> Option<Box<dyn EmbeddingService>> {
    if use_mock || config.use_mock_providers {
        return Some(Box::new(MockEmbeddingService::new(config.embedding_dimensions)));
    }
    let provider = ProviderConfig::new(
        "embedding",
        config.embedding_endpoint.clone(),
        config.embedding_model.clone(),
    )
    .from_env();
    Some(Box::new(HttpEmbeddingService::new(provider, config.embedding_dimensions)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_format);

    let config = Config::load(args.config.as_deref())?;
    tracing::info!(
        llm_model = %config.llm_model,
        embedding_model = %config.embedding_model,
        "corpus-cli starting"
    );

    let llm = build_llm(&config, args.mock_providers);
    let embeddings = build_embeddings(&config, args.mock_providers);
    let state = ServerState::new(llm, embeddings, config.max_extract_concurrency);

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            corpus_server::server::run_stdio(&state).await?;
        }
        Command::Invoke { tool, input, dry_run, format } => {
            let raw = match input {
                Some(text) => text,
                None => {
                    use std::io::Read;
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let mut arguments: serde_json::Value = serde_json::from_str(&raw)?;
            if let serde_json::Value::Object(map) = &mut arguments {
                if dry_run {
                    map.insert("dry_run".to_string(), serde_json::Value::Bool(true));
                }
                if let Some(format) = format {
                    map.insert("output_format".to_string(), serde_json::Value::String(format));
                }
            }
            let request = corpus_server::protocol::ToolRequest {
                id: "invoke-1".to_string(),
                tool,
                arguments,
            };
            let response = state.handle(request).await;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
