use corpus_core::traits::{EmbeddingService, LLMService};
use corpus_graph::storage::InMemoryGraph;
use corpus_storage::memory::InMemoryStore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{ToolError, ToolErrorKind};
use crate::orchestrator::consolidate::{consolidate, ConsolidateArgs, ConsolidateContext};
use crate::orchestrator::ingest::{ingest, IngestArgs, IngestContext};
use crate::protocol::{read_request, write_response, ToolRequest, ToolResponse};

/// Owns the default (in-memory) backends and dispatches tool calls to the
/// C7/C8 orchestrators. The SQLite backend is wired up independently by
/// callers that opt into the `sqlite` feature; this server talks to
/// whatever repository set it's constructed with via the trait objects, so
/// swapping backends doesn't touch this dispatch logic.
pub struct ServerState {
    store: InMemoryStore,
    graph: InMemoryGraph,
    embeddings: Option<Box<dyn EmbeddingService>>,
    llm: Box<dyn LLMService>,
    extract_concurrency: Option<usize>,
}

impl ServerState {
    pub fn new(
        llm: Box<dyn LLMService>,
        embeddings: Option<Box<dyn EmbeddingService>>,
        extract_concurrency: Option<usize>,
    ) -> Self {
        ServerState {
            store: InMemoryStore::new(),
            graph: InMemoryGraph::new(),
            embeddings,
            llm,
            extract_concurrency,
        }
    }

    fn embeddings_ref(&self) -> Option<&dyn EmbeddingService> {
        self.embeddings.as_deref()
    }

    async fn dispatch_ingest(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: IngestArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::validation(format!("invalid ingest_document arguments: {e}")))?;

        let source_identifier = args
            .file_path
            .clone()
            .or_else(|| args.url.clone())
            .unwrap_or_else(|| format!("inline:{}", Uuid::new_v4()));

        let ctx = IngestContext {
            documents: &self.store,
            sections: &self.store,
            tags: &self.store,
            supersessions: &self.store,
            claims: &self.store,
            graph: &self.graph,
            embeddings: self.embeddings_ref(),
            llm: self.llm.as_ref(),
            extract_concurrency: self.extract_concurrency,
        };

        let result = ingest(&ctx, args, source_identifier).await?;
        Ok(serde_json::to_value(result).expect("IngestResult always serializes"))
    }

    async fn dispatch_consolidate(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: ConsolidateArgs = serde_json::from_value(arguments)
            .map_err(|e| ToolError::validation(format!("invalid consolidate_documents arguments: {e}")))?;

        let ctx = ConsolidateContext {
            documents: &self.store,
            sections: &self.store,
            claims: &self.store,
            conflicts: &self.store,
            consolidations: &self.store,
            provenance: &self.store,
            tags: &self.store,
            embeddings: self.embeddings_ref(),
            llm: self.llm.as_ref(),
        };

        let result = consolidate(&ctx, args).await?;
        Ok(serde_json::to_value(result).expect("ConsolidateResult always serializes"))
    }

    /// Handles one framed request, never propagating an error out of the
    /// dispatch loop: every failure is captured into the response envelope.
    pub async fn handle(&self, request: ToolRequest) -> ToolResponse {
        let outcome = match request.tool.as_str() {
            "ingest_document" => self.dispatch_ingest(request.arguments.clone()).await,
            "consolidate_documents" => self.dispatch_consolidate(request.arguments.clone()).await,
            other => Err(ToolError {
                kind: ToolErrorKind::Validation,
                message: format!("unknown tool: {other}"),
                context: serde_json::Value::Null,
                retriable: false,
            }),
        };

        match outcome {
            Ok(result) => ToolResponse::ok(request.id, result),
            Err(err) => {
                error!(tool = %request.tool, error = %err.message, "tool call failed");
                ToolResponse::err(request.id, err)
            }
        }
    }
}

/// Runs the stdio request/response loop until stdin closes.
pub async fn run_stdio(state: &ServerState) -> std::io::Result<()> {
    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    let mut stdout = tokio::io::stdout();

    info!("corpus-server listening on stdio");
    while let Some(request) = read_request(&mut lines).await? {
        let response = state.handle(request).await;
        write_response(&mut stdout, &response).await?;
    }
    info!("stdin closed, shutting down");
    Ok(())
}
