pub mod error;
pub mod orchestrator;
pub mod protocol;
pub mod server;

pub mod prelude {
    pub use crate::error::{Result, ToolError, ToolErrorKind};
    pub use crate::orchestrator::consolidate::{consolidate, ConsolidateArgs, ConsolidateContext, ConsolidateResult};
    pub use crate::orchestrator::ingest::{ingest, IngestArgs, IngestContext, IngestResult};
    pub use crate::protocol::{read_request, write_response, ToolRequest, ToolResponse};
    pub use crate::server::{run_stdio, ServerState};
}
