//! Stdio tool-call framing: one JSON object per line, read from stdin and
//! written to stdout. Adapted from the TCP `Transport`/`ProtocolMessage`
//! split used elsewhere in this codebase's protocol layer, narrowed to the
//! single newline-delimited stdio channel this server speaks.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

use crate::error::{ToolError, ToolErrorKind};

/// A single incoming tool invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolRequest {
    pub id: String,
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolErrorPayload {
    pub kind: ToolErrorKind,
    pub message: String,
    pub context: Value,
    pub retriable: bool,
}

impl From<ToolError> for ToolErrorPayload {
    fn from(err: ToolError) -> Self {
        ToolErrorPayload {
            kind: err.kind,
            message: err.message,
            context: err.context,
            retriable: err.retriable,
        }
    }
}

/// The response framed back to the caller for a given request `id`.
/// Exactly one of `result`/`error` is present.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolErrorPayload>,
}

impl ToolResponse {
    pub fn ok(id: impl Into<String>, result: Value) -> Self {
        ToolResponse {
            id: id.into(),
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: impl Into<String>, error: ToolError) -> Self {
        ToolResponse {
            id: id.into(),
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Reads one framed request from `reader`. Returns `Ok(None)` at EOF.
pub async fn read_request<R>(reader: &mut tokio::io::Lines<BufReader<R>>) -> std::io::Result<Option<ToolRequest>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    loop {
        let Some(line) = reader.next_line().await? else {
            return Ok(None);
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ToolRequest>(&line) {
            Ok(request) => return Ok(Some(request)),
            Err(e) => {
                warn!(error = %e, raw = %line, "dropping unparseable request line");
                continue;
            }
        }
    }
}

/// Writes one framed response to `writer` followed by a newline, flushing
/// immediately so the caller sees it without buffering delay.
pub async fn write_response<W>(writer: &mut W, response: &ToolResponse) -> std::io::Result<()>
where
    W: tokio::io::AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(response).unwrap_or_default();
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_a_single_request_line() {
        let input = "{\"id\":\"1\",\"tool\":\"ingest_document\",\"arguments\":{}}\n";
        let mut lines = BufReader::new(input.as_bytes()).lines();
        let request = read_request(&mut lines).await.unwrap().unwrap();
        assert_eq!(request.id, "1");
        assert_eq!(request.tool, "ingest_document");
    }

    #[tokio::test]
    async fn skips_blank_lines_and_returns_none_at_eof() {
        let input = "\n\n";
        let mut lines = BufReader::new(input.as_bytes()).lines();
        let request = read_request(&mut lines).await.unwrap();
        assert!(request.is_none());
    }

    #[tokio::test]
    async fn writes_ok_response_as_single_json_line() {
        let mut buf = Vec::new();
        let response = ToolResponse::ok("1", serde_json::json!({"a": 1}));
        write_response(&mut buf, &response).await.unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(text.matches('\n').count(), 1);
    }
}
