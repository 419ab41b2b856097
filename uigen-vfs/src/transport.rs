use std::io::{self, Write};

use serde::Serialize;

#[derive(Serialize)]
struct JsonRpcResponse<'a> {
    jsonrpc: &'a str,
    id: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcErrorBody>,
}

#[derive(Serialize)]
struct JsonRpcErrorBody {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

/// Writes one JSON-RPC message per line. Defaults to stdout.
pub struct NdjsonTransport {
    out: Box<dyn Write + Send>,
}

impl Default for NdjsonTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for NdjsonTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NdjsonTransport").finish_non_exhaustive()
    }
}

impl NdjsonTransport {
    pub fn new() -> Self {
        Self::with_writer(io::stdout())
    }

    pub fn with_writer(out: impl Write + Send + 'static) -> Self {
        Self { out: Box::new(out) }
    }

    pub fn write_response(&mut self, id: serde_json::Value, result: serde_json::Value) {
        self.write_line(&JsonRpcResponse {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        });
    }

    pub fn write_error(
        &mut self,
        id: serde_json::Value,
        code: i32,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) {
        self.write_line(&JsonRpcResponse {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcErrorBody {
                code,
                message: message.into(),
                data,
            }),
        });
    }

    fn write_line(&mut self, value: &impl Serialize) {
        if let Err(e) = serde_json::to_writer(&mut self.out, value) {
            tracing::error!("Failed to serialize: {}", e);
            return;
        }
        let _ = writeln!(self.out);
        let _ = self.out.flush();
    }
}
