// ---------------------------------------------------------------------------
// VfsServer — JSON-RPC dispatcher
// ---------------------------------------------------------------------------
//
// Routes NDJSON JSON-RPC 2.0 requests to a ToolSession. The host loads the
// persisted tree, the agent loop relays tool calls one at a time, and the
// host saves the resulting tree when the turn ends.
// ---------------------------------------------------------------------------

use std::io::{self, BufRead};

use crate::error::VfsError;
use crate::protocol::*;
use crate::tools::ToolSession;
use crate::transport::NdjsonTransport;

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct VfsServer {
	transport: NdjsonTransport,
	session: Option<ToolSession>,
}

impl VfsServer {
	/// Create a new server. The session is created by `initialize`.
	pub fn new(transport: NdjsonTransport) -> Self {
		Self {
			transport,
			session: None,
		}
	}

	/// Main loop: read JSON-RPC messages from stdin, dispatch to handlers.
	pub fn run(&mut self) -> Result<(), VfsError> {
		let stdin = io::stdin();
		self.serve(stdin.lock())
	}

	/// Only a failing reader ends the loop. Bad lines get a parse error reply.
	pub fn serve<R: BufRead>(&mut self, mut reader: R) -> Result<(), VfsError> {
		let mut buf = Vec::new();
		loop {
			buf.clear();
			if reader.read_until(b'\n', &mut buf)? == 0 {
				return Ok(());
			}

			let line = match std::str::from_utf8(&buf) {
				Ok(line) => line,
				Err(e) => {
					tracing::warn!("Parse error: {}", e);
					self.write_parse_error();
					continue;
				}
			};
			let trimmed = line.trim();
			if trimmed.is_empty() {
				continue;
			}

			match serde_json::from_str::<JsonRpcRequest>(trimmed) {
				Ok(req) => self.dispatch(req),
				Err(e) => {
					tracing::warn!("Parse error: {}", e);
					self.write_parse_error();
				}
			}
		}
	}

	fn write_parse_error(&mut self) {
		self.transport.write_error(
			serde_json::Value::from(0),
			INTERNAL_ERROR,
			"Parse error: invalid JSON-RPC request",
			None,
		);
	}

	// ── Dispatch ──────────────────────────────────────────────────────────

	fn dispatch(&mut self, req: JsonRpcRequest) {
		let id = req.id;
		tracing::debug!(id = %id, method = %req.method, "request");

		let result = match req.method.as_str() {
			// -- Lifecycle -----------------------------------------------
			"initialize" => self.handle_initialize(req.params),

			// -- Persistence boundary ------------------------------------
			"project/load" => self.with_session_mut(|s| handle_load(s, req.params)),
			"project/save" => self.with_session(|s| {
				Ok(serde_json::json!({ "files": s.save() }))
			}),

			// -- Agent tools ---------------------------------------------
			"tools/list" => self.with_session(|s| {
				Ok(serde_json::json!({ "tools": s.definitions() }))
			}),
			"tools/call" => self.with_session_mut(|s| handle_tool_call(s, req.params)),

			// -- Host-side reads -----------------------------------------
			"fs/read" => self.with_session(|s| handle_read(s, req.params)),
			"fs/list" => self.with_session(|s| handle_list(s, req.params)),
			"fs/exists" => self.with_session(|s| handle_exists(s, req.params)),

			// -- Unknown -------------------------------------------------
			_ => {
				self.transport.write_error(
					id,
					METHOD_NOT_FOUND,
					format!("Method not found: {}", req.method),
					None,
				);
				return;
			}
		};

		match result {
			Ok(value) => self.transport.write_response(id, value),
			Err(e) => {
				let code = match &e {
					VfsError::InvalidParams(_) => INVALID_PARAMS,
					_ => VFS_ERROR,
				};
				self.transport
					.write_error(id, code, e.to_string(), Some(e.to_json_rpc_error()));
			}
		}
	}

	// ── Session accessors ─────────────────────────────────────────────────

	fn with_session<F>(&self, f: F) -> Result<serde_json::Value, VfsError>
	where
		F: FnOnce(&ToolSession) -> Result<serde_json::Value, VfsError>,
	{
		match &self.session {
			Some(s) => f(s),
			None => Err(VfsError::NotInitialized),
		}
	}

	fn with_session_mut<F>(&mut self, f: F) -> Result<serde_json::Value, VfsError>
	where
		F: FnOnce(&mut ToolSession) -> Result<serde_json::Value, VfsError>,
	{
		match &mut self.session {
			Some(s) => f(s),
			None => Err(VfsError::NotInitialized),
		}
	}

	// ── Initialize ────────────────────────────────────────────────────────

	fn handle_initialize(
		&mut self,
		params: serde_json::Value,
	) -> Result<serde_json::Value, VfsError> {
		let p: InitializeParams = if params.is_null() {
			InitializeParams::default()
		} else {
			parse_params(params)?
		};
		let limits = p.limits.unwrap_or_default().into_limits();
		tracing::info!(?limits, "session initialized");
		self.session = Some(ToolSession::new(limits));
		Ok(serde_json::json!({}))
	}
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn parse_params<T: serde::de::DeserializeOwned>(params: serde_json::Value) -> Result<T, VfsError> {
	serde_json::from_value(params).map_err(|e| VfsError::InvalidParams(e.to_string()))
}

fn handle_load(
	session: &mut ToolSession,
	params: serde_json::Value,
) -> Result<serde_json::Value, VfsError> {
	let p: LoadParams = parse_params(params)?;
	session.load(p.files)?;
	Ok(serde_json::json!({ "nodeCount": session.vfs().metrics().node_count }))
}

fn handle_tool_call(
	session: &mut ToolSession,
	params: serde_json::Value,
) -> Result<serde_json::Value, VfsError> {
	let p: ToolCallParams = parse_params(params)?;
	Ok(session.call(&p.name, p.arguments).to_json())
}

fn handle_read(session: &ToolSession, params: serde_json::Value) -> Result<serde_json::Value, VfsError> {
	let p: PathParams = parse_params(params)?;
	let content = session.vfs().read(&p.path)?;
	Ok(serde_json::json!({ "content": content }))
}

fn handle_list(session: &ToolSession, params: serde_json::Value) -> Result<serde_json::Value, VfsError> {
	let p: PathParams = parse_params(params)?;
	let entries: Vec<serde_json::Value> = session
		.vfs()
		.list_entries(&p.path)?
		.into_iter()
		.map(|e| serde_json::json!({ "name": e.name, "type": e.node_type }))
		.collect();
	Ok(serde_json::json!({ "entries": entries }))
}

fn handle_exists(session: &ToolSession, params: serde_json::Value) -> Result<serde_json::Value, VfsError> {
	let p: PathParams = parse_params(params)?;
	Ok(serde_json::json!({ "exists": session.vfs().exists(&p.path) }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
