//! Agent-facing tools over a [`VirtualFileSystem`].
//!
//! The agent loop hands over loosely typed call arguments; they are coerced
//! into [`EditorCommand`] / [`FileManagerCommand`] at this boundary and every
//! failure comes back as a [`ToolOutcome::Failure`] the model can read.

pub mod file_manager;
pub mod str_replace;

use serde::Serialize;

use crate::error::{ToolError, VfsError};
use crate::path::VfsLimits;
use crate::vfs::{NodeMap, VirtualFileSystem};

pub use file_manager::{FileManagerCommand, FileManagerTool};
pub use str_replace::{EditorCommand, StrReplaceTool};

pub const STR_REPLACE_TOOL: &str = "str_replace_editor";
pub const FILE_MANAGER_TOOL: &str = "file_manager";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
	pub name: String,
	pub description: String,
	pub input_schema: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutcome {
	Success(String),
	Failure { code: String, message: String },
}

impl ToolOutcome {
	pub fn is_error(&self) -> bool {
		matches!(self, Self::Failure { .. })
	}

	/// Text fed back into the conversation as the tool result.
	pub fn text(&self) -> &str {
		match self {
			Self::Success(text) => text,
			Self::Failure { message, .. } => message,
		}
	}

	pub fn to_json(&self) -> serde_json::Value {
		let mut value = serde_json::json!({
			"content": self.text(),
			"isError": self.is_error(),
		});
		if let Self::Failure { code, .. } = self {
			value["code"] = serde_json::Value::from(code.as_str());
		}
		value
	}
}

impl From<Result<String, ToolError>> for ToolOutcome {
	fn from(result: Result<String, ToolError>) -> Self {
		match result {
			Ok(text) => Self::Success(text),
			Err(e) => Self::Failure {
				code: e.code().to_string(),
				message: e.to_model_text(),
			},
		}
	}
}

/// One project's tree plus the two tools bound to it, for the lifetime of
/// a single request.
#[derive(Debug, Default)]
pub struct ToolSession {
	vfs: VirtualFileSystem,
	editor: StrReplaceTool,
	file_manager: FileManagerTool,
}

impl ToolSession {
	pub fn new(limits: VfsLimits) -> Self {
		Self {
			vfs: VirtualFileSystem::new(limits),
			editor: StrReplaceTool::new(),
			file_manager: FileManagerTool::new(),
		}
	}

	pub fn vfs(&self) -> &VirtualFileSystem {
		&self.vfs
	}

	/// Replace the tree with a persisted node collection. Undo history
	/// belongs to the previous tree and is dropped.
	pub fn load(&mut self, nodes: NodeMap) -> Result<(), VfsError> {
		self.vfs.deserialize_from_nodes(nodes)?;
		self.editor.clear_history();
		let m = self.vfs.metrics();
		tracing::info!(files = m.file_count, directories = m.directory_count, "project loaded");
		Ok(())
	}

	pub fn save(&self) -> NodeMap {
		let nodes = self.vfs.serialize();
		tracing::info!(nodes = nodes.len(), "project serialized");
		nodes
	}

	pub fn definitions(&self) -> Vec<ToolDefinition> {
		vec![str_replace_definition(), file_manager_definition()]
	}

	/// Run one tool call. Never fails: errors become [`ToolOutcome::Failure`].
	pub fn call(&mut self, name: &str, arguments: serde_json::Value) -> ToolOutcome {
		let outcome = ToolOutcome::from(self.dispatch(name, arguments));
		match &outcome {
			ToolOutcome::Success(_) => tracing::debug!(tool = name, "tool call succeeded"),
			ToolOutcome::Failure { code, .. } => {
				tracing::info!(tool = name, code = %code, "tool call failed")
			}
		}
		outcome
	}

	fn dispatch(&mut self, name: &str, arguments: serde_json::Value) -> Result<String, ToolError> {
		match name {
			STR_REPLACE_TOOL => {
				let command: EditorCommand = parse_arguments(arguments)?;
				self.editor.execute(&mut self.vfs, command)
			}
			FILE_MANAGER_TOOL => {
				let command: FileManagerCommand = parse_arguments(arguments)?;
				self.file_manager
					.execute(&mut self.vfs, &mut self.editor, command)
			}
			other => Err(ToolError::UnknownTool(other.to_string())),
		}
	}
}

fn parse_arguments<T: serde::de::DeserializeOwned>(
	arguments: serde_json::Value,
) -> Result<T, ToolError> {
	serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

// ---------------------------------------------------------------------------
// Schemas
// ---------------------------------------------------------------------------

fn str_replace_definition() -> ToolDefinition {
	ToolDefinition {
		name: STR_REPLACE_TOOL.to_string(),
		description: "View, create and edit files in the project. `create` fails if the file \
			exists; `str_replace` requires old_str to match exactly once; `undo_edit` reverts \
			the most recent str_replace or insert on a file."
			.to_string(),
		input_schema: serde_json::json!({
			"type": "object",
			"properties": {
				"command": {
					"type": "string",
					"enum": ["view", "create", "str_replace", "insert", "undo_edit"]
				},
				"path": { "type": "string", "description": "Absolute path, e.g. /App.jsx" },
				"file_text": { "type": "string", "description": "Content for create" },
				"old_str": { "type": "string", "description": "Exact text to replace; must be unique" },
				"new_str": { "type": "string", "description": "Replacement text, or text to insert" },
				"insert_line": {
					"type": "integer",
					"description": "Insert after this 1-based line; 0 inserts at the start"
				},
				"view_range": {
					"type": "array",
					"items": { "type": "integer" },
					"minItems": 2,
					"maxItems": 2,
					"description": "Files only. [start, end] 1-based inclusive; end -1 reads to the end"
				},
				"line_numbers": { "type": "boolean" }
			},
			"required": ["command", "path"]
		}),
	}
}

fn file_manager_definition() -> ToolDefinition {
	ToolDefinition {
		name: FILE_MANAGER_TOOL.to_string(),
		description: "Rename, move or delete files and directories. Deleting a directory \
			removes everything beneath it."
			.to_string(),
		input_schema: serde_json::json!({
			"type": "object",
			"properties": {
				"command": { "type": "string", "enum": ["rename", "move", "delete"] },
				"path": { "type": "string" },
				"new_path": {
					"type": "string",
					"description": "rename: new name or absolute path; move: destination path"
				}
			},
			"required": ["command", "path"]
		}),
	}
}
