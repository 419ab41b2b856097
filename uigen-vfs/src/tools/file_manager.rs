// ---------------------------------------------------------------------------
// file_manager — rename / move / delete
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::error::{ToolError, VfsError};
use crate::path::{join_path, normalize_path, parent_path};
use crate::tools::str_replace::StrReplaceTool;
use crate::vfs::VirtualFileSystem;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum FileManagerCommand {
	Rename {
		path: String,
		#[serde(alias = "new_name")]
		new_path: String,
	},
	Move {
		#[serde(alias = "from_path")]
		path: String,
		#[serde(alias = "to_path")]
		new_path: String,
	},
	Delete {
		path: String,
	},
}

/// Structural operations. Stateless itself, but keeps the editor's undo
/// history consistent with the tree it changes.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileManagerTool;

impl FileManagerTool {
	pub fn new() -> Self {
		Self
	}

	pub fn execute(
		&self,
		vfs: &mut VirtualFileSystem,
		editor: &mut StrReplaceTool,
		command: FileManagerCommand,
	) -> Result<String, ToolError> {
		match command {
			FileManagerCommand::Rename { path, new_path } => {
				self.rename(vfs, editor, &path, &new_path)
			}
			FileManagerCommand::Move { path, new_path } => {
				self.move_path(vfs, editor, &path, &new_path)
			}
			FileManagerCommand::Delete { path } => self.delete(vfs, editor, &path),
		}
	}

	/// A bare name renames in place; an absolute path behaves like `move`.
	pub fn rename(
		&self,
		vfs: &mut VirtualFileSystem,
		editor: &mut StrReplaceTool,
		path: &str,
		new_path: &str,
	) -> Result<String, ToolError> {
		let target = new_path.trim();
		if target.starts_with('/') {
			return self.move_path(vfs, editor, path, target);
		}
		if target.is_empty() || target == "." || target == ".." || target.contains(['/', '\\']) {
			return Err(ToolError::InvalidArguments(format!(
				"new_path must be a bare file name or an absolute path, got {:?}",
				new_path
			)));
		}

		let normalized = normalize_path(path);
		let parent = parent_path(&normalized).ok_or_else(|| {
			VfsError::InvalidOperation("Cannot rename root directory".to_string())
		})?;
		let sibling = join_path(&parent, target);
		self.move_path(vfs, editor, &normalized, &sibling)
	}

	pub fn move_path(
		&self,
		vfs: &mut VirtualFileSystem,
		editor: &mut StrReplaceTool,
		from: &str,
		to: &str,
	) -> Result<String, ToolError> {
		let from = normalize_path(from);
		let to = normalize_path(to);
		vfs.move_path(&from, &to)?;
		editor.relocate(&from, &to);

		tracing::debug!(from = %from, to = %to, "file_manager move");
		Ok(format!("Moved {} to {}", from, to))
	}

	pub fn delete(
		&self,
		vfs: &mut VirtualFileSystem,
		editor: &mut StrReplaceTool,
		path: &str,
	) -> Result<String, ToolError> {
		let normalized = normalize_path(path);
		let removed = vfs.delete(&normalized)?;
		editor.forget(&normalized);

		tracing::debug!(path = %normalized, removed, "file_manager delete");
		if removed > 1 {
			Ok(format!(
				"Deleted {} and {} nested entries",
				normalized,
				removed - 1
			))
		} else {
			Ok(format!("Deleted {}", normalized))
		}
	}
}
