// ---------------------------------------------------------------------------
// str_replace_editor — view / create / str_replace / insert / undo_edit
// ---------------------------------------------------------------------------

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{ToolError, VfsError};
use crate::path::{is_descendant, normalize_path};
use crate::vfs::{NodeType, VirtualFileSystem};

/// Typed form of an editor tool call, tagged by `command`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum EditorCommand {
	View {
		path: String,
		#[serde(default)]
		view_range: Option<[i64; 2]>,
		#[serde(default)]
		line_numbers: bool,
	},
	Create {
		path: String,
		#[serde(default, alias = "content")]
		file_text: String,
	},
	StrReplace {
		path: String,
		old_str: String,
		#[serde(default)]
		new_str: String,
	},
	Insert {
		path: String,
		#[serde(alias = "line_number")]
		insert_line: i64,
		#[serde(alias = "text")]
		new_str: String,
	},
	UndoEdit {
		path: String,
	},
}

/// Editor tool. Keeps one pre-edit snapshot per file for `undo_edit`;
/// the file tree itself is passed in on every call.
#[derive(Debug, Default)]
pub struct StrReplaceTool {
	history: HashMap<String, String>,
}

impl StrReplaceTool {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn execute(
		&mut self,
		vfs: &mut VirtualFileSystem,
		command: EditorCommand,
	) -> Result<String, ToolError> {
		match command {
			EditorCommand::View {
				path,
				view_range,
				line_numbers,
			} => self.view(vfs, &path, view_range, line_numbers),
			EditorCommand::Create { path, file_text } => self.create(vfs, &path, &file_text),
			EditorCommand::StrReplace {
				path,
				old_str,
				new_str,
			} => self.str_replace(vfs, &path, &old_str, &new_str),
			EditorCommand::Insert {
				path,
				insert_line,
				new_str,
			} => self.insert(vfs, &path, insert_line, &new_str),
			EditorCommand::UndoEdit { path } => self.undo_edit(vfs, &path),
		}
	}

	// -- Commands ---------------------------------------------------------

	pub fn view(
		&self,
		vfs: &VirtualFileSystem,
		path: &str,
		view_range: Option<[i64; 2]>,
		line_numbers: bool,
	) -> Result<String, ToolError> {
		let normalized = normalize_path(path);
		if vfs.is_directory(&normalized) {
			if view_range.is_some() {
				return Err(ToolError::InvalidRange(format!(
					"view_range applies to files only; {} is a directory",
					normalized
				)));
			}
			let entries = vfs.list_entries(&normalized)?;
			if entries.is_empty() {
				return Ok("(empty directory)".to_string());
			}
			let listing: Vec<String> = entries
				.into_iter()
				.map(|e| match e.node_type {
					NodeType::Directory => format!("{}/", e.name),
					NodeType::File => e.name,
				})
				.collect();
			return Ok(listing.join("\n"));
		}

		let content = vfs.read(&normalized)?;
		match view_range {
			None if !line_numbers => Ok(content.to_string()),
			None => Ok(number_lines(content.lines(), 1)),
			Some([start, end]) => {
				let total = content.lines().count() as i64;
				let end = if end == -1 { total } else { end };
				if start < 1 || end < start || end > total {
					return Err(ToolError::InvalidRange(format!(
						"view_range [{}, {}] is outside 1..={} for {}",
						start, end, total, normalized
					)));
				}
				let slice = content
					.lines()
					.skip(start as usize - 1)
					.take((end - start + 1) as usize);
				Ok(number_lines(slice, start as usize))
			}
		}
	}

	pub fn create(
		&mut self,
		vfs: &mut VirtualFileSystem,
		path: &str,
		file_text: &str,
	) -> Result<String, ToolError> {
		let normalized = normalize_path(path);
		if vfs.is_file(&normalized) {
			return Err(VfsError::AlreadyExists(format!(
				"File already exists: {} (use str_replace to modify it)",
				normalized
			))
			.into());
		}
		vfs.write(&normalized, file_text)?;
		self.history.remove(&normalized);

		tracing::debug!(path = %normalized, "editor create");
		Ok(format!("Created file: {}", normalized))
	}

	pub fn str_replace(
		&mut self,
		vfs: &mut VirtualFileSystem,
		path: &str,
		old_str: &str,
		new_str: &str,
	) -> Result<String, ToolError> {
		let normalized = normalize_path(path);
		if old_str.is_empty() {
			return Err(ToolError::InvalidArguments(
				"old_str must not be empty".to_string(),
			));
		}

		let before = vfs.read(&normalized)?.to_string();
		let positions = occurrences(&before, old_str);
		let at = match positions.as_slice() {
			[] => return Err(ToolError::NoMatch(normalized)),
			[at] => *at,
			_ => {
				return Err(ToolError::AmbiguousMatch {
					path: normalized,
					count: positions.len(),
				});
			}
		};

		let mut after = String::with_capacity(before.len() - old_str.len() + new_str.len());
		after.push_str(&before[..at]);
		after.push_str(new_str);
		after.push_str(&before[at + old_str.len()..]);

		vfs.write(&normalized, &after)?;
		self.history.insert(normalized.clone(), before);

		tracing::debug!(path = %normalized, offset = at, "editor str_replace");
		Ok(format!("Replaced text in {}", normalized))
	}

	pub fn insert(
		&mut self,
		vfs: &mut VirtualFileSystem,
		path: &str,
		insert_line: i64,
		text: &str,
	) -> Result<String, ToolError> {
		let normalized = normalize_path(path);
		let before = vfs.read(&normalized)?.to_string();
		let line_count = before.lines().count();

		let index = usize::try_from(insert_line)
			.ok()
			.filter(|n| *n <= line_count)
			.ok_or_else(|| {
				ToolError::InvalidRange(format!(
					"insert_line {} is outside 0..={} for {}",
					insert_line, line_count, normalized
				))
			})?;

		let eol = line_ending(&before);
		let text = if eol == "\r\n" {
			text.replace("\r\n", "\n").replace('\n', "\r\n")
		} else {
			text.to_string()
		};

		let after = if before.is_empty() {
			text
		} else {
			let offset: usize = before.split_inclusive('\n').take(index).map(str::len).sum();
			let mut after = String::with_capacity(before.len() + text.len() + eol.len());
			after.push_str(&before[..offset]);
			if offset == before.len() && !before.ends_with('\n') {
				after.push_str(eol);
				after.push_str(&text);
			} else {
				after.push_str(&text);
				after.push_str(eol);
			}
			after.push_str(&before[offset..]);
			after
		};

		vfs.write(&normalized, &after)?;
		self.history.insert(normalized.clone(), before);

		tracing::debug!(path = %normalized, line = index, "editor insert");
		Ok(format!("Inserted text after line {} in {}", index, normalized))
	}

	pub fn undo_edit(
		&mut self,
		vfs: &mut VirtualFileSystem,
		path: &str,
	) -> Result<String, ToolError> {
		let normalized = normalize_path(path);
		let previous = self
			.history
			.get(&normalized)
			.ok_or_else(|| ToolError::NoHistory(normalized.clone()))?;

		vfs.write(&normalized, previous)?;
		self.history.remove(&normalized);

		tracing::debug!(path = %normalized, "editor undo");
		Ok(format!("Reverted last edit to {}", normalized))
	}

	// -- History bookkeeping ----------------------------------------------

	pub fn has_history(&self, path: &str) -> bool {
		self.history.contains_key(&normalize_path(path))
	}

	/// Drop history for `path` and everything beneath it.
	pub fn forget(&mut self, path: &str) {
		let normalized = normalize_path(path);
		self.history
			.retain(|k, _| k != &normalized && !is_descendant(k, &normalized));
	}

	/// Re-key history after `from` (file or subtree) moved to `to`.
	pub fn relocate(&mut self, from: &str, to: &str) {
		let from = normalize_path(from);
		let to = normalize_path(to);
		let moved: Vec<String> = self
			.history
			.keys()
			.filter(|k| **k == from || is_descendant(k, &from))
			.cloned()
			.collect();
		for old in moved {
			if let Some(snapshot) = self.history.remove(&old) {
				let new = format!("{}{}", to, &old[from.len()..]);
				self.history.insert(new, snapshot);
			}
		}
	}

	pub fn clear_history(&mut self) {
		self.history.clear();
	}
}

/// Byte offsets of every occurrence of `needle`, overlapping ones included.
fn occurrences(haystack: &str, needle: &str) -> Vec<usize> {
	let mut found = Vec::new();
	let mut start = 0;
	while let Some(pos) = haystack[start..].find(needle) {
		let at = start + pos;
		found.push(at);
		start = at + haystack[at..].chars().next().map_or(1, char::len_utf8);
	}
	found
}

/// CRLF if the file already uses it anywhere, LF otherwise.
fn line_ending(content: &str) -> &'static str {
	if content.contains("\r\n") {
		"\r\n"
	} else {
		"\n"
	}
}

fn number_lines<'a>(lines: impl Iterator<Item = &'a str>, first: usize) -> String {
	lines
		.enumerate()
		.map(|(i, line)| format!("{}\t{}", first + i, line))
		.collect::<Vec<_>>()
		.join("\n")
}
