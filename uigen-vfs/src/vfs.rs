// ---------------------------------------------------------------------------
// In-memory project file tree
// ---------------------------------------------------------------------------
//
// A flat map from normalized path to node. Parent/child relationships are
// derived from key prefixes, so a `BTreeMap` gives sorted listings and
// contiguous subtree ranges for free.
// ---------------------------------------------------------------------------

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::VfsError;
use crate::path::{
	ancestor_paths, base_name, child_prefix, is_descendant, normalize_path, validate_path,
	VfsLimits, VFS_ROOT,
};

// ---------------------------------------------------------------------------
// Node types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
	File,
	Directory,
}

impl NodeType {
	pub fn as_str(&self) -> &str {
		match self {
			Self::File => "file",
			Self::Directory => "directory",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
	File { content: String },
	Directory,
}

impl Node {
	fn node_type(&self) -> NodeType {
		match self {
			Self::File { .. } => NodeType::File,
			Self::Directory => NodeType::Directory,
		}
	}

	fn size(&self) -> u64 {
		match self {
			Self::File { content } => content.len() as u64,
			Self::Directory => 0,
		}
	}
}

/// Persisted form of one node. `name` and `path` are informational on input;
/// the collection key is authoritative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileNode {
	#[serde(rename = "type")]
	pub node_type: NodeType,
	#[serde(default)]
	pub name: String,
	#[serde(default)]
	pub path: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub content: Option<String>,
}

impl FileNode {
	pub fn file(path: &str, content: impl Into<String>) -> Self {
		Self {
			node_type: NodeType::File,
			name: base_name(path).to_string(),
			path: path.to_string(),
			content: Some(content.into()),
		}
	}

	pub fn directory(path: &str) -> Self {
		Self {
			node_type: NodeType::Directory,
			name: base_name(path).to_string(),
			path: path.to_string(),
			content: None,
		}
	}
}

/// Serialized tree: normalized path to node, sorted by path.
pub type NodeMap = BTreeMap<String, FileNode>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
	pub name: String,
	pub node_type: NodeType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsResult {
	pub total_size: u64,
	pub node_count: usize,
	pub file_count: usize,
	pub directory_count: usize,
}

// ---------------------------------------------------------------------------
// VirtualFileSystem
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct VirtualFileSystem {
	nodes: BTreeMap<String, Node>,
	limits: VfsLimits,
	total_size: u64,
}

impl Default for VirtualFileSystem {
	fn default() -> Self {
		Self::new(VfsLimits::default())
	}
}

impl VirtualFileSystem {
	// -- Constructor ------------------------------------------------------

	pub fn new(limits: VfsLimits) -> Self {
		Self {
			nodes: Self::root_only(),
			limits,
			total_size: 0,
		}
	}

	pub fn limits(&self) -> &VfsLimits {
		&self.limits
	}

	// -- Helpers (private) ------------------------------------------------

	fn root_only() -> BTreeMap<String, Node> {
		let mut nodes = BTreeMap::new();
		nodes.insert(VFS_ROOT.to_string(), Node::Directory);
		nodes
	}

	fn assert_valid_path(&self, path: &str) -> Result<String, VfsError> {
		let normalized = normalize_path(path);
		if let Some(err) = validate_path(&normalized, &self.limits) {
			return Err(VfsError::InvalidPath(format!("{}: {}", err, path)));
		}
		Ok(normalized)
	}

	fn node(&self, path: &str) -> Result<&Node, VfsError> {
		self.nodes
			.get(path)
			.ok_or_else(|| VfsError::NotFound(format!("No such file or directory: {}", path)))
	}

	fn assert_file_size(&self, size: u64, path: &str) -> Result<(), VfsError> {
		if size > self.limits.max_file_size {
			return Err(VfsError::LimitExceeded(format!(
				"File size {} exceeds limit ({}): {}",
				size, self.limits.max_file_size, path
			)));
		}
		Ok(())
	}

	fn assert_node_budget(&self, additional: usize) -> Result<(), VfsError> {
		if self.nodes.len() + additional > self.limits.max_node_count {
			return Err(VfsError::LimitExceeded(format!(
				"Maximum node count exceeded ({})",
				self.limits.max_node_count
			)));
		}
		Ok(())
	}

	/// Ancestors of `path` that do not exist yet, root first. Fails if any
	/// existing ancestor is a file.
	fn missing_ancestors(&self, path: &str) -> Result<Vec<String>, VfsError> {
		let mut missing = Vec::new();
		for ancestor in ancestor_paths(path) {
			match self.nodes.get(&ancestor) {
				Some(Node::Directory) => {}
				Some(Node::File { .. }) => {
					return Err(VfsError::NotDirectory(format!(
						"Ancestor is a file: {} (while resolving {})",
						ancestor, path
					)));
				}
				None => missing.push(ancestor),
			}
		}
		Ok(missing)
	}

	fn create_directories(&mut self, paths: Vec<String>) {
		for p in paths {
			tracing::debug!(path = %p, "implicit mkdir");
			self.nodes.insert(p, Node::Directory);
		}
	}

	/// Every key strictly beneath `dir`, in sorted order.
	fn descendant_keys(&self, dir: &str) -> Vec<String> {
		let prefix = child_prefix(dir);
		self.nodes
			.range(prefix.clone()..)
			.take_while(|(k, _)| k.starts_with(&prefix))
			.filter(|(k, _)| k.as_str() != dir)
			.map(|(k, _)| k.clone())
			.collect()
	}

	// -- Queries ----------------------------------------------------------

	pub fn exists(&self, path: &str) -> bool {
		self.nodes.contains_key(&normalize_path(path))
	}

	pub fn is_file(&self, path: &str) -> bool {
		matches!(self.nodes.get(&normalize_path(path)), Some(Node::File { .. }))
	}

	pub fn is_directory(&self, path: &str) -> bool {
		matches!(self.nodes.get(&normalize_path(path)), Some(Node::Directory))
	}

	pub fn read(&self, path: &str) -> Result<&str, VfsError> {
		let normalized = self.assert_valid_path(path)?;
		match self.node(&normalized)? {
			Node::File { content } => Ok(content.as_str()),
			Node::Directory => Err(VfsError::IsDirectory(normalized)),
		}
	}

	pub fn list(&self, path: &str) -> Result<Vec<String>, VfsError> {
		Ok(self
			.list_entries(path)?
			.into_iter()
			.map(|e| e.name)
			.collect())
	}

	/// Immediate children of a directory, sorted by name.
	pub fn list_entries(&self, path: &str) -> Result<Vec<DirEntry>, VfsError> {
		let normalized = self.assert_valid_path(path)?;
		if let Node::File { .. } = self.node(&normalized)? {
			return Err(VfsError::NotDirectory(normalized));
		}

		let prefix = child_prefix(&normalized);
		let entries = self
			.nodes
			.range(prefix.clone()..)
			.take_while(|(k, _)| k.starts_with(&prefix))
			.filter_map(|(k, node)| {
				let remainder = &k[prefix.len()..];
				if remainder.is_empty() || remainder.contains('/') {
					return None;
				}
				Some(DirEntry {
					name: remainder.to_string(),
					node_type: node.node_type(),
				})
			})
			.collect();
		Ok(entries)
	}

	// -- Mutations --------------------------------------------------------

	/// Create or overwrite a file, creating any missing ancestor directories.
	pub fn write(&mut self, path: &str, content: &str) -> Result<(), VfsError> {
		let normalized = self.assert_valid_path(path)?;
		let new_size = content.len() as u64;
		self.assert_file_size(new_size, &normalized)?;

		let old_size = match self.nodes.get(&normalized) {
			Some(Node::Directory) => return Err(VfsError::IsDirectory(normalized)),
			Some(Node::File { content }) => Some(content.len() as u64),
			None => None,
		};

		let missing = self.missing_ancestors(&normalized)?;
		let new_nodes = missing.len() + usize::from(old_size.is_none());
		self.assert_node_budget(new_nodes)?;

		let projected = self.total_size - old_size.unwrap_or(0) + new_size;
		if projected > self.limits.max_total_size {
			return Err(VfsError::LimitExceeded(format!(
				"Total storage size would exceed limit ({})",
				self.limits.max_total_size
			)));
		}

		self.create_directories(missing);
		self.nodes.insert(
			normalized.clone(),
			Node::File {
				content: content.to_string(),
			},
		);
		self.total_size = projected;

		tracing::debug!(path = %normalized, size = new_size, new = old_size.is_none(), "write");
		Ok(())
	}

	/// Idempotent mkdir -p.
	pub fn create_directory(&mut self, path: &str) -> Result<(), VfsError> {
		let normalized = self.assert_valid_path(path)?;
		match self.nodes.get(&normalized) {
			Some(Node::Directory) => return Ok(()),
			Some(Node::File { .. }) => return Err(VfsError::IsFile(normalized)),
			None => {}
		}

		let missing = self.missing_ancestors(&normalized)?;
		self.assert_node_budget(missing.len() + 1)?;
		self.create_directories(missing);
		self.nodes.insert(normalized.clone(), Node::Directory);

		tracing::debug!(path = %normalized, "mkdir");
		Ok(())
	}

	/// Remove a file or a whole subtree. Returns the number of nodes removed.
	pub fn delete(&mut self, path: &str) -> Result<usize, VfsError> {
		let normalized = self.assert_valid_path(path)?;
		if normalized == VFS_ROOT {
			return Err(VfsError::InvalidOperation(
				"Cannot delete root directory".to_string(),
			));
		}
		self.node(&normalized)?;

		let mut doomed = self.descendant_keys(&normalized);
		doomed.push(normalized.clone());

		for key in &doomed {
			if let Some(node) = self.nodes.remove(key) {
				self.total_size -= node.size();
			}
		}

		tracing::debug!(path = %normalized, removed = doomed.len(), "delete");
		Ok(doomed.len())
	}

	/// Relocate a file or subtree. The destination must be free; missing
	/// ancestors of the destination are created.
	pub fn move_path(&mut self, from: &str, to: &str) -> Result<(), VfsError> {
		let normalized_from = self.assert_valid_path(from)?;
		let normalized_to = self.assert_valid_path(to)?;

		if normalized_from == VFS_ROOT {
			return Err(VfsError::InvalidOperation(
				"Cannot move root directory".to_string(),
			));
		}
		self.node(&normalized_from)?;

		if normalized_from == normalized_to {
			return Ok(());
		}

		if is_descendant(&normalized_to, &normalized_from) {
			return Err(VfsError::InvalidOperation(format!(
				"Cannot move a directory into its own descendant: {} -> {}",
				normalized_from, normalized_to
			)));
		}

		if self.nodes.contains_key(&normalized_to) {
			return Err(VfsError::AlreadyExists(format!(
				"Destination already exists: {}",
				normalized_to
			)));
		}

		let missing = self.missing_ancestors(&normalized_to)?;
		self.assert_node_budget(missing.len())?;

		let mut relocations = vec![(normalized_from.clone(), normalized_to.clone())];
		for desc in self.descendant_keys(&normalized_from) {
			let target = format!("{}{}", normalized_to, &desc[normalized_from.len()..]);
			if let Some(err) = validate_path(&target, &self.limits) {
				return Err(VfsError::InvalidPath(format!("{}: {}", err, target)));
			}
			relocations.push((desc, target));
		}

		self.create_directories(missing);
		let moved: Vec<(String, Node)> = relocations
			.into_iter()
			.filter_map(|(old, new)| self.nodes.remove(&old).map(|node| (new, node)))
			.collect();
		for (new, node) in moved {
			self.nodes.insert(new, node);
		}

		tracing::debug!(from = %normalized_from, to = %normalized_to, "move");
		Ok(())
	}

	// -- Serialization ----------------------------------------------------

	/// Flat snapshot of the whole tree, root included.
	pub fn serialize(&self) -> NodeMap {
		self.nodes
			.iter()
			.map(|(path, node)| {
				let file_node = match node {
					Node::File { content } => FileNode::file(path, content.as_str()),
					Node::Directory => FileNode::directory(path),
				};
				(path.clone(), file_node)
			})
			.collect()
	}

	/// Replace the whole tree with `nodes`. Everything is validated before
	/// the current state is touched; on error the tree is unchanged.
	pub fn deserialize_from_nodes<I>(&mut self, nodes: I) -> Result<(), VfsError>
	where
		I: IntoIterator<Item = (String, FileNode)>,
	{
		let mut staged = Self::root_only();
		let mut total_size: u64 = 0;

		for (key, file_node) in nodes {
			let normalized = normalize_path(&key);
			if let Some(err) = validate_path(&normalized, &self.limits) {
				return Err(VfsError::Malformed(format!("{}: {}", err, key)));
			}

			let node = match file_node.node_type {
				NodeType::File => {
					if normalized == VFS_ROOT {
						return Err(VfsError::Malformed(
							"Root must be a directory".to_string(),
						));
					}
					let content = file_node.content.unwrap_or_default();
					self.assert_file_size(content.len() as u64, &normalized)
						.map_err(|e| VfsError::Malformed(e.to_string()))?;
					Node::File { content }
				}
				NodeType::Directory => {
					if file_node.content.is_some() {
						tracing::warn!(path = %normalized, "dropping content on directory node");
					}
					Node::Directory
				}
			};

			for ancestor in ancestor_paths(&normalized) {
				match staged.get(&ancestor) {
					Some(Node::File { .. }) => {
						return Err(VfsError::Malformed(format!(
							"Ancestor {} of {} is recorded as a file",
							ancestor, normalized
						)));
					}
					Some(Node::Directory) => {}
					None => {
						staged.insert(ancestor, Node::Directory);
					}
				}
			}

			match staged.get(&normalized) {
				Some(existing) if *existing == node => continue,
				Some(existing) => {
					return Err(VfsError::Malformed(format!(
						"Conflicting entries for {} ({} vs {})",
						normalized,
						existing.node_type().as_str(),
						node.node_type().as_str()
					)));
				}
				None => {}
			}

			total_size += node.size();
			staged.insert(normalized, node);
		}

		if staged.len() > self.limits.max_node_count {
			return Err(VfsError::Malformed(format!(
				"Node count {} exceeds limit ({})",
				staged.len(),
				self.limits.max_node_count
			)));
		}
		if total_size > self.limits.max_total_size {
			return Err(VfsError::Malformed(format!(
				"Total size {} exceeds limit ({})",
				total_size, self.limits.max_total_size
			)));
		}

		self.nodes = staged;
		self.total_size = total_size;
		tracing::debug!(nodes = self.nodes.len(), total_size, "deserialized tree");
		Ok(())
	}

	// -- Metrics ----------------------------------------------------------

	pub fn metrics(&self) -> MetricsResult {
		let file_count = self
			.nodes
			.values()
			.filter(|n| matches!(n, Node::File { .. }))
			.count();
		MetricsResult {
			total_size: self.total_size,
			node_count: self.nodes.len(),
			file_count,
			directory_count: self.nodes.len() - file_count,
		}
	}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
