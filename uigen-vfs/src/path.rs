//! Project path handling.
//!
//! Every path inside the tree is absolute, `/`-separated and canonical. Raw
//! input from the model goes through [`normalize_path`] first, so
//! `components//Button.jsx` and `/components/./Button.jsx` address the same
//! node.

pub const VFS_ROOT: &str = "/";

// ── Limits ──────────────────────────────────────────────────────────────────

/// Resource ceilings for one project tree. Supplied by the host at
/// `initialize`; anything omitted keeps its default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsLimits {
    pub max_file_size: u64,
    pub max_total_size: u64,
    pub max_path_depth: usize,
    pub max_name_length: usize,
    pub max_node_count: usize,
    pub max_path_length: usize,
}

impl Default for VfsLimits {
    fn default() -> Self {
        Self {
            max_file_size: 10 << 20,
            max_total_size: 100 << 20,
            max_path_depth: 32,
            max_name_length: 255,
            max_node_count: 10_000,
            max_path_length: 1024,
        }
    }
}

// ── Normalization ───────────────────────────────────────────────────────────

/// Canonical form of a project path. Backslashes count as separators,
/// empty and `.` segments vanish, `..` pops a segment but stops at root.
/// Blank input is the root.
pub fn normalize_path(input: &str) -> String {
    let unified = input.trim().replace('\\', "/");
    let mut stack: Vec<&str> = Vec::new();
    for seg in unified.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            name => stack.push(name),
        }
    }
    if stack.is_empty() {
        return VFS_ROOT.to_string();
    }
    let mut out = String::with_capacity(unified.len() + 1);
    for name in stack {
        out.push('/');
        out.push_str(name);
    }
    out
}

// ── Structure helpers (inputs are already normalized) ───────────────────────

/// Containing directory, or `None` at root.
pub fn parent_path(path: &str) -> Option<String> {
    if path == VFS_ROOT {
        return None;
    }
    match path.rsplit_once('/') {
        Some(("", _)) | None => Some(VFS_ROOT.to_string()),
        Some((dir, _)) => Some(dir.to_string()),
    }
}

/// Last segment; empty for root.
pub fn base_name(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, name)| name)
}

pub fn join_path(dir: &str, name: &str) -> String {
    format!("{}{}", child_prefix(dir), name)
}

/// Key prefix shared by every node beneath `dir`.
pub fn child_prefix(dir: &str) -> String {
    if dir == VFS_ROOT {
        VFS_ROOT.to_string()
    } else {
        format!("{}/", dir)
    }
}

/// True when `path` lies strictly beneath `ancestor`.
pub fn is_descendant(path: &str, ancestor: &str) -> bool {
    path != ancestor && path.starts_with(&child_prefix(ancestor))
}

/// Directories that must exist for `path` to exist: root first, down to
/// the immediate parent. Root itself yields `["/"]`.
pub fn ancestor_paths(path: &str) -> Vec<String> {
    let mut out = vec![VFS_ROOT.to_string()];
    out.extend(
        path.match_indices('/')
            .map(|(i, _)| i)
            .filter(|&i| i > 0)
            .map(|i| path[..i].to_string()),
    );
    out
}

pub fn path_depth(path: &str) -> usize {
    path.split('/').filter(|s| !s.is_empty()).count()
}

// ── Validation ──────────────────────────────────────────────────────────────

fn check_name(name: &str, max_name_length: usize) -> Option<String> {
    if name.len() > max_name_length {
        return Some(format!("Name longer than {} bytes", max_name_length));
    }
    if name.bytes().any(|b| b < 0x20 || b == 0x7f) {
        return Some("Name contains control characters".to_string());
    }
    None
}

/// Check a normalized path against `limits`. Returns the reason it is
/// unacceptable, if any.
pub fn validate_path(path: &str, limits: &VfsLimits) -> Option<String> {
    if path.len() > limits.max_path_length {
        return Some(format!("Path longer than {} bytes", limits.max_path_length));
    }
    if path_depth(path) > limits.max_path_depth {
        return Some(format!(
            "Path nested deeper than {} levels",
            limits.max_path_depth
        ));
    }
    path.split('/')
        .filter(|s| !s.is_empty())
        .find_map(|name| check_name(name, limits.max_name_length))
}
