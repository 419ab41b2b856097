use serde::Deserialize;

use crate::path::VfsLimits;
use crate::vfs::NodeMap;

// ── JSON-RPC 2.0 error codes ────────────────────────────────────────────────

pub const INTERNAL_ERROR: i32 = -32603;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const VFS_ERROR: i32 = -32000;

// ── Incoming request ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Echoed back as-is; a missing id reads as `null`.
    #[serde(default)]
    pub id: serde_json::Value,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

// ── Params ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub limits: Option<LimitsParams>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitsParams {
    pub max_file_size: Option<u64>,
    pub max_total_size: Option<u64>,
    pub max_path_depth: Option<usize>,
    pub max_name_length: Option<usize>,
    pub max_node_count: Option<usize>,
    pub max_path_length: Option<usize>,
}

impl LimitsParams {
    /// Overlay the supplied fields on the defaults.
    pub fn into_limits(self) -> VfsLimits {
        let d = VfsLimits::default();
        VfsLimits {
            max_file_size: self.max_file_size.unwrap_or(d.max_file_size),
            max_total_size: self.max_total_size.unwrap_or(d.max_total_size),
            max_path_depth: self.max_path_depth.unwrap_or(d.max_path_depth),
            max_name_length: self.max_name_length.unwrap_or(d.max_name_length),
            max_node_count: self.max_node_count.unwrap_or(d.max_node_count),
            max_path_length: self.max_path_length.unwrap_or(d.max_path_length),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadParams {
    #[serde(default)]
    pub files: NodeMap,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathParams {
    pub path: String,
}
