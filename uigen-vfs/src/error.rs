use thiserror::Error;

#[derive(Debug, Error)]
pub enum VfsError {
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("Is a directory: {0}")]
    IsDirectory(String),
    #[error("Is a file: {0}")]
    IsFile(String),
    #[error("Not a directory: {0}")]
    NotDirectory(String),
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),
    #[error("Malformed node collection: {0}")]
    Malformed(String),
    #[error("VFS not initialized: call initialize first")]
    NotInitialized,
    #[error("Invalid params: {0}")]
    InvalidParams(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VfsError {
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidPath(_) => "VFS_INVALID_PATH",
            Self::NotFound(_) => "VFS_NOT_FOUND",
            Self::AlreadyExists(_) => "VFS_ALREADY_EXISTS",
            Self::IsDirectory(_) => "VFS_IS_DIRECTORY",
            Self::IsFile(_) => "VFS_IS_FILE",
            Self::NotDirectory(_) => "VFS_NOT_DIRECTORY",
            Self::InvalidOperation(_) => "VFS_INVALID_OPERATION",
            Self::LimitExceeded(_) => "VFS_LIMIT_EXCEEDED",
            Self::Malformed(_) => "VFS_MALFORMED",
            Self::NotInitialized => "VFS_NOT_INITIALIZED",
            Self::InvalidParams(_) => "VFS_INVALID_PARAMS",
            Self::Io(_) => "VFS_IO_ERROR",
        }
    }

    pub fn to_json_rpc_error(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.code(),
            "message": self.to_string(),
        })
    }
}

/// Failures of an editor or file-manager command. Every variant is an
/// ordinary outcome the model can react to on its next turn.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error(transparent)]
    Vfs(#[from] VfsError),
    #[error("No match for old_str in {0}")]
    NoMatch(String),
    #[error("old_str matches {count} times in {path}; include more surrounding context so it is unique")]
    AmbiguousMatch { path: String, count: usize },
    #[error("Invalid range: {0}")]
    InvalidRange(String),
    #[error("No edit history for {0}")]
    NoHistory(String),
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

impl ToolError {
    pub fn code(&self) -> &str {
        match self {
            Self::Vfs(e) => e.code(),
            Self::NoMatch(_) => "EDIT_NO_MATCH",
            Self::AmbiguousMatch { .. } => "EDIT_AMBIGUOUS_MATCH",
            Self::InvalidRange(_) => "EDIT_INVALID_RANGE",
            Self::NoHistory(_) => "EDIT_NO_HISTORY",
            Self::InvalidArguments(_) => "TOOL_INVALID_ARGUMENTS",
            Self::UnknownTool(_) => "TOOL_UNKNOWN",
        }
    }

    /// Text handed back to the model as the tool result.
    pub fn to_model_text(&self) -> String {
        format!("Error [{}]: {}", self.code(), self)
    }
}
