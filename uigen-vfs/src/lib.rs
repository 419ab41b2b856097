pub mod error;
pub mod path;
pub mod protocol;
pub mod server;
pub mod tools;
pub mod transport;
pub mod vfs;

pub use error::{ToolError, VfsError};
pub use path::VfsLimits;
pub use tools::{ToolOutcome, ToolSession};
pub use vfs::{FileNode, NodeMap, NodeType, VirtualFileSystem};
