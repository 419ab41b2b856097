// ---------------------------------------------------------------------------
// Integration tests for uigen-vfs
//
// Each test spawns the binary, plays the host + agent-loop role over
// JSON-RPC 2.0 / NDJSON stdio, and verifies responses.
// ---------------------------------------------------------------------------

use std::io::{BufRead, BufReader, Write};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

struct VfsProcess {
    child: Child,
    reader: BufReader<std::process::ChildStdout>,
    next_id: AtomicU64,
}

impl VfsProcess {
    fn spawn() -> Self {
        let bin = env!("CARGO_BIN_EXE_uigen-vfs");
        let mut child = Command::new(bin)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("failed to spawn uigen-vfs");

        let stdout = child.stdout.take().expect("no stdout");
        Self {
            child,
            reader: BufReader::new(stdout),
            next_id: AtomicU64::new(1),
        }
    }

    fn send(&mut self, method: &str, params: Value) -> RpcResponse {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let stdin = self.child.stdin.as_mut().expect("no stdin");
        let mut line = serde_json::to_string(&request).unwrap();
        line.push('\n');
        stdin.write_all(line.as_bytes()).unwrap();
        stdin.flush().unwrap();

        let mut buf = String::new();
        let bytes_read = self
            .reader
            .read_line(&mut buf)
            .expect("failed to read from stdout");
        assert!(bytes_read > 0, "unexpected EOF waiting for id={}", id);

        let parsed: Value = serde_json::from_str(buf.trim())
            .unwrap_or_else(|e| panic!("invalid JSON from server: {e}\nline: {buf}"));
        assert_eq!(parsed["id"].as_u64(), Some(id), "response id mismatch");

        if let Some(error) = parsed.get("error") {
            return RpcResponse::Error(error.clone());
        }
        RpcResponse::Ok(parsed.get("result").cloned().unwrap_or(Value::Null))
    }

    fn call(&mut self, method: &str, params: Value) -> Value {
        match self.send(method, params) {
            RpcResponse::Ok(v) => v,
            RpcResponse::Error(e) => panic!("expected success, got error: {e}"),
        }
    }

    fn call_err(&mut self, method: &str, params: Value) -> Value {
        match self.send(method, params) {
            RpcResponse::Error(e) => e,
            RpcResponse::Ok(v) => panic!("expected error, got success: {v}"),
        }
    }

    fn initialize(&mut self) -> Value {
        self.call("initialize", json!({ "limits": null }))
    }

    /// Invoke a tool the way the agent loop does and return the tool result.
    fn tool(&mut self, name: &str, arguments: Value) -> Value {
        self.call("tools/call", json!({ "name": name, "arguments": arguments }))
    }

    fn editor(&mut self, arguments: Value) -> Value {
        self.tool("str_replace_editor", arguments)
    }

    fn file_manager(&mut self, arguments: Value) -> Value {
        self.tool("file_manager", arguments)
    }
}

impl Drop for VfsProcess {
    fn drop(&mut self) {
        drop(self.child.stdin.take());
        let _ = self.child.wait();
    }
}

#[derive(Debug)]
enum RpcResponse {
    Ok(Value),
    Error(Value),
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn methods_before_initialize_fail() {
    let mut proc = VfsProcess::spawn();
    let err = proc.call_err("tools/call", json!({ "name": "file_manager", "arguments": {} }));
    assert_eq!(err["data"]["code"], "VFS_NOT_INITIALIZED");
}

#[test]
fn tools_list_exposes_both_schemas() {
    let mut proc = VfsProcess::spawn();
    proc.initialize();
    let result = proc.call("tools/list", json!(null));
    let tools = result["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["str_replace_editor", "file_manager"]);
    assert_eq!(tools[0]["inputSchema"]["type"], "object");
}

// ---------------------------------------------------------------------------
// A full turn: load persisted tree → tool calls → save
// ---------------------------------------------------------------------------

#[test]
fn full_turn_round_trip() {
    let mut proc = VfsProcess::spawn();
    proc.initialize();

    // Persisted data may record only leaf files.
    proc.call(
        "project/load",
        json!({ "files": {
            "/App.jsx": { "type": "file", "name": "App.jsx", "path": "/App.jsx",
                "content": "import Button from '@/components/Button';\n" },
            "/components/Button.jsx": { "type": "file",
                "content": "export default function Button(){ return <button>Hi</button>; }\n" }
        }}),
    );

    let r = proc.editor(json!({
        "command": "str_replace",
        "path": "/components/Button.jsx",
        "old_str": "Hi",
        "new_str": "Click me"
    }));
    assert_eq!(r["isError"], false);

    let r = proc.editor(json!({
        "command": "create",
        "path": "/components/Card.jsx",
        "file_text": "export default function Card(){}\n"
    }));
    assert_eq!(r["content"], "Created file: /components/Card.jsx");

    let saved = proc.call("project/save", json!(null))["files"].clone();
    assert_eq!(saved["/components"]["type"], "directory");
    assert_eq!(
        saved["/components/Button.jsx"]["content"],
        "export default function Button(){ return <button>Click me</button>; }\n"
    );

    // A later request rebuilds an identical tree from the saved blob.
    let mut next = VfsProcess::spawn();
    next.initialize();
    next.call("project/load", json!({ "files": saved.clone() }));
    let again = next.call("project/save", json!(null))["files"].clone();
    assert_eq!(saved, again);
}

// ---------------------------------------------------------------------------
// Editor behaviour over the wire
// ---------------------------------------------------------------------------

#[test]
fn ambiguous_replace_then_retry_with_context() {
    let mut proc = VfsProcess::spawn();
    proc.initialize();
    proc.editor(json!({ "command": "create", "path": "/f.js", "file_text": "foo\nfoo\n" }));

    let r = proc.editor(json!({
        "command": "str_replace", "path": "/f.js", "old_str": "foo", "new_str": "bar"
    }));
    assert_eq!(r["isError"], true);
    assert_eq!(r["code"], "EDIT_AMBIGUOUS_MATCH");

    let r = proc.editor(json!({
        "command": "str_replace", "path": "/f.js", "old_str": "foo\nfoo", "new_str": "foo\nbar"
    }));
    assert_eq!(r["isError"], false);
    let read = proc.call("fs/read", json!({ "path": "/f.js" }));
    assert_eq!(read["content"], "foo\nbar\n");
}

#[test]
fn insert_and_undo() {
    let mut proc = VfsProcess::spawn();
    proc.initialize();
    proc.editor(json!({ "command": "create", "path": "/a.js", "file_text": "one\ntwo\n" }));

    proc.editor(json!({ "command": "insert", "path": "/a.js", "insert_line": 1, "new_str": "1.5" }));
    let view = proc.editor(json!({ "command": "view", "path": "/a.js", "line_numbers": true }));
    assert_eq!(view["content"], "1\tone\n2\t1.5\n3\ttwo");

    proc.editor(json!({ "command": "undo_edit", "path": "/a.js" }));
    let view = proc.editor(json!({ "command": "view", "path": "/a.js" }));
    assert_eq!(view["content"], "one\ntwo\n");

    let r = proc.editor(json!({ "command": "undo_edit", "path": "/a.js" }));
    assert_eq!(r["code"], "EDIT_NO_HISTORY");
}

#[test]
fn invalid_insert_line_is_reported() {
    let mut proc = VfsProcess::spawn();
    proc.initialize();
    proc.editor(json!({ "command": "create", "path": "/a.js", "file_text": "x\n" }));
    let r = proc.editor(json!({ "command": "insert", "path": "/a.js", "insert_line": 9, "new_str": "y" }));
    assert_eq!(r["code"], "EDIT_INVALID_RANGE");
}

// ---------------------------------------------------------------------------
// File manager over the wire
// ---------------------------------------------------------------------------

#[test]
fn move_rename_delete() {
    let mut proc = VfsProcess::spawn();
    proc.initialize();
    proc.editor(json!({ "command": "create", "path": "/old.jsx", "file_text": "orig" }));

    let r = proc.file_manager(json!({ "command": "move", "path": "/old.jsx", "new_path": "/new.jsx" }));
    assert_eq!(r["content"], "Moved /old.jsx to /new.jsx");
    assert_eq!(proc.call("fs/exists", json!({ "path": "/old.jsx" }))["exists"], false);
    assert_eq!(proc.call("fs/read", json!({ "path": "/new.jsx" }))["content"], "orig");

    proc.file_manager(json!({ "command": "rename", "path": "/new.jsx", "new_path": "Main.jsx" }));
    assert_eq!(proc.call("fs/read", json!({ "path": "/Main.jsx" }))["content"], "orig");

    proc.editor(json!({ "command": "create", "path": "/lib/a/b.js", "file_text": "" }));
    let r = proc.file_manager(json!({ "command": "move", "path": "/lib", "new_path": "/lib/a/inner" }));
    assert_eq!(r["code"], "VFS_INVALID_OPERATION");

    proc.file_manager(json!({ "command": "delete", "path": "/lib" }));
    assert_eq!(proc.call("fs/exists", json!({ "path": "/lib/a/b.js" }))["exists"], false);

    let r = proc.file_manager(json!({ "command": "delete", "path": "/" }));
    assert_eq!(r["code"], "VFS_INVALID_OPERATION");
}

#[test]
fn limits_from_initialize_apply() {
    let mut proc = VfsProcess::spawn();
    proc.call("initialize", json!({ "limits": { "maxFileSize": 4 } }));
    let r = proc.editor(json!({ "command": "create", "path": "/big.txt", "file_text": "12345" }));
    assert_eq!(r["code"], "VFS_LIMIT_EXCEEDED");
    assert_eq!(proc.call("fs/exists", json!({ "path": "/big.txt" }))["exists"], false);
}

#[test]
fn listing_reports_implicit_directories() {
    let mut proc = VfsProcess::spawn();
    proc.initialize();
    proc.editor(json!({ "command": "create", "path": "/components/Button.jsx", "file_text": "..." }));
    let listing = proc.call("fs/list", json!({ "path": "/components" }));
    assert_eq!(listing["entries"], json!([{ "name": "Button.jsx", "type": "file" }]));
    let root = proc.call("fs/list", json!({ "path": "/" }));
    assert_eq!(root["entries"], json!([{ "name": "components", "type": "directory" }]));
}
