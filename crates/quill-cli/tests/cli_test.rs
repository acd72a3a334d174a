//! Integration tests for the `quill` binary.
//!
//! Every test runs the real binary with its config, content and memory
//! directories pointed into a temporary directory.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Mutex;

use serde_json::Value;
use tempfile::TempDir;

use quill_test_utils::TempContentTree;

// Held while spawning and while writing the fake generator script, so no
// child inherits an open write handle to it.
static SPAWN_LOCK: Mutex<()> = Mutex::new(());

// -----------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn path(&self, rel: &str) -> PathBuf {
        self.dir.path().join(rel)
    }

    fn write(&self, rel: &str, body: &str) -> PathBuf {
        let path = self.path(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, body).unwrap();
        path
    }

    fn quill(&self, args: &[&str]) -> Output {
        let _lock = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        Command::new(env!("CARGO_BIN_EXE_quill"))
            .args(args)
            .env("XDG_CONFIG_HOME", self.path("config"))
            .env("QUILL_CONTENT_DIR", self.path("content"))
            .env("QUILL_MEMORY_DIR", self.path("memory"))
            .env_remove("QUILL_CLAUDE_BIN")
            .env("RUST_LOG", "warn")
            .output()
            .expect("failed to run quill")
    }

    /// Run quill, assert success, and return stdout.
    fn ok(&self, args: &[&str]) -> String {
        let out = self.quill(args);
        assert!(
            out.status.success(),
            "quill {args:?} failed: {}",
            String::from_utf8_lossy(&out.stderr)
        );
        String::from_utf8(out.stdout).expect("stdout is UTF-8")
    }

    fn json(&self, args: &[&str]) -> Value {
        let stdout = self.ok(args);
        serde_json::from_str(&stdout)
            .unwrap_or_else(|e| panic!("quill {args:?} printed invalid JSON ({e}): {stdout}"))
    }

    /// A stand-in for the claude binary that ignores its prompt and prints
    /// a fixed reply.
    #[cfg(unix)]
    fn fake_generator(&self, reply: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let _lock = SPAWN_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let path = self.path("bin/fake-claude");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, format!("#!/bin/sh\ncat > /dev/null\necho '{reply}'\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp path is UTF-8")
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[test]
fn parse_prints_segments_and_chunks() {
    let ws = Workspace::new();
    let doc = ws.write(
        "doc.md",
        "Intro\n# First\n<agent><research>find facts</research></agent>\n",
    );

    let parsed = ws.json(&["parse", path_str(&doc)]);

    let segments = parsed["segments"].as_array().unwrap();
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0]["kind"], "research");
    assert_eq!(segments[0]["prompt"], "find facts");

    let chunks = parsed["chunks"].as_array().unwrap();
    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[1]["title"], "First");
}

#[test]
fn import_then_export_reproduces_document() {
    let ws = Workspace::new();
    let flat = ws.write(
        "book.txt",
        "=== Guide ===\n--- Basics ---\n+++ Intro +++\nHello there.\n+++ Next +++\nMore.\n",
    );

    let report = ws.json(&["tree", "import", path_str(&flat)]);
    assert_eq!(report["modules"], 1);
    assert_eq!(report["chapters"], 1);
    assert_eq!(report["pages"], 2);

    let exported = ws.ok(&["tree", "export"]);
    assert_eq!(
        exported,
        "=== Guide ===\n\n--- Basics ---\n\n+++ Intro +++\n\nHello there.\n\n+++ Next +++\n\nMore.\n\n"
    );

    let tree = ws.json(&["tree", "show"]);
    assert_eq!(tree[0]["title"], "Guide");
    assert_eq!(tree[0]["chapters"][0]["pages"][1]["filename"], "002-next.md");
}

#[test]
fn create_and_reorder_modules() {
    let ws = Workspace::new();
    let first = ws.json(&["tree", "create-module", "Alpha"]);
    let second = ws.json(&["tree", "create-module", "Beta"]);
    assert_eq!(first["id"], "001-alpha");
    assert_eq!(second["id"], "002-beta");

    let reordered = ws.json(&["tree", "reorder", "module", "002-beta", "001-alpha"]);
    assert_eq!(reordered["names"], serde_json::json!(["001-beta", "002-alpha"]));
    assert!(ws.path("content/001-beta").is_dir());
    assert!(ws.path("content/002-alpha").is_dir());
}

#[test]
fn get_strips_marker_from_seeded_page() {
    let temp = TempContentTree::new();
    temp.write_page(
        "001-m/001-c/001-p.md",
        "<!-- title: Manual > Chapter > Page -->\nBody <agent><prompt>p</prompt></agent>",
    );
    let ws = Workspace::new();

    let view = ws.json(&[
        "--content-dir",
        path_str(temp.root()),
        "tree",
        "get",
        "001-m/001-c/001-p.md",
    ]);
    assert_eq!(view["content"], "Body <agent><prompt>p</prompt></agent>");
    assert_eq!(view["titles"]["module"], "Manual");
    assert_eq!(view["segments"].as_array().unwrap().len(), 1);
}

#[test]
fn invalid_page_path_fails_with_message() {
    let ws = Workspace::new();
    let out = ws.quill(&["tree", "get", "../escape.md"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("error:"), "stderr: {stderr}");
}

#[test]
fn init_writes_config_once() {
    let ws = Workspace::new();
    let stdout = ws.ok(&["--content-dir", "/srv/book", "init"]);
    assert!(stdout.contains("Config written to"), "stdout: {stdout}");

    let written = std::fs::read_to_string(ws.path("config/quill/config.toml")).unwrap();
    assert!(written.contains("/srv/book"), "config: {written}");

    let again = ws.quill(&["init"]);
    assert!(!again.status.success());
    assert!(String::from_utf8_lossy(&again.stderr).contains("--force"));

    ws.ok(&["init", "--force"]);
}

#[test]
fn memory_list_reports_markdown_files() {
    let ws = Workspace::new();
    ws.write("memory/style.md", "Be brief.");
    ws.write("memory/notes.txt", "ignored");

    let listed = ws.json(&["memory", "list"]);
    let entries = listed.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["name"], "style.md");
    assert_eq!(entries[0]["bytes"], 9);
}

#[test]
fn memory_save_rename_delete() {
    let ws = Workspace::new();
    let source = ws.write("notes/tone.txt", "Warm and direct.");

    let saved = ws.json(&["memory", "save", "tone", "--file", path_str(&source)]);
    assert_eq!(saved["name"], "tone.md");
    assert_eq!(
        std::fs::read_to_string(ws.path("memory/tone.md")).unwrap(),
        "Warm and direct."
    );

    let renamed = ws.json(&["memory", "rename", "tone.md", "voice"]);
    assert_eq!(renamed["name"], "voice.md");
    assert!(!ws.path("memory/tone.md").exists());

    ws.json(&["memory", "delete", "voice"]);
    assert!(!ws.path("memory/voice.md").exists());

    let again = ws.quill(&["memory", "delete", "voice"]);
    assert!(!again.status.success());
    let stderr = String::from_utf8_lossy(&again.stderr);
    assert!(stderr.contains("not found"), "stderr: {stderr}");
}

#[test]
fn memory_rename_refuses_to_overwrite() {
    let ws = Workspace::new();
    ws.write("memory/a.md", "first");
    ws.write("memory/b.md", "second");

    let out = ws.quill(&["memory", "rename", "a", "b"]);
    assert!(!out.status.success());
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("already exists"), "stderr: {stderr}");
    assert_eq!(std::fs::read_to_string(ws.path("memory/b.md")).unwrap(), "second");
}

#[cfg(unix)]
#[test]
fn memory_generate_saves_generator_output() {
    let ws = Workspace::new();
    let generator = ws.fake_generator("Readers are new to Rust.");

    let generated = ws.json(&[
        "--claude-bin",
        path_str(&generator),
        "memory",
        "generate",
        "audience",
        "who the book is for",
    ]);
    assert_eq!(generated["name"], "audience.md");
    let body = std::fs::read_to_string(ws.path("memory/audience.md")).unwrap();
    assert_eq!(body.trim_end(), "Readers are new to Rust.");
}

#[cfg(unix)]
#[test]
fn process_write_replaces_segments_with_generator_output() {
    let ws = Workspace::new();
    let generator = ws.fake_generator("generated text");
    let doc = ws.write(
        "doc.md",
        "Start <agent><prompt>one</prompt></agent> middle <agent><prompt>two</prompt></agent> end\n",
    );

    let summary = ws.json(&[
        "--claude-bin",
        path_str(&generator),
        "process",
        path_str(&doc),
        "--write",
    ]);
    assert_eq!(summary["processed"], 2);
    assert_eq!(
        std::fs::read_to_string(&doc).unwrap(),
        "Start generated text middle generated text end\n"
    );
}

#[cfg(unix)]
#[test]
fn segment_prints_document_with_one_replacement() {
    let ws = Workspace::new();
    let generator = ws.fake_generator("X");
    let doc = ws.write(
        "doc.md",
        "# A\n<agent><prompt>one</prompt></agent>\n# B\n<agent><prompt>two</prompt></agent>\n",
    );

    let stdout = ws.ok(&[
        "--claude-bin",
        path_str(&generator),
        "segment",
        path_str(&doc),
        "1",
        "--within-chunk",
    ]);
    assert_eq!(stdout, "# A\n<agent><prompt>one</prompt></agent>\n# B\nX\n");
}
