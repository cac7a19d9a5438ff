//! Shared test utilities.
//!
//! Provides the processor collaborators for resolving content in unit tests
//! and scaffolding for throwaway project directories.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tools = TestTools::new();
//! let resolver = Resolver::new(tools.context());
//!
//! let tmp = setup_fixtures();
//! write_file(tmp.path(), "content/extra.yaml", "layout: base.html\n");
//! ```

use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::OnceLock;
use tempfile::TempDir;

use crate::layout;
use crate::processors::ProcessorContext;
use crate::processors::fragment::FragmentRenderer;
use crate::processors::highlight::Highlighter;
use crate::processors::script::ScriptRunner;
use minijinja::Environment;

// =========================================================================
// Processor collaborators
// =========================================================================

/// Owns everything a [`ProcessorContext`] borrows.
///
/// The template environment has a single `macros.html` base template with
/// an empty `_macro_` block, so `!j2` fragments render bare.
pub struct TestTools {
    env: Environment<'static>,
    highlighter: &'static Highlighter,
    scripts: ScriptRunner,
}

impl TestTools {
    pub fn new() -> Self {
        let mut env = Environment::new();
        layout::configure(&mut env);
        env.add_template("macros.html", "{% block _macro_ %}{% endblock %}")
            .unwrap();
        Self {
            env,
            highlighter: shared_highlighter(),
            scripts: ScriptRunner::new("python3", "."),
        }
    }

    pub fn context(&self) -> ProcessorContext<'_> {
        ProcessorContext {
            fragments: FragmentRenderer::new(&self.env, "macros.html", "_macro_"),
            highlighter: self.highlighter,
            scripts: &self.scripts,
        }
    }
}

/// Loading syntect's defaults is slow, so tests share one highlighter.
fn shared_highlighter() -> &'static Highlighter {
    static HIGHLIGHTER: OnceLock<Highlighter> = OnceLock::new();
    HIGHLIGHTER.get_or_init(|| Highlighter::new("InspiredGitHub").unwrap())
}

/// Whether `python3` can be run. Tests that execute `!py` fields return
/// early when it cannot.
pub fn python_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(|| {
        Command::new("python3")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .is_ok_and(|status| status.success())
    })
}

// =========================================================================
// Project scaffolding
// =========================================================================

/// Copy `fixtures/site/` to a temp directory and return it.
///
/// Tests get an isolated copy they can mutate without affecting other tests
/// or the source fixtures.
pub fn setup_fixtures() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/site");
    copy_dir_recursive(&fixtures, tmp.path()).unwrap();
    tmp
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if src_path.is_dir() {
            std::fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            std::fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

/// Write `contents` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, contents).unwrap();
}

/// Read `root/rel` as a string. Panics with the path if it is missing.
pub fn read_file(root: &Path, rel: &str) -> String {
    let path = root.join(rel);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("could not read {}: {err}", path.display()))
}
