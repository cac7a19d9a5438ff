//! Site building.
//!
//! One build is a single sorted walk over the content tree. Each file ends
//! in exactly one [`FileOutcome`]:
//!
//! ```text
//! content file ─ load ──✗──> SkippedLoadError
//!                  │
//!                  ├─ no `layout` ──> SkippedNoLayout
//!                  ├─ layout missing ──> SkippedLayoutNotFound
//!                  ├─ render ──✗──> SkippedRenderError
//!                  └─ write <name>.html ──> Rendered
//!
//! other file ─ copy ──> Copied
//!            └ symlink ──> Linked
//! ```
//!
//! Skips are per file: they are logged and recorded in the [`BuildReport`],
//! and the walk carries on. A page is rendered completely in memory before
//! anything is written, so a failing field never leaves a partial page.
//!
//! Build-level failures (missing content or layout directory, unwritable
//! output) abort the build with a [`BuildError`]. Files already written stay
//! in place.

use crate::config::SiteConfig;
use crate::document::load_document;
use crate::layout::{self, LayoutError};
use crate::processors::ProcessorContext;
use crate::processors::fragment::FragmentRenderer;
use crate::processors::highlight::{Highlighter, UnknownTheme};
use crate::processors::script::ScriptRunner;
use crate::resolve::Resolver;
use minijinja::Environment;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("content directory not found: {0}")]
    MissingContentDir(PathBuf),
    #[error("layout directory not found: {0}")]
    MissingLayoutDir(PathBuf),
    #[error(transparent)]
    UnknownTheme(#[from] UnknownTheme),
    #[error("{path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("walking content: {0}")]
    Walk(#[from] walkdir::Error),
}

/// What happened to one source file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    Rendered { output: PathBuf },
    Copied { output: PathBuf },
    Linked { output: PathBuf },
    SkippedNoLayout,
    SkippedLayoutNotFound { layout: String },
    SkippedLoadError { error: String },
    SkippedRenderError { error: String },
}

impl FileOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(
            self,
            FileOutcome::SkippedNoLayout
                | FileOutcome::SkippedLayoutNotFound { .. }
                | FileOutcome::SkippedLoadError { .. }
                | FileOutcome::SkippedRenderError { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileReport {
    /// Path relative to the content directory.
    pub source: PathBuf,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Per-file outcomes of one build, in walk order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BuildReport {
    pub files: Vec<FileReport>,
}

impl BuildReport {
    pub fn rendered(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Rendered { .. }))
    }

    /// Passthrough files, copied or linked.
    pub fn passed_through(&self) -> usize {
        self.count(|o| matches!(o, FileOutcome::Copied { .. } | FileOutcome::Linked { .. }))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.outcome.is_skipped())
    }

    /// The outcome for a source path, relative to the content directory.
    pub fn outcome(&self, source: impl AsRef<Path>) -> Option<&FileOutcome> {
        let source = source.as_ref();
        self.files
            .iter()
            .find(|f| f.source == source)
            .map(|f| &f.outcome)
    }

    fn count(&self, pred: impl Fn(&FileOutcome) -> bool) -> usize {
        self.files.iter().filter(|f| pred(&f.outcome)).count()
    }
}

/// Builds a project. Holds what is expensive to set up (the highlighter)
/// so repeated builds in watch mode reuse it; layouts are re-read on every
/// build.
pub struct Builder {
    root: PathBuf,
    config: SiteConfig,
    highlighter: Highlighter,
    scripts: ScriptRunner,
}

impl Builder {
    pub fn new(root: impl Into<PathBuf>, config: SiteConfig) -> Result<Self, BuildError> {
        let root = root.into();
        let highlighter = Highlighter::new(&config.highlight.theme)?;
        let scripts = ScriptRunner::new(config.script.interpreter.clone(), root.clone());
        Ok(Self {
            root,
            config,
            highlighter,
            scripts,
        })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn content_dir(&self) -> PathBuf {
        self.root.join(&self.config.content_dir)
    }

    pub fn layout_dir(&self) -> PathBuf {
        self.root.join(&self.config.layout_dir)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(&self.config.output_dir)
    }

    /// Run one full build.
    pub fn build(&self) -> Result<BuildReport, BuildError> {
        let content_dir = self.content_dir();
        let layout_dir = self.layout_dir();
        let output_dir = self.output_dir();
        if !content_dir.is_dir() {
            return Err(BuildError::MissingContentDir(content_dir));
        }
        if !layout_dir.is_dir() {
            return Err(BuildError::MissingLayoutDir(layout_dir));
        }
        fs::create_dir_all(&output_dir).map_err(io_error(&output_dir))?;

        let env = layout::template_environment(&layout_dir);
        let resolver = Resolver::new(ProcessorContext {
            fragments: FragmentRenderer::new(
                &env,
                &self.config.layouts.macros,
                &self.config.layouts.macro_block,
            ),
            highlighter: &self.highlighter,
            scripts: &self.scripts,
        });

        let mut report = BuildReport::default();
        let walker = WalkDir::new(&content_dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0 || !(is_hidden(entry) || entry.path() == output_dir)
            });
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) if is_bad_link(&err) => {
                    warn!(path = ?err.path(), "skipped: {err}");
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            if entry.file_type().is_dir() {
                continue;
            }
            let Ok(rel) = entry.path().strip_prefix(&content_dir) else {
                continue;
            };
            let outcome = if self.config.is_content_file(rel) {
                self.render_page(&env, &resolver, entry.path(), rel, &output_dir)?
            } else {
                self.pass_through(entry.path(), rel, &output_dir)?
            };
            report.files.push(FileReport {
                source: rel.to_path_buf(),
                outcome,
            });
        }
        Ok(report)
    }

    fn render_page(
        &self,
        env: &Environment<'static>,
        resolver: &Resolver<'_>,
        source: &Path,
        rel: &Path,
        output_dir: &Path,
    ) -> Result<FileOutcome, BuildError> {
        let document = match load_document(source, resolver) {
            Ok(document) => document,
            Err(err) => {
                warn!(file = %rel.display(), "skipped: {err}");
                return Ok(FileOutcome::SkippedLoadError {
                    error: err.to_string(),
                });
            }
        };
        let Some(layout) = document.layout() else {
            warn!(file = %rel.display(), "skipped: no `layout` field");
            return Ok(FileOutcome::SkippedNoLayout);
        };

        let subdir = rel.parent().unwrap_or(Path::new(""));
        let name = layout::layout_name(layout, self.config.layouts.lookup, subdir);
        let template = match layout::resolve_layout(env, &name) {
            Ok(template) => template,
            Err(LayoutError::NotFound(layout)) => {
                warn!(file = %rel.display(), "skipped: layout `{layout}` not found");
                return Ok(FileOutcome::SkippedLayoutNotFound { layout });
            }
            Err(err) => {
                warn!(file = %rel.display(), "skipped: {err}");
                return Ok(FileOutcome::SkippedRenderError {
                    error: err.to_string(),
                });
            }
        };
        let html = match layout::render_layout(&template, &document) {
            Ok(html) => html,
            Err(err) => {
                warn!(file = %rel.display(), "skipped: rendering `{name}` failed: {err}");
                return Ok(FileOutcome::SkippedRenderError {
                    error: err.to_string(),
                });
            }
        };

        let output = rel.with_extension("html");
        let target = output_dir.join(&output);
        create_parent(&target)?;
        fs::write(&target, html).map_err(io_error(&target))?;
        debug!(file = %rel.display(), layout = %name, "rendered");
        Ok(FileOutcome::Rendered { output })
    }

    fn pass_through(
        &self,
        source: &Path,
        rel: &Path,
        output_dir: &Path,
    ) -> Result<FileOutcome, BuildError> {
        let target = output_dir.join(rel);
        create_parent(&target)?;
        copy_resource(source, &target, self.config.symlink).map_err(io_error(&target))?;
        debug!(file = %rel.display(), symlink = self.config.symlink, "passed through");
        let output = rel.to_path_buf();
        Ok(if self.config.symlink {
            FileOutcome::Linked { output }
        } else {
            FileOutcome::Copied { output }
        })
    }
}

/// Symlink loops and dangling links are skipped rather than failing the walk.
fn is_bad_link(err: &walkdir::Error) -> bool {
    err.loop_ancestor().is_some()
        || err
            .io_error()
            .is_some_and(|io| io.kind() == io::ErrorKind::NotFound)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> BuildError + '_ {
    move |source| BuildError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn create_parent(target: &Path) -> Result<(), BuildError> {
    match target.parent() {
        Some(parent) => fs::create_dir_all(parent).map_err(io_error(parent)),
        None => Ok(()),
    }
}

/// Replace `target` with a copy of `source`, or with a symlink to its
/// absolute path. Whatever was at `target` before is removed first, so a
/// stale symlink is never written through.
pub fn copy_resource(source: &Path, target: &Path, symlink: bool) -> io::Result<()> {
    match fs::symlink_metadata(target) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(target)?,
        Ok(_) => fs::remove_file(target)?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }
    if symlink {
        create_symlink(&fs::canonicalize(source)?, target)
    } else {
        fs::copy(source, target).map(|_| ())
    }
}

#[cfg(unix)]
fn create_symlink(source: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(windows)]
fn create_symlink(source: &Path, target: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(source, target)
}
