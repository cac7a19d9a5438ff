//! Rebuild on change.
//!
//! The file watcher pushes raw events into a bounded channel; a single
//! rebuild thread takes them one at a time and runs a full build for each
//! relevant one. Builds never overlap. When the queue is full the watcher's
//! callback blocks until the rebuild thread catches up.
//!
//! ```text
//! notify ──Event──> sync_channel(64) ──> rebuild thread ──> Builder::build
//! ```

use crate::output;
use crate::site::Builder;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Component, Path, PathBuf};
use std::sync::mpsc::{Receiver, sync_channel};
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tracing::{error, info, warn};

/// Events buffered between the watcher and the rebuild thread.
const EVENT_QUEUE: usize = 64;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("could not start the file watcher: {0}")]
    Watcher(#[from] notify::Error),
    #[error("could not watch {path}: {source}")]
    Path { path: PathBuf, source: notify::Error },
    #[error("could not start the rebuild thread: {0}")]
    Thread(#[from] std::io::Error),
}

/// Decides which filesystem events warrant a rebuild.
#[derive(Debug, Clone)]
pub struct ChangeFilter {
    /// Watched directories, as given and canonicalized.
    roots: Vec<PathBuf>,
    /// The output directory, as given and canonicalized.
    ignored: Vec<PathBuf>,
}

impl ChangeFilter {
    pub fn new(watched: &[PathBuf], output_dir: &Path) -> Self {
        Self {
            roots: watched.iter().flat_map(|dir| path_forms(dir)).collect(),
            ignored: path_forms(output_dir),
        }
    }

    /// Creates, modifications (including renames) and removals of visible
    /// files outside the output directory are relevant. Access events are not.
    pub fn is_relevant(&self, event: &Event) -> bool {
        let kind = matches!(
            event.kind,
            EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
        );
        kind && event.paths.iter().any(|path| self.is_relevant_path(path))
    }

    fn is_relevant_path(&self, path: &Path) -> bool {
        if self.ignored.iter().any(|dir| path.starts_with(dir)) || path.is_dir() {
            return false;
        }
        let relative = self
            .roots
            .iter()
            .find_map(|root| path.strip_prefix(root).ok())
            .unwrap_or(path);
        !relative.components().any(is_hidden)
    }
}

fn is_hidden(component: Component<'_>) -> bool {
    matches!(component, Component::Normal(name) if name.to_string_lossy().starts_with('.'))
}

fn path_forms(path: &Path) -> Vec<PathBuf> {
    let mut forms = vec![path.to_path_buf()];
    if let Ok(canonical) = path.canonicalize() {
        if canonical != path {
            forms.push(canonical);
        }
    }
    forms
}

/// A running watcher and its rebuild thread. Dropping the watcher closes
/// the channel, which ends the thread.
pub struct WatchHandle {
    watcher: RecommendedWatcher,
    thread: JoinHandle<usize>,
}

impl WatchHandle {
    /// Stop watching and wait for an in-flight rebuild to finish. Returns the
    /// number of rebuilds run.
    pub fn stop(self) -> usize {
        drop(self.watcher);
        self.thread.join().unwrap_or_default()
    }
}

/// Start watching the builder's content and layout directories and
/// rebuilding on change. The initial build is the caller's job.
pub fn spawn(builder: Builder) -> Result<WatchHandle, WatchError> {
    let watched = vec![builder.content_dir(), builder.layout_dir()];
    let filter = ChangeFilter::new(&watched, &builder.output_dir());

    let (tx, rx) = sync_channel::<Event>(EVENT_QUEUE);
    let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
        match res {
            // Blocks while the queue is full; fails only once the rebuild
            // thread is gone.
            Ok(event) => {
                let _ = tx.send(event);
            }
            Err(err) => warn!("file watcher error: {err}"),
        }
    })?;
    for dir in &watched {
        watcher
            .watch(dir, RecursiveMode::Recursive)
            .map_err(|source| WatchError::Path {
                path: dir.clone(),
                source,
            })?;
        info!(path = %dir.display(), "watching");
    }

    let thread = thread::Builder::new()
        .name("cereal-rebuild".into())
        .spawn(move || {
            rebuild_loop(rx, &filter, || match builder.build() {
                Ok(report) => info!("rebuilt: {}", output::summary_line(&report)),
                Err(err) => error!("build failed: {err}"),
            })
        })?;
    Ok(WatchHandle { watcher, thread })
}

/// Pull events until the channel closes, calling `rebuild` once per relevant
/// event. Returns the number of rebuilds.
pub fn rebuild_loop(
    events: Receiver<Event>,
    filter: &ChangeFilter,
    mut rebuild: impl FnMut(),
) -> usize {
    let mut rebuilds = 0;
    for event in events {
        if !filter.is_relevant(&event) {
            continue;
        }
        info!(paths = ?event.paths, "change detected, rebuilding");
        rebuild();
        rebuilds += 1;
    }
    rebuilds
}
