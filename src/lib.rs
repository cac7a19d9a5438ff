//! # cereal
//!
//! A small static site generator. Content is YAML; each file names a layout
//! and holds fields that the layout renders. Fields can carry tags that run
//! them through processors before they reach the template:
//!
//! ```yaml
//! layout: base.html
//! title: !md "**Hello**"
//! body: !join,md
//!   - "# Welcome"
//!   - "Rendered as *Markdown* after the lines are joined."
//! listing: !code(python) |
//!   print("highlighted")
//! today: !py |
//!   import datetime; print(datetime.date.today())
//! ```
//!
//! # Pipeline
//!
//! ```text
//! content/**  (sorted walk)
//!   ├─ *.yaml ─> load_document ─> Resolver ─> processors ─> layout ─> out/**.html
//!   └─ other  ─> copy or symlink ───────────────────────────────────> out/**
//! ```
//!
//! A tag is a chain: `!md,j2` renders Markdown, then treats the HTML as a
//! template fragment. Entries may take arguments, `!code(python)`. Chains
//! run left to right and nested nodes resolve before their parents.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`tags`] | Parses a tag suffix into an ordered processor chain |
//! | [`processors`] | The fixed processor registry: `join`, `md`, `j2`, `code`, `py` |
//! | [`resolve`] | Content node tree and bottom-up chain resolution |
//! | [`document`] | Loads one content file into resolved fields |
//! | [`layout`] | Template environment and layout lookup (flat or mirrored) |
//! | [`site`] | Walks the content tree, renders or copies each file, reports outcomes |
//! | [`config`] | `cereal.toml` loading, merging over defaults, validation |
//! | [`output`] | Build report formatting for the terminal |
//! | [`watch`] | Rebuilds on filesystem changes, one build at a time |
//! | [`serve`] | Static HTTP server over the output directory |
//!
//! # Failure Model
//!
//! Errors in a single content file (bad YAML, unknown tag, failing script,
//! missing layout) skip that file with a warning; the rest of the site still
//! builds. A file either renders completely or produces no output. Problems
//! with the project itself (missing content or layout directory, unwritable
//! output) stop the build.
//!
//! `!py` runs arbitrary code with the permissions of the build, without a
//! sandbox or timeout. Only build content you trust.

pub mod config;
pub mod document;
pub mod layout;
pub mod output;
pub mod processors;
pub mod resolve;
pub mod serve;
pub mod site;
pub mod tags;
pub mod watch;

#[cfg(test)]
pub(crate) mod test_helpers;
