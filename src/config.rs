//! Project configuration.
//!
//! Settings live in an optional `cereal.toml` at the project root. The file
//! is sparse: its keys are merged over the stock defaults, so a project only
//! writes what it changes. Command-line flags are applied on top by the
//! binary.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! content_dir = "content"      # Content tree, relative to the project root
//! layout_dir = "layout"        # Templates
//! output_dir = "out"           # Generated site
//! symlink = false              # Symlink passthrough files instead of copying
//! content_extensions = ["yaml", "yml"]
//!
//! [layouts]
//! lookup = "flat"              # "flat" or "mirrored"
//! macros = "macros.html"       # Base template for !j2 fragments
//! macro_block = "_macro_"      # Block the fragment fills in
//!
//! [highlight]
//! theme = "InspiredGitHub"
//!
//! [script]
//! interpreter = "python3"
//!
//! [serve]
//! host = "127.0.0.1"
//! port = 8000
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up in the project root.
pub const CONFIG_FILE: &str = "cereal.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Everything a build needs to know about the project layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Content tree, relative to the project root.
    pub content_dir: String,
    /// Template directory, relative to the project root.
    pub layout_dir: String,
    /// Output directory, relative to the project root.
    pub output_dir: String,
    /// Symlink passthrough files instead of copying them.
    pub symlink: bool,
    /// Extensions (without the dot) of files treated as structured content.
    pub content_extensions: Vec<String>,
    pub layouts: LayoutsConfig,
    pub highlight: HighlightConfig,
    pub script: ScriptConfig,
    pub serve: ServeConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            content_dir: "content".into(),
            layout_dir: "layout".into(),
            output_dir: "out".into(),
            symlink: false,
            content_extensions: vec!["yaml".into(), "yml".into()],
            layouts: LayoutsConfig::default(),
            highlight: HighlightConfig::default(),
            script: ScriptConfig::default(),
            serve: ServeConfig::default(),
        }
    }
}

impl SiteConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, dir) in [
            ("content_dir", &self.content_dir),
            ("layout_dir", &self.layout_dir),
            ("output_dir", &self.output_dir),
        ] {
            if dir.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if Path::new(&self.content_dir) == Path::new(&self.output_dir) {
            return Err(ConfigError::Validation(
                "content_dir and output_dir must differ".into(),
            ));
        }
        if self.content_extensions.is_empty() {
            return Err(ConfigError::Validation(
                "content_extensions must not be empty".into(),
            ));
        }
        if self.layouts.macro_block.is_empty() {
            return Err(ConfigError::Validation(
                "layouts.macro_block must not be empty".into(),
            ));
        }
        if self.script.interpreter.trim().is_empty() {
            return Err(ConfigError::Validation(
                "script.interpreter must not be empty".into(),
            ));
        }
        if self.serve.port == 0 {
            return Err(ConfigError::Validation("serve.port must be non-zero".into()));
        }
        Ok(())
    }

    /// Whether `path` has one of the structured content extensions.
    pub fn is_content_file(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.content_extensions
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
    }
}

/// Where a document's `layout` name is looked up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutLookup {
    /// `layout_dir/<name>`
    #[default]
    Flat,
    /// `layout_dir/<content subdirectory>/<name>`
    Mirrored,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LayoutsConfig {
    pub lookup: LayoutLookup,
    /// Base template every `!j2` fragment extends.
    pub macros: String,
    /// Block in the base template that the fragment overrides.
    pub macro_block: String,
}

impl Default for LayoutsConfig {
    fn default() -> Self {
        Self {
            lookup: LayoutLookup::Flat,
            macros: "macros.html".into(),
            macro_block: "_macro_".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HighlightConfig {
    /// One of syntect's bundled theme names.
    pub theme: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            theme: "InspiredGitHub".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptConfig {
    /// Program that runs `!py` fields as `<interpreter> -c <code>`.
    pub interpreter: String,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            interpreter: "python3".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServeConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8000,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// The stock defaults as a TOML table, the base layer for user overrides.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(SiteConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read `cereal.toml` from `root` as a raw TOML value.
///
/// Returns `Ok(None)` if there is no config file.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILE);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    Ok(Some(toml::from_str(&content)?))
}

/// Load the project config: stock defaults, then `cereal.toml` if present.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let merged = match load_raw_config(root)? {
        Some(overlay) => merge_toml(stock_defaults_value()?, overlay),
        None => stock_defaults_value()?,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// A fully commented stock `cereal.toml`, printed by `gen-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# cereal configuration
# ====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Paths are relative to the directory
# holding this file. Unknown keys will cause an error.

# Directory holding the content tree. Files with a content extension are
# rendered through their layout; everything else is copied as-is.
content_dir = "content"

# Directory holding the templates.
layout_dir = "layout"

# Where the site is written. Existing files are overwritten, never removed.
output_dir = "out"

# Symlink passthrough files into the output instead of copying them.
symlink = false

# File extensions treated as structured content.
content_extensions = ["yaml", "yml"]

# ---------------------------------------------------------------------------
# Layouts
# ---------------------------------------------------------------------------
[layouts]
# "flat": a document's `layout` is looked up directly in layout_dir.
# "mirrored": it is looked up in the layout subdirectory matching the
# document's directory, e.g. content/blog/a.yaml -> layout/blog/<layout>.
lookup = "flat"

# Template that every !j2 fragment extends, so fragments can use its macros.
macros = "macros.html"

# Block in that template which the fragment body replaces.
macro_block = "_macro_"

# ---------------------------------------------------------------------------
# Syntax highlighting (!code)
# ---------------------------------------------------------------------------
[highlight]
# Bundled themes: InspiredGitHub, Solarized (dark), Solarized (light),
# base16-eighties.dark, base16-mocha.dark, base16-ocean.dark,
# base16-ocean.light.
theme = "InspiredGitHub"

# ---------------------------------------------------------------------------
# Embedded code (!py)
# ---------------------------------------------------------------------------
[script]
# Interpreter run as `<interpreter> -c <code>` from the project root.
# Scripts are not sandboxed and have no timeout.
interpreter = "python3"

# ---------------------------------------------------------------------------
# Development server (watch)
# ---------------------------------------------------------------------------
[serve]
host = "127.0.0.1"
port = 8000
"##
}
