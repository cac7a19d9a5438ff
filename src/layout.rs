//! Template environment and layout lookup.
//!
//! Layouts are minijinja templates loaded from the layout directory by
//! relative path. Auto-escaping is off: fields usually hold HTML produced by
//! `!md`, `!j2` or `!code`, and the layout splices them in as-is.

use crate::config::LayoutLookup;
use crate::document::Document;
use minijinja::{AutoEscape, Environment, ErrorKind, Template, Value, path_loader};
use std::path::{Component, Path};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("layout `{0}` not found")]
    NotFound(String),
    #[error("layout `{name}` could not be loaded: {source}")]
    Invalid {
        name: String,
        source: minijinja::Error,
    },
}

/// Apply the rendering settings shared by layouts and fragments.
pub fn configure(env: &mut Environment<'_>) {
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_auto_escape_callback(|_| AutoEscape::None);
}

/// A fresh environment loading templates from `layout_dir`.
///
/// Templates are compiled lazily and cached for the life of the environment,
/// so a new one is built per site build to pick up edited layouts.
pub fn template_environment(layout_dir: &Path) -> Environment<'static> {
    let mut env = Environment::new();
    configure(&mut env);
    env.set_loader(path_loader(layout_dir));
    env
}

/// Template name for `layout` as requested by a document in `content_subdir`
/// (relative to the content root).
pub fn layout_name(layout: &str, lookup: LayoutLookup, content_subdir: &Path) -> String {
    match lookup {
        LayoutLookup::Flat => layout.to_string(),
        LayoutLookup::Mirrored => {
            let mut name = String::new();
            for component in content_subdir.components() {
                if let Component::Normal(part) = component {
                    name.push_str(&part.to_string_lossy());
                    name.push('/');
                }
            }
            name.push_str(layout);
            name
        }
    }
}

/// Fetch a layout template by name.
pub fn resolve_layout<'env>(
    env: &'env Environment<'static>,
    name: &str,
) -> Result<Template<'env, 'env>, LayoutError> {
    env.get_template(name).map_err(|source| match source.kind() {
        ErrorKind::TemplateNotFound => LayoutError::NotFound(name.to_string()),
        _ => LayoutError::Invalid {
            name: name.to_string(),
            source,
        },
    })
}

/// Render a layout with the document's fields as variables.
pub fn render_layout(
    template: &Template<'_, '_>,
    document: &Document,
) -> Result<String, minijinja::Error> {
    template.render(Value::from_serialize(document.fields()))
}
