//! Template fragments for `!j2` fields.
//!
//! A fragment is the body of one block in a shared base template (by
//! default `macros.html` in the layout directory, overriding `_macro_`).
//! Wrapping the fragment this way lets it use the base template's imports
//! and helpers. Only the rendered block is returned; anything the base
//! template prints outside the block is discarded.

use minijinja::{Environment, context};

/// Name the fragment is registered under in its private environment.
const FRAGMENT_NAME: &str = "<fragment>";

/// Renders `!j2` fragments against the layout environment.
pub struct FragmentRenderer<'env> {
    env: &'env Environment<'static>,
    base: &'env str,
    block: &'env str,
}

impl<'env> FragmentRenderer<'env> {
    pub fn new(env: &'env Environment<'static>, base: &'env str, block: &'env str) -> Self {
        Self { env, base, block }
    }

    pub fn render(&self, body: &str) -> Result<String, minijinja::Error> {
        let source = format!(
            "{{% extends {base:?} %}}{{% block {block} %}}{body}{{% endblock %}}",
            base = self.base,
            block = self.block,
        );
        // Registered on a clone; the shared environment is left unchanged.
        let mut env = self.env.clone();
        env.add_template_owned(FRAGMENT_NAME, source)?;
        let template = env.get_template(FRAGMENT_NAME)?;
        let mut captured = template.render_captured(context! {})?;
        captured.with_state_mut(|state| state.render_block(self.block))
    }
}
