//! Syntax highlighting for `!code(<language>)` fields.
//!
//! Uses syntect's bundled syntaxes and themes. Output is a `<pre>` block with
//! inline styles from the configured theme, so pages need no extra CSS.

use super::ProcessorError;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;
use thiserror::Error;

#[derive(Error, Debug)]
#[error("unknown highlight theme `{name}` (available: {available})")]
pub struct UnknownTheme {
    pub name: String,
    pub available: String,
}

/// Syntax definitions plus the selected theme. Loading both is not free, so
/// one highlighter is built per builder and reused across rebuilds.
pub struct Highlighter {
    syntaxes: SyntaxSet,
    theme: Theme,
}

impl Highlighter {
    pub fn new(theme_name: &str) -> Result<Self, UnknownTheme> {
        let mut themes = ThemeSet::load_defaults().themes;
        let theme = themes.remove(theme_name).ok_or_else(|| UnknownTheme {
            name: theme_name.to_string(),
            available: themes.keys().cloned().collect::<Vec<_>>().join(", "),
        })?;
        Ok(Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            theme,
        })
    }

    /// Highlight `code` as `language`, matched against syntax names and file
    /// extensions case-insensitively (`python`, `py`, `Rust`, `rs`, ...).
    pub fn highlight(&self, code: &str, language: &str) -> Result<String, ProcessorError> {
        let syntax = self
            .syntaxes
            .find_syntax_by_token(language)
            .ok_or_else(|| ProcessorError::UnknownLanguage(language.to_string()))?;
        let code = strip_blank_lines(code);
        Ok(highlighted_html_for_string(
            code,
            &self.syntaxes,
            syntax,
            &self.theme,
        )?)
    }
}

/// Drop blank lines before the first and after the last non-blank line.
fn strip_blank_lines(code: &str) -> &str {
    let mut start = 0;
    for line in code.split_inclusive('\n') {
        if !line.trim().is_empty() {
            break;
        }
        start += line.len();
    }
    code[start..].trim_end()
}
