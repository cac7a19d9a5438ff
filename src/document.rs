//! Content file loading.
//!
//! A content file is one YAML mapping. Tagged fields are resolved through
//! the processor chains while the file is loaded, so the resulting
//! [`Document`] holds only plain values ready for a layout:
//!
//! ```yaml
//! layout: page.html
//! title: !md "**Hello**"
//! body: !md,j2 |
//!   Some *markdown* that may use {{ "template" | upper }} syntax.
//! snippet: !code(python) |
//!   print("highlighted, not run")
//! ```
//!
//! ## Tag chains and YAML
//!
//! YAML does not allow commas in shorthand tags (`!md,j2`), but it does in
//! verbatim tags (`!<!md,j2>`). Before parsing, shorthand tags that carry a
//! comma are rewritten into the verbatim form. The rewrite only looks at
//! positions where a node can start, so quoted strings, plain text, comments
//! and block scalar bodies are never touched.
//!
//! ## Failure model
//!
//! Any parse or resolution error fails the whole file; there is no partial
//! document. A missing `layout` is not a load error: the document loads and
//! the site builder decides what to do with it.

use crate::processors::value_kind;
use crate::resolve::{Node, ResolveError, Resolver};
use serde_yaml::{Mapping, Value};
use std::borrow::Cow;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("could not read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("expected a mapping of fields at the top level, found {0}")]
    NotAMapping(&'static str),
}

/// A fully resolved content file.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    fields: Mapping,
}

impl Document {
    /// The layout this document asks for, if it names one.
    ///
    /// A non-string `layout` counts as no layout.
    pub fn layout(&self) -> Option<&str> {
        self.fields.get("layout").and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// All fields, passed verbatim to the layout.
    pub fn fields(&self) -> &Mapping {
        &self.fields
    }
}

/// Read and resolve one content file.
pub fn load_document(path: &Path, resolver: &Resolver<'_>) -> Result<Document, LoadError> {
    let source = fs::read_to_string(path)?;
    parse_document(&source, resolver)
}

/// Parse and resolve content from a string.
pub fn parse_document(source: &str, resolver: &Resolver<'_>) -> Result<Document, LoadError> {
    let source = normalize_tag_chains(source);
    let mut value: Value = serde_yaml::from_str(&source)?;
    value.apply_merge()?;
    match resolver.resolve(Node::from_yaml(value))? {
        Value::Mapping(fields) => Ok(Document { fields }),
        other => Err(LoadError::NotAMapping(value_kind(&other))),
    }
}

/// Rewrite shorthand tags containing commas (`!md,j2`) into verbatim local
/// tags (`!<!md,j2>`). Returns the input unchanged when nothing needs it.
pub fn normalize_tag_chains(source: &str) -> Cow<'_, str> {
    if !source.contains('!') {
        return Cow::Borrowed(source);
    }
    let mut scanner = TagScanner::default();
    let mut out = String::with_capacity(source.len() + 16);
    let mut changed = false;
    for line in source.split_inclusive('\n') {
        changed |= scanner.scan_line(line, &mut out);
    }
    if changed {
        Cow::Owned(out)
    } else {
        Cow::Borrowed(source)
    }
}

/// Line-oriented scanner that tracks just enough YAML structure to find
/// tags: quoted scalars (which may span lines), block scalar bodies, and
/// flow collection depth.
#[derive(Default)]
struct TagScanner {
    quote: Option<char>,
    /// Indentation of the line that opened a block scalar.
    block_indent: Option<usize>,
    /// Minimum indentation of a continuation line of an open plain scalar.
    plain_indent: Option<usize>,
    flow_depth: usize,
}

impl TagScanner {
    fn scan_line(&mut self, line: &str, out: &mut String) -> bool {
        let indent = line.len() - line.trim_start_matches(' ').len();
        if let Some(parent) = self.block_indent {
            if line.trim().is_empty() || indent > parent {
                out.push_str(line);
                return false;
            }
            self.block_indent = None;
        }
        if let Some(min) = self.plain_indent {
            let text = line.trim();
            if text.is_empty() {
                out.push_str(line);
                return false;
            }
            if indent >= min && !text.starts_with('#') {
                if has_comment(line) {
                    self.plain_indent = None;
                }
                out.push_str(line);
                return false;
            }
            self.plain_indent = None;
        }

        let chars: Vec<(usize, char)> = line.char_indices().collect();
        let mut changed = false;
        let mut node_start = self.quote.is_none();
        // Column of the collection entry on this line, and of the last node.
        let mut entry_col = indent;
        let mut token_col = indent;
        let mut plain_start = None;
        let mut i = 0;

        if line.starts_with("---") && line[3..].chars().next().is_none_or(char::is_whitespace) {
            out.push_str("---");
            i = 3;
        }

        while i < chars.len() {
            let (pos, c) = chars[i];
            let next = chars.get(i + 1).map(|&(_, c)| c);

            if let Some(quote) = self.quote {
                out.push(c);
                match (quote, c) {
                    ('\'', '\'') if next == Some('\'') => {
                        out.push('\'');
                        i += 1;
                    }
                    ('"', '\\') => {
                        if let Some(escaped) = next {
                            out.push(escaped);
                            i += 1;
                        }
                    }
                    ('\'', '\'') | ('"', '"') => self.quote = None,
                    _ => {}
                }
                i += 1;
                continue;
            }

            if c.is_whitespace() {
                out.push(c);
                i += 1;
                continue;
            }
            if c == '#' && (i == 0 || chars[i - 1].1.is_whitespace()) {
                plain_start = None;
                out.push_str(&line[pos..]);
                break;
            }

            let ends_token = next.is_none_or(char::is_whitespace);
            if node_start {
                match c {
                    '!' | '&' => {
                        let end = token_end(line, pos);
                        let token = &line[pos..end];
                        match (c, verbatim_tag(token)) {
                            ('!', Some(rewritten)) => {
                                out.push_str(&rewritten);
                                changed = true;
                            }
                            _ => out.push_str(token),
                        }
                        while i < chars.len() && chars[i].0 < end {
                            i += 1;
                        }
                        continue;
                    }
                    '"' | '\'' => {
                        self.quote = Some(c);
                        token_col = pos;
                        node_start = false;
                    }
                    '|' | '>' if is_block_header(&line[pos + 1..]) => {
                        self.block_indent = Some(indent);
                        out.push_str(&line[pos..]);
                        break;
                    }
                    '-' | '?' if ends_token => entry_col = pos,
                    ':' if ends_token => {}
                    '[' | '{' => self.flow_depth += 1,
                    ',' if self.flow_depth > 0 => {}
                    ']' | '}' => {
                        self.flow_depth = self.flow_depth.saturating_sub(1);
                        node_start = false;
                    }
                    _ => {
                        node_start = false;
                        token_col = pos;
                        if self.flow_depth == 0 {
                            // A bare scalar opening its line continues at
                            // the same indentation; after a key or `- `,
                            // continuations sit deeper than the entry.
                            let bare = pos == indent && entry_col == indent;
                            plain_start = Some(if bare { pos } else { entry_col + 1 });
                        }
                    }
                }
            } else {
                match c {
                    ':' if ends_token || (self.flow_depth > 0 && is_flow_indicator(next)) => {
                        node_start = true;
                        entry_col = token_col;
                        plain_start = None;
                    }
                    ',' if self.flow_depth > 0 => node_start = true,
                    ']' | '}' if self.flow_depth > 0 => self.flow_depth -= 1,
                    _ => {}
                }
            }
            out.push(c);
            i += 1;
        }
        if self.quote.is_none() && self.flow_depth == 0 {
            self.plain_indent = plain_start;
        }
        changed
    }
}

fn has_comment(line: &str) -> bool {
    line.contains(" #") || line.contains("\t#")
}

fn is_flow_indicator(c: Option<char>) -> bool {
    matches!(c, Some(',' | ']' | '}'))
}

fn token_end(line: &str, start: usize) -> usize {
    line[start..]
        .find(char::is_whitespace)
        .map_or(line.len(), |offset| start + offset)
}

/// `!name,other` → `!<!name,other>`. Verbatim tags, `!!` tags and named
/// handles are left alone, as are tags without a comma.
fn verbatim_tag(token: &str) -> Option<String> {
    let suffix = token.strip_prefix('!')?;
    if suffix.starts_with('<') || suffix.contains('!') {
        return None;
    }
    // A flow separator right after the tag belongs to the collection.
    let chain = suffix.trim_end_matches([',', ']', '}']);
    let rest = &suffix[chain.len()..];
    chain
        .contains(',')
        .then(|| format!("!<!{chain}>{rest}"))
}

/// Whether the text after `|` or `>` is a block scalar header.
fn is_block_header(rest: &str) -> bool {
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_digit() || c == '+' || c == '-');
    let trimmed = rest.trim();
    trimmed.is_empty() || (rest.starts_with(char::is_whitespace) && trimmed.starts_with('#'))
}
