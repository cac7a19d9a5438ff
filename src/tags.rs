//! Tag chain parsing.
//!
//! A content node's tag names the processors that transform it, in order.
//! Entries are separated by top-level commas and may carry a parenthesized,
//! comma-separated argument list:
//!
//! ```text
//! !md                 → [("md", None)]
//! !md,j2              → [("md", None), ("j2", None)]
//! !code(python)       → [("code", Some(["python"]))]
//! !join,code(rust),j2 → [("join", None), ("code", Some(["rust"])), ("j2", None)]
//! ```
//!
//! Commas inside parentheses belong to the argument list, never to the
//! chain. Parsing is purely syntactic: whether a name is registered is the
//! resolver's concern (see [`crate::resolve`]).

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    #[error("empty tag")]
    Empty,
    #[error("empty entry at position {0} in tag chain")]
    EmptyEntry(usize),
    #[error("unbalanced parentheses in tag chain")]
    UnbalancedParens,
}

/// One entry of a tag chain: a processor name and its optional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSpec {
    pub name: String,
    /// `None` when the entry had no parentheses at all. `code()` yields
    /// `Some(vec![])`.
    pub args: Option<Vec<String>>,
}

impl TagSpec {
    /// Parse a single chain entry such as `code(python)` or `md`.
    ///
    /// Anything not of the shape `name(args)` is taken whole as the name.
    fn parse(raw: &str) -> TagSpec {
        if let Some(open) = raw.find('(')
            && open > 0
            && raw.ends_with(')')
        {
            let inner = &raw[open + 1..raw.len() - 1];
            let args = if inner.is_empty() {
                Vec::new()
            } else {
                inner.split(',').map(str::to_string).collect()
            };
            return TagSpec {
                name: raw[..open].to_string(),
                args: Some(args),
            };
        }
        TagSpec {
            name: raw.to_string(),
            args: None,
        }
    }
}

/// Parse a tag suffix (without the leading `!`) into an ordered chain.
pub fn parse_tag_chain(suffix: &str) -> Result<Vec<TagSpec>, TagError> {
    if suffix.is_empty() {
        return Err(TagError::Empty);
    }
    split_top_level(suffix)?
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            if raw.is_empty() {
                Err(TagError::EmptyEntry(i))
            } else {
                Ok(TagSpec::parse(raw))
            }
        })
        .collect()
}

/// Split on commas that sit outside any parentheses.
fn split_top_level(s: &str) -> Result<Vec<&str>, TagError> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1).ok_or(TagError::UnbalancedParens)?,
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(TagError::UnbalancedParens);
    }
    parts.push(&s[start..]);
    Ok(parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, args: Option<&[&str]>) -> TagSpec {
        TagSpec {
            name: name.to_string(),
            args: args.map(|a| a.iter().map(|s| s.to_string()).collect()),
        }
    }

    #[test]
    fn single_bare_tag() {
        assert_eq!(parse_tag_chain("join").unwrap(), vec![spec("join", None)]);
    }

    #[test]
    fn parameterized_tag() {
        assert_eq!(
            parse_tag_chain("code(python)").unwrap(),
            vec![spec("code", Some(&["python"]))]
        );
    }

    #[test]
    fn chain_preserves_order() {
        assert_eq!(
            parse_tag_chain("md,j2").unwrap(),
            vec![spec("md", None), spec("j2", None)]
        );
        assert_eq!(
            parse_tag_chain("j2,md").unwrap(),
            vec![spec("j2", None), spec("md", None)]
        );
    }

    #[test]
    fn commas_inside_parens_are_arguments() {
        assert_eq!(
            parse_tag_chain("join,code(rust,extra),j2").unwrap(),
            vec![
                spec("join", None),
                spec("code", Some(&["rust", "extra"])),
                spec("j2", None),
            ]
        );
    }

    #[test]
    fn empty_parens_give_empty_args() {
        assert_eq!(parse_tag_chain("code()").unwrap(), vec![spec("code", Some(&[]))]);
    }

    #[test]
    fn non_matching_shape_is_whole_name() {
        // Trailing text after `)` does not match `name(args)`.
        assert_eq!(
            parse_tag_chain("code(py)x").unwrap(),
            vec![spec("code(py)x", None)]
        );
        assert_eq!(parse_tag_chain("(py)").unwrap(), vec![spec("(py)", None)]);
    }

    #[test]
    fn empty_suffix_is_malformed() {
        assert_eq!(parse_tag_chain(""), Err(TagError::Empty));
    }

    #[test]
    fn empty_entry_is_malformed() {
        assert_eq!(parse_tag_chain("md,,j2"), Err(TagError::EmptyEntry(1)));
        assert_eq!(parse_tag_chain("md,"), Err(TagError::EmptyEntry(1)));
    }

    #[test]
    fn unbalanced_parens_are_malformed() {
        assert_eq!(parse_tag_chain("code(python"), Err(TagError::UnbalancedParens));
        assert_eq!(parse_tag_chain("code)python("), Err(TagError::UnbalancedParens));
    }
}
