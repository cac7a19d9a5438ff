//! Content processors and the tag registry.
//!
//! Every tag chain entry names one of these processors. A processor takes
//! the value built so far plus the entry's arguments and returns a new
//! value; the resolver threads the value through the chain left to right.
//!
//! | Tag | Input | Output |
//! |-----|-------|--------|
//! | `join` | list of strings | lines joined with `\n` |
//! | `md` | string | Markdown rendered to HTML, paragraphs as `<br>` |
//! | `j2` | string | template fragment rendered inside the macros template |
//! | `code(lang)` | string | syntax-highlighted HTML |
//! | `py` | string | captured standard output of running the string |
//!
//! The registry is a fixed table. Nothing is registered at runtime.

pub mod fragment;
pub mod highlight;
pub mod markdown;
pub mod script;

use fragment::FragmentRenderer;
use highlight::Highlighter;
use script::ScriptRunner;
use serde_yaml::Value;
use std::process::ExitStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("expected {expected}, got {found}")]
    InputType {
        expected: &'static str,
        found: &'static str,
    },
    #[error("missing language argument, write e.g. !code(python)")]
    MissingLanguage,
    #[error("no syntax definition for language `{0}`")]
    UnknownLanguage(String),
    #[error("highlighting failed: {0}")]
    Highlight(#[from] syntect::Error),
    #[error("template fragment failed: {0}")]
    Fragment(#[from] minijinja::Error),
    #[error("could not start `{interpreter}`: {source}")]
    Spawn {
        interpreter: String,
        source: std::io::Error,
    },
    #[error("script exited with {status}: {stderr}")]
    Script { status: ExitStatus, stderr: String },
}

/// Collaborators the processors need, borrowed for the length of a build.
pub struct ProcessorContext<'a> {
    pub fragments: FragmentRenderer<'a>,
    pub highlighter: &'a Highlighter,
    pub scripts: &'a ScriptRunner,
}

pub type ProcessorFn =
    fn(Value, Option<&[String]>, &ProcessorContext<'_>) -> Result<Value, ProcessorError>;

/// A named entry in the registry.
pub struct Processor {
    pub name: &'static str,
    pub run: ProcessorFn,
}

static REGISTRY: [Processor; 5] = [
    Processor { name: "join", run: join },
    Processor { name: "md", run: md },
    Processor { name: "j2", run: j2 },
    Processor { name: "code", run: code },
    Processor { name: "py", run: py },
];

/// Look up a processor by tag name.
pub fn lookup(name: &str) -> Option<&'static Processor> {
    REGISTRY.iter().find(|p| p.name == name)
}

/// All registered tag names, in registry order.
pub fn names() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|p| p.name)
}

fn join(
    value: Value,
    _: Option<&[String]>,
    _: &ProcessorContext<'_>,
) -> Result<Value, ProcessorError> {
    let items = match value {
        Value::Sequence(items) => items,
        other => return Err(unexpected("a list of strings", &other)),
    };
    let lines = items
        .iter()
        .map(|item| scalar_text(item).ok_or_else(|| unexpected("a list of strings", item)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::String(lines.join("\n")))
}

fn md(
    value: Value,
    _: Option<&[String]>,
    _: &ProcessorContext<'_>,
) -> Result<Value, ProcessorError> {
    let source = expect_text(&value)?;
    Ok(Value::String(markdown::render(&source)))
}

fn j2(
    value: Value,
    _: Option<&[String]>,
    ctx: &ProcessorContext<'_>,
) -> Result<Value, ProcessorError> {
    let body = expect_text(&value)?;
    Ok(Value::String(ctx.fragments.render(&body)?))
}

fn code(
    value: Value,
    args: Option<&[String]>,
    ctx: &ProcessorContext<'_>,
) -> Result<Value, ProcessorError> {
    let language = args
        .and_then(|args| args.first())
        .filter(|lang| !lang.is_empty())
        .ok_or(ProcessorError::MissingLanguage)?;
    let source = expect_text(&value)?;
    Ok(Value::String(ctx.highlighter.highlight(&source, language)?))
}

fn py(
    value: Value,
    _: Option<&[String]>,
    ctx: &ProcessorContext<'_>,
) -> Result<Value, ProcessorError> {
    let source = expect_text(&value)?;
    Ok(Value::String(ctx.scripts.run(&source)?))
}

/// Text of a scalar value. Null reads as the empty string, matching an
/// empty tagged node (`title: !md`). Collections have no text.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        Value::Sequence(_) | Value::Mapping(_) | Value::Tagged(_) => None,
    }
}

fn expect_text(value: &Value) -> Result<String, ProcessorError> {
    scalar_text(value).ok_or_else(|| unexpected("a string", value))
}

fn unexpected(expected: &'static str, found: &Value) -> ProcessorError {
    ProcessorError::InputType {
        expected,
        found: value_kind(found),
    }
}

/// Short description of a value's kind for error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{TestTools, python_available};

    fn run(name: &str, value: Value, args: Option<&[String]>) -> Result<Value, ProcessorError> {
        let tools = TestTools::new();
        (lookup(name).unwrap().run)(value, args, &tools.context())
    }

    fn strings(items: &[&str]) -> Value {
        Value::Sequence(items.iter().map(|s| Value::String(s.to_string())).collect())
    }

    #[test]
    fn registry_has_every_tag() {
        assert_eq!(names().collect::<Vec<_>>(), ["join", "md", "j2", "code", "py"]);
        assert!(lookup("md").is_some());
        assert!(lookup("markdown").is_none());
    }

    #[test]
    fn join_uses_newlines_in_order() {
        let joined = run("join", strings(&["a", "b", "c"]), None).unwrap();
        assert_eq!(joined, Value::String("a\nb\nc".into()));
    }

    #[test]
    fn join_ignores_arguments() {
        let args = vec!["ignored".to_string()];
        let joined = run("join", strings(&["x", "y"]), Some(args.as_slice())).unwrap();
        assert_eq!(joined, Value::String("x\ny".into()));
    }

    #[test]
    fn join_accepts_scalars_of_any_kind() {
        let value: Value = serde_yaml::from_str("[1, true, text]").unwrap();
        assert_eq!(run("join", value, None).unwrap(), Value::String("1\ntrue\ntext".into()));
    }

    #[test]
    fn join_rejects_a_string() {
        let err = run("join", Value::String("a".into()), None).unwrap_err();
        assert!(matches!(
            err,
            ProcessorError::InputType { expected: "a list of strings", found: "a string" }
        ));
    }

    #[test]
    fn join_rejects_nested_lists() {
        let value: Value = serde_yaml::from_str("[a, [b]]").unwrap();
        assert!(run("join", value, None).is_err());
    }

    #[test]
    fn md_rejects_a_list() {
        let err = run("md", strings(&["a"]), None).unwrap_err();
        assert!(matches!(err, ProcessorError::InputType { found: "a list", .. }));
    }

    #[test]
    fn md_renders_markdown() {
        let html = run("md", Value::String("*hey*".into()), None).unwrap();
        assert_eq!(html, Value::String("<br><em>hey</em>".into()));
    }

    #[test]
    fn j2_renders_through_the_macros_template() {
        let html = run("j2", Value::String("{{ 'a' | upper }}".into()), None).unwrap();
        assert_eq!(html, Value::String("A".into()));
    }

    #[test]
    fn code_requires_a_language() {
        let err = run("code", Value::String("x".into()), None).unwrap_err();
        assert!(matches!(err, ProcessorError::MissingLanguage));
        let empty: &[String] = &[];
        let err = run("code", Value::String("x".into()), Some(empty)).unwrap_err();
        assert!(matches!(err, ProcessorError::MissingLanguage));
    }

    #[test]
    fn code_highlights_the_literal_source() {
        let args = vec!["python".to_string()];
        let source = Value::String("print(\"x\")".into());
        let html = run("code", source, Some(args.as_slice())).unwrap();
        let html = html.as_str().unwrap();
        assert!(html.starts_with("<pre"));
        assert!(html.contains("print"));
    }

    #[test]
    fn py_returns_captured_output() {
        if !python_available() {
            eprintln!("python3 not installed, skipping");
            return;
        }
        let out = run("py", Value::String("print(\"hi\")".into()), None).unwrap();
        assert_eq!(out, Value::String("hi\n".into()));
    }
}
