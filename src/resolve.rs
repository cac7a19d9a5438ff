//! Node resolution: turning a tagged YAML tree into plain values.
//!
//! The parser hands back a tree where any node may carry a tag. Resolution
//! is bottom-up: a node's children are resolved first, then the node's own
//! native value is built (a string for tagged scalars, a list for sequences,
//! a mapping for mappings) and threaded through its tag chain.
//!
//! ```text
//! body: !join
//!   - !md "**one**"       ← resolved first: "<br><strong>one</strong>"
//!   - two                 ← untagged, kept as-is
//!                         → "<br><strong>one</strong>\ntwo"
//! ```
//!
//! Every name in a chain is checked against the registry before any
//! processor runs, so an unknown tag never leaves a half-run chain behind
//! (relevant for `!py`, which has side effects).

use crate::processors::{self, Processor, ProcessorContext, ProcessorError};
use crate::tags::{TagError, parse_tag_chain};
use serde_yaml::value::{Tag, TaggedValue};
use serde_yaml::{Mapping, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("malformed tag `!{tag}`: {source}")]
    MalformedTag { tag: String, source: TagError },
    #[error("unknown processor `{name}` in tag `!{tag}` (known: {known})")]
    UnknownProcessor {
        name: String,
        tag: String,
        known: String,
    },
    #[error("`{name}` failed in tag `!{tag}`: {source}")]
    Processor {
        name: &'static str,
        tag: String,
        source: ProcessorError,
    },
}

/// A content node as delivered by the parser.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar {
        tag: Option<String>,
        value: Value,
    },
    Sequence {
        tag: Option<String>,
        items: Vec<Node>,
    },
    Mapping {
        tag: Option<String>,
        entries: Vec<(Node, Node)>,
    },
}

impl Node {
    /// Convert a parsed YAML value, lifting `Value::Tagged` wrappers into
    /// node tags.
    pub fn from_yaml(value: Value) -> Node {
        Self::build(value, None)
    }

    fn build(value: Value, tag: Option<String>) -> Node {
        match value {
            Value::Tagged(tagged) => {
                let TaggedValue { tag, value } = *tagged;
                Self::build(value, Some(tag_suffix(&tag)))
            }
            Value::Sequence(items) => Node::Sequence {
                tag,
                items: items.into_iter().map(Node::from_yaml).collect(),
            },
            Value::Mapping(map) => Node::Mapping {
                tag,
                entries: map
                    .into_iter()
                    .map(|(k, v)| (Node::from_yaml(k), Node::from_yaml(v)))
                    .collect(),
            },
            scalar => Node::Scalar { tag, value: scalar },
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Node::Scalar { tag, .. } | Node::Sequence { tag, .. } | Node::Mapping { tag, .. } => {
                tag.as_deref()
            }
        }
    }
}

/// `Tag` displays with its leading `!`; chains are parsed without it.
fn tag_suffix(tag: &Tag) -> String {
    let tag = tag.to_string();
    match tag.strip_prefix('!').unwrap_or(&tag) {
        // The non-specific tag `! foo` names no processor.
        "!" => String::new(),
        suffix => suffix.to_string(),
    }
}

pub struct Resolver<'a> {
    context: ProcessorContext<'a>,
}

impl<'a> Resolver<'a> {
    pub fn new(context: ProcessorContext<'a>) -> Self {
        Self { context }
    }

    /// Resolve a node and everything beneath it.
    pub fn resolve(&self, node: Node) -> Result<Value, ResolveError> {
        let (tag, native) = match node {
            Node::Scalar { tag, value } => {
                // Tagged scalars always reach their processors as text.
                let value = match tag {
                    Some(_) => Value::String(processors::scalar_text(&value).unwrap_or_default()),
                    None => value,
                };
                (tag, value)
            }
            Node::Sequence { tag, items } => {
                let items = items
                    .into_iter()
                    .map(|item| self.resolve(item))
                    .collect::<Result<Vec<_>, _>>()?;
                (tag, Value::Sequence(items))
            }
            Node::Mapping { tag, entries } => {
                let mut map = Mapping::with_capacity(entries.len());
                for (key, value) in entries {
                    map.insert(self.resolve(key)?, self.resolve(value)?);
                }
                (tag, Value::Mapping(map))
            }
        };
        match tag {
            Some(tag) => self.apply(&tag, native),
            None => Ok(native),
        }
    }

    /// Parse `tag` and run its chain over `value`.
    pub fn apply(&self, tag: &str, value: Value) -> Result<Value, ResolveError> {
        let chain = parse_tag_chain(tag).map_err(|source| ResolveError::MalformedTag {
            tag: tag.to_string(),
            source,
        })?;
        let steps = chain
            .into_iter()
            .map(|spec| match processors::lookup(&spec.name) {
                Some(processor) => Ok((processor, spec.args)),
                None => Err(ResolveError::UnknownProcessor {
                    name: spec.name,
                    tag: tag.to_string(),
                    known: processors::names().collect::<Vec<_>>().join(", "),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        self.run_chain(tag, &steps, value)
    }

    /// Fold `value` through `steps` left to right.
    fn run_chain(
        &self,
        tag: &str,
        steps: &[(&Processor, Option<Vec<String>>)],
        value: Value,
    ) -> Result<Value, ResolveError> {
        steps.iter().try_fold(value, |value, (processor, args)| {
            (processor.run)(value, args.as_deref(), &self.context).map_err(|source| {
                ResolveError::Processor {
                    name: processor.name,
                    tag: tag.to_string(),
                    source,
                }
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::TestTools;

    fn resolve_yaml(tools: &TestTools, yaml: &str) -> Result<Value, ResolveError> {
        let value: Value = serde_yaml::from_str(yaml).unwrap();
        Resolver::new(tools.context()).resolve(Node::from_yaml(value))
    }

    fn string(s: &str) -> Value {
        Value::String(s.to_string())
    }

    #[test]
    fn from_yaml_lifts_tags() {
        let value: Value = serde_yaml::from_str("!<!md,j2> hello").unwrap();
        let node = Node::from_yaml(value);
        assert_eq!(node.tag(), Some("md,j2"));
        assert!(matches!(node, Node::Scalar { .. }));
    }

    #[test]
    fn non_specific_tag_has_an_empty_suffix() {
        let value: Value = serde_yaml::from_str("! foo").unwrap();
        assert_eq!(Node::from_yaml(value).tag(), Some(""));
    }

    #[test]
    fn from_yaml_keeps_untagged_structure() {
        let value: Value = serde_yaml::from_str("a: [1, 2]").unwrap();
        match Node::from_yaml(value) {
            Node::Mapping { tag: None, entries } => {
                assert_eq!(entries.len(), 1);
                assert!(matches!(entries[0].1, Node::Sequence { tag: None, .. }));
            }
            other => panic!("expected mapping, got {other:?}"),
        }
    }

    #[test]
    fn untagged_values_pass_through_with_their_types() {
        let tools = TestTools::new();
        let resolved = resolve_yaml(&tools, "count: 3\nflag: true\nitems: [a, b]").unwrap();
        let expected: Value = serde_yaml::from_str("count: 3\nflag: true\nitems: [a, b]").unwrap();
        assert_eq!(resolved, expected);
    }

    #[test]
    fn tagged_scalar_is_processed_as_text() {
        let tools = TestTools::new();
        let resolved = resolve_yaml(&tools, "!md 42").unwrap();
        assert_eq!(resolved, string("<br>42"));
    }

    #[test]
    fn empty_tagged_scalar_is_empty_text() {
        let tools = TestTools::new();
        let resolved = resolve_yaml(&tools, "title: !md").unwrap();
        assert_eq!(resolved["title"], string(""));
    }

    #[test]
    fn children_resolve_before_parent() {
        let tools = TestTools::new();
        let resolved = resolve_yaml(&tools, "!join [!md \"**a**\", b]").unwrap();
        assert_eq!(resolved, string("<br><strong>a</strong>\nb"));
    }

    #[test]
    fn tags_inside_mappings_resolve() {
        let tools = TestTools::new();
        let resolved = resolve_yaml(&tools, "page:\n  title: !md \"*x*\"\n  n: 1").unwrap();
        assert_eq!(resolved["page"]["title"], string("<br><em>x</em>"));
        assert_eq!(resolved["page"]["n"], Value::from(1));
    }

    #[test]
    fn chain_runs_left_to_right() {
        let tools = TestTools::new();
        let resolver = Resolver::new(tools.context());
        let lines = Value::Sequence(vec![string("# A"), string("b")]);
        // join first, then md. The reverse order would hand md a list.
        let resolved = resolver.apply("join,md", lines.clone()).unwrap();
        assert_eq!(resolved, string("<h1>A</h1>\n<br>b"));
        assert!(resolver.apply("md,join", lines).is_err());
    }

    fn append_a(
        v: Value,
        _: Option<&[String]>,
        _: &ProcessorContext<'_>,
    ) -> Result<Value, ProcessorError> {
        Ok(string(&format!("{}a", v.as_str().unwrap())))
    }

    fn append_b(
        v: Value,
        _: Option<&[String]>,
        _: &ProcessorContext<'_>,
    ) -> Result<Value, ProcessorError> {
        Ok(string(&format!("{}b", v.as_str().unwrap())))
    }

    fn append_arg(
        v: Value,
        args: Option<&[String]>,
        _: &ProcessorContext<'_>,
    ) -> Result<Value, ProcessorError> {
        let joined = args.unwrap().join("+");
        Ok(string(&format!("{}{joined}", v.as_str().unwrap())))
    }

    #[test]
    fn fold_applies_each_step_to_the_previous_output() {
        static A: Processor = Processor { name: "a", run: append_a };
        static B: Processor = Processor { name: "b", run: append_b };
        static C: Processor = Processor { name: "c", run: append_arg };
        let tools = TestTools::new();
        let resolver = Resolver::new(tools.context());
        let steps = vec![
            (&A, None),
            (&B, None),
            (&C, Some(vec!["x".to_string(), "y".to_string()])),
            (&A, None),
        ];
        let out = resolver.run_chain("a,b,c(x,y),a", &steps, string("v")).unwrap();
        assert_eq!(out, string("vabx+ya"));
    }

    #[test]
    fn unknown_processor_names_the_tag() {
        let tools = TestTools::new();
        let err = resolve_yaml(&tools, "title: !shout hi").unwrap_err();
        match &err {
            ResolveError::UnknownProcessor { name, tag, .. } => {
                assert_eq!(name, "shout");
                assert_eq!(tag, "shout");
            }
            other => panic!("expected unknown processor, got {other:?}"),
        }
        assert!(err.to_string().contains("known: join, md, j2, code, py"));
    }

    #[test]
    fn unknown_processor_later_in_chain_fails_the_whole_node() {
        let tools = TestTools::new();
        let resolver = Resolver::new(tools.context());
        let err = resolver.apply("md,nope", string("x")).unwrap_err();
        assert!(matches!(err, ResolveError::UnknownProcessor { ref name, .. } if name == "nope"));
    }

    #[test]
    fn nested_failure_propagates() {
        let tools = TestTools::new();
        let err = resolve_yaml(&tools, "outer:\n  inner: [ok, !nope x]").unwrap_err();
        assert!(matches!(err, ResolveError::UnknownProcessor { .. }));
    }

    #[test]
    fn malformed_tag_is_reported() {
        let tools = TestTools::new();
        let resolver = Resolver::new(tools.context());
        let err = resolver.apply("code(python", string("x")).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::MalformedTag {
                source: TagError::UnbalancedParens,
                ..
            }
        ));
    }

    #[test]
    fn processor_failure_names_the_processor() {
        let tools = TestTools::new();
        let resolver = Resolver::new(tools.context());
        let err = resolver.apply("join", string("not a list")).unwrap_err();
        assert!(matches!(err, ResolveError::Processor { name: "join", .. }));
    }
}
