use std::borrow::Cow;

use super::context::{key_path, Path};
use super::error::EvalError;
use super::operator::{Operator, VAR};
use super::value::{Value, NULL};

/// A raw rule node, classified by shape. Borrows from the rule it came from.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr<'a> {
    Literal(&'a Value),
    Var {
        path: VarPath<'a>,
        default: Option<&'a Value>,
    },
    Op {
        op: &'static Operator,
        args: &'a [Value],
    },
}

/// The path of a variable reference: fixed text, or a rule evaluated first.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum VarPath<'a> {
    Key(Cow<'a, str>),
    Rule(&'a Value),
}

impl<'a> Expr<'a> {
    /// Classify one node. Only single-key objects are invocations; every other
    /// value, arrays included, is a literal.
    pub(crate) fn classify(rule: &'a Value) -> Result<Self, EvalError> {
        let Some(map) = rule.as_object() else {
            return Ok(Expr::Literal(rule));
        };
        let mut entries = map.iter();
        match (entries.next(), entries.next()) {
            (None, _) => Ok(Expr::Literal(rule)),
            (Some((key, body)), None) => Self::invocation(key, body),
            (Some(_), Some(_)) => {
                let keys: Vec<String> = map.keys().map(|k| format!("{k:?}")).collect();
                Err(EvalError::malformed(format!(
                    "operator object has {} keys: {}",
                    map.len(),
                    keys.join(", ")
                )))
            }
        }
    }

    fn invocation(key: &str, body: &'a Value) -> Result<Self, EvalError> {
        if key == VAR {
            return Self::var(body);
        }
        let op = Operator::lookup(key).ok_or_else(|| EvalError::UnknownOperator {
            operator: key.to_owned(),
        })?;
        let args = match body {
            Value::Array(items) => items.as_slice(),
            single => std::slice::from_ref(single),
        };
        Ok(Expr::Op { op, args })
    }

    fn var(body: &'a Value) -> Result<Self, EvalError> {
        let (path, default) = match body {
            Value::Array(items) => match items.as_slice() {
                [] => (&NULL, None),
                [path] => (path, None),
                [path, default] => (path, Some(default)),
                _ => {
                    return Err(EvalError::malformed(format!(
                        "var takes a path and an optional default, got {} arguments",
                        items.len()
                    )))
                }
            },
            path => (path, None),
        };
        let path = match path {
            Value::Object(_) => VarPath::Rule(path),
            key => VarPath::Key(
                key_path(key)
                    .ok_or_else(|| EvalError::malformed(format!("invalid var path {key}")))?,
            ),
        };
        Ok(Expr::Var { path, default })
    }
}

/// Index of a node in a compiled arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct NodeId(pub(crate) u32);

impl NodeId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// A contiguous run of child ids in the shared edge list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub(crate) start: u32,
    pub(crate) len: u32,
}

impl Span {
    pub(crate) fn range(self) -> std::ops::Range<usize> {
        let start = self.start as usize;
        start..start + self.len as usize
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CompiledPath {
    Static(Path),
    Dynamic(NodeId),
}

/// A compiled node. Operators hold their registry entry, variables a
/// pre-split path, and children are addressed by id.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CompiledExpr {
    Literal(Value),
    Var {
        path: CompiledPath,
        default: Option<NodeId>,
    },
    Op {
        op: &'static Operator,
        args: Span,
    },
}
