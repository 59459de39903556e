use std::collections::BTreeMap;
use std::fmt;

use super::expr::{CompiledExpr, CompiledPath, NodeId};
use super::operator::VAR;
use super::value::Value;

/// A rule compiled into a flat, immutable node arena.
///
/// Children always precede their parent and the root is the last node, so the
/// arena can be walked or measured in one forward pass. Holds no per-call
/// state: a single `CompiledRule` can be shared behind `Arc` and applied from
/// many threads at once.
///
/// ```
/// use serde_json::json;
/// use tessera::{compile, Value};
///
/// let rule = compile(&Value::from(json!({"+": [{"var": "a"}, 1]}))).unwrap();
/// assert_eq!(rule.apply(&Value::from(json!({"a": 41}))), Value::Int(42));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    pub(crate) nodes: Vec<CompiledExpr>,
    pub(crate) edges: Vec<NodeId>,
    pub(crate) root: NodeId,
    pub(crate) depth: usize,
}

impl CompiledRule {
    /// Assemble a rule from an arena whose children precede their parents.
    pub(crate) fn from_parts(nodes: Vec<CompiledExpr>, edges: Vec<NodeId>, root: NodeId) -> Self {
        let depth = measure_depth(&nodes, &edges, root);
        Self {
            nodes,
            edges,
            root,
            depth,
        }
    }

    /// Evaluate against a data context. Never fails: structural checks already
    /// happened at compile time and data mismatches degrade to `null`.
    #[must_use]
    pub fn apply(&self, data: &Value) -> Value {
        crate::evaluate::eval_compiled(self, self.root, data)
    }

    /// Number of nodes in the arena, after constant folding.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Nesting depth of the compiled tree. A lone literal has depth 1.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Decompile into a raw rule that evaluates the same way. Folded
    /// subtrees come back as their literal results.
    #[must_use]
    pub fn to_rule(&self) -> Value {
        self.rule_at(self.root)
    }

    /// Parse JSON text and compile it with the default engine.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError`](crate::TesseraError) if the text is not JSON
    /// or the rule is structurally invalid.
    pub fn from_json_str(text: &str) -> Result<Self, crate::TesseraError> {
        let rule: Value = serde_json::from_str(text)?;
        Ok(crate::compile(&rule)?)
    }

    /// Read a JSON rule file and compile it with the default engine.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError`](crate::TesseraError) on I/O, JSON, or
    /// compile failure.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::TesseraError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub(crate) fn node(&self, id: NodeId) -> &CompiledExpr {
        &self.nodes[id.index()]
    }

    fn rule_at(&self, id: NodeId) -> Value {
        match self.node(id) {
            CompiledExpr::Literal(value) => value.clone(),
            CompiledExpr::Var { path, default } => {
                let path = match path {
                    CompiledPath::Static(path) => Value::String(path.to_string()),
                    CompiledPath::Dynamic(key) => self.rule_at(*key),
                };
                let body = match default {
                    Some(default) => Value::Array(vec![path, self.rule_at(*default)]),
                    None => path,
                };
                Value::Object(BTreeMap::from([(VAR.to_owned(), body)]))
            }
            CompiledExpr::Op { op, args } => {
                let args = self.edges[args.range()]
                    .iter()
                    .map(|&child| self.rule_at(child))
                    .collect();
                Value::Object(BTreeMap::from([(op.name().to_owned(), Value::Array(args))]))
            }
        }
    }
}

/// Depth of `root`, computed bottom-up in arena order.
fn measure_depth(nodes: &[CompiledExpr], edges: &[NodeId], root: NodeId) -> usize {
    let mut depths: Vec<usize> = Vec::with_capacity(nodes.len());
    for node in nodes {
        let children: Box<dyn Iterator<Item = NodeId> + '_> = match node {
            CompiledExpr::Literal(_) => Box::new(std::iter::empty()),
            CompiledExpr::Var { path, default } => {
                let dynamic = match path {
                    CompiledPath::Dynamic(key) => Some(*key),
                    CompiledPath::Static(_) => None,
                };
                Box::new(dynamic.into_iter().chain(*default))
            }
            CompiledExpr::Op { args, .. } => Box::new(edges[args.range()].iter().copied()),
        };
        let deepest = children
            .filter_map(|child| depths.get(child.index()).copied())
            .max()
            .unwrap_or(0);
        depths.push(deepest + 1);
    }
    depths.get(root.index()).copied().unwrap_or(0)
}

impl fmt::Display for CompiledRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CompiledRule({} nodes, depth {})",
            self.nodes.len(),
            self.depth
        )
    }
}

#[cfg(feature = "binary-cache")]
impl CompiledRule {
    /// Serialize this compiled rule to a byte vector.
    ///
    /// The optional `source_text` is hashed (BLAKE3) and embedded in the
    /// payload metadata, so callers can tell when the cached blob is stale.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`](crate::serial::SerializeError) if encoding fails.
    pub fn to_bytes(
        &self,
        source_text: Option<&str>,
    ) -> Result<Vec<u8>, crate::serial::SerializeError> {
        crate::serial::encode(self, source_text)
    }

    /// Deserialize a compiled rule from bytes produced by
    /// [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`](crate::serial::DeserializeError) on
    /// format, integrity, or validation failure. A blob nested deeper than
    /// [`DEFAULT_MAX_DEPTH`](crate::DEFAULT_MAX_DEPTH) fails validation.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, crate::serial::DeserializeError> {
        crate::serial::decode(bytes)
    }

    /// Serialize this compiled rule and write it to a file.
    ///
    /// # Errors
    ///
    /// Returns [`SerializeError`](crate::serial::SerializeError) on
    /// encoding or I/O failure.
    pub fn to_binary_file(
        &self,
        path: impl AsRef<std::path::Path>,
        source_text: Option<&str>,
    ) -> Result<(), crate::serial::SerializeError> {
        let bytes = self.to_bytes(source_text)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Read a file and deserialize the compiled rule it contains.
    ///
    /// # Errors
    ///
    /// Returns [`DeserializeError`](crate::serial::DeserializeError) on
    /// I/O, format, integrity, or validation failure.
    pub fn from_binary_file(
        path: impl AsRef<std::path::Path>,
    ) -> Result<Self, crate::serial::DeserializeError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}
