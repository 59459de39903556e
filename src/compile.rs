use crate::types::context::{key_path, Path};
use crate::types::expr::{CompiledExpr, CompiledPath, Expr, NodeId, Span, VarPath};
use crate::{CompiledRule, EvalError, Value};

/// Builds the node arena for one rule. Children are pushed before their
/// parent, so a parent's children always have lower ids.
struct Compiler {
    nodes: Vec<CompiledExpr>,
    edges: Vec<NodeId>,
    limit: usize,
    fold_constants: bool,
    folded: usize,
}

pub(crate) fn compile(
    rule: &Value,
    limit: usize,
    fold_constants: bool,
) -> Result<CompiledRule, EvalError> {
    let mut compiler = Compiler {
        nodes: Vec::new(),
        edges: Vec::new(),
        limit,
        fold_constants,
        folded: 0,
    };
    match compiler.node(rule, 1) {
        Ok(root) => {
            let folded = compiler.folded;
            let compiled = CompiledRule::from_parts(compiler.nodes, compiler.edges, root);
            tracing::debug!(
                nodes = compiled.node_count(),
                depth = compiled.depth(),
                folded,
                "compiled rule"
            );
            Ok(compiled)
        }
        Err(error) => {
            tracing::debug!(%error, "rejected rule");
            Err(error)
        }
    }
}

fn to_id(len: usize) -> Result<u32, EvalError> {
    u32::try_from(len).map_err(|_| EvalError::malformed("rule exceeds the node limit"))
}

impl Compiler {
    fn push(&mut self, node: CompiledExpr) -> Result<NodeId, EvalError> {
        let id = NodeId(to_id(self.nodes.len())?);
        self.nodes.push(node);
        Ok(id)
    }

    /// Compile `rule` and every argument beneath it, including arguments a
    /// lazy operator might never reach.
    fn node(&mut self, rule: &Value, depth: usize) -> Result<NodeId, EvalError> {
        if depth > self.limit {
            return Err(EvalError::TooDeep { limit: self.limit });
        }
        match Expr::classify(rule)? {
            Expr::Literal(value) => self.push(CompiledExpr::Literal(value.clone())),
            Expr::Var { path, default } => {
                let path = match path {
                    VarPath::Key(key) => Some(CompiledPath::Static(Path::parse(&key))),
                    VarPath::Rule(key_rule) => self.dynamic_path(key_rule, depth + 1)?,
                };
                let default = default
                    .map(|default| self.node(default, depth + 1))
                    .transpose()?;
                match (path, default) {
                    (Some(path), default) => self.push(CompiledExpr::Var { path, default }),
                    // the key names no path, so lookup always falls through
                    (None, Some(default)) => Ok(default),
                    (None, None) => self.push(CompiledExpr::Literal(Value::Null)),
                }
            }
            Expr::Op { op, args } => {
                let mark = (self.nodes.len(), self.edges.len());
                let children = args
                    .iter()
                    .map(|arg| self.node(arg, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;

                if self.fold_constants && op.is_foldable() {
                    if let Some(values) = self.literals(&children) {
                        let folded = op.combine(&values, &Value::Null);
                        self.nodes.truncate(mark.0);
                        self.edges.truncate(mark.1);
                        self.folded += 1;
                        return self.push(CompiledExpr::Literal(folded));
                    }
                }

                let span = Span {
                    start: to_id(self.edges.len())?,
                    len: to_id(children.len())?,
                };
                self.edges.extend(children);
                self.push(CompiledExpr::Op { op, args: span })
            }
        }
    }

    /// Compile a computed `var` key. A key that folds to a literal becomes a
    /// static path, or `None` if the literal names no path at all.
    fn dynamic_path(
        &mut self,
        key_rule: &Value,
        depth: usize,
    ) -> Result<Option<CompiledPath>, EvalError> {
        let id = self.node(key_rule, depth)?;
        if !self.fold_constants {
            return Ok(Some(CompiledPath::Dynamic(id)));
        }
        let CompiledExpr::Literal(key) = &self.nodes[id.index()] else {
            return Ok(Some(CompiledPath::Dynamic(id)));
        };
        let path = key_path(key).map(|key| CompiledPath::Static(Path::parse(&key)));
        // a literal is always the most recently pushed node
        self.nodes.truncate(id.index());
        self.folded += 1;
        Ok(path)
    }

    /// The literal values of `children`, if every one of them is a literal.
    fn literals(&self, children: &[NodeId]) -> Option<Vec<Value>> {
        children
            .iter()
            .map(|id| match &self.nodes[id.index()] {
                CompiledExpr::Literal(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }
}
