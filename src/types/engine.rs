use super::error::EvalError;
use super::rule::CompiledRule;
use super::value::Value;

/// Nesting limit used by [`Engine::default`].
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Evaluation settings shared by direct application and compilation.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use tessera::{Engine, EvalError, Value};
///
/// let engine = Engine::new().max_depth(3);
/// let shallow = Value::from(json!({"!": [{"!": [true]}]}));
/// let deep = Value::from(json!({"!": [{"!": [{"!": [true]}]}]}));
///
/// assert_eq!(engine.apply(&shallow, &Value::Null), Ok(Value::Bool(true)));
/// assert_eq!(engine.compile(&deep), Err(EvalError::TooDeep { limit: 3 }));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Engine {
    max_depth: usize,
    fold_constants: bool,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            fold_constants: true,
        }
    }
}

impl Engine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maximum rule nesting depth. The root node is at depth 1; a rule nested
    /// deeper than this fails with [`EvalError::TooDeep`].
    #[must_use]
    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Whether compilation evaluates pure operators over literal arguments
    /// ahead of time. On by default.
    #[must_use]
    pub fn fold_constants(mut self, fold_constants: bool) -> Self {
        self.fold_constants = fold_constants;
        self
    }

    /// Evaluate `rule` against `data` in a single pass.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError`] if a node the evaluation reaches is structurally
    /// invalid or nested too deeply.
    pub fn apply(&self, rule: &Value, data: &Value) -> Result<Value, EvalError> {
        crate::evaluate::eval_rule(rule, data, 1, self.max_depth).inspect_err(|error| {
            tracing::debug!(%error, "rejected rule");
        })
    }

    /// Validate `rule` once and compile it into a reusable [`CompiledRule`].
    ///
    /// # Errors
    ///
    /// Returns [`EvalError`] if any node is structurally invalid or nested too
    /// deeply, whether or not evaluation would reach it.
    pub fn compile(&self, rule: &Value) -> Result<CompiledRule, EvalError> {
        crate::compile::compile(rule, self.max_depth, self.fold_constants)
    }
}
