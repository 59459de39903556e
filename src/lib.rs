//! A rule evaluation engine for JSON-shaped rules.
//!
//! A rule is a [`Value`]: a literal, a `{"var": path}` lookup, or a
//! single-key object naming an operator and its arguments. Rules run against
//! a separate data context, either directly with [`apply`] or through a
//! reusable [`CompiledRule`] produced by [`compile`].
//!
//! ```
//! use serde_json::json;
//! use tessera::{apply, compile, Value};
//!
//! let rule = Value::from(json!({"if": [{">=": [{"var": "age"}, 18]}, "adult", "minor"]}));
//! let data = Value::from(json!({"age": 21}));
//!
//! assert_eq!(apply(&rule, &data).unwrap(), Value::from("adult"));
//! assert_eq!(compile(&rule).unwrap().apply(&data), Value::from("adult"));
//! ```

mod compile;
mod error;
mod evaluate;
mod operators;
#[cfg(feature = "binary-cache")]
pub mod serial;
mod types;

pub use error::TesseraError;
#[cfg(feature = "binary-cache")]
pub use serial::{DeserializeError, SerializeError};
pub use types::{
    compare, is_truthy, loose_equals, resolve, strict_equals, to_string_form, Arity,
    CompiledRule, Context, Engine, EvalError, Operator, Path, Strategy, TypeTag, Value,
    DEFAULT_MAX_DEPTH, VAR,
};

/// Evaluate `rule` against `data` with the default [`Engine`].
///
/// # Errors
///
/// Returns [`EvalError`] if a node the evaluation reaches is not a valid rule.
/// Data mismatches never fail; they evaluate to `null`.
pub fn apply(rule: &Value, data: &Value) -> Result<Value, EvalError> {
    Engine::default().apply(rule, data)
}

/// Validate and compile `rule` with the default [`Engine`].
///
/// # Errors
///
/// Returns [`EvalError`] if any node of the rule is not a valid rule.
pub fn compile(rule: &Value) -> Result<CompiledRule, EvalError> {
    Engine::default().compile(rule)
}
