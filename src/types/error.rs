use thiserror::Error;

/// Structural rule errors, raised by [`apply`](crate::apply) and
/// [`compile`](crate::compile).
///
/// Data mismatches (missing variables, non-numeric operands) are never errors;
/// they degrade to `null`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("unknown operator '{operator}'")]
    UnknownOperator { operator: String },

    #[error("malformed rule: {reason}")]
    MalformedRule { reason: String },

    #[error("rule nesting exceeds the maximum depth of {limit}")]
    TooDeep { limit: usize },
}

impl EvalError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        EvalError::MalformedRule {
            reason: reason.into(),
        }
    }
}
