use thiserror::Error;

use crate::EvalError;

/// Unified error type covering JSON decoding, rule validation, and I/O.
///
/// Returned by convenience constructors like
/// [`CompiledRule::from_json_str()`](crate::CompiledRule::from_json_str) and
/// [`CompiledRule::from_file()`](crate::CompiledRule::from_file).
#[derive(Debug, Error)]
pub enum TesseraError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "binary-cache")]
    #[error(transparent)]
    Serialize(#[from] crate::serial::SerializeError),

    #[cfg(feature = "binary-cache")]
    #[error(transparent)]
    Deserialize(#[from] crate::serial::DeserializeError),
}
