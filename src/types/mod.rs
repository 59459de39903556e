pub(crate) mod coerce;
pub(crate) mod context;
mod engine;
mod error;
pub(crate) mod expr;
pub(crate) mod operator;
mod rule;
mod value;

pub use coerce::{compare, is_truthy, loose_equals, strict_equals, to_string_form};
pub use context::{resolve, Context, Path};
pub use engine::{Engine, DEFAULT_MAX_DEPTH};
pub use error::EvalError;
pub use operator::{Arity, Operator, Strategy, VAR};
pub use rule::CompiledRule;
pub use value::{TypeTag, Value};
pub(crate) use value::NULL;
