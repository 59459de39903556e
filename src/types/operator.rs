use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use super::Value;
use crate::operators;

/// The reserved key for variable references. Not a registry entry: `var`
/// reads the ambient data context instead of evaluated arguments.
pub const VAR: &str = "var";

/// Combines already-evaluated arguments. The second parameter is the data
/// context, which only context-aware operators (`missing`) read.
pub(crate) type CombineFn = fn(&[Value], &Value) -> Value;

/// How many arguments an operator consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly `n` arguments: surplus arguments are evaluated but ignored,
    /// missing ones read as `null`.
    Fixed(usize),
    /// Any number of arguments.
    Variadic,
}

/// Whether an operator evaluates all of its arguments up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Evaluate every argument, then combine.
    Eager,
    /// Evaluate arguments one at a time, possibly stopping early or
    /// re-evaluating a sub-rule against other data.
    Lazy,
}

/// Control operators whose argument evaluation the evaluator drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Control {
    And,
    Or,
    If,
    Map,
    Filter,
    Reduce,
    All,
    Any,
    NotAny,
}

#[derive(Clone, Copy)]
pub(crate) enum Behavior {
    /// `foldable` marks pure operators that ignore the data context, so a call
    /// with literal arguments can be evaluated at compile time.
    Combine { f: CombineFn, foldable: bool },
    Lazy(Control),
}

/// A registered operator: its name, arity class, and evaluation behavior.
pub struct Operator {
    name: &'static str,
    arity: Arity,
    behavior: Behavior,
}

const fn pure(name: &'static str, arity: Arity, f: CombineFn) -> Operator {
    Operator {
        name,
        arity,
        behavior: Behavior::Combine { f, foldable: true },
    }
}

const fn contextual(name: &'static str, arity: Arity, f: CombineFn) -> Operator {
    Operator {
        name,
        arity,
        behavior: Behavior::Combine { f, foldable: false },
    }
}

const fn lazy(name: &'static str, control: Control) -> Operator {
    Operator {
        name,
        arity: Arity::Variadic,
        behavior: Behavior::Lazy(control),
    }
}

static OPERATORS: [Operator; 34] = [
    pure("==", Arity::Fixed(2), operators::equals),
    pure("!=", Arity::Fixed(2), operators::not_equals),
    pure("===", Arity::Fixed(2), operators::strict_equals),
    pure("!==", Arity::Fixed(2), operators::strict_not_equals),
    pure("!", Arity::Fixed(1), operators::not),
    pure("!!", Arity::Fixed(1), operators::truthy),
    pure("<", Arity::Fixed(3), operators::less_than),
    pure("<=", Arity::Fixed(3), operators::less_equal),
    pure(">", Arity::Fixed(2), operators::greater_than),
    pure(">=", Arity::Fixed(2), operators::greater_equal),
    pure("+", Arity::Variadic, operators::add),
    pure("-", Arity::Fixed(2), operators::subtract),
    pure("*", Arity::Variadic, operators::multiply),
    pure("/", Arity::Fixed(2), operators::divide),
    pure("%", Arity::Fixed(2), operators::remainder),
    pure("min", Arity::Variadic, operators::min),
    pure("max", Arity::Variadic, operators::max),
    pure("cat", Arity::Variadic, operators::cat),
    pure("substr", Arity::Fixed(3), operators::substr),
    pure("in", Arity::Fixed(2), operators::contains),
    pure("merge", Arity::Variadic, operators::merge),
    contextual("missing", Arity::Variadic, operators::missing),
    contextual("missing_some", Arity::Fixed(2), operators::missing_some),
    contextual("log", Arity::Fixed(1), operators::log),
    lazy("and", Control::And),
    lazy("or", Control::Or),
    lazy("if", Control::If),
    lazy("?:", Control::If),
    lazy("map", Control::Map),
    lazy("filter", Control::Filter),
    lazy("reduce", Control::Reduce),
    lazy("all", Control::All),
    lazy("some", Control::Any),
    lazy("none", Control::NotAny),
];

static REGISTRY: LazyLock<HashMap<&'static str, &'static Operator>> = LazyLock::new(|| {
    OPERATORS.iter().map(|op| (op.name, op)).collect()
});

impl Operator {
    /// Look up a registered operator by name.
    #[must_use]
    pub fn lookup(name: &str) -> Option<&'static Operator> {
        REGISTRY.get(name).copied()
    }

    /// Every registered operator, in no particular order.
    pub fn all() -> impl Iterator<Item = &'static Operator> {
        REGISTRY.values().copied()
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn arity(&self) -> Arity {
        self.arity
    }

    #[must_use]
    pub fn strategy(&self) -> Strategy {
        match self.behavior {
            Behavior::Combine { .. } => Strategy::Eager,
            Behavior::Lazy(_) => Strategy::Lazy,
        }
    }

    pub(crate) fn behavior(&self) -> Behavior {
        self.behavior
    }

    /// Whether a call with all-literal arguments may be evaluated ahead of time.
    pub(crate) fn is_foldable(&self) -> bool {
        matches!(self.behavior, Behavior::Combine { foldable: true, .. })
    }

    /// Apply an eager operator to evaluated arguments, trimmed to its arity.
    pub(crate) fn combine(&self, args: &[Value], data: &Value) -> Value {
        let Behavior::Combine { f, .. } = self.behavior else {
            return Value::Null;
        };
        match self.arity {
            Arity::Fixed(n) => f(&args[..args.len().min(n)], data),
            Arity::Variadic => f(args, data),
        }
    }
}

impl PartialEq for Operator {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Operator {}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("strategy", &self.strategy())
            .finish()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
