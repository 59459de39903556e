use std::collections::BTreeMap;
use std::convert::Infallible;

use crate::types::coerce::is_truthy;
use crate::types::context::{resolve, resolve_key};
use crate::types::expr::{CompiledExpr, CompiledPath, Expr, NodeId, VarPath};
use crate::types::operator::{Behavior, Control};
use crate::{CompiledRule, EvalError, Value};

/// Evaluate a raw rule in one pass, classifying each node as it is reached.
/// Arguments a lazy operator never reaches are never classified.
pub(crate) fn eval_rule(
    rule: &Value,
    data: &Value,
    depth: usize,
    limit: usize,
) -> Result<Value, EvalError> {
    if depth > limit {
        return Err(EvalError::TooDeep { limit });
    }
    let eval_child = |child: &Value, data: &Value| eval_rule(child, data, depth + 1, limit);

    match Expr::classify(rule)? {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Var { path, default } => {
            let resolved = match path {
                VarPath::Key(key) => resolve(data, &key),
                VarPath::Rule(key_rule) => resolve_key(data, &eval_child(key_rule, data)?),
            };
            match resolved {
                Some(value) if !value.is_null() => Ok(value.clone()),
                _ => default.map_or(Ok(Value::Null), |default| eval_child(default, data)),
            }
        }
        Expr::Op { op, args } => match op.behavior() {
            Behavior::Combine { .. } => {
                let values = args
                    .iter()
                    .map(|arg| eval_child(arg, data))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(op.combine(&values, data))
            }
            Behavior::Lazy(control) => short_circuit(control, args.len(), data, |index, data| {
                args.get(index)
                    .map_or(Ok(Value::Null), |arg| eval_child(arg, data))
            }),
        },
    }
}

/// Evaluate one node of a compiled arena. Infallible: every node was
/// validated when the arena was built.
pub(crate) fn eval_compiled(rule: &CompiledRule, id: NodeId, data: &Value) -> Value {
    match rule.node(id) {
        CompiledExpr::Literal(value) => value.clone(),
        CompiledExpr::Var { path, default } => {
            let resolved = match path {
                CompiledPath::Static(path) => path.resolve(data),
                CompiledPath::Dynamic(key) => resolve_key(data, &eval_compiled(rule, *key, data)),
            };
            match resolved {
                Some(value) if !value.is_null() => value.clone(),
                _ => default.map_or(Value::Null, |default| eval_compiled(rule, default, data)),
            }
        }
        CompiledExpr::Op { op, args } => {
            let children = &rule.edges[args.range()];
            match op.behavior() {
                Behavior::Combine { .. } => {
                    let values: Vec<Value> = children
                        .iter()
                        .map(|&child| eval_compiled(rule, child, data))
                        .collect();
                    op.combine(&values, data)
                }
                Behavior::Lazy(control) => {
                    let result = short_circuit::<Infallible>(
                        control,
                        children.len(),
                        data,
                        |index, data| {
                            Ok(children
                                .get(index)
                                .map_or(Value::Null, |&child| eval_compiled(rule, child, data)))
                        },
                    );
                    result.unwrap_or_else(|never| match never {})
                }
            }
        }
    }
}

/// Drive a lazy operator. `eval(i, data)` evaluates argument `i` against
/// `data` and yields `null` past the end of the argument list; it is only
/// called for arguments the operator actually reaches.
pub(crate) fn short_circuit<E>(
    control: Control,
    argc: usize,
    data: &Value,
    mut eval: impl FnMut(usize, &Value) -> Result<Value, E>,
) -> Result<Value, E> {
    match control {
        Control::And | Control::Or => {
            let stop_when = matches!(control, Control::Or);
            let mut last = Value::Null;
            for index in 0..argc {
                last = eval(index, data)?;
                if is_truthy(&last) == stop_when {
                    break;
                }
            }
            Ok(last)
        }
        Control::If => {
            let mut index = 0;
            while index + 1 < argc {
                if is_truthy(&eval(index, data)?) {
                    return eval(index + 1, data);
                }
                index += 2;
            }
            if index < argc {
                eval(index, data)
            } else {
                Ok(Value::Null)
            }
        }
        Control::Map => {
            let items = elements(eval(0, data)?);
            let mapped = items
                .iter()
                .map(|item| eval(1, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::Array(mapped))
        }
        Control::Filter => {
            let mut kept = Vec::new();
            for item in elements(eval(0, data)?) {
                if is_truthy(&eval(1, &item)?) {
                    kept.push(item);
                }
            }
            Ok(Value::Array(kept))
        }
        Control::Reduce => {
            let items = elements(eval(0, data)?);
            let mut accumulator = eval(2, data)?;
            for current in items {
                let scope = Value::Object(BTreeMap::from([
                    ("current".to_owned(), current),
                    ("accumulator".to_owned(), accumulator),
                ]));
                accumulator = eval(1, &scope)?;
            }
            Ok(accumulator)
        }
        Control::All => {
            let items = elements(eval(0, data)?);
            if items.is_empty() {
                return Ok(Value::Bool(false));
            }
            for item in &items {
                if !is_truthy(&eval(1, item)?) {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        Control::Any | Control::NotAny => {
            let mut found = false;
            for item in &elements(eval(0, data)?) {
                if is_truthy(&eval(1, item)?) {
                    found = true;
                    break;
                }
            }
            Ok(Value::Bool(found == matches!(control, Control::Any)))
        }
    }
}

/// The elements an iterating operator walks. Anything but an array has none.
fn elements(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    }
}
