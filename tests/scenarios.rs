use serde_json::json;
use tessera::{apply, compile, CompiledRule, Context, EvalError, TesseraError, Value};

fn v(json: serde_json::Value) -> Value {
    Value::from(json)
}

fn fizzbuzz_rule() -> Value {
    v(json!({"if": [
        {"==": [{"%": [{"var": "i"}, 15]}, 0]}, "fizzbuzz",
        {"==": [{"%": [{"var": "i"}, 3]}, 0]}, "fizz",
        {"==": [{"%": [{"var": "i"}, 5]}, 0]}, "buzz",
        {"var": "i"}
    ]}))
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// FizzBuzz, direct and compiled
// ---------------------------------------------------------------------------

const FIZZBUZZ: &str = "1,2,fizz,4,buzz,fizz,7,8,fizz,buzz,11,fizz,13,14,fizzbuzz";

#[test]
fn fizzbuzz_direct() {
    let rule = fizzbuzz_rule();
    let out: Vec<String> = (1..=15_i64)
        .map(|i| render(&apply(&rule, &Context::new().set("i", i).into_value()).unwrap()))
        .collect();
    assert_eq!(out.join(","), FIZZBUZZ);
}

#[test]
fn fizzbuzz_compiled() {
    let rule = compile(&fizzbuzz_rule()).unwrap();
    let out: Vec<String> = (1..=15_i64)
        .map(|i| render(&rule.apply(&Context::new().set("i", i).into_value())))
        .collect();
    assert_eq!(out.join(","), FIZZBUZZ);
}

#[test]
fn fizzbuzz_with_map() {
    let rule = v(json!({"map": [{"var": "numbers"}, {"if": [
        {"==": [{"%": [{"var": ""}, 15]}, 0]}, "fizzbuzz",
        {"==": [{"%": [{"var": ""}, 3]}, 0]}, "fizz",
        {"==": [{"%": [{"var": ""}, 5]}, 0]}, "buzz",
        {"var": ""}
    ]}]}));
    let numbers: Vec<i64> = (1..=15).collect();
    let data = Context::new().set("numbers", numbers).into_value();

    let Value::Array(out) = apply(&rule, &data).unwrap() else {
        panic!("map should return an array");
    };
    let out: Vec<String> = out.iter().map(render).collect();
    assert_eq!(out.join(","), FIZZBUZZ);
}

// ---------------------------------------------------------------------------
// Equality
// ---------------------------------------------------------------------------

#[test]
fn loose_and_strict_equality() {
    assert_eq!(apply(&v(json!({"==": [0, "0"]})), &Value::Null), Ok(Value::Bool(true)));
    assert_eq!(apply(&v(json!({"===": [0, "0"]})), &Value::Null), Ok(Value::Bool(false)));
    assert_eq!(apply(&v(json!({"===": [1, 1.0]})), &Value::Null), Ok(Value::Bool(true)));
    assert_eq!(apply(&v(json!({"==": [null, 0]})), &Value::Null), Ok(Value::Bool(false)));
    assert_eq!(apply(&v(json!({"==": [true, 1]})), &Value::Null), Ok(Value::Bool(true)));
    assert_eq!(apply(&v(json!({"==": [[1, 2], "1,2"]})), &Value::Null), Ok(Value::Bool(true)));
    assert_eq!(apply(&v(json!({"!=": ["a", "b"]})), &Value::Null), Ok(Value::Bool(true)));
    assert_eq!(apply(&v(json!({"!==": [1, "1"]})), &Value::Null), Ok(Value::Bool(true)));
}

// ---------------------------------------------------------------------------
// Variables and defaults
// ---------------------------------------------------------------------------

#[test]
fn variable_lookup_with_defaults() {
    let data = Context::new()
        .set("user.name", "ada")
        .set("user.langs", vec!["en", "fr"])
        .into_value();

    let cases = [
        (json!({"var": "user.name"}), json!("ada")),
        (json!({"var": "user.langs.1"}), json!("fr")),
        (json!({"var": ["user.email", "none"]}), json!("none")),
        (json!({"var": "user.email"}), json!(null)),
        (json!({"var": ["user.email", {"cat": [{"var": "user.name"}, "@example.com"]}]}), json!("ada@example.com")),
    ];
    for (rule, expected) in cases {
        let rule = v(rule);
        assert_eq!(apply(&rule, &data).unwrap(), v(expected.clone()), "rule {rule}");
        assert_eq!(compile(&rule).unwrap().apply(&data), v(expected));
    }
}

#[test]
fn computed_variable_paths() {
    let rule = v(json!({"var": {"cat": ["prices.", {"var": "tier"}]}}));
    let data = v(json!({"tier": "gold", "prices": {"gold": 30, "basic": 10}}));
    assert_eq!(apply(&rule, &data), Ok(Value::Int(30)));
    assert_eq!(compile(&rule).unwrap().apply(&data), Value::Int(30));
}

#[test]
fn missing_reports_absent_fields() {
    let rule = v(json!({"if": [
        {"missing": ["name", "email"]},
        {"cat": ["incomplete: ", {"missing": ["name", "email"]}]},
        "ok"
    ]}));
    let complete = Context::new().set("name", "ada").set("email", "a@b.c");
    let partial = Context::new().set("name", "ada");

    assert_eq!(apply(&rule, complete.as_value()), Ok(Value::from("ok")));
    assert_eq!(
        apply(&rule, partial.as_value()),
        Ok(Value::from("incomplete: email"))
    );
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[test]
fn unknown_operator_fails_both_paths() {
    let rule = v(json!({"frobnicate": [1, 2]}));
    let expected = EvalError::UnknownOperator {
        operator: "frobnicate".to_owned(),
    };
    assert_eq!(apply(&rule, &Value::Null), Err(expected.clone()));
    assert_eq!(compile(&rule), Err(expected));
}

#[test]
fn untaken_branch_is_never_checked_directly() {
    let rule = v(json!({"if": [true, "fine", {"frobnicate": []}]}));
    assert_eq!(apply(&rule, &Value::Null), Ok(Value::from("fine")));
    assert!(compile(&rule).is_err());
}

// ---------------------------------------------------------------------------
// Loading rules
// ---------------------------------------------------------------------------

#[test]
fn from_json_str_round_trip() {
    let rule = CompiledRule::from_json_str(r#"{"max": [{"var": "a"}, {"var": "b"}, 3]}"#).unwrap();
    assert_eq!(rule.apply(&v(json!({"a": 7, "b": 2}))), Value::Int(7));

    let err = CompiledRule::from_json_str("{not json").unwrap_err();
    assert!(matches!(err, TesseraError::Json(_)), "got {err}");
}

#[test]
fn from_file_loads_and_compiles() {
    let dir = std::env::temp_dir().join("tessera_test_scenarios");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("discount.json");
    std::fs::write(
        &path,
        r#"{"if": [{">=": [{"var": "cart.total"}, 100]}, {"*": [{"var": "cart.total"}, 0.5]}, 0]}"#,
    )
    .unwrap();

    let rule = CompiledRule::from_file(&path).unwrap();
    assert_eq!(rule.apply(&v(json!({"cart": {"total": 250}}))), Value::Float(125.0));
    assert_eq!(rule.apply(&v(json!({"cart": {"total": 40}}))), Value::Int(0));

    let _ = std::fs::remove_dir_all(&dir);

    let err = CompiledRule::from_file(dir.join("gone.json")).unwrap_err();
    assert!(matches!(err, TesseraError::Io(_)), "got {err}");
}

#[test]
fn rules_deserialize_through_serde() {
    let rule: Value = serde_json::from_str(r#"{"in": ["ell", {"var": "word"}]}"#).unwrap();
    let data: Value = serde_json::from_str(r#"{"word": "hello"}"#).unwrap();
    assert_eq!(apply(&rule, &data), Ok(Value::Bool(true)));
}

// ---------------------------------------------------------------------------
// Compiled rule introspection
// ---------------------------------------------------------------------------

#[test]
fn compiled_rule_decompiles_and_displays() {
    let rule = compile(&v(json!({"and": [{"<": [0, {"var": "x"}, 10]}, {"*": [2, 3]}]}))).unwrap();
    assert_eq!(
        rule.to_rule(),
        v(json!({"and": [{"<": [0, {"var": "x"}, 10]}, 6]}))
    );
    assert_eq!(rule.to_string(), "CompiledRule(6 nodes, depth 3)");
}

#[test]
fn log_passes_its_argument_through() {
    let rule = v(json!({"+": [{"log": [{"var": "n"}]}, 1]}));
    let data = v(json!({"n": 41}));
    assert_eq!(apply(&rule, &data), Ok(Value::Int(42)));
    assert_eq!(compile(&rule).unwrap().apply(&data), Value::Int(42));
}
