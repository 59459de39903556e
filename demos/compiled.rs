use serde_json::json;
use tessera::{Engine, Value};

fn main() {
    let rule = Value::from(json!({"if": [
        {"<": [{"var": "temp"}, {"-": [32, 22]}]}, "freezing",
        {"<=": [10, {"var": "temp"}, {"+": [20, 5]}]}, "mild",
        "hot"
    ]}));

    let compiled = Engine::new()
        .max_depth(32)
        .compile(&rule)
        .expect("failed to compile rule");

    println!("{compiled}");
    println!("folded form: {}", compiled.to_rule());

    for temp in [-5_i64, 10, 18, 25, 31] {
        let data = Value::from(json!({ "temp": temp }));
        println!("{temp:>3} -> {}", compiled.apply(&data));
    }
}
