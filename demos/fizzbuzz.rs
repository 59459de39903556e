use serde_json::json;
use tessera::{apply, Context, Value};

fn main() {
    let rule = Value::from(json!({"if": [
        {"==": [{"%": [{"var": "i"}, 15]}, 0]}, "fizzbuzz",
        {"==": [{"%": [{"var": "i"}, 3]}, 0]}, "fizz",
        {"==": [{"%": [{"var": "i"}, 5]}, 0]}, "buzz",
        {"var": "i"}
    ]}));

    for i in 1..=30_i64 {
        let ctx = Context::new().set("i", i);
        match apply(&rule, ctx.as_value()) {
            Ok(Value::String(word)) => println!("{word}"),
            Ok(other) => println!("{other}"),
            Err(err) => eprintln!("rule rejected: {err}"),
        }
    }
}
