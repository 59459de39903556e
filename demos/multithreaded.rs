use std::sync::Arc;
use std::thread;

use serde_json::json;
use tessera::{compile, Context, Value};

fn main() {
    let rule = Arc::new(
        compile(&Value::from(json!({"and": [
            {">=": [{"var": "user.age"}, 18]},
            {"==": [{"var": "user.status"}, "active"]}
        ]})))
        .expect("failed to compile rule"),
    );

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let rule = Arc::clone(&rule);
            thread::spawn(move || {
                let ctx = Context::new()
                    .set("user.age", 16_i64 + i64::from(i))
                    .set("user.status", "active");

                let result = rule.apply(ctx.as_value());
                println!("Thread {i}: {result}");
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }
}
