use crate::support::{Context, print_json};
use serde_json::json;
use spillway_kernel::compose_challenge_name;

pub fn run(ctx: &Context, event: String, category: Option<String>, challenge: String) {
    let name = compose_challenge_name(&event, category.as_deref(), &challenge);
    if ctx.json {
        print_json(&json!({
            "action": "compose",
            "event": event,
            "category": category,
            "challenge": challenge,
            "name": name,
        }));
    } else {
        println!("{name}");
    }
}
