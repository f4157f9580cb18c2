use crate::support::{Context, print_json};
use serde_json::json;
use spillway_kernel::sanitize_channel_name;

pub fn run(ctx: &Context, raw: String) {
    let sanitized = sanitize_channel_name(&raw);
    if ctx.json {
        print_json(&json!({
            "action": "sanitize",
            "raw": raw,
            "sanitized": sanitized,
        }));
    } else {
        println!("{sanitized}");
    }
}
