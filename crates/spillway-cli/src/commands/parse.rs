use crate::support::{Context, fail, print_json};
use serde_json::json;
use spillway_kernel::{ChannelNameKey, delimiter_count};

pub fn run(ctx: &Context, name: String) {
    let key = ChannelNameKey::parse(&name).unwrap_or_else(|e| fail(e));

    if ctx.json {
        print_json(&json!({
            "action": "parse",
            "name": name,
            "delimiters": delimiter_count(&name),
            "group": key.group,
            "subgroup": key.subgroup,
            "leaf": key.leaf,
        }));
    } else {
        println!("spillway parse");
        println!("  Name: {name}");
        println!("  Group: {}", key.group);
        println!(
            "  Subgroup: {}",
            key.subgroup.as_deref().unwrap_or("(none)")
        );
        println!("  Leaf: {}", key.leaf);
    }
}
