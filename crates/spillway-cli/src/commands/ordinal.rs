use crate::support::{Context, block_on, fail, load_topology_or_exit, print_json};
use serde_json::json;
use spillway_engine::PlacementPolicy;
use spillway_kernel::CategoryId;
use std::path::PathBuf;

pub fn run(ctx: &Context, topology_path: PathBuf, category: CategoryId, name: String) {
    let topology = load_topology_or_exit(&topology_path);
    let policy = PlacementPolicy::new(topology, ctx.config.placement.band_width);
    let ordinal = block_on(policy.explain_ordinal(category, &name)).unwrap_or_else(|e| fail(e));

    if ctx.json {
        print_json(&json!({
            "action": "ordinal",
            "category": category,
            "name": name,
            "position": ordinal.position,
            "rule": ordinal.rule,
        }));
    } else {
        println!("spillway ordinal");
        println!("  Category: {category}");
        println!("  Name: {name}");
        println!("  Position: {} ({:?})", ordinal.position, ordinal.rule);
    }
}
