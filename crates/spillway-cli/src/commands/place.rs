use crate::cli::KindArg;
use crate::support::{
    Context, block_on, fail, load_topology_or_exit, print_json, save_topology_or_exit,
};
use serde_json::json;
use spillway_engine::{ChannelRequest, PlacedChannel};
use spillway_kernel::CategoryId;
use std::path::PathBuf;

pub fn run(ctx: &Context, topology_path: PathBuf, category: CategoryId, kind: KindArg, name: String) {
    let topology = load_topology_or_exit(&topology_path);
    let placer = ctx.placer(topology.clone());
    let request = ChannelRequest {
        name,
        kind: kind.into(),
        category,
        overwrites: Vec::new(),
    };

    let placed = block_on(placer.create_channel(&request)).unwrap_or_else(|e| fail(e));
    save_topology_or_exit(&topology, &topology_path);

    if ctx.json {
        print_json(&json!({
            "action": "place",
            "name": request.name,
            "kind": request.kind,
            "placement": placed,
        }));
    } else {
        println!("spillway place");
        println!("  Channel: {} ({})", placed.channel, request.name);
        print_placement(&placed);
    }
}

pub fn print_placement(placed: &PlacedChannel) {
    if placed.category == placed.requested {
        println!("  Category: {}", placed.category);
    } else {
        println!(
            "  Category: {} (requested {})",
            placed.category, placed.requested
        );
    }
    match placed.ordinal {
        Some(ordinal) => println!("  Position: {} ({:?})", ordinal.position, ordinal.rule),
        None => println!("  Position: appended"),
    }
    if let Some(record) = &placed.allocated {
        println!(
            "  Allocated overflow: {} (index {})",
            record.backup_category_id, record.index
        );
    }
}
