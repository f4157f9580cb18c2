use crate::support::{
    Context, block_on, fail, load_topology_or_exit, print_json, save_topology_or_exit,
};
use serde_json::json;
use spillway_engine::ReclaimOutcome;
use spillway_kernel::ChannelId;
use std::path::PathBuf;

pub fn run(ctx: &Context, topology_path: PathBuf, channel: ChannelId) {
    let topology = load_topology_or_exit(&topology_path);
    let placer = ctx.placer(topology.clone());

    let outcome = block_on(placer.delete_channel(channel)).unwrap_or_else(|e| fail(e));
    save_topology_or_exit(&topology, &topology_path);

    if ctx.json {
        print_json(&json!({
            "action": "remove",
            "result": outcome,
        }));
        return;
    }

    println!("spillway remove");
    println!("  Deleted: {}", outcome.channel);
    match outcome.parent {
        Some(parent) => println!("  Parent: {parent}"),
        None => println!("  Parent: (none)"),
    }
    if let Some(reclaimed) = &outcome.reclaimed {
        print_reclaim(reclaimed);
    }
}

pub fn print_reclaim(outcome: &ReclaimOutcome) {
    match outcome {
        ReclaimOutcome::Reclaimed { record } => println!(
            "  Reclaimed overflow: {} (index {} of {})",
            record.backup_category_id, record.index, record.original_category_id
        ),
        ReclaimOutcome::NotEmpty { remaining } => {
            println!("  Overflow kept: {remaining} channel(s) remain")
        }
        ReclaimOutcome::Untracked => {}
    }
}
