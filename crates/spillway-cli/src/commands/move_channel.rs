use crate::cli::KindArg;
use crate::commands::place::print_placement;
use crate::commands::remove::print_reclaim;
use crate::support::{
    Context, block_on, fail, load_topology_or_exit, print_json, save_topology_or_exit,
};
use serde_json::json;
use spillway_engine::MoveOutcome;
use spillway_kernel::{CategoryId, ChannelId};
use std::path::PathBuf;

pub fn run(
    ctx: &Context,
    topology_path: PathBuf,
    channel: ChannelId,
    category: CategoryId,
    kind: KindArg,
) {
    let topology = load_topology_or_exit(&topology_path);
    let placer = ctx.placer(topology.clone());

    let outcome =
        block_on(placer.move_channel(channel, category, kind.into())).unwrap_or_else(|e| fail(e));
    if matches!(outcome, MoveOutcome::Moved { .. }) {
        save_topology_or_exit(&topology, &topology_path);
    }

    if ctx.json {
        print_json(&json!({
            "action": "move",
            "result": outcome,
        }));
        return;
    }

    println!("spillway move");
    match &outcome {
        MoveOutcome::Unchanged { channel, category } => {
            println!("  Channel {channel} already in category {category}");
        }
        MoveOutcome::Moved {
            placed,
            source,
            reclaimed,
        } => {
            println!("  Channel: {}", placed.channel);
            if let Some(source) = source {
                println!("  From: {source}");
            }
            print_placement(placed);
            if let Some(reclaimed) = reclaimed {
                print_reclaim(reclaimed);
            }
        }
    }
}
