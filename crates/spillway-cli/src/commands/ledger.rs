use crate::cli::LedgerCommands;
use crate::support::{Context, block_on, fail, load_topology_or_exit, print_json};
use serde_json::json;
use spillway_ledger::OverflowRecord;
use std::path::PathBuf;

pub fn run(ctx: &Context, command: LedgerCommands) {
    match command {
        LedgerCommands::List => run_list(ctx),
        LedgerCommands::Reconcile { topology } => run_reconcile(ctx, topology),
    }
}

fn run_list(ctx: &Context) {
    let records = block_on(ctx.ledger().all()).unwrap_or_else(|e| fail(e));

    if ctx.json {
        print_json(&json!({
            "action": "ledger.list",
            "ledgerPath": ctx.ledger_path.display().to_string(),
            "count": records.len(),
            "records": records,
        }));
    } else {
        println!("spillway ledger list");
        println!("  Path: {}", ctx.ledger_path.display());
        println!("  Records: {}", records.len());
        print_records(&records);
    }
}

fn run_reconcile(ctx: &Context, topology_path: PathBuf) {
    let topology = load_topology_or_exit(&topology_path);
    let live = topology.category_ids();
    let removed = block_on(ctx.ledger().reconcile(&live)).unwrap_or_else(|e| fail(e));

    if ctx.json {
        print_json(&json!({
            "action": "ledger.reconcile",
            "ledgerPath": ctx.ledger_path.display().to_string(),
            "removedCount": removed.len(),
            "removed": removed,
        }));
    } else {
        println!("spillway ledger reconcile");
        println!("  Path: {}", ctx.ledger_path.display());
        println!("  Removed: {}", removed.len());
        print_records(&removed);
    }
}

fn print_records(records: &[OverflowRecord]) {
    for record in records {
        println!(
            "    {} -> {} (index {})",
            record.original_category_id, record.backup_category_id, record.index
        );
    }
}
