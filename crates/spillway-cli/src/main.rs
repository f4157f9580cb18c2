//! Spillway CLI: the `spillway` command.

mod cli;
mod commands;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let config = support::load_config_or_exit(&cli.config);
    support::init_tracing(&config.logging.filter);
    let ctx = support::Context::new(config, cli.ledger, cli.json);
    tracing::debug!(
        config = %cli.config.display(),
        ledger = %ctx.ledger_path.display(),
        "resolved configuration"
    );

    match cli.command {
        Commands::Parse { name } => commands::parse::run(&ctx, name),

        Commands::Sanitize { raw } => commands::sanitize::run(&ctx, raw),

        Commands::Compose {
            event,
            category,
            challenge,
        } => commands::compose::run(&ctx, event, category, challenge),

        Commands::Ordinal {
            topology,
            category,
            name,
        } => commands::ordinal::run(&ctx, topology, category, name),

        Commands::Place {
            topology,
            category,
            kind,
            name,
        } => commands::place::run(&ctx, topology, category, kind, name),

        Commands::Move {
            topology,
            channel,
            category,
            kind,
        } => commands::move_channel::run(&ctx, topology, channel, category, kind),

        Commands::Remove { topology, channel } => {
            commands::remove::run(&ctx, topology, channel)
        }

        Commands::Ledger { command } => commands::ledger::run(&ctx, command),
    }
}
