use clap::{Parser, Subcommand, ValueEnum};
use spillway_engine::ChannelKind;
use spillway_kernel::{CategoryId, ChannelId};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "spillway",
    about = "Spillway: capacity-aware channel placement with overflow categories",
    version
)]
pub struct Cli {
    /// Path to the TOML configuration (missing file means defaults)
    #[arg(long, global = true, default_value = "spillway.toml")]
    pub config: PathBuf,

    /// Overflow ledger JSONL (overrides `ledger.path` from the config)
    #[arg(long, global = true)]
    pub ledger: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Split a channel name into group, optional subgroup and leaf
    Parse {
        /// Channel name, e.g. `dctf-pwn-heap-1`
        name: String,
    },

    /// Normalize raw text into a channel-name component
    Sanitize {
        /// Raw text, e.g. a challenge title
        raw: String,
    },

    /// Build an `event-category-challenge` channel name
    Compose {
        /// Event (CTF) name
        event: String,

        /// Challenge category, e.g. `pwn`
        #[arg(long)]
        category: Option<String>,

        /// Challenge name
        challenge: String,
    },

    /// Compute where a challenge channel would go in a category
    Ordinal {
        /// Topology snapshot JSON
        #[arg(long)]
        topology: PathBuf,

        /// Category ID
        #[arg(long)]
        category: CategoryId,

        /// Channel name
        name: String,
    },

    /// Create a channel, overflowing into a backup category when full
    Place {
        /// Topology snapshot JSON (rewritten in place)
        #[arg(long)]
        topology: PathBuf,

        /// Requested category ID
        #[arg(long)]
        category: CategoryId,

        /// Channel kind
        #[arg(long, value_enum, default_value = "challenge")]
        kind: KindArg,

        /// Channel name
        name: String,
    },

    /// Move a channel into a category and reclaim its old overflow
    Move {
        /// Topology snapshot JSON (rewritten in place)
        #[arg(long)]
        topology: PathBuf,

        /// Channel ID
        #[arg(long)]
        channel: ChannelId,

        /// Goal category ID
        #[arg(long)]
        category: CategoryId,

        /// Channel kind
        #[arg(long, value_enum, default_value = "challenge")]
        kind: KindArg,
    },

    /// Delete a channel and reclaim its overflow category if emptied
    Remove {
        /// Topology snapshot JSON (rewritten in place)
        #[arg(long)]
        topology: PathBuf,

        /// Channel ID
        #[arg(long)]
        channel: ChannelId,
    },

    /// Inspect and repair the overflow ledger
    Ledger {
        #[command(subcommand)]
        command: LedgerCommands,
    },
}

#[derive(Subcommand)]
pub enum LedgerCommands {
    /// List overflow records by original category and index
    List,

    /// Drop records whose backup category is missing from the topology
    Reconcile {
        /// Topology snapshot JSON
        #[arg(long)]
        topology: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum KindArg {
    Challenge,
    Event,
}

impl From<KindArg> for ChannelKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Challenge => ChannelKind::Challenge,
            KindArg::Event => ChannelKind::Event,
        }
    }
}
