//! # spillway-engine
//!
//! Runs channel placement against a live topology:
//!
//! - [`CapacityResolver`] picks a category with room, allocating an
//!   overflow category when the requested one and its overflows are full
//! - [`PlacementPolicy`] computes the position of a challenge channel
//! - [`OverflowReclaimer`] deletes overflow categories once they empty
//! - [`ChannelPlacer`] ties the three into create/move/delete flows
//!
//! Every decision reads the topology afresh; nothing is cached. Requests
//! for the same original category are serialized through
//! [`CategoryLocks`] within one process only.
//!
//! [`MemoryTopology`] is an in-memory [`TopologyProvider`] used by tests
//! and the CLI.
//!
//! [`TopologyProvider`]: spillway_kernel::TopologyProvider

pub mod config;
pub mod error;
pub mod locks;
pub mod placer;
pub mod policy;
pub mod reclaimer;
pub mod resolver;
pub mod sim;

pub use config::{
    ConfigError, DEFAULT_LEDGER_PATH, DEFAULT_LOG_FILTER, LedgerConfig, LoggingConfig,
    PlacementConfig, SpillwayConfig,
};
pub use error::PlacementError;
pub use locks::{CategoryGuard, CategoryLocks};
pub use placer::{
    ChannelKind, ChannelPlacer, ChannelRequest, DELETE_REASON, DeleteOutcome, MoveOutcome,
    PlacedChannel,
};
pub use policy::PlacementPolicy;
pub use reclaimer::{OverflowReclaimer, RECLAIM_REASON, ReclaimOutcome};
pub use resolver::{CapacityResolver, TargetReservation};
pub use sim::{
    CategoryNode, ChannelNode, MemoryTopology, SnapshotError, TopologyEvent, TopologySnapshot,
};
