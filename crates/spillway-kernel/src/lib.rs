//! # Spillway Kernel
//!
//! Deterministic pieces of channel placement: how a channel name is
//! structured, where a new channel lands inside a category, and what a
//! platform must be able to answer about its live category tree.
//!
//! This crate is **I/O-free**. The platform sits behind
//! [`TopologyProvider`]; persistence and orchestration live in
//! `spillway-ledger` and `spillway-engine`.
//!
//! ## Architecture
//!
//! ```text
//! ChannelNameKey        ← group[-subgroup]-leaf, `-` delimited
//!     │
//! CategorySnapshot      ← ordered children {id, name, position}, never cached
//!     │
//! ordinal_for           ← same subgroup → same group → new band → 0
//!     │
//! CapacityLimits        ← per-category capacity, server ceiling
//!     │
//! TopologyProvider      ← the live platform, behind an async trait
//! ```

pub mod error;
pub mod limits;
pub mod name;
pub mod placement;
pub mod topology;

pub use error::{NameError, ProviderError};
pub use limits::{CATEGORY_CAPACITY, CapacityLimits, GUILD_CHANNEL_LIMIT, GUILD_HEADROOM};
pub use name::{
    ChannelNameKey, DELIMITER, MAX_CHANNEL_NAME_LEN, compose_challenge_name, delimiter_count,
    parse_name, sanitize_channel_name,
};
pub use placement::{DEFAULT_BAND_WIDTH, Ordinal, OrdinalRule, compute_ordinal, ordinal_for};
pub use topology::{
    CategoryId, CategoryPlacement, CategorySnapshot, ChannelEntry, ChannelId,
    OverwriteTarget, PermissionOverwrite, Position, TopologyProvider,
};
