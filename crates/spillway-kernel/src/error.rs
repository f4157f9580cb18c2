//! Error types for kernel operations and the topology provider boundary.

use crate::topology::{CategoryId, ChannelId};

/// A channel name that does not carry the `group-...-leaf` structure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    /// The name has no `-` delimiter at all.
    #[error("invalid channel name '{name}': expected at least one '-' delimiter")]
    MissingDelimiter { name: String },
}

/// Failure reported by a [`TopologyProvider`](crate::TopologyProvider).
///
/// The kernel never interprets these; callers propagate them as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// The platform call failed (network, rate limit, permissions).
    #[error("{operation} failed: {message}")]
    Unavailable {
        operation: &'static str,
        message: String,
    },

    /// The category is not present in the live topology.
    #[error("unknown category: {0}")]
    UnknownCategory(CategoryId),

    /// The channel is not present in the live topology.
    #[error("unknown channel: {0}")]
    UnknownChannel(ChannelId),
}

impl ProviderError {
    pub fn unavailable(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Unavailable {
            operation,
            message: message.into(),
        }
    }
}
