//! Platform capacity limits.

use serde::{Deserialize, Serialize};

/// Direct children a category may hold.
pub const CATEGORY_CAPACITY: usize = 50;

/// Channels (categories included) a server may hold.
pub const GUILD_CHANNEL_LIMIT: usize = 500;

/// Slots kept free below [`GUILD_CHANNEL_LIMIT`] when creating channels.
pub const GUILD_HEADROOM: usize = 3;

/// Capacity limits in effect for one placement engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapacityLimits {
    pub category_limit: usize,
    pub guild_limit: usize,
    pub guild_headroom: usize,
}

impl Default for CapacityLimits {
    fn default() -> Self {
        Self {
            category_limit: CATEGORY_CAPACITY,
            guild_limit: GUILD_CHANNEL_LIMIT,
            guild_headroom: GUILD_HEADROOM,
        }
    }
}

impl CapacityLimits {
    /// Whether a category holding `children` can take one more.
    pub fn has_room(&self, children: usize) -> bool {
        children < self.category_limit
    }

    /// Highest server-wide count at which a creation is still allowed.
    pub fn guild_ceiling(&self) -> usize {
        self.guild_limit.saturating_sub(self.guild_headroom)
    }

    /// Whether the server can take one more channel.
    pub fn guild_has_room(&self, channels: usize) -> bool {
        channels < self.guild_ceiling()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_below_capacity_has_room() {
        let limits = CapacityLimits::default();
        assert!(limits.has_room(49));
        assert!(!limits.has_room(50));
        assert!(!limits.has_room(51));
    }

    #[test]
    fn guild_ceiling_keeps_headroom() {
        let limits = CapacityLimits::default();
        assert_eq!(limits.guild_ceiling(), 497);
        assert!(limits.guild_has_room(496));
        assert!(!limits.guild_has_room(497));
    }
}
