//! Topology: the live category/channel tree owned by the chat platform.
//!
//! The kernel never caches topology. Every decision point pulls a fresh
//! read through [`TopologyProvider`], so a snapshot is only valid for the
//! call that produced it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ProviderError;

/// Platform identifier of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub u64);

/// Platform identifier of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub u64);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CategoryId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

impl std::str::FromStr for ChannelId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Platform ordering key of a channel within its parent.
pub type Position = u32;

/// One child channel of a category, as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEntry {
    pub id: ChannelId,
    pub name: String,
    pub position: Position,
}

impl ChannelEntry {
    pub fn new(id: u64, name: impl Into<String>, position: Position) -> Self {
        Self {
            id: ChannelId(id),
            name: name.into(),
            position,
        }
    }
}

/// Ordered children of one category at the moment of the read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySnapshot {
    pub children: Vec<ChannelEntry>,
}

impl CategorySnapshot {
    pub fn new(children: Vec<ChannelEntry>) -> Self {
        Self { children }
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn last(&self) -> Option<&ChannelEntry> {
        self.children.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelEntry> {
        self.children.iter()
    }
}

/// Where a newly created category should land among its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "category", rename_all = "snake_case")]
pub enum CategoryPlacement {
    /// Directly after the given category.
    After(CategoryId),
    /// After every existing category.
    End,
}

/// Who a permission overwrite applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum OverwriteTarget {
    Role(u64),
    Member(u64),
}

/// Allow/deny permission bits for one target, carried opaquely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionOverwrite {
    pub target: OverwriteTarget,
    #[serde(default)]
    pub allow: u64,
    #[serde(default)]
    pub deny: u64,
}

/// Live view of the platform's category/channel tree.
///
/// Implementations own their own timeout and retry policy; every failure
/// surfaces as a [`ProviderError`] and is propagated unchanged.
#[async_trait]
pub trait TopologyProvider: Send + Sync {
    /// Number of direct children of `category`.
    async fn child_count(&self, category: CategoryId) -> Result<usize, ProviderError>;

    /// Children of `category` in platform order.
    async fn ordered_children(
        &self,
        category: CategoryId,
    ) -> Result<CategorySnapshot, ProviderError>;

    /// Display name of `category`.
    async fn category_name(&self, category: CategoryId) -> Result<String, ProviderError>;

    /// Display name of `channel`.
    async fn channel_name(&self, channel: ChannelId) -> Result<String, ProviderError>;

    /// Parent category of `channel`, if it has one.
    async fn channel_parent(&self, channel: ChannelId)
    -> Result<Option<CategoryId>, ProviderError>;

    /// Total channels (including categories) in the server.
    async fn guild_channel_count(&self) -> Result<usize, ProviderError>;

    async fn create_category(
        &self,
        name: &str,
        placement: CategoryPlacement,
    ) -> Result<CategoryId, ProviderError>;

    async fn delete_category(&self, category: CategoryId, reason: &str)
    -> Result<(), ProviderError>;

    /// Create a text channel. `position: None` appends at the end.
    async fn create_channel_in(
        &self,
        category: CategoryId,
        name: &str,
        position: Option<Position>,
        overwrites: &[PermissionOverwrite],
    ) -> Result<ChannelId, ProviderError>;

    /// Re-parent a channel. `position: None` appends at the end.
    async fn move_channel(
        &self,
        channel: ChannelId,
        category: CategoryId,
        position: Option<Position>,
    ) -> Result<(), ProviderError>;

    async fn delete_channel(&self, channel: ChannelId, reason: &str) -> Result<(), ProviderError>;
}
