//! In-memory topology provider.
//!
//! Simulates the platform's category/channel tree for tests and for the
//! CLI, which keeps it in a JSON snapshot between invocations. Position
//! handling follows the platform closely enough for placement: inserting
//! at `p` shifts siblings at `>= p` down by one, and a missing position
//! appends.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use spillway_kernel::{
    CategoryId, CategoryPlacement, CategorySnapshot, ChannelEntry, ChannelId, PermissionOverwrite,
    Position, ProviderError, TopologyProvider,
};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryNode {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelNode {
    pub id: ChannelId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<CategoryId>,
    #[serde(default)]
    pub position: Position,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overwrites: Vec<PermissionOverwrite>,
}

/// Serializable state of a simulated server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    #[serde(default)]
    pub categories: Vec<CategoryNode>,
    #[serde(default)]
    pub channels: Vec<ChannelNode>,
}

/// Mutating call observed by the simulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TopologyEvent {
    CategoryCreated {
        id: CategoryId,
        name: String,
    },
    CategoryDeleted {
        id: CategoryId,
    },
    ChannelCreated {
        id: ChannelId,
        category: CategoryId,
        position: Position,
    },
    ChannelMoved {
        id: ChannelId,
        from: Option<CategoryId>,
        to: CategoryId,
        position: Position,
    },
    ChannelDeleted {
        id: ChannelId,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("{path}: {message}")]
    Io { path: String, message: String },

    #[error("{path}: invalid topology snapshot: {message}")]
    Parse { path: String, message: String },
}

#[derive(Debug, Default)]
struct SimState {
    snapshot: TopologySnapshot,
    events: Vec<TopologyEvent>,
    failing: BTreeSet<&'static str>,
}

impl SimState {
    fn next_id(&self) -> u64 {
        let categories = self.snapshot.categories.iter().map(|c| c.id.0);
        let channels = self.snapshot.channels.iter().map(|c| c.id.0);
        categories.chain(channels).max().unwrap_or(0) + 1
    }

    fn check(&self, operation: &'static str) -> Result<(), ProviderError> {
        if self.failing.contains(operation) {
            return Err(ProviderError::unavailable(operation, "injected failure"));
        }
        Ok(())
    }

    fn category(&self, id: CategoryId) -> Result<&CategoryNode, ProviderError> {
        self.snapshot
            .categories
            .iter()
            .find(|c| c.id == id)
            .ok_or(ProviderError::UnknownCategory(id))
    }

    fn channel_mut(&mut self, id: ChannelId) -> Result<&mut ChannelNode, ProviderError> {
        self.snapshot
            .channels
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(ProviderError::UnknownChannel(id))
    }

    fn children(&self, category: CategoryId) -> Vec<&ChannelNode> {
        let mut children: Vec<&ChannelNode> = self
            .snapshot
            .channels
            .iter()
            .filter(|c| c.parent == Some(category))
            .collect();
        children.sort_by_key(|c| (c.position, c.id));
        children
    }

    /// Resolve the final position of a channel entering `category` and
    /// make room for it.
    fn open_slot(
        &mut self,
        category: CategoryId,
        position: Option<Position>,
        entering: Option<ChannelId>,
    ) -> Position {
        let siblings = self
            .snapshot
            .channels
            .iter_mut()
            .filter(|c| c.parent == Some(category) && Some(c.id) != entering);
        match position {
            Some(slot) => {
                for sibling in siblings {
                    if sibling.position >= slot {
                        sibling.position += 1;
                    }
                }
                slot
            }
            None => siblings
                .map(|c| c.position + 1)
                .max()
                .unwrap_or(0),
        }
    }
}

/// [`TopologyProvider`] backed by an in-memory [`TopologySnapshot`].
#[derive(Debug, Default)]
pub struct MemoryTopology {
    state: Mutex<SimState>,
}

impl MemoryTopology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: TopologySnapshot) -> Self {
        Self {
            state: Mutex::new(SimState {
                snapshot,
                ..SimState::default()
            }),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| SnapshotError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let snapshot = serde_json::from_str(&text).map_err(|e| SnapshotError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let path = path.as_ref();
        let io_error = |e: std::io::Error| SnapshotError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        };
        let text = serde_json::to_string_pretty(&self.snapshot()).map_err(|e| {
            SnapshotError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            }
        })?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        fs::write(path, text + "\n").map_err(io_error)
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut SimState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        f(&mut state)
    }

    pub fn snapshot(&self) -> TopologySnapshot {
        self.with_state(|state| state.snapshot.clone())
    }

    /// Mutating calls seen so far, oldest first.
    pub fn events(&self) -> Vec<TopologyEvent> {
        self.with_state(|state| state.events.clone())
    }

    pub fn category_ids(&self) -> BTreeSet<CategoryId> {
        self.with_state(|state| state.snapshot.categories.iter().map(|c| c.id).collect())
    }

    pub fn has_category(&self, id: CategoryId) -> bool {
        self.with_state(|state| state.category(id).is_ok())
    }

    pub fn category_by_name(&self, name: &str) -> Option<CategoryId> {
        self.with_state(|state| {
            state
                .snapshot
                .categories
                .iter()
                .find(|c| c.name == name)
                .map(|c| c.id)
        })
    }

    /// Make every call to `operation` fail with `Unavailable`.
    pub fn fail_on(&self, operation: &'static str) {
        self.with_state(|state| {
            state.failing.insert(operation);
        });
    }

    pub fn clear_failures(&self) {
        self.with_state(|state| state.failing.clear());
    }

    /// Add a category after every existing one.
    pub fn add_category(&self, name: &str) -> CategoryId {
        self.with_state(|state| {
            let id = CategoryId(state.next_id());
            let position = state
                .snapshot
                .categories
                .iter()
                .map(|c| c.position + 1)
                .max()
                .unwrap_or(0);
            state.snapshot.categories.push(CategoryNode {
                id,
                name: name.to_string(),
                position,
            });
            id
        })
    }

    /// Add a channel at an explicit position without logging an event.
    pub fn add_channel(&self, category: CategoryId, name: &str, position: Position) -> ChannelId {
        self.with_state(|state| {
            let id = ChannelId(state.next_id());
            state.snapshot.channels.push(ChannelNode {
                id,
                name: name.to_string(),
                parent: Some(category),
                position,
                overwrites: Vec::new(),
            });
            id
        })
    }

    /// Fill `category` with `count` channels named `{prefix}-{n}`.
    pub fn fill(&self, category: CategoryId, prefix: &str, count: usize) -> Vec<ChannelId> {
        (0..count)
            .map(|n| self.add_channel(category, &format!("{prefix}-{n}"), n as Position))
            .collect()
    }
}

#[async_trait]
impl TopologyProvider for MemoryTopology {
    async fn child_count(&self, category: CategoryId) -> Result<usize, ProviderError> {
        self.with_state(|state| {
            state.check("child_count")?;
            state.category(category)?;
            Ok(state.children(category).len())
        })
    }

    async fn ordered_children(
        &self,
        category: CategoryId,
    ) -> Result<CategorySnapshot, ProviderError> {
        self.with_state(|state| {
            state.check("ordered_children")?;
            state.category(category)?;
            Ok(CategorySnapshot::new(
                state
                    .children(category)
                    .into_iter()
                    .map(|c| ChannelEntry {
                        id: c.id,
                        name: c.name.clone(),
                        position: c.position,
                    })
                    .collect(),
            ))
        })
    }

    async fn category_name(&self, category: CategoryId) -> Result<String, ProviderError> {
        self.with_state(|state| {
            state.check("category_name")?;
            Ok(state.category(category)?.name.clone())
        })
    }

    async fn channel_name(&self, channel: ChannelId) -> Result<String, ProviderError> {
        self.with_state(|state| {
            state.check("channel_name")?;
            Ok(state.channel_mut(channel)?.name.clone())
        })
    }

    async fn channel_parent(
        &self,
        channel: ChannelId,
    ) -> Result<Option<CategoryId>, ProviderError> {
        self.with_state(|state| {
            state.check("channel_parent")?;
            Ok(state.channel_mut(channel)?.parent)
        })
    }

    async fn guild_channel_count(&self) -> Result<usize, ProviderError> {
        self.with_state(|state| {
            state.check("guild_channel_count")?;
            Ok(state.snapshot.categories.len() + state.snapshot.channels.len())
        })
    }

    async fn create_category(
        &self,
        name: &str,
        placement: CategoryPlacement,
    ) -> Result<CategoryId, ProviderError> {
        self.with_state(|state| {
            state.check("create_category")?;
            let position = match placement {
                CategoryPlacement::After(anchor) => state.category(anchor)?.position + 1,
                CategoryPlacement::End => state
                    .snapshot
                    .categories
                    .iter()
                    .map(|c| c.position + 1)
                    .max()
                    .unwrap_or(0),
            };
            for category in &mut state.snapshot.categories {
                if category.position >= position {
                    category.position += 1;
                }
            }
            let id = CategoryId(state.next_id());
            state.snapshot.categories.push(CategoryNode {
                id,
                name: name.to_string(),
                position,
            });
            debug!(category = %id, name, position, "simulated category create");
            state.events.push(TopologyEvent::CategoryCreated {
                id,
                name: name.to_string(),
            });
            Ok(id)
        })
    }

    async fn delete_category(
        &self,
        category: CategoryId,
        reason: &str,
    ) -> Result<(), ProviderError> {
        self.with_state(|state| {
            state.check("delete_category")?;
            state.category(category)?;
            state.snapshot.categories.retain(|c| c.id != category);
            for channel in &mut state.snapshot.channels {
                if channel.parent == Some(category) {
                    channel.parent = None;
                }
            }
            debug!(category = %category, reason, "simulated category delete");
            state
                .events
                .push(TopologyEvent::CategoryDeleted { id: category });
            Ok(())
        })
    }

    async fn create_channel_in(
        &self,
        category: CategoryId,
        name: &str,
        position: Option<Position>,
        overwrites: &[PermissionOverwrite],
    ) -> Result<ChannelId, ProviderError> {
        self.with_state(|state| {
            state.check("create_channel_in")?;
            state.category(category)?;
            let id = ChannelId(state.next_id());
            let position = state.open_slot(category, position, None);
            state.snapshot.channels.push(ChannelNode {
                id,
                name: name.to_string(),
                parent: Some(category),
                position,
                overwrites: overwrites.to_vec(),
            });
            state.events.push(TopologyEvent::ChannelCreated {
                id,
                category,
                position,
            });
            Ok(id)
        })
    }

    async fn move_channel(
        &self,
        channel: ChannelId,
        category: CategoryId,
        position: Option<Position>,
    ) -> Result<(), ProviderError> {
        self.with_state(|state| {
            state.check("move_channel")?;
            state.category(category)?;
            let from = state.channel_mut(channel)?.parent;
            let position = state.open_slot(category, position, Some(channel));
            let node = state.channel_mut(channel)?;
            node.parent = Some(category);
            node.position = position;
            state.events.push(TopologyEvent::ChannelMoved {
                id: channel,
                from,
                to: category,
                position,
            });
            Ok(())
        })
    }

    async fn delete_channel(&self, channel: ChannelId, reason: &str) -> Result<(), ProviderError> {
        self.with_state(|state| {
            state.check("delete_channel")?;
            state.channel_mut(channel)?;
            state.snapshot.channels.retain(|c| c.id != channel);
            debug!(channel = %channel, reason, "simulated channel delete");
            state.events.push(TopologyEvent::ChannelDeleted { id: channel });
            Ok(())
        })
    }
}
