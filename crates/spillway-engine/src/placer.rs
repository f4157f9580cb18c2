//! Channel create/move/delete flows tying resolver, policy and reclaimer
//! together.

use serde::{Deserialize, Serialize};
use spillway_kernel::{
    CapacityLimits, CategoryId, ChannelId, ChannelNameKey, Ordinal, PermissionOverwrite, Position,
    TopologyProvider,
};
use spillway_ledger::{OverflowLedger, OverflowRecord};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::SpillwayConfig;
use crate::error::PlacementError;
use crate::locks::CategoryLocks;
use crate::policy::PlacementPolicy;
use crate::reclaimer::{OverflowReclaimer, ReclaimOutcome};
use crate::resolver::{CapacityResolver, TargetReservation};

pub const DELETE_REASON: &str = "Channel removed";

/// How a channel is positioned inside its category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// `event-category-challenge`, positioned next to its siblings.
    #[default]
    Challenge,
    /// An event's own channel, appended at the end.
    Event,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRequest {
    pub name: String,
    pub kind: ChannelKind,
    pub category: CategoryId,
    #[serde(default)]
    pub overwrites: Vec<PermissionOverwrite>,
}

impl ChannelRequest {
    pub fn challenge(name: impl Into<String>, category: CategoryId) -> Self {
        Self {
            name: name.into(),
            kind: ChannelKind::Challenge,
            category,
            overwrites: Vec::new(),
        }
    }

    pub fn event(name: impl Into<String>, category: CategoryId) -> Self {
        Self {
            name: name.into(),
            kind: ChannelKind::Event,
            category,
            overwrites: Vec::new(),
        }
    }

    pub fn with_overwrites(mut self, overwrites: Vec<PermissionOverwrite>) -> Self {
        self.overwrites = overwrites;
        self
    }
}

/// Where a channel ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedChannel {
    pub channel: ChannelId,
    pub requested: CategoryId,
    pub category: CategoryId,
    /// Computed ordinal; `None` for appended channels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordinal: Option<Ordinal>,
    /// Overflow category allocated for this placement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allocated: Option<OverflowRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MoveOutcome {
    /// The channel already sat in the goal category.
    Unchanged {
        channel: ChannelId,
        category: CategoryId,
    },
    Moved {
        placed: PlacedChannel,
        source: Option<CategoryId>,
        reclaimed: Option<ReclaimOutcome>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub channel: ChannelId,
    pub parent: Option<CategoryId>,
    pub reclaimed: Option<ReclaimOutcome>,
}

#[derive(Clone)]
pub struct ChannelPlacer {
    topology: Arc<dyn TopologyProvider>,
    limits: CapacityLimits,
    resolver: CapacityResolver,
    policy: PlacementPolicy,
    reclaimer: OverflowReclaimer,
}

impl std::fmt::Debug for ChannelPlacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelPlacer")
            .field("limits", &self.limits)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ChannelPlacer {
    pub fn new(
        topology: Arc<dyn TopologyProvider>,
        ledger: OverflowLedger,
        limits: CapacityLimits,
        band_width: Position,
    ) -> Self {
        let locks = CategoryLocks::new();
        Self {
            resolver: CapacityResolver::new(
                topology.clone(),
                ledger.clone(),
                limits,
                locks.clone(),
            ),
            policy: PlacementPolicy::new(topology.clone(), band_width),
            reclaimer: OverflowReclaimer::new(topology.clone(), ledger, locks),
            topology,
            limits,
        }
    }

    pub fn from_config(
        topology: Arc<dyn TopologyProvider>,
        ledger: OverflowLedger,
        config: &SpillwayConfig,
    ) -> Result<Self, PlacementError> {
        config.validate()?;
        Ok(Self::new(
            topology,
            ledger,
            config.capacity,
            config.placement.band_width,
        ))
    }

    pub fn resolver(&self) -> &CapacityResolver {
        &self.resolver
    }

    pub fn policy(&self) -> &PlacementPolicy {
        &self.policy
    }

    pub fn reclaimer(&self) -> &OverflowReclaimer {
        &self.reclaimer
    }

    pub async fn create_channel(
        &self,
        request: &ChannelRequest,
    ) -> Result<PlacedChannel, PlacementError> {
        if request.kind == ChannelKind::Challenge {
            ChannelNameKey::parse(&request.name)?;
        }

        let count = self.topology.guild_channel_count().await?;
        if !self.limits.guild_has_room(count) {
            return Err(PlacementError::GuildFull {
                count,
                ceiling: self.limits.guild_ceiling(),
            });
        }

        let reservation = self.resolver.reserve(request.category).await?;
        let ordinal = self
            .ordinal_in(&reservation, request.kind, &request.name)
            .await?;
        let channel = self
            .topology
            .create_channel_in(
                reservation.target,
                &request.name,
                ordinal.map(|o| o.position),
                &request.overwrites,
            )
            .await?;

        info!(
            channel = %channel,
            name = %request.name,
            requested = %request.category,
            category = %reservation.target,
            "created channel"
        );
        Ok(placed(channel, reservation, ordinal))
    }

    pub async fn move_channel(
        &self,
        channel: ChannelId,
        goal: CategoryId,
        kind: ChannelKind,
    ) -> Result<MoveOutcome, PlacementError> {
        let source = self.topology.channel_parent(channel).await?;
        if source == Some(goal) {
            debug!(channel = %channel, category = %goal, "channel already in goal category");
            return Ok(MoveOutcome::Unchanged {
                channel,
                category: goal,
            });
        }

        let (placed, target) = {
            let reservation = self.resolver.reserve(goal).await?;
            // A full goal may resolve to the overflow the channel sits in.
            if Some(reservation.target) == source {
                debug!(channel = %channel, category = %reservation.target, "channel already in resolved category");
                return Ok(MoveOutcome::Unchanged {
                    channel,
                    category: reservation.target,
                });
            }
            let ordinal = match kind {
                ChannelKind::Challenge => {
                    let name = self.topology.channel_name(channel).await?;
                    self.ordinal_in(&reservation, kind, &name).await?
                }
                ChannelKind::Event => None,
            };
            self.topology
                .move_channel(channel, reservation.target, ordinal.map(|o| o.position))
                .await?;
            let target = reservation.target;
            (placed(channel, reservation, ordinal), target)
        };

        info!(channel = %channel, from = ?source, to = %target, "moved channel");
        let reclaimed = match source {
            Some(source) => Some(self.reclaimer.on_channel_removed(source).await?),
            None => None,
        };
        Ok(MoveOutcome::Moved {
            placed,
            source,
            reclaimed,
        })
    }

    pub async fn delete_channel(&self, channel: ChannelId) -> Result<DeleteOutcome, PlacementError> {
        let parent = self.topology.channel_parent(channel).await?;
        self.topology.delete_channel(channel, DELETE_REASON).await?;
        info!(channel = %channel, parent = ?parent, "deleted channel");

        let reclaimed = match parent {
            Some(parent) => Some(self.reclaimer.on_channel_removed(parent).await?),
            None => None,
        };
        Ok(DeleteOutcome {
            channel,
            parent,
            reclaimed,
        })
    }

    async fn ordinal_in(
        &self,
        reservation: &TargetReservation,
        kind: ChannelKind,
        name: &str,
    ) -> Result<Option<Ordinal>, PlacementError> {
        match kind {
            ChannelKind::Challenge => Ok(Some(
                self.policy.explain_ordinal(reservation.target, name).await?,
            )),
            ChannelKind::Event => Ok(None),
        }
    }
}

fn placed(
    channel: ChannelId,
    reservation: TargetReservation,
    ordinal: Option<Ordinal>,
) -> PlacedChannel {
    PlacedChannel {
        channel,
        requested: reservation.requested,
        category: reservation.target,
        ordinal,
        allocated: reservation.allocated,
    }
}
