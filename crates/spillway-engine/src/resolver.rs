//! Capacity resolution: pick a category with room, allocating an
//! overflow ("backup") category when the original and every existing
//! overflow are full.

use spillway_kernel::{CapacityLimits, CategoryId, CategoryPlacement, TopologyProvider};
use spillway_ledger::{OverflowLedger, OverflowRecord};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::PlacementError;
use crate::locks::{CategoryGuard, CategoryLocks};

/// A resolved target, with the requested category's lock still held.
///
/// Drop it once the channel has been created or moved into `target`.
#[derive(Debug)]
pub struct TargetReservation {
    pub requested: CategoryId,
    pub target: CategoryId,
    /// The overflow record created by this resolution, if any.
    pub allocated: Option<OverflowRecord>,
    _guard: CategoryGuard,
}

impl TargetReservation {
    pub fn is_overflow(&self) -> bool {
        self.target != self.requested
    }
}

#[derive(Clone)]
pub struct CapacityResolver {
    topology: Arc<dyn TopologyProvider>,
    ledger: OverflowLedger,
    limits: CapacityLimits,
    locks: CategoryLocks,
}

impl std::fmt::Debug for CapacityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapacityResolver")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl CapacityResolver {
    pub fn new(
        topology: Arc<dyn TopologyProvider>,
        ledger: OverflowLedger,
        limits: CapacityLimits,
        locks: CategoryLocks,
    ) -> Self {
        Self {
            topology,
            ledger,
            limits,
            locks,
        }
    }

    pub fn limits(&self) -> CapacityLimits {
        self.limits
    }

    /// Category a new child of `requested` should go into.
    pub async fn resolve_target(&self, requested: CategoryId) -> Result<CategoryId, PlacementError> {
        Ok(self.reserve(requested).await?.target)
    }

    /// Resolve a target and keep `requested` locked until the reservation
    /// is dropped.
    ///
    /// Order: `requested` if it has room, else the lowest-index existing
    /// overflow with room, else a freshly allocated overflow.
    pub async fn reserve(&self, requested: CategoryId) -> Result<TargetReservation, PlacementError> {
        let guard = self.locks.acquire(requested).await;

        let count = self.topology.child_count(requested).await?;
        if self.limits.has_room(count) {
            debug!(category = %requested, count, "requested category has room");
            return Ok(TargetReservation {
                requested,
                target: requested,
                allocated: None,
                _guard: guard,
            });
        }

        for overflow in self.ledger.overflows_of(requested).await? {
            let backup = overflow.backup_category_id;
            let count = self.topology.child_count(backup).await?;
            if self.limits.has_room(count) {
                debug!(
                    category = %requested,
                    backup = %backup,
                    index = overflow.index,
                    count,
                    "reusing overflow category"
                );
                return Ok(TargetReservation {
                    requested,
                    target: backup,
                    allocated: None,
                    _guard: guard,
                });
            }
        }

        let record = self.allocate(requested).await?;
        Ok(TargetReservation {
            requested,
            target: record.backup_category_id,
            allocated: Some(record),
            _guard: guard,
        })
    }

    async fn allocate(&self, original: CategoryId) -> Result<OverflowRecord, PlacementError> {
        let index = self.ledger.next_index(original).await?;
        let base = self.topology.category_name(original).await?;
        let name = format!("{base} {index}");

        let backup = self
            .topology
            .create_category(&name, CategoryPlacement::After(original))
            .await?;

        match self.ledger.record(original, backup, index).await {
            Ok(record) => {
                info!(
                    original = %original,
                    backup = %backup,
                    index,
                    name = %name,
                    "allocated overflow category"
                );
                Ok(record)
            }
            Err(e) => {
                warn!(
                    original = %original,
                    backup = %backup,
                    index,
                    error = %e,
                    "overflow category created but not recorded; ledger and topology diverge"
                );
                Err(e.into())
            }
        }
    }
}
