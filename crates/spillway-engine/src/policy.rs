//! Ordinal placement against the live children of a category.

use spillway_kernel::{CategoryId, ChannelNameKey, Ordinal, Position, TopologyProvider, ordinal_for};
use std::sync::Arc;
use tracing::debug;

use crate::error::PlacementError;

#[derive(Clone)]
pub struct PlacementPolicy {
    topology: Arc<dyn TopologyProvider>,
    band_width: Position,
}

impl std::fmt::Debug for PlacementPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacementPolicy")
            .field("band_width", &self.band_width)
            .finish_non_exhaustive()
    }
}

impl PlacementPolicy {
    pub fn new(topology: Arc<dyn TopologyProvider>, band_width: Position) -> Self {
        Self {
            topology,
            band_width,
        }
    }

    /// Position for `name` inside `category`.
    pub async fn compute_ordinal(
        &self,
        category: CategoryId,
        name: &str,
    ) -> Result<Position, PlacementError> {
        Ok(self.explain_ordinal(category, name).await?.position)
    }

    /// Like [`compute_ordinal`](Self::compute_ordinal), also reporting
    /// which rule matched.
    pub async fn explain_ordinal(
        &self,
        category: CategoryId,
        name: &str,
    ) -> Result<Ordinal, PlacementError> {
        // Parse before touching the provider.
        let key = ChannelNameKey::parse(name)?;
        let children = self.topology.ordered_children(category).await?;
        let ordinal = ordinal_for(&children, &key, self.band_width);
        debug!(
            category = %category,
            name,
            position = ordinal.position,
            rule = ?ordinal.rule,
            "computed ordinal"
        );
        Ok(ordinal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::MemoryTopology;
    use spillway_kernel::{DEFAULT_BAND_WIDTH, OrdinalRule};

    #[tokio::test]
    async fn same_group_goes_after_sibling() {
        let topology = Arc::new(MemoryTopology::new());
        let category = topology.add_category("INCOMPLETE");
        topology.add_channel(category, "dctf-pwn-heap", 5);
        topology.add_channel(category, "other-misc-x", 1000);
        let policy = PlacementPolicy::new(topology, DEFAULT_BAND_WIDTH);

        let ordinal = policy
            .explain_ordinal(category, "dctf-web-xss")
            .await
            .expect("ordinal");
        assert_eq!(ordinal.position, 6);
        assert_eq!(ordinal.rule, OrdinalRule::SameGroup);
    }

    #[tokio::test]
    async fn empty_category_is_zero() {
        let topology = Arc::new(MemoryTopology::new());
        let category = topology.add_category("INCOMPLETE");
        let policy = PlacementPolicy::new(topology, DEFAULT_BAND_WIDTH);
        assert_eq!(
            policy
                .compute_ordinal(category, "dctf-pwn-a")
                .await
                .expect("ordinal"),
            0
        );
    }

    #[tokio::test]
    async fn invalid_name_skips_provider() {
        let topology = Arc::new(MemoryTopology::new());
        let category = topology.add_category("INCOMPLETE");
        topology.fail_on("ordered_children");
        let policy = PlacementPolicy::new(topology, DEFAULT_BAND_WIDTH);

        let err = policy
            .compute_ordinal(category, "general")
            .await
            .expect_err("must fail");
        assert!(matches!(err, PlacementError::InvalidName(_)));
    }
}
