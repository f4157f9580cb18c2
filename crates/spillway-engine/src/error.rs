//! Placement error taxonomy.

use spillway_kernel::{NameError, ProviderError};
use spillway_ledger::LedgerError;

use crate::config::ConfigError;

/// Failure of a resolve/place/reclaim call.
///
/// Provider and persistence failures are surfaced uninterpreted. There is
/// no capacity-exhausted case: a full category always overflows into a
/// new backup category instead of failing.
#[derive(Debug, thiserror::Error)]
pub enum PlacementError {
    /// The channel name lacks the structural `-` delimiter.
    #[error(transparent)]
    InvalidName(#[from] NameError),

    /// The topology provider call failed.
    #[error(transparent)]
    ProviderUnavailable(#[from] ProviderError),

    /// The overflow record store failed.
    #[error(transparent)]
    Persistence(#[from] LedgerError),

    /// The server is at its channel ceiling.
    #[error("server holds {count} channels, creation ceiling is {ceiling}")]
    GuildFull { count: usize, ceiling: usize },

    /// The engine configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PlacementError {
    /// Whether retrying the same request can succeed without caller changes.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable(ProviderError::Unavailable { .. })
                | Self::Persistence(LedgerError::Store(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spillway_kernel::CategoryId;
    use spillway_ledger::LedgerStoreError;

    #[test]
    fn invalid_name_is_not_transient() {
        let err = PlacementError::from(NameError::MissingDelimiter {
            name: "general".into(),
        });
        assert!(!err.is_transient());
        assert!(err.to_string().contains("general"));
    }

    #[test]
    fn provider_outage_is_transient() {
        let err = PlacementError::from(ProviderError::unavailable("child_count", "502"));
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "child_count failed: 502");
    }

    #[test]
    fn store_outage_is_transient() {
        let err = PlacementError::from(LedgerError::from(LedgerStoreError::Unavailable(
            "blocking pool shut down".into(),
        )));
        assert!(err.is_transient());
    }

    #[test]
    fn ledger_invariant_violations_are_not_transient() {
        let duplicate = PlacementError::from(LedgerError::BackupAlreadyTracked {
            backup: CategoryId(9),
            original: CategoryId(1),
        });
        assert!(!duplicate.is_transient());

        let stale = PlacementError::from(LedgerError::IndexNotIncreasing {
            original: CategoryId(1),
            index: 2,
            current: 3,
        });
        assert!(!stale.is_transient());
    }
}
