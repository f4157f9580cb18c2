//! Per-category advisory locks.
//!
//! Resolve-then-create spans several suspension points. Holding the lock
//! of the requested category across them keeps two requests in this
//! process from both allocating an overflow for the same original.
//! Nothing here coordinates across processes.

use spillway_kernel::CategoryId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

#[derive(Debug, Clone, Default)]
pub struct CategoryLocks {
    inner: Arc<Mutex<HashMap<CategoryId, Arc<AsyncMutex<()>>>>>,
}

/// Exclusive hold on one category until dropped.
#[derive(Debug)]
pub struct CategoryGuard {
    category: CategoryId,
    _guard: OwnedMutexGuard<()>,
}

impl CategoryGuard {
    pub fn category(&self) -> CategoryId {
        self.category
    }
}

impl CategoryLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for and take the lock of `category`.
    pub async fn acquire(&self, category: CategoryId) -> CategoryGuard {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            // Entries nobody holds or waits on can go.
            map.retain(|id, lock| *id == category || Arc::strong_count(lock) > 1);
            map.entry(category).or_default().clone()
        };
        trace!(category = %category, "waiting for category lock");
        CategoryGuard {
            category,
            _guard: lock.lock_owned().await,
        }
    }

    /// Number of categories with a live lock entry.
    pub fn tracked(&self) -> usize {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_category_is_exclusive() {
        let locks = CategoryLocks::new();
        let held = locks.acquire(CategoryId(1)).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move { locks.acquire(CategoryId(1)).await.category() })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(held);
        let category = contender.await.expect("contender should finish");
        assert_eq!(category, CategoryId(1));
    }

    #[tokio::test]
    async fn different_categories_do_not_block() {
        let locks = CategoryLocks::new();
        let _a = locks.acquire(CategoryId(1)).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(CategoryId(2)))
            .await
            .expect("other category must not wait");
        assert_eq!(b.category(), CategoryId(2));
    }

    #[tokio::test]
    async fn released_entries_are_pruned() {
        let locks = CategoryLocks::new();
        drop(locks.acquire(CategoryId(1)).await);
        drop(locks.acquire(CategoryId(2)).await);
        let _c = locks.acquire(CategoryId(3)).await;
        assert_eq!(locks.tracked(), 1);
    }
}
