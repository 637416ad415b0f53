//! Per-(campaign, recipient) send locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;

use crate::audience::RecipientId;
use crate::campaign::CampaignId;

type PairKey = (CampaignId, RecipientId);

/// Lazily created async lock per (campaign, recipient) pair.
///
/// Holding the guard while checking the log, sending and appending makes
/// that sequence exclusive for the pair within this process.
#[derive(Debug, Default)]
pub struct PairLocks {
    locks: Mutex<HashMap<PairKey, Arc<tokio::sync::Mutex<()>>>>,
}

impl PairLocks {
    /// Creates an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to a pair.
    pub async fn acquire(
        &self,
        campaign_id: CampaignId,
        recipient_id: RecipientId,
    ) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Drop entries nobody holds or waits on
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry((campaign_id, recipient_id))
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of pairs currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no pair is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_pair_is_exclusive() {
        let locks = Arc::new(PairLocks::new());
        let guard = locks.acquire(CampaignId(1), RecipientId(1)).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(CampaignId(1), RecipientId(1)).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should get the lock")
            .expect("waiter task failed");
    }

    #[tokio::test]
    async fn test_different_pairs_do_not_block() {
        let locks = PairLocks::new();
        let _a = locks.acquire(CampaignId(1), RecipientId(1)).await;
        let _b = locks.acquire(CampaignId(1), RecipientId(2)).await;
        let _c = locks.acquire(CampaignId(2), RecipientId(1)).await;
        assert_eq!(locks.len(), 3);
    }

    #[tokio::test]
    async fn test_released_pairs_are_pruned() {
        let locks = PairLocks::new();
        drop(locks.acquire(CampaignId(1), RecipientId(1)).await);
        drop(locks.acquire(CampaignId(1), RecipientId(2)).await);
        let _held = locks.acquire(CampaignId(3), RecipientId(3)).await;
        assert_eq!(locks.len(), 1);
    }
}
