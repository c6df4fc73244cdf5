use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Async mutexes keyed by record id
///
/// Holding the guard serializes every read-pull-write cycle against the same
/// record while leaving other records free to proceed.
#[derive(Debug, Clone, Default)]
pub struct RecordLocks {
    inner: Arc<parking_lot::Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl RecordLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock();
            // only the map holds these, nobody is waiting
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(key.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = RecordLocks::new();
        let guard = locks.lock("a").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock("a").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        // other keys are not blocked
        let _other = locks.lock("b").await;

        drop(guard);
        contender.await.unwrap();
    }
}
