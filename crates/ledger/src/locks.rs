use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// In-process single-writer lock per safe.
///
/// Held around read-replay-write so two writers never derive a snapshot from
/// the same stale history.
#[derive(Debug, Default)]
pub(crate) struct SafeLocks {
    held: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl SafeLocks {
    pub(crate) async fn acquire(
        &self,
        safe_id: Uuid,
        timeout: Duration,
    ) -> ResultEngine<OwnedMutexGuard<()>> {
        let lock = {
            let mut held = self.held.lock().await;
            // Entries referenced only by the map are idle; clones happen under this lock.
            held.retain(|id, lock| *id == safe_id || Arc::strong_count(lock) > 1);
            Arc::clone(
                held.entry(safe_id)
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };
        tokio::time::timeout(timeout, lock.lock_owned())
            .await
            .map_err(|_| {
                EngineError::ConcurrencyConflict(format!("safe {safe_id} is busy, retry later"))
            })
    }
}
