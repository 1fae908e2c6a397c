use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Duration;

use crate::app_error::{AppError, AppResult};

/// Named mutual-exclusion scope keyed by identity id.
///
/// All balance-affecting ledger operations for one identity must be
/// linearized; different identities proceed fully in parallel. This
/// in-process table is correct for a single-instance deployment; the
/// contract callers rely on (bounded wait, distinct retryable
/// [`AppError::LockTimeout`]) holds regardless of mechanism, so a
/// database advisory lock or a distributed lock service can replace it
/// for multi-instance topologies.
#[derive(Clone, Default)]
pub struct IdentityLocks {
    inner: Arc<StdMutex<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl IdentityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for `identity_id`, waiting at most `wait`.
    pub async fn acquire(
        &self,
        identity_id: i64,
        wait: Duration,
    ) -> AppResult<OwnedMutexGuard<()>> {
        let entry = {
            let mut table = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            table
                .entry(identity_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        tokio::time::timeout(wait, entry.lock_owned())
            .await
            .map_err(|_| AppError::LockTimeout)
    }
}
