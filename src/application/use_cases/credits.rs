use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Duration;
use tracing::instrument;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::credit::{GLOBAL_MODULE, normalize_module},
    infra::locks::IdentityLocks,
};

#[async_trait]
pub trait CreditRepo: Send + Sync {
    /// Appends one grant row plus its audit-log row atomically — either
    /// both land or neither does.
    async fn append_grant(
        &self,
        identity_id: i64,
        module: &str,
        amount: i64,
        source: Option<&str>,
        reference: Option<&str>,
    ) -> AppResult<()>;

    /// Appends one usage row plus its audit-log row atomically.
    async fn append_usage(
        &self,
        identity_id: i64,
        module: &str,
        amount: i64,
        reference: Option<&str>,
    ) -> AppResult<()>;

    /// Raw `Σadded − Σused` for one (identity, module) pair.
    async fn module_balance(&self, identity_id: i64, module: &str) -> AppResult<i64>;

    /// Per-module balances for one identity.
    async fn balances(&self, identity_id: i64) -> AppResult<BTreeMap<String, i64>>;
}

/// Balance probe for a single module, including the global fallback.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ModuleBalance {
    pub module: String,
    pub specific: i64,
    pub global: i64,
    pub available: i64,
}

/// Outcome of a successful deduction.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Deduction {
    pub module_requested: String,
    pub module_used: String,
    pub amount: i64,
    pub credits_remaining: i64,
}

pub struct CreditUseCases {
    repo: Arc<dyn CreditRepo>,
    locks: IdentityLocks,
    lock_wait: Duration,
}

impl CreditUseCases {
    pub fn new(repo: Arc<dyn CreditRepo>, locks: IdentityLocks, lock_wait: Duration) -> Self {
        Self {
            repo,
            locks,
            lock_wait,
        }
    }

    /// Records a credit grant. A zero amount is accepted as a no-op so
    /// that collaborators can retry idempotently; negative amounts are
    /// rejected. Grants take the same per-identity lock as deductions
    /// so every balance-affecting operation for one identity is
    /// linearized.
    #[instrument(skip(self))]
    pub async fn grant(
        &self,
        identity_id: i64,
        module: &str,
        amount: i64,
        source: Option<&str>,
        reference: Option<&str>,
    ) -> AppResult<()> {
        if amount < 0 {
            return Err(AppError::InvalidInput("Grant amount must be >= 0".into()));
        }
        if amount == 0 {
            return Ok(());
        }
        let module = normalize_module(module).unwrap_or_else(|| GLOBAL_MODULE.to_string());

        let _guard = self.locks.acquire(identity_id, self.lock_wait).await?;
        self.repo
            .append_grant(identity_id, &module, amount, source, reference)
            .await?;
        tracing::info!(
            identity_id,
            module = %module,
            amount,
            source = ?source,
            "credits granted"
        );
        Ok(())
    }

    pub async fn module_balance(&self, identity_id: i64, module: &str) -> AppResult<ModuleBalance> {
        let module = normalize_module(module)
            .ok_or_else(|| AppError::InvalidInput("Module is required".into()))?;
        let (specific, global) = self.read_buckets(identity_id, &module).await?;
        Ok(ModuleBalance {
            available: available(&module, specific, global),
            module,
            specific,
            global,
        })
    }

    pub async fn balances(&self, identity_id: i64) -> AppResult<BTreeMap<String, i64>> {
        self.repo.balances(identity_id).await
    }

    /// Atomic "use or fail" deduction across the specific-module and
    /// global buckets. The whole read-check-append sequence runs under
    /// the per-identity lock; two concurrent calls can never both spend
    /// the same credits.
    #[instrument(skip(self))]
    pub async fn use_credits(
        &self,
        identity_id: i64,
        module: &str,
        amount: i64,
        reference: Option<&str>,
    ) -> AppResult<Deduction> {
        let module = normalize_module(module)
            .ok_or_else(|| AppError::InvalidInput("Module is required".into()))?;
        if amount < 1 {
            return Err(AppError::InvalidInput("Amount must be >= 1".into()));
        }

        let _guard = self.locks.acquire(identity_id, self.lock_wait).await?;

        let (specific, global) = self.read_buckets(identity_id, &module).await?;
        let available = available(&module, specific, global);
        if available < amount {
            tracing::info!(
                identity_id,
                module = %module,
                available,
                needed = amount,
                "insufficient credits"
            );
            return Err(AppError::InsufficientCredits { available });
        }

        // All-or-nothing bucket choice, preferring the specific module.
        // Splitting one deduction across both buckets is deliberately
        // unsupported.
        let bucket = if specific >= amount {
            module.as_str()
        } else {
            GLOBAL_MODULE
        };

        // A failed append propagates before any row lands; the lock
        // guard releases on every exit path.
        self.repo
            .append_usage(identity_id, bucket, amount, reference)
            .await?;

        let deduction = Deduction {
            module_requested: module.clone(),
            module_used: bucket.to_string(),
            amount,
            credits_remaining: available - amount,
        };
        tracing::info!(
            identity_id,
            module_requested = %deduction.module_requested,
            module_used = %deduction.module_used,
            amount,
            credits_remaining = deduction.credits_remaining,
            "credits deducted"
        );
        Ok(deduction)
    }

    async fn read_buckets(&self, identity_id: i64, module: &str) -> AppResult<(i64, i64)> {
        let specific = self.repo.module_balance(identity_id, module).await?;
        let global = if module == GLOBAL_MODULE {
            specific
        } else {
            self.repo.module_balance(identity_id, GLOBAL_MODULE).await?
        };
        Ok((specific, global))
    }
}

/// Total spendable credits for a request against `module`. When the
/// requested module IS the global bucket, the two reads alias the same
/// rows and must not be double-counted.
fn available(module: &str, specific: i64, global: i64) -> i64 {
    if module == GLOBAL_MODULE {
        global
    } else {
        specific + global
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::InMemoryCreditRepo;

    fn make_credits(repo: Arc<InMemoryCreditRepo>) -> CreditUseCases {
        CreditUseCases::new(repo, IdentityLocks::new(), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn balance_is_sum_of_grants_minus_uses() {
        let repo = Arc::new(InMemoryCreditRepo::default());
        let credits = make_credits(repo.clone());

        credits.grant(1, "tarot", 10, Some("order_completed"), None).await.unwrap();
        credits.grant(1, "tarot", 5, None, None).await.unwrap();
        credits.use_credits(1, "tarot", 4, None).await.unwrap();

        let balance = credits.module_balance(1, "tarot").await.unwrap();
        assert_eq!(balance.specific, 11);
        assert_eq!(balance.global, 0);
        assert_eq!(balance.available, 11);
    }

    #[tokio::test]
    async fn zero_grant_is_a_noop_not_an_error() {
        let repo = Arc::new(InMemoryCreditRepo::default());
        let credits = make_credits(repo.clone());

        credits.grant(1, "tarot", 0, None, None).await.unwrap();
        assert_eq!(repo.entry_count(), 0);

        let err = credits.grant(1, "tarot", -3, None, None).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn bucket_preference_specific_then_global() {
        let repo = Arc::new(InMemoryCreditRepo::default());
        let credits = make_credits(repo.clone());

        credits.grant(1, "tarot", 3, None, None).await.unwrap();
        credits.grant(1, "global", 10, None, None).await.unwrap();

        // Specific bucket fully covers: deduct there, global untouched.
        let d = credits.use_credits(1, "tarot", 3, None).await.unwrap();
        assert_eq!(d.module_used, "tarot");
        assert_eq!(d.credits_remaining, 10);
        let b = credits.module_balance(1, "tarot").await.unwrap();
        assert_eq!(b.specific, 0);
        assert_eq!(b.global, 10);

        // Refill the specific bucket; a larger deduction falls entirely
        // to global, leaving the specific balance untouched.
        credits.grant(1, "tarot", 3, None, None).await.unwrap();
        let d = credits.use_credits(1, "tarot", 5, None).await.unwrap();
        assert_eq!(d.module_used, "global");
        let b = credits.module_balance(1, "tarot").await.unwrap();
        assert_eq!(b.specific, 3);
        assert_eq!(b.global, 5);
        assert_eq!(b.available, 8);
    }

    #[tokio::test]
    async fn insufficient_credits_reports_available_total() {
        let repo = Arc::new(InMemoryCreditRepo::default());
        let credits = make_credits(repo);

        let err = credits.use_credits(1, "tarot", 1, None).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientCredits { available: 0 }));
    }

    #[tokio::test]
    async fn global_module_request_is_not_double_counted() {
        let repo = Arc::new(InMemoryCreditRepo::default());
        let credits = make_credits(repo);

        credits.grant(1, "global", 5, None, None).await.unwrap();

        // 5 credits must not look like 10.
        let err = credits.use_credits(1, "global", 6, None).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientCredits { available: 5 }));

        let d = credits.use_credits(1, "global", 5, None).await.unwrap();
        assert_eq!(d.module_used, "global");
        assert_eq!(d.credits_remaining, 0);
    }

    #[tokio::test]
    async fn bad_requests_are_rejected_before_locking() {
        let repo = Arc::new(InMemoryCreditRepo::default());
        let credits = make_credits(repo);

        assert!(matches!(
            credits.use_credits(1, "", 1, None).await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            credits.use_credits(1, "tarot", 0, None).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn failed_append_leaves_no_partial_rows() {
        let repo = Arc::new(InMemoryCreditRepo::default());
        let credits = make_credits(repo.clone());

        credits.grant(1, "global", 5, None, None).await.unwrap();
        repo.fail_next_write();

        let err = credits.use_credits(1, "global", 2, None).await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));

        // Balance unchanged, no orphan audit row, and the lock was
        // released so a retry succeeds.
        let b = credits.module_balance(1, "global").await.unwrap();
        assert_eq!(b.available, 5);
        assert_eq!(repo.log_count(), 1); // just the grant
        credits.use_credits(1, "global", 2, None).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_deductions_never_overdraw() {
        let repo = Arc::new(InMemoryCreditRepo::default());
        let credits = Arc::new(make_credits(repo.clone()));

        let n: i64 = 5;
        let k = 12;
        credits.grant(1, "global", n, None, None).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..k {
            let credits = credits.clone();
            handles.push(tokio::spawn(async move {
                credits.use_credits(1, "reading", 1, None).await
            }));
        }

        let mut successes = 0;
        let mut insufficient = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(AppError::InsufficientCredits { .. }) => insufficient += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(successes, n);
        assert_eq!(insufficient, k - n);

        let b = credits.module_balance(1, "reading").await.unwrap();
        assert_eq!(b.available, 0);
    }
}
