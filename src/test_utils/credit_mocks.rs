use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::credit::{CreditEntry, CreditKind, UsageLogEntry},
    use_cases::credits::CreditRepo,
};

/// In-memory ledger mirroring the Postgres adapter's all-or-nothing
/// append semantics: an injected failure leaves neither row behind.
#[derive(Default)]
pub struct InMemoryCreditRepo {
    inner: Mutex<CreditTable>,
}

#[derive(Default)]
struct CreditTable {
    entries: Vec<CreditEntry>,
    log: Vec<UsageLogEntry>,
    fail_next: bool,
}

impl InMemoryCreditRepo {
    pub fn entry_count(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn log_count(&self) -> usize {
        self.inner.lock().unwrap().log.len()
    }

    /// Makes the next append fail, simulating a rolled-back transaction.
    pub fn fail_next_write(&self) {
        self.inner.lock().unwrap().fail_next = true;
    }

    fn append(
        &self,
        identity_id: i64,
        module: &str,
        kind: CreditKind,
        amount: i64,
        source: Option<&str>,
        reference: Option<&str>,
    ) -> AppResult<()> {
        let mut table = self.inner.lock().unwrap();
        if table.fail_next {
            table.fail_next = false;
            return Err(AppError::Database("injected write failure".into()));
        }
        let now = Utc::now().naive_utc();
        let (credits_added, credits_used) = match kind {
            CreditKind::Grant => (amount, 0),
            CreditKind::Usage => (0, amount),
        };
        let entry_id = table.entries.len() as i64 + 1;
        table.entries.push(CreditEntry {
            id: entry_id,
            identity_id,
            module: module.to_string(),
            credits_added,
            credits_used,
            source: source.map(str::to_owned),
            created_at: Some(now),
        });
        let log_id = table.log.len() as i64 + 1;
        table.log.push(UsageLogEntry {
            id: log_id,
            identity_id,
            module: module.to_string(),
            credit_type: kind.as_str().to_string(),
            credits: amount,
            reference: reference.map(str::to_owned),
            used_at: Some(now),
        });
        Ok(())
    }
}

#[async_trait]
impl CreditRepo for InMemoryCreditRepo {
    async fn append_grant(
        &self,
        identity_id: i64,
        module: &str,
        amount: i64,
        source: Option<&str>,
        reference: Option<&str>,
    ) -> AppResult<()> {
        self.append(identity_id, module, CreditKind::Grant, amount, source, reference)
    }

    async fn append_usage(
        &self,
        identity_id: i64,
        module: &str,
        amount: i64,
        reference: Option<&str>,
    ) -> AppResult<()> {
        self.append(identity_id, module, CreditKind::Usage, amount, reference, reference)
    }

    async fn module_balance(&self, identity_id: i64, module: &str) -> AppResult<i64> {
        let table = self.inner.lock().unwrap();
        Ok(table
            .entries
            .iter()
            .filter(|e| e.identity_id == identity_id && e.module == module)
            .map(|e| e.credits_added - e.credits_used)
            .sum())
    }

    async fn balances(&self, identity_id: i64) -> AppResult<BTreeMap<String, i64>> {
        let table = self.inner.lock().unwrap();
        let mut balances = BTreeMap::new();
        for entry in table.entries.iter().filter(|e| e.identity_id == identity_id) {
            *balances.entry(entry.module.clone()).or_insert(0) +=
                entry.credits_added - entry.credits_used;
        }
        Ok(balances)
    }
}
