use std::collections::BTreeMap;

use async_trait::async_trait;
use sqlx::Row;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    domain::entities::credit::CreditKind,
    use_cases::credits::CreditRepo,
};

#[async_trait]
impl CreditRepo for PostgresPersistence {
    async fn append_grant(
        &self,
        identity_id: i64,
        module: &str,
        amount: i64,
        source: Option<&str>,
        reference: Option<&str>,
    ) -> AppResult<()> {
        // Ledger row and audit row commit together or not at all.
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;
        sqlx::query(
            r#"
            INSERT INTO credit_entries (identity_id, module, credits_added, credits_used, source)
            VALUES ($1, $2, $3, 0, $4)
            "#,
        )
        .bind(identity_id)
        .bind(module)
        .bind(amount)
        .bind(source)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        sqlx::query(
            r#"
            INSERT INTO credit_usage_log (identity_id, module, credit_type, credits, reference)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(identity_id)
        .bind(module)
        .bind(CreditKind::Grant.as_str())
        .bind(amount)
        .bind(reference)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        tx.commit().await.map_err(AppError::from)?;
        Ok(())
    }

    async fn append_usage(
        &self,
        identity_id: i64,
        module: &str,
        amount: i64,
        reference: Option<&str>,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;
        sqlx::query(
            r#"
            INSERT INTO credit_entries (identity_id, module, credits_added, credits_used, source)
            VALUES ($1, $2, 0, $3, $4)
            "#,
        )
        .bind(identity_id)
        .bind(module)
        .bind(amount)
        .bind(reference)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        sqlx::query(
            r#"
            INSERT INTO credit_usage_log (identity_id, module, credit_type, credits, reference)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(identity_id)
        .bind(module)
        .bind(CreditKind::Usage.as_str())
        .bind(amount)
        .bind(reference)
        .execute(&mut *tx)
        .await
        .map_err(AppError::from)?;

        tx.commit().await.map_err(AppError::from)?;
        Ok(())
    }

    async fn module_balance(&self, identity_id: i64, module: &str) -> AppResult<i64> {
        // SUM over BIGINT yields NUMERIC in Postgres; cast back.
        let row = sqlx::query(
            r#"
            SELECT (COALESCE(SUM(credits_added), 0) - COALESCE(SUM(credits_used), 0))::BIGINT AS balance
            FROM credit_entries
            WHERE identity_id = $1 AND module = $2
            "#,
        )
        .bind(identity_id)
        .bind(module)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.get("balance"))
    }

    async fn balances(&self, identity_id: i64) -> AppResult<BTreeMap<String, i64>> {
        let rows = sqlx::query(
            r#"
            SELECT module,
                   (COALESCE(SUM(credits_added), 0) - COALESCE(SUM(credits_used), 0))::BIGINT AS balance
            FROM credit_entries
            WHERE identity_id = $1
            GROUP BY module
            ORDER BY module
            "#,
        )
        .bind(identity_id)
        .fetch_all(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(rows
            .into_iter()
            .map(|row| (row.get("module"), row.get("balance")))
            .collect())
    }
}
