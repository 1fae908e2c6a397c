use async_trait::async_trait;
use sqlx::Row;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    domain::entities::identity::{Identity, NewIdentity},
    use_cases::auth::IdentityRepo,
};

const IDENTITY_COLUMNS: &str =
    "id, email, full_name, password_hash, google_id, date_of_birth, created_at, updated_at";

fn row_to_identity(row: sqlx::postgres::PgRow) -> Identity {
    Identity {
        id: row.get("id"),
        email: row.get("email"),
        full_name: row.get("full_name"),
        password_hash: row.get("password_hash"),
        google_id: row.get("google_id"),
        date_of_birth: row.get("date_of_birth"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl IdentityRepo for PostgresPersistence {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Identity>> {
        let row = sqlx::query(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM identities WHERE email = $1"
        ))
        .bind(email.to_lowercase())
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_identity))
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Identity>> {
        let row = sqlx::query(&format!(
            "SELECT {IDENTITY_COLUMNS} FROM identities WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.map(row_to_identity))
    }

    async fn create(&self, new: NewIdentity) -> AppResult<Identity> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO identities (email, full_name, password_hash, google_id, date_of_birth)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {IDENTITY_COLUMNS}
            "#
        ))
        .bind(new.email.to_lowercase())
        .bind(&new.full_name)
        .bind(&new.password_hash)
        .bind(&new.google_id)
        .bind(new.date_of_birth)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_identity(row))
    }
}
