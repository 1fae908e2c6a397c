use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// One authenticated principal. Root entity of the service: credit
/// entries and usage-log rows reference it by id, never by embedding.
#[derive(Debug, Clone, Serialize)]
pub struct Identity {
    pub id: i64,
    /// Stored lowercased; uniqueness is enforced at the storage layer.
    pub email: String,
    pub full_name: String,
    pub date_of_birth: Option<NaiveDate>,
    /// Federated subject id (Google "sub"). Set for accounts created
    /// via federated login or SSO auto-provisioning.
    pub google_id: Option<String>,
    /// Argon2 hash. None for federated-only accounts. An identity has
    /// either a password hash or a federated subject id, never neither.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// Fields needed to persist a new identity.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub email: String,
    pub full_name: String,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}
