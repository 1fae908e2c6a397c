use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    app_error::{AppError, AppResult},
    domain::entities::identity::{Identity, NewIdentity},
    use_cases::auth::{GoogleProfile, GoogleTokenVerifier, IdentityRepo},
    use_cases::sso::{LocalPrincipal, SessionProvider},
};

/// In-memory identity table with the same duplicate-email semantics as
/// the Postgres adapter.
#[derive(Default)]
pub struct InMemoryIdentityRepo {
    inner: Mutex<IdentityTable>,
}

#[derive(Default)]
struct IdentityTable {
    rows: Vec<Identity>,
    next_id: i64,
}

impl InMemoryIdentityRepo {
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: i64) -> Option<Identity> {
        self.inner
            .lock()
            .unwrap()
            .rows
            .iter()
            .find(|i| i.id == id)
            .cloned()
    }
}

#[async_trait]
impl IdentityRepo for InMemoryIdentityRepo {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Identity>> {
        let table = self.inner.lock().unwrap();
        Ok(table
            .rows
            .iter()
            .find(|i| i.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<Identity>> {
        Ok(self.get(id))
    }

    async fn create(&self, new: NewIdentity) -> AppResult<Identity> {
        let mut table = self.inner.lock().unwrap();
        if table
            .rows
            .iter()
            .any(|i| i.email.eq_ignore_ascii_case(&new.email))
        {
            return Err(AppError::DuplicateEmail);
        }
        table.next_id += 1;
        let now = Utc::now().naive_utc();
        let identity = Identity {
            id: table.next_id,
            email: new.email.to_lowercase(),
            full_name: new.full_name,
            password_hash: new.password_hash,
            google_id: new.google_id,
            date_of_birth: new.date_of_birth,
            created_at: Some(now),
            updated_at: Some(now),
        };
        table.rows.push(identity.clone());
        Ok(identity)
    }
}

/// Accepts exactly one preconfigured id token; everything else is
/// rejected the way the real tokeninfo verifier rejects it.
#[derive(Default)]
pub struct StaticGoogleVerifier {
    accepted: Option<(String, GoogleProfile)>,
}

impl StaticGoogleVerifier {
    pub fn with_token(token: &str, profile: GoogleProfile) -> Self {
        Self {
            accepted: Some((token.to_string(), profile)),
        }
    }
}

#[async_trait]
impl GoogleTokenVerifier for StaticGoogleVerifier {
    async fn verify(&self, id_token: &str) -> AppResult<GoogleProfile> {
        match &self.accepted {
            Some((token, profile)) if token == id_token => Ok(profile.clone()),
            _ => Err(AppError::InvalidGoogleToken),
        }
    }
}

/// Session provider with a fixed answer, ignoring cookies.
pub struct StaticSessionProvider {
    mode: SessionMode,
}

enum SessionMode {
    LoggedIn(LocalPrincipal),
    LoggedOut,
    Failing,
}

impl StaticSessionProvider {
    pub fn logged_in(principal: LocalPrincipal) -> Self {
        Self {
            mode: SessionMode::LoggedIn(principal),
        }
    }

    pub fn logged_out() -> Self {
        Self {
            mode: SessionMode::LoggedOut,
        }
    }

    pub fn failing() -> Self {
        Self {
            mode: SessionMode::Failing,
        }
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn resolve(&self, _cookie_header: Option<&str>) -> AppResult<Option<LocalPrincipal>> {
        match &self.mode {
            SessionMode::LoggedIn(principal) => Ok(Some(principal.clone())),
            SessionMode::LoggedOut => Ok(None),
            SessionMode::Failing => Err(AppError::Internal("session provider failure".into())),
        }
    }
}
