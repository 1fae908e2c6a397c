use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use axum::http::{HeaderMap, header::AUTHORIZATION};
use chrono::NaiveDate;
use time::Duration;
use tracing::instrument;

use crate::{
    app_error::{AppError, AppResult},
    application::validators,
    domain::entities::identity::{Identity, NewIdentity},
    jwt::{IssueParams, TokenSigner},
};

#[async_trait]
pub trait IdentityRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Identity>>;
    async fn find_by_id(&self, id: i64) -> AppResult<Option<Identity>>;
    /// Must surface [`AppError::DuplicateEmail`] on a unique-constraint
    /// hit so callers can answer 409 instead of 500.
    async fn create(&self, new: NewIdentity) -> AppResult<Identity>;
}

/// Verified payload of a federated (Google) id token.
#[derive(Debug, Clone)]
pub struct GoogleProfile {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
}

#[async_trait]
pub trait GoogleTokenVerifier: Send + Sync {
    /// Verifies an external id token with the identity provider. Every
    /// failure mode, transport errors included, collapses to
    /// [`AppError::InvalidGoogleToken`].
    async fn verify(&self, id_token: &str) -> AppResult<GoogleProfile>;
}

#[derive(Debug)]
pub struct IssuedSession {
    pub token: String,
    pub identity_id: i64,
}

pub struct AuthUseCases {
    repo: Arc<dyn IdentityRepo>,
    google: Arc<dyn GoogleTokenVerifier>,
    signer: Arc<TokenSigner>,
    /// Login / federated-login token lifetime (short-lived).
    access_ttl: Duration,
    /// Registration bootstrap token lifetime.
    register_ttl: Duration,
}

impl AuthUseCases {
    pub fn new(
        repo: Arc<dyn IdentityRepo>,
        google: Arc<dyn GoogleTokenVerifier>,
        signer: Arc<TokenSigner>,
        access_ttl: Duration,
        register_ttl: Duration,
    ) -> Self {
        Self {
            repo,
            google,
            signer,
            access_ttl,
            register_ttl,
        }
    }

    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
        date_of_birth: Option<NaiveDate>,
    ) -> AppResult<IssuedSession> {
        if !validators::is_valid_email(email) {
            return Err(AppError::InvalidInput("A valid email is required".into()));
        }
        if !validators::is_valid_full_name(full_name) {
            return Err(AppError::InvalidInput(
                "Name must be at least 3 characters".into(),
            ));
        }
        if !validators::is_valid_password(password) {
            return Err(AppError::InvalidInput(
                "Password must be at least 8 characters with a letter and a digit".into(),
            ));
        }
        if let Some(dob) = date_of_birth
            && !validators::is_valid_date_of_birth(dob)
        {
            return Err(AppError::InvalidInput(
                "Date of birth must be between 1900-01-01 and today".into(),
            ));
        }

        let email = email.trim().to_lowercase();
        if self.repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::DuplicateEmail);
        }

        let hash = hash_password(password)?;
        // The unique constraint still backstops the pre-check above; a
        // concurrent create surfaces as DuplicateEmail from the repo.
        let identity = self
            .repo
            .create(NewIdentity {
                email: email.clone(),
                full_name: full_name.trim().to_string(),
                password_hash: Some(hash),
                google_id: None,
                date_of_birth,
            })
            .await?;

        let token = self.signer.issue(
            identity.id,
            self.register_ttl,
            IssueParams {
                email: Some(identity.email.clone()),
                ..Default::default()
            },
        )?;
        Ok(IssuedSession {
            token,
            identity_id: identity.id,
        })
    }

    /// Uniform [`AppError::InvalidCredentials`] for unknown email,
    /// missing password hash, and wrong password — the response must
    /// not reveal whether the email exists.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> AppResult<IssuedSession> {
        let email = email.trim().to_lowercase();
        let identity = self
            .repo
            .find_by_email(&email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let hash = identity
            .password_hash
            .as_deref()
            .ok_or(AppError::InvalidCredentials)?;
        verify_password(password, hash)?;

        let token = self.issue_access_token(&identity)?;
        Ok(IssuedSession {
            token,
            identity_id: identity.id,
        })
    }

    #[instrument(skip(self, id_token))]
    pub async fn google_login(&self, id_token: &str) -> AppResult<IssuedSession> {
        let profile = self.google.verify(id_token).await?;

        let identity = self
            .find_or_create_by_email(
                &profile.email,
                profile.name.as_deref(),
                Some(&profile.subject),
            )
            .await?;

        let token = self.issue_access_token(&identity)?;
        Ok(IssuedSession {
            token,
            identity_id: identity.id,
        })
    }

    /// Maps an externally-verified principal to an identity,
    /// auto-provisioning a passwordless one on first sight. Shared by
    /// federated login and the SSO handoff.
    pub async fn find_or_create_by_email(
        &self,
        email: &str,
        display_name: Option<&str>,
        google_id: Option<&str>,
    ) -> AppResult<Identity> {
        let email = email.trim().to_lowercase();
        if let Some(existing) = self.repo.find_by_email(&email).await? {
            return Ok(existing);
        }
        match self
            .repo
            .create(NewIdentity {
                email: email.clone(),
                full_name: display_name.unwrap_or(&email).to_string(),
                password_hash: None,
                google_id: google_id.map(str::to_owned),
                date_of_birth: None,
            })
            .await
        {
            Ok(identity) => Ok(identity),
            // Lost a create race; the row exists now.
            Err(AppError::DuplicateEmail) => self
                .repo
                .find_by_email(&email)
                .await?
                .ok_or(AppError::Internal("identity vanished after create race".into())),
            Err(e) => Err(e),
        }
    }

    /// Permission gate for every protected endpoint. Extracts the
    /// bearer token, verifies it, and resolves the subject to an
    /// identity. All failure paths collapse to `None`; this never
    /// returns an error.
    pub async fn resolve_bearer(&self, headers: &HeaderMap) -> Option<Identity> {
        let auth = headers.get(AUTHORIZATION)?.to_str().ok()?;
        // Case-sensitive prefix check; the header name itself is
        // case-insensitive per HeaderMap.
        let token = auth.strip_prefix("Bearer ")?.trim();

        let claims = match self.signer.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "bearer token rejected");
                return None;
            }
        };
        if claims.sub <= 0 {
            return None;
        }
        match self.repo.find_by_id(claims.sub).await {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(error = %e, sub = claims.sub, "identity lookup failed during bearer resolution");
                None
            }
        }
    }

    pub fn issue_access_token(&self, identity: &Identity) -> AppResult<String> {
        self.signer.issue(
            identity.id,
            self.access_ttl,
            IssueParams {
                email: Some(identity.email.clone()),
                ..Default::default()
            },
        )
    }
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> AppResult<()> {
    let parsed = PasswordHash::new(hash).map_err(|_| AppError::InvalidCredentials)?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AppError::InvalidCredentials)
}
