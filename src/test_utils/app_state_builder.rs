//! Test app state builder for HTTP-level integration testing.

use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use time::Duration;
use url::Url;

use crate::{
    adapters::http::app_state::AppState,
    infra::{config::AppConfig, locks::IdentityLocks},
    jwt::TokenSigner,
    test_utils::{InMemoryCreditRepo, InMemoryIdentityRepo, StaticGoogleVerifier, StaticSessionProvider},
    use_cases::{
        auth::AuthUseCases,
        credits::CreditUseCases,
        sso::SsoUseCases,
    },
};

/// Builder for creating `AppState` with in-memory mocks for testing.
///
/// Defaults: empty identity and credit tables, a Google verifier that
/// rejects every token, and a logged-out host session.
pub struct TestAppStateBuilder {
    identities: Arc<InMemoryIdentityRepo>,
    credits: Arc<InMemoryCreditRepo>,
    google: StaticGoogleVerifier,
    sessions: StaticSessionProvider,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self {
            identities: Arc::new(InMemoryIdentityRepo::default()),
            credits: Arc::new(InMemoryCreditRepo::default()),
            google: StaticGoogleVerifier::default(),
            sessions: StaticSessionProvider::logged_out(),
        }
    }

    pub fn with_google(mut self, google: StaticGoogleVerifier) -> Self {
        self.google = google;
        self
    }

    pub fn with_sessions(mut self, sessions: StaticSessionProvider) -> Self {
        self.sessions = sessions;
        self
    }

    /// Handle to the identity table, for assertions after HTTP calls.
    pub fn identities(&self) -> Arc<InMemoryIdentityRepo> {
        self.identities.clone()
    }

    /// Handle to the credit ledger, for seeding and assertions.
    pub fn credits(&self) -> Arc<InMemoryCreditRepo> {
        self.credits.clone()
    }

    pub fn build(self) -> AppState {
        let config = Arc::new(AppConfig {
            jwt_secret: SecretString::new("a-test-secret-that-is-long-enough".into()),
            jwt_issuer: "https://id.example.com".into(),
            access_token_ttl: Duration::minutes(15),
            register_token_ttl: Duration::days(7),
            app_origin: Url::parse("http://localhost:3000").unwrap(),
            login_url: Url::parse("https://host.example.com/login").unwrap(),
            session_probe_url: Url::parse("https://host.example.com/session").unwrap(),
            google_client_id: "test_client_id".into(),
            sso_allowed_hosts: vec!["app.example.com".into()],
            sso_default_ttl_secs: 3_600,
            sso_min_ttl_secs: 300,
            lock_wait: std::time::Duration::from_secs(5),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            bind_addr: "127.0.0.1:3001".parse().unwrap(),
            database_url: String::new(),
        });

        let signer = Arc::new(TokenSigner::new(
            config.jwt_secret.clone(),
            config.jwt_issuer.clone(),
        ));

        let auth_use_cases = Arc::new(AuthUseCases::new(
            self.identities,
            Arc::new(self.google),
            signer.clone(),
            config.access_token_ttl,
            config.register_token_ttl,
        ));

        let credit_use_cases = Arc::new(CreditUseCases::new(
            self.credits,
            IdentityLocks::new(),
            config.lock_wait,
        ));

        let sso_use_cases = Arc::new(SsoUseCases::new(
            Arc::new(self.sessions),
            auth_use_cases.clone(),
            signer,
            config.app_origin.clone(),
            config.sso_allowed_hosts.clone(),
            config.login_url.clone(),
            config.sso_default_ttl_secs,
            config.sso_min_ttl_secs,
            config.access_token_ttl,
        ));

        AppState {
            config,
            auth_use_cases,
            credit_use_cases,
            sso_use_cases,
        }
    }
}

impl Default for TestAppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
