use std::net::SocketAddr;

use axum::http::HeaderValue;
use env_helpers::{get_env, get_env_default};
use secrecy::SecretString;
use time::Duration;
use url::Url;

pub struct AppConfig {
    pub jwt_secret: SecretString,
    pub jwt_issuer: String,
    /// Login / federated-login token lifetime. Also used for the
    /// tokens handed out by the cookie session probe.
    pub access_token_ttl: Duration,
    /// Registration bootstrap token lifetime.
    pub register_token_ttl: Duration,
    /// This service's own public origin; anchors relative SSO targets.
    pub app_origin: Url,
    /// Host platform's login page, for the SSO bounce.
    pub login_url: Url,
    /// Host platform's session-introspection endpoint.
    pub session_probe_url: Url,
    /// Our Google OAuth client id; id tokens must carry it as audience.
    pub google_client_id: String,
    /// Hosts allowed as absolute SSO redirect targets, besides our own.
    pub sso_allowed_hosts: Vec<String>,
    pub sso_default_ttl_secs: i64,
    pub sso_min_ttl_secs: i64,
    /// Bound on waiting for another request's ledger work on the same
    /// identity before answering retryable 503.
    pub lock_wait: std::time::Duration,
    pub cors_origin: HeaderValue,
    pub bind_addr: SocketAddr,
    pub database_url: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let jwt_secret: SecretString = SecretString::new(get_env::<String>("JWT_SECRET").into());
        let jwt_issuer: String = get_env_default("JWT_ISSUER", "tollgate".to_string());

        let access_token_ttl_secs: i64 = get_env_default("ACCESS_TOKEN_TTL_SECS", 900);
        let register_token_ttl_days: i64 = get_env_default("REGISTER_TOKEN_TTL_DAYS", 7);

        let app_origin: Url = get_env("APP_ORIGIN");
        let login_url: Url = get_env("LOGIN_URL");
        let session_probe_url: Url = get_env("SESSION_PROBE_URL");
        let google_client_id: String = get_env("GOOGLE_CLIENT_ID");

        let sso_allowed_hosts: Vec<String> =
            get_env_default("SSO_ALLOWED_HOSTS", String::new())
                .split(',')
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map(str::to_string)
                .collect();
        let sso_default_ttl_secs: i64 = get_env_default("SSO_DEFAULT_TTL_SECS", 3_600);
        let sso_min_ttl_secs: i64 = get_env_default("SSO_MIN_TTL_SECS", 300);

        let lock_wait_secs: u64 = get_env_default("LOCK_WAIT_SECS", 5);

        let cors_origin: HeaderValue =
            get_env_default("CORS_ORIGIN", String::from("http://localhost:3000"))
                .parse()
                .expect("CORS_ORIGIN must be a valid header value");
        let bind_addr: SocketAddr = get_env_default("BIND_ADDR", "127.0.0.1:3001".parse().unwrap());
        let database_url: String = get_env("DATABASE_URL");

        Self {
            jwt_secret,
            jwt_issuer,
            access_token_ttl: Duration::seconds(access_token_ttl_secs),
            register_token_ttl: Duration::days(register_token_ttl_days),
            app_origin,
            login_url,
            session_probe_url,
            google_client_id,
            sso_allowed_hosts,
            sso_default_ttl_secs,
            sso_min_ttl_secs,
            lock_wait: std::time::Duration::from_secs(lock_wait_secs),
            cors_origin,
            bind_addr,
            database_url,
        }
    }
}
