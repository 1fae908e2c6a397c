use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::http::app_state::AppState,
    infra::{
        config::AppConfig, google::GoogleTokenInfoVerifier, host_session::HostSessionProvider,
        locks::IdentityLocks, postgres_persistence,
    },
    jwt::TokenSigner,
    use_cases::{
        auth::{AuthUseCases, GoogleTokenVerifier, IdentityRepo},
        credits::{CreditRepo, CreditUseCases},
        sso::{SessionProvider, SsoUseCases},
    },
};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);
    let identity_repo = postgres_arc.clone() as Arc<dyn IdentityRepo>;
    let credit_repo = postgres_arc as Arc<dyn CreditRepo>;

    let signer = Arc::new(TokenSigner::new(
        config.jwt_secret.clone(),
        config.jwt_issuer.clone(),
    ));
    let google =
        Arc::new(GoogleTokenInfoVerifier::new(config.google_client_id.clone()))
            as Arc<dyn GoogleTokenVerifier>;

    let auth_use_cases = Arc::new(AuthUseCases::new(
        identity_repo,
        google,
        signer.clone(),
        config.access_token_ttl,
        config.register_token_ttl,
    ));

    let credit_use_cases = Arc::new(CreditUseCases::new(
        credit_repo,
        IdentityLocks::new(),
        config.lock_wait,
    ));

    let sessions = Arc::new(HostSessionProvider::new(config.session_probe_url.clone()))
        as Arc<dyn SessionProvider>;
    let sso_use_cases = Arc::new(SsoUseCases::new(
        sessions,
        auth_use_cases.clone(),
        signer,
        config.app_origin.clone(),
        config.sso_allowed_hosts.clone(),
        config.login_url.clone(),
        config.sso_default_ttl_secs,
        config.sso_min_ttl_secs,
        config.access_token_ttl,
    ));

    Ok(AppState {
        config: Arc::new(config),
        auth_use_cases,
        credit_use_cases,
        sso_use_cases,
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tollgate=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
