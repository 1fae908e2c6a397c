use std::sync::Arc;

use async_trait::async_trait;
use time::Duration;
use tracing::instrument;
use url::Url;

use crate::{
    app_error::{AppError, AppResult},
    jwt::{IssueParams, TokenSigner},
    use_cases::auth::AuthUseCases,
};

/// A principal the host platform considers logged in, read from its
/// session cookie. This core consumes the capability; it does not
/// implement the host's session mechanics.
#[derive(Debug, Clone)]
pub struct LocalPrincipal {
    pub email: String,
    pub display_name: Option<String>,
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Resolves the request's cookies to a locally-authenticated
    /// principal, or None. Transport failures count as "no session".
    async fn resolve(&self, cookie_header: Option<&str>) -> AppResult<Option<LocalPrincipal>>;
}

/// Terminal outcomes of the handoff state machine. Both redirect the
/// user agent; they differ in where and why.
#[derive(Debug)]
pub enum SsoOutcome {
    /// Token issued; send the agent to the caller's redirect target.
    RedirectToCaller(String),
    /// No local session; send the agent to the login page with a
    /// bounce-back that re-invokes the handoff.
    BounceToLogin(String),
}

/// Result of the non-redirecting session probe. Never an error: any
/// internal failure collapses to logged-out.
#[derive(Debug, serde::Serialize)]
pub struct SessionProbe {
    pub logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

pub struct SsoUseCases {
    sessions: Arc<dyn SessionProvider>,
    auth: Arc<AuthUseCases>,
    signer: Arc<TokenSigner>,
    /// This service's own origin; anchors path-relative targets.
    own_origin: Url,
    /// Hosts allowed as absolute redirect targets.
    allowed_hosts: Vec<String>,
    login_url: Url,
    default_ttl_secs: i64,
    min_ttl_secs: i64,
    probe_token_ttl: Duration,
}

impl SsoUseCases {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sessions: Arc<dyn SessionProvider>,
        auth: Arc<AuthUseCases>,
        signer: Arc<TokenSigner>,
        own_origin: Url,
        allowed_hosts: Vec<String>,
        login_url: Url,
        default_ttl_secs: i64,
        min_ttl_secs: i64,
        probe_token_ttl: Duration,
    ) -> Self {
        Self {
            sessions,
            auth,
            signer,
            own_origin,
            allowed_hosts: allowed_hosts
                .into_iter()
                .map(|h| h.to_lowercase())
                .collect(),
            login_url,
            default_ttl_secs,
            min_ttl_secs,
            probe_token_ttl,
        }
    }

    /// Single pass of the handoff:
    /// validate target → probe session → map identity → issue token →
    /// redirect. No persistent state of its own; the issued token's
    /// expiry is the ceiling on how long the handoff link stays live.
    #[instrument(skip(self, cookie_header))]
    pub async fn start(
        &self,
        cookie_header: Option<&str>,
        redirect_uri: Option<&str>,
        state: Option<&str>,
        ttl_secs: Option<i64>,
    ) -> AppResult<SsoOutcome> {
        let raw_redirect = redirect_uri
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| AppError::InvalidInput("redirect_uri is required".into()))?;
        let target = self.validate_redirect_target(raw_redirect)?;

        let state = state.unwrap_or_default();
        let ttl = ttl_secs.unwrap_or(self.default_ttl_secs).max(self.min_ttl_secs);

        // A failing session probe counts as "no session": the agent is
        // sent through login rather than shown an error.
        let principal = match self.sessions.resolve(cookie_header).await {
            Ok(principal) => principal,
            Err(e) => {
                tracing::warn!(error = %e, "session probe failed during handoff");
                None
            }
        };
        let Some(principal) = principal else {
            return Ok(SsoOutcome::BounceToLogin(
                self.bounce_url(raw_redirect, state, ttl),
            ));
        };

        let identity = self
            .auth
            .find_or_create_by_email(&principal.email, principal.display_name.as_deref(), None)
            .await?;

        let token = self.signer.issue(
            identity.id,
            Duration::seconds(ttl),
            IssueParams {
                email: Some(identity.email.clone()),
                aud: Some(target.to_string()),
                ..Default::default()
            },
        )?;
        tracing::info!(
            identity_id = identity.id,
            aud = %target,
            ttl,
            "sso token issued"
        );

        let mut to = target;
        to.query_pairs_mut()
            .append_pair("token", &token)
            .append_pair("state", state);
        Ok(SsoOutcome::RedirectToCaller(to.to_string()))
    }

    /// Cookie-based probe backing `GET /session`. Maps the host
    /// principal to an identity and hands back a short-lived token.
    pub async fn session_probe(&self, cookie_header: Option<&str>) -> SessionProbe {
        let principal = match self.sessions.resolve(cookie_header).await {
            Ok(Some(p)) => p,
            Ok(None) => return SessionProbe { logged_in: false, token: None },
            Err(e) => {
                tracing::warn!(error = %e, "session probe failed");
                return SessionProbe { logged_in: false, token: None };
            }
        };

        let identity = match self
            .auth
            .find_or_create_by_email(&principal.email, principal.display_name.as_deref(), None)
            .await
        {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(error = %e, "identity mapping failed during session probe");
                return SessionProbe { logged_in: false, token: None };
            }
        };

        match self.signer.issue(
            identity.id,
            self.probe_token_ttl,
            IssueParams {
                email: Some(identity.email.clone()),
                ..Default::default()
            },
        ) {
            Ok(token) => SessionProbe { logged_in: true, token: Some(token) },
            Err(e) => {
                tracing::warn!(error = %e, "token issue failed during session probe");
                SessionProbe { logged_in: false, token: None }
            }
        }
    }

    /// Redirect-target safety. The query extractor has already decoded
    /// the value exactly once; no second decode happens here, which
    /// closes the double-decode bypass. Scheme-relative `//host` is
    /// rejected outright, path-relative targets anchor to our own
    /// origin, and absolute targets must name an allow-listed host.
    fn validate_redirect_target(&self, raw: &str) -> AppResult<Url> {
        if raw.starts_with("//") {
            return Err(AppError::InvalidInput(
                "Scheme-relative redirect targets are not allowed".into(),
            ));
        }
        if raw.starts_with('/') {
            return self
                .own_origin
                .join(raw)
                .map_err(|_| AppError::InvalidInput("Invalid redirect_uri".into()));
        }

        let url = Url::parse(raw)
            .map_err(|_| AppError::InvalidInput("Invalid redirect_uri".into()))?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(AppError::InvalidInput(
                "redirect_uri must be http(s) or path-relative".into(),
            ));
        }
        let host = url
            .host_str()
            .ok_or_else(|| AppError::InvalidInput("Invalid redirect_uri".into()))?
            .to_lowercase();

        let own_host = self.own_origin.host_str().map(str::to_lowercase);
        if Some(&host) == own_host.as_ref() || self.allowed_hosts.contains(&host) {
            Ok(url)
        } else {
            Err(AppError::InvalidInput(
                "redirect_uri host is not allowed".into(),
            ))
        }
    }

    /// Login page URL with a callback that re-invokes the handoff with
    /// the original parameters plus the `sso=1` marker, so the host's
    /// login-success hook routes back here instead of its default
    /// destination.
    fn bounce_url(&self, redirect_uri: &str, state: &str, ttl: i64) -> String {
        let mut callback = self.own_origin.clone();
        callback.set_path("/v1/sso/start");
        callback
            .query_pairs_mut()
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("state", state)
            .append_pair("ttl", &ttl.to_string())
            .append_pair("sso", "1");

        let mut login = self.login_url.clone();
        login
            .query_pairs_mut()
            .append_pair("redirect_to", callback.as_str());
        login.to_string()
    }
}
