use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::{
    app_error::AppResult,
    infra::http_client::build_client,
    use_cases::sso::{LocalPrincipal, SessionProvider},
};

/// Resolves host-platform sessions by forwarding the request's cookies
/// to the host's session-introspection endpoint. An unreachable or
/// misbehaving host counts as "no session" rather than an error; the
/// SSO flow then bounces to login instead of failing.
pub struct HostSessionProvider {
    client: Client,
    probe_url: Url,
}

#[derive(Deserialize)]
struct ProbeResponse {
    logged_in: bool,
    email: Option<String>,
    display_name: Option<String>,
}

impl HostSessionProvider {
    pub fn new(probe_url: Url) -> Self {
        Self {
            client: build_client(),
            probe_url,
        }
    }
}

#[async_trait]
impl SessionProvider for HostSessionProvider {
    async fn resolve(&self, cookie_header: Option<&str>) -> AppResult<Option<LocalPrincipal>> {
        // No cookies, no session; skip the round trip.
        let Some(cookies) = cookie_header else {
            return Ok(None);
        };

        let response = match self
            .client
            .get(self.probe_url.clone())
            .header(reqwest::header::COOKIE, cookies)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "session probe request failed");
                return Ok(None);
            }
        };
        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "session probe returned non-success");
            return Ok(None);
        }

        let probe: ProbeResponse = match response.json().await {
            Ok(probe) => probe,
            Err(e) => {
                tracing::warn!(error = %e, "session probe response was not valid JSON");
                return Ok(None);
            }
        };

        match (probe.logged_in, probe.email) {
            (true, Some(email)) => Ok(Some(LocalPrincipal {
                email,
                display_name: probe.display_name,
            })),
            _ => Ok(None),
        }
    }
}
