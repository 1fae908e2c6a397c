use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use crate::{
    app_error::{AppError, AppResult},
    infra::http_client::build_client,
    use_cases::auth::{GoogleProfile, GoogleTokenVerifier},
};

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Verifies Google id tokens against the tokeninfo endpoint. Google
/// checks the signature and expiry server-side; we additionally pin the
/// audience to our own OAuth client id.
pub struct GoogleTokenInfoVerifier {
    client: Client,
    endpoint: String,
    client_id: String,
}

#[derive(Deserialize)]
struct TokenInfo {
    sub: String,
    aud: Option<String>,
    email: Option<String>,
    /// Google serializes this as the string "true"/"false".
    email_verified: Option<String>,
    name: Option<String>,
}

impl GoogleTokenInfoVerifier {
    pub fn new(client_id: String) -> Self {
        Self {
            client: build_client(),
            endpoint: TOKENINFO_URL.to_string(),
            client_id,
        }
    }

    #[cfg(test)]
    fn with_endpoint(client_id: String, endpoint: String) -> Self {
        Self {
            client: build_client(),
            endpoint,
            client_id,
        }
    }
}

#[async_trait]
impl GoogleTokenVerifier for GoogleTokenInfoVerifier {
    async fn verify(&self, id_token: &str) -> AppResult<GoogleProfile> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "tokeninfo request failed");
                AppError::InvalidGoogleToken
            })?;

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "tokeninfo rejected id token");
            return Err(AppError::InvalidGoogleToken);
        }

        let info: TokenInfo = response.json().await.map_err(|e| {
            tracing::warn!(error = %e, "tokeninfo response was not valid JSON");
            AppError::InvalidGoogleToken
        })?;

        if info.aud.as_deref() != Some(self.client_id.as_str()) {
            tracing::warn!(aud = ?info.aud, "id token audience mismatch");
            return Err(AppError::InvalidGoogleToken);
        }
        if info.email_verified.as_deref() != Some("true") {
            return Err(AppError::InvalidGoogleToken);
        }
        let email = info.email.ok_or(AppError::InvalidGoogleToken)?;

        Ok(GoogleProfile {
            subject: info.sub,
            email,
            name: info.name,
        })
    }
}
