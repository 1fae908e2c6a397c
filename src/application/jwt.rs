use std::collections::BTreeMap;

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration, OffsetDateTime};

use crate::app_error::{AppError, AppResult};

/// Issued tokens are valid slightly before their issue instant so that
/// clock skew between this host and a consuming host does not reject a
/// freshly minted token.
pub const NBF_SKEW_SECS: i64 = 5;

/// Claims carried by every token this service issues. Required fields
/// are typed; anything else callers attach travels in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Identity id of the subject.
    pub sub: i64,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Binds a token to its intended consumer (the SSO redirect target).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Why a token failed verification. Callers that gate requests collapse
/// all of these to "no identity"; the distinction matters for logs and
/// for tests of the verification pipeline.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,
    #[error("unsupported algorithm")]
    UnsupportedAlgorithm,
    #[error("bad signature")]
    BadSignature,
    #[error("token not yet valid")]
    NotYetValid,
    #[error("token expired")]
    Expired,
}

impl From<TokenError> for AppError {
    fn from(_: TokenError) -> Self {
        AppError::InvalidCredentials
    }
}

/// Caller-supplied claim material for [`TokenSigner::issue`]. The
/// signer fills iat/nbf/exp/iss defaults; explicit values here win.
#[derive(Debug, Default)]
pub struct IssueParams {
    pub email: Option<String>,
    pub aud: Option<String>,
    /// Overrides the signer's configured issuer when set.
    pub iss: Option<String>,
    /// Overrides the issue instant when set; nbf and exp derive from it.
    pub iat: Option<i64>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// HS256 signer/verifier around the process-wide signing secret.
/// The secret is injected once at startup and read-only afterwards;
/// rotating it invalidates all outstanding tokens.
pub struct TokenSigner {
    secret: SecretString,
    issuer: String,
}

impl TokenSigner {
    pub fn new(secret: SecretString, issuer: String) -> Self {
        Self { secret, issuer }
    }

    pub fn issue(&self, subject: i64, ttl: Duration, params: IssueParams) -> AppResult<String> {
        let iat = params
            .iat
            .unwrap_or_else(|| OffsetDateTime::now_utc().unix_timestamp());
        let claims = Claims {
            sub: subject,
            iat,
            nbf: iat - NBF_SKEW_SECS,
            exp: iat + ttl.whole_seconds(),
            iss: Some(params.iss.unwrap_or_else(|| self.issuer.clone())),
            email: params.email,
            aud: params.aud,
            extra: params.extra,
        };
        let header = Header::new(Algorithm::HS256);
        encode(
            &header,
            &claims,
            &EncodingKey::from_secret(self.secret.expose_secret().as_bytes()),
        )
        .map_err(|e| AppError::Internal(e.to_string()))
    }

    /// Splits, checks the header algorithm, verifies the HMAC
    /// (constant-time inside jsonwebtoken), then checks nbf/exp with
    /// zero leeway. Returns the claims only when every check passes.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_nbf = true;
        // aud is an opaque binding to the SSO redirect target, checked
        // by the consuming host, not by us.
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.expose_secret().as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                TokenError::UnsupportedAlgorithm
            }
            ErrorKind::InvalidSignature => TokenError::BadSignature,
            ErrorKind::ImmatureSignature => TokenError::NotYetValid,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Malformed,
        })
    }
}
