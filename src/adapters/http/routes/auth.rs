use axum::{
    Json, Router,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    domain::entities::identity::Identity,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/google-login", post(google_login))
        .route("/me", get(get_me))
}

#[derive(Serialize)]
struct TokenResponse {
    token: String,
    identity_id: i64,
}

#[derive(Deserialize)]
struct RegisterRequest {
    full_name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    date_of_birth: Option<String>,
}

async fn register(
    State(app_state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<Json<TokenResponse>> {
    let full_name = require(body.full_name.as_deref(), "full_name")?;
    let email = require(body.email.as_deref(), "email")?;
    let password = require(body.password.as_deref(), "password")?;
    let date_of_birth = body.date_of_birth.as_deref().map(parse_dob).transpose()?;

    let session = app_state
        .auth_use_cases
        .register(full_name, email, password, date_of_birth)
        .await?;
    Ok(Json(TokenResponse {
        token: session.token,
        identity_id: session.identity_id,
    }))
}

#[derive(Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

async fn login(
    State(app_state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let email = require(body.email.as_deref(), "email")?;
    let password = require(body.password.as_deref(), "password")?;

    let session = app_state.auth_use_cases.login(email, password).await?;
    Ok(Json(TokenResponse {
        token: session.token,
        identity_id: session.identity_id,
    }))
}

#[derive(Deserialize)]
struct GoogleLoginRequest {
    /// The Google id token. Some clients still send it as `id_token`.
    #[serde(alias = "id_token")]
    token: Option<String>,
}

async fn google_login(
    State(app_state): State<AppState>,
    Json(body): Json<GoogleLoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let token = require(body.token.as_deref(), "token")?;

    let session = app_state.auth_use_cases.google_login(token).await?;
    Ok(Json(TokenResponse {
        token: session.token,
        identity_id: session.identity_id,
    }))
}

async fn get_me(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<Identity>> {
    let identity = app_state
        .auth_use_cases
        .resolve_bearer(&headers)
        .await
        .ok_or(AppError::InvalidCredentials)?;
    Ok(Json(identity))
}

fn require<'a>(value: Option<&'a str>, field: &str) -> AppResult<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::InvalidInput(format!("{field} is required")))
}

fn parse_dob(raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::InvalidInput("date_of_birth must be YYYY-MM-DD".into()))
}
