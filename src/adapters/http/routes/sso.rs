use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    use_cases::sso::{SessionProbe, SsoOutcome},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sso/start", get(sso_start))
        .route("/session", get(get_session))
}

#[derive(Deserialize)]
struct StartQuery {
    // The Query extractor has already percent-decoded these once.
    redirect_uri: Option<String>,
    state: Option<String>,
    ttl: Option<i64>,
}

async fn sso_start(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<StartQuery>,
) -> AppResult<impl IntoResponse> {
    let cookies = cookie_header(&headers);
    let outcome = app_state
        .sso_use_cases
        .start(
            cookies,
            query.redirect_uri.as_deref(),
            query.state.as_deref(),
            query.ttl,
        )
        .await?;

    // Explicit 302; both arms redirect the user agent.
    let location = match outcome {
        SsoOutcome::RedirectToCaller(to) => to,
        SsoOutcome::BounceToLogin(to) => to,
    };
    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::LOCATION,
        location
            .parse()
            .map_err(|_| AppError::Internal("redirect location is not a valid header".into()))?,
    );
    Ok((StatusCode::FOUND, response_headers))
}

async fn get_session(
    State(app_state): State<AppState>,
    headers: HeaderMap,
) -> Json<SessionProbe> {
    let cookies = cookie_header(&headers);
    Json(app_state.sso_use_cases.session_probe(cookies).await)
}

fn cookie_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::COOKIE).and_then(|v| v.to_str().ok())
}
