use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::HeaderMap,
    routing::{get, post},
};
use serde::Deserialize;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    domain::entities::identity::Identity,
    use_cases::credits::Deduction,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/credits/balance", get(get_balance))
        .route("/credits/use", post(use_credits))
}

#[derive(Deserialize)]
struct BalanceQuery {
    module: Option<String>,
}

async fn get_balance(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<BalanceQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let identity = current_identity(&app_state, &headers).await?;

    match query.module {
        Some(module) => {
            let balance = app_state
                .credit_use_cases
                .module_balance(identity.id, &module)
                .await?;
            // Displayed balances clamp at zero; the deduction check
            // works on the raw sums.
            Ok(Json(serde_json::json!({
                "module": balance.module,
                "specific": balance.specific.max(0),
                "global": balance.global.max(0),
                "available": balance.available.max(0),
            })))
        }
        None => {
            let balances: BTreeMap<String, i64> = app_state
                .credit_use_cases
                .balances(identity.id)
                .await?
                .into_iter()
                .map(|(module, balance)| (module, balance.max(0)))
                .collect();
            Ok(Json(serde_json::json!({ "balances": balances })))
        }
    }
}

#[derive(Deserialize)]
struct UseCreditsRequest {
    module: Option<String>,
    amount: Option<i64>,
    reference: Option<String>,
}

async fn use_credits(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<UseCreditsRequest>,
) -> AppResult<Json<Deduction>> {
    let identity = current_identity(&app_state, &headers).await?;

    let module = body
        .module
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::InvalidInput("module is required".into()))?;
    let amount = body.amount.unwrap_or(1);
    let reference = body.reference.as_deref().unwrap_or("api_use");

    let deduction = app_state
        .credit_use_cases
        .use_credits(identity.id, module, amount, Some(reference))
        .await?;
    Ok(Json(deduction))
}

async fn current_identity(app_state: &AppState, headers: &HeaderMap) -> AppResult<Identity> {
    app_state
        .auth_use_cases
        .resolve_bearer(headers)
        .await
        .ok_or(AppError::InvalidCredentials)
}
