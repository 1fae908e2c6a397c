use std::sync::Arc;

use crate::{
    infra::config::AppConfig,
    use_cases::{auth::AuthUseCases, credits::CreditUseCases, sso::SsoUseCases},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth_use_cases: Arc<AuthUseCases>,
    pub credit_use_cases: Arc<CreditUseCases>,
    pub sso_use_cases: Arc<SsoUseCases>,
}
