use std::sync::Arc;

use crate::config::Config;
use crate::contracts::render::DocumentRenderer;
use crate::contracts::store::ContractStore;
use crate::llm_client::TextGenerator;
use crate::payments::gateway::PaymentGateway;
use crate::payments::plans::PlanCatalog;
use crate::payments::signature::SignatureVerifier;
use crate::payments::store::SubscriptionStore;
use crate::users::store::UserStore;
use crate::users::token::TokenService;

/// Shared application state injected into all route handlers via Axum extractors.
/// External services sit behind traits so tests can swap in fakes.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub llm: Arc<dyn TextGenerator>,
    /// HTML-to-PDF renderer for contract export.
    pub renderer: Arc<dyn DocumentRenderer>,
    pub contracts: Arc<dyn ContractStore>,
    pub users: Arc<dyn UserStore>,
    pub tokens: TokenService,
    pub payments: Arc<dyn PaymentGateway>,
    pub plans: PlanCatalog,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub webhook_verifier: Arc<SignatureVerifier>,
}
