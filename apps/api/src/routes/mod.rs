pub mod health;

use axum::{
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::contracts::handlers as contracts;
use crate::errors::AppError;
use crate::offers::handlers as offers;
use crate::payments::handlers as payments;
use crate::state::AppState;
use crate::users::handlers as users;

/// Unknown API paths get the error envelope; anything else a bare 404.
async fn not_found(uri: Uri) -> Response {
    if uri.path().starts_with("/api/") {
        AppError::NotFound("API endpoint not found".to_string()).into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({ "message": "Not found" }))).into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::welcome_handler))
        .route("/health", get(health::health_handler))
        // Offers
        .route("/api/offers/generate", post(offers::handle_generate_offer))
        // Contracts
        .route(
            "/api/contracts/generate",
            post(contracts::handle_generate_contract),
        )
        .route("/api/contracts/:id", get(contracts::handle_get_contract))
        .route(
            "/api/contracts/:id/export",
            get(contracts::handle_export_contract),
        )
        // Users
        .route("/api/users/register", post(users::handle_register))
        .route("/api/users/login", post(users::handle_login))
        .route("/api/users/profile", get(users::handle_profile))
        // Payments
        .route(
            "/api/payments/create-subscription",
            post(payments::handle_create_subscription),
        )
        .route("/api/payments/webhook", post(payments::handle_webhook))
        .route(
            "/api/payments/subscription/:user_id",
            get(payments::handle_subscription_status),
        )
        .fallback(not_found)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use bytes::Bytes;
    use chrono::Utc;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;
    use crate::contracts::render::{DocumentRenderer, RenderError};
    use crate::contracts::store::InMemoryContractStore;
    use crate::llm_client::{LlmError, ResponseFormat, TextGenerator};
    use crate::payments::gateway::{CheckoutRequest, CheckoutSession, GatewayError, PaymentGateway};
    use crate::payments::plans::PlanCatalog;
    use crate::payments::signature::{SignatureVerifier, SIGNATURE_HEADER};
    use crate::payments::store::InMemorySubscriptionStore;
    use crate::users::store::{InMemoryUserStore, DEMO_USER_EMAIL, DEMO_USER_PASSWORD};
    use crate::users::token::{TokenService, TOKEN_TTL_SECS};

    const OFFER_JSON: &str = r#"{
        "oneLiner": "I help new parents get their babies sleeping through the night.",
        "elevatorPitch": "Exhausted parents get a gentle, step-by-step sleep plan tailored to their baby, with daily check-ins until everyone sleeps.",
        "callToAction": "Book a free consult"
    }"#;

    #[derive(Default)]
    struct CountingGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for CountingGenerator {
        async fn complete(
            &self,
            _system: &str,
            _prompt: &str,
            format: ResponseFormat,
        ) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(match format {
                ResponseFormat::JsonObject => OFFER_JSON.to_string(),
                ResponseFormat::Text => "# Service Agreement\n\n## Scope\n\nLogo design.".to_string(),
            })
        }
    }

    struct FakeRenderer;

    #[async_trait]
    impl DocumentRenderer for FakeRenderer {
        async fn render_pdf(&self, _html: &str) -> Result<Bytes, RenderError> {
            Ok(Bytes::from_static(b"%PDF-1.4\n%fake"))
        }
    }

    /// Generator that fails upstream, or answers with prose where JSON was asked for.
    enum BrokenGenerator {
        Overloaded,
        Prose,
    }

    #[async_trait]
    impl TextGenerator for BrokenGenerator {
        async fn complete(
            &self,
            _system: &str,
            _prompt: &str,
            _format: ResponseFormat,
        ) -> Result<String, LlmError> {
            match self {
                BrokenGenerator::Overloaded => Err(LlmError::Api {
                    status: 503,
                    message: "model overloaded".to_string(),
                }),
                BrokenGenerator::Prose => Ok("Sure! Here is a great pitch for you.".to_string()),
            }
        }
    }

    struct StuckRenderer;

    #[async_trait]
    impl DocumentRenderer for StuckRenderer {
        async fn render_pdf(&self, _html: &str) -> Result<Bytes, RenderError> {
            Err(RenderError::Timeout(Duration::from_secs(25)))
        }
    }

    #[derive(Default)]
    struct CountingGateway {
        customers: AtomicUsize,
        sessions: AtomicUsize,
        last_success_url: Mutex<Option<String>>,
    }

    #[async_trait]
    impl PaymentGateway for CountingGateway {
        async fn create_customer(&self, _email: &str, _user_id: &str) -> Result<String, GatewayError> {
            self.customers.fetch_add(1, Ordering::SeqCst);
            Ok("cus_test".to_string())
        }

        async fn create_checkout_session(
            &self,
            request: &CheckoutRequest<'_>,
        ) -> Result<CheckoutSession, GatewayError> {
            self.sessions.fetch_add(1, Ordering::SeqCst);
            *self.last_success_url.lock().unwrap() = Some(request.success_url.to_string());
            Ok(CheckoutSession {
                id: "cs_test".to_string(),
                url: Some("https://checkout.stripe.com/c/pay/cs_test".to_string()),
            })
        }
    }

    struct Harness {
        state: AppState,
        llm: Arc<CountingGenerator>,
        gateway: Arc<CountingGateway>,
    }

    fn test_config() -> Config {
        Config {
            openai_api_key: "sk-test".into(),
            openai_model: "gpt-4o".into(),
            jwt_secret: "test-jwt-secret".into(),
            stripe_secret_key: "sk_test".into(),
            stripe_webhook_secret: "whsec_test".into(),
            stripe_price_monthly: "price_monthly".into(),
            stripe_price_lifetime: "price_lifetime".into(),
            client_url: "http://localhost:3000".into(),
            allowed_origins: vec!["http://localhost:5173".into()],
            pdf_renderer_bin: "wkhtmltopdf".into(),
            pdf_render_timeout: Duration::from_secs(25),
            port: 3000,
            rust_log: "info".into(),
        }
    }

    fn harness() -> Harness {
        let config = test_config();
        let llm = Arc::new(CountingGenerator::default());
        let gateway = Arc::new(CountingGateway::default());
        let state = AppState {
            tokens: TokenService::new(&config.jwt_secret),
            plans: PlanCatalog::new(
                config.stripe_price_monthly.clone(),
                config.stripe_price_lifetime.clone(),
            ),
            webhook_verifier: Arc::new(SignatureVerifier::new(&config.stripe_webhook_secret)),
            llm: llm.clone(),
            renderer: Arc::new(FakeRenderer),
            contracts: Arc::new(InMemoryContractStore::with_sample()),
            users: Arc::new(InMemoryUserStore::with_demo_user().unwrap()),
            payments: gateway.clone(),
            subscriptions: Arc::new(InMemorySubscriptionStore::default()),
            config,
        };
        Harness { state, llm, gateway }
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    async fn send(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
        let response = build_router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn word_count(text: &str) -> usize {
        text.split_whitespace().count()
    }

    #[tokio::test]
    async fn test_offer_end_to_end() {
        let h = harness();
        let (status, body) = send(
            &h.state,
            post_json(
                "/api/offers/generate",
                json!({"description": "I help new parents sleep-train their babies"}),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], serde_json::from_str::<Value>(OFFER_JSON).unwrap());
        let one_liner = body["data"]["oneLiner"].as_str().unwrap();
        let pitch = body["data"]["elevatorPitch"].as_str().unwrap();
        assert!(!one_liner.is_empty() && word_count(one_liner) <= 15);
        assert!(!pitch.is_empty() && word_count(pitch) <= 50);
        assert_eq!(h.llm.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_offer_without_description_never_calls_generator() {
        let h = harness();
        for body in [json!({}), json!({"description": "  "}), json!({"targetAudience": "parents"})] {
            let (status, resp) = send(&h.state, post_json("/api/offers/generate", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(resp["success"], false);
        }
        assert_eq!(h.llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_gets_envelope() {
        let h = harness();
        let request = Request::post("/api/offers/generate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&h.state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    fn full_contract() -> Value {
        json!({
            "serviceDescription": "Brand identity design",
            "deliverables": ["Logo", "Style guide"],
            "price": 1500,
            "providerName": "Jane Designer",
            "clientName": "Acme Corp"
        })
    }

    #[tokio::test]
    async fn test_contract_missing_required_field_never_calls_generator() {
        let h = harness();
        for field in ["serviceDescription", "deliverables", "price", "providerName", "clientName"] {
            let mut body = full_contract();
            body.as_object_mut().unwrap().remove(field);
            let (status, resp) = send(&h.state, post_json("/api/contracts/generate", body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "missing {field}");
            assert_eq!(resp["message"], "Missing required contract details");
        }
        assert_eq!(h.llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generated_contract_can_be_fetched_and_exported() {
        let h = harness();
        let (status, body) =
            send(&h.state, post_json("/api/contracts/generate", full_contract())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["provider"], "Jane Designer");
        assert_eq!(body["data"]["client"], "Acme Corp");
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let (status, fetched) = send(&h.state, get_req(&format!("/api/contracts/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["data"]["content"], body["data"]["content"]);

        let response = build_router(h.state.clone())
            .oneshot(get_req(&format!("/api/contracts/{id}/export")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            format!("attachment; filename=\"contract-{id}.pdf\"").as_str()
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[tokio::test]
    async fn test_sample_contract_export_and_unknown_id() {
        let h = harness();
        let response = build_router(h.state.clone())
            .oneshot(get_req("/api/contracts/sample/export"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let (status, body) = send(&h.state, get_req("/api/contracts/nope/export")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_login_with_wrong_password_is_401() {
        let h = harness();
        let (status, body) = send(
            &h.state,
            post_json(
                "/api/users/login",
                json!({"email": DEMO_USER_EMAIL, "password": "not-the-password"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid credentials");
    }

    #[tokio::test]
    async fn test_login_then_profile() {
        let h = harness();
        let (status, body) = send(
            &h.state,
            post_json(
                "/api/users/login",
                json!({"email": DEMO_USER_EMAIL, "password": DEMO_USER_PASSWORD}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["data"]["token"].as_str().unwrap();

        let request = Request::get("/api/users/profile")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, profile) = send(&h.state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["data"]["email"], DEMO_USER_EMAIL);
        assert_eq!(profile["data"]["plan"], "free");

        let (status, _) = send(&h.state, get_req("/api/users/profile")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_register_token_expires_in_seven_days() {
        let h = harness();
        let (status, body) = send(
            &h.state,
            post_json(
                "/api/users/register",
                json!({"name": "Sam", "email": "Sam@Example.com", "password": "hunter22"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["email"], "sam@example.com");

        let claims = h
            .state
            .tokens
            .verify(body["data"]["token"].as_str().unwrap())
            .unwrap();
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECS);
        assert_eq!(claims.sub, body["data"]["id"].as_str().unwrap());

        let (status, _) = send(
            &h.state,
            post_json(
                "/api/users/register",
                json!({"name": "Sam", "email": "sam@example.com", "password": "other"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_invalid_plan_creates_nothing_remote() {
        let h = harness();
        let (status, body) = send(
            &h.state,
            post_json(
                "/api/payments/create-subscription",
                json!({"userId": "user_123", "planType": "WEEKLY", "email": "test@example.com"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid plan type");
        assert_eq!(h.gateway.customers.load(Ordering::SeqCst), 0);
        assert_eq!(h.gateway.sessions.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_create_subscription_returns_checkout_session() {
        let h = harness();
        let (status, body) = send(
            &h.state,
            post_json(
                "/api/payments/create-subscription",
                json!({"userId": "user_123", "planType": "monthly", "email": "test@example.com"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["sessionId"], "cs_test");
        assert!(body["data"]["url"].as_str().unwrap().contains("cs_test"));
        assert_eq!(h.gateway.customers.load(Ordering::SeqCst), 1);
        assert_eq!(
            h.gateway.last_success_url.lock().unwrap().as_deref(),
            Some("http://localhost:3000/payment/success?session_id={CHECKOUT_SESSION_ID}")
        );
    }

    #[tokio::test]
    async fn test_webhook_requires_valid_signature() {
        let h = harness();
        let (status, body) = send(
            &h.state,
            Request::post("/api/payments/webhook")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Missing Stripe signature");

        let request = Request::post("/api/payments/webhook")
            .header(SIGNATURE_HEADER, format!("t={},v1={}", Utc::now().timestamp(), "00".repeat(32)))
            .body(Body::from("{}"))
            .unwrap();
        let (status, body) = send(&h.state, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().starts_with("Webhook error:"));
    }

    #[tokio::test]
    async fn test_signed_checkout_webhook_activates_subscription() {
        let h = harness();
        let (_, before) = send(&h.state, get_req("/api/payments/subscription/user_123")).await;
        assert_eq!(before["data"]["status"], "inactive");

        let payload = json!({
            "id": "evt_1",
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": "cs_test",
                "customer": "cus_test",
                "metadata": {"userId": "user_123", "planType": "LIFETIME"}
            }}
        })
        .to_string();
        let signature = h
            .state
            .webhook_verifier
            .sign_header(payload.as_bytes(), Utc::now().timestamp());
        let request = Request::post("/api/payments/webhook")
            .header(SIGNATURE_HEADER, signature)
            .body(Body::from(payload))
            .unwrap();
        let (status, body) = send(&h.state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"received": true}));

        let (_, after) = send(&h.state, get_req("/api/payments/subscription/user_123")).await;
        assert_eq!(after["data"]["status"], "active");
        assert_eq!(after["data"]["plan"], "lifetime");
        assert_eq!(after["data"]["isLifetime"], true);
    }

    #[tokio::test]
    async fn test_generator_failure_is_500_with_upstream_message() {
        let mut h = harness();
        h.state.llm = Arc::new(BrokenGenerator::Overloaded);

        let (status, body) = send(
            &h.state,
            post_json("/api/offers/generate", json!({"description": "Sleep coaching"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "API error (status 503): model overloaded");

        let (status, body) =
            send(&h.state, post_json("/api/contracts/generate", full_contract())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "API error (status 503): model overloaded");
    }

    #[tokio::test]
    async fn test_offer_prose_instead_of_json_is_500() {
        let mut h = harness();
        h.state.llm = Arc::new(BrokenGenerator::Prose);

        let (status, body) = send(
            &h.state,
            post_json("/api/offers/generate", json!({"description": "Sleep coaching"})),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().starts_with("JSON parse error"));
    }

    #[tokio::test]
    async fn test_render_failure_is_500_error_creating_pdf() {
        let mut h = harness();
        h.state.renderer = Arc::new(StuckRenderer);

        let (status, body) = send(&h.state, get_req("/api/contracts/sample/export")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, json!({"success": false, "message": "Error creating PDF"}));
    }

    #[tokio::test]
    async fn test_profile_reports_active_subscription_plan() {
        let h = harness();
        let payload = json!({
            "id": "evt_2",
            "type": "checkout.session.completed",
            "data": {"object": {
                "id": "cs_test",
                "customer": "cus_test",
                "metadata": {"userId": "user_123", "planType": "LIFETIME"}
            }}
        })
        .to_string();
        let signature = h
            .state
            .webhook_verifier
            .sign_header(payload.as_bytes(), Utc::now().timestamp());
        let request = Request::post("/api/payments/webhook")
            .header(SIGNATURE_HEADER, signature)
            .body(Body::from(payload))
            .unwrap();
        assert_eq!(send(&h.state, request).await.0, StatusCode::OK);

        let (_, login) = send(
            &h.state,
            post_json(
                "/api/users/login",
                json!({"email": DEMO_USER_EMAIL, "password": DEMO_USER_PASSWORD}),
            ),
        )
        .await;
        let token = login["data"]["token"].as_str().unwrap();
        let request = Request::get("/api/users/profile")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, profile) = send(&h.state, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(profile["data"]["plan"], "lifetime");
    }

    #[tokio::test]
    async fn test_fallbacks_and_ambient_routes() {
        let h = harness();
        let (status, body) = send(&h.state, get_req("/api/nothing-here")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"success": false, "message": "API endpoint not found"}));

        let (status, body) = send(&h.state, get_req("/nowhere")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"message": "Not found"}));

        let (status, body) = send(&h.state, get_req("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Welcome to Clatract API!");

        let (_, body) = send(&h.state, get_req("/health")).await;
        assert_eq!(body["service"], "clatract-api");
    }
}
