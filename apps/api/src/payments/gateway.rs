//! Stripe REST adapter. The only module that talks to the billing processor.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::payments::plans::CheckoutMode;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message}")]
    Api { status: u16, message: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest<'a> {
    pub customer_id: &'a str,
    pub price_id: &'a str,
    pub mode: CheckoutMode,
    pub success_url: &'a str,
    pub cancel_url: &'a str,
    pub user_id: &'a str,
    pub plan_type: &'a str,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    /// Hosted checkout page.
    pub url: Option<String>,
}

/// Carried in `AppState` as `Arc<dyn PaymentGateway>`.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a remote customer record and returns its id.
    async fn create_customer(&self, email: &str, user_id: &str) -> Result<String, GatewayError>;

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest<'_>,
    ) -> Result<CheckoutSession, GatewayError>;
}

#[derive(Debug, Deserialize)]
struct StripeCustomer {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    base_url: String,
}

impl StripeClient {
    pub fn new(secret_key: String) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            secret_key,
            base_url: STRIPE_API_BASE.to_string(),
        })
    }

    /// POSTs a form-encoded body and decodes the JSON reply.
    async fn post_form<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        form: &[(&str, &str)],
    ) -> Result<T, GatewayError> {
        let response = self
            .client
            .post(format!("{}/{path}", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

/// Form fields for `POST /v1/checkout/sessions`.
fn checkout_form<'a>(request: &'a CheckoutRequest<'a>) -> Vec<(&'static str, &'a str)> {
    vec![
        ("customer", request.customer_id),
        ("payment_method_types[0]", "card"),
        ("line_items[0][price]", request.price_id),
        ("line_items[0][quantity]", "1"),
        ("mode", request.mode.as_str()),
        ("success_url", request.success_url),
        ("cancel_url", request.cancel_url),
        ("metadata[userId]", request.user_id),
        ("metadata[planType]", request.plan_type),
    ]
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_customer(&self, email: &str, user_id: &str) -> Result<String, GatewayError> {
        let customer: StripeCustomer = self
            .post_form("customers", &[("email", email), ("metadata[userId]", user_id)])
            .await?;
        debug!("Created Stripe customer {}", customer.id);
        Ok(customer.id)
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutRequest<'_>,
    ) -> Result<CheckoutSession, GatewayError> {
        let session: CheckoutSession = self
            .post_form("checkout/sessions", &checkout_form(request))
            .await?;
        debug!("Created checkout session {}", session.id);
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkout_form_fields() {
        let request = CheckoutRequest {
            customer_id: "cus_123",
            price_id: "price_monthly",
            mode: CheckoutMode::Subscription,
            success_url: "http://localhost:3000/payment/success?session_id={CHECKOUT_SESSION_ID}",
            cancel_url: "http://localhost:3000/payment/cancel",
            user_id: "user_123",
            plan_type: "MONTHLY",
        };
        let form = checkout_form(&request);
        assert!(form.contains(&("mode", "subscription")));
        assert!(form.contains(&("line_items[0][price]", "price_monthly")));
        assert!(form.contains(&("line_items[0][quantity]", "1")));
        assert!(form.contains(&("metadata[userId]", "user_123")));
        assert!(form.contains(&("metadata[planType]", "MONTHLY")));
    }

    #[test]
    fn test_gateway_api_error_displays_stripe_message() {
        let err = GatewayError::Api {
            status: 400,
            message: "No such price: 'price_monthly'".into(),
        };
        assert_eq!(err.to_string(), "No such price: 'price_monthly'");
    }

    #[test]
    fn test_checkout_session_decodes() {
        let json = r#"{"id": "cs_test_1", "object": "checkout.session", "url": "https://checkout.stripe.com/c/pay/cs_test_1"}"#;
        let session: CheckoutSession = serde_json::from_str(json).unwrap();
        assert_eq!(session.id, "cs_test_1");
        assert!(session.url.unwrap().starts_with("https://checkout.stripe.com"));
    }
}
