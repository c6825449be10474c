//! Webhook event decoding and dispatch onto the subscription store.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::payments::plans::PlanType;
use crate::payments::store::{SubscriptionState, SubscriptionStatus, SubscriptionStore};

/// Length of one paid monthly period.
pub const BILLING_PERIOD_DAYS: i64 = 30;

/// The envelope Stripe posts to the webhook.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: Value,
}

/// The event types we act on.
#[derive(Debug, Clone, PartialEq)]
pub enum BillingEvent {
    CheckoutCompleted {
        session_id: String,
        customer_id: Option<String>,
        user_id: Option<String>,
        plan_type: Option<String>,
    },
    InvoicePaid {
        invoice_id: String,
        customer_id: Option<String>,
    },
    SubscriptionCancelled {
        subscription_id: String,
        customer_id: Option<String>,
    },
    Other(String),
}

fn str_field(object: &Value, pointer: &str) -> Option<String> {
    object.pointer(pointer).and_then(Value::as_str).map(String::from)
}

impl WebhookEvent {
    pub fn classify(&self) -> BillingEvent {
        let object = &self.data.object;
        let id = str_field(object, "/id").unwrap_or_default();
        let customer_id = str_field(object, "/customer");

        match self.event_type.as_str() {
            "checkout.session.completed" => BillingEvent::CheckoutCompleted {
                session_id: id,
                customer_id,
                user_id: str_field(object, "/metadata/userId"),
                plan_type: str_field(object, "/metadata/planType"),
            },
            "invoice.payment_succeeded" => BillingEvent::InvoicePaid {
                invoice_id: id,
                customer_id,
            },
            "customer.subscription.deleted" => BillingEvent::SubscriptionCancelled {
                subscription_id: id,
                customer_id,
            },
            other => BillingEvent::Other(other.to_string()),
        }
    }
}

/// Applies one event to the store. Events that cannot be tied to a user are logged and skipped.
pub async fn apply_event(
    store: &dyn SubscriptionStore,
    event: BillingEvent,
    now: DateTime<Utc>,
) -> Result<()> {
    match event {
        BillingEvent::CheckoutCompleted {
            session_id,
            customer_id,
            user_id,
            plan_type,
        } => {
            let Some(user_id) = user_id else {
                warn!("Checkout session {session_id} completed without a userId in metadata");
                return Ok(());
            };
            let Some(plan) = plan_type.as_deref().and_then(|p| p.parse::<PlanType>().ok()) else {
                warn!("Checkout session {session_id} completed with unknown plan {plan_type:?}");
                return Ok(());
            };

            let mut status = store
                .get(&user_id)
                .await?
                .unwrap_or_else(|| SubscriptionStatus::inactive(&user_id));
            status.status = SubscriptionState::Active;
            status.contracts_limit = "unlimited".to_string();
            status.customer_id = customer_id.or(status.customer_id);
            match plan {
                PlanType::Monthly => {
                    status.plan = "monthly".to_string();
                    status.is_lifetime = false;
                    status.current_period_end = Some(now + Duration::days(BILLING_PERIOD_DAYS));
                }
                PlanType::Lifetime => {
                    status.plan = "lifetime".to_string();
                    status.is_lifetime = true;
                    status.current_period_end = None;
                }
            }
            store.upsert(status).await?;
            info!("User {user_id} successfully subscribed to {} plan", plan.as_str());
        }
        BillingEvent::InvoicePaid {
            invoice_id,
            customer_id,
        } => {
            info!("Payment succeeded for invoice {invoice_id}");
            let existing = match customer_id.as_deref() {
                Some(customer) => store.find_by_customer(customer).await?,
                None => None,
            };
            if let Some(mut status) = existing.filter(|s| !s.is_lifetime) {
                status.status = SubscriptionState::Active;
                status.current_period_end = Some(now + Duration::days(BILLING_PERIOD_DAYS));
                store.upsert(status).await?;
            }
        }
        BillingEvent::SubscriptionCancelled {
            subscription_id,
            customer_id,
        } => {
            info!(
                "Subscription {subscription_id} for customer {} was cancelled",
                customer_id.as_deref().unwrap_or("unknown")
            );
            let existing = match customer_id.as_deref() {
                Some(customer) => store.find_by_customer(customer).await?,
                None => None,
            };
            if let Some(mut status) = existing {
                status.status = SubscriptionState::Cancelled;
                store.upsert(status).await?;
            }
        }
        BillingEvent::Other(event_type) => {
            debug!("Ignoring webhook event type {event_type}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::store::InMemorySubscriptionStore;

    fn event(json: &str) -> WebhookEvent {
        serde_json::from_str(json).unwrap()
    }

    fn checkout(plan: &str) -> BillingEvent {
        event(&format!(
            r#"{{"id": "evt_1", "type": "checkout.session.completed", "data": {{"object": {{
                "id": "cs_1", "customer": "cus_1",
                "metadata": {{"userId": "user_123", "planType": "{plan}"}}
            }}}}}}"#
        ))
        .classify()
    }

    #[test]
    fn test_classify_checkout_completed() {
        assert_eq!(
            checkout("MONTHLY"),
            BillingEvent::CheckoutCompleted {
                session_id: "cs_1".into(),
                customer_id: Some("cus_1".into()),
                user_id: Some("user_123".into()),
                plan_type: Some("MONTHLY".into()),
            }
        );
    }

    #[test]
    fn test_classify_unknown_type() {
        let e = event(r#"{"id": "evt_2", "type": "charge.refunded", "data": {"object": {}}}"#);
        assert_eq!(e.classify(), BillingEvent::Other("charge.refunded".into()));
    }

    #[tokio::test]
    async fn test_monthly_checkout_activates_with_period_end() {
        let store = InMemorySubscriptionStore::default();
        let now = Utc::now();
        apply_event(&store, checkout("MONTHLY"), now).await.unwrap();

        let status = store.get("user_123").await.unwrap().unwrap();
        assert_eq!(status.status, SubscriptionState::Active);
        assert_eq!(status.plan, "monthly");
        assert_eq!(status.current_period_end, Some(now + Duration::days(30)));
        assert_eq!(status.customer_id.as_deref(), Some("cus_1"));
    }

    #[tokio::test]
    async fn test_lifetime_checkout_has_no_period_end() {
        let store = InMemorySubscriptionStore::default();
        apply_event(&store, checkout("LIFETIME"), Utc::now()).await.unwrap();

        let status = store.get("user_123").await.unwrap().unwrap();
        assert!(status.is_lifetime);
        assert!(status.current_period_end.is_none());
    }

    #[tokio::test]
    async fn test_cancellation_marks_customer_cancelled() {
        let store = InMemorySubscriptionStore::default();
        apply_event(&store, checkout("MONTHLY"), Utc::now()).await.unwrap();

        let cancel = BillingEvent::SubscriptionCancelled {
            subscription_id: "sub_1".into(),
            customer_id: Some("cus_1".into()),
        };
        apply_event(&store, cancel, Utc::now()).await.unwrap();

        let status = store.get("user_123").await.unwrap().unwrap();
        assert_eq!(status.status, SubscriptionState::Cancelled);
    }

    #[tokio::test]
    async fn test_invoice_paid_extends_period() {
        let store = InMemorySubscriptionStore::default();
        let start = Utc::now();
        apply_event(&store, checkout("MONTHLY"), start).await.unwrap();

        let later = start + Duration::days(30);
        let paid = BillingEvent::InvoicePaid {
            invoice_id: "in_1".into(),
            customer_id: Some("cus_1".into()),
        };
        apply_event(&store, paid, later).await.unwrap();

        let status = store.get("user_123").await.unwrap().unwrap();
        assert_eq!(status.current_period_end, Some(later + Duration::days(30)));
    }

    #[tokio::test]
    async fn test_checkout_without_user_is_skipped() {
        let store = InMemorySubscriptionStore::default();
        let e = BillingEvent::CheckoutCompleted {
            session_id: "cs_2".into(),
            customer_id: None,
            user_id: None,
            plan_type: Some("MONTHLY".into()),
        };
        apply_event(&store, e, Utc::now()).await.unwrap();
        assert!(store.find_by_customer("cus_1").await.unwrap().is_none());
    }
}
