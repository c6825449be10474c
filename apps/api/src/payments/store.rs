use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::users::store::FREE_CONTRACT_LIMIT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionState {
    Active,
    Cancelled,
    Inactive,
}

/// Billing state of one user, as returned by `GET /api/payments/subscription/:userId`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionStatus {
    pub user_id: String,
    pub status: SubscriptionState,
    /// `free`, `monthly` or `lifetime`.
    pub plan: String,
    pub current_period_end: Option<DateTime<Utc>>,
    pub contracts_generated: u32,
    /// A number, or `unlimited` for paid plans.
    pub contracts_limit: String,
    pub is_lifetime: bool,
    #[serde(skip)]
    pub customer_id: Option<String>,
}

impl SubscriptionStatus {
    /// Default for users with no billing history.
    pub fn inactive(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            status: SubscriptionState::Inactive,
            plan: "free".to_string(),
            current_period_end: None,
            contracts_generated: 0,
            contracts_limit: FREE_CONTRACT_LIMIT.to_string(),
            is_lifetime: false,
            customer_id: None,
        }
    }
}

/// Carried in `AppState` as `Arc<dyn SubscriptionStore>`.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<SubscriptionStatus>>;

    async fn find_by_customer(&self, customer_id: &str) -> Result<Option<SubscriptionStatus>>;

    /// Inserts or replaces the record for `status.user_id`.
    async fn upsert(&self, status: SubscriptionStatus) -> Result<()>;
}

#[derive(Default)]
pub struct InMemorySubscriptionStore {
    by_user: RwLock<HashMap<String, SubscriptionStatus>>,
}

#[async_trait]
impl SubscriptionStore for InMemorySubscriptionStore {
    async fn get(&self, user_id: &str) -> Result<Option<SubscriptionStatus>> {
        Ok(self.by_user.read().await.get(user_id).cloned())
    }

    async fn find_by_customer(&self, customer_id: &str) -> Result<Option<SubscriptionStatus>> {
        Ok(self
            .by_user
            .read()
            .await
            .values()
            .find(|s| s.customer_id.as_deref() == Some(customer_id))
            .cloned())
    }

    async fn upsert(&self, status: SubscriptionStatus) -> Result<()> {
        self.by_user
            .write()
            .await
            .insert(status.user_id.clone(), status);
        Ok(())
    }
}
