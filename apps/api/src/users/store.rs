use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::users::password::{hash_password, PasswordError};

/// Contracts a free-plan account may generate.
pub const FREE_CONTRACT_LIMIT: u32 = 1;

pub const DEMO_USER_ID: &str = "user_123";
pub const DEMO_USER_EMAIL: &str = "test@example.com";
pub const DEMO_USER_PASSWORD: &str = "password123";

#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("a user with email {0} already exists")]
    DuplicateEmail(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<UserStoreError> for AppError {
    fn from(err: UserStoreError) -> Self {
        match err {
            UserStoreError::DuplicateEmail(_) => AppError::Conflict("User already exists".to_string()),
            UserStoreError::Backend(e) => AppError::Internal(e),
        }
    }
}

/// A stored account. Never serialized directly; see `UserProfile`.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    /// Always stored lowercased.
    pub email: String,
    pub password_hash: String,
    /// Plan at sign-up. The profile reports the billing plan instead once a
    /// subscription is active.
    pub plan: String,
    /// Usage counters are fixed at account creation. Contract generation is
    /// anonymous, so nothing attributes a generated contract to an account.
    pub contracts_generated: u32,
    pub contracts_remaining: u32,
    pub join_date: DateTime<Utc>,
}

impl UserRecord {
    /// A fresh free-plan account.
    pub fn new(id: String, name: String, email: String, password_hash: String) -> Self {
        Self {
            id,
            name,
            email,
            password_hash,
            plan: "free".to_string(),
            contracts_generated: 0,
            contracts_remaining: FREE_CONTRACT_LIMIT,
            join_date: Utc::now(),
        }
    }
}

/// Public view of an account returned by `GET /api/users/profile`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub plan: String,
    pub contracts_generated: u32,
    pub contracts_remaining: u32,
    pub join_date: DateTime<Utc>,
}

impl From<UserRecord> for UserProfile {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            plan: user.plan,
            contracts_generated: user.contracts_generated,
            contracts_remaining: user.contracts_remaining,
            join_date: user.join_date,
        }
    }
}

/// Carried in `AppState` as `Arc<dyn UserStore>`.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `DuplicateEmail` if the email is taken.
    async fn create(&self, user: UserRecord) -> Result<(), UserStoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, UserStoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, UserStoreError>;
}

/// Users keyed by lowercased email.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl InMemoryUserStore {
    /// A store holding the demo account (`test@example.com` / `password123`).
    pub fn with_demo_user() -> Result<Self, PasswordError> {
        let demo = UserRecord {
            id: DEMO_USER_ID.to_string(),
            name: "Test User".to_string(),
            email: DEMO_USER_EMAIL.to_string(),
            password_hash: hash_password(DEMO_USER_PASSWORD)?,
            plan: "free".to_string(),
            contracts_generated: 1,
            contracts_remaining: 0,
            join_date: Utc
                .with_ymd_and_hms(2023, 4, 15, 10, 30, 0)
                .single()
                .unwrap_or_else(Utc::now),
        };

        let mut users = HashMap::new();
        users.insert(demo.email.clone(), demo);
        Ok(Self {
            users: RwLock::new(users),
        })
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, user: UserRecord) -> Result<(), UserStoreError> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.email) {
            return Err(UserStoreError::DuplicateEmail(user.email));
        }
        users.insert(user.email.clone(), user);
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, UserStoreError> {
        Ok(self.users.read().await.get(&email.to_lowercase()).cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<UserRecord>, UserStoreError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.id == id)
            .cloned())
    }
}
