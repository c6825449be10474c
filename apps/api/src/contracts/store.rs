//! Contract storage: key-by-id repository behind a trait so a database
//! implementation can replace the in-memory one without touching handlers.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::contracts::models::ContractDocument;

/// Id of the demo agreement every fresh store is seeded with.
pub const SAMPLE_CONTRACT_ID: &str = "sample";

const SAMPLE_CONTRACT_CONTENT: &str = "# SERVICE AGREEMENT

Between Sample Provider and Sample Client

This is a sample contract that would be generated from our database.

## Services

Provider will deliver coaching services as described.

## Compensation

Client agrees to pay $1,000 for the services described herein.

## Terms and Conditions

This agreement will be governed by the laws of the State of California.";

/// Contracts kept in memory before the oldest generated one is evicted.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Carried in `AppState` as `Arc<dyn ContractStore>`.
#[async_trait]
pub trait ContractStore: Send + Sync {
    /// Stores a new contract and returns it as stored. An id that is already
    /// taken is advanced to the next free one, so existing contracts are never replaced.
    async fn save(&self, contract: ContractDocument) -> Result<ContractDocument>;

    async fn find(&self, id: &str) -> Result<Option<ContractDocument>>;
}

/// Process-local store. Contents are lost on restart; once `capacity` is
/// reached the oldest generated contract is evicted (the sample is kept).
pub struct InMemoryContractStore {
    contracts: RwLock<HashMap<String, ContractDocument>>,
    capacity: usize,
}

impl Default for InMemoryContractStore {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl InMemoryContractStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            contracts: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// A store holding only the sample agreement.
    pub fn with_sample() -> Self {
        let sample = ContractDocument {
            id: SAMPLE_CONTRACT_ID.to_string(),
            content: SAMPLE_CONTRACT_CONTENT.to_string(),
            provider: "Sample Provider".to_string(),
            client: "Sample Client".to_string(),
            created: Utc.timestamp_opt(0, 0).single().unwrap_or_else(Utc::now),
        };

        let mut store = Self::default();
        store.contracts.get_mut().insert(sample.id.clone(), sample);
        store
    }
}

#[async_trait]
impl ContractStore for InMemoryContractStore {
    async fn save(&self, mut contract: ContractDocument) -> Result<ContractDocument> {
        let mut contracts = self.contracts.write().await;

        while contracts.contains_key(&contract.id) {
            contract.id = next_id(&contract.id);
        }
        if contracts.len() >= self.capacity {
            evict_oldest(&mut contracts);
        }

        contracts.insert(contract.id.clone(), contract.clone());
        Ok(contract)
    }

    async fn find(&self, id: &str) -> Result<Option<ContractDocument>> {
        Ok(self.contracts.read().await.get(id).cloned())
    }
}

/// Next candidate after a taken id: one millisecond later for timestamp ids.
fn next_id(id: &str) -> String {
    match id.parse::<i64>() {
        Ok(millis) => (millis + 1).to_string(),
        Err(_) => format!("{id}-1"),
    }
}

fn evict_oldest(contracts: &mut HashMap<String, ContractDocument>) {
    let oldest = contracts
        .values()
        .filter(|c| c.id != SAMPLE_CONTRACT_ID)
        .min_by_key(|c| c.created)
        .map(|c| c.id.clone());
    if let Some(id) = oldest {
        debug!("Evicting contract {id} from the in-memory store");
        contracts.remove(&id);
    }
}
