use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::non_blank;
use crate::errors::AppError;

/// Deliverables arrive either as one free-text string or as a list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Deliverables {
    List(Vec<String>),
    Text(String),
}

impl Deliverables {
    /// Comma-joined form used in prompts. Blank list items are skipped.
    pub fn joined(&self) -> String {
        match self {
            Deliverables::List(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
            Deliverables::Text(text) => text.trim().to_string(),
        }
    }
}

/// Price as typed by the user ("$1,500") or sent as a bare number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Price {
    Amount(serde_json::Number),
    Text(String),
}

impl Price {
    /// Zero amounts and blank strings count as missing.
    fn display(&self) -> Option<String> {
        match self {
            Price::Amount(n) if n.as_f64() == Some(0.0) => None,
            Price::Amount(n) => Some(n.to_string()),
            Price::Text(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
        }
    }
}

/// Raw request body for `POST /api/contracts/generate`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRequest {
    pub service_description: Option<String>,
    pub deliverables: Option<Deliverables>,
    pub timeframe: Option<String>,
    pub price: Option<Price>,
    pub payment_schedule: Option<String>,
    pub provider_name: Option<String>,
    pub client_name: Option<String>,
    pub additional_terms: Option<String>,
}

/// A `ContractRequest` whose five required fields are present.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractTerms<'a> {
    pub service_description: &'a str,
    pub deliverables: String,
    pub timeframe: Option<&'a str>,
    pub price: String,
    pub payment_schedule: Option<&'a str>,
    pub provider_name: &'a str,
    pub client_name: &'a str,
    pub additional_terms: Option<&'a str>,
}

impl ContractRequest {
    pub fn validate(&self) -> Result<ContractTerms<'_>, AppError> {
        let missing = || AppError::Validation("Missing required contract details".to_string());

        let deliverables = self
            .deliverables
            .as_ref()
            .map(Deliverables::joined)
            .filter(|d| !d.is_empty())
            .ok_or_else(missing)?;
        let price = self.price.as_ref().and_then(Price::display).ok_or_else(missing)?;

        Ok(ContractTerms {
            service_description: non_blank(&self.service_description).ok_or_else(missing)?,
            deliverables,
            timeframe: non_blank(&self.timeframe),
            price,
            payment_schedule: non_blank(&self.payment_schedule),
            provider_name: non_blank(&self.provider_name).ok_or_else(missing)?,
            client_name: non_blank(&self.client_name).ok_or_else(missing)?,
            additional_terms: non_blank(&self.additional_terms),
        })
    }
}

/// A drafted contract as stored and returned to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDocument {
    /// Milliseconds since the Unix epoch at creation, as a decimal string.
    pub id: String,
    pub content: String,
    pub provider: String,
    pub client: String,
    pub created: DateTime<Utc>,
}

impl ContractDocument {
    pub fn new(content: String, provider: &str, client: &str) -> Self {
        let created = Utc::now();
        Self {
            id: created.timestamp_millis().to_string(),
            content,
            provider: provider.to_string(),
            client: client.to_string(),
            created,
        }
    }
}
