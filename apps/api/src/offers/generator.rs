//! Offer generator: turns a service description into short marketing copy.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::api::non_blank;
use crate::errors::AppError;
use crate::llm_client::prompts::{fill_template, or_fallback, NOT_SPECIFIED};
use crate::llm_client::{generate_json, TextGenerator};
use crate::offers::prompts::{OFFER_PROMPT_TEMPLATE, OFFER_SYSTEM};

pub const ONE_LINER_MAX_WORDS: usize = 15;
pub const ELEVATOR_PITCH_MAX_WORDS: usize = 50;
pub const CALL_TO_ACTION_MAX_WORDS: usize = 10;

/// Kind of service being pitched, as offered by the frontend's dropdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Coaching,
    Consulting,
    Freelance,
    DigitalProduct,
    Course,
    Membership,
    Other,
}

impl ServiceType {
    pub fn label(self) -> &'static str {
        match self {
            ServiceType::Coaching => "Coaching",
            ServiceType::Consulting => "Consulting",
            ServiceType::Freelance => "Freelance Service",
            ServiceType::DigitalProduct => "Digital Product",
            ServiceType::Course => "Online Course",
            ServiceType::Membership => "Membership",
            ServiceType::Other => "Other",
        }
    }
}

impl FromStr for ServiceType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "coaching" => Ok(ServiceType::Coaching),
            "consulting" => Ok(ServiceType::Consulting),
            "freelance" => Ok(ServiceType::Freelance),
            "digital_product" => Ok(ServiceType::DigitalProduct),
            "course" => Ok(ServiceType::Course),
            "membership" => Ok(ServiceType::Membership),
            "other" => Ok(ServiceType::Other),
            other => Err(AppError::Validation(format!("Unknown service type '{other}'"))),
        }
    }
}

/// Raw request body for `POST /api/offers/generate`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferRequest {
    pub description: Option<String>,
    pub target_audience: Option<String>,
    pub service_type: Option<String>,
}

/// An `OfferRequest` that passed validation.
#[derive(Debug, PartialEq)]
pub struct OfferBrief<'a> {
    pub description: &'a str,
    pub target_audience: Option<&'a str>,
    pub service_type: Option<ServiceType>,
}

impl OfferRequest {
    pub fn validate(&self) -> Result<OfferBrief<'_>, AppError> {
        let description = non_blank(&self.description)
            .ok_or_else(|| AppError::Validation("Service description is required".to_string()))?;

        // An empty dropdown selection arrives as "" and means "not chosen".
        let service_type = non_blank(&self.service_type)
            .map(ServiceType::from_str)
            .transpose()?;

        Ok(OfferBrief {
            description,
            target_audience: non_blank(&self.target_audience),
            service_type,
        })
    }
}

/// The copy the model is asked to produce.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferResult {
    pub one_liner: String,
    pub elevator_pitch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_to_action: Option<String>,
}

impl OfferResult {
    /// Lists every field that runs past its word ceiling.
    pub fn ceiling_violations(&self) -> Vec<String> {
        let mut checks = vec![
            ("oneLiner", self.one_liner.as_str(), ONE_LINER_MAX_WORDS),
            ("elevatorPitch", self.elevator_pitch.as_str(), ELEVATOR_PITCH_MAX_WORDS),
        ];
        if let Some(cta) = &self.call_to_action {
            checks.push(("callToAction", cta.as_str(), CALL_TO_ACTION_MAX_WORDS));
        }

        checks
            .into_iter()
            .filter_map(|(field, text, max)| {
                let words = word_count(text);
                (words > max).then(|| format!("{field} has {words} words (max {max})"))
            })
            .collect()
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn build_offer_prompt(brief: &OfferBrief<'_>) -> String {
    fill_template(
        OFFER_PROMPT_TEMPLATE,
        &[
            ("description", brief.description),
            (
                "target_audience",
                or_fallback(brief.target_audience, NOT_SPECIFIED),
            ),
            (
                "service_type",
                brief.service_type.map(ServiceType::label).unwrap_or(NOT_SPECIFIED),
            ),
            ("one_liner_max", &ONE_LINER_MAX_WORDS.to_string()),
            ("pitch_max", &ELEVATOR_PITCH_MAX_WORDS.to_string()),
            ("cta_max", &CALL_TO_ACTION_MAX_WORDS.to_string()),
        ],
    )
}

/// Calls the generator once and returns the model's JSON object unchanged.
///
/// Word-ceiling overruns are logged, not corrected.
pub async fn generate_offer(
    generator: &dyn TextGenerator,
    brief: &OfferBrief<'_>,
) -> Result<Value, AppError> {
    let prompt = build_offer_prompt(brief);

    let value: Value = generate_json(generator, OFFER_SYSTEM, &prompt)
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    match serde_json::from_value::<OfferResult>(value.clone()) {
        Ok(result) => {
            for violation in result.ceiling_violations() {
                warn!("Offer copy exceeds word ceiling: {violation}");
            }
        }
        Err(e) => warn!("Offer copy is missing expected keys: {e}"),
    }

    Ok(value)
}
