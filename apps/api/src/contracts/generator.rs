//! Contract generator: drafts service-agreement prose from validated terms.

use crate::contracts::models::{ContractDocument, ContractTerms};
use crate::contracts::prompts::{
    CONTRACT_PROMPT_TEMPLATE, CONTRACT_SYSTEM, DEFAULT_ADDITIONAL_TERMS, DEFAULT_PAYMENT_SCHEDULE,
};
use crate::errors::AppError;
use crate::llm_client::prompts::{fill_template, or_fallback, NOT_SPECIFIED};
use crate::llm_client::{generate_text, TextGenerator};

pub fn build_contract_prompt(terms: &ContractTerms<'_>) -> String {
    fill_template(
        CONTRACT_PROMPT_TEMPLATE,
        &[
            ("provider", terms.provider_name),
            ("client", terms.client_name),
            ("service_description", terms.service_description),
            ("deliverables", &terms.deliverables),
            ("timeframe", or_fallback(terms.timeframe, NOT_SPECIFIED)),
            ("price", &terms.price),
            (
                "payment_schedule",
                or_fallback(terms.payment_schedule, DEFAULT_PAYMENT_SCHEDULE),
            ),
            (
                "additional_terms",
                or_fallback(terms.additional_terms, DEFAULT_ADDITIONAL_TERMS),
            ),
        ],
    )
}

/// Makes one generation call and wraps the prose into a new `ContractDocument`.
pub async fn generate_contract(
    generator: &dyn TextGenerator,
    terms: &ContractTerms<'_>,
) -> Result<ContractDocument, AppError> {
    let prompt = build_contract_prompt(terms);

    let content = generate_text(generator, CONTRACT_SYSTEM, &prompt)
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    Ok(ContractDocument::new(
        content,
        terms.provider_name,
        terms.client_name,
    ))
}
