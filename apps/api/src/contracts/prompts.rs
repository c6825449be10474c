// All LLM prompt constants for the Contracts module.

/// System prompt for contract drafting.
pub const CONTRACT_SYSTEM: &str = "You are a professional contract writer for freelancers \
    and service businesses. Create legally sound service agreements that protect both parties.";

pub const DEFAULT_PAYMENT_SCHEDULE: &str = "Full payment upfront";
pub const DEFAULT_ADDITIONAL_TERMS: &str = "None";

/// Contract prompt template.
/// Replace: {provider}, {client}, {service_description}, {deliverables}, {timeframe},
///          {price}, {payment_schedule}, {additional_terms}
pub const CONTRACT_PROMPT_TEMPLATE: &str = r###"Create a professional service agreement with the following details:

Service Provider: {provider}
Client: {client}
Service Description: {service_description}
Deliverables: {deliverables}
Timeframe: {timeframe}
Price: {price}
Payment Schedule: {payment_schedule}
Additional Terms: {additional_terms}

Format as a formal contract with appropriate sections including services, deliverables, compensation, intellectual property rights, termination clauses, and limitations of liability.
Use "# " for the title and "## " for section headings. Separate paragraphs with a blank line."###;
