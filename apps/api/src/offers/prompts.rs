// All LLM prompt constants for the Offer module.

/// System prompt for offer copy generation.
pub const OFFER_SYSTEM: &str = "You are an expert copywriter for service providers, \
    coaches and freelancers. You help them create clear, compelling messaging about their services. \
    You MUST respond with a single valid JSON object only.";

/// Offer prompt template.
/// Replace: {description}, {target_audience}, {service_type},
///          {one_liner_max}, {pitch_max}, {cta_max}
pub const OFFER_PROMPT_TEMPLATE: &str = r#"Create a concise, compelling one-liner and short elevator pitch for this service:

Service Description: {description}
Target Audience: {target_audience}
Service Type: {service_type}

Format the response as JSON with these keys:
- oneLiner (max {one_liner_max} words)
- elevatorPitch (max {pitch_max} words)
- callToAction (optional, max {cta_max} words)"#;
