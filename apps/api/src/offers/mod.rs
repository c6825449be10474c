// Offer clarity: one-liner, elevator pitch and call-to-action for a service.
// All LLM calls go through llm_client; no direct OpenAI calls here.

pub mod generator;
pub mod handlers;
pub mod prompts;
