// Contracts: LLM-drafted service agreements, storage and PDF export.
// All LLM calls go through llm_client; no direct OpenAI calls here.

pub mod generator;
pub mod handlers;
pub mod models;
pub mod prompts;
pub mod render;
pub mod store;
