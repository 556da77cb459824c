// Proposal generation: prompt building, response validation, and the
// per-session request state machine.
// All LLM calls go through llm_client — no direct HTTP calls here.

pub mod builder;
pub mod handlers;
pub mod machine;
pub mod prompts;
pub mod service;
pub mod sessions;
pub mod validator;
