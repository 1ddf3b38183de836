//! LLM provider layer used by [`crate::agent::LlmAgent`]

pub mod provider;
pub mod providers;

pub use provider::*;
pub use providers::*;
