//! Concrete [`LlmProvider`](super::LlmProvider) backends

pub mod openai;

pub use openai::{OpenAiConfig, OpenAiProvider};
