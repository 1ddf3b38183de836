//! Test doubles for the agent and LLM boundaries

pub mod mocks;

pub use mocks::*;
