//! Protocol message types and validation for the A2A task protocol
//!
//! This module implements the JSON-RPC 2.0 envelope, the task/message/status
//! payloads carried inside it and the agent card served for discovery.

pub mod agent_card;
pub mod json_rpc;
pub mod task;

pub use agent_card::*;
pub use json_rpc::*;
pub use task::*;
