//! A2A agent server
//!
//! A JSON-RPC 2.0 task server for the Agent-to-Agent (A2A) protocol. Callers
//! submit user messages as tasks over HTTP; the server tracks each task
//! through its lifecycle, hands the conversation to an LLM-backed agent and
//! returns the updated task.
//!
//! # Overview
//!
//! - [`protocol`]: JSON-RPC envelopes, task/message payloads, agent card
//! - [`task`]: task store and the per-task state machine
//! - [`agent`]: the agent boundary and the tool-using [`agent::LlmAgent`]
//! - [`server`]: JSON-RPC dispatcher and warp routes
//! - [`client`]: HTTP client for talking to any A2A agent
//! - [`llm`], [`tools`]: provider and tool layers used by the agent
//! - [`observability`]: logging, metrics and health endpoints
//!
//! # Quick Start
//!
//! ```rust
//! use a2a_agent::protocol::{Message, TaskSendParams, TaskState};
//! use a2a_agent::task::{InMemoryTaskStore, TaskManager};
//! use a2a_agent::testing::ScriptedAgent;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let manager = TaskManager::new(
//!     Arc::new(InMemoryTaskStore::new()),
//!     Arc::new(ScriptedAgent::replying("It is 12:00.")),
//!     Duration::from_secs(30),
//! );
//!
//! let params = TaskSendParams::new(
//!     "task-1",
//!     Some("session-1".to_string()),
//!     Message::user_text("What time is it?"),
//! );
//! let task = manager.on_send_task(params).await.unwrap();
//!
//! assert_eq!(task.status.state, TaskState::Completed);
//! assert_eq!(task.messages.len(), 2);
//! # }
//! ```

pub mod agent;
pub mod client;
pub mod config;
pub mod error;
pub mod llm;
pub mod observability;
pub mod protocol;
pub mod server;
pub mod task;
pub mod testing;
pub mod tools;

pub use agent::{Agent, AgentReply, LlmAgent};
pub use client::A2aClient;
pub use config::AgentConfig;
pub use error::{A2aError, A2aResult};
pub use server::A2aServer;
pub use task::{InMemoryTaskStore, TaskManager, TaskStore};
