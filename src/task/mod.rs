//! Task lifecycle management
//!
//! [`store`] keeps task records and the per-task locks that serialize work on
//! a single task id; [`manager`] is the state machine that drives a task from
//! SUBMITTED through WORKING to a terminal state.

pub mod manager;
pub mod store;

pub use manager::TaskManager;
pub use store::{InMemoryTaskStore, TaskLock, TaskStore};
