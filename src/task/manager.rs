//! Task state machine
//!
//! `tasks/send` runs under the task's lock from lookup to final save:
//!
//! 1. get or create the task (SUBMITTED)
//! 2. refuse if it is already terminal
//! 3. append the user message, move to WORKING, save
//! 4. invoke the agent with the full history, bounded by a timeout
//! 5. apply the outcome (COMPLETED, still WORKING, or FAILED), save
//!
//! Agent failures become FAILED tasks; they are never protocol errors.
//!
//! The locked section runs on its own tokio task and the caller awaits it,
//! so a dropped request still leaves the task in a final saved state.

use crate::agent::{Agent, AgentInvocationError, AgentReply};
use crate::error::{sanitize_error_message, A2aError, A2aResult};
use crate::observability::metrics;
use crate::protocol::json_rpc::error_codes;
use crate::protocol::task::{Message, Task, TaskError, TaskQueryParams, TaskSendParams, TaskState};
use crate::task::store::TaskStore;
use crate::task_span;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

#[derive(Clone)]
pub struct TaskManager {
    store: Arc<dyn TaskStore>,
    agent: Arc<dyn Agent>,
    invoke_timeout: Duration,
}

impl TaskManager {
    pub fn new(store: Arc<dyn TaskStore>, agent: Arc<dyn Agent>, invoke_timeout: Duration) -> Self {
        Self {
            store,
            agent,
            invoke_timeout,
        }
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    /// Handle `tasks/send` and return the task as it stands afterwards
    pub async fn on_send_task(&self, params: TaskSendParams) -> A2aResult<Task> {
        metrics().task_received();
        if let Err(e) = params.validate() {
            metrics().task_rejected();
            return Err(e);
        }

        let task_id = params
            .task_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let span = task_span!(task_id = %task_id);

        let manager = self.clone();
        tokio::spawn(async move { manager.send_locked(task_id, params).await }.instrument(span))
            .await
            .map_err(|e| A2aError::internal(format!("Task worker stopped: {e}")))?
    }

    async fn send_locked(&self, task_id: String, params: TaskSendParams) -> A2aResult<Task> {
        let _guard = self.store.lock(&task_id).await;

        let (mut task, created) = self
            .store
            .get_or_create(&task_id, params.session_id.as_deref())
            .await
            .map_err(|e| {
                metrics().task_rejected();
                e
            })?;
        if created {
            metrics().task_created();
            debug!(session_id = %task.session_id, "Task submitted");
        }

        if task.is_terminal() {
            metrics().task_rejected();
            warn!(state = %task.status.state, "Rejected input for terminal task");
            return Err(A2aError::InvalidTaskState {
                task_id: task.id,
                state: task.status.state,
            });
        }

        task.append_message(params.message);
        task.transition(TaskState::Working, None)?;
        self.store.save(&task).await?;
        info!(
            session_id = %task.session_id,
            state = %task.status.state,
            messages = task.messages.len(),
            "Invoking agent"
        );

        let outcome = self.invoke_agent(&task).await;
        self.apply_outcome(&mut task, outcome)?;
        self.store.save(&task).await?;

        info!(
            session_id = %task.session_id,
            state = %task.status.state,
            messages = task.messages.len(),
            "Task updated"
        );
        Ok(task)
    }

    async fn invoke_agent(&self, task: &Task) -> Result<AgentReply, AgentInvocationError> {
        let started = Instant::now();
        metrics().invocation_started();

        let outcome = match tokio::time::timeout(
            self.invoke_timeout,
            self.agent.invoke(&task.session_id, &task.messages),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(AgentInvocationError::Timeout(self.invoke_timeout)),
        };

        let elapsed = started.elapsed();
        match &outcome {
            Ok(reply) => metrics().invocation_completed(elapsed, reply.task_complete),
            Err(e) => metrics().invocation_failed(
                elapsed,
                matches!(e, AgentInvocationError::Timeout(_)),
            ),
        }
        outcome
    }

    fn apply_outcome(
        &self,
        task: &mut Task,
        outcome: Result<AgentReply, AgentInvocationError>,
    ) -> A2aResult<()> {
        match outcome {
            Ok(reply) if reply.task_complete => task.complete(reply.message),
            Ok(reply) => {
                task.append_message(reply.message.clone());
                task.transition(TaskState::Working, Some(reply.message))
            }
            Err(e) => {
                let cause = sanitize_error_message(&e.to_string());
                warn!(agent = %self.agent.name(), error = %cause, "Agent invocation failed");
                task.fail(
                    Message::agent_text(format!("Agent invocation failed: {cause}")),
                    TaskError {
                        code: error_codes::AGENT_INVOCATION_FAILED,
                        message: cause,
                    },
                )
            }
        }
    }

    /// Handle `tasks/get`
    pub async fn on_get_task(&self, params: TaskQueryParams) -> A2aResult<Task> {
        let task = self
            .store
            .get(&params.task_id)
            .await
            .ok_or_else(|| A2aError::task_not_found(&params.task_id))?;
        Ok(task.with_history_limit(params.history_length))
    }

    /// Tasks of a session in creation order
    pub async fn session_tasks(&self, session_id: &str) -> Vec<Task> {
        self.store.session_tasks(session_id).await
    }
}
