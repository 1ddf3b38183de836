//! Task storage with per-task mutual exclusion
//!
//! The store owns every task record for the lifetime of the process. Readers
//! take snapshots concurrently; writers for one task id are serialized through
//! a lock that is created lazily on first use and never removed. Work on
//! different task ids never contends on anything longer than a map lookup.

use crate::error::{A2aError, A2aResult};
use crate::protocol::task::Task;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

/// Exclusive access to one task id, released on drop
pub type TaskLock = OwnedMutexGuard<()>;

/// Storage abstraction injected into the task manager
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Acquire the per-task lock for `task_id`.
    ///
    /// Callers hold it for the whole read-modify-save cycle so that two
    /// requests for the same task cannot interleave.
    async fn lock(&self, task_id: &str) -> TaskLock;

    /// Return the existing task or create a SUBMITTED one.
    ///
    /// The boolean is `true` when the task was created by this call. When no
    /// session id is given for a new task one is generated. A session id that
    /// disagrees with an existing task's session is rejected without touching
    /// the record.
    async fn get_or_create(&self, task_id: &str, session_id: Option<&str>)
        -> A2aResult<(Task, bool)>;

    /// Snapshot of a task, if known
    async fn get(&self, task_id: &str) -> Option<Task>;

    /// Persist an updated task record
    async fn save(&self, task: &Task) -> A2aResult<()>;

    /// All tasks of a session in creation order
    async fn session_tasks(&self, session_id: &str) -> Vec<Task>;

    /// Number of tasks held
    async fn task_count(&self) -> usize;
}

struct StoredTask {
    task: Task,
    sequence: u64,
}

/// In-memory task store.
///
/// Contents are lost when the process exits. Nothing is ever evicted, which
/// also applies to the per-task locks.
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, StoredTask>>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    next_sequence: AtomicU64,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
            next_sequence: AtomicU64::new(0),
        }
    }

    fn generate_session_id() -> String {
        Uuid::new_v4().simple().to_string()
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn lock(&self, task_id: &str) -> TaskLock {
        let task_lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(task_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        task_lock.lock_owned().await
    }

    async fn get_or_create(
        &self,
        task_id: &str,
        session_id: Option<&str>,
    ) -> A2aResult<(Task, bool)> {
        let mut tasks = self.tasks.write().await;

        if let Some(stored) = tasks.get(task_id) {
            if let Some(requested) = session_id {
                if requested != stored.task.session_id {
                    warn!(
                        task_id = %task_id,
                        requested_session = %requested,
                        task_session = %stored.task.session_id,
                        "Session mismatch for existing task"
                    );
                    return Err(A2aError::invalid_params(format!(
                        "task {task_id} belongs to a different session"
                    )));
                }
            }
            return Ok((stored.task.clone(), false));
        }

        let session_id = session_id
            .map(str::to_string)
            .unwrap_or_else(Self::generate_session_id);
        let task = Task::new(task_id, session_id);
        let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);

        debug!(task_id = %task_id, session_id = %task.session_id, "Created task record");
        tasks.insert(
            task_id.to_string(),
            StoredTask {
                task: task.clone(),
                sequence,
            },
        );

        Ok((task, true))
    }

    async fn get(&self, task_id: &str) -> Option<Task> {
        let tasks = self.tasks.read().await;
        tasks.get(task_id).map(|stored| stored.task.clone())
    }

    async fn save(&self, task: &Task) -> A2aResult<()> {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&task.id) {
            Some(stored) => stored.task = task.clone(),
            None => {
                let sequence = self.next_sequence.fetch_add(1, Ordering::Relaxed);
                tasks.insert(
                    task.id.clone(),
                    StoredTask {
                        task: task.clone(),
                        sequence,
                    },
                );
            }
        }
        Ok(())
    }

    async fn session_tasks(&self, session_id: &str) -> Vec<Task> {
        let tasks = self.tasks.read().await;
        let mut matching: Vec<&StoredTask> = tasks
            .values()
            .filter(|stored| stored.task.session_id == session_id)
            .collect();
        matching.sort_by_key(|stored| stored.sequence);
        matching.into_iter().map(|stored| stored.task.clone()).collect()
    }

    async fn task_count(&self) -> usize {
        self.tasks.read().await.len()
    }
}
