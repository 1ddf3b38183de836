//! Task lifecycle tests against the task manager
//!
//! Covers the observable contract of `tasks/send` and `tasks/get`: terminal
//! transitions, rejection of input for closed tasks, history accumulation and
//! isolation under concurrent requests.


use a2a_agent::error::A2aError;
use a2a_agent::protocol::{Message, Role, TaskQueryParams, TaskState};
use a2a_agent::task::{InMemoryTaskStore, TaskManager, TaskStore};
use a2a_agent::testing::ScriptedAgent;
use std::sync::Arc;
use std::time::Duration;
use test_helpers::{manager_with, user_send};

#[tokio::test]
async fn test_what_time_is_it_completes_with_two_messages() {
    let manager = manager_with(ScriptedAgent::replying("The current time is 2025-01-01 12:00:00"));

    let task = manager
        .on_send_task(user_send("t1", "s1", "what time is it?"))
        .await
        .unwrap();

    assert_eq!(task.status.state, TaskState::Completed);
    assert_eq!(task.messages.len(), 2);
    assert_eq!(task.messages[0].role, Role::User);
    assert_eq!(task.messages[0].text(), "what time is it?");
    assert_eq!(task.messages[1].role, Role::Agent);
    assert!(task.messages[1].text().contains("current time"));
}

#[tokio::test]
async fn test_first_send_returns_terminal_state() {
    for agent in [ScriptedAgent::echo(), ScriptedAgent::failing("boom")] {
        let manager = manager_with(agent);
        let task = manager.on_send_task(user_send("t1", "s1", "hi")).await.unwrap();
        assert!(task.status.state.is_terminal());
    }
}

#[tokio::test]
async fn test_terminal_task_rejects_further_input_and_keeps_history() {
    let manager = manager_with(ScriptedAgent::echo());
    let first = manager.on_send_task(user_send("t1", "s1", "one")).await.unwrap();

    let err = manager
        .on_send_task(user_send("t1", "s1", "two"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), -32002);
    assert!(matches!(err, A2aError::InvalidTaskState { .. }));

    let stored = manager
        .on_get_task(TaskQueryParams {
            task_id: "t1".to_string(),
            history_length: None,
        })
        .await
        .unwrap();
    assert_eq!(stored.messages, first.messages);
}

#[tokio::test]
async fn test_failed_task_also_rejects_input() {
    let manager = manager_with(ScriptedAgent::failing("upstream down"));
    let task = manager.on_send_task(user_send("t1", "s1", "hi")).await.unwrap();
    assert_eq!(task.status.state, TaskState::Failed);

    let err = manager
        .on_send_task(user_send("t1", "s1", "again"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        A2aError::InvalidTaskState {
            state: TaskState::Failed,
            ..
        }
    ));
}

#[tokio::test]
async fn test_open_task_grows_by_two_messages_per_call() {
    let calls = 5;
    let manager = manager_with(ScriptedAgent::open_for(calls - 1));

    for i in 0..calls {
        let task = manager
            .on_send_task(user_send("t1", "s1", &format!("turn {i}")))
            .await
            .unwrap();
        assert_eq!(task.messages.len(), 2 * (i + 1));
    }

    let task = manager
        .on_get_task(TaskQueryParams {
            task_id: "t1".to_string(),
            history_length: None,
        })
        .await
        .unwrap();
    assert_eq!(task.status.state, TaskState::Completed);
    assert_eq!(task.messages.len(), 2 * calls);

    for (i, pair) in task.messages.chunks(2).enumerate() {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[0].text(), format!("turn {i}"));
        assert_eq!(pair[1].role, Role::Agent);
        assert_eq!(pair[1].text(), format!("echo: turn {i}"));
    }
}

#[tokio::test]
async fn test_agent_sees_full_history() {
    let agent = Arc::new(ScriptedAgent::open_for(10));
    let manager = TaskManager::new(
        Arc::new(InMemoryTaskStore::new()),
        agent.clone(),
        Duration::from_secs(5),
    );

    for text in ["a", "b", "c"] {
        manager.on_send_task(user_send("t1", "s1", text)).await.unwrap();
    }

    assert_eq!(agent.history_lengths(), vec![1, 3, 5]);
}

#[tokio::test]
async fn test_session_mismatch_is_rejected() {
    let manager = manager_with(ScriptedAgent::open_for(10));
    manager.on_send_task(user_send("t1", "s1", "hi")).await.unwrap();

    let err = manager
        .on_send_task(user_send("t1", "other-session", "hi"))
        .await
        .unwrap_err();
    assert_eq!(err.code(), -32602);
}

#[tokio::test]
async fn test_concurrent_distinct_tasks_do_not_cross_contaminate() {
    let manager = manager_with(ScriptedAgent::echo().with_delay(Duration::from_millis(20)));

    let sends = (0..20).map(|i| {
        let manager = manager.clone();
        async move {
            manager
                .on_send_task(user_send(&format!("task-{i}"), "s1", &format!("message {i}")))
                .await
        }
    });
    let results = futures::future::join_all(sends).await;

    for (i, result) in results.into_iter().enumerate() {
        let task = result.unwrap();
        assert_eq!(task.id, format!("task-{i}"));
        assert_eq!(task.status.state, TaskState::Completed);
        assert_eq!(task.messages.len(), 2);
        assert_eq!(task.messages[0].text(), format!("message {i}"));
        assert_eq!(task.messages[1].text(), format!("echo: message {i}"));
    }

    assert_eq!(manager.store().task_count().await, 20);
}

#[tokio::test]
async fn test_concurrent_sends_to_same_task_are_serialized() {
    let n = 8;
    let agent = Arc::new(ScriptedAgent::open_for(100).with_delay(Duration::from_millis(10)));
    let manager = Arc::new(TaskManager::new(
        Arc::new(InMemoryTaskStore::new()),
        agent.clone(),
        Duration::from_secs(5),
    ));

    let handles: Vec<_> = (0..n)
        .map(|i| {
            let manager = manager.clone();
            tokio::spawn(async move {
                manager
                    .on_send_task(user_send("shared", "s1", &format!("m{i}")))
                    .await
            })
        })
        .collect();

    for result in futures::future::join_all(handles).await {
        result.unwrap().unwrap();
    }

    assert_eq!(manager.store().task_count().await, 1);
    let task = manager.store().get("shared").await.unwrap();
    assert_eq!(task.messages.len(), 2 * n);

    // Every agent reply directly follows the user message it answers
    for pair in task.messages.chunks(2) {
        assert_eq!(pair[0].role, Role::User);
        assert_eq!(pair[1].role, Role::Agent);
        assert_eq!(pair[1].text(), format!("echo: {}", pair[0].text()));
    }

    let mut lengths = agent.history_lengths();
    lengths.sort_unstable();
    let expected: Vec<usize> = (0..n).map(|i| 2 * i + 1).collect();
    assert_eq!(lengths, expected);
}

#[tokio::test]
async fn test_get_task_history_length() {
    let manager = manager_with(ScriptedAgent::open_for(10));
    for text in ["a", "b", "c"] {
        manager.on_send_task(user_send("t1", "s1", text)).await.unwrap();
    }

    let task = manager
        .on_get_task(TaskQueryParams {
            task_id: "t1".to_string(),
            history_length: Some(2),
        })
        .await
        .unwrap();
    let texts: Vec<String> = task.messages.iter().map(Message::text).collect();
    assert_eq!(texts, vec!["c", "echo: c"]);

    // Stored history is untouched by the trimmed view
    assert_eq!(manager.store().get("t1").await.unwrap().messages.len(), 6);
}
