//! End-to-end tests of the time-telling agent
//!
//! The real `LlmAgent` with the builtin `current_time` tool, driven through
//! the HTTP routes with either a mock provider or the OpenAI provider pointed
//! at a wiremock server.


use a2a_agent::agent::LlmAgent;
use a2a_agent::llm::{LlmProvider, OpenAiConfig, OpenAiProvider, ToolCall};
use a2a_agent::server::A2aServer;
use a2a_agent::task::InMemoryTaskStore;
use a2a_agent::testing::MockLlmProvider;
use a2a_agent::tools::ToolSystem;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use test_helpers::{send_request, test_config};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn time_server(provider: Arc<dyn LlmProvider>) -> A2aServer {
    let config = test_config();
    let mut tools = ToolSystem::new();
    tools.initialize(&config.tools).await.unwrap();

    let agent = LlmAgent::new(
        config.agent.name.clone(),
        config.llm.clone(),
        provider,
        Arc::new(tools),
        config.tasks.max_tool_iterations,
    );
    A2aServer::new(&config, Arc::new(agent), Arc::new(InMemoryTaskStore::new())).unwrap()
}

async fn send(server: &A2aServer, text: &str) -> Value {
    let response = warp::test::request()
        .method("POST")
        .path("/")
        .json(&send_request(json!(1), "t1", text))
        .reply(&server.routes())
        .await;
    assert_eq!(response.status(), 200);
    serde_json::from_slice(response.body()).unwrap()
}

#[tokio::test]
async fn test_tool_call_then_answer() {
    let provider = Arc::new(
        MockLlmProvider::single_response("The current time is 12:00:00.").with_tool_calls(vec![
            ToolCall {
                id: "call_1".to_string(),
                name: "current_time".to_string(),
                arguments: json!({}),
            },
        ]),
    );
    let server = time_server(provider.clone()).await;

    let body = send(&server, "What time is it?").await;
    assert_eq!(body["result"]["status"], "COMPLETED");
    assert_eq!(body["result"]["messages"].as_array().unwrap().len(), 2);
    assert_eq!(
        body["result"]["messages"][1]["parts"][0]["text"],
        "The current time is 12:00:00."
    );

    assert_eq!(provider.call_count(), 2);
    let last = provider.last_request().unwrap();
    let tool_turn = &last.messages.last().unwrap().content;
    assert!(tool_turn.starts_with("Tool results:"));
    assert!(tool_turn.contains("current_time"));
    assert!(tool_turn.contains("unix_timestamp"));
    assert_eq!(last.tools.len(), 1);
    assert_eq!(last.tools[0].name, "current_time");
}

#[tokio::test]
async fn test_provider_failure_yields_failed_task() {
    let server = time_server(Arc::new(MockLlmProvider::with_failure())).await;

    let body = send(&server, "What time is it?").await;
    assert!(body.get("error").is_none());
    assert_eq!(body["result"]["status"], "FAILED");
    assert_eq!(body["result"]["error"]["code"], -32003);
    assert_eq!(body["result"]["messages"][1]["role"], "agent");
    assert!(body["result"]["messages"][1]["parts"][0]["text"]
        .as_str()
        .unwrap()
        .starts_with("Agent invocation failed"));
}

#[tokio::test]
async fn test_runaway_tool_loop_fails_task() {
    let provider = Arc::new(MockLlmProvider::always_calling_tool("current_time"));
    let server = time_server(provider.clone()).await;

    let body = send(&server, "What time is it?").await;
    assert_eq!(body["result"]["status"], "FAILED");
    assert_eq!(provider.call_count(), test_config().tasks.max_tool_iterations);
}

#[tokio::test]
async fn test_openai_backend_end_to_end() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("Tool results"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "It is 08:00 UTC."},
                "finish_reason": "stop"
            }]
        })))
        .with_priority(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "current_time", "arguments": "{\"utc\": true}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }]
        })))
        .with_priority(2)
        .mount(&mock_server)
        .await;

    let provider = OpenAiProvider::new(OpenAiConfig {
        api_key: "test-api-key".to_string(),
        base_url: mock_server.uri(),
        timeout: Duration::from_secs(5),
    })
    .unwrap();
    let server = time_server(Arc::new(provider)).await;

    let body = send(&server, "What time is it in UTC?").await;
    assert_eq!(body["result"]["status"], "COMPLETED");
    assert_eq!(
        body["result"]["messages"][1]["parts"][0]["text"],
        "It is 08:00 UTC."
    );
    assert_eq!(mock_server.received_requests().await.unwrap().len(), 2);
}
