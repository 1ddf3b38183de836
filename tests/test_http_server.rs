//! HTTP surface tests
//!
//! Drives the full warp filter stack with `warp::test`: JSON-RPC over
//! `POST /`, the agent card, health endpoints and transport-level rejections.


use a2a_agent::server::A2aServer;
use a2a_agent::task::InMemoryTaskStore;
use a2a_agent::testing::ScriptedAgent;
use serde_json::{json, Value};
use std::sync::Arc;
use test_helpers::{get_request, send_request, test_config};

fn server(agent: ScriptedAgent) -> A2aServer {
    A2aServer::new(
        &test_config(),
        Arc::new(agent),
        Arc::new(InMemoryTaskStore::new()),
    )
    .unwrap()
}

async fn post_json(server: &A2aServer, body: &str) -> (u16, Value) {
    let response = warp::test::request()
        .method("POST")
        .path("/")
        .header("content-type", "application/json")
        .body(body.to_string())
        .reply(&server.routes())
        .await;
    let status = response.status().as_u16();
    let body = serde_json::from_slice(response.body()).unwrap();
    (status, body)
}

#[tokio::test]
async fn test_send_task_over_http() {
    let server = server(ScriptedAgent::replying("It is 09:30."));
    let (status, body) = post_json(
        &server,
        &send_request(json!(7), "t1", "what time is it?").to_string(),
    )
    .await;

    assert_eq!(status, 200);
    assert_eq!(body["jsonrpc"], "2.0");
    assert_eq!(body["id"], 7);
    assert_eq!(body["result"]["taskId"], "t1");
    assert_eq!(body["result"]["sessionId"], "session-1");
    assert_eq!(body["result"]["status"], "COMPLETED");
    assert_eq!(body["result"]["messages"].as_array().unwrap().len(), 2);
    assert_eq!(body["result"]["messages"][1]["role"], "agent");
    assert_eq!(
        body["result"]["messages"][1]["parts"][0]["text"],
        "It is 09:30."
    );
}

#[tokio::test]
async fn test_errors_are_http_200() {
    let server = server(ScriptedAgent::echo());

    let (status, body) = post_json(&server, "{not json").await;
    assert_eq!(status, 200);
    assert_eq!(body["error"]["code"], -32700);
    assert!(body["id"].is_null());

    let (status, body) = post_json(
        &server,
        &json!({"jsonrpc": "2.0", "id": "abc", "method": "foo/bar", "params": {}}).to_string(),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["error"]["code"], -32601);
    assert_eq!(body["id"], "abc");

    let (status, body) = post_json(
        &server,
        &json!({"jsonrpc": "1.0", "id": 1, "method": "tasks/get"}).to_string(),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["error"]["code"], -32600);
    assert_eq!(body["id"], 1);
}

#[tokio::test]
async fn test_second_send_on_completed_task() {
    let server = server(ScriptedAgent::echo());
    post_json(&server, &send_request(json!(1), "t1", "first").to_string()).await;

    let (status, body) =
        post_json(&server, &send_request(json!(2), "t1", "second").to_string()).await;
    assert_eq!(status, 200);
    assert_eq!(body["id"], 2);
    assert_eq!(body["error"]["code"], -32002);

    let (_, body) = post_json(&server, &get_request(json!(3), "t1").to_string()).await;
    assert_eq!(body["result"]["messages"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_failed_agent_is_a_successful_response() {
    let server = server(ScriptedAgent::failing("model exploded"));
    let (status, body) = post_json(&server, &send_request(json!(1), "t1", "hi").to_string()).await;

    assert_eq!(status, 200);
    assert!(body.get("error").is_none());
    assert_eq!(body["result"]["status"], "FAILED");
    assert_eq!(body["result"]["error"]["code"], -32003);
    assert!(body["result"]["error"]["message"]
        .as_str()
        .unwrap()
        .contains("model exploded"));
}

#[tokio::test]
async fn test_agent_card() {
    let server = server(ScriptedAgent::echo());
    let response = warp::test::request()
        .method("GET")
        .path("/.well-known/agent.json")
        .reply(&server.routes())
        .await;

    assert_eq!(response.status(), 200);
    let card: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(card["name"], "TellTimeAgent");
    assert_eq!(card["url"], "http://127.0.0.1:10002/");
    assert_eq!(card["capabilities"]["streaming"], false);
    assert_eq!(card["capabilities"]["pushNotifications"], false);
    assert_eq!(card["skills"][0]["id"], "tell_time");
}

#[tokio::test]
async fn test_health_endpoint_reports_agent() {
    let server = server(ScriptedAgent::echo());
    let response = warp::test::request()
        .method("GET")
        .path("/health")
        .reply(&server.routes())
        .await;

    let body: Value = serde_json::from_slice(response.body()).unwrap();
    assert_eq!(body["agent"], "TellTimeAgent");
    assert!(body["checks"]["task_store"].is_object());
}

#[tokio::test]
async fn test_transport_errors_use_http_status() {
    let server = server(ScriptedAgent::echo());

    let not_found = warp::test::request()
        .method("GET")
        .path("/nope")
        .reply(&server.routes())
        .await;
    assert_eq!(not_found.status(), 404);

    let wrong_method = warp::test::request()
        .method("GET")
        .path("/")
        .reply(&server.routes())
        .await;
    assert_eq!(wrong_method.status(), 405);
}

#[tokio::test]
async fn test_oversized_body_rejected() {
    let server = server(ScriptedAgent::echo());
    let body = "x".repeat(2 * 1024 * 1024);

    let response = warp::test::request()
        .method("POST")
        .path("/")
        .body(body)
        .reply(&server.routes())
        .await;
    assert_eq!(response.status(), 413);
}

async fn raw_post(chunks: &[&str]) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let mut config = test_config();
    config.server.port = 0;
    let server = A2aServer::new(
        &config,
        Arc::new(ScriptedAgent::replying("It is 09:30.")),
        Arc::new(InMemoryTaskStore::new()),
    )
    .unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let (addr, serving) = server
        .bind_with_shutdown(async {
            rx.await.ok();
        })
        .unwrap();
    let handle = tokio::spawn(serving);

    let mut request = format!(
        "POST / HTTP/1.1\r\nHost: {addr}\r\nContent-Type: application/json\r\n\
         Transfer-Encoding: chunked\r\nConnection: close\r\n\r\n"
    );
    for chunk in chunks {
        request.push_str(&format!("{:x}\r\n{chunk}\r\n", chunk.len()));
    }
    request.push_str("0\r\n\r\n");

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    tx.send(()).ok();
    handle.await.unwrap();
    response
}

#[tokio::test]
async fn test_chunked_body_without_content_length() {
    let body = send_request(json!(7), "t1", "What time is it?").to_string();
    let (head, tail) = body.split_at(body.len() / 2);

    let response = raw_post(&[head, tail]).await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains("It is 09:30."));
    assert!(response.contains("COMPLETED"));
}

#[tokio::test]
async fn test_oversized_chunked_body_rejected() {
    let chunk = "x".repeat(256 * 1024);
    let chunks = vec![chunk.as_str(); 5];

    let response = raw_post(&chunks).await;
    assert!(response.starts_with("HTTP/1.1 413"), "{response}");
}
