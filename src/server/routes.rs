//! warp filters for the HTTP surface
//!
//! JSON-RPC responses always go out as HTTP 200 with a JSON body, errors
//! included. Only transport problems (unknown path, wrong HTTP method,
//! oversized body) are answered with a 4xx status.
//!
//! Bodies sent without `Content-Length` (chunked) are accepted and measured
//! once read.

use super::dispatcher::Dispatcher;
use crate::observability::health::{self, HealthReporter};
use crate::protocol::agent_card::AgentCard;
use bytes::Bytes;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::Filter;

/// Largest accepted request body
pub const MAX_BODY_BYTES: u64 = 1024 * 1024;

/// `POST /` JSON-RPC endpoint
pub fn rpc(
    dispatcher: Dispatcher,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::path::end()
        .and(warp::post())
        .and(request_body())
        .and_then(move |body: Bytes| {
            let dispatcher = dispatcher.clone();
            async move {
                if body.len() as u64 > MAX_BODY_BYTES {
                    return Ok::<_, Infallible>(warp::reply::with_status(
                        warp::reply::json(&serde_json::json!({ "error": "Payload too large" })),
                        StatusCode::PAYLOAD_TOO_LARGE,
                    ));
                }
                let response = dispatcher.handle(&body).await;
                Ok(warp::reply::with_status(
                    warp::reply::json(&response),
                    StatusCode::OK,
                ))
            }
        })
}

/// Request body, refused up front when the declared length is over the cap
fn request_body() -> impl Filter<Extract = (Bytes,), Error = warp::Rejection> + Clone {
    let declared = warp::body::content_length_limit(MAX_BODY_BYTES).and(warp::body::bytes());
    let chunked = warp::header::optional::<String>("content-length")
        .and_then(|length: Option<String>| async move {
            match length {
                None => Ok::<_, warp::Rejection>(()),
                Some(_) => Err(warp::reject::not_found()),
            }
        })
        .untuple_one()
        .and(warp::body::bytes());

    declared.or(chunked).unify()
}

/// `GET /.well-known/agent.json`
pub fn agent_card(
    card: Arc<AgentCard>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::path(".well-known")
        .and(warp::path("agent.json"))
        .and(warp::path::end())
        .and(warp::get())
        .map(move || warp::reply::json(card.as_ref()))
}

/// Every route the server exposes
pub fn all(
    dispatcher: Dispatcher,
    card: AgentCard,
    reporter: HealthReporter,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    rpc(dispatcher)
        .or(agent_card(Arc::new(card)))
        .or(health::routes(reporter))
        .with(
            warp::cors()
                .allow_any_origin()
                .allow_methods(vec!["GET", "POST"])
                .allow_header("content-type"),
        )
        .with(warp::trace::request())
}
