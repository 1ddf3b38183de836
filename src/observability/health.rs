//! Health, liveness and metrics endpoints
//!
//! Mounted next to the JSON-RPC endpoint on the same listener:
//!
//! - `GET /health`: overall status with individual checks, 503 when degraded
//! - `GET /live`: liveness probe, always 200 while the process serves requests
//! - `GET /metrics`: [`MetricsSnapshot`](super::metrics::MetricsSnapshot) as JSON

use crate::observability::metrics::{metrics, MetricsSnapshot};
use crate::task::TaskStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use warp::http::StatusCode;
use warp::Filter;

/// Finished invocations needed before the failure ratio is judged
const MIN_INVOCATIONS_FOR_RATIO: u64 = 5;

/// Builds health reports from the task store and global metrics
#[derive(Clone)]
pub struct HealthReporter {
    agent_name: String,
    store: Arc<dyn TaskStore>,
}

impl HealthReporter {
    pub fn new(agent_name: impl Into<String>, store: Arc<dyn TaskStore>) -> Self {
        Self {
            agent_name: agent_name.into(),
            store,
        }
    }

    pub async fn health_status(&self) -> HealthStatus {
        let snapshot = metrics().snapshot();
        let task_count = self.store.task_count().await;

        let mut checks = BTreeMap::new();
        checks.insert(
            "task_store".to_string(),
            HealthCheck::healthy(format!("{task_count} tasks held")),
        );
        checks.insert("agent".to_string(), Self::agent_check(&snapshot));

        let status = if checks.values().all(|c| c.status == "healthy") {
            "healthy"
        } else {
            "degraded"
        };

        HealthStatus {
            status: status.to_string(),
            agent: self.agent_name.clone(),
            uptime_seconds: snapshot.uptime_seconds,
            tasks: task_count,
            invocations_in_flight: snapshot.invocations.in_flight,
            checks,
            timestamp: current_timestamp(),
        }
    }

    /// Degraded when more than half of all finished agent invocations failed
    fn agent_check(snapshot: &MetricsSnapshot) -> HealthCheck {
        let failed = snapshot.tasks.failed;
        let finished = failed + snapshot.tasks.completed + snapshot.tasks.input_required;

        if finished >= MIN_INVOCATIONS_FOR_RATIO && failed * 2 > finished {
            HealthCheck {
                status: "degraded".to_string(),
                message: Some(format!("{failed} of {finished} agent invocations failed")),
            }
        } else {
            HealthCheck::healthy(format!("{finished} agent invocations finished"))
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthCheck {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthCheck {
    fn healthy(message: String) -> Self {
        Self {
            status: "healthy".to_string(),
            message: Some(message),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub agent: String,
    pub uptime_seconds: u64,
    pub tasks: usize,
    pub invocations_in_flight: u64,
    pub checks: BTreeMap<String, HealthCheck>,
    pub timestamp: u64,
}

#[derive(Debug, Serialize)]
struct LivenessResponse {
    alive: bool,
    timestamp: u64,
}

/// `/health`, `/live` and `/metrics` filters
pub fn routes(
    reporter: HealthReporter,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let health_route = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(move || {
            let reporter = reporter.clone();
            async move {
                let status = reporter.health_status().await;
                let code = if status.status == "healthy" {
                    StatusCode::OK
                } else {
                    StatusCode::SERVICE_UNAVAILABLE
                };
                Ok::<_, Infallible>(warp::reply::with_status(warp::reply::json(&status), code))
            }
        });

    let live_route = warp::path("live")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| {
            warp::reply::json(&LivenessResponse {
                alive: true,
                timestamp: current_timestamp(),
            })
        });

    let metrics_route = warp::path("metrics")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&metrics().snapshot()));

    health_route.or(live_route).or(metrics_route)
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
