//! Process-wide metrics
//!
//! Counters are atomics; keyed tallies and timing samples sit behind
//! mutexes. A [`MetricsSnapshot`] is what `GET /metrics` serves.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Samples kept per timing series
const MAX_TIMING_SAMPLES: usize = 1000;

pub static METRICS: Lazy<MetricsCollector> = Lazy::new(MetricsCollector::new);

/// Global metrics collector
pub fn metrics() -> &'static MetricsCollector {
    &METRICS
}

pub struct MetricsCollector {
    tasks_received: AtomicU64,
    tasks_created: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_input_required: AtomicU64,
    tasks_failed: AtomicU64,
    tasks_rejected: AtomicU64,
    invocations_in_flight: AtomicU64,
    invocation_timeouts: AtomicU64,
    invocation_times: Mutex<Vec<u64>>,

    rpc_requests: Mutex<BTreeMap<String, u64>>,
    rpc_errors: Mutex<BTreeMap<i32, u64>>,

    tool_calls: Mutex<BTreeMap<String, ToolCounters>>,

    started_at: AtomicU64,
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct ToolCounters {
    pub executions: u64,
    pub failures: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            tasks_received: AtomicU64::new(0),
            tasks_created: AtomicU64::new(0),
            tasks_completed: AtomicU64::new(0),
            tasks_input_required: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
            tasks_rejected: AtomicU64::new(0),
            invocations_in_flight: AtomicU64::new(0),
            invocation_timeouts: AtomicU64::new(0),
            invocation_times: Mutex::new(Vec::new()),
            rpc_requests: Mutex::new(BTreeMap::new()),
            rpc_errors: Mutex::new(BTreeMap::new()),
            tool_calls: Mutex::new(BTreeMap::new()),
            started_at: AtomicU64::new(current_timestamp()),
        }
    }

    pub fn task_received(&self) {
        self.tasks_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn task_created(&self) {
        self.tasks_created.fetch_add(1, Ordering::Relaxed);
    }

    /// Send on a terminal task or with invalid params
    pub fn task_rejected(&self) {
        self.tasks_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn invocation_started(&self) {
        self.invocations_in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub fn invocation_completed(&self, duration: Duration, task_complete: bool) {
        if task_complete {
            self.tasks_completed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.tasks_input_required.fetch_add(1, Ordering::Relaxed);
        }
        self.invocation_finished(duration);
    }

    pub fn invocation_failed(&self, duration: Duration, timed_out: bool) {
        self.tasks_failed.fetch_add(1, Ordering::Relaxed);
        if timed_out {
            self.invocation_timeouts.fetch_add(1, Ordering::Relaxed);
        }
        self.invocation_finished(duration);
    }

    fn invocation_finished(&self, duration: Duration) {
        // saturating: a reset() between start and finish must not wrap
        let _ = self
            .invocations_in_flight
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                Some(n.saturating_sub(1))
            });

        if let Ok(mut times) = self.invocation_times.lock() {
            times.push(duration.as_millis() as u64);
            if times.len() > MAX_TIMING_SAMPLES {
                times.remove(0);
            }
        }
    }

    pub fn rpc_request(&self, method: &str) {
        if let Ok(mut requests) = self.rpc_requests.lock() {
            *requests.entry(method.to_string()).or_insert(0) += 1;
        }
    }

    pub fn rpc_error(&self, code: i32) {
        if let Ok(mut errors) = self.rpc_errors.lock() {
            *errors.entry(code).or_insert(0) += 1;
        }
    }

    pub fn tool_executed(&self, tool_name: &str, success: bool) {
        if let Ok(mut tools) = self.tool_calls.lock() {
            let counters = tools.entry(tool_name.to_string()).or_default();
            counters.executions += 1;
            if !success {
                counters.failures += 1;
            }
        }
    }

    /// Seconds since the collector was created or last reset
    pub fn uptime_seconds(&self) -> u64 {
        current_timestamp().saturating_sub(self.started_at.load(Ordering::Relaxed))
    }

    pub fn reset(&self) {
        for counter in [
            &self.tasks_received,
            &self.tasks_created,
            &self.tasks_completed,
            &self.tasks_input_required,
            &self.tasks_failed,
            &self.tasks_rejected,
            &self.invocations_in_flight,
            &self.invocation_timeouts,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        if let Ok(mut times) = self.invocation_times.lock() {
            times.clear();
        }
        if let Ok(mut requests) = self.rpc_requests.lock() {
            requests.clear();
        }
        if let Ok(mut errors) = self.rpc_errors.lock() {
            errors.clear();
        }
        if let Ok(mut tools) = self.tool_calls.lock() {
            tools.clear();
        }
        self.started_at.store(current_timestamp(), Ordering::Relaxed);
    }

    fn invocation_statistics(&self) -> (f64, f64, f64) {
        let Ok(times) = self.invocation_times.lock() else {
            return (0.0, 0.0, 0.0);
        };
        if times.is_empty() {
            return (0.0, 0.0, 0.0);
        }

        let mut sorted = times.clone();
        sorted.sort_unstable();
        let avg = sorted.iter().sum::<u64>() as f64 / sorted.len() as f64;
        (avg, percentile(&sorted, 50.0), percentile(&sorted, 95.0))
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let (avg, p50, p95) = self.invocation_statistics();

        MetricsSnapshot {
            tasks: TaskMetrics {
                received: self.tasks_received.load(Ordering::Relaxed),
                created: self.tasks_created.load(Ordering::Relaxed),
                completed: self.tasks_completed.load(Ordering::Relaxed),
                input_required: self.tasks_input_required.load(Ordering::Relaxed),
                failed: self.tasks_failed.load(Ordering::Relaxed),
                rejected: self.tasks_rejected.load(Ordering::Relaxed),
            },
            invocations: InvocationMetrics {
                in_flight: self.invocations_in_flight.load(Ordering::Relaxed),
                timeouts: self.invocation_timeouts.load(Ordering::Relaxed),
                avg_duration_ms: avg,
                p50_duration_ms: p50,
                p95_duration_ms: p95,
            },
            rpc: RpcMetrics {
                requests_by_method: self
                    .rpc_requests
                    .lock()
                    .map(|m| m.clone())
                    .unwrap_or_default(),
                errors_by_code: self
                    .rpc_errors
                    .lock()
                    .map(|m| m.iter().map(|(code, n)| (code.to_string(), *n)).collect())
                    .unwrap_or_default(),
            },
            tools: self
                .tool_calls
                .lock()
                .map(|m| m.clone())
                .unwrap_or_default(),
            uptime_seconds: self.uptime_seconds(),
            timestamp: current_timestamp(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub tasks: TaskMetrics,
    pub invocations: InvocationMetrics,
    pub rpc: RpcMetrics,
    pub tools: BTreeMap<String, ToolCounters>,
    pub uptime_seconds: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskMetrics {
    pub received: u64,
    pub created: u64,
    pub completed: u64,
    pub input_required: u64,
    pub failed: u64,
    pub rejected: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct InvocationMetrics {
    pub in_flight: u64,
    pub timeouts: u64,
    pub avg_duration_ms: f64,
    pub p50_duration_ms: f64,
    pub p95_duration_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RpcMetrics {
    pub requests_by_method: BTreeMap<String, u64>,
    /// Keyed by the JSON-RPC error code as a string
    pub errors_by_code: BTreeMap<String, u64>,
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn percentile(sorted_data: &[u64], percentile: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }

    let index = (percentile / 100.0) * (sorted_data.len() - 1) as f64;
    let lower = sorted_data[index.floor() as usize] as f64;
    let upper = sorted_data[index.ceil() as usize] as f64;
    lower + (upper - lower) * index.fract()
}
