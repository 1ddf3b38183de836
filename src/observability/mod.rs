//! Observability: structured logging, process metrics and health endpoints

pub mod health;
pub mod logging;
pub mod metrics;

pub use health::{HealthReporter, HealthStatus};
pub use logging::{init_default_logging, init_logging, LogFormat};
pub use metrics::{metrics, MetricsCollector, MetricsSnapshot};

pub use logging::{rpc_span, task_span};
