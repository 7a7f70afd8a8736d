//! Practice Growth Server
//!
//! HTTP endpoints for the growth operations, Prometheus metrics and health.

pub mod http;
pub mod metrics;
pub mod state;

pub use http::{create_router, ApiError};
pub use metrics::{init_metrics, metrics_handler, record_error, record_request};
pub use state::AppState;
