// MetriSight remote source - Prometheus-compatible range queries

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod query;
pub mod retry;
mod wire;

pub use auth::Auth;
pub use client::{ConnectionStatus, PrometheusClient, query_range, test_connection};
pub use config::SourceConfig;
pub use error::{ErrorKind, NetworkErrorKind, SourceError};
pub use query::QuerySpec;
pub use retry::RetryPolicy;
