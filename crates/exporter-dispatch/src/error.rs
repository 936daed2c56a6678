//! Error types for the dispatcher.

use exporter_metrics::MetricsError;
use thiserror::Error;

/// Result type alias for dispatcher operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Errors that can occur while dispatching telemetry events.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No collector is subscribed, the event went nowhere.
    #[error("no collectors registered")]
    NoCollectors,

    /// The dispatcher has been shut down.
    #[error("dispatcher is shut down")]
    Closed,

    /// The dispatcher configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Registering a metric failed.
    #[error(transparent)]
    Metrics(#[from] MetricsError),
}
