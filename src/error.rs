//! Custom error types for the monitoring core.
//!
//! This module defines the primary error type, `MonitorError`, for the entire
//! application. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the failures the core can actually encounter:
//! configuration problems, link-open and mid-session I/O faults, and attempts
//! to use a transport the build does not support.
//!
//! Two things are deliberately *not* errors here:
//!
//! - **Malformed frames**: an unrecognized line from the hub is silently
//!   dropped by the parser. Bad data must never raise the alarm or surface a
//!   fault to the operator.
//! - **Disconnect-time failures**: closing an already-broken link handle is a
//!   no-op from the caller's point of view; teardown always succeeds, so no
//!   variant exists for it.
//!
//! By using `#[from]`, `MonitorError` can be seamlessly created from
//! underlying error types, simplifying error handling throughout the
//! application with the `?` operator.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type MonitorResult<T> = std::result::Result<T, MonitorError>;

/// Unified error type for the monitoring core.
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Configuration file or environment parsing failed.
    #[error("Configuration error: {0}")]
    Config(#[from] figment::Error),

    /// Configuration parsed but carries semantically invalid values.
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// General I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link could not be opened (device busy, permission denied,
    /// unreachable host). Sensor state is left untouched.
    #[error("Failed to open {kind} link to '{target}': {reason}")]
    TransportOpen {
        /// Transport strategy ("serial", "tcp", ...).
        kind: &'static str,
        /// Port path or host address.
        target: String,
        /// Underlying failure description.
        reason: String,
    },

    /// The link broke mid-session. Sensors hold their last-known values.
    #[error("Link read failed: {0}")]
    TransportRead(String),

    /// An operation required an open link.
    #[error("Link not connected")]
    NotConnected,

    /// Serial transport requested on a build without serial support.
    #[error("Serial support not enabled. Rebuild with --features transport_serial")]
    SerialFeatureDisabled,
}
