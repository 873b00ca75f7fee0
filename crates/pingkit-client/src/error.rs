//! Error taxonomy for the harness.
//!
//! Every failure surfaces directly on the invocation's exit path: nothing
//! here is retried and nothing is swallowed. The one exception lives in the
//! telemetry pipeline, where span-export delivery failures are logged by the
//! exporter and never reach the caller.

use miette::Diagnostic;
use thiserror::Error;

/// Convenience alias used throughout the harness.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors raised while dispatching an action.
#[derive(Debug, Error, Diagnostic)]
pub enum ClientError {
    /// The command line did not name a known action.
    ///
    /// Raised before any resource is touched; no channel is opened and no
    /// network activity occurs.
    #[error("{message}")]
    #[diagnostic(
        code(pingkit::usage),
        help("valid actions: ping, sum, generate, count, hardfail")
    )]
    Usage {
        /// Description of the problem.
        message: String,
    },

    /// The CA certificate could not be read or is not certificate material.
    #[error("certificate `{path}` could not be used: {message}")]
    #[diagnostic(code(pingkit::credential))]
    Credential {
        /// Path of the offending certificate file.
        path: String,
        /// Description of the problem.
        message: String,
    },

    /// The endpoint is not a valid URI.
    #[error("invalid endpoint `{endpoint}`: {message}")]
    #[diagnostic(code(pingkit::connection))]
    InvalidEndpoint {
        /// The endpoint as configured.
        endpoint: String,
        /// Description of the problem.
        message: String,
    },

    /// The encrypted transport could not be established.
    ///
    /// Channels connect lazily, so this surfaces on the first call that
    /// actually needs the connection rather than at channel setup.
    #[error("failed to establish channel: {message}")]
    #[diagnostic(code(pingkit::connection))]
    Connection {
        /// Description of the problem.
        message: String,
    },

    /// The remote call failed or was rejected.
    #[error("rpc failed: {0}")]
    #[diagnostic(code(pingkit::rpc))]
    Rpc(tonic::Status),

    /// A streaming exchange terminated abnormally mid-sequence.
    #[error("stream terminated abnormally: {0}")]
    #[diagnostic(code(pingkit::stream))]
    Stream(tonic::Status),

    /// The tracing pipeline could not be initialized.
    #[error("tracing pipeline could not be initialized: {message}")]
    #[diagnostic(code(pingkit::telemetry))]
    Telemetry {
        /// Description of the problem.
        message: String,
    },
}

impl ClientError {
    /// Create a usage error for an unrecognized action name.
    pub fn unknown_action(name: impl AsRef<str>) -> Self {
        Self::Usage {
            message: format!("unknown action `{}`", name.as_ref()),
        }
    }

    /// Create a credential error for the given certificate path.
    pub fn credential(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Credential {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Wrap a status received mid-sequence on an established stream.
    #[must_use]
    pub const fn stream(status: tonic::Status) -> Self {
        Self::Stream(status)
    }
}

impl From<tonic::Status> for ClientError {
    fn from(status: tonic::Status) -> Self {
        // On a lazily connected channel a failed transport comes back as
        // an unavailable status on the first call.
        if status.code() == tonic::Code::Unavailable {
            Self::Connection {
                message: status.to_string(),
            }
        } else {
            Self::Rpc(status)
        }
    }
}
