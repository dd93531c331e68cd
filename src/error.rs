//! Error taxonomy for the provisioning core.
//!
//! [`RemoteError`] is the shape the transport layer reports; the builders,
//! waiter and power controller translate it into [`ProvisionError`], the single
//! terminal error a caller ever sees.

use thiserror::Error;

use crate::config::ConfigError;

/// HTTP status the remote API uses for "resource busy" conflicts.
pub const HTTP_CONFLICT: u16 = 409;

/// HTTP status the remote API uses for missing resources.
pub const HTTP_NOT_FOUND: u16 = 404;

/// API error code returned while a freshly created resource is still being
/// provisioned.
pub const STILL_CREATING_CODE: &str = "still_creating";

/// Errors reported by a remote operation port.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RemoteError {
    /// Raised when the referenced resource does not exist.
    #[error("{resource} {id} not found")]
    NotFound {
        /// Kind of resource that was looked up.
        resource: String,
        /// Identifier that was looked up.
        id: String,
    },
    /// Raised when the API answers with an error status.
    #[error("API error (HTTP {status}, code {code}): {message}")]
    Api {
        /// HTTP status code of the response.
        status: u16,
        /// API-level error code (for example `still_creating`).
        code: String,
        /// Message returned by the API.
        message: String,
    },
    /// Raised for anything the transport cannot classify.
    #[error("transport error: {0}")]
    Transport(String),
}

impl RemoteError {
    /// Builds a [`RemoteError::NotFound`].
    #[must_use]
    pub fn not_found(resource: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.to_string(),
        }
    }

    /// Builds a [`RemoteError::Api`].
    #[must_use]
    pub fn api(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for a read miss, whether reported as a dedicated variant
    /// or as a bare HTTP 404.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Api { status, .. } => *status == HTTP_NOT_FOUND,
            Self::Transport(_) => false,
        }
    }

    /// Returns `true` for any HTTP 409 response.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Api { status, .. } if *status == HTTP_CONFLICT)
    }

    /// Returns `true` only for HTTP 409 carrying the `still_creating` code,
    /// the sole conflict the power controller retries.
    #[must_use]
    pub fn is_still_creating(&self) -> bool {
        matches!(
            self,
            Self::Api { status, code, .. }
                if *status == HTTP_CONFLICT && code == STILL_CREATING_CODE
        )
    }
}

/// Errors raised while validating, building or updating resources.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ProvisionError {
    /// Raised by pre-flight checks; no mutating call has been issued.
    #[error("invalid {resource} parameters: {message}")]
    Validation {
        /// Resource family being validated.
        resource: String,
        /// Description of the violated constraint.
        message: String,
    },
    /// Raised when a referenced resource does not exist.
    #[error("{resource} {id} not found")]
    NotFound {
        /// Kind of resource that was looked up.
        resource: String,
        /// Identifier that was looked up.
        id: String,
    },
    /// Raised when the remote reports a state that can never be valid, such
    /// as a disk naming itself as its own source.
    #[error("invalid state of {resource} {id}: {message}")]
    InvalidState {
        /// Kind of resource in the invalid state.
        resource: String,
        /// Identifier of the resource.
        id: String,
        /// Description of the inconsistency.
        message: String,
    },
    /// Raised when a wait loop or retry budget is exhausted.
    #[error("timed out waiting for {action}: deadline exceeded")]
    Timeout {
        /// Action being waited on.
        action: String,
    },
    /// Raised when the caller's context deadline elapses.
    #[error("context deadline exceeded during {action}")]
    DeadlineExceeded {
        /// Action in progress when the deadline elapsed.
        action: String,
    },
    /// Raised when the caller cancels the context.
    #[error("cancelled during {action}")]
    Cancelled {
        /// Action in progress when the context was cancelled.
        action: String,
    },
    /// Wrapper for fatal remote failures.
    #[error("{operation} failed: {source}")]
    Remote {
        /// Operation that failed.
        operation: String,
        /// Error reported by the port.
        #[source]
        source: RemoteError,
    },
    /// Raised when timing configuration cannot be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ProvisionError {
    /// Builds a [`ProvisionError::Validation`].
    #[must_use]
    pub fn validation(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            resource: resource.into(),
            message: message.into(),
        }
    }

    /// Builds a [`ProvisionError::InvalidState`].
    #[must_use]
    pub fn invalid_state(
        resource: impl Into<String>,
        id: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidState {
            resource: resource.into(),
            id: id.to_string(),
            message: message.into(),
        }
    }

    /// Translates a port error raised during `operation`. Read misses become
    /// [`ProvisionError::NotFound`]; everything else is fatal.
    #[must_use]
    pub fn remote(operation: impl Into<String>, source: RemoteError) -> Self {
        match source {
            RemoteError::NotFound { resource, id } => Self::NotFound { resource, id },
            other => Self::Remote {
                operation: operation.into(),
                source: other,
            },
        }
    }

    /// Returns `true` for read misses.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Remote { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Returns `true` when the error stems from a deadline: an exhausted wait
    /// or retry budget, or an expired context.
    #[must_use]
    pub const fn is_deadline_exceeded(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::DeadlineExceeded { .. })
    }

    /// Returns `true` only for an exhausted wait or retry budget.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Returns `true` when the caller cancelled the context.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Attaches the failing operation to a port result.
pub(crate) trait RemoteResultExt<T> {
    /// Converts the port error with [`ProvisionError::remote`].
    fn during(self, operation: &str) -> Result<T, ProvisionError>;
}

impl<T> RemoteResultExt<T> for Result<T, RemoteError> {
    fn during(self, operation: &str) -> Result<T, ProvisionError> {
        self.map_err(|err| ProvisionError::remote(operation, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(RemoteError::api(409, "still_creating", "busy"), true)]
    #[case(RemoteError::api(409, "busy", "busy"), false)]
    #[case(RemoteError::api(404, "not_found", "gone"), false)]
    #[case(RemoteError::api(500, "still_creating", "oops"), false)]
    #[case(RemoteError::Transport(String::from("reset")), false)]
    fn still_creating_requires_status_and_code(#[case] error: RemoteError, #[case] expected: bool) {
        assert_eq!(error.is_still_creating(), expected);
    }

    #[rstest]
    #[case(RemoteError::not_found("disk", 1), true)]
    #[case(RemoteError::api(404, "not_found", "gone"), true)]
    #[case(RemoteError::api(409, "still_creating", "busy"), false)]
    fn not_found_covers_variant_and_status(#[case] error: RemoteError, #[case] expected: bool) {
        assert_eq!(error.is_not_found(), expected);
    }

    #[test]
    fn remote_maps_read_miss_to_not_found() {
        let err = ProvisionError::remote("read disk", RemoteError::not_found("disk", 42));
        assert_eq!(
            err,
            ProvisionError::NotFound {
                resource: String::from("disk"),
                id: String::from("42"),
            }
        );
    }

    #[test]
    fn timeout_and_cancellation_are_distinguishable() {
        let timeout = ProvisionError::Timeout {
            action: String::from("boot"),
        };
        let cancelled = ProvisionError::Cancelled {
            action: String::from("boot"),
        };
        assert!(timeout.is_deadline_exceeded());
        assert!(timeout.is_timeout());
        assert!(!timeout.is_cancelled());
        assert!(cancelled.is_cancelled());
        assert!(!cancelled.is_deadline_exceeded());
        assert_eq!(
            timeout.to_string(),
            "timed out waiting for boot: deadline exceeded"
        );
    }
}
