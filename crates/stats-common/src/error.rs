//! Error types for the Stats controller
//!
//! Errors carry the resource kind or object name they relate to so a failed
//! reconciliation can be traced from the log line alone.

use thiserror::Error;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for Stats operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error outside of listing or status writes
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Cluster-wide enumeration of one resource kind failed
    #[error("failed to list {kind}: {source}")]
    List {
        /// Resource kind being listed (e.g. "Pod", "Deployment")
        kind: String,
        /// The underlying kube-rs error
        source: kube::Error,
    },

    /// Writing the status sub-resource failed (including version conflicts)
    #[error("failed to update status of {name}: {source}")]
    StatusUpdate {
        /// Namespaced name of the Stats object
        name: String,
        /// The underlying kube-rs error
        source: kube::Error,
    },

    /// Serialization/deserialization error
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of what failed
        message: String,
    },

    /// Reconciliation was aborted by a cancellation signal
    #[error("reconciliation cancelled during {stage}")]
    Cancelled {
        /// Step that was running or about to run when cancellation was observed
        stage: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred
        context: String,
    },
}

impl Error {
    /// Create a listing error for the given resource kind
    pub fn list(kind: impl Into<String>, source: kube::Error) -> Self {
        Self::List {
            kind: kind.into(),
            source,
        }
    }

    /// Create a status update error for the given object
    pub fn status_update(name: impl Into<String>, source: kube::Error) -> Self {
        Self::StatusUpdate {
            name: name.into(),
            source,
        }
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization {
            message: msg.into(),
        }
    }

    /// Create a cancellation error for the given stage
    pub fn cancelled(stage: impl Into<String>) -> Self {
        Self::Cancelled {
            stage: stage.into(),
        }
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// The underlying kube error, if any
    pub fn kube_source(&self) -> Option<&kube::Error> {
        match self {
            Error::Kube { source } => Some(source),
            Error::List { source, .. } => Some(source),
            Error::StatusUpdate { source, .. } => Some(source),
            _ => None,
        }
    }

    /// True when the API server answered 404 Not Found
    pub fn is_not_found(&self) -> bool {
        self.api_code() == Some(404)
    }

    /// True when the API server rejected a write with 409 Conflict
    pub fn is_conflict(&self) -> bool {
        self.api_code() == Some(409)
    }

    /// True when this error represents an aborted attempt rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled { .. })
    }

    /// Check if this error is retryable
    ///
    /// API errors are all retried: permission problems and timeouts look the
    /// same to the backoff loop. Only encoding failures are permanent.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Error::Serialization { .. })
    }

    /// Short label used for the `error_type` metric attribute
    pub fn metric_label(&self) -> &'static str {
        match self {
            Error::Kube { .. } => "kube",
            Error::List { .. } => "list",
            Error::StatusUpdate { .. } => "status_update",
            Error::Cancelled { .. } => "cancelled",
            Error::Serialization { .. } | Error::Internal { .. } => "other",
        }
    }

    fn api_code(&self) -> Option<u16> {
        match self.kube_source() {
            Some(kube::Error::Api(ae)) => Some(ae.code),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::serialization(e.to_string())
    }
}
