use thiserror::Error;

/// Broad classification of a [`ClientError`].
///
/// Callers use this to decide whether to retry, surface, or ignore a fault
/// without matching on every variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request could not be built. Caller bug, never worth retrying.
    MalformedRequest,
    /// Connection, DNS, TLS, or task failure below the HTTP layer.
    Transport,
    /// The server answered with a non-success status.
    HttpStatus,
    /// A payload could not be serialized or deserialized.
    Serialization,
}

/// Errors returned by glossary client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Base URL is not a valid absolute URL.
    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    /// Endpoint path could not be joined to the base URL.
    #[error("invalid endpoint path '{0}'")]
    InvalidPath(String),

    /// The requested operation id is not present in the route registry.
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    /// A required path template parameter was not provided, or was empty.
    #[error("missing required path parameter '{parameter}' for operation '{operation_id}'")]
    MissingPathParameter {
        operation_id: String,
        parameter: String,
    },

    /// A path parameter value that would change which resource is addressed.
    #[error("invalid value '{value}' for path parameter '{parameter}' of operation '{operation_id}'")]
    InvalidPathParameter {
        operation_id: String,
        parameter: String,
        value: String,
    },

    /// A required query parameter was not provided.
    #[error("missing required query parameter '{parameter}' for operation '{operation_id}'")]
    MissingQueryParameter {
        operation_id: String,
        parameter: String,
    },

    /// The supplied body does not match the body the route declares.
    #[error("operation '{operation_id}' expects body '{expected}', got '{found}'")]
    BodyMismatch {
        operation_id: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A caller-supplied header name or value is not valid HTTP.
    #[error("invalid header '{0}'")]
    InvalidHeader(String),

    /// The rendered path still contains a `{...}` marker.
    #[error("path '{path}' for operation '{operation_id}' has unresolved placeholders")]
    UnresolvedPath { operation_id: String, path: String },

    /// HTTP transport-layer request failure.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// A deferred invocation ended without producing a result.
    #[error("deferred invocation failed: {0}")]
    TaskFailed(String),

    /// The blocking client could not start its runtime.
    #[error("failed to start runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// Payload could not be encoded or parsed as JSON.
    #[error("failed to process JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Non-success HTTP status with the raw response payload.
    #[error("server returned status {status}: {}", String::from_utf8_lossy(.body))]
    HttpStatus {
        status: reqwest::StatusCode,
        body: Vec<u8>,
    },
}

impl ClientError {
    /// Returns the failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidBaseUrl(_)
            | Self::InvalidPath(_)
            | Self::UnknownOperation(_)
            | Self::MissingPathParameter { .. }
            | Self::InvalidPathParameter { .. }
            | Self::MissingQueryParameter { .. }
            | Self::BodyMismatch { .. }
            | Self::InvalidHeader(_)
            | Self::UnresolvedPath { .. } => ErrorKind::MalformedRequest,
            Self::Request(_) | Self::TaskFailed(_) | Self::Runtime(_) => ErrorKind::Transport,
            Self::HttpStatus { .. } => ErrorKind::HttpStatus,
            Self::Json(_) => ErrorKind::Serialization,
        }
    }

    /// Returns the status code for [`ErrorKind::HttpStatus`] faults.
    pub fn status(&self) -> Option<reqwest::StatusCode> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::Request(error) => error.status(),
            _ => None,
        }
    }

    /// Raw response body of an [`ErrorKind::HttpStatus`] fault.
    pub fn body(&self) -> Option<&[u8]> {
        match self {
            Self::HttpStatus { body, .. } => Some(body.as_slice()),
            _ => None,
        }
    }
}
