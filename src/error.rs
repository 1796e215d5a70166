//! Engine-level error taxonomy.
//!
//! Per-tool failures never reach this type — they are captured as data in
//! [`crate::types::ToolResult`]. `EngineError` is reserved for failures that
//! terminate the whole request: transport problems talking to the model,
//! cooperative cancellation, and invariant violations that should not be
//! able to happen.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level error type for the agentic loop and its collaborators.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The LLM provider returned a transport or protocol-level failure.
    #[error("provider error: {message}")]
    Provider {
        /// Human-readable description of the failure.
        message: String,
        /// Classification used to decide the `error` event's `errorType`.
        kind: ProviderErrorKind,
        /// Whether retrying the request is expected to succeed.
        retryable: bool,
        /// Seconds to wait before retrying, if known (e.g. from a `Retry-After` header).
        retry_after: Option<u64>,
    },

    /// The caller's abort signal fired.
    #[error("stream aborted")]
    Abort,

    /// An invariant the engine relies on was violated. Indicates a bug.
    #[error("internal invariant violated: {0}")]
    Internal(String),

    /// Environment configuration could not be parsed at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of provider-side failures, used to populate the
/// `error` event's `errorType`/`retryable`/`retryAfter` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    AuthError,
    RateLimit,
    ServiceError,
    Timeout,
    NetworkError,
    ApiError,
}

impl ProviderErrorKind {
    /// Maps an HTTP-style status code to a provider error kind, per the
    /// classification table in the error-handling design.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::AuthError,
            429 => Self::RateLimit,
            500..=599 => Self::ServiceError,
            _ => Self::ApiError,
        }
    }

    /// Whether a failure of this kind is worth retrying. `ApiError` only
    /// ever arises from a status code below 500 (the catch-all arm of
    /// `from_status`), so it is never retryable.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimit | Self::ServiceError | Self::Timeout | Self::NetworkError)
    }

    /// The wire-facing string used in the `error` event's `errorType` field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthError => "auth_error",
            Self::RateLimit => "rate_limit",
            Self::ServiceError => "service_error",
            Self::Timeout => "timeout",
            Self::NetworkError => "network_error",
            Self::ApiError => "api_error",
        }
    }
}

impl EngineError {
    /// Builds a [`EngineError::Provider`] from an HTTP-style status code.
    #[must_use]
    pub fn provider_from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = ProviderErrorKind::from_status(status);
        Self::Provider {
            message: message.into(),
            retryable: kind.is_retryable(),
            retry_after: None,
            kind,
        }
    }

    /// Builds a [`EngineError::Provider`] for a transport-level timeout or
    /// connection failure (no status code available).
    #[must_use]
    pub fn provider_transport(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self::Provider {
            message: message.into(),
            retryable: kind.is_retryable(),
            retry_after: None,
            kind,
        }
    }
}
