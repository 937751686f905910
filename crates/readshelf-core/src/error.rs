use thiserror::Error;

/// Upstream error body snippets are truncated to this many characters before
/// being attached to an [`Error::Upstream`].
pub const BODY_SNIPPET_MAX: usize = 500;

/// Error taxonomy for the proxy and cache layers.
#[derive(Debug, Error)]
pub enum Error {
    /// The backing API credential for a data source is missing; the affected
    /// endpoints answer with a fixed "not configured" response.
    #[error("{0} API not configured")]
    NotConfigured(String),

    /// Request parameters failed validation before any cache or network
    /// access.
    #[error("{0}")]
    Validation(String),

    /// A third-party API answered with a non-success status, after retries
    /// where the status was retryable.
    #[error("{message}")]
    Upstream {
        status: u16,
        message: String,
        body_snippet: String,
    },

    /// A transport-level failure (connect, timeout) that survived the retry
    /// budget.
    #[error("upstream request failed: {0}")]
    Network(String),

    /// The upstream answered 2xx but the body did not have the expected
    /// shape.
    #[error("unexpected upstream response: {0}")]
    UnexpectedPayload(String),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a new NotConfigured error for a named data source.
    pub fn not_configured(source: impl Into<String>) -> Self {
        Self::NotConfigured(source.into())
    }

    /// Create a new Validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new Upstream error, truncating the body snippet to
    /// [`BODY_SNIPPET_MAX`] characters.
    pub fn upstream(status: u16, message: impl Into<String>, body: &str) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
            body_snippet: truncate_snippet(body),
        }
    }

    /// Create a new UnexpectedPayload error.
    pub fn unexpected_payload(message: impl Into<String>) -> Self {
        Self::UnexpectedPayload(message.into())
    }

    /// The upstream HTTP status, for variants that carry one.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::Upstream { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether serving a stale cached payload may mask this error.
    ///
    /// Validation and configuration errors are never masked; fetch-side
    /// failures are.
    pub fn is_stale_maskable(&self) -> bool {
        matches!(
            self,
            Self::Upstream { .. } | Self::Network(_) | Self::UnexpectedPayload(_)
        )
    }

    /// Check if this error is a client error (4xx category).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Get error category for logging/monitoring.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::NotConfigured(_) => ErrorCategory::Configuration,
            Self::Validation(_) => ErrorCategory::Validation,
            Self::Upstream { .. } => ErrorCategory::Upstream,
            Self::Network(_) => ErrorCategory::Network,
            Self::UnexpectedPayload(_) => ErrorCategory::Upstream,
            Self::Serialization(_) => ErrorCategory::Serialization,
        }
    }
}

/// Error categories for monitoring and classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Validation,
    Upstream,
    Network,
    Serialization,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Validation => write!(f, "validation"),
            Self::Upstream => write!(f, "upstream"),
            Self::Network => write!(f, "network"),
            Self::Serialization => write!(f, "serialization"),
        }
    }
}

fn truncate_snippet(body: &str) -> String {
    body.chars().take(BODY_SNIPPET_MAX).collect()
}

/// Convenience result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;
