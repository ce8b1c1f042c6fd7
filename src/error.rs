use thiserror::Error;

/// Unified error type for the Subsift pipeline
#[derive(Error, Debug)]
pub enum SubsiftError {
    // Source errors
    #[error("Source unavailable: {url}: {reason}")]
    SourceUnavailable { url: String, reason: String },

    #[error("Source list is empty: {0}")]
    EmptySourceList(String),

    // Link errors
    #[error("Malformed link: {0}")]
    MalformedLink(String),

    #[error("Unsupported link scheme: {0}")]
    UnsupportedScheme(String),

    // Probe errors
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("DNS resolution failed for {host}")]
    DnsResolution { host: String },

    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),

    #[error("Unexpected HTTP status {status} from {target}")]
    UnexpectedStatus { status: u16, target: String },

    #[error("Latency {latency_ms:.0}ms exceeds threshold {threshold_ms}ms")]
    LatencyExceeded { latency_ms: f64, threshold_ms: u64 },

    #[error("Probe timed out")]
    Timeout,

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    // I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Subsift operations
pub type Result<T> = std::result::Result<T, SubsiftError>;

/// Where an error sits in the run's recovery model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// A source could not be fetched; the source is skipped
    SourceUnavailable,
    /// A link failed to decode; no descriptor is produced
    MalformedLink,
    /// A probe did not succeed within budget; the descriptor is dropped
    ProbeFailure,
    /// The run cannot continue
    Fatal,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::SourceUnavailable => "source_unavailable",
            ErrorCategory::MalformedLink => "malformed_link",
            ErrorCategory::ProbeFailure => "probe_failure",
            ErrorCategory::Fatal => "fatal",
        }
    }
}

impl SubsiftError {
    /// Classify this error for the run's recovery policy
    pub fn category(&self) -> ErrorCategory {
        match self {
            SubsiftError::SourceUnavailable { .. } | SubsiftError::Http(_) => {
                ErrorCategory::SourceUnavailable
            }

            SubsiftError::MalformedLink(_)
            | SubsiftError::UnsupportedScheme(_)
            | SubsiftError::Json(_) => ErrorCategory::MalformedLink,

            SubsiftError::ConnectionFailed(_)
            | SubsiftError::DnsResolution { .. }
            | SubsiftError::TlsHandshake(_)
            | SubsiftError::UnexpectedStatus { .. }
            | SubsiftError::LatencyExceeded { .. }
            | SubsiftError::Timeout => ErrorCategory::ProbeFailure,

            SubsiftError::EmptySourceList(_)
            | SubsiftError::InvalidConfig(_)
            | SubsiftError::MissingEnvVar(_)
            | SubsiftError::Io(_)
            | SubsiftError::Internal(_) => ErrorCategory::Fatal,
        }
    }
}

impl From<reqwest::Error> for SubsiftError {
    fn from(err: reqwest::Error) -> Self {
        SubsiftError::Http(err.to_string())
    }
}

impl From<hyper::Error> for SubsiftError {
    fn from(err: hyper::Error) -> Self {
        SubsiftError::ConnectionFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_category_mapping() {
        assert_eq!(
            SubsiftError::SourceUnavailable {
                url: "https://example.com/sub".to_string(),
                reason: "404".to_string()
            }
            .category(),
            ErrorCategory::SourceUnavailable
        );
        assert_eq!(
            SubsiftError::MalformedLink("missing @".to_string()).category(),
            ErrorCategory::MalformedLink
        );
        assert_eq!(SubsiftError::Timeout.category(), ErrorCategory::ProbeFailure);
        assert_eq!(
            SubsiftError::LatencyExceeded {
                latency_ms: 900.0,
                threshold_ms: 600
            }
            .category(),
            ErrorCategory::ProbeFailure
        );
        assert_eq!(
            SubsiftError::InvalidConfig("bad".to_string()).category(),
            ErrorCategory::Fatal
        );
    }

    #[test]
    fn test_error_category_names() {
        let dns = SubsiftError::DnsResolution {
            host: "nowhere.invalid".to_string(),
        };
        assert_eq!(dns.category().as_str(), "probe_failure");
        assert_eq!(
            SubsiftError::EmptySourceList("https://example.com".to_string())
                .category()
                .as_str(),
            "fatal"
        );
    }

    #[test]
    fn test_latency_exceeded_message() {
        let err = SubsiftError::LatencyExceeded {
            latency_ms: 912.4,
            threshold_ms: 600,
        };
        assert_eq!(err.to_string(), "Latency 912ms exceeds threshold 600ms");
    }
}
