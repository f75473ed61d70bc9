//! Error taxonomy and classification for provider failures.
//!
//! Every raw transport failure is funneled through [`classify`] into an
//! [`ErrorRecord`] before it leaves the provider layer, so callers and logs
//! only ever see the fixed taxonomy in [`ErrorCode`] — never a bare
//! `reqwest::Error`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable error taxonomy for classified provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Upstream returned HTTP 404.
    NotFound,
    /// Upstream rejected the credential (HTTP 401).
    Unauthorized,
    /// TLS certificate could not be verified.
    CertError,
    /// TCP connection was refused.
    ConnRefused,
    /// The per-call transport timeout elapsed.
    Timeout,
    /// DNS resolution failed for the provider hostname.
    HostNotFound,
    /// The aggregator's own tallying logic failed (fatal, never retried).
    AggregationFailure,
    /// Anything the classifier could not match; original message preserved.
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::CertError => "CERT_ERROR",
            ErrorCode::ConnRefused => "CONN_REFUSED",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::HostNotFound => "HOST_NOT_FOUND",
            ErrorCode::AggregationFailure => "AGGREGATION_FAILURE",
            ErrorCode::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully classified provider failure.
///
/// `code` is always set; `http_status` and `cause` carry whatever extra
/// signal the raw error offered.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ErrorRecord {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ErrorRecord {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            http_status: None,
            cause: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Wrap a fatal failure inside the aggregator's own logic, prefixing the
    /// context so operators can tell it apart from a tolerated fetch failure.
    pub fn aggregation(context: &str, source: impl fmt::Display) -> Self {
        Self {
            code: ErrorCode::AggregationFailure,
            message: format!("{context}: {source}"),
            http_status: None,
            cause: Some(source.to_string()),
        }
    }

    /// Whether the retry executor may attempt this call again.
    ///
    /// Transient reachability failures and HTTP 5xx qualify; credential,
    /// certificate and not-found failures never do.
    pub fn is_retryable(&self) -> bool {
        if matches!(
            self.code,
            ErrorCode::Timeout | ErrorCode::ConnRefused | ErrorCode::HostNotFound
        ) {
            return true;
        }
        matches!(self.http_status, Some(status) if (500..=599).contains(&status))
    }
}

/// Known TLS failure phrases, matched case-insensitively against the full
/// error chain when no stronger signal is present.
const CERT_PHRASES: &[&str] = &[
    "self-signed certificate",
    "self signed certificate",
    "unable to verify the first certificate",
    "unable to get local issuer certificate",
    "certificate verify failed",
    "certificate has expired",
    "invalid peer certificate",
    "bad certificate",
    "unknownissuer",
];

const TIMEOUT_PHRASES: &[&str] = &["etimedout", "timed out", "timeout"];

const REFUSED_PHRASES: &[&str] = &["econnrefused", "connection refused"];

const HOST_PHRASES: &[&str] = &[
    "enotfound",
    "eai_again",
    "failed to lookup address",
    "dns error",
    "name or service not known",
    "no such host",
];

/// Classify a raw transport failure into an [`ErrorRecord`].
///
/// Never panics. Precedence: explicit HTTP status, then the transport's own
/// timeout signal, then known message phrases, then [`ErrorCode::Unknown`]
/// with the original message preserved.
pub fn classify(error: &reqwest::Error) -> ErrorRecord {
    let status = error.status().map(|s| s.as_u16());

    // Flatten the source chain: reqwest's top-level message is often just
    // "error sending request" while the useful phrase lives further down.
    let mut haystack = error.to_string();
    let mut cause = None;
    let mut source = std::error::Error::source(error);
    while let Some(inner) = source {
        let text = inner.to_string();
        if cause.is_none() {
            cause = Some(text.clone());
        }
        haystack.push_str(": ");
        haystack.push_str(&text);
        source = inner.source();
    }

    classify_raw(status, error.is_timeout(), &haystack, cause)
}

/// Pure classification core, independent of any transport type.
pub fn classify_raw(
    http_status: Option<u16>,
    timed_out: bool,
    message: &str,
    cause: Option<String>,
) -> ErrorRecord {
    let record = |code: ErrorCode| ErrorRecord {
        code,
        message: message.to_string(),
        http_status,
        cause: cause.clone(),
    };

    match http_status {
        Some(404) => return record(ErrorCode::NotFound),
        Some(401) => return record(ErrorCode::Unauthorized),
        // Other statuses keep their code on the record; retryability of 5xx
        // is decided from `http_status`, not the taxonomy code.
        Some(_) => return record(ErrorCode::Unknown),
        None => {}
    }

    let lowered = message.to_ascii_lowercase();
    let contains_any = |phrases: &[&str]| phrases.iter().any(|p| lowered.contains(p));

    if timed_out || contains_any(TIMEOUT_PHRASES) {
        return record(ErrorCode::Timeout);
    }
    if contains_any(REFUSED_PHRASES) {
        return record(ErrorCode::ConnRefused);
    }
    if contains_any(HOST_PHRASES) {
        return record(ErrorCode::HostNotFound);
    }
    if contains_any(CERT_PHRASES) {
        return record(ErrorCode::CertError);
    }

    record(ErrorCode::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_404_wins_regardless_of_message() {
        let rec = classify_raw(Some(404), false, "connection refused while fetching", None);
        assert_eq!(rec.code, ErrorCode::NotFound);
        assert_eq!(rec.http_status, Some(404));
    }

    #[test]
    fn status_401_is_unauthorized() {
        let rec = classify_raw(Some(401), false, "HTTP status client error (401)", None);
        assert_eq!(rec.code, ErrorCode::Unauthorized);
        assert!(!rec.is_retryable());
    }

    #[test]
    fn status_5xx_is_unknown_but_retryable() {
        let rec = classify_raw(Some(503), false, "HTTP status server error (503)", None);
        assert_eq!(rec.code, ErrorCode::Unknown);
        assert!(rec.is_retryable());
    }

    #[test]
    fn econnrefused_maps_to_conn_refused() {
        let rec = classify_raw(None, false, "connect ECONNREFUSED 127.0.0.1:8096", None);
        assert_eq!(rec.code, ErrorCode::ConnRefused);
        assert!(rec.is_retryable());
    }

    #[test]
    fn timeout_flag_wins_over_phrases() {
        let rec = classify_raw(None, true, "error sending request", None);
        assert_eq!(rec.code, ErrorCode::Timeout);
        assert!(rec.is_retryable());
    }

    #[test]
    fn self_signed_certificate_phrase() {
        let rec = classify_raw(None, false, "self-signed certificate in chain", None);
        assert_eq!(rec.code, ErrorCode::CertError);
        assert!(!rec.is_retryable());
    }

    #[test]
    fn dns_failure_maps_to_host_not_found() {
        let rec = classify_raw(
            None,
            false,
            "dns error: failed to lookup address information",
            None,
        );
        assert_eq!(rec.code, ErrorCode::HostNotFound);
        assert!(rec.is_retryable());
    }

    #[test]
    fn unmatched_message_preserved_as_unknown() {
        let rec = classify_raw(None, false, "something odd happened", None);
        assert_eq!(rec.code, ErrorCode::Unknown);
        assert_eq!(rec.message, "something odd happened");
        assert!(!rec.is_retryable());
    }

    #[test]
    fn cause_is_carried_through() {
        let rec = classify_raw(
            None,
            false,
            "request failed: connection refused",
            Some("connection refused".into()),
        );
        assert_eq!(rec.code, ErrorCode::ConnRefused);
        assert_eq!(rec.cause.as_deref(), Some("connection refused"));
    }

    #[test]
    fn aggregation_wrapper_prefixes_context() {
        let inner = ErrorRecord::new(ErrorCode::Unknown, "duplicate bucket");
        let rec = ErrorRecord::aggregation("failed to aggregate quality counts", &inner);
        assert_eq!(rec.code, ErrorCode::AggregationFailure);
        assert!(rec
            .message
            .starts_with("failed to aggregate quality counts:"));
        assert!(!rec.is_retryable());
    }

    #[test]
    fn code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::ConnRefused).unwrap();
        assert_eq!(json, "\"CONN_REFUSED\"");
        let json = serde_json::to_string(&ErrorCode::CertError).unwrap();
        assert_eq!(json, "\"CERT_ERROR\"");
    }
}
