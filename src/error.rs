//! Error types for the flight agent orchestrator

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Failure taxonomy shared by every stage of the pipeline.
///
/// The Orchestrator uses this seam to pick a user-safe message; the
/// Query Agent uses it to decide retry-worthiness.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnrecognizedIntent,
    MissingParameter,
    RateLimited,
    Unauthorized,
    NotFound,
    UpstreamUnavailable,
    InvalidResponse,
}

impl FailureKind {
    /// Kinds worth another attempt against the upstream API.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            FailureKind::RateLimited | FailureKind::UpstreamUnavailable
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::UnrecognizedIntent => "unrecognized intent",
            FailureKind::MissingParameter => "missing parameter",
            FailureKind::RateLimited => "rate limited",
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::NotFound => "not found",
            FailureKind::UpstreamUnavailable => "upstream unavailable",
            FailureKind::InvalidResponse => "invalid response",
        };
        write!(f, "{}", s)
    }
}

/// Typed failure returned by the Query Agent.
///
/// Terminal for the current request; propagates upward unchanged. The
/// detail string is for logs only and never reaches user-facing text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryFailure {
    pub kind: FailureKind,
    pub detail: Option<String>,
}

impl QueryFailure {
    pub fn new(kind: FailureKind) -> Self {
        Self { kind, detail: None }
    }

    pub fn with_detail(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: Some(detail.into()),
        }
    }
}

impl fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.kind, detail),
            None => write!(f, "{}", self.kind),
        }
    }
}

impl std::error::Error for QueryFailure {}

/// Terminal report handed back to the caller when a request fails.
///
/// The message is the only field suitable for end users; it never
/// carries status codes, payloads, or other internal detail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailureReport {
    pub kind: FailureKind,
    pub message: String,
}

impl FailureReport {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Raw errors from the HTTP flight-data client, before the Query Agent
/// translates them into the taxonomy above.
#[derive(Error, Debug)]
pub enum FlightApiError {
    #[error("upstream returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed upstream payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("authentication failed: {0}")]
    Auth(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(FailureKind::RateLimited.is_retryable());
        assert!(FailureKind::UpstreamUnavailable.is_retryable());
        assert!(!FailureKind::Unauthorized.is_retryable());
        assert!(!FailureKind::NotFound.is_retryable());
        assert!(!FailureKind::MissingParameter.is_retryable());
        assert!(!FailureKind::InvalidResponse.is_retryable());
        assert!(!FailureKind::UnrecognizedIntent.is_retryable());
    }

    #[test]
    fn test_failure_display() {
        let failure = QueryFailure::with_detail(FailureKind::MissingParameter, "destination");
        assert_eq!(failure.to_string(), "missing parameter: destination");

        let bare = QueryFailure::new(FailureKind::RateLimited);
        assert_eq!(bare.to_string(), "rate limited");
    }
}
