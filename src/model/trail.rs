//! The attempt trail recorded during one orchestrated extraction.
//!
//! Every backend invocation leaves one [`ExtractionAttempt`] behind, in
//! invocation order. The trail is observability data returned with the
//! result; the orchestrator never consults it for decisions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How a single backend invocation ended.
///
/// `Empty` is deliberately distinct from `Error`: a backend that ran fine
/// and found nothing is not a failure, it is the cue to try the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptOutcome {
    /// Backend returned at least one accepted candidate
    Success,
    /// Backend ran but produced no candidates
    Empty,
    /// Backend raised an error
    Error,
}

/// Record of one backend invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionAttempt {
    /// Backend method name
    pub method: String,

    /// How the invocation ended
    pub outcome: AttemptOutcome,

    /// Wall-clock time spent in the backend, milliseconds
    pub elapsed_ms: u64,

    /// Error detail when `outcome == Error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExtractionAttempt {
    /// Record a successful invocation.
    pub fn success(method: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            method: method.into(),
            outcome: AttemptOutcome::Success,
            elapsed_ms: elapsed.as_millis() as u64,
            error: None,
        }
    }

    /// Record an invocation that found nothing.
    pub fn empty(method: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            method: method.into(),
            outcome: AttemptOutcome::Empty,
            elapsed_ms: elapsed.as_millis() as u64,
            error: None,
        }
    }

    /// Record a failed invocation.
    pub fn error(method: impl Into<String>, elapsed: Duration, detail: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            outcome: AttemptOutcome::Error,
            elapsed_ms: elapsed.as_millis() as u64,
            error: Some(detail.into()),
        }
    }
}

/// Ordered list of attempts from one extraction request.
pub type ExtractionTrail = Vec<ExtractionAttempt>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempt_constructors() {
        let a = ExtractionAttempt::success("stream", Duration::from_millis(12));
        assert_eq!(a.outcome, AttemptOutcome::Success);
        assert_eq!(a.elapsed_ms, 12);
        assert!(a.error.is_none());

        let e = ExtractionAttempt::error("vision", Duration::from_secs(1), "timeout");
        assert_eq!(e.outcome, AttemptOutcome::Error);
        assert_eq!(e.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn test_outcome_serialization() {
        let a = ExtractionAttempt::empty("lattice", Duration::ZERO);
        let json = serde_json::to_string(&a).unwrap();
        assert!(json.contains("\"outcome\":\"empty\""));
        assert!(!json.contains("error"));
    }
}
