//! Error types for the defense pipeline.
//!
//! Only the config loader surfaces errors to the caller; everything raised
//! during `process` is folded into the Verdict (block + fail_closed at
//! worst). The pipeline itself is total.

use thiserror::Error;

/// Which configuration document failed to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigDocument {
    Rules,
    Policies,
}

impl std::fmt::Display for ConfigDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigDocument::Rules => write!(f, "rules"),
            ConfigDocument::Policies => write!(f, "policies"),
        }
    }
}

/// Raised by the config loader. Startup-fatal; never surfaced from `process`.
#[derive(Debug, Error)]
#[error("invalid {which} document: {reason}")]
pub struct ConfigError {
    /// Document that failed validation
    pub which: ConfigDocument,
    /// Human-readable cause
    pub reason: String,
}

impl ConfigError {
    pub fn rules(reason: impl Into<String>) -> Self {
        Self {
            which: ConfigDocument::Rules,
            reason: reason.into(),
        }
    }

    pub fn policies(reason: impl Into<String>) -> Self {
        Self {
            which: ConfigDocument::Policies,
            reason: reason.into(),
        }
    }
}

/// A payload builder could not materialize its document.
///
/// Escalated to the orchestrator, which falls back to the generic payload
/// kind and records a degradation event.
#[derive(Debug, Error)]
#[error("payload build failed for template '{template_id}': {reason}")]
pub struct PayloadBuildFailure {
    pub template_id: String,
    pub reason: String,
}

/// The audit sink rejected an append.
///
/// Fatal for the current request: the orchestrator emits a fail-closed
/// block verdict rather than an untracked response.
#[derive(Debug, Error)]
#[error("audit append failed: {reason}")]
pub struct AuditAppendFailure {
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_names_document() {
        let err = ConfigError::rules("threshold out of range");
        assert_eq!(err.which, ConfigDocument::Rules);
        assert!(err.to_string().contains("rules"));
        assert!(err.to_string().contains("threshold out of range"));
    }

    #[test]
    fn payload_failure_names_template() {
        let err = PayloadBuildFailure {
            template_id: "sql_honeypot".to_string(),
            reason: "empty tier".to_string(),
        };
        assert!(err.to_string().contains("sql_honeypot"));
    }
}
