//! Mirage defense core
//!
//! An in-line request-defense pipeline that classifies every inbound
//! HTTP-like request as benign or hostile and, for hostile requests,
//! substitutes the upstream response with tracked deceptive content
//! instead of blocking.
//!
//! # Features
//!
//! - **Staged safety filter**: whitelist/reputation/rate quick checks,
//!   behavioral escalation, deep content inspection; built to suppress
//!   false positives by refusing to escalate without evidence
//! - **Pattern detection**: timing variance, burst, enumeration and sweep
//!   behavior, content rules, and model-attack heuristics over a bounded
//!   per-fingerprint sliding history
//! - **Tracked deception**: scenario-driven fake payloads (SQL dumps,
//!   API floods, credentials, env files, filesystem trees), every string
//!   leaf carrying a per-verdict tracking token
//! - **Deterministic verdicts**: no wall-clock reads or untracked
//!   randomness inside scoring; payloads are a pure function of
//!   (scenario, intensity, token)
//!
//! # Example
//!
//! ```
//! use mirage_core::{Orchestrator, Request, VerdictAction};
//!
//! let orchestrator = Orchestrator::with_defaults()?;
//! let request = Request::builder("/api/users")
//!     .timestamp(1.0)
//!     .source_address("203.0.113.7")
//!     .user_agent("curl/8.0")
//!     .param("id", "1' OR '1'='1")
//!     .build();
//!
//! let verdict = orchestrator.process(&request);
//! assert_eq!(verdict.action, VerdictAction::Countermeasures);
//! assert!(verdict.deceptive_payload.is_some());
//! # Ok::<(), mirage_core::ConfigError>(())
//! ```
//!
//! The HTTP adapter, enforcement, and downstream exfiltration tracing are
//! external collaborators: this crate only produces verdicts.

pub mod audit;
pub mod config;
pub mod deception;
pub mod detect;
pub mod error;
pub mod fingerprint;
pub mod orchestrator;
pub mod reputation;
pub mod request;
pub mod safety;
pub mod scenario;
pub mod scorer;
pub mod token;

// Re-exports for convenience
pub use audit::{AuditRecord, AuditSink, MemoryAuditSink};
pub use config::{load as load_config, load_default, DefenseConfig, RuleBook};
pub use deception::{DeceptionFactory, DeceptivePayload, PayloadKind};
pub use detect::{DetectionResult, Evidence, PatternDetector};
pub use error::{AuditAppendFailure, ConfigError, PayloadBuildFailure};
pub use fingerprint::{fingerprint, Fingerprint, HistoryStore};
pub use orchestrator::{Orchestrator, PipelineMetrics, Verdict};
pub use reputation::ReputationTable;
pub use request::{HistoryEntry, Request};
pub use safety::{SafetyFilter, SafetyReport};
pub use scenario::{IntensitySpec, IntensityTier, IsolationLevel, Scenario};
pub use scorer::{Action, RiskAssessment, RiskLevel, RiskScorer, VerdictAction};
pub use token::{RngSource, SystemRng, TrackingToken};
