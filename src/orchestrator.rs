//! Orchestrator
//!
//! The one component middleware calls. `process` drives the pipeline
//! (fingerprint, safety filter, detector, scorer, scenario, payload) and
//! emits a single [`Verdict`] with its audit record. Re-entrant: state is
//! sharded behind short mutexes, the config snapshot is an `Arc` cloned
//! once per request, and nothing in here touches a clock or suspends.
//!
//! Errors never escape: the worst outcome is a fail-closed block verdict.

use parking_lot::RwLock;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::audit::{AuditLog, AuditRecord, AuditSink, MemoryAuditSink};
use crate::config::{self, DefenseConfig};
use crate::deception::{DeceptionFactory, DeceptivePayload};
use crate::detect::{Evidence, PatternDetector};
use crate::error::ConfigError;
use crate::fingerprint::{fingerprint, Fingerprint, HistoryStore};
use crate::reputation::ReputationTable;
use crate::request::{HistoryEntry, Request};
use crate::safety::SafetyFilter;
use crate::scenario::{IntensityTier, ScenarioRegistry};
use crate::scorer::{RiskAssessment, RiskScorer, VerdictAction};
use crate::token::{RngSource, SystemRng, TrackingToken};

/// Reputation deltas applied per verdict.
const REP_ALLOW: f64 = 1.0;
const REP_COUNTERMEASURES: f64 = -5.0;
const REP_BLOCK: f64 = -10.0;

/// The single output record of the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub action: VerdictAction,
    pub risk_assessment: RiskAssessment,
    /// Hex token; present exactly when a deceptive payload is carried
    pub tracking_token: Option<String>,
    pub deceptive_payload: Option<DeceptivePayload>,
    pub scenario_name: Option<String>,
    /// Monotonic per-instance sequence; 0 only on fail-closed verdicts
    pub audit_id: u64,
    /// Set when the audit append failed and the request fails closed
    pub fail_closed: bool,
    /// Detection evidence plus degradation events
    pub evidence: BTreeMap<String, Evidence>,
}

/// Relaxed counters for observability and the short-circuit property
/// tests. No locks on the hot path.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    pub requests_total: AtomicU64,
    pub safe_short_circuits: AtomicU64,
    pub detector_invocations: AtomicU64,
    pub tokens_issued: AtomicU64,
    pub verdicts_allow: AtomicU64,
    pub verdicts_countermeasures: AtomicU64,
    pub verdicts_block: AtomicU64,
    pub payload_degradations: AtomicU64,
    pub audit_failures: AtomicU64,
}

impl PipelineMetrics {
    fn bump(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Pipeline driver. Construct one per process; share by reference.
pub struct Orchestrator {
    config: RwLock<Arc<DefenseConfig>>,
    history: HistoryStore,
    reputation: ReputationTable,
    rng: Arc<dyn RngSource>,
    audit: AuditLog,
    metrics: PipelineMetrics,
}

impl Orchestrator {
    pub fn new(
        config: DefenseConfig,
        rng: Arc<dyn RngSource>,
        audit_sink: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            config: RwLock::new(Arc::new(config)),
            history: HistoryStore::new(),
            reputation: ReputationTable::new(),
            rng,
            audit: AuditLog::new(audit_sink),
            metrics: PipelineMetrics::default(),
        }
    }

    /// Built-in config, system CSPRNG, in-memory audit ring.
    pub fn with_defaults() -> Result<Self, ConfigError> {
        Ok(Self::new(
            config::load_default()?,
            Arc::new(SystemRng),
            Arc::new(MemoryAuditSink::default()),
        ))
    }

    /// Atomically replace the config snapshot. On a validation failure the
    /// prior snapshot stays live and traffic continues; the error is
    /// returned for the operator.
    pub fn reload(&self, rules_json: &str, policies_json: &str) -> Result<(), ConfigError> {
        match config::load(rules_json, policies_json) {
            Ok(fresh) => {
                *self.config.write() = Arc::new(fresh);
                info!("configuration reloaded");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "config reload rejected; keeping prior snapshot");
                Err(err)
            }
        }
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.metrics
    }

    /// Audit ids appended so far.
    pub fn last_audit_id(&self) -> u64 {
        self.audit.last_id()
    }

    /// Current reputation for a fingerprint, decay applied as of `now`.
    pub fn reputation_of(&self, fp: Fingerprint, now: f64) -> f64 {
        self.reputation.score(fp, now)
    }

    /// Classify one request and produce its verdict. Total: all failures
    /// are folded into the verdict.
    pub fn process(&self, req: &Request) -> Verdict {
        let cfg: Arc<DefenseConfig> = self.config.read().clone();
        let seen = self.metrics.requests_total.fetch_add(1, Ordering::Relaxed) + 1;
        if seen % 4096 == 0 {
            // Amortized upkeep: drop idle address sketches
            self.history.sweep_addresses(req.timestamp);
        }

        // Step 1: identity and history
        let fp = fingerprint(req);
        self.history.append(fp, HistoryEntry::from_request(req));
        let snapshot = self.history.snapshot(fp, req.timestamp);
        let agent_count =
            self.history
                .observe_agent(&req.source_address, &req.user_agent, req.timestamp);

        // Step 2: safety filter
        let safety = SafetyFilter::check(req, fp, &snapshot, &self.reputation, &cfg.rules);
        if safety.safe {
            self.metrics.bump(&self.metrics.safe_short_circuits);
            debug!(
                fingerprint = %fp,
                stage = safety.stage_reached,
                "request cleared by safety filter"
            );
            let assessment = RiskAssessment::clean(safety.reasons.join("; "));
            return self.finalize(
                req,
                fp,
                VerdictAction::Allow,
                assessment,
                None,
                None,
                None,
                BTreeMap::new(),
            );
        }

        // Steps 3-4: pattern detection and risk scoring
        self.metrics.bump(&self.metrics.detector_invocations);
        let detection = PatternDetector::analyze(req, &snapshot, agent_count, &cfg.rules);
        let assessment = RiskScorer::assess(&detection, &cfg.rules);
        let action = RiskScorer::decide(&assessment);
        let mut evidence = detection.evidence;

        // Step 5: below the bar, report and let it through
        if action == VerdictAction::Allow {
            if assessment.risk_score >= cfg.rules.thresholds.low {
                info!(
                    fingerprint = %fp,
                    score = assessment.risk_score,
                    summary = %assessment.summary,
                    "detections below actionable threshold"
                );
            }
            return self.finalize(
                req,
                fp,
                VerdictAction::Allow,
                assessment,
                None,
                None,
                None,
                evidence,
            );
        }

        // Step 6: token, scenario, payload
        let token = TrackingToken::generate(&*self.rng);
        self.metrics.bump(&self.metrics.tokens_issued);

        let registry = ScenarioRegistry::new(
            &cfg.policies.scenarios,
            &cfg.policies.strategies,
            &cfg.policies.fallback_scenario,
        );
        let resolution = registry.resolve(&assessment.threat_category);
        if resolution.fallback_used {
            debug!(
                category = %assessment.threat_category,
                scenario = %resolution.scenario.name,
                "no scenario for category; using fallback"
            );
            evidence.insert(
                "scenario_fallback".to_string(),
                Evidence::ScenarioFallback {
                    category: assessment.threat_category.clone(),
                },
            );
        }
        let scenario = resolution.scenario;
        let tier = IntensityTier::for_level(assessment.level).unwrap_or(IntensityTier::Low);
        let intensity = registry.intensity(scenario, tier);

        let payload = match DeceptionFactory::build(scenario, intensity, &token, req.timestamp) {
            Ok(payload) => payload,
            Err(err) => {
                // Validated config makes this unreachable in practice;
                // degrade to the generic kind rather than answer untracked
                warn!(
                    template = %err.template_id,
                    error = %err,
                    "payload build failed; serving generic fallback"
                );
                self.metrics.bump(&self.metrics.payload_degradations);
                evidence.insert(
                    "payload_degraded".to_string(),
                    Evidence::PayloadDegraded {
                        template_id: err.template_id.clone(),
                        reason: err.reason.clone(),
                    },
                );
                DeceptionFactory::generic_fallback(&scenario.name, &token, req.timestamp)
            }
        };

        info!(
            fingerprint = %fp,
            action = ?action,
            level = %assessment.level,
            category = %assessment.threat_category,
            scenario = %scenario.name,
            tier = tier.as_str(),
            "countermeasures engaged"
        );

        self.finalize(
            req,
            fp,
            action,
            assessment,
            Some(token),
            Some(payload),
            Some(scenario.name.clone()),
            evidence,
        )
    }

    /// Steps 7-9: audit append (atomic with verdict emission), reputation
    /// adjustment, verdict construction.
    #[allow(clippy::too_many_arguments)]
    fn finalize(
        &self,
        req: &Request,
        fp: Fingerprint,
        action: VerdictAction,
        assessment: RiskAssessment,
        token: Option<TrackingToken>,
        payload: Option<DeceptivePayload>,
        scenario_name: Option<String>,
        evidence: BTreeMap<String, Evidence>,
    ) -> Verdict {
        let token_hex = token.map(|t| t.to_hex());
        let record = AuditRecord {
            audit_id: 0, // assigned by the log
            timestamp: req.timestamp,
            fingerprint: fp.to_hex(),
            action,
            level: assessment.level,
            risk_score: assessment.risk_score,
            scenario_name: scenario_name.clone(),
            tracking_token: token_hex.clone(),
        };

        let audit_id = match self.audit.append(record) {
            Ok(id) => id,
            Err(err) => {
                self.metrics.bump(&self.metrics.audit_failures);
                self.metrics.bump(&self.metrics.verdicts_block);
                warn!(error = %err, "audit append failed; failing closed");
                return Verdict {
                    action: VerdictAction::Block,
                    risk_assessment: assessment,
                    tracking_token: None,
                    deceptive_payload: None,
                    scenario_name: None,
                    audit_id: 0,
                    fail_closed: true,
                    evidence,
                };
            }
        };

        let (delta, counter) = match action {
            VerdictAction::Allow => (REP_ALLOW, &self.metrics.verdicts_allow),
            VerdictAction::Countermeasures => {
                (REP_COUNTERMEASURES, &self.metrics.verdicts_countermeasures)
            }
            VerdictAction::Block => (REP_BLOCK, &self.metrics.verdicts_block),
        };
        self.reputation.adjust(fp, delta, req.timestamp);
        self.metrics.bump(counter);

        enforce_invariants(Verdict {
            action,
            risk_assessment: assessment,
            tracking_token: token_hex,
            deceptive_payload: payload,
            scenario_name,
            audit_id,
            fail_closed: false,
            evidence,
        })
    }
}

/// Last line of defense for the verdict invariants (allow carries nothing,
/// countermeasures carries everything): panic under test, degrade to a
/// closed block in production.
fn enforce_invariants(verdict: Verdict) -> Verdict {
    let holds = match verdict.action {
        VerdictAction::Allow => {
            verdict.tracking_token.is_none() && verdict.deceptive_payload.is_none()
        }
        VerdictAction::Countermeasures => {
            verdict.tracking_token.is_some()
                && verdict.deceptive_payload.is_some()
                && verdict.scenario_name.is_some()
        }
        VerdictAction::Block => true,
    };
    debug_assert!(holds, "verdict invariant violated: {:?}", verdict.action);
    if holds {
        verdict
    } else {
        tracing::error!(action = ?verdict.action, "verdict invariant violated; failing closed");
        Verdict {
            action: VerdictAction::Block,
            tracking_token: None,
            deceptive_payload: None,
            scenario_name: None,
            fail_closed: true,
            ..verdict
        }
    }
}
