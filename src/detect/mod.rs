//! Pattern detection
//!
//! Four independent checks (timing, behavioral, content, ML-attack) run
//! against a history snapshot and the current request, summing their
//! contributions into a [`DetectionResult`]. The detector is deterministic
//! for a given snapshot and rule book: no randomness, no wall-clock reads;
//! "now" is always the request's own timestamp.

pub mod behavior;
pub mod content;
pub mod ml;
pub mod timing;

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::config::RuleBook;
use crate::request::{HistoryEntry, Request};

/// Raw numbers behind one detected pattern. Keys in the evidence map are
/// pattern names; the variant holds what fed the decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    Timing {
        coefficient_of_variation: f64,
        mean_interval: f64,
        samples: usize,
    },
    Burst {
        requests_per_second: f64,
    },
    Enumeration {
        distinct_endpoints: usize,
        run_length: usize,
    },
    TokenSweep {
        param: String,
        distinct_values: usize,
    },
    Rotation {
        user_agents: usize,
    },
    HoneypotProbe {
        endpoint: String,
    },
    Content {
        group: String,
        rule: String,
        matched: String,
    },
    MlAttack {
        pattern: String,
        metric: f64,
    },
    /// Regex scan budget exceeded; the pattern was charged its minimum
    /// score instead of being skipped (fail-safe toward caution).
    BudgetExceeded {
        scanned_bytes: usize,
        total_bytes: usize,
    },
    /// Scenario resolution fell back to the generic scenario.
    ScenarioFallback {
        category: String,
    },
    /// A payload builder failed and the generic kind was served instead.
    PayloadDegraded {
        template_id: String,
        reason: String,
    },
}

/// Output of one detector pass.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub is_suspicious: bool,
    /// `clip(risk_score / 100, 0, 1)`
    pub confidence: f64,
    pub detected_patterns: BTreeSet<String>,
    pub risk_score: f64,
    pub evidence: BTreeMap<String, Evidence>,
    /// Candidate threat categories with their accumulated scores. Content
    /// and ML checks contribute here; purely behavioral signals do not.
    pub group_scores: BTreeMap<String, f64>,
}

impl DetectionResult {
    /// Empty, non-suspicious result.
    pub fn benign() -> Self {
        Self {
            is_suspicious: false,
            confidence: 0.0,
            detected_patterns: BTreeSet::new(),
            risk_score: 0.0,
            evidence: BTreeMap::new(),
            group_scores: BTreeMap::new(),
        }
    }
}

/// Accumulates contributions from the individual checks.
#[derive(Debug, Default)]
pub(crate) struct Findings {
    patterns: BTreeSet<String>,
    evidence: BTreeMap<String, Evidence>,
    score: f64,
    groups: BTreeMap<String, f64>,
}

impl Findings {
    pub(crate) fn add(&mut self, pattern: &str, evidence: Evidence, score: f64) {
        self.patterns.insert(pattern.to_string());
        self.evidence.insert(pattern.to_string(), evidence);
        self.score += score;
    }

    /// Like [`add`], but the score also counts toward a threat category.
    pub(crate) fn add_categorized(
        &mut self,
        pattern: &str,
        category: &str,
        evidence: Evidence,
        score: f64,
    ) {
        self.add(pattern, evidence, score);
        *self.groups.entry(category.to_string()).or_insert(0.0) += score;
    }
}

/// The pattern detector. Stateless; all inputs arrive per call.
pub struct PatternDetector;

impl PatternDetector {
    /// Run all four checks over the snapshot and fold the findings.
    ///
    /// `agent_count` is the number of distinct user agents seen from the
    /// request's source address (feeds rotation detection).
    pub fn analyze(
        req: &Request,
        history: &[HistoryEntry],
        agent_count: usize,
        rules: &RuleBook,
    ) -> DetectionResult {
        let mut findings = Findings::default();

        timing::check(history, req.timestamp, rules, &mut findings);
        behavior::check(req, history, agent_count, rules, &mut findings);
        content::check(req, rules, &mut findings);
        ml::check(history, rules, &mut findings);

        let risk_score = findings.score;
        DetectionResult {
            is_suspicious: risk_score >= rules.min_suspicious,
            confidence: (risk_score / 100.0).clamp(0.0, 1.0),
            detected_patterns: findings.patterns,
            risk_score,
            evidence: findings.evidence,
            group_scores: findings.groups,
        }
    }
}
