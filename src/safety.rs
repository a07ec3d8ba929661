//! Safety filter
//!
//! Three sequential gates in front of the pattern detector, built to
//! suppress false positives: a request only escalates when evidence clears
//! the bar for its stage, and only gets flagged when deep inspection
//! confirms it. Stage 1 is cheap (whitelist, reputation, rate buckets),
//! stage 2 reads the behavioral history, stage 3 runs the compiled content
//! patterns and sweep heuristics.
//!
//! Stage 2 never terminates the filter. A behavioral "looks human" guess
//! must not skip content inspection: a first-request SQL injection with
//! relaxed timing would sail through otherwise.

use std::collections::BTreeMap;
use tracing::debug;

use crate::config::RuleBook;
use crate::detect::{behavior, content, ml, timing, Evidence};
use crate::fingerprint::Fingerprint;
use crate::reputation::ReputationTable;
use crate::request::{HistoryEntry, Request};

/// Intervals required before the strong-signal CV shortcut applies.
const STRONG_CV_SAMPLES: usize = 10;

/// CV below this is a machine, full stop.
const STRONG_CV: f64 = 0.05;

/// Reputation deltas owned by the filter.
const REP_CONFIRMED_ATTACK: f64 = -10.0;
const REP_CONFIRMED_BENIGN: f64 = 1.0;

/// Result of the staged safety check.
#[derive(Debug, Clone)]
pub struct SafetyReport {
    /// Definitive outcome: true means the pipeline stops here with allow
    pub safe: bool,
    /// 1-3; the stage that produced the outcome
    pub stage_reached: u8,
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub evidence: BTreeMap<String, Evidence>,
}

impl SafetyReport {
    fn safe_at(stage: u8, confidence: f64, reasons: Vec<String>) -> Self {
        Self {
            safe: true,
            stage_reached: stage,
            confidence,
            reasons,
            evidence: BTreeMap::new(),
        }
    }
}

pub struct SafetyFilter;

impl SafetyFilter {
    /// Run the staged check. Adjusts reputation on stage-3 outcomes:
    /// -10 when deep inspection confirms an attack, +1 when it clears.
    pub fn check(
        req: &Request,
        fp: Fingerprint,
        history: &[HistoryEntry],
        reputation: &ReputationTable,
        rules: &RuleBook,
    ) -> SafetyReport {
        let mut reasons = Vec::new();
        let mut evidence = BTreeMap::new();

        // Stage 1: quick checks
        if let Some(report) = stage_quick(req, fp, history, reputation, rules, &mut reasons, &mut evidence)
        {
            return report;
        }

        // Stage 2: behavioral criteria; escalates, never terminates
        stage_behavioral(history, rules, &mut reasons);

        // Stage 3: deep inspection
        stage_deep(req, fp, history, reputation, rules, reasons, evidence)
    }
}

fn stage_quick(
    req: &Request,
    fp: Fingerprint,
    history: &[HistoryEntry],
    reputation: &ReputationTable,
    rules: &RuleBook,
    reasons: &mut Vec<String>,
    evidence: &mut BTreeMap<String, Evidence>,
) -> Option<SafetyReport> {
    let safety = &rules.safety;

    if safety.is_whitelisted_agent(&req.user_agent) {
        return Some(SafetyReport::safe_at(
            1,
            0.95,
            vec![format!("whitelisted user agent: {}", req.user_agent)],
        ));
    }
    if safety.is_whitelisted_address(&req.source_address) {
        return Some(SafetyReport::safe_at(
            1,
            0.95,
            vec![format!("whitelisted network: {}", req.source_address)],
        ));
    }
    if safety.is_whitelisted_endpoint(&req.endpoint) {
        return Some(SafetyReport::safe_at(
            1,
            0.9,
            vec![format!("whitelisted endpoint: {}", req.endpoint)],
        ));
    }

    let honeypot_hit = safety.is_honeypot(&req.endpoint);
    if honeypot_hit {
        reasons.push(format!("honeypot endpoint probed: {}", req.endpoint));
        evidence.insert(
            "honeypot_probe".to_string(),
            Evidence::HoneypotProbe {
                endpoint: req.endpoint.clone(),
            },
        );
    }

    // Rate buckets over 1 s / 10 s / 60 s
    let now = req.timestamp;
    let rate_60 = timing::rate_over(history, now, 60.0);
    let bursting = rate_60 >= safety.burst_threshold
        || timing::rate_over(history, now, 1.0) >= safety.burst_threshold * 2.0
        || timing::rate_over(history, now, 10.0) >= safety.burst_threshold * 1.5;
    if bursting {
        // Burst alone is not a verdict, but it does disqualify shortcuts
        reasons.push(format!("request rate {rate_60:.1}/s over burst threshold"));
        evidence.insert(
            "burst_activity".to_string(),
            Evidence::Burst {
                requests_per_second: rate_60,
            },
        );
    }

    let score = reputation.score(fp, now);
    if score >= safety.safe_reputation
        && !bursting
        && !honeypot_hit
        && !content::any_match(req, &rules.content, rules.max_scan_bytes)
    {
        return Some(SafetyReport::safe_at(
            1,
            0.8,
            vec![format!("established reputation {score:.0}")],
        ));
    }

    None
}

fn stage_behavioral(history: &[HistoryEntry], rules: &RuleBook, reasons: &mut Vec<String>) {
    let cv = timing::coefficient_of_variation(history);

    let machine_timing = cv
        .map(|(cv, _, _)| cv < rules.consistent_timing.threshold)
        .unwrap_or(false);
    let enumeration = behavior::enumeration_run(history, rules.behavior.enumeration_min_run)
        .is_some()
        || behavior::token_sweep(history, rules.behavior.token_sweep_min_values).is_some();
    // Human traffic jitters; a flat interval distribution over a real
    // sample is the absence of human noise.
    let no_human_noise = cv
        .map(|(cv, _, samples)| samples >= 5 && cv < 0.5)
        .unwrap_or(false);

    let criteria = [machine_timing, enumeration, no_human_noise]
        .iter()
        .filter(|c| **c)
        .count();

    if criteria >= 2 {
        reasons.push(format!("behavioral escalation: {criteria}/3 criteria"));
    }
    if let Some((cv, _, samples)) = cv {
        if cv < STRONG_CV && samples >= STRONG_CV_SAMPLES {
            reasons.push(format!("machine-regular timing: cv {cv:.3} over {samples} intervals"));
        }
    }
}

fn stage_deep(
    req: &Request,
    fp: Fingerprint,
    history: &[HistoryEntry],
    reputation: &ReputationTable,
    rules: &RuleBook,
    mut reasons: Vec<String>,
    mut evidence: BTreeMap<String, Evidence>,
) -> SafetyReport {
    // Compiled content patterns
    if let Some((rule, matched)) = content::first_match(req, &rules.content, rules.max_scan_bytes) {
        reasons.push(format!("content pattern matched: {}", rule.name));
        evidence.insert(
            rule.group.as_str().to_string(),
            Evidence::Content {
                group: rule.group.as_str().to_string(),
                rule: rule.name.clone(),
                matched,
            },
        );
        reputation.adjust(fp, REP_CONFIRMED_ATTACK, req.timestamp);
        debug!(fingerprint = %fp, rule = %rule.name, "safety filter: content match");
        return SafetyReport {
            safe: false,
            stage_reached: 3,
            confidence: 0.9,
            reasons,
            evidence,
        };
    }

    // Parameter sweep at deep-inspection scale
    if let Some((param, values)) =
        behavior::token_sweep(history, rules.ml_attack.sweep_min_values)
    {
        reasons.push(format!("parameter sweep: {param} over {values} values"));
        evidence.insert(
            "token_sweep".to_string(),
            Evidence::TokenSweep {
                param,
                distinct_values: values,
            },
        );
        reputation.adjust(fp, REP_CONFIRMED_ATTACK, req.timestamp);
        return SafetyReport {
            safe: false,
            stage_reached: 3,
            confidence: 0.8,
            reasons,
            evidence,
        };
    }

    // Boundary-probing cluster
    let tail = ml::window_tail(history, rules.ml_attack.window);
    if history.len() >= rules.ml_attack.min_history {
        if let Some(ratio) = ml::inversion_probe(tail) {
            reasons.push(format!("boundary probing cluster: unique ratio {ratio:.2}"));
            evidence.insert(
                "model_inversion".to_string(),
                Evidence::MlAttack {
                    pattern: "model_inversion".to_string(),
                    metric: ratio,
                },
            );
            reputation.adjust(fp, REP_CONFIRMED_ATTACK, req.timestamp);
            return SafetyReport {
                safe: false,
                stage_reached: 3,
                confidence: 0.8,
                reasons,
                evidence,
            };
        }
    }

    // Honeypot hits are confirming evidence on their own: the path has no
    // legitimate callers.
    if evidence.contains_key("honeypot_probe") {
        reputation.adjust(fp, REP_CONFIRMED_ATTACK, req.timestamp);
        return SafetyReport {
            safe: false,
            stage_reached: 3,
            confidence: 0.85,
            reasons,
            evidence,
        };
    }

    // Deep inspection found nothing
    reputation.adjust(fp, REP_CONFIRMED_BENIGN, req.timestamp);
    reasons.push("deep inspection clean".to_string());
    SafetyReport {
        safe: true,
        stage_reached: 3,
        confidence: 0.7,
        reasons,
        evidence,
    }
}
