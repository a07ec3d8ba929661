//! Risk scoring
//!
//! Maps a detection result onto a risk level, a threat category, and an
//! action set, and decides what the verdict's top-level action is. Levels
//! come from the configured threshold ladder; confidence is discounted by
//! how strong the confirming stage was (content beats behavior beats
//! timing).

use serde::{Deserialize, Serialize};

use crate::config::RuleBook;
use crate::detect::DetectionResult;

/// Risk level ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed vocabulary of response actions. The pipeline reports these;
/// enforcement belongs to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Log,
    Track,
    RateLimit,
    ServeFake,
    DeployCounter,
    AggressiveRateLimit,
    SetTraps,
    ReverseTracking,
}

/// Top-level verdict action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictAction {
    Allow,
    Countermeasures,
    Block,
}

/// The verdict's decision substrate: level, category, actions, confidence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    pub risk_score: f64,
    pub threat_category: String,
    /// Ordered, duplicate-free
    pub actions: Vec<Action>,
    pub confidence: f64,
    pub summary: String,
}

impl RiskAssessment {
    /// Assessment for requests that never reached the detector.
    pub fn clean(summary: impl Into<String>) -> Self {
        Self {
            level: RiskLevel::Low,
            risk_score: 0.0,
            threat_category: "none".to_string(),
            actions: vec![Action::Log],
            confidence: 1.0,
            summary: summary.into(),
        }
    }
}

/// Category precedence when group scores tie. Mirrors the origin system's
/// priority order: model attacks first, then the data-exfil categories.
const CATEGORY_PRECEDENCE: &[&str] = &[
    "ml_attack",
    "sql_injection",
    "path_traversal",
    "reconnaissance",
    "xss",
    "cmd_injection",
    "ldap_injection",
];

/// Fallback category when only timing/behavioral patterns fired.
pub const CATEGORY_SUSPICIOUS: &str = "suspicious_behavior";

pub struct RiskScorer;

impl RiskScorer {
    /// Map a detection result to a full assessment.
    pub fn assess(detection: &DetectionResult, rules: &RuleBook) -> RiskAssessment {
        let level = level_for(detection.risk_score, rules);
        let threat_category = pick_category(detection);
        let stage_weight = stage_weight(detection);
        let confidence = (detection.confidence * stage_weight).clamp(0.0, 1.0);

        RiskAssessment {
            level,
            risk_score: detection.risk_score,
            threat_category,
            actions: rules.response_policies.for_level(level),
            confidence,
            summary: summarize(detection),
        }
    }

    /// Decision rule: countermeasures for confident HIGH/CRITICAL, block
    /// only for near-certain CRITICAL, allow otherwise.
    pub fn decide(assessment: &RiskAssessment) -> VerdictAction {
        if assessment.level == RiskLevel::Critical && assessment.confidence >= 0.9 {
            VerdictAction::Block
        } else if assessment.level >= RiskLevel::High && assessment.confidence >= 0.5 {
            VerdictAction::Countermeasures
        } else {
            VerdictAction::Allow
        }
    }
}

fn level_for(score: f64, rules: &RuleBook) -> RiskLevel {
    let ladder = &rules.thresholds;
    if score >= ladder.critical {
        RiskLevel::Critical
    } else if score >= ladder.high {
        RiskLevel::High
    } else if score >= ladder.medium {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Highest-scoring content/ML group wins; precedence breaks ties; purely
/// behavioral detections fall back to `suspicious_behavior`.
fn pick_category(detection: &DetectionResult) -> String {
    let best = detection
        .group_scores
        .iter()
        .max_by(|a, b| {
            a.1.total_cmp(b.1)
                .then_with(|| precedence(b.0).cmp(&precedence(a.0)))
        })
        .map(|(category, _)| category.clone());

    match best {
        Some(category) => category,
        None if !detection.detected_patterns.is_empty() => CATEGORY_SUSPICIOUS.to_string(),
        None => "none".to_string(),
    }
}

fn precedence(category: &str) -> usize {
    CATEGORY_PRECEDENCE
        .iter()
        .position(|c| *c == category)
        .unwrap_or(CATEGORY_PRECEDENCE.len())
}

/// Confidence discount by confirming stage: content-confirmed 1.0,
/// behavioral-only 0.7, timing-only 0.5.
fn stage_weight(detection: &DetectionResult) -> f64 {
    let has_content = !detection.group_scores.is_empty();
    if has_content {
        return 1.0;
    }
    let behavioral = ["systematic_enumeration", "token_sweep", "fingerprint_rotation"];
    if detection
        .detected_patterns
        .iter()
        .any(|p| behavioral.contains(&p.as_str()))
    {
        0.7
    } else {
        0.5
    }
}

fn summarize(detection: &DetectionResult) -> String {
    if detection.detected_patterns.is_empty() {
        return "no suspicious patterns".to_string();
    }
    let patterns: Vec<&str> = detection
        .detected_patterns
        .iter()
        .map(String::as_str)
        .collect();
    format!(
        "{} pattern(s): {} (score {:.0})",
        patterns.len(),
        patterns.join(", "),
        detection.risk_score
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::detect::Evidence;
    use std::collections::BTreeMap;

    fn rules() -> RuleBook {
        config::load_default().unwrap().rules
    }

    fn detection(score: f64, patterns: &[&str], groups: &[(&str, f64)]) -> DetectionResult {
        DetectionResult {
            is_suspicious: score >= 30.0,
            confidence: (score / 100.0).clamp(0.0, 1.0),
            detected_patterns: patterns.iter().map(|p| p.to_string()).collect(),
            risk_score: score,
            evidence: BTreeMap::new(),
            group_scores: groups.iter().map(|(g, s)| (g.to_string(), *s)).collect(),
        }
    }

    #[test]
    fn level_ladder_boundaries() {
        let rules = rules();
        let cases = [
            (0.0, RiskLevel::Low),
            (29.9, RiskLevel::Low),
            (30.0, RiskLevel::Medium),
            (59.9, RiskLevel::Medium),
            (60.0, RiskLevel::High),
            (79.9, RiskLevel::High),
            (80.0, RiskLevel::Critical),
            (250.0, RiskLevel::Critical),
        ];
        for (score, expected) in cases {
            let assessment = RiskScorer::assess(&detection(score, &[], &[]), &rules);
            assert_eq!(assessment.level, expected, "score {score}");
        }
    }

    #[test]
    fn content_category_wins_over_behavior() {
        let rules = rules();
        let det = detection(
            155.0,
            &["consistent_timing", "sql_injection"],
            &[("sql_injection", 85.0)],
        );
        let assessment = RiskScorer::assess(&det, &rules);
        assert_eq!(assessment.threat_category, "sql_injection");
        // content-confirmed: no confidence discount
        assert_eq!(assessment.confidence, 1.0);
    }

    #[test]
    fn behavioral_only_falls_back_and_discounts() {
        let rules = rules();
        let det = detection(130.0, &["consistent_timing", "token_sweep"], &[]);
        let assessment = RiskScorer::assess(&det, &rules);
        assert_eq!(assessment.threat_category, CATEGORY_SUSPICIOUS);
        assert!((assessment.confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn timing_only_discounts_hardest() {
        let rules = rules();
        let det = detection(60.0, &["consistent_timing"], &[]);
        let assessment = RiskScorer::assess(&det, &rules);
        assert!((assessment.confidence - 0.3).abs() < 1e-9); // 0.6 * 0.5
    }

    #[test]
    fn precedence_breaks_ties() {
        let rules = rules();
        let det = detection(
            170.0,
            &["sql_injection", "xss"],
            &[("xss", 85.0), ("sql_injection", 85.0)],
        );
        let assessment = RiskScorer::assess(&det, &rules);
        assert_eq!(assessment.threat_category, "sql_injection");
    }

    #[test]
    fn decision_rules() {
        let rules = rules();

        // CRITICAL at full confidence: block
        let det = detection(170.0, &["sql_injection", "xss"], &[("sql_injection", 170.0)]);
        let assessment = RiskScorer::assess(&det, &rules);
        assert_eq!(RiskScorer::decide(&assessment), VerdictAction::Block);

        // CRITICAL at 0.85: countermeasures
        let det = detection(85.0, &["sql_injection"], &[("sql_injection", 85.0)]);
        let assessment = RiskScorer::assess(&det, &rules);
        assert_eq!(
            RiskScorer::decide(&assessment),
            VerdictAction::Countermeasures
        );

        // HIGH behavioral at 0.65 * 0.7 < 0.5: allow
        let det = detection(65.0, &["token_sweep"], &[]);
        let assessment = RiskScorer::assess(&det, &rules);
        assert_eq!(RiskScorer::decide(&assessment), VerdictAction::Allow);

        // MEDIUM never triggers countermeasures
        let det = detection(45.0, &["sql_injection"], &[("sql_injection", 45.0)]);
        let assessment = RiskScorer::assess(&det, &rules);
        assert_eq!(RiskScorer::decide(&assessment), VerdictAction::Allow);
    }

    #[test]
    fn actions_follow_the_ladder() {
        let rules = rules();
        let low = RiskScorer::assess(&detection(10.0, &[], &[]), &rules);
        assert_eq!(low.actions, vec![Action::Log, Action::Track]);

        let critical = RiskScorer::assess(
            &detection(90.0, &["sql_injection"], &[("sql_injection", 90.0)]),
            &rules,
        );
        assert!(critical.actions.contains(&Action::ServeFake));
        assert!(critical.actions.contains(&Action::ReverseTracking));
        assert!(critical.actions.contains(&Action::SetTraps));
    }

    #[test]
    fn evidence_serializes_with_kind_tag() {
        let ev = Evidence::Burst {
            requests_per_second: 12.5,
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("\"kind\":\"burst\""));
    }

    #[test]
    fn patterns_are_ordered_in_summary() {
        let det = detection(100.0, &["b_pattern", "a_pattern"], &[]);
        let assessment = RiskScorer::assess(&det, &rules());
        assert!(assessment.summary.find("a_pattern").unwrap() < assessment.summary.find("b_pattern").unwrap());
    }
}
