//! Configuration loading
//!
//! Two declarative JSON documents, **rules** (detection thresholds,
//! content patterns, safety whitelist, response ladder) and **policies**
//! (scenarios, counter-strategies), are parsed into typed structs,
//! validated, and compiled into an immutable [`RuleBook`] / [`PolicyBook`]
//! pair. Reload swaps the whole pair atomically; in-flight requests keep
//! the snapshot they started with.

mod defaults;

pub use defaults::{DEFAULT_POLICIES_JSON, DEFAULT_RULES_JSON};

use ipnet::IpNet;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;

use crate::deception::PayloadKind;
use crate::error::ConfigError;
use crate::scenario::{CounterStrategy, IntensitySpec, IsolationLevel, Scenario};
use crate::scorer::{Action, RiskLevel};

/// Validated, immutable configuration snapshot.
#[derive(Debug)]
pub struct DefenseConfig {
    pub rules: RuleBook,
    pub policies: PolicyBook,
}

/// Load and validate both documents.
pub fn load(rules_json: &str, policies_json: &str) -> Result<DefenseConfig, ConfigError> {
    let rules_doc: RulesDoc = serde_json::from_str(rules_json)
        .map_err(|e| ConfigError::rules(format!("parse error: {e}")))?;
    let policies_doc: PoliciesDoc = serde_json::from_str(policies_json)
        .map_err(|e| ConfigError::policies(format!("parse error: {e}")))?;

    let rules = rules_doc.compile()?;
    let policies = policies_doc.compile()?;
    Ok(DefenseConfig { rules, policies })
}

/// Load the built-in documents. Cannot fail unless the embedded defaults
/// are broken, which the test suite pins.
pub fn load_default() -> Result<DefenseConfig, ConfigError> {
    load(DEFAULT_RULES_JSON, DEFAULT_POLICIES_JSON)
}

// ---------------------------------------------------------------------------
// Rules document

/// Risk-threshold ladder. `medium`/`high`/`critical` are level lower
/// bounds; `low` is the floor below which detections are log-only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskThresholds {
    #[serde(default = "default_threshold_low")]
    pub low: f64,
    #[serde(default = "default_threshold_medium")]
    pub medium: f64,
    #[serde(default = "default_threshold_high")]
    pub high: f64,
    #[serde(default = "default_threshold_critical")]
    pub critical: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            low: default_threshold_low(),
            medium: default_threshold_medium(),
            high: default_threshold_high(),
            critical: default_threshold_critical(),
        }
    }
}

fn default_threshold_low() -> f64 {
    10.0
}
fn default_threshold_medium() -> f64 {
    30.0
}
fn default_threshold_high() -> f64 {
    60.0
}
fn default_threshold_critical() -> f64 {
    80.0
}

/// A detection check with a trigger threshold and the score it contributes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PatternThreshold {
    pub threshold: f64,
    pub risk_score: f64,
}

/// Scores and knobs for the behavioral checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BehaviorScores {
    #[serde(default = "default_enumeration_score")]
    pub systematic_enumeration: f64,
    #[serde(default = "default_sweep_score")]
    pub token_sweep: f64,
    #[serde(default = "default_rotation_score")]
    pub fingerprint_rotation: f64,
    #[serde(default = "default_honeypot_score")]
    pub honeypot_probe: f64,
    /// Minimum numeric-suffix run length before enumeration fires
    #[serde(default = "default_enumeration_min_run")]
    pub enumeration_min_run: usize,
    /// Distinct values of one param before a sweep fires
    #[serde(default = "default_sweep_min_values")]
    pub token_sweep_min_values: usize,
    /// Distinct user agents from one address before rotation fires
    #[serde(default = "default_rotation_min_agents")]
    pub rotation_min_agents: usize,
}

impl Default for BehaviorScores {
    fn default() -> Self {
        Self {
            systematic_enumeration: default_enumeration_score(),
            token_sweep: default_sweep_score(),
            fingerprint_rotation: default_rotation_score(),
            honeypot_probe: default_honeypot_score(),
            enumeration_min_run: default_enumeration_min_run(),
            token_sweep_min_values: default_sweep_min_values(),
            rotation_min_agents: default_rotation_min_agents(),
        }
    }
}

fn default_enumeration_score() -> f64 {
    75.0
}
fn default_sweep_score() -> f64 {
    70.0
}
fn default_rotation_score() -> f64 {
    80.0
}
fn default_honeypot_score() -> f64 {
    85.0
}
fn default_enumeration_min_run() -> usize {
    5
}
fn default_sweep_min_values() -> usize {
    20
}
fn default_rotation_min_agents() -> usize {
    5
}

/// Scores and knobs for the model-attack checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlAttackScores {
    #[serde(default = "default_inversion_score")]
    pub model_inversion: f64,
    #[serde(default = "default_membership_score")]
    pub membership_inference: f64,
    #[serde(default = "default_extraction_score")]
    pub model_extraction: f64,
    /// Trailing entries the inversion/membership checks look at
    #[serde(default = "default_ml_window")]
    pub window: usize,
    /// Minimum history length before any ML check runs
    #[serde(default = "default_ml_min_history")]
    pub min_history: usize,
    /// Distinct param keys for extraction coverage
    #[serde(default = "default_extraction_min_keys")]
    pub extraction_min_keys: usize,
    /// Window requests for extraction coverage
    #[serde(default = "default_extraction_min_requests")]
    pub extraction_min_requests: usize,
    /// Distinct values of one param treated as a sweep at deep inspection
    #[serde(default = "default_deep_sweep_values")]
    pub sweep_min_values: usize,
}

impl Default for MlAttackScores {
    fn default() -> Self {
        Self {
            model_inversion: default_inversion_score(),
            membership_inference: default_membership_score(),
            model_extraction: default_extraction_score(),
            window: default_ml_window(),
            min_history: default_ml_min_history(),
            extraction_min_keys: default_extraction_min_keys(),
            extraction_min_requests: default_extraction_min_requests(),
            sweep_min_values: default_deep_sweep_values(),
        }
    }
}

fn default_inversion_score() -> f64 {
    90.0
}
fn default_membership_score() -> f64 {
    85.0
}
fn default_extraction_score() -> f64 {
    95.0
}
fn default_ml_window() -> usize {
    20
}
fn default_ml_min_history() -> usize {
    10
}
fn default_extraction_min_keys() -> usize {
    10
}
fn default_extraction_min_requests() -> usize {
    50
}
fn default_deep_sweep_values() -> usize {
    50
}

/// Content-pattern groups. Closed set: each group maps to one threat
/// category and one first-match score slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreatGroup {
    SqlInjection,
    Xss,
    PathTraversal,
    CmdInjection,
    LdapInjection,
}

impl ThreatGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatGroup::SqlInjection => "sql_injection",
            ThreatGroup::Xss => "xss",
            ThreatGroup::PathTraversal => "path_traversal",
            ThreatGroup::CmdInjection => "cmd_injection",
            ThreatGroup::LdapInjection => "ldap_injection",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ContentPatternDoc {
    name: String,
    group: ThreatGroup,
    pattern: String,
    risk_score: f64,
}

/// One compiled content rule.
#[derive(Debug)]
pub struct ContentRule {
    pub name: String,
    pub group: ThreatGroup,
    pub regex: Regex,
    pub risk_score: f64,
}

/// Safety-filter whitelist and quick-check knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyDoc {
    /// Exact user-agent strings cleared at stage 1 (case-insensitive)
    #[serde(default)]
    pub whitelist_agents: Vec<String>,
    /// CIDR blocks cleared at stage 1
    #[serde(default)]
    pub whitelist_networks: Vec<String>,
    /// Endpoint globs cleared at stage 1 (`*` wildcard)
    #[serde(default)]
    pub whitelist_endpoints: Vec<String>,
    /// Bait endpoints; hits are strong suspicion
    #[serde(default)]
    pub honeypot_endpoints: Vec<String>,
    /// Requests per second over the 60 s bucket before stage 1 withholds
    /// its reputation shortcut
    #[serde(default = "default_burst_threshold")]
    pub burst_threshold: f64,
    /// Reputation at which stage 1 may clear a request outright
    #[serde(default = "default_safe_reputation")]
    pub safe_reputation: f64,
}

impl Default for SafetyDoc {
    fn default() -> Self {
        Self {
            whitelist_agents: Vec::new(),
            whitelist_networks: Vec::new(),
            whitelist_endpoints: Vec::new(),
            honeypot_endpoints: Vec::new(),
            burst_threshold: default_burst_threshold(),
            safe_reputation: default_safe_reputation(),
        }
    }
}

fn default_burst_threshold() -> f64 {
    5.0
}
fn default_safe_reputation() -> f64 {
    50.0
}

/// Compiled safety rules.
#[derive(Debug)]
pub struct SafetyRules {
    agents: Vec<String>,
    networks: Vec<IpNet>,
    endpoints: Vec<String>,
    honeypots: Vec<String>,
    pub burst_threshold: f64,
    pub safe_reputation: f64,
}

impl SafetyRules {
    pub fn is_whitelisted_agent(&self, user_agent: &str) -> bool {
        let normalized = user_agent.trim().to_ascii_lowercase();
        self.agents.iter().any(|a| *a == normalized)
    }

    pub fn is_whitelisted_address(&self, address: &str) -> bool {
        let Some(ip) = parse_address(address) else {
            return false;
        };
        self.networks.iter().any(|net| net.contains(&ip))
    }

    pub fn is_whitelisted_endpoint(&self, endpoint: &str) -> bool {
        self.endpoints.iter().any(|g| glob_match(g, endpoint))
    }

    pub fn is_honeypot(&self, endpoint: &str) -> bool {
        self.honeypots.iter().any(|g| glob_match(g, endpoint))
    }
}

/// Action sets per risk level, in ladder order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponsePolicies {
    #[serde(default = "default_actions_low")]
    pub low: Vec<Action>,
    #[serde(default = "default_actions_medium")]
    pub medium: Vec<Action>,
    #[serde(default = "default_actions_high")]
    pub high: Vec<Action>,
    #[serde(default = "default_actions_critical")]
    pub critical: Vec<Action>,
}

impl ResponsePolicies {
    pub fn for_level(&self, level: RiskLevel) -> Vec<Action> {
        let actions = match level {
            RiskLevel::Low => &self.low,
            RiskLevel::Medium => &self.medium,
            RiskLevel::High => &self.high,
            RiskLevel::Critical => &self.critical,
        };
        let mut out = Vec::with_capacity(actions.len());
        for action in actions {
            if !out.contains(action) {
                out.push(*action);
            }
        }
        out
    }
}

impl Default for ResponsePolicies {
    fn default() -> Self {
        Self {
            low: default_actions_low(),
            medium: default_actions_medium(),
            high: default_actions_high(),
            critical: default_actions_critical(),
        }
    }
}

fn default_actions_low() -> Vec<Action> {
    vec![Action::Log, Action::Track]
}
fn default_actions_medium() -> Vec<Action> {
    vec![Action::Log, Action::Track, Action::RateLimit]
}
fn default_actions_high() -> Vec<Action> {
    vec![
        Action::Log,
        Action::Track,
        Action::RateLimit,
        Action::ServeFake,
        Action::DeployCounter,
    ]
}
fn default_actions_critical() -> Vec<Action> {
    vec![
        Action::Log,
        Action::Track,
        Action::ServeFake,
        Action::DeployCounter,
        Action::AggressiveRateLimit,
        Action::SetTraps,
        Action::ReverseTracking,
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RulesDoc {
    #[serde(default = "default_min_suspicious")]
    min_suspicious: f64,
    #[serde(default)]
    risk_thresholds: RiskThresholds,
    #[serde(default = "default_consistent_timing")]
    consistent_timing: PatternThreshold,
    #[serde(default = "default_burst_activity")]
    burst_activity: PatternThreshold,
    #[serde(default)]
    behavior: BehaviorScores,
    #[serde(default)]
    ml_attack: MlAttackScores,
    #[serde(default)]
    content_patterns: Vec<ContentPatternDoc>,
    #[serde(default)]
    safety: SafetyDoc,
    #[serde(default)]
    response_policies: ResponsePolicies,
    #[serde(default = "default_max_scan_bytes")]
    max_scan_bytes: usize,
    #[serde(default = "default_min_pattern_score")]
    min_pattern_score: f64,
}

fn default_min_suspicious() -> f64 {
    30.0
}
fn default_consistent_timing() -> PatternThreshold {
    PatternThreshold {
        threshold: 0.1,
        risk_score: 60.0,
    }
}
fn default_burst_activity() -> PatternThreshold {
    PatternThreshold {
        threshold: 5.0,
        risk_score: 70.0,
    }
}
fn default_max_scan_bytes() -> usize {
    16 * 1024
}
fn default_min_pattern_score() -> f64 {
    5.0
}

/// The validated, compiled rules table.
#[derive(Debug)]
pub struct RuleBook {
    pub min_suspicious: f64,
    pub thresholds: RiskThresholds,
    pub consistent_timing: PatternThreshold,
    pub burst_activity: PatternThreshold,
    pub behavior: BehaviorScores,
    pub ml_attack: MlAttackScores,
    pub content: Vec<ContentRule>,
    pub safety: SafetyRules,
    pub response_policies: ResponsePolicies,
    pub max_scan_bytes: usize,
    pub min_pattern_score: f64,
}

impl RulesDoc {
    fn compile(self) -> Result<RuleBook, ConfigError> {
        if !(0.0 < self.min_suspicious && self.min_suspicious <= 100.0) {
            return Err(ConfigError::rules(format!(
                "min_suspicious {} outside (0, 100]",
                self.min_suspicious
            )));
        }

        let ladder = &self.risk_thresholds;
        if !(ladder.low < ladder.medium && ladder.medium < ladder.high && ladder.high < ladder.critical)
        {
            return Err(ConfigError::rules(format!(
                "risk_thresholds must be strictly increasing, got {} / {} / {} / {}",
                ladder.low, ladder.medium, ladder.high, ladder.critical
            )));
        }

        for (name, threshold) in [
            ("consistent_timing", &self.consistent_timing),
            ("burst_activity", &self.burst_activity),
        ] {
            if threshold.risk_score <= 0.0 {
                return Err(ConfigError::rules(format!(
                    "{name}.risk_score must be positive"
                )));
            }
            if threshold.threshold <= 0.0 {
                return Err(ConfigError::rules(format!(
                    "{name}.threshold must be positive"
                )));
            }
        }

        for (name, score) in [
            ("behavior.systematic_enumeration", self.behavior.systematic_enumeration),
            ("behavior.token_sweep", self.behavior.token_sweep),
            ("behavior.fingerprint_rotation", self.behavior.fingerprint_rotation),
            ("behavior.honeypot_probe", self.behavior.honeypot_probe),
            ("ml_attack.model_inversion", self.ml_attack.model_inversion),
            ("ml_attack.membership_inference", self.ml_attack.membership_inference),
            ("ml_attack.model_extraction", self.ml_attack.model_extraction),
            ("min_pattern_score", self.min_pattern_score),
        ] {
            if score <= 0.0 {
                return Err(ConfigError::rules(format!("{name} must be positive")));
            }
        }

        if self.content_patterns.is_empty() {
            return Err(ConfigError::rules("content_patterns must not be empty"));
        }
        let mut content = Vec::with_capacity(self.content_patterns.len());
        for doc in self.content_patterns {
            if doc.risk_score <= 0.0 {
                return Err(ConfigError::rules(format!(
                    "content pattern '{}' risk_score must be positive",
                    doc.name
                )));
            }
            let regex = Regex::new(&doc.pattern).map_err(|e| {
                ConfigError::rules(format!("content pattern '{}' invalid: {e}", doc.name))
            })?;
            content.push(ContentRule {
                name: doc.name,
                group: doc.group,
                regex,
                risk_score: doc.risk_score,
            });
        }

        let mut networks = Vec::with_capacity(self.safety.whitelist_networks.len());
        for cidr in &self.safety.whitelist_networks {
            let net: IpNet = cidr
                .parse()
                .map_err(|e| ConfigError::rules(format!("whitelist network '{cidr}': {e}")))?;
            networks.push(net);
        }

        let safety = SafetyRules {
            agents: self
                .safety
                .whitelist_agents
                .iter()
                .map(|a| a.trim().to_ascii_lowercase())
                .collect(),
            networks,
            endpoints: self.safety.whitelist_endpoints.clone(),
            honeypots: self.safety.honeypot_endpoints.clone(),
            burst_threshold: self.safety.burst_threshold,
            safe_reputation: self.safety.safe_reputation,
        };

        Ok(RuleBook {
            min_suspicious: self.min_suspicious,
            thresholds: self.risk_thresholds,
            consistent_timing: self.consistent_timing,
            burst_activity: self.burst_activity,
            behavior: self.behavior,
            ml_attack: self.ml_attack,
            content,
            safety,
            response_policies: self.response_policies,
            max_scan_bytes: self.max_scan_bytes,
            min_pattern_score: self.min_pattern_score,
        })
    }
}

// ---------------------------------------------------------------------------
// Policies document

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScenarioDoc {
    name: String,
    threat_categories: Vec<String>,
    #[serde(default)]
    payload_kinds: Vec<PayloadKind>,
    template_id: String,
    counter_strategy: String,
    #[serde(default)]
    isolation_level: IsolationLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CounterStrategyDoc {
    tiers: BTreeMap<String, IntensitySpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PoliciesDoc {
    scenarios: Vec<ScenarioDoc>,
    counter_strategies: BTreeMap<String, CounterStrategyDoc>,
    fallback_scenario: String,
}

/// The validated scenario and counter-strategy tables.
#[derive(Debug)]
pub struct PolicyBook {
    pub scenarios: Vec<Scenario>,
    pub strategies: Vec<CounterStrategy>,
    pub fallback_scenario: String,
}

impl PoliciesDoc {
    fn compile(self) -> Result<PolicyBook, ConfigError> {
        if self.scenarios.is_empty() {
            return Err(ConfigError::policies("scenarios must not be empty"));
        }

        let mut strategies = Vec::with_capacity(self.counter_strategies.len());
        for (name, doc) in self.counter_strategies {
            let tier = |key: &str| -> Result<IntensitySpec, ConfigError> {
                doc.tiers.get(key).copied().ok_or_else(|| {
                    ConfigError::policies(format!(
                        "counter strategy '{name}' missing tier '{key}'"
                    ))
                })
            };
            let (low, medium, high) = (tier("low")?, tier("medium")?, tier("high")?);

            let non_decreasing = low.record_count <= medium.record_count
                && medium.record_count <= high.record_count
                && low.payload_bytes <= medium.payload_bytes
                && medium.payload_bytes <= high.payload_bytes;
            if !non_decreasing {
                return Err(ConfigError::policies(format!(
                    "counter strategy '{name}' tiers must be non-decreasing"
                )));
            }
            for (tier_name, spec) in [("low", &low), ("medium", &medium), ("high", &high)] {
                if !(0.0..=1.0).contains(&spec.contradiction_ratio) {
                    return Err(ConfigError::policies(format!(
                        "counter strategy '{name}' tier '{tier_name}' contradiction_ratio outside [0, 1]"
                    )));
                }
                if spec.record_count == 0 {
                    return Err(ConfigError::policies(format!(
                        "counter strategy '{name}' tier '{tier_name}' record_count must be positive"
                    )));
                }
            }
            strategies.push(CounterStrategy {
                name,
                low,
                medium,
                high,
            });
        }

        let mut scenarios = Vec::with_capacity(self.scenarios.len());
        let mut claimed: BTreeMap<String, String> = BTreeMap::new();
        for doc in self.scenarios {
            if doc.threat_categories.is_empty() {
                return Err(ConfigError::policies(format!(
                    "scenario '{}' must name at least one threat category",
                    doc.name
                )));
            }
            if PayloadKind::from_template_id(&doc.template_id).is_none() {
                return Err(ConfigError::policies(format!(
                    "scenario '{}' references unknown template '{}'",
                    doc.name, doc.template_id
                )));
            }
            if !strategies.iter().any(|s| s.name == doc.counter_strategy) {
                return Err(ConfigError::policies(format!(
                    "scenario '{}' references unknown counter strategy '{}'",
                    doc.name, doc.counter_strategy
                )));
            }
            for category in &doc.threat_categories {
                if let Some(other) = claimed.insert(category.clone(), doc.name.clone()) {
                    return Err(ConfigError::policies(format!(
                        "threat category '{category}' claimed by both '{other}' and '{}'",
                        doc.name
                    )));
                }
            }
            scenarios.push(Scenario {
                name: doc.name,
                threat_categories: doc.threat_categories.into_iter().collect(),
                payload_kinds: doc.payload_kinds.into_iter().collect(),
                template_id: doc.template_id,
                counter_strategy: doc.counter_strategy,
                isolation_level: doc.isolation_level,
            });
        }

        if !scenarios.iter().any(|s| s.name == self.fallback_scenario) {
            return Err(ConfigError::policies(format!(
                "fallback scenario '{}' is not defined",
                self.fallback_scenario
            )));
        }

        Ok(PolicyBook {
            scenarios,
            strategies,
            fallback_scenario: self.fallback_scenario,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers

/// Strip an optional `:port` and parse the address.
fn parse_address(address: &str) -> Option<IpAddr> {
    let trimmed = address.trim();
    if let Ok(ip) = trimmed.parse() {
        return Some(ip);
    }
    // v4 with port, or bracketed v6
    if let Some((host, _)) = trimmed.rsplit_once(':') {
        let host = host.trim_start_matches('[').trim_end_matches(']');
        return host.parse().ok();
    }
    None
}

/// Minimal glob: `*` matches any run of characters. Ordered-fragment check,
/// no character classes.
pub(crate) fn glob_match(pattern: &str, input: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == input;
    }
    let fragments: Vec<&str> = pattern.split('*').collect();
    let mut rest = input;
    for (i, fragment) in fragments.iter().enumerate() {
        if fragment.is_empty() {
            continue;
        }
        if i == 0 {
            if !rest.starts_with(fragment) {
                return false;
            }
            rest = &rest[fragment.len()..];
        } else if let Some(pos) = rest.find(fragment) {
            rest = &rest[pos + fragment.len()..];
        } else {
            return false;
        }
    }
    // A pattern not ending in '*' must consume the whole input
    if let Some(last) = fragments.last() {
        if !last.is_empty() && !rest.is_empty() {
            return input.ends_with(last);
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_documents_load() {
        let config = load_default().unwrap();
        assert!(!config.rules.content.is_empty());
        assert!(!config.policies.scenarios.is_empty());
        assert!(config
            .policies
            .scenarios
            .iter()
            .any(|s| s.name == config.policies.fallback_scenario));
    }

    #[test]
    fn ladder_must_increase() {
        let rules = r#"{
            "risk_thresholds": {"low": 30, "medium": 30, "high": 60, "critical": 80},
            "content_patterns": [{"name": "x", "group": "xss", "pattern": "x", "risk_score": 10}]
        }"#;
        let err = load(rules, DEFAULT_POLICIES_JSON).unwrap_err();
        assert!(err.to_string().contains("strictly increasing"));
    }

    #[test]
    fn non_positive_score_rejected() {
        let rules = r#"{
            "content_patterns": [{"name": "x", "group": "xss", "pattern": "x", "risk_score": 0}]
        }"#;
        let err = load(rules, DEFAULT_POLICIES_JSON).unwrap_err();
        assert!(err.to_string().contains("risk_score must be positive"));
    }

    #[test]
    fn bad_regex_rejected() {
        let rules = r#"{
            "content_patterns": [{"name": "broken", "group": "xss", "pattern": "([", "risk_score": 5}]
        }"#;
        let err = load(rules, DEFAULT_POLICIES_JSON).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }

    #[test]
    fn unknown_template_rejected() {
        let policies = r#"{
            "scenarios": [{
                "name": "s", "threat_categories": ["x"],
                "template_id": "no_such_builder", "counter_strategy": "c"
            }],
            "counter_strategies": {"c": {"tiers": {
                "low": {"record_count": 1, "payload_bytes": 64},
                "medium": {"record_count": 2, "payload_bytes": 128},
                "high": {"record_count": 3, "payload_bytes": 256}
            }}},
            "fallback_scenario": "s"
        }"#;
        let err = load(DEFAULT_RULES_JSON, policies).unwrap_err();
        assert!(err.to_string().contains("unknown template"));
    }

    #[test]
    fn scenario_needs_categories() {
        let policies = r#"{
            "scenarios": [{
                "name": "s", "threat_categories": [],
                "template_id": "generic", "counter_strategy": "c"
            }],
            "counter_strategies": {"c": {"tiers": {
                "low": {"record_count": 1, "payload_bytes": 64},
                "medium": {"record_count": 2, "payload_bytes": 128},
                "high": {"record_count": 3, "payload_bytes": 256}
            }}},
            "fallback_scenario": "s"
        }"#;
        let err = load(DEFAULT_RULES_JSON, policies).unwrap_err();
        assert!(err.to_string().contains("at least one threat category"));
    }

    #[test]
    fn decreasing_tiers_rejected() {
        let policies = r#"{
            "scenarios": [{
                "name": "s", "threat_categories": ["x"],
                "template_id": "generic", "counter_strategy": "c"
            }],
            "counter_strategies": {"c": {"tiers": {
                "low": {"record_count": 10, "payload_bytes": 64},
                "medium": {"record_count": 5, "payload_bytes": 128},
                "high": {"record_count": 20, "payload_bytes": 256}
            }}},
            "fallback_scenario": "s"
        }"#;
        let err = load(DEFAULT_RULES_JSON, policies).unwrap_err();
        assert!(err.to_string().contains("non-decreasing"));
    }

    #[test]
    fn missing_tier_rejected() {
        let policies = r#"{
            "scenarios": [{
                "name": "s", "threat_categories": ["x"],
                "template_id": "generic", "counter_strategy": "c"
            }],
            "counter_strategies": {"c": {"tiers": {
                "low": {"record_count": 1, "payload_bytes": 64},
                "high": {"record_count": 3, "payload_bytes": 256}
            }}},
            "fallback_scenario": "s"
        }"#;
        let err = load(DEFAULT_RULES_JSON, policies).unwrap_err();
        assert!(err.to_string().contains("missing tier 'medium'"));
    }

    #[test]
    fn duplicate_category_rejected() {
        let policies = r#"{
            "scenarios": [
                {"name": "a", "threat_categories": ["x"], "template_id": "generic", "counter_strategy": "c"},
                {"name": "b", "threat_categories": ["x"], "template_id": "generic", "counter_strategy": "c"}
            ],
            "counter_strategies": {"c": {"tiers": {
                "low": {"record_count": 1, "payload_bytes": 64},
                "medium": {"record_count": 2, "payload_bytes": 128},
                "high": {"record_count": 3, "payload_bytes": 256}
            }}},
            "fallback_scenario": "a"
        }"#;
        let err = load(DEFAULT_RULES_JSON, policies).unwrap_err();
        assert!(err.to_string().contains("claimed by both"));
    }

    #[test]
    fn safety_rules_match() {
        let config = load_default().unwrap();
        let safety = &config.rules.safety;
        assert!(safety.is_whitelisted_agent("HealthCheck/1.0"));
        assert!(safety.is_whitelisted_agent("healthcheck/1.0 "));
        assert!(!safety.is_whitelisted_agent("curl/8.0"));

        assert!(safety.is_whitelisted_address("10.3.4.5"));
        assert!(safety.is_whitelisted_address("127.0.0.1:9000"));
        assert!(!safety.is_whitelisted_address("203.0.113.9"));

        assert!(safety.is_whitelisted_endpoint("/health"));
        assert!(safety.is_whitelisted_endpoint("/health/ready"));
        assert!(!safety.is_whitelisted_endpoint("/api/users"));

        assert!(safety.is_honeypot("/.env"));
        assert!(safety.is_honeypot("/wp-admin/setup.php"));
        assert!(!safety.is_honeypot("/api/users"));
    }

    #[test]
    fn glob_semantics() {
        assert!(glob_match("/health*", "/health"));
        assert!(glob_match("/health*", "/healthz"));
        assert!(glob_match("/metrics", "/metrics"));
        assert!(!glob_match("/metrics", "/metrics/raw"));
        assert!(glob_match("/api/*/status", "/api/v1/status"));
        assert!(!glob_match("/api/*/status", "/api/v1/stats"));
    }
}
