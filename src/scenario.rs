//! Deception scenarios
//!
//! A scenario binds a threat category to a payload recipe: which builder
//! runs, under which counter-strategy, at which isolation level. Scenarios
//! are purely declarative and loaded once from the policies document;
//! dispatch is a table lookup, never a type hierarchy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::deception::PayloadKind;
use crate::scorer::RiskLevel;

/// How far the collaborator should isolate the deceived session.
/// Carried as data on the verdict; nothing here enforces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    #[default]
    None,
    Process,
    Container,
}

/// Intensity tier selected from the risk level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntensityTier {
    Low,
    Medium,
    High,
}

impl IntensityTier {
    /// Level to tier mapping: CRITICAL gets the full treatment, MEDIUM the
    /// light one. LOW never reaches payload generation.
    pub fn for_level(level: RiskLevel) -> Option<Self> {
        match level {
            RiskLevel::Critical => Some(IntensityTier::High),
            RiskLevel::High => Some(IntensityTier::Medium),
            RiskLevel::Medium => Some(IntensityTier::Low),
            RiskLevel::Low => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IntensityTier::Low => "low",
            IntensityTier::Medium => "medium",
            IntensityTier::High => "high",
        }
    }
}

/// Numeric knobs for one intensity tier of a counter-strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntensitySpec {
    /// Records (rows, files, accounts, env keys) the builder emits
    pub record_count: usize,
    /// Soft cap on the serialized payload size
    pub payload_bytes: usize,
    /// Fraction of contradictory twin documents, for poisoning kinds
    #[serde(default)]
    pub contradiction_ratio: f64,
}

/// Per-strategy intensity table. Validated at load: all three tiers present,
/// non-decreasing.
#[derive(Debug, Clone, PartialEq)]
pub struct CounterStrategy {
    pub name: String,
    pub low: IntensitySpec,
    pub medium: IntensitySpec,
    pub high: IntensitySpec,
}

impl CounterStrategy {
    pub fn tier(&self, tier: IntensityTier) -> &IntensitySpec {
        match tier {
            IntensityTier::Low => &self.low,
            IntensityTier::Medium => &self.medium,
            IntensityTier::High => &self.high,
        }
    }
}

/// Declarative binding of threat categories to a payload recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub threat_categories: BTreeSet<String>,
    pub payload_kinds: BTreeSet<PayloadKind>,
    pub template_id: String,
    pub counter_strategy: String,
    pub isolation_level: IsolationLevel,
}

/// Resolved view over the loaded policy book: category → scenario plus the
/// intensity tables.
pub struct ScenarioRegistry<'a> {
    scenarios: &'a [Scenario],
    strategies: &'a [CounterStrategy],
    fallback: &'a str,
}

/// Outcome of a resolution: the scenario plus whether we fell back.
pub struct Resolution<'a> {
    pub scenario: &'a Scenario,
    pub fallback_used: bool,
}

impl<'a> ScenarioRegistry<'a> {
    pub fn new(
        scenarios: &'a [Scenario],
        strategies: &'a [CounterStrategy],
        fallback: &'a str,
    ) -> Self {
        Self {
            scenarios,
            strategies,
            fallback,
        }
    }

    /// The unique scenario covering `threat_category`, or the configured
    /// fallback when nothing matches.
    ///
    /// Load-time validation guarantees the fallback exists and that no
    /// category is claimed twice.
    pub fn resolve(&self, threat_category: &str) -> Resolution<'a> {
        if let Some(scenario) = self
            .scenarios
            .iter()
            .find(|s| s.threat_categories.contains(threat_category))
        {
            return Resolution {
                scenario,
                fallback_used: false,
            };
        }
        let scenario = self
            .scenarios
            .iter()
            .find(|s| s.name == self.fallback)
            .expect("validated at load: fallback scenario exists");
        Resolution {
            scenario,
            fallback_used: true,
        }
    }

    /// Intensity record for a scenario at a tier.
    pub fn intensity(&self, scenario: &Scenario, tier: IntensityTier) -> IntensitySpec {
        *self
            .strategies
            .iter()
            .find(|s| s.name == scenario.counter_strategy)
            .expect("validated at load: counter strategy exists")
            .tier(tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strategy() -> CounterStrategy {
        CounterStrategy {
            name: "test".to_string(),
            low: IntensitySpec {
                record_count: 5,
                payload_bytes: 512,
                contradiction_ratio: 0.0,
            },
            medium: IntensitySpec {
                record_count: 20,
                payload_bytes: 2048,
                contradiction_ratio: 0.0,
            },
            high: IntensitySpec {
                record_count: 80,
                payload_bytes: 8192,
                contradiction_ratio: 0.5,
            },
        }
    }

    fn scenario(name: &str, categories: &[&str]) -> Scenario {
        Scenario {
            name: name.to_string(),
            threat_categories: categories.iter().map(|c| c.to_string()).collect(),
            payload_kinds: BTreeSet::new(),
            template_id: "generic".to_string(),
            counter_strategy: "test".to_string(),
            isolation_level: IsolationLevel::None,
        }
    }

    #[test]
    fn tier_mapping_tracks_level() {
        assert_eq!(
            IntensityTier::for_level(RiskLevel::Critical),
            Some(IntensityTier::High)
        );
        assert_eq!(
            IntensityTier::for_level(RiskLevel::High),
            Some(IntensityTier::Medium)
        );
        assert_eq!(
            IntensityTier::for_level(RiskLevel::Medium),
            Some(IntensityTier::Low)
        );
        assert_eq!(IntensityTier::for_level(RiskLevel::Low), None);
    }

    #[test]
    fn resolve_by_category() {
        let scenarios = vec![
            scenario("sql_trap", &["sql_injection"]),
            scenario("fallback", &["generic"]),
        ];
        let strategies = vec![strategy()];
        let registry = ScenarioRegistry::new(&scenarios, &strategies, "fallback");

        let hit = registry.resolve("sql_injection");
        assert_eq!(hit.scenario.name, "sql_trap");
        assert!(!hit.fallback_used);

        let miss = registry.resolve("never_heard_of_it");
        assert_eq!(miss.scenario.name, "fallback");
        assert!(miss.fallback_used);
    }

    #[test]
    fn intensity_lookup() {
        let scenarios = vec![scenario("s", &["x"])];
        let strategies = vec![strategy()];
        let registry = ScenarioRegistry::new(&scenarios, &strategies, "s");
        let spec = registry.intensity(&scenarios[0], IntensityTier::High);
        assert_eq!(spec.record_count, 80);
    }
}
