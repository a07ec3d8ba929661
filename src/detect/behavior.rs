//! Behavioral checks
//!
//! Looks for the shapes automation leaves in a request sequence: endpoints
//! walked in arithmetic order, one parameter swept through a dictionary,
//! one address cycling user agents, and probes against bait endpoints.

use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use crate::config::RuleBook;
use crate::request::{HistoryEntry, Request};

use super::{Evidence, Findings};

fn numeric_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/(\d+)/?$").expect("static pattern"))
}

pub(crate) fn check(
    req: &Request,
    history: &[HistoryEntry],
    agent_count: usize,
    rules: &RuleBook,
    findings: &mut Findings,
) {
    let behavior = &rules.behavior;

    if let Some((distinct, run)) = enumeration_run(history, behavior.enumeration_min_run) {
        findings.add(
            "systematic_enumeration",
            Evidence::Enumeration {
                distinct_endpoints: distinct,
                run_length: run,
            },
            behavior.systematic_enumeration,
        );
    }

    if let Some((param, values)) = token_sweep(history, behavior.token_sweep_min_values) {
        findings.add(
            "token_sweep",
            Evidence::TokenSweep {
                param,
                distinct_values: values,
            },
            behavior.token_sweep,
        );
    }

    if agent_count >= behavior.rotation_min_agents {
        findings.add(
            "fingerprint_rotation",
            Evidence::Rotation {
                user_agents: agent_count,
            },
            behavior.fingerprint_rotation,
        );
    }

    // Bait paths have no legitimate callers; a hit is category-bearing
    // evidence on its own.
    if rules.safety.is_honeypot(&req.endpoint) {
        findings.add_categorized(
            "honeypot_probe",
            "reconnaissance",
            Evidence::HoneypotProbe {
                endpoint: req.endpoint.clone(),
            },
            behavior.honeypot_probe,
        );
    }
}

/// Detect monotonic numeric walks over endpoint suffixes
/// (`/api/user/1`, `/api/user/2`, ...). Returns (distinct endpoints,
/// run length) when at least `min_run` suffixes step by at most 2.
pub fn enumeration_run(history: &[HistoryEntry], min_run: usize) -> Option<(usize, usize)> {
    let mut suffixes: Vec<i64> = history
        .iter()
        .filter_map(|e| {
            numeric_suffix_re()
                .captures(&e.endpoint)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
        .collect();
    if suffixes.len() < min_run {
        return None;
    }
    suffixes.sort_unstable();
    suffixes.dedup();
    if suffixes.len() < min_run {
        return None;
    }

    let sequential = suffixes.windows(2).all(|w| w[1] - w[0] <= 2);
    if sequential {
        let distinct: BTreeSet<&str> = history.iter().map(|e| e.endpoint.as_str()).collect();
        Some((distinct.len(), suffixes.len()))
    } else {
        None
    }
}

/// Detect one parameter swept across many distinct values while the rest of
/// the request stays fixed. Returns the busiest param and its cardinality.
pub fn token_sweep(history: &[HistoryEntry], min_values: usize) -> Option<(String, usize)> {
    let mut value_sets: BTreeMap<&str, BTreeSet<u64>> = BTreeMap::new();
    for entry in history {
        for (key, value_hash) in &entry.params {
            value_sets.entry(key.as_str()).or_default().insert(*value_hash);
        }
    }
    value_sets
        .into_iter()
        .map(|(key, values)| (key.to_string(), values.len()))
        .filter(|(_, count)| *count >= min_values)
        .max_by_key(|(_, count)| *count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;

    fn entry(endpoint: &str, ts: f64) -> HistoryEntry {
        HistoryEntry::from_request(
            &Request::builder(endpoint)
                .timestamp(ts)
                .source_address("203.0.113.2")
                .user_agent("scanner")
                .build(),
        )
    }

    fn paged_entry(page: usize, ts: f64) -> HistoryEntry {
        HistoryEntry::from_request(
            &Request::builder("/api/products")
                .timestamp(ts)
                .source_address("203.0.113.2")
                .user_agent("scanner")
                .param("page", page.to_string())
                .build(),
        )
    }

    #[test]
    fn sequential_id_walk_detected() {
        let history: Vec<_> = (1..=8)
            .map(|i| entry(&format!("/api/users/{i}"), i as f64))
            .collect();
        let (distinct, run) = enumeration_run(&history, 5).unwrap();
        assert_eq!(distinct, 8);
        assert_eq!(run, 8);
    }

    #[test]
    fn scattered_ids_not_a_walk() {
        let ids = [3, 999, 42, 7000, 12, 88];
        let history: Vec<_> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| entry(&format!("/api/users/{id}"), i as f64))
            .collect();
        assert!(enumeration_run(&history, 5).is_none());
    }

    #[test]
    fn param_sweep_detected() {
        let history: Vec<_> = (0..40).map(|i| paged_entry(i, i as f64)).collect();
        let (param, count) = token_sweep(&history, 20).unwrap();
        assert_eq!(param, "page");
        assert_eq!(count, 40);
    }

    #[test]
    fn stable_params_do_not_sweep() {
        let history: Vec<_> = (0..40).map(|i| paged_entry(7, i as f64)).collect();
        assert!(token_sweep(&history, 20).is_none());
    }

    #[test]
    fn honeypot_probe_is_categorized() {
        let rules = config::load_default().unwrap().rules;
        let req = Request::builder("/.env")
            .timestamp(1.0)
            .source_address("203.0.113.2")
            .user_agent("curl/7.88.0")
            .build();
        let history = vec![HistoryEntry::from_request(&req)];

        let mut findings = Findings::default();
        check(&req, &history, 1, &rules, &mut findings);
        assert!(findings.patterns.contains("honeypot_probe"));
        assert!(findings.groups.contains_key("reconnaissance"));
    }

    #[test]
    fn agent_rotation_detected() {
        let rules = config::load_default().unwrap().rules;
        let req = Request::builder("/api/data")
            .timestamp(1.0)
            .source_address("203.0.113.2")
            .user_agent("agent-nine")
            .build();
        let history = vec![HistoryEntry::from_request(&req)];

        let mut findings = Findings::default();
        check(&req, &history, 9, &rules, &mut findings);
        assert!(findings.patterns.contains("fingerprint_rotation"));
    }
}
