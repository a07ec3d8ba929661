//! Model-attack checks
//!
//! Heuristics for the query shapes model attacks leave behind: inversion
//! probes vary many feature parameters at once, membership inference
//! replays near-identical queries, extraction walks the whole parameter
//! space. All three read only the history snapshot's parameter sketches.

use std::collections::BTreeSet;

use crate::config::RuleBook;
use crate::request::HistoryEntry;

use super::{Evidence, Findings};

pub(crate) fn check(history: &[HistoryEntry], rules: &RuleBook, findings: &mut Findings) {
    let ml = &rules.ml_attack;
    if history.len() < ml.min_history {
        return;
    }
    let tail = window_tail(history, ml.window);

    if let Some(ratio) = inversion_probe(tail) {
        findings.add_categorized(
            "model_inversion",
            "ml_attack",
            Evidence::MlAttack {
                pattern: "model_inversion".to_string(),
                metric: ratio,
            },
            ml.model_inversion,
        );
    }

    if let Some(ratio) = membership_replay(tail) {
        findings.add_categorized(
            "membership_inference",
            "ml_attack",
            Evidence::MlAttack {
                pattern: "membership_inference".to_string(),
                metric: ratio,
            },
            ml.membership_inference,
        );
    }

    if let Some(keys) = extraction_coverage(history, ml.extraction_min_keys, ml.extraction_min_requests)
    {
        findings.add_categorized(
            "model_extraction",
            "ml_attack",
            Evidence::MlAttack {
                pattern: "model_extraction".to_string(),
                metric: keys as f64,
            },
            ml.model_extraction,
        );
    }
}

pub(crate) fn window_tail(history: &[HistoryEntry], window: usize) -> &[HistoryEntry] {
    if history.len() > window {
        &history[history.len() - window..]
    } else {
        history
    }
}

/// Boundary exploration: nearly every query in the window is a fresh
/// combination across several feature parameters. A single counter being
/// paged (one varying key) is scraping, not inversion, and is excluded.
pub(crate) fn inversion_probe(tail: &[HistoryEntry]) -> Option<f64> {
    let varying_keys: BTreeSet<&str> = {
        let mut per_key: std::collections::BTreeMap<&str, BTreeSet<u64>> = Default::default();
        for entry in tail {
            for (key, value) in &entry.params {
                per_key.entry(key.as_str()).or_default().insert(*value);
            }
        }
        per_key
            .into_iter()
            .filter(|(_, values)| values.len() > 1)
            .map(|(key, _)| key)
            .collect()
    };
    if varying_keys.len() < 3 {
        return None;
    }

    let combos: BTreeSet<&[u8; 32]> = tail.iter().map(|e| &e.content_hash).collect();
    let ratio = combos.len() as f64 / tail.len() as f64;
    (ratio > 0.8).then_some(ratio)
}

/// Repeated near-identical queries: under half the window is unique.
fn membership_replay(tail: &[HistoryEntry]) -> Option<f64> {
    let unique: BTreeSet<&[u8; 32]> = tail.iter().map(|e| &e.content_hash).collect();
    let ratio = unique.len() as f64 / tail.len() as f64;
    (ratio < 0.5).then_some(ratio)
}

/// Systematic feature-space coverage: many distinct parameter keys across a
/// long window.
fn extraction_coverage(
    history: &[HistoryEntry],
    min_keys: usize,
    min_requests: usize,
) -> Option<usize> {
    if history.len() < min_requests {
        return None;
    }
    let keys: BTreeSet<&str> = history
        .iter()
        .flat_map(|e| e.params.iter().map(|(k, _)| k.as_str()))
        .collect();
    (keys.len() > min_keys).then_some(keys.len())
}
