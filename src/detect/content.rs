//! Content checks
//!
//! Runs the compiled rule patterns over the request's inspectable text.
//! Within a group only the first matching rule scores, so stacking five
//! SQLi variants in one request buys the attacker nothing; distinct groups
//! accumulate. A scan-byte budget bounds regex work per request.

use crate::config::{ContentRule, RuleBook};
use crate::request::Request;

use super::{Evidence, Findings};

/// Matched-snippet length kept in evidence.
const SNIPPET_LEN: usize = 80;

pub(crate) fn check(req: &Request, rules: &RuleBook, findings: &mut Findings) {
    let corpus = scan_corpus(req);
    let budget = rules.max_scan_bytes;

    let (scan, truncated) = if corpus.len() > budget {
        (truncate_at_boundary(&corpus, budget), true)
    } else {
        (corpus.as_str(), false)
    };

    if truncated {
        // The unscanned tail could hide anything; charge the minimum score
        // rather than pretend the scan was complete.
        findings.add(
            "scan_budget",
            Evidence::BudgetExceeded {
                scanned_bytes: scan.len(),
                total_bytes: corpus.len(),
            },
            rules.min_pattern_score,
        );
    }

    let mut matched_groups: Vec<&str> = Vec::new();
    for rule in &rules.content {
        let group = rule.group.as_str();
        if matched_groups.contains(&group) {
            continue;
        }
        if let Some(found) = rule.regex.find(scan) {
            matched_groups.push(group);
            findings.add_categorized(
                group,
                group,
                Evidence::Content {
                    group: group.to_string(),
                    rule: rule.name.clone(),
                    matched: snippet(found.as_str()),
                },
                rule.risk_score,
            );
        }
    }
}

/// Everything a content rule may match against: path, query pairs, body.
fn scan_corpus(req: &Request) -> String {
    let mut corpus = String::with_capacity(req.content_size() + 16);
    corpus.push_str(&req.endpoint);
    for (key, value) in &req.query_params {
        corpus.push(' ');
        corpus.push_str(key);
        corpus.push('=');
        corpus.push_str(value);
    }
    corpus.push(' ');
    corpus.push_str(&req.body);
    corpus
}

fn truncate_at_boundary(corpus: &str, limit: usize) -> &str {
    let mut end = limit.min(corpus.len());
    while end > 0 && !corpus.is_char_boundary(end) {
        end -= 1;
    }
    &corpus[..end]
}

fn snippet(matched: &str) -> String {
    if matched.len() <= SNIPPET_LEN {
        matched.to_string()
    } else {
        let cut = truncate_at_boundary(matched, SNIPPET_LEN);
        format!("{cut}...")
    }
}

/// Lightweight yes/no scan used by the safety filter's quick pass.
/// Respects the same budget but reports only whether anything matched.
pub(crate) fn any_match(req: &Request, content: &[ContentRule], budget: usize) -> bool {
    let corpus = scan_corpus(req);
    let scan = truncate_at_boundary(&corpus, budget);
    content.iter().any(|rule| rule.regex.is_match(scan))
}

/// First matching rule with its matched snippet. Deep-inspection entry
/// point for the safety filter.
pub(crate) fn first_match<'a>(
    req: &Request,
    content: &'a [ContentRule],
    budget: usize,
) -> Option<(&'a ContentRule, String)> {
    let corpus = scan_corpus(req);
    let scan = truncate_at_boundary(&corpus, budget);
    for rule in content {
        if let Some(found) = rule.regex.find(scan) {
            return Some((rule, snippet(found.as_str())));
        }
    }
    None
}
