//! Built-in configuration documents
//!
//! Embedded rules and policies so the pipeline runs with zero external
//! files. Operators override by passing their own documents to
//! [`super::load`]; the loader path is identical either way.

/// Default detection rules document.
pub const DEFAULT_RULES_JSON: &str = r#"{
  "min_suspicious": 30,
  "risk_thresholds": { "low": 10, "medium": 30, "high": 60, "critical": 80 },
  "consistent_timing": { "threshold": 0.1, "risk_score": 60 },
  "burst_activity": { "threshold": 5.0, "risk_score": 70 },
  "behavior": {
    "systematic_enumeration": 75,
    "token_sweep": 70,
    "fingerprint_rotation": 80,
    "honeypot_probe": 85,
    "enumeration_min_run": 5,
    "token_sweep_min_values": 20,
    "rotation_min_agents": 5
  },
  "ml_attack": {
    "model_inversion": 90,
    "membership_inference": 85,
    "model_extraction": 95,
    "window": 20,
    "min_history": 10,
    "extraction_min_keys": 10,
    "extraction_min_requests": 50,
    "sweep_min_values": 50
  },
  "content_patterns": [
    {
      "name": "sql_keyword_clause",
      "group": "sql_injection",
      "pattern": "(?i)\\b(union|select|insert|update|delete|drop|alter)\\b[\\s\\S]{0,512}?\\b(from|where|table|into)\\b",
      "risk_score": 85
    },
    {
      "name": "sql_quoted_tautology",
      "group": "sql_injection",
      "pattern": "(?i)'\\s*(or|and)\\s*'[^']*'\\s*=",
      "risk_score": 85
    },
    {
      "name": "sql_exec_builtin",
      "group": "sql_injection",
      "pattern": "(?i)\\b(xp_cmdshell|information_schema|exec\\s*\\()",
      "risk_score": 80
    },
    {
      "name": "xss_script_tag",
      "group": "xss",
      "pattern": "(?i)<script[^>]*>",
      "risk_score": 80
    },
    {
      "name": "xss_js_uri",
      "group": "xss",
      "pattern": "(?i)javascript\\s*:",
      "risk_score": 75
    },
    {
      "name": "xss_event_handler",
      "group": "xss",
      "pattern": "(?i)\\bon(error|load|click|mouseover|focus)\\s*=",
      "risk_score": 75
    },
    {
      "name": "traversal_dot_segments",
      "group": "path_traversal",
      "pattern": "\\.\\.[/\\\\]",
      "risk_score": 80
    },
    {
      "name": "traversal_system_files",
      "group": "path_traversal",
      "pattern": "(?i)(/etc/(passwd|shadow)|boot\\.ini|win\\.ini)",
      "risk_score": 80
    },
    {
      "name": "cmd_shell_chaining",
      "group": "cmd_injection",
      "pattern": "(?i)[;&|]\\s*(cat|ls|id|whoami|wget|curl|nc|bash|sh|ping)\\b",
      "risk_score": 85
    },
    {
      "name": "cmd_substitution",
      "group": "cmd_injection",
      "pattern": "\\$\\([^)]+\\)",
      "risk_score": 80
    },
    {
      "name": "ldap_filter_injection",
      "group": "ldap_injection",
      "pattern": "\\)\\s*\\(\\s*[|&]|\\(\\s*[|&]\\s*\\(",
      "risk_score": 75
    }
  ],
  "safety": {
    "whitelist_agents": ["HealthCheck/1.0", "GoogleHC/1.0", "kube-probe/1.29"],
    "whitelist_networks": ["10.0.0.0/8", "127.0.0.0/8", "192.168.0.0/16"],
    "whitelist_endpoints": ["/health*", "/ready*", "/metrics"],
    "honeypot_endpoints": [
      "/.env",
      "/.git/config",
      "/backup*",
      "/admin/config*",
      "/wp-admin*",
      "/phpmyadmin*"
    ],
    "burst_threshold": 5.0,
    "safe_reputation": 50.0
  },
  "response_policies": {
    "low": ["log", "track"],
    "medium": ["log", "track", "rate_limit"],
    "high": ["log", "track", "rate_limit", "serve_fake", "deploy_counter"],
    "critical": [
      "log",
      "track",
      "serve_fake",
      "deploy_counter",
      "aggressive_rate_limit",
      "set_traps",
      "reverse_tracking"
    ]
  },
  "max_scan_bytes": 16384,
  "min_pattern_score": 5
}"#;

/// Default deception policies document.
pub const DEFAULT_POLICIES_JSON: &str = r#"{
  "scenarios": [
    {
      "name": "sql_honeypot_db",
      "threat_categories": ["sql_injection"],
      "payload_kinds": ["sql_honeypot", "credential_honeypot"],
      "template_id": "sql_honeypot",
      "counter_strategy": "database_deception",
      "isolation_level": "container"
    },
    {
      "name": "api_scraping_flood",
      "threat_categories": ["suspicious_behavior", "bot_activity"],
      "payload_kinds": ["api_flood"],
      "template_id": "api_flood",
      "counter_strategy": "flood_and_poison",
      "isolation_level": "process"
    },
    {
      "name": "model_extraction_defense",
      "threat_categories": ["ml_attack"],
      "payload_kinds": ["api_flood"],
      "template_id": "api_flood",
      "counter_strategy": "flood_and_poison",
      "isolation_level": "container"
    },
    {
      "name": "credential_stuffing_trap",
      "threat_categories": ["credential_stuffing"],
      "payload_kinds": ["credential_honeypot"],
      "template_id": "credential_honeypot",
      "counter_strategy": "account_deception",
      "isolation_level": "process"
    },
    {
      "name": "filesystem_maze",
      "threat_categories": ["path_traversal"],
      "payload_kinds": ["filesystem_tree"],
      "template_id": "filesystem_tree",
      "counter_strategy": "filesystem_deception",
      "isolation_level": "container"
    },
    {
      "name": "recon_env_bait",
      "threat_categories": ["reconnaissance", "xss", "cmd_injection", "ldap_injection"],
      "payload_kinds": ["env_dump"],
      "template_id": "env_dump",
      "counter_strategy": "secret_bait",
      "isolation_level": "process"
    },
    {
      "name": "watering_hole",
      "threat_categories": ["generic"],
      "payload_kinds": ["generic"],
      "template_id": "generic",
      "counter_strategy": "minimal_bait",
      "isolation_level": "none"
    }
  ],
  "counter_strategies": {
    "database_deception": {
      "tiers": {
        "low": { "record_count": 15, "payload_bytes": 4096 },
        "medium": { "record_count": 50, "payload_bytes": 16384 },
        "high": { "record_count": 120, "payload_bytes": 65536 }
      }
    },
    "flood_and_poison": {
      "tiers": {
        "low": { "record_count": 20, "payload_bytes": 8192, "contradiction_ratio": 0.25 },
        "medium": { "record_count": 60, "payload_bytes": 32768, "contradiction_ratio": 0.5 },
        "high": { "record_count": 150, "payload_bytes": 131072, "contradiction_ratio": 0.5 }
      }
    },
    "account_deception": {
      "tiers": {
        "low": { "record_count": 10, "payload_bytes": 2048 },
        "medium": { "record_count": 25, "payload_bytes": 8192 },
        "high": { "record_count": 60, "payload_bytes": 16384 }
      }
    },
    "filesystem_deception": {
      "tiers": {
        "low": { "record_count": 12, "payload_bytes": 4096 },
        "medium": { "record_count": 30, "payload_bytes": 16384 },
        "high": { "record_count": 75, "payload_bytes": 65536 }
      }
    },
    "secret_bait": {
      "tiers": {
        "low": { "record_count": 12, "payload_bytes": 2048 },
        "medium": { "record_count": 24, "payload_bytes": 4096 },
        "high": { "record_count": 48, "payload_bytes": 8192 }
      }
    },
    "minimal_bait": {
      "tiers": {
        "low": { "record_count": 3, "payload_bytes": 512 },
        "medium": { "record_count": 6, "payload_bytes": 1024 },
        "high": { "record_count": 12, "payload_bytes": 2048 }
      }
    }
  },
  "fallback_scenario": "watering_hole"
}"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_are_valid_json() {
        let rules: serde_json::Value = serde_json::from_str(DEFAULT_RULES_JSON).unwrap();
        let policies: serde_json::Value = serde_json::from_str(DEFAULT_POLICIES_JSON).unwrap();
        assert!(rules.get("content_patterns").unwrap().is_array());
        assert!(policies.get("scenarios").unwrap().is_array());
    }

    #[test]
    fn sql_scenario_serves_at_least_fifty_records_at_high_tier() {
        let config = super::super::load_default().unwrap();
        let strategy = config
            .policies
            .strategies
            .iter()
            .find(|s| s.name == "database_deception")
            .unwrap();
        assert!(strategy.high.record_count >= 50);
    }
}
