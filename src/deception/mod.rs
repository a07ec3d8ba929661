//! Deception factory
//!
//! Turns a resolved scenario and intensity into a tracked fake payload.
//! Dispatch is a flat map from `template_id` to a builder function; new
//! kinds are added in code, not config, and the loader rejects template
//! ids nothing here claims. Builders are pure: token-seeded RNG only, no
//! I/O, no clock.

mod builders;
pub mod value;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PayloadBuildFailure;
use crate::scenario::{IntensitySpec, Scenario};
use crate::token::TrackingToken;

use value::ValueForge;

/// The builder set. Each variant is one payload shape the factory can
/// materialize; `template_id` strings in config name these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
    SqlHoneypot,
    ApiFlood,
    CredentialHoneypot,
    EnvDump,
    FilesystemTree,
    Generic,
}

impl PayloadKind {
    pub fn from_template_id(id: &str) -> Option<Self> {
        match id {
            "sql_honeypot" => Some(PayloadKind::SqlHoneypot),
            "api_flood" => Some(PayloadKind::ApiFlood),
            "credential_honeypot" => Some(PayloadKind::CredentialHoneypot),
            "env_dump" => Some(PayloadKind::EnvDump),
            "filesystem_tree" => Some(PayloadKind::FilesystemTree),
            "generic" => Some(PayloadKind::Generic),
            _ => None,
        }
    }

    pub fn template_id(&self) -> &'static str {
        match self {
            PayloadKind::SqlHoneypot => "sql_honeypot",
            PayloadKind::ApiFlood => "api_flood",
            PayloadKind::CredentialHoneypot => "credential_honeypot",
            PayloadKind::EnvDump => "env_dump",
            PayloadKind::FilesystemTree => "filesystem_tree",
            PayloadKind::Generic => "generic",
        }
    }
}

/// A structured fake document, every string leaf carrying the tracking
/// token. Serialized by the adapter as the deceived response body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeceptivePayload {
    pub kind: PayloadKind,
    pub scenario: String,
    pub body: Value,
}

impl DeceptivePayload {
    /// Canonical serialized form (what the adapter would send).
    pub fn serialized(&self) -> String {
        serde_json::to_string(&self.body).unwrap_or_default()
    }
}

pub struct DeceptionFactory;

impl DeceptionFactory {
    /// Materialize the payload for a scenario at the given intensity.
    ///
    /// Deterministic in `(scenario, intensity, token)`: the RNG is seeded
    /// from the token and `timestamp` is the caller's, not the clock's.
    pub fn build(
        scenario: &Scenario,
        intensity: IntensitySpec,
        token: &TrackingToken,
        timestamp: f64,
    ) -> Result<DeceptivePayload, PayloadBuildFailure> {
        let kind = PayloadKind::from_template_id(&scenario.template_id).ok_or_else(|| {
            PayloadBuildFailure {
                template_id: scenario.template_id.clone(),
                reason: "no builder claims this template".to_string(),
            }
        })?;

        let mut forge = ValueForge::new(token);
        let mut body = match kind {
            PayloadKind::SqlHoneypot => builders::sql_honeypot(&mut forge, intensity),
            PayloadKind::ApiFlood => builders::api_flood(&mut forge, intensity),
            PayloadKind::CredentialHoneypot => builders::credential_honeypot(&mut forge, intensity),
            PayloadKind::EnvDump => builders::env_dump(&mut forge, intensity),
            PayloadKind::FilesystemTree => builders::filesystem_tree(&mut forge, intensity),
            PayloadKind::Generic => builders::generic(&mut forge, &scenario.name, timestamp),
        };

        embed_token(&mut body, &token.to_hex());

        Ok(DeceptivePayload {
            kind,
            scenario: scenario.name.clone(),
            body,
        })
    }

    /// Last-resort payload when a builder fails: the generic kind, built
    /// the same deterministic way.
    pub fn generic_fallback(
        scenario_name: &str,
        token: &TrackingToken,
        timestamp: f64,
    ) -> DeceptivePayload {
        let mut forge = ValueForge::new(token);
        let mut body = builders::generic(&mut forge, scenario_name, timestamp);
        embed_token(&mut body, &token.to_hex());
        DeceptivePayload {
            kind: PayloadKind::Generic,
            scenario: scenario_name.to_string(),
            body,
        }
    }
}

/// Walk the document and suffix the token onto any string leaf that does
/// not already carry it. Builders embed the token where it reads
/// naturally; this pass makes the embedding a guarantee instead of a
/// convention.
fn embed_token(value: &mut Value, token_hex: &str) {
    match value {
        Value::String(s) => {
            if !s.contains(token_hex) {
                s.push('_');
                s.push_str(token_hex);
            }
        }
        Value::Array(items) => {
            for item in items {
                embed_token(item, token_hex);
            }
        }
        Value::Object(map) => {
            for (_, item) in map.iter_mut() {
                embed_token(item, token_hex);
            }
        }
        _ => {}
    }
}
