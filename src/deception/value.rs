//! Seeded fake-value generation
//!
//! All deceptive content flows through a [`ValueForge`] seeded from the
//! tracking token, so a payload is a pure function of
//! (scenario, intensity, token). No wall clock, no global RNG.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::token::TrackingToken;

const FIRST_NAMES: &[&str] = &[
    "james", "maria", "wei", "fatima", "liam", "sofia", "raj", "elena", "noah", "amara", "kenji",
    "lucia", "omar", "ingrid", "diego", "priya", "felix", "zara", "ivan", "chloe",
];

const LAST_NAMES: &[&str] = &[
    "walker", "chen", "patel", "garcia", "kim", "novak", "okafor", "silva", "mueller", "tanaka",
    "johnson", "rossi", "dubois", "larsen", "moreau", "kowalski", "ahmed", "nguyen", "brooks",
    "fischer",
];

const MAIL_DOMAINS: &[&str] = &[
    "example.com", "corp.example.com", "mail.example.org", "int.example.net",
];

const WORDS: &[&str] = &[
    "portal", "workflow", "ledger", "asset", "report", "operations", "network", "service",
    "audit", "catalog", "inventory", "policy", "review", "batch", "runtime", "routing",
    "automation", "signals", "compliance", "tracking", "analytics", "billing",
];

const ROLES: &[&str] = &["admin", "user", "developer", "analyst", "operator", "auditor"];

const PRODUCT_ADJECTIVES: &[&str] = &[
    "ultra", "compact", "premium", "refurbished", "wireless", "industrial", "portable", "smart",
];

const PRODUCT_NOUNS: &[&str] = &[
    "router", "sensor", "camera", "adapter", "enclosure", "controller", "gateway", "module",
];

/// Deterministic generator for credible fake values, seeded by the token.
pub struct ValueForge {
    rng: StdRng,
    token: String,
}

impl ValueForge {
    pub fn new(token: &TrackingToken) -> Self {
        Self {
            rng: StdRng::seed_from_u64(token.seed()),
            token: token.to_hex(),
        }
    }

    /// Hex form of the token this forge embeds.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.gen_range(0..items.len())]
    }

    pub fn digits(&mut self, count: usize) -> String {
        (0..count)
            .map(|_| char::from(b'0' + self.rng.gen_range(0..10u8)))
            .collect()
    }

    pub fn hex(&mut self, count: usize) -> String {
        const HEX: &[u8] = b"0123456789abcdef";
        (0..count)
            .map(|_| char::from(HEX[self.rng.gen_range(0..16)]))
            .collect()
    }

    /// Suffix a value with the delimited token. The suffix form keeps the
    /// token recoverable by a plain substring search.
    pub fn tokened(&self, base: impl Into<String>) -> String {
        let base = base.into();
        format!("{base}_{}", self.token)
    }

    pub fn username(&mut self) -> String {
        let first = self.pick(FIRST_NAMES);
        let last = self.pick(LAST_NAMES);
        format!("{first}.{last}{}", self.digits(2))
    }

    pub fn full_name(&mut self) -> String {
        let first = self.pick(FIRST_NAMES);
        let last = self.pick(LAST_NAMES);
        format!(
            "{}{} {}{}",
            first[..1].to_uppercase(),
            &first[1..],
            last[..1].to_uppercase(),
            &last[1..]
        )
    }

    pub fn email(&mut self, username: &str) -> String {
        let domain = self.pick(MAIL_DOMAINS);
        format!("{username}@{domain}")
    }

    pub fn password(&mut self) -> String {
        let word = self.pick(WORDS);
        format!("{}{}{}!", capitalize(word), self.pick(WORDS), self.digits(3))
    }

    /// SHA-256-shaped hex digest.
    pub fn password_hash(&mut self) -> String {
        self.hex(64)
    }

    pub fn api_key(&mut self) -> String {
        format!("ak_{}", self.hex(40))
    }

    pub fn uuid(&mut self) -> String {
        format!(
            "{}-{}-{}-{}-{}",
            self.hex(8),
            self.hex(4),
            self.hex(4),
            self.hex(4),
            self.hex(12)
        )
    }

    /// ISO-8601-shaped timestamp, entirely synthetic.
    pub fn iso_date(&mut self) -> String {
        format!(
            "202{}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
            self.rng.gen_range(3..6),
            self.rng.gen_range(1..13),
            self.rng.gen_range(1..29),
            self.rng.gen_range(0..24),
            self.rng.gen_range(0..60),
            self.rng.gen_range(0..60)
        )
    }

    pub fn internal_host(&mut self, role: &str) -> String {
        format!("{role}-{:02}.internal.example.com", self.rng.gen_range(1..20))
    }

    pub fn amount(&mut self) -> f64 {
        (self.rng.gen_range(100..2_000_000) as f64) / 100.0
    }

    pub fn role(&mut self) -> String {
        self.pick(ROLES).to_string()
    }

    pub fn product_name(&mut self) -> String {
        format!(
            "{} {} {}",
            capitalize(self.pick(PRODUCT_ADJECTIVES)),
            capitalize(self.pick(PRODUCT_NOUNS)),
            self.pick(&["X2", "Pro", "Mini", "500", "Edge", "S"]),
        )
    }

    pub fn phrase(&mut self, words: usize) -> String {
        let mut out = String::new();
        for i in 0..words {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(self.pick(WORDS));
        }
        out
    }

    pub fn gen_range(&mut self, range: std::ops::Range<u64>) -> u64 {
        self.rng.gen_range(range)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> TrackingToken {
        TrackingToken::from_bytes([42u8; 16])
    }

    #[test]
    fn identical_seeds_forge_identical_values() {
        let mut a = ValueForge::new(&token());
        let mut b = ValueForge::new(&token());
        for _ in 0..50 {
            assert_eq!(a.username(), b.username());
            assert_eq!(a.api_key(), b.api_key());
            assert_eq!(a.iso_date(), b.iso_date());
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = ValueForge::new(&token());
        let mut b = ValueForge::new(&TrackingToken::from_bytes([43u8; 16]));
        let a_values: Vec<String> = (0..10).map(|_| a.uuid()).collect();
        let b_values: Vec<String> = (0..10).map(|_| b.uuid()).collect();
        assert_ne!(a_values, b_values);
    }

    #[test]
    fn tokened_embeds_hex() {
        let mut forge = ValueForge::new(&token());
        let value = forge.tokened("admin");
        assert!(value.contains(&token().to_hex()));
        assert!(value.starts_with("admin_"));
    }

    #[test]
    fn shapes_look_right() {
        let mut forge = ValueForge::new(&token());
        assert!(forge.email("a.b01").contains('@'));
        assert_eq!(forge.password_hash().len(), 64);
        assert_eq!(forge.uuid().len(), 36);
        let date = forge.iso_date();
        assert!(date.ends_with('Z') && date.contains('T'));
    }
}
