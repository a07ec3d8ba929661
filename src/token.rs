//! Tracking tokens
//!
//! A tracking token is an opaque 128-bit correlation id minted per verdict
//! and embedded in every piece of the deceptive payload. It carries no
//! cryptographic guarantee; a downstream collaborator greps exfiltrated
//! data for it. Randomness is pluggable so deployments can point at a
//! hardware or remote entropy source.

use rand::RngCore;

/// Source of randomness for token generation.
///
/// Implementations must be thread-safe; concurrent callers must not collide
/// on output. The default is the system CSPRNG.
pub trait RngSource: Send + Sync {
    /// Fill `buf` with random bytes.
    fn random_bytes(&self, buf: &mut [u8]);
}

/// System CSPRNG source.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRng;

impl RngSource for SystemRng {
    fn random_bytes(&self, buf: &mut [u8]) {
        let mut rng = rand::rngs::OsRng;
        rng.fill_bytes(buf);
    }
}

/// Opaque 128-bit per-verdict correlation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackingToken([u8; 16]);

impl TrackingToken {
    /// Mint a fresh token from the configured source.
    pub fn generate(rng: &dyn RngSource) -> Self {
        let mut bytes = [0u8; 16];
        rng.random_bytes(&mut bytes);
        Self(bytes)
    }

    /// Rebuild a token from raw bytes. Test and replay use.
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Lowercase hex, 32 chars. This is the form embedded in payloads.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(32);
        for byte in self.0 {
            out.push_str(&format!("{byte:02x}"));
        }
        out
    }

    /// Deterministic payload-generator seed derived from the token.
    /// Identical tokens yield identical payloads; tokens are unique, so
    /// this only ever matters for tests.
    pub fn seed(&self) -> u64 {
        u64::from_le_bytes(self.0[..8].try_into().expect("8 bytes"))
    }
}

impl std::fmt::Display for TrackingToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Counter-backed source for deterministic tests.
    pub struct CountingRng(AtomicU64);

    impl CountingRng {
        pub fn new() -> Self {
            Self(AtomicU64::new(1))
        }
    }

    impl RngSource for CountingRng {
        fn random_bytes(&self, buf: &mut [u8]) {
            let n = self.0.fetch_add(1, Ordering::Relaxed);
            for (i, byte) in buf.iter_mut().enumerate() {
                *byte = (n.wrapping_mul(31).wrapping_add(i as u64) & 0xff) as u8;
            }
        }
    }

    #[test]
    fn hex_is_32_chars() {
        let token = TrackingToken::generate(&SystemRng);
        assert_eq!(token.to_hex().len(), 32);
        assert!(token.to_hex().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn counting_source_is_collision_free() {
        let rng = CountingRng::new();
        let a = TrackingToken::generate(&rng);
        let b = TrackingToken::generate(&rng);
        assert_ne!(a, b);
    }

    #[test]
    fn seed_is_stable() {
        let token = TrackingToken::from_bytes([7u8; 16]);
        assert_eq!(token.seed(), TrackingToken::from_bytes([7u8; 16]).seed());
    }

    #[test]
    fn system_rng_produces_distinct_tokens() {
        let a = TrackingToken::generate(&SystemRng);
        let b = TrackingToken::generate(&SystemRng);
        assert_ne!(a, b);
    }
}
