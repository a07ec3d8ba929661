//! Request model
//!
//! The immutable view of one inbound request as the pipeline sees it. The
//! transport adapter is responsible for header-case normalization and body
//! decoding; this type just freezes the result.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Maximum number of query parameters summarized into a history entry.
/// Requests can carry more; the sketch is what detectors look at.
const PARAM_SKETCH_LIMIT: usize = 16;

/// One inbound HTTP-like request. Immutable once built.
#[derive(Debug, Clone)]
pub struct Request {
    /// Seconds; monotonic clocks are acceptable, wall clocks are too.
    pub timestamp: f64,
    /// Client address as the adapter saw it (IP or IP:port)
    pub source_address: String,
    /// User-Agent header value, possibly empty
    pub user_agent: String,
    /// Request path, no query string
    pub endpoint: String,
    /// Query parameters in the order they appeared
    pub query_params: Vec<(String, String)>,
    /// Headers, keys lowercased on insert
    pub headers: BTreeMap<String, String>,
    /// Decoded request body
    pub body: String,
    /// Session identifier, empty when absent
    pub session_id: String,
}

impl Request {
    /// Start building a request for the given endpoint.
    pub fn builder(endpoint: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(endpoint)
    }

    /// SHA-256 over endpoint, query string, and body.
    ///
    /// Stored in history instead of the body itself to bound memory.
    pub fn content_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.endpoint.as_bytes());
        for (key, value) in &self.query_params {
            hasher.update(b"&");
            hasher.update(key.as_bytes());
            hasher.update(b"=");
            hasher.update(value.as_bytes());
        }
        hasher.update(b"#");
        hasher.update(self.body.as_bytes());
        hasher.finalize().into()
    }

    /// Approximate wire size of the inspectable parts.
    pub fn content_size(&self) -> usize {
        let query: usize = self
            .query_params
            .iter()
            .map(|(k, v)| k.len() + v.len() + 2)
            .sum();
        self.endpoint.len() + query + self.body.len()
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Builder for [`Request`]. The adapter fills in what the transport gave it;
/// everything defaults to empty.
#[derive(Debug)]
pub struct RequestBuilder {
    timestamp: f64,
    source_address: String,
    user_agent: String,
    endpoint: String,
    query_params: Vec<(String, String)>,
    headers: BTreeMap<String, String>,
    body: String,
    session_id: String,
}

impl RequestBuilder {
    fn new(endpoint: impl Into<String>) -> Self {
        Self {
            timestamp: 0.0,
            source_address: String::new(),
            user_agent: String::new(),
            endpoint: endpoint.into(),
            query_params: Vec::new(),
            headers: BTreeMap::new(),
            body: String::new(),
            session_id: String::new(),
        }
    }

    pub fn timestamp(mut self, seconds: f64) -> Self {
        self.timestamp = seconds;
        self
    }

    pub fn source_address(mut self, address: impl Into<String>) -> Self {
        self.source_address = address.into();
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn session_id(mut self, session: impl Into<String>) -> Self {
        self.session_id = session.into();
        self
    }

    pub fn build(self) -> Request {
        Request {
            timestamp: self.timestamp,
            source_address: self.source_address,
            user_agent: self.user_agent,
            endpoint: self.endpoint,
            query_params: self.query_params,
            headers: self.headers,
            body: self.body,
            session_id: self.session_id,
        }
    }
}

/// One history record per request, bounded in size.
///
/// Carries a capped parameter sketch (key plus a hash of the value) so the
/// behavioral and ML detectors can reason about sweeps without the store
/// ever holding request bodies.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub timestamp: f64,
    pub endpoint: String,
    pub content_hash: [u8; 32],
    pub size: usize,
    /// (param key, hash of value), capped at the sketch limit
    pub params: Vec<(String, u64)>,
}

impl HistoryEntry {
    /// Summarize a request into its history record.
    pub fn from_request(req: &Request) -> Self {
        let params = req
            .query_params
            .iter()
            .take(PARAM_SKETCH_LIMIT)
            .map(|(k, v)| (k.clone(), fx_hash(v)))
            .collect();

        Self {
            timestamp: req.timestamp,
            endpoint: req.endpoint.clone(),
            content_hash: req.content_hash(),
            size: req.content_size(),
            params,
        }
    }
}

fn fx_hash(value: &str) -> u64 {
    use std::hash::Hasher;
    let mut hasher = rustc_hash::FxHasher::default();
    hasher.write(value.as_bytes());
    hasher.finish()
}
