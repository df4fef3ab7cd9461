//! Header handling shared by the mock handler and the SSE recorder.
//!
//! A fixed hop-by-hop/internal set is never copied onto the outgoing
//! response.

use std::collections::BTreeMap;

/// Headers that must never be written back to the client, lower-cased.
///
/// Shared between the mock handler (`content-length`/`content-encoding`/
/// `x-mock-id` are stripped because the handler recomputes or never had a
/// use for them) and the proxy's SSE forwarding path (which additionally
/// strips `content-length` because the forwarded body length is unknown
/// ahead of time).
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
    "content-encoding",
    "content-length",
    "x-mock-id",
];

/// Returns true if `name` (compared case-insensitively) is in
/// [`HOP_BY_HOP_HEADERS`].
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|h| h.eq_ignore_ascii_case(name))
}

/// An ordered, case-preserving header map plus a lower-case-key -> original-key
/// side table for case-insensitive lookup without losing the original casing
/// when replaying headers back to a client.
#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    /// Original-case header name -> value, insertion order preserved.
    original: Vec<(String, String)>,
    /// lower(name) -> index into `original`, for case-insensitive lookup.
    index: BTreeMap<String, usize>,
}

impl HeaderMap {
    /// Build a header map from a `serde_json::Map` (as decoded from a
    /// record's `request.headers`/`response.headers`), preserving the
    /// original key case and insertion order.
    pub fn from_json_object(obj: &serde_json::Map<String, serde_json::Value>) -> Self {
        let mut map = Self::default();
        for (key, value) in obj {
            let value_str = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            map.insert(key.clone(), value_str);
        }
        map
    }

    /// Insert a header, preserving the case it was supplied in.
    pub fn insert(&mut self, name: String, value: String) {
        let lower = name.to_ascii_lowercase();
        self.index.insert(lower, self.original.len());
        self.original.push((name, value));
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        let lower = name.to_ascii_lowercase();
        self.index
            .get(&lower)
            .map(|&i| self.original[i].1.as_str())
    }

    /// Iterate headers in original case, insertion order, skipping any
    /// header in [`HOP_BY_HOP_HEADERS`].
    pub fn iter_replayable(&self) -> impl Iterator<Item = (&str, &str)> {
        self.original
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name))
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Iterate all headers, including hop-by-hop ones.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.original.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of headers stored.
    pub fn len(&self) -> usize {
        self.original.len()
    }

    /// Whether no headers are stored.
    pub fn is_empty(&self) -> bool {
        self.original.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_lookup() {
        let mut h = HeaderMap::default();
        h.insert("X-Mock-Id".to_string(), "abc".to_string());
        assert_eq!(h.get("x-mock-id"), Some("abc"));
        assert_eq!(h.get("X-MOCK-ID"), Some("abc"));
    }

    #[test]
    fn replayable_skips_hop_by_hop() {
        let mut h = HeaderMap::default();
        h.insert("Content-Type".to_string(), "application/json".to_string());
        h.insert("X-Mock-Id".to_string(), "default".to_string());
        h.insert("Connection".to_string(), "keep-alive".to_string());
        let kept: Vec<_> = h.iter_replayable().collect();
        assert_eq!(kept, vec![("Content-Type", "application/json")]);
    }
}
