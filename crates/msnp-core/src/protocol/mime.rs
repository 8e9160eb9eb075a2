//! MIME header blocks
//!
//! Ordered `Key: Value` header collections as used inside MSNP payloads.
//! Lookup is case-insensitive, insertion order is preserved on output.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::errors::FrameError;

/// Ordered collection of MIME headers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MimeHeaders {
    entries: SmallVec<[(String, String); 8]>,
}

impl MimeHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a header value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Set a header, replacing an existing value in place
    pub fn set<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        let name = name.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Builder form of `set`
    pub fn with<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.set(name, value);
        self
    }

    /// Remove a header, returning its value
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self
            .entries
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Look up a `;`-separated parameter inside a header value
    ///
    /// For `From: 1:bob@live.com;epid={...}`, `param("From", "epid")` yields
    /// the braced GUID.
    pub fn param(&self, name: &str, param: &str) -> Option<&str> {
        self.get(name)?
            .split(';')
            .skip(1)
            .filter_map(|part| part.trim().split_once('='))
            .find(|(key, _)| key.trim().eq_ignore_ascii_case(param))
            .map(|(_, value)| value.trim())
    }

    /// Serialize as `Key: Value\r\n` lines
    pub fn write_to(&self, out: &mut Vec<u8>) {
        for (key, value) in &self.entries {
            out.extend_from_slice(key.as_bytes());
            out.extend_from_slice(b": ");
            out.extend_from_slice(value.as_bytes());
            out.extend_from_slice(b"\r\n");
        }
    }

    /// Parse a header block (without the terminating blank line)
    pub fn parse(block: &str) -> Result<Self, FrameError> {
        let mut headers = Self::new();
        for line in block.split("\r\n").filter(|line| !line.is_empty()) {
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| FrameError::MalformedHeader {
                    line: line.to_string(),
                })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(FrameError::MalformedHeader {
                    line: line.to_string(),
                });
            }
            headers.entries.push((key.to_string(), value.trim().to_string()));
        }
        Ok(headers)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_lookup() {
        let headers = MimeHeaders::new().with("Content-Type", "text/plain");
        assert_eq!(headers.get("content-type"), Some("text/plain"));
        assert!(headers.contains("CONTENT-TYPE"));
    }

    #[test]
    fn test_set_replaces_in_place() {
        let mut headers = MimeHeaders::new().with("A", "1").with("B", "2");
        headers.set("a", "3");
        let collected: Vec<_> = headers.iter().collect();
        assert_eq!(collected, vec![("A", "3"), ("B", "2")]);
        assert_eq!(headers.remove("b"), Some("2".to_string()));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_param_lookup() {
        let headers = MimeHeaders::new().with(
            "From",
            "1:bob@live.com;epid={f52973b6-c926-4bad-9ba8-7c1e840e4ab0}",
        );
        assert_eq!(
            headers.param("From", "epid"),
            Some("{f52973b6-c926-4bad-9ba8-7c1e840e4ab0}")
        );
        assert_eq!(headers.param("From", "path"), None);
    }

    #[test]
    fn test_parse_and_write() {
        let headers = MimeHeaders::parse("Routing: 1.0\r\nTo: 1:alice@hotmail.com").unwrap();
        assert_eq!(headers.get("To"), Some("1:alice@hotmail.com"));

        let mut out = Vec::new();
        headers.write_to(&mut out);
        assert_eq!(out, b"Routing: 1.0\r\nTo: 1:alice@hotmail.com\r\n");
    }

    #[test]
    fn test_parse_rejects_line_without_colon() {
        assert!(matches!(
            MimeHeaders::parse("Routing 1.0"),
            Err(FrameError::MalformedHeader { .. })
        ));
    }
}
