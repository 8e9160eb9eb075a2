//! Multi-section MIME payload
//!
//! `SDG`, `NFY`, `PUT` and `DEL` frames carry a payload made of three header
//! blocks (routing, reliability, messaging) followed by the content body:
//!
//! ```text
//! Routing: 1.0
//! To: 1:bob@live.com
//! From: 1:alice@hotmail.com;epid={...}
//!
//! Reliability: 1.0
//!
//! Messaging: 2.0
//! Message-Type: Text
//! Content-Length: 5
//!
//! hello
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::mime::MimeHeaders;
use crate::errors::FrameError;
use crate::types::ContactKey;

const SECTION_SEPARATOR: &[u8] = b"\r\n\r\n";

/// Routing, reliability and messaging headers plus a body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiMimeMessage {
    pub routing_headers: MimeHeaders,
    pub reliability_headers: MimeHeaders,
    pub content_headers: MimeHeaders,
    body: Vec<u8>,
}

impl MultiMimeMessage {
    /// Create an addressed message with the protocol version headers filled in
    pub fn new(to: &ContactKey, from: &ContactKey) -> Self {
        Self {
            routing_headers: MimeHeaders::new()
                .with("Routing", "1.0")
                .with("To", to.to_string())
                .with("From", from.to_string()),
            reliability_headers: MimeHeaders::new().with("Reliability", "1.0"),
            content_headers: MimeHeaders::new().with("Messaging", "2.0"),
            body: Vec::new(),
        }
    }

    /// Create a plain text chat message
    pub fn text(to: &ContactKey, from: &ContactKey, text: &str) -> Self {
        let mut message = Self::new(to, from);
        message.content_headers.set("Message-Type", "Text");
        message
            .content_headers
            .set("Content-Type", "Text/plain; charset=UTF-8");
        message.body = text.as_bytes().to_vec();
        message
    }

    /// Tag the sender address with the endpoint it was sent from
    pub fn with_from_epid(mut self, epid: Uuid) -> Self {
        let from = self
            .routing_headers
            .get("From")
            .map(|value| value.split(';').next().unwrap_or_default().to_string())
            .unwrap_or_default();
        self.routing_headers
            .set("From", format!("{from};epid={}", braced(epid)));
        self
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as text, if it is valid UTF-8
    pub fn body_text(&self) -> Option<&str> {
        core::str::from_utf8(&self.body).ok()
    }

    pub fn set_body<B: Into<Vec<u8>>>(&mut self, body: B) {
        self.body = body.into();
    }

    pub fn to(&self) -> Option<ContactKey> {
        self.routing_headers.get("To")?.parse().ok()
    }

    pub fn from(&self) -> Option<ContactKey> {
        self.routing_headers.get("From")?.parse().ok()
    }

    /// Endpoint ID of the sender
    pub fn from_epid(&self) -> Option<Uuid> {
        Uuid::parse_str(self.routing_headers.param("From", "epid")?).ok()
    }

    /// Endpoint ID of the recipient
    pub fn to_epid(&self) -> Option<Uuid> {
        Uuid::parse_str(self.routing_headers.param("To", "epid")?).ok()
    }

    pub fn message_type(&self) -> Option<&str> {
        self.content_headers.get("Message-Type")
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_headers.get("Content-Type")
    }

    /// Bring the `Content-Length` header in line with the body
    pub fn update_content_length(&mut self) {
        self.content_headers
            .set("Content-Length", self.body.len().to_string());
    }

    /// Encode with a freshly computed `Content-Length`
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut content_headers = self.content_headers.clone();
        content_headers.set("Content-Length", self.body.len().to_string());

        let mut out = Vec::with_capacity(256 + self.body.len());
        self.routing_headers.write_to(&mut out);
        out.extend_from_slice(b"\r\n");
        self.reliability_headers.write_to(&mut out);
        out.extend_from_slice(b"\r\n");
        content_headers.write_to(&mut out);
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }

    /// Decode a payload
    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        let (routing, rest) = split_section(bytes, "routing")?;
        let (reliability, rest) = split_section(rest, "reliability")?;
        let (messaging, rest) = split_section(rest, "messaging")?;

        let routing_headers = MimeHeaders::parse(routing)?;
        let reliability_headers = MimeHeaders::parse(reliability)?;
        let content_headers = MimeHeaders::parse(messaging)?;

        let body = match content_headers
            .get("Content-Length")
            .and_then(|value| value.parse::<usize>().ok())
        {
            Some(length) if length > rest.len() => {
                return Err(FrameError::Truncated {
                    expected: length,
                    actual: rest.len(),
                })
            }
            Some(length) => rest[..length].to_vec(),
            None => rest.to_vec(),
        };

        Ok(Self {
            routing_headers,
            reliability_headers,
            content_headers,
            body,
        })
    }
}

/// Split off one header block and the blank line ending it
///
/// A section without headers is just the blank line.
fn split_section<'a>(
    bytes: &'a [u8],
    section: &'static str,
) -> Result<(&'a str, &'a [u8]), FrameError> {
    if let Some(rest) = bytes.strip_prefix(b"\r\n") {
        return Ok(("", rest));
    }
    let end = bytes
        .windows(SECTION_SEPARATOR.len())
        .position(|window| window == SECTION_SEPARATOR)
        .ok_or(FrameError::MissingSection { section })?;
    let header = core::str::from_utf8(&bytes[..end]).map_err(|_| FrameError::InvalidUtf8)?;
    Ok((header, &bytes[end + SECTION_SEPARATOR.len()..]))
}

fn braced(id: Uuid) -> String {
    format!("{{{}}}", id.hyphenated())
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> ContactKey {
        ContactKey::passport("alice@hotmail.com")
    }

    fn bob() -> ContactKey {
        ContactKey::passport("bob@live.com")
    }

    #[test]
    fn test_text_message_layout() {
        let message = MultiMimeMessage::text(&bob(), &alice(), "hello");
        let bytes = message.to_bytes();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("Routing: 1.0\r\nTo: 1:bob@live.com\r\nFrom: 1:alice@hotmail.com\r\n\r\n"));
        assert!(text.contains("Reliability: 1.0\r\n\r\n"));
        assert!(text.contains("Content-Length: 5\r\n"));
        assert!(text.ends_with("\r\n\r\nhello"));
    }

    #[test]
    fn test_parse_roundtrip() {
        let epid = Uuid::new_v4();
        let message = MultiMimeMessage::text(&bob(), &alice(), "hi there").with_from_epid(epid);
        let parsed = MultiMimeMessage::parse(&message.to_bytes()).unwrap();

        assert_eq!(parsed.to(), Some(bob()));
        assert_eq!(parsed.from(), Some(alice()));
        assert_eq!(parsed.from_epid(), Some(epid));
        assert_eq!(parsed.message_type(), Some("Text"));
        assert_eq!(parsed.body_text(), Some("hi there"));
    }

    #[test]
    fn test_content_length_limits_body() {
        let raw = b"Routing: 1.0\r\n\r\nReliability: 1.0\r\n\r\nMessaging: 2.0\r\nContent-Length: 2\r\n\r\nhiXX";
        let parsed = MultiMimeMessage::parse(raw).unwrap();
        assert_eq!(parsed.body(), b"hi");
    }

    #[test]
    fn test_sections_without_headers_roundtrip() {
        let mut message = MultiMimeMessage::text(&bob(), &alice(), "hello");
        message.reliability_headers = MimeHeaders::new();
        message.update_content_length();

        let bytes = message.to_bytes();
        assert!(bytes.starts_with(b"Routing: 1.0\r\n"));
        let parsed = MultiMimeMessage::parse(&bytes).unwrap();
        assert_eq!(parsed, message);
        assert!(parsed.reliability_headers.is_empty());

        let mut bare = MultiMimeMessage::default();
        bare.set_body("x");
        bare.update_content_length();
        let parsed = MultiMimeMessage::parse(&bare.to_bytes()).unwrap();
        assert_eq!(parsed, bare);
        assert!(parsed.routing_headers.is_empty());
    }

    #[test]
    fn test_missing_sections() {
        let raw = b"Routing: 1.0\r\n\r\nReliability: 1.0\r\n";
        assert_eq!(
            MultiMimeMessage::parse(raw),
            Err(FrameError::MissingSection {
                section: "reliability"
            })
        );
    }

    #[test]
    fn test_truncated_body() {
        let raw = b"Routing: 1.0\r\n\r\nReliability: 1.0\r\n\r\nMessaging: 2.0\r\nContent-Length: 10\r\n\r\nhi";
        assert!(matches!(
            MultiMimeMessage::parse(raw),
            Err(FrameError::Truncated { expected: 10, actual: 2 })
        ));
    }
}
