//! Notification server frames
//!
//! Every frame starts with a header line:
//!
//! ```text
//! CMD [trid] param... [length]\r\n
//! ```
//!
//! Payload commands end the header with the byte length of a payload that
//! follows the CRLF. Commands are three uppercase letters, or three digits
//! for server error replies.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::trace;

use super::multimime::MultiMimeMessage;
use super::Frame;
use crate::config::DEFAULT_MAX_FRAME_SIZE;
use crate::errors::{FrameError, Result};
use crate::types::TransactionId;

/// Commands that never carry a transaction ID
const NO_TRANSACTION_COMMANDS: &[&str] = &["OUT", "QNG", "NOT", "IPG"];

/// Commands whose header may end with a payload length
const PAYLOAD_COMMANDS: &[&str] = &[
    "MSG", "UUX", "UBX", "SDG", "NFY", "PUT", "DEL", "ADL", "RML", "FQY", "GCF", "NOT", "IPG",
    "UUN", "UBN", "GET", "QRY", "UUM",
];

/// Payload commands whose body is a multi-section MIME message
const MULTIMIME_COMMANDS: &[&str] = &["SDG", "NFY", "PUT", "DEL"];

// ----------------------------------------------------------------------------
// NsMessage
// ----------------------------------------------------------------------------

/// A frame exchanged with the notification server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NsMessage {
    command: String,
    transaction_id: Option<TransactionId>,
    params: SmallVec<[String; 4]>,
    inner: Option<MultiMimeMessage>,
    body: Option<Vec<u8>>,
}

impl NsMessage {
    /// Create a frame without payload
    pub fn new<C, I, P>(command: C, params: I) -> Self
    where
        C: Into<String>,
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            command: command.into(),
            transaction_id: None,
            params: params.into_iter().map(Into::into).collect(),
            inner: None,
            body: None,
        }
    }

    /// Create a frame with a raw payload
    pub fn with_body<B: Into<Vec<u8>>>(mut self, body: B) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attach a MIME payload; it is serialized into the body by `prepare`
    pub fn with_inner(mut self, inner: MultiMimeMessage) -> Self {
        self.inner = Some(inner);
        self.body = None;
        self
    }

    /// `SDG` frame delivering a MIME message
    pub fn sdg(inner: MultiMimeMessage) -> Self {
        Self::new("SDG", core::iter::empty::<String>()).with_inner(inner)
    }

    /// `OUT` sign-off frame
    pub fn out() -> Self {
        Self::new("OUT", core::iter::empty::<String>())
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn set_body<B: Into<Vec<u8>>>(&mut self, body: B) {
        self.body = Some(body.into());
    }

    pub fn inner(&self) -> Option<&MultiMimeMessage> {
        self.inner.as_ref()
    }

    pub fn inner_mut(&mut self) -> Option<&mut MultiMimeMessage> {
        self.inner.as_mut()
    }

    /// Whether this is a numeric server error reply
    pub fn is_error(&self) -> bool {
        self.error_code().is_some()
    }

    /// Numeric server error code
    pub fn error_code(&self) -> Option<u16> {
        if self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit()) {
            self.command.parse().ok()
        } else {
            None
        }
    }

    /// Byte length of the first complete frame in a stream buffer
    ///
    /// Returns `Ok(None)` when the buffer does not yet hold a complete frame.
    /// Payloads declared larger than [`DEFAULT_MAX_FRAME_SIZE`] are rejected.
    pub fn frame_length(buffer: &[u8]) -> core::result::Result<Option<usize>, FrameError> {
        Self::frame_length_with_limit(buffer, DEFAULT_MAX_FRAME_SIZE)
    }

    /// [`frame_length`](Self::frame_length) with a caller-chosen payload limit
    pub fn frame_length_with_limit(
        buffer: &[u8],
        max_payload: usize,
    ) -> core::result::Result<Option<usize>, FrameError> {
        let Some(header) = parse_header(buffer)? else {
            return Ok(None);
        };
        let length = header.payload_length.unwrap_or(0);
        let too_large = FrameError::PayloadTooLarge {
            length,
            max: max_payload,
        };
        if length > max_payload {
            return Err(too_large);
        }
        let total = header.header_len.checked_add(length).ok_or(too_large)?;
        if buffer.len() < total {
            Ok(None)
        } else {
            Ok(Some(total))
        }
    }

    fn carries_transaction_id(&self) -> bool {
        !NO_TRANSACTION_COMMANDS.contains(&self.command.as_str())
    }

    fn validate(&self) -> core::result::Result<(), FrameError> {
        if !is_valid_command(&self.command) {
            return Err(FrameError::InvalidCommand {
                command: self.command.clone(),
            });
        }
        if let Some(bad) = self
            .params
            .iter()
            .find(|p| p.is_empty() || p.contains([' ', '\r', '\n']))
        {
            return Err(FrameError::InvalidParameter { value: bad.clone() });
        }
        if self.body.is_some() && !PAYLOAD_COMMANDS.contains(&self.command.as_str()) {
            return Err(FrameError::UnexpectedPayload {
                command: self.command.clone(),
            });
        }
        if self.inner.is_some() && self.body.is_none() {
            return Err(FrameError::Unprepared);
        }
        // Without a body nothing follows the parameters, so a numeric last
        // parameter of a payload command would decode as the length
        if self.body.is_none() && PAYLOAD_COMMANDS.contains(&self.command.as_str()) {
            if let Some(last) = self.params.last().filter(|p| p.parse::<usize>().is_ok()) {
                return Err(FrameError::AmbiguousLength {
                    value: last.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Frame for NsMessage {
    fn transaction_id(&self) -> Option<TransactionId> {
        self.transaction_id
    }

    fn set_transaction_id(&mut self, id: TransactionId) {
        self.transaction_id = Some(id);
    }

    fn prepare(&mut self) -> Result<()> {
        if let Some(inner) = self.inner.as_mut() {
            inner.update_content_length();
            self.body = Some(inner.to_bytes());
        }
        Ok(())
    }

    fn to_bytes(&self) -> Result<Vec<u8>> {
        self.validate()?;

        let mut line = self.command.clone();
        if let (true, Some(id)) = (self.carries_transaction_id(), self.transaction_id) {
            line.push(' ');
            line.push_str(&id.to_string());
        }
        for param in &self.params {
            line.push(' ');
            line.push_str(param);
        }
        if let Some(body) = &self.body {
            line.push(' ');
            line.push_str(&body.len().to_string());
        }
        line.push_str("\r\n");

        let mut out = line.into_bytes();
        if let Some(body) = &self.body {
            out.extend_from_slice(body);
        }
        Ok(out)
    }

    fn parse(bytes: &[u8]) -> core::result::Result<Self, FrameError> {
        let header = parse_header(bytes)?.ok_or(FrameError::MissingTerminator)?;
        let rest = &bytes[header.header_len..];

        let body = match header.payload_length {
            Some(expected) if rest.len() < expected => {
                return Err(FrameError::Truncated {
                    expected,
                    actual: rest.len(),
                })
            }
            Some(expected) if rest.len() > expected => {
                return Err(FrameError::TrailingData {
                    extra: rest.len() - expected,
                })
            }
            Some(_) => Some(rest.to_vec()),
            None if !rest.is_empty() => {
                return Err(FrameError::TrailingData { extra: rest.len() })
            }
            None => None,
        };

        let inner = match &body {
            Some(body) if MULTIMIME_COMMANDS.contains(&header.command.as_str()) => {
                match MultiMimeMessage::parse(body) {
                    Ok(inner) => Some(inner),
                    Err(e) => {
                        trace!("{} payload is not multi-part MIME: {}", header.command, e);
                        None
                    }
                }
            }
            _ => None,
        };

        Ok(Self {
            command: header.command,
            transaction_id: header.transaction_id,
            params: header.params,
            inner,
            body,
        })
    }

    fn sign_off() -> Option<Self> {
        Some(Self::out())
    }

    fn summary(&self) -> String {
        let mut summary = self.command.clone();
        if let Some(id) = self.transaction_id {
            summary.push_str(&format!(" #{id}"));
        }
        if let Some(body) = &self.body {
            summary.push_str(&format!(" ({} byte payload)", body.len()));
        }
        summary
    }
}

// ----------------------------------------------------------------------------
// Header Parsing
// ----------------------------------------------------------------------------

struct Header {
    command: String,
    transaction_id: Option<TransactionId>,
    params: SmallVec<[String; 4]>,
    payload_length: Option<usize>,
    /// Length of the header line including its CRLF
    header_len: usize,
}

fn is_valid_command(command: &str) -> bool {
    command.len() == 3
        && command
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

fn parse_header(bytes: &[u8]) -> core::result::Result<Option<Header>, FrameError> {
    let Some(end) = bytes.windows(2).position(|w| w == b"\r\n") else {
        return Ok(None);
    };
    let line = core::str::from_utf8(&bytes[..end]).map_err(|_| FrameError::InvalidUtf8)?;

    let mut tokens = line.split(' ').filter(|t| !t.is_empty());
    let command = tokens.next().ok_or(FrameError::EmptyCommand)?;
    if !is_valid_command(command) {
        return Err(FrameError::InvalidCommand {
            command: command.to_string(),
        });
    }

    let mut params: SmallVec<[String; 4]> = tokens.map(str::to_string).collect();

    let transaction_id = if NO_TRANSACTION_COMMANDS.contains(&command) {
        None
    } else {
        match params.first().and_then(|t| t.parse::<u32>().ok()) {
            Some(id) => {
                params.remove(0);
                Some(TransactionId::new(id))
            }
            None => None,
        }
    };

    let payload_length = if PAYLOAD_COMMANDS.contains(&command) {
        match params.last().and_then(|t| t.parse::<usize>().ok()) {
            Some(length) => {
                params.pop();
                Some(length)
            }
            None => None,
        }
    } else {
        None
    };

    Ok(Some(Header {
        command: command.to_string(),
        transaction_id,
        params,
        payload_length,
        header_len: end + 2,
    }))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ContactKey;

    fn encode(mut message: NsMessage) -> Vec<u8> {
        message.prepare().unwrap();
        message.to_bytes().unwrap()
    }

    #[test]
    fn test_simple_command_encoding() {
        let mut message = NsMessage::new("VER", ["MSNP21", "CVR0"]);
        message.set_transaction_id(TransactionId::new(1));
        assert_eq!(encode(message), b"VER 1 MSNP21 CVR0\r\n");
    }

    #[test]
    fn test_out_has_no_transaction_id() {
        let mut message = NsMessage::out();
        message.set_transaction_id(TransactionId::new(9));
        assert_eq!(encode(message), b"OUT\r\n");
    }

    #[test]
    fn test_payload_command_encoding() {
        let mut message = NsMessage::new("UUX", core::iter::empty::<String>()).with_body("<Data/>");
        message.set_transaction_id(TransactionId::new(7));
        assert_eq!(encode(message), b"UUX 7 7\r\n<Data/>");
    }

    #[test]
    fn test_parse_server_reply() {
        let message = NsMessage::parse(b"USR 3 OK alice@hotmail.com 1 0\r\n").unwrap();
        assert_eq!(message.command(), "USR");
        assert_eq!(message.transaction_id(), Some(TransactionId::new(3)));
        assert_eq!(message.params(), ["OK", "alice@hotmail.com", "1", "0"]);
        assert!(message.body().is_none());
    }

    #[test]
    fn test_parse_payload_without_transaction_id() {
        let message = NsMessage::parse(b"NOT 5\r\nhello").unwrap();
        assert_eq!(message.transaction_id(), None);
        assert_eq!(message.body(), Some(&b"hello"[..]));
        assert!(message.params().is_empty());
    }

    #[test]
    fn test_parse_error_reply() {
        let message = NsMessage::parse(b"911 4\r\n").unwrap();
        assert!(message.is_error());
        assert_eq!(message.error_code(), Some(911));
        assert_eq!(message.transaction_id(), Some(TransactionId::new(4)));
    }

    #[test]
    fn test_sdg_roundtrip_keeps_inner_message() {
        let to = ContactKey::passport("bob@live.com");
        let from = ContactKey::passport("alice@hotmail.com");
        let mut message = NsMessage::sdg(MultiMimeMessage::text(&to, &from, "hello"));
        message.set_transaction_id(TransactionId::new(12));
        message.prepare().unwrap();

        let parsed = NsMessage::parse(&message.to_bytes().unwrap()).unwrap();
        assert_eq!(parsed, message);
        assert_eq!(parsed.inner().and_then(|m| m.body_text()), Some("hello"));
    }

    #[test]
    fn test_unprepared_inner_is_rejected() {
        let to = ContactKey::passport("bob@live.com");
        let message = NsMessage::sdg(MultiMimeMessage::text(&to, &to, "x"));
        assert!(message.to_bytes().is_err());
    }

    #[test]
    fn test_encode_rejects_misuse() {
        let message = NsMessage::new("CHG", ["NLN"]).with_body("x");
        assert!(message.to_bytes().is_err());

        let message = NsMessage::new("CHG", ["two words"]);
        assert!(message.to_bytes().is_err());

        let message = NsMessage::new("chg", ["NLN"]);
        assert!(message.to_bytes().is_err());
    }

    #[test]
    fn test_parse_failures() {
        assert_eq!(NsMessage::parse(b"VER 1 MSNP21"), Err(FrameError::MissingTerminator));
        assert_eq!(NsMessage::parse(b"\r\n"), Err(FrameError::EmptyCommand));
        assert!(matches!(
            NsMessage::parse(b"verbose\r\n"),
            Err(FrameError::InvalidCommand { .. })
        ));
        assert_eq!(
            NsMessage::parse(b"MSG 1 N 10\r\nshort"),
            Err(FrameError::Truncated { expected: 10, actual: 5 })
        );
        assert_eq!(
            NsMessage::parse(b"CHG 1 NLN\r\nextra"),
            Err(FrameError::TrailingData { extra: 5 })
        );
        assert_eq!(NsMessage::parse(&[0xff, 0xfe, b'\r', b'\n']), Err(FrameError::InvalidUtf8));
    }

    #[test]
    fn test_frame_length_splits_stream() {
        let stream = b"CHL 0 12345\r\nNOT 3\r\nabcQNG 50\r\n";
        let first = NsMessage::frame_length(stream).unwrap().unwrap();
        assert_eq!(&stream[..first], b"CHL 0 12345\r\n");

        let rest = &stream[first..];
        let second = NsMessage::frame_length(rest).unwrap().unwrap();
        assert_eq!(&rest[..second], b"NOT 3\r\nabc");

        let rest = &rest[second..];
        assert_eq!(NsMessage::frame_length(rest).unwrap(), Some(rest.len()));

        assert_eq!(NsMessage::frame_length(b"NOT 10\r\nabc").unwrap(), None);
        assert_eq!(NsMessage::frame_length(b"QNG 5").unwrap(), None);
    }

    #[test]
    fn test_frame_length_rejects_oversized_payloads() {
        assert!(matches!(
            NsMessage::frame_length(format!("MSG 1 N {}\r\n", usize::MAX).as_bytes()),
            Err(FrameError::PayloadTooLarge { length: usize::MAX, .. })
        ));
        assert_eq!(
            NsMessage::frame_length(b"MSG 1 N 99999999\r\n"),
            Err(FrameError::PayloadTooLarge {
                length: 99_999_999,
                max: DEFAULT_MAX_FRAME_SIZE,
            })
        );
    }

    #[test]
    fn test_frame_length_with_limit() {
        assert_eq!(NsMessage::frame_length_with_limit(b"NOT 3\r\nabc", 3), Ok(Some(10)));
        assert_eq!(
            NsMessage::frame_length_with_limit(b"NOT 4\r\nabcd", 3),
            Err(FrameError::PayloadTooLarge { length: 4, max: 3 })
        );
        assert_eq!(NsMessage::frame_length_with_limit(b"QNG 50\r\n", 0), Ok(Some(8)));
    }

    #[test]
    fn test_numeric_tail_without_body_is_rejected() {
        let mut message = NsMessage::new("GCF", ["5"]);
        message.set_transaction_id(TransactionId::new(3));
        assert!(matches!(
            message.to_bytes(),
            Err(crate::MsnpError::Frame(FrameError::AmbiguousLength { .. }))
        ));

        // With a body the length follows the parameter, so it round-trips
        let message = message.with_body("abc");
        let parsed = NsMessage::parse(&encode(message.clone())).unwrap();
        assert_eq!(parsed, message);
        assert_eq!(parsed.params(), ["5"]);

        // Non-payload commands never read a length
        let mut message = NsMessage::new("CHG", ["NLN", "0"]);
        message.set_transaction_id(TransactionId::new(4));
        assert_eq!(NsMessage::parse(&encode(message.clone())).unwrap(), message);
    }

    #[test]
    fn test_summary() {
        let mut message = NsMessage::new("UUX", core::iter::empty::<String>()).with_body("abc");
        message.set_transaction_id(TransactionId::new(2));
        assert_eq!(message.summary(), "UUX #2 (3 byte payload)");
    }
}
