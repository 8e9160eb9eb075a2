//! Error types for the MSNP protocol
//!
//! This module contains all error types used throughout the MSNP core crate:
//! frame codec errors, transport errors, MSN object errors, handler failures,
//! and the `MsnpError` type that unifies them all.

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Errors raised while decoding or encoding protocol frames
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("Frame header is not terminated by CRLF")]
    MissingTerminator,
    #[error("Frame header is not valid UTF-8")]
    InvalidUtf8,
    #[error("Frame header carries no command")]
    EmptyCommand,
    #[error("Invalid command: {command}")]
    InvalidCommand { command: String },
    #[error("Payload truncated (expected {expected} bytes, got {actual})")]
    Truncated { expected: usize, actual: usize },
    #[error("Declared payload of {length} bytes exceeds the limit of {max} bytes")]
    PayloadTooLarge { length: usize, max: usize },
    #[error("Trailing numeric parameter {value} would be read as a payload length")]
    AmbiguousLength { value: String },
    #[error("Unexpected {extra} bytes after the end of the frame")]
    TrailingData { extra: usize },
    #[error("Invalid parameter: {value:?}")]
    InvalidParameter { value: String },
    #[error("Command {command} cannot carry a payload")]
    UnexpectedPayload { command: String },
    #[error("Frame payload has not been prepared")]
    Unprepared,
    #[error("Malformed header line: {line}")]
    MalformedHeader { line: String },
    #[error("Missing {section} section")]
    MissingSection { section: &'static str },
    #[error("Invalid contact key: {value}")]
    InvalidContactKey { value: String },
    #[error("Unknown presence status: {code}")]
    InvalidPresence { code: String },
    #[error("Invalid current media: {reason}")]
    InvalidMedia { reason: String },
}

/// Errors reported by or about a transport
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Transport is not connected")]
    NotConnected,
    #[error("Connecting to {host}:{port} failed: {reason}")]
    ConnectFailed { host: String, port: u16, reason: String },
    #[error("Connection lost: {reason}")]
    ConnectionLost { reason: String },
    #[error("Frame of {size} bytes exceeds the transport limit of {max} bytes")]
    FrameTooLarge { size: usize, max: usize },
    #[error("Transport is closed")]
    Closed,
    #[error("Network I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while handling MSN object descriptors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObjectError {
    #[error("Malformed MSN object context: {reason}")]
    MalformedContext { reason: String },
    #[error("MSN object is missing the {name} attribute")]
    MissingAttribute { name: &'static str },
    #[error("Invalid value for {name}: {value}")]
    InvalidAttribute { name: &'static str, value: String },
    #[error("Checksum mismatch (expected {expected}, computed {actual})")]
    ChecksumMismatch { expected: String, actual: String },
    #[error("Invalid base64 encoding")]
    InvalidBase64,
}

/// A message handler failed while a frame was being dispatched to it
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Handler {handler} failed: {source}")]
    Failed {
        handler: String,
        #[source]
        source: Box<MsnpError>,
    },
    #[error("Handler {handler} panicked: {message}")]
    Panicked { handler: String, message: String },
}

impl HandlerError {
    /// Name of the handler that failed
    pub fn handler(&self) -> &str {
        match self {
            HandlerError::Failed { handler, .. } => handler,
            HandlerError::Panicked { handler, .. } => handler,
        }
    }
}

// ----------------------------------------------------------------------------
// Unified Error Type
// ----------------------------------------------------------------------------

/// Core error types for the MSNP protocol
#[derive(Debug, thiserror::Error)]
pub enum MsnpError {
    #[error("Invalid frame: {0}")]
    Frame(#[from] FrameError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("MSN object error: {0}")]
    Object(#[from] ObjectError),

    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    /// Catch-all for failures reported by application handlers
    #[error("{message}")]
    Other { message: String },
}

// ----------------------------------------------------------------------------
// Convenience Error Constructors
// ----------------------------------------------------------------------------

impl MsnpError {
    /// Create a configuration error with a reason
    pub fn config_error<T: Into<String>>(reason: T) -> Self {
        MsnpError::Configuration {
            reason: reason.into(),
        }
    }

    /// Create a free-form error, mostly useful inside message handlers
    pub fn other<T: Into<String>>(message: T) -> Self {
        MsnpError::Other {
            message: message.into(),
        }
    }

    /// Create an invalid command error
    pub fn invalid_command<T: Into<String>>(command: T) -> Self {
        MsnpError::Frame(FrameError::InvalidCommand {
            command: command.into(),
        })
    }

    /// Create a connect failure error
    pub fn connect_failed<H: Into<String>, R: Into<String>>(host: H, port: u16, reason: R) -> Self {
        MsnpError::Transport(TransportError::ConnectFailed {
            host: host.into(),
            port,
            reason: reason.into(),
        })
    }

    /// Create a malformed MSN object context error
    pub fn malformed_context<T: Into<String>>(reason: T) -> Self {
        MsnpError::Object(ObjectError::MalformedContext {
            reason: reason.into(),
        })
    }

    /// Whether this error came from decoding a frame
    pub fn is_frame_error(&self) -> bool {
        matches!(self, MsnpError::Frame(_))
    }
}

// ----------------------------------------------------------------------------
// Type Aliases
// ----------------------------------------------------------------------------

pub type Result<T> = core::result::Result<T, MsnpError>;
pub type MsnpResult<T> = Result<T>;

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_frame_error_converts() {
        let err: MsnpError = FrameError::MissingTerminator.into();
        assert!(err.is_frame_error());
        assert_eq!(err.to_string(), "Invalid frame: Frame header is not terminated by CRLF");
    }

    #[test]
    fn test_handler_error_keeps_source() {
        let err = HandlerError::Failed {
            handler: "presence".into(),
            source: Box::new(MsnpError::other("boom")),
        };
        assert_eq!(err.handler(), "presence");
        assert_eq!(err.source().map(|s| s.to_string()), Some("boom".to_string()));
    }

    #[test]
    fn test_convenience_constructors() {
        let err = MsnpError::connect_failed("messenger.hotmail.com", 1863, "refused");
        assert!(matches!(
            err,
            MsnpError::Transport(TransportError::ConnectFailed { port: 1863, .. })
        ));
        assert!(!err.is_frame_error());
    }
}
