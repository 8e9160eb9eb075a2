//! Transport abstraction for the MSNP dispatcher
//!
//! A transport moves encoded frames to and from the notification server. It
//! reports everything that happens asynchronously (connection changes, send
//! completions, inbound bytes) by pushing `TransportEvent`s into the sink the
//! dispatcher attached, on whatever thread the transport runs on.

use std::sync::Arc;

use msnp_core::{ConnectivitySettings, Result, TransactionId, TransportError, TransportKind};

// ----------------------------------------------------------------------------
// Transport Trait
// ----------------------------------------------------------------------------

/// A connection to the notification server
///
/// Methods take `&self`: the dispatcher shares one transport between the
/// caller's thread and the transport's own callbacks.
pub trait MessageTransport: Send + Sync {
    /// Framing this transport speaks
    fn kind(&self) -> TransportKind;

    /// Describe the transport's limits
    fn capabilities(&self) -> TransportCapabilities;

    /// Start connecting; the outcome arrives as an event
    fn connect(&self) -> Result<()>;

    /// Close the connection; `ConnectionClosed` follows if it was open
    fn disconnect(&self) -> Result<()>;

    /// Queue an encoded frame; `SendCompleted` follows once it is written
    fn send(&self, bytes: Vec<u8>, transaction_id: TransactionId) -> Result<()>;

    fn is_connected(&self) -> bool;

    fn connectivity_settings(&self) -> ConnectivitySettings;

    fn set_connectivity_settings(&self, settings: ConnectivitySettings) -> Result<()>;

    /// Start delivering events to `sink`, replacing any previous sink
    fn attach(&self, sink: Arc<dyn TransportEventSink>);

    /// Stop delivering events
    fn detach(&self);
}

// ----------------------------------------------------------------------------
// Transport Capabilities
// ----------------------------------------------------------------------------

/// Describes the limits of a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportCapabilities {
    /// Transport framing
    pub transport_kind: TransportKind,
    /// Largest encoded frame the transport accepts
    pub max_frame_size: usize,
}

impl TransportCapabilities {
    pub fn from_settings(settings: &ConnectivitySettings) -> Self {
        Self {
            transport_kind: settings.transport,
            max_frame_size: settings.max_frame_size,
        }
    }
}

// ----------------------------------------------------------------------------
// Transport Events
// ----------------------------------------------------------------------------

/// Events emitted by transports
#[derive(Debug)]
pub enum TransportEvent {
    /// The connection is open
    ConnectionEstablished,
    /// The connection was closed cleanly
    ConnectionClosed,
    /// Connecting failed
    ConnectingException(TransportError),
    /// An open connection failed
    ConnectionException(TransportError),
    /// A frame handed to `send` has been written
    SendCompleted { transaction_id: TransactionId },
    /// One complete inbound frame
    BytesReceived(Vec<u8>),
}

/// Receiver of transport events
pub trait TransportEventSink: Send + Sync {
    fn on_transport_event(&self, event: TransportEvent);
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_follow_settings() {
        let caps = TransportCapabilities::from_settings(&ConnectivitySettings::http_polling());
        assert_eq!(caps.transport_kind, TransportKind::HttpPolling);
        assert_eq!(caps.max_frame_size, msnp_core::config::DEFAULT_MAX_FRAME_SIZE);
    }
}
