//! Dispatcher events and observed connection state

use std::sync::Arc;

use msnp_core::{FrameError, HandlerError, TransactionId, TransportError};

/// Events broadcast to dispatcher subscribers
#[derive(Debug, Clone)]
pub enum DispatcherEvent {
    /// The transport connected
    ConnectionEstablished,

    /// The connection was closed cleanly
    ConnectionClosed,

    /// Connecting failed
    ConnectingException(Arc<TransportError>),

    /// An open connection failed
    ConnectionException(Arc<TransportError>),

    /// A frame was written by the transport
    SendCompleted { transaction_id: TransactionId },

    /// A handler returned an error or panicked
    HandlerException(Arc<HandlerError>),

    /// An inbound frame could not be parsed and was dropped
    ParseFailed(FrameError),
}

impl DispatcherEvent {
    /// Whether the event reports a failure
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            DispatcherEvent::ConnectingException(_)
                | DispatcherEvent::ConnectionException(_)
                | DispatcherEvent::HandlerException(_)
                | DispatcherEvent::ParseFailed(_)
        )
    }
}

// ----------------------------------------------------------------------------
// Connection State
// ----------------------------------------------------------------------------

/// Connection state as last reported by the transport
///
/// ```text
/// Disconnected -> Connecting -> Connected -> Disconnected
///                 Connecting --(ConnectingException)--> Disconnected
///                 Connected  --(ConnectionException)--> Disconnected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl ConnectionState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }
}
