//! In-memory transport
//!
//! `LoopbackTransport` implements [`MessageTransport`] without a network.
//! Every frame the client sends shows up on the paired [`LoopbackServer`],
//! which plays the server: it injects inbound frames, completes sends and
//! fails or closes the connection on demand.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use msnp_core::{
    ConnectivitySettings, Frame, MsnpError, Result, TransactionId, TransportError, TransportKind,
};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::transport::{MessageTransport, TransportCapabilities, TransportEvent, TransportEventSink};

/// A frame the client handed to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    pub transaction_id: TransactionId,
    pub bytes: Vec<u8>,
}

impl OutboundFrame {
    /// Decode the frame
    pub fn decode<M: Frame>(&self) -> Result<M> {
        Ok(M::parse(&self.bytes)?)
    }
}

struct LoopbackState {
    connected: bool,
    settings: ConnectivitySettings,
    sink: Option<Arc<dyn TransportEventSink>>,
    /// Reason the next `connect` fails with
    connect_failure: Option<String>,
    /// Report `SendCompleted` as soon as a frame is queued
    auto_complete: bool,
}

/// Client side of an in-memory connection
pub struct LoopbackTransport {
    state: Mutex<LoopbackState>,
    outbound: mpsc::UnboundedSender<OutboundFrame>,
}

impl LoopbackTransport {
    /// Create a transport and the server side that observes it
    pub fn new(settings: ConnectivitySettings) -> (Arc<Self>, LoopbackServer) {
        let (outbound, receiver) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            state: Mutex::new(LoopbackState {
                connected: false,
                settings,
                sink: None,
                connect_failure: None,
                auto_complete: true,
            }),
            outbound,
        });
        let server = LoopbackServer {
            transport: Arc::clone(&transport),
            outbound: receiver,
        };
        (transport, server)
    }

    fn lock(&self) -> MutexGuard<'_, LoopbackState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deliver an event with the state lock released
    fn emit(&self, event: TransportEvent) {
        let sink = self.lock().sink.clone();
        match sink {
            Some(sink) => sink.on_transport_event(event),
            None => trace!("loopback event without a sink: {:?}", event),
        }
    }
}

impl MessageTransport for LoopbackTransport {
    fn kind(&self) -> TransportKind {
        self.lock().settings.transport
    }

    fn capabilities(&self) -> TransportCapabilities {
        TransportCapabilities::from_settings(&self.lock().settings)
    }

    fn connect(&self) -> Result<()> {
        let event = {
            let mut state = self.lock();
            match state.connect_failure.take() {
                Some(reason) => TransportEvent::ConnectingException(TransportError::ConnectFailed {
                    host: state.settings.host.clone(),
                    port: state.settings.port,
                    reason,
                }),
                None if state.connected => return Ok(()),
                None => {
                    state.connected = true;
                    TransportEvent::ConnectionEstablished
                }
            }
        };
        debug!("loopback connect: {:?}", event);
        self.emit(event);
        Ok(())
    }

    fn disconnect(&self) -> Result<()> {
        let was_connected = std::mem::replace(&mut self.lock().connected, false);
        if was_connected {
            self.emit(TransportEvent::ConnectionClosed);
        }
        Ok(())
    }

    fn send(&self, bytes: Vec<u8>, transaction_id: TransactionId) -> Result<()> {
        let auto_complete = {
            let state = self.lock();
            if !state.connected {
                return Err(TransportError::NotConnected.into());
            }
            state.auto_complete
        };

        self.outbound
            .send(OutboundFrame {
                transaction_id,
                bytes,
            })
            .map_err(|_| MsnpError::from(TransportError::Closed))?;

        if auto_complete {
            self.emit(TransportEvent::SendCompleted { transaction_id });
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    fn connectivity_settings(&self) -> ConnectivitySettings {
        self.lock().settings.clone()
    }

    fn set_connectivity_settings(&self, settings: ConnectivitySettings) -> Result<()> {
        settings.validate()?;
        self.lock().settings = settings;
        Ok(())
    }

    fn attach(&self, sink: Arc<dyn TransportEventSink>) {
        self.lock().sink = Some(sink);
    }

    fn detach(&self) {
        self.lock().sink = None;
    }
}

// ----------------------------------------------------------------------------
// Server Side
// ----------------------------------------------------------------------------

/// Server end of a loopback connection
pub struct LoopbackServer {
    transport: Arc<LoopbackTransport>,
    outbound: mpsc::UnboundedReceiver<OutboundFrame>,
}

impl LoopbackServer {
    /// Next frame the client sent, waiting for one
    pub async fn recv(&mut self) -> Option<OutboundFrame> {
        self.outbound.recv().await
    }

    /// Next frame the client sent, if one is queued
    pub fn try_recv(&mut self) -> Option<OutboundFrame> {
        self.outbound.try_recv().ok()
    }

    /// Every frame queued so far
    pub fn drain(&mut self) -> Vec<OutboundFrame> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Deliver raw bytes as one inbound frame
    pub fn inject_bytes<B: Into<Vec<u8>>>(&self, bytes: B) {
        self.transport
            .emit(TransportEvent::BytesReceived(bytes.into()));
    }

    /// Encode and deliver an inbound frame
    pub fn inject<M: Frame>(&self, mut message: M) -> Result<()> {
        message.prepare()?;
        self.inject_bytes(message.to_bytes()?);
        Ok(())
    }

    /// Make the next `connect` fail
    pub fn fail_next_connect<R: Into<String>>(&self, reason: R) {
        self.transport.lock().connect_failure = Some(reason.into());
    }

    /// Hold `SendCompleted` back until [`LoopbackServer::complete_send`]
    pub fn set_auto_complete(&self, enabled: bool) {
        self.transport.lock().auto_complete = enabled;
    }

    pub fn complete_send(&self, transaction_id: TransactionId) {
        self.transport
            .emit(TransportEvent::SendCompleted { transaction_id });
    }

    /// Drop an open connection with an error
    pub fn fail_connection<R: Into<String>>(&self, reason: R) {
        let was_connected = std::mem::replace(&mut self.transport.lock().connected, false);
        if was_connected {
            self.transport
                .emit(TransportEvent::ConnectionException(TransportError::ConnectionLost {
                    reason: reason.into(),
                }));
        }
    }

    /// Close an open connection cleanly from the server side
    pub fn close(&self) {
        let was_connected = std::mem::replace(&mut self.transport.lock().connected, false);
        if was_connected {
            self.transport.emit(TransportEvent::ConnectionClosed);
        }
    }

    pub fn transport(&self) -> Arc<LoopbackTransport> {
        Arc::clone(&self.transport)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
