//! Notification server message dispatcher
//!
//! `NsMessageProcessor` sits between one transport and any number of
//! handlers. Outbound it sequences transaction IDs, prepares and encodes
//! frames and hands the bytes to the transport. Inbound it parses what the
//! transport delivers and gives every registered handler its own copy.
//!
//! The dispatcher owns no threads. Inbound dispatch runs on whichever thread
//! the transport reports events from, and observers follow along through a
//! broadcast channel of [`DispatcherEvent`]s.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use msnp_core::{
    ConnectivitySettings, DispatcherConfig, Frame, HandlerError, NsMessage, Result,
    TransactionId, TransportError,
};
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::events::{ConnectionState, DispatcherEvent};
use crate::handlers::{HandlerId, HandlerRegistry, MessageHandler};
use crate::transport::{MessageTransport, TransportEvent, TransportEventSink};

struct Shared<M: Frame> {
    transport: RwLock<Arc<dyn MessageTransport>>,
    /// Bumped on every transport swap; sinks carrying an older value are stale
    generation: AtomicU64,
    transaction_id: AtomicU32,
    handlers: HandlerRegistry<M>,
    state: AtomicU8,
    events: broadcast::Sender<DispatcherEvent>,
}

/// Message dispatcher for one logical server connection
///
/// Cloning yields another handle to the same dispatcher.
pub struct NsMessageProcessor<M: Frame = NsMessage> {
    shared: Arc<Shared<M>>,
}

impl<M: Frame> Clone for NsMessageProcessor<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl NsMessageProcessor {
    /// Create a dispatcher for notification server frames
    pub fn new(transport: Arc<dyn MessageTransport>) -> Self {
        Self::create(transport, DispatcherConfig::default())
    }

    pub fn with_config(transport: Arc<dyn MessageTransport>, config: DispatcherConfig) -> Self {
        Self::create(transport, config)
    }
}

impl<M: Frame> NsMessageProcessor<M> {
    /// Create a dispatcher for any frame type
    pub fn create(transport: Arc<dyn MessageTransport>, config: DispatcherConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_buffer_size.max(1));
        let state = if transport.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        };
        let shared = Arc::new(Shared {
            transport: RwLock::new(Arc::clone(&transport)),
            generation: AtomicU64::new(0),
            transaction_id: AtomicU32::new(0),
            handlers: HandlerRegistry::new(),
            state: AtomicU8::new(state as u8),
            events,
        });
        transport.attach(Arc::new(ProcessorSink {
            shared: Arc::downgrade(&shared),
            generation: 0,
        }));
        Self { shared }
    }

    // ------------------------------------------------------------------------
    // Connection Lifecycle
    // ------------------------------------------------------------------------

    /// Ask the transport to connect; the outcome arrives as an event
    ///
    /// Does nothing when the transport is already connected.
    pub fn connect(&self) -> Result<()> {
        let transport = self.transport();
        if transport.is_connected() {
            trace!("connect ignored, transport is already connected");
            return Ok(());
        }
        debug!(
            "connecting to {} over {:?}",
            transport.connectivity_settings().endpoint(),
            transport.kind()
        );
        self.set_state(ConnectionState::Connecting);
        if let Err(e) = transport.connect() {
            warn!("transport refused to connect: {}", e);
            self.set_state(ConnectionState::Disconnected);
            return Err(e);
        }
        Ok(())
    }

    /// Sign off and close the connection; does nothing when not connected
    pub fn disconnect(&self) -> Result<()> {
        let transport = self.transport();
        if !transport.is_connected() {
            trace!("disconnect ignored, transport is not connected");
            return Ok(());
        }
        if let Some(sign_off) = M::sign_off() {
            if let Err(e) = self.send(sign_off) {
                warn!("failed to send sign-off: {}", e);
            }
        }
        debug!("disconnecting");
        transport.disconnect()
    }

    pub fn is_connected(&self) -> bool {
        self.transport().is_connected()
    }

    /// Connection state as last reported by the transport
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ConnectionState) {
        self.shared.state.store(state as u8, Ordering::Release);
    }

    // ------------------------------------------------------------------------
    // Sending
    // ------------------------------------------------------------------------

    /// Send a frame under the next transaction ID
    pub fn send(&self, message: M) -> Result<TransactionId> {
        let id = self.next_transaction_id();
        self.send_with_transaction_id(message, id)
    }

    /// Send a frame under a caller-chosen transaction ID
    ///
    /// The counter is left untouched. Completion is reported later as
    /// [`DispatcherEvent::SendCompleted`].
    pub fn send_with_transaction_id(&self, mut message: M, id: TransactionId) -> Result<TransactionId> {
        message.set_transaction_id(id);
        let bytes = match message.prepare().and_then(|()| message.to_bytes()) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("refusing to send {}: {}", message.summary(), e);
                return Err(e);
            }
        };

        let transport = self.transport();
        let max = transport.capabilities().max_frame_size;
        if bytes.len() > max {
            warn!(
                "refusing to send {}: {} bytes exceeds the {} byte limit",
                message.summary(),
                bytes.len(),
                max
            );
            return Err(TransportError::FrameTooLarge {
                size: bytes.len(),
                max,
            }
            .into());
        }

        trace!("-> {}", message.summary());
        transport.send(bytes, id)?;
        Ok(id)
    }

    // ------------------------------------------------------------------------
    // Transaction IDs
    // ------------------------------------------------------------------------

    /// Advance the counter and return the new value
    ///
    /// The counter wraps from `u32::MAX` to 1.
    pub fn next_transaction_id(&self) -> TransactionId {
        let previous = self
            .shared
            .transaction_id
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(TransactionId::new(current).successor().value())
            })
            .unwrap_or_else(|current| current);
        TransactionId::new(previous).successor()
    }

    /// Restart the counter; the next ID handed out is 1
    pub fn reset_transaction_id(&self) {
        self.shared.transaction_id.store(0, Ordering::Release);
    }

    /// Most recently handed out transaction ID, zero after a reset
    pub fn current_transaction_id(&self) -> TransactionId {
        TransactionId::new(self.shared.transaction_id.load(Ordering::Acquire))
    }

    // ------------------------------------------------------------------------
    // Handlers And Observers
    // ------------------------------------------------------------------------

    pub fn register_handler<H: MessageHandler<M> + 'static>(&self, handler: H) -> HandlerId {
        self.register_shared_handler(Arc::new(handler))
    }

    /// Register a handler that is also held elsewhere
    pub fn register_shared_handler(&self, handler: Arc<dyn MessageHandler<M>>) -> HandlerId {
        let name = handler.name().to_string();
        let id = self.shared.handlers.register(handler);
        debug!("registered {} as {}", name, id);
        id
    }

    pub fn unregister_handler(&self, id: HandlerId) -> bool {
        let removed = self.shared.handlers.unregister(id);
        if removed {
            debug!("unregistered {}", id);
        }
        removed
    }

    pub fn handler_count(&self) -> usize {
        self.shared.handlers.len()
    }

    /// Receive dispatcher events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<DispatcherEvent> {
        self.shared.events.subscribe()
    }

    // ------------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------------

    /// The active transport
    pub fn transport(&self) -> Arc<dyn MessageTransport> {
        Arc::clone(&self.shared.transport.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Swap the active transport, returning the previous one
    ///
    /// The previous transport is detached; anything it still reports is ignored.
    pub fn set_transport(&self, transport: Arc<dyn MessageTransport>) -> Arc<dyn MessageTransport> {
        let (previous, generation) = {
            let mut current = self
                .shared
                .transport
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            let generation = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
            (std::mem::replace(&mut *current, Arc::clone(&transport)), generation)
        };

        previous.detach();
        transport.attach(Arc::new(ProcessorSink {
            shared: Arc::downgrade(&self.shared),
            generation,
        }));
        self.set_state(if transport.is_connected() {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        });
        debug!("switched to {:?} transport", transport.kind());
        previous
    }

    pub fn connectivity_settings(&self) -> ConnectivitySettings {
        self.transport().connectivity_settings()
    }

    pub fn set_connectivity_settings(&self, settings: ConnectivitySettings) -> Result<()> {
        settings.validate()?;
        self.transport().set_connectivity_settings(settings)
    }

    // ------------------------------------------------------------------------
    // Inbound
    // ------------------------------------------------------------------------

    /// Deliver a frame to every handler registered when the call starts
    ///
    /// Handlers run in registration order, each with its own clone. A handler
    /// that fails or panics is reported as [`DispatcherEvent::HandlerException`]
    /// and the remaining handlers still run.
    pub fn dispatch(&self, message: M) {
        let handlers = self.shared.handlers.snapshot();
        trace!("<- {} ({} handlers)", message.summary(), handlers.len());

        for (id, handler) in handlers.iter() {
            let copy = message.clone();
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle_message(self, copy)));
            let error = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(source)) => HandlerError::Failed {
                    handler: handler.name().to_string(),
                    source: Box::new(source),
                },
                Err(payload) => HandlerError::Panicked {
                    handler: handler.name().to_string(),
                    message: panic_message(&*payload),
                },
            };
            warn!("{} [{}]", error, id);
            self.emit(DispatcherEvent::HandlerException(Arc::new(error)));
        }
    }

    /// Parse one inbound frame and dispatch it
    pub fn dispatch_bytes(&self, bytes: &[u8]) {
        match M::parse(bytes) {
            Ok(message) => self.dispatch(message),
            Err(e) => {
                warn!("dropping malformed frame ({} bytes): {}", bytes.len(), e);
                self.emit(DispatcherEvent::ParseFailed(e));
            }
        }
    }

    fn handle_transport_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::ConnectionEstablished => {
                debug!("connection established");
                self.set_state(ConnectionState::Connected);
                self.emit(DispatcherEvent::ConnectionEstablished);
            }
            TransportEvent::ConnectionClosed => {
                debug!("connection closed");
                self.set_state(ConnectionState::Disconnected);
                self.emit(DispatcherEvent::ConnectionClosed);
            }
            TransportEvent::ConnectingException(e) => {
                warn!("connecting failed: {}", e);
                self.set_state(ConnectionState::Disconnected);
                self.emit(DispatcherEvent::ConnectingException(Arc::new(e)));
            }
            TransportEvent::ConnectionException(e) => {
                warn!("connection failed: {}", e);
                self.set_state(ConnectionState::Disconnected);
                self.emit(DispatcherEvent::ConnectionException(Arc::new(e)));
            }
            TransportEvent::SendCompleted { transaction_id } => {
                trace!("send #{} completed", transaction_id);
                self.emit(DispatcherEvent::SendCompleted { transaction_id });
            }
            TransportEvent::BytesReceived(bytes) => self.dispatch_bytes(&bytes),
        }
    }

    fn emit(&self, event: DispatcherEvent) {
        // No subscribers is not an error
        let _ = self.shared.events.send(event);
    }
}

// ----------------------------------------------------------------------------
// Transport Sink
// ----------------------------------------------------------------------------

/// Routes one transport's events into the dispatcher
struct ProcessorSink<M: Frame> {
    shared: Weak<Shared<M>>,
    generation: u64,
}

impl<M: Frame> TransportEventSink for ProcessorSink<M> {
    fn on_transport_event(&self, event: TransportEvent) {
        let Some(shared) = self.shared.upgrade() else {
            trace!("dispatcher dropped, ignoring {:?}", event);
            return;
        };
        if shared.generation.load(Ordering::Acquire) != self.generation {
            trace!("ignoring {:?} from a detached transport", event);
            return;
        }
        NsMessageProcessor { shared }.handle_transport_event(event);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
