//! MSNP Runtime
//!
//! This crate contains the moving parts of an MSNP client session:
//! - `NsMessageProcessor`: the dispatcher that sequences, sends and fans out frames
//! - `MessageTransport`: the seam a socket or HTTP polling transport plugs into
//! - `MessageHandler` and the copy-on-write handler registry
//! - `LoopbackTransport`: an in-memory transport for tests and replay
//!
//! `msnp-core` provides the frame types, configuration and errors used here.

pub mod dispatcher;
pub mod events;
pub mod handlers;
pub mod loopback;
pub mod transport;

pub use dispatcher::NsMessageProcessor;
pub use events::{ConnectionState, DispatcherEvent};
pub use handlers::{FnHandler, HandlerEntry, HandlerId, HandlerRegistry, MessageHandler};
pub use loopback::{LoopbackServer, LoopbackTransport, OutboundFrame};
pub use transport::{MessageTransport, TransportCapabilities, TransportEvent, TransportEventSink};

// Re-export core types for convenience
pub use msnp_core::{
    ConnectivitySettings, DispatcherConfig, Frame, HandlerError, MsnpError, MsnpResult, NsMessage,
    Result, TransactionId, TransportError, TransportKind,
};
