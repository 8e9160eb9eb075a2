//! MSNP Core Protocol Implementation
//!
//! This crate provides the foundational types for the MSNP messaging protocol:
//! the notification server frame codec, MIME payloads, the contact model, MSN
//! object descriptors and the configuration and error types shared by the
//! runtime and the command line tool.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod config;
pub mod contacts;
pub mod errors;
pub mod objects;
pub mod protocol;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use config::{ConnectivitySettings, DispatcherConfig, MsnpConfig, ProxySettings, TransportKind};
pub use contacts::{
    Circle, CircleMember, CircleRole, Contact, ContactList, ContactListStats, ContactLists,
    CurrentMedia, EndPoint, MediaType, Owner, OwnerProfile, PersonalMessage, PrivacyMode,
};
pub use errors::{
    FrameError, HandlerError, MsnpError, MsnpResult, ObjectError, Result, TransportError,
};
pub use objects::{CatalogEntry, MsnObject, MsnObjectCatalog, MsnObjectType};
pub use protocol::{Frame, MimeHeaders, MultiMimeMessage, NsMessage};
pub use types::{ClientType, ContactKey, PresenceStatus, TransactionId};
