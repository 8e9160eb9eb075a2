//! MSN objects
//!
//! Descriptors for shared content such as display pictures and emoticons,
//! and a session-owned catalog of the descriptors a client knows about.

pub mod catalog;
pub mod msn_object;

pub use catalog::{CatalogEntry, MsnObjectCatalog};
pub use msn_object::{MsnObject, MsnObjectType};
