//! Contact model
//!
//! Contacts, the signed-in owner and circles share one identity/presence
//! record (`Contact`) and extend it by composition.

pub mod circle;
pub mod contact;
pub mod list;
pub mod owner;
pub mod personal_message;

pub use circle::{Circle, CircleMember, CircleRole};
pub use contact::{Contact, ContactLists, EndPoint};
pub use list::{ContactList, ContactListStats};
pub use owner::{Owner, OwnerProfile, PrivacyMode};
pub use personal_message::{CurrentMedia, MediaType, PersonalMessage};
