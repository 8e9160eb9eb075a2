//! Contact identity and presence record

use std::collections::BTreeMap;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::personal_message::PersonalMessage;
use crate::objects::MsnObject;
use crate::types::{ClientType, ContactKey, PresenceStatus};

// ----------------------------------------------------------------------------
// List Membership
// ----------------------------------------------------------------------------

bitflags! {
    /// Server-side lists a contact is a member of
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct ContactLists: u8 {
        /// Forward list: contacts the owner added
        const FORWARD = 0x01;
        /// Allow list: contacts that may see the owner's presence
        const ALLOW = 0x02;
        /// Block list
        const BLOCK = 0x04;
        /// Reverse list: contacts that added the owner
        const REVERSE = 0x08;
        /// Pending list: contacts awaiting the owner's decision
        const PENDING = 0x10;
    }
}

// ----------------------------------------------------------------------------
// End Points
// ----------------------------------------------------------------------------

/// A place the contact is signed in from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndPoint {
    pub id: Uuid,
    pub name: String,
    /// Client capability bits advertised by the endpoint
    pub capabilities: u64,
}

// ----------------------------------------------------------------------------
// Contact
// ----------------------------------------------------------------------------

/// Identity and presence of an address on the contact list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    key: ContactKey,
    pub display_name: String,
    pub status: PresenceStatus,
    pub lists: ContactLists,
    pub personal_message: Option<PersonalMessage>,
    pub display_image: Option<MsnObject>,
    /// Address book GUID
    pub guid: Option<Uuid>,
    /// Numeric contact ID
    pub cid: Option<i64>,
    end_points: BTreeMap<Uuid, EndPoint>,
}

impl Contact {
    /// Create an offline contact; the display name defaults to the account
    pub fn new(key: ContactKey) -> Self {
        Self {
            display_name: key.account().to_string(),
            key,
            status: PresenceStatus::Offline,
            lists: ContactLists::default(),
            personal_message: None,
            display_image: None,
            guid: None,
            cid: None,
            end_points: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> &ContactKey {
        &self.key
    }

    pub fn account(&self) -> &str {
        self.key.account()
    }

    pub fn client_type(&self) -> ClientType {
        self.key.client_type()
    }

    pub fn is_online(&self) -> bool {
        self.status.is_online()
    }

    /// Update presence, returning the previous status when it changed
    pub fn set_status(&mut self, status: PresenceStatus) -> Option<PresenceStatus> {
        if self.status == status {
            return None;
        }
        let previous = self.status;
        self.status = status;
        if status == PresenceStatus::Offline {
            self.end_points.clear();
        }
        Some(previous)
    }

    pub fn is_blocked(&self) -> bool {
        self.lists.contains(ContactLists::BLOCK)
    }

    /// Block the contact, taking it off the allow list
    pub fn block(&mut self) {
        self.lists.remove(ContactLists::ALLOW);
        self.lists.insert(ContactLists::BLOCK);
    }

    /// Allow the contact, taking it off the block list
    pub fn allow(&mut self) {
        self.lists.remove(ContactLists::BLOCK);
        self.lists.insert(ContactLists::ALLOW);
    }

    /// Record or refresh an endpoint
    pub fn upsert_end_point(&mut self, end_point: EndPoint) {
        self.end_points.insert(end_point.id, end_point);
    }

    pub fn remove_end_point(&mut self, id: &Uuid) -> Option<EndPoint> {
        self.end_points.remove(id)
    }

    pub fn end_points(&self) -> impl Iterator<Item = &EndPoint> {
        self.end_points.values()
    }

    pub fn end_point_count(&self) -> usize {
        self.end_points.len()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_contact_defaults() {
        let contact = Contact::new(ContactKey::passport("Bob@Live.com"));
        assert_eq!(contact.display_name, "bob@live.com");
        assert_eq!(contact.status, PresenceStatus::Offline);
        assert!(contact.lists.is_empty());
        assert!(!contact.is_online());
    }

    #[test]
    fn test_status_change_reports_previous() {
        let mut contact = Contact::new(ContactKey::passport("bob@live.com"));
        assert_eq!(contact.set_status(PresenceStatus::Online), Some(PresenceStatus::Offline));
        assert_eq!(contact.set_status(PresenceStatus::Online), None);
        assert!(contact.is_online());
    }

    #[test]
    fn test_going_offline_clears_end_points() {
        let mut contact = Contact::new(ContactKey::passport("bob@live.com"));
        contact.set_status(PresenceStatus::Online);
        contact.upsert_end_point(EndPoint {
            id: Uuid::new_v4(),
            name: "laptop".into(),
            capabilities: 0,
        });
        assert_eq!(contact.end_point_count(), 1);

        contact.set_status(PresenceStatus::Offline);
        assert_eq!(contact.end_point_count(), 0);
    }

    #[test]
    fn test_block_and_allow_are_exclusive() {
        let mut contact = Contact::new(ContactKey::passport("bob@live.com"));
        contact.allow();
        contact.block();
        assert!(contact.is_blocked());
        assert!(!contact.lists.contains(ContactLists::ALLOW));

        contact.allow();
        assert!(!contact.is_blocked());
        assert!(contact.lists.contains(ContactLists::ALLOW));
    }
}
