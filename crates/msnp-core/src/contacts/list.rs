//! Contact list cache
//!
//! In-memory lookup of every contact and circle the server told us about.
//! Owned by the session; nothing here is process-global.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::circle::Circle;
use super::contact::{Contact, ContactLists};
use crate::types::{ContactKey, PresenceStatus};

/// In-memory contact and circle lookup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactList {
    contacts: BTreeMap<ContactKey, Contact>,
    circles: BTreeMap<Uuid, Circle>,
}

impl ContactList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a contact, returning the replaced record
    pub fn upsert_contact(&mut self, contact: Contact) -> Option<Contact> {
        self.contacts.insert(contact.key().clone(), contact)
    }

    pub fn get_contact(&self, key: &ContactKey) -> Option<&Contact> {
        self.contacts.get(key)
    }

    pub fn get_contact_mut(&mut self, key: &ContactKey) -> Option<&mut Contact> {
        self.contacts.get_mut(key)
    }

    /// Get a contact, creating an offline record if it is unknown
    pub fn get_or_insert_contact(&mut self, key: ContactKey) -> &mut Contact {
        self.contacts
            .entry(key)
            .or_insert_with_key(|key| Contact::new(key.clone()))
    }

    pub fn remove_contact(&mut self, key: &ContactKey) -> Option<Contact> {
        self.contacts.remove(key)
    }

    /// Apply a presence update; returns the previous status if it changed
    pub fn update_status(&mut self, key: &ContactKey, status: PresenceStatus) -> Option<PresenceStatus> {
        self.contacts.get_mut(key)?.set_status(status)
    }

    /// Contacts that are members of every list in `lists`
    pub fn in_list(&self, lists: ContactLists) -> impl Iterator<Item = &Contact> {
        self.contacts
            .values()
            .filter(move |c| c.lists.contains(lists))
    }

    pub fn online(&self) -> impl Iterator<Item = &Contact> {
        self.contacts.values().filter(|c| c.is_online())
    }

    /// Find a contact by display name
    pub fn find_by_display_name(&self, name: &str) -> Option<&Contact> {
        self.contacts.values().find(|c| c.display_name == name)
    }

    pub fn upsert_circle(&mut self, circle: Circle) -> Option<Circle> {
        self.circles.insert(circle.id(), circle)
    }

    pub fn get_circle(&self, id: &Uuid) -> Option<&Circle> {
        self.circles.get(id)
    }

    pub fn get_circle_mut(&mut self, id: &Uuid) -> Option<&mut Circle> {
        self.circles.get_mut(id)
    }

    /// Look a circle up by its contact key
    pub fn circle_by_key(&self, key: &ContactKey) -> Option<&Circle> {
        self.circles.values().find(|c| c.key() == key)
    }

    pub fn remove_circle(&mut self, id: &Uuid) -> Option<Circle> {
        self.circles.remove(id)
    }

    pub fn circles(&self) -> impl Iterator<Item = &Circle> {
        self.circles.values()
    }

    /// Drop every contact and circle
    pub fn clear(&mut self) {
        self.contacts.clear();
        self.circles.clear();
    }

    /// Get list statistics
    pub fn stats(&self) -> ContactListStats {
        ContactListStats {
            total_contacts: self.contacts.len(),
            total_online: self.online().count(),
            total_blocked: self.in_list(ContactLists::BLOCK).count(),
            total_pending: self.in_list(ContactLists::PENDING).count(),
            total_circles: self.circles.len(),
        }
    }
}

// ----------------------------------------------------------------------------
// Statistics
// ----------------------------------------------------------------------------

/// Statistics about the contact list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactListStats {
    pub total_contacts: usize,
    pub total_online: usize,
    pub total_blocked: usize,
    pub total_pending: usize,
    pub total_circles: usize,
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
