//! The signed-in account
//!
//! `Owner` wraps the owner's own `Contact` record and adds what only the
//! signed-in side knows: the local endpoint, privacy mode and the other
//! places the account is signed in from.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::contact::{Contact, EndPoint};
use super::personal_message::PersonalMessage;
use crate::types::{ContactKey, PresenceStatus};

/// Who may see the owner's presence when not explicitly listed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PrivacyMode {
    /// Contacts not on the block list may see presence
    #[default]
    AllowAll,
    /// Only contacts on the allow list may see presence
    BlockAll,
}

/// Owner-only settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerProfile {
    /// Endpoint ID of this client instance
    pub machine_guid: Uuid,
    /// Name other places see for this endpoint
    pub end_point_name: String,
    pub privacy: PrivacyMode,
    /// Notify the owner when someone adds them
    pub notify_on_add: bool,
}

/// The signed-in account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    contact: Contact,
    profile: OwnerProfile,
}

impl Owner {
    pub fn new(key: ContactKey, machine_guid: Uuid) -> Self {
        Self {
            contact: Contact::new(key),
            profile: OwnerProfile {
                machine_guid,
                end_point_name: String::new(),
                privacy: PrivacyMode::default(),
                notify_on_add: true,
            },
        }
    }

    pub fn contact(&self) -> &Contact {
        &self.contact
    }

    pub fn contact_mut(&mut self) -> &mut Contact {
        &mut self.contact
    }

    pub fn profile(&self) -> &OwnerProfile {
        &self.profile
    }

    pub fn profile_mut(&mut self) -> &mut OwnerProfile {
        &mut self.profile
    }

    /// Endpoint ID of this client instance
    pub fn epid(&self) -> Uuid {
        self.profile.machine_guid
    }

    pub fn set_status(&mut self, status: PresenceStatus) -> Option<PresenceStatus> {
        self.contact.set_status(status)
    }

    /// Publish a personal message from this endpoint
    pub fn set_personal_message(&mut self, mut message: PersonalMessage) {
        message.machine_guid = Some(self.profile.machine_guid);
        self.contact.personal_message = Some(message);
    }

    /// Record a place the account is signed in from
    pub fn sign_in_place(&mut self, end_point: EndPoint) {
        self.contact.upsert_end_point(end_point);
    }

    /// Places other than this client instance
    pub fn other_places(&self) -> impl Iterator<Item = &EndPoint> {
        let local = self.profile.machine_guid;
        self.contact.end_points().filter(move |ep| ep.id != local)
    }

    /// Whether a contact may see the owner's presence under the privacy mode
    pub fn can_see_presence(&self, contact: &Contact) -> bool {
        if contact.is_blocked() {
            return false;
        }
        match self.profile.privacy {
            PrivacyMode::AllowAll => true,
            PrivacyMode::BlockAll => contact.lists.contains(super::ContactLists::ALLOW),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> (Owner, Uuid) {
        let epid = Uuid::new_v4();
        (Owner::new(ContactKey::passport("alice@hotmail.com"), epid), epid)
    }

    #[test]
    fn test_personal_message_is_tagged_with_endpoint() {
        let (mut owner, epid) = owner();
        owner.set_personal_message(PersonalMessage::new("hi"));
        let published = owner.contact().personal_message.as_ref().unwrap();
        assert_eq!(published.machine_guid, Some(epid));
    }

    #[test]
    fn test_other_places_excludes_local_endpoint() {
        let (mut owner, epid) = owner();
        owner.sign_in_place(EndPoint {
            id: epid,
            name: "this pc".into(),
            capabilities: 0,
        });
        owner.sign_in_place(EndPoint {
            id: Uuid::new_v4(),
            name: "phone".into(),
            capabilities: 0,
        });

        let others: Vec<_> = owner.other_places().map(|ep| ep.name.as_str()).collect();
        assert_eq!(others, vec!["phone"]);
    }

    #[test]
    fn test_privacy_modes() {
        let (mut owner, _) = owner();
        let mut stranger = Contact::new(ContactKey::passport("eve@live.com"));
        assert!(owner.can_see_presence(&stranger));

        owner.profile_mut().privacy = PrivacyMode::BlockAll;
        assert!(!owner.can_see_presence(&stranger));

        stranger.allow();
        assert!(owner.can_see_presence(&stranger));

        stranger.block();
        assert!(!owner.can_see_presence(&stranger));
    }
}
