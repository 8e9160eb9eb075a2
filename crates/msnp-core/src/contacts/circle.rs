//! Circles
//!
//! A circle is a persistent group conversation. On the wire it is addressed
//! like a contact, `9:<circle guid>@<host domain>`, so it composes a `Contact`
//! record and adds the roster.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::contact::Contact;
use crate::errors::{FrameError, MsnpError, Result};
use crate::types::{ClientType, ContactKey};

/// Domain circles are hosted on unless the server says otherwise
pub const DEFAULT_HOST_DOMAIN: &str = "live.com";

/// Role of a member within a circle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CircleRole {
    Admin,
    AssistantAdmin,
    Member,
    /// Invited, has not accepted yet
    PendingOutbound,
}

impl CircleRole {
    /// Whether the role may change the roster
    pub fn can_manage(self) -> bool {
        matches!(self, CircleRole::Admin | CircleRole::AssistantAdmin)
    }
}

/// A roster entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircleMember {
    pub key: ContactKey,
    pub display_name: String,
    pub role: CircleRole,
}

/// Group conversation addressed like a contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circle {
    contact: Contact,
    id: Uuid,
    host_domain: String,
    /// The owner's role in this circle
    pub role: CircleRole,
    members: BTreeMap<ContactKey, CircleMember>,
}

impl Circle {
    pub fn new<D: Into<String>, N: Into<String>>(
        id: Uuid,
        host_domain: D,
        display_name: N,
        role: CircleRole,
    ) -> Self {
        let host_domain = host_domain.into().to_lowercase();
        let key = ContactKey::new(ClientType::Circle, format!("{}@{}", id.hyphenated(), host_domain));
        let mut contact = Contact::new(key);
        contact.display_name = display_name.into();

        Self {
            contact,
            id,
            host_domain,
            role,
            members: BTreeMap::new(),
        }
    }

    /// Build a circle from its account, e.g. `00000000-...-0009@live.com`
    pub fn from_account<N: Into<String>>(account: &str, display_name: N, role: CircleRole) -> Result<Self> {
        let (id, domain) = Self::parse_account(account)?;
        Ok(Self::new(id, domain, display_name, role))
    }

    /// Split a circle account into its GUID and host domain
    pub fn parse_account(account: &str) -> Result<(Uuid, String)> {
        let invalid = || {
            MsnpError::from(FrameError::InvalidContactKey {
                value: account.to_string(),
            })
        };
        let (guid, domain) = account.split_once('@').ok_or_else(invalid)?;
        let id = Uuid::parse_str(guid).map_err(|_| invalid())?;
        if domain.is_empty() {
            return Err(invalid());
        }
        Ok((id, domain.to_lowercase()))
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn host_domain(&self) -> &str {
        &self.host_domain
    }

    pub fn key(&self) -> &ContactKey {
        self.contact.key()
    }

    pub fn contact(&self) -> &Contact {
        &self.contact
    }

    pub fn contact_mut(&mut self) -> &mut Contact {
        &mut self.contact
    }

    /// Add or update a member, returning the previous entry
    pub fn upsert_member(&mut self, member: CircleMember) -> Option<CircleMember> {
        self.members.insert(member.key.clone(), member)
    }

    pub fn remove_member(&mut self, key: &ContactKey) -> Option<CircleMember> {
        self.members.remove(key)
    }

    pub fn member(&self, key: &ContactKey) -> Option<&CircleMember> {
        self.members.get(key)
    }

    pub fn members(&self) -> impl Iterator<Item = &CircleMember> {
        self.members.values()
    }

    /// Members who accepted their invitation
    pub fn member_count(&self) -> usize {
        self.members
            .values()
            .filter(|m| m.role != CircleRole::PendingOutbound)
            .count()
    }

    pub fn pending_count(&self) -> usize {
        self.members.len() - self.member_count()
    }

    pub fn admins(&self) -> impl Iterator<Item = &CircleMember> {
        self.members.values().filter(|m| m.role.can_manage())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
