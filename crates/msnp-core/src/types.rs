//! Core types for the MSNP protocol
//!
//! This module defines the fundamental types used throughout the protocol,
//! using newtype patterns for semantic validation and type safety.

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::errors::{FrameError, MsnpError};

// ----------------------------------------------------------------------------
// Transaction Identifier
// ----------------------------------------------------------------------------

/// Transaction identifier correlating a request with the server's reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransactionId(u32);

impl TransactionId {
    /// Create a new transaction ID
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get the raw value
    pub const fn value(self) -> u32 {
        self.0
    }

    /// The ID following this one; `u32::MAX` is followed by 1 so zero is never reused
    pub const fn successor(self) -> Self {
        if self.0 == u32::MAX {
            Self(1)
        } else {
            Self(self.0 + 1)
        }
    }
}

impl From<u32> for TransactionId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Client Type
// ----------------------------------------------------------------------------

/// Network an address belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ClientType {
    None = 0,
    /// Windows Live (Passport) account
    WindowsLive = 1,
    OfficeCommunicator = 2,
    Telephone = 4,
    MobileNetwork = 8,
    /// Group conversation addressed like a contact
    Circle = 9,
    TemporaryGroup = 10,
    Cid = 11,
    Connect = 13,
    RemoteNetwork = 14,
    Smtp = 16,
    Yahoo = 32,
}

impl ClientType {
    /// Convert from the numeric wire value
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(ClientType::None),
            1 => Some(ClientType::WindowsLive),
            2 => Some(ClientType::OfficeCommunicator),
            4 => Some(ClientType::Telephone),
            8 => Some(ClientType::MobileNetwork),
            9 => Some(ClientType::Circle),
            10 => Some(ClientType::TemporaryGroup),
            11 => Some(ClientType::Cid),
            13 => Some(ClientType::Connect),
            14 => Some(ClientType::RemoteNetwork),
            16 => Some(ClientType::Smtp),
            32 => Some(ClientType::Yahoo),
            _ => None,
        }
    }

    /// Convert to the numeric wire value
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

// ----------------------------------------------------------------------------
// Contact Key
// ----------------------------------------------------------------------------

/// Network-qualified account address, written `<type>:<account>` on the wire
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContactKey {
    client_type: ClientType,
    account: String,
}

impl ContactKey {
    /// Create a key; the account is lowercased
    pub fn new<A: AsRef<str>>(client_type: ClientType, account: A) -> Self {
        Self {
            client_type,
            account: account.as_ref().trim().to_lowercase(),
        }
    }

    /// Shorthand for a Windows Live account
    pub fn passport<A: AsRef<str>>(account: A) -> Self {
        Self::new(ClientType::WindowsLive, account)
    }

    pub fn client_type(&self) -> ClientType {
        self.client_type
    }

    pub fn account(&self) -> &str {
        &self.account
    }
}

impl fmt::Display for ContactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.client_type.as_u32(), self.account)
    }
}

impl FromStr for ContactKey {
    type Err = MsnpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FrameError::InvalidContactKey {
            value: s.to_string(),
        };

        let (type_part, account) = s.split_once(':').ok_or_else(invalid)?;
        let client_type = type_part
            .parse::<u32>()
            .ok()
            .and_then(ClientType::from_u32)
            .ok_or_else(invalid)?;

        // Endpoint suffixes such as `;epid={...}` are not part of the key
        let account = account.split(';').next().unwrap_or_default();
        if account.trim().is_empty() {
            return Err(invalid().into());
        }

        Ok(Self::new(client_type, account))
    }
}

// ----------------------------------------------------------------------------
// Presence Status
// ----------------------------------------------------------------------------

/// Presence status as carried by the three-letter wire codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PresenceStatus {
    #[default]
    Unknown,
    Online,
    Busy,
    Idle,
    BeRightBack,
    Away,
    OnThePhone,
    OutToLunch,
    Offline,
    Hidden,
}

impl PresenceStatus {
    /// Parse a wire code such as `NLN`
    pub fn from_code(code: &str) -> Result<Self, FrameError> {
        match code {
            "NLN" => Ok(PresenceStatus::Online),
            "BSY" => Ok(PresenceStatus::Busy),
            "IDL" => Ok(PresenceStatus::Idle),
            "BRB" => Ok(PresenceStatus::BeRightBack),
            "AWY" => Ok(PresenceStatus::Away),
            "PHN" => Ok(PresenceStatus::OnThePhone),
            "LUN" => Ok(PresenceStatus::OutToLunch),
            "FLN" => Ok(PresenceStatus::Offline),
            "HDN" => Ok(PresenceStatus::Hidden),
            other => Err(FrameError::InvalidPresence {
                code: other.to_string(),
            }),
        }
    }

    /// Wire code; `Unknown` has none
    pub fn code(self) -> Option<&'static str> {
        match self {
            PresenceStatus::Unknown => None,
            PresenceStatus::Online => Some("NLN"),
            PresenceStatus::Busy => Some("BSY"),
            PresenceStatus::Idle => Some("IDL"),
            PresenceStatus::BeRightBack => Some("BRB"),
            PresenceStatus::Away => Some("AWY"),
            PresenceStatus::OnThePhone => Some("PHN"),
            PresenceStatus::OutToLunch => Some("LUN"),
            PresenceStatus::Offline => Some("FLN"),
            PresenceStatus::Hidden => Some("HDN"),
        }
    }

    /// Whether other contacts see this status as signed in
    pub fn is_online(self) -> bool {
        !matches!(
            self,
            PresenceStatus::Unknown | PresenceStatus::Offline | PresenceStatus::Hidden
        )
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_id_successor_skips_zero() {
        assert_eq!(TransactionId::new(1).successor(), TransactionId::new(2));
        assert_eq!(TransactionId::new(u32::MAX).successor(), TransactionId::new(1));
    }

    #[test]
    fn test_contact_key_roundtrip() {
        let key: ContactKey = "1:Alice@Hotmail.com".parse().unwrap();
        assert_eq!(key.client_type(), ClientType::WindowsLive);
        assert_eq!(key.account(), "alice@hotmail.com");
        assert_eq!(key.to_string(), "1:alice@hotmail.com");
    }

    #[test]
    fn test_contact_key_strips_endpoint() {
        let key: ContactKey = "1:bob@live.com;epid={f52973b6-c926-4bad-9ba8-7c1e840e4ab0}"
            .parse()
            .unwrap();
        assert_eq!(key, ContactKey::passport("bob@live.com"));
    }

    #[test]
    fn test_contact_key_rejects_garbage() {
        assert!("alice@hotmail.com".parse::<ContactKey>().is_err());
        assert!("3:alice@hotmail.com".parse::<ContactKey>().is_err());
        assert!("1:".parse::<ContactKey>().is_err());
    }

    #[test]
    fn test_presence_codes() {
        for code in ["NLN", "BSY", "IDL", "BRB", "AWY", "PHN", "LUN", "FLN", "HDN"] {
            let status = PresenceStatus::from_code(code).unwrap();
            assert_eq!(status.code(), Some(code));
        }
        assert!(PresenceStatus::from_code("XYZ").is_err());
        assert!(PresenceStatus::Busy.is_online());
        assert!(!PresenceStatus::Hidden.is_online());
    }
}
