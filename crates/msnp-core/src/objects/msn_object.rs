//! MSN object descriptors
//!
//! An MSN object names a piece of content by the SHA-1 of its data. On the
//! wire it is a single XML element:
//!
//! ```text
//! <msnobj Creator="alice@hotmail.com" Size="1024" Type="3" Location="0"
//!         Friendly="AAA=" SHA1D="..." SHA1C="..."/>
//! ```
//!
//! `Friendly` is the base64 of the UTF-16LE name (NUL terminated), `SHA1D`
//! the base64 SHA-1 of the data and `SHA1C` the base64 SHA-1 over the other
//! attributes concatenated as `Creator<v>Size<v>Type<v>Location<v>Friendly<v>SHA1D<v>`.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tracing::debug;

use crate::errors::{ObjectError, Result};

// ----------------------------------------------------------------------------
// Object Type
// ----------------------------------------------------------------------------

/// Kind of content an MSN object describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum MsnObjectType {
    Emoticon = 2,
    UserDisplay = 3,
    Background = 5,
    Wink = 8,
    VoiceClip = 11,
    SavedState = 12,
    Location = 14,
}

impl MsnObjectType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            2 => Some(MsnObjectType::Emoticon),
            3 => Some(MsnObjectType::UserDisplay),
            5 => Some(MsnObjectType::Background),
            8 => Some(MsnObjectType::Wink),
            11 => Some(MsnObjectType::VoiceClip),
            12 => Some(MsnObjectType::SavedState),
            14 => Some(MsnObjectType::Location),
            _ => None,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

// ----------------------------------------------------------------------------
// Descriptor
// ----------------------------------------------------------------------------

/// Content descriptor keyed by the SHA-1 of its data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsnObject {
    pub creator: String,
    pub size: u64,
    pub object_type: MsnObjectType,
    /// Storage location; `"0"` for content the creator serves directly
    pub location: String,
    /// Human readable name, decoded from the `Friendly` attribute
    pub friendly_name: String,
    sha1d: String,
    sha1c: String,
}

impl MsnObject {
    /// Describe `data`, computing both hashes
    pub fn from_data<C, L, F>(
        creator: C,
        object_type: MsnObjectType,
        location: L,
        friendly_name: F,
        data: &[u8],
    ) -> Self
    where
        C: Into<String>,
        L: Into<String>,
        F: Into<String>,
    {
        let mut object = Self {
            creator: creator.into(),
            size: data.len() as u64,
            object_type,
            location: location.into(),
            friendly_name: friendly_name.into(),
            sha1d: sha1_base64(data),
            sha1c: String::new(),
        };
        object.sha1c = object.compute_checksum();
        object
    }

    /// Base64 SHA-1 of the described data
    pub fn sha1d(&self) -> &str {
        &self.sha1d
    }

    /// Base64 SHA-1 over the descriptor fields
    pub fn sha1c(&self) -> &str {
        &self.sha1c
    }

    /// `Friendly` attribute value
    pub fn friendly_encoded(&self) -> String {
        let mut bytes = Vec::with_capacity((self.friendly_name.len() + 1) * 2);
        for unit in self.friendly_name.encode_utf16().chain(std::iter::once(0)) {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        STANDARD.encode(bytes)
    }

    /// Recompute `SHA1C` from the current field values
    pub fn compute_checksum(&self) -> String {
        let fields = format!(
            "Creator{}Size{}Type{}Location{}Friendly{}SHA1D{}",
            self.creator,
            self.size,
            self.object_type.as_u32(),
            self.location,
            self.friendly_encoded(),
            self.sha1d,
        );
        sha1_base64(fields.as_bytes())
    }

    /// Check `SHA1C` against the other fields
    pub fn verify_checksum(&self) -> Result<()> {
        let actual = self.compute_checksum();
        if actual != self.sha1c {
            return Err(ObjectError::ChecksumMismatch {
                expected: self.sha1c.clone(),
                actual,
            }
            .into());
        }
        Ok(())
    }

    /// Whether `data` is the content this object describes
    pub fn matches_data(&self, data: &[u8]) -> bool {
        data.len() as u64 == self.size && sha1_base64(data) == self.sha1d
    }

    /// Serialize as an `<msnobj/>` element
    pub fn to_context(&self) -> String {
        format!(
            "<msnobj Creator=\"{}\" Size=\"{}\" Type=\"{}\" Location=\"{}\" Friendly=\"{}\" SHA1D=\"{}\" SHA1C=\"{}\"/>",
            escape(&self.creator),
            self.size,
            self.object_type.as_u32(),
            escape(&self.location),
            self.friendly_encoded(),
            self.sha1d,
            self.sha1c,
        )
    }

    /// Context element as base64, the form carried inside other payloads
    pub fn context_base64(&self) -> String {
        STANDARD.encode(self.to_context())
    }

    pub fn from_base64_context(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|_| ObjectError::InvalidBase64)?;
        let context = String::from_utf8(bytes).map_err(|_| ObjectError::MalformedContext {
            reason: "context is not valid UTF-8".to_string(),
        })?;
        Self::parse(&context)
    }

    /// Parse an `<msnobj/>` element
    ///
    /// Unknown attributes are ignored. `SHA1C` is optional on input and is
    /// computed when absent; when present it is kept as sent, so callers
    /// that care should run [`MsnObject::verify_checksum`].
    pub fn parse(context: &str) -> Result<Self> {
        let attributes = scan_element(context.trim())?;
        let find = |name: &'static str| {
            attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        };
        let require =
            |name: &'static str| find(name).ok_or(ObjectError::MissingAttribute { name });

        let creator = require("Creator")?.to_string();
        let size_text = require("Size")?;
        let size = size_text
            .parse::<u64>()
            .map_err(|_| ObjectError::InvalidAttribute {
                name: "Size",
                value: size_text.to_string(),
            })?;
        let type_text = require("Type")?;
        let object_type = type_text
            .parse::<u32>()
            .ok()
            .and_then(MsnObjectType::from_u32)
            .ok_or_else(|| ObjectError::InvalidAttribute {
                name: "Type",
                value: type_text.to_string(),
            })?;
        let location = find("Location").unwrap_or("0").to_string();
        let friendly_name = match find("Friendly") {
            Some(encoded) => decode_friendly(encoded)?,
            None => String::new(),
        };
        let sha1d = require("SHA1D")?.to_string();

        let mut object = Self {
            creator,
            size,
            object_type,
            location,
            friendly_name,
            sha1d,
            sha1c: String::new(),
        };
        object.sha1c = match find("SHA1C") {
            Some(sha1c) => sha1c.to_string(),
            None => {
                debug!("MSN object context without SHA1C, computing it");
                object.compute_checksum()
            }
        };
        Ok(object)
    }
}

// ----------------------------------------------------------------------------
// Helpers
// ----------------------------------------------------------------------------

fn sha1_base64(data: &[u8]) -> String {
    STANDARD.encode(Sha1::digest(data))
}

fn decode_friendly(encoded: &str) -> core::result::Result<String, ObjectError> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|_| ObjectError::InvalidBase64)?;
    if bytes.len() % 2 != 0 {
        return Err(ObjectError::InvalidAttribute {
            name: "Friendly",
            value: encoded.to_string(),
        });
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let name = String::from_utf16(&units).map_err(|_| ObjectError::InvalidAttribute {
        name: "Friendly",
        value: encoded.to_string(),
    })?;
    Ok(name.trim_end_matches('\0').to_string())
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

fn unescape(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Split `<msnobj a="1" b="2"/>` into its attributes
fn scan_element(context: &str) -> core::result::Result<Vec<(String, String)>, ObjectError> {
    let malformed = |reason: &str| ObjectError::MalformedContext {
        reason: reason.to_string(),
    };

    let inner = context
        .strip_prefix("<msnobj")
        .ok_or_else(|| malformed("expected <msnobj element"))?;
    let mut rest = inner
        .trim_end()
        .strip_suffix("/>")
        .or_else(|| inner.trim_end().strip_suffix("></msnobj>"))
        .ok_or_else(|| malformed("element is not closed"))?;

    let mut attributes = Vec::new();
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        let (name, after_name) = rest
            .split_once('=')
            .ok_or_else(|| malformed("attribute without a value"))?;
        let name = name.trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(malformed("invalid attribute name"));
        }

        let after_name = after_name.trim_start();
        let quote = after_name
            .chars()
            .next()
            .filter(|c| *c == '"' || *c == '\'')
            .ok_or_else(|| malformed("attribute value is not quoted"))?;
        let value_start = &after_name[1..];
        let end = value_start
            .find(quote)
            .ok_or_else(|| malformed("unterminated attribute value"))?;

        attributes.push((name.to_string(), unescape(&value_start[..end])));
        rest = &value_start[end + 1..];
    }
    Ok(attributes)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
