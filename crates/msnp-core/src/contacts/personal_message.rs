//! Personal message payload
//!
//! The status line a contact publishes alongside its presence, optionally with
//! a "now playing" style current media entry. Current media travels as
//! `app\0type\0enabled\0format\0arg0\0arg1...\0` where `\0` is the literal
//! two-character sequence backslash-zero.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::FrameError;

const MEDIA_SEPARATOR: &str = "\\0";

/// Category of a current media entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaType {
    Music,
    Games,
    Office,
}

impl MediaType {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaType::Music => "Music",
            MediaType::Games => "Games",
            MediaType::Office => "Office",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Music" => Some(MediaType::Music),
            "Games" => Some(MediaType::Games),
            "Office" => Some(MediaType::Office),
            _ => None,
        }
    }
}

/// What the contact is currently listening to, playing or editing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentMedia {
    pub application: String,
    pub media_type: MediaType,
    pub enabled: bool,
    /// Display template with `{0}`, `{1}`... placeholders
    pub format: String,
    pub arguments: Vec<String>,
}

impl CurrentMedia {
    /// Music entry rendered as `{0} - {1}` (title, artist)
    pub fn music<T: Into<String>, A: Into<String>>(title: T, artist: A) -> Self {
        Self {
            application: String::new(),
            media_type: MediaType::Music,
            enabled: true,
            format: "{0} - {1}".to_string(),
            arguments: vec![title.into(), artist.into()],
        }
    }

    /// Render the format template with the arguments substituted
    pub fn formatted(&self) -> String {
        self.arguments
            .iter()
            .enumerate()
            .fold(self.format.clone(), |text, (index, argument)| {
                text.replace(&format!("{{{index}}}"), argument)
            })
    }

    /// Encode for the wire
    pub fn to_wire(&self) -> String {
        let mut fields = vec![
            self.application.clone(),
            self.media_type.as_str().to_string(),
            if self.enabled { "1" } else { "0" }.to_string(),
            self.format.clone(),
        ];
        fields.extend(self.arguments.iter().cloned());

        let mut wire = fields.join(MEDIA_SEPARATOR);
        wire.push_str(MEDIA_SEPARATOR);
        wire
    }

    /// Decode the wire form; an empty string means no media
    pub fn parse(wire: &str) -> Result<Option<Self>, FrameError> {
        if wire.is_empty() {
            return Ok(None);
        }

        let mut fields: Vec<&str> = wire.split(MEDIA_SEPARATOR).collect();
        // The encoding ends with a separator, leaving an empty last field
        if fields.last() == Some(&"") {
            fields.pop();
        }
        if fields.len() < 4 {
            return Err(FrameError::InvalidMedia {
                reason: format!("expected at least 4 fields, got {}", fields.len()),
            });
        }

        let media_type = MediaType::parse(fields[1]).ok_or_else(|| FrameError::InvalidMedia {
            reason: format!("unknown media type {}", fields[1]),
        })?;
        let enabled = match fields[2] {
            "1" => true,
            "0" => false,
            other => {
                return Err(FrameError::InvalidMedia {
                    reason: format!("invalid enabled flag {other}"),
                })
            }
        };

        Ok(Some(Self {
            application: fields[0].to_string(),
            media_type,
            enabled,
            format: fields[3].to_string(),
            arguments: fields[4..].iter().map(|s| s.to_string()).collect(),
        }))
    }
}

/// Personal status line published by a contact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalMessage {
    pub message: String,
    pub current_media: Option<CurrentMedia>,
    /// Endpoint the message was published from
    pub machine_guid: Option<Uuid>,
    pub signature_sound: Option<String>,
}

impl PersonalMessage {
    pub fn new<T: Into<String>>(message: T) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_media(mut self, media: CurrentMedia) -> Self {
        self.current_media = Some(media);
        self
    }

    /// Text a client would display: enabled media wins over the message
    pub fn display_text(&self) -> String {
        match &self.current_media {
            Some(media) if media.enabled => media.formatted(),
            _ => self.message.clone(),
        }
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_music_wire_format() {
        let media = CurrentMedia::music("Song", "Band");
        assert_eq!(media.to_wire(), "\\0Music\\01\\0{0} - {1}\\0Song\\0Band\\0");
        assert_eq!(media.formatted(), "Song - Band");
    }

    #[test]
    fn test_media_parse_roundtrip() {
        let media = CurrentMedia {
            application: "WMP".into(),
            media_type: MediaType::Games,
            enabled: false,
            format: "Playing {0}".into(),
            arguments: vec!["Minesweeper".into()],
        };
        assert_eq!(CurrentMedia::parse(&media.to_wire()).unwrap(), Some(media));
        assert_eq!(CurrentMedia::parse("").unwrap(), None);
    }

    #[test]
    fn test_media_parse_rejects_bad_fields() {
        assert!(CurrentMedia::parse("\\0Music\\0").is_err());
        assert!(CurrentMedia::parse("\\0Video\\01\\0{0}\\0x\\0").is_err());
        assert!(CurrentMedia::parse("\\0Music\\0yes\\0{0}\\0x\\0").is_err());
    }

    #[test]
    fn test_display_text() {
        let plain = PersonalMessage::new("at work");
        assert_eq!(plain.display_text(), "at work");

        let playing = PersonalMessage::new("at work").with_media(CurrentMedia::music("A", "B"));
        assert_eq!(playing.display_text(), "A - B");
    }
}
