//! Presence tracking from notification server traffic
//!
//! `PresenceTracker` is a dispatcher handler that folds `ILN`, `NLN` and
//! `FLN` frames into a [`ContactList`].

use std::sync::{Mutex, PoisonError};

use msnp_core::{
    ContactKey, ContactList, ContactListStats, FrameError, MsnObject, NsMessage, PresenceStatus,
    Result,
};
use msnp_runtime::{MessageHandler, NsMessageProcessor};
use percent_encoding::percent_decode_str;
use tracing::{debug, trace};

/// Handler maintaining the presence of every contact seen on the wire
#[derive(Debug, Default)]
pub struct PresenceTracker {
    contacts: Mutex<ContactList>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current contact list
    pub fn snapshot(&self) -> ContactList {
        self.contacts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn stats(&self) -> ContactListStats {
        self.contacts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stats()
    }

    /// `ILN`/`NLN`: status, key, display name, capabilities and an optional msnobj
    fn apply_online(&self, message: &NsMessage) -> Result<()> {
        let status = PresenceStatus::from_code(required(message, 0)?)?;
        let key: ContactKey = required(message, 1)?.parse()?;

        let mut contacts = self.contacts.lock().unwrap_or_else(PoisonError::into_inner);
        let contact = contacts.get_or_insert_contact(key);
        contact.set_status(status);
        if let Some(name) = message.param(2) {
            contact.display_name = percent_decode(name);
        }
        if let Some(context) = message.param(4) {
            match MsnObject::parse(&percent_decode(context)) {
                Ok(object) => contact.display_image = Some(object),
                Err(e) => debug!("Ignoring display picture of {}: {}", contact.key(), e),
            }
        }
        trace!("{} is now {:?}", contact.key(), status);
        Ok(())
    }

    /// `FLN`: key and capabilities
    fn apply_offline(&self, message: &NsMessage) -> Result<()> {
        let key: ContactKey = required(message, 0)?.parse()?;

        let mut contacts = self.contacts.lock().unwrap_or_else(PoisonError::into_inner);
        contacts
            .get_or_insert_contact(key)
            .set_status(PresenceStatus::Offline);
        Ok(())
    }
}

impl MessageHandler for PresenceTracker {
    fn handle_message(&self, _source: &NsMessageProcessor, message: NsMessage) -> Result<()> {
        match message.command() {
            "ILN" | "NLN" => self.apply_online(&message),
            "FLN" => self.apply_offline(&message),
            _ => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "presence"
    }
}

fn required(message: &NsMessage, index: usize) -> std::result::Result<&str, FrameError> {
    message
        .param(index)
        .ok_or_else(|| FrameError::InvalidParameter {
            value: format!("{} is missing parameter {}", message.command(), index),
        })
}

/// Decode `%XX` escapes; malformed escapes are kept as-is
pub fn percent_decode(input: &str) -> String {
    percent_decode_str(input).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use msnp_core::{ConnectivitySettings, MsnObjectType};
    use msnp_runtime::{DispatcherEvent, LoopbackTransport};
    use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
    use std::sync::Arc;

    fn setup() -> (
        NsMessageProcessor,
        msnp_runtime::LoopbackServer,
        Arc<PresenceTracker>,
    ) {
        let (transport, server) = LoopbackTransport::new(ConnectivitySettings::default());
        let processor = NsMessageProcessor::new(transport);
        let tracker = Arc::new(PresenceTracker::new());
        processor.register_shared_handler(tracker.clone());
        processor.connect().unwrap();
        (processor, server, tracker)
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("Bob%20Smith"), "Bob Smith");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz%41"), "%zzA");
        assert_eq!(percent_decode("caf%C3%A9"), "café");
    }

    #[test]
    fn test_initial_and_changed_presence() {
        let (_processor, server, tracker) = setup();

        server.inject_bytes(&b"ILN 7 NLN 1:bob@live.com Bob%20S 0:0\r\n"[..]);
        server.inject_bytes(&b"NLN AWY 1:carol@live.com Carol 0:0\r\n"[..]);

        let contacts = tracker.snapshot();
        let bob = contacts
            .get_contact(&ContactKey::passport("bob@live.com"))
            .unwrap();
        assert_eq!(bob.status, PresenceStatus::Online);
        assert_eq!(bob.display_name, "Bob S");
        assert_eq!(tracker.stats().total_online, 2);
    }

    #[test]
    fn test_sign_out_marks_contact_offline() {
        let (_processor, server, tracker) = setup();

        server.inject_bytes(&b"NLN NLN 1:bob@live.com Bob 0:0\r\n"[..]);
        server.inject_bytes(&b"FLN 1:bob@live.com 0:0\r\n"[..]);

        let stats = tracker.stats();
        assert_eq!(stats.total_contacts, 1);
        assert_eq!(stats.total_online, 0);
    }

    #[test]
    fn test_display_picture_is_attached() {
        let (_processor, server, tracker) = setup();
        let object = MsnObject::from_data(
            "bob@live.com",
            MsnObjectType::UserDisplay,
            "0",
            "bob.png",
            b"png bytes",
        );
        let context = utf8_percent_encode(&object.to_context(), NON_ALPHANUMERIC).to_string();
        let frame = format!("NLN NLN 1:bob@live.com Bob 0:0 {}\r\n", context);
        server.inject_bytes(frame.into_bytes());

        let contacts = tracker.snapshot();
        let bob = contacts
            .get_contact(&ContactKey::passport("bob@live.com"))
            .unwrap();
        assert_eq!(bob.display_image.as_ref(), Some(&object));
    }

    #[test]
    fn test_bad_presence_is_reported_as_handler_failure() {
        let (processor, server, tracker) = setup();
        let mut events = processor.subscribe();

        server.inject_bytes(&b"NLN XYZ 1:bob@live.com Bob 0:0\r\n"[..]);

        let event = events.try_recv().unwrap();
        match event {
            DispatcherEvent::HandlerException(error) => assert_eq!(error.handler(), "presence"),
            other => panic!("unexpected event: {:?}", other),
        }
        assert_eq!(tracker.stats().total_contacts, 0);
    }
}
