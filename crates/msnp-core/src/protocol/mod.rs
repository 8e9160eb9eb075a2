//! MSNP wire protocol
//!
//! Frame codec for the notification server and the MIME payloads it carries.

pub mod mime;
pub mod multimime;
pub mod ns_message;

pub use mime::MimeHeaders;
pub use multimime::MultiMimeMessage;
pub use ns_message::NsMessage;

use crate::errors::{FrameError, Result};
use crate::types::TransactionId;

// ----------------------------------------------------------------------------
// Frame Trait
// ----------------------------------------------------------------------------

/// A protocol frame the dispatcher can sequence, encode and decode
///
/// Frames are cloned once per handler on dispatch, so `Clone` must produce a
/// fully independent copy.
pub trait Frame: Clone + Send + Sync + 'static {
    /// Transaction ID currently assigned to the frame
    fn transaction_id(&self) -> Option<TransactionId>;

    /// Assign the transaction ID the frame is sent under
    fn set_transaction_id(&mut self, id: TransactionId);

    /// Serialize nested payloads into the frame body; runs before `to_bytes`
    fn prepare(&mut self) -> Result<()>;

    /// Encode the frame for the wire
    fn to_bytes(&self) -> Result<Vec<u8>>;

    /// Decode one complete frame
    fn parse(bytes: &[u8]) -> core::result::Result<Self, FrameError>;

    /// Frame announcing a clean sign-off, if the protocol has one
    fn sign_off() -> Option<Self> {
        None
    }

    /// Short human readable description for logs
    fn summary(&self) -> String;
}
