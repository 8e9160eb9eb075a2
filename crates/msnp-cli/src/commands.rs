//! Command execution for the MSNP command line tool

use std::path::{Path, PathBuf};
use std::sync::Arc;

use msnp_core::{Frame, MsnObject, MsnpConfig, NsMessage};
use msnp_runtime::{DispatcherEvent, FnHandler, LoopbackTransport, NsMessageProcessor};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::cli::{Cli, Commands, ObjectKind};
use crate::config;
use crate::error::{CliError, Result};
use crate::presence::PresenceTracker;

/// Command dispatcher for executing CLI commands
pub struct CommandDispatcher;

impl CommandDispatcher {
    /// Execute a parsed command line against the loaded configuration
    pub async fn execute(cli: Cli, config: MsnpConfig) -> Result<()> {
        match cli.command {
            Commands::Decode {
                frame,
                file,
                hex,
                json,
            } => {
                let input = read_input(frame, file, hex)?;
                handle_decode(&input, json, config.connectivity.max_frame_size)
            }
            Commands::Msnobj {
                file,
                creator,
                kind,
                name,
                location,
                base64,
                verify,
            } => {
                let data = std::fs::read(&file)?;
                match verify {
                    Some(context) => handle_msnobj_verify(&context, &data),
                    None => {
                        let name = name.unwrap_or_else(|| file_name(&file));
                        handle_msnobj(&data, creator, kind, location, name, base64)
                    }
                }
            }
            Commands::Replay { capture } => handle_replay(&capture, config).await,
            Commands::Config { write } => handle_config(&config, write),
        }
    }
}

// ----------------------------------------------------------------------------
// Input Helpers
// ----------------------------------------------------------------------------

fn read_input(frame: Option<String>, file: Option<PathBuf>, hex: bool) -> Result<Vec<u8>> {
    match (frame, file) {
        (_, Some(path)) => {
            let bytes = std::fs::read(&path)?;
            if hex {
                Ok(hex::decode(String::from_utf8_lossy(&bytes).trim())?)
            } else {
                Ok(bytes)
            }
        }
        (Some(text), None) if hex => Ok(hex::decode(text.trim())?),
        (Some(text), None) => Ok(expand_escapes(&text).into_bytes()),
        (None, None) => Err(CliError::InvalidInput(
            "pass a frame or --file <PATH>".to_string(),
        )),
    }
}

/// Expand the `\r` and `\n` escapes typed on a command line
pub fn expand_escapes(text: &str) -> String {
    text.replace("\\r", "\r").replace("\\n", "\n")
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Split a raw stream into complete frames
///
/// The second value holds any bytes after the last complete frame: an
/// incomplete tail, data whose header does not parse, or a frame declaring a
/// payload larger than `max_payload`.
pub fn split_frames(stream: &[u8], max_payload: usize) -> (Vec<&[u8]>, &[u8]) {
    let mut frames = Vec::new();
    let mut rest = stream;
    while !rest.is_empty() {
        match NsMessage::frame_length_with_limit(rest, max_payload) {
            Ok(Some(length)) => {
                frames.push(&rest[..length]);
                rest = &rest[length..];
            }
            Ok(None) => break,
            Err(e) => {
                debug!("Stopping frame split: {}", e);
                break;
            }
        }
    }
    (frames, rest)
}

// ----------------------------------------------------------------------------
// Decode
// ----------------------------------------------------------------------------

fn handle_decode(input: &[u8], json: bool, max_payload: usize) -> Result<()> {
    let (frames, rest) = split_frames(input, max_payload);
    if frames.is_empty() {
        // Surface the codec's own error for the leftover bytes
        NsMessage::frame_length_with_limit(rest, max_payload)?;
        NsMessage::parse(rest)?;
    }

    for bytes in frames {
        let message = NsMessage::parse(bytes)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&message)?);
        } else {
            print_frame(&message);
        }
    }

    if !rest.is_empty() {
        warn!("{} trailing bytes do not form a complete frame", rest.len());
    }
    Ok(())
}

fn print_frame(message: &NsMessage) {
    println!("{}", message.summary());
    match message.transaction_id() {
        Some(id) => println!("  transaction: {}", id),
        None => println!("  transaction: -"),
    }
    for (index, param) in message.params().iter().enumerate() {
        println!("  param[{}]: {}", index, param);
    }
    if let Some(code) = message.error_code() {
        println!("  error code: {}", code);
    }
    if let Some(inner) = message.inner() {
        if let Some(from) = inner.from() {
            println!("  from: {}", from);
        }
        if let Some(to) = inner.to() {
            println!("  to: {}", to);
        }
        if let Some(kind) = inner.message_type() {
            println!("  message type: {}", kind);
        }
        if let Some(text) = inner.body_text() {
            println!("  text: {}", text);
        }
    } else if let Some(body) = message.body() {
        match std::str::from_utf8(body) {
            Ok(text) => println!("  body ({} bytes):\n{}", body.len(), text),
            Err(_) => println!("  body ({} bytes): {}", body.len(), hex::encode(body)),
        }
    }
}

// ----------------------------------------------------------------------------
// MSN Objects
// ----------------------------------------------------------------------------

fn handle_msnobj(
    data: &[u8],
    creator: String,
    kind: ObjectKind,
    location: String,
    name: String,
    base64: bool,
) -> Result<()> {
    let object = MsnObject::from_data(creator, kind.into(), location, name, data);
    println!("{}", object.to_context());
    if base64 {
        println!("{}", object.context_base64());
    }
    Ok(())
}

fn handle_msnobj_verify(context: &str, data: &[u8]) -> Result<()> {
    let object = MsnObject::parse(context)?;
    object.verify_checksum()?;
    if !object.matches_data(data) {
        return Err(CliError::InvalidInput(format!(
            "file does not match SHA1D {}",
            object.sha1d()
        )));
    }
    println!("ok: {} ({} bytes)", object.friendly_name, object.size);
    Ok(())
}

// ----------------------------------------------------------------------------
// Replay
// ----------------------------------------------------------------------------

/// Counts of the dispatcher events seen during a replay
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub frames_sent: usize,
    pub handler_failures: usize,
    pub parse_failures: usize,
    pub lagged: u64,
}

/// Feed a capture through a dispatcher on a loopback transport
///
/// Frames are injected as if the server sent them; a presence tracker and a
/// logging handler are registered. Malformed data after the last complete
/// frame is injected too, so it shows up as a parse failure.
pub async fn replay_capture(
    stream: &[u8],
    config: &MsnpConfig,
    tracker: Arc<PresenceTracker>,
) -> Result<ReplaySummary> {
    let (transport, mut server) = LoopbackTransport::new(config.connectivity.clone());
    let processor = NsMessageProcessor::with_config(transport, config.dispatcher.clone());
    let mut events = processor.subscribe();

    let observer = tokio::spawn(async move {
        let mut summary = ReplaySummary::default();
        loop {
            match events.recv().await {
                Ok(event) => {
                    match &event {
                        DispatcherEvent::HandlerException(_) => summary.handler_failures += 1,
                        DispatcherEvent::ParseFailed(_) => summary.parse_failures += 1,
                        _ => {}
                    }
                    if event.is_error() {
                        warn!("{:?}", event);
                    } else {
                        debug!("{:?}", event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => summary.lagged += skipped,
                Err(RecvError::Closed) => break,
            }
        }
        summary
    });

    processor.register_shared_handler(tracker);
    processor.register_handler(FnHandler::new(
        "log",
        |_: &NsMessageProcessor, message: NsMessage| {
            info!("<- {}", message.summary());
            Ok(())
        },
    ));

    processor.connect()?;
    let (frames, rest) = split_frames(stream, config.connectivity.max_frame_size);
    for frame in frames {
        server.inject_bytes(frame);
    }
    if !rest.is_empty() {
        server.inject_bytes(rest);
    }
    processor.disconnect()?;

    let sent = server.drain();
    for frame in &sent {
        match frame.decode::<NsMessage>() {
            Ok(message) => info!("-> {}", message.summary()),
            Err(e) => warn!("-> undecodable frame {}: {}", frame.transaction_id, e),
        }
    }

    // The observer ends once the last sender goes away with the processor
    drop(processor);
    let mut summary = observer
        .await
        .map_err(|e| CliError::Replay(e.to_string()))?;
    summary.frames_sent = sent.len();
    Ok(summary)
}

async fn handle_replay(capture: &Path, config: MsnpConfig) -> Result<()> {
    let stream = std::fs::read(capture)?;
    info!("Replaying {} bytes from {}", stream.len(), capture.display());

    let tracker = Arc::new(PresenceTracker::new());
    let summary = replay_capture(&stream, &config, tracker.clone()).await?;
    let stats = tracker.stats();

    println!("Replay of {}", capture.display());
    println!("  frames sent:      {}", summary.frames_sent);
    println!("  handler failures: {}", summary.handler_failures);
    println!("  parse failures:   {}", summary.parse_failures);
    if summary.lagged > 0 {
        println!("  events dropped:   {}", summary.lagged);
    }
    println!("  contacts:         {}", stats.total_contacts);
    println!("  online:           {}", stats.total_online);
    for contact in tracker.snapshot().online() {
        println!("    {} ({:?}) {}", contact.key(), contact.status, contact.display_name);
    }
    Ok(())
}

// ----------------------------------------------------------------------------
// Configuration
// ----------------------------------------------------------------------------

fn handle_config(config: &MsnpConfig, write: Option<PathBuf>) -> Result<()> {
    match write {
        Some(path) => {
            config::save_to_file(config, &path)?;
            info!("Configuration written to {}", path.display());
        }
        None => print!("{}", config::to_toml(config)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use msnp_core::config::DEFAULT_MAX_FRAME_SIZE;

    #[test]
    fn test_expand_escapes() {
        assert_eq!(expand_escapes("PNG\\r\\n"), "PNG\r\n");
        assert_eq!(expand_escapes("no escapes"), "no escapes");
    }

    #[test]
    fn test_split_frames_with_payloads() {
        let stream = b"CHL 0 12345\r\nMSG Hotmail Hotmail 5\r\nhelloQNG 50\r\nNLN";
        let (frames, rest) = split_frames(stream, DEFAULT_MAX_FRAME_SIZE);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[1], &b"MSG Hotmail Hotmail 5\r\nhello"[..]);
        assert_eq!(frames[2], &b"QNG 50\r\n"[..]);
        assert_eq!(rest, &b"NLN"[..]);
    }

    #[test]
    fn test_split_frames_stops_at_bad_header() {
        let stream = b"QNG 50\r\nnot a frame\r\nQNG 51\r\n";
        let (frames, rest) = split_frames(stream, DEFAULT_MAX_FRAME_SIZE);
        assert_eq!(frames.len(), 1);
        assert_eq!(rest, &b"not a frame\r\nQNG 51\r\n"[..]);
    }

    #[test]
    fn test_split_frames_stops_at_oversized_length() {
        let stream = b"QNG 50\r\nMSG 1 N 99999999\r\nhi";
        let (frames, rest) = split_frames(stream, DEFAULT_MAX_FRAME_SIZE);
        assert_eq!(frames, vec![&b"QNG 50\r\n"[..]]);
        assert_eq!(rest, &b"MSG 1 N 99999999\r\nhi"[..]);

        let (frames, rest) = split_frames(b"NOT 3\r\nabc", 2);
        assert!(frames.is_empty());
        assert_eq!(rest.len(), 10);
    }

    #[test]
    fn test_decode_reports_oversized_length() {
        let result = handle_decode(b"MSG 1 N 99999999\r\n", false, 1024);
        assert!(matches!(
            result,
            Err(CliError::Protocol(msnp_core::MsnpError::Frame(
                msnp_core::FrameError::PayloadTooLarge { length: 99_999_999, max: 1024 }
            )))
        ));
    }

    #[test]
    fn test_read_input_requires_a_source() {
        assert!(matches!(
            read_input(None, None, false),
            Err(CliError::InvalidInput(_))
        ));
        assert_eq!(
            read_input(Some("514e4720353000".into()), None, true).unwrap(),
            b"QNG 50\0".to_vec()
        );
    }

    #[test]
    fn test_msnobj_verify_rejects_other_data() {
        let object = MsnObject::from_data(
            "alice@live.com",
            msnp_core::MsnObjectType::UserDisplay,
            "0",
            "me.png",
            b"picture",
        );
        assert!(handle_msnobj_verify(&object.to_context(), b"picture").is_ok());
        assert!(handle_msnobj_verify(&object.to_context(), b"other").is_err());
    }

    #[tokio::test]
    async fn test_replay_capture() {
        let stream = b"ILN 1 NLN 1:bob@live.com Bob 0:0\r\n\
NLN BSY 1:carol@live.com Carol 0:0\r\n\
FLN 1:bob@live.com 0:0\r\n\
NLN XYZ 1:dave@live.com Dave 0:0\r\n\
garbage\r\n";
        let tracker = Arc::new(PresenceTracker::new());

        let summary = replay_capture(stream, &MsnpConfig::default(), tracker.clone())
            .await
            .unwrap();

        // Only the sign-off goes out
        assert_eq!(summary.frames_sent, 1);
        assert_eq!(summary.handler_failures, 1);
        assert_eq!(summary.parse_failures, 1);

        let stats = tracker.stats();
        assert_eq!(stats.total_contacts, 2);
        assert_eq!(stats.total_online, 1);
    }
}
