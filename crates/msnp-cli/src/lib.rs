//! MSNP command line tool
//!
//! Decodes captured notification server frames, computes MSN object
//! descriptors and replays captures through a dispatcher on a loopback
//! transport.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod presence;

pub use cli::{Cli, Commands, ObjectKind};
pub use commands::CommandDispatcher;
pub use error::{CliError, Result};
pub use presence::PresenceTracker;
