use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use msnp_core::MsnObjectType;

#[derive(Parser, Debug)]
#[command(name = "msnp", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decode one or more notification server frames
    Decode {
        /// Frame text; the escapes \r and \n are expanded
        frame: Option<String>,

        /// Read the raw frame stream from a file instead
        #[arg(short, long, conflicts_with = "frame")]
        file: Option<PathBuf>,

        /// Input is hex encoded
        #[arg(long)]
        hex: bool,

        /// Print each frame as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute or verify the MSN object descriptor of a file
    Msnobj {
        /// File holding the object data
        file: PathBuf,

        /// Account that owns the object
        #[arg(long)]
        creator: String,

        /// Object type
        #[arg(long, value_enum, default_value_t = ObjectKind::UserDisplay)]
        kind: ObjectKind,

        /// Friendly name (defaults to the file name)
        #[arg(long)]
        name: Option<String>,

        /// Storage location
        #[arg(long, default_value = "0")]
        location: String,

        /// Also print the base64 encoded context
        #[arg(long)]
        base64: bool,

        /// Verify an existing `<msnobj/>` context against the file instead
        #[arg(long, value_name = "CONTEXT")]
        verify: Option<String>,
    },

    /// Replay a captured server stream through a dispatcher
    Replay {
        /// Capture file holding raw server frames back to back
        capture: PathBuf,
    },

    /// Print or write the effective configuration
    Config {
        /// Write the configuration to this path instead of printing it
        #[arg(long)]
        write: Option<PathBuf>,
    },
}

/// MSN object types accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ObjectKind {
    Emoticon,
    UserDisplay,
    Background,
    Wink,
    VoiceClip,
    SavedState,
    Location,
}

impl From<ObjectKind> for MsnObjectType {
    fn from(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Emoticon => MsnObjectType::Emoticon,
            ObjectKind::UserDisplay => MsnObjectType::UserDisplay,
            ObjectKind::Background => MsnObjectType::Background,
            ObjectKind::Wink => MsnObjectType::Wink,
            ObjectKind::VoiceClip => MsnObjectType::VoiceClip,
            ObjectKind::SavedState => MsnObjectType::SavedState,
            ObjectKind::Location => MsnObjectType::Location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_msnobj_defaults() {
        let cli = Cli::parse_from(["msnp", "msnobj", "avatar.png", "--creator", "alice@live.com"]);
        match cli.command {
            Commands::Msnobj {
                kind,
                location,
                verify,
                ..
            } => {
                assert_eq!(kind, ObjectKind::UserDisplay);
                assert_eq!(location, "0");
                assert!(verify.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["msnp", "replay", "capture.bin", "-v", "--config", "msnp.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("msnp.toml")));
    }

    #[test]
    fn test_object_kind_maps_to_type() {
        assert_eq!(MsnObjectType::from(ObjectKind::Wink).as_u32(), 8);
        assert_eq!(MsnObjectType::from(ObjectKind::UserDisplay).as_u32(), 3);
    }
}
