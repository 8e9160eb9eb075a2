//! Centralized Configuration Management
//!
//! Configuration structures shared by the runtime and the command line tool.
//! Every section has a `Default` and a `validate()` so that partially written
//! configuration files still produce a usable setup.

use serde::{Deserialize, Serialize};

use crate::errors::{MsnpError, Result};

/// Default notification server host
pub const DEFAULT_NS_HOST: &str = "messenger.hotmail.com";
/// Default notification server port for direct socket connections
pub const DEFAULT_NS_PORT: u16 = 1863;
/// Default HTTP gateway host
pub const DEFAULT_GATEWAY_HOST: &str = "gateway.messenger.hotmail.com";
/// Default HTTP gateway port
pub const DEFAULT_GATEWAY_PORT: u16 = 80;
/// Default upper bound for a single encoded frame
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

// ----------------------------------------------------------------------------
// Transport Selection
// ----------------------------------------------------------------------------

/// How frames reach the notification server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Direct TCP connection with MSNP stream framing
    #[default]
    Socket,
    /// Frames tunnelled through the HTTP gateway
    HttpPolling,
}

// ----------------------------------------------------------------------------
// Connectivity Settings
// ----------------------------------------------------------------------------

/// Proxy used to reach the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxySettings {
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Host, port and framing of the server connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectivitySettings {
    /// Transport framing to use
    pub transport: TransportKind,
    /// Server host name
    pub host: String,
    /// Server port
    pub port: u16,
    /// Optional proxy
    pub proxy: Option<ProxySettings>,
    /// Largest encoded frame the transport accepts
    pub max_frame_size: usize,
}

impl Default for ConnectivitySettings {
    fn default() -> Self {
        Self::socket()
    }
}

impl ConnectivitySettings {
    /// Direct socket connection to the default notification server
    pub fn socket() -> Self {
        Self {
            transport: TransportKind::Socket,
            host: DEFAULT_NS_HOST.to_string(),
            port: DEFAULT_NS_PORT,
            proxy: None,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// HTTP polling through the default gateway
    pub fn http_polling() -> Self {
        Self {
            transport: TransportKind::HttpPolling,
            host: DEFAULT_GATEWAY_HOST.to_string(),
            port: DEFAULT_GATEWAY_PORT,
            proxy: None,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Set the proxy
    pub fn with_proxy(mut self, proxy: ProxySettings) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// `host:port` of the server
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check the settings for values no transport can work with
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(MsnpError::config_error("host must not be empty"));
        }
        if self.port == 0 {
            return Err(MsnpError::config_error("port must not be zero"));
        }
        if self.max_frame_size == 0 {
            return Err(MsnpError::config_error("max_frame_size must be positive"));
        }
        if let Some(proxy) = &self.proxy {
            if proxy.host.trim().is_empty() || proxy.port == 0 {
                return Err(MsnpError::config_error("proxy needs a host and a port"));
            }
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Dispatcher Configuration
// ----------------------------------------------------------------------------

/// Configuration for the message dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Capacity of the broadcast channel carrying dispatcher events
    pub event_buffer_size: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            event_buffer_size: 128, // Lifecycle events are rare, send completions are bursty
        }
    }
}

impl DispatcherConfig {
    pub fn validate(&self) -> Result<()> {
        if self.event_buffer_size == 0 {
            return Err(MsnpError::config_error("event_buffer_size must be positive"));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Umbrella Configuration
// ----------------------------------------------------------------------------

/// Complete client configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MsnpConfig {
    pub connectivity: ConnectivitySettings,
    pub dispatcher: DispatcherConfig,
}

impl MsnpConfig {
    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.connectivity.validate()?;
        self.dispatcher.validate()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
