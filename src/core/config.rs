/*!
Channel configuration for the e2ee-chat channel.

Both endpoints must be configured with the same symmetric algorithm; it is
not negotiated on the wire.
*/

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::core::constants::DEFAULT_MAX_FRAME_SIZE;
use crate::core::error::{Error, Result};

/// Supported Symmetric Encryption Algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymmetricAlgorithm {
    /// AES-256-GCM - hardware acceleration on many platforms
    #[default]
    Aes256Gcm,
    /// ChaCha20-Poly1305
    ChaCha20Poly1305,
}

impl fmt::Display for SymmetricAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymmetricAlgorithm::Aes256Gcm => write!(f, "aes-256-gcm"),
            SymmetricAlgorithm::ChaCha20Poly1305 => write!(f, "chacha20-poly1305"),
        }
    }
}

impl FromStr for SymmetricAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "aes" | "aes-256-gcm" | "aes256gcm" => Ok(SymmetricAlgorithm::Aes256Gcm),
            "chacha" | "chacha20-poly1305" | "chacha20poly1305" => {
                Ok(SymmetricAlgorithm::ChaCha20Poly1305)
            }
            other => Err(Error::InvalidConfig(format!("unknown cipher: {}", other))),
        }
    }
}

/// Configuration for one channel endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Cipher used for chat messages
    pub symmetric: SymmetricAlgorithm,
    /// Largest frame payload accepted from the peer
    pub max_frame_size: usize,
    /// Deadline for each blocking handshake read or write; `None` blocks forever
    pub handshake_timeout: Option<Duration>,
    /// Deadline for each blocking read or write after the handshake
    pub io_timeout: Option<Duration>,
    /// Deadline for establishing the TCP connection
    pub connect_timeout: Option<Duration>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            symmetric: SymmetricAlgorithm::default(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            handshake_timeout: None,
            io_timeout: None,
            connect_timeout: None,
        }
    }
}

impl ChannelConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration that bounds connection setup and the handshake to 30 seconds
    pub fn bounded() -> Self {
        Self {
            handshake_timeout: Some(Duration::from_secs(30)),
            connect_timeout: Some(Duration::from_secs(30)),
            ..Self::default()
        }
    }

    /// Use a specific symmetric algorithm
    pub fn with_symmetric(mut self, algorithm: SymmetricAlgorithm) -> Self {
        self.symmetric = algorithm;
        self
    }

    /// Set the largest accepted frame payload
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }

    /// Bound every handshake read and write
    pub fn with_handshake_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Bound every post-handshake read and write
    pub fn with_io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Bound connection establishment
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_frame_size == 0 {
            return Err(Error::InvalidConfig("max_frame_size must be non-zero".into()));
        }

        // Socket timeouts reject zero durations
        let timeouts = [
            ("handshake_timeout", self.handshake_timeout),
            ("io_timeout", self.io_timeout),
            ("connect_timeout", self.connect_timeout),
        ];
        for (name, timeout) in timeouts {
            if timeout == Some(Duration::ZERO) {
                return Err(Error::InvalidConfig(format!("{} must be non-zero", name)));
            }
        }

        Ok(())
    }
}
