/*!
Error handling for the e2ee-chat channel.

Transport failures keep the underlying `io::Error` as their source, handshake
failures carry the stage that broke, and cryptographic failures are reported
with deliberately little detail.
*/

use std::io;
use thiserror::Error;

use crate::core::session::state::HandshakeStage;

/// Result type for the e2ee-chat channel
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the e2ee-chat channel
#[derive(Error, Debug)]
pub enum Error {
    /// Opening a stream to the remote listener failed
    #[error("Failed to connect to {addr}")]
    ConnectFailed {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Binding the listening socket failed
    #[error("Failed to bind {addr}")]
    BindFailed {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Accepting an incoming connection failed
    #[error("Failed to accept connection")]
    AcceptFailed(#[source] io::Error),

    /// Writing to the connection failed
    #[error("Send failed")]
    SendFailed(#[source] io::Error),

    /// Reading from the connection failed
    #[error("Receive failed")]
    ReceiveFailed(#[source] io::Error),

    /// The peer shut down its side of the connection
    #[error("Peer closed the connection")]
    PeerClosed,

    /// A handshake step failed; the connection is unusable afterwards
    #[error("Handshake failed while {stage}")]
    HandshakeFailed {
        stage: HandshakeStage,
        #[source]
        source: Box<Error>,
    },

    /// A message could not be decrypted (malformed ciphertext or wrong key)
    #[error("Message decryption failed")]
    DecryptFailed,

    /// Cryptographic error (limited details for security)
    #[error("Cryptographic operation failed")]
    Crypto(#[source] CryptoError),

    /// A frame header announced more bytes than the configured limit
    #[error("Frame of {len} bytes exceeds limit of {max} bytes")]
    FrameTooLarge { len: usize, max: usize },

    /// A blocking operation hit its configured deadline
    #[error("Operation timed out after {0} ms")]
    Timeout(u64),

    /// Operation attempted in the wrong handshake state
    #[error("Handshake not in correct state: expected {expected}, but was {actual}")]
    InvalidState { expected: String, actual: String },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error outside the send/receive paths (socket options, local address)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Cryptographic errors with limited details to prevent leaking information
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    /// Generic encryption error
    #[error("Encryption failed")]
    EncryptionFailed,

    /// Unwrapping the session key failed
    #[error("Session key unwrap failed")]
    UnwrapFailed,

    /// Key derivation error
    #[error("Key derivation failed")]
    KeyDerivationFailed,

    /// Invalid key format
    #[error("Invalid key format")]
    InvalidKeyFormat,

    /// Invalid ciphertext
    #[error("Invalid ciphertext")]
    InvalidCiphertext,
}

impl Error {
    /// Whether this error ends a running duplex session.
    ///
    /// Only a single garbled message is survivable; everything else means the
    /// connection state can no longer be trusted.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Error::DecryptFailed)
    }

    /// Whether the error reports an orderly shutdown by the peer.
    pub fn is_peer_closed(&self) -> bool {
        matches!(self, Error::PeerClosed)
    }

    /// The failing stage, if this is a handshake failure.
    pub fn handshake_stage(&self) -> Option<HandshakeStage> {
        match self {
            Error::HandshakeFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Create a crypto error
#[macro_export]
macro_rules! crypto_err {
    ($err:expr) => {
        Err($crate::core::error::Error::Crypto($err))
    };
}

/// Create an invalid state error
#[macro_export]
macro_rules! invalid_state_err {
    ($expected:expr, $actual:expr) => {
        Err($crate::core::error::Error::InvalidState {
            expected: $expected.to_string(),
            actual: $actual.to_string(),
        })
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PeerClosed;
        assert_eq!(format!("{}", err), "Peer closed the connection");

        let err = Error::FrameTooLarge { len: 10, max: 4 };
        assert_eq!(format!("{}", err), "Frame of 10 bytes exceeds limit of 4 bytes");

        let err = Error::Crypto(CryptoError::UnwrapFailed);
        assert_eq!(format!("{}", err), "Cryptographic operation failed");
    }

    #[test]
    fn test_handshake_failure_keeps_stage_and_source() {
        let err = Error::HandshakeFailed {
            stage: HandshakeStage::ReceivePublicKey,
            source: Box::new(Error::PeerClosed),
        };

        assert_eq!(err.handshake_stage(), Some(HandshakeStage::ReceivePublicKey));
        assert!(format!("{}", err).contains("receiving the peer public key"));

        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "Peer closed the connection");
    }

    #[test]
    fn test_terminal_classification() {
        assert!(!Error::DecryptFailed.is_terminal());
        assert!(Error::PeerClosed.is_terminal());
        assert!(Error::SendFailed(io::Error::from(io::ErrorKind::BrokenPipe)).is_terminal());
        assert!(Error::PeerClosed.is_peer_closed());
        assert!(!Error::DecryptFailed.is_peer_closed());
    }

    #[test]
    fn test_macros() {
        let res: Result<()> = crypto_err!(CryptoError::InvalidKeyFormat);
        assert!(matches!(res, Err(Error::Crypto(CryptoError::InvalidKeyFormat))));

        let res: Result<()> = invalid_state_err!("Idle", "SecureReady");
        match res {
            Err(Error::InvalidState { expected, actual }) => {
                assert_eq!(expected, "Idle");
                assert_eq!(actual, "SecureReady");
            }
            other => panic!("Expected InvalidState, got {:?}", other),
        }
    }
}
