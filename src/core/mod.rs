//! Core components for the e2ee-chat channel.
//!
//! This module contains the building blocks below the wire protocol:
//! cryptographic primitives, key material, handshake state, configuration
//! and error handling.

// Export cryptographic functionality
pub mod crypto;

// Export frame handling
pub mod message;

// Export session state and key material
pub mod session;

// Channel configuration
pub mod config;

// Protocol constants
pub mod constants;

// Error handling
pub mod error;

// Re-exports for convenience
pub use self::config::{ChannelConfig, SymmetricAlgorithm};
pub use self::error::{CryptoError, Error, Result};
pub use self::session::{HandshakeStage, HandshakeState, Role};
