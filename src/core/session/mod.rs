/*!
Session management for the e2ee-chat channel.

This module provides the handshake state machine and the per-endpoint key
material.
*/

// State management
pub mod state;

// Key pair, peer key and session key
pub mod key_material;

// Re-export main session types
pub use self::key_material::{KeyMaterial, KeyPair, PeerPublicKey, SessionKey};
pub use self::state::{HandshakeStage, HandshakeState, HandshakeStep, Role};
