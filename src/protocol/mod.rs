//! Protocol implementation for the e2ee-chat channel.
//!
//! This module contains the blocking transport, the handshake that
//! establishes a session key, the secure channel built on top of it and the
//! duplex session that drives a chat.

// Framed byte transport
pub mod transport;

// Key establishment
pub mod handshake;

// Encrypted messaging
pub mod channel;

// Concurrent send and receive loops
pub mod duplex;

// Console source and sink
pub mod console;

// Builder
pub mod builder;

// Re-export for convenience
pub use builder::{ChannelBuilder, connect, listen};
pub use channel::{ChannelReceiver, ChannelSender, SecureChannel};
pub use console::{ConsoleSink, ConsoleSource};
pub use duplex::{DuplexSession, EndReason, MessageSink, MessageSource, SessionSummary};
pub use handshake::{Handshake, initiate, respond};
pub use transport::{CloseHandle, Connection, Listener, ReadHalf, WriteHalf};
