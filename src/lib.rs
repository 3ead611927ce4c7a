/*!
# E2EE Chat

A two-party end-to-end encrypted chat channel over TCP.

## Overview

- Blocking TCP transport with 4-byte length-prefixed frames
- CRYSTALS-Kyber (Kyber768) key pair per endpoint, used to wrap a random
  session key so only the peer can recover it
- AES-256-GCM or ChaCha20-Poly1305 for chat messages, with a fresh random
  nonce per message
- A fixed handshake sequence per role, so neither side can deadlock waiting
  for the other
- A duplex session that sends and receives concurrently and shuts down
  exactly once

```no_run
use e2ee_chat::{ChannelBuilder, Result};

fn main() -> Result<()> {
    let mut channel = ChannelBuilder::new().connect("127.0.0.1", 7878)?;
    channel.send_message("hello")?;
    println!("{}", channel.receive_message()?);
    Ok(())
}
```
*/

// Core protocol components
pub mod core;

// Protocol implementation
pub mod protocol;

// Re-export commonly used types for convenience
pub use core::config::{ChannelConfig, SymmetricAlgorithm};
pub use core::constants::{DEFAULT_MAX_FRAME_SIZE, QUIT_COMMAND, sizes};
pub use core::error::{CryptoError, Error, Result};
pub use core::session::{
    HandshakeStage, HandshakeState, HandshakeStep, KeyMaterial, KeyPair, PeerPublicKey, Role,
    SessionKey,
};

pub use protocol::builder::{ChannelBuilder, connect, listen};
pub use protocol::channel::{ChannelReceiver, ChannelSender, SecureChannel};
pub use protocol::console::{ConsoleSink, ConsoleSource};
pub use protocol::duplex::{DuplexSession, EndReason, MessageSink, MessageSource, SessionSummary};
pub use protocol::handshake::{Handshake, initiate, respond};
pub use protocol::transport::{CloseHandle, Connection, Listener};
