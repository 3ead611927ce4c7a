/*!
Channel builder for the e2ee-chat protocol.

This module provides a builder pattern for opening secure channels
with a specific configuration.
*/

use std::time::Duration;

use crate::core::{
    config::{ChannelConfig, SymmetricAlgorithm},
    error::Result,
    session::KeyPair,
};
use crate::protocol::{
    channel::SecureChannel,
    handshake::Handshake,
    transport::{Connection, Listener},
};

/// Builder for secure channels
#[derive(Default)]
pub struct ChannelBuilder {
    /// Channel configuration
    config: ChannelConfig,

    /// Key pair to use instead of a freshly generated one
    keypair: Option<KeyPair>,
}

impl ChannelBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: ChannelConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a specific symmetric algorithm
    pub fn with_symmetric(mut self, algorithm: SymmetricAlgorithm) -> Self {
        self.config = self.config.with_symmetric(algorithm);
        self
    }

    /// Reject incoming frames larger than `size` bytes
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.config = self.config.with_max_frame_size(size);
        self
    }

    /// Bound the whole handshake exchange
    pub fn with_handshake_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config = self.config.with_handshake_timeout(timeout);
        self
    }

    /// Bound each read and write after the handshake
    pub fn with_io_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config = self.config.with_io_timeout(timeout);
        self
    }

    /// Bound connection establishment
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config = self.config.with_connect_timeout(timeout);
        self
    }

    /// Use the bounded timeout preset
    pub fn bounded(mut self) -> Self {
        self.config = ChannelConfig::bounded()
            .with_symmetric(self.config.symmetric)
            .with_max_frame_size(self.config.max_frame_size);
        self
    }

    /// Use an existing key pair
    pub fn with_keypair(mut self, keypair: KeyPair) -> Self {
        self.keypair = Some(keypair);
        self
    }

    /// Configuration the builder will use
    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Connect to `host:port` and run the handshake as initiator
    pub fn connect(self, host: &str, port: u16) -> Result<SecureChannel> {
        self.config.validate()?;
        let connection = Connection::connect(host, port, self.config.connect_timeout)?;
        self.initiate(connection)
    }

    /// Run the initiator handshake over an existing connection
    pub fn initiate(self, connection: Connection) -> Result<SecureChannel> {
        self.config.validate()?;
        let mut handshake = Handshake::initiator(self.config);
        if let Some(keypair) = self.keypair {
            handshake = handshake.with_keypair(keypair);
        }
        handshake.run(connection)
    }

    /// Accept one peer from `listener` and run the handshake as listener
    pub fn accept(self, listener: &Listener) -> Result<SecureChannel> {
        self.config.validate()?;
        let connection = listener.accept()?;
        self.respond(connection)
    }

    /// Run the listener handshake over an existing connection
    pub fn respond(self, connection: Connection) -> Result<SecureChannel> {
        self.config.validate()?;
        let mut handshake = Handshake::listener(self.config);
        if let Some(keypair) = self.keypair {
            handshake = handshake.with_keypair(keypair);
        }
        handshake.run(connection)
    }
}

// Convenience functions

/// Connect with default settings
pub fn connect(host: &str, port: u16) -> Result<SecureChannel> {
    ChannelBuilder::new().connect(host, port)
}

/// Listen on `port` for one peer with default settings
pub fn listen(port: u16) -> Result<SecureChannel> {
    let listener = Listener::listen(port)?;
    ChannelBuilder::new().accept(&listener)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Error;
    use crate::core::session::Role;
    use std::thread;

    #[test]
    fn test_builder_defaults() {
        let builder = ChannelBuilder::new();
        assert_eq!(builder.config(), &ChannelConfig::default());
    }

    #[test]
    fn test_builder_configuration() {
        let builder = ChannelBuilder::new()
            .with_symmetric(SymmetricAlgorithm::ChaCha20Poly1305)
            .with_max_frame_size(4096)
            .bounded();

        assert_eq!(builder.config().symmetric, SymmetricAlgorithm::ChaCha20Poly1305);
        assert_eq!(builder.config().max_frame_size, 4096);
        assert!(builder.config().handshake_timeout.is_some());
    }

    #[test]
    fn test_invalid_config_is_rejected_before_connecting() {
        let result = ChannelBuilder::new().with_max_frame_size(0).connect("127.0.0.1", 1);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_builder_end_to_end() -> Result<()> {
        let listener = Listener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();

        let client = thread::spawn(move || {
            ChannelBuilder::new()
                .with_symmetric(SymmetricAlgorithm::ChaCha20Poly1305)
                .connect("127.0.0.1", port)
        });
        let mut server = ChannelBuilder::new()
            .with_symmetric(SymmetricAlgorithm::ChaCha20Poly1305)
            .accept(&listener)?;
        let mut client = client.join().expect("client thread panicked")?;

        assert_eq!(client.role(), Role::Initiator);
        assert_eq!(server.role(), Role::Listener);

        client.send_message("ping")?;
        assert_eq!(server.receive_message()?, "ping");
        server.send_message("pong")?;
        assert_eq!(client.receive_message()?, "pong");
        Ok(())
    }
}
