/*!
Secure channel over an established connection.

Every chat message is UTF-8 text sealed with the session key and carried in
one frame. A frame that fails authentication is reported as
[`Error::DecryptFailed`] and the stream stays aligned, so the caller may keep
receiving.
*/

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::core::{
    config::ChannelConfig,
    crypto::MessageCipher,
    error::{Error, Result},
    session::{key_material::format_fingerprint, Role, SessionKey},
};
use crate::protocol::transport::{CloseHandle, Connection, ReadHalf, WriteHalf};

fn seal(cipher: &MessageCipher, text: &str) -> Result<Vec<u8>> {
    cipher.encrypt(text.as_bytes())
}

fn open(cipher: &MessageCipher, payload: &[u8]) -> Result<String> {
    let plaintext = cipher.decrypt(payload)?;
    // Authentic bytes that are not text are still unusable to the caller
    String::from_utf8(plaintext).map_err(|_| Error::DecryptFailed)
}

/// Connection plus the session key agreed by the handshake
pub struct SecureChannel {
    connection: Connection,
    cipher: Arc<MessageCipher>,
    fingerprint: [u8; 32],
    role: Role,
    max_frame_size: usize,
}

impl SecureChannel {
    pub(crate) fn new(
        connection: Connection,
        session_key: SessionKey,
        config: &ChannelConfig,
        role: Role,
    ) -> Self {
        Self {
            cipher: Arc::new(session_key.cipher(config.symmetric)),
            fingerprint: session_key.fingerprint(),
            connection,
            role,
            max_frame_size: config.max_frame_size,
        }
    }

    /// Encrypt `text` and send it as one frame
    pub fn send_message(&mut self, text: &str) -> Result<()> {
        let sealed = seal(&self.cipher, text)?;
        self.connection.send_frame(&sealed)
    }

    /// Receive one frame and decrypt it.
    ///
    /// `DecryptFailed` leaves the channel usable; `PeerClosed` and transport
    /// errors are terminal.
    pub fn receive_message(&mut self) -> Result<String> {
        let payload = self.connection.receive_frame(self.max_frame_size)?;
        open(&self.cipher, &payload)
    }

    /// Role this endpoint played in the handshake
    pub fn role(&self) -> Role {
        self.role
    }

    /// SHA-256 of the session key; equal on both endpoints
    pub fn fingerprint(&self) -> [u8; 32] {
        self.fingerprint
    }

    /// Human-readable form of [`SecureChannel::fingerprint`]
    pub fn fingerprint_hex(&self) -> String {
        format_fingerprint(&self.fingerprint)
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.connection.peer_addr()
    }

    /// Cipher bound to the session key
    pub fn cipher(&self) -> &MessageCipher {
        &self.cipher
    }

    /// Raw connection underneath the channel
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.connection
    }

    /// Stop sending; the peer sees `PeerClosed` after draining
    pub fn shutdown_write(&self) -> Result<()> {
        self.connection.shutdown_write()
    }

    /// Close the connection; returns `true` only for the call that closed it
    pub fn close(&self) -> bool {
        self.connection.close()
    }

    pub fn is_closed(&self) -> bool {
        self.connection.is_closed()
    }

    pub fn close_handle(&self) -> CloseHandle {
        self.connection.close_handle()
    }

    /// Split into a sender and a receiver that may live on different threads.
    pub fn split(self) -> Result<(ChannelSender, ChannelReceiver)> {
        let (read, write) = self.connection.split()?;
        let sender = ChannelSender {
            half: write,
            cipher: Arc::clone(&self.cipher),
        };
        let receiver = ChannelReceiver {
            half: read,
            cipher: self.cipher,
            max_frame_size: self.max_frame_size,
        };
        Ok((sender, receiver))
    }
}

impl fmt::Debug for SecureChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureChannel")
            .field("role", &self.role)
            .field("connection", &self.connection)
            .field("algorithm", &self.cipher.algorithm())
            .field("fingerprint", &self.fingerprint_hex())
            .finish()
    }
}

/// Sending direction of a split [`SecureChannel`]
pub struct ChannelSender {
    half: WriteHalf,
    cipher: Arc<MessageCipher>,
}

impl ChannelSender {
    pub fn send_message(&mut self, text: &str) -> Result<()> {
        let sealed = seal(&self.cipher, text)?;
        self.half.send_frame(&sealed)
    }

    pub fn shutdown_write(&self) -> Result<()> {
        self.half.shutdown_write()
    }

    pub fn close_handle(&self) -> &CloseHandle {
        self.half.close_handle()
    }
}

/// Receiving direction of a split [`SecureChannel`]
pub struct ChannelReceiver {
    half: ReadHalf,
    cipher: Arc<MessageCipher>,
    max_frame_size: usize,
}

impl ChannelReceiver {
    pub fn receive_message(&mut self) -> Result<String> {
        let payload = self.half.receive_frame(self.max_frame_size)?;
        open(&self.cipher, &payload)
    }

    pub fn close_handle(&self) -> &CloseHandle {
        self.half.close_handle()
    }
}
