/*!
Handshake for the e2ee-chat channel.

The two roles walk fixed step tables ([`INITIATOR_STEPS`] and
[`LISTENER_STEPS`]) over one blocking stream, so every send on one side
meets a receive on the other and neither side can wait on the other forever.

Initiator: send public key, receive peer public key, send wrapped session key.
Listener: receive peer public key, send public key, receive wrapped session key.

A failure at any step is fatal. `run` consumes the handshake, so key material
from an aborted attempt cannot be reused; the connection is closed before the
error is returned.

[`INITIATOR_STEPS`]: crate::core::session::state::INITIATOR_STEPS
[`LISTENER_STEPS`]: crate::core::session::state::LISTENER_STEPS
*/

use crate::core::{
    config::ChannelConfig,
    constants::MAX_HANDSHAKE_FRAME_SIZE,
    error::{Error, Result},
    session::{
        key_material::format_fingerprint,
        state::StateManager,
        HandshakeStage, HandshakeState, HandshakeStep, KeyMaterial, KeyPair, Role, SessionKey,
    },
};
use crate::invalid_state_err;
use crate::protocol::{channel::SecureChannel, transport::Connection};

fn failed(stage: HandshakeStage) -> impl FnOnce(Error) -> Error {
    move |source| Error::HandshakeFailed {
        stage,
        source: Box::new(source),
    }
}

/// One endpoint's side of the handshake
pub struct Handshake {
    state: StateManager,
    config: ChannelConfig,
    keypair: Option<KeyPair>,
    session_key: Option<SessionKey>,
}

impl Handshake {
    /// Handshake for the endpoint that opened the connection
    pub fn initiator(config: ChannelConfig) -> Self {
        Self::new(Role::Initiator, config)
    }

    /// Handshake for the endpoint that accepted the connection
    pub fn listener(config: ChannelConfig) -> Self {
        Self::new(Role::Listener, config)
    }

    fn new(role: Role, config: ChannelConfig) -> Self {
        Self {
            state: StateManager::new(role),
            config,
            keypair: None,
            session_key: None,
        }
    }

    /// Use this key pair instead of generating one
    pub fn with_keypair(mut self, keypair: KeyPair) -> Self {
        self.keypair = Some(keypair);
        self
    }

    /// Transport this session key instead of generating one. Initiator only.
    pub fn with_session_key(mut self, key: SessionKey) -> Result<Self> {
        if self.role() != Role::Initiator {
            return invalid_state_err!(Role::Initiator, self.role());
        }
        self.session_key = Some(key);
        Ok(self)
    }

    /// Role of this endpoint
    pub fn role(&self) -> Role {
        self.state.role()
    }

    /// Current handshake state
    pub fn state(&self) -> HandshakeState {
        self.state.state()
    }

    /// Drive the handshake to `SecureReady` over `connection`.
    pub fn run(mut self, mut connection: Connection) -> Result<SecureChannel> {
        let role = self.role();
        match self.execute(&mut connection) {
            Ok(session_key) => {
                log::info!(
                    "{} handshake complete with {}; session fingerprint {}",
                    role,
                    connection
                        .peer_addr()
                        .map(|a| a.to_string())
                        .unwrap_or_else(|| "unknown peer".to_string()),
                    format_fingerprint(&session_key.fingerprint())
                );
                Ok(SecureChannel::new(connection, session_key, &self.config, role))
            }
            Err(e) => {
                log::warn!("{} handshake aborted in state {}: {}", role, self.state(), e);
                connection.close();
                Err(e)
            }
        }
    }

    fn execute(&mut self, connection: &mut Connection) -> Result<SessionKey> {
        connection
            .set_timeout(self.config.handshake_timeout)
            .map_err(failed(HandshakeStage::Configure))?;

        let keypair = self.keypair.take().unwrap_or_else(KeyPair::generate);
        let mut keys = KeyMaterial::new(keypair);
        self.state.advance(HandshakeState::KeysExchanging)?;

        let mut sent_public_key = false;
        for step in self.role().steps() {
            match step {
                HandshakeStep::SendPublicKey => {
                    connection
                        .send_frame(&keys.public_key_bytes())
                        .map_err(failed(step.stage()))?;
                    sent_public_key = true;
                    if keys.peer_public_key().is_some() {
                        self.state.advance(HandshakeState::KeysExchanged)?;
                    }
                }
                HandshakeStep::ReceivePublicKey => {
                    let bytes = connection
                        .receive_frame(MAX_HANDSHAKE_FRAME_SIZE)
                        .map_err(failed(step.stage()))?;
                    keys.set_peer_public_key(&bytes)
                        .map_err(failed(HandshakeStage::DecodePublicKey))?;
                    if sent_public_key {
                        self.state.advance(HandshakeState::KeysExchanged)?;
                    }
                }
                HandshakeStep::SendSessionKey => {
                    self.state.advance(HandshakeState::SessionKeyTransport)?;
                    let key = self.session_key.take().unwrap_or_else(SessionKey::generate);
                    keys.set_session_key(key)
                        .map_err(failed(HandshakeStage::WrapSessionKey))?;
                    let wrapped = keys
                        .wrap_session_key()
                        .map_err(failed(HandshakeStage::WrapSessionKey))?;
                    connection
                        .send_frame(&wrapped)
                        .map_err(failed(step.stage()))?;
                }
                HandshakeStep::ReceiveSessionKey => {
                    self.state.advance(HandshakeState::SessionKeyTransport)?;
                    let wrapped = connection
                        .receive_frame(MAX_HANDSHAKE_FRAME_SIZE)
                        .map_err(failed(step.stage()))?;
                    keys.unwrap_session_key(&wrapped)
                        .map_err(failed(HandshakeStage::UnwrapSessionKey))?;
                }
            }
        }

        connection
            .set_timeout(self.config.io_timeout)
            .map_err(failed(HandshakeStage::Configure))?;

        let session_key = match keys.into_session_key() {
            Some(key) => key,
            None => return invalid_state_err!("session key established", "no session key"),
        };
        self.state.advance(HandshakeState::SecureReady)?;
        Ok(session_key)
    }
}

/// Run the initiator handshake with a fresh key pair and session key
pub fn initiate(connection: Connection, config: ChannelConfig) -> Result<SecureChannel> {
    Handshake::initiator(config).run(connection)
}

/// Run the listener handshake with a fresh key pair
pub fn respond(connection: Connection, config: ChannelConfig) -> Result<SecureChannel> {
    Handshake::listener(config).run(connection)
}
