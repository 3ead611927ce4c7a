/*!
Handshake state management for the e2ee-chat channel.

This module defines the handshake states, the two endpoint roles and the
fixed step order each role follows over the shared stream.
*/

use std::fmt;

use crate::core::error::Result;
use crate::invalid_state_err;

/// Handshake state for tracking connection progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HandshakeState {
    /// Nothing exchanged yet
    Idle,
    /// Local key pair generated, public keys in flight
    KeysExchanging,
    /// Both public keys known to this endpoint
    KeysExchanged,
    /// Wrapped session key in flight
    SessionKeyTransport,
    /// Session key established, channel ready for messages
    SecureReady,
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandshakeState::Idle => write!(f, "Idle"),
            HandshakeState::KeysExchanging => write!(f, "KeysExchanging"),
            HandshakeState::KeysExchanged => write!(f, "KeysExchanged"),
            HandshakeState::SessionKeyTransport => write!(f, "SessionKeyTransport"),
            HandshakeState::SecureReady => write!(f, "SecureReady"),
        }
    }
}

impl HandshakeState {
    /// The only state reachable from this one, if any
    pub fn next(self) -> Option<HandshakeState> {
        match self {
            HandshakeState::Idle => Some(HandshakeState::KeysExchanging),
            HandshakeState::KeysExchanging => Some(HandshakeState::KeysExchanged),
            HandshakeState::KeysExchanged => Some(HandshakeState::SessionKeyTransport),
            HandshakeState::SessionKeyTransport => Some(HandshakeState::SecureReady),
            HandshakeState::SecureReady => None,
        }
    }
}

/// Endpoint role in the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Opens the connection and generates the session key
    Initiator,
    /// Accepts the connection and receives the session key
    Listener,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Initiator => write!(f, "Initiator"),
            Role::Listener => write!(f, "Listener"),
        }
    }
}

/// One wire step of the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStep {
    SendPublicKey,
    ReceivePublicKey,
    SendSessionKey,
    ReceiveSessionKey,
}

impl HandshakeStep {
    /// The step the peer must be executing at the same position.
    pub fn counterpart(self) -> HandshakeStep {
        match self {
            HandshakeStep::SendPublicKey => HandshakeStep::ReceivePublicKey,
            HandshakeStep::ReceivePublicKey => HandshakeStep::SendPublicKey,
            HandshakeStep::SendSessionKey => HandshakeStep::ReceiveSessionKey,
            HandshakeStep::ReceiveSessionKey => HandshakeStep::SendSessionKey,
        }
    }

    /// Stage reported when the I/O of this step fails
    pub fn stage(self) -> HandshakeStage {
        match self {
            HandshakeStep::SendPublicKey => HandshakeStage::SendPublicKey,
            HandshakeStep::ReceivePublicKey => HandshakeStage::ReceivePublicKey,
            HandshakeStep::SendSessionKey => HandshakeStage::SendSessionKey,
            HandshakeStep::ReceiveSessionKey => HandshakeStage::ReceiveSessionKey,
        }
    }
}

/// Wire order for the initiator. The initiator speaks first.
pub const INITIATOR_STEPS: [HandshakeStep; 3] = [
    HandshakeStep::SendPublicKey,
    HandshakeStep::ReceivePublicKey,
    HandshakeStep::SendSessionKey,
];

/// Wire order for the listener, the mirror image of [`INITIATOR_STEPS`].
pub const LISTENER_STEPS: [HandshakeStep; 3] = [
    HandshakeStep::ReceivePublicKey,
    HandshakeStep::SendPublicKey,
    HandshakeStep::ReceiveSessionKey,
];

impl Role {
    /// The fixed wire steps for this role
    pub fn steps(self) -> &'static [HandshakeStep] {
        match self {
            Role::Initiator => &INITIATOR_STEPS,
            Role::Listener => &LISTENER_STEPS,
        }
    }

    /// The role on the other end of the connection
    pub fn peer(self) -> Role {
        match self {
            Role::Initiator => Role::Listener,
            Role::Listener => Role::Initiator,
        }
    }
}

/// Handshake step that failed, carried by `Error::HandshakeFailed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStage {
    SendPublicKey,
    ReceivePublicKey,
    DecodePublicKey,
    WrapSessionKey,
    SendSessionKey,
    ReceiveSessionKey,
    UnwrapSessionKey,
    Configure,
}

impl fmt::Display for HandshakeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            HandshakeStage::SendPublicKey => "sending the local public key",
            HandshakeStage::ReceivePublicKey => "receiving the peer public key",
            HandshakeStage::DecodePublicKey => "decoding the peer public key",
            HandshakeStage::WrapSessionKey => "wrapping the session key",
            HandshakeStage::SendSessionKey => "sending the wrapped session key",
            HandshakeStage::ReceiveSessionKey => "receiving the wrapped session key",
            HandshakeStage::UnwrapSessionKey => "unwrapping the session key",
            HandshakeStage::Configure => "configuring the connection",
        };
        f.write_str(what)
    }
}

/// Handshake state manager
///
/// Only forward, single-step transitions are accepted; there is no way back
/// to an earlier state and no retry.
#[derive(Debug, Clone, Copy)]
pub struct StateManager {
    state: HandshakeState,
    role: Role,
}

impl StateManager {
    /// Create a new state manager
    pub fn new(role: Role) -> Self {
        Self {
            state: HandshakeState::Idle,
            role,
        }
    }

    /// Get the current state
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Get the role
    pub fn role(&self) -> Role {
        self.role
    }

    /// Check if messages may flow
    pub fn is_ready(&self) -> bool {
        self.state == HandshakeState::SecureReady
    }

    /// Move to `target`, which must be the direct successor of the current state
    pub fn advance(&mut self, target: HandshakeState) -> Result<()> {
        if self.state.next() != Some(target) {
            let expected = self
                .state
                .next()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "no further state".to_string());
            return invalid_state_err!(expected, target);
        }
        log::debug!("{} handshake: {} -> {}", self.role, self.state, target);
        self.state = target;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_transitions() -> Result<()> {
        let mut manager = StateManager::new(Role::Initiator);
        assert_eq!(manager.state(), HandshakeState::Idle);

        manager.advance(HandshakeState::KeysExchanging)?;
        manager.advance(HandshakeState::KeysExchanged)?;
        manager.advance(HandshakeState::SessionKeyTransport)?;
        assert!(!manager.is_ready());
        manager.advance(HandshakeState::SecureReady)?;
        assert!(manager.is_ready());
        Ok(())
    }

    #[test]
    fn test_invalid_transitions() {
        let mut manager = StateManager::new(Role::Listener);

        // Skipping ahead is rejected and leaves the state untouched
        assert!(manager.advance(HandshakeState::SecureReady).is_err());
        assert_eq!(manager.state(), HandshakeState::Idle);

        // Re-entering the current state is rejected
        assert!(manager.advance(HandshakeState::Idle).is_err());

        // Nothing follows SecureReady
        assert_eq!(HandshakeState::SecureReady.next(), None);
    }

    #[test]
    fn test_step_tables_are_complementary() {
        let initiator = Role::Initiator.steps();
        let listener = Role::Listener.steps();
        assert_eq!(initiator.len(), listener.len());

        for (mine, theirs) in initiator.iter().zip(listener) {
            assert_eq!(mine.counterpart(), *theirs);
        }
    }

    #[test]
    fn test_initiator_speaks_first() {
        assert_eq!(Role::Initiator.steps()[0], HandshakeStep::SendPublicKey);
        assert_eq!(Role::Listener.steps()[0], HandshakeStep::ReceivePublicKey);
        assert_eq!(Role::Initiator.peer(), Role::Listener);
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(
            HandshakeStage::UnwrapSessionKey.to_string(),
            "unwrapping the session key"
        );
        assert_eq!(HandshakeStep::SendSessionKey.stage(), HandshakeStage::SendSessionKey);
    }
}
