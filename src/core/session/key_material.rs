/*!
Key material for one endpoint of the e2ee-chat channel.

Holds this endpoint's Kyber key pair, the peer's public key once received,
and the session key once generated or unwrapped. The peer key and the
session key can each be set exactly once.
*/

use std::fmt;

use pqcrypto_kyber::kyber768;
use pqcrypto_traits::kem::PublicKey as _;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::core::{
    config::SymmetricAlgorithm,
    constants::sizes,
    crypto::{KyberPublicKey, KyberSecretKey, MessageCipher, unwrap_key, wrap_key},
    error::{CryptoError, Error, Result},
};
use crate::invalid_state_err;

/// Asymmetric key pair, generated fresh for every session
pub struct KeyPair {
    public: KyberPublicKey,
    secret: KyberSecretKey,
}

impl KeyPair {
    /// Generate a new Kyber768 key pair
    pub fn generate() -> Self {
        let (public, secret) = kyber768::keypair();
        Self { public, secret }
    }

    /// Canonical wire encoding of the public half
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.public.as_bytes().to_vec()
    }

    pub(crate) fn secret_key(&self) -> &KyberSecretKey {
        &self.secret
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair").finish_non_exhaustive()
    }
}

/// The remote endpoint's public key
#[derive(Clone, Copy)]
pub struct PeerPublicKey(KyberPublicKey);

impl PeerPublicKey {
    /// Decode a public key received from the wire
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != sizes::kyber::PUBLIC_KEY_BYTES {
            return Err(Error::Crypto(CryptoError::InvalidKeyFormat));
        }
        kyber768::PublicKey::from_bytes(bytes)
            .map(Self)
            .map_err(|_e| Error::Crypto(CryptoError::InvalidKeyFormat))
    }

    /// Wire encoding of this key
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub(crate) fn inner(&self) -> &KyberPublicKey {
        &self.0
    }
}

impl fmt::Debug for PeerPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerPublicKey({} bytes)", self.as_bytes().len())
    }
}

/// Symmetric session key, zeroed on drop
pub struct SessionKey(Zeroizing<[u8; sizes::SESSION_KEY_BYTES]>);

impl SessionKey {
    /// Generate a fresh random session key
    pub fn generate() -> Self {
        let mut key = Zeroizing::new([0u8; sizes::SESSION_KEY_BYTES]);
        rand::rng().fill_bytes(key.as_mut_slice());
        Self(key)
    }

    /// Use caller-supplied key bytes
    pub fn from_bytes(bytes: [u8; sizes::SESSION_KEY_BYTES]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    /// Wrap this key so only the holder of `peer`'s secret key can recover it
    pub fn encrypt_for(&self, peer: &PeerPublicKey) -> Result<Vec<u8>> {
        wrap_key(&self.0, peer.inner())
    }

    /// Recover a key wrapped for `keypair`
    pub fn decrypt_with(wrapped: &[u8], keypair: &KeyPair) -> Result<Self> {
        unwrap_key(wrapped, keypair.secret_key()).map(Self)
    }

    /// SHA-256 of the key bytes, safe to display for out-of-band comparison
    pub fn fingerprint(&self) -> [u8; 32] {
        Sha256::digest(self.0.as_slice()).into()
    }

    /// Build the message cipher for this key
    pub fn cipher(&self, algorithm: SymmetricAlgorithm) -> MessageCipher {
        MessageCipher::new(&self.0, algorithm)
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKey(..)")
    }
}

/// Render a fingerprint as lowercase hex in groups of four bytes
pub fn format_fingerprint(fingerprint: &[u8]) -> String {
    fingerprint
        .chunks(4)
        .map(|chunk| chunk.iter().map(|b| format!("{:02x}", b)).collect::<String>())
        .collect::<Vec<_>>()
        .join(":")
}

/// All key material held by one endpoint
#[derive(Debug)]
pub struct KeyMaterial {
    keypair: KeyPair,
    peer_public_key: Option<PeerPublicKey>,
    session_key: Option<SessionKey>,
}

impl KeyMaterial {
    /// Key material around an existing key pair
    pub fn new(keypair: KeyPair) -> Self {
        Self {
            keypair,
            peer_public_key: None,
            session_key: None,
        }
    }

    /// Key material with a freshly generated key pair
    pub fn generate() -> Self {
        Self::new(KeyPair::generate())
    }

    /// This endpoint's key pair
    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    /// Serialized public key to send to the peer
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.keypair.public_key_bytes()
    }

    /// Decode and store the peer's public key. Rejects a second call.
    pub fn set_peer_public_key(&mut self, bytes: &[u8]) -> Result<()> {
        if self.peer_public_key.is_some() {
            return invalid_state_err!("no peer public key", "peer public key already set");
        }
        self.peer_public_key = Some(PeerPublicKey::from_bytes(bytes)?);
        Ok(())
    }

    /// The peer's public key, if received
    pub fn peer_public_key(&self) -> Option<&PeerPublicKey> {
        self.peer_public_key.as_ref()
    }

    /// Install the session key. Rejects a second call.
    pub fn set_session_key(&mut self, key: SessionKey) -> Result<()> {
        if self.session_key.is_some() {
            return invalid_state_err!("no session key", "session key already set");
        }
        self.session_key = Some(key);
        Ok(())
    }

    /// The session key, if established
    pub fn session_key(&self) -> Option<&SessionKey> {
        self.session_key.as_ref()
    }

    /// Wrap the installed session key for the peer
    pub fn wrap_session_key(&self) -> Result<Vec<u8>> {
        let peer = match &self.peer_public_key {
            Some(peer) => peer,
            None => return invalid_state_err!("peer public key set", "no peer public key"),
        };
        let key = match &self.session_key {
            Some(key) => key,
            None => return invalid_state_err!("session key set", "no session key"),
        };
        key.encrypt_for(peer)
    }

    /// Unwrap a session key sent by the peer and install it
    pub fn unwrap_session_key(&mut self, wrapped: &[u8]) -> Result<()> {
        let key = SessionKey::decrypt_with(wrapped, &self.keypair)?;
        self.set_session_key(key)
    }

    /// Give up the key pair and keep only the session key
    pub fn into_session_key(self) -> Option<SessionKey> {
        self.session_key
    }
}
