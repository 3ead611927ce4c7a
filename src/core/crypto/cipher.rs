/*!
Message encryption and decryption for the e2ee-chat channel.

Both directions of a session share one key, so nonces cannot be derived from
per-direction counters. Every message carries its own random nonce instead:
`nonce (12 bytes) || ciphertext || tag (16 bytes)`.
*/

use aes_gcm::Aes256Gcm;
use chacha20poly1305::{
    ChaCha20Poly1305, Nonce,
    aead::{Aead, KeyInit, generic_array::GenericArray},
};
use rand::RngCore;

use crate::core::{
    config::SymmetricAlgorithm,
    constants::sizes,
    error::{CryptoError, Error, Result},
};

enum Engine {
    Aes(Aes256Gcm),
    ChaCha(ChaCha20Poly1305),
}

/// Cipher handles symmetric encryption and decryption of chat messages
pub struct MessageCipher {
    engine: Engine,
    algorithm: SymmetricAlgorithm,
}

impl MessageCipher {
    /// Create a new cipher for the given session key
    pub fn new(key: &[u8; sizes::aead::KEY_SIZE], algorithm: SymmetricAlgorithm) -> Self {
        let key = GenericArray::from_slice(key);
        let engine = match algorithm {
            SymmetricAlgorithm::Aes256Gcm => Engine::Aes(Aes256Gcm::new(key)),
            SymmetricAlgorithm::ChaCha20Poly1305 => Engine::ChaCha(ChaCha20Poly1305::new(key)),
        };
        Self { engine, algorithm }
    }

    /// The algorithm this cipher was built with
    pub fn algorithm(&self) -> SymmetricAlgorithm {
        self.algorithm
    }

    /// Encrypt a message under a fresh random nonce
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; sizes::aead::NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce);

        let sealed = self
            .seal(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_e| Error::Crypto(CryptoError::EncryptionFailed))?;

        let mut out = Vec::with_capacity(nonce.len() + sealed.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&sealed);
        Ok(out)
    }

    /// Decrypt a message produced by [`MessageCipher::encrypt`].
    ///
    /// Any failure, including a ciphertext too short to hold nonce and tag,
    /// is reported as `Error::DecryptFailed`.
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        if data.len() < sizes::MIN_MESSAGE_CIPHERTEXT_BYTES {
            return Err(Error::DecryptFailed);
        }

        let (nonce, sealed) = data.split_at(sizes::aead::NONCE_SIZE);
        self.open(Nonce::from_slice(nonce), sealed)
            .map_err(|_e| Error::DecryptFailed)
    }

    fn seal(&self, nonce: &Nonce, data: &[u8]) -> std::result::Result<Vec<u8>, aes_gcm::Error> {
        match &self.engine {
            Engine::Aes(cipher) => cipher.encrypt(nonce, data),
            Engine::ChaCha(cipher) => cipher.encrypt(nonce, data),
        }
    }

    fn open(&self, nonce: &Nonce, data: &[u8]) -> std::result::Result<Vec<u8>, aes_gcm::Error> {
        match &self.engine {
            Engine::Aes(cipher) => cipher.decrypt(nonce, data),
            Engine::ChaCha(cipher) => cipher.decrypt(nonce, data),
        }
    }
}

impl std::fmt::Debug for MessageCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageCipher")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}
