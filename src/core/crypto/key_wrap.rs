/*!
Asymmetric wrapping of the session key.

Kyber768 is a KEM, so "encrypt under the peer's public key" is built as
encapsulate, HKDF-SHA256 over the shared secret, then a ChaCha20-Poly1305
seal of the session key. The wrapping key is single-use, which makes the
all-zero nonce safe. The KEM ciphertext is bound as associated data.

Wire layout: `kem_ciphertext (1088) || sealed_key (32 + 16)`.
*/

use chacha20poly1305::{
    ChaCha20Poly1305, Key, Nonce,
    aead::{Aead, KeyInit, Payload},
};
use hkdf::Hkdf;
use pqcrypto_kyber::kyber768;
use pqcrypto_traits::kem::{Ciphertext as _, SharedSecret as _};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::core::{
    constants::{HKDF_INFO_KEY_WRAP, HKDF_SALT, sizes},
    error::{CryptoError, Error, Result},
};
use crate::crypto_err;

/// Seal `key` so that only the holder of `public_key`'s secret half can open it.
pub fn wrap_key(
    key: &[u8; sizes::SESSION_KEY_BYTES],
    public_key: &kyber768::PublicKey,
) -> Result<Vec<u8>> {
    let (shared_secret, kem_ciphertext) = kyber768::encapsulate(public_key);
    let wrapping_key = derive_wrapping_key(shared_secret.as_bytes())?;

    let cipher = ChaCha20Poly1305::new(Key::from_slice(wrapping_key.as_slice()));
    let sealed = cipher
        .encrypt(
            &Nonce::default(),
            Payload {
                msg: key,
                aad: kem_ciphertext.as_bytes(),
            },
        )
        .map_err(|_e| Error::Crypto(CryptoError::EncryptionFailed))?;

    let mut wrapped = Vec::with_capacity(sizes::WRAPPED_SESSION_KEY_BYTES);
    wrapped.extend_from_slice(kem_ciphertext.as_bytes());
    wrapped.extend_from_slice(&sealed);
    Ok(wrapped)
}

/// Open a key sealed by [`wrap_key`] with the local secret key.
pub fn unwrap_key(
    wrapped: &[u8],
    secret_key: &kyber768::SecretKey,
) -> Result<Zeroizing<[u8; sizes::SESSION_KEY_BYTES]>> {
    if wrapped.len() != sizes::WRAPPED_SESSION_KEY_BYTES {
        return crypto_err!(CryptoError::InvalidCiphertext);
    }

    let (ct_bytes, sealed) = wrapped.split_at(sizes::kyber::CIPHERTEXT_BYTES);
    let kem_ciphertext = kyber768::Ciphertext::from_bytes(ct_bytes)
        .map_err(|_e| Error::Crypto(CryptoError::InvalidCiphertext))?;

    // Kyber decapsulation never fails outright; a wrong key pair yields a
    // different shared secret and the AEAD open below rejects it.
    let shared_secret = kyber768::decapsulate(&kem_ciphertext, secret_key);
    let wrapping_key = derive_wrapping_key(shared_secret.as_bytes())?;

    let cipher = ChaCha20Poly1305::new(Key::from_slice(wrapping_key.as_slice()));
    let opened = Zeroizing::new(
        cipher
            .decrypt(
                &Nonce::default(),
                Payload {
                    msg: sealed,
                    aad: ct_bytes,
                },
            )
            .map_err(|_e| Error::Crypto(CryptoError::UnwrapFailed))?,
    );

    let mut key = Zeroizing::new([0u8; sizes::SESSION_KEY_BYTES]);
    if opened.len() != key.len() {
        return crypto_err!(CryptoError::UnwrapFailed);
    }
    key.copy_from_slice(&opened);
    Ok(key)
}

fn derive_wrapping_key(shared_secret: &[u8]) -> Result<Zeroizing<[u8; sizes::aead::KEY_SIZE]>> {
    let hk = Hkdf::<Sha256>::new(Some(HKDF_SALT), shared_secret);
    let mut okm = Zeroizing::new([0u8; sizes::aead::KEY_SIZE]);
    hk.expand(HKDF_INFO_KEY_WRAP, okm.as_mut_slice())
        .map_err(|_e| Error::Crypto(CryptoError::KeyDerivationFailed))?;
    Ok(okm)
}
