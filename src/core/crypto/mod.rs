/*!
Cryptographic components for the e2ee-chat channel.

This module provides the two primitives the channel relies on: asymmetric
wrapping of the session key and symmetric encryption of chat messages.
*/

// Session key wrapping
pub mod key_wrap;

// Symmetric encryption
pub mod cipher;

// Kyber types
pub use pqcrypto_kyber::kyber768::{
    PublicKey as KyberPublicKey,
    SecretKey as KyberSecretKey,
};

pub use cipher::MessageCipher;
pub use key_wrap::{unwrap_key, wrap_key};
