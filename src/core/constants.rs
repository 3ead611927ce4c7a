/*!
Constants for the e2ee-chat channel.

This module contains the wire-level sizes and the key derivation labels
shared by both endpoints.
*/

/// Default upper bound for a single frame payload (1 MiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1_048_576;

/// Upper bound for handshake frames; public keys and wrapped keys are far smaller
pub const MAX_HANDSHAKE_FRAME_SIZE: usize = 4096;

/// Size constants for the protocol
pub mod sizes {
    /// Size of the big-endian length header in front of every frame
    pub const FRAME_HEADER_SIZE: usize = 4;

    /// CRYSTALS-Kyber (Kyber768) constants
    pub mod kyber {
        /// Size of Kyber public key in bytes
        pub const PUBLIC_KEY_BYTES: usize = 1184;

        /// Size of Kyber secret key in bytes
        pub const SECRET_KEY_BYTES: usize = 2400;

        /// Size of Kyber ciphertext in bytes
        pub const CIPHERTEXT_BYTES: usize = 1088;

        /// Size of Kyber shared secret in bytes
        pub const SHARED_SECRET_BYTES: usize = 32;
    }

    /// AEAD constants, identical for AES-256-GCM and ChaCha20-Poly1305
    pub mod aead {
        /// Size of the authentication tag in bytes
        pub const TAG_SIZE: usize = 16;

        /// Size of the nonce in bytes
        pub const NONCE_SIZE: usize = 12;

        /// Size of the key in bytes
        pub const KEY_SIZE: usize = 32;
    }

    /// Size of a session key in bytes
    pub const SESSION_KEY_BYTES: usize = aead::KEY_SIZE;

    /// Size of a wrapped session key: KEM ciphertext followed by the sealed key
    pub const WRAPPED_SESSION_KEY_BYTES: usize =
        kyber::CIPHERTEXT_BYTES + SESSION_KEY_BYTES + aead::TAG_SIZE;

    /// Smallest valid message ciphertext (nonce and tag around an empty plaintext)
    pub const MIN_MESSAGE_CIPHERTEXT_BYTES: usize = aead::NONCE_SIZE + aead::TAG_SIZE;
}

/// Salt for HKDF derivation of the key-wrapping key
pub const HKDF_SALT: &[u8] = b"E2EE-Chat-v1-Key-Wrap";

/// Info string for HKDF derivation of the key-wrapping key
pub const HKDF_INFO_KEY_WRAP: &[u8] = b"ChaCha20Poly1305-SessionKey";

/// Line typed at the console to end a session
pub const QUIT_COMMAND: &str = "/quit";
