use std::io::{self, Read, Write};

use e2ee_chat::{
    core::crypto::MessageCipher,
    core::message::FrameHeader,
    protocol::transport::{read_frame, receive_exact, send_exact, write_frame},
    Error, SymmetricAlgorithm,
};

use proptest::prelude::*;

/// Reader that hands out at most `chunk` bytes per call
struct Fragmenting<'a> {
    data: &'a [u8],
    chunk: usize,
}

impl Read for Fragmenting<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.chunk).min(self.data.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        Ok(n)
    }
}

/// Writer that accepts at most `chunk` bytes per call
struct Trickle {
    data: Vec<u8>,
    chunk: usize,
}

impl Write for Trickle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len().min(self.chunk);
        self.data.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// Strategy for generating frame payloads
fn payloads() -> impl Strategy<Value = Vec<Vec<u8>>> {
    prop::collection::vec(prop::collection::vec(any::<u8>(), 0..2048), 1..8)
}

// Strategy for generating chunk sizes, including the single-byte worst case
fn chunk_sizes() -> impl Strategy<Value = usize> {
    prop_oneof![Just(1usize), 2..64usize, 64..4096usize]
}

fn algorithms() -> impl Strategy<Value = SymmetricAlgorithm> {
    prop_oneof![
        Just(SymmetricAlgorithm::Aes256Gcm),
        Just(SymmetricAlgorithm::ChaCha20Poly1305)
    ]
}

proptest! {
    #[test]
    fn test_frames_survive_fragmentation(
        frames in payloads(),
        write_chunk in chunk_sizes(),
        read_chunk in chunk_sizes(),
    ) {
        let mut wire = Trickle { data: Vec::new(), chunk: write_chunk };
        for frame in &frames {
            write_frame(&mut wire, frame).unwrap();
        }

        let mut reader = Fragmenting { data: &wire.data, chunk: read_chunk };
        for frame in &frames {
            let received = read_frame(&mut reader, 4096).unwrap();
            prop_assert_eq!(&received, frame);
        }
        prop_assert!(matches!(read_frame(&mut reader, 4096), Err(Error::PeerClosed)));
    }

    #[test]
    fn test_exact_io_moves_every_byte(
        data in prop::collection::vec(any::<u8>(), 0..4096),
        chunk in chunk_sizes(),
    ) {
        let mut wire = Trickle { data: Vec::new(), chunk };
        send_exact(&mut wire, &data).unwrap();
        prop_assert_eq!(&wire.data, &data);

        let mut reader = Fragmenting { data: &wire.data, chunk };
        let received = receive_exact(&mut reader, data.len()).unwrap();
        prop_assert_eq!(received, data);
    }

    #[test]
    fn test_truncated_stream_reports_peer_closed(
        data in prop::collection::vec(any::<u8>(), 1..1024),
        cut in any::<prop::sample::Index>(),
    ) {
        let mut wire = Vec::new();
        write_frame(&mut wire, &data).unwrap();
        let cut = cut.index(wire.len() - 1);

        let mut reader = Fragmenting { data: &wire[..cut], chunk: 7 };
        prop_assert!(matches!(read_frame(&mut reader, 4096), Err(Error::PeerClosed)));
    }

    #[test]
    fn test_header_limit_is_enforced(len in 0u32..100_000, max in 1usize..50_000) {
        let header = FrameHeader::for_payload(len as usize).unwrap();
        let parsed = FrameHeader::from_bytes(&header.to_bytes());
        let checked = parsed.checked_len(max);
        if (len as usize) <= max {
            prop_assert_eq!(checked.unwrap(), len as usize);
        } else {
            let is_too_large = matches!(checked, Err(Error::FrameTooLarge { .. }));
            prop_assert!(is_too_large);
        }
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip(
        key in any::<[u8; 32]>(),
        text in ".{0,200}",
        algorithm in algorithms(),
    ) {
        let cipher = MessageCipher::new(&key, algorithm);
        let sealed = cipher.encrypt(text.as_bytes()).unwrap();
        prop_assert_eq!(sealed.len(), text.len() + 28);

        let opened = cipher.decrypt(&sealed).unwrap();
        prop_assert_eq!(opened, text.as_bytes());
    }

    #[test]
    fn test_message_tampering(
        key in any::<[u8; 32]>(),
        data in prop::collection::vec(any::<u8>(), 0..512),
        flip in any::<prop::sample::Index>(),
        bit in 0u8..8,
        algorithm in algorithms(),
    ) {
        let cipher = MessageCipher::new(&key, algorithm);
        let mut sealed = cipher.encrypt(&data).unwrap();
        let at = flip.index(sealed.len());
        sealed[at] ^= 1 << bit;

        prop_assert!(matches!(cipher.decrypt(&sealed), Err(Error::DecryptFailed)));
    }

    #[test]
    fn test_wrong_key_is_rejected(
        key in any::<[u8; 32]>(),
        other in any::<[u8; 32]>(),
        data in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        prop_assume!(key != other);
        let sealed = MessageCipher::new(&key, SymmetricAlgorithm::Aes256Gcm).encrypt(&data).unwrap();
        let result = MessageCipher::new(&other, SymmetricAlgorithm::Aes256Gcm).decrypt(&sealed);
        prop_assert!(matches!(result, Err(Error::DecryptFailed)));
    }
}
