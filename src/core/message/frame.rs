/*!
Frame format for the e2ee-chat channel.

Every unit on the wire is a frame: a 4-byte big-endian payload length followed
by exactly that many payload bytes. Frames carry no type tag; the handshake
step that reads a frame decides what its payload means.
*/

use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, Bytes, BytesMut};

use crate::core::{
    constants::sizes::FRAME_HEADER_SIZE,
    error::{Error, Result},
};

/// Frame header (4 bytes)
///
/// - Payload Length (4 bytes, big-endian): Length of the payload in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Payload length
    pub payload_len: u32,
}

impl FrameHeader {
    /// Header for a payload of `len` bytes
    pub fn for_payload(len: usize) -> Result<Self> {
        let payload_len = u32::try_from(len).map_err(|_e| Error::FrameTooLarge {
            len,
            max: u32::MAX as usize,
        })?;
        Ok(Self { payload_len })
    }

    /// Convert the header to bytes
    pub fn to_bytes(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut bytes = [0u8; FRAME_HEADER_SIZE];
        BigEndian::write_u32(&mut bytes, self.payload_len);
        bytes
    }

    /// Parse a header from exactly [`FRAME_HEADER_SIZE`] bytes
    pub fn from_bytes(bytes: &[u8; FRAME_HEADER_SIZE]) -> Self {
        Self {
            payload_len: BigEndian::read_u32(bytes),
        }
    }

    /// Payload length, checked against `max`
    pub fn checked_len(&self, max: usize) -> Result<usize> {
        let len = self.payload_len as usize;
        if len > max {
            return Err(Error::FrameTooLarge { len, max });
        }
        Ok(len)
    }
}

/// Encode `payload` as one contiguous frame
pub fn encode_frame(payload: &[u8]) -> Result<Bytes> {
    let header = FrameHeader::for_payload(payload.len())?;
    let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload.len());
    buf.put_slice(&header.to_bytes());
    buf.put_slice(payload);
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_is_big_endian() {
        let header = FrameHeader { payload_len: 0x0102_0304 };
        assert_eq!(header.to_bytes(), [1, 2, 3, 4]);
        assert_eq!(FrameHeader::from_bytes(&[1, 2, 3, 4]), header);
    }

    #[test]
    fn test_encode_frame() -> Result<()> {
        let frame = encode_frame(b"hello")?;
        assert_eq!(&frame[..FRAME_HEADER_SIZE], &[0, 0, 0, 5]);
        assert_eq!(&frame[FRAME_HEADER_SIZE..], b"hello");

        let empty = encode_frame(&[])?;
        assert_eq!(&empty[..], &[0, 0, 0, 0]);
        Ok(())
    }

    #[test]
    fn test_checked_len() {
        let header = FrameHeader { payload_len: 2048 };
        assert_eq!(header.checked_len(4096).ok(), Some(2048));
        assert!(matches!(
            header.checked_len(1024),
            Err(Error::FrameTooLarge { len: 2048, max: 1024 })
        ));
    }
}
