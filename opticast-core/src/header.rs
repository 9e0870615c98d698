use crate::error::FrameError;

/// Wire magic of grid frames.
pub const MAGIC: u16 = 0xABCD;

/// Packed header size on the wire:
/// magic(2) + seq(4) + chunk_idx(4) + payload_len(4) + crc32(4).
pub const HEADER_LEN: usize = 18;

/// The CRC-32 (IEEE) covers everything before the checksum field.
const CRC_SPAN: usize = 14;

/// Fixed 18-byte big-endian frame header.
///
/// `seq` counts frames on the transport; `chunk_idx` is the logical chunk
/// number. Senders currently emit them equal, but the wire keeps them
/// separate so a multi-file session can tell them apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameHeader {
    pub seq: u32,
    pub chunk_idx: u32,
    pub payload_len: u32,
}

impl FrameHeader {
    pub fn new(seq: u32, chunk_idx: u32, payload_len: u32) -> Self {
        Self { seq, chunk_idx, payload_len }
    }

    /// Serialize with the trailing CRC-32 over the first 14 bytes.
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..2].copy_from_slice(&MAGIC.to_be_bytes());
        buf[2..6].copy_from_slice(&self.seq.to_be_bytes());
        buf[6..10].copy_from_slice(&self.chunk_idx.to_be_bytes());
        buf[10..14].copy_from_slice(&self.payload_len.to_be_bytes());
        let crc = crc32fast::hash(&buf[..CRC_SPAN]);
        buf[14..18].copy_from_slice(&crc.to_be_bytes());
        buf
    }

    /// Parse and validate one header record. Checks length, then magic,
    /// then CRC; a CRC failure rejects the frame without further
    /// interpretation.
    pub fn parse(buf: &[u8]) -> Result<Self, FrameError> {
        if buf.len() < HEADER_LEN {
            return Err(FrameError::ShortHeader { got: buf.len() });
        }
        let magic = u16::from_be_bytes([buf[0], buf[1]]);
        if magic != MAGIC {
            return Err(FrameError::BadMagic { found: magic });
        }
        let stored = u32::from_be_bytes([buf[14], buf[15], buf[16], buf[17]]);
        let computed = crc32fast::hash(&buf[..CRC_SPAN]);
        if stored != computed {
            return Err(FrameError::CrcMismatch { stored, computed });
        }
        Ok(Self {
            seq: u32::from_be_bytes([buf[2], buf[3], buf[4], buf[5]]),
            chunk_idx: u32::from_be_bytes([buf[6], buf[7], buf[8], buf[9]]),
            payload_len: u32::from_be_bytes([buf[10], buf[11], buf[12], buf[13]]),
        })
    }
}
