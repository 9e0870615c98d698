use thiserror::Error;

/// Per-frame codec failures.
///
/// Everything except [`FrameError::PayloadTooLarge`] is recoverable at the
/// session level: the frame is discarded and the receiver waits for the
/// next capture (or a sender loop-around).
#[derive(Debug, Error)]
pub enum FrameError {
    /// Fewer than 18 bytes recovered from the header region.
    #[error("header too short: got {got} bytes, need 18")]
    ShortHeader { got: usize },

    /// First two header bytes are not 0xABCD.
    #[error("bad magic: expected 0xABCD, got {found:#06X}")]
    BadMagic { found: u16 },

    /// Stored header CRC-32 disagrees with the recomputed one.
    #[error("header CRC mismatch: stored {stored:#010X}, computed {computed:#010X}")]
    CrcMismatch { stored: u32, computed: u32 },

    /// Payload region decoded to fewer bytes than the header declares.
    #[error("payload truncated: header declares {declared} bytes, decoded {got}")]
    FrameTruncated { declared: usize, got: usize },

    /// Caller supplied a slab exceeding frame capacity.
    #[error("payload of {len} bytes exceeds frame capacity of {capacity}")]
    PayloadTooLarge { len: usize, capacity: usize },
}

/// Failures while emitting the reconstructed stream.
#[derive(Debug, Error)]
pub enum ReassembleError {
    /// Gaps exist in the stored sequence set. The caller decides whether
    /// to write a gapped stream anyway.
    #[error("missing frames: {0:?}")]
    MissingFrames(Vec<u32>),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
