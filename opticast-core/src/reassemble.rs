//! Accumulating decoded frames and emitting the reconstructed stream.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::ReassembleError;
use crate::header::FrameHeader;

/// Orders, deduplicates, and concatenates per-frame payloads keyed by
/// transport `seq`. Frames may arrive in any order; the output is their
/// concatenation in ascending `seq`.
///
/// State is confined to one instance. Callers decoding on multiple
/// threads must serialize access around `accept`/`finalize`.
#[derive(Debug, Default)]
pub struct Reassembler {
    expected: Option<u64>,
    frames: BTreeMap<u32, Vec<u8>>,
}

impl Reassembler {
    /// `expected` is the session's total frame count from the manifest;
    /// `None` leaves the session open-ended.
    pub fn new(expected: Option<u64>) -> Self {
        Self { expected, frames: BTreeMap::new() }
    }

    /// Store one decoded frame. Duplicate sequence numbers are silently
    /// ignored; returns whether the frame was newly stored.
    pub fn accept(&mut self, header: &FrameHeader, payload: Vec<u8>) -> bool {
        use std::collections::btree_map::Entry;
        match self.frames.entry(header.seq) {
            Entry::Vacant(v) => {
                v.insert(payload);
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Number of distinct frames stored so far.
    pub fn received(&self) -> u64 {
        self.frames.len() as u64
    }

    /// True once every expected frame is stored. Never true for an
    /// open-ended session.
    pub fn complete(&self) -> bool {
        self.expected.is_some_and(|n| self.received() >= n)
    }

    /// Sequence numbers absent below the highest seen.
    pub fn missing(&self) -> Vec<u32> {
        let Some((&hi, _)) = self.frames.last_key_value() else {
            return Vec::new();
        };
        (0..hi).filter(|s| !self.frames.contains_key(s)).collect()
    }

    /// Concatenate stored payloads in ascending `seq` order to `path`.
    /// Gaps abort with [`ReassembleError::MissingFrames`]; callers that
    /// decide to proceed anyway use [`write_partial`](Self::write_partial).
    pub fn finalize(&self, path: &Path) -> Result<(), ReassembleError> {
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(ReassembleError::MissingFrames(missing));
        }
        self.write_partial(path)?;
        Ok(())
    }

    /// Write whatever has been received, skipping over gaps.
    pub fn write_partial(&self, path: &Path) -> std::io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        for payload in self.frames.values() {
            out.write_all(payload)?;
        }
        out.flush()
    }
}
