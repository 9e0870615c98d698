//! Crash-resumable receive state.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize, Default)]
struct ResumeDoc {
    received: Vec<u32>,
}

/// The set of frame sequence numbers already accepted, persisted as JSON
/// (`{"received": [...]}`). A restarted receiver loads it to skip frames
/// replayed by a looping sender.
#[derive(Debug)]
pub struct ResumeState {
    path: PathBuf,
    received: BTreeSet<u32>,
}

impl ResumeState {
    /// Load prior state. A missing or unreadable file starts empty.
    pub fn load(path: &Path) -> Self {
        let received = std::fs::read(path)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<ResumeDoc>(&bytes).ok())
            .map(|doc| doc.received.into_iter().collect())
            .unwrap_or_default();
        Self { path: path.to_path_buf(), received }
    }

    pub fn contains(&self, seq: u32) -> bool {
        self.received.contains(&seq)
    }

    pub fn mark(&mut self, seq: u32) {
        self.received.insert(seq);
    }

    /// Recorded sequence numbers in ascending order.
    pub fn seqs(&self) -> impl Iterator<Item = u32> + '_ {
        self.received.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.received.len()
    }

    pub fn is_empty(&self) -> bool {
        self.received.is_empty()
    }

    /// Persist atomically: write a sibling temp file, rename over.
    pub fn save(&self) -> Result<()> {
        let doc = ResumeDoc { received: self.received.iter().copied().collect() };
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec(&doc)?)
            .with_context(|| format!("write {:?}", tmp))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("rename over {:?}", self.path))?;
        Ok(())
    }
}
