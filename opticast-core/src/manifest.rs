//! Session manifest: the descriptor the bootstrap side-channel carries.
//!
//! The manifest is emitted once per session, before data frames. How it
//! travels (QR codes in the reference setup) is external; this module
//! only builds and parses the JSON.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

use crate::chunking;
use crate::merkle;

pub const MANIFEST_VERSION: u32 = 1;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FileEntry {
    /// Path relative to the walked root (bare file name for single-file
    /// sessions).
    pub path: String,
    pub size: u64,
    pub sha256: String,
    /// First global chunk index assigned to this file.
    pub first_chunk: u64,
    pub chunk_count: u64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EncryptionDesc {
    pub enabled: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct FecDesc {
    pub scheme: String,
    pub data: u32,
    pub parity: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EncodingDesc {
    pub bootstrap: String,
    pub data: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Manifest {
    pub version: u32,
    pub session_id: String,
    pub created_utc: String,
    pub files: Vec<FileEntry>,
    pub chunk_size: usize,
    pub total_chunks: u64,
    /// Binary SHA-256 tree over per-chunk hashes; empty string for an
    /// empty session.
    pub merkle_root: String,
    pub encryption: EncryptionDesc,
    pub fec: FecDesc,
    pub encoding: EncodingDesc,
}

impl Manifest {
    /// Walk `root` (file or directory), hash and chunk every regular
    /// file, and assemble the session descriptor. Chunk index ranges are
    /// contiguous in walk order.
    pub fn build(root: &Path, chunk_size: usize) -> Result<Manifest> {
        Self::build_with_filter(root, chunk_size, |_| true)
    }

    /// Like [`build`](Self::build), keeping only files whose root-relative
    /// path passes `keep`.
    pub fn build_with_filter(
        root: &Path,
        chunk_size: usize,
        keep: impl Fn(&Path) -> bool,
    ) -> Result<Manifest> {
        anyhow::ensure!(chunk_size > 0, "chunk_size must be > 0");
        let files = chunking::collect_files(root)?;
        let mut entries = Vec::with_capacity(files.len());
        let mut leaves: Vec<[u8; 32]> = Vec::new();
        let mut next_chunk = 0u64;
        for path in &files {
            let rel = if root.is_dir() {
                path.strip_prefix(root)
                    .with_context(|| format!("walked path not under root: {:?}", path))?
                    .to_string_lossy()
                    .to_string()
            } else {
                path.file_name().unwrap_or(path.as_os_str()).to_string_lossy().to_string()
            };
            if !keep(Path::new(&rel)) {
                continue;
            }
            let size = std::fs::metadata(path)?.len();
            let sha256 = chunking::sha256_file(path)?;
            for part in chunking::chunks(path, chunk_size)? {
                let (_idx, data) = part?;
                leaves.push(Sha256::digest(&data).into());
            }
            let chunk_count = size.div_ceil(chunk_size as u64);
            entries.push(FileEntry {
                path: rel,
                size,
                sha256,
                first_chunk: next_chunk,
                chunk_count,
            });
            next_chunk += chunk_count;
        }
        log::debug!("manifest: {} files, {} chunks", entries.len(), next_chunk);

        let merkle_root =
            if leaves.is_empty() { String::new() } else { hex::encode(merkle::root(&leaves)) };
        Ok(Manifest {
            version: MANIFEST_VERSION,
            session_id: session_id(),
            created_utc: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            files: entries,
            chunk_size,
            total_chunks: next_chunk,
            merkle_root,
            encryption: EncryptionDesc { enabled: false },
            fec: FecDesc { scheme: "parity".into(), data: 8, parity: 1 },
            encoding: EncodingDesc { bootstrap: "qr".into(), data: "grid".into() },
        })
    }

    /// Parse a manifest delivered by the bootstrap channel. Unknown
    /// fields are tolerated.
    pub fn from_slice(bytes: &[u8]) -> Result<Manifest> {
        serde_json::from_slice(bytes).context("parse manifest JSON")
    }

    pub fn load(path: &Path) -> Result<Manifest> {
        let bytes = std::fs::read(path).with_context(|| format!("read {:?}", path))?;
        Self::from_slice(&bytes)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)
            .with_context(|| format!("write {:?}", path))?;
        Ok(())
    }
}

/// Short unique session tag: a 32-hex truncation of the SHA-256 of a
/// time string. Unique, not cryptographic.
fn session_id() -> String {
    let now = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let digest = Sha256::digest(now.to_string().as_bytes());
    hex::encode(digest)[..32].to_string()
}
