//! Streaming a source tree as fixed-size payload slabs.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

/// Iterator over `(index, bytes)` slabs of one file. Every slab is
/// exactly `chunk_size` bytes except possibly the last; indices start at
/// 0 and increment without gaps.
pub struct ChunkIter {
    reader: BufReader<File>,
    chunk_size: usize,
    next_idx: u32,
    done: bool,
}

/// Open `path` for slab iteration.
pub fn chunks(path: &Path, chunk_size: usize) -> Result<ChunkIter> {
    anyhow::ensure!(chunk_size > 0, "chunk_size must be > 0");
    let f = File::open(path).with_context(|| format!("open {:?}", path))?;
    Ok(ChunkIter { reader: BufReader::new(f), chunk_size, next_idx: 0, done: false })
}

impl Iterator for ChunkIter {
    type Item = std::io::Result<(u32, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let mut buf = vec![0u8; self.chunk_size];
        let mut filled = 0usize;
        while filled < self.chunk_size {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        if filled == 0 {
            self.done = true;
            return None;
        }
        buf.truncate(filled);
        let idx = self.next_idx;
        self.next_idx += 1;
        Some(Ok((idx, buf)))
    }
}

/// Enumerate regular files under `root` (or `root` itself when it is a
/// file), sorted lexicographically — the order chunk ranges are assigned.
pub fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    let md = std::fs::metadata(root).with_context(|| format!("stat {:?}", root))?;
    if md.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    let mut files = Vec::new();
    for ent in walkdir::WalkDir::new(root).min_depth(1) {
        let ent = ent?;
        if ent.file_type().is_file() {
            files.push(ent.path().to_path_buf());
        }
    }
    // Order on the path string, not Path's component-wise Ord: a `/`
    // competes with ordinary characters byte-wise, so `a-b/x` sorts
    // before `a/y`. Chunk ranges and frame seq follow this order.
    files.sort_by(|a, b| a.to_string_lossy().cmp(&b.to_string_lossy()));
    Ok(files)
}

/// Streamed SHA-256 of a whole file, hex-encoded.
pub fn sha256_file(path: &Path) -> Result<String> {
    let f = File::open(path).with_context(|| format!("open {:?}", path))?;
    let mut reader = BufReader::new(f);
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 1 << 20];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
