use anyhow::Result;
use std::path::Path;

use crate::chunking;
use crate::manifest::Manifest;
use crate::path_safety::safe_join;

#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub files_ok: u64,
    pub files_bad: u64,
}

/// Recompute each reconstructed file's SHA-256 under `root` against its
/// manifest entry.
pub fn verify_files(mf: &Manifest, root: &Path) -> Result<VerifyReport> {
    let mut files_ok = 0u64;
    let mut files_bad = 0u64;
    for fe in &mf.files {
        let path = safe_join(root, Path::new(&fe.path))?;
        let sha256 = chunking::sha256_file(&path)?;
        if sha256 == fe.sha256 {
            files_ok += 1;
        } else {
            log::warn!("sha256 mismatch for {}", fe.path);
            files_bad += 1;
        }
    }
    Ok(VerifyReport { files_ok, files_bad })
}
