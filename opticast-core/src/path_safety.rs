use anyhow::{bail, Result};
use std::path::{Component, Path, PathBuf};

/// Join a manifest-supplied relative path under `root`, refusing anything
/// that could land a write outside it: absolute paths, parent traversal,
/// and symlinked components.
pub fn safe_join(root: &Path, rel: &Path) -> Result<PathBuf> {
    if rel.is_absolute() {
        bail!("absolute paths are not allowed: {:?}", rel);
    }
    let mut cur = root.to_path_buf();
    for comp in rel.components() {
        match comp {
            Component::Normal(c) => cur.push(c),
            Component::CurDir => continue,
            _ => bail!("path traversal not allowed: {:?}", rel),
        }
        if let Ok(md) = std::fs::symlink_metadata(&cur) {
            if md.file_type().is_symlink() {
                bail!("symlink in path: {:?}", cur);
            }
        }
    }
    Ok(cur)
}
