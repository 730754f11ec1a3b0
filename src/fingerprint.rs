//! Change indicator for packaged function code.
//!
//! The hash covers file name, size and modification time of every file under
//! the given paths, not file contents, so it is cheap to compute on every
//! deployment. Feeding it to the custom resource as `updateIndicator` makes
//! CloudFormation re-run the initializer only when the package changed.

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub size: u64,
    /// Nanoseconds since the Unix epoch.
    pub modified_ns: u128,
}

impl FileEntry {
    fn fingerprint_line(&self) -> String {
        format!("{}:{}:{}", self.path.display(), self.size, self.modified_ns)
    }
}

/// Walk `paths` depth-first and list every regular file.
///
/// Top-level paths keep their given order; directory children are visited in
/// file-name order so the result does not depend on `read_dir` ordering.
pub fn collect_entries<P: AsRef<Path>>(paths: &[P]) -> io::Result<Vec<FileEntry>> {
    let mut pending: Vec<PathBuf> = paths
        .iter()
        .rev()
        .map(|p| p.as_ref().to_path_buf())
        .collect();
    let mut entries = Vec::new();

    while let Some(path) = pending.pop() {
        let meta = fs::metadata(&path)?;
        if meta.is_dir() {
            let mut children = fs::read_dir(&path)?
                .map(|entry| entry.map(|e| e.path()))
                .collect::<io::Result<Vec<_>>>()?;
            children.sort();
            pending.extend(children.into_iter().rev());
        } else {
            let modified_ns = meta
                .modified()?
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos();
            entries.push(FileEntry {
                path,
                size: meta.len(),
                modified_ns,
            });
        }
    }
    Ok(entries)
}

/// SHA-256 (lowercase hex) over `path:size:mtime` of every collected file.
pub fn compute_file_collection_hash<P: AsRef<Path>>(paths: &[P]) -> io::Result<String> {
    let mut hasher = Sha256::new();
    for entry in collect_entries(paths)? {
        hasher.update(entry.fingerprint_line().as_bytes());
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// SHA-256 (lowercase hex) of a string; used for stable resource names.
pub fn compute_string_hash(value: &str) -> String {
    format!("{:x}", Sha256::digest(value.as_bytes()))
}
