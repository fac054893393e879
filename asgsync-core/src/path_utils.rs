//! Shared path utilities.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Expands a leading `~` to the current user's home directory.
///
/// Paths without a leading `~`, or when no home directory is known, are
/// returned unchanged.
pub fn expand_tilde(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return PathBuf::from(path),
    };

    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home,
        Some(home) => home.join(rest),
        None => PathBuf::from(path),
    }
}

/// Whether the file can be opened and read.
pub fn is_readable(path: &Path) -> bool {
    let mut buf = [0u8; 1];
    File::open(path)
        .and_then(|mut file| file.read(&mut buf))
        .is_ok()
}
