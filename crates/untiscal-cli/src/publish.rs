//! Atomic calendar publishing.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{SyncError, SyncResult};

/// Writes `content` to `path` atomically.
///
/// The content goes to a temporary file in the target directory, is synced
/// to disk and then renamed over `path`. Readers see either the previous
/// file or the complete new one; on error the previous file is untouched.
pub fn publish(path: &Path, content: &str) -> SyncResult<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;

    let mut temp = NamedTempFile::new_in(parent).map_err(|e| SyncError::io(parent, e))?;
    debug!(temp = %temp.path().display(), "Writing calendar to temporary file");

    temp.write_all(content.as_bytes())
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| SyncError::io(temp.path(), e))?;

    temp.persist(path).map_err(|e| SyncError::io(path, e.error))?;

    info!(path = %path.display(), bytes = content.len(), "Published calendar");
    Ok(())
}
