//! Directory-keyed build cache.
//!
//! A fixed set of top-level names is copied out of the cache directory at the
//! start of a compile and copied back at the end. Restores are advisory: a
//! broken entry only costs a slower build. Persists are not: a failed copy
//! aborts the compile.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{BuildError, Result};

pub struct CacheStore {
    cache_dir: PathBuf,
    build_dir: PathBuf,
    fresh: bool,
}

impl CacheStore {
    /// Open (creating if needed) the cache directory.
    ///
    /// Freshness is decided here, once: a missing or empty cache directory
    /// marks the build as fresh.
    pub fn open(cache_dir: &Path, build_dir: &Path) -> Result<Self> {
        let fresh = is_empty_dir(cache_dir);
        fs::create_dir_all(cache_dir).map_err(|e| BuildError::io(cache_dir, e))?;
        debug!(cache = %cache_dir.display(), fresh, "opened build cache");

        Ok(Self {
            cache_dir: cache_dir.to_path_buf(),
            build_dir: build_dir.to_path_buf(),
            fresh,
        })
    }

    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Copy each cached name into the build directory.
    ///
    /// Missing entries are skipped and copy failures are logged and skipped.
    /// Returns the names that were restored.
    pub fn restore(&self, names: &[&str]) -> Vec<String> {
        let mut restored = Vec::new();

        for name in names {
            let src = self.cache_dir.join(name);
            if fs::symlink_metadata(&src).is_err() {
                debug!(name, "nothing cached");
                continue;
            }

            match copy_tree(&src, &self.build_dir.join(name)) {
                Ok(()) => {
                    debug!(name, "restored from cache");
                    restored.push(name.to_string());
                }
                Err(e) => warn!(name, error = %e, "cache restore failed, continuing"),
            }
        }

        restored
    }

    /// Replace each cached name with the build directory's copy.
    ///
    /// The old cached copy is always removed; a name absent from the build
    /// directory therefore ends up absent from the cache too.
    pub fn persist(&self, names: &[&str]) -> Result<()> {
        for name in names {
            let cached = self.cache_dir.join(name);
            remove_path(&cached).map_err(|e| BuildError::io(&cached, e))?;

            let src = self.build_dir.join(name);
            if fs::symlink_metadata(&src).is_err() {
                debug!(name, "nothing to persist");
                continue;
            }

            copy_tree(&src, &cached).map_err(|e| BuildError::io(&src, e))?;
            debug!(name, "persisted to cache");
        }
        Ok(())
    }
}

fn is_empty_dir(dir: &Path) -> bool {
    match fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}

/// Remove a file, symlink or directory tree; missing paths are fine.
pub(crate) fn remove_path(path: &Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Recursive copy that merges into `dst`, preserving symlinks and permissions.
pub(crate) fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(io::Error::other)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(io::Error::other)?;
        let target = if relative.as_os_str().is_empty() {
            dst.to_path_buf()
        } else {
            dst.join(relative)
        };
        let file_type = entry.file_type();

        if file_type.is_dir() {
            if fs::symlink_metadata(&target).is_ok_and(|m| !m.is_dir()) {
                fs::remove_file(&target)?;
            }
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            remove_path(&target)?;
            copy_symlink(entry.path(), &target)?;
        } else {
            if fs::symlink_metadata(&target).is_ok_and(|m| m.is_dir() || m.is_symlink()) {
                remove_path(&target)?;
            }
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    let link = fs::read_link(src)?;
    std::os::unix::fs::symlink(link, dst)
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> io::Result<()> {
    if src.is_dir() {
        copy_tree(&fs::canonicalize(src)?, dst)
    } else {
        fs::copy(src, dst).map(|_| ())
    }
}
