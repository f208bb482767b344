use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::error::{BuildError, Result};
use crate::output;

/// Present in the cache only when the previous build used the legacy layout.
pub const LEGACY_MARKER: &str = "lib/python2.7";

const MODERN_DIRS: &[&str] = &[".heroku/venv"];
const LEGACY_DIRS: &[&str] = &["bin", "include", "lib"];

/// Where the environment lives and which paths the cache carries.
///
/// Chosen once per compile, before the cache is restored; every later step
/// matches on this value instead of re-deriving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutScheme {
    /// Single `.heroku/venv` directory.
    Modern,
    /// Environment spread over `bin`, `include` and `lib` in the build root.
    Legacy,
}

impl LayoutScheme {
    /// Names copied in and out of the cache.
    pub fn cache_names(&self) -> &'static [&'static str] {
        match self {
            LayoutScheme::Modern => MODERN_DIRS,
            LayoutScheme::Legacy => LEGACY_DIRS,
        }
    }

    /// Directories removed when the environment has to be rebuilt.
    pub fn env_dirs(&self) -> &'static [&'static str] {
        match self {
            LayoutScheme::Modern => MODERN_DIRS,
            LayoutScheme::Legacy => LEGACY_DIRS,
        }
    }

    /// Environment root relative to the build directory.
    pub fn env_root(&self) -> &'static str {
        match self {
            LayoutScheme::Modern => ".heroku/venv",
            LayoutScheme::Legacy => ".",
        }
    }
}

impl fmt::Display for LayoutScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutScheme::Modern => f.write_str("modern"),
            LayoutScheme::Legacy => f.write_str("legacy"),
        }
    }
}

/// Inspect the cache and pick the layout for this compile.
///
/// - Marker directory in the cache: legacy. A checked-in environment in the
///   build directory only produces a warning, unless its marker is a plain
///   file, which is a conflict.
/// - Marker present as a plain file in the cache: conflict.
/// - Anything else: modern.
pub fn decide(build_dir: &Path, cache_dir: &Path) -> Result<LayoutScheme> {
    let marker = cache_dir.join(LEGACY_MARKER);

    if marker.is_file() {
        return Err(BuildError::LayoutConflict { path: marker });
    }

    if !marker.is_dir() {
        debug!("no legacy marker in cache, using modern layout");
        return Ok(LayoutScheme::Modern);
    }

    debug!(marker = %marker.display(), "legacy marker found in cache");

    if build_dir.join("bin").exists() || build_dir.join("lib").exists() {
        output::warn(
            "You have a virtualenv checked in. \
             You should ignore the appropriate paths in your repo.",
        );
    }

    let checked_in = build_dir.join(LEGACY_MARKER);
    if checked_in.is_file() {
        return Err(BuildError::LayoutConflict { path: checked_in });
    }

    Ok(LayoutScheme::Legacy)
}
