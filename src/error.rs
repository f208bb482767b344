use std::path::PathBuf;

use thiserror::Error;

/// Fatal conditions that abort a compile.
///
/// Tool diagnostics are printed to the build log before one of these is
/// returned, so the variants only carry what the caller needs to report the
/// exit status. Advisory problems (a cache entry that fails to restore, a
/// checked-in environment) never become a `BuildError`.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A legacy layout marker exists as a plain file where a directory is expected.
    #[error("checked-in virtualenv conflict: {} is a file", path.display())]
    LayoutConflict { path: PathBuf },

    /// The program could not be started at all.
    #[error("failed to launch {program}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The environment tool failed again after the rebuild attempt.
    #[error("virtualenv creation failed with exit code {code:?}")]
    EnvironmentCreation { code: Option<i32> },

    /// Rewriting the environment's absolute paths failed.
    #[error("error making virtualenv relocatable (exit code {code:?})")]
    Relocation { code: Option<i32> },

    /// One of the installer invocations exited non-zero.
    #[error("{step} failed with exit code {code:?}")]
    Install { step: String, code: Option<i32> },

    /// An extension point exited non-zero.
    #[error("hook {name} failed with exit code {code:?}")]
    Hook { name: String, code: Option<i32> },

    /// The detection collaborator rejected the build directory.
    #[error("application detection failed with exit code {code:?}")]
    Detection { code: Option<i32> },

    #[error("io error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BuildError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = BuildError> = std::result::Result<T, E>;
