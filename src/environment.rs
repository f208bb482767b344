//! Isolated runtime environment lifecycle: create, repair, relocate.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::cache::remove_path;
use crate::error::{BuildError, Result};
use crate::layout::LayoutScheme;
use crate::output;
use crate::tools::virtualenv::Virtualenv;
use crate::tools::{ProcessEnv, ToolOutcome};

/// A live environment inside the build directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Root relative to the build directory, as handed to the environment tool.
    pub root: String,
    /// Absolute root.
    pub path: PathBuf,
    pub interpreter: String,
    relocatable: bool,
}

impl Environment {
    pub fn is_relocatable(&self) -> bool {
        self.relocatable
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.path.join("bin")
    }

    /// Child environment with this environment's binaries first on `PATH`.
    pub fn activate(&self, env: &ProcessEnv) -> ProcessEnv {
        let mut active = env.clone();
        active.prepend_path(&self.bin_dir());
        active.set("VIRTUAL_ENV", self.path.display().to_string());
        active.remove("PYTHONHOME");
        active
    }
}

/// Creates, validates and finalizes the environment for one layout.
pub struct EnvironmentManager<'a> {
    tool: Virtualenv<'a>,
    build_dir: PathBuf,
    layout: LayoutScheme,
}

impl<'a> EnvironmentManager<'a> {
    pub fn new(tool: Virtualenv<'a>, build_dir: &Path, layout: LayoutScheme) -> Self {
        Self {
            tool,
            build_dir: build_dir.to_path_buf(),
            layout,
        }
    }

    /// Make sure a valid environment exists at the layout's root.
    ///
    /// Creation runs in place first. If it fails, or `force_rebuild` is set,
    /// every directory of the layout is deleted and creation runs once more;
    /// a second failure is fatal. Output from every attempt reaches the log.
    pub fn ensure(
        &self,
        interpreter: &str,
        force_rebuild: bool,
        env: &ProcessEnv,
    ) -> Result<Environment> {
        let root = self.layout.env_root();

        let version = self.tool.version(&self.build_dir, env);
        output::step(&match version {
            Some(v) => format!("Preparing virtualenv version {v}"),
            None => "Preparing virtualenv".to_string(),
        });

        let mut outcome = self.tool.create(&self.build_dir, root, interpreter, env)?;

        if !outcome.is_success() || force_rebuild {
            output::print_indented(outcome.text());
            if force_rebuild {
                output::warn("Virtualenv rebuild requested, rebuilding.");
            } else {
                output::warn("Virtualenv corrupt, rebuilding.");
            }

            self.purge();
            outcome = self.tool.create(&self.build_dir, root, interpreter, env)?;
        }

        output::print_indented(outcome.text());

        if let ToolOutcome::Failure { code, .. } = outcome {
            return Err(BuildError::EnvironmentCreation { code });
        }

        Ok(Environment {
            root: root.to_string(),
            // `components()` drops the `.` of the legacy root.
            path: self.build_dir.join(root).components().collect(),
            interpreter: interpreter.to_string(),
            relocatable: false,
        })
    }

    /// Rewrite internal absolute paths so the environment survives a move.
    ///
    /// Failure is fatal: a non-relocatable environment must never be cached.
    pub fn finalize(&self, environment: &mut Environment, env: &ProcessEnv) -> Result<()> {
        let outcome = self.tool.relocate(
            &self.build_dir,
            &environment.root,
            &environment.interpreter,
            env,
        )?;

        match outcome {
            ToolOutcome::Success { .. } => {
                environment.relocatable = true;
                Ok(())
            }
            ToolOutcome::Failure { code, diagnostic } => {
                output::warn("Error making virtualenv relocatable");
                output::print_indented(&diagnostic);
                Err(BuildError::Relocation { code })
            }
        }
    }

    /// Delete every directory of the active layout. Failures are ignored.
    fn purge(&self) {
        for dir in self.layout.env_dirs() {
            let path = self.build_dir.join(dir);
            if let Err(e) = remove_path(&path) {
                debug!(path = %path.display(), error = %e, "failed to remove directory");
            }
        }
    }
}
