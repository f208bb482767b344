use std::path::Path;

use super::{CommandRunner, Invocation, ProcessEnv, ToolOutcome};
use crate::error::{BuildError, Result};

/// Environment tool wrapper.
///
/// Creation and relocation are always captured rather than streamed: the
/// caller decides when the output reaches the build log, because on the
/// rebuild path it has to print both attempts in order.
pub struct Virtualenv<'a> {
    runner: &'a dyn CommandRunner,
    program: String,
}

impl<'a> Virtualenv<'a> {
    pub fn new(runner: &'a dyn CommandRunner, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    /// `virtualenv --version`, or `None` if the call fails.
    pub fn version(&self, cwd: &Path, env: &ProcessEnv) -> Option<String> {
        let invocation = Invocation::new(&self.program, cwd, env).arg("--version");
        match self.runner.run(&invocation) {
            Ok(ToolOutcome::Success { output }) => {
                let version = output.trim();
                (!version.is_empty()).then(|| version.to_string())
            }
            _ => None,
        }
    }

    /// Create (or refresh) an environment at `root`, relative to `cwd`.
    pub fn create(
        &self,
        cwd: &Path,
        root: &str,
        interpreter: &str,
        env: &ProcessEnv,
    ) -> Result<ToolOutcome> {
        let invocation = Invocation::new(&self.program, cwd, env).args([
            "--python",
            interpreter,
            "--distribute",
            "--never-download",
            "--prompt=venv",
            root,
        ]);
        self.call(&invocation)
    }

    /// Rewrite absolute paths inside the environment to relative ones.
    pub fn relocate(
        &self,
        cwd: &Path,
        root: &str,
        interpreter: &str,
        env: &ProcessEnv,
    ) -> Result<ToolOutcome> {
        let invocation = Invocation::new(&self.program, cwd, env).args([
            "--python",
            interpreter,
            "--relocatable",
            root,
        ]);
        self.call(&invocation)
    }

    fn call(&self, invocation: &Invocation) -> Result<ToolOutcome> {
        self.runner
            .run(invocation)
            .map_err(|source| BuildError::Spawn {
                program: self.program.clone(),
                source,
            })
    }
}
