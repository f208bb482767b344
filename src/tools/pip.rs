use std::path::Path;

use super::{CommandRunner, Invocation, ProcessEnv, ToolOutcome};
use crate::error::{BuildError, Result};

const PIP: &str = "pip";

/// Package installer wrapper.
///
/// Resolved through the child's `PATH`, so once the environment is activated
/// this is the environment's own `pip`.
pub struct Pip<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> Pip<'a> {
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }

    /// Version token from `pip --version` (`pip 1.2.1 from ...`).
    pub fn version(&self, cwd: &Path, env: &ProcessEnv) -> Option<String> {
        let invocation = Invocation::new(PIP, cwd, env).arg("--version");
        match self.runner.run(&invocation) {
            Ok(ToolOutcome::Success { output }) => {
                output.split_whitespace().nth(1).map(str::to_string)
            }
            _ => None,
        }
    }

    /// `pip install <args>`, streamed through the indentation filter.
    pub fn install<I, S>(&self, cwd: &Path, env: &ProcessEnv, args: I) -> Result<ToolOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let invocation = Invocation::new(PIP, cwd, env)
            .arg("install")
            .args(args)
            .streamed();
        self.runner
            .run(&invocation)
            .map_err(|source| BuildError::Spawn {
                program: PIP.to_string(),
                source,
            })
    }
}
