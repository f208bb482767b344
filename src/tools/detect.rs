use std::fmt;
use std::path::Path;

use tracing::debug;

use super::{CommandRunner, Invocation, ProcessEnv, ToolOutcome};
use crate::error::{BuildError, Result};
use crate::output;

/// Location of the detection collaborator, relative to the buildpack directory.
pub const DETECT_SCRIPT: &str = "bin/detect";

/// Application kind reported by the detection collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppKind {
    Python,
    Django,
    Other(String),
}

impl AppKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "" | "Python" => AppKind::Python,
            "Python/Django" => AppKind::Django,
            other => AppKind::Other(other.to_string()),
        }
    }

    /// Whether the framework-specific hook applies.
    pub fn is_django(&self) -> bool {
        matches!(self, AppKind::Django)
    }
}

impl fmt::Display for AppKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppKind::Python => f.write_str("Python"),
            AppKind::Django => f.write_str("Python/Django"),
            AppKind::Other(name) => f.write_str(name),
        }
    }
}

/// Run `<buildpack>/bin/detect <build_dir>` and parse its answer.
///
/// A buildpack without a detect script is treated as a plain Python app.
pub fn detect(
    runner: &dyn CommandRunner,
    buildpack_dir: &Path,
    build_dir: &Path,
    env: &ProcessEnv,
) -> Result<AppKind> {
    let script = buildpack_dir.join(DETECT_SCRIPT);
    if !script.is_file() {
        debug!(path = %script.display(), "no detect script, assuming plain Python");
        return Ok(AppKind::Python);
    }

    let program = script.display().to_string();
    let invocation =
        Invocation::new(program.as_str(), build_dir, env).arg(build_dir.display().to_string());
    match runner.run(&invocation) {
        Ok(ToolOutcome::Success { output }) => Ok(AppKind::parse(&output)),
        Ok(ToolOutcome::Failure { code, diagnostic }) => {
            output::print_indented(&diagnostic);
            Err(BuildError::Detection { code })
        }
        Err(source) => Err(BuildError::Spawn { program, source }),
    }
}
