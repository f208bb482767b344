use std::fs;
use std::path::Path;

use tracing::debug;

use crate::environment::Environment;
use crate::error::{BuildError, Result};
use crate::output;
use crate::tools::pip::Pip;
use crate::tools::{ProcessEnv, ToolOutcome};

pub const REQUIREMENTS_FILE: &str = "requirements.txt";

/// Declaration written when the project ships none: install the project itself.
pub const SELF_INSTALL: &str = "-e .";

/// Requirement URL fragments that need a version-control client installed first.
const VCS_CLIENTS: &[(&str, &str)] = &[("hg+", "mercurial")];

/// Write the self-install declaration if the project has no requirements file.
///
/// Returns `true` when the file was synthesized.
pub fn ensure_declaration(build_dir: &Path) -> Result<bool> {
    let path = build_dir.join(REQUIREMENTS_FILE);
    if path.exists() {
        return Ok(false);
    }

    fs::write(&path, format!("{SELF_INSTALL}\n")).map_err(|e| BuildError::io(&path, e))?;
    debug!(path = %path.display(), "synthesized requirements file");
    Ok(true)
}

/// Clients required by the declaration, matched case-insensitively.
pub fn required_vcs_clients(requirements: &str) -> Vec<&'static str> {
    let lowered = requirements.to_lowercase();
    VCS_CLIENTS
        .iter()
        .filter(|(fragment, _)| lowered.contains(fragment))
        .map(|(_, client)| *client)
        .collect()
}

/// Installs the application's dependencies into an activated environment.
///
/// Every step must succeed before the next one runs.
pub struct DependencyInstaller<'a> {
    pip: Pip<'a>,
    pip_version: String,
    src_dir: String,
}

impl<'a> DependencyInstaller<'a> {
    pub fn new(pip: Pip<'a>, pip_version: &str, src_dir: &str) -> Self {
        Self {
            pip,
            pip_version: pip_version.to_string(),
            src_dir: src_dir.to_string(),
        }
    }

    /// `active_env` must come from [`Environment::activate`] on `environment`.
    pub fn install(
        &self,
        build_dir: &Path,
        environment: &Environment,
        active_env: &ProcessEnv,
    ) -> Result<()> {
        debug!(root = %environment.path.display(), "installing into environment");

        if ensure_declaration(build_dir)? {
            output::info(&format!(
                "No {REQUIREMENTS_FILE} found, installing the project itself ({SELF_INSTALL})"
            ));
        }

        let requirements_path = build_dir.join(REQUIREMENTS_FILE);
        let requirements = fs::read_to_string(&requirements_path)
            .map_err(|e| BuildError::io(&requirements_path, e))?;

        for client in required_vcs_clients(&requirements) {
            output::step(&format!("Installing {client}"));
            let outcome = self.pip.install(build_dir, active_env, [client])?;
            check(outcome, &format!("pip install {client}"))?;
        }

        let pinned = format!("pip=={}", self.pip_version);
        let outcome = self.pip.install(build_dir, active_env, [pinned.as_str()])?;
        check(outcome, &format!("pip install {pinned}"))?;

        let version = self
            .pip
            .version(build_dir, active_env)
            .unwrap_or_else(|| self.pip_version.clone());
        output::step(&format!("Installing dependencies using pip version {version}"));

        let src = src_argument(&self.src_dir);
        let outcome = self.pip.install(
            build_dir,
            active_env,
            [
                "-r",
                REQUIREMENTS_FILE,
                "--exists-action=w",
                src.as_str(),
            ],
        )?;
        check(outcome, "pip install -r requirements.txt")
    }
}

fn check(outcome: ToolOutcome, step: &str) -> Result<()> {
    match outcome {
        ToolOutcome::Success { .. } => Ok(()),
        ToolOutcome::Failure { code, .. } => Err(BuildError::Install {
            step: step.to_string(),
            code,
        }),
    }
}

/// `--src` flag for the installer; relative dirs are anchored at the build root.
fn src_argument(src_dir: &str) -> String {
    if Path::new(src_dir).is_absolute() {
        format!("--src={src_dir}")
    } else {
        format!("--src=./{}", src_dir.trim_start_matches("./"))
    }
}
