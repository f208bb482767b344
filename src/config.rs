use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::tools::ProcessEnv;

/// Optional per-project file at the build directory root.
pub const CONFIG_FILE: &str = "venvpack.toml";

pub const DEFAULT_INTERPRETER: &str = "python2.7";
pub const DEFAULT_PIP_VERSION: &str = "1.2.1";
pub const DEFAULT_SRC_DIR: &str = ".heroku/src";
pub const DEFAULT_VIRTUALENV: &str = "virtualenv";

/// Overrides the package download cache location.
pub const ENV_DOWNLOAD_CACHE: &str = "PIP_DOWNLOAD_CACHE";
/// Any non-empty value forces the environment to be rebuilt from scratch.
pub const ENV_FORCE_REBUILD: &str = "VIRTUALENV_FORCE_REBUILD";

/// Contents of `venvpack.toml`. Every section and field is optional.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    pub python: Option<PythonConfig>,
    pub pip: Option<PipConfig>,
    pub tools: Option<ToolsConfig>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct PythonConfig {
    /// Interpreter executable handed to the environment tool
    pub executable: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct PipConfig {
    /// Pinned packaging tool version, installed before any requirement
    pub version: Option<String>,

    /// Scratch path for version-control checkouts, relative to the build directory
    pub src_dir: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ToolsConfig {
    pub virtualenv: Option<String>,
}

/// Load `venvpack.toml` from the build directory.
///
/// A missing file is not an error; a malformed one is, and it is reported
/// before the pipeline touches the cache.
pub fn load(build_dir: &Path) -> Result<Option<ProjectConfig>> {
    let config_path = build_dir.join(CONFIG_FILE);

    if !config_path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;

    let config: ProjectConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", config_path.display()))?;

    Ok(Some(config))
}

/// Resolved settings, fixed for the whole compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub interpreter: String,
    pub pip_version: String,
    pub src_dir: String,
    pub virtualenv: String,
    pub download_cache: PathBuf,
    pub force_rebuild: bool,
}

impl Settings {
    /// Merge the project file with the environment snapshot.
    ///
    /// Priority: environment variable > `venvpack.toml` > built-in default.
    pub fn resolve(config: Option<&ProjectConfig>, env: &ProcessEnv, cache_dir: &Path) -> Self {
        let python = config.and_then(|c| c.python.as_ref());
        let pip = config.and_then(|c| c.pip.as_ref());
        let tools = config.and_then(|c| c.tools.as_ref());

        let download_cache = env
            .get(ENV_DOWNLOAD_CACHE)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| cache_dir.join("pip_downloads"));

        Self {
            interpreter: python
                .and_then(|p| p.executable.clone())
                .unwrap_or_else(|| DEFAULT_INTERPRETER.to_string()),
            pip_version: pip
                .and_then(|p| p.version.clone())
                .unwrap_or_else(|| DEFAULT_PIP_VERSION.to_string()),
            src_dir: pip
                .and_then(|p| p.src_dir.clone())
                .unwrap_or_else(|| DEFAULT_SRC_DIR.to_string()),
            virtualenv: tools
                .and_then(|t| t.virtualenv.clone())
                .unwrap_or_else(|| DEFAULT_VIRTUALENV.to_string()),
            download_cache,
            force_rebuild: env.is_set(ENV_FORCE_REBUILD),
        }
    }
}
