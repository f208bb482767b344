use std::fs;
use std::path::Path;

use tempfile::TempDir;
use venvpack_cli::config::{self, Settings, CONFIG_FILE};
use venvpack_cli::tools::ProcessEnv;

#[test]
fn defaults_without_file_or_env() {
    let settings = Settings::resolve(None, &ProcessEnv::default(), Path::new("/cache"));

    assert_eq!(settings.interpreter, "python2.7");
    assert_eq!(settings.pip_version, "1.2.1");
    assert_eq!(settings.src_dir, ".heroku/src");
    assert_eq!(settings.virtualenv, "virtualenv");
    assert_eq!(settings.download_cache, Path::new("/cache/pip_downloads"));
    assert!(!settings.force_rebuild);
}

#[test]
fn environment_overrides_download_cache_and_forces_rebuild() {
    let env = ProcessEnv::from_vars([
        ("PIP_DOWNLOAD_CACHE", "/tmp/pip"),
        ("VIRTUALENV_FORCE_REBUILD", "1"),
    ]);

    let settings = Settings::resolve(None, &env, Path::new("/cache"));

    assert_eq!(settings.download_cache, Path::new("/tmp/pip"));
    assert!(settings.force_rebuild);
}

#[test]
fn empty_force_flag_is_unset() {
    let env = ProcessEnv::from_vars([("VIRTUALENV_FORCE_REBUILD", "")]);

    assert!(!Settings::resolve(None, &env, Path::new("/cache")).force_rebuild);
}

#[test]
fn project_file_overrides_defaults() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    fs::write(
        temp.path().join(CONFIG_FILE),
        "[python]\nexecutable = \"python2.6\"\n\n[pip]\nversion = \"1.1\"\n",
    )?;

    let loaded = config::load(temp.path())?;
    let settings = Settings::resolve(loaded.as_ref(), &ProcessEnv::default(), temp.path());

    assert_eq!(settings.interpreter, "python2.6");
    assert_eq!(settings.pip_version, "1.1");
    assert_eq!(settings.src_dir, ".heroku/src");
    Ok(())
}

#[test]
fn missing_project_file_is_not_an_error() -> anyhow::Result<()> {
    let temp = TempDir::new()?;

    assert!(config::load(temp.path())?.is_none());
    Ok(())
}

#[test]
fn malformed_project_file_is_rejected() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    fs::write(temp.path().join(CONFIG_FILE), "[python]\ninterpreter = 3\n")?;

    let err = config::load(temp.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse"));
    Ok(())
}
