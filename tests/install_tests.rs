use std::fs;

use tempfile::TempDir;
use venvpack_cli::install::{ensure_declaration, required_vcs_clients, REQUIREMENTS_FILE};

#[test]
fn synthesizes_self_install_when_absent() -> anyhow::Result<()> {
    let temp = TempDir::new()?;

    assert!(ensure_declaration(temp.path())?);

    let entries: Vec<_> = fs::read_dir(temp.path())?.collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        fs::read_to_string(temp.path().join(REQUIREMENTS_FILE))?,
        "-e .\n"
    );
    Ok(())
}

#[test]
fn existing_declaration_is_left_alone() -> anyhow::Result<()> {
    let temp = TempDir::new()?;
    fs::write(temp.path().join(REQUIREMENTS_FILE), "Django==1.4\n")?;

    assert!(!ensure_declaration(temp.path())?);
    assert_eq!(
        fs::read_to_string(temp.path().join(REQUIREMENTS_FILE))?,
        "Django==1.4\n"
    );
    Ok(())
}

#[test]
fn mercurial_sources_need_the_client() {
    assert_eq!(
        required_vcs_clients("-e hg+https://bitbucket.org/acme/lib#egg=lib\n"),
        vec!["mercurial"]
    );
    assert_eq!(required_vcs_clients("-e HG+ssh://hg@host/repo\n"), vec!["mercurial"]);
}

#[test]
fn plain_requirements_need_no_client() {
    assert!(required_vcs_clients("flask==0.9\n-e git+https://github.com/a/b#egg=b\n").is_empty());
}
