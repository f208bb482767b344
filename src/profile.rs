use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{BuildError, Result};
use crate::layout::LayoutScheme;

/// Startup script location, relative to the build directory.
pub const PROFILE_PATH: &str = ".profile.d/python.sh";

/// Where the slug is unpacked at runtime.
pub const APP_DIR: &str = "/app";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assignment {
    /// `export KEY=VALUE`
    Set,
    /// `export KEY=${KEY:-VALUE}`
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub key: String,
    pub value: String,
    pub kind: Assignment,
}

impl Statement {
    pub fn render(&self) -> String {
        match self.kind {
            Assignment::Set => format!("export {}={}", self.key, self.value),
            Assignment::Default => {
                format!("export {key}=${{{key}:-{}}}", self.value, key = self.key)
            }
        }
    }
}

/// Ordered list of runtime variable assignments.
///
/// Statements keep insertion order. Assigning a key twice replaces the first
/// statement in place, so a key never appears on two lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileScript {
    statements: Vec<Statement>,
}

impl ProfileScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: &str) -> &mut Self {
        self.push(key, value, Assignment::Set)
    }

    pub fn set_default(&mut self, key: &str, value: &str) -> &mut Self {
        self.push(key, value, Assignment::Default)
    }

    fn push(&mut self, key: &str, value: &str, kind: Assignment) -> &mut Self {
        let statement = Statement {
            key: key.to_string(),
            value: value.to_string(),
            kind,
        };
        match self.statements.iter_mut().find(|s| s.key == key) {
            Some(existing) => *existing = statement,
            None => self.statements.push(statement),
        }
        self
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn render(&self) -> String {
        self.statements
            .iter()
            .map(|s| s.render() + "\n")
            .collect()
    }

    /// Write the script under `build_dir`, replacing any previous copy.
    pub fn write(&self, build_dir: &Path) -> Result<PathBuf> {
        let path = build_dir.join(PROFILE_PATH);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| BuildError::io(parent, e))?;
        }
        fs::write(&path, self.render()).map_err(|e| BuildError::io(&path, e))?;
        Ok(path)
    }
}

/// The runtime profile for an environment in `layout`.
pub fn runtime_profile(layout: LayoutScheme) -> ProfileScript {
    let (bin_dir, home) = match layout {
        LayoutScheme::Modern => (
            format!("$HOME/{}/bin", layout.env_root()),
            format!("{APP_DIR}/{}", layout.env_root()),
        ),
        LayoutScheme::Legacy => ("$HOME/bin".to_string(), APP_DIR.to_string()),
    };
    let vendor_lib = format!("{APP_DIR}/.heroku/vendor/lib");

    let mut profile = ProfileScript::new();
    profile
        .set("PATH", &format!("{bin_dir}:$PATH"))
        .set("PYTHONUNBUFFERED", "true")
        .set("LIBRARY_PATH", &vendor_lib)
        .set("LD_LIBRARY_PATH", &vendor_lib)
        .set_default("LANG", "en_US.UTF-8")
        .set_default("PYTHONHASHSEED", "random")
        .set_default("PYTHONHOME", &home)
        .set_default("PYTHONPATH", &format!("{APP_DIR}/"));
    profile
}
