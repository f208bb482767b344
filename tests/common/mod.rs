//! Shared helpers for pipeline integration tests.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use venvpack_cli::config::Settings;
use venvpack_cli::hooks::HookDispatcher;
use venvpack_cli::pipelines::{CompileReport, CompileRequest, Compiler};
use venvpack_cli::tools::{CommandRunner, Invocation, ProcessEnv, ToolOutcome};

/// Scripted stand-in for the external tools.
///
/// Records every invocation. `virtualenv` creation lays down `bin/`,
/// `include/` and `lib/python2.7/` under the requested root; everything else
/// succeeds unless told otherwise.
#[derive(Default)]
pub struct FakeRunner {
    pub calls: RefCell<Vec<Invocation>>,
    /// Number of leading creation calls that fail.
    pub failing_creations: Cell<usize>,
    pub fail_relocate: Cell<bool>,
    /// `pip install` calls whose args contain this string fail.
    pub fail_pip_matching: RefCell<Option<String>>,
    /// Scripts (by file name) that exit non-zero.
    pub failing_scripts: RefCell<Vec<String>>,
    /// stdout of `bin/detect`.
    pub detect_output: RefCell<String>,
}

impl FakeRunner {
    pub fn new() -> Self {
        let runner = Self::default();
        *runner.detect_output.borrow_mut() = "Python".to_string();
        runner
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    /// Environment creations (not version checks or relocations).
    pub fn creations(&self) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == "virtualenv" && is_creation(c))
            .collect()
    }

    pub fn relocations(&self) -> Vec<Invocation> {
        self.calls()
            .into_iter()
            .filter(|c| c.args.iter().any(|a| a == "--relocatable"))
            .collect()
    }

    pub fn pip_installs(&self) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == "pip" && c.args.first().map(String::as_str) == Some("install"))
            .map(|c| c.args[1..].to_vec())
            .collect()
    }

    pub fn scripts_run(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.program.contains("/bin/"))
            .filter_map(|c| {
                Path::new(&c.program)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
            })
            .collect()
    }
}

fn is_creation(invocation: &Invocation) -> bool {
    !invocation
        .args
        .iter()
        .any(|a| a == "--relocatable" || a == "--version")
}

impl CommandRunner for FakeRunner {
    fn run(&self, invocation: &Invocation) -> std::io::Result<ToolOutcome> {
        self.calls.borrow_mut().push(invocation.clone());

        let ok = |output: &str| -> std::io::Result<ToolOutcome> {
            Ok(ToolOutcome::Success {
                output: output.to_string(),
            })
        };
        let fail = |diagnostic: &str| -> std::io::Result<ToolOutcome> {
            Ok(ToolOutcome::Failure {
                code: Some(1),
                diagnostic: diagnostic.to_string(),
            })
        };

        match invocation.program.as_str() {
            "virtualenv" if invocation.args.iter().any(|a| a == "--version") => ok("1.8.2\n"),
            "virtualenv" if invocation.args.iter().any(|a| a == "--relocatable") => {
                if self.fail_relocate.get() {
                    fail("Cannot relocate: bad script\n")
                } else {
                    ok("Making paths relative\n")
                }
            }
            "virtualenv" => {
                let remaining = self.failing_creations.get();
                if remaining > 0 {
                    self.failing_creations.set(remaining - 1);
                    return fail("ImportError: No module named site\n");
                }
                let root = invocation.args.last().cloned().unwrap_or_default();
                let root = invocation.cwd.join(root);
                for dir in ["bin", "include", "lib/python2.7"] {
                    fs::create_dir_all(root.join(dir))?;
                }
                fs::write(root.join("bin/python"), "#!fake\n")?;
                ok("New python executable in venv/bin/python\n")
            }
            "pip" if invocation.args.first().map(String::as_str) == Some("--version") => {
                ok("pip 1.2.1 from /app/.heroku/venv/lib/python2.7/site-packages\n")
            }
            "pip" => {
                let failing = self.fail_pip_matching.borrow();
                match failing.as_deref() {
                    Some(needle) if invocation.args.iter().any(|a| a.contains(needle)) => {
                        fail("Could not find a version that satisfies the requirement\n")
                    }
                    _ => ok("Successfully installed\n"),
                }
            }
            program => {
                let name = Path::new(program)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                if self.failing_scripts.borrow().contains(&name) {
                    return fail("hook exploded\n");
                }
                if name == "detect" {
                    return ok(self.detect_output.borrow().as_str());
                }
                ok("")
            }
        }
    }
}

/// Build, cache and buildpack directories for one test.
pub struct Workspace {
    pub temp: TempDir,
    pub build_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub buildpack_dir: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let build_dir = temp.path().join("build");
        let cache_dir = temp.path().join("cache");
        let buildpack_dir = temp.path().join("buildpack");
        for dir in [&build_dir, &cache_dir, &buildpack_dir] {
            fs::create_dir_all(dir).unwrap();
        }
        Self {
            temp,
            build_dir,
            cache_dir,
            buildpack_dir,
        }
    }

    pub fn request(&self) -> CompileRequest {
        CompileRequest {
            build_dir: self.build_dir.clone(),
            cache_dir: self.cache_dir.clone(),
            buildpack_dir: self.buildpack_dir.clone(),
        }
    }

    pub fn env(&self) -> ProcessEnv {
        ProcessEnv::from_vars([("PATH", "/usr/local/bin:/usr/bin:/bin"), ("HOME", "/app")])
    }

    pub fn settings(&self) -> Settings {
        Settings::resolve(None, &self.env(), &self.cache_dir)
    }

    pub fn write(&self, root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    /// Drop an (empty) executable hook or detect script into the buildpack.
    pub fn add_script(&self, relative: &str) {
        self.write(&self.buildpack_dir, relative, "#!/bin/sh\n");
    }

    pub fn compile(&self, runner: &FakeRunner) -> venvpack_cli::Result<CompileReport> {
        self.compile_with(runner, self.settings())
    }

    pub fn compile_with(
        &self,
        runner: &FakeRunner,
        settings: Settings,
    ) -> venvpack_cli::Result<CompileReport> {
        let hooks = HookDispatcher::discover(&self.buildpack_dir, runner);
        Compiler::new(runner, hooks, settings).run(&self.request(), self.env())
    }
}
