//! Extension points invoked at fixed places in the compile.
//!
//! Each hook is a single executable at a well-known path under the buildpack
//! directory, run with no arguments from the build directory. A hook that is
//! not there is a no-op. A hook that exits non-zero fails the compile.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{BuildError, Result};
use crate::output;
use crate::tools::detect::AppKind;
use crate::tools::{CommandRunner, Invocation, ProcessEnv, ToolOutcome};

pub const PRE_BUILD_HOOK: &str = "bin/steps/hooks/pre_compile";
pub const POST_BUILD_HOOK: &str = "bin/steps/hooks/post_compile";
pub const FRAMEWORK_HOOK: &str = "bin/steps/django";

/// What a hook gets to see.
pub struct HookContext<'a> {
    pub build_dir: &'a Path,
    pub env: &'a ProcessEnv,
    /// The cache was empty when this compile started.
    pub fresh: bool,
}

pub trait ExtensionPoint {
    fn name(&self) -> &str;
    fn run(&self, ctx: &HookContext<'_>) -> Result<()>;
}

/// Stand-in for an absent hook.
pub struct NoopHook {
    name: String,
}

impl NoopHook {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl ExtensionPoint for NoopHook {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, _ctx: &HookContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// An executable hook script.
pub struct ScriptHook<'a> {
    name: String,
    path: PathBuf,
    runner: &'a dyn CommandRunner,
}

impl<'a> ScriptHook<'a> {
    pub fn new(name: impl Into<String>, path: PathBuf, runner: &'a dyn CommandRunner) -> Self {
        Self {
            name: name.into(),
            path,
            runner,
        }
    }
}

impl ExtensionPoint for ScriptHook<'_> {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &HookContext<'_>) -> Result<()> {
        output::step(&format!("Running {} hook", self.name));
        debug!(path = %self.path.display(), fresh = ctx.fresh, "running hook");

        let program = self.path.display().to_string();
        let invocation = Invocation::new(program.as_str(), ctx.build_dir, ctx.env).streamed();
        match self.runner.run(&invocation) {
            Ok(ToolOutcome::Success { .. }) => Ok(()),
            Ok(ToolOutcome::Failure { code, .. }) => Err(BuildError::Hook {
                name: self.name.clone(),
                code,
            }),
            Err(source) => Err(BuildError::Spawn { program, source }),
        }
    }
}

/// The three extension points of a compile.
pub struct HookDispatcher<'a> {
    pre_build: Box<dyn ExtensionPoint + 'a>,
    post_build: Box<dyn ExtensionPoint + 'a>,
    framework: Box<dyn ExtensionPoint + 'a>,
}

impl<'a> HookDispatcher<'a> {
    pub fn new(
        pre_build: Box<dyn ExtensionPoint + 'a>,
        post_build: Box<dyn ExtensionPoint + 'a>,
        framework: Box<dyn ExtensionPoint + 'a>,
    ) -> Self {
        Self {
            pre_build,
            post_build,
            framework,
        }
    }

    /// Look up the hook scripts under `buildpack_dir`.
    pub fn discover(buildpack_dir: &Path, runner: &'a dyn CommandRunner) -> Self {
        let hook = |name: &str, relative: &str| -> Box<dyn ExtensionPoint + 'a> {
            let path = buildpack_dir.join(relative);
            if path.is_file() {
                Box::new(ScriptHook::new(name, path, runner))
            } else {
                debug!(path = %path.display(), "hook not present");
                Box::new(NoopHook::new(name))
            }
        };

        Self::new(
            hook("pre_compile", PRE_BUILD_HOOK),
            hook("post_compile", POST_BUILD_HOOK),
            hook("django", FRAMEWORK_HOOK),
        )
    }

    pub fn pre_build(&self, ctx: &HookContext<'_>) -> Result<()> {
        self.pre_build.run(ctx)
    }

    pub fn post_build(&self, ctx: &HookContext<'_>) -> Result<()> {
        self.post_build.run(ctx)
    }

    /// Runs only for Django apps. `DISABLE_INJECTION` is left to the hook itself.
    pub fn framework(&self, kind: &AppKind, ctx: &HookContext<'_>) -> Result<()> {
        if !kind.is_django() {
            debug!(kind = %kind, "skipping {} hook", self.framework.name());
            return Ok(());
        }
        self.framework.run(ctx)
    }
}
