use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::debug;

use crate::cache::CacheStore;
use crate::config::{self, Settings, ENV_DOWNLOAD_CACHE};
use crate::environment::EnvironmentManager;
use crate::error::Result;
use crate::hooks::{HookContext, HookDispatcher};
use crate::install::DependencyInstaller;
use crate::layout::{self, LayoutScheme};
use crate::output;
use crate::profile;
use crate::tools::detect::{self, AppKind};
use crate::tools::pip::Pip;
use crate::tools::virtualenv::Virtualenv;
use crate::tools::{CommandRunner, ProcessEnv, SystemRunner};

/// Compile stages, in the only order they can be entered.
///
/// Any error leaves the pipeline in `Failed`; nothing after the failing stage
/// runs, in particular the cache is never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    LayoutDecided,
    CacheRestored,
    EnvReady,
    DepsInstalled,
    Finalized,
    CachePersisted,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Init => "init",
            Stage::LayoutDecided => "layout-decided",
            Stage::CacheRestored => "cache-restored",
            Stage::EnvReady => "env-ready",
            Stage::DepsInstalled => "deps-installed",
            Stage::Finalized => "finalized",
            Stage::CachePersisted => "cache-persisted",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Directories a compile works on.
#[derive(Debug, Clone)]
pub struct CompileRequest {
    pub build_dir: PathBuf,
    pub cache_dir: PathBuf,
    /// Root of the pipeline's own install; hooks and detection live under it.
    pub buildpack_dir: PathBuf,
}

/// Summary of a successful compile.
#[derive(Debug, Clone)]
pub struct CompileReport {
    pub app_kind: AppKind,
    pub layout: LayoutScheme,
    pub fresh: bool,
    pub restored: Vec<String>,
    pub stages: Vec<Stage>,
    pub profile_path: PathBuf,
}

/// Sequences every component of a compile.
pub struct Compiler<'a> {
    runner: &'a dyn CommandRunner,
    hooks: HookDispatcher<'a>,
    settings: Settings,
    stages: Vec<Stage>,
}

impl<'a> Compiler<'a> {
    pub fn new(
        runner: &'a dyn CommandRunner,
        hooks: HookDispatcher<'a>,
        settings: Settings,
    ) -> Self {
        Self {
            runner,
            hooks,
            settings,
            stages: Vec::new(),
        }
    }

    /// Stages entered so far, including `Failed` after an error.
    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn run(&mut self, request: &CompileRequest, env: ProcessEnv) -> Result<CompileReport> {
        let result = self.execute(request, env);
        if let Err(e) = &result {
            debug!(stage = ?self.stages.last(), error = %e, "compile failed");
            self.enter(Stage::Failed);
        }
        result
    }

    fn enter(&mut self, stage: Stage) {
        debug!(%stage, "entering stage");
        self.stages.push(stage);
    }

    fn execute(&mut self, request: &CompileRequest, mut env: ProcessEnv) -> Result<CompileReport> {
        let start_time = Instant::now();
        let build_dir = request.build_dir.as_path();
        let settings = self.settings.clone();

        // --- Init ---
        self.enter(Stage::Init);
        env.set(
            ENV_DOWNLOAD_CACHE,
            settings.download_cache.display().to_string(),
        );

        let app_kind = detect::detect(self.runner, &request.buildpack_dir, build_dir, &env)?;
        output::step(&format!("{app_kind} app detected"));

        let cache = CacheStore::open(&request.cache_dir, build_dir)?;
        let fresh = cache.is_fresh();

        self.hooks.pre_build(&HookContext {
            build_dir,
            env: &env,
            fresh,
        })?;

        // --- Layout ---
        let layout = layout::decide(build_dir, cache.cache_dir())?;
        self.enter(Stage::LayoutDecided);
        debug!(%layout, "layout decided");
        let names = layout.cache_names();

        // --- Cache restore ---
        let restored = cache.restore(names);
        self.enter(Stage::CacheRestored);

        // --- Environment ---
        let manager = EnvironmentManager::new(
            Virtualenv::new(self.runner, settings.virtualenv.as_str()),
            build_dir,
            layout,
        );
        let mut environment =
            manager.ensure(&settings.interpreter, settings.force_rebuild, &env)?;
        self.enter(Stage::EnvReady);

        // --- Dependencies ---
        output::step("Activating virtualenv");
        let active_env = environment.activate(&env);

        let installer = DependencyInstaller::new(
            Pip::new(self.runner),
            &settings.pip_version,
            &settings.src_dir,
        );
        installer.install(build_dir, &environment, &active_env)?;

        let ctx = HookContext {
            build_dir,
            env: &active_env,
            fresh,
        };
        self.hooks.framework(&app_kind, &ctx)?;
        self.hooks.post_build(&ctx)?;
        self.enter(Stage::DepsInstalled);

        // --- Relocation ---
        manager.finalize(&mut environment, &env)?;
        self.enter(Stage::Finalized);

        // --- Cache persist ---
        // Only a relocatable environment may reach the cache.
        debug_assert!(environment.is_relocatable());
        cache.persist(names)?;
        self.enter(Stage::CachePersisted);

        let profile_path = profile::runtime_profile(layout).write(build_dir)?;
        self.enter(Stage::Done);

        output::done(&format!(
            "Compiled in {:.2}s",
            start_time.elapsed().as_secs_f64()
        ));

        Ok(CompileReport {
            app_kind,
            layout,
            fresh,
            restored,
            stages: self.stages.clone(),
            profile_path,
        })
    }
}

/// Compile `request` with the real process runner and environment.
///
/// Flow:
/// 1. Snapshot the process environment
/// 2. Load `venvpack.toml` and resolve settings
/// 3. Discover hooks under the buildpack directory
/// 4. Run the compiler
pub fn compile(request: &CompileRequest) -> anyhow::Result<CompileReport> {
    let env = ProcessEnv::from_current();
    let project_config = config::load(&request.build_dir)?;
    let settings = Settings::resolve(project_config.as_ref(), &env, &request.cache_dir);
    debug!(?settings, "resolved settings");

    let runner = SystemRunner;
    let hooks = HookDispatcher::discover(&request.buildpack_dir, &runner);
    let report = Compiler::new(&runner, hooks, settings).run(request, env)?;
    Ok(report)
}

/// Buildpack root for an executable installed as `<root>/bin/<exe>`.
pub fn buildpack_root(exe: &Path) -> Option<PathBuf> {
    exe.parent()?.parent().map(Path::to_path_buf)
}
