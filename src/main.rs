mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use venvpack_cli::output;
use venvpack_cli::pipelines::{self, CompileRequest};
use venvpack_cli::tools::{detect, ProcessEnv, SystemRunner};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Report errors without a Rust backtrace; any failure exits 1.
    if let Err(e) = run(cli) {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("venvpack_cli=debug")
    } else {
        EnvFilter::from_default_env()
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Compile {
            build_dir,
            cache_dir,
            buildpack_dir,
        } => {
            let request = CompileRequest {
                buildpack_dir: resolve_buildpack_dir(buildpack_dir)?,
                build_dir,
                cache_dir,
            };
            let report = pipelines::compile(&request)?;
            tracing::debug!(?report, "compile finished");
            Ok(())
        }
        Commands::Detect {
            build_dir,
            buildpack_dir,
        } => {
            let buildpack_dir = resolve_buildpack_dir(buildpack_dir)?;
            let kind = detect::detect(
                &SystemRunner,
                &buildpack_dir,
                &build_dir,
                &ProcessEnv::from_current(),
            )?;
            println!("{kind}");
            Ok(())
        }
    }
}

/// Explicit flag > `<exe>/../..`
fn resolve_buildpack_dir(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = flag {
        return Ok(dir);
    }

    let exe = std::env::current_exe().context("Unable to locate the running executable")?;
    pipelines::buildpack_root(&exe)
        .context("Unable to resolve buildpack directory. Please specify via --buildpack-dir.")
}
