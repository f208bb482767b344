use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Command-line interface
#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    /// Print debug diagnostics to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a relocatable Python environment for an application
    Compile {
        /// Application source tree, modified in place
        build_dir: PathBuf,

        /// Persistent cache directory shared between builds
        cache_dir: PathBuf,

        /// Directory holding bin/detect and the hook scripts.
        /// Defaults to the directory above this executable's bin/.
        #[arg(long)]
        buildpack_dir: Option<PathBuf>,
    },

    /// Print the application kind reported by bin/detect
    Detect {
        /// Application source tree to inspect
        build_dir: PathBuf,

        /// Directory holding bin/detect.
        /// Defaults to the directory above this executable's bin/.
        #[arg(long)]
        buildpack_dir: Option<PathBuf>,
    },
}
