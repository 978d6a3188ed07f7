use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// toolchain-smoke command-line interface
#[derive(Parser, Debug, Clone)]
#[command(name = "toolchain-smoke", version, about = "Smoke-test a compiler toolchain container image", long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv). `RUST_LOG` overrides this.
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Image to test (overrides `SMOKE_IMAGE`)
    #[arg(long, value_name = "IMAGE")]
    pub image: Option<String>,

    /// Container runtime command (overrides `SMOKE_RUNTIME`)
    #[arg(long, value_name = "COMMAND")]
    pub runtime: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run every smoke test against the image; exit 0 only if all checks pass
    Run {
        /// Expected default-invocation output (overrides `SMOKE_FIXTURE`)
        #[arg(long, value_name = "PATH")]
        fixture: Option<PathBuf>,

        /// Per-invocation timeout in seconds, 0 for none (overrides `SMOKE_TIMEOUT_SECS`)
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Parent directory for scratch workspaces (overrides `SMOKE_SCRATCH_DIR`)
        #[arg(long, value_name = "DIR")]
        scratch_dir: Option<PathBuf>,

        /// Also write logs to a daily file in this directory
        #[arg(long, value_name = "DIR")]
        log_dir: Option<PathBuf>,
    },

    /// List the smoke tests in execution order
    List,
}
