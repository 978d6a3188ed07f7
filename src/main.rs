use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use toolchain_smoke::app::context::AppContext;
use toolchain_smoke::cli::{Cli, Commands};
use toolchain_smoke::commands::dispatch;
use toolchain_smoke::logging::init::{flush_logs, init_tracing, init_tracing_with_file};

/// Exit status for errors raised before any check ran.
const EXIT_SETUP_ERROR: u8 = 2;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match try_main(&cli) {
        Ok(code) => code,
        Err(err) => {
            flush_logs();
            eprintln!("Error: {err:?}");
            ExitCode::from(EXIT_SETUP_ERROR)
        }
    }
}

fn try_main(cli: &Cli) -> Result<ExitCode> {
    let ctx = AppContext::from_cli(cli)?;

    // Only `run` can mirror logs into a file
    match &cli.command {
        Commands::Run {
            log_dir: Some(dir), ..
        } => init_tracing_with_file(dir, ctx.verbosity)?,
        _ => init_tracing(ctx.verbosity)?,
    }

    let code = dispatch(cli, &ctx)?;
    flush_logs();
    Ok(code)
}
