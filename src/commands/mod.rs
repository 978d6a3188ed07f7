use std::process::ExitCode;

use anyhow::Result;

use crate::{
    app::context::AppContext,
    cli::{Cli, Commands},
};

pub mod list;
pub mod run;

/// Unified interface implemented by each subcommand handler.
pub trait Command {
    /// Execute the subcommand and return the process exit status.
    ///
    /// # Errors
    /// Returns an error if the command cannot start.
    fn run(&self, ctx: &AppContext) -> Result<ExitCode>;
}

/// Central dispatcher: routes parsed CLI to subcommand handlers.
///
/// # Errors
/// Returns an error if the invoked subcommand fails.
pub fn dispatch(cli: &Cli, ctx: &AppContext) -> Result<ExitCode> {
    match &cli.command {
        Commands::Run {
            fixture,
            timeout,
            scratch_dir,
            log_dir: _,
        } => {
            let cmd = run::RunCommand {
                fixture: fixture.as_deref(),
                timeout: *timeout,
                scratch_dir: scratch_dir.as_deref(),
            };
            cmd.run(ctx)
        }
        Commands::List => list::ListCommand.run(ctx),
    }
}
