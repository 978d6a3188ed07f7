use std::process::ExitCode;

use anyhow::Result;

use super::Command;
use crate::{app::context::AppContext, core::suite::cases::builtin_cases};

pub struct ListCommand;

impl Command for ListCommand {
    fn run(&self, ctx: &AppContext) -> Result<ExitCode> {
        for case in builtin_cases(ctx.cfg.fixture.as_deref()) {
            println!("{}", case.name());
        }
        Ok(ExitCode::SUCCESS)
    }
}
