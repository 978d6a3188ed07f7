use std::{path::Path, process::ExitCode};

use anyhow::Result;
use tracing::info;

use super::Command;
use crate::{
    app::context::AppContext,
    config::timeout_from_secs,
    core::{
        executor::ContainerRuntime,
        runtime::signals,
        suite::{Suite, cases::builtin_cases},
    },
};

pub struct RunCommand<'a> {
    pub fixture: Option<&'a Path>,
    pub timeout: Option<u64>,
    pub scratch_dir: Option<&'a Path>,
}

impl Command for RunCommand<'_> {
    fn run(&self, ctx: &AppContext) -> Result<ExitCode> {
        let mut cfg = ctx.cfg.clone();
        if let Some(fixture) = self.fixture {
            cfg.fixture = Some(fixture.to_path_buf());
        }
        if let Some(secs) = self.timeout {
            cfg.timeout = timeout_from_secs(secs);
        }
        if let Some(dir) = self.scratch_dir {
            cfg.scratch_dir = Some(dir.to_path_buf());
        }

        info!(
            image = %cfg.image,
            runtime = %cfg.runtime,
            fixture = ?cfg.fixture,
            timeout_secs = cfg.timeout.map(|t| t.as_secs()),
            "starting smoke run"
        );

        signals::install_interrupt_handler()?;
        let executor =
            ContainerRuntime::new(&cfg.runtime, cfg.timeout)?.interrupt_check(signals::interrupted);
        let report = Suite::new(&executor, cfg.image.clone())
            .cases(builtin_cases(cfg.fixture.as_deref()))
            .scratch_parent(cfg.scratch_dir.clone())
            .interrupt_check(signals::interrupted)
            .run()?;

        info!(
            cases_run = report.cases_run,
            passed = report.passed_count(),
            failed = report.failed_count(),
            interrupted = report.interrupted,
            "smoke run finished"
        );
        Ok(ExitCode::from(report.exit_code()))
    }
}
