//! Sequential test-case runner.
//!
//! A [`Suite`] walks its cases in declaration order. Each case gets its own
//! [`ScratchWorkspace`] and a [`CaseContext`] for invoking the executor and
//! recording checks; the [`Recorder`] is the only state shared across cases.

use std::path::PathBuf;

use anyhow::{Result, bail};
use tracing::{debug, info_span, warn};

use crate::core::{
    check::{CheckResult, Recorder, RunState, truncate},
    executor::{ExitState, Executor, Invocation, Mount, Outcome},
    workspace::{ScratchArea, ScratchWorkspace},
};

pub mod cases;

/// A named script of executor invocations and checks.
pub trait TestCase {
    fn name(&self) -> &str;

    /// Run every step. Steps never short-circuit: each declared check is
    /// recorded even when an earlier step failed.
    fn run(&self, ctx: &mut CaseContext<'_>);
}

/// Everything a running case may touch.
pub struct CaseContext<'a> {
    executor: &'a dyn Executor,
    image: &'a str,
    workspace: &'a ScratchWorkspace,
    recorder: &'a mut Recorder,
    interrupted: &'a dyn Fn() -> bool,
}

impl CaseContext<'_> {
    #[must_use]
    pub const fn workspace(&self) -> &ScratchWorkspace {
        self.workspace
    }

    pub fn recorder(&mut self) -> &mut Recorder {
        &mut *self.recorder
    }

    /// Invocation of the image under test with no options set.
    #[must_use]
    pub fn invocation(&self) -> Invocation {
        Invocation::new(self.image)
    }

    /// Invocation with the workspace mounted at its own path and used as the
    /// working directory.
    #[must_use]
    pub fn in_workspace(&self) -> Invocation {
        let dir = self.workspace.path();
        self.invocation()
            .mount(Mount::same_path(dir))
            .workdir(dir)
    }

    /// Run one invocation. Nothing is launched once the run is interrupted.
    ///
    /// # Errors
    /// Returns an error if the executor could not launch the invocation.
    pub fn exec(&mut self, invocation: &Invocation) -> Result<Outcome> {
        if (self.interrupted)() {
            bail!("run interrupted")
        }
        let shown = if invocation.args.is_empty() {
            "<default entrypoint>".to_string()
        } else {
            invocation.args.join(" ")
        };
        self.recorder.info(&format!("running {shown}"));
        self.executor.run(invocation)
    }

    /// Check that a step ran and exited with status 0.
    pub fn expect_success(&mut self, label: &str, step: &Result<Outcome>) -> bool {
        match step {
            Ok(outcome) => self
                .recorder
                .check(label, &outcome.status, &ExitState::SUCCESS),
            Err(e) => self.recorder.fail(
                label,
                format!("not run: {e:#}"),
                &ExitState::SUCCESS.to_string(),
            ),
        }
    }

    /// Check that a step's captured output equals `expected` byte for byte.
    pub fn expect_output(&mut self, label: &str, step: &Result<Outcome>, expected: &[u8]) -> bool {
        let expected_text = String::from_utf8_lossy(expected);
        let result = match step {
            Ok(outcome) => CheckResult::new(
                label,
                outcome.text(),
                expected_text,
                outcome.output == expected,
            ),
            Err(e) => CheckResult::new(label, format!("no output: {e:#}"), expected_text, false),
        };
        self.recorder.record(result)
    }

    /// Check that a step's captured output contains `needle`.
    pub fn expect_contains(&mut self, label: &str, step: &Result<Outcome>, needle: &str) -> bool {
        let found = step
            .as_ref()
            .is_ok_and(|outcome| outcome.text().contains(needle));
        let passed = self.recorder.check(label, &found, &true);
        if !passed && let Ok(outcome) = step {
            self.recorder
                .info(&format!("captured output: {:?}", truncate(&outcome.text())));
        }
        passed
    }
}

/// Aggregate result of a suite run.
#[derive(Debug, Clone)]
pub struct SuiteReport {
    pub cases_total: usize,
    pub cases_run: usize,
    pub interrupted: bool,
    pub state: RunState,
    pub results: Vec<CheckResult>,
}

impl SuiteReport {
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.len() - self.passed_count()
    }

    /// Process exit status: 0 all passed, 1 some failed, 130 interrupted.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        if self.interrupted {
            130
        } else if self.state.is_ok() {
            0
        } else {
            1
        }
    }
}

/// Ordered collection of test cases run against one image.
pub struct Suite<'a> {
    executor: &'a dyn Executor,
    image: String,
    cases: Vec<Box<dyn TestCase>>,
    scratch_parent: Option<PathBuf>,
    interrupted: Box<dyn Fn() -> bool + 'a>,
    quiet: bool,
}

impl<'a> Suite<'a> {
    pub fn new(executor: &'a dyn Executor, image: impl Into<String>) -> Self {
        Self {
            executor,
            image: image.into(),
            cases: Vec::new(),
            scratch_parent: None,
            interrupted: Box::new(|| false),
            quiet: false,
        }
    }

    #[must_use]
    pub fn cases(mut self, cases: impl IntoIterator<Item = Box<dyn TestCase>>) -> Self {
        self.cases.extend(cases);
        self
    }

    /// Create scratch areas under `parent` instead of the system temp dir.
    #[must_use]
    pub fn scratch_parent(mut self, parent: Option<PathBuf>) -> Self {
        self.scratch_parent = parent;
        self
    }

    /// Polled before each case and each invocation; once it returns true the
    /// remaining work is skipped and the run is marked failed.
    #[must_use]
    pub fn interrupt_check(mut self, check: impl Fn() -> bool + 'a) -> Self {
        self.interrupted = Box::new(check);
        self
    }

    /// Suppress per-check output lines.
    #[must_use]
    pub const fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }

    /// Run every case in order and report the aggregate result.
    ///
    /// # Errors
    /// Returns an error only if the top-level scratch area cannot be created.
    /// Failures inside cases are recorded, never returned.
    pub fn run(&self) -> Result<SuiteReport> {
        let mut recorder = if self.quiet {
            Recorder::quiet()
        } else {
            Recorder::new()
        };
        let area = ScratchArea::create(self.scratch_parent.as_deref())?;
        recorder.info(&format!(
            "testing image {} ({} cases, started {})",
            self.image,
            self.cases.len(),
            iso8601_now_with_offset()
        ));

        let mut cases_run = 0;
        for case in &self.cases {
            if (self.interrupted)() {
                break;
            }
            let _span = info_span!("case", name = case.name()).entered();
            recorder.info(&format!("case {}", case.name()));

            match area.workspace(case.name()) {
                Ok(workspace) => {
                    let mut ctx = CaseContext {
                        executor: self.executor,
                        image: &self.image,
                        workspace: &workspace,
                        recorder: &mut recorder,
                        interrupted: self.interrupted.as_ref(),
                    };
                    case.run(&mut ctx);
                    if let Err(e) = workspace.close() {
                        warn!("{:#}", e);
                    }
                }
                Err(e) => {
                    recorder.fail(
                        &format!("{}: create workspace", case.name()),
                        format!("{e:#}"),
                        "workspace created",
                    );
                }
            }
            cases_run += 1;
        }

        let interrupted = (self.interrupted)();
        if interrupted {
            recorder.mark_failed();
            recorder.error(&format!(
                "interrupted; {} of {} cases not run",
                self.cases.len() - cases_run,
                self.cases.len()
            ));
        }

        let total = recorder.results().len();
        if recorder.state().is_ok() {
            recorder.pass(&format!("all {total} checks passed"));
        } else {
            recorder.error(&format!(
                "some checks failed ({} of {total})",
                recorder.failed_count()
            ));
        }

        if let Err(e) = area.close() {
            warn!("{:#}", e);
        }
        debug!(cases_run, interrupted, "suite finished");

        Ok(SuiteReport {
            cases_total: self.cases.len(),
            cases_run,
            interrupted,
            state: recorder.state(),
            results: recorder.into_results(),
        })
    }
}

fn iso8601_now_with_offset() -> String {
    use time::{OffsetDateTime, format_description::well_known::Rfc3339};
    let now = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}
