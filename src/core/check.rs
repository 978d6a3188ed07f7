use std::{borrow::Cow, fmt::Display};

use console::Style;
use tracing::info;

/// Longest observed value echoed on a failure line.
const MAX_OBSERVED_CHARS: usize = 240;

/// Outcome of a single labeled comparison.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckResult {
    pub label: String,
    pub observed: String,
    pub expected: String,
    pub passed: bool,
}

impl CheckResult {
    pub fn new(
        label: impl Into<String>,
        observed: impl Into<String>,
        expected: impl Into<String>,
        passed: bool,
    ) -> Self {
        Self {
            label: label.into(),
            observed: observed.into(),
            expected: expected.into(),
            passed,
        }
    }
}

/// Compare `observed` against `expected` by exact equality.
///
/// Containment or pattern checks are reduced to a value (usually a `bool`)
/// by the caller before they get here.
pub fn check<T>(label: &str, observed: &T, expected: &T) -> CheckResult
where
    T: PartialEq + Display + ?Sized,
{
    CheckResult::new(
        label,
        observed.to_string(),
        expected.to_string(),
        observed == expected,
    )
}

/// Aggregate pass/fail status of a suite run. Only ever moves from
/// `Passed` to `Failed`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RunState {
    #[default]
    Passed,
    Failed,
}

impl RunState {
    #[must_use]
    pub const fn fold(self, passed: bool) -> Self {
        match (self, passed) {
            (Self::Passed, true) => Self::Passed,
            _ => Self::Failed,
        }
    }

    #[must_use]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Passed)
    }
}

/// Severity tag printed in front of every user-facing line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Pass,
    Error,
}

impl Severity {
    const fn tag(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Pass => "PASS",
            Self::Error => "ERROR",
        }
    }

    fn style(self) -> Style {
        match self {
            Self::Info => Style::new().cyan(),
            Self::Pass => Style::new().green().bold(),
            Self::Error => Style::new().red().bold(),
        }
    }
}

/// Collects check results for a suite run and prints one line per check.
#[derive(Debug, Default)]
pub struct Recorder {
    state: RunState,
    results: Vec<CheckResult>,
    quiet: bool,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder that folds results without printing them.
    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::default()
        }
    }

    /// Log and fold one result into the run state. Returns whether it passed.
    pub fn record(&mut self, result: CheckResult) -> bool {
        let passed = result.passed;
        if passed {
            info!(check = %result.label, "check passed");
            self.emit(Severity::Pass, &result.label);
        } else {
            info!(
                check = %result.label,
                observed = %result.observed,
                expected = %result.expected,
                "check failed"
            );
            let line = format!(
                "{} (observed: {:?}, expected: {:?})",
                result.label,
                truncate(&result.observed),
                truncate(&result.expected)
            );
            self.emit(Severity::Error, &line);
        }
        self.state = self.state.fold(passed);
        self.results.push(result);
        passed
    }

    /// Compare and record in one step.
    pub fn check<T>(&mut self, label: &str, observed: &T, expected: &T) -> bool
    where
        T: PartialEq + Display + ?Sized,
    {
        self.record(check(label, observed, expected))
    }

    /// Record a failure for a step that produced no comparable value.
    pub fn fail(&mut self, label: &str, observed: impl Into<String>, expected: &str) -> bool {
        self.record(CheckResult::new(label, observed, expected, false))
    }

    /// Print an informational line.
    pub fn info(&self, message: &str) {
        self.emit(Severity::Info, message);
    }

    /// Print a success line that is not tied to a check.
    pub fn pass(&self, message: &str) {
        self.emit(Severity::Pass, message);
    }

    /// Print an error line that is not tied to a check.
    pub fn error(&self, message: &str) {
        self.emit(Severity::Error, message);
    }

    /// Mark the run failed without a check, e.g. after an interruption.
    pub const fn mark_failed(&mut self) {
        self.state = RunState::Failed;
    }

    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    #[must_use]
    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    #[must_use]
    pub fn into_results(self) -> Vec<CheckResult> {
        self.results
    }

    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.len() - self.passed_count()
    }

    fn emit(&self, severity: Severity, message: &str) {
        if self.quiet {
            return;
        }
        let tag = severity.style().apply_to(format!("[{}]", severity.tag()));
        println!("{tag} {message}");
    }
}

pub(crate) fn truncate(text: &str) -> Cow<'_, str> {
    match text.char_indices().nth(MAX_OBSERVED_CHARS) {
        Some((idx, _)) => Cow::Owned(format!("{}...", &text[..idx])),
        None => Cow::Borrowed(text),
    }
}
