use std::{borrow::Cow, fmt, path::PathBuf};

use anyhow::Result;

pub mod container;

pub use container::ContainerRuntime;

/// Which output streams an invocation captures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Capture {
    /// Standard output only; standard error is discarded.
    #[default]
    Stdout,
    /// Standard output and standard error, interleaved in arrival order.
    StdoutAndStderr,
}

/// A host directory made visible inside the isolated environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mount {
    pub host: PathBuf,
    pub container: PathBuf,
}

impl Mount {
    /// Mount `path` at the identical path inside the environment.
    pub fn same_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            host: path.clone(),
            container: path,
        }
    }
}

/// One request to run a command inside an isolated environment.
///
/// An empty `args` vector runs the image's default entrypoint without arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub image: String,
    pub args: Vec<String>,
    pub mounts: Vec<Mount>,
    pub workdir: Option<PathBuf>,
    pub privileged: bool,
    pub capture: Capture,
}

impl Invocation {
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            args: Vec::new(),
            mounts: Vec::new(),
            workdir: None,
            privileged: false,
            capture: Capture::default(),
        }
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn mount(mut self, mount: Mount) -> Self {
        self.mounts.push(mount);
        self
    }

    #[must_use]
    pub fn workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    #[must_use]
    pub const fn privileged(mut self) -> Self {
        self.privileged = true;
        self
    }

    #[must_use]
    pub const fn capture(mut self, capture: Capture) -> Self {
        self.capture = capture;
        self
    }
}

/// How the contained process finished.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitState {
    Exited(i32),
    Signaled(i32),
    TimedOut,
    /// Stopped because the run was interrupted.
    Interrupted,
}

impl ExitState {
    pub const SUCCESS: Self = Self::Exited(0);

    #[must_use]
    pub const fn success(self) -> bool {
        matches!(self, Self::Exited(0))
    }
}

impl fmt::Display for ExitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(code) => write!(f, "exit code {code}"),
            Self::Signaled(signal) => write!(f, "killed by signal {signal}"),
            Self::TimedOut => f.write_str("timed out"),
            Self::Interrupted => f.write_str("interrupted"),
        }
    }
}

/// Result of a completed invocation: exit state plus captured output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    pub status: ExitState,
    pub output: Vec<u8>,
}

impl Outcome {
    pub fn new(status: ExitState, output: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            output: output.into(),
        }
    }

    /// Captured output decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.output)
    }
}

/// Runs commands inside an isolated environment.
///
/// Calls are blocking: they return only after the contained process exits and
/// its output has been fully captured. Each call gets an independent environment.
pub trait Executor {
    /// Run one invocation.
    ///
    /// # Errors
    /// Returns an error if the environment could not be launched at all. A
    /// command that runs and fails is reported through [`Outcome::status`].
    fn run(&self, invocation: &Invocation) -> Result<Outcome>;
}
