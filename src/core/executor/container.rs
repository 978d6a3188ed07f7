use std::{
    borrow::Cow,
    process::{ExitStatus, Stdio},
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use anyhow::{Context, Result, bail};
use shell_escape::unix::escape;
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::{Child, Command},
    runtime::Runtime,
};
use tracing::{debug, warn};

use super::{Capture, ExitState, Executor, Invocation, Outcome};

static NEXT_CONTAINER: AtomicU64 = AtomicU64::new(0);

const INTERRUPT_POLL: Duration = Duration::from_millis(50);

// Why a running invocation was cut short.
enum Stop {
    TimedOut(Duration),
    Interrupted,
}

/// Executor backed by a docker-compatible CLI (`docker`, `podman`).
///
/// Every invocation becomes `<runtime> run --rm ...`, so no container state
/// survives between calls.
pub struct ContainerRuntime {
    program: String,
    leading_args: Vec<String>,
    timeout: Option<Duration>,
    interrupted: Box<dyn Fn() -> bool>,
    rt: Runtime,
}

impl ContainerRuntime {
    /// Create an executor for `command`, the runtime binary optionally followed
    /// by fixed arguments (e.g. `sudo docker`).
    ///
    /// # Errors
    /// Returns an error if `command` is empty or the I/O runtime cannot be built.
    pub fn new(command: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut parts = command.split_whitespace().map(String::from);
        let Some(program) = parts.next() else {
            bail!("container runtime command is empty")
        };

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to build tokio runtime")?;

        Ok(Self {
            program,
            leading_args: parts.collect(),
            timeout,
            interrupted: Box::new(|| false),
            rt,
        })
    }

    /// Polled while an invocation runs; once it returns true the runtime
    /// client is killed and the container removed.
    #[must_use]
    pub fn interrupt_check(mut self, check: impl Fn() -> bool + 'static) -> Self {
        self.interrupted = Box::new(check);
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments handed to the runtime binary to run `invocation` in a
    /// container called `name`.
    #[must_use]
    pub fn run_args(&self, invocation: &Invocation, name: &str) -> Vec<String> {
        let mut args = self.leading_args.clone();
        args.extend(["run", "--rm", "--name", name].map(String::from));
        if invocation.privileged {
            args.push("--privileged".to_string());
        }
        for mount in &invocation.mounts {
            args.push("-v".to_string());
            args.push(format!(
                "{}:{}",
                mount.host.display(),
                mount.container.display()
            ));
        }
        if let Some(dir) = &invocation.workdir {
            args.push("-w".to_string());
            args.push(dir.display().to_string());
        }
        args.push(invocation.image.clone());
        args.extend(invocation.args.iter().cloned());
        args
    }

    /// Shell-quoted command line, as echoed in verbose mode.
    #[must_use]
    pub fn command_line(&self, args: &[String]) -> String {
        std::iter::once(self.program.as_str())
            .chain(args.iter().map(String::as_str))
            .map(|arg| escape(Cow::Borrowed(arg)).into_owned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    async fn run_container(&self, args: &[String], name: &str, capture: Capture) -> Result<Outcome> {
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to launch container runtime `{}`", self.program))?;

        let stop = tokio::select! {
            outcome = collect(&mut child, capture) => return outcome,
            () = deadline(self.timeout) => Stop::TimedOut(self.timeout.unwrap_or_default()),
            () = self.until_interrupted() => Stop::Interrupted,
        };

        let status = match stop {
            Stop::TimedOut(limit) => {
                warn!(
                    container = name,
                    "invocation exceeded {:.1}s; killing it",
                    limit.as_secs_f64()
                );
                ExitState::TimedOut
            }
            Stop::Interrupted => {
                warn!(container = name, "interrupted; stopping container");
                ExitState::Interrupted
            }
        };
        if let Err(e) = child.kill().await {
            warn!("failed to kill runtime client: {}", e);
        }
        self.remove_container(name).await;
        Ok(Outcome::new(status, Vec::new()))
    }

    async fn until_interrupted(&self) {
        let mut tick = tokio::time::interval(INTERRUPT_POLL);
        loop {
            tick.tick().await;
            if (self.interrupted)() {
                return;
            }
        }
    }

    // Killing the client does not stop the container it started.
    async fn remove_container(&self, name: &str) {
        let status = Command::new(&self.program)
            .args(&self.leading_args)
            .args(["rm", "-f", name])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        match status {
            Ok(s) if s.success() => debug!(container = name, "removed stopped container"),
            Ok(s) => debug!(container = name, "container removal exited with {}", s),
            Err(e) => warn!(container = name, "failed to remove container: {}", e),
        }
    }
}

impl Executor for ContainerRuntime {
    fn run(&self, invocation: &Invocation) -> Result<Outcome> {
        let name = format!(
            "toolchain-smoke-{}-{}",
            std::process::id(),
            NEXT_CONTAINER.fetch_add(1, Ordering::Relaxed)
        );
        let args = self.run_args(invocation, &name);
        debug!("$ {}", self.command_line(&args));

        let outcome = self
            .rt
            .block_on(self.run_container(&args, &name, invocation.capture))?;
        debug!(status = %outcome.status, bytes = outcome.output.len(), "container finished");
        Ok(outcome)
    }
}

async fn deadline(limit: Option<Duration>) {
    match limit {
        Some(limit) => tokio::time::sleep(limit).await,
        None => std::future::pending().await,
    }
}

async fn read_chunk<R: AsyncRead + Unpin>(
    stream: &mut Option<R>,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    match stream {
        Some(stream) => stream.read(buf).await,
        None => Ok(0),
    }
}

/// Drain both pipes until EOF, then reap the child.
async fn collect(child: &mut Child, capture: Capture) -> Result<Outcome> {
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut output = Vec::new();
    let mut diagnostics = Vec::new();
    let mut out_buf = [0u8; 8192];
    let mut err_buf = [0u8; 8192];

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            read = read_chunk(&mut stdout, &mut out_buf), if stdout.is_some() => {
                let n = read.context("failed to read container stdout")?;
                if n == 0 {
                    stdout = None;
                } else {
                    output.extend_from_slice(&out_buf[..n]);
                }
            }
            read = read_chunk(&mut stderr, &mut err_buf), if stderr.is_some() => {
                let n = read.context("failed to read container stderr")?;
                if n == 0 {
                    stderr = None;
                } else if capture == Capture::StdoutAndStderr {
                    output.extend_from_slice(&err_buf[..n]);
                } else {
                    diagnostics.extend_from_slice(&err_buf[..n]);
                }
            }
        }
    }

    let status = child
        .wait()
        .await
        .context("failed to wait for container runtime")?;

    if !diagnostics.is_empty() {
        debug!(
            "uncaptured stderr: {}",
            String::from_utf8_lossy(&diagnostics).trim_end()
        );
    }

    Ok(Outcome::new(exit_state(status), output))
}

fn exit_state(status: ExitStatus) -> ExitState {
    if let Some(code) = status.code() {
        return ExitState::Exited(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return ExitState::Signaled(signal);
        }
    }
    ExitState::Exited(-1)
}
