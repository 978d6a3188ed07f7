use std::cell::RefCell;

use anyhow::Result;
use toolchain_smoke::core::executor::{Capture, ExitState, Executor, Invocation, Outcome};

pub const BANNER: &str = "usage: toolchain <tool> [args...]\n";

/// Executor that answers from a closure and records every invocation.
pub struct ScriptedExecutor {
    calls: RefCell<Vec<Invocation>>,
    respond: Box<dyn Fn(&Invocation) -> Result<Outcome>>,
}

impl ScriptedExecutor {
    pub fn new(respond: impl Fn(&Invocation) -> Result<Outcome> + 'static) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            respond: Box::new(respond),
        }
    }

    /// Behaves like a working toolchain image.
    pub fn healthy() -> Self {
        Self::new(healthy_response)
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }
}

impl Executor for ScriptedExecutor {
    fn run(&self, invocation: &Invocation) -> Result<Outcome> {
        self.calls.borrow_mut().push(invocation.clone());
        (self.respond)(invocation)
    }
}

fn ok(output: &str) -> Result<Outcome> {
    Ok(Outcome::new(ExitState::Exited(0), output))
}

fn exit(code: i32, output: &str) -> Result<Outcome> {
    Ok(Outcome::new(ExitState::Exited(code), output))
}

pub fn healthy_response(inv: &Invocation) -> Result<Outcome> {
    let args: Vec<&str> = inv.args.iter().map(String::as_str).collect();
    match args.as_slice() {
        [] => ok(BANNER),
        ["gcc", "--version"] => ok("gcc (GCC) 13.2.0\nCopyright (C) 2023 Free Software Foundation, Inc.\n"),
        ["gdb", "--version"] => ok("GNU gdb (GDB) 14.1\n"),
        ["gcc", .., source] => {
            // Compilation only works when the workspace is mounted as the workdir.
            let Some(workdir) = &inv.workdir else {
                return exit(1, "");
            };
            let mounted = inv.mounts.iter().any(|m| &m.container == workdir);
            if mounted && workdir.join(source).exists() {
                ok("")
            } else {
                exit(1, "")
            }
        }
        ["gdb", "-batch", ..] => {
            if inv.privileged && inv.capture == Capture::StdoutAndStderr {
                ok("\nProgram received signal SIGSEGV, Segmentation fault.\n\
                    0x0000555555555138 in main () at segfault.c:6\n\
                    6\t        *p = i;\n")
            } else {
                exit(1, "")
            }
        }
        [binary] if binary.ends_with("/hello") => ok("Hello, world!\n"),
        _ => exit(127, ""),
    }
}
