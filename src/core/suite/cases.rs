use std::{
    borrow::Cow,
    path::{Path, PathBuf},
};

use super::{CaseContext, TestCase};
use crate::core::executor::Capture;

/// Usage banner shipped with the harness, used when no fixture path is set.
pub const BUILTIN_USAGE: &[u8] = include_bytes!("../../../fixtures/usage.txt");

/// Greeting printed by the hello-world program.
pub const HELLO_GREETING: &str = "Hello, world!\n";

const HELLO_SOURCE: &str = r#"#include <stdio.h>

int main(void) {
    printf("Hello, world!\n");
    return 0;
}
"#;

/// Source line the debugger must report as the fault location.
pub const FAULT_LINE: &str = "*p = i;";

const FAULT_SOURCE: &str = r"#include <stddef.h>

int main(void) {
    int *p = NULL;
    for (int i = 0; i < 10; i++) {
        *p = i;
    }
    return 0;
}
";

/// The built-in catalogue, in execution order. Without `usage_fixture` the
/// banner is compared against [`BUILTIN_USAGE`].
pub fn builtin_cases(usage_fixture: Option<&Path>) -> Vec<Box<dyn TestCase>> {
    vec![
        Box::new(UsageBanner {
            fixture: usage_fixture.map(Path::to_path_buf),
        }),
        // "gcc (" only appears in real version output, not in the banner.
        Box::new(VersionQuery {
            name: "gcc-version",
            tool: "gcc",
            marker: "gcc (",
        }),
        Box::new(VersionQuery {
            name: "gdb-version",
            tool: "gdb",
            marker: "GNU gdb",
        }),
        Box::new(HelloWorld),
        Box::new(DebuggerFault),
    ]
}

/// Running the image without arguments prints the usage banner.
pub struct UsageBanner {
    pub fixture: Option<PathBuf>,
}

impl UsageBanner {
    fn expected(&self) -> Result<Cow<'static, [u8]>, String> {
        match &self.fixture {
            Some(path) => std::fs::read(path)
                .map(Cow::Owned)
                .map_err(|e| format!("cannot read fixture {}: {e}", path.display())),
            None => Ok(Cow::Borrowed(BUILTIN_USAGE)),
        }
    }
}

impl TestCase for UsageBanner {
    fn name(&self) -> &str {
        "usage-banner"
    }

    fn run(&self, ctx: &mut CaseContext<'_>) {
        let step = ctx.exec(&ctx.invocation());
        ctx.expect_success("default invocation exits 0", &step);

        match self.expected() {
            Ok(expected) => {
                ctx.expect_output("usage banner matches fixture", &step, &expected);
            }
            Err(reason) => {
                ctx.recorder()
                    .fail("usage banner matches fixture", reason, "readable fixture");
            }
        }
    }
}

/// `<tool> --version` succeeds and names the tool.
pub struct VersionQuery {
    pub name: &'static str,
    pub tool: &'static str,
    pub marker: &'static str,
}

impl TestCase for VersionQuery {
    fn name(&self) -> &str {
        self.name
    }

    fn run(&self, ctx: &mut CaseContext<'_>) {
        let step = ctx.exec(&ctx.invocation().args([self.tool, "--version"]));
        ctx.expect_success(&format!("{} --version exits 0", self.tool), &step);
        ctx.expect_contains(
            &format!("{} --version reports {:?}", self.tool, self.marker),
            &step,
            self.marker,
        );
    }
}

/// Compile and run a trivial program inside the image.
pub struct HelloWorld;

impl TestCase for HelloWorld {
    fn name(&self) -> &str {
        "hello-world"
    }

    fn run(&self, ctx: &mut CaseContext<'_>) {
        write_source(ctx, "hello.c", HELLO_SOURCE);
        let binary = ctx.workspace().path().join("hello");
        let binary = binary.display().to_string();

        let compile = ctx.exec(&ctx.in_workspace().args(["gcc", "-o", binary.as_str(), "hello.c"]));
        ctx.expect_success("gcc compiles hello.c", &compile);

        let run = ctx.exec(&ctx.in_workspace().args([binary.as_str()]));
        ctx.expect_success("hello binary exits 0", &run);
        ctx.expect_output("hello binary prints greeting", &run, HELLO_GREETING.as_bytes());
    }
}

/// A null-pointer write under the debugger is reported with its source line.
pub struct DebuggerFault;

impl TestCase for DebuggerFault {
    fn name(&self) -> &str {
        "gdb-segfault"
    }

    fn run(&self, ctx: &mut CaseContext<'_>) {
        write_source(ctx, "segfault.c", FAULT_SOURCE);
        let binary = ctx.workspace().path().join("segfault");
        let binary = binary.display().to_string();

        let compile = ctx.exec(&ctx.in_workspace().args([
            "gcc", "-g", "-O0", "-o", binary.as_str(), "segfault.c",
        ]));
        ctx.expect_success("gcc compiles segfault.c", &compile);

        // ptrace inside the container needs elevated privileges.
        let debug = ctx.exec(
            &ctx.in_workspace()
                .args(["gdb", "-batch", "-ex", "run", "-ex", "bt", binary.as_str()])
                .privileged()
                .capture(Capture::StdoutAndStderr),
        );
        ctx.expect_success("gdb batch run exits 0", &debug);
        ctx.expect_contains("gdb reports SIGSEGV", &debug, "SIGSEGV");
        ctx.expect_contains("gdb reports segmentation fault", &debug, "Segmentation fault");
        ctx.expect_contains("gdb shows the faulting line", &debug, FAULT_LINE);
    }
}

fn write_source(ctx: &mut CaseContext<'_>, name: &str, contents: &str) {
    let label = format!("write {name}");
    match ctx.workspace().write_file(name, contents) {
        Ok(_) => {
            ctx.recorder().check(&label, &true, &true);
        }
        Err(e) => {
            ctx.recorder().fail(&label, format!("{e:#}"), "file written");
        }
    }
}
