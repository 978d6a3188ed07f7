#![cfg(feature = "container-tests")]

// Live tests against a real container runtime. Requires `docker` on PATH.
// SMOKE_IMAGE selects the toolchain image for the full-suite test.

use std::time::Duration;

use anyhow::Result;
use toolchain_smoke::core::{
    executor::{Capture, ContainerRuntime, ExitState, Executor, Invocation, Mount},
    suite::{Suite, cases::builtin_cases},
};

fn docker() -> Result<ContainerRuntime> {
    ContainerRuntime::new("docker", Some(Duration::from_secs(120)))
}

#[test]
fn container_exec_echo() -> Result<()> {
    let runtime = docker()?;
    // Minimal image for a quick smoke test
    let outcome = runtime.run(&Invocation::new("alpine:3.19").args(["echo", "hello"]))?;
    assert_eq!(outcome.status, ExitState::Exited(0));
    assert_eq!(outcome.text().trim(), "hello");
    Ok(())
}

#[test]
fn container_reports_exit_code_and_stderr() -> Result<()> {
    let runtime = docker()?;
    let outcome = runtime.run(
        &Invocation::new("alpine:3.19")
            .args(["sh", "-c", "echo out; echo err >&2; exit 4"])
            .capture(Capture::StdoutAndStderr),
    )?;
    assert_eq!(outcome.status, ExitState::Exited(4));
    assert!(outcome.text().contains("out"));
    assert!(outcome.text().contains("err"));
    Ok(())
}

#[test]
fn mounted_directory_is_visible_at_same_path() -> Result<()> {
    let runtime = docker()?;
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("note.txt"), "shared\n")?;

    let outcome = runtime.run(
        &Invocation::new("alpine:3.19")
            .args(["cat", "note.txt"])
            .mount(Mount::same_path(dir.path()))
            .workdir(dir.path()),
    )?;
    assert!(outcome.status.success());
    assert_eq!(outcome.text(), "shared\n");
    Ok(())
}

#[test]
fn toolchain_image_passes_suite() -> Result<()> {
    let Ok(image) = std::env::var("SMOKE_IMAGE") else {
        eprintln!("skipping: SMOKE_IMAGE not set");
        return Ok(());
    };
    let runtime = docker()?;
    let report = Suite::new(&runtime, image)
        .cases(builtin_cases(None))
        .run()?;
    assert_eq!(report.exit_code(), 0, "failed checks: {:?}", report.results);
    Ok(())
}
